//! Percolate queries: match documents against the queries stored in a
//! percolate index.
use std::time::Duration;

use bitflags::bitflags;

use crate::{
    protocol::{ApiReader, ApiWriter, Command, DecodeError, Query, Request},
    value::DocId,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PqFlags: u32 {
        /// Report which documents each query matched.
        const NEED_DOCS = 1 << 0;
        /// Return the stored query text, tags and filters.
        const NEED_QUERY = 1 << 1;
        const JSON_DOCS = 1 << 2;
        /// Fill in timings and counters.
        const VERBOSE = 1 << 3;
        const SKIP_BAD_JSON = 1 << 4;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PqResponseFlags: u32 {
        const HAS_DOCS = 1 << 0;
        const DUMP_QUERIES = 1 << 1;
        /// Documents are reported by id instead of by ordinal.
        const HAS_DOCIDS = 1 << 2;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct QueryDescFlags: u32 {
        const QUERY_PRESENT = 1 << 0;
        const TAGS_PRESENT = 1 << 1;
        const FILTERS_PRESENT = 1 << 2;
        /// The stored query is SphinxQL rather than JSON.
        const QUERY_IS_QL = 1 << 3;
    }
}

impl Default for PqFlags {
    fn default() -> Self {
        PqFlags::empty()
    }
}

impl Default for PqResponseFlags {
    fn default() -> Self {
        PqResponseFlags::empty()
    }
}

impl Default for QueryDescFlags {
    fn default() -> Self {
        QueryDescFlags::empty()
    }
}

/// Documents matched by one stored query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PqDocs {
    Ids(Vec<DocId>),
    /// Positions in the submitted document list, plus the requested shift.
    Ordinals(Vec<i32>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PqQuery {
    pub flags: QueryDescFlags,
    pub query: String,
    pub tags: String,
    pub filters: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDesc {
    pub query_id: u64,
    pub docs: Option<PqDocs>,
    pub query: Option<PqQuery>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PqResponse {
    pub flags: PqResponseFlags,
    pub total_time: Duration,
    pub setup_time: Duration,
    pub queries_matched: u32,
    pub queries_failed: u32,
    pub docs_matched: u32,
    pub total_queries: u32,
    pub only_terms: u32,
    pub early_out_queries: u32,
    /// Per query matching times, in microseconds.
    pub query_dt: Vec<u32>,
    pub warnings: String,
    pub queries: Vec<QueryDesc>,
}

/// Matches plain text `docs` against the percolate index `index`.
///
/// JSON document handling is not available over this command, so
/// `JSON_DOCS` and `SKIP_BAD_JSON` are stripped from `flags`.
#[derive(Debug, Clone)]
pub struct CallPq {
    pub index: String,
    pub docs: Vec<String>,
    pub flags: PqFlags,
    /// Added to every reported document ordinal.
    pub shift: i32,
}

impl Request for CallPq {
    fn command(&self) -> Command {
        Command::CallPq
    }

    fn encode(&self, writer: &mut ApiWriter<'_>) {
        let flags = self
            .flags
            .difference(PqFlags::JSON_DOCS | PqFlags::SKIP_BAD_JSON);
        writer.put_u32(flags.bits());
        // id alias, only meaningful for JSON documents
        writer.put_string("");
        writer.put_string(&self.index);
        writer.put_i32(self.shift);
        writer.put_len(self.docs.len());
        for doc in &self.docs {
            writer.put_string(doc);
        }
    }
}

impl Query for CallPq {
    type Output = PqResponse;

    fn decode(&self, reader: &mut ApiReader<'_>) -> Result<PqResponse, DecodeError> {
        let flags = PqResponseFlags::from_bits_retain(reader.get_u32()?);
        let mut resp = PqResponse {
            flags,
            ..Default::default()
        };

        let nqueries = reader.get_len()?;
        for _ in 0..nqueries {
            let query_id = reader.get_u64()?;
            let docs = if flags.contains(PqResponseFlags::HAS_DOCS) {
                let ndocs = reader.get_len()?;
                Some(if flags.contains(PqResponseFlags::HAS_DOCIDS) {
                    let mut ids = Vec::new();
                    for _ in 0..ndocs {
                        ids.push(reader.get_docid()?);
                    }
                    PqDocs::Ids(ids)
                } else {
                    let mut ordinals = Vec::new();
                    for _ in 0..ndocs {
                        ordinals.push(reader.get_i32()?);
                    }
                    PqDocs::Ordinals(ordinals)
                })
            } else {
                None
            };
            let query = if flags.contains(PqResponseFlags::DUMP_QUERIES) {
                Some(decode_stored_query(reader)?)
            } else {
                None
            };
            resp.queries.push(QueryDesc {
                query_id,
                docs,
                query,
            });
        }

        resp.total_time = Duration::from_micros(reader.get_u64()?);
        resp.setup_time = Duration::from_micros(reader.get_u64()?);
        resp.queries_matched = reader.get_u32()?;
        resp.queries_failed = reader.get_u32()?;
        resp.docs_matched = reader.get_u32()?;
        resp.total_queries = reader.get_u32()?;
        resp.only_terms = reader.get_u32()?;
        resp.early_out_queries = reader.get_u32()?;
        let ndt = reader.get_len()?;
        for _ in 0..ndt {
            resp.query_dt.push(reader.get_u32()?);
        }
        resp.warnings = reader.get_string()?;
        Ok(resp)
    }
}

fn decode_stored_query(reader: &mut ApiReader<'_>) -> Result<PqQuery, DecodeError> {
    let flags = QueryDescFlags::from_bits_retain(reader.get_u32()?);
    let mut out = PqQuery {
        flags,
        ..Default::default()
    };
    if flags.contains(QueryDescFlags::QUERY_PRESENT) {
        out.query = reader.get_string()?;
    }
    if flags.contains(QueryDescFlags::TAGS_PRESENT) {
        out.tags = reader.get_string()?;
    }
    if flags.contains(QueryDescFlags::FILTERS_PRESENT) {
        out.filters = reader.get_string()?;
    }
    Ok(out)
}
