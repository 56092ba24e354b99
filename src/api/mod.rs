//! Command adapters.
//!
//! Each command is a small type implementing [`Request`] (and [`Query`] when
//! the daemon answers it). They only translate arguments and replies to and
//! from the primitive codec; framing, status handling and the connection
//! itself belong to [`Client`](crate::Client).
mod callpq;
mod excerpts;
mod json;
mod keywords;
mod search;
mod sphinxql;
mod status;
mod update;
mod uvar;

use crate::protocol::{ApiReader, ApiWriter, Command, DecodeError, Query, Request};

pub use callpq::{
    CallPq, PqDocs, PqFlags, PqQuery, PqResponse, PqResponseFlags, QueryDesc, QueryDescFlags,
};
pub use excerpts::{ExcerptFlags, Excerpts, SnippetOptions};
pub use json::{Json, JsonAnswer};
pub use keywords::{Keyword, Keywords};
pub use search::{
    AttrType, ColumnInfo, Filter, FilterValue, GroupFunc, Match, MatchMode, QueryFlags,
    QueryResult, RankMode, Search, SearchQueries, SortMode, WordStat,
};
pub use sphinxql::Sphinxql;
pub use status::Status;
pub use update::{UpdateAttributes, UpdateRow, UpdateType};
pub use uvar::Uvar;

/// Round-trips a cookie through the daemon.
#[derive(Debug, Clone, Copy)]
pub struct Ping {
    pub cookie: u32,
}

impl Request for Ping {
    fn command(&self) -> Command {
        Command::Ping
    }

    fn encode(&self, writer: &mut ApiWriter<'_>) {
        writer.put_u32(self.cookie);
    }
}

impl Query for Ping {
    type Output = u32;

    fn decode(&self, reader: &mut ApiReader<'_>) -> Result<u32, DecodeError> {
        reader.get_u32()
    }
}

/// Asks the daemon to keep the connection open between requests. Not
/// answered.
#[derive(Debug, Clone, Copy)]
pub struct Persist;

impl Request for Persist {
    fn command(&self) -> Command {
        Command::Persist
    }

    fn encode(&self, writer: &mut ApiWriter<'_>) {
        writer.put_bool_dword(true);
    }
}

/// Forces pending attribute updates to disk; answered with the flush tag.
#[derive(Debug, Clone, Copy)]
pub struct FlushAttributes;

impl Request for FlushAttributes {
    fn command(&self) -> Command {
        Command::FlushAttrs
    }

    fn encode(&self, _writer: &mut ApiWriter<'_>) {}
}

impl Query for FlushAttributes {
    type Output = u32;

    fn decode(&self, reader: &mut ApiReader<'_>) -> Result<u32, DecodeError> {
        reader.get_u32()
    }
}

/// Escapes the characters the full-text query parser treats as operators.
pub fn escape_string(from: &str) -> String {
    let mut out = String::with_capacity(from.len() * 2);
    for c in from.chars() {
        if matches!(
            c,
            '\\' | '(' | ')' | '|' | '-' | '!' | '@' | '~' | '"' | '&' | '/' | '^' | '$' | '='
                | '<'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
