use std::fmt;

use crate::protocol::{ApiReader, ApiWriter, Command, DecodeError, Query, Request};

/// Tokenizes `query` with the settings of `index`, optionally with per-keyword
/// statistics.
#[derive(Debug, Clone)]
pub struct Keywords {
    pub query: String,
    pub index: String,
    pub hits: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keyword {
    /// Token as it appeared in the query.
    pub tokenized: String,
    /// Token after stemming and other normalization.
    pub normalized: String,
    pub query_pos: u32,
    /// Only filled when statistics were requested.
    pub docs: u32,
    pub hits: u32,
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{Tok: '{}', Norm: '{}', Qpos: {}; docs/hits {}/{}}}",
            self.tokenized, self.normalized, self.query_pos, self.docs, self.hits
        )
    }
}

impl Request for Keywords {
    fn command(&self) -> Command {
        Command::Keywords
    }

    fn encode(&self, writer: &mut ApiWriter<'_>) {
        writer.put_string(&self.query);
        writer.put_string(&self.index);
        writer.put_bool_dword(self.hits);
        // fold lemmas, fold blended, fold wildcards
        writer.put_bool_dword(false);
        writer.put_bool_dword(false);
        writer.put_bool_dword(false);
        // expansion limit
        writer.put_u32(0);
    }
}

impl Query for Keywords {
    type Output = Vec<Keyword>;

    fn decode(&self, reader: &mut ApiReader<'_>) -> Result<Self::Output, DecodeError> {
        let count = reader.get_len()?;
        let mut out = Vec::new();

        for _ in 0..count {
            let mut keyword = Keyword {
                tokenized: reader.get_string()?,
                normalized: reader.get_string()?,
                query_pos: reader.get_u32()?,
                ..Default::default()
            };
            if self.hits {
                keyword.docs = reader.get_u32()?;
                keyword.hits = reader.get_u32()?;
            }
            out.push(keyword);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(with_stats: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut writer = ApiWriter::new(&mut buf);
        writer.put_u32(1);
        writer.put_string("Running");
        writer.put_string("run");
        writer.put_u32(1);
        if with_stats {
            writer.put_u32(12);
            writer.put_u32(40);
        }
        buf
    }

    #[test]
    fn request_layout() {
        let request = Keywords {
            query: "q".into(),
            index: "i".into(),
            hits: true,
        };
        let mut buf = Vec::new();
        request.encode(&mut ApiWriter::new(&mut buf));

        let mut reader = ApiReader::new(&buf);
        assert_eq!(reader.get_string().unwrap(), "q");
        assert_eq!(reader.get_string().unwrap(), "i");
        assert!(reader.get_bool_dword().unwrap());
        assert_eq!(reader.remaining(), 16);
    }

    #[test]
    fn statistics_only_when_requested() {
        let with = Keywords {
            query: String::new(),
            index: String::new(),
            hits: true,
        };
        let without = Keywords {
            hits: false,
            ..with.clone()
        };

        let keywords = with.decode(&mut ApiReader::new(&reply(true))).unwrap();
        assert_eq!(keywords[0].docs, 12);
        assert_eq!(keywords[0].hits, 40);

        let keywords = without.decode(&mut ApiReader::new(&reply(false))).unwrap();
        assert_eq!(
            keywords,
            vec![Keyword {
                tokenized: "Running".into(),
                normalized: "run".into(),
                query_pos: 1,
                docs: 0,
                hits: 0,
            }]
        );
    }
}
