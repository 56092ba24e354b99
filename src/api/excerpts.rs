use bitflags::bitflags;

use crate::protocol::{ApiReader, ApiWriter, Command, DecodeError, Query, Request};

bitflags! {
    /// Snippet building switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExcerptFlags: u32 {
        /// Highlight exact phrase matches only.
        const EXACT_PHRASE = 1 << 1;
        /// Also break passages at the index's phrase boundary characters.
        const USE_BOUNDARIES = 1 << 3;
        /// Order passages by weight instead of position.
        const WEIGHT_ORDER = 1 << 4;
        /// Treat the words as an extended syntax query.
        const QUERY = 1 << 5;
        const FORCE_ALL_WORDS = 1 << 6;
        /// Documents are file names to load on the daemon side.
        const LOAD_FILES = 1 << 7;
        const ALLOW_EMPTY = 1 << 8;
        const EMIT_ZONES = 1 << 9;
        const FILES_SCATTERED = 1 << 10;
        const FORCE_PASSAGES = 1 << 11;
    }
}

impl Default for ExcerptFlags {
    fn default() -> Self {
        ExcerptFlags::empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetOptions {
    pub before_match: String,
    pub after_match: String,
    pub chunk_separator: String,
    pub html_strip_mode: String,
    pub passage_boundary: String,
    /// Maximum snippet size, in characters.
    pub limit: i32,
    pub limit_passages: i32,
    pub limit_words: i32,
    /// Words kept around each matched keyword.
    pub around: i32,
    pub start_passage_id: i32,
    pub flags: ExcerptFlags,
}

impl Default for SnippetOptions {
    fn default() -> Self {
        SnippetOptions {
            before_match: "<b>".to_string(),
            after_match: "</b>".to_string(),
            chunk_separator: " ... ".to_string(),
            html_strip_mode: "index".to_string(),
            passage_boundary: "none".to_string(),
            limit: 256,
            limit_passages: 0,
            limit_words: 0,
            around: 5,
            start_passage_id: 1,
            flags: ExcerptFlags::empty(),
        }
    }
}

/// Builds highlighted snippets of `docs` for the keywords in `words`, using
/// the tokenizer settings of `index`. Answered with one snippet per document.
#[derive(Debug, Clone)]
pub struct Excerpts {
    pub docs: Vec<String>,
    pub index: String,
    pub words: String,
    pub options: SnippetOptions,
}

impl Request for Excerpts {
    fn command(&self) -> Command {
        Command::Excerpt
    }

    fn encode(&self, writer: &mut ApiWriter<'_>) {
        let opts = &self.options;
        // mode
        writer.put_u32(0);
        writer.put_u32(opts.flags.bits());
        writer.put_string(&self.index);
        writer.put_string(&self.words);
        writer.put_string(&opts.before_match);
        writer.put_string(&opts.after_match);
        writer.put_string(&opts.chunk_separator);
        writer.put_i32(opts.limit);
        writer.put_i32(opts.around);
        writer.put_i32(opts.limit_passages);
        writer.put_i32(opts.limit_words);
        writer.put_i32(opts.start_passage_id);
        writer.put_string(&opts.html_strip_mode);
        writer.put_string(&opts.passage_boundary);
        writer.put_len(self.docs.len());
        for doc in &self.docs {
            writer.put_string(doc);
        }
    }
}

impl Query for Excerpts {
    type Output = Vec<String>;

    fn decode(&self, reader: &mut ApiReader<'_>) -> Result<Self::Output, DecodeError> {
        self.docs.iter().map(|_| reader.get_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Excerpts {
        Excerpts {
            docs: vec!["this is my test text to be highlighted".into(), "another".into()],
            index: "lj".into(),
            words: "is text".into(),
            options: SnippetOptions::default(),
        }
    }

    #[test]
    fn encodes_options_in_wire_order() {
        let mut req = request();
        req.options.flags = ExcerptFlags::QUERY | ExcerptFlags::ALLOW_EMPTY;
        req.options.limit_words = 3;

        let mut buf = Vec::new();
        req.encode(&mut ApiWriter::new(&mut buf));
        let mut reader = ApiReader::new(&buf);

        assert_eq!(reader.get_u32().unwrap(), 0);
        assert_eq!(reader.get_u32().unwrap(), (1 << 5) | (1 << 8));
        assert_eq!(reader.get_string().unwrap(), "lj");
        assert_eq!(reader.get_string().unwrap(), "is text");
        assert_eq!(reader.get_string().unwrap(), "<b>");
        assert_eq!(reader.get_string().unwrap(), "</b>");
        assert_eq!(reader.get_string().unwrap(), " ... ");
        assert_eq!(reader.get_i32().unwrap(), 256);
        assert_eq!(reader.get_i32().unwrap(), 5);
        assert_eq!(reader.get_i32().unwrap(), 0);
        assert_eq!(reader.get_i32().unwrap(), 3);
        assert_eq!(reader.get_i32().unwrap(), 1);
        assert_eq!(reader.get_string().unwrap(), "index");
        assert_eq!(reader.get_string().unwrap(), "none");
        assert_eq!(reader.get_len().unwrap(), 2);
        assert_eq!(
            reader.get_string().unwrap(),
            "this is my test text to be highlighted"
        );
        assert_eq!(reader.get_string().unwrap(), "another");
        assert!(reader.is_empty());
    }

    #[test]
    fn decodes_one_snippet_per_document() {
        let mut body = Vec::new();
        for s in ["this <b>is</b> my", ""] {
            body.extend((s.len() as u32).to_be_bytes());
            body.extend(s.as_bytes());
        }
        let snippets = request().decode(&mut ApiReader::new(&body)).unwrap();
        assert_eq!(snippets, vec!["this <b>is</b> my".to_string(), String::new()]);

        let short = &body[..body.len() - 4];
        assert!(request().decode(&mut ApiReader::new(short)).is_err());
    }
}
