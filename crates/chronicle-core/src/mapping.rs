//! Chunk mapping: the id → text table persisted beside the index.
//!
//! Interchange format: UTF-8 text, one record per line,
//! `<integer-id>|<chunk-text>`, split on the *first* `|` only so chunk
//! text may itself contain `|`. Ids are assigned by corpus-order
//! position at build time.
//!
//! Newlines and backslashes inside chunk text are escaped on write
//! (`\n`, `\\`) and unescaped on parse, keeping the format
//! line-delimited. Records containing neither character are identical to
//! the unescaped form, so existing mapping files parse unchanged.
//!
//! Parsing is lenient: a malformed line (no separator, non-integer id)
//! is logged at WARN and skipped. A damaged mapping degrades retrieval
//! to fewer passages; it never aborts a load.

use std::collections::BTreeMap;

use tracing::warn;

/// Ordered mapping from chunk id to chunk text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMapping {
    entries: BTreeMap<usize, String>,
}

impl ChunkMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping from chunks in corpus order; id = position.
    pub fn from_chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = chunks
            .into_iter()
            .enumerate()
            .map(|(id, text)| (id, text.into()))
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, id: usize, text: impl Into<String>) {
        self.entries.insert(id, text.into());
    }

    pub fn get(&self, id: usize) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries.iter().map(|(id, text)| (*id, text.as_str()))
    }

    /// Parse the line-oriented interchange format.
    ///
    /// Malformed lines are warned and skipped; they never abort the
    /// load.
    pub fn parse(input: &str) -> Self {
        let mut mapping = Self::new();
        for (idx, line) in input.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let Some((id_part, text_part)) = line.split_once('|') else {
                warn!(line = idx + 1, "mapping line has no '|' separator, skipping");
                continue;
            };
            let Ok(id) = id_part.trim().parse::<usize>() else {
                warn!(
                    line = idx + 1,
                    id = id_part,
                    "mapping line has a non-integer id, skipping"
                );
                continue;
            };
            mapping.entries.insert(id, unescape(text_part));
        }
        mapping
    }

    /// Serialize to the interchange format, one record per line.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (id, text) in &self.entries {
            out.push_str(&id.to_string());
            out.push('|');
            out.push_str(&escape(text));
            out.push('\n');
        }
        out
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_chunks_assigns_positional_ids() {
        let mapping = ChunkMapping::from_chunks(["first.", "second.", "third."]);
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.get(0), Some("first."));
        assert_eq!(mapping.get(2), Some("third."));
        assert_eq!(mapping.get(3), None);
    }

    #[test]
    fn test_serialize_parse_roundtrip() {
        let mapping = ChunkMapping::from_chunks(["Soekarno lahir di Surabaya.", "Hatta."]);
        let parsed = ChunkMapping::parse(&mapping.serialize());
        assert_eq!(parsed, mapping);
    }

    #[test]
    fn test_split_on_first_pipe_only() {
        let parsed = ChunkMapping::parse("0|left|right|end\n");
        assert_eq!(parsed.get(0), Some("left|right|end"));
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let input = "0|good\nabc|bad id\nno separator here\n2|also good\n";
        let parsed = ChunkMapping::parse(input);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get(0), Some("good"));
        assert_eq!(parsed.get(1), None);
        assert_eq!(parsed.get(2), Some("also good"));
    }

    #[test]
    fn test_newline_in_chunk_text_roundtrips() {
        let mapping = ChunkMapping::from_chunks(["line one\nline two", "back\\slash"]);
        let serialized = mapping.serialize();
        assert_eq!(serialized.lines().count(), 2);
        let parsed = ChunkMapping::parse(&serialized);
        assert_eq!(parsed.get(0), Some("line one\nline two"));
        assert_eq!(parsed.get(1), Some("back\\slash"));
    }

    #[test]
    fn test_empty_text_field_allowed() {
        let parsed = ChunkMapping::parse("5|\n");
        assert_eq!(parsed.get(5), Some(""));
    }

    #[test]
    fn test_iter_in_id_order() {
        let mut mapping = ChunkMapping::new();
        mapping.insert(2, "c");
        mapping.insert(0, "a");
        mapping.insert(1, "b");
        let ids: Vec<usize> = mapping.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
