use pgvector::Vector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A corpus document with its embedding, as held by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagDocument {
    id: String,
    embedding: Vector,
    source_text: String,
    metadata: BTreeMap<String, String>,
}

impl RagDocument {
    pub fn new(
        id: impl Into<String>,
        embedding: Vector,
        source_text: String,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: id.into(),
            embedding,
            source_text,
            metadata,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn embedding(&self) -> &Vector {
        &self.embedding
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn dimension(&self) -> usize {
        self.embedding.as_slice().len()
    }

    /// Leading `max_chars` characters, with `...` when cut.
    pub fn snippet(&self, max_chars: usize) -> String {
        let mut chars = self.source_text.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}

/// Plain corpus row before embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusDocument {
    pub id: String,
    pub title: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> RagDocument {
        RagDocument::new("d1", Vector::from(vec![1.0, 0.0]), text.to_string(), BTreeMap::new())
    }

    #[test]
    fn test_snippet_truncates_long_text() {
        let text = "a".repeat(250);
        let snippet = doc(&text).snippet(200);
        assert_eq!(snippet.len(), 203);
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn test_snippet_keeps_short_text() {
        assert_eq!(doc("short").snippet(200), "short");
        assert_eq!(doc("short").dimension(), 2);
    }
}
