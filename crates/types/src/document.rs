use crate::block::Block;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Metadata carried alongside the block sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub document_id: Option<String>,
    pub title: Option<String>,
    pub revision: Option<String>,
    pub author: Option<String>,
    pub status: Option<String>,
    pub date: Option<String>,
    /// Every other front-matter field, keyed by its original name.
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

impl DocumentMetadata {
    /// Header fields in display order: id, title, revision, author, date.
    ///
    /// Missing fields are skipped.
    pub fn header_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("id", self.document_id.as_deref()),
            ("title", self.title.as_deref()),
            ("revision", self.revision.as_deref()),
            ("author", self.author.as_deref()),
            ("date", self.date.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| (label, v)))
        .collect()
    }
}

/// A parsed document: an ordered block sequence plus metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub metadata: DocumentMetadata,
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(metadata: DocumentMetadata, blocks: Vec<Block>) -> Self {
        Self { metadata, blocks }
    }

    /// The document id, or `"untitled"` when none is set.
    pub fn id(&self) -> &str {
        self.metadata.document_id.as_deref().unwrap_or("untitled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields_keep_fixed_order_and_skip_missing() {
        let meta = DocumentMetadata {
            document_id: Some("SOP-001".into()),
            title: Some("Handling".into()),
            author: Some("QA".into()),
            date: Some("2024-01-01".into()),
            ..Default::default()
        };
        let labels: Vec<_> = meta.header_fields().into_iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["id", "title", "author", "date"]);
    }

    #[test]
    fn test_document_id_fallback() {
        assert_eq!(Document::default().id(), "untitled");
    }
}
