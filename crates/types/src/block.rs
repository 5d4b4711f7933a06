//! The canonical block model shared by every renderer.
//!
//! A parsed document is a flat sequence of [`Block`]s. The set of variants is
//! closed: adding a block type means touching every `match` that dispatches on
//! it, which is exactly the point.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The dispatch tag of a [`Block`].
///
/// The lowercase name doubles as the key used for style-map lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Heading,
    Paragraph,
    Blockquote,
    List,
    CodeBlock,
    Callout,
    Table,
    Image,
    Wikilink,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Heading => "heading",
            BlockType::Paragraph => "paragraph",
            BlockType::Blockquote => "blockquote",
            BlockType::List => "list",
            BlockType::CodeBlock => "code_block",
            BlockType::Callout => "callout",
            BlockType::Table => "table",
            BlockType::Image => "image",
            BlockType::Wikilink => "wikilink",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admonition kinds recognized inside `[!TYPE]` markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CalloutKind {
    Warning,
    Danger,
    Note,
    Tip,
    Info,
    Caution,
}

impl CalloutKind {
    pub const ALL: [CalloutKind; 6] = [
        CalloutKind::Warning,
        CalloutKind::Danger,
        CalloutKind::Note,
        CalloutKind::Tip,
        CalloutKind::Info,
        CalloutKind::Caution,
    ];

    /// The upper-case tag as written in source markup.
    pub fn tag(&self) -> &'static str {
        match self {
            CalloutKind::Warning => "WARNING",
            CalloutKind::Danger => "DANGER",
            CalloutKind::Note => "NOTE",
            CalloutKind::Tip => "TIP",
            CalloutKind::Info => "INFO",
            CalloutKind::Caution => "CAUTION",
        }
    }

    /// Title-case label used when a callout has no explicit title.
    pub fn label(&self) -> &'static str {
        match self {
            CalloutKind::Warning => "Warning",
            CalloutKind::Danger => "Danger",
            CalloutKind::Note => "Note",
            CalloutKind::Tip => "Tip",
            CalloutKind::Info => "Info",
            CalloutKind::Caution => "Caution",
        }
    }
}

impl FromStr for CalloutKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        CalloutKind::ALL
            .into_iter()
            .find(|kind| kind.tag() == upper)
            .ok_or_else(|| format!("unknown callout type '{}'", s))
    }
}

impl fmt::Display for CalloutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Ordered,
    Unordered,
}

/// One top-level structural element of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: u8,
        text: String,
        anchor: Option<String>,
    },
    Paragraph {
        text: String,
        /// Set when the paragraph came from a block quote without a callout marker.
        #[serde(default)]
        quote: bool,
    },
    List {
        kind: ListKind,
        items: Vec<String>,
        start: Option<u32>,
    },
    CodeBlock {
        code: String,
        language: Option<String>,
    },
    Callout {
        kind: CalloutKind,
        title: Option<String>,
        content: String,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
        caption: Option<String>,
    },
    Image {
        source: String,
        alt: String,
        caption: Option<String>,
    },
    Wikilink {
        target: String,
        display: Option<String>,
        /// `None` until resolved; stays `None` when no candidate was found.
        resolved: Option<PathBuf>,
        /// The original `[[...]]` text.
        token: String,
    },
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph {
            text: text.into(),
            quote: false,
        }
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            level,
            text: text.into(),
            anchor: None,
        }
    }

    /// The immutable dispatch tag of this block.
    ///
    /// Quoted paragraphs report [`BlockType::Blockquote`] so style lookups can
    /// tell them apart; they are still `Block::Paragraph` values.
    pub fn block_type(&self) -> BlockType {
        match self {
            Block::Heading { .. } => BlockType::Heading,
            Block::Paragraph { quote: true, .. } => BlockType::Blockquote,
            Block::Paragraph { .. } => BlockType::Paragraph,
            Block::List { .. } => BlockType::List,
            Block::CodeBlock { .. } => BlockType::CodeBlock,
            Block::Callout { .. } => BlockType::Callout,
            Block::Table { .. } => BlockType::Table,
            Block::Image { .. } => BlockType::Image,
            Block::Wikilink { .. } => BlockType::Wikilink,
        }
    }

    /// Secondary style-map key: heading level or callout type.
    pub fn style_sub_key(&self) -> Option<String> {
        match self {
            Block::Heading { level, .. } => Some(level.to_string()),
            Block::Callout { kind, .. } => Some(kind.tag().to_string()),
            _ => None,
        }
    }
}
