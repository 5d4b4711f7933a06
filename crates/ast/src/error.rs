use std::fmt;
use thiserror::Error;

/// Fatal problems with the syntax tree as a whole.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Syntax tree is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid syntax tree: {0}")]
    InvalidTree(String),
}

/// Recoverable problems. Parsing continues; each one is logged once when recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseWarning {
    UnsupportedNode { node_type: String },
    MalformedNode { node_type: String, reason: String },
    UnknownCalloutType { marker: String },
    TableRowPadded { row: usize, cells: usize, width: usize },
    TableRowTruncated { row: usize, cells: usize, width: usize },
    UnresolvedLink { token: String },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::UnsupportedNode { node_type } => {
                write!(f, "Unsupported block type '{}' skipped", node_type)
            }
            ParseWarning::MalformedNode { node_type, reason } => {
                write!(f, "Malformed '{}' node skipped: {}", node_type, reason)
            }
            ParseWarning::UnknownCalloutType { marker } => {
                write!(f, "Unknown callout type '[!{}]', rendering as a quote", marker)
            }
            ParseWarning::TableRowPadded { row, cells, width } => {
                write!(f, "Table row {} has {} cell(s), padded to {}", row, cells, width)
            }
            ParseWarning::TableRowTruncated { row, cells, width } => {
                write!(f, "Table row {} has {} cell(s), truncated to {}", row, cells, width)
            }
            ParseWarning::UnresolvedLink { token } => {
                write!(f, "Unresolved wikilink {}", token)
            }
        }
    }
}

/// Collects warnings and logs each one as it arrives.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    warnings: Vec<ParseWarning>,
}

impl Diagnostics {
    pub(crate) fn warn(&mut self, warning: ParseWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub(crate) fn into_inner(self) -> Vec<ParseWarning> {
        self.warnings
    }
}
