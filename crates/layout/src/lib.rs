//! Page design extraction: Scribus SLA geometry in, positioning CSS out.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed design file: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("Design file has no DOCUMENT element.")]
    NoDocument,
    #[error("{element} '{name}' is missing the {attribute} attribute.")]
    MissingAttribute {
        element: &'static str,
        name: String,
        attribute: &'static str,
    },
    #[error("{element} '{name}' has a non-numeric {attribute}: '{value}'.")]
    InvalidNumber {
        element: &'static str,
        name: String,
        attribute: &'static str,
        value: String,
    },
    #[error("Invalid CSS: {0}")]
    InvalidCss(String),
}

pub mod css;
pub mod sla;

pub use css::{build_layout_css, merge_stylesheets, sanitize_class_name, validate_css, CssOptions};
pub use sla::{extract_layout, extract_layout_file};
