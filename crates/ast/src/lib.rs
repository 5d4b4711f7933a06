//! Converts the Pandoc JSON syntax tree into the folio block model.
//!
//! [`parse_blocks`] is total: anything it cannot convert is skipped and
//! reported as a [`ParseWarning`]. Wikilinks are resolved in a second pass
//! against a [`LinkRegistry`] snapshot.

pub mod callout;
pub mod error;
pub mod inline;
pub mod node;
pub mod parser;
mod table;
pub mod wikilink;

pub use callout::{detect_callout, CalloutMatch};
pub use error::{ParseError, ParseWarning};
pub use inline::flatten_inlines;
pub use node::{Attr, Node, SyntaxTree};
pub use parser::{parse_blocks, parse_json, ParseOutcome};
pub use wikilink::{
    inline_wikilinks, parse_wikilink, resolve_wikilinks, split_anchor, LinkRegistry, MatchStrategy, Resolution,
    WikilinkToken,
};
