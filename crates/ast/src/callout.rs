//! `> [!TYPE] Optional title` admonitions.

use crate::parser::block_text;
use folio_types::{Block, CalloutKind};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static CALLOUT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[!([A-Za-z]+)\][+-]?\s*(.*)$").expect("callout marker regex")
});

#[derive(Debug, Clone, PartialEq)]
pub enum CalloutMatch {
    Callout(Block),
    /// A `[!...]` marker whose type is not one of the recognized kinds.
    UnknownType(String),
    NoMarker,
}

/// Inspects the first line of a block quote for a callout marker.
///
/// Text after the marker on the same line is the title when more content
/// follows, otherwise it is the content. Every later line and block is content.
pub fn detect_callout(quote_blocks: &[Value]) -> CalloutMatch {
    let Some(first) = quote_blocks.first() else {
        return CalloutMatch::NoMarker;
    };
    let first_text = block_text(first);
    let (marker_line, rest) = match first_text.split_once('\n') {
        Some((line, rest)) => (line, rest),
        None => (first_text.as_str(), ""),
    };
    let Some(caps) = CALLOUT_MARKER.captures(marker_line) else {
        return CalloutMatch::NoMarker;
    };
    let marker = &caps[1];
    let Ok(kind) = marker.parse::<CalloutKind>() else {
        return CalloutMatch::UnknownType(marker.to_string());
    };

    let inline_title = caps[2].trim().to_string();
    let content = std::iter::once(rest.to_string())
        .chain(quote_blocks[1..].iter().map(block_text))
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let (title, content) = match (inline_title.is_empty(), content.is_empty()) {
        (true, _) => (None, content),
        (false, true) => (None, inline_title),
        (false, false) => (Some(inline_title), content),
    };
    CalloutMatch::Callout(Block::Callout {
        kind,
        title,
        content,
    })
}
