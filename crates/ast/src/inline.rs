//! Reduces nested inline markup to plain text.

use crate::node::{as_slice, Node};
use serde_json::Value;

/// Flattens a list of inline nodes.
///
/// Formatting wrappers are unwrapped, links and images contribute their text,
/// both soft and hard line breaks become `\n`. Footnotes and raw inlines are
/// dropped.
pub fn flatten_inlines(inlines: &[Value]) -> String {
    let mut out = String::new();
    push_inlines(inlines, &mut out);
    out
}

fn push_inlines(inlines: &[Value], out: &mut String) {
    for value in inlines {
        if let Some(node) = Node::from_value(value) {
            push_inline(node, out);
        }
    }
}

fn push_inline(node: Node<'_>, out: &mut String) {
    match node.tag {
        "Str" => {
            if let Some(text) = node.content.as_str() {
                out.push_str(text);
            }
        }
        "Space" => out.push(' '),
        "SoftBreak" | "LineBreak" => out.push('\n'),
        "Emph" | "Strong" | "Strikeout" | "Superscript" | "Subscript" | "SmallCaps"
        | "Underline" => push_inlines(node.items(), out),
        "Quoted" => {
            let quote = match node.arg(0).and_then(|q| q.get("t")).and_then(Value::as_str) {
                Some("SingleQuote") => '\'',
                _ => '"',
            };
            out.push(quote);
            push_inlines(as_slice(node.arg(1)), out);
            out.push(quote);
        }
        "Code" | "Math" => {
            if let Some(text) = node.arg(1).and_then(Value::as_str) {
                out.push_str(text);
            }
        }
        "Link" | "Image" | "Span" | "Cite" => push_inlines(as_slice(node.arg(1)), out),
        _ => {}
    }
}

/// An image inline: `[attr, alt inlines, [url, title]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub source: String,
    pub alt: String,
    pub title: String,
}

impl InlineImage {
    pub fn from_node(node: Node<'_>) -> Option<Self> {
        if node.tag != "Image" {
            return None;
        }
        let target = node.arg(2)?.as_array()?;
        Some(Self {
            source: target.first()?.as_str()?.to_string(),
            alt: flatten_inlines(as_slice(node.arg(1))),
            title: target.get(1).and_then(Value::as_str).unwrap_or("").to_string(),
        })
    }
}

/// The single non-whitespace inline of a paragraph, if there is exactly one.
pub(crate) fn sole_inline(inlines: &[Value]) -> Option<Node<'_>> {
    let mut significant = inlines
        .iter()
        .filter_map(Node::from_value)
        .filter(|n| !matches!(n.tag, "Space" | "SoftBreak" | "LineBreak"));
    let first = significant.next()?;
    significant.next().is_none().then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_formatting() {
        let inlines = json!([
            {"t": "Str", "c": "Wear"},
            {"t": "Space"},
            {"t": "Strong", "c": [{"t": "Emph", "c": [{"t": "Str", "c": "gloves"}]}]},
            {"t": "Str", "c": "."}
        ]);
        assert_eq!(flatten_inlines(inlines.as_array().unwrap()), "Wear gloves.");
    }

    #[test]
    fn test_breaks_become_newlines() {
        let inlines = json!([
            {"t": "Str", "c": "one"},
            {"t": "SoftBreak"},
            {"t": "Str", "c": "two"},
            {"t": "LineBreak"},
            {"t": "Str", "c": "three"}
        ]);
        assert_eq!(flatten_inlines(inlines.as_array().unwrap()), "one\ntwo\nthree");
    }

    #[test]
    fn test_links_code_and_quotes() {
        let inlines = json!([
            {"t": "Link", "c": [["", [], []], [{"t": "Str", "c": "the"}, {"t": "Space"}, {"t": "Str", "c": "site"}], ["https://x", ""]]},
            {"t": "Space"},
            {"t": "Code", "c": [["", [], []], "cargo run"]},
            {"t": "Space"},
            {"t": "Quoted", "c": [{"t": "DoubleQuote"}, [{"t": "Str", "c": "hi"}]]},
            {"t": "Note", "c": [{"t": "Para", "c": [{"t": "Str", "c": "footnote"}]}]}
        ]);
        assert_eq!(
            flatten_inlines(inlines.as_array().unwrap()),
            "the site cargo run \"hi\""
        );
    }

    #[test]
    fn test_inline_image_fields() {
        let value = json!({"t": "Image", "c": [["", [], []], [{"t": "Str", "c": "Flow"}], ["img/flow.png", "fig:"]]});
        let image = InlineImage::from_node(Node::from_value(&value).unwrap()).unwrap();
        assert_eq!(image.source, "img/flow.png");
        assert_eq!(image.alt, "Flow");
        assert_eq!(image.title, "fig:");
    }

    #[test]
    fn test_sole_inline_ignores_spacing() {
        let inlines = json!([{"t": "Space"}, {"t": "Str", "c": "[[SOP-200]]"}, {"t": "SoftBreak"}]);
        let node = sole_inline(inlines.as_array().unwrap()).unwrap();
        assert_eq!(node.tag, "Str");
        let two = json!([{"t": "Str", "c": "a"}, {"t": "Str", "c": "b"}]);
        assert!(sole_inline(two.as_array().unwrap()).is_none());
    }
}
