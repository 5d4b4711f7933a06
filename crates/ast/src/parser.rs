//! Block dispatch: one block-model node per top-level syntax-tree node.

use crate::callout::{detect_callout, CalloutMatch};
use crate::error::{Diagnostics, ParseError, ParseWarning};
use crate::inline::{flatten_inlines, sole_inline, InlineImage};
use crate::node::{as_slice, Attr, Node, SyntaxTree};
use crate::table::normalize_table;
use crate::wikilink::parse_wikilink;
use folio_types::{Block, ListKind};
use log::debug;
use serde_json::Value;

/// Blocks produced from a tree plus every recoverable problem met on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    pub blocks: Vec<Block>,
    pub warnings: Vec<ParseWarning>,
}

/// Parses the top-level blocks of `tree`. Never fails: unsupported or
/// malformed nodes are skipped with one warning each.
pub fn parse_blocks(tree: &SyntaxTree) -> ParseOutcome {
    let mut diagnostics = Diagnostics::default();
    let mut blocks = Vec::with_capacity(tree.blocks.len());
    for value in &tree.blocks {
        let Some(node) = Node::from_value(value) else {
            diagnostics.warn(ParseWarning::MalformedNode {
                node_type: "<untagged>".to_string(),
                reason: "node is not an object with a 't' tag".to_string(),
            });
            continue;
        };
        if let Some(block) = parse_block(node, &mut diagnostics) {
            blocks.push(block);
        }
    }
    debug!("Parsed {} block(s) from {} node(s)", blocks.len(), tree.blocks.len());
    ParseOutcome {
        blocks,
        warnings: diagnostics.into_inner(),
    }
}

/// Convenience wrapper for raw tool output.
pub fn parse_json(text: &str) -> Result<ParseOutcome, ParseError> {
    Ok(parse_blocks(&SyntaxTree::from_json_str(text)?))
}

fn malformed(node: Node<'_>, reason: &str, diagnostics: &mut Diagnostics) -> Option<Block> {
    diagnostics.warn(ParseWarning::MalformedNode {
        node_type: node.tag.to_string(),
        reason: reason.to_string(),
    });
    None
}

fn parse_block(node: Node<'_>, diagnostics: &mut Diagnostics) -> Option<Block> {
    match node.tag {
        "Header" => parse_header(node, diagnostics),
        "Para" | "Plain" => parse_paragraph(node.items()),
        "BulletList" => Some(Block::List {
            kind: ListKind::Unordered,
            items: node.items().iter().map(|item| item_text(as_slice(Some(item)))).collect(),
            start: None,
        }),
        "OrderedList" => parse_ordered_list(node, diagnostics),
        "CodeBlock" => {
            let Some(code) = node.arg(1).and_then(Value::as_str) else {
                return malformed(node, "missing code text", diagnostics);
            };
            let attr = Attr::from_value(node.arg(0).unwrap_or(&Value::Null));
            Some(Block::CodeBlock {
                code: code.to_string(),
                language: attr.classes.into_iter().next(),
            })
        }
        "BlockQuote" => match detect_callout(node.items()) {
            CalloutMatch::Callout(block) => Some(block),
            CalloutMatch::UnknownType(marker) => {
                diagnostics.warn(ParseWarning::UnknownCalloutType { marker });
                Some(quote_paragraph(node.items()))
            }
            CalloutMatch::NoMarker => Some(quote_paragraph(node.items())),
        },
        "Table" => normalize_table(node, diagnostics),
        "Figure" => parse_figure(node, diagnostics),
        other => {
            diagnostics.warn(ParseWarning::UnsupportedNode {
                node_type: other.to_string(),
            });
            None
        }
    }
}

fn parse_header(node: Node<'_>, diagnostics: &mut Diagnostics) -> Option<Block> {
    let Some(level) = node.arg(0).and_then(Value::as_u64) else {
        return malformed(node, "missing heading level", diagnostics);
    };
    let attr = Attr::from_value(node.arg(1).unwrap_or(&Value::Null));
    Some(Block::Heading {
        level: level.clamp(1, 6) as u8,
        text: flatten_inlines(as_slice(node.arg(2))),
        anchor: (!attr.id.is_empty()).then_some(attr.id),
    })
}

fn parse_ordered_list(node: Node<'_>, diagnostics: &mut Diagnostics) -> Option<Block> {
    let Some(items) = node.arg(1).and_then(Value::as_array) else {
        return malformed(node, "missing list items", diagnostics);
    };
    let start = node
        .arg(0)
        .and_then(|attrs| attrs.get(0))
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok());
    Some(Block::List {
        kind: ListKind::Ordered,
        items: items.iter().map(|item| item_text(as_slice(Some(item)))).collect(),
        start,
    })
}

/// Special paragraph shapes first: a lone wikilink, an `![[embed]]`, a lone
/// image. Everything else is plain text.
fn parse_paragraph(inlines: &[Value]) -> Option<Block> {
    if let Some(node) = sole_inline(inlines) {
        match node.tag {
            "Image" => {
                if let Some(image) = InlineImage::from_node(node) {
                    let caption = image
                        .title
                        .starts_with("fig:")
                        .then(|| image.alt.clone())
                        .filter(|alt| !alt.is_empty());
                    return Some(Block::Image {
                        source: image.source,
                        alt: image.alt,
                        caption,
                    });
                }
            }
            "Link" => {
                if let Some(block) = wikilink_from_link(node) {
                    return Some(block);
                }
            }
            _ => {}
        }
    }

    let text = flatten_inlines(inlines);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(embed) = trimmed.strip_prefix('!')
        && let Some(token) = parse_wikilink(embed)
    {
        return Some(Block::Image {
            source: token.target,
            alt: token.display.unwrap_or_default(),
            caption: None,
        });
    }
    if let Some(token) = parse_wikilink(trimmed) {
        return Some(token.into_block());
    }
    Some(Block::paragraph(text))
}

/// Links emitted by wikilink-aware readers carry a `wikilink` class.
fn wikilink_from_link(node: Node<'_>) -> Option<Block> {
    let attr = Attr::from_value(node.arg(0)?);
    if !attr.classes.iter().any(|c| c == "wikilink") {
        return None;
    }
    let target = node.arg(2)?.get(0)?.as_str()?.trim().to_string();
    if target.is_empty() {
        return None;
    }
    let text = flatten_inlines(as_slice(node.arg(1)));
    let display = (!text.is_empty() && text != target).then_some(text);
    let token = match &display {
        Some(d) => format!("[[{}|{}]]", target, d),
        None => format!("[[{}]]", target),
    };
    Some(Block::Wikilink {
        target,
        display,
        resolved: None,
        token,
    })
}

fn parse_figure(node: Node<'_>, diagnostics: &mut Diagnostics) -> Option<Block> {
    let caption = node
        .arg(1)
        .and_then(|c| c.get(1))
        .map(|blocks| join_blocks(as_slice(Some(blocks))))
        .filter(|c| !c.is_empty());
    let Some(image) = as_slice(node.arg(2)).iter().find_map(first_image) else {
        return malformed(node, "figure without an image", diagnostics);
    };
    Some(Block::Image {
        source: image.source,
        alt: image.alt,
        caption,
    })
}

fn first_image(block: &Value) -> Option<InlineImage> {
    let node = Node::from_value(block)?;
    match node.tag {
        "Para" | "Plain" => node
            .items()
            .iter()
            .filter_map(Node::from_value)
            .find_map(InlineImage::from_node),
        _ => None,
    }
}

fn quote_paragraph(blocks: &[Value]) -> Block {
    Block::Paragraph {
        text: join_blocks(blocks),
        quote: true,
    }
}

fn join_blocks(blocks: &[Value]) -> String {
    blocks
        .iter()
        .map(block_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text of one list item: every block child contributes, nested list items
/// contribute one line each.
fn item_text(blocks: &[Value]) -> String {
    join_blocks(blocks)
}

fn list_lines(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| item_text(as_slice(Some(item))))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Plain text of any block node, used for quotes, cells and list items.
pub(crate) fn block_text(value: &Value) -> String {
    let Some(node) = Node::from_value(value) else {
        return String::new();
    };
    match node.tag {
        "Para" | "Plain" => flatten_inlines(node.items()),
        "Header" => flatten_inlines(as_slice(node.arg(2))),
        "CodeBlock" => node.arg(1).and_then(Value::as_str).unwrap_or("").to_string(),
        "BulletList" => list_lines(node.items()),
        "OrderedList" => list_lines(as_slice(node.arg(1))),
        "BlockQuote" => join_blocks(node.items()),
        "Div" => join_blocks(as_slice(node.arg(1))),
        "LineBlock" => node
            .items()
            .iter()
            .map(|line| flatten_inlines(as_slice(Some(line))))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::CalloutKind;
    use serde_json::json;

    fn str_inlines(text: &str) -> Vec<Value> {
        let mut out = Vec::new();
        for (i, word) in text.split(' ').enumerate() {
            if i > 0 {
                out.push(json!({"t": "Space"}));
            }
            out.push(json!({"t": "Str", "c": word}));
        }
        out
    }

    fn para(text: &str) -> Value {
        json!({"t": "Para", "c": str_inlines(text)})
    }

    fn plain(text: &str) -> Value {
        json!({"t": "Plain", "c": str_inlines(text)})
    }

    fn parse(blocks: Vec<Value>) -> ParseOutcome {
        parse_blocks(&SyntaxTree::from_blocks(blocks))
    }

    #[test]
    fn test_heading_level_and_anchor() {
        let outcome = parse(vec![
            json!({"t": "Header", "c": [2, ["scope", [], []], str_inlines("Scope of work")]}),
            json!({"t": "Header", "c": [9, ["", [], []], str_inlines("Deep")]}),
        ]);
        assert!(outcome.warnings.is_empty());
        assert_eq!(
            outcome.blocks[0],
            Block::Heading {
                level: 2,
                text: "Scope of work".into(),
                anchor: Some("scope".into()),
            }
        );
        assert_eq!(outcome.blocks[1], Block::heading(6, "Deep"));
    }

    #[test]
    fn test_unsupported_nodes_warn_once_each() {
        let outcome = parse(vec![
            para("before"),
            json!({"t": "HorizontalRule"}),
            json!({"t": "RawBlock", "c": ["html", "<hr>"]}),
            json!("garbage"),
            para("after"),
        ]);
        assert_eq!(outcome.blocks.len(), 2);
        assert_eq!(outcome.warnings.len(), 3);
        assert_eq!(
            outcome.warnings[0],
            ParseWarning::UnsupportedNode { node_type: "HorizontalRule".into() }
        );
        assert!(matches!(outcome.warnings[2], ParseWarning::MalformedNode { .. }));
    }

    #[test]
    fn test_list_item_with_two_children_keeps_both() {
        let outcome = parse(vec![json!({"t": "BulletList", "c": [
            [plain("First line"), para("Second paragraph")],
            [plain("Single")]
        ]})]);
        assert_eq!(
            outcome.blocks[0],
            Block::List {
                kind: ListKind::Unordered,
                items: vec!["First line\nSecond paragraph".into(), "Single".into()],
                start: None,
            }
        );
    }

    #[test]
    fn test_nested_and_ordered_lists() {
        let nested = json!({"t": "BulletList", "c": [[plain("inner a")], [plain("inner b")]]});
        let outcome = parse(vec![json!({"t": "OrderedList", "c": [
            [3, {"t": "Decimal"}, {"t": "Period"}],
            [[plain("outer"), nested], [json!({"t": "CodeBlock", "c": [["", [], []], "make all"]})]]
        ]})]);
        assert_eq!(
            outcome.blocks[0],
            Block::List {
                kind: ListKind::Ordered,
                items: vec!["outer\ninner a\ninner b".into(), "make all".into()],
                start: Some(3),
            }
        );
    }

    #[test]
    fn test_code_block_language() {
        let outcome = parse(vec![json!({"t": "CodeBlock", "c": [["", ["rust", "numberLines"], []], "fn main() {}"]})]);
        assert_eq!(
            outcome.blocks[0],
            Block::CodeBlock {
                code: "fn main() {}".into(),
                language: Some("rust".into()),
            }
        );
    }

    #[test]
    fn test_callout_and_bogus_marker() {
        let warning = json!({"t": "BlockQuote", "c": [
            {"t": "Para", "c": [{"t": "Str", "c": "[!WARNING]"}, {"t": "SoftBreak"}, {"t": "Str", "c": "Text"}]}
        ]});
        let bogus = json!({"t": "BlockQuote", "c": [
            {"t": "Para", "c": [{"t": "Str", "c": "[!BOGUS]"}, {"t": "SoftBreak"}, {"t": "Str", "c": "Text"}]}
        ]});
        let outcome = parse(vec![warning, bogus]);
        assert_eq!(
            outcome.blocks[0],
            Block::Callout {
                kind: CalloutKind::Warning,
                title: None,
                content: "Text".into(),
            }
        );
        assert_eq!(
            outcome.blocks[1],
            Block::Paragraph {
                text: "[!BOGUS]\nText".into(),
                quote: true,
            }
        );
        assert_eq!(
            outcome.warnings,
            vec![ParseWarning::UnknownCalloutType { marker: "BOGUS".into() }]
        );
    }

    #[test]
    fn test_wikilink_paragraphs() {
        let outcome = parse(vec![
            para("[[SOP-200]]"),
            para("See [[SOP-200]] first"),
            json!({"t": "Para", "c": [
                {"t": "Link", "c": [["", ["wikilink"], []], [{"t": "Str", "c": "Cleaning"}], ["SOP-200", "wikilink"]]}
            ]}),
        ]);
        assert!(matches!(outcome.blocks[0], Block::Wikilink { ref target, .. } if target == "SOP-200"));
        assert_eq!(outcome.blocks[1], Block::paragraph("See [[SOP-200]] first"));
        match &outcome.blocks[2] {
            Block::Wikilink { target, display, token, .. } => {
                assert_eq!(target, "SOP-200");
                assert_eq!(display.as_deref(), Some("Cleaning"));
                assert_eq!(token, "[[SOP-200|Cleaning]]");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_image_shapes() {
        let inline = json!({"t": "Para", "c": [
            {"t": "Image", "c": [["", [], []], [{"t": "Str", "c": "Flow"}], ["img/flow.png", ""]]}
        ]});
        let figure = json!({"t": "Figure", "c": [
            ["", [], []],
            [null, [plain("Process overview")]],
            [{"t": "Plain", "c": [{"t": "Image", "c": [["", [], []], [{"t": "Str", "c": "Overview"}], ["img/overview.svg", ""]]}]}]
        ]});
        let outcome = parse(vec![inline, para("![[diagram.png]]"), figure]);
        assert!(outcome.warnings.is_empty());
        assert_eq!(
            outcome.blocks,
            vec![
                Block::Image { source: "img/flow.png".into(), alt: "Flow".into(), caption: None },
                Block::Image { source: "diagram.png".into(), alt: String::new(), caption: None },
                Block::Image {
                    source: "img/overview.svg".into(),
                    alt: "Overview".into(),
                    caption: Some("Process overview".into()),
                },
            ]
        );
    }

    #[test]
    fn test_malformed_supported_node_is_skipped() {
        let outcome = parse(vec![json!({"t": "Header", "c": "oops"}), para("ok")]);
        assert_eq!(outcome.blocks, vec![Block::paragraph("ok")]);
        assert!(matches!(
            outcome.warnings[0],
            ParseWarning::MalformedNode { ref node_type, .. } if node_type == "Header"
        ));
    }

    #[test]
    fn test_parse_json_rejects_invalid_tree() {
        assert!(parse_json("{\"meta\": {}}").is_err());
        let outcome = parse_json(r#"{"pandoc-api-version":[1,23],"meta":{},"blocks":[]}"#).unwrap();
        assert!(outcome.blocks.is_empty());
    }
}
