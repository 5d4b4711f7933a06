//! Builders for Pandoc JSON syntax trees.

use serde_json::{json, Value};

/// Splits text on spaces into `Str`/`Space` inlines.
pub fn inlines(text: &str) -> Vec<Value> {
    let mut out = Vec::new();
    for (i, word) in text.split(' ').enumerate() {
        if i > 0 {
            out.push(json!({"t": "Space"}));
        }
        out.push(json!({"t": "Str", "c": word}));
    }
    out
}

pub fn para(text: &str) -> Value {
    json!({"t": "Para", "c": inlines(text)})
}

pub fn plain(text: &str) -> Value {
    json!({"t": "Plain", "c": inlines(text)})
}

pub fn header(level: u8, text: &str) -> Value {
    json!({"t": "Header", "c": [level, ["", [], []], inlines(text)]})
}

pub fn bullet_list(items: Vec<Vec<Value>>) -> Value {
    json!({"t": "BulletList", "c": items})
}

/// A block quote whose first paragraph starts with `marker` followed by a soft break.
pub fn callout(marker: &str, body: &str) -> Value {
    let mut content = vec![json!({"t": "Str", "c": marker}), json!({"t": "SoftBreak"})];
    content.extend(inlines(body));
    json!({"t": "BlockQuote", "c": [{"t": "Para", "c": content}]})
}

/// A paragraph holding only a wikilink token.
pub fn wikilink(token: &str) -> Value {
    json!({"t": "Para", "c": [{"t": "Str", "c": token}]})
}

/// A paragraph holding only an image.
pub fn image(source: &str, alt: &str) -> Value {
    json!({"t": "Para", "c": [{"t": "Image", "c": [["", [], []], inlines(alt), [source, ""]]}]})
}

fn cell(text: &str) -> Value {
    json!([["", [], []], {"t": "AlignDefault"}, 1, 1, [plain(text)]])
}

fn row(cells: &[&str]) -> Value {
    json!([["", [], []], cells.iter().map(|c| cell(c)).collect::<Vec<_>>()])
}

/// A Pandoc 3 table with one header row.
pub fn table(header: &[&str], body: &[&[&str]]) -> Value {
    json!({"t": "Table", "c": [
        ["", [], []],
        [null, []],
        [],
        [["", [], []], [row(header)]],
        [[["", [], []], 0, [], body.iter().map(|r| row(r)).collect::<Vec<_>>()]],
        [["", [], []], []]
    ]})
}

pub fn document(blocks: Vec<Value>) -> Value {
    json!({"pandoc-api-version": [1, 23, 1], "meta": {}, "blocks": blocks})
}
