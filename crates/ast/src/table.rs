//! Normalizes Pandoc tables into a header row plus rectangular body rows.
//!
//! Two payload shapes exist. Pandoc 2.10 and later emit
//! `[attr, caption, colspecs, head, bodies, foot]`; older versions emit
//! `[caption inlines, aligns, widths, header cells, rows]`.

use crate::error::{Diagnostics, ParseWarning};
use crate::inline::flatten_inlines;
use crate::node::{as_slice, Node};
use crate::parser::block_text;
use folio_types::Block;
use serde_json::Value;

/// Cell text: the cell's blocks flattened and joined by newlines.
fn cells_text(blocks: &[Value]) -> String {
    blocks
        .iter()
        .map(block_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Upper bound on a column span when the table declares no column specs.
const MAX_SPAN: usize = 256;

/// A modern row is `[attr, [cell]]`; a cell is `[attr, align, rowspan, colspan, blocks]`.
/// Column spans are expanded with empty cells so widths line up, never past `columns`.
fn modern_row(row: &Value, columns: usize) -> Vec<String> {
    let mut out = Vec::new();
    for cell in as_slice(row.get(1)) {
        out.push(cells_text(as_slice(cell.get(4))));
        let colspan = cell
            .get(3)
            .and_then(Value::as_u64)
            .map_or(1, |span| usize::try_from(span).unwrap_or(usize::MAX))
            .clamp(1, columns);
        out.resize(out.len() + colspan - 1, String::new());
    }
    out
}

fn modern_rows(rows: Option<&Value>, columns: usize) -> Vec<Vec<String>> {
    as_slice(rows).iter().map(|row| modern_row(row, columns)).collect()
}

struct RawTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    caption: Option<String>,
}

fn parse_modern(parts: &[Value]) -> Option<RawTable> {
    let caption = cells_text(as_slice(parts.get(1)?.get(1)));
    let columns = match as_slice(parts.get(2)).len() {
        0 => MAX_SPAN,
        declared => declared,
    };
    let mut head_rows = modern_rows(parts.get(3)?.get(1), columns);
    let header = if head_rows.is_empty() { Vec::new() } else { head_rows.remove(0) };

    // Extra header rows are kept as data so nothing is lost.
    let mut rows = head_rows;
    for body in as_slice(parts.get(4)) {
        rows.extend(modern_rows(body.get(2), columns));
        rows.extend(modern_rows(body.get(3), columns));
    }
    rows.extend(modern_rows(parts.get(5).and_then(|foot| foot.get(1)), columns));

    Some(RawTable {
        header,
        rows,
        caption: (!caption.is_empty()).then_some(caption),
    })
}

fn parse_legacy(parts: &[Value]) -> Option<RawTable> {
    let caption = flatten_inlines(as_slice(parts.first()));
    let header: Vec<String> = parts
        .get(3)?
        .as_array()?
        .iter()
        .map(|cell| cells_text(as_slice(Some(cell))))
        .collect();
    let rows = parts
        .get(4)?
        .as_array()?
        .iter()
        .map(|row| {
            as_slice(Some(row))
                .iter()
                .map(|cell| cells_text(as_slice(Some(cell))))
                .collect()
        })
        .collect();
    // Legacy headerless tables carry a row of empty cells.
    let header = if header.iter().all(String::is_empty) { Vec::new() } else { header };
    Some(RawTable {
        header,
        rows,
        caption: (!caption.is_empty()).then_some(caption),
    })
}

/// Pads short rows and truncates long ones to `width`, one warning per row touched.
fn rectangularize(rows: &mut [Vec<String>], width: usize, diagnostics: &mut Diagnostics) {
    for (index, row) in rows.iter_mut().enumerate() {
        let cells = row.len();
        if cells < width {
            row.resize(width, String::new());
            diagnostics.warn(ParseWarning::TableRowPadded { row: index + 1, cells, width });
        } else if cells > width {
            row.truncate(width);
            diagnostics.warn(ParseWarning::TableRowTruncated { row: index + 1, cells, width });
        }
    }
}

/// Converts a `Table` node into a [`Block::Table`].
///
/// The header fixes the column count; without a header the widest row does.
pub(crate) fn normalize_table(node: Node<'_>, diagnostics: &mut Diagnostics) -> Option<Block> {
    let parts = node.items();
    let raw = match parts.len() {
        6 => parse_modern(parts),
        5 => parse_legacy(parts),
        _ => None,
    };
    let Some(RawTable { header, mut rows, caption }) = raw else {
        diagnostics.warn(ParseWarning::MalformedNode {
            node_type: "Table".to_string(),
            reason: format!("unexpected payload with {} element(s)", parts.len()),
        });
        return None;
    };

    let width = if header.is_empty() {
        rows.iter().map(Vec::len).max().unwrap_or(0)
    } else {
        header.len()
    };
    rectangularize(&mut rows, width, diagnostics);

    Some(Block::Table { header, rows, caption })
}
