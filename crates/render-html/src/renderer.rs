use crate::anchors::AnchorSet;
use folio_style::StyleMap;
use folio_types::{Block, Document, ListKind};
use html_escape::{encode_double_quoted_attribute, encode_text};
use log::{debug, warn};
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;

/// Why a single block could not be turned into markup. The document still renders.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockRenderError {
    #[error("heading level {0} is outside 1-6")]
    HeadingLevel(u8),
    #[error("image has an empty source")]
    EmptyImageSource,
    #[error("wikilink has an empty target")]
    EmptyLinkTarget,
}

/// The class used when the style map has no entry for a block.
pub fn default_class(block: &Block) -> String {
    match block {
        Block::Heading { level, .. } => format!("heading-{}", level),
        Block::Paragraph { quote: false, .. } => "paragraph".to_string(),
        Block::Paragraph { quote: true, .. } => "blockquote".to_string(),
        Block::List { .. } => "list".to_string(),
        Block::CodeBlock { .. } => "code-block".to_string(),
        Block::Callout { kind, .. } => format!("callout callout-{}", kind.tag().to_lowercase()),
        Block::Table { .. } => "data-table".to_string(),
        Block::Image { .. } => "figure".to_string(),
        Block::Wikilink { resolved: Some(_), .. } => "wikilink".to_string(),
        Block::Wikilink { resolved: None, .. } => "wikilink wikilink-unresolved".to_string(),
    }
}

fn text(value: &str) -> String {
    encode_text(value).into_owned()
}

fn attr(value: &str) -> String {
    encode_double_quoted_attribute(value).into_owned()
}

/// Escaped text with line breaks kept visible.
fn lines(value: &str) -> String {
    value.lines().map(text).collect::<Vec<_>>().join("<br>\n")
}

#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    styles: StyleMap,
    stylesheets: Vec<String>,
}

impl HtmlRenderer {
    pub fn new(styles: StyleMap) -> Self {
        Self {
            styles,
            stylesheets: Vec::new(),
        }
    }

    /// Adds a `<link rel="stylesheet">` to the head. Links keep insertion order.
    pub fn with_stylesheet(mut self, href: impl Into<String>) -> Self {
        self.stylesheets.push(href.into());
        self
    }

    fn class_for(&self, block: &Block) -> String {
        match self.styles.class_for(block) {
            Some(class) => class.to_string(),
            None => default_class(block),
        }
    }

    /// Renders a full HTML document: head, metadata header, then the blocks
    /// in order. Blocks that fail are replaced by a comment.
    pub fn render(&self, document: &Document) -> String {
        let mut html = String::with_capacity(4096);
        let title = document
            .metadata
            .title
            .as_deref()
            .unwrap_or_else(|| document.id());

        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(html, "<title>{}</title>", text(title));
        for href in &self.stylesheets {
            let _ = writeln!(html, "<link rel=\"stylesheet\" href=\"{}\">", attr(href));
        }
        html.push_str("</head>\n<body>\n");

        html.push_str(&self.render_header(document));
        html.push_str("<main>\n");
        let mut anchors = AnchorSet::new();
        let mut failed = 0usize;
        for (index, block) in document.blocks.iter().enumerate() {
            match self.render_block(block, &mut anchors) {
                Ok(fragment) => html.push_str(&fragment),
                Err(e) => {
                    failed += 1;
                    warn!(
                        "[{}] Block {} ({}) not rendered: {}",
                        document.id(),
                        index,
                        block.block_type().as_str(),
                        e
                    );
                    let note = format!("block {} ({}) not rendered: {}", index, block.block_type().as_str(), e);
                    let _ = writeln!(html, "<!-- {} -->", note.replace("--", "- -"));
                }
            }
        }
        html.push_str("</main>\n</body>\n</html>\n");
        debug!(
            "[{}] Rendered {} block(s), {} placeholder(s)",
            document.id(),
            document.blocks.len(),
            failed
        );
        html
    }

    /// `<header class="doc-meta">` with id, title, revision, author, date.
    pub fn render_header(&self, document: &Document) -> String {
        let fields = document.metadata.header_fields();
        if fields.is_empty() {
            return String::new();
        }
        let mut out = String::from("<header class=\"doc-meta\">\n");
        for (key, value) in fields {
            let _ = writeln!(
                out,
                "<div class=\"doc-meta-field doc-meta-{}\"><span class=\"doc-meta-label\">{}</span> <span class=\"doc-meta-value\">{}</span></div>",
                key,
                label(key),
                text(value)
            );
        }
        out.push_str("</header>\n");
        out
    }

    pub fn render_block(&self, block: &Block, anchors: &mut AnchorSet) -> Result<String, BlockRenderError> {
        let class = attr(&self.class_for(block));
        let mut out = String::new();
        match block {
            Block::Heading { level, text: content, anchor } => {
                if !(1..=6).contains(level) {
                    return Err(BlockRenderError::HeadingLevel(*level));
                }
                let id = anchors
                    .claim(anchor.as_deref(), content)
                    .map(|id| format!(" id=\"{}\"", attr(&id)))
                    .unwrap_or_default();
                let _ = writeln!(out, "<h{l}{id} class=\"{class}\">{t}</h{l}>", l = level, t = text(content));
            }
            Block::Paragraph { text: content, .. } => {
                let _ = writeln!(out, "<p class=\"{}\">{}</p>", class, lines(content));
            }
            Block::List { kind, items, start } => {
                let tag = match kind {
                    ListKind::Ordered => "ol",
                    ListKind::Unordered => "ul",
                };
                let start_attr = match (kind, start) {
                    (ListKind::Ordered, Some(n)) if *n != 1 => format!(" start=\"{}\"", n),
                    _ => String::new(),
                };
                let _ = writeln!(out, "<{}{} class=\"{}\">", tag, start_attr, class);
                for item in items {
                    let _ = writeln!(out, "<li>{}</li>", lines(item));
                }
                let _ = writeln!(out, "</{}>", tag);
            }
            Block::CodeBlock { code, language } => {
                let code_class = language
                    .as_deref()
                    .map(|l| format!(" class=\"language-{}\"", attr(l)))
                    .unwrap_or_default();
                let _ = writeln!(out, "<pre class=\"{}\"><code{}>{}</code></pre>", class, code_class, text(code));
            }
            Block::Callout { kind, title, content } => {
                let heading = title.as_deref().unwrap_or_else(|| kind.label());
                let _ = writeln!(out, "<div class=\"{}\">", class);
                let _ = writeln!(out, "<p class=\"callout-title\">{}</p>", text(heading));
                if !content.is_empty() {
                    let _ = writeln!(out, "<p class=\"callout-content\">{}</p>", lines(content));
                }
                out.push_str("</div>\n");
            }
            Block::Table { header, rows, caption } => {
                let _ = writeln!(out, "<table class=\"{}\">", class);
                if let Some(caption) = caption {
                    let _ = writeln!(out, "<caption>{}</caption>", text(caption));
                }
                if !header.is_empty() {
                    out.push_str("<thead>\n<tr>");
                    for cell in header {
                        let _ = write!(out, "<th>{}</th>", lines(cell));
                    }
                    out.push_str("</tr>\n</thead>\n");
                }
                out.push_str("<tbody>\n");
                for row in rows {
                    out.push_str("<tr>");
                    for cell in row {
                        let _ = write!(out, "<td>{}</td>", lines(cell));
                    }
                    out.push_str("</tr>\n");
                }
                out.push_str("</tbody>\n</table>\n");
            }
            Block::Image { source, alt, caption } => {
                if source.trim().is_empty() {
                    return Err(BlockRenderError::EmptyImageSource);
                }
                let _ = writeln!(out, "<figure class=\"{}\">", class);
                let _ = writeln!(out, "<img src=\"{}\" alt=\"{}\">", attr(source), attr(alt));
                if let Some(caption) = caption {
                    let _ = writeln!(out, "<figcaption>{}</figcaption>", text(caption));
                }
                out.push_str("</figure>\n");
            }
            Block::Wikilink { target, display, resolved, token } => {
                if target.trim().is_empty() {
                    return Err(BlockRenderError::EmptyLinkTarget);
                }
                let label = display.as_deref().unwrap_or(target);
                match resolved {
                    Some(path) => {
                        let _ = writeln!(
                            out,
                            "<p><a class=\"{}\" href=\"{}\">{}</a></p>",
                            class,
                            attr(&link_href(path, target)),
                            text(label)
                        );
                    }
                    None => {
                        let _ = writeln!(
                            out,
                            "<p><span class=\"{}\" title=\"Unresolved link {}\">{}</span></p>",
                            class,
                            attr(token),
                            text(label)
                        );
                    }
                }
            }
        }
        Ok(out)
    }
}

fn label(key: &str) -> &'static str {
    match key {
        "id" => "Document ID",
        "title" => "Title",
        "revision" => "Revision",
        "author" => "Author",
        "date" => "Date",
        _ => "",
    }
}

/// Joins a resolved path with the `#anchor` part of the original target.
fn link_href(path: &Path, target: &str) -> String {
    let anchor = target.split_once('#').map(|(_, a)| a).filter(|a| !a.is_empty());
    let base = path.to_string_lossy().replace('\\', "/");
    match anchor {
        Some(anchor) => format!("{}#{}", base, anchor),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::{BlockType, CalloutKind, DocumentMetadata};
    use std::path::PathBuf;

    fn document(blocks: Vec<Block>) -> Document {
        Document::new(
            DocumentMetadata {
                document_id: Some("SOP-001".into()),
                title: Some("Safety & Handling".into()),
                revision: Some("B".into()),
                date: Some("2024-05-01".into()),
                ..DocumentMetadata::default()
            },
            blocks,
        )
    }

    #[test]
    fn test_escapes_text() {
        let html = HtmlRenderer::default().render(&document(vec![Block::paragraph("a < b & \"c\"")]));
        assert!(html.contains("<p class=\"paragraph\">a &lt; b &amp; \"c\"</p>"));
        assert!(html.contains("<title>Safety &amp; Handling</title>"));
    }

    #[test]
    fn test_metadata_header_order_skips_missing() {
        let html = HtmlRenderer::default().render(&document(vec![]));
        let id = html.find("doc-meta-id").unwrap();
        let title = html.find("doc-meta-title").unwrap();
        let revision = html.find("doc-meta-revision").unwrap();
        let date = html.find("doc-meta-date").unwrap();
        assert!(id < title && title < revision && revision < date);
        assert!(!html.contains("doc-meta-author"));
    }

    #[test]
    fn test_style_map_overrides_defaults() {
        let styles = StyleMap::new()
            .with_class(BlockType::Paragraph, "body-text")
            .with_keyed(BlockType::Heading, "1", "title-xl")
            .with_keyed(BlockType::Heading, "default", "title");
        let renderer = HtmlRenderer::new(styles);
        let html = renderer.render(&document(vec![
            Block::heading(1, "Purpose"),
            Block::heading(3, "Details"),
            Block::paragraph("x"),
            Block::CodeBlock { code: "x".into(), language: None },
        ]));
        assert!(html.contains("<h1 id=\"purpose\" class=\"title-xl\">Purpose</h1>"));
        assert!(html.contains("<h3 id=\"details\" class=\"title\">Details</h3>"));
        assert!(html.contains("<p class=\"body-text\">x</p>"));
        assert!(html.contains("<pre class=\"code-block\"><code>x</code></pre>"));
    }

    #[test]
    fn test_failed_block_becomes_placeholder() {
        let html = HtmlRenderer::default().render(&document(vec![
            Block::Image { source: "".into(), alt: "x".into(), caption: None },
            Block::Heading { level: 9, text: "bad".into(), anchor: None },
            Block::paragraph("still here"),
        ]));
        assert!(html.contains("<!-- block 0 (image) not rendered: image has an empty source -->"));
        assert!(html.contains("<!-- block 1 (heading) not rendered: heading level 9 is outside 1-6 -->"));
        assert!(html.contains("still here"));
    }

    #[test]
    fn test_list_lines_and_start() {
        let html = HtmlRenderer::default().render(&document(vec![Block::List {
            kind: ListKind::Ordered,
            items: vec!["First line\nSecond paragraph".into()],
            start: Some(3),
        }]));
        assert!(html.contains("<ol start=\"3\" class=\"list\">"));
        assert!(html.contains("<li>First line<br>\nSecond paragraph</li>"));
    }

    #[test]
    fn test_callout_and_quote() {
        let html = HtmlRenderer::default().render(&document(vec![
            Block::Callout { kind: CalloutKind::Warning, title: None, content: "Hot <surface>".into() },
            Block::Paragraph { text: "quoted".into(), quote: true },
        ]));
        assert!(html.contains("<div class=\"callout callout-warning\">"));
        assert!(html.contains("<p class=\"callout-title\">Warning</p>"));
        assert!(html.contains("Hot &lt;surface&gt;"));
        assert!(html.contains("<p class=\"blockquote\">quoted</p>"));
    }

    #[test]
    fn test_wikilinks() {
        let html = HtmlRenderer::default().render(&document(vec![
            Block::Wikilink {
                target: "SOP-200#scope".into(),
                display: Some("Cleaning".into()),
                resolved: Some(PathBuf::from("SOP-200.html")),
                token: "[[SOP-200#scope|Cleaning]]".into(),
            },
            Block::Wikilink {
                target: "#purpose".into(),
                display: None,
                resolved: Some(PathBuf::new()),
                token: "[[#purpose]]".into(),
            },
            Block::Wikilink { target: "NOPE".into(), display: None, resolved: None, token: "[[NOPE]]".into() },
        ]));
        assert!(html.contains("<a class=\"wikilink\" href=\"SOP-200.html#scope\">Cleaning</a>"));
        assert!(html.contains("href=\"#purpose\""));
        assert!(html.contains("<span class=\"wikilink wikilink-unresolved\" title=\"Unresolved link [[NOPE]]\">NOPE</span>"));
    }

    #[test]
    fn test_table_and_figure() {
        let html = HtmlRenderer::default().with_stylesheet("../css/theme.css").render(&document(vec![
            Block::Table {
                header: vec!["Item".into(), "Max".into()],
                rows: vec![vec!["Temp".into(), "40C".into()], vec!["RH".into(), "60%".into()]],
                caption: Some("Limits".into()),
            },
            Block::Image { source: "img/a b.png".into(), alt: "A \"quote\"".into(), caption: Some("Fig".into()) },
        ]));
        assert!(html.contains("<link rel=\"stylesheet\" href=\"../css/theme.css\">"));
        assert_eq!(html.matches("<tr>").count(), 3);
        assert!(html.contains("<caption>Limits</caption>"));
        assert!(html.contains("<img src=\"img/a b.png\" alt=\"A &quot;quote&quot;\">"));
        assert!(html.contains("<figcaption>Fig</figcaption>"));
    }
}
