//! Compiles extracted geometry into absolute-positioning CSS.

use crate::LayoutError;
use folio_style::{format_number, LengthUnit, Margins, PageSize};
use folio_types::{Frame, LayoutGeometry, TextStyle};
use log::warn;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct CssOptions {
    pub unit: LengthUnit,
    pub margins: Margins,
    /// Emit `.style-<name>` rules for paragraph styles.
    pub include_styles: bool,
}

impl CssOptions {
    pub fn new(unit: LengthUnit) -> Self {
        Self {
            unit,
            margins: Margins::default(),
            include_styles: true,
        }
    }

    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }
}

/// Lowercases, replaces every non-alphanumeric run with a single `-` and
/// trims dashes from both ends.
pub fn sanitize_class_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() { "unnamed".to_string() } else { trimmed.to_string() }
}

/// Assigns unique class names. The first occurrence of a name keeps the bare
/// class; later ones get a page (or master) suffix.
struct ClassNames {
    used: HashSet<String>,
}

impl ClassNames {
    fn assign(&mut self, frame: &Frame) -> String {
        let base = format!("frame-{}", sanitize_class_name(&frame.name));
        if self.used.insert(base.clone()) {
            return base;
        }
        let suffixed = match &frame.master {
            Some(master) => format!("{}-master-{}", base, sanitize_class_name(master)),
            None => format!("{}-p{}", base, frame.page),
        };
        let mut candidate = suffixed.clone();
        let mut n = 2;
        while !self.used.insert(candidate.clone()) {
            candidate = format!("{}-{}", suffixed, n);
            n += 1;
        }
        candidate
    }
}

fn quote_font(family: &str) -> String {
    format!("\"{}\"", family.replace('\\', "\\\\").replace('"', "\\\""))
}

fn write_frame_rule(css: &mut String, class: &str, frame: &Frame, unit: LengthUnit) {
    let b = &frame.bounds;
    let _ = writeln!(css, ".{} {{", class);
    let _ = writeln!(css, "  position: absolute;");
    let _ = writeln!(css, "  left: {};", unit.format(b.x));
    let _ = writeln!(css, "  top: {};", unit.format(b.y));
    let _ = writeln!(css, "  width: {};", unit.format(b.width));
    let _ = writeln!(css, "  height: {};", unit.format(b.height));
    if let Some(family) = &frame.font_family {
        let _ = writeln!(css, "  font-family: {};", quote_font(family));
    }
    if let Some(size) = frame.font_size {
        let _ = writeln!(css, "  font-size: {}pt;", format_number(size));
    }
    css.push_str("}\n\n");
}

fn write_style_rule(css: &mut String, style: &TextStyle) {
    let _ = writeln!(css, ".style-{} {{", sanitize_class_name(&style.name));
    if let Some(family) = &style.font_family {
        let _ = writeln!(css, "  font-family: {};", quote_font(family));
    }
    if let Some(size) = style.font_size {
        let _ = writeln!(css, "  font-size: {}pt;", format_number(size));
    }
    if let Some(spacing) = style.line_spacing {
        let _ = writeln!(css, "  line-height: {}pt;", format_number(spacing));
    }
    if let Some(alignment) = &style.alignment {
        let _ = writeln!(css, "  text-align: {};", alignment);
    }
    css.push_str("}\n\n");
}

/// Builds the layout stylesheet: one `@page` rule, one rule per frame in page
/// order (document pages first, master pages after), then paragraph styles.
pub fn build_layout_css(geometry: &LayoutGeometry, page_size: PageSize, options: &CssOptions) -> String {
    let mut css = String::new();
    css.push_str("/* Layout generated from page design geometry. */\n\n");
    let _ = writeln!(css, "@page {{");
    let _ = writeln!(css, "  size: {};", page_size.css_size());
    let _ = writeln!(css, "  margin: {};", options.margins.to_css(options.unit));
    css.push_str("}\n\n");

    let mut frames: Vec<&Frame> = geometry.frames.iter().collect();
    frames.sort_by_key(|f| (f.master.is_some(), f.page));

    let (page_width, page_height) = page_size.dimensions_in();
    let mut names = ClassNames { used: HashSet::new() };
    for frame in frames {
        if frame.bounds.right() > page_width + 1e-6 || frame.bounds.bottom() > page_height + 1e-6 {
            warn!(
                "Frame '{}' on page {} extends past the {} page edge",
                frame.name,
                frame.page,
                page_size.css_size()
            );
        }
        let class = names.assign(frame);
        write_frame_rule(&mut css, &class, frame, options.unit);
    }

    if options.include_styles {
        for style in &geometry.styles {
            write_style_rule(&mut css, style);
        }
    }

    let trimmed_len = css.trim_end().len();
    css.truncate(trimmed_len);
    css.push('\n');
    css
}

/// Checks that braces balance, ignoring comments and quoted strings.
pub fn validate_css(css: &str) -> Result<(), LayoutError> {
    let mut depth: i64 = 0;
    let mut line = 1;
    let mut chars = css.chars().peekable();
    let mut quote: Option<char> = None;
    while let Some(c) = chars.next() {
        if c == '\n' {
            line += 1;
        }
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(LayoutError::InvalidCss(format!("unexpected '}}' on line {}", line)));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(LayoutError::InvalidCss(format!("{} unclosed '{{'", depth)));
    }
    Ok(())
}

/// Concatenates stylesheets in order, each preceded by a comment naming its
/// source file.
pub fn merge_stylesheets<P: AsRef<Path>>(paths: &[P]) -> Result<String, LayoutError> {
    let mut merged = String::new();
    for path in paths {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| LayoutError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let _ = writeln!(merged, "/* source: {} */", path.display());
        merged.push_str(content.trim_end());
        merged.push_str("\n\n");
    }
    Ok(merged)
}
