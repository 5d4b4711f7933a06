//! Frame geometry extraction from Scribus `.sla` documents.
//!
//! Scribus stores every length in points and positions every object on one
//! shared canvas. Frames are re-expressed relative to their owning page and
//! converted to inches here, once.

use crate::LayoutError;
use folio_style::points_to_inches;
use folio_types::{Frame, FrameKind, FrameRole, LayoutGeometry, PageGeometry, Rect, TextStyle};
use log::{debug, warn};
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Reads and extracts a design file.
pub fn extract_layout_file(path: &Path) -> Result<LayoutGeometry, LayoutError> {
    let text = fs::read_to_string(path).map_err(|source| LayoutError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let geometry = extract_layout(&text)?;
    debug!(
        "Extracted {} page(s), {} master(s), {} frame(s), {} style(s) from {}",
        geometry.pages.len(),
        geometry.masters.len(),
        geometry.frames.len(),
        geometry.styles.len(),
        path.display()
    );
    Ok(geometry)
}

/// Page origin on the shared canvas, in points.
#[derive(Debug, Clone, Copy)]
struct Origin {
    x: f64,
    y: f64,
}

pub fn extract_layout(xml: &str) -> Result<LayoutGeometry, LayoutError> {
    let doc = Document::parse(xml)?;
    let root = doc
        .descendants()
        .find(|n| n.has_tag_name("DOCUMENT"))
        .ok_or(LayoutError::NoDocument)?;

    let mut geometry = LayoutGeometry::default();
    // Keyed by the zero-based index that `OwnPage` refers to.
    let mut page_origins: HashMap<i64, Origin> = HashMap::new();
    let mut master_origins: HashMap<String, Origin> = HashMap::new();

    for node in root.children().filter(Node::is_element) {
        match node.tag_name().name() {
            "PAGE" => {
                let index = required_number(node, "PAGE", "NUM")? as i64;
                let (page, origin) = parse_page(node, "PAGE", index)?;
                page_origins.insert(index, origin);
                geometry.pages.push(page);
            }
            "MASTERPAGE" => {
                let name = node.attribute("NAM").unwrap_or_default().to_string();
                let (mut page, origin) = parse_page(node, "MASTERPAGE", 0)?;
                page.number = 0;
                page.master = Some(name.clone());
                master_origins.insert(name, origin);
                geometry.masters.push(page);
            }
            "STYLE" => {
                if let Some(style) = parse_style(node)? {
                    geometry.styles.push(style);
                }
            }
            _ => {}
        }
    }

    for node in root.children().filter(Node::is_element) {
        match node.tag_name().name() {
            "PAGEOBJECT" => {
                let own_page = optional_number(node, "PAGEOBJECT", "OwnPage")?.unwrap_or(-1.0) as i64;
                let origin = match page_origins.get(&own_page) {
                    Some(origin) => *origin,
                    None => {
                        warn!(
                            "Object '{}' is not on any page (OwnPage={}), keeping canvas coordinates",
                            frame_name(node),
                            own_page
                        );
                        Origin { x: 0.0, y: 0.0 }
                    }
                };
                let page = u32::try_from(own_page + 1).unwrap_or(0);
                geometry.frames.push(parse_frame(node, "PAGEOBJECT", origin, page, None)?);
            }
            "MASTEROBJECT" => {
                let master = node.attribute("OnMasterPage").unwrap_or_default().to_string();
                let origin = master_origins
                    .get(&master)
                    .copied()
                    .unwrap_or(Origin { x: 0.0, y: 0.0 });
                geometry
                    .frames
                    .push(parse_frame(node, "MASTEROBJECT", origin, 0, Some(master))?);
            }
            _ => {}
        }
    }

    Ok(geometry)
}

fn parse_page(node: Node<'_, '_>, element: &'static str, index: i64) -> Result<(PageGeometry, Origin), LayoutError> {
    let origin = Origin {
        x: required_number(node, element, "PAGEXPOS")?,
        y: required_number(node, element, "PAGEYPOS")?,
    };
    let page = PageGeometry {
        number: u32::try_from(index + 1).unwrap_or(0),
        width: points_to_inches(required_number(node, element, "PAGEWIDTH")?),
        height: points_to_inches(required_number(node, element, "PAGEHEIGHT")?),
        master: node.attribute("MNAM").filter(|m| !m.is_empty()).map(str::to_string),
    };
    Ok((page, origin))
}

fn frame_name(node: Node<'_, '_>) -> String {
    match node.attribute("ANNAME").map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => format!("Frame{}", node.attribute("ItemID").unwrap_or_default()),
    }
}

fn frame_kind(ptype: Option<&str>) -> FrameKind {
    match ptype.map(str::trim) {
        Some("4") => FrameKind::Text,
        Some("2") => FrameKind::Image,
        Some("5" | "6" | "7") => FrameKind::Shape,
        _ => FrameKind::Other,
    }
}

/// `meta_key` item attribute first, then the `Meta_<key>` naming convention.
fn meta_key(node: Node<'_, '_>, name: &str) -> Option<String> {
    let attribute = node
        .descendants()
        .filter(|n| n.has_tag_name("ItemAttribute"))
        .find(|n| n.attribute("Name") == Some("meta_key"))
        .and_then(|n| n.attribute("Value"))
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(key) = attribute {
        return Some(key.to_string());
    }
    let prefix = name.get(..5)?;
    if prefix.eq_ignore_ascii_case("meta_") {
        let key = &name[5..];
        return (!key.is_empty()).then(|| key.to_string());
    }
    None
}

fn parse_frame(
    node: Node<'_, '_>,
    element: &'static str,
    origin: Origin,
    page: u32,
    master: Option<String>,
) -> Result<Frame, LayoutError> {
    let name = frame_name(node);
    let bounds = Rect::new(
        points_to_inches(required_number(node, element, "XPOS")? - origin.x),
        points_to_inches(required_number(node, element, "YPOS")? - origin.y),
        points_to_inches(required_number(node, element, "WIDTH")?),
        points_to_inches(required_number(node, element, "HEIGHT")?),
    );

    let default_style = node.descendants().find(|n| n.has_tag_name("DefaultStyle"));
    let font_family = default_style
        .and_then(|s| s.attribute("FONT"))
        .filter(|f| !f.is_empty())
        .map(str::to_string);
    let font_size = match default_style {
        Some(style) => optional_number(style, element, "FONTSIZE")?,
        None => None,
    };

    Ok(Frame {
        role: FrameRole::from_name(&name),
        meta_key: meta_key(node, &name),
        kind: frame_kind(node.attribute("PTYPE")),
        name,
        bounds,
        page,
        font_family,
        font_size,
        master,
    })
}

fn alignment(code: &str) -> Option<String> {
    let name = match code.trim() {
        "0" => "left",
        "1" => "center",
        "2" => "right",
        "3" | "4" => "justify",
        _ => return None,
    };
    Some(name.to_string())
}

fn parse_style(node: Node<'_, '_>) -> Result<Option<TextStyle>, LayoutError> {
    let Some(name) = node.attribute("NAME").map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    Ok(Some(TextStyle {
        name: name.to_string(),
        font_family: node.attribute("FONT").filter(|f| !f.is_empty()).map(str::to_string),
        font_size: optional_number(node, "STYLE", "FONTSIZE")?,
        line_spacing: optional_number(node, "STYLE", "LINESP")?,
        alignment: node.attribute("ALIGN").and_then(alignment),
    }))
}

fn optional_number(node: Node<'_, '_>, element: &'static str, attribute: &'static str) -> Result<Option<f64>, LayoutError> {
    let Some(raw) = node.attribute(attribute) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|_| LayoutError::InvalidNumber {
            element,
            name: describe(node),
            attribute,
            value: raw.to_string(),
        })
}

fn required_number(node: Node<'_, '_>, element: &'static str, attribute: &'static str) -> Result<f64, LayoutError> {
    optional_number(node, element, attribute)?.ok_or_else(|| LayoutError::MissingAttribute {
        element,
        name: describe(node),
        attribute,
    })
}

fn describe(node: Node<'_, '_>) -> String {
    ["ANNAME", "NAM", "NAME", "NUM"]
        .iter()
        .find_map(|a| node.attribute(*a))
        .map(str::to_string)
        .unwrap_or_else(|| frame_name(node))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SCRIBUSUTF8NEW Version="1.6.1">
  <DOCUMENT ANZPAGES="2">
    <STYLE NAME="Body Text" FONT="Liberation Serif" FONTSIZE="11" LINESP="14" ALIGN="3"/>
    <STYLE FONT="Nameless"/>
    <MASTERPAGE NAM="Normal" PAGEXPOS="100" PAGEYPOS="20" PAGEWIDTH="612" PAGEHEIGHT="792"/>
    <PAGE NUM="0" MNAM="Normal" PAGEXPOS="100" PAGEYPOS="20" PAGEWIDTH="612" PAGEHEIGHT="792"/>
    <PAGE NUM="1" MNAM="Normal" PAGEXPOS="100" PAGEYPOS="852" PAGEWIDTH="612" PAGEHEIGHT="792"/>
    <MASTEROBJECT ANNAME="Footer" OnMasterPage="Normal" PTYPE="4" XPOS="136" YPOS="740" WIDTH="540" HEIGHT="36"/>
    <PAGEOBJECT ANNAME="Title_Main" OwnPage="0" PTYPE="4" XPOS="136" YPOS="56" WIDTH="540" HEIGHT="54" ItemID="11">
      <StoryText><DefaultStyle FONT="Arial Bold" FONTSIZE="14"/></StoryText>
    </PAGEOBJECT>
    <PAGEOBJECT ANNAME="Meta_revision" OwnPage="0" PTYPE="4" XPOS="460" YPOS="128" WIDTH="216" HEIGHT="18" ItemID="12"/>
    <PAGEOBJECT ANNAME="Status" OwnPage="0" PTYPE="4" XPOS="460" YPOS="150" WIDTH="216" HEIGHT="18" ItemID="13">
      <PageItemAttributes><ItemAttribute Name="meta_key" Type="string" Value="status"/></PageItemAttributes>
    </PAGEOBJECT>
    <PAGEOBJECT OwnPage="1" PTYPE="2" XPOS="172" YPOS="924" WIDTH="144" HEIGHT="72" ItemID="42"/>
  </DOCUMENT>
</SCRIBUSUTF8NEW>"#;

    #[test]
    fn test_frames_are_page_relative_inches() {
        let geometry = extract_layout(SAMPLE).unwrap();
        assert_eq!(geometry.pages.len(), 2);
        assert_eq!(geometry.pages[0].number, 1);
        assert_eq!(geometry.pages[0].width, 8.5);
        assert_eq!(geometry.pages[1].master.as_deref(), Some("Normal"));

        let title = geometry.frames.iter().find(|f| f.name == "Title_Main").unwrap();
        assert_eq!(title.bounds, Rect::new(0.5, 0.5, 7.5, 0.75));
        assert_eq!(title.page, 1);
        assert_eq!(title.role, FrameRole::Title);
        assert_eq!(title.kind, FrameKind::Text);
        assert_eq!(title.font_family.as_deref(), Some("Arial Bold"));
        assert_eq!(title.font_size, Some(14.0));
    }

    #[test]
    fn test_unnamed_frame_on_second_page() {
        let geometry = extract_layout(SAMPLE).unwrap();
        let image = geometry.frames.iter().find(|f| f.name == "Frame42").unwrap();
        assert_eq!(image.page, 2);
        assert_eq!(image.kind, FrameKind::Image);
        assert_eq!(image.bounds, Rect::new(1.0, 1.0, 2.0, 1.0));
    }

    #[test]
    fn test_meta_keys_and_master_objects() {
        let geometry = extract_layout(SAMPLE).unwrap();
        let revision = geometry.frames.iter().find(|f| f.name == "Meta_revision").unwrap();
        assert_eq!(revision.meta_key.as_deref(), Some("revision"));
        assert_eq!(revision.role, FrameRole::Meta);
        let status = geometry.frames.iter().find(|f| f.name == "Status").unwrap();
        assert_eq!(status.meta_key.as_deref(), Some("status"));

        let footer = geometry.frames.iter().find(|f| f.name == "Footer").unwrap();
        assert_eq!(footer.master.as_deref(), Some("Normal"));
        assert_eq!(footer.bounds.y, 10.0);
        assert_eq!(geometry.frames_on_page(1).count(), 3);
    }

    #[test]
    fn test_styles() {
        let geometry = extract_layout(SAMPLE).unwrap();
        assert_eq!(
            geometry.styles,
            vec![TextStyle {
                name: "Body Text".into(),
                font_family: Some("Liberation Serif".into()),
                font_size: Some(11.0),
                line_spacing: Some(14.0),
                alignment: Some("justify".into()),
            }]
        );
    }

    #[test]
    fn test_missing_frame_attribute() {
        let xml = r#"<SCRIBUSUTF8NEW><DOCUMENT>
            <PAGE NUM="0" PAGEXPOS="0" PAGEYPOS="0" PAGEWIDTH="612" PAGEHEIGHT="792"/>
            <PAGEOBJECT ANNAME="Body" OwnPage="0" XPOS="10" YPOS="10" WIDTH="100"/>
        </DOCUMENT></SCRIBUSUTF8NEW>"#;
        match extract_layout(xml) {
            Err(LayoutError::MissingAttribute { name, attribute, .. }) => {
                assert_eq!(name, "Body");
                assert_eq!(attribute, "HEIGHT");
            }
            other => panic!("expected missing attribute, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(extract_layout("<DOCUMENT"), Err(LayoutError::Xml(_))));
        assert!(matches!(extract_layout("<OTHER/>"), Err(LayoutError::NoDocument)));
        let bad = r#"<DOCUMENT><PAGE NUM="x" PAGEXPOS="0" PAGEYPOS="0" PAGEWIDTH="1" PAGEHEIGHT="1"/></DOCUMENT>"#;
        assert!(matches!(extract_layout(bad), Err(LayoutError::InvalidNumber { .. })));
    }
}
