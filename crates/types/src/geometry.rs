use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle. Units are whatever the owner says they are;
/// everything extracted from a design file is in inches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameRole {
    Title,
    Body,
    Meta,
}

impl FrameRole {
    /// Derives the role from a frame name prefix (`title*`, `body*`, anything else is meta).
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.starts_with("title") {
            FrameRole::Title
        } else if lower.starts_with("body") {
            FrameRole::Body
        } else {
            FrameRole::Meta
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Text,
    Image,
    Shape,
    Other,
}

/// A named, positioned region on a designed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    /// Position relative to the owning page, in inches.
    pub bounds: Rect,
    pub page: u32,
    pub kind: FrameKind,
    pub role: FrameRole,
    pub font_family: Option<String>,
    /// Font size in points.
    pub font_size: Option<f64>,
    pub meta_key: Option<String>,
    /// Name of the master page this frame belongs to, for master-page objects.
    pub master: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub number: u32,
    /// Page size in inches.
    pub width: f64,
    pub height: f64,
    pub master: Option<String>,
}

/// A named paragraph style from the design file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub name: String,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub line_spacing: Option<f64>,
    pub alignment: Option<String>,
}

/// Everything extracted from one design file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutGeometry {
    pub pages: Vec<PageGeometry>,
    pub masters: Vec<PageGeometry>,
    pub frames: Vec<Frame>,
    pub styles: Vec<TextStyle>,
}

impl LayoutGeometry {
    pub fn frames_on_page(&self, page: u32) -> impl Iterator<Item = &Frame> {
        self.frames
            .iter()
            .filter(move |f| f.master.is_none() && f.page == page)
    }
}
