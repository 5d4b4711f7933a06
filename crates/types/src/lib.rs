pub mod block;
pub mod document;
pub mod geometry;

pub use block::{Block, BlockType, CalloutKind, ListKind};
pub use document::{Document, DocumentMetadata};
pub use geometry::{Frame, FrameKind, FrameRole, LayoutGeometry, PageGeometry, Rect, TextStyle};
