//! Renders the folio block model as a standalone HTML document.
//!
//! Every text value is escaped before insertion. CSS classes come from the
//! layout profile's style map, falling back to fixed defaults.

mod anchors;
mod renderer;

pub use anchors::AnchorSet;
pub use renderer::{default_class, BlockRenderError, HtmlRenderer};
