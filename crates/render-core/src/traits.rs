use crate::error::RenderError;
use crate::types::{CssSource, PageArtifact};
use std::path::Path;

/// Turns a styled HTML document into a paginated artifact at `output`.
pub trait PageRenderer: Send + Sync {
    fn name(&self) -> &str;

    /// `stylesheets` are applied in order; layout CSS comes before theme CSS.
    fn render(&self, html: &str, stylesheets: &[CssSource], output: &Path) -> Result<PageArtifact, RenderError>;
}
