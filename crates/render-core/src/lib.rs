//! Rendering abstractions shared by the HTML and paged backends.
//!
//! - `PageRenderer` for engines that paginate HTML into a binary artifact
//! - `CssSource` and `PageArtifact` describing a renderer's inputs and output
//! - `RenderError` for every backend

mod error;
mod traits;
mod types;

pub use error::RenderError;
pub use traits::PageRenderer;
pub use types::{concat_stylesheets, CssSource, PageArtifact};
