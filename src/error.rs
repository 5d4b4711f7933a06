use crate::cache::CacheError;
use crate::config::ConfigError;
use folio_ast::ParseError;
use folio_layout::LayoutError;
use folio_render_core::RenderError;
use folio_style::ProfileError;
use folio_traits::ToolError;
use thiserror::Error;

/// Every failure a document build or a command can end with.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Front matter is invalid: {0}")]
    FrontMatter(String),

    #[error("Parsing failed: {0}")]
    Parse(#[from] ParseError),

    #[error("Metadata validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Tool(#[from] ToolError),

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Layout profile is invalid: {0}")]
    Profile(#[from] ProfileError),

    #[error("Layout extraction failed: {0}")]
    Layout(#[from] LayoutError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Build cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker panicked: {0}")]
    Panic(String),
}

impl PipelineError {
    /// Short category name used in batch summaries.
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::FrontMatter(_) | PipelineError::Parse(_) => "parse",
            PipelineError::Validation(_) => "validation",
            PipelineError::Tool(_) | PipelineError::Render(RenderError::Tool(_)) => "tool",
            PipelineError::Render(_) => "render",
            PipelineError::Profile(_) => "profile",
            PipelineError::Layout(_) => "layout",
            PipelineError::Config(_) => "config",
            PipelineError::Cache(_) => "cache",
            PipelineError::Io(_) => "io",
            PipelineError::Panic(_) => "panic",
        }
    }
}
