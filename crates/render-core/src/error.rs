use folio_traits::ToolError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Rendering engine failed: {0}")]
    Tool(#[from] ToolError),
    #[error("Engine '{engine}' cannot render this input: {reason}")]
    Capability { engine: String, reason: String },
    #[error("Stylesheet '{path}' could not be read: {message}")]
    Resource { path: PathBuf, message: String },
    #[error("Engine reported success but produced no output at '{0}'")]
    MissingOutput(PathBuf),
}
