use crate::error::RenderError;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

/// A stylesheet handed to a page renderer. Order matters: later sources win.
#[derive(Debug, Clone, PartialEq)]
pub enum CssSource {
    File(PathBuf),
    Inline { name: String, content: String },
}

impl CssSource {
    pub fn inline(name: impl Into<String>, content: impl Into<String>) -> Self {
        CssSource::Inline {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn label(&self) -> Cow<'_, str> {
        match self {
            CssSource::File(path) => path.to_string_lossy(),
            CssSource::Inline { name, .. } => Cow::Borrowed(name),
        }
    }

    pub fn load(&self) -> Result<Cow<'_, str>, RenderError> {
        match self {
            CssSource::File(path) => fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|e| RenderError::Resource {
                    path: path.clone(),
                    message: e.to_string(),
                }),
            CssSource::Inline { content, .. } => Ok(Cow::Borrowed(content)),
        }
    }
}

impl From<PathBuf> for CssSource {
    fn from(path: PathBuf) -> Self {
        CssSource::File(path)
    }
}

impl From<&Path> for CssSource {
    fn from(path: &Path) -> Self {
        CssSource::File(path.to_path_buf())
    }
}

/// What a page renderer produced. The bytes stay on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageArtifact {
    pub path: PathBuf,
    pub bytes: u64,
}

impl PageArtifact {
    /// Stats `path` after the engine wrote it. An empty file counts as missing.
    pub fn from_path(path: &Path) -> Result<Self, RenderError> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(Self {
                path: path.to_path_buf(),
                bytes: meta.len(),
            }),
            _ => Err(RenderError::MissingOutput(path.to_path_buf())),
        }
    }
}

/// Concatenates stylesheets in order into one sheet, one source comment each.
pub fn concat_stylesheets(sources: &[CssSource]) -> Result<String, RenderError> {
    let mut combined = String::new();
    for source in sources {
        let content = source.load()?;
        combined.push_str("/* ");
        combined.push_str(&source.label());
        combined.push_str(" */\n");
        combined.push_str(content.trim_end());
        combined.push_str("\n\n");
    }
    Ok(combined)
}
