//! Image path resolution.
//!
//! Search order for a relative image source:
//! 1. the document's own directory,
//! 2. for each asset root in order: `<root>/doc/<doc-id>/`, `<root>/`, `<root>/global/`.
//!
//! Absolute paths that exist and remote URLs are used as-is. Local matches
//! come back absolute, so a page rendered from any directory still finds them;
//! [`rebase_images`] turns them into hrefs relative to the page's directory.
//! Anything else is left untouched and reported back as unresolved.

use folio_types::{Block, Document};
use log::{debug, warn};
use std::fmt;
use std::path::{self, Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedAsset {
    pub source: String,
}

impl fmt::Display for UnresolvedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image '{}' not found in any asset root", self.source)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssetResolver {
    roots: Vec<PathBuf>,
}

fn is_remote(source: &str) -> bool {
    ["http://", "https://", "data:"]
        .iter()
        .any(|scheme| source.starts_with(scheme))
}

impl AssetResolver {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn candidates(&self, source: &str, doc_dir: Option<&Path>, doc_id: Option<&str>) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if let Some(dir) = doc_dir {
            out.push(dir.join(source));
        }
        for root in &self.roots {
            if let Some(id) = doc_id {
                out.push(root.join("doc").join(id).join(source));
            }
            out.push(root.join(source));
            out.push(root.join("global").join(source));
        }
        out
    }

    /// Resolves one image source. `None` when nothing on disk matches.
    pub fn resolve(&self, source: &str, doc_dir: Option<&Path>, doc_id: Option<&str>) -> Option<PathBuf> {
        let source = source.trim();
        if source.is_empty() {
            return None;
        }
        if is_remote(source) {
            return Some(PathBuf::from(source));
        }
        let path = Path::new(source);
        if path.is_absolute() {
            return path.is_file().then(|| path.to_path_buf());
        }
        self.candidates(source, doc_dir, doc_id)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .map(|found| path::absolute(&found).unwrap_or(found))
    }

    /// Rewrites every image block of `document` to its resolved path.
    ///
    /// Unresolved images keep their original source; one entry per image is returned.
    pub fn resolve_document(
        &self,
        document: Document,
        doc_dir: Option<&Path>,
    ) -> (Document, Vec<UnresolvedAsset>) {
        let doc_id = document.metadata.document_id.clone();
        let mut unresolved = Vec::new();
        let blocks = document
            .blocks
            .into_iter()
            .map(|block| match block {
                Block::Image { source, alt, caption } => {
                    let source = match self.resolve(&source, doc_dir, doc_id.as_deref()) {
                        Some(path) => {
                            debug!("Resolved image '{}' -> {}", source, path.display());
                            path.to_string_lossy().into_owned()
                        }
                        None => {
                            let missing = UnresolvedAsset { source: source.clone() };
                            warn!("{}", missing);
                            unresolved.push(missing);
                            source
                        }
                    };
                    Block::Image { source, alt, caption }
                }
                other => other,
            })
            .collect();
        (
            Document {
                metadata: document.metadata,
                blocks,
            },
            unresolved,
        )
    }
}

/// `target` as an href from a page inside `base_dir`, with `/` separators.
///
/// Both paths should be absolute. A target on a different root (another
/// drive) is returned as-is.
pub fn relative_href(target: &Path, base_dir: &Path) -> String {
    let target_parts: Vec<Component> = target.components().collect();
    let base_parts: Vec<Component> = base_dir.components().collect();
    if target_parts.first() != base_parts.first() {
        return target.to_string_lossy().into_owned();
    }
    let common = target_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<String> = std::iter::repeat_n("..".to_string(), base_parts.len() - common).collect();
    parts.extend(
        target_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    if parts.is_empty() {
        return ".".to_string();
    }
    parts.join("/")
}

/// Rewrites absolute image paths as hrefs relative to `base_dir`.
///
/// Remote and unresolved sources are kept as they are.
pub fn rebase_images(document: Document, base_dir: &Path) -> Document {
    let blocks = document
        .blocks
        .into_iter()
        .map(|block| match block {
            Block::Image { source, alt, caption } if Path::new(&source).is_absolute() => Block::Image {
                source: relative_href(Path::new(&source), base_dir),
                alt,
                caption,
            },
            other => other,
        })
        .collect();
    Document {
        metadata: document.metadata,
        blocks,
    }
}
