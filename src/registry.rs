//! The document registry: every draft's identity, family and content hash.

use crate::cache::hash_file;
use crate::error::PipelineError;
use crate::metadata::read_metadata;
use folio_ast::LinkRegistry;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

/// Document category, taken from the id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Family {
    Sop,
    Std,
    Ref,
    App,
    Unknown,
}

impl Family {
    pub fn from_id(id: &str) -> Self {
        match id.split_once('-').map(|(prefix, _)| prefix) {
            Some("SOP") => Family::Sop,
            Some("STD") => Family::Std,
            Some("REF") => Family::Ref,
            Some("APP") => Family::App,
            _ => Family::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Sop => "SOP",
            Family::Std => "STD",
            Family::Ref => "REF",
            Family::App => "APP",
            Family::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SOP" => Ok(Family::Sop),
            "STD" => Ok(Family::Std),
            "REF" => Ok(Family::Ref),
            "APP" => Ok(Family::App),
            "UNKNOWN" => Ok(Family::Unknown),
            other => Err(format!("unknown document family '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRecord {
    pub id: String,
    pub path: PathBuf,
    pub title: String,
    pub status: String,
    pub revision: String,
    /// SHA-256 of the source file.
    pub hash: String,
    pub family: Family,
    pub upstream: Vec<String>,
    pub downstream: Vec<String>,
}

fn id_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentRegistry {
    records: BTreeMap<String, DocumentRecord>,
}

impl DocumentRegistry {
    /// Reads the front matter of every `*.md` file directly in `drafts`.
    ///
    /// Files that cannot be read or carry no `document_id` are logged and skipped.
    pub fn scan(drafts: &Path) -> Result<Self, PipelineError> {
        if !drafts.is_dir() {
            return Err(PipelineError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("drafts directory not found: {}", drafts.display()),
            )));
        }

        let mut registry = Self::default();
        let entries = WalkDir::new(drafts)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "md"));

        for entry in entries {
            let path = entry.path();
            match Self::record_for(path) {
                Ok(Some(record)) => {
                    log::debug!("Registered {} ({})", record.id, path.display());
                    if let Some(previous) = registry.records.insert(record.id.clone(), record) {
                        log::warn!(
                            "Duplicate document id '{}': {} replaced by {}",
                            previous.id,
                            previous.path.display(),
                            path.display()
                        );
                    }
                }
                Ok(None) => log::warn!("{} has no document_id, skipping", path.display()),
                Err(e) => log::error!("Failed to register {}: {}", path.display(), e),
            }
        }
        log::info!("Registered {} document(s) from {}", registry.len(), drafts.display());
        Ok(registry)
    }

    fn record_for(path: &Path) -> Result<Option<DocumentRecord>, PipelineError> {
        let metadata = read_metadata(path)?;
        let Some(id) = metadata.document_id.clone() else {
            return Ok(None);
        };
        Ok(Some(DocumentRecord {
            family: Family::from_id(&id),
            path: path.to_path_buf(),
            title: metadata.title.clone().unwrap_or_default(),
            status: metadata.status.clone().unwrap_or_else(|| "Draft".to_string()),
            revision: metadata.revision.clone().unwrap_or_else(|| "1.0".to_string()),
            hash: hash_file(path)?,
            upstream: id_list(metadata.extra.get("upstream_apn")),
            downstream: id_list(metadata.extra.get("downstream_apn")),
            id,
        }))
    }

    pub fn insert(&mut self, record: DocumentRecord) {
        self.records.insert(record.id.clone(), record);
    }

    pub fn get(&self, id: &str) -> Option<&DocumentRecord> {
        self.records.get(id)
    }

    /// Records in id order.
    pub fn records(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.records.values()
    }

    pub fn by_family(&self, family: Family) -> impl Iterator<Item = &DocumentRecord> {
        self.records().filter(move |r| r.family == family)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Reports every upstream/downstream reference to an id that is not registered.
    pub fn validate_cross_references(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for record in self.records() {
            for (field, ids) in [("upstream_apn", &record.upstream), ("downstream_apn", &record.downstream)] {
                for id in ids.iter().filter(|id| !self.records.contains_key(id.as_str())) {
                    errors.push(format!("{}: {} '{}' not found in registry", record.id, field, id));
                }
            }
        }
        if errors.is_empty() {
            log::info!("All cross-references resolved");
        } else {
            log::warn!("Found {} unresolved cross-reference(s)", errors.len());
        }
        errors
    }

    /// A wikilink snapshot mapping every id to its sibling HTML output.
    pub fn link_registry(&self) -> LinkRegistry {
        self.records
            .keys()
            .fold(LinkRegistry::new(), |links, id| links.with_identifier(id.clone(), format!("{}.html", id)))
    }

    /// Like [`link_registry`](Self::link_registry), plus every file already
    /// under `html_dir`, recorded relative to it so links stay relative.
    pub fn link_registry_with_outputs(&self, html_dir: &Path) -> io::Result<LinkRegistry> {
        let mut files = Vec::new();
        if html_dir.is_dir() {
            for entry in WalkDir::new(html_dir).min_depth(1) {
                let entry = entry.map_err(io::Error::other)?;
                if entry.file_type().is_file()
                    && let Ok(relative) = entry.path().strip_prefix(html_dir)
                {
                    files.push(relative.to_path_buf());
                }
            }
        }
        Ok(self.link_registry().with_outputs(PathBuf::new(), files))
    }
}
