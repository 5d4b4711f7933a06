//! Content-hash build cache deciding which documents need rebuilding.
//!
//! The store is a pretty-printed JSON object keyed by source path. It is read
//! once when a tracker is created and written only by [`DependencyTracker::flush`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to read build cache '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write build cache '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to hash '{path}': {source}")]
    Hash {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize build cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// SHA-256 of a file's bytes as lowercase hex.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 of an in-memory buffer as lowercase hex.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn cache_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub source_hash: String,
    /// Dependency path to its hash at build time.
    pub dependencies: BTreeMap<String, String>,
    pub built_at: DateTime<Utc>,
}

fn hash_path(path: &Path) -> Result<String, CacheError> {
    hash_file(path).map_err(|source| CacheError::Hash {
        path: path.to_path_buf(),
        source,
    })
}

impl CacheEntry {
    /// Hashes `source` and every dependency as they are on disk now.
    pub fn capture(source: &Path, dependencies: &[PathBuf]) -> Result<Self, CacheError> {
        let bytes = fs::read(source).map_err(|e| CacheError::Hash {
            path: source.to_path_buf(),
            source: e,
        })?;
        Self::for_source_bytes(&bytes, dependencies)
    }

    /// An entry for source bytes already read by a build, with the
    /// dependencies hashed now. Record it only if that build succeeds.
    pub fn for_source_bytes(source: &[u8], dependencies: &[PathBuf]) -> Result<Self, CacheError> {
        let mut deps = BTreeMap::new();
        for dep in dependencies {
            deps.insert(cache_key(dep), hash_path(dep)?);
        }
        Ok(Self {
            source_hash: hash_bytes(source),
            dependencies: deps,
            built_at: Utc::now(),
        })
    }
}

#[derive(Debug)]
pub struct DependencyTracker {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl DependencyTracker {
    /// Opens the store at `path`. A missing file starts an empty store; a
    /// corrupt one is discarded with a warning so every document rebuilds.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("Build cache {} is corrupt ({}); starting fresh", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(CacheError::Read { path, source }),
        };
        log::debug!("Loaded {} cache entr(ies) from {}", entries.len(), path.display());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry(&self, source: &Path) -> Option<&CacheEntry> {
        self.entries.get(&cache_key(source))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `source` has no entry, its hash changed, the dependency set
    /// changed, or any dependency hash changed. Unreadable files count as changed.
    pub fn needs_rebuild(&self, source: &Path, dependencies: &[PathBuf]) -> bool {
        let Some(entry) = self.entry(source) else {
            return true;
        };
        match hash_file(source) {
            Ok(hash) if hash == entry.source_hash => {}
            _ => return true,
        }
        if entry.dependencies.len() != dependencies.len() {
            return true;
        }
        dependencies.iter().any(|dep| match entry.dependencies.get(&cache_key(dep)) {
            Some(recorded) => hash_file(dep).map_or(true, |hash| &hash != recorded),
            None => true,
        })
    }

    /// Replaces the entry for `source` in memory. Call [`flush`](Self::flush) to persist.
    pub fn record_built(&mut self, source: &Path, dependencies: &[PathBuf]) -> Result<(), CacheError> {
        let entry = CacheEntry::capture(source, dependencies)?;
        self.entries.insert(cache_key(source), entry);
        Ok(())
    }

    /// Stores an entry captured when the build read its inputs.
    pub fn record(&mut self, source: &Path, entry: CacheEntry) {
        self.entries.insert(cache_key(source), entry);
    }

    /// Writes the whole store atomically.
    pub fn flush(&self) -> Result<(), CacheError> {
        let write_err = |source: io::Error| CacheError::Write {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string_pretty(&self.entries)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(write_err)?;
        let mut staged = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        staged.write_all(json.as_bytes()).map_err(write_err)?;
        staged.persist(&self.path).map_err(|e| write_err(e.error))?;
        log::debug!("Wrote {} cache entr(ies) to {}", self.entries.len(), self.path.display());
        Ok(())
    }

    /// Records a successful build and persists the store immediately.
    pub fn mark_built(&mut self, source: &Path, dependencies: &[PathBuf]) -> Result<(), CacheError> {
        self.record_built(source, dependencies)?;
        self.flush()
    }

    /// Deletes the store file; a missing file is not an error.
    pub fn remove_store(path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_file_is_sha256_hex() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            hash_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_unbuilt_and_unreadable_sources_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = DependencyTracker::load(dir.path().join("cache.json")).unwrap();
        assert!(tracker.is_empty());
        assert!(tracker.needs_rebuild(&dir.path().join("missing.md"), &[]));
    }

    #[test]
    fn test_corrupt_store_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("cache.json");
        fs::write(&store, "{ not json").unwrap();
        let tracker = DependencyTracker::load(&store).unwrap();
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_dependency_set_change_forces_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("doc.md");
        let css = dir.path().join("theme.css");
        fs::write(&source, "# Doc").unwrap();
        fs::write(&css, "body {}").unwrap();

        let mut tracker = DependencyTracker::load(dir.path().join("cache.json")).unwrap();
        tracker.record_built(&source, &[]).unwrap();
        assert!(!tracker.needs_rebuild(&source, &[]));
        assert!(tracker.needs_rebuild(&source, &[css.clone()]));

        tracker.record_built(&source, &[css.clone()]).unwrap();
        assert!(!tracker.needs_rebuild(&source, &[css.clone()]));
        fs::remove_file(&css).unwrap();
        assert!(tracker.needs_rebuild(&source, &[css]));
    }

    #[test]
    fn test_flush_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("nested/cache.json");
        let source = dir.path().join("doc.md");
        fs::write(&source, "# Doc").unwrap();

        let mut tracker = DependencyTracker::load(&store).unwrap();
        tracker.mark_built(&source, &[]).unwrap();

        let reloaded = DependencyTracker::load(&store).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.entry(&source), tracker.entry(&source));
        assert!(!reloaded.needs_rebuild(&source, &[]));
    }

    #[test]
    fn test_entry_from_read_bytes_goes_stale_when_the_file_moves_on() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("doc.md");
        fs::write(&source, "revision 1").unwrap();
        let read = fs::read(&source).unwrap();
        let entry = CacheEntry::for_source_bytes(&read, &[]).unwrap();
        assert_eq!(entry.source_hash, hash_file(&source).unwrap());

        fs::write(&source, "revision 2").unwrap();
        let mut tracker = DependencyTracker::load(dir.path().join("cache.json")).unwrap();
        tracker.record(&source, entry);
        assert!(tracker.needs_rebuild(&source, &[]));
    }
}
