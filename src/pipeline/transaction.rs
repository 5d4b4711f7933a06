//! All-or-nothing output writes for one document.
//!
//! Outputs are staged as temp files next to their targets and renamed into
//! place on commit. Dropping an uncommitted transaction deletes everything it
//! staged, so a failed build leaves previous outputs untouched.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Default)]
pub struct OutputTransaction {
    staged: Vec<(NamedTempFile, PathBuf)>,
}

fn staging_file(target: &Path) -> io::Result<NamedTempFile> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let suffix = target
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    tempfile::Builder::new()
        .prefix(".folio-staged-")
        .suffix(&suffix)
        .tempfile_in(dir)
}

impl OutputTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `bytes` as the future content of `target`.
    pub fn stage_bytes(&mut self, target: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = staging_file(target)?;
        file.write_all(bytes)?;
        file.flush()?;
        self.staged.push((file, target.to_path_buf()));
        Ok(())
    }

    /// Reserves a staging path for `target` that an external program can
    /// write to. The path keeps the target's extension.
    pub fn stage_path(&mut self, target: &Path) -> io::Result<PathBuf> {
        let file = staging_file(target)?;
        let path = file.path().to_path_buf();
        self.staged.push((file, target.to_path_buf()));
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Moves every staged file onto its target, in staging order.
    pub fn commit(self) -> io::Result<Vec<PathBuf>> {
        let mut committed = Vec::with_capacity(self.staged.len());
        for (file, target) in self.staged {
            file.persist(&target).map_err(|e| e.error)?;
            committed.push(target);
        }
        Ok(committed)
    }
}
