// src/pipeline/orchestrator.rs
use super::worker::{BuildContext, BuiltDocument};
use crate::cache::DependencyTracker;
use crate::error::PipelineError;
use folio_executor::{BatchExecutor, Executor};
use log::{error, info, warn};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One document to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildJob {
    pub source: PathBuf,
    /// Known id, when the job came from the registry. Used for logs until
    /// the front matter has been read.
    pub document_id: Option<String>,
}

impl BuildJob {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            document_id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = Some(id.into());
        self
    }

    fn label(&self) -> String {
        self.document_id.clone().unwrap_or_else(|| {
            self.source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.source.display().to_string())
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildFailure {
    pub category: &'static str,
    pub message: String,
}

impl From<&PipelineError> for BuildFailure {
    fn from(e: &PipelineError) -> Self {
        Self {
            category: e.category(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildResult {
    pub document_id: String,
    pub source: PathBuf,
    pub status: BuildStatus,
    pub outputs: Vec<PathBuf>,
    pub warnings: usize,
    pub error: Option<BuildFailure>,
    pub elapsed: Duration,
}

impl BuildResult {
    fn skipped(job: &BuildJob) -> Self {
        Self {
            document_id: job.label(),
            source: job.source.clone(),
            status: BuildStatus::Skipped,
            outputs: Vec::new(),
            warnings: 0,
            error: None,
            elapsed: Duration::ZERO,
        }
    }

    fn from_outcome(job: &BuildJob, outcome: Result<BuiltDocument, PipelineError>, elapsed: Duration) -> Self {
        match outcome {
            Ok(built) => Self {
                document_id: built.document_id,
                source: job.source.clone(),
                status: BuildStatus::Success,
                outputs: built.outputs,
                warnings: built.warnings,
                error: None,
                elapsed,
            },
            Err(e) => Self {
                document_id: job.label(),
                source: job.source.clone(),
                status: BuildStatus::Failed,
                outputs: Vec::new(),
                warnings: 0,
                error: Some(BuildFailure::from(&e)),
                elapsed,
            },
        }
    }
}

/// Outcome of a batch, in job order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub results: Vec<BuildResult>,
    pub elapsed: Duration,
}

impl BatchSummary {
    fn count(&self, status: BuildStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(BuildStatus::Success)
    }

    pub fn failed(&self) -> usize {
        self.count(BuildStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(BuildStatus::Skipped)
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &BuildResult> {
        self.results.iter().filter(|r| r.status == BuildStatus::Failed)
    }

    /// Logs one summary line and one line per failure.
    pub fn log(&self) {
        info!(
            "Batch finished in {:.2?}: {} succeeded, {} failed, {} skipped",
            self.elapsed,
            self.succeeded(),
            self.failed(),
            self.skipped()
        );
        for result in self.failures() {
            if let Some(failure) = &result.error {
                error!("{}: [{}] {}", result.document_id, failure.category, failure.message);
            }
        }
    }
}

fn remove_dir_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// The document build pipeline: per-document processing plus batch
/// orchestration over a worker pool and the build cache.
pub struct DocumentPipeline {
    context: Arc<BuildContext>,
    cache_path: PathBuf,
    incremental: bool,
}

impl DocumentPipeline {
    pub(crate) fn new(context: BuildContext, cache_path: PathBuf, incremental: bool) -> Self {
        Self {
            context: Arc::new(context),
            cache_path,
            incremental,
        }
    }

    /// Files besides the source that every build depends on.
    pub fn dependencies(&self) -> &[PathBuf] {
        &self.context.dependencies
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn html_path(&self, document_id: &str) -> PathBuf {
        self.context.html_target(document_id)
    }

    pub fn pdf_path(&self, document_id: &str) -> PathBuf {
        self.context.pdf_target(document_id)
    }

    /// Builds one document and records it in the cache.
    ///
    /// The cache entry holds the hashes of what the build read, so an edit
    /// made while it ran is picked up next time. A cache write failure is
    /// logged; the build still counts as successful.
    pub fn build(&self, source: &Path) -> Result<BuiltDocument, PipelineError> {
        let built = self.context.build_document(source)?;
        let Some(fingerprint) = built.fingerprint.clone() else {
            return Ok(built);
        };
        match DependencyTracker::load(&self.cache_path) {
            Ok(mut tracker) => {
                tracker.record(source, fingerprint);
                if let Err(e) = tracker.flush() {
                    warn!("{}; {} will be rebuilt next run", e, built.document_id);
                }
            }
            Err(e) => warn!("{}; not recording {}", e, built.document_id),
        }
        Ok(built)
    }

    /// Builds every job on a pool of `max_workers` threads.
    ///
    /// Every error and panic stays inside its job's result. After the pool
    /// drains, cache entries are recorded for successful documents only and
    /// the store is written once.
    pub fn build_all(&self, jobs: Vec<BuildJob>, max_workers: usize) -> BatchSummary {
        let batch_start = Instant::now();
        let mut tracker = match DependencyTracker::load(&self.cache_path) {
            Ok(tracker) => Some(tracker),
            Err(e) => {
                warn!("{}; building without a cache", e);
                None
            }
        };

        let mut slots: Vec<Option<BuildResult>> = vec![None; jobs.len()];
        let mut pending = Vec::new();
        for (index, job) in jobs.into_iter().enumerate() {
            let unchanged = self.incremental
                && tracker
                    .as_ref()
                    .is_some_and(|t| !t.needs_rebuild(&job.source, self.dependencies()));
            if unchanged {
                info!("[BUILD {}] Unchanged, skipping", job.label());
                slots[index] = Some(BuildResult::skipped(&job));
            } else {
                pending.push((index, job));
            }
        }

        let workers = max_workers.max(1).min(pending.len().max(1));
        info!("Building {} document(s) with {} worker(s)", pending.len(), workers);
        let executor = BatchExecutor::for_workers(workers);
        let context = Arc::clone(&self.context);
        let sources: Vec<PathBuf> = pending.iter().map(|(_, job)| job.source.clone()).collect();
        let outcomes = executor.execute_all(sources, move |source: PathBuf| {
            let start = Instant::now();
            (context.build_document(&source), start.elapsed())
        });

        let mut fingerprints = Vec::new();
        for ((index, job), outcome) in pending.into_iter().zip(outcomes) {
            let (outcome, elapsed) =
                outcome.unwrap_or_else(|panic| (Err(PipelineError::Panic(panic.message)), Duration::ZERO));
            match &outcome {
                Ok(built) => {
                    if let Some(fingerprint) = &built.fingerprint {
                        fingerprints.push((job.source.clone(), fingerprint.clone()));
                    }
                }
                Err(e) => error!("[BUILD {}] Failed: {}", job.label(), e),
            }
            slots[index] = Some(BuildResult::from_outcome(&job, outcome, elapsed));
        }
        let results: Vec<BuildResult> = slots.into_iter().flatten().collect();

        if let Some(tracker) = tracker.as_mut() {
            let recorded = fingerprints.len();
            for (source, fingerprint) in fingerprints {
                tracker.record(&source, fingerprint);
            }
            if recorded > 0
                && let Err(e) = tracker.flush()
            {
                warn!("{}; successful documents will be rebuilt next run", e);
            }
        }

        let summary = BatchSummary {
            results,
            elapsed: batch_start.elapsed(),
        };
        summary.log();
        summary
    }

    /// Removes the generated `html/` and `pdf/` trees and the cache file.
    pub fn clean_outputs(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let mut removed = Vec::new();
        for dir in [&self.context.html_dir, &self.context.pdf_dir] {
            if remove_dir_if_present(dir)? {
                info!("Removed {}", dir.display());
                removed.push(dir.clone());
            }
        }
        if self.cache_path.is_file() {
            DependencyTracker::remove_store(&self.cache_path)?;
            info!("Removed {}", self.cache_path.display());
            removed.push(self.cache_path.clone());
        }
        Ok(removed)
    }
}
