//! Rebuild-on-change loop for a single document.
//!
//! File events are debounced so a burst of saves triggers one rebuild, and
//! batches that arrive while a rebuild runs are folded into one follow-up
//! rebuild. The loop runs on a current-thread runtime and ends cleanly on Ctrl-C.

use crate::error::PipelineError;
use crate::pipeline::DocumentPipeline;
use log::{debug, error, info, warn};
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use std::collections::BTreeSet;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver};

type FileDebouncer = Debouncer<RecommendedWatcher, RecommendedCache>;

fn watch_error(e: notify::Error) -> PipelineError {
    PipelineError::Io(io::Error::other(e))
}

/// Paths whose changes should trigger a rebuild: the source and every
/// pipeline dependency, made absolute where possible.
fn watched_files(source: &Path, dependencies: &[PathBuf]) -> BTreeSet<PathBuf> {
    std::iter::once(source)
        .chain(dependencies.iter().map(PathBuf::as_path))
        .map(|p| p.canonicalize().unwrap_or_else(|_| p.to_path_buf()))
        .collect()
}

fn touches(paths: &[PathBuf], files: &BTreeSet<PathBuf>) -> bool {
    paths
        .iter()
        .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
        .any(|p| files.contains(&p))
}

/// Starts a debounced watcher on the parent directories of `files`. Each
/// debounced batch of create/modify paths arrives as one message.
fn debounced_changes(
    files: &BTreeSet<PathBuf>,
    debounce: Duration,
) -> Result<(FileDebouncer, UnboundedReceiver<Vec<PathBuf>>), PipelineError> {
    let (tx, rx) = mpsc::unbounded_channel::<Vec<PathBuf>>();
    let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| match result {
        Ok(events) => {
            let paths: Vec<PathBuf> = events
                .into_iter()
                .filter(|e| matches!(e.kind, EventKind::Create(_) | EventKind::Modify(_)))
                .flat_map(|e| e.event.paths)
                .collect();
            if !paths.is_empty() && tx.send(paths).is_err() {
                debug!("[WATCH] Event channel closed");
            }
        }
        Err(errors) => {
            for e in errors {
                warn!("[WATCH] Notify error: {:?}", e);
            }
        }
    })
    .map_err(watch_error)?;

    // Editors often replace files by rename, so watch parent directories.
    let dirs: BTreeSet<PathBuf> = files
        .iter()
        .filter_map(|f| f.parent().map(Path::to_path_buf))
        .collect();
    for dir in &dirs {
        debouncer.watch(dir, RecursiveMode::NonRecursive).map_err(watch_error)?;
        debug!("[WATCH] Watching {}", dir.display());
    }
    Ok((debouncer, rx))
}

fn rebuild(pipeline: &DocumentPipeline, source: &Path) -> Result<(), PipelineError> {
    let start = Instant::now();
    let built = pipeline.build(source)?;
    info!(
        "[WATCH] Rebuilt {} ({} output(s)) in {:.2?}",
        built.document_id,
        built.outputs.len(),
        start.elapsed()
    );
    Ok(())
}

fn report(result: Result<(), PipelineError>) {
    if let Err(e) = result {
        error!("[WATCH] Rebuild failed: [{}] {}", e.category(), e);
    }
}

/// Rebuilds on every relevant change batch until `stop` resolves or the
/// sender goes away. Returns how many rebuilds ran.
///
/// A failed rebuild is logged and the loop keeps going.
async fn serve_changes<S, R>(
    rx: &mut UnboundedReceiver<Vec<PathBuf>>,
    files: &BTreeSet<PathBuf>,
    stop: S,
    mut rebuild: R,
) -> usize
where
    S: Future<Output = ()>,
    R: FnMut() -> Result<(), PipelineError>,
{
    tokio::pin!(stop);
    let mut rebuilds = 0;
    loop {
        tokio::select! {
            _ = &mut stop => {
                info!("[WATCH] Stopping");
                break;
            }
            received = rx.recv() => {
                let Some(paths) = received else { break };
                let mut pending = touches(&paths, files);
                while pending {
                    info!("[WATCH] Change detected, rebuilding");
                    report(rebuild());
                    rebuilds += 1;
                    pending = false;
                    while let Ok(queued) = rx.try_recv() {
                        pending |= touches(&queued, files);
                    }
                }
            }
        }
    }
    rebuilds
}

/// Builds `source` once, then rebuilds whenever it or a dependency changes.
/// Returns after Ctrl-C.
pub fn watch(pipeline: &DocumentPipeline, source: &Path, debounce: Duration) -> Result<(), PipelineError> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(watch_loop(pipeline, source, debounce))
}

async fn watch_loop(pipeline: &DocumentPipeline, source: &Path, debounce: Duration) -> Result<(), PipelineError> {
    let files = watched_files(source, pipeline.dependencies());
    let (_debouncer, mut rx) = debounced_changes(&files, debounce)?;

    report(rebuild(pipeline, source));
    info!(
        "[WATCH] Watching {} file(s) with a {:?} debounce. Press Ctrl-C to stop.",
        files.len(),
        debounce
    );

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("[WATCH] Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let rebuilds = serve_changes(&mut rx, &files, ctrl_c, || rebuild(pipeline, source)).await;
    debug!("[WATCH] {} rebuild(s) this session", rebuilds);
    Ok(())
}
