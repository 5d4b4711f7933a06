#![allow(dead_code)]

pub mod fixtures;

use folio::traits::{ExternalTool, FnTool, ToolError, ToolInput, ToolOutput};
use folio::PipelineBuilder;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn io_error(e: std::io::Error) -> ToolError {
    ToolError::Io {
        program: "fake".into(),
        message: e.to_string(),
    }
}

/// Stands in for Pandoc: answers with the `.json` file stored next to the
/// Markdown source named by the first argument.
pub fn sidecar_ast_tool() -> Arc<dyn ExternalTool> {
    Arc::new(FnTool::new("fake-pandoc", |input: ToolInput| {
        let source = PathBuf::from(&input.args[0]);
        let tree = fs::read(source.with_extension("json")).map_err(io_error)?;
        Ok(ToolOutput::from_stdout(tree))
    }))
}

/// Stands in for the page engine: writes a fake PDF unless the HTML input
/// contains `fail_marker`, in which case it exits with an error.
pub fn fake_page_engine(fail_marker: Option<&str>) -> Arc<dyn ExternalTool> {
    let marker = fail_marker.map(str::to_string);
    Arc::new(FnTool::new("fake-engine", move |input: ToolInput| {
        let html = fs::read_to_string(&input.args[0]).map_err(io_error)?;
        if let Some(marker) = &marker
            && html.contains(marker.as_str())
        {
            return Err(ToolError::Failed {
                program: "fake-engine".into(),
                code: Some(1),
                stderr: format!("refusing to paginate {}", marker),
            });
        }
        fs::write(&input.args[1], b"%PDF-1.7 fake").map_err(io_error)?;
        Ok(ToolOutput::default())
    }))
}

/// A page engine that keeps a copy of every HTML input it was given.
pub fn recording_page_engine(seen: Arc<Mutex<Vec<String>>>) -> Arc<dyn ExternalTool> {
    Arc::new(FnTool::new("recording-engine", move |input: ToolInput| {
        let html = fs::read_to_string(&input.args[0]).map_err(io_error)?;
        if let Ok(mut seen) = seen.lock() {
            seen.push(html);
        }
        fs::write(&input.args[1], b"%PDF-1.7 fake").map_err(io_error)?;
        Ok(ToolOutput::default())
    }))
}

/// Every `src="..."` value in `html`, in order.
pub fn image_sources(html: &str) -> Vec<String> {
    html.split("<img src=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .map(str::to_string)
        .collect()
}

/// Every stylesheet href in `html`, in order.
pub fn stylesheet_hrefs(html: &str) -> Vec<String> {
    html.split("<link rel=\"stylesheet\" href=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .map(str::to_string)
        .collect()
}

/// A page engine that counts its invocations.
pub fn counting_page_engine(calls: Arc<AtomicUsize>) -> Arc<dyn ExternalTool> {
    Arc::new(FnTool::new("counting-engine", move |input: ToolInput| {
        calls.fetch_add(1, Ordering::SeqCst);
        fs::write(&input.args[1], b"%PDF-1.7 fake").map_err(io_error)?;
        Ok(ToolOutput::default())
    }))
}

/// A temporary project with `drafts/` and `output/` directories.
pub struct Workspace {
    pub dir: TempDir,
    pub drafts: PathBuf,
    pub output: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let drafts = dir.path().join("drafts");
        let output = dir.path().join("output");
        fs::create_dir_all(&drafts).expect("create drafts dir");
        Self { dir, drafts, output }
    }

    /// Writes `<id>.md` with front matter and its `<id>.json` syntax tree.
    pub fn add_document(&self, id: &str, title: &str, blocks: Vec<Value>) -> PathBuf {
        let source = self.drafts.join(format!("{}.md", id));
        fs::write(
            &source,
            format!("---\ndocument_id: {}\ntitle: {}\nrevision: \"2.1\"\n---\n\nBody of {}.\n", id, title, id),
        )
        .expect("write markdown");
        let tree = fixtures::document(blocks);
        fs::write(source.with_extension("json"), tree.to_string()).expect("write syntax tree");
        source
    }

    pub fn html(&self, id: &str) -> PathBuf {
        self.output.join("html").join(format!("{}.html", id))
    }

    pub fn pdf(&self, id: &str) -> PathBuf {
        self.output.join("pdf").join(format!("{}.pdf", id))
    }

    pub fn cache(&self) -> PathBuf {
        self.output.join(".build_cache.json")
    }

    /// A builder wired to the fake AST tool and the given page engine.
    pub fn builder(&self, engine: Arc<dyn ExternalTool>) -> PipelineBuilder {
        PipelineBuilder::new()
            .with_ast_tool(sidecar_ast_tool())
            .with_ast_args(["{input}"])
            .with_page_engine(engine)
            .with_output_dir(&self.output)
            .with_asset_roots([self.dir.path().join("assets")])
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
