//! Builds with relative drafts, assets and output directories, as in the
//! default configuration. Kept in its own test binary because it changes the
//! process working directory.

mod common;

use common::fixtures::{document, image};
use common::{image_sources, init_logging, recording_page_engine, sidecar_ast_tool, TestResult};
use folio::PipelineBuilder;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[test]
fn test_relative_directories_produce_working_image_links() -> TestResult {
    init_logging();
    let dir = tempfile::tempdir()?;
    env::set_current_dir(dir.path())?;
    fs::create_dir_all("drafts")?;
    fs::create_dir_all("assets")?;
    fs::write("assets/logo.png", b"png")?;
    fs::write(
        "drafts/SOP-060.md",
        "---\ndocument_id: SOP-060\ntitle: Labeling\n---\n\nBody.\n",
    )?;
    fs::write(
        "drafts/SOP-060.json",
        document(vec![image("logo.png", "Company logo")]).to_string(),
    )?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let built = PipelineBuilder::new()
        .with_ast_tool(sidecar_ast_tool())
        .with_ast_args(["{input}"])
        .with_page_engine(recording_page_engine(Arc::clone(&seen)))
        .with_output_dir("output")
        .with_asset_roots(["assets"])
        .build()?
        .build(Path::new("drafts/SOP-060.md"))?;
    assert_eq!(built.warnings, 0);

    let html_dir = dir.path().join("output/html");
    let html = fs::read_to_string(html_dir.join("SOP-060.html"))?;
    let sources = image_sources(&html);
    assert_eq!(sources, vec!["../../assets/logo.png".to_string()]);
    assert!(html_dir.join(&sources[0]).is_file());

    let engine_inputs = seen.lock().map_err(|e| e.to_string())?.clone();
    let engine_sources = image_sources(&engine_inputs[0]);
    assert_eq!(engine_sources.len(), 1);
    assert!(Path::new(&engine_sources[0]).is_absolute());
    assert!(Path::new(&engine_sources[0]).is_file());
    Ok(())
}
