mod common;

use common::{init_logging, TestResult};
use folio::{parse_front_matter, ConfigTree, DocumentRegistry, Family, PipelineBuilder, PipelineConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn write(path: &Path, text: &str) -> TestResult {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}

#[test]
fn test_profile_and_local_layers_override_defaults() -> TestResult {
    init_logging();
    let dir = tempfile::tempdir()?;
    write(
        &dir.path().join("default.yaml"),
        "paths:\n  drafts: docs\n  output: build\npipeline:\n  ast_tool:\n    timeout_secs: 30\n",
    )?;
    write(
        &dir.path().join("profiles/print.yaml"),
        "pipeline:\n  page_engine:\n    program: prince\n  batch:\n    max_workers: 3\n",
    )?;
    write(&dir.path().join("local.yaml"), "watch:\n  debounce_ms: 250\n")?;

    let config = PipelineConfig::load(dir.path(), Some("print"))?;
    assert_eq!(config.paths.drafts, PathBuf::from("docs"));
    assert_eq!(config.paths.cache_path(), PathBuf::from("build/.build_cache.json"));
    assert_eq!(config.pipeline.ast_tool.program, "pandoc");
    assert_eq!(config.pipeline.ast_tool.timeout(), Duration::from_secs(30));
    assert_eq!(config.pipeline.page_engine.program, "prince");
    assert_eq!(config.pipeline.page_engine.timeout_secs, 120);
    assert_eq!(config.max_workers(), 3);
    assert_eq!(config.watch.debounce(), Duration::from_millis(250));

    let tree = ConfigTree::load(dir.path(), None)?;
    assert!(!tree.has("pipeline.page_engine.program"));
    assert_eq!(tree.get("paths.output").and_then(|v| v.as_str()), Some("build"));
    Ok(())
}

#[test]
fn test_missing_config_directory_gives_defaults() -> TestResult {
    init_logging();
    let dir = tempfile::tempdir()?;
    let config = PipelineConfig::load(dir.path().join("absent"), Some("ci"))?;
    assert_eq!(config, PipelineConfig::default());
    assert!(config.max_workers() >= 1);
    Ok(())
}

#[test]
fn test_builder_from_config_uses_configured_paths() -> TestResult {
    init_logging();
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("site");
    write(
        &dir.path().join("default.yaml"),
        &format!("paths:\n  output: {}\n", output.display()),
    )?;
    let config = PipelineConfig::load(dir.path(), None)?;
    let pipeline = PipelineBuilder::new().with_config(&config)?.build()?;
    assert_eq!(pipeline.html_path("SOP-1"), output.join("html/SOP-1.html"));
    assert_eq!(pipeline.pdf_path("SOP-1"), output.join("pdf/SOP-1.pdf"));
    assert_eq!(pipeline.cache_path(), output.join(".build_cache.json"));
    Ok(())
}

#[test]
fn test_legacy_front_matter_keys_and_registry() -> TestResult {
    init_logging();
    let dir = tempfile::tempdir()?;
    let legacy = "---\ndoc_id: SOP-200\ntitle: Cleaning\nowner: Quality\neffective_date: 2024-03-01\nrevision: 2.0\ntags: [gmp, cleaning]\n---\nBody\n";
    write(&dir.path().join("sop-200.md"), legacy)?;
    write(
        &dir.path().join("std-105.md"),
        "---\ndocument_id: STD-105\ntitle: Standard\nstatus: Effective\ndownstream_apn: SOP-200\n---\n",
    )?;

    let (metadata, body) = parse_front_matter(legacy)?;
    assert_eq!(body, "Body\n");
    assert_eq!(metadata.document_id.as_deref(), Some("SOP-200"));
    assert_eq!(metadata.author.as_deref(), Some("Quality"));
    assert_eq!(metadata.date.as_deref(), Some("2024-03-01"));
    assert_eq!(metadata.revision.as_deref(), Some("2.0"));
    assert_eq!(
        metadata.extra.get("tags_joined").and_then(|v| v.as_str()),
        Some("gmp, cleaning")
    );

    let registry = DocumentRegistry::scan(dir.path())?;
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.get("STD-105").map(|r| r.status.as_str()), Some("Effective"));
    assert_eq!(registry.by_family(Family::Sop).count(), 1);
    assert!(registry.validate_cross_references().is_empty());
    Ok(())
}
