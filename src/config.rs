//! Layered pipeline configuration.
//!
//! A config directory may hold `default.yaml`, `profiles/<name>.yaml` and
//! `local.yaml`. Each file present is deep-merged over the previous ones:
//! mappings merge key by key, every other value replaces. Missing files are
//! skipped, so an empty directory yields the built-in defaults.

use folio_render_paged::DEFAULT_ENGINE_ARGS;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file '{path}' is not valid YAML: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How to invoke one external program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub program: String,
    /// Argument template; placeholders are filled per invocation.
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl ToolConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn ast_default() -> Self {
        Self {
            program: "pandoc".to_string(),
            args: ["{input}", "-f", "markdown", "-t", "json"].map(String::from).to_vec(),
            timeout_secs: 60,
        }
    }

    fn page_engine_default() -> Self {
        Self {
            program: "weasyprint".to_string(),
            args: DEFAULT_ENGINE_ARGS.map(String::from).to_vec(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub drafts: PathBuf,
    pub output: PathBuf,
    /// Defaults to `<output>/.build_cache.json`.
    pub cache_file: Option<PathBuf>,
    pub asset_roots: Vec<PathBuf>,
    pub layout_profile: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            drafts: PathBuf::from("drafts"),
            output: PathBuf::from("output"),
            cache_file: None,
            asset_roots: vec![PathBuf::from("assets")],
            layout_profile: None,
        }
    }
}

impl PathsConfig {
    pub fn html_dir(&self) -> PathBuf {
        self.output.join("html")
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.output.join("pdf")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_file
            .clone()
            .unwrap_or_else(|| self.output.join(".build_cache.json"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads for `build-all`. Unset means one per CPU.
    pub max_workers: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagesConfig {
    pub ast_tool: ToolConfig,
    pub page_engine: ToolConfig,
    pub batch: BatchConfig,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            ast_tool: ToolConfig::ast_default(),
            page_engine: ToolConfig::page_engine_default(),
            batch: BatchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 2000 }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub pipeline: StagesConfig,
    pub watch: WatchConfig,
}

impl PipelineConfig {
    /// Loads and merges the config files in `dir` for the given profile.
    pub fn load(dir: impl AsRef<Path>, profile: Option<&str>) -> Result<Self, ConfigError> {
        ConfigTree::load(dir, profile)?.to_config()
    }

    /// Worker count for batch builds, never below one.
    pub fn max_workers(&self) -> usize {
        self.pipeline.batch.max_workers.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// The merged, untyped configuration tree with dot-path access.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTree {
    root: Value,
}

impl Default for ConfigTree {
    fn default() -> Self {
        Self {
            root: Value::Mapping(Mapping::new()),
        }
    }
}

impl ConfigTree {
    pub fn load(dir: impl AsRef<Path>, profile: Option<&str>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let mut layers = vec![dir.join("default.yaml")];
        if let Some(name) = profile {
            layers.push(dir.join("profiles").join(format!("{}.yaml", name)));
        }
        layers.push(dir.join("local.yaml"));

        let mut tree = Self::default();
        for path in layers {
            if !path.is_file() {
                log::debug!("Config layer {} not present, skipping", path.display());
                continue;
            }
            let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let layer: Value = serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
                path: path.clone(),
                source,
            })?;
            match layer {
                Value::Null => {}
                Value::Mapping(_) => {
                    log::debug!("Merging config layer {}", path.display());
                    tree.merge(layer);
                }
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "{} must contain a mapping at the top level",
                        path.display()
                    )));
                }
            }
        }
        Ok(tree)
    }

    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Deep-merges `overlay` into this tree.
    pub fn merge(&mut self, overlay: Value) {
        deep_merge(&mut self.root, overlay);
    }

    /// Looks up a dotted key such as `pipeline.batch.max_workers`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.root, |node, key| node.get(key))
    }

    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Sets a dotted key, creating intermediate mappings as needed.
    pub fn set(&mut self, path: &str, value: Value) {
        let keys: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = keys.split_last() else {
            return;
        };
        let mut node = &mut self.root;
        for key in parents {
            if !node.is_mapping() {
                *node = Value::Mapping(Mapping::new());
            }
            let Some(map) = node.as_mapping_mut() else {
                return;
            };
            node = map
                .entry(Value::String(key.to_string()))
                .or_insert(Value::Mapping(Mapping::new()));
        }
        if !node.is_mapping() {
            *node = Value::Mapping(Mapping::new());
        }
        if let Some(map) = node.as_mapping_mut() {
            map.insert(Value::String(last.to_string()), value);
        }
    }

    /// Overlays the tree on the built-in defaults and deserializes the result.
    pub fn to_config(&self) -> Result<PipelineConfig, ConfigError> {
        let mut merged = serde_yaml::to_value(PipelineConfig::default())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        deep_merge(&mut merged, self.root.clone());
        serde_yaml::from_value(merged).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::load(dir.path(), None).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.pipeline.ast_tool.program, "pandoc");
        assert_eq!(config.watch.debounce(), Duration::from_secs(2));
        assert_eq!(config.paths.cache_path(), PathBuf::from("output/.build_cache.json"));
        assert!(config.max_workers() >= 1);
    }

    #[test]
    fn test_layers_merge_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "default.yaml",
            "paths:\n  drafts: docs\n  output: build\npipeline:\n  batch:\n    max_workers: 2\n",
        );
        write(dir.path(), "profiles/ci.yaml", "pipeline:\n  batch:\n    max_workers: 8\n");
        write(dir.path(), "local.yaml", "watch:\n  debounce_ms: 500\n");

        let config = PipelineConfig::load(dir.path(), Some("ci")).unwrap();
        assert_eq!(config.paths.drafts, PathBuf::from("docs"));
        assert_eq!(config.paths.output, PathBuf::from("build"));
        assert_eq!(config.max_workers(), 8);
        assert_eq!(config.watch.debounce_ms, 500);
        assert_eq!(config.pipeline.page_engine.program, "weasyprint");

        let without_profile = PipelineConfig::load(dir.path(), None).unwrap();
        assert_eq!(without_profile.max_workers(), 2);
    }

    #[test]
    fn test_dot_path_access() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "default.yaml", "pipeline:\n  ast_tool:\n    program: pandoc3\n");
        let mut tree = ConfigTree::load(dir.path(), None).unwrap();
        assert_eq!(
            tree.get("pipeline.ast_tool.program").and_then(Value::as_str),
            Some("pandoc3")
        );
        assert!(!tree.has("pipeline.batch.max_workers"));

        tree.set("pipeline.batch.max_workers", Value::from(3));
        assert!(tree.has("pipeline.batch.max_workers"));
        let config = tree.to_config().unwrap();
        assert_eq!(config.max_workers(), 3);
        assert_eq!(config.pipeline.ast_tool.program, "pandoc3");
        assert_eq!(config.pipeline.ast_tool.timeout_secs, 60);
    }

    #[test]
    fn test_scalar_replaces_mapping() {
        let mut base: Value = serde_yaml::from_str("a:\n  b: 1\n  c: 2\n").unwrap();
        deep_merge(&mut base, serde_yaml::from_str("a:\n  b: 5\nd: x\n").unwrap());
        let tree = ConfigTree::from_value(base);
        assert_eq!(tree.get("a.b").and_then(Value::as_i64), Some(5));
        assert_eq!(tree.get("a.c").and_then(Value::as_i64), Some(2));
        assert_eq!(tree.get("d").and_then(Value::as_str), Some("x"));
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "default.yaml", "paths: [unclosed\n");
        let err = PipelineConfig::load(dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));

        write(dir.path(), "default.yaml", "- a\n- b\n");
        let err = PipelineConfig::load(dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
