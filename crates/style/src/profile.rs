//! Layout profiles: which engine renders a document family, where its
//! stylesheets live, and which CSS class each block type receives.

use folio_types::{Block, BlockType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Failed to read layout profile '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Layout profile is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Layout profile is missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("Invalid layout profile: {0}")]
    Invalid(String),
}

/// The backend that turns HTML into a paginated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderingEngine {
    Weasyprint,
    Scribus,
}

impl RenderingEngine {
    /// Whether the engine can paginate HTML + CSS input.
    pub fn renders_html(&self) -> bool {
        match self {
            RenderingEngine::Weasyprint => true,
            RenderingEngine::Scribus => false,
        }
    }
}

impl fmt::Display for RenderingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderingEngine::Weasyprint => f.write_str("weasyprint"),
            RenderingEngine::Scribus => f.write_str("scribus"),
        }
    }
}

/// A style-map value: either one class for every block of the type, or a
/// table keyed by heading level / callout type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleEntry {
    Class(String),
    Keyed(BTreeMap<String, String>),
}

/// Block type (and optional sub-key) to CSS class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleMap {
    entries: BTreeMap<String, StyleEntry>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, block_type: BlockType, class: impl Into<String>) -> Self {
        self.entries
            .insert(block_type.as_str().to_string(), StyleEntry::Class(class.into()));
        self
    }

    pub fn with_keyed(
        mut self,
        block_type: BlockType,
        sub_key: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        let entry = self
            .entries
            .entry(block_type.as_str().to_string())
            .or_insert_with(|| StyleEntry::Keyed(BTreeMap::new()));
        match entry {
            StyleEntry::Keyed(map) => {
                map.insert(sub_key.into(), class.into());
            }
            StyleEntry::Class(_) => {
                let mut map = BTreeMap::new();
                map.insert(sub_key.into(), class.into());
                *entry = StyleEntry::Keyed(map);
            }
        }
        self
    }

    /// Looks up the class for a block type and optional sub-key.
    ///
    /// Sub-keys are matched exactly, then case-insensitively, then against a
    /// `default` entry of the keyed table.
    pub fn lookup(&self, block_type: BlockType, sub_key: Option<&str>) -> Option<&str> {
        match self.entries.get(block_type.as_str())? {
            StyleEntry::Class(class) => Some(class.as_str()),
            StyleEntry::Keyed(map) => {
                let by_key = sub_key.and_then(|key| {
                    map.get(key).or_else(|| {
                        map.iter()
                            .find(|(k, _)| k.eq_ignore_ascii_case(key))
                            .map(|(_, v)| v)
                    })
                });
                by_key.or_else(|| map.get("default")).map(String::as_str)
            }
        }
    }

    /// Class for a concrete block.
    pub fn class_for(&self, block: &Block) -> Option<&str> {
        let sub_key = block.style_sub_key();
        self.lookup(block.block_type(), sub_key.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    rendering_engine: RenderingEngine,
    resources: BTreeMap<String, PathBuf>,
    styles_map: StyleMap,
}

/// A loaded layout profile. Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutProfile {
    pub rendering_engine: RenderingEngine,
    /// Resource name to path, resolved against the profile's directory.
    pub resources: BTreeMap<String, PathBuf>,
    pub styles_map: StyleMap,
}

impl Default for LayoutProfile {
    fn default() -> Self {
        Self {
            rendering_engine: RenderingEngine::Weasyprint,
            resources: BTreeMap::new(),
            styles_map: StyleMap::default(),
        }
    }
}

impl LayoutProfile {
    /// Resource keys whose stylesheets come first, in this order.
    pub const ORDERED_STYLESHEETS: [&'static str; 2] = ["layout_css", "theme_css"];

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_json_str(&text, base)
    }

    /// Parses and validates a profile. Relative resource paths resolve against `base_dir`.
    pub fn from_json_str(text: &str, base_dir: &Path) -> Result<Self, ProfileError> {
        let mut value: Value = serde_json::from_str(text)?;
        if let Some(inner) = value.get_mut("layout_profile").map(Value::take) {
            value = inner;
        }
        let object = value
            .as_object()
            .ok_or_else(|| ProfileError::Invalid("top level must be an object".to_string()))?;
        for key in ["rendering_engine", "resources", "styles_map"] {
            if !object.contains_key(key) {
                return Err(ProfileError::MissingKey(key));
            }
        }

        let raw: RawProfile = serde_json::from_value(value)?;
        let resources = raw
            .resources
            .into_iter()
            .map(|(name, p)| {
                let resolved = if p.is_absolute() { p } else { base_dir.join(p) };
                (name, resolved)
            })
            .collect();

        Ok(Self {
            rendering_engine: raw.rendering_engine,
            resources,
            styles_map: raw.styles_map,
        })
    }

    pub fn resource(&self, name: &str) -> Option<&Path> {
        self.resources.get(name).map(PathBuf::as_path)
    }

    /// Stylesheets in cascade order: layout CSS, theme CSS, then any other
    /// `.css` resource by name.
    pub fn stylesheets(&self) -> Vec<&Path> {
        let mut sheets: Vec<&Path> = Self::ORDERED_STYLESHEETS
            .iter()
            .filter_map(|key| self.resource(key))
            .collect();
        sheets.extend(
            self.resources
                .iter()
                .filter(|(name, p)| {
                    !Self::ORDERED_STYLESHEETS.contains(&name.as_str())
                        && p.extension().is_some_and(|ext| ext == "css")
                })
                .map(|(_, p)| p.as_path()),
        );
        sheets
    }
}
