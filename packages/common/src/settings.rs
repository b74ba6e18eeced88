//! # Settings
//!
//! Editor configuration shared by the importer, exporter and command engine.
//!
//! Settings are stored as pretty-printed JSON. Every field has a default, so
//! a partial file only overrides the keys it names and an unreadable file
//! yields the defaults. The `defaults` table merges per tag and per field:
//! naming one tag keeps the built-in entries of the others.

use crate::CommonResult;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::filesystem::FileSystem;

/// Maximum number of remembered packages
pub const MAX_RECENT_FILES: usize = 5;

/// Root settings structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,

    /// Checks performed when a package is opened
    pub load: CheckSettings,

    /// Checks performed when a package is saved
    pub save: CheckSettings,

    /// Property values seeded into newly added nodes, keyed by tag
    #[serde(deserialize_with = "merge_defaults")]
    pub defaults: BTreeMap<String, DefaultProperty>,

    /// Most recently opened packages, newest first
    pub recent_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Preview refresh level:
    /// 0 never, 1 manual only, 2 also on selection, 3 also on every change
    pub code_refresh: u8,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self { code_refresh: 3 }
    }
}

/// Validation and warning switches for one phase (load or save)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckSettings {
    /// Run schema validation
    pub validate: bool,

    /// Proceed even if validation fails
    pub validate_ignore: bool,

    /// Check for missing resources
    pub warnings: bool,

    /// Proceed even if resources are missing
    pub warn_ignore: bool,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            validate: true,
            validate_ignore: false,
            warnings: true,
            warn_ignore: true,
        }
    }
}

/// A default value for one property of a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultProperty {
    pub key: String,
    pub enabled: bool,
    pub value: String,
}

impl DefaultProperty {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            enabled: true,
            value: value.into(),
        }
    }
}

/// `defaults` entry as written in a settings file, any field may be left out
#[derive(Deserialize)]
struct DefaultOverride {
    key: Option<String>,
    enabled: Option<bool>,
    value: Option<String>,
}

fn builtin_defaults() -> BTreeMap<String, DefaultProperty> {
    let mut defaults = BTreeMap::new();
    defaults.insert("installSteps".to_string(), DefaultProperty::new("order", "Explicit"));
    defaults.insert(
        "optionalFileGroups".to_string(),
        DefaultProperty::new("order", "Explicit"),
    );
    defaults.insert("type".to_string(), DefaultProperty::new("name", "Optional"));
    defaults.insert("defaultType".to_string(), DefaultProperty::new("name", "Optional"));
    defaults
}

/// Lay the file's `defaults` table over the built-in one, field by field
fn merge_defaults<'de, D>(deserializer: D) -> Result<BTreeMap<String, DefaultProperty>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<String, DefaultOverride>::deserialize(deserializer)?;
    let mut defaults = builtin_defaults();

    for (tag, entry) in overrides {
        let base = defaults.get(&tag);
        let Some(key) = entry
            .key
            .or_else(|| base.map(|b| b.key.clone()))
            .filter(|key| !key.is_empty())
        else {
            warn!(tag = %tag, "Ignoring default without a property key");
            continue;
        };
        let merged = DefaultProperty {
            key,
            enabled: entry.enabled.or(base.map(|b| b.enabled)).unwrap_or(true),
            value: entry.value.or_else(|| base.map(|b| b.value.clone())).unwrap_or_default(),
        };
        defaults.insert(tag, merged);
    }

    Ok(defaults)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            load: CheckSettings::default(),
            save: CheckSettings::default(),
            defaults: builtin_defaults(),
            recent_files: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };

        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Ignoring malformed settings file");
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> CommonResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Enabled default property for a tag, if any
    pub fn default_for(&self, tag: &str) -> Option<&DefaultProperty> {
        self.defaults.get(tag).filter(|default| default.enabled)
    }

    /// Move `path` to the front of the recent files list
    ///
    /// Entries that are no longer directories are dropped and the list is
    /// capped at [`MAX_RECENT_FILES`].
    pub fn push_recent(&mut self, path: &Path, fs: &dyn FileSystem) {
        self.recent_files.retain(|p| p != path && fs.is_dir(p));
        self.recent_files.insert(0, path.to_path_buf());
        self.recent_files.truncate(MAX_RECENT_FILES);
    }

    pub fn clear_recent(&mut self) {
        self.recent_files.clear();
    }
}
