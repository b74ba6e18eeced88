use fomod_common::Settings;
use std::path::{Path, PathBuf};

pub const DEFAULT_SETTINGS_NAME: &str = "fomod-editor.json";

/// Settings file used when none is given explicitly
pub fn settings_path(cwd: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => cwd.join(path),
        None => cwd.join(DEFAULT_SETTINGS_NAME),
    }
}

/// Load settings, falling back to defaults for a missing or broken file
pub fn load_settings(cwd: &Path, explicit: Option<&Path>) -> Settings {
    Settings::load(&settings_path(cwd, explicit))
}
