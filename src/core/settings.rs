use crate::files::fs::DeleteMode;
use crate::shared::paths::{ensure_dir, get_settings_path};
use crate::tags::filter::DEFAULT_SEARCH_DEBOUNCE_MS;
use crate::tags::index::ScanMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub recursive_scan: bool,
    pub delete_mode: DeleteMode,
    pub search_debounce_ms: u64,
    pub watch_directories: bool,
    pub last_directory: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            recursive_scan: false,
            delete_mode: DeleteMode::Trash,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            watch_directories: true,
            last_directory: None,
        }
    }
}

impl AppSettings {
    pub fn scan_mode(&self) -> ScanMode {
        if self.recursive_scan {
            ScanMode::Recursive
        } else {
            ScanMode::Shallow
        }
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub fn load_settings() -> AppSettings {
    load_settings_from(&get_settings_path())
}

/// Missing or unreadable settings fall back to defaults.
pub fn load_settings_from(path: &Path) -> AppSettings {
    if !path.exists() {
        return AppSettings::default();
    }

    match load_settings_from_file(path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(target: "system", "Failed to load settings: {}, using defaults", e);
            AppSettings::default()
        }
    }
}

fn load_settings_from_file(path: &Path) -> Result<AppSettings, SettingsError> {
    let contents = std::fs::read_to_string(path)?;
    let settings = serde_json::from_str(&contents)?;
    Ok(settings)
}

pub fn save_settings(settings: &AppSettings) -> Result<(), SettingsError> {
    save_settings_to(&get_settings_path(), settings)
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<(), SettingsError> {
    if let Some(dir) = path.parent() {
        ensure_dir(dir)?;
    }

    let contents = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, contents)?;
    Ok(())
}
