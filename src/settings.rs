use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chart::surface::Theme;
use crate::error::{FindashError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_file")]
    pub data_file: String,
    #[serde(default = "default_initial_balance")]
    pub initial_balance: f64,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub blur_sensitive: bool,
    /// Case-insensitive keywords; matching rows are hidden everywhere.
    #[serde(default)]
    pub ignores: Vec<String>,
}

fn default_data_file() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("findash")
        .join("combined_transactions.csv")
        .to_string_lossy()
        .to_string()
}

fn default_initial_balance() -> f64 {
    5000.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            initial_balance: default_initial_balance(),
            theme: Theme::default(),
            user_name: String::new(),
            blur_sensitive: false,
            ignores: Vec::new(),
        }
    }
}

impl Settings {
    /// Add a keyword unless an equal one (ignoring case) is present.
    /// Returns whether the list changed.
    pub fn add_ignore(&mut self, keyword: &str) -> bool {
        let keyword = keyword.trim();
        if keyword.is_empty() || self.ignores.iter().any(|k| k.eq_ignore_ascii_case(keyword)) {
            return false;
        }
        self.ignores.push(keyword.to_string());
        true
    }

    pub fn remove_ignore(&mut self, keyword: &str) -> bool {
        let before = self.ignores.len();
        self.ignores.retain(|k| !k.eq_ignore_ascii_case(keyword.trim()));
        self.ignores.len() != before
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(shellexpand_path(&self.data_file))
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("findash")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

/// Missing or unreadable files fall back to defaults.
pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("ignoring invalid settings file {}: {e}", path.display());
            Settings::default()
        })
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| FindashError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}
