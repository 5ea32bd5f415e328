//! Application settings persistence for EstuGrow.
//!
//! Stores user preferences (data directory and storage backend) in a JSON
//! file at an OS-appropriate location.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which durable store holds the note collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// A single SQLite database file.
    #[default]
    Sqlite,
    /// One JSON file per key inside the data directory.
    File,
}

/// Persisted application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Directory holding the note database.
    pub data_directory: String,
    pub backend: StorageBackend,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory().to_string_lossy().to_string(),
            backend: StorageBackend::default(),
        }
    }
}

impl AppSettings {
    /// Path of the SQLite database used by [`StorageBackend::Sqlite`].
    pub fn database_path(&self) -> PathBuf {
        Path::new(&self.data_directory).join("estugrow.db")
    }
}

/// Returns the path to the settings JSON file.
///
/// - macOS / Linux: `~/.config/estugrow/settings.json`
/// - Windows: `%APPDATA%/EstuGrow/settings.json`
pub fn settings_file_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("EstuGrow").join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("estugrow").join("settings.json")
    }
}

/// Returns the default data directory, e.g. `~/.local/share/estugrow`.
pub fn default_data_directory() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local")
                .join("share")
        })
        .join("estugrow")
}

/// Loads settings from disk; returns defaults if the file is missing or corrupt.
pub fn load_settings() -> AppSettings {
    load_settings_from(&settings_file_path())
}

pub fn load_settings_from(path: &Path) -> AppSettings {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable settings file {}: {e}", path.display());
            AppSettings::default()
        }),
        Err(_) => AppSettings::default(),
    }
}

/// Saves settings to disk, creating parent directories as needed.
pub fn save_settings(settings: &AppSettings) -> Result<(), String> {
    save_settings_to(&settings_file_path(), settings)
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create settings directory: {e}"))?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {e}"))?;
    fs::write(path, json).map_err(|e| format!("Failed to write settings: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings_from(&dir.path().join("absent.json"));
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.backend, StorageBackend::Sqlite);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = AppSettings {
            data_directory: "/tmp/notes".to_string(),
            backend: StorageBackend::File,
        };

        save_settings_to(&path, &settings).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"dataDirectory\""));
        assert!(raw.contains("\"file\""));
        assert_eq!(load_settings_from(&path), settings);
    }

    #[test]
    fn test_corrupt_or_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        fs::write(&path, "{ nope").unwrap();
        assert_eq!(load_settings_from(&path), AppSettings::default());

        fs::write(&path, r#"{"backend":"file"}"#).unwrap();
        let partial = load_settings_from(&path);
        assert_eq!(partial.backend, StorageBackend::File);
        assert_eq!(partial.data_directory, AppSettings::default().data_directory);
    }

    #[test]
    fn test_database_path_is_inside_data_directory() {
        let settings = AppSettings {
            data_directory: "/data".to_string(),
            backend: StorageBackend::Sqlite,
        };
        assert_eq!(settings.database_path(), PathBuf::from("/data/estugrow.db"));
    }
}
