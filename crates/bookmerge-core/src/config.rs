use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Application configuration, loaded from
/// `~/.config/bookmerge/config.toml`. Every field has a default, so a
/// missing file or a partial file both work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the catalog database lives.
    pub database_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("bookmerge");
        Self {
            database_path: data_dir.join("catalog.db").to_string_lossy().to_string(),
        }
    }
}

impl AppConfig {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("bookmerge")
            .join("config.toml")
    }

    /// Load from the given path, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Write the config out as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(config.database_path.ends_with("catalog.db"));
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig {
            database_path: "/tmp/test-catalog.db".to_string(),
        };
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.database_path, "/tmp/test-catalog.db");
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("bookmerge").join("config.toml");

        AppConfig::default().save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert!(loaded.database_path.ends_with("catalog.db"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert!(config.database_path.ends_with("catalog.db"));
    }
}
