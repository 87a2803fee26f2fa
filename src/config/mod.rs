//! Runtime settings.
//!
//! Settings come from `config.toml` or `config.yaml` in the platform config
//! directory (`~/.config/deckhand` on Linux), or from an explicit `--config`
//! path. Every key is optional:
//!
//! ```toml
//! data_dir = "~/.local/share/deckhand"
//! icon_dirs = ["/usr/share/icons/Adwaita/symbolic/actions"]
//! poll_interval_ms = 16
//! save_delay_secs = 5
//! fake_devices = 0
//! ```
//!
//! `DECKHAND_DATA_DIR` overrides `data_dir`.

mod path;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::device::model::POLL_INTERVAL_MS;
use crate::error::{DeckError, Result};
use crate::persistence::SAVE_DELAY;

pub use path::{home_dir, resolve_path};

/// Directory name used under the platform config and data directories.
pub const APP_DIR: &str = "deckhand";

/// Environment variable overriding the profile data directory.
pub const DATA_DIR_ENV: &str = "DECKHAND_DATA_DIR";

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        trace!(extension = %ext, "Detecting config format from extension");
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Where profile documents are stored
    pub data_dir: Option<PathBuf>,
    /// Directories searched for `<icon-name>.png`
    pub icon_dirs: Vec<PathBuf>,
    pub poll_interval_ms: u64,
    pub save_delay_secs: u64,
    /// Virtual decks to create when no hardware is found
    pub fake_devices: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            icon_dirs: Vec::new(),
            poll_interval_ms: POLL_INTERVAL_MS,
            save_delay_secs: SAVE_DELAY.as_secs(),
            fake_devices: 0,
        }
    }
}

impl Settings {
    /// Platform directory holding the config file.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR))
    }

    /// Load settings from `explicit`, or from the first config file found in
    /// [`Self::config_dir`]. No file at the default location means defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::ConfigParse`] for unreadable or invalid files,
    /// and for an explicit path that does not exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_dir().and_then(|dir| {
                ["config.toml", "config.yaml", "config.yml"]
                    .iter()
                    .map(|name| dir.join(name))
                    .find(|candidate| candidate.is_file())
            }),
        };

        let Some(path) = path else {
            debug!("No config file, using defaults");
            return Ok(Self::default());
        };
        Self::load_file(&path)
    }

    /// Load one config file. Relative paths inside it are resolved against
    /// the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::ConfigParse`] when the file cannot be read or
    /// parsed.
    pub fn load_file(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_extension(path).ok_or_else(|| {
            DeckError::ConfigParse(format!(
                "Unknown config format for {} (expected .toml or .yaml)",
                path.display()
            ))
        })?;
        let content = fs::read_to_string(path)
            .map_err(|e| DeckError::ConfigParse(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), ?format, "Loading config");

        let mut settings = Self::parse(&content, format)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        settings.resolve_paths(base)?;
        Ok(settings)
    }

    /// Parse settings text.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::ConfigParse`] on syntax errors and unknown keys.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| DeckError::ConfigParse(format!("YAML: {e}")))
            }
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| DeckError::ConfigParse(format!("TOML: {e}")))
            }
        }
    }

    fn resolve_paths(&mut self, base: &Path) -> Result<()> {
        if let Some(dir) = &self.data_dir {
            self.data_dir = Some(resolve_path(dir, base)?);
        }
        self.icon_dirs = self
            .icon_dirs
            .iter()
            .map(|dir| resolve_path(dir, base))
            .collect::<Result<_>>()?;
        Ok(())
    }

    /// Profile data directory: `DECKHAND_DATA_DIR`, then `data_dir`, then
    /// the platform data directory.
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::data_dir().map_or_else(|| PathBuf::from(".").join(APP_DIR), |dir| dir.join(APP_DIR))
    }

    /// Poll cadence, at least one millisecond.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub const fn save_delay(&self) -> Duration {
        Duration::from_secs(self.save_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(ConfigFormat::from_extension(Path::new("config.toml")), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension(Path::new("config.YML")), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension(Path::new("config.json")), None);
        assert_eq!(ConfigFormat::from_extension(Path::new("config")), None);
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.poll_interval(), Duration::from_millis(16));
        assert_eq!(settings.save_delay(), Duration::from_secs(5));
        assert_eq!(settings.fake_devices, 0);
    }

    #[test]
    fn test_toml_partial() {
        let settings = Settings::parse("fake_devices = 2\npoll_interval_ms = 0\n", ConfigFormat::Toml).unwrap();
        assert_eq!(settings.fake_devices, 2);
        assert_eq!(settings.poll_interval(), Duration::from_millis(1));
        assert_eq!(settings.save_delay_secs, 5);
    }

    #[test]
    fn test_yaml() {
        let settings = Settings::parse("icon_dirs:\n  - /icons\nsave_delay_secs: 1\n", ConfigFormat::Yaml).unwrap();
        assert_eq!(settings.icon_dirs, vec![PathBuf::from("/icons")]);
        assert_eq!(settings.save_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Settings::parse("colour = true", ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, DeckError::ConfigParse(_)));
    }

    #[test]
    fn test_load_file_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "data_dir = \"profiles\"\nicon_dirs = [\"icons\"]\n").unwrap();

        let settings = Settings::load_file(&path).unwrap();
        assert_eq!(settings.data_dir, Some(dir.path().join("profiles")));
        assert_eq!(settings.icon_dirs, vec![dir.path().join("icons")]);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/deckhand.toml"))).is_err());
    }
}
