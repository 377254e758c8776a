use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, net::SocketAddr, path::Path, path::PathBuf};

const DEFAULT_DB_FILE: &str = "qrscan.sqlite3";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

/// Runtime settings. Every field has a default so a partial JSON file is
/// enough.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub database_path: PathBuf,
    pub listen_addr: SocketAddr,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DB_FILE),
            listen_addr: DEFAULT_LISTEN_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 3000))),
            log_level: "info".into(),
        }
    }
}

/// Values given on the command line or through the environment. They win
/// over the settings file.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub database_path: Option<PathBuf>,
    pub listen_addr: Option<SocketAddr>,
    pub log_level: Option<String>,
}

impl Settings {
    /// Reads `path` if given. A missing file means defaults; a file that
    /// does not parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        if let Some(path) = overrides.database_path {
            self.database_path = path;
        }
        if let Some(addr) = overrides.listen_addr {
            self.listen_addr = addr;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.listen_addr.port(), 3000);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"database_path": "/data/scans.db"}"#).unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.database_path, PathBuf::from("/data/scans.db"));
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"listen_addr": "127.0.0.1:4000", "log_level": "warn"}"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path))
            .unwrap()
            .with_overrides(SettingsOverrides {
                listen_addr: Some("0.0.0.0:8080".parse().unwrap()),
                ..SettingsOverrides::default()
            });
        assert_eq!(settings.listen_addr.port(), 8080);
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.database_path, PathBuf::from(DEFAULT_DB_FILE));
    }
}
