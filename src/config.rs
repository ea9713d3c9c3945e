// ⚙️ Settings - Where the ledger lives and how it behaves
//
// Loaded from ~/.config/contract-ledger/settings.toml, or from the file
// given with --config. Every key is optional; a missing key keeps its
// default, so an empty file is a valid configuration.
//
// The CSV delimiter must be a single ASCII character: the writer works on
// bytes, and a multi-byte character would split into invalid UTF-8.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const APP_DIR: &str = "contract-ledger";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite file holding portfolio snapshots
    pub database_path: PathBuf,

    /// Key of the snapshot row the portfolio lives under
    pub record_id: String,

    /// Debounce window between an edit and its snapshot write
    pub autosave_delay_ms: u64,

    /// Field separator for CSV export; one ASCII character
    pub csv_delimiter: String,

    /// Default tracing filter; RUST_LOG wins when set
    pub log_filter: String,

    /// Bind address for the API server
    pub server_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            record_id: "portfolio".to_string(),
            autosave_delay_ms: 1500,
            csv_delimiter: ",".to_string(),
            log_filter: "info".to_string(),
            server_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Settings {
    /// Load from an explicit path, else the default location, else defaults.
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let mut chars = self.csv_delimiter.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Ok(()),
            (Some(c), None) if c.is_ascii() => Ok(()),
            _ => bail!(
                "csv_delimiter must be a single ASCII character, got {:?}",
                self.csv_delimiter
            ),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join("settings.toml"))
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Non-ASCII or empty values fall back to a comma
    pub fn csv_delimiter_byte(&self) -> u8 {
        match self.csv_delimiter.bytes().next() {
            Some(b) if b.is_ascii() => b,
            _ => b',',
        }
    }

    /// Install the global tracing subscriber (binaries only)
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_filter));

        // A second init (tests, embedding) keeps the first subscriber
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join(APP_DIR).join("ledger.db"))
        .unwrap_or_else(|| PathBuf::from("ledger.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            record_id = "vendor-42"
            csv_delimiter = ";"
            "#,
        )
        .unwrap();

        assert_eq!(settings.record_id, "vendor-42");
        assert_eq!(settings.csv_delimiter_byte(), b';');
        assert_eq!(settings.autosave_delay(), Duration::from_millis(1500));
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn test_empty_delimiter_falls_back_to_comma() {
        let settings = Settings {
            csv_delimiter: String::new(),
            ..Settings::default()
        };
        assert_eq!(settings.csv_delimiter_byte(), b',');
    }

    #[test]
    fn test_non_ascii_delimiter_is_rejected() {
        let err = Settings::from_toml("csv_delimiter = \"é\"").unwrap_err();
        assert!(err.to_string().contains("single ASCII character"));
        assert!(Settings::from_toml("csv_delimiter = \";;\"").is_err());
        assert!(Settings::from_toml("csv_delimiter = \"\\t\"").is_ok());

        let settings = Settings {
            csv_delimiter: "é".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.csv_delimiter_byte(), b',');
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Settings::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "database_path = \"/tmp/x.db\"\nautosave_delay_ms = 250\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(settings.autosave_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(Settings::from_toml("autosave_delay_ms = \"soon\"").is_err());
    }
}
