//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "import": { "synonyms": { "name": ["fornecedor"] } },
//!   "dispatch": { "companyName": "Cobrança Pro", "outboxFile": "outbox.jsonl" }
//! }
//! ```
//! Sections and keys this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Environment variable pointing at the data directory
pub const DIR_ENV: &str = "COBRANCA_DIR";

/// Environment variable overriding "today" (YYYY-MM-DD) for overdue math
pub const TODAY_ENV: &str = "COBRANCA_TODAY";

const SETTINGS_FILE: &str = "settings.json";
const DEFAULT_OUTBOX_FILE: &str = "outbox.jsonl";
const DEFAULT_COMPANY_NAME: &str = "Cobrança Pro";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    import: ImportSettings,
    #[serde(default)]
    dispatch: DispatchSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Import section of the settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSettings {
    /// Extra header synonyms per field, tried after the built-in ones.
    /// Keys: name, phone, invoiceNumber, noteNumber, dueDate,
    /// principal, interest, total, overdueDays.
    #[serde(default)]
    pub synonyms: HashMap<String, Vec<String>>,
}

/// Dispatch section of the settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSettings {
    #[serde(default = "default_company_name")]
    pub company_name: String,
    /// Outbox file, relative to the data directory unless absolute
    #[serde(default = "default_outbox_file")]
    pub outbox_file: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            company_name: default_company_name(),
            outbox_file: default_outbox_file(),
        }
    }
}

fn default_company_name() -> String {
    DEFAULT_COMPANY_NAME.to_string()
}

fn default_outbox_file() -> String {
    DEFAULT_OUTBOX_FILE.to_string()
}

/// Cobrança configuration (simplified view of settings)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub import: ImportSettings,
    pub dispatch: DispatchSettings,
    /// Reference date override for overdue-day derivation
    pub today_override: Option<NaiveDate>,
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing or unreadable settings file falls back to defaults.
    /// `COBRANCA_TODAY` pins the reference date (for CI and reproducible runs).
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;

        let today_override = match std::env::var(TODAY_ENV) {
            Ok(value) => Some(
                NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                    .with_context(|| format!("{} must be YYYY-MM-DD, got '{}'", TODAY_ENV, value))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            import: raw.import,
            dispatch: raw.dispatch,
            today_override,
        })
    }

    /// Save config to the data directory
    /// Preserves other settings that this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;

        settings.import = self.import.clone();
        settings.dispatch = self.dispatch.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    /// Reference date for overdue-day derivation
    pub fn today(&self) -> NaiveDate {
        self.today_override
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Absolute path of the dispatch outbox
    pub fn outbox_path(&self, data_dir: &Path) -> PathBuf {
        let path = PathBuf::from(&self.dispatch.outbox_file);
        if path.is_absolute() {
            path
        } else {
            data_dir.join(path)
        }
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_file() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let config = Config::load(&dir).unwrap();
        assert!(config.import.synonyms.is_empty());
        assert_eq!(config.dispatch.company_name, DEFAULT_COMPANY_NAME);
        assert_eq!(config.outbox_path(&dir), dir.join(DEFAULT_OUTBOX_FILE));
    }

    #[test]
    fn test_save_preserves_unmanaged_sections() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        std::fs::write(
            dir.join(SETTINGS_FILE),
            r#"{"theme": {"dark": true}, "import": {"synonyms": {"name": ["fornecedor"]}}}"#,
        )
        .unwrap();

        let mut config = Config::load(&dir).unwrap();
        assert_eq!(config.import.synonyms["name"], vec!["fornecedor".to_string()]);

        config.dispatch.company_name = "Agro Cobranças".to_string();
        config.save(&dir).unwrap();

        let content = std::fs::read_to_string(dir.join(SETTINGS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["theme"]["dark"], serde_json::Value::Bool(true));
        assert_eq!(value["dispatch"]["companyName"], "Agro Cobranças");
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        std::fs::write(dir.join(SETTINGS_FILE), "{not json").unwrap();
        let config = Config::load(&dir).unwrap();
        assert_eq!(config.dispatch, DispatchSettings::default());
    }
}
