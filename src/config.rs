//! Runtime configuration
//!
//! Values come from the command line or the environment (a `.env` file is
//! loaded first). Credentials are plain configuration; nothing here talks
//! to the network.

use std::time::Duration;

use crate::error::{LabError, Result};

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DB_PATH: &str = "ragnarok.db";

/// Generation service settings
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Total attempts per request, 1 = no retry
    pub max_attempts: u32,
}

impl GenerationConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: 1,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(LabError::config("OPENAI_API_KEY is not set"));
        }
        if self.model.trim().is_empty() {
            return Err(LabError::config("model name is empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LabError::config(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.timeout_secs == 0 {
            return Err(LabError::config("timeout must be at least 1 second"));
        }
        if !(1..=5).contains(&self.max_attempts) {
            return Err(LabError::config(format!(
                "retry attempts {} is outside 1..=5",
                self.max_attempts
            )));
        }
        Ok(())
    }
}

/// Where the workout log lives
#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    Sqlite { path: String },
    Sheets { url: String, access_token: String },
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        match self {
            StoreConfig::Sqlite { path } if path.trim().is_empty() => {
                Err(LabError::config("database path is empty"))
            }
            StoreConfig::Sheets { url, .. } if url.trim().is_empty() => {
                Err(LabError::config("RAGNAROK_SHEET_URL is not set"))
            }
            StoreConfig::Sheets { access_token, .. } if access_token.trim().is_empty() => {
                Err(LabError::config("GOOGLE_SHEETS_TOKEN is not set"))
            }
            _ => Ok(()),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sqlite {
            path: DEFAULT_DB_PATH.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = GenerationConfig::new("sk-test");
        assert_eq!(cfg.model, DEFAULT_MODEL);
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.max_attempts, 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_missing_key() {
        let cfg = GenerationConfig::new("  ");
        assert!(matches!(cfg.validate(), Err(LabError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_temperature_and_timeout() {
        let mut cfg = GenerationConfig::new("sk-test");
        cfg.temperature = 3.0;
        assert!(cfg.validate().is_err());

        let mut cfg = GenerationConfig::new("sk-test");
        cfg.timeout_secs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = GenerationConfig::new("sk-test");
        cfg.max_attempts = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_store_config_validation() {
        assert!(StoreConfig::default().validate().is_ok());
        let sheets = StoreConfig::Sheets {
            url: "https://docs.google.com/spreadsheets/d/abc/edit".into(),
            access_token: String::new(),
        };
        assert!(sheets.validate().is_err());
    }
}
