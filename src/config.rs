use std::{env, time::Duration};

use dotenvy::dotenv;
use tracing::Level;
use url::Url;

use crate::{debounce::Debouncer, error::ConfigError};

/// Tuning shared by every autosave session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Quiescence interval after the last edit before a save is attempted.
    pub debounce: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce: Debouncer::DEFAULT_INTERVAL,
        }
    }
}

impl AutosaveConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub log_level: Level,
    /// Without it the binary runs against the in-memory server.
    pub database_url: Option<Url>,
    pub autosave: AutosaveConfig,
}

impl Settings {
    /// Reads `LOG_LEVEL`, `DATABASE_URL` and `AUTOSAVE_DEBOUNCE_MS`, loading a
    /// `.env` file first if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let log_level = match lookup("LOG_LEVEL") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "LOG_LEVEL",
                value: raw.clone(),
                reason: "expected one of trace, debug, info, warn, error".into(),
            })?,
            None => Level::ERROR,
        };

        let database_url = lookup("DATABASE_URL")
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| Url::parse(&raw))
            .transpose()?;

        let mut autosave = AutosaveConfig::default();
        if let Some(raw) = lookup("AUTOSAVE_DEBOUNCE_MS") {
            let millis: u64 = raw.parse().map_err(|error| ConfigError::InvalidValue {
                key: "AUTOSAVE_DEBOUNCE_MS",
                value: raw.clone(),
                reason: format!("{error}"),
            })?;
            autosave.debounce = Duration::from_millis(millis);
        }

        Ok(Self {
            log_level,
            database_url,
            autosave,
        })
    }

    /// Database host for log lines, without credentials.
    pub fn database_host(&self) -> Option<String> {
        self.database_url
            .as_ref()
            .and_then(|url| url.host_str().map(|host| host.to_owned()))
    }
}
