//! Prediction client configuration.
//!
//! Read from the environment (`RISK_OVERLAY_API_URL`,
//! `RISK_OVERLAY_TIMEOUT_SECS`) or from the `[api]` table of a TOML file,
//! with environment variables taking precedence over the file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable holding the prediction API base URL.
pub const API_URL_ENV: &str = "RISK_OVERLAY_API_URL";

/// Environment variable holding the request timeout in seconds.
pub const TIMEOUT_ENV: &str = "RISK_OVERLAY_TIMEOUT_SECS";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors that make the client impossible to initialize.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is missing.
    #[error("Missing configuration: {name} is not set")]
    Missing {
        /// Name of the missing setting.
        name: String,
    },

    /// A setting is present but unusable.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },

    /// The config file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Connection settings for the prediction API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PredictionClientConfig {
    /// API base URL, e.g. `"http://localhost:8000/api"`.
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    api: PredictionClientConfig,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl PredictionClientConfig {
    /// Creates a config for `base_url` with the default timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Reads the config from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `RISK_OVERLAY_API_URL` is not
    /// set, or [`ConfigError::Invalid`] if a value cannot be used.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Parses the `[api]` table of a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is invalid or a value cannot be
    /// used.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::de::from_str(s)?;
        file.api.validate()
    }

    /// Reads a TOML config file, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or a
    /// value cannot be used.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading prediction client config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)?.with_overrides(|name| std::env::var(name).ok())
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(API_URL_ENV).ok_or_else(|| ConfigError::Missing {
            name: API_URL_ENV.to_string(),
        })?;
        Self::new(base_url).with_overrides(lookup)
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup(API_URL_ENV) {
            self.base_url = url;
        }
        if let Some(secs) = lookup(TIMEOUT_ENV) {
            self.timeout_secs = secs.trim().parse().map_err(|e| ConfigError::Invalid {
                message: format!("{TIMEOUT_ENV}='{secs}' is not a number of seconds: {e}"),
            })?;
        }
        self.validate()
    }

    fn validate(mut self) -> Result<Self, ConfigError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::Missing {
                name: "base_url".to_string(),
            });
        }
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(ConfigError::Invalid {
                message: format!("base_url '{trimmed}' must start with http:// or https://"),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "timeout_secs must be greater than zero".to_string(),
            });
        }
        self.base_url = trimmed.to_string();
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn reads_env_with_default_timeout() {
        let config =
            PredictionClientConfig::from_lookup(lookup(&[(API_URL_ENV, "http://localhost:8000/api/")]))
                .unwrap();
        assert_eq!(config.base_url, "http://localhost:8000/api");
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn missing_base_url_is_config_error() {
        let err = PredictionClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { name } if name == API_URL_ENV));
    }

    #[test]
    fn rejects_bad_timeout_and_scheme() {
        let err = PredictionClientConfig::from_lookup(lookup(&[
            (API_URL_ENV, "http://localhost:8000"),
            (TIMEOUT_ENV, "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err =
            PredictionClientConfig::from_lookup(lookup(&[(API_URL_ENV, "localhost:8000")]))
                .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn parses_toml_and_applies_overrides() {
        let config = PredictionClientConfig::from_toml_str(
            r#"
            [api]
            base_url = "https://risk.example.org/api"
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://risk.example.org/api");
        assert_eq!(config.timeout_secs, 5);

        let overridden = config
            .with_overrides(lookup(&[(TIMEOUT_ENV, "12")]))
            .unwrap();
        assert_eq!(overridden.base_url, "https://risk.example.org/api");
        assert_eq!(overridden.timeout_secs, 12);
    }

    #[test]
    fn toml_without_api_table_fails() {
        assert!(matches!(
            PredictionClientConfig::from_toml_str("[server]\nport = 1"),
            Err(ConfigError::Toml(_))
        ));
    }
}
