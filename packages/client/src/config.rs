//! Backend endpoint configuration.
//!
//! Defaults live in `services/backend.toml`, embedded at compile time.
//! `BIO_RISK_API_BASE` and `BIO_RISK_USER_AGENT` override the embedded
//! values at runtime.

use std::time::Duration;

use serde::Deserialize;

use crate::ClientError;

const BACKEND_TOML: &str = include_str!("../services/backend.toml");

/// Environment variable overriding [`BackendConfig::base_url`].
pub const API_BASE_ENV: &str = "BIO_RISK_API_BASE";

/// Environment variable overriding [`BackendConfig::user_agent`].
pub const USER_AGENT_ENV: &str = "BIO_RISK_USER_AGENT";

/// Connection settings for the analysis backend.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Service identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Base URL every endpoint path is appended to.
    pub base_url: String,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Deadline for `/generate-report` in seconds.
    #[serde(default = "default_report_timeout")]
    pub report_timeout_secs: u64,
}

const fn default_report_timeout() -> u64 {
    30
}

impl BackendConfig {
    /// Parses a backend configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> Result<Self, ClientError> {
        toml::de::from_str(toml_str).map_err(|e| ClientError::Config {
            message: format!("Failed to parse backend config: {e}"),
        })
    }

    /// Returns the embedded configuration with environment overrides
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the embedded TOML is malformed.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::from_toml(BACKEND_TOML)?;

        if let Ok(base_url) = std::env::var(API_BASE_ENV) {
            log::debug!("Using {API_BASE_ENV}={base_url}");
            config.base_url = base_url;
        }
        if let Ok(user_agent) = std::env::var(USER_AGENT_ENV) {
            config.user_agent = user_agent;
        }

        Ok(config)
    }

    /// Full URL for an endpoint path such as `/analyze-region`.
    #[must_use]
    pub fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Report deadline as a [`Duration`].
    #[must_use]
    pub const fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_parses() {
        let config = BackendConfig::from_toml(BACKEND_TOML).unwrap();
        assert_eq!(config.id, "backend");
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.report_timeout(), Duration::from_secs(30));
        assert!(!config.user_agent.is_empty());
    }

    #[test]
    fn report_timeout_defaults_to_thirty_seconds() {
        let config = BackendConfig::from_toml(
            r#"
            id = "local"
            name = "Local"
            base_url = "http://127.0.0.1:9000"
            user_agent = "test"
            "#,
        )
        .unwrap();
        assert_eq!(config.report_timeout_secs, 30);
    }

    #[test]
    fn malformed_config_is_a_config_error() {
        let err = BackendConfig::from_toml("id = ").unwrap_err();
        assert!(matches!(err, ClientError::Config { .. }));
    }

    #[test]
    fn endpoint_url_joins_without_double_slashes() {
        let mut config = BackendConfig::from_toml(BACKEND_TOML).unwrap();
        assert_eq!(
            config.endpoint_url("/analyze-region"),
            "http://localhost:8000/analyze-region"
        );
        config.base_url = "https://api.example.org/v1/".to_string();
        assert_eq!(
            config.endpoint_url("trend-data"),
            "https://api.example.org/v1/trend-data"
        );
    }
}
