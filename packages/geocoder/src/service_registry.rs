//! Geocoding service configuration.
//!
//! The Nominatim service is defined in `services/nominatim.toml` and
//! embedded at compile time. `BIO_RISK_GEOCODER_URL` overrides the base
//! URL at runtime (e.g. to point at a self-hosted instance).

use serde::Deserialize;

use crate::GeocodeError;

const NOMINATIM_TOML: &str = include_str!("../services/nominatim.toml");

/// Environment variable overriding [`GeocodingService::base_url`].
pub const GEOCODER_URL_ENV: &str = "BIO_RISK_GEOCODER_URL";

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Search endpoint URL.
    pub base_url: String,
    /// Comma-separated ISO country codes results are restricted to.
    pub country_codes: String,
    /// `User-Agent` header, required by the Nominatim usage policy.
    pub user_agent: String,
    /// Minimum delay between requests in milliseconds.
    #[serde(default)]
    pub rate_limit_ms: u64,
}

/// Parses a geocoding service from TOML.
///
/// # Errors
///
/// Returns [`GeocodeError::Parse`] if the TOML is malformed.
pub fn parse_service(toml_str: &str) -> Result<GeocodingService, GeocodeError> {
    toml::de::from_str(toml_str).map_err(|e| GeocodeError::Parse {
        message: format!("Failed to parse geocoding service: {e}"),
    })
}

/// Returns the embedded Nominatim configuration.
///
/// # Errors
///
/// Returns [`GeocodeError::Parse`] if the embedded TOML is malformed.
pub fn nominatim() -> Result<GeocodingService, GeocodeError> {
    parse_service(NOMINATIM_TOML)
}

/// Returns the embedded Nominatim configuration with environment
/// overrides applied.
///
/// # Errors
///
/// Returns [`GeocodeError::Parse`] if the embedded TOML is malformed.
pub fn nominatim_from_env() -> Result<GeocodingService, GeocodeError> {
    let mut service = nominatim()?;
    if let Ok(url) = std::env::var(GEOCODER_URL_ENV) {
        log::debug!("Using {GEOCODER_URL_ENV}={url}");
        service.base_url = url;
    }
    Ok(service)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_nominatim_config_parses() {
        let service = nominatim().unwrap();
        assert_eq!(service.id, "nominatim");
        assert_eq!(service.country_codes, "in");
        assert_eq!(service.rate_limit_ms, 1000);
        assert!(!service.user_agent.is_empty());
        assert!(service.base_url.ends_with("/search"));
    }

    #[test]
    fn rate_limit_is_optional() {
        let service = parse_service(
            r#"
            id = "local"
            name = "Local Nominatim"
            base_url = "http://localhost:8080/search"
            country_codes = "in,np"
            user_agent = "test"
            "#,
        )
        .unwrap();
        assert_eq!(service.rate_limit_ms, 0);
    }

    #[test]
    fn malformed_service_is_a_parse_error() {
        assert!(matches!(
            parse_service("id = 3"),
            Err(GeocodeError::Parse { .. })
        ));
    }
}
