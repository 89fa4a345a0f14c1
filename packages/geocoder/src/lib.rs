#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Free-text place search for the bio-risk map.
//!
//! Resolves a search box query (e.g. "Bengaluru") to a [`Coordinate`]
//! using Nominatim / `OpenStreetMap`, restricted to the country codes in
//! the service configuration. The first result wins; no result is
//! reported as `Ok(None)` so callers can show a "not found" message.
//!
//! The public Nominatim instance allows **1 request per second**;
//! [`Geocoder`] spaces consecutive requests by `rate_limit_ms`.

pub mod nominatim;
pub mod service_registry;

use std::time::{Duration, Instant};

use bio_risk_models::Coordinate;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::service_registry::GeocodingService;

/// A resolved search result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    /// Resolved point.
    pub coord: Coordinate,
    /// Display name returned by the geocoder.
    pub display_name: Option<String>,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The search text was empty or whitespace.
    #[error("Search text is empty")]
    EmptyQuery,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// A rate-limited search client for one geocoding service.
pub struct Geocoder {
    client: reqwest::Client,
    service: GeocodingService,
    last_request: Mutex<Option<Instant>>,
}

impl Geocoder {
    /// Creates a geocoder for `service`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(service: GeocodingService) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(service.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            service,
            last_request: Mutex::new(None),
        })
    }

    /// Creates a geocoder for the configured Nominatim service.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the embedded configuration is malformed
    /// or the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, GeocodeError> {
        Self::new(service_registry::nominatim_from_env()?)
    }

    /// Resolves free text to a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::EmptyQuery`] for blank input (no request is
    /// sent), or another [`GeocodeError`] if the request or parsing fails.
    pub async fn search(&self, text: &str) -> Result<Option<GeocodedPlace>, GeocodeError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }

        self.wait_for_slot().await;
        let place = nominatim::search(&self.client, &self.service, text).await?;

        match &place {
            Some(p) => log::info!(
                "Resolved '{text}' to ({}, {})",
                p.coord.lat,
                p.coord.lng
            ),
            None => log::info!(
                "No match for '{text}' in country codes '{}'",
                self.service.country_codes
            ),
        }

        Ok(place)
    }

    async fn wait_for_slot(&self) {
        let min_gap = Duration::from_millis(self.service.rate_limit_ms);
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < min_gap {
                tokio::time::sleep(min_gap - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blank_search_is_rejected_without_a_request() {
        let mut service = service_registry::nominatim().unwrap();
        service.base_url = "http://127.0.0.1:9/unreachable".to_string();
        let geocoder = Geocoder::new(service).unwrap();

        assert!(matches!(
            geocoder.search("   ").await,
            Err(GeocodeError::EmptyQuery)
        ));
    }
}
