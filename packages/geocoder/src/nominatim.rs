//! Nominatim / `OpenStreetMap` search client.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use bio_risk_models::Coordinate;

use crate::service_registry::GeocodingService;
use crate::{GeocodeError, GeocodedPlace};

/// Runs a free-form search restricted to the service's country codes and
/// returns the first result.
///
/// The caller is responsible for rate limiting.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request or response parsing fails.
pub async fn search(
    client: &reqwest::Client,
    service: &GeocodingService,
    query: &str,
) -> Result<Option<GeocodedPlace>, GeocodeError> {
    let resp = client
        .get(&service.base_url)
        .query(&[
            ("format", "json"),
            ("q", query),
            ("countrycodes", service.country_codes.as_str()),
            ("limit", "1"),
        ])
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    let resp = resp.error_for_status()?;
    let body: serde_json::Value = resp.json().await?;
    parse_response(&body)
}

/// Parses a Nominatim JSON response. `lat`/`lon` arrive as strings.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedPlace>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = parse_degrees(&first["lat"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lat in Nominatim response".to_string(),
    })?;

    let lng = parse_degrees(&first["lon"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lon in Nominatim response".to_string(),
    })?;

    let coord = Coordinate::new(lat, lng);
    if !coord.is_valid() {
        return Err(GeocodeError::Parse {
            message: format!("Nominatim returned out-of-range coordinate ({lat}, {lng})"),
        });
    }

    Ok(Some(GeocodedPlace {
        coord,
        display_name: first["display_name"].as_str().map(String::from),
    }))
}

fn parse_degrees(value: &serde_json::Value) -> Option<f64> {
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| value.as_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_result() {
        let body = serde_json::json!([
            {
                "lat": "12.9767936",
                "lon": "77.590082",
                "display_name": "Bengaluru, Bangalore North, Karnataka, India"
            },
            {"lat": "0", "lon": "0"}
        ]);
        let place = parse_response(&body).unwrap().unwrap();
        assert!((place.coord.lat - 12.976_793_6).abs() < 1e-6);
        assert!((place.coord.lng - 77.590_082).abs() < 1e-6);
        assert!(place.display_name.unwrap().starts_with("Bengaluru"));
    }

    #[test]
    fn empty_result_is_not_found() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn accepts_numeric_coordinates() {
        let body = serde_json::json!([{"lat": 13.0827, "lon": 80.2707}]);
        let place = parse_response(&body).unwrap().unwrap();
        assert!((place.coord.lng - 80.2707).abs() < 1e-9);
        assert!(place.display_name.is_none());
    }

    #[test]
    fn rejects_malformed_responses() {
        assert!(parse_response(&serde_json::json!({"error": "bad"})).is_err());
        assert!(parse_response(&serde_json::json!([{"lat": "abc", "lon": "1"}])).is_err());
        assert!(parse_response(&serde_json::json!([{"lat": "95", "lon": "1"}])).is_err());
    }
}
