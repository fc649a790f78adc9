use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::GeocodingConfig;
use crate::error::{Result, SourceError};
use crate::sources::http::{build_client, read_json};
use crate::sources::retry::RetryPolicy;
use crate::sources::types::ResolvedLocation;
use crate::sources::{Geocoder, SourceResult};

/// Geocoder backed by the Open-Meteo geocoding API, which also reports the
/// IANA timezone of each match.
pub struct OpenMeteoGeocoder {
    client: Client,
    base_url: String,
    language: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Place>,
}

#[derive(Debug, Deserialize)]
struct Place {
    name: String,
    latitude: f64,
    longitude: f64,
    timezone: Option<String>,
    admin1: Option<String>,
    country: Option<String>,
}

impl OpenMeteoGeocoder {
    pub fn new(config: &GeocodingConfig, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout_secs)?,
            base_url: config.base_url.clone(),
            language: config.language.clone(),
            retry,
        })
    }

    async fn search(&self, name: &str) -> SourceResult<Option<Place>> {
        self.retry
            .run("geocoding", || async {
                let response = self
                    .client
                    .get(&self.base_url)
                    .query(&[
                        ("name", name),
                        ("count", "1"),
                        ("language", self.language.as_str()),
                        ("format", "json"),
                    ])
                    .send()
                    .await?;
                let body: SearchResponse = read_json(response).await?;
                Ok(body.results.into_iter().next())
            })
            .await
    }
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    async fn geocode(&self, location_text: &str) -> SourceResult<ResolvedLocation> {
        let mut candidates = vec![location_text];
        // "Paris, France" rarely matches verbatim; the leading segment usually does.
        if let Some((head, _)) = location_text.split_once(',') {
            let head = head.trim();
            if !head.is_empty() {
                candidates.push(head);
            }
        }

        for candidate in candidates {
            if let Some(place) = self.search(candidate).await? {
                tracing::debug!(query = candidate, name = %place.name, "Geocoding match");
                return Ok(to_location(place));
            }
        }

        Err(SourceError::NotFound(location_text.to_string()))
    }
}

fn to_location(place: Place) -> ResolvedLocation {
    let mut parts: Vec<&str> = vec![place.name.as_str()];
    for part in [place.admin1.as_deref(), place.country.as_deref()]
        .into_iter()
        .flatten()
    {
        if !part.is_empty() && !parts.contains(&part) {
            parts.push(part);
        }
    }

    ResolvedLocation {
        display_name: parts.join(", "),
        latitude: place.latitude,
        longitude: place.longitude,
        timezone_id: place.timezone.clone().unwrap_or_else(|| "UTC".to_string()),
        city: place.name.clone(),
        country: place.country.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_stub;
    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn geocoder_for(router: Router) -> OpenMeteoGeocoder {
        let base = spawn_stub(router).await;
        let config = GeocodingConfig {
            base_url: format!("{base}/v1/search"),
            ..GeocodingConfig::default()
        };
        OpenMeteoGeocoder::new(&config, RetryPolicy::none()).unwrap()
    }

    #[tokio::test]
    async fn test_geocode_falls_back_to_leading_segment() {
        let router = Router::new().route(
            "/v1/search",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                if q.get("name").map(String::as_str) == Some("Paris") {
                    Json(json!({
                        "results": [{
                            "name": "Paris",
                            "latitude": 48.85341,
                            "longitude": 2.3488,
                            "timezone": "Europe/Paris",
                            "admin1": "Île-de-France",
                            "country": "France"
                        }]
                    }))
                } else {
                    Json(json!({ "generationtime_ms": 0.4 }))
                }
            }),
        );
        let geocoder = geocoder_for(router).await;

        let location = geocoder.geocode("Paris, France").await.unwrap();
        assert_eq!(location.display_name, "Paris, Île-de-France, France");
        assert_eq!(location.timezone_id, "Europe/Paris");
        assert_eq!(location.city, "Paris");
        assert!((location.latitude - 48.85341).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_geocode_no_match_is_not_found() {
        let router = Router::new().route(
            "/v1/search",
            get(|| async { Json(json!({ "generationtime_ms": 0.2 })) }),
        );
        let geocoder = geocoder_for(router).await;

        let err = geocoder.geocode("Atlantis").await.unwrap_err();
        assert_eq!(err, SourceError::NotFound("Atlantis".to_string()));
    }

    #[tokio::test]
    async fn test_geocode_server_error_surfaces() {
        let router = Router::new().route(
            "/v1/search",
            get(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let geocoder = geocoder_for(router).await;

        let err = geocoder.geocode("Lima").await.unwrap_err();
        assert!(matches!(err, SourceError::Transient(_)));
    }

    #[test]
    fn test_display_name_skips_duplicate_parts() {
        let place: Place = serde_json::from_value(json!({
            "name": "Singapore",
            "latitude": 1.28967,
            "longitude": 103.85007,
            "timezone": "Asia/Singapore",
            "country": "Singapore"
        }))
        .unwrap();

        let location = to_location(place);
        assert_eq!(location.display_name, "Singapore");
    }
}
