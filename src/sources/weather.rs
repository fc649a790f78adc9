use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::WeatherConfig;
use crate::error::{Result, SourceError};
use crate::sources::http::{build_client, read_json};
use crate::sources::retry::RetryPolicy;
use crate::sources::types::{ResolvedLocation, WeatherInfo};
use crate::sources::{SourceResult, WeatherSource};

/// Current conditions from the OpenWeatherMap API.
pub struct OpenWeather {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    units: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    weather: Vec<Condition>,
    #[serde(default)]
    main: Option<MainReadings>,
    #[serde(default)]
    wind: Option<Wind>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<u32>,
    pressure: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: Option<f64>,
}

impl OpenWeather {
    pub fn new(config: &WeatherConfig, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout_secs)?,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            base_url: config.base_url.clone(),
            units: config.units.clone(),
            retry,
        })
    }
}

#[async_trait]
impl WeatherSource for OpenWeather {
    async fn fetch_weather(&self, location: &ResolvedLocation) -> SourceResult<WeatherInfo> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::NotConfigured("weather API key".to_string()))?;
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();

        let current: CurrentWeather = self
            .retry
            .run("weather", || async {
                let response = self
                    .client
                    .get(&self.base_url)
                    .query(&[
                        ("lat", latitude.as_str()),
                        ("lon", longitude.as_str()),
                        ("appid", api_key),
                        ("units", self.units.as_str()),
                    ])
                    .send()
                    .await?;
                read_json(response).await
            })
            .await?;

        let summary = current
            .weather
            .first()
            .map(|c| title_case(&c.description))
            .unwrap_or_else(|| "Unknown".to_string());
        let main = current.main.unwrap_or(MainReadings {
            temp: None,
            feels_like: None,
            humidity: None,
            pressure: None,
        });

        Ok(WeatherInfo {
            summary,
            temperature_c: main.temp.map(round_one),
            feels_like_c: main.feels_like.map(round_one),
            humidity: main.humidity,
            pressure: main.pressure,
            wind_speed: current.wind.and_then(|w| w.speed),
        })
    }
}

fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{paris, spawn_stub};
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn config(base: &str, api_key: Option<&str>) -> WeatherConfig {
        WeatherConfig {
            api_key: api_key.map(str::to_string),
            base_url: format!("{base}/data/2.5/weather"),
            ..WeatherConfig::default()
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_weather_parsed_by_coordinates() {
        let router = Router::new().route(
            "/data/2.5/weather",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("appid").map(String::as_str), Some("owm-key"));
                assert_eq!(q.get("units").map(String::as_str), Some("metric"));
                assert!(q.contains_key("lat") && q.contains_key("lon"));
                Json(json!({
                    "weather": [{ "description": "light rain" }],
                    "main": { "temp": 14.27, "feels_like": 13.61, "humidity": 82, "pressure": 1009 },
                    "wind": { "speed": 4.6 },
                    "name": "Paris"
                }))
            }),
        );
        let base = spawn_stub(router).await;
        let source = OpenWeather::new(&config(&base, Some("owm-key")), RetryPolicy::none()).unwrap();

        let info = source.fetch_weather(&paris()).await.unwrap();
        assert_eq!(info.summary, "Light Rain");
        assert_eq!(info.temperature_c, Some(14.3));
        assert_eq!(info.feels_like_c, Some(13.6));
        assert_eq!(info.humidity, Some(82));
        assert_eq!(info.wind_speed, Some(4.6));
    }

    #[tokio::test]
    async fn test_missing_api_key_skips_network() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/data/2.5/weather",
            get(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Json(json!({})) }
            }),
        );
        let base = spawn_stub(router).await;
        let source = OpenWeather::new(&config(&base, None), RetryPolicy::none()).unwrap();

        let err = source.fetch_weather(&paris()).await.unwrap_err();
        assert!(matches!(err, SourceError::NotConfigured(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_server_error_retried_then_succeeds() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/data/2.5/weather",
            get(move || {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        StatusCode::SERVICE_UNAVAILABLE.into_response()
                    } else {
                        Json(json!({ "weather": [{ "description": "clear sky" }] })).into_response()
                    }
                }
            }),
        );
        let base = spawn_stub(router).await;
        let source = OpenWeather::new(&config(&base, Some("k")), fast_retry()).unwrap();

        let info = source.fetch_weather(&paris()).await.unwrap();
        assert_eq!(info.summary, "Clear Sky");
        assert_eq!(info.temperature_c, None);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_not_retried() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/data/2.5/weather",
            get(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { (StatusCode::UNAUTHORIZED, "Invalid API key") }
            }),
        );
        let base = spawn_stub(router).await;
        let source = OpenWeather::new(&config(&base, Some("bad")), fast_retry()).unwrap();

        let err = source.fetch_weather(&paris()).await.unwrap_err();
        assert!(matches!(err, SourceError::Provider(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("overcast clouds"), "Overcast Clouds");
        assert_eq!(title_case(""), "");
    }
}
