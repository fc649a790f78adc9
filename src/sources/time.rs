use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::config::TimeConfig;
use crate::error::{Result, SourceError};
use crate::sources::http::{build_client, read_json};
use crate::sources::retry::RetryPolicy;
use crate::sources::types::{ResolvedLocation, TimeInfo};
use crate::sources::{SourceResult, TimeSource};

/// Local time lookup via the Open-Meteo forecast endpoint with `timezone=auto`.
pub struct OpenMeteoTime {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    timezone: Option<String>,
    utc_offset_seconds: Option<i32>,
}

impl OpenMeteoTime {
    pub fn new(config: &TimeConfig, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout_secs)?,
            base_url: config.base_url.clone(),
            retry,
        })
    }
}

#[async_trait]
impl TimeSource for OpenMeteoTime {
    async fn fetch_local_time(&self, location: &ResolvedLocation) -> SourceResult<TimeInfo> {
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();

        let forecast: ForecastResponse = self
            .retry
            .run("local_time", || async {
                let response = self
                    .client
                    .get(&self.base_url)
                    .query(&[
                        ("latitude", latitude.as_str()),
                        ("longitude", longitude.as_str()),
                        ("current", "is_day"),
                        ("timezone", "auto"),
                    ])
                    .send()
                    .await?;
                read_json(response).await
            })
            .await?;

        let offset_seconds = forecast
            .utc_offset_seconds
            .ok_or_else(|| SourceError::Malformed("missing utc_offset_seconds".to_string()))?;
        let offset = FixedOffset::east_opt(offset_seconds).ok_or_else(|| {
            SourceError::Malformed(format!("utc offset out of range: {offset_seconds}"))
        })?;

        Ok(TimeInfo {
            local_time: Utc::now().with_timezone(&offset),
            timezone: forecast
                .timezone
                .filter(|tz| !tz.is_empty())
                .unwrap_or_else(|| location.timezone_id.clone()),
        })
    }
}
