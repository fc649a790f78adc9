pub mod events;
pub mod geocoding;
pub mod http;
pub mod news;
pub mod retry;
pub mod time;
pub mod types;
pub mod weather;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::error::{Result, SourceError};
use types::*;

pub type SourceResult<T> = std::result::Result<T, SourceError>;

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve free text into coordinates, display name and timezone.
    async fn geocode(&self, location_text: &str) -> SourceResult<ResolvedLocation>;
}

#[async_trait]
pub trait TimeSource: Send + Sync {
    async fn fetch_local_time(&self, location: &ResolvedLocation) -> SourceResult<TimeInfo>;
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_weather(&self, location: &ResolvedLocation) -> SourceResult<WeatherInfo>;
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch_news(&self, location: &ResolvedLocation) -> SourceResult<Vec<Headline>>;
}

#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(&self, location: &ResolvedLocation) -> SourceResult<Vec<Event>>;
}

/// The four independent fetchers run during the collection phase.
#[derive(Clone)]
pub struct Sources {
    pub local_time: Arc<dyn TimeSource>,
    pub weather: Arc<dyn WeatherSource>,
    pub news: Arc<dyn NewsSource>,
    pub events: Arc<dyn EventSource>,
}

impl Sources {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let retry = retry::RetryPolicy::from(&config.retry);

        Ok(Self {
            local_time: Arc::new(time::OpenMeteoTime::new(&config.time, retry)?),
            weather: Arc::new(weather::OpenWeather::new(&config.weather, retry)?),
            news: Arc::new(news::NewsApi::new(&config.news, retry)?),
            events: Arc::new(events::TavilyEvents::new(&config.events, retry)?),
        })
    }
}

/// Resolution is attempted once per request, so the geocoder never retries.
pub fn geocoder_from_config(config: &AppConfig) -> Result<Arc<dyn Geocoder>> {
    Ok(Arc::new(geocoding::OpenMeteoGeocoder::new(
        &config.geocoding,
        retry::RetryPolicy::none(),
    )?))
}
