use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Structured geographic identity derived once per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone_id: String,
    /// Locality name without region/country, used for search queries.
    pub city: String,
    pub country: Option<String>,
}

impl ResolvedLocation {
    /// "City Country" or just "City", used as a free-text search term.
    pub fn search_term(&self, separator: &str) -> String {
        match &self.country {
            Some(country) if !country.is_empty() => format!("{}{separator}{country}", self.city),
            _ => self.city.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeInfo {
    pub local_time: DateTime<FixedOffset>,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherInfo {
    pub summary: String,
    pub temperature_c: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub humidity: Option<u32>,
    pub pressure: Option<u32>,
    pub wind_speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub source: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub url: Option<String>,
    pub date: Option<String>,
    pub venue: Option<String>,
    pub description: String,
}
