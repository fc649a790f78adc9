use serde::Deserialize;
use std::time::Duration;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub time: TimeConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub classification_temperature: f32,
    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,
    #[serde(default = "default_report_temperature")]
    pub report_temperature: f32,
    #[serde(default = "default_llm_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_classify_timeout_secs")]
    pub classify_timeout_secs: u64,
}

// Manual Debug impl to avoid leaking the API key
impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("classification_temperature", &self.classification_temperature)
            .field("chat_temperature", &self.chat_temperature)
            .field("report_temperature", &self.report_temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("classify_timeout_secs", &self.classify_timeout_secs)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            classification_temperature: 0.0,
            chat_temperature: default_chat_temperature(),
            report_temperature: default_report_temperature(),
            request_timeout_secs: default_llm_timeout_secs(),
            classify_timeout_secs: default_classify_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn classify_timeout(&self) -> Duration {
        Duration::from_secs(self.classify_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocodingConfig {
    #[serde(default = "default_geocoding_url")]
    pub base_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_url(),
            language: default_language(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimeConfig {
    #[serde(default = "default_time_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            base_url: default_time_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct WeatherConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_weather_url")]
    pub base_url: String,
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("base_url", &self.base_url)
            .field("units", &self.units)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_url(),
            units: default_units(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct NewsConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_news_url")]
    pub base_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_max_items")]
    pub max_articles: usize,
    #[serde(default = "default_fallback_country")]
    pub fallback_country: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for NewsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .field("sort_by", &self.sort_by)
            .field("max_articles", &self.max_articles)
            .field("fallback_country", &self.fallback_country)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_news_url(),
            language: default_language(),
            sort_by: default_sort_by(),
            max_articles: default_max_items(),
            fallback_country: default_fallback_country(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct EventsConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_events_url")]
    pub base_url: String,
    #[serde(default = "default_search_depth")]
    pub search_depth: String,
    #[serde(default = "default_max_items")]
    pub max_results: usize,
    #[serde(default = "default_max_items")]
    pub max_events: usize,
    #[serde(default = "default_description_length")]
    pub description_length: usize,
    #[serde(default)]
    pub include_domains: Vec<String>,
    #[serde(default)]
    pub exclude_domains: Vec<String>,
    #[serde(default = "default_date_patterns")]
    pub date_patterns: Vec<String>,
    #[serde(default = "default_venue_patterns")]
    pub venue_patterns: Vec<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for EventsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventsConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("base_url", &self.base_url)
            .field("search_depth", &self.search_depth)
            .field("max_results", &self.max_results)
            .field("max_events", &self.max_events)
            .field("description_length", &self.description_length)
            .field("include_domains", &self.include_domains)
            .field("exclude_domains", &self.exclude_domains)
            .field("date_patterns", &self.date_patterns)
            .field("venue_patterns", &self.venue_patterns)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_events_url(),
            search_depth: default_search_depth(),
            max_results: default_max_items(),
            max_events: default_max_items(),
            description_length: default_description_length(),
            include_domains: Vec::new(),
            exclude_domains: Vec::new(),
            date_patterns: default_date_patterns(),
            venue_patterns: default_venue_patterns(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Per-source deadlines for the collection phase.
#[derive(Debug, Deserialize, Clone)]
pub struct CollectionConfig {
    #[serde(default = "default_local_time_timeout_ms")]
    pub local_time_timeout_ms: u64,
    #[serde(default = "default_weather_timeout_ms")]
    pub weather_timeout_ms: u64,
    #[serde(default = "default_news_timeout_ms")]
    pub news_timeout_ms: u64,
    #[serde(default = "default_events_timeout_ms")]
    pub events_timeout_ms: u64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            local_time_timeout_ms: default_local_time_timeout_ms(),
            weather_timeout_ms: default_weather_timeout_ms(),
            news_timeout_ms: default_news_timeout_ms(),
            events_timeout_ms: default_events_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn redacted(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "[REDACTED]",
        None => "<unset>",
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_chat_temperature() -> f32 {
    0.5
}

fn default_report_temperature() -> f32 {
    0.3
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_classify_timeout_secs() -> u64 {
    15
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".to_string()
}

fn default_time_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_weather_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_news_url() -> String {
    "https://newsapi.org/v2".to_string()
}

fn default_events_url() -> String {
    "https://api.tavily.com/search".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_units() -> String {
    "metric".to_string()
}

fn default_sort_by() -> String {
    "publishedAt".to_string()
}

fn default_fallback_country() -> String {
    "us".to_string()
}

fn default_search_depth() -> String {
    "basic".to_string()
}

fn default_max_items() -> usize {
    5
}

fn default_description_length() -> usize {
    200
}

fn default_date_patterns() -> Vec<String> {
    vec![
        r"(\d{1,2}/\d{1,2}/\d{4})".to_string(),
        r"(\d{4}-\d{2}-\d{2})".to_string(),
        r"((?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2}(?:,\s*\d{4})?)".to_string(),
    ]
}

fn default_venue_patterns() -> Vec<String> {
    vec![
        r"[Vv]enue:\s*([^,.\n]+)".to_string(),
        r"\bat\s+(?:the\s+)?([A-Z][^,.\n]+)".to_string(),
    ]
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_local_time_timeout_ms() -> u64 {
    3_000
}

fn default_weather_timeout_ms() -> u64 {
    5_000
}

fn default_news_timeout_ms() -> u64 {
    6_000
}

fn default_events_timeout_ms() -> u64 {
    8_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    2_000
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("compass").required(false));
        }

        // Environment variable overrides with COMPASS_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("COMPASS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let config: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let deadlines = [
            ("local_time_timeout_ms", self.collection.local_time_timeout_ms),
            ("weather_timeout_ms", self.collection.weather_timeout_ms),
            ("news_timeout_ms", self.collection.news_timeout_ms),
            ("events_timeout_ms", self.collection.events_timeout_ms),
        ];
        if let Some((name, _)) = deadlines.iter().find(|(_, ms)| *ms == 0) {
            return Err(AppError::Config(format!(
                "collection.{name} must be greater than zero"
            )));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(AppError::Config(
                "retry.initial_backoff_ms must not exceed retry.max_backoff_ms".to_string(),
            ));
        }
        Ok(())
    }
}
