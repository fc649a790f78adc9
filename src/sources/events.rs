use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::EventsConfig;
use crate::error::{AppError, Result, SourceError};
use crate::sources::http::{build_client, read_json};
use crate::sources::retry::RetryPolicy;
use crate::sources::types::{Event, ResolvedLocation};
use crate::sources::{EventSource, SourceResult};

/// Local events found through the Tavily search API.
pub struct TavilyEvents {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    search_depth: String,
    max_results: usize,
    max_events: usize,
    description_length: usize,
    include_domains: Vec<String>,
    exclude_domains: Vec<String>,
    date_patterns: Vec<Regex>,
    venue_patterns: Vec<Regex>,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: String,
    search_depth: &'a str,
    include_answer: bool,
    include_raw_content: bool,
    max_results: usize,
    include_domains: &'a [String],
    exclude_domains: &'a [String],
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: Option<String>,
    url: Option<String>,
    #[serde(default)]
    content: String,
}

impl TavilyEvents {
    pub fn new(config: &EventsConfig, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout_secs)?,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            base_url: config.base_url.clone(),
            search_depth: config.search_depth.clone(),
            max_results: config.max_results,
            max_events: config.max_events,
            description_length: config.description_length,
            include_domains: config.include_domains.clone(),
            exclude_domains: config.exclude_domains.clone(),
            date_patterns: compile_patterns("date_patterns", &config.date_patterns)?,
            venue_patterns: compile_patterns("venue_patterns", &config.venue_patterns)?,
            retry,
        })
    }

    fn to_event(&self, hit: SearchHit) -> Event {
        Event {
            title: hit
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Local Event".to_string()),
            url: hit.url.filter(|u| !u.is_empty()),
            date: first_capture(&self.date_patterns, &hit.content),
            venue: first_capture(&self.venue_patterns, &hit.content),
            description: truncate_description(&hit.content, self.description_length),
        }
    }
}

#[async_trait]
impl EventSource for TavilyEvents {
    async fn fetch_events(&self, location: &ResolvedLocation) -> SourceResult<Vec<Event>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::NotConfigured("events API key".to_string()))?;

        let request = SearchRequest {
            api_key,
            query: format!("upcoming events {} this week", location.search_term(", ")),
            search_depth: &self.search_depth,
            include_answer: false,
            include_raw_content: false,
            max_results: self.max_results,
            include_domains: &self.include_domains,
            exclude_domains: &self.exclude_domains,
        };

        let body: SearchResponse = self
            .retry
            .run("events", || async {
                let response = self
                    .client
                    .post(&self.base_url)
                    .json(&request)
                    .send()
                    .await?;
                read_json(response).await
            })
            .await?;

        Ok(body
            .results
            .into_iter()
            .take(self.max_events)
            .map(|hit| self.to_event(hit))
            .collect())
    }
}

fn compile_patterns(name: &str, patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| AppError::Config(format!("events.{name}: invalid pattern {p:?}: {e}")))
        })
        .collect()
}

/// First capture group of the first pattern that matches.
fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

fn truncate_description(content: &str, max_chars: usize) -> String {
    let content = content.trim();
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let mut out: String = content.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{paris, spawn_stub};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    fn patterns(items: &[&str]) -> Vec<Regex> {
        items.iter().map(|p| Regex::new(p).unwrap()).collect()
    }

    #[test]
    fn test_date_extraction() {
        let dates = patterns(&[r"(\d{1,2}/\d{1,2}/\d{4})"]);
        assert_eq!(
            first_capture(&dates, "Event happening on 11/15/2025 at Central Park"),
            Some("11/15/2025".to_string())
        );
        assert_eq!(first_capture(&dates, "No date here"), None);
    }

    #[test]
    fn test_venue_extraction_with_defaults() {
        let config = EventsConfig::default();
        let venues = compile_patterns("venue_patterns", &config.venue_patterns).unwrap();
        let venue = first_capture(&venues, "Event happening at Central Park on November 15").unwrap();
        assert!(venue.contains("Central Park"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = compile_patterns("date_patterns", &["(unclosed".to_string()]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_description_truncated() {
        assert_eq!(truncate_description("short", 10), "short");
        assert_eq!(truncate_description("abcdefghij-more", 10), "abcdefghij...");
    }

    #[tokio::test]
    async fn test_search_request_and_parsing() {
        let router = Router::new().route(
            "/search",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["api_key"], "tavily-key");
                assert_eq!(body["query"], "upcoming events Paris, France this week");
                assert_eq!(body["include_answer"], false);
                Json(json!({
                    "results": [
                        {
                            "title": "Jazz Night",
                            "url": "https://example.com/jazz",
                            "content": "Live jazz on 06/21/2025 at New Morning, doors at 8pm"
                        },
                        { "title": "", "url": "", "content": "" },
                        { "title": "Third", "url": "https://example.com/3", "content": "" }
                    ]
                }))
            }),
        );
        let base = spawn_stub(router).await;
        let config = EventsConfig {
            api_key: Some("tavily-key".to_string()),
            base_url: format!("{base}/search"),
            max_events: 2,
            ..EventsConfig::default()
        };
        let source = TavilyEvents::new(&config, RetryPolicy::none()).unwrap();

        let events = source.fetch_events(&paris()).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "Jazz Night");
        assert_eq!(events[0].date.as_deref(), Some("06/21/2025"));
        assert_eq!(events[0].venue.as_deref(), Some("New Morning"));
        assert_eq!(events[1].title, "Local Event");
        assert_eq!(events[1].url, None);
    }
}
