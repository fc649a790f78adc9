//! Stub servers and in-memory collaborators shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{FixedOffset, TimeZone};

use crate::error::{AppError, Result, SourceError};
use crate::llm::{IntentClassifier, ReportRenderer, Responder, Verdict};
use crate::sources::types::*;
use crate::sources::{
    EventSource, Geocoder, NewsSource, SourceResult, Sources, TimeSource, WeatherSource,
};
use crate::workflow::aggregate::Report;
use crate::workflow::state::Intent;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_stub(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn paris() -> ResolvedLocation {
    ResolvedLocation {
        display_name: "Paris, Île-de-France, France".to_string(),
        latitude: 48.85341,
        longitude: 2.3488,
        timezone_id: "Europe/Paris".to_string(),
        city: "Paris".to_string(),
        country: Some("France".to_string()),
    }
}

pub fn paris_time() -> TimeInfo {
    let offset = FixedOffset::east_opt(7200).unwrap();
    TimeInfo {
        local_time: offset.with_ymd_and_hms(2025, 6, 1, 14, 30, 0).unwrap(),
        timezone: "Europe/Paris".to_string(),
    }
}

pub fn weather(summary: &str) -> WeatherInfo {
    WeatherInfo {
        summary: summary.to_string(),
        temperature_c: Some(21.5),
        feels_like_c: Some(21.0),
        humidity: Some(60),
        pressure: Some(1015),
        wind_speed: Some(3.2),
    }
}

pub fn headlines() -> Vec<Headline> {
    vec![
        Headline {
            title: "Seine reopens for swimmers".to_string(),
            source: Some("Le Monde".to_string()),
            url: None,
        },
        Headline {
            title: "Metro line 14 extended".to_string(),
            source: None,
            url: None,
        },
    ]
}

pub fn event(title: &str, description: &str) -> Event {
    Event {
        title: title.to_string(),
        url: None,
        date: None,
        venue: None,
        description: description.to_string(),
    }
}

pub fn events() -> Vec<Event> {
    vec![
        event("Jazz Night", "Live jazz at New Morning"),
        event("Open-air cinema", "Outdoor screening in Parc de la Villette"),
    ]
}

/// A collaborator that answers with a fixed result after an optional delay,
/// counting how often it was called.
pub struct Fake<T> {
    result: SourceResult<T>,
    delay: Duration,
    calls: AtomicUsize,
}

impl<T: Clone> Fake<T> {
    pub fn ok(value: T) -> Arc<Self> {
        Self::with(Ok(value), Duration::ZERO)
    }

    pub fn err(error: SourceError) -> Arc<Self> {
        Self::with(Err(error), Duration::ZERO)
    }

    pub fn delayed(value: T, delay: Duration) -> Arc<Self> {
        Self::with(Ok(value), delay)
    }

    pub fn with(result: SourceResult<T>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            result,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self) -> SourceResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }
}

#[async_trait]
impl Geocoder for Fake<ResolvedLocation> {
    async fn geocode(&self, _location_text: &str) -> SourceResult<ResolvedLocation> {
        self.respond().await
    }
}

#[async_trait]
impl TimeSource for Fake<TimeInfo> {
    async fn fetch_local_time(&self, _location: &ResolvedLocation) -> SourceResult<TimeInfo> {
        self.respond().await
    }
}

#[async_trait]
impl WeatherSource for Fake<WeatherInfo> {
    async fn fetch_weather(&self, _location: &ResolvedLocation) -> SourceResult<WeatherInfo> {
        self.respond().await
    }
}

#[async_trait]
impl NewsSource for Fake<Vec<Headline>> {
    async fn fetch_news(&self, _location: &ResolvedLocation) -> SourceResult<Vec<Headline>> {
        self.respond().await
    }
}

#[async_trait]
impl EventSource for Fake<Vec<Event>> {
    async fn fetch_events(&self, _location: &ResolvedLocation) -> SourceResult<Vec<Event>> {
        self.respond().await
    }
}

/// Handles to the four fakes behind a [`Sources`] bundle.
pub struct FakeSources {
    pub local_time: Arc<Fake<TimeInfo>>,
    pub weather: Arc<Fake<WeatherInfo>>,
    pub news: Arc<Fake<Vec<Headline>>>,
    pub events: Arc<Fake<Vec<Event>>>,
}

impl FakeSources {
    pub fn all_ok() -> Self {
        Self {
            local_time: Fake::ok(paris_time()),
            weather: Fake::ok(weather("Clear Sky")),
            news: Fake::ok(headlines()),
            events: Fake::ok(events()),
        }
    }

    pub fn sources(&self) -> Sources {
        Sources {
            local_time: self.local_time.clone(),
            weather: self.weather.clone(),
            news: self.news.clone(),
            events: self.events.clone(),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.local_time.calls() + self.weather.calls() + self.news.calls() + self.events.calls()
    }
}

/// Scripted LLM stand-in for the classifier, responder and renderer seams.
pub struct FakeLlm {
    verdict: std::result::Result<Verdict, String>,
    delay: Duration,
    render_delay: Duration,
    render_fails: bool,
    calls: AtomicUsize,
    rendered: Mutex<Vec<Report>>,
}

impl FakeLlm {
    pub fn destination(location: &str) -> Arc<Self> {
        Self::build(Ok(Verdict::Destination(location.to_string())), Duration::ZERO, false)
    }

    pub fn general() -> Arc<Self> {
        Self::build(Ok(Verdict::General), Duration::ZERO, false)
    }

    pub fn unavailable() -> Arc<Self> {
        Self::build(Err("connection refused".to_string()), Duration::ZERO, false)
    }

    pub fn slow(location: &str, delay: Duration) -> Arc<Self> {
        Self::build(Ok(Verdict::Destination(location.to_string())), delay, false)
    }

    pub fn failing_renderer(location: &str) -> Arc<Self> {
        Self::build(Ok(Verdict::Destination(location.to_string())), Duration::ZERO, true)
    }

    pub fn slow_renderer(location: &str, delay: Duration) -> Arc<Self> {
        let mut llm = Self::new(
            Ok(Verdict::Destination(location.to_string())),
            Duration::ZERO,
            false,
        );
        llm.render_delay = delay;
        Arc::new(llm)
    }

    fn build(
        verdict: std::result::Result<Verdict, String>,
        delay: Duration,
        render_fails: bool,
    ) -> Arc<Self> {
        Arc::new(Self::new(verdict, delay, render_fails))
    }

    fn new(
        verdict: std::result::Result<Verdict, String>,
        delay: Duration,
        render_fails: bool,
    ) -> Self {
        Self {
            verdict,
            delay,
            render_delay: Duration::ZERO,
            render_fails,
            calls: AtomicUsize::new(0),
            rendered: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn rendered(&self) -> Vec<Report> {
        self.rendered.lock().unwrap().clone()
    }
}

#[async_trait]
impl IntentClassifier for FakeLlm {
    async fn classify(&self, _query: &str) -> Result<Verdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.verdict
            .clone()
            .map_err(AppError::ClassifierUnavailable)
    }
}

#[async_trait]
impl Responder for FakeLlm {
    async fn answer(&self, query: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("Direct answer to: {query}"))
    }
}

#[async_trait]
impl ReportRenderer for FakeLlm {
    async fn render(&self, _intent: Intent, report: &Report) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rendered.lock().unwrap().push(report.clone());
        if !self.render_delay.is_zero() {
            tokio::time::sleep(self.render_delay).await;
        }
        if self.render_fails {
            return Err(AppError::LlmTransient("503 from model".to_string()));
        }
        Ok("Rendered travel report".to_string())
    }
}
