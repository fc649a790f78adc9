//! Collection phase: the four source fetches run concurrently, each under
//! its own deadline, and are joined before aggregation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::CollectionConfig;
use crate::sources::types::ResolvedLocation;
use crate::sources::{SourceResult, Sources};
use crate::workflow::state::{FailureReason, SourceKind, SourceOutcome, SourceResults};

/// Per-source hard deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    pub local_time: Duration,
    pub weather: Duration,
    pub news: Duration,
    pub events: Duration,
}

impl Deadlines {
    /// Upper bound on the whole collection phase.
    pub fn longest(&self) -> Duration {
        self.local_time
            .max(self.weather)
            .max(self.news)
            .max(self.events)
    }
}

impl From<&CollectionConfig> for Deadlines {
    fn from(config: &CollectionConfig) -> Self {
        Self {
            local_time: Duration::from_millis(config.local_time_timeout_ms),
            weather: Duration::from_millis(config.weather_timeout_ms),
            news: Duration::from_millis(config.news_timeout_ms),
            events: Duration::from_millis(config.events_timeout_ms),
        }
    }
}

pub struct Collector {
    sources: Sources,
    deadlines: Deadlines,
}

impl Collector {
    pub fn new(sources: Sources, deadlines: Deadlines) -> Self {
        Self { sources, deadlines }
    }

    /// Run all four fetches against `location` and wait for every one of them
    /// to finish, fail, hit its deadline or be cancelled. Nothing is spawned
    /// when `cancel` has already fired.
    pub async fn collect(
        &self,
        location: &ResolvedLocation,
        cancel: &CancellationToken,
    ) -> SourceResults {
        if cancel.is_cancelled() {
            tracing::info!(location = %location.display_name, "Collection skipped, query cancelled");
            return SourceResults::skipped();
        }

        let location = Arc::new(location.clone());
        let started = Instant::now();

        let local_time = {
            let source = Arc::clone(&self.sources.local_time);
            let location = Arc::clone(&location);
            spawn_fetch(
                SourceKind::LocalTime,
                self.deadlines.local_time,
                cancel.clone(),
                async move { source.fetch_local_time(&location).await },
            )
        };
        let weather = {
            let source = Arc::clone(&self.sources.weather);
            let location = Arc::clone(&location);
            spawn_fetch(
                SourceKind::Weather,
                self.deadlines.weather,
                cancel.clone(),
                async move { source.fetch_weather(&location).await },
            )
        };
        let news = {
            let source = Arc::clone(&self.sources.news);
            let location = Arc::clone(&location);
            spawn_fetch(
                SourceKind::News,
                self.deadlines.news,
                cancel.clone(),
                async move { source.fetch_news(&location).await },
            )
        };
        let events = {
            let source = Arc::clone(&self.sources.events);
            let location = Arc::clone(&location);
            spawn_fetch(
                SourceKind::Events,
                self.deadlines.events,
                cancel.clone(),
                async move { source.fetch_events(&location).await },
            )
        };

        let (local_time, weather, news, events) = tokio::join!(local_time, weather, news, events);

        let results = SourceResults {
            local_time: settle(SourceKind::LocalTime, local_time),
            weather: settle(SourceKind::Weather, weather),
            news: settle(SourceKind::News, news),
            events: settle(SourceKind::Events, events),
        };

        tracing::info!(
            location = %location.display_name,
            succeeded = results.success_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Collection phase finished"
        );
        results
    }
}

/// Spawn one fetch under its own deadline. Dropping the fetch future at the
/// deadline discards any late result.
fn spawn_fetch<T, F>(
    kind: SourceKind,
    deadline: Duration,
    cancel: CancellationToken,
    fetch: F,
) -> JoinHandle<SourceOutcome<T>>
where
    T: Send + 'static,
    F: Future<Output = SourceResult<T>> + Send + 'static,
{
    tokio::spawn(async move {
        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => SourceOutcome::Skipped,
            result = tokio::time::timeout(deadline, fetch) => match result {
                Ok(Ok(value)) => SourceOutcome::Success(value),
                Ok(Err(e)) => {
                    tracing::warn!(source = %kind, error = %e, "Source fetch failed");
                    SourceOutcome::Failure(e.failure_reason())
                }
                Err(_) => SourceOutcome::Failure(FailureReason::Timeout),
            },
        };

        tracing::debug!(
            source = %kind,
            outcome = ?outcome.status(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            deadline_ms = deadline.as_millis() as u64,
            "Source fetch settled"
        );
        outcome
    })
}

fn settle<T>(kind: SourceKind, joined: Result<SourceOutcome<T>, JoinError>) -> SourceOutcome<T> {
    match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(source = %kind, error = %e, "Source task aborted");
            SourceOutcome::Failure(FailureReason::ApiError)
        }
    }
}
