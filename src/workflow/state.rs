//! Per-request execution context.
//!
//! A [`WorkflowState`] is created with only the raw query and moves forward
//! through [`Stage`]s. Every field is written by exactly one `record_*`
//! method, and each method is only accepted in the stage that owns the
//! field, so a field can never be written twice.

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::sources::types::{Event, Headline, ResolvedLocation, TimeInfo, WeatherInfo};
use crate::workflow::aggregate::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Unclassified,
    DestinationQuery,
    GeneralQuery,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Unclassified => "UNCLASSIFIED",
            Intent::DestinationQuery => "DESTINATION_QUERY",
            Intent::GeneralQuery => "GENERAL_QUERY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    LocalTime,
    Weather,
    News,
    Events,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::LocalTime,
        SourceKind::Weather,
        SourceKind::News,
        SourceKind::Events,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::LocalTime => "local_time",
            SourceKind::Weather => "weather",
            SourceKind::News => "news",
            SourceKind::Events => "events",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    Timeout,
    ApiError,
    NotConfigured,
}

/// Result of attempting one source fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum SourceOutcome<T> {
    Success(T),
    Failure(FailureReason),
    Skipped,
}

/// Payload-free view of an outcome, for logging and uniform checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Failure(FailureReason),
    Skipped,
}

impl<T> SourceOutcome<T> {
    pub fn status(&self) -> OutcomeStatus {
        match self {
            SourceOutcome::Success(_) => OutcomeStatus::Success,
            SourceOutcome::Failure(reason) => OutcomeStatus::Failure(*reason),
            SourceOutcome::Skipped => OutcomeStatus::Skipped,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SourceOutcome::Success(_))
    }
}

/// Outcomes of the collection phase, one per [`SourceKind`].
///
/// Each kind is a dedicated field, so every key is always present and each
/// concurrent task owns exactly one of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceResults {
    pub local_time: SourceOutcome<TimeInfo>,
    pub weather: SourceOutcome<WeatherInfo>,
    pub news: SourceOutcome<Vec<Headline>>,
    pub events: SourceOutcome<Vec<Event>>,
}

impl SourceResults {
    pub fn skipped() -> Self {
        Self {
            local_time: SourceOutcome::Skipped,
            weather: SourceOutcome::Skipped,
            news: SourceOutcome::Skipped,
            events: SourceOutcome::Skipped,
        }
    }

    pub fn status(&self, kind: SourceKind) -> OutcomeStatus {
        match kind {
            SourceKind::LocalTime => self.local_time.status(),
            SourceKind::Weather => self.weather.status(),
            SourceKind::News => self.news.status(),
            SourceKind::Events => self.events.status(),
        }
    }

    pub fn statuses(&self) -> [(SourceKind, OutcomeStatus); 4] {
        SourceKind::ALL.map(|kind| (kind, self.status(kind)))
    }

    pub fn success_count(&self) -> usize {
        self.statuses()
            .iter()
            .filter(|(_, status)| *status == OutcomeStatus::Success)
            .count()
    }
}

/// Output of the intent routing stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub intent: Intent,
    pub location_text: Option<String>,
    pub note: Option<String>,
}

impl Classification {
    pub fn destination(location_text: impl Into<String>) -> Self {
        Self {
            intent: Intent::DestinationQuery,
            location_text: Some(location_text.into()),
            note: None,
        }
    }

    pub fn general() -> Self {
        Self {
            intent: Intent::GeneralQuery,
            location_text: None,
            note: None,
        }
    }

    /// Fail-open result used when the classifier could not be trusted.
    pub fn fallback(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
            ..Self::general()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Init,
    Classified,
    DirectAnswer,
    Locating,
    Collecting,
    Aggregating,
    Done,
}

impl Stage {
    fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Init, Classified)
                | (Classified, DirectAnswer)
                | (Classified, Locating)
                | (Locating, Collecting)
                | (Locating, Aggregating)
                | (Collecting, Aggregating)
                | (Aggregating, Done)
                | (DirectAnswer, Done)
        )
    }
}

#[derive(Debug)]
pub struct WorkflowState {
    raw_query: String,
    intent: Intent,
    location_text: Option<String>,
    resolved_location: Option<ResolvedLocation>,
    source_results: Option<SourceResults>,
    final_report: Option<Report>,
    rendered_output: Option<String>,
    stage: Stage,
    history: Vec<Stage>,
    notes: Vec<String>,
}

impl WorkflowState {
    /// Start a request. Empty or whitespace-only queries are rejected.
    pub fn new(raw_query: &str) -> Result<Self> {
        let query = raw_query.trim();
        if query.is_empty() {
            return Err(AppError::Validation("query must not be empty".to_string()));
        }

        Ok(Self {
            raw_query: query.to_string(),
            intent: Intent::Unclassified,
            location_text: None,
            resolved_location: None,
            source_results: None,
            final_report: None,
            rendered_output: None,
            stage: Stage::Init,
            history: vec![Stage::Init],
            notes: Vec::new(),
        })
    }

    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn location_text(&self) -> Option<&str> {
        self.location_text.as_deref()
    }

    pub fn resolved_location(&self) -> Option<&ResolvedLocation> {
        self.resolved_location.as_ref()
    }

    pub fn source_results(&self) -> Option<&SourceResults> {
        self.source_results.as_ref()
    }

    pub fn final_report(&self) -> Option<&Report> {
        self.final_report.as_ref()
    }

    pub fn rendered_output(&self) -> Option<&str> {
        self.rendered_output.as_deref()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Every stage entered so far, in order.
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    /// Degradations absorbed along the way.
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Consume the state, yielding the user-visible text.
    pub fn into_output(self) -> Result<String> {
        match (self.stage, self.rendered_output) {
            (Stage::Done, Some(output)) => Ok(output),
            (stage, _) => Err(AppError::Internal(format!(
                "workflow ended in {stage:?} without output"
            ))),
        }
    }

    fn advance(&mut self, next: Stage) -> Result<()> {
        if !self.stage.can_advance_to(next) {
            return Err(AppError::InvalidTransition(format!(
                "{:?} -> {next:?}",
                self.stage
            )));
        }
        self.stage = next;
        self.history.push(next);
        Ok(())
    }

    fn expect_stage(&self, expected: Stage, action: &str) -> Result<()> {
        if self.stage != expected {
            return Err(AppError::InvalidTransition(format!(
                "cannot {action} in {:?}",
                self.stage
            )));
        }
        Ok(())
    }

    /// INIT -> CLASSIFIED -> DIRECT_ANSWER | LOCATING
    pub fn record_classification(&mut self, classification: Classification) -> Result<()> {
        self.expect_stage(Stage::Init, "record classification")?;

        let location_text = match (classification.intent, classification.location_text) {
            (Intent::DestinationQuery, Some(text)) if !text.trim().is_empty() => {
                Some(text.trim().to_string())
            }
            (Intent::DestinationQuery, _) => {
                return Err(AppError::InvalidTransition(
                    "destination query without location text".to_string(),
                ))
            }
            (Intent::GeneralQuery, _) => None,
            (Intent::Unclassified, _) => {
                return Err(AppError::InvalidTransition(
                    "classification must decide an intent".to_string(),
                ))
            }
        };

        self.advance(Stage::Classified)?;
        self.intent = classification.intent;
        self.location_text = location_text;
        if let Some(note) = classification.note {
            self.notes.push(note);
        }

        match self.intent {
            Intent::DestinationQuery => self.advance(Stage::Locating),
            _ => self.advance(Stage::DirectAnswer),
        }
    }

    /// DIRECT_ANSWER -> DONE
    pub fn record_direct_answer(&mut self, answer: String) -> Result<()> {
        self.expect_stage(Stage::DirectAnswer, "record a direct answer")?;
        self.rendered_output = Some(answer);
        self.advance(Stage::Done)
    }

    /// LOCATING -> COLLECTING on success, LOCATING -> AGGREGATING with every
    /// source skipped on failure.
    pub fn record_resolution(&mut self, location: Option<ResolvedLocation>) -> Result<()> {
        self.expect_stage(Stage::Locating, "record a resolution")?;
        match location {
            Some(location) => {
                self.resolved_location = Some(location);
                self.advance(Stage::Collecting)
            }
            None => {
                self.source_results = Some(SourceResults::skipped());
                self.advance(Stage::Aggregating)
            }
        }
    }

    /// COLLECTING -> AGGREGATING
    pub fn record_collection(&mut self, results: SourceResults) -> Result<()> {
        self.expect_stage(Stage::Collecting, "record collection results")?;
        self.source_results = Some(results);
        self.advance(Stage::Aggregating)
    }

    /// AGGREGATING -> DONE
    pub fn record_report(&mut self, report: Report, rendered: String) -> Result<()> {
        self.expect_stage(Stage::Aggregating, "record a report")?;
        self.final_report = Some(report);
        self.rendered_output = Some(rendered);
        self.advance(Stage::Done)
    }
}
