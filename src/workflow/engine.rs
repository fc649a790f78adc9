use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::llm::{Assistant, IntentClassifier, ReportRenderer, Responder};
use crate::sources::{geocoder_from_config, Geocoder, Sources};
use crate::workflow::aggregate::{aggregate, render, render_plain, Rendered, Report};
use crate::workflow::classify::classify;
use crate::workflow::collect::{Collector, Deadlines};
use crate::workflow::resolve::resolve;
use crate::workflow::state::{Classification, Intent, WorkflowState};

pub const DIRECT_ANSWER_FALLBACK: &str =
    "I'm set up for destination questions. Please ask about a specific city or place.";

const DEFAULT_CLASSIFY_TIMEOUT: Duration = Duration::from_secs(15);

/// Stateless orchestrator: every call builds its own [`WorkflowState`] and
/// nothing is kept between requests.
pub struct QueryEngine {
    classifier: Arc<dyn IntentClassifier>,
    responder: Arc<dyn Responder>,
    renderer: Arc<dyn ReportRenderer>,
    geocoder: Arc<dyn Geocoder>,
    collector: Collector,
    classify_timeout: Duration,
}

impl QueryEngine {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        responder: Arc<dyn Responder>,
        renderer: Arc<dyn ReportRenderer>,
        geocoder: Arc<dyn Geocoder>,
        collector: Collector,
    ) -> Self {
        Self {
            classifier,
            responder,
            renderer,
            geocoder,
            collector,
            classify_timeout: DEFAULT_CLASSIFY_TIMEOUT,
        }
    }

    pub fn with_classify_timeout(mut self, timeout: Duration) -> Self {
        self.classify_timeout = timeout;
        self
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let assistant = Arc::new(Assistant::new(&config.llm)?);
        let collector = Collector::new(
            Sources::from_config(config)?,
            Deadlines::from(&config.collection),
        );

        Ok(Self::new(
            assistant.clone(),
            assistant.clone(),
            assistant,
            geocoder_from_config(config)?,
            collector,
        )
        .with_classify_timeout(config.llm.classify_timeout()))
    }

    /// Answer one query. Only an empty query is an error; every other
    /// failure degrades the answer instead.
    pub async fn handle_query(&self, raw_query: &str) -> Result<String> {
        self.run(raw_query, &CancellationToken::new())
            .await?
            .into_output()
    }

    /// Drive a query through the full workflow and return the final state.
    /// Cancelling `cancel` abandons the stage in flight and degrades the
    /// answer; later stages run only their local fallbacks.
    pub async fn run(&self, raw_query: &str, cancel: &CancellationToken) -> Result<WorkflowState> {
        let mut state = WorkflowState::new(raw_query)?;
        let started = Instant::now();

        let classification = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                Classification::fallback("query cancelled during classification")
            }
            classification = classify(
                self.classifier.as_ref(),
                state.raw_query(),
                self.classify_timeout,
            ) => classification,
        };
        state.record_classification(classification)?;

        match state.intent() {
            Intent::GeneralQuery => self.answer_directly(&mut state, cancel).await?,
            Intent::DestinationQuery => self.build_report(&mut state, cancel).await?,
            Intent::Unclassified => {
                return Err(AppError::InvalidTransition(
                    "query left unclassified".to_string(),
                ))
            }
        }

        tracing::info!(
            intent = %state.intent().as_str(),
            degradations = state.notes().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query handled"
        );
        Ok(state)
    }

    async fn answer_directly(
        &self,
        state: &mut WorkflowState,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.responder.answer(state.raw_query()) => Some(result),
        };
        let answer = match result {
            None => {
                state.add_note("direct answer cancelled");
                DIRECT_ANSWER_FALLBACK.to_string()
            }
            Some(Ok(answer)) if !answer.trim().is_empty() => answer,
            Some(Ok(_)) => {
                state.add_note("direct answer was empty");
                DIRECT_ANSWER_FALLBACK.to_string()
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Direct answer failed, using fallback notice");
                state.add_note(format!("direct answer unavailable: {e}"));
                DIRECT_ANSWER_FALLBACK.to_string()
            }
        };
        state.record_direct_answer(answer)
    }

    async fn build_report(&self, state: &mut WorkflowState, cancel: &CancellationToken) -> Result<()> {
        let location_text = state
            .location_text()
            .ok_or_else(|| AppError::Internal("destination query without location".to_string()))?
            .to_string();

        let resolved = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            resolved = resolve(self.geocoder.as_ref(), &location_text) => Some(resolved),
        };
        let location = match resolved {
            Some(Ok(location)) => Some(location),
            Some(Err(e)) => {
                state.add_note(format!("location resolution failed: {e}"));
                None
            }
            None => {
                tracing::info!(location = %location_text, "Location resolution cancelled");
                state.add_note("location resolution cancelled");
                None
            }
        };
        state.record_resolution(location.clone())?;

        if let Some(location) = &location {
            let results = self.collector.collect(location, cancel).await;
            if cancel.is_cancelled() {
                state.add_note("collection cancelled before all sources finished");
            }
            state.record_collection(results)?;
        }

        let results = state
            .source_results()
            .ok_or_else(|| AppError::Internal("aggregating without source results".to_string()))?;
        let report = aggregate(state.resolved_location(), results);

        let rendered = tokio::select! {
            biased;
            _ = cancel.cancelled() => Rendered {
                text: render_plain(&report),
                fallback_note: matches!(report, Report::Located(_))
                    .then(|| "report rendering cancelled".to_string()),
            },
            rendered = render(self.renderer.as_ref(), state.intent(), &report) => rendered,
        };
        if let Some(note) = rendered.fallback_note {
            state.add_note(note);
        }
        state.record_report(report, rendered.text)
    }
}
