pub mod assistant;
pub mod client;
pub mod prompt;

use async_trait::async_trait;

use crate::error::Result;
use crate::workflow::aggregate::Report;
use crate::workflow::state::Intent;

pub use assistant::Assistant;

/// Answer of the intent classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Destination query, with the location mention extracted from it.
    Destination(String),
    General,
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Fails with `ClassifierUnavailable` (or an LLM error) when no verdict
    /// can be trusted.
    async fn classify(&self, query: &str) -> Result<Verdict>;
}

#[async_trait]
pub trait Responder: Send + Sync {
    async fn answer(&self, query: &str) -> Result<String>;
}

#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// Turn a structured report into user-facing prose.
    async fn render(&self, intent: Intent, report: &Report) -> Result<String>;
}
