use std::time::Duration;

use crate::llm::{IntentClassifier, Verdict};
use crate::workflow::state::Classification;

/// Route a query. Never fails: any classifier problem falls back to a
/// general query with a degradation note.
pub async fn classify(
    classifier: &dyn IntentClassifier,
    query: &str,
    timeout: Duration,
) -> Classification {
    let verdict = match tokio::time::timeout(timeout, classifier.classify(query)).await {
        Ok(Ok(verdict)) => verdict,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Intent classifier failed, treating as general query");
            return Classification::fallback(format!("intent classification unavailable: {e}"));
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                "Intent classifier timed out, treating as general query"
            );
            return Classification::fallback("intent classification timed out");
        }
    };

    match verdict {
        Verdict::Destination(location) if !location.trim().is_empty() => {
            tracing::info!(location = %location, "Classified as destination query");
            Classification::destination(location.trim())
        }
        Verdict::Destination(_) => {
            tracing::warn!("Destination verdict without a location, treating as general query");
            Classification::fallback("classifier returned no location")
        }
        Verdict::General => {
            tracing::info!("Classified as general query");
            Classification::general()
        }
    }
}
