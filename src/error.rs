use thiserror::Error;

use crate::workflow::state::FailureReason;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid query: {0}")]
    Validation(String),

    #[error("Intent classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("LLM API error: {0}")]
    LlmApi(String),

    #[error("LLM API rate limited: {0}")]
    LlmRateLimited(String),

    #[error("LLM API transient error: {0}")]
    LlmTransient(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Report rendering failed: {0}")]
    Render(String),

    #[error("Invalid workflow transition: {0}")]
    InvalidTransition(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Typed failure of a single external data source (geocoder or fetcher).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("no match for {0}")]
    NotFound(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transient provider error: {0}")]
    Transient(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Whether a retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::RateLimited(_) | SourceError::Transient(_) | SourceError::Timeout(_)
        )
    }

    pub fn failure_reason(&self) -> FailureReason {
        match self {
            SourceError::NotConfigured(_) => FailureReason::NotConfigured,
            SourceError::Timeout(_) => FailureReason::Timeout,
            _ => FailureReason::ApiError,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout(e.to_string())
        } else if e.is_decode() {
            SourceError::Malformed(e.to_string())
        } else if e.is_connect() || e.is_request() || e.is_body() {
            SourceError::Transient(e.to_string())
        } else {
            SourceError::Provider(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SourceError::RateLimited("429".into()).is_transient());
        assert!(SourceError::Transient("503".into()).is_transient());
        assert!(SourceError::Timeout("slow".into()).is_transient());
        assert!(!SourceError::Provider("401".into()).is_transient());
        assert!(!SourceError::NotFound("Atlantis".into()).is_transient());
        assert!(!SourceError::NotConfigured("weather".into()).is_transient());
    }

    #[test]
    fn test_failure_reason_mapping() {
        assert_eq!(
            SourceError::NotConfigured("news".into()).failure_reason(),
            FailureReason::NotConfigured
        );
        assert_eq!(
            SourceError::Timeout("events".into()).failure_reason(),
            FailureReason::Timeout
        );
        assert_eq!(
            SourceError::Malformed("bad json".into()).failure_reason(),
            FailureReason::ApiError
        );
    }
}
