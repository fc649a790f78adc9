use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result, SourceError};

const USER_AGENT: &str = concat!("compass/", env!("CARGO_PKG_VERSION"));

pub fn build_client(request_timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(request_timeout_secs))
        .build()
        .map_err(AppError::from)
}

/// Map a non-success status to the typed source failure.
pub fn status_error(status: StatusCode, body: &str) -> SourceError {
    let message = format!("{status}: {}", truncate(body, 200));
    match status {
        StatusCode::NOT_FOUND => SourceError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimited(message),
        s if s.is_server_error() => SourceError::Transient(message),
        _ => SourceError::Provider(message),
    }
}

/// Check the status and decode a JSON body.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> std::result::Result<T, SourceError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, &body));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::Malformed(e.to_string()))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
