use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::workflow::QueryEngine;

pub struct AppState {
    pub engine: QueryEngine,
}

impl AppState {
    pub fn new(config: &AppConfig) -> crate::error::Result<Self> {
        Ok(Self {
            engine: QueryEngine::from_config(config)?,
        })
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/query", post(handle_query))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub output: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub async fn handle_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.engine.handle_query(&request.query).await {
        Ok(output) => Ok(Json(QueryResponse { output })),
        Err(AppError::Validation(message)) => {
            tracing::debug!(error = %message, "Rejected query");
            Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse { error: message }),
            ))
        }
        Err(e) => {
            tracing::error!(error = %e, "Query failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal error".to_string(),
                }),
            ))
        }
    }
}

async fn health_check() -> &'static str {
    "ok"
}
