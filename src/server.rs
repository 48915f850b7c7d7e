//! HTTP surface: the payment provider posts each transaction to `/webhook`.

use crate::core::pipeline::{ImportOutcome, ImportPipeline};
use crate::utils::error::{ErrorCategory, ImportError};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(pipeline: Arc<ImportPipeline>) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

async fn health() -> &'static str {
    "ok"
}

async fn webhook(State(pipeline): State<Arc<ImportPipeline>>, body: Bytes) -> Response {
    match pipeline.process_payload(&body).await {
        Ok(ImportOutcome::Imported(summary)) => (StatusCode::OK, Json(summary)).into_response(),
        Ok(ImportOutcome::Duplicate { .. }) => {
            (StatusCode::OK, "Transaction already processed").into_response()
        }
        Ok(ImportOutcome::Ignored { .. }) => {
            (StatusCode::OK, "Ignoring uncompleted transaction").into_response()
        }
        Err(e) => error_response(e),
    }
}

fn error_response(e: ImportError) -> Response {
    let status = match e.category() {
        ErrorCategory::Client => StatusCode::BAD_REQUEST,
        ErrorCategory::Dependency | ErrorCategory::Configuration | ErrorCategory::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status.is_server_error() {
        tracing::error!(error = %e, "Webhook processing failed");
    }
    (status, e.to_string()).into_response()
}
