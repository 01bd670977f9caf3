//! JSON HTTP API.
//!
//! Every response is an envelope: `{"success": true, "data": ..., "message"?: ...}`
//! or `{"success": false, "error": "..."}` with the status code taken from
//! [`EngramError::status_code`].

mod fragments;
mod memories;
mod sessions;
mod system;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;

use crate::db::run_blocking;
use crate::error::EngramError;
use crate::server::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(system::health))
        .route("/api/models", get(system::models))
        .route("/api/stats", get(system::stats))
        .route(
            "/api/fragments",
            get(fragments::list).post(fragments::add),
        )
        .route("/api/fragments/file", post(fragments::add_file))
        .route("/api/fragments/process", post(fragments::process))
        .route(
            "/api/sessions",
            get(sessions::list).post(sessions::create),
        )
        .route("/api/sessions/{id}/fragments", get(sessions::fragments))
        .route(
            "/api/memories",
            get(memories::list).post(memories::create),
        )
        .route("/api/memories/search", post(memories::search))
        .route("/api/memories/query", post(memories::query))
        .route("/api/memories/compose", post(memories::compose))
        .route("/api/memories/build", post(memories::build))
        .with_state(state)
}

/// Error half of the envelope.
#[derive(Debug)]
pub enum ApiError {
    Core(EngramError),
    BadRequest(String),
    Internal(String),
}

impl From<EngramError> for ApiError {
    fn from(e: EngramError) -> Self {
        Self::Core(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Core(e) => (
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                e.to_string(),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, format!("validation error: {msg}")),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "request failed");
        }
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

pub type ApiResult = Result<Json<serde_json::Value>, ApiError>;

/// Success half of the envelope.
pub fn success<T: Serialize>(data: T, message: Option<&str>) -> ApiResult {
    let data = serde_json::to_value(data)
        .map_err(|e| ApiError::Internal(format!("serialization failed: {e}")))?;
    let mut body = json!({ "success": true, "data": data });
    if let Some(message) = message {
        body["message"] = json!(message);
    }
    Ok(Json(body))
}

/// Unwrap a JSON body, turning extractor rejections into 400 envelopes.
pub fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// Run a storage closure on the blocking pool with the shared connection locked.
pub async fn with_db<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut Connection) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    run_blocking(&state.db, f).await.map_err(ApiError::from)
}

/// Unwrap query parameters, turning extractor rejections into 400 envelopes.
pub fn parse_query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// Interpret a `processed` query parameter the way browsers send it.
pub fn parse_flag(value: Option<&str>) -> Option<bool> {
    value.map(|v| v.eq_ignore_ascii_case("true"))
}
