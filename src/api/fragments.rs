use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use base64::Engine;
use serde::Deserialize;

use super::{parse_body, parse_flag, parse_query, success, with_db, ApiError, ApiResult};
use crate::fragment::ingest::{ingest_file, ingest_text};
use crate::fragment::store::{list_fragments, FragmentFilter};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct AddFragmentsRequest {
    pub text: Option<String>,
    pub source: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadFileRequest {
    pub filename: Option<String>,
    /// Base64-encoded UTF-8 file body.
    pub file_content: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub fragment_ids: Option<Vec<String>>,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub session_id: Option<String>,
    pub processed: Option<String>,
    pub limit: Option<usize>,
}

pub async fn add(
    State(state): State<AppState>,
    payload: Result<Json<AddFragmentsRequest>, JsonRejection>,
) -> ApiResult {
    let req = parse_body(payload)?;
    let text = req
        .text
        .ok_or_else(|| ApiError::BadRequest("text input required".into()))?;
    let source = req.source.unwrap_or_else(|| "web_input".into());
    let session_id = req.session_id;

    let result = with_db(&state, move |conn| {
        ingest_text(conn, &text, &source, session_id.as_deref())
    })
    .await?;
    success(result, Some("Fragments added successfully"))
}

pub async fn add_file(
    State(state): State<AppState>,
    payload: Result<Json<UploadFileRequest>, JsonRejection>,
) -> ApiResult {
    let req = parse_body(payload)?;
    let (Some(filename), Some(encoded)) = (req.filename, req.file_content) else {
        return Err(ApiError::BadRequest(
            "file content and filename required".into(),
        ));
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ApiError::BadRequest(format!("file_content is not valid base64: {e}")))?;
    let content = String::from_utf8(bytes)
        .map_err(|_| ApiError::BadRequest("file content must be UTF-8 text".into()))?;
    let session_id = req.session_id;

    let message = format!("File {filename} processed successfully");
    let result = with_db(&state, move |conn| {
        ingest_file(conn, &content, &filename, session_id.as_deref())
    })
    .await?;
    success(result, Some(message.as_str()))
}

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult {
    let q = parse_query(query)?;
    let filter = FragmentFilter {
        session_id: q.session_id,
        processed: parse_flag(q.processed.as_deref()),
        limit: q.limit,
    };
    let fragments = with_db(&state, move |conn| list_fragments(conn, &filter)).await?;
    success(serde_json::json!({ "fragments": fragments }), None)
}

pub async fn process(
    State(state): State<AppState>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiResult {
    let req = parse_body(payload)?;
    let fragment_ids = req
        .fragment_ids
        .ok_or_else(|| ApiError::BadRequest("fragment IDs required".into()))?;
    if fragment_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "at least one fragment ID required".into(),
        ));
    }

    let result = state
        .consolidator
        .consolidate(&fragment_ids, req.session_id.as_deref())
        .await?;
    success(result, Some("Fragments processed into memory"))
}
