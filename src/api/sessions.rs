use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use super::{parse_flag, parse_query, success, with_db, ApiError, ApiResult};
use crate::error::EngramError;
use crate::fragment::session::{create_session, list_sessions, session_exists};
use crate::fragment::store::{list_fragments, FragmentFilter};
use crate::fragment::Metadata;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    pub name: Option<String>,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
pub struct SessionFragmentsQuery {
    pub processed: Option<String>,
    pub limit: Option<usize>,
}

pub async fn list(State(state): State<AppState>) -> ApiResult {
    let sessions = with_db(&state, |conn| list_sessions(conn)).await?;
    success(serde_json::json!({ "sessions": sessions }), None)
}

/// The body is optional; an empty POST creates an unnamed session.
pub async fn create(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let req: CreateSessionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateSessionRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?
    };

    let name = req.name.clone();
    let session_id = with_db(&state, move |conn| {
        create_session(conn, req.name.as_deref(), req.metadata.as_ref())
    })
    .await?;
    success(
        serde_json::json!({ "session_id": session_id, "name": name }),
        Some("Session created successfully"),
    )
}

pub async fn fragments(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    query: Result<Query<SessionFragmentsQuery>, QueryRejection>,
) -> ApiResult {
    let q = parse_query(query)?;
    let filter = FragmentFilter {
        session_id: Some(session_id.clone()),
        processed: parse_flag(q.processed.as_deref()),
        limit: q.limit,
    };
    let sid = session_id.clone();
    let fragments = with_db(&state, move |conn| {
        if !session_exists(conn, &sid)? {
            return Err(EngramError::not_found("session", sid));
        }
        list_fragments(conn, &filter)
    })
    .await?;
    success(
        serde_json::json!({ "fragments": fragments, "session_id": session_id }),
        None,
    )
}
