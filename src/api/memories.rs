use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::{parse_body, parse_query, success, with_db, ApiError, ApiResult};
use crate::fragment::Metadata;
use crate::memory::query::answer;
use crate::memory::store::{add_memory, list_memories, MemoryFilter};
use crate::memory::Memory;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMemoryRequest {
    pub text: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub fragments: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ComposeRequest {
    pub fragments: Option<Vec<String>>,
    pub source: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Deserialize)]
pub struct BuildRequest {
    pub content: Option<String>,
    pub source: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult {
    let q = parse_query(query)?;
    let filter = MemoryFilter {
        source: q.source,
        limit: q.limit,
    };
    let memories = with_db(&state, move |conn| list_memories(conn, &filter)).await?;
    success(serde_json::json!({ "memories": memories }), None)
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateMemoryRequest>, JsonRejection>,
) -> ApiResult {
    let req = parse_body(payload)?;
    let text = req
        .text
        .ok_or_else(|| ApiError::BadRequest("text content required".into()))?;
    let memory = Memory::new(
        text,
        req.source.unwrap_or_else(|| "direct_input".into()),
        req.fragments,
        req.metadata,
    );

    let stored = memory.clone();
    with_db(&state, move |conn| add_memory(conn, &stored)).await?;
    success(memory, Some("Memory created successfully"))
}

pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult {
    let req = parse_body(payload)?;
    let query = req
        .query
        .ok_or_else(|| ApiError::BadRequest("search query required".into()))?;
    let top_k = req.limit.unwrap_or(state.config.retrieval.default_top_k);

    let search = state.search.clone();
    let q = query.clone();
    let results = with_db(&state, move |conn| search.search(conn, &q, top_k)).await?;
    success(serde_json::json!({ "results": results, "query": query }), None)
}

pub async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> ApiResult {
    let req = parse_body(payload)?;
    let question = req
        .question
        .ok_or_else(|| ApiError::BadRequest("question required".into()))?;

    let response = answer(
        &state.db,
        &state.search,
        state.completion.as_ref(),
        &question,
    )
    .await?;
    success(
        serde_json::json!({ "question": question, "response": response }),
        Some("Memory query processed successfully"),
    )
}

pub async fn compose(
    State(state): State<AppState>,
    payload: Result<Json<ComposeRequest>, JsonRejection>,
) -> ApiResult {
    let req = parse_body(payload)?;
    let fragments = req
        .fragments
        .ok_or_else(|| ApiError::BadRequest("fragments required".into()))?;
    let source = req.source.unwrap_or_else(|| "fragment_processing".into());

    let memory = state
        .consolidator
        .compose(fragments, &source, req.metadata)
        .await?;
    success(memory, Some("Fragments processed into memory successfully"))
}

pub async fn build(
    State(state): State<AppState>,
    payload: Result<Json<BuildRequest>, JsonRejection>,
) -> ApiResult {
    let req = parse_body(payload)?;
    let content = req
        .content
        .ok_or_else(|| ApiError::BadRequest("content required".into()))?;
    let source = req.source.unwrap_or_else(|| "text_input".into());

    let built = state.consolidator.build(&content).await?;
    success(
        serde_json::json!({
            "built_content": built,
            "source": source,
            "original_content": content,
        }),
        Some("Memory built successfully"),
    )
}
