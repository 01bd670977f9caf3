use axum::extract::State;

use super::{success, with_db, ApiResult};
use crate::memory::stats::collect_stats;
use crate::server::AppState;

pub async fn health(State(state): State<AppState>) -> ApiResult {
    success(
        serde_json::json!({
            "status": "healthy",
            "model": state.completion.model(),
            "search": state.search.name(),
        }),
        None,
    )
}

pub async fn models(State(state): State<AppState>) -> ApiResult {
    let models = state.completion.list_models().await?;
    success(models, None)
}

pub async fn stats(State(state): State<AppState>) -> ApiResult {
    let stats = with_db(&state, |conn| collect_stats(conn)).await?;
    success(stats, None)
}
