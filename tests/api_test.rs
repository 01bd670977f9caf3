mod helpers;

use std::sync::Arc;

use base64::Engine;
use engram::completion::stub::StaticCompletion;
use engram::config::EngramConfig;
use engram::memory::search::SubstringSearch;
use engram::server::{app, AppState};
use serde_json::{json, Value};

/// Serve the API on an ephemeral port and return its base URL.
async fn spawn_api(reply: &str) -> String {
    let state = AppState::new(
        helpers::shared_db(),
        Arc::new(StaticCompletion::reply(reply)),
        Arc::new(SubstringSearch),
        EngramConfig::default(),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    format!("http://{addr}/api")
}

async fn post(base: &str, path: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{base}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn get(base: &str, path: &str) -> (u16, Value) {
    let resp = reqwest::get(format!("{base}{path}")).await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn health_reports_healthy() {
    let base = spawn_api("story").await;
    let (status, body) = get(&base, "/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn add_list_process_flow() {
    let base = spawn_api("A calm walk in the sun.").await;

    let (status, body) = post(
        &base,
        "/fragments",
        json!({ "text": "I walked the dog. It was sunny and I felt happy." }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["fragments_added"], 3);
    let ids: Vec<String> = serde_json::from_value(body["data"]["fragment_ids"].clone()).unwrap();

    let (_, listed) = get(&base, "/fragments?processed=false").await;
    assert_eq!(listed["data"]["fragments"].as_array().unwrap().len(), 3);
    assert_eq!(listed["data"]["fragments"][0]["source"], "web_input");

    let (status, processed) = post(&base, "/fragments/process", json!({ "fragment_ids": ids })).await;
    assert_eq!(status, 200);
    assert_eq!(processed["data"]["memory"]["text"], "A calm walk in the sun.");
    assert_eq!(processed["data"]["processed_fragments"], 3);

    let (_, pending) = get(&base, "/fragments?processed=false").await;
    assert!(pending["data"]["fragments"].as_array().unwrap().is_empty());

    let (_, stats) = get(&base, "/stats").await;
    assert_eq!(stats["data"]["processed_fragments"], 3);
    assert_eq!(stats["data"]["memories"], 1);
}

#[tokio::test]
async fn process_rejects_empty_and_unknown_selections() {
    let base = spawn_api("story").await;

    let (status, body) = post(&base, "/fragments/process", json!({ "fragment_ids": [] })).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);

    let (status, body) =
        post(&base, "/fragments/process", json!({ "fragment_ids": ["missing"] })).await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn missing_text_is_bad_request() {
    let base = spawn_api("story").await;
    let (status, body) = post(&base, "/fragments", json!({ "source": "web" })).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("text"));
}

#[tokio::test]
async fn malformed_query_string_uses_error_envelope() {
    let base = spawn_api("story").await;

    for path in [
        "/fragments?limit=abc",
        "/memories?limit=-1",
        "/sessions/any/fragments?limit=many",
    ] {
        let (status, body) = get(&base, path).await;
        assert_eq!(status, 400, "{path}");
        assert_eq!(body["success"], false, "{path}");
        assert!(body["error"].as_str().unwrap().contains("limit"), "{path}: {body}");
    }
}

#[tokio::test]
async fn sessions_group_fragments() {
    let base = spawn_api("story").await;

    let (_, created) = post(&base, "/sessions", json!({ "name": "evening" })).await;
    let session_id = created["data"]["session_id"].as_str().unwrap().to_string();

    post(
        &base,
        "/fragments",
        json!({ "text": "Rain on the roof.", "session_id": session_id }),
    )
    .await;
    post(&base, "/fragments", json!({ "text": "Unrelated note." })).await;

    let (status, body) = get(&base, &format!("/sessions/{session_id}/fragments")).await;
    assert_eq!(status, 200);
    let fragments = body["data"]["fragments"].as_array().unwrap();
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0]["content"], "Rain on the roof");

    let (status, _) = get(&base, "/sessions/nope/fragments").await;
    assert_eq!(status, 404);

    let (_, sessions) = get(&base, "/sessions").await;
    assert_eq!(sessions["data"]["sessions"][0]["name"], "evening");
}

#[tokio::test]
async fn file_upload_decodes_base64() {
    let base = spawn_api("story").await;
    let encoded = base64::engine::general_purpose::STANDARD.encode("Long day. Went home early.");

    let (status, body) = post(
        &base,
        "/fragments/file",
        json!({ "filename": "notes.txt", "file_content": encoded }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["filename"], "notes.txt");
    assert_eq!(body["data"]["fragments_added"], 2);

    let (status, _) = post(
        &base,
        "/fragments/file",
        json!({ "filename": "bad.txt", "file_content": "%%%" }),
    )
    .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn memories_create_search_and_query() {
    let base = spawn_api("You were at the lake.").await;

    let (status, _) = post(&base, "/memories", json!({ "text": "Swimming at the Lake" })).await;
    assert_eq!(status, 200);
    post(&base, "/memories", json!({ "text": "Dinner in town" })).await;

    let (_, found) = post(&base, "/memories/search", json!({ "query": "lake" })).await;
    let results = found["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["source"], "direct_input");

    let (_, answered) = post(&base, "/memories/query", json!({ "question": "lake" })).await;
    assert_eq!(answered["data"]["response"], "You were at the lake.");

    let (_, listed) = get(&base, "/memories?limit=1").await;
    assert_eq!(listed["data"]["memories"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn compose_and_build() {
    let base = spawn_api("A full entry.").await;

    let (status, composed) = post(
        &base,
        "/memories/compose",
        json!({ "fragments": ["beach", "sunset"] }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(composed["data"]["source"], "fragment_processing");
    assert_eq!(composed["data"]["text"], "A full entry.");

    let (status, built) = post(&base, "/memories/build", json!({ "content": "beach sunset" })).await;
    assert_eq!(status, 200);
    assert_eq!(built["data"]["built_content"], "A full entry.");
    assert_eq!(built["data"]["original_content"], "beach sunset");
    assert_eq!(built["data"]["source"], "text_input");
}
