//! CLI commands for capturing, listing, and consolidating fragments.

use anyhow::{Context, Result};
use std::path::Path;

use engram::config::EngramConfig;
use engram::db;
use engram::fragment::ingest::{ingest_file, ingest_text, IngestResult};
use engram::fragment::store::{list_fragments, sessions_for_fragment, FragmentFilter};
use engram::server::AppState;

pub fn add(
    config: &EngramConfig,
    text: &str,
    source: &str,
    session_id: Option<&str>,
) -> Result<()> {
    let mut conn = db::open_database(config.resolved_db_path())?;
    let result = ingest_text(&mut conn, text, source, session_id)?;
    print_ingest(&result);
    Ok(())
}

pub fn add_file(config: &EngramConfig, path: &Path, session_id: Option<&str>) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {} as UTF-8 text", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut conn = db::open_database(config.resolved_db_path())?;
    let result = ingest_file(&mut conn, &content, &filename, session_id)?;
    print_ingest(&result);
    Ok(())
}

fn print_ingest(result: &IngestResult) {
    println!("Added {} fragment(s):", result.fragments_added);
    for (id, content) in result.fragment_ids.iter().zip(&result.fragments) {
        println!("  {id}  {content}");
    }
}

/// `processed: None` lists fragments in either state.
pub fn list(
    config: &EngramConfig,
    processed: Option<bool>,
    session_id: Option<String>,
    limit: usize,
) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    let filter = FragmentFilter {
        session_id,
        processed,
        limit: Some(limit),
    };
    let fragments = list_fragments(&conn, &filter)?;

    if fragments.is_empty() {
        println!("No fragments found.");
        return Ok(());
    }

    for f in &fragments {
        let state = match &f.memory_id {
            Some(memory_id) => format!("processed -> {memory_id}"),
            None => "unprocessed".to_string(),
        };
        println!("{}  [{}] {}", f.id, f.source, f.created_at);
        println!("    {}  ({state})", super::preview(&f.content));
        let sessions = sessions_for_fragment(&conn, &f.id)?;
        if !sessions.is_empty() {
            println!("    sessions: {}", sessions.join(", "));
        }
    }
    Ok(())
}

/// Consolidate either explicit ids or, with `all`, the newest `limit`
/// unprocessed fragments.
pub async fn process(
    config: EngramConfig,
    ids: Vec<String>,
    all: bool,
    limit: usize,
    session_id: Option<String>,
) -> Result<()> {
    let state = AppState::from_config(config).await?;

    let ids = if all {
        let filter = FragmentFilter {
            session_id: session_id.clone(),
            processed: Some(false),
            limit: Some(limit),
        };
        let pending =
            db::run_blocking(&state.db, move |conn| list_fragments(conn, &filter)).await?;
        pending.into_iter().map(|f| f.id).collect()
    } else {
        ids
    };

    if ids.is_empty() {
        println!("Nothing to process. Pass --ids or --all.");
        return Ok(());
    }

    let result = state
        .consolidator
        .consolidate(&ids, session_id.as_deref())
        .await?;

    println!("Memory {}", result.memory.id);
    println!(
        "  Fragments: {} consolidated, {} newly marked processed",
        result.processed_fragments, result.newly_marked
    );
    println!();
    println!("{}", result.memory.text);
    Ok(())
}
