use anyhow::Result;

use engram::config::EngramConfig;
use engram::db;
use engram::memory::query::answer;
use engram::memory::search::create_search;
use engram::server::AppState;

/// Run a memory search from the terminal.
pub fn search(config: &EngramConfig, query: &str, top_k: Option<usize>) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    let strategy = create_search(&config.retrieval)?;
    let top_k = top_k.unwrap_or(config.retrieval.default_top_k);

    let results = strategy.search(&conn, query, top_k)?;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s) ({} search)\n", results.len(), strategy.name());
    for (i, m) in results.iter().enumerate() {
        println!("  {}. [{}] {}", i + 1, m.source, m.id);
        println!("     {}", super::preview(&m.text));
        println!();
    }
    Ok(())
}

/// Answer a question from stored memories.
pub async fn ask(config: EngramConfig, question: &str) -> Result<()> {
    let state = AppState::from_config(config).await?;
    let response = answer(
        &state.db,
        &state.search,
        state.completion.as_ref(),
        question,
    )
    .await?;
    println!("{response}");
    Ok(())
}

