use anyhow::Result;

use engram::config::EngramConfig;
use engram::db;
use engram::fragment::Metadata;
use engram::memory::store::{list_memories, MemoryFilter};
use engram::server::AppState;

pub fn list(config: &EngramConfig, limit: usize, source: Option<String>) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    let filter = MemoryFilter {
        source,
        limit: Some(limit),
    };
    let memories = list_memories(&conn, &filter)?;

    if memories.is_empty() {
        println!("No memories stored.");
        return Ok(());
    }

    for (i, m) in memories.iter().enumerate() {
        println!(
            "  {}. [{}] {} ({} fragment(s), {})",
            i + 1,
            m.source,
            m.id,
            m.fragments.len(),
            m.created_at
        );
        println!("     {}", super::preview(&m.text));
        println!();
    }
    Ok(())
}

/// Compose and store a memory straight from command-line fragment strings.
pub async fn compose(config: EngramConfig, fragments: Vec<String>) -> Result<()> {
    let state = AppState::from_config(config).await?;
    let memory = state
        .consolidator
        .compose(fragments, "cli", Metadata::new())
        .await?;

    println!("Memory {}", memory.id);
    println!();
    println!("{}", memory.text);
    Ok(())
}
