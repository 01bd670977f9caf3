use anyhow::Result;

use engram::config::EngramConfig;

/// Display fragment and memory statistics in the terminal.
pub fn stats(config: &EngramConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = engram::db::open_database(&db_path)?;

    let response = engram::memory::stats::collect_stats(&conn)?;

    println!("Engram Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total fragments:     {}", response.total_fragments);
    println!("  Processed:           {}", response.processed_fragments);
    println!("  Unprocessed:         {}", response.unprocessed_fragments);
    println!();
    println!("  Sessions:            {}", response.sessions);
    println!("  Memories:            {}", response.memories);
    println!();

    if let Some(ref oldest) = response.oldest_fragment {
        println!("Oldest fragment:       {oldest}");
    }
    if let Some(ref newest) = response.newest_fragment {
        println!("Newest fragment:       {newest}");
    }

    Ok(())
}
