use anyhow::Result;

use engram::config::EngramConfig;
use engram::db;
use engram::fragment::session::{create_session, list_sessions};

pub fn create(config: &EngramConfig, name: Option<&str>) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    let id = create_session(&conn, name, None)?;
    println!("Session {id}");
    Ok(())
}

pub fn list(config: &EngramConfig) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    let sessions = list_sessions(&conn)?;

    if sessions.is_empty() {
        println!("No sessions.");
        return Ok(());
    }

    for s in &sessions {
        println!(
            "{}  {:<24} {}",
            s.id,
            s.name.as_deref().unwrap_or("(unnamed)"),
            s.created_at
        );
    }
    Ok(())
}
