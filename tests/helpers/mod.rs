#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use engram::completion::stub::StaticCompletion;
use engram::completion::CompletionService;
use engram::config::CompletionConfig;
use engram::db::{self, SharedConnection};
use engram::fragment::store::create_fragment;
use engram::memory::consolidate::Consolidator;
use rusqlite::Connection;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Wrap a fresh database in the shared handle components expect.
pub fn shared_db() -> SharedConnection {
    Arc::new(Mutex::new(test_db()))
}

/// Insert one fragment per entry, in order, and return their ids.
pub fn add_fragments(conn: &mut Connection, contents: &[&str]) -> Vec<String> {
    contents
        .iter()
        .map(|c| create_fragment(conn, c, "test", None, None).unwrap())
        .collect()
}

/// Same as [`add_fragments`] on a shared handle.
pub fn add_shared_fragments(db: &SharedConnection, contents: &[&str]) -> Vec<String> {
    let mut conn = db::lock(db);
    add_fragments(&mut conn, contents)
}

/// A consolidator backed by `completion`, plus the handle to inspect it.
pub fn consolidator_with(
    db: &SharedConnection,
    completion: StaticCompletion,
) -> (Consolidator, Arc<StaticCompletion>) {
    let completion = Arc::new(completion);
    let service: Arc<dyn CompletionService> = completion.clone();
    let consolidator = Consolidator::new(Arc::clone(db), service, &CompletionConfig::default());
    (consolidator, completion)
}

/// Count rows in a table.
pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}
