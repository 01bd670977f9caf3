mod helpers;

use engram::db;
use engram::fragment::store::{create_fragment, get_fragment};
use tempfile::TempDir;

#[test]
fn open_creates_new_db_at_nonexistent_path() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("subdir").join("new.db");

    // Should not exist yet
    assert!(!db_path.exists());

    let conn = db::open_database(&db_path).unwrap();

    // Should have been created
    assert!(db_path.exists());
    assert_eq!(helpers::count(&conn, "fragments"), 0);
}

#[test]
fn data_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("engram.db");

    let id = {
        let mut conn = db::open_database(&db_path).unwrap();
        create_fragment(&mut conn, "walked the dog", "cli", None, None).unwrap()
    };

    let conn = db::open_database(&db_path).unwrap();
    let fragment = get_fragment(&conn, &id).unwrap().unwrap();
    assert_eq!(fragment.content, "walked the dog");
    assert!(!fragment.processed);
}

#[test]
fn health_check_passes_on_valid_db() {
    let mut conn = helpers::test_db();
    helpers::add_fragments(&mut conn, &["a note"]);

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.schema_version, db::migrations::CURRENT_SCHEMA_VERSION);
    assert_eq!(report.fragment_count, 1);
    assert_eq!(report.session_count, 0);
    assert_eq!(report.memory_count, 0);
}

#[test]
fn busy_timeout_is_set() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("test.db");

    let conn = db::open_database(&db_path).unwrap();

    let timeout: i64 = conn
        .pragma_query_value(None, "busy_timeout", |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);
}

#[test]
fn journal_mode_is_wal() {
    let tmp = TempDir::new().unwrap();
    let conn = db::open_database(tmp.path().join("wal.db")).unwrap();

    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}
