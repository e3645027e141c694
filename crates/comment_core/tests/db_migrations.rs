use comment_core::db::migrations::{latest_version, schema_version};
use comment_core::db::{open_db, open_db_in_memory, open_db_with, DbError};
use comment_core::CoreConfig;
use rusqlite::Connection;

#[test]
fn in_memory_database_has_every_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    for table in [
        "moments",
        "strategies",
        "meetings",
        "meeting_members",
        "comments",
        "comment_viewers",
        "notifications",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn reopening_a_file_database_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("comments.db");

    let first = open_db(&path).unwrap();
    first
        .execute("INSERT INTO meetings (id, name) VALUES (1, 'kept');", [])
        .unwrap();
    drop(first);

    let config = CoreConfig {
        busy_timeout_ms: 250,
        ..CoreConfig::default()
    };
    let second = open_db_with(&path, &config).unwrap();
    assert_eq!(schema_version(&second).unwrap(), latest_version());
    let name: String = second
        .query_row("SELECT name FROM meetings WHERE id = 1;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(name, "kept");
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
