//! SQLite schema versioning.
//!
//! The applied version is tracked in `seed_schema`. Opening a database runs
//! every step between the recorded version and [`CURRENT_VERSION`]; a
//! database written by a newer build is refused.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Schema version this build writes.
pub const CURRENT_VERSION: u32 = 2;

/// Bring the schema up to [`CURRENT_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS seed_schema (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM seed_schema",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO seed_schema (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, crate::sqlite::now_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
        _ => Err(StoreError::Migration(format!(
            "no schema step for version {}",
            version
        ))),
    }
}

/// v1: record collections, counters and the chunked bucket.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Record collections
        CREATE TABLE collections (
            name TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        );

        -- Records, CBOR-encoded JSON objects
        CREATE TABLE documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            collection TEXT NOT NULL,
            body BLOB NOT NULL
        );

        -- Named sequence counters
        CREATE TABLE counters (
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );

        -- Bucket object metadata, written once all chunks are stored
        CREATE TABLE bucket_files (
            id BLOB PRIMARY KEY,              -- 12 bytes, ObjectId
            bucket TEXT NOT NULL,
            filename TEXT NOT NULL,           -- not unique
            length INTEGER NOT NULL,
            chunk_size INTEGER NOT NULL,
            checksum TEXT NOT NULL,           -- hex Blake3 of content
            uploaded_at INTEGER NOT NULL      -- Unix ms
        );

        -- Bucket object content
        CREATE TABLE bucket_chunks (
            files_id BLOB NOT NULL,
            n INTEGER NOT NULL,               -- 0-based chunk index
            data BLOB NOT NULL,
            PRIMARY KEY (files_id, n)
        );

        CREATE INDEX idx_documents_collection ON documents(collection, id);
        CREATE INDEX idx_bucket_files_name ON bucket_files(bucket, filename);
        "#,
    )?;

    Ok(())
}

/// v2: unique `_id` per collection. Records without `_id` have a NULL key.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        ALTER TABLE documents ADD COLUMN id_key TEXT;   -- compact JSON of _id
        CREATE UNIQUE INDEX idx_documents_id_key ON documents(collection, id_key);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_seed_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in ["collections", "documents", "counters", "bucket_files", "bucket_chunks", "seed_schema"] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }
    }

    #[test]
    fn test_repeated_migrate_keeps_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM seed_schema", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_upgrades_v1_database() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE seed_schema (version INTEGER PRIMARY KEY, applied_at INTEGER NOT NULL);
             INSERT INTO seed_schema (version, applied_at) VALUES (1, 0);",
        )
        .unwrap();
        apply_v1(&conn).unwrap();
        conn.execute(
            "INSERT INTO documents (collection, body) VALUES ('user', x'a0')",
            [],
        )
        .unwrap();

        migrate(&mut conn).unwrap();

        let keys: Vec<Option<String>> = conn
            .prepare("SELECT id_key FROM documents")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(keys, vec![None]);
    }

    #[test]
    fn test_refuses_newer_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO seed_schema (version, applied_at) VALUES (99, 0)",
            [],
        )
        .unwrap();

        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }
}
