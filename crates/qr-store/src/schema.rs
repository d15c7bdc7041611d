//! Database schema definitions and migrations.

use rusqlite::Connection;

use crate::DbError;

pub fn run_migrations(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS qr_records (
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    file_path TEXT NOT NULL,
    url TEXT NOT NULL,
    format TEXT NOT NULL,
    byte_size INTEGER NOT NULL DEFAULT 0,
    width INTEGER NOT NULL DEFAULT 0,
    height INTEGER NOT NULL DEFAULT 0,
    text TEXT NOT NULL,
    has_logo BOOLEAN NOT NULL DEFAULT false,
    size INTEGER NOT NULL,
    logo_size REAL NOT NULL DEFAULT 0,
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_qr_records_owner_created
    ON qr_records (owner, created_at DESC);
"#;
