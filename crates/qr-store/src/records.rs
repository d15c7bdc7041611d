//! Stored QR artifact records.

use rusqlite::{OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{Database, DbError};

/// One generated artifact. `created_at` is an RFC 3339 UTC timestamp with
/// millisecond precision, so lexical order is chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrRecord {
    pub id: String,
    pub owner: String,
    pub file_path: String,
    pub url: String,
    pub format: String,
    pub byte_size: i64,
    pub width: i64,
    pub height: i64,
    pub text: String,
    pub has_logo: bool,
    pub size: i64,
    pub logo_size: f64,
    pub tags: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatCount {
    pub value: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrStats {
    #[serde(rename = "totalQRs")]
    pub total: i64,
    #[serde(rename = "recentQRs")]
    pub recent: i64,
    pub format_breakdown: Vec<FormatCount>,
    pub last_generated: Option<String>,
}

const RECORD_COLUMNS: &str = "id, owner, file_path, url, format, byte_size, width, height, text, has_logo, size, logo_size, tags, created_at";

fn map_record(row: &Row<'_>) -> rusqlite::Result<QrRecord> {
    let tags_json: String = row.get(12)?;
    Ok(QrRecord {
        id: row.get(0)?,
        owner: row.get(1)?,
        file_path: row.get(2)?,
        url: row.get(3)?,
        format: row.get(4)?,
        byte_size: row.get(5)?,
        width: row.get(6)?,
        height: row.get(7)?,
        text: row.get(8)?,
        has_logo: row.get(9)?,
        size: row.get(10)?,
        logo_size: row.get(11)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        created_at: row.get(13)?,
    })
}

impl Database {
    pub fn insert_qr_record(&self, record: &QrRecord) -> Result<(), DbError> {
        let tags = serde_json::to_string(&record.tags)
            .map_err(|e| DbError::InvalidData(e.to_string()))?;
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO qr_records ({RECORD_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                rusqlite::params![
                    record.id,
                    record.owner,
                    record.file_path,
                    record.url,
                    record.format,
                    record.byte_size,
                    record.width,
                    record.height,
                    record.text,
                    record.has_logo,
                    record.size,
                    record.logo_size,
                    tags,
                    record.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_qr_record(&self, id: &str) -> Result<Option<QrRecord>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM qr_records WHERE id = ?1"
            ))?;
            let record = stmt.query_row([id], map_record).optional()?;
            Ok(record)
        })
    }

    /// Newest-first page of an owner's records.
    pub fn list_qr_records(&self, owner: &str, limit: i64, offset: i64) -> Result<Vec<QrRecord>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM qr_records
                 WHERE owner = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt.query_map(rusqlite::params![owner, limit, offset.max(0)], map_record)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    pub fn get_all_qr_records(&self, owner: &str) -> Result<Vec<QrRecord>, DbError> {
        self.list_qr_records(owner, -1, 0)
    }

    pub fn count_qr_records(&self, owner: &str) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM qr_records WHERE owner = ?1",
                [owner],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Returns `true` when a row was removed.
    pub fn delete_qr_record(&self, id: &str) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM qr_records WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Aggregate counts for an owner. `recent_since` uses the same timestamp
    /// format as `created_at`.
    pub fn get_qr_stats(&self, owner: &str, recent_since: &str) -> Result<QrStats, DbError> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM qr_records WHERE owner = ?1",
                [owner],
                |row| row.get(0),
            )?;
            let recent: i64 = conn.query_row(
                "SELECT COUNT(*) FROM qr_records WHERE owner = ?1 AND created_at >= ?2",
                [owner, recent_since],
                |row| row.get(0),
            )?;
            let last_generated: Option<String> = conn
                .query_row(
                    "SELECT MAX(created_at) FROM qr_records WHERE owner = ?1",
                    [owner],
                    |row| row.get(0),
                )
                .optional()?
                .flatten();

            let mut stmt = conn.prepare(
                "SELECT format, COUNT(*) FROM qr_records
                 WHERE owner = ?1
                 GROUP BY format
                 ORDER BY COUNT(*) DESC, format ASC",
            )?;
            let format_breakdown = stmt
                .query_map([owner], |row| {
                    Ok(FormatCount {
                        value: row.get(0)?,
                        count: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(QrStats {
                total,
                recent,
                format_breakdown,
                last_generated,
            })
        })
    }
}
