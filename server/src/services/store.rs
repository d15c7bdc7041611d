//! Durable artifact storage: the `ArtifactStore` port and its local
//! filesystem + SQLite implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use qr_engine::ArtifactMetadata;
use qr_store::{Database, QrRecord, QrStats};
use serde::Serialize;

/// Owner of every record; the service runs for a single admin session.
pub const ADMIN_OWNER: &str = "admin-user";

const STORE_DIR: &str = "store";
const BASE_TAGS: [&str; 2] = ["qr-code", "generated"];
const RECENT_DAYS: i64 = 7;

pub type StoreStats = QrStats;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Db(#[from] qr_store::DbError),
}

/// A persisted artifact as exposed over the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredArtifact {
    pub id: String,
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

impl From<QrRecord> for StoredArtifact {
    fn from(r: QrRecord) -> Self {
        Self {
            id: r.id,
            url: r.url,
            format: r.format,
            byte_size: r.byte_size,
            width: r.width,
            height: r.height,
            text: r.text,
            has_logo: r.has_logo,
            size: r.size,
            logo_size: r.logo_size,
            tags: r.tags,
            created_at: r.created_at,
        }
    }
}

/// Outcome of deleting every record of an owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub deleted: usize,
    pub errors: usize,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist the staged render at `source`. The staged file stays owned by
    /// the caller.
    async fn upload(
        &self,
        source: &Path,
        metadata: &ArtifactMetadata,
    ) -> Result<StoredArtifact, ExportError>;

    /// Newest-first page plus the owner's total record count.
    async fn history(
        &self,
        owner: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<StoredArtifact>, i64), ExportError>;

    async fn stats(&self, owner: &str) -> Result<StoreStats, ExportError>;

    /// Returns `false` when no record has this id.
    async fn delete(&self, id: &str) -> Result<bool, ExportError>;

    async fn fetch(&self, id: &str) -> Result<Option<(StoredArtifact, Vec<u8>)>, ExportError>;
}

/// Delete every record of `owner`, one at a time, counting failures.
pub async fn clear_history(
    store: &dyn ArtifactStore,
    owner: &str,
) -> Result<ClearReport, ExportError> {
    let (records, _) = store.history(owner, -1, 0).await?;
    let mut report = ClearReport::default();
    for record in records {
        match store.delete(&record.id).await {
            Ok(true) => report.deleted += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::error!(id = %record.id, "Failed to delete QR record: {e}");
                report.errors += 1;
            }
        }
    }
    tracing::info!(deleted = report.deleted, errors = report.errors, "History cleared");
    Ok(report)
}

/// Stores artifact files under `<data>/store/<YYYY-MM-DD>/<id>.<ext>` and
/// indexes them in SQLite.
#[derive(Clone)]
pub struct LocalArtifactStore {
    db: Database,
    data_dir: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(db: Database, data_dir: PathBuf) -> Self {
        Self { db, data_dir }
    }

    fn store_dir(&self) -> PathBuf {
        self.data_dir.join(STORE_DIR)
    }

    fn preview_url(id: &str) -> String {
        format!("/api/qr/preview/{id}")
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn upload(
        &self,
        source: &Path,
        metadata: &ArtifactMetadata,
    ) -> Result<StoredArtifact, ExportError> {
        let id = nanoid::nanoid!();
        let format = metadata.format;
        let dir = self
            .store_dir()
            .join(metadata.created_at.format("%Y-%m-%d").to_string());
        std::fs::create_dir_all(&dir)?;
        let file_path = dir.join(format!("{id}.{}", format.extension()));
        let byte_size = std::fs::copy(source, &file_path)?;

        let mut tags: Vec<String> = BASE_TAGS.iter().map(|t| t.to_string()).collect();
        tags.push(format.as_str().to_string());

        let record = QrRecord {
            id: id.clone(),
            owner: ADMIN_OWNER.to_string(),
            file_path: file_path.to_string_lossy().into_owned(),
            url: Self::preview_url(&id),
            format: format.as_str().to_string(),
            byte_size: byte_size as i64,
            width: i64::from(metadata.size),
            height: i64::from(metadata.size),
            text: metadata.text.clone(),
            has_logo: metadata.has_logo,
            size: i64::from(metadata.size),
            logo_size: metadata.logo_size,
            tags,
            created_at: metadata
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        if let Err(e) = self.db.insert_qr_record(&record) {
            let _ = std::fs::remove_file(&file_path);
            return Err(e.into());
        }
        tracing::info!(id = %id, format = %format, bytes = record.byte_size, "QR artifact stored");
        Ok(record.into())
    }

    async fn history(
        &self,
        owner: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<StoredArtifact>, i64), ExportError> {
        let records = self.db.list_qr_records(owner, limit, offset)?;
        let total = self.db.count_qr_records(owner)?;
        Ok((records.into_iter().map(Into::into).collect(), total))
    }

    async fn stats(&self, owner: &str) -> Result<StoreStats, ExportError> {
        let since = (Utc::now() - chrono::Duration::days(RECENT_DAYS))
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        Ok(self.db.get_qr_stats(owner, &since)?)
    }

    async fn delete(&self, id: &str) -> Result<bool, ExportError> {
        let Some(record) = self.db.get_qr_record(id)? else {
            return Ok(false);
        };
        match std::fs::remove_file(&record.file_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let deleted = self.db.delete_qr_record(id)?;
        tracing::info!(id = id, "QR artifact deleted");
        Ok(deleted)
    }

    async fn fetch(&self, id: &str) -> Result<Option<(StoredArtifact, Vec<u8>)>, ExportError> {
        let Some(record) = self.db.get_qr_record(id)? else {
            return Ok(None);
        };
        match std::fs::read(&record.file_path) {
            Ok(bytes) => Ok(Some((record.into(), bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(id = id, path = %record.file_path, "Stored QR file is missing");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
