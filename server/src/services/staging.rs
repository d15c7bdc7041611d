//! Per-request temporary files: uploaded logos and rendered artifacts.
//!
//! Every staged file is owned by a [`StagedFile`] guard that removes it when
//! dropped. [`Staging::sweep`] removes anything a crashed request left behind.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};

const UPLOADS_DIR: &str = "uploads";
const GENERATED_DIR: &str = "generated";
const SUFFIX_LEN: usize = 8;
const SUFFIX_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h',
    'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct Staging {
    data_dir: PathBuf,
}

impl Staging {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join(UPLOADS_DIR)
    }

    fn generated_dir(&self) -> PathBuf {
        self.data_dir.join(GENERATED_DIR)
    }

    /// Write an uploaded logo to `uploads/logo_<millis>_<random>.<ext>`.
    pub fn stage_logo(&self, bytes: &[u8], ext: &str) -> Result<StagedFile, StagingError> {
        let dir = self.uploads_dir();
        std::fs::create_dir_all(&dir)?;
        let name = format!(
            "logo_{}_{}.{ext}",
            Utc::now().timestamp_millis(),
            random_suffix()
        );
        StagedFile::write(dir.join(name), bytes)
    }

    /// Write a rendered artifact to
    /// `generated/<YYYY-MM-DD>/qr_<YYYYMMDD>_<HHMMSS>_<random>.<ext>`.
    pub fn stage_render(
        &self,
        bytes: &[u8],
        ext: &str,
        at: DateTime<Utc>,
    ) -> Result<StagedFile, StagingError> {
        let dir = self.generated_dir().join(at.format("%Y-%m-%d").to_string());
        std::fs::create_dir_all(&dir)?;
        let name = format!(
            "qr_{}_{}.{ext}",
            at.format("%Y%m%d_%H%M%S"),
            random_suffix()
        );
        StagedFile::write(dir.join(name), bytes)
    }

    /// Remove staged files last modified more than `max_age` ago, then any
    /// date directory left empty.
    pub fn sweep(&self, max_age: Duration) -> Result<SweepReport, StagingError> {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut report = SweepReport::default();

        sweep_dir(&self.uploads_dir(), cutoff, &mut report)?;

        let generated = self.generated_dir();
        if generated.is_dir() {
            for entry in std::fs::read_dir(&generated)? {
                let path = entry?.path();
                if !path.is_dir() {
                    continue;
                }
                sweep_dir(&path, cutoff, &mut report)?;
                if is_empty_dir(&path) {
                    let _ = std::fs::remove_dir(&path);
                }
            }
        }

        if report.removed > 0 || report.failed > 0 {
            tracing::info!(
                removed = report.removed,
                failed = report.failed,
                "Swept orphaned staged files"
            );
        }
        Ok(report)
    }
}

fn sweep_dir(dir: &Path, cutoff: SystemTime, report: &mut SweepReport) -> Result<(), StagingError> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if modified > cutoff {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => report.removed += 1,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), "Failed to sweep staged file: {e}");
                report.failed += 1;
            }
        }
    }
    Ok(())
}

fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

fn random_suffix() -> String {
    nanoid::nanoid!(SUFFIX_LEN, &SUFFIX_ALPHABET)
}

/// A file on disk that is deleted when the guard goes out of scope.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    fn write(path: PathBuf, bytes: &[u8]) -> Result<Self, StagingError> {
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Staged file");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed staged file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to remove staged file: {e}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_logo_name_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let staging = Staging::new(dir.path());

        let staged = staging.stage_logo(b"logo", "png").unwrap();
        let path = staged.path().to_path_buf();
        let name = staged.file_name();
        assert!(name.starts_with("logo_"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.split('_').count(), 3);
        assert!(path.starts_with(dir.path().join("uploads")));
        assert_eq!(std::fs::read(&path).unwrap(), b"logo");

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_render_name_uses_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let staging = Staging::new(dir.path());
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();

        let staged = staging.stage_render(b"qr", "svg", at).unwrap();
        assert!(staged.path().starts_with(dir.path().join("generated").join("2026-03-04")));
        let name = staged.file_name();
        assert!(name.starts_with("qr_20260304_050607_"), "{name}");
        assert!(name.ends_with(".svg"));
    }

    #[test]
    fn test_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let staging = Staging::new(dir.path());
        let at = Utc::now();
        let a = staging.stage_render(b"a", "png", at).unwrap();
        let b = staging.stage_render(b"b", "png", at).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_guard_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let staging = Staging::new(dir.path());
        let staged = staging.stage_logo(b"x", "svg").unwrap();
        std::fs::remove_file(staged.path()).unwrap();
        drop(staged);
    }

    #[test]
    fn test_sweep_removes_only_old_files() {
        let dir = tempfile::tempdir().unwrap();
        let staging = Staging::new(dir.path());

        // Orphans: files written outside any guard.
        let uploads = dir.path().join("uploads");
        let day = dir.path().join("generated").join("2026-01-01");
        std::fs::create_dir_all(&uploads).unwrap();
        std::fs::create_dir_all(&day).unwrap();
        std::fs::write(uploads.join("logo_1_abc.png"), b"x").unwrap();
        std::fs::write(day.join("qr_20260101_000000_abc.png"), b"x").unwrap();

        let untouched = staging.sweep(Duration::from_secs(3600)).unwrap();
        assert_eq!(untouched, SweepReport::default());

        let report = staging.sweep(Duration::ZERO).unwrap();
        assert_eq!(report.removed, 2);
        assert_eq!(report.failed, 0);
        assert!(!day.exists());
        assert!(uploads.exists());
    }

    #[test]
    fn test_sweep_on_empty_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let report = Staging::new(dir.path().join("missing")).sweep(Duration::ZERO).unwrap();
        assert_eq!(report, SweepReport::default());
    }
}
