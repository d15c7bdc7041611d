//! QR Studio: HTTP service that renders QR codes with optional logo overlays
//! and keeps a browsable history of what it generated.

pub mod app;
pub mod background;
pub mod config;
pub mod server;
pub mod services;

use std::path::PathBuf;

use qr_store::Database;

use config::AppConfig;

/// Determine the data directory for the application.
/// Priority: QR_DATA_DIR env var > ~/.qr-studio
pub fn data_dir() -> PathBuf {
    resolve_data_dir(std::env::var("QR_DATA_DIR").ok())
}

fn resolve_data_dir(configured: Option<String>) -> PathBuf {
    if let Some(dir) = configured {
        match config::validation::validate_setting("QR_DATA_DIR", &dir) {
            Ok(()) => return PathBuf::from(dir),
            Err(e) => tracing::warn!("Ignoring QR_DATA_DIR: {e}"),
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".qr-studio")
}

/// Load .env from multiple candidate paths.
pub fn load_dotenv() {
    let candidates = [".env", "../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}

/// Load config, create the data directory and open the database (fatal on error).
pub fn init_foundation() -> Result<(Database, AppConfig, PathBuf), anyhow::Error> {
    load_dotenv();
    let dir = data_dir();
    std::fs::create_dir_all(&dir)?;

    let db_path = dir.join("qr-studio.db");
    tracing::info!("Opening database at {}", db_path.display());
    let db = Database::open(&db_path)?;

    let config = AppConfig::load()?;
    tracing::info!(
        port = config.server_port,
        env = %config.environment,
        "Settings loaded"
    );
    Ok((db, config, dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_uses_configured_path() {
        assert_eq!(
            resolve_data_dir(Some("/srv/qr".into())),
            PathBuf::from("/srv/qr")
        );
    }

    #[test]
    fn test_blank_data_dir_falls_back_to_home() {
        let fallback = resolve_data_dir(None);
        assert!(fallback.ends_with(".qr-studio"));
        assert_eq!(resolve_data_dir(Some("   ".into())), fallback);
    }
}
