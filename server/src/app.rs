use std::path::PathBuf;
use std::sync::Arc;

use qr_store::Database;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::services::staging::Staging;
use crate::services::store::{ArtifactStore, LocalArtifactStore};

/// Application shared state accessible from axum handlers and background tasks.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<SharedStateInner>,
}

struct SharedStateInner {
    config: AppConfig,
    store: Arc<dyn ArtifactStore>,
    staging: Staging,
    data_dir: PathBuf,
    shutdown_token: CancellationToken,
}

impl SharedState {
    /// Create shared state backed by the local store in `data_dir`.
    pub fn new(db: Database, config: AppConfig, data_dir: PathBuf) -> Self {
        let store = Arc::new(LocalArtifactStore::new(db, data_dir.clone()));
        Self::with_store(config, data_dir, store)
    }

    /// Create shared state around any store implementation.
    pub fn with_store(config: AppConfig, data_dir: PathBuf, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            inner: Arc::new(SharedStateInner {
                config,
                store,
                staging: Staging::new(data_dir.clone()),
                data_dir,
                shutdown_token: CancellationToken::new(),
            }),
        }
    }

    pub fn server_port(&self) -> u16 {
        self.inner.config.server_port
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &dyn ArtifactStore {
        self.inner.store.as_ref()
    }

    pub fn staging(&self) -> &Staging {
        &self.inner.staging
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.inner.data_dir
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown_token
    }
}
