//! Application shared state passed to every axum handler.
//!
//! The three long-lived component instances (store, hub, queue) plus
//! the bound port and the termination token live here; nothing else is
//! global.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use forge_db::Database;

use crate::config::{AppConfig, SettingsManager};
use crate::hub::Hub;
use crate::logger::EventLogger;
use crate::queue::AlertQueue;

#[derive(Clone)]
pub struct SharedState {
    inner: Arc<SharedStateInner>,
}

struct SharedStateInner {
    db: Database,
    config: RwLock<AppConfig>,
    data_dir: PathBuf,
    hub: Arc<Hub>,
    queue: AlertQueue,
    logger: EventLogger,
    started_at: Instant,
    bound_port: AtomicU16,
    shutdown: CancellationToken,
}

impl SharedState {
    pub fn new(db: Database, config: AppConfig, data_dir: PathBuf) -> Self {
        let hub = Arc::new(Hub::new());
        let queue = AlertQueue::new(hub.clone());
        let logger = EventLogger::new(db.clone());

        Self {
            inner: Arc::new(SharedStateInner {
                db,
                config: RwLock::new(config),
                data_dir,
                hub,
                queue,
                logger,
                started_at: Instant::now(),
                bound_port: AtomicU16::new(0),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.inner.hub
    }

    pub fn queue(&self) -> &AlertQueue {
        &self.inner.queue
    }

    pub fn logger(&self) -> &EventLogger {
        &self.inner.logger
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.inner.data_dir
    }

    pub async fn config(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.config.read().await
    }

    /// Reload config from the settings store.
    pub async fn reload_config(&self) -> Result<(), anyhow::Error> {
        let sm = SettingsManager::new(self.inner.db.clone());
        let mut config = self.inner.config.write().await;
        config.reload(&sm)?;
        Ok(())
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }

    pub fn bound_port(&self) -> u16 {
        self.inner.bound_port.load(Ordering::Relaxed)
    }

    pub fn set_bound_port(&self, port: u16) {
        self.inner.bound_port.store(port, Ordering::Relaxed);
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown
    }
}
