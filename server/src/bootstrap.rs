//! Foundation init: data directory, store, settings. Fatal on error.

use std::path::PathBuf;

use forge_db::Database;

use crate::config::{AppConfig, SettingsManager};

pub fn init_foundation() -> Result<(Database, AppConfig, PathBuf), anyhow::Error> {
    load_dotenv();
    let dir = data_dir();
    std::fs::create_dir_all(&dir)?;
    // Sibling media directories consumed by the upload collaborators.
    std::fs::create_dir_all(dir.join("sounds"))?;
    std::fs::create_dir_all(dir.join("images"))?;

    let db_path = dir.join("streamforge.db");
    tracing::info!("Opening database at {}", db_path.display());
    let db = Database::open(&db_path)?;

    let sm = SettingsManager::new(db.clone());
    sm.initialize_defaults()?;
    let config = AppConfig::load(&sm)?;

    tracing::info!(
        preferred_port = config.preferred_port,
        retention_days = config.event_log_retention_days,
        "Settings loaded"
    );
    Ok((db, config, dir))
}

/// Per-user application data directory: XDG config on Linux, Roaming
/// AppData on Windows, Application Support on macOS.
fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("STREAMFORGE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("StreamForge")
}

/// Load .env from multiple candidate paths.
fn load_dotenv() {
    let candidates = [".env", "../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
}
