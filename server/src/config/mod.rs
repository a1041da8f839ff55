//! Configuration: DB-backed settings with environment overrides.

pub mod app_config;
pub mod defaults;
pub mod manager;

pub use app_config::AppConfig;
pub use manager::SettingsManager;
