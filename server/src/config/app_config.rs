//! Runtime configuration loaded from the settings DB with environment
//! overrides.

use crate::lifecycle::{PortConfig, DEFAULT_PORT_RANGE_END, DEFAULT_PREFERRED_PORT};
use crate::logger::DEFAULT_RETENTION_DAYS;

use super::manager::SettingsManager;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub preferred_port: u16,
    pub port_range_start: u16,
    pub port_range_end: u16,
    pub event_log_retention_days: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preferred_port: DEFAULT_PREFERRED_PORT,
            port_range_start: DEFAULT_PREFERRED_PORT,
            port_range_end: DEFAULT_PORT_RANGE_END,
            event_log_retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl AppConfig {
    /// Load configuration (DB-first, env overrides).
    pub fn load(sm: &SettingsManager) -> Result<Self, anyhow::Error> {
        let g = |key: &str| -> String { sm.get_setting(key).unwrap_or_default().unwrap_or_default() };

        let mut preferred_port = parse_u16(&g("PREFERRED_PORT"), DEFAULT_PREFERRED_PORT);
        let port_range_start = parse_u16(&g("PORT_RANGE_START"), DEFAULT_PREFERRED_PORT);
        let port_range_end = parse_u16(&g("PORT_RANGE_END"), DEFAULT_PORT_RANGE_END);
        let mut event_log_retention_days =
            parse_i64(&g("EVENT_LOG_RETENTION_DAYS"), DEFAULT_RETENTION_DAYS);

        if let Ok(v) = std::env::var("STREAMFORGE_PORT") {
            if let Ok(p) = v.parse::<u16>() {
                preferred_port = p;
            }
        }
        if let Ok(v) = std::env::var("STREAMFORGE_EVENT_RETENTION_DAYS") {
            if let Ok(d) = v.parse::<i64>() {
                event_log_retention_days = d;
            }
        }

        Ok(Self {
            preferred_port,
            port_range_start,
            port_range_end,
            event_log_retention_days: event_log_retention_days.max(1),
        })
    }

    pub fn reload(&mut self, sm: &SettingsManager) -> Result<(), anyhow::Error> {
        *self = Self::load(sm)?;
        Ok(())
    }

    pub fn ports(&self) -> PortConfig {
        PortConfig {
            preferred: self.preferred_port,
            range_start: self.port_range_start,
            range_end: self.port_range_end,
        }
    }
}

fn parse_u16(s: &str, default: u16) -> u16 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

fn parse_i64(s: &str, default: i64) -> i64 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}
