//! Event audit logging.
//!
//! A thin wrapper over the store that never lets an audit failure
//! block event ingestion: errors are logged and swallowed, with
//! empty results returned in their place.

use chrono::{Duration, SecondsFormat, Utc};

use forge_db::event_log::{EventLogEntry, EventLogFilter, NewEventLogEntry};
use forge_db::Database;

pub const DEFAULT_RETENTION_DAYS: i64 = 7;

#[derive(Clone)]
pub struct EventLogger {
    db: Database,
}

impl EventLogger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn record(&self, entry: NewEventLogEntry) -> Option<EventLogEntry> {
        match self.db.create_event_log(entry) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::error!(error = %e, "Failed to write event log entry");
                None
            }
        }
    }

    pub fn list(&self, filter: &EventLogFilter) -> Vec<EventLogEntry> {
        self.db.list_event_log(filter).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to query event log");
            Vec::new()
        })
    }

    pub fn list_range(&self, from: &str, to: &str, limit: Option<i64>) -> Vec<EventLogEntry> {
        self.db
            .list_event_log_range(from, to, limit)
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to query event log range");
                Vec::new()
            })
    }

    /// Delete entries strictly older than the cutoff timestamp.
    pub fn prune_before(&self, cutoff: &str) -> usize {
        match self.db.delete_event_log_before(cutoff) {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::error!(error = %e, "Failed to prune event log");
                0
            }
        }
    }

    /// Delete entries older than the retention window.
    pub fn prune_older_than_days(&self, days: i64) -> usize {
        let cutoff = (Utc::now() - Duration::days(days))
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        self.prune_before(&cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger() -> EventLogger {
        EventLogger::new(Database::open_in_memory().unwrap())
    }

    fn entry(username: &str) -> NewEventLogEntry {
        NewEventLogEntry {
            platform: "twitch".into(),
            event_type: "follow".into(),
            username: username.into(),
            display_name: username.into(),
            alert_fired: true,
            ..Default::default()
        }
    }

    #[test]
    fn record_and_list() {
        let logger = logger();
        let recorded = logger.record(entry("alice")).unwrap();
        let rows = logger.list(&EventLogFilter::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, recorded.id);
    }

    #[test]
    fn retention_prune_keeps_recent_rows() {
        let logger = logger();
        logger.record(entry("recent")).unwrap();
        // Everything just written is inside any positive window.
        assert_eq!(logger.prune_older_than_days(DEFAULT_RETENTION_DAYS), 0);
        assert_eq!(logger.list(&EventLogFilter::default()).len(), 1);
    }
}
