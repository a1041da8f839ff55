//! Append-only audit log of every event that reached the server.

use rusqlite::types::Value as SqlValue;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::{new_id, now_iso, Database, DbError};

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: String,
    pub platform: String,
    pub event_type: String,
    pub username: String,
    pub display_name: String,
    pub amount: Option<f64>,
    pub message: Option<String>,
    /// Serialized JSON map of arbitrary extra facts.
    pub metadata: String,
    pub alert_fired: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEventLogEntry {
    pub platform: String,
    pub event_type: String,
    pub username: String,
    pub display_name: String,
    pub amount: Option<f64>,
    pub message: Option<String>,
    pub metadata: Option<String>,
    pub alert_fired: bool,
}

/// Query filters; all provided filters compose with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventLogFilter {
    pub event_type: Option<String>,
    pub platform: Option<String>,
    #[serde(default)]
    pub alert_fired_only: bool,
    /// Case-sensitive substring over username, display_name and message.
    pub search: Option<String>,
    pub limit: Option<i64>,
}

impl Database {
    pub fn create_event_log(&self, new: NewEventLogEntry) -> Result<EventLogEntry, DbError> {
        let entry = EventLogEntry {
            id: new_id(),
            platform: new.platform,
            event_type: new.event_type,
            username: new.username,
            display_name: new.display_name,
            amount: new.amount,
            message: new.message,
            metadata: new.metadata.unwrap_or_else(|| "{}".into()),
            alert_fired: new.alert_fired,
            timestamp: now_iso(),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO event_log (
                    id, platform, event_type, username, display_name, amount,
                    message, metadata, alert_fired, timestamp
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    entry.id,
                    entry.platform,
                    entry.event_type,
                    entry.username,
                    entry.display_name,
                    entry.amount,
                    entry.message,
                    entry.metadata,
                    entry.alert_fired,
                    entry.timestamp,
                ],
            )?;
            Ok(())
        })?;

        Ok(entry)
    }

    /// Newest first. `instr` keeps the substring search case-sensitive
    /// (SQLite LIKE folds ASCII case).
    pub fn list_event_log(&self, filter: &EventLogFilter) -> Result<Vec<EventLogEntry>, DbError> {
        let mut sql = format!("{EVENT_LOG_SELECT} WHERE 1=1");
        let mut params: Vec<SqlValue> = Vec::new();

        if let Some(event_type) = &filter.event_type {
            sql.push_str(&format!(" AND event_type = ?{}", params.len() + 1));
            params.push(SqlValue::from(event_type.clone()));
        }
        if let Some(platform) = &filter.platform {
            sql.push_str(&format!(" AND platform = ?{}", params.len() + 1));
            params.push(SqlValue::from(platform.clone()));
        }
        if filter.alert_fired_only {
            sql.push_str(" AND alert_fired = 1");
        }
        if let Some(search) = &filter.search {
            let n = params.len() + 1;
            sql.push_str(&format!(
                " AND (instr(username, ?{n}) > 0
                   OR instr(display_name, ?{n}) > 0
                   OR instr(COALESCE(message, ''), ?{n}) > 0)"
            ));
            params.push(SqlValue::from(search.clone()));
        }

        let limit = filter
            .limit
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);
        sql.push_str(&format!(
            " ORDER BY timestamp DESC LIMIT ?{}",
            params.len() + 1
        ));
        params.push(SqlValue::from(limit));

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(params), event_log_from_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    /// Entries with `from <= timestamp <= to`, newest first.
    pub fn list_event_log_range(
        &self,
        from: &str,
        to: &str,
        limit: Option<i64>,
    ) -> Result<Vec<EventLogEntry>, DbError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{EVENT_LOG_SELECT}
                 WHERE timestamp >= ?1 AND timestamp <= ?2
                 ORDER BY timestamp DESC LIMIT ?3"
            ))?;
            let rows = stmt.query_map(
                rusqlite::params![from, to, limit],
                event_log_from_row,
            )?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    /// Delete rows strictly older than the cutoff. Returns the count.
    pub fn delete_event_log_before(&self, cutoff: &str) -> Result<usize, DbError> {
        self.with_conn(|conn| {
            let affected =
                conn.execute("DELETE FROM event_log WHERE timestamp < ?1", [cutoff])?;
            Ok(affected)
        })
    }
}

const EVENT_LOG_SELECT: &str = "SELECT
    id, platform, event_type, username, display_name, amount, message,
    metadata, alert_fired, timestamp
 FROM event_log";

fn event_log_from_row(row: &Row<'_>) -> Result<EventLogEntry, rusqlite::Error> {
    Ok(EventLogEntry {
        id: row.get(0)?,
        platform: row.get(1)?,
        event_type: row.get(2)?,
        username: row.get(3)?,
        display_name: row.get(4)?,
        amount: row.get(5)?,
        message: row.get(6)?,
        metadata: row.get(7)?,
        alert_fired: row.get(8)?,
        timestamp: row.get(9)?,
    })
}
