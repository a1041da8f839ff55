//! Schema migrations.
//!
//! Scripts are embedded and keyed by filename. On open we create the
//! `_migrations` bookkeeping table, then apply every script that has not
//! been recorded yet, in lexicographic filename order. Each script runs in
//! its own transaction with foreign-key enforcement switched off so that
//! table rebuilds are possible; enforcement is restored afterwards either
//! way. The first failing script aborts startup.

use std::collections::HashSet;

use rusqlite::Connection;

use crate::{now_iso, DbError};

pub(crate) struct Migration {
    pub filename: &'static str,
    pub sql: &'static str,
}

pub(crate) const MIGRATIONS: &[Migration] = &[
    Migration {
        filename: "0001_initial.sql",
        sql: SQL_0001_INITIAL,
    },
    Migration {
        filename: "0002_builtin_templates.sql",
        sql: SQL_0002_BUILTIN_TEMPLATES,
    },
];

pub fn run_migrations(conn: &mut Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            filename TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL
        );",
    )?;

    let applied = applied_filenames(conn)?;
    debug_assert!(
        MIGRATIONS.windows(2).all(|w| w[0].filename < w[1].filename),
        "migration scripts must be listed in lexicographic order"
    );

    for migration in MIGRATIONS {
        if applied.contains(migration.filename) {
            continue;
        }
        tracing::info!(filename = migration.filename, "Applying migration");
        apply_one(conn, migration)?;
    }

    Ok(())
}

fn applied_filenames(conn: &Connection) -> Result<HashSet<String>, DbError> {
    let mut stmt = conn.prepare("SELECT filename FROM _migrations")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut set = HashSet::new();
    for row in rows {
        set.insert(row?);
    }
    Ok(set)
}

fn apply_one(conn: &mut Connection, migration: &Migration) -> Result<(), DbError> {
    // PRAGMA foreign_keys is a no-op inside a transaction, so toggle
    // around it and restore enforcement on both paths.
    conn.execute_batch("PRAGMA foreign_keys=OFF;")?;

    let result = (|| -> Result<(), DbError> {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO _migrations (filename, applied_at) VALUES (?1, ?2)",
            rusqlite::params![migration.filename, now_iso()],
        )?;
        tx.commit()?;
        Ok(())
    })();

    let restore = conn.execute_batch("PRAGMA foreign_keys=ON;");

    if let Err(e) = &result {
        tracing::error!(filename = migration.filename, error = %e, "Migration failed");
    }
    result?;
    restore?;
    Ok(())
}

const SQL_0001_INITIAL: &str = r#"
CREATE TABLE IF NOT EXISTS alerts (
    id TEXT PRIMARY KEY,
    event_type TEXT NOT NULL CHECK(event_type IN
        ('follow', 'subscribe', 'cheer', 'raid', 'donation', 'custom')),
    name TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    message_template TEXT NOT NULL,
    duration_ms INTEGER NOT NULL DEFAULT 5000,
    animation_in TEXT NOT NULL DEFAULT 'fade-in',
    animation_out TEXT NOT NULL DEFAULT 'fade-out',
    sound_path TEXT,
    sound_volume REAL NOT NULL DEFAULT 0.8,
    image_path TEXT,
    font_family TEXT NOT NULL DEFAULT 'Inter',
    font_size INTEGER NOT NULL DEFAULT 32,
    text_color TEXT NOT NULL DEFAULT '#ffffff',
    background_color TEXT,
    custom_css TEXT,
    min_amount REAL,
    tts_enabled INTEGER NOT NULL DEFAULT 0,
    tts_voice TEXT,
    tts_rate REAL NOT NULL DEFAULT 1.0,
    tts_pitch REAL NOT NULL DEFAULT 1.0,
    tts_volume REAL NOT NULL DEFAULT 1.0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_alerts_event_type ON alerts(event_type);

CREATE TABLE IF NOT EXISTS variations (
    id TEXT PRIMARY KEY,
    alert_id TEXT NOT NULL,
    name TEXT NOT NULL,
    condition_type TEXT NOT NULL,
    condition_value TEXT NOT NULL,
    priority INTEGER NOT NULL DEFAULT 0,
    enabled INTEGER NOT NULL DEFAULT 1,
    message_template TEXT,
    sound_path TEXT,
    sound_volume REAL,
    image_path TEXT,
    animation_in TEXT,
    animation_out TEXT,
    custom_css TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (alert_id) REFERENCES alerts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_variations_alert_id ON variations(alert_id);

CREATE TABLE IF NOT EXISTS templates (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    author TEXT NOT NULL DEFAULT '',
    spec_json TEXT NOT NULL,
    is_builtin INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS event_log (
    id TEXT PRIMARY KEY,
    platform TEXT NOT NULL,
    event_type TEXT NOT NULL,
    username TEXT NOT NULL,
    display_name TEXT NOT NULL,
    amount REAL,
    message TEXT,
    metadata TEXT NOT NULL DEFAULT '{}',
    alert_fired INTEGER NOT NULL DEFAULT 0,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_event_log_timestamp ON event_log(timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_event_log_event_type ON event_log(event_type);
CREATE INDEX IF NOT EXISTS idx_event_log_platform ON event_log(platform);
"#;

const SQL_0002_BUILTIN_TEMPLATES: &str = r##"
INSERT OR IGNORE INTO templates (id, name, description, author, spec_json, is_builtin, created_at, updated_at)
VALUES
(
    'b2f1c9d4-0000-4000-8000-000000000001',
    'Classic Follow',
    'Centered text with a gentle fade, suited to follow alerts.',
    'StreamForge',
    '{"message_template":"{username} just followed!","duration_ms":5000,"animation_in":"fade-in","animation_out":"fade-out","sound_volume":0.8,"font_family":"Inter","font_size":32,"text_color":"#ffffff","background_color":null}',
    1,
    strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
    strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
),
(
    'b2f1c9d4-0000-4000-8000-000000000002',
    'Hype Raid',
    'Large bouncing banner for raids and big cheers.',
    'StreamForge',
    '{"message_template":"{username} is raiding with {amount} viewers!","duration_ms":8000,"animation_in":"bounce-in","animation_out":"slide-out","sound_volume":1.0,"font_family":"Inter","font_size":48,"text_color":"#ffdd00","background_color":"#1a1a2e"}',
    1,
    strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
    strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
),
(
    'b2f1c9d4-0000-4000-8000-000000000003',
    'Minimal Ticker',
    'Small lower-third ticker for quiet streams.',
    'StreamForge',
    '{"message_template":"{username}: {message}","duration_ms":4000,"animation_in":"slide-in","animation_out":"slide-out","sound_volume":0.5,"font_family":"Inter","font_size":18,"text_color":"#e0e0e0","background_color":"#00000080"}',
    1,
    strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
    strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
);
"##;
