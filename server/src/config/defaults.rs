//! Default values for server settings keys.

/// (key, default value). Seeded into the settings table on first run;
/// existing values are never overwritten.
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("PREFERRED_PORT", "39283"),
    ("PORT_RANGE_START", "39283"),
    ("PORT_RANGE_END", "39383"),
    ("EVENT_LOG_RETENTION_DAYS", "7"),
];
