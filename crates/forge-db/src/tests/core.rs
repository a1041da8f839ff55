use super::test_db;
use crate::schema;

#[test]
fn test_open_and_migrate() {
    let db = test_db();
    let settings = db.get_all_settings().unwrap();
    assert!(settings.is_empty());
}

#[test]
fn test_migrations_apply_exactly_once() {
    let db = test_db();

    // Re-running the startup routine must not re-apply scripts.
    for _ in 0..3 {
        db.with_conn_mut(schema::run_migrations).unwrap();
    }

    let rows: Vec<String> = db
        .with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT filename FROM _migrations ORDER BY filename")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .unwrap();

    assert_eq!(rows, vec!["0001_initial.sql", "0002_builtin_templates.sql"]);
}

#[test]
fn test_migrations_restore_foreign_keys() {
    let db = test_db();
    let fk: i64 = db
        .with_conn(|conn| {
            Ok(conn
                .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
                .unwrap())
        })
        .unwrap();
    assert_eq!(fk, 1);
}

#[test]
fn test_settings_upsert() {
    let db = test_db();
    assert_eq!(db.get_setting("key1").unwrap(), None);

    db.set_setting("key1", "value1").unwrap();
    assert_eq!(db.get_setting("key1").unwrap(), Some("value1".into()));

    db.set_setting("key1", "value2").unwrap();
    assert_eq!(db.get_setting("key1").unwrap(), Some("value2".into()));

    let all = db.get_all_settings().unwrap();
    assert_eq!(all.get("key1"), Some(&"value2".to_string()));
}

#[test]
fn test_timestamps_are_canonical_iso() {
    let ts = crate::now_iso();
    // 2026-08-02T12:34:56.789Z
    assert_eq!(ts.len(), 24);
    assert!(ts.ends_with('Z'));
    assert_eq!(&ts[10..11], "T");
}
