use crate::Database;

fn test_db() -> Database {
    Database::open_in_memory().expect("Failed to create test DB")
}

/// Pin a row's created_at so ordering tests do not depend on clock
/// resolution.
fn set_created_at(db: &Database, table: &str, id: &str, created_at: &str) {
    db.with_conn(|conn| {
        conn.execute(
            &format!("UPDATE {table} SET created_at = ?1 WHERE id = ?2"),
            rusqlite::params![created_at, id],
        )?;
        Ok(())
    })
    .unwrap();
}

mod alerts;
mod core;
