//! Typed access to the settings key/value store.

use forge_db::{Database, DbError};

use super::defaults::DEFAULT_SETTINGS;

#[derive(Clone)]
pub struct SettingsManager {
    db: Database,
}

impl SettingsManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>, DbError> {
        self.db.get_setting(key)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), DbError> {
        self.db.set_setting(key, value)
    }

    /// Seed defaults for keys that have no stored value yet.
    pub fn initialize_defaults(&self) -> Result<(), DbError> {
        for (key, default) in DEFAULT_SETTINGS {
            if self.db.get_setting(key)?.is_none() {
                self.db.set_setting(key, default)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_do_not_overwrite_user_values() {
        let sm = SettingsManager::new(Database::open_in_memory().unwrap());
        sm.set_setting("PREFERRED_PORT", "40000").unwrap();

        sm.initialize_defaults().unwrap();
        assert_eq!(
            sm.get_setting("PREFERRED_PORT").unwrap().as_deref(),
            Some("40000")
        );
        // Untouched keys get their defaults.
        assert_eq!(
            sm.get_setting("EVENT_LOG_RETENTION_DAYS").unwrap().as_deref(),
            Some("7")
        );
    }
}
