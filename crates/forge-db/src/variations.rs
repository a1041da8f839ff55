//! Variation CRUD. Variations are conditional overrides owned by a
//! parent alert and die with it.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::alerts::serde_double_option;
use crate::{new_id, now_iso, Database, DbError, OptionalExt};

pub const CONDITION_TIER: &str = "tier";
pub const CONDITION_AMOUNT: &str = "amount";
pub const CONDITION_CUSTOM: &str = "custom";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variation {
    pub id: String,
    pub alert_id: String,
    pub name: String,
    pub condition_type: String,
    pub condition_value: String,
    pub priority: i64,
    pub enabled: bool,
    pub message_template: Option<String>,
    pub sound_path: Option<String>,
    pub sound_volume: Option<f64>,
    pub image_path: Option<String>,
    pub animation_in: Option<String>,
    pub animation_out: Option<String>,
    pub custom_css: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewVariation {
    pub name: Option<String>,
    pub condition_type: Option<String>,
    pub condition_value: Option<String>,
    pub priority: Option<i64>,
    pub enabled: Option<bool>,
    pub message_template: Option<String>,
    pub sound_path: Option<String>,
    pub sound_volume: Option<f64>,
    pub image_path: Option<String>,
    pub animation_in: Option<String>,
    pub animation_out: Option<String>,
    pub custom_css: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariationPatch {
    pub name: Option<String>,
    pub condition_type: Option<String>,
    pub condition_value: Option<String>,
    pub priority: Option<i64>,
    pub enabled: Option<bool>,
    #[serde(default, with = "serde_double_option")]
    pub message_template: Option<Option<String>>,
    #[serde(default, with = "serde_double_option")]
    pub sound_path: Option<Option<String>>,
    #[serde(default, with = "serde_double_option")]
    pub sound_volume: Option<Option<f64>>,
    #[serde(default, with = "serde_double_option")]
    pub image_path: Option<Option<String>>,
    #[serde(default, with = "serde_double_option")]
    pub animation_in: Option<Option<String>>,
    #[serde(default, with = "serde_double_option")]
    pub animation_out: Option<Option<String>>,
    #[serde(default, with = "serde_double_option")]
    pub custom_css: Option<Option<String>>,
}

impl Database {
    /// Create a variation under an existing alert.
    pub fn create_variation(&self, alert_id: &str, new: NewVariation) -> Result<Variation, DbError> {
        let name = new
            .name
            .ok_or_else(|| DbError::InvalidData("name is required".into()))?;
        let condition_type = new
            .condition_type
            .ok_or_else(|| DbError::InvalidData("condition_type is required".into()))?;
        let condition_value = new
            .condition_value
            .ok_or_else(|| DbError::InvalidData("condition_value is required".into()))?;
        validate_condition_type(&condition_type)?;

        // Parent existence is checked explicitly so the caller sees
        // NotFound rather than a foreign-key failure.
        let parent_exists = self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT 1 FROM alerts WHERE id = ?1")?;
            Ok(stmt
                .query_row([alert_id], |_| Ok(()))
                .optional()?
                .is_some())
        })?;
        if !parent_exists {
            return Err(DbError::NotFound(format!("alert {alert_id}")));
        }

        let now = now_iso();
        let variation = Variation {
            id: new_id(),
            alert_id: alert_id.to_string(),
            name,
            condition_type,
            condition_value,
            priority: new.priority.unwrap_or(0),
            enabled: new.enabled.unwrap_or(true),
            message_template: new.message_template,
            sound_path: new.sound_path,
            sound_volume: new.sound_volume,
            image_path: new.image_path,
            animation_in: new.animation_in,
            animation_out: new.animation_out,
            custom_css: new.custom_css,
            created_at: now.clone(),
            updated_at: now,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO variations (
                    id, alert_id, name, condition_type, condition_value, priority,
                    enabled, message_template, sound_path, sound_volume, image_path,
                    animation_in, animation_out, custom_css, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                rusqlite::params![
                    variation.id,
                    variation.alert_id,
                    variation.name,
                    variation.condition_type,
                    variation.condition_value,
                    variation.priority,
                    variation.enabled,
                    variation.message_template,
                    variation.sound_path,
                    variation.sound_volume,
                    variation.image_path,
                    variation.animation_in,
                    variation.animation_out,
                    variation.custom_css,
                    variation.created_at,
                    variation.updated_at,
                ],
            )?;
            Ok(())
        })?;

        Ok(variation)
    }

    pub fn get_variation(&self, id: &str) -> Result<Variation, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{VARIATION_SELECT} WHERE id = ?1"))?;
            stmt.query_row([id], variation_from_row)
                .optional()?
                .ok_or_else(|| DbError::NotFound(format!("variation {id}")))
        })
    }

    /// Variations of one alert, highest priority first, older rows
    /// breaking ties.
    pub fn list_variations(&self, alert_id: &str) -> Result<Vec<Variation>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{VARIATION_SELECT} WHERE alert_id = ?1
                 ORDER BY priority DESC, created_at ASC"
            ))?;
            let rows = stmt.query_map([alert_id], variation_from_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    /// Enabled variations of one alert in matching order.
    pub fn list_enabled_variations(&self, alert_id: &str) -> Result<Vec<Variation>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{VARIATION_SELECT} WHERE alert_id = ?1 AND enabled = 1
                 ORDER BY priority DESC, created_at ASC"
            ))?;
            let rows = stmt.query_map([alert_id], variation_from_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    pub fn update_variation(&self, id: &str, patch: VariationPatch) -> Result<Variation, DbError> {
        let mut variation = self.get_variation(id)?;

        if let Some(v) = patch.name {
            variation.name = v;
        }
        if let Some(v) = patch.condition_type {
            validate_condition_type(&v)?;
            variation.condition_type = v;
        }
        if let Some(v) = patch.condition_value {
            variation.condition_value = v;
        }
        if let Some(v) = patch.priority {
            variation.priority = v;
        }
        if let Some(v) = patch.enabled {
            variation.enabled = v;
        }
        if let Some(v) = patch.message_template {
            variation.message_template = v;
        }
        if let Some(v) = patch.sound_path {
            variation.sound_path = v;
        }
        if let Some(v) = patch.sound_volume {
            variation.sound_volume = v;
        }
        if let Some(v) = patch.image_path {
            variation.image_path = v;
        }
        if let Some(v) = patch.animation_in {
            variation.animation_in = v;
        }
        if let Some(v) = patch.animation_out {
            variation.animation_out = v;
        }
        if let Some(v) = patch.custom_css {
            variation.custom_css = v;
        }
        variation.updated_at = now_iso();

        self.with_conn(|conn| {
            conn.execute(
                "UPDATE variations SET
                    name = ?2, condition_type = ?3, condition_value = ?4,
                    priority = ?5, enabled = ?6, message_template = ?7,
                    sound_path = ?8, sound_volume = ?9, image_path = ?10,
                    animation_in = ?11, animation_out = ?12, custom_css = ?13,
                    updated_at = ?14
                 WHERE id = ?1",
                rusqlite::params![
                    variation.id,
                    variation.name,
                    variation.condition_type,
                    variation.condition_value,
                    variation.priority,
                    variation.enabled,
                    variation.message_template,
                    variation.sound_path,
                    variation.sound_volume,
                    variation.image_path,
                    variation.animation_in,
                    variation.animation_out,
                    variation.custom_css,
                    variation.updated_at,
                ],
            )?;
            Ok(())
        })?;

        Ok(variation)
    }

    pub fn delete_variation(&self, id: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM variations WHERE id = ?1", [id])?;
            if affected == 0 {
                return Err(DbError::NotFound(format!("variation {id}")));
            }
            Ok(())
        })
    }
}

fn validate_condition_type(condition_type: &str) -> Result<(), DbError> {
    match condition_type {
        CONDITION_TIER | CONDITION_AMOUNT | CONDITION_CUSTOM => Ok(()),
        other => Err(DbError::InvalidData(format!(
            "unknown condition_type {other:?}"
        ))),
    }
}

const VARIATION_SELECT: &str = "SELECT
    id, alert_id, name, condition_type, condition_value, priority, enabled,
    message_template, sound_path, sound_volume, image_path, animation_in,
    animation_out, custom_css, created_at, updated_at
 FROM variations";

fn variation_from_row(row: &Row<'_>) -> Result<Variation, rusqlite::Error> {
    Ok(Variation {
        id: row.get(0)?,
        alert_id: row.get(1)?,
        name: row.get(2)?,
        condition_type: row.get(3)?,
        condition_value: row.get(4)?,
        priority: row.get(5)?,
        enabled: row.get(6)?,
        message_template: row.get(7)?,
        sound_path: row.get(8)?,
        sound_volume: row.get(9)?,
        image_path: row.get(10)?,
        animation_in: row.get(11)?,
        animation_out: row.get(12)?,
        custom_css: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}
