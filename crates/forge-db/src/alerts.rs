//! Alert configuration CRUD.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::variations::Variation;
use crate::{new_id, now_iso, Database, DbError, OptionalExt};

/// Viewer event kinds an alert can be configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Follow,
    Subscribe,
    Cheer,
    Raid,
    Donation,
    Custom,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Follow => "follow",
            EventType::Subscribe => "subscribe",
            EventType::Cheer => "cheer",
            EventType::Raid => "raid",
            EventType::Donation => "donation",
            EventType::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "follow" => Some(EventType::Follow),
            "subscribe" => Some(EventType::Subscribe),
            "cheer" => Some(EventType::Cheer),
            "raid" => Some(EventType::Raid),
            "donation" => Some(EventType::Donation),
            "custom" => Some(EventType::Custom),
            _ => None,
        }
    }

    /// Message template used when neither config nor caller provides one.
    pub fn default_template(&self) -> &'static str {
        match self {
            EventType::Follow => "{username} just followed!",
            EventType::Subscribe => "{username} just subscribed!",
            EventType::Cheer => "{username} cheered {amount} bits!",
            EventType::Raid => "{username} is raiding with {amount} viewers!",
            EventType::Donation => "{username} donated {amount}!",
            EventType::Custom => "{username} triggered an event!",
        }
    }
}

/// Parent alert configuration row. `event_type` is immutable after create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub event_type: EventType,
    pub name: String,
    pub enabled: bool,
    pub message_template: String,
    pub duration_ms: i64,
    pub animation_in: String,
    pub animation_out: String,
    pub sound_path: Option<String>,
    pub sound_volume: f64,
    pub image_path: Option<String>,
    pub font_family: String,
    pub font_size: i64,
    pub text_color: String,
    pub background_color: Option<String>,
    pub custom_css: Option<String>,
    pub min_amount: Option<f64>,
    pub tts_enabled: bool,
    pub tts_voice: Option<String>,
    pub tts_rate: f64,
    pub tts_pitch: f64,
    pub tts_volume: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// Alert with its variations grouped, for list endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct AlertWithVariations {
    #[serde(flatten)]
    pub alert: Alert,
    pub variations: Vec<Variation>,
}

/// Create payload. Unset fields fall back to documented defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAlert {
    #[serde(alias = "type")]
    pub event_type: Option<EventType>,
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub message_template: Option<String>,
    pub duration_ms: Option<i64>,
    pub animation_in: Option<String>,
    pub animation_out: Option<String>,
    pub sound_path: Option<String>,
    pub sound_volume: Option<f64>,
    pub image_path: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<i64>,
    pub text_color: Option<String>,
    pub background_color: Option<String>,
    pub custom_css: Option<String>,
    pub min_amount: Option<f64>,
    pub tts_enabled: Option<bool>,
    pub tts_voice: Option<String>,
    pub tts_rate: Option<f64>,
    pub tts_pitch: Option<f64>,
    pub tts_volume: Option<f64>,
}

/// Partial update. Absent fields keep their stored value; for nullable
/// columns an explicit JSON `null` clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertPatch {
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub message_template: Option<String>,
    pub duration_ms: Option<i64>,
    pub animation_in: Option<String>,
    pub animation_out: Option<String>,
    #[serde(default, with = "serde_double_option")]
    pub sound_path: Option<Option<String>>,
    pub sound_volume: Option<f64>,
    #[serde(default, with = "serde_double_option")]
    pub image_path: Option<Option<String>>,
    pub font_family: Option<String>,
    pub font_size: Option<i64>,
    pub text_color: Option<String>,
    #[serde(default, with = "serde_double_option")]
    pub background_color: Option<Option<String>>,
    #[serde(default, with = "serde_double_option")]
    pub custom_css: Option<Option<String>>,
    #[serde(default, with = "serde_double_option")]
    pub min_amount: Option<Option<f64>>,
    pub tts_enabled: Option<bool>,
    #[serde(default, with = "serde_double_option")]
    pub tts_voice: Option<Option<String>>,
    pub tts_rate: Option<f64>,
    pub tts_pitch: Option<f64>,
    pub tts_volume: Option<f64>,
}

/// Distinguishes "field absent" from "field set to null" in JSON patches.
pub(crate) mod serde_double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

impl Database {
    /// Create an alert with server-assigned id and timestamps.
    pub fn create_alert(&self, new: NewAlert) -> Result<Alert, DbError> {
        let event_type = new
            .event_type
            .ok_or_else(|| DbError::InvalidData("event_type is required".into()))?;

        let now = now_iso();
        let alert = Alert {
            id: new_id(),
            event_type,
            name: new
                .name
                .unwrap_or_else(|| format!("{} alert", event_type.as_str())),
            enabled: new.enabled.unwrap_or(true),
            message_template: new
                .message_template
                .unwrap_or_else(|| event_type.default_template().to_string()),
            duration_ms: new.duration_ms.unwrap_or(5000),
            animation_in: new.animation_in.unwrap_or_else(|| "fade-in".into()),
            animation_out: new.animation_out.unwrap_or_else(|| "fade-out".into()),
            sound_path: new.sound_path,
            sound_volume: new.sound_volume.unwrap_or(0.8),
            image_path: new.image_path,
            font_family: new.font_family.unwrap_or_else(|| "Inter".into()),
            font_size: new.font_size.unwrap_or(32),
            text_color: new.text_color.unwrap_or_else(|| "#ffffff".into()),
            background_color: new.background_color,
            custom_css: new.custom_css,
            min_amount: new.min_amount,
            tts_enabled: new.tts_enabled.unwrap_or(false),
            tts_voice: new.tts_voice,
            tts_rate: new.tts_rate.unwrap_or(1.0),
            tts_pitch: new.tts_pitch.unwrap_or(1.0),
            tts_volume: new.tts_volume.unwrap_or(1.0),
            created_at: now.clone(),
            updated_at: now,
        };
        validate_alert(&alert)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO alerts (
                    id, event_type, name, enabled, message_template, duration_ms,
                    animation_in, animation_out, sound_path, sound_volume, image_path,
                    font_family, font_size, text_color, background_color, custom_css,
                    min_amount, tts_enabled, tts_voice, tts_rate, tts_pitch, tts_volume,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                          ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
                rusqlite::params![
                    alert.id,
                    alert.event_type.as_str(),
                    alert.name,
                    alert.enabled,
                    alert.message_template,
                    alert.duration_ms,
                    alert.animation_in,
                    alert.animation_out,
                    alert.sound_path,
                    alert.sound_volume,
                    alert.image_path,
                    alert.font_family,
                    alert.font_size,
                    alert.text_color,
                    alert.background_color,
                    alert.custom_css,
                    alert.min_amount,
                    alert.tts_enabled,
                    alert.tts_voice,
                    alert.tts_rate,
                    alert.tts_pitch,
                    alert.tts_volume,
                    alert.created_at,
                    alert.updated_at,
                ],
            )?;
            Ok(())
        })?;

        Ok(alert)
    }

    pub fn get_alert(&self, id: &str) -> Result<Alert, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{ALERT_SELECT} WHERE id = ?1"))?;
            stmt.query_row([id], alert_from_row)
                .optional()?
                .ok_or_else(|| DbError::NotFound(format!("alert {id}")))
        })
    }

    /// All alerts with variations grouped, ordered by creation time.
    pub fn list_alerts(&self) -> Result<Vec<AlertWithVariations>, DbError> {
        let alerts = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{ALERT_SELECT} ORDER BY created_at ASC"))?;
            let rows = stmt.query_map([], alert_from_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })?;

        let mut result = Vec::with_capacity(alerts.len());
        for alert in alerts {
            let variations = self.list_variations(&alert.id)?;
            result.push(AlertWithVariations { alert, variations });
        }
        Ok(result)
    }

    pub fn list_alerts_by_type(&self, event_type: EventType) -> Result<Vec<Alert>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{ALERT_SELECT} WHERE event_type = ?1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map([event_type.as_str()], alert_from_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    /// Enabled alerts of one type, resolver candidate order (oldest first).
    pub fn list_enabled_alerts(&self, event_type: EventType) -> Result<Vec<Alert>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{ALERT_SELECT} WHERE event_type = ?1 AND enabled = 1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map([event_type.as_str()], alert_from_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    /// Partial update. `updated_at` is bumped even when no field changes.
    pub fn update_alert(&self, id: &str, patch: AlertPatch) -> Result<Alert, DbError> {
        let mut alert = self.get_alert(id)?;

        if let Some(v) = patch.name {
            alert.name = v;
        }
        if let Some(v) = patch.enabled {
            alert.enabled = v;
        }
        if let Some(v) = patch.message_template {
            alert.message_template = v;
        }
        if let Some(v) = patch.duration_ms {
            alert.duration_ms = v;
        }
        if let Some(v) = patch.animation_in {
            alert.animation_in = v;
        }
        if let Some(v) = patch.animation_out {
            alert.animation_out = v;
        }
        if let Some(v) = patch.sound_path {
            alert.sound_path = v;
        }
        if let Some(v) = patch.sound_volume {
            alert.sound_volume = v;
        }
        if let Some(v) = patch.image_path {
            alert.image_path = v;
        }
        if let Some(v) = patch.font_family {
            alert.font_family = v;
        }
        if let Some(v) = patch.font_size {
            alert.font_size = v;
        }
        if let Some(v) = patch.text_color {
            alert.text_color = v;
        }
        if let Some(v) = patch.background_color {
            alert.background_color = v;
        }
        if let Some(v) = patch.custom_css {
            alert.custom_css = v;
        }
        if let Some(v) = patch.min_amount {
            alert.min_amount = v;
        }
        if let Some(v) = patch.tts_enabled {
            alert.tts_enabled = v;
        }
        if let Some(v) = patch.tts_voice {
            alert.tts_voice = v;
        }
        if let Some(v) = patch.tts_rate {
            alert.tts_rate = v;
        }
        if let Some(v) = patch.tts_pitch {
            alert.tts_pitch = v;
        }
        if let Some(v) = patch.tts_volume {
            alert.tts_volume = v;
        }
        alert.updated_at = now_iso();
        validate_alert(&alert)?;

        self.with_conn(|conn| {
            conn.execute(
                "UPDATE alerts SET
                    name = ?2, enabled = ?3, message_template = ?4, duration_ms = ?5,
                    animation_in = ?6, animation_out = ?7, sound_path = ?8,
                    sound_volume = ?9, image_path = ?10, font_family = ?11,
                    font_size = ?12, text_color = ?13, background_color = ?14,
                    custom_css = ?15, min_amount = ?16, tts_enabled = ?17,
                    tts_voice = ?18, tts_rate = ?19, tts_pitch = ?20, tts_volume = ?21,
                    updated_at = ?22
                 WHERE id = ?1",
                rusqlite::params![
                    alert.id,
                    alert.name,
                    alert.enabled,
                    alert.message_template,
                    alert.duration_ms,
                    alert.animation_in,
                    alert.animation_out,
                    alert.sound_path,
                    alert.sound_volume,
                    alert.image_path,
                    alert.font_family,
                    alert.font_size,
                    alert.text_color,
                    alert.background_color,
                    alert.custom_css,
                    alert.min_amount,
                    alert.tts_enabled,
                    alert.tts_voice,
                    alert.tts_rate,
                    alert.tts_pitch,
                    alert.tts_volume,
                    alert.updated_at,
                ],
            )?;
            Ok(())
        })?;

        Ok(alert)
    }

    /// Delete an alert. Owned variations go with it (FK cascade).
    pub fn delete_alert(&self, id: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM alerts WHERE id = ?1", [id])?;
            if affected == 0 {
                return Err(DbError::NotFound(format!("alert {id}")));
            }
            Ok(())
        })
    }
}

fn validate_alert(alert: &Alert) -> Result<(), DbError> {
    if !(1000..=60000).contains(&alert.duration_ms) {
        return Err(DbError::InvalidData(format!(
            "duration_ms must be within 1000..=60000, got {}",
            alert.duration_ms
        )));
    }
    if !(0.0..=1.0).contains(&alert.sound_volume) {
        return Err(DbError::InvalidData(format!(
            "sound_volume must be within 0.0..=1.0, got {}",
            alert.sound_volume
        )));
    }
    if !(12..=200).contains(&alert.font_size) {
        return Err(DbError::InvalidData(format!(
            "font_size must be within 12..=200, got {}",
            alert.font_size
        )));
    }
    for (field, value) in [
        ("tts_rate", alert.tts_rate),
        ("tts_pitch", alert.tts_pitch),
        ("tts_volume", alert.tts_volume),
    ] {
        if !(0.0..=2.0).contains(&value) {
            return Err(DbError::InvalidData(format!(
                "{field} must be within 0.0..=2.0, got {value}"
            )));
        }
    }
    Ok(())
}

const ALERT_SELECT: &str = "SELECT
    id, event_type, name, enabled, message_template, duration_ms,
    animation_in, animation_out, sound_path, sound_volume, image_path,
    font_family, font_size, text_color, background_color, custom_css,
    min_amount, tts_enabled, tts_voice, tts_rate, tts_pitch, tts_volume,
    created_at, updated_at
 FROM alerts";

fn alert_from_row(row: &Row<'_>) -> Result<Alert, rusqlite::Error> {
    let event_type: String = row.get(1)?;
    Ok(Alert {
        id: row.get(0)?,
        event_type: EventType::parse(&event_type).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("unknown event type {event_type}").into(),
            )
        })?,
        name: row.get(2)?,
        enabled: row.get(3)?,
        message_template: row.get(4)?,
        duration_ms: row.get(5)?,
        animation_in: row.get(6)?,
        animation_out: row.get(7)?,
        sound_path: row.get(8)?,
        sound_volume: row.get(9)?,
        image_path: row.get(10)?,
        font_family: row.get(11)?,
        font_size: row.get(12)?,
        text_color: row.get(13)?,
        background_color: row.get(14)?,
        custom_css: row.get(15)?,
        min_amount: row.get(16)?,
        tts_enabled: row.get(17)?,
        tts_voice: row.get(18)?,
        tts_rate: row.get(19)?,
        tts_pitch: row.get(20)?,
        tts_volume: row.get(21)?,
        created_at: row.get(22)?,
        updated_at: row.get(23)?,
    })
}
