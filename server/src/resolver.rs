//! Alert rule resolution.
//!
//! `resolve` walks the enabled alerts of an event type in creation
//! order. The first candidate that passes its min-amount gate wins;
//! its highest-priority matching variation (if any) is merged on top.
//! A candidate that fails the gate is skipped entirely, variations
//! included.

use forge_db::alerts::{Alert, EventType};
use forge_db::variations::{
    Variation, CONDITION_AMOUNT, CONDITION_CUSTOM, CONDITION_TIER,
};
use forge_db::{Database, DbError};
use serde::{Deserialize, Serialize};

use crate::events::EventFacts;

/// Fully resolved display parameters handed to overlays as `config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSpec {
    pub alert_id: String,
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
    pub tts_enabled: bool,
    pub tts_voice: Option<String>,
    pub tts_rate: f64,
    pub tts_pitch: f64,
    pub tts_volume: f64,
    #[serde(rename = "_variation_id", skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<String>,
    #[serde(rename = "_variation_name", skip_serializing_if = "Option::is_none")]
    pub variation_name: Option<String>,
}

/// Resolve an event against the current alert configuration.
/// Deterministic for a fixed database snapshot.
pub fn resolve(
    db: &Database,
    event_type: EventType,
    facts: &EventFacts,
) -> Result<Option<AlertSpec>, DbError> {
    let candidates = db.list_enabled_alerts(event_type)?;

    for alert in &candidates {
        if let (Some(min_amount), Some(amount)) = (alert.min_amount, facts.amount) {
            if amount < min_amount {
                tracing::debug!(
                    alert_id = %alert.id,
                    amount,
                    min_amount,
                    "Candidate skipped by min-amount gate"
                );
                continue;
            }
        }

        let variations = db.list_enabled_variations(&alert.id)?;
        for variation in &variations {
            if condition_matches(variation, facts) {
                return Ok(Some(merge(alert, Some(variation))));
            }
        }
        return Ok(Some(merge(alert, None)));
    }

    Ok(None)
}

/// Evaluate one variation condition. Kinds other than tier / amount /
/// custom never match.
fn condition_matches(variation: &Variation, facts: &EventFacts) -> bool {
    match variation.condition_type.as_str() {
        CONDITION_TIER => facts
            .tier
            .as_deref()
            .is_some_and(|tier| tier == variation.condition_value),
        CONDITION_AMOUNT => match (facts.amount, variation.condition_value.parse::<f64>()) {
            (Some(amount), Ok(threshold)) => amount >= threshold,
            _ => false,
        },
        CONDITION_CUSTOM => facts
            .custom_value
            .as_deref()
            .is_some_and(|value| value == variation.condition_value),
        _ => false,
    }
}

/// Project the parent onto an AlertSpec, replacing the fixed list of
/// override-eligible fields with the variation's non-null values.
/// Neither input is mutated.
fn merge(alert: &Alert, variation: Option<&Variation>) -> AlertSpec {
    let mut spec = AlertSpec {
        alert_id: alert.id.clone(),
        message_template: alert.message_template.clone(),
        duration_ms: alert.duration_ms,
        animation_in: alert.animation_in.clone(),
        animation_out: alert.animation_out.clone(),
        sound_path: alert.sound_path.clone(),
        sound_volume: alert.sound_volume,
        image_path: alert.image_path.clone(),
        font_family: alert.font_family.clone(),
        font_size: alert.font_size,
        text_color: alert.text_color.clone(),
        background_color: alert.background_color.clone(),
        custom_css: alert.custom_css.clone(),
        tts_enabled: alert.tts_enabled,
        tts_voice: alert.tts_voice.clone(),
        tts_rate: alert.tts_rate,
        tts_pitch: alert.tts_pitch,
        tts_volume: alert.tts_volume,
        variation_id: None,
        variation_name: None,
    };

    let Some(variation) = variation else {
        return spec;
    };

    if let Some(v) = &variation.message_template {
        spec.message_template = v.clone();
    }
    if let Some(v) = &variation.sound_path {
        spec.sound_path = Some(v.clone());
    }
    if let Some(v) = variation.sound_volume {
        spec.sound_volume = v;
    }
    if let Some(v) = &variation.image_path {
        spec.image_path = Some(v.clone());
    }
    if let Some(v) = &variation.animation_in {
        spec.animation_in = v.clone();
    }
    if let Some(v) = &variation.animation_out {
        spec.animation_out = v.clone();
    }
    if let Some(v) = &variation.custom_css {
        spec.custom_css = Some(v.clone());
    }
    spec.variation_id = Some(variation.id.clone());
    spec.variation_name = Some(variation.name.clone());
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_db::alerts::NewAlert;
    use forge_db::variations::NewVariation;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test DB")
    }

    fn facts(amount: Option<f64>, tier: Option<&str>) -> EventFacts {
        EventFacts {
            username: Some("alice".into()),
            amount,
            tier: tier.map(Into::into),
            ..Default::default()
        }
    }

    fn create_alert(db: &Database, event_type: EventType, min_amount: Option<f64>) -> Alert {
        db.create_alert(NewAlert {
            event_type: Some(event_type),
            min_amount,
            ..Default::default()
        })
        .unwrap()
    }

    fn variation(
        name: &str,
        condition_type: &str,
        condition_value: &str,
        priority: i64,
    ) -> NewVariation {
        NewVariation {
            name: Some(name.into()),
            condition_type: Some(condition_type.into()),
            condition_value: Some(condition_value.into()),
            priority: Some(priority),
            ..Default::default()
        }
    }

    fn set_created_at(db: &Database, table: &str, id: &str, created_at: &str) {
        db.with_conn(|conn| {
            conn.execute(
                &format!("UPDATE {table} SET created_at = ?1 WHERE id = ?2"),
                forge_db::rusqlite::params![created_at, id],
            )?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn no_candidates_resolves_to_none() {
        let db = test_db();
        assert!(resolve(&db, EventType::Follow, &facts(None, None))
            .unwrap()
            .is_none());
    }

    #[test]
    fn parent_without_variations_wins_as_is() {
        let db = test_db();
        let alert = create_alert(&db, EventType::Follow, None);

        let spec = resolve(&db, EventType::Follow, &facts(None, None))
            .unwrap()
            .unwrap();
        assert_eq!(spec.alert_id, alert.id);
        assert_eq!(spec.duration_ms, 5000);
        assert_eq!(spec.variation_id, None);
    }

    #[test]
    fn tier_variation_match_merges_overrides() {
        let db = test_db();
        let alert = create_alert(&db, EventType::Subscribe, None);
        let v = db
            .create_variation(
                &alert.id,
                NewVariation {
                    message_template: Some("{username} is a TIER 3 LEGEND!".into()),
                    ..variation("tier3", "tier", "3", 10)
                },
            )
            .unwrap();

        let spec = resolve(&db, EventType::Subscribe, &facts(None, Some("3")))
            .unwrap()
            .unwrap();
        assert_eq!(spec.message_template, "{username} is a TIER 3 LEGEND!");
        assert_eq!(spec.variation_id.as_deref(), Some(v.id.as_str()));
        assert_eq!(spec.variation_name.as_deref(), Some("tier3"));
        // Non-overridden fields inherit from the parent.
        assert_eq!(spec.duration_ms, alert.duration_ms);

        // Wrong tier falls back to the parent.
        let spec = resolve(&db, EventType::Subscribe, &facts(None, Some("1")))
            .unwrap()
            .unwrap();
        assert_eq!(spec.variation_id, None);
    }

    #[test]
    fn min_amount_gate_skips_candidate_and_its_variations() {
        let db = test_db();
        let alert = create_alert(&db, EventType::Cheer, Some(500.0));
        db.create_variation(&alert.id, variation("small", "amount", "100", 5))
            .unwrap();

        // Below the gate: the amount variation would match, but the
        // candidate is skipped before variations are considered.
        let resolved = resolve(&db, EventType::Cheer, &facts(Some(200.0), None)).unwrap();
        assert!(resolved.is_none());

        // At or above the gate the candidate resolves normally.
        let spec = resolve(&db, EventType::Cheer, &facts(Some(500.0), None))
            .unwrap()
            .unwrap();
        assert_eq!(spec.variation_name.as_deref(), Some("small"));
    }

    #[test]
    fn absent_amount_passes_gate_but_never_matches_amount_condition() {
        let db = test_db();
        let alert = create_alert(&db, EventType::Cheer, Some(500.0));
        db.create_variation(&alert.id, variation("big", "amount", "100", 5))
            .unwrap();

        let spec = resolve(&db, EventType::Cheer, &facts(None, None))
            .unwrap()
            .unwrap();
        assert_eq!(spec.alert_id, alert.id);
        assert_eq!(spec.variation_id, None);
    }

    #[test]
    fn first_candidate_wins_even_when_a_later_one_also_passes() {
        let db = test_db();
        let first = create_alert(&db, EventType::Follow, None);
        let second = create_alert(&db, EventType::Follow, None);
        set_created_at(&db, "alerts", &first.id, "2026-01-01T00:00:00.000Z");
        set_created_at(&db, "alerts", &second.id, "2026-01-02T00:00:00.000Z");

        let spec = resolve(&db, EventType::Follow, &facts(None, None))
            .unwrap()
            .unwrap();
        assert_eq!(spec.alert_id, first.id);
    }

    #[test]
    fn gated_first_candidate_falls_through_to_next() {
        let db = test_db();
        let gated = create_alert(&db, EventType::Donation, Some(100.0));
        let open = create_alert(&db, EventType::Donation, None);
        set_created_at(&db, "alerts", &gated.id, "2026-01-01T00:00:00.000Z");
        set_created_at(&db, "alerts", &open.id, "2026-01-02T00:00:00.000Z");

        let spec = resolve(&db, EventType::Donation, &facts(Some(50.0), None))
            .unwrap()
            .unwrap();
        assert_eq!(spec.alert_id, open.id);
    }

    #[test]
    fn priority_order_with_created_at_tie_break() {
        let db = test_db();
        let alert = create_alert(&db, EventType::Cheer, None);
        let low = db
            .create_variation(&alert.id, variation("low", "amount", "10", 1))
            .unwrap();
        let tie_new = db
            .create_variation(&alert.id, variation("tie-new", "amount", "10", 5))
            .unwrap();
        let tie_old = db
            .create_variation(&alert.id, variation("tie-old", "amount", "10", 5))
            .unwrap();
        set_created_at(&db, "variations", &tie_new.id, "2026-01-02T00:00:00.000Z");
        set_created_at(&db, "variations", &tie_old.id, "2026-01-01T00:00:00.000Z");

        let spec = resolve(&db, EventType::Cheer, &facts(Some(50.0), None))
            .unwrap()
            .unwrap();
        // Equal priorities resolve to the older row; the lower
        // priority never gets a look.
        assert_eq!(spec.variation_id.as_deref(), Some(tie_old.id.as_str()));
        assert_ne!(spec.variation_id.as_deref(), Some(low.id.as_str()));
    }

    #[test]
    fn custom_condition_matches_custom_value_only() {
        let db = test_db();
        let alert = create_alert(&db, EventType::Custom, None);
        db.create_variation(&alert.id, variation("named", "custom", "confetti", 1))
            .unwrap();

        let matched = resolve(
            &db,
            EventType::Custom,
            &EventFacts {
                custom_value: Some("confetti".into()),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(matched.variation_name.as_deref(), Some("named"));

        let unmatched = resolve(
            &db,
            EventType::Custom,
            &EventFacts {
                message: Some("confetti".into()),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(unmatched.variation_id, None);
    }

    #[test]
    fn resolution_leaves_rows_unchanged() {
        let db = test_db();
        let alert = create_alert(&db, EventType::Subscribe, None);
        let variation = db
            .create_variation(
                &alert.id,
                NewVariation {
                    message_template: Some("override".into()),
                    ..variation("v", "tier", "2", 1)
                },
            )
            .unwrap();

        resolve(&db, EventType::Subscribe, &facts(None, Some("2")))
            .unwrap()
            .unwrap();

        let alert_after = db.get_alert(&alert.id).unwrap();
        let variation_after = db.get_variation(&variation.id).unwrap();
        assert_eq!(alert_after.message_template, alert.message_template);
        assert_eq!(alert_after.updated_at, alert.updated_at);
        assert_eq!(variation_after.updated_at, variation.updated_at);
    }

    #[test]
    fn deterministic_for_fixed_snapshot() {
        let db = test_db();
        let alert = create_alert(&db, EventType::Cheer, Some(10.0));
        db.create_variation(&alert.id, variation("a", "amount", "50", 3))
            .unwrap();
        db.create_variation(&alert.id, variation("b", "tier", "2", 7))
            .unwrap();

        let input = facts(Some(75.0), Some("2"));
        let first = resolve(&db, EventType::Cheer, &input).unwrap();
        for _ in 0..5 {
            assert_eq!(resolve(&db, EventType::Cheer, &input).unwrap(), first);
        }
    }
}
