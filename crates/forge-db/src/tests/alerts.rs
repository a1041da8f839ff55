use super::{set_created_at, test_db};
use crate::alerts::{AlertPatch, EventType, NewAlert};
use crate::variations::NewVariation;
use crate::DbError;

fn follow_alert() -> NewAlert {
    NewAlert {
        event_type: Some(EventType::Follow),
        name: Some("Follow alert".into()),
        ..Default::default()
    }
}

#[test]
fn test_create_fills_defaults() {
    let db = test_db();
    let alert = db.create_alert(follow_alert()).unwrap();

    assert!(alert.enabled);
    assert_eq!(alert.message_template, "{username} just followed!");
    assert_eq!(alert.duration_ms, 5000);
    assert_eq!(alert.animation_in, "fade-in");
    assert_eq!(alert.animation_out, "fade-out");
    assert_eq!(alert.sound_volume, 0.8);
    assert_eq!(alert.font_family, "Inter");
    assert_eq!(alert.font_size, 32);
    assert_eq!(alert.text_color, "#ffffff");
    assert_eq!(alert.background_color, None);
    assert_eq!(alert.min_amount, None);
    assert!(!alert.tts_enabled);

    let got = db.get_alert(&alert.id).unwrap();
    assert_eq!(got.id, alert.id);
    assert_eq!(got.created_at, alert.created_at);
}

#[test]
fn test_create_requires_event_type() {
    let db = test_db();
    let err = db.create_alert(NewAlert::default()).unwrap_err();
    assert!(matches!(err, DbError::InvalidData(_)));
}

#[test]
fn test_create_rejects_out_of_range() {
    let db = test_db();

    let err = db
        .create_alert(NewAlert {
            event_type: Some(EventType::Follow),
            duration_ms: Some(500),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidData(_)));

    let err = db
        .create_alert(NewAlert {
            event_type: Some(EventType::Follow),
            sound_volume: Some(1.5),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidData(_)));

    let err = db
        .create_alert(NewAlert {
            event_type: Some(EventType::Follow),
            font_size: Some(300),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidData(_)));
}

#[test]
fn test_partial_update_bumps_updated_at() {
    let db = test_db();
    let alert = db.create_alert(follow_alert()).unwrap();

    // Force a visible gap so the bump is observable.
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE alerts SET updated_at = '2000-01-01T00:00:00.000Z' WHERE id = ?1",
            [&alert.id],
        )?;
        Ok(())
    })
    .unwrap();

    // No-op patch still bumps updated_at.
    let updated = db.update_alert(&alert.id, AlertPatch::default()).unwrap();
    assert_eq!(updated.message_template, alert.message_template);
    assert_ne!(updated.updated_at, "2000-01-01T00:00:00.000Z");

    let updated = db
        .update_alert(
            &alert.id,
            AlertPatch {
                duration_ms: Some(8000),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.duration_ms, 8000);
    // Untouched fields survive.
    assert_eq!(updated.name, "Follow alert");
}

#[test]
fn test_update_clears_nullable_with_explicit_null() {
    let db = test_db();
    let alert = db
        .create_alert(NewAlert {
            event_type: Some(EventType::Cheer),
            min_amount: Some(100.0),
            background_color: Some("#000000".into()),
            ..Default::default()
        })
        .unwrap();

    let updated = db
        .update_alert(
            &alert.id,
            AlertPatch {
                min_amount: Some(None),
                background_color: Some(None),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.min_amount, None);
    assert_eq!(updated.background_color, None);
}

#[test]
fn test_update_missing_alert() {
    let db = test_db();
    let err = db
        .update_alert("no-such-id", AlertPatch::default())
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound(_)));
}

#[test]
fn test_list_enabled_orders_by_creation() {
    let db = test_db();
    let a = db.create_alert(follow_alert()).unwrap();
    let b = db.create_alert(follow_alert()).unwrap();
    let disabled = db
        .create_alert(NewAlert {
            event_type: Some(EventType::Follow),
            enabled: Some(false),
            ..Default::default()
        })
        .unwrap();

    set_created_at(&db, "alerts", &a.id, "2026-01-02T00:00:00.000Z");
    set_created_at(&db, "alerts", &b.id, "2026-01-01T00:00:00.000Z");

    let enabled = db.list_enabled_alerts(EventType::Follow).unwrap();
    let ids: Vec<&str> = enabled.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec![b.id.as_str(), a.id.as_str()]);
    assert!(!ids.contains(&disabled.id.as_str()));
}

#[test]
fn test_delete_cascades_to_own_variations_only() {
    let db = test_db();
    let doomed = db.create_alert(follow_alert()).unwrap();
    let survivor = db
        .create_alert(NewAlert {
            event_type: Some(EventType::Subscribe),
            ..Default::default()
        })
        .unwrap();

    db.create_variation(
        &doomed.id,
        NewVariation {
            name: Some("v1".into()),
            condition_type: Some("tier".into()),
            condition_value: Some("1".into()),
            ..Default::default()
        },
    )
    .unwrap();
    let kept = db
        .create_variation(
            &survivor.id,
            NewVariation {
                name: Some("v2".into()),
                condition_type: Some("tier".into()),
                condition_value: Some("2".into()),
                ..Default::default()
            },
        )
        .unwrap();

    db.delete_alert(&doomed.id).unwrap();

    assert!(matches!(
        db.get_alert(&doomed.id).unwrap_err(),
        DbError::NotFound(_)
    ));
    assert!(db.list_variations(&doomed.id).unwrap().is_empty());
    // The other alert's variations are untouched.
    let remaining = db.list_variations(&survivor.id).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, kept.id);
}

#[test]
fn test_list_alerts_groups_variations() {
    let db = test_db();
    let alert = db.create_alert(follow_alert()).unwrap();
    db.create_variation(
        &alert.id,
        NewVariation {
            name: Some("low".into()),
            condition_type: Some("amount".into()),
            condition_value: Some("10".into()),
            priority: Some(1),
            ..Default::default()
        },
    )
    .unwrap();
    db.create_variation(
        &alert.id,
        NewVariation {
            name: Some("high".into()),
            condition_type: Some("amount".into()),
            condition_value: Some("100".into()),
            priority: Some(10),
            ..Default::default()
        },
    )
    .unwrap();

    let listed = db.list_alerts().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].variations.len(), 2);
    // Highest priority first.
    assert_eq!(listed[0].variations[0].name, "high");
}
