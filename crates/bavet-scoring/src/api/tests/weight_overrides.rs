//! Tests for constraint weight overrides.

use std::sync::Arc;

use bavet_config::SessionConfig;
use bavet_core::{BavetError, ConstraintRef, HardSoftScore, SimpleScore};

use crate::api::weight_overrides::{ConstraintWeightOverrides, WeightProvider};

// ============================================================================
// ConstraintWeightOverrides tests
// ============================================================================

#[test]
fn test_new_is_empty() {
    let overrides = ConstraintWeightOverrides::<SimpleScore>::new();
    assert!(overrides.is_empty());
    assert_eq!(overrides.len(), 0);
}

#[test]
fn test_put_get_and_remove() {
    let mut overrides = ConstraintWeightOverrides::<SimpleScore>::new();
    overrides.put("test", SimpleScore::of(5));
    assert!(overrides.contains("test"));
    assert_eq!(overrides.get("test"), Some(&SimpleScore::of(5)));
    assert_eq!(
        overrides.get_or_default("other", SimpleScore::ONE),
        SimpleScore::ONE
    );

    assert_eq!(overrides.remove("test"), Some(SimpleScore::of(5)));
    assert!(!overrides.contains("test"));
}

#[test]
fn test_resolve_by_short_or_full_name() {
    let room = ConstraintRef::new("timetable", "Room conflict");
    let teacher = ConstraintRef::new("timetable", "Teacher conflict");
    let overrides = ConstraintWeightOverrides::from_pairs([
        ("Room conflict", HardSoftScore::of_hard(2)),
        ("timetable/Teacher conflict", HardSoftScore::ZERO),
    ]);

    assert_eq!(
        overrides.resolve(&room, HardSoftScore::ONE_HARD),
        HardSoftScore::of_hard(2)
    );
    assert_eq!(
        overrides.resolve(&teacher, HardSoftScore::ONE_HARD),
        HardSoftScore::ZERO
    );
}

#[test]
fn test_validate_rejects_unknown_constraint() {
    let known = [ConstraintRef::new("timetable", "Room conflict")];
    let ok = ConstraintWeightOverrides::from_pairs([("Room conflict", SimpleScore::ONE)]);
    assert!(ok.validate(&known).is_ok());

    let bad = ConstraintWeightOverrides::from_pairs([("Roomconflict", SimpleScore::ONE)]);
    let err = bad.validate(&known).unwrap_err();
    assert!(matches!(err, BavetError::Config(ref msg) if msg.contains("Roomconflict")));
}

#[test]
fn test_from_config_and_merge() {
    let config = SessionConfig::new()
        .with_constraint_weight("A", SimpleScore::of(3))
        .with_constraint_weight("B", SimpleScore::of(4));
    let from_config = ConstraintWeightOverrides::<SimpleScore>::from_config(&config).unwrap();
    let explicit = ConstraintWeightOverrides::from_pairs([("B", SimpleScore::of(9))]);

    let merged = from_config.merged_with(&explicit);
    assert_eq!(merged.get("A"), Some(&SimpleScore::of(3)));
    assert_eq!(merged.get("B"), Some(&SimpleScore::of(9)));
}

#[test]
fn test_weight_provider_trait() {
    let mut overrides = ConstraintWeightOverrides::<SimpleScore>::new();
    overrides.put("test", SimpleScore::of(5));

    let provider: &dyn WeightProvider<SimpleScore> = &overrides;
    assert_eq!(provider.weight("test"), Some(SimpleScore::of(5)));
    assert_eq!(provider.weight("other"), None);
    assert_eq!(
        provider.weight_or_default("other", SimpleScore::of(1)),
        SimpleScore::of(1)
    );

    let shared: Arc<ConstraintWeightOverrides<SimpleScore>> = overrides.into_arc();
    let provider: &dyn WeightProvider<SimpleScore> = &shared;
    assert_eq!(provider.weight("test"), Some(SimpleScore::of(5)));
}
