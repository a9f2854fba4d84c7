//! Tests for stream descriptors and joiners.

use bavet_core::BavetError;
use bavet_test::{Class, Value};

use super::*;
use crate::collector::{count, sum};

fn first(t: &[Value]) -> Value {
    t[0].clone()
}

#[test]
fn test_arity_follows_operations() {
    let mut factory = ConstraintFactory::<Value>::new();
    let a = factory.for_each(Class::Lesson);
    let b = factory.for_each(Class::Room);
    let ab = factory.join(a, b, vec![]).unwrap();
    let abb = factory.join(ab, b, vec![]).unwrap();
    let grouped = factory
        .group_by(abb, vec![key(first)], vec![count(), sum(|_: &[Value]| 1)])
        .unwrap();
    let exists = factory.if_exists(a, abb, vec![]).unwrap();
    let mapped = factory.map(grouped, vec![key(first)]).unwrap();

    assert_eq!(factory.arity(ab).unwrap(), 2);
    assert_eq!(factory.arity(abb).unwrap(), 3);
    assert_eq!(factory.arity(grouped).unwrap(), 3);
    assert_eq!(factory.arity(exists).unwrap(), 1);
    assert_eq!(factory.arity(mapped).unwrap(), 1);
    assert_eq!(factory.stream_count(), 7);
}

#[test]
fn test_join_beyond_four_facts_is_rejected() {
    let mut factory = ConstraintFactory::<Value>::new();
    let a = factory.for_each(Class::Lesson);
    let aa = factory.join(a, a, vec![]).unwrap();
    let aaa = factory.join(aa, a, vec![]).unwrap();
    assert!(factory.join(aaa, a, vec![]).is_ok());

    let err = factory.join(aaa, aa, vec![]).unwrap_err();
    assert!(matches!(err, BavetError::Config(_)));
}

#[test]
fn test_group_by_and_map_bounds() {
    let mut factory = ConstraintFactory::<Value>::new();
    let a = factory.for_each(Class::Lesson);

    assert!(factory.group_by(a, vec![], vec![]).is_err());
    assert!(factory
        .group_by(a, vec![key(first); 3], vec![count(), count()])
        .is_err());
    assert!(factory.group_by(a, vec![], vec![count()]).is_ok());

    assert!(factory.map(a, vec![]).is_err());
    assert!(factory.map(a, vec![key(first); 5]).is_err());
}

#[test]
fn test_concat_needs_equal_arity() {
    let mut factory = ConstraintFactory::<Value>::new();
    let a = factory.for_each(Class::Lesson);
    let b = factory.for_each(Class::Room);
    let ab = factory.join(a, b, vec![]).unwrap();

    assert!(factory.concat(a, b).is_ok());
    assert!(matches!(factory.concat(a, ab), Err(BavetError::Config(_))));
}

#[test]
fn test_unknown_stream_is_rejected() {
    let mut other = ConstraintFactory::<Value>::new();
    other.for_each(Class::Lesson);
    let foreign = other.for_each(Class::Room);

    let mut factory = ConstraintFactory::<Value>::new();
    assert!(factory.filter(foreign, |_| true).is_err());
    assert!(factory.distinct(foreign).is_err());
}

#[test]
fn test_joiners() {
    let eq = joiner::equal(first);
    assert!(eq.is_indexed());
    assert!(eq.matches(&[Value::Int(3)], &[Value::Int(3)]));

    let ge = joiner::greater_than_or_equal(|t: &[Value]| t[0].as_int(), |t: &[Value]| t[0].as_int());
    assert!(!ge.is_indexed());
    assert!(ge.matches(&[Value::Int(3)], &[Value::Int(3)]));
    assert!(!ge.matches(&[Value::Int(2)], &[Value::Int(3)]));

    let gt = joiner::greater_than(|t: &[Value]| t[0].as_int(), |t: &[Value]| t[0].as_int());
    assert!(!gt.matches(&[Value::Int(3)], &[Value::Int(3)]));

    let le = joiner::less_than_or_equal(|t: &[Value]| t[0].as_int(), |t: &[Value]| t[0].as_int());
    assert!(le.matches(&[Value::Int(3)], &[Value::Int(3)]));

    let start = |t: &[Value]| t[0].as_int();
    let end = |t: &[Value]| t[1].as_int();
    let overlaps = joiner::overlapping(start, end, start, end);
    assert!(overlaps.matches(
        &[Value::Int(0), Value::Int(5)],
        &[Value::Int(4), Value::Int(6)]
    ));
    assert!(!overlaps.matches(
        &[Value::Int(0), Value::Int(5)],
        &[Value::Int(5), Value::Int(6)]
    ));

    let custom = joiner::filtering(|l: &[Value], r: &[Value]| l.len() + r.len() == 3);
    assert!(custom.matches(&[Value::Int(0)], &[Value::Int(0), Value::Int(0)]));
}

#[test]
fn test_constraint_def_builder() {
    let mut factory = ConstraintFactory::<Value>::new();
    let a = factory.for_each(Class::Lesson);
    let def = ConstraintDef::penalize(
        bavet_core::ConstraintRef::new("", "Unassigned"),
        a,
        bavet_core::SimpleScore::ONE,
    )
    .with_match_weight(|_: &[Value]| 2)
    .indict_with(|t: &[Value]| t.to_vec());

    assert_eq!(def.stream(), a);
    assert_eq!(def.impact_type(), bavet_core::ImpactType::Penalty);
    assert!(def.match_weight.is_some());
    assert!(def.justification.is_none());
    assert!(def.indictment.is_some());
}
