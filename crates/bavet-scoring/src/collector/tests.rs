//! Tests for incremental collectors.

use bavet_test::Value;

use super::*;

fn int(v: i64) -> [Value; 1] {
    [Value::Int(v)]
}

fn first(t: &[Value]) -> Value {
    t[0].clone()
}

// ============================================================================
// count / sum
// ============================================================================

#[test]
fn test_count_accumulate_and_undo() {
    let collector = count::<Value>();
    let mut acc = collector.supply();
    assert_eq!(acc.result(), Some(Value::Int(0)));

    let undos: Vec<_> = (0..3).map(|i| acc.accumulate(&int(i))).collect();
    assert_eq!(acc.result(), Some(Value::Int(3)));

    for undo in undos {
        acc.undo(undo);
    }
    assert_eq!(acc.result(), Some(Value::Int(0)));
}

#[test]
fn test_sum_undo_subtracts_what_was_added() {
    let collector = sum(|t: &[Value]| t[0].as_int().unwrap_or(0));
    let mut acc = collector.supply();

    let a = acc.accumulate(&int(10));
    let b = acc.accumulate(&int(-3));
    assert_eq!(b, Undo::Subtract(-3));
    assert_eq!(acc.result(), Some(Value::Int(7)));

    acc.undo(a);
    assert_eq!(acc.result(), Some(Value::Int(-3)));
}

// ============================================================================
// count_distinct
// ============================================================================

#[test]
fn test_count_distinct_reference_counts_values() {
    let collector = count_distinct(first);
    let mut acc = collector.supply();

    let x1 = acc.accumulate(&[Value::text("x")]);
    let x2 = acc.accumulate(&[Value::text("x")]);
    let y = acc.accumulate(&[Value::text("y")]);
    assert_eq!(acc.result(), Some(Value::Int(2)));

    acc.undo(x1);
    assert_eq!(acc.result(), Some(Value::Int(2)));

    acc.undo(x2);
    assert_eq!(acc.result(), Some(Value::Int(1)));

    acc.undo(y);
    assert_eq!(acc.result(), Some(Value::Int(0)));
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "never counted")]
fn test_count_distinct_rejects_unknown_release() {
    let collector = count_distinct(first);
    let mut acc = collector.supply();
    acc.accumulate(&[Value::text("x")]);
    acc.undo(Undo::Release(Value::text("y")));
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "never saw")]
fn test_min_rejects_unknown_release() {
    let collector = min(first, |v: &Value| v.as_int());
    let mut acc = collector.supply();
    acc.accumulate(&int(4));
    acc.undo(Undo::Release(Value::Int(9)));
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "expects a subtraction")]
fn test_sum_rejects_foreign_token() {
    let collector = sum(|t: &[Value]| t[0].as_int().unwrap_or(0));
    let mut acc = collector.supply();
    acc.accumulate(&int(4));
    acc.undo(Undo::Decrement);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "one token per part")]
fn test_compose_rejects_short_token() {
    let collector = compose(vec![count(), count()], |parts: &[Value]| parts[0].clone());
    let mut acc = collector.supply();
    acc.accumulate(&int(1));
    acc.undo(Undo::Composite(vec![Undo::Decrement]));
}

// ============================================================================
// min / max
// ============================================================================

#[test]
fn test_min_and_max_track_extremes_through_undo() {
    let mut min_acc = min(first, |v: &Value| v.as_int()).supply();
    let mut max_acc = max(first, |v: &Value| v.as_int()).supply();
    assert_eq!(min_acc.result(), None);

    let mut min_undos = Vec::new();
    let mut max_undos = Vec::new();
    for v in [5, 1, 9, 1] {
        min_undos.push(min_acc.accumulate(&int(v)));
        max_undos.push(max_acc.accumulate(&int(v)));
    }
    assert_eq!(min_acc.result(), Some(Value::Int(1)));
    assert_eq!(max_acc.result(), Some(Value::Int(9)));

    // One of the two 1s goes away; the other keeps the minimum.
    min_acc.undo(min_undos.remove(1));
    assert_eq!(min_acc.result(), Some(Value::Int(1)));
    min_acc.undo(min_undos.remove(2));
    assert_eq!(min_acc.result(), Some(Value::Int(5)));

    max_acc.undo(max_undos.remove(2));
    assert_eq!(max_acc.result(), Some(Value::Int(5)));
}

#[test]
fn test_min_ties_keep_first_value() {
    // Sort by absolute value: -2 and 2 tie.
    let mut acc = min(first, |v: &Value| v.as_int().map(i64::abs)).supply();
    acc.accumulate(&int(-2));
    let two = acc.accumulate(&int(2));
    assert_eq!(acc.result(), Some(Value::Int(-2)));

    acc.undo(two);
    assert_eq!(acc.result(), Some(Value::Int(-2)));
}

// ============================================================================
// to_list
// ============================================================================

#[test]
fn test_to_list_keeps_duplicates_and_order() {
    let mut acc = to_list(first).supply();
    let undos: Vec<_> = [3, 1, 3, 2].iter().map(|&v| acc.accumulate(&int(v))).collect();
    assert_eq!(
        acc.result(),
        Some(Value::List(vec![
            Value::Int(3),
            Value::Int(1),
            Value::Int(3),
            Value::Int(2)
        ]))
    );

    acc.undo(undos[0].clone());
    assert_eq!(
        acc.result(),
        Some(Value::List(vec![Value::Int(1), Value::Int(3), Value::Int(2)]))
    );
}

// ============================================================================
// load_balance
// ============================================================================

fn shift_collector() -> SharedCollector<Value> {
    load_balance(first, |t: &[Value]| t[1].as_int().unwrap_or(0))
}

#[test]
fn test_load_balance_perfectly_balanced() {
    let mut acc = shift_collector().supply();
    acc.accumulate(&[Value::Int(0), Value::Int(1)]);
    acc.accumulate(&[Value::Int(1), Value::Int(1)]);
    assert_eq!(acc.result(), Some(Value::Int(0)));
}

#[test]
fn test_load_balance_unbalanced_and_retract() {
    let mut acc = shift_collector().supply();
    acc.accumulate(&[Value::Int(0), Value::Int(1)]);
    let extra = acc.accumulate(&[Value::Int(0), Value::Int(1)]);
    acc.accumulate(&[Value::Int(1), Value::Int(1)]);
    // Loads [2, 1]: sqrt(0.5) rounds to 1
    assert_eq!(acc.result(), Some(Value::Int(1)));

    acc.undo(extra);
    assert_eq!(acc.result(), Some(Value::Int(0)));
}

#[test]
fn test_load_balance_zero_metric_is_ignored() {
    let mut acc = shift_collector().supply();
    let undo = acc.accumulate(&[Value::Int(0), Value::Int(0)]);
    assert_eq!(undo, Undo::Nothing);
    acc.undo(undo);
    assert_eq!(acc.result(), Some(Value::Int(0)));
}

#[test]
fn test_load_balance_sequence() {
    let mut state = LoadBalanceAccumulator::new();
    assert_eq!(state.unfairness(), 0);

    state.add(&"A", 2);
    assert_eq!(state.unfairness(), 0);

    state.add(&"B", 1);
    assert_eq!(state.unfairness(), 1);

    state.add(&"B", 1);
    assert_eq!(state.unfairness(), 0);
    assert_eq!(state.loads().get("B"), Some(&2));

    state.remove(&"B", 1);
    assert_eq!(state.unfairness(), 1);

    state.remove(&"B", 1);
    assert_eq!(state.unfairness(), 0);

    state.remove(&"A", 2);
    assert_eq!(state, LoadBalanceAccumulator::new());
}

// ============================================================================
// compose / conditionally / custom
// ============================================================================

#[test]
fn test_compose_undoes_every_part() {
    let collector = compose(
        vec![count(), sum(|t: &[Value]| t[0].as_int().unwrap_or(0))],
        |parts: &[Value]| Value::List(parts.to_vec()),
    );
    let mut acc = collector.supply();
    let a = acc.accumulate(&int(4));
    acc.accumulate(&int(6));
    assert_eq!(
        acc.result(),
        Some(Value::List(vec![Value::Int(2), Value::Int(10)]))
    );

    acc.undo(a);
    assert_eq!(
        acc.result(),
        Some(Value::List(vec![Value::Int(1), Value::Int(6)]))
    );
}

#[test]
fn test_compose_without_result_is_none() {
    let collector = compose(vec![min(first, |v: &Value| v.as_int())], |parts: &[Value]| {
        parts[0].clone()
    });
    assert_eq!(collector.supply().result(), None);
}

#[test]
fn test_conditionally_skips_non_matching() {
    let collector = conditionally(|t: &[Value]| t[0].as_int() > Some(0), count());
    let mut acc = collector.supply();
    let skipped = acc.accumulate(&int(-5));
    let counted = acc.accumulate(&int(5));
    assert_eq!(skipped, Undo::Nothing);
    assert_eq!(acc.result(), Some(Value::Int(1)));

    acc.undo(skipped);
    assert_eq!(acc.result(), Some(Value::Int(1)));
    acc.undo(counted);
    assert_eq!(acc.result(), Some(Value::Int(0)));
}

#[test]
fn test_insert_then_undo_restores_every_builtin() {
    let collectors: Vec<SharedCollector<Value>> = vec![
        count(),
        sum(|t: &[Value]| t[0].as_int().unwrap_or(0)),
        count_distinct(first),
        to_list(first),
        min(first, |v: &Value| v.as_int()),
        max(first, |v: &Value| v.as_int()),
        load_balance(first, |_: &[Value]| 3),
    ];
    for collector in collectors {
        let mut acc = collector.supply();
        acc.accumulate(&int(2));
        acc.accumulate(&int(7));
        let before = acc.result();

        let undo = acc.accumulate(&int(5));
        acc.undo(undo);
        assert_eq!(acc.result(), before);
    }
}
