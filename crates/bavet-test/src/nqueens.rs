//! N-Queens test fixtures.
//!
//! Queens sit on fixed columns; the row is the planning variable. Two queens
//! conflict when they share a row or a diagonal.
//!
//! # Example
//!
//! ```
//! use bavet_test::nqueens::{calculate_conflicts, queens_with_rows};
//!
//! let queens = queens_with_rows(&[0, 2, 1, 3]);
//! assert_eq!(calculate_conflicts(&queens), -2);
//! ```

use crate::value::Value;

/// Creates a queen with an assigned row.
pub fn queen(id: i64, column: i64, row: i64) -> Value {
    Value::Queen {
        id,
        column,
        row: Some(row),
    }
}

/// Creates a queen with no row assigned.
pub fn unassigned_queen(id: i64, column: i64) -> Value {
    Value::Queen {
        id,
        column,
        row: None,
    }
}

/// Places one queen per column, at the given rows.
pub fn queens_with_rows(rows: &[i64]) -> Vec<Value> {
    rows.iter()
        .enumerate()
        .map(|(i, &row)| queen(i as i64, i as i64, row))
        .collect()
}

/// Returns `(id, column, row)` of a queen value.
///
/// # Panics
///
/// Panics if `value` is not a queen.
pub fn queen_parts(value: &Value) -> (i64, i64, Option<i64>) {
    match value {
        Value::Queen { id, column, row } => (*id, *column, *row),
        other => panic!("expected a queen, got {:?}", other),
    }
}

/// Counts row and diagonal conflicts between all pairs of assigned queens.
///
/// Returns the negated count, the score a penalize-per-conflict network
/// should reach.
pub fn calculate_conflicts(queens: &[Value]) -> i64 {
    let mut conflicts = 0i64;
    for i in 0..queens.len() {
        for j in (i + 1)..queens.len() {
            let (_, col_i, row_i) = queen_parts(&queens[i]);
            let (_, col_j, row_j) = queen_parts(&queens[j]);
            if let (Some(row_i), Some(row_j)) = (row_i, row_j) {
                if row_i == row_j {
                    conflicts += 1;
                }
                if (row_i - row_j).abs() == (col_i - col_j).abs() {
                    conflicts += 1;
                }
            }
        }
    }
    -conflicts
}
