//! Assertion functions for comparing reader output with expectations.

use crate::row::Row;
use serde_json::Value;
use std::fmt::Debug;

/// Assert that two row sequences are equal in order and content.
///
/// # Panics
///
/// Panics if the sequences differ in length or content.
pub fn assert_rows_equal<T: Debug + PartialEq>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Row count mismatch:\n  Expected: {}\n  Actual: {}",
        expected.len(),
        actual.len()
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert_eq!(a, e, "Row mismatch at index {i}:\n  Expected: {e:?}\n  Actual: {a:?}");
    }
}

/// Assert that every row satisfies `predicate`.
///
/// # Panics
///
/// Panics on the first row that does not.
///
/// # Example
///
/// ```
/// use dsjson::Row;
/// use dsjson::testing::assert_all_rows;
/// use serde_json::json;
///
/// let rows = vec![Row::Array(vec![json!(81)]), Row::Array(vec![json!(90)])];
/// assert_all_rows(&rows, |r| r.as_array().is_some_and(|v| v[0].as_i64() > Some(80)));
/// ```
pub fn assert_all_rows(rows: &[Row], predicate: impl Fn(&Row) -> bool) {
    for (i, row) in rows.iter().enumerate() {
        assert!(predicate(row), "Row {i} does not satisfy the predicate: {row:?}");
    }
}

/// Values of `column` across object-shaped rows; `Null` where absent.
#[must_use]
pub fn column_values(rows: &[Row], column: &str) -> Vec<Value> {
    rows.iter()
        .map(|r| r.get(column).cloned().unwrap_or(Value::Null))
        .collect()
}
