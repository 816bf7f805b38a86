//! Utility functions for ordering and deduplicating JSON values.

use ordered_float::OrderedFloat;
use serde_json::Value;
use std::cmp::Ordering;

/// Rank of a value's JSON kind: null < bool < number < string < array < object.
fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// A total order over JSON values.
///
/// Values of different kinds order by kind. Numbers compare numerically
/// (through [`OrderedFloat`], so NaN-free JSON numbers and large integers both
/// behave), strings by bytes, and containers by their serialized text.
///
/// # Examples
///
/// ```
/// use dsjson::utils::compare_values;
/// use serde_json::json;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_values(&json!(9), &json!(10)), Ordering::Less);
/// assert_eq!(compare_values(&json!(null), &json!("a")), Ordering::Less);
/// ```
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i.cmp(&j),
            _ => OrderedFloat(x.as_f64().unwrap_or(f64::NAN))
                .cmp(&OrderedFloat(y.as_f64().unwrap_or(f64::NAN))),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

/// Sort `values` in place by [`compare_values`].
pub fn sort_values(values: &mut [Value]) {
    values.sort_by(compare_values);
}

/// Hashable identity of a JSON value for deduplication.
///
/// Numbers are keyed by value, so `1`, `1.0` and `1e0` are the same key.
/// Integral numbers that fit an `i64` key exactly; everything else falls back
/// to its `f64` value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DistinctKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Text(String),
    /// Arrays and objects, by serialized text.
    Composite(String),
}

impl From<&Value> for DistinctKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Self::Int(i);
                }
                let f = n.as_f64().unwrap_or(f64::NAN);
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Self::Int(f as i64)
                } else {
                    Self::Float(OrderedFloat(f))
                }
            }
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => Self::Composite(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_order_numerically_not_textually() {
        let mut v = vec![json!(10), json!(9.5), json!(100), json!(-1)];
        sort_values(&mut v);
        assert_eq!(v, vec![json!(-1), json!(9.5), json!(10), json!(100)]);
    }

    #[test]
    fn mixed_kinds_order_by_kind() {
        let mut v = vec![json!("b"), json!(1), json!(null), json!(true), json!("a"), json!(false)];
        sort_values(&mut v);
        assert_eq!(
            v,
            vec![json!(null), json!(false), json!(true), json!(1), json!("a"), json!("b")]
        );
    }

    #[test]
    fn equal_numbers_share_a_key() {
        let key = |v: Value| DistinctKey::from(&v);
        assert_eq!(key(json!(1)), key(json!(1.0)));
        assert_eq!(key(json!(-3)), key(json!(-3.0)));
        assert_ne!(key(json!(1)), key(json!(1.5)));
        assert_ne!(key(json!(1)), key(json!("1")));
        assert_ne!(key(json!(true)), key(json!(1)));
        assert_eq!(key(json!(u64::MAX)), key(json!(u64::MAX)));
    }

    #[test]
    fn large_integers_keep_precision() {
        let a = json!(9_007_199_254_740_993_i64);
        let b = json!(9_007_199_254_740_992_i64);
        assert_eq!(compare_values(&a, &b), Ordering::Greater);
    }
}
