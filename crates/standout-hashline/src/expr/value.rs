//! Conversions and coercions on [`serde_json::Value`].
//!
//! Templates print and test values the way a scripting language would:
//! numbers print without a trailing `.0`, arrays print as comma-joined
//! elements, and `0`, `""`, `null` and `false` are falsy.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::error::EvalError;

/// Largest integer magnitude an `f64` represents exactly (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Stores an `f64` as a JSON number, using an integer when it is integral.
///
/// NaN and infinities have no JSON form and become `null`.
pub fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

/// Truthiness used by `#if` and the logical operators.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text form of a value, as written into template output.
///
/// `null` writes nothing, also as an array element.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(to_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Text form used when `+` concatenates: as [`to_text`], except that a
/// top-level `null` reads `null`.
pub fn concat_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        _ => to_text(value),
    }
}

fn number_text(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Numeric coercion for arithmetic and ordering.
pub fn to_number(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Null => Ok(0.0),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| EvalError::type_error(format!("{} is not representable", n))),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| EvalError::type_error(format!("{:?} is not a number", s))),
        Value::Array(_) | Value::Object(_) => Err(EvalError::type_error(format!(
            "{} cannot be used as a number",
            type_name(value)
        ))),
    }
}

/// Equality used by `==`/`===`: numbers compare by value, everything else
/// structurally.
pub fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => lhs == rhs,
    }
}

/// Ordering used by `<`, `<=`, `>`, `>=`.
///
/// Two strings compare lexicographically; anything else is compared
/// numerically. `None` when either side is NaN.
pub fn compare(lhs: &Value, rhs: &Value) -> Result<Option<Ordering>, EvalError> {
    if let (Value::String(a), Value::String(b)) = (lhs, rhs) {
        return Ok(Some(a.cmp(b)));
    }
    Ok(to_number(lhs)?.partial_cmp(&to_number(rhs)?))
}

/// Short type name for error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_prefers_integers() {
        assert_eq!(number(3.0), json!(3));
        assert_eq!(number(-0.0), json!(0));
        assert_eq!(number(1.5), json!(1.5));
        assert_eq!(number(f64::NAN), Value::Null);
        assert_eq!(number(f64::INFINITY), Value::Null);
    }

    #[test]
    fn test_truthy() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(!truthy(&falsy), "{} should be falsy", falsy);
        }
        for t in [json!(true), json!(1), json!(-1), json!("0"), json!([]), json!({})] {
            assert!(truthy(&t), "{} should be truthy", t);
        }
    }

    #[test]
    fn test_to_text() {
        assert_eq!(to_text(&json!(42)), "42");
        assert_eq!(to_text(&json!(2.5)), "2.5");
        assert_eq!(to_text(&json!(3.0)), "3");
        assert_eq!(to_text(&json!("foo")), "foo");
        assert_eq!(to_text(&json!(true)), "true");
        assert_eq!(to_text(&json!(null)), "");
        assert_eq!(to_text(&json!([1, "a", [2, 3]])), "1,a,2,3");
        assert_eq!(to_text(&json!([1, null, 2])), "1,,2");
        assert_eq!(concat_text(&json!(null)), "null");
        assert_eq!(concat_text(&json!([null])), "");
        assert_eq!(to_text(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(&json!(null)).unwrap(), 0.0);
        assert_eq!(to_number(&json!(true)).unwrap(), 1.0);
        assert_eq!(to_number(&json!(" 12 ")).unwrap(), 12.0);
        assert_eq!(to_number(&json!("")).unwrap(), 0.0);
        assert!(to_number(&json!("abc")).is_err());
        assert!(to_number(&json!([1])).is_err());
    }

    #[test]
    fn test_loose_eq_numbers_by_value() {
        assert!(loose_eq(&json!(1), &json!(1.0)));
        assert!(!loose_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!([1, 2]), &json!([1, 2])));
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare(&json!(1), &json!(2)).unwrap(), Some(Ordering::Less));
        assert_eq!(compare(&json!("b"), &json!("a")).unwrap(), Some(Ordering::Greater));
        assert_eq!(compare(&json!("10"), &json!(9)).unwrap(), Some(Ordering::Greater));
        assert!(compare(&json!({}), &json!(1)).is_err());
    }
}
