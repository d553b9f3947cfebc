//! JSON documents as values.
//!
//! | JSON | value |
//! |------|-------|
//! | `null` | [`Value::Invalid`] |
//! | `true` / `false` | `bool` |
//! | integer | `i64`, or `u64` above `i64::MAX` |
//! | other number | `f64` |
//! | string | `String` |
//! | array | `Vec<dyn Any>` |
//! | object | `Map<String, dyn Any>` |
//!
//! [`from_json`] converts plain data. Expectations holding rule objects
//! (`{"$op": "Gt", "args": [3]}`) go through
//! [`RuleRegistry::load`](crate::RuleRegistry::load) instead.

use crate::value::{FloatKind, IntKind, Map, Slice, Type, UintKind, Value};

/// Convert a JSON document. Rule objects stay ordinary maps.
///
/// ```
/// use deepmatch::json::from_json;
///
/// let got = from_json(&serde_json::json!({"id": 7, "tags": ["a", "b"]}));
/// let expected = from_json(&serde_json::json!({"tags": ["a", "b"], "id": 7}));
/// assert!(deepmatch::eq_deeply(got, expected));
/// ```
#[must_use]
pub fn from_json(doc: &serde_json::Value) -> Value {
    match doc {
        serde_json::Value::Array(items) => array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(entries) => object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), from_json(v)))
                .collect(),
        ),
        scalar => convert_scalar(scalar),
    }
}

/// Null, booleans, numbers and strings. Containers come back as
/// [`Value::Invalid`]; callers handle them before reaching here.
pub(crate) fn convert_scalar(doc: &serde_json::Value) -> Value {
    match doc {
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(IntKind::I64, i)
            } else if let Some(u) = n.as_u64() {
                Value::Uint(UintKind::U64, u)
            } else {
                Value::Float(FloatKind::F64, n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        _ => Value::Invalid,
    }
}

/// `Vec<dyn Any>`
pub(crate) fn array(items: Vec<Value>) -> Value {
    Value::Slice(Slice::new(Type::Any, items))
}

/// `Map<String, dyn Any>`
pub(crate) fn object(entries: Vec<(String, Value)>) -> Value {
    Value::Map(Map::new(
        Type::String,
        Type::Any,
        entries
            .into_iter()
            .map(|(k, v)| (Value::String(k), v))
            .collect(),
    ))
}
