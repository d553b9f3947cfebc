//! Containment: substrings, sub-byte-slices, elements and keys.
//!
//! A nil expected item is turned into the typed nil of the container's
//! element type when that type is a pointer, interface, map, slice, channel
//! or function. Any other element type keeps the untyped nil, so a
//! `Vec<i64>` never "contains nil".

use std::fmt;

use crate::context::Context;
use crate::error::{ErrorKind, MatchError, MatchResult};
use crate::operator::{op, op_base_accessors, OpBase, Operator};
use crate::value::{IntoValue, Kind, Type, Value};

fn typed_nil(expected: &Value, elem: &Type) -> Option<Value> {
    if !expected.is_invalid() {
        return None;
    }
    match elem.kind() {
        Kind::Ptr | Kind::Interface | Kind::Map | Kind::Slice | Kind::Chan | Kind::Func => {
            Value::nil_of(elem)
        }
        _ => None,
    }
}

fn bad_kind(got: &Value, accepted: &str) -> MatchError {
    MatchError::new(ErrorKind::TypeMismatch, "bad kind")
        .got(got.ty().map_or_else(|| "nil".to_string(), |t| t.to_string()))
        .expected(accepted)
}

/// Got contains the expected item.
pub struct Contains {
    base: OpBase,
    expected: Value,
}

impl Contains {
    /// Tri-state: `None` when got is not a container this rule understands.
    fn contains(&self, ctx: &mut Context<'_>, got: &Value) -> Option<bool> {
        if let Value::String(haystack) = got {
            return match &self.expected {
                Value::String(needle) => Some(haystack.contains(needle.as_str())),
                Value::Op(_) => Some(
                    haystack
                        .chars()
                        .any(|c| ctx.matches(&Value::String(c.to_string()), &self.expected)),
                ),
                _ => None,
            };
        }

        if let (Some(haystack), Some(needle)) = (got.as_bytes(), self.expected.as_bytes()) {
            return Some(needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle));
        }

        let (items, elem): (Vec<&Value>, &Type) = match got {
            Value::Slice(s) => (s.items().unwrap_or_default().iter().collect(), s.elem()),
            Value::Array(a) => (a.items().iter().collect(), a.elem()),
            Value::Map(m) => (
                m.entries().unwrap_or_default().iter().map(|(_, v)| v).collect(),
                m.value_type(),
            ),
            _ => return None,
        };
        let normalized = typed_nil(&self.expected, elem);
        let expected = normalized.as_ref().unwrap_or(&self.expected);
        Some(items.into_iter().any(|item| ctx.matches(item, expected)))
    }
}

impl fmt::Display for Contains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Contains({})", self.expected)
    }
}

impl Operator for Contains {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let got = got.concrete();
        match self.contains(ctx, got) {
            Some(true) => Ok(()),
            Some(false) => self.base.collect(ctx, || {
                MatchError::new(ErrorKind::ValueMismatch, "does not contain")
                    .got(got)
                    .expected(self)
            }),
            None => self
                .base
                .collect(ctx, || bad_kind(got, "String, Vec, array or Map")),
        }
    }
}

/// Got (a string, slice, array or map) contains `expected`.
///
/// ```
/// use deepmatch::ops::{contains, gt};
///
/// assert!(deepmatch::eq_deeply("foobar", contains("oba")));
/// assert!(deepmatch::eq_deeply(vec![1i64, 5, 9], contains(gt(8i64))));
/// assert!(!deepmatch::eq_deeply(vec![1i64, 5], contains(9i64)));
/// ```
#[track_caller]
#[must_use]
pub fn contains(expected: impl IntoValue) -> Value {
    op(Contains {
        base: OpBase::new("Contains"),
        expected: expected.into_value(),
    })
}

/// Got is a map with a key matching the expected one.
pub struct ContainsKey {
    base: OpBase,
    key: Value,
}

impl fmt::Display for ContainsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContainsKey({})", self.key)
    }
}

impl Operator for ContainsKey {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let got = got.concrete();
        let Value::Map(map) = got else {
            return self.base.collect(ctx, || bad_kind(got, "Map"));
        };
        let normalized = typed_nil(&self.key, map.key_type());
        let key = normalized.as_ref().unwrap_or(&self.key);
        let found = map
            .entries()
            .unwrap_or_default()
            .iter()
            .any(|(k, _)| ctx.matches(k, key));
        if found {
            return Ok(());
        }
        self.base.collect(ctx, || {
            MatchError::new(ErrorKind::ValueMismatch, "does not contain key")
                .got(got)
                .expected(self)
        })
    }
}

#[track_caller]
#[must_use]
pub fn contains_key(key: impl IntoValue) -> Value {
    op(ContainsKey {
        base: OpBase::new("ContainsKey"),
        key: key.into_value(),
    })
}
