//! Type, nil-ness, emptiness and length checks.

use std::fmt;

use crate::context::Context;
use crate::error::{ErrorKind, MatchError, MatchResult};
use crate::operator::{op, op_base_accessors, OpBase, Operator};
use crate::path::PathStep;
use crate::value::{IntoValue, Type, Value};

fn type_name(v: &Value) -> String {
    v.ty().map_or_else(|| "nil".to_string(), |t| t.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Isa
// ═══════════════════════════════════════════════════════════════════════════════

/// Got has exactly the given type.
pub struct Isa {
    base: OpBase,
    ty: Type,
}

impl fmt::Display for Isa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Isa({})", self.ty)
    }
}

impl Operator for Isa {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        if got.ty().as_ref() == Some(&self.ty) || got.concrete().ty().as_ref() == Some(&self.ty) {
            return Ok(());
        }
        self.base.collect(ctx, || {
            MatchError::new(ErrorKind::TypeMismatch, "type mismatch")
                .got(type_name(got.concrete()))
                .expected(&self.ty)
        })
    }

    fn type_behind(&self) -> Option<Type> {
        Some(self.ty.clone())
    }
}

/// Got is a `T`.
///
/// ```
/// use deepmatch::ops::isa;
///
/// assert!(deepmatch::eq_deeply(vec![1u8], isa::<Vec<u8>>()));
/// assert!(!deepmatch::eq_deeply(1i32, isa::<i64>()));
/// ```
#[track_caller]
#[must_use]
pub fn isa<T: IntoValue>() -> Value {
    isa_type(T::static_type())
}

/// Got has type `ty`.
#[track_caller]
#[must_use]
pub fn isa_type(ty: Type) -> Value {
    op(Isa {
        base: OpBase::new("Isa"),
        ty,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Nil / NotNil / Empty / NotEmpty
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    Nil,
    NotNil,
    Empty,
    NotEmpty,
}

/// Nil-ness and emptiness checks. All of them accept a nil got.
pub struct Presence {
    base: OpBase,
    check: Check,
}

/// `None` when emptiness makes no sense for got.
fn is_empty(got: &Value) -> Option<bool> {
    match got.concrete() {
        Value::Invalid => Some(true),
        Value::Ptr(p) if p.is_null() => Some(true),
        Value::Ptr(p) => p.get().map_or(Some(true), is_empty),
        other if other.is_nil() => Some(true),
        other => other.len().map(|n| n == 0),
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self.check {
            Check::Nil => "nil",
            Check::NotNil => "not nil",
            Check::Empty => "Empty()",
            Check::NotEmpty => "NotEmpty()",
        })
    }
}

impl Operator for Presence {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let (ok, kind, message, expected) = match self.check {
            Check::Nil => (got.is_nil(), ErrorKind::NilMismatch, "non-nil", "nil"),
            Check::NotNil => (!got.is_nil(), ErrorKind::NilMismatch, "nil value", "not nil"),
            Check::Empty | Check::NotEmpty => {
                let Some(empty) = is_empty(got) else {
                    return self.base.collect(ctx, || {
                        MatchError::new(ErrorKind::TypeMismatch, "bad kind")
                            .got(type_name(got))
                            .expected("String, Vec, array, Map or pointer to one")
                    });
                };
                if self.check == Check::Empty {
                    (empty, ErrorKind::ValueMismatch, "not empty", "empty")
                } else {
                    (!empty, ErrorKind::ValueMismatch, "empty", "not empty")
                }
            }
        };
        if ok {
            return Ok(());
        }
        self.base.collect(ctx, || {
            MatchError::new(kind, message).got(got).expected(expected)
        })
    }

    fn handle_invalid(&self) -> bool {
        true
    }
}

#[track_caller]
fn presence(name: &'static str, check: Check) -> Value {
    op(Presence {
        base: OpBase::new(name),
        check,
    })
}

/// Got is nil: untyped, or a nil pointer, slice, map, interface, function or
/// channel.
#[track_caller]
#[must_use]
pub fn nil() -> Value {
    presence("Nil", Check::Nil)
}

#[track_caller]
#[must_use]
pub fn not_nil() -> Value {
    presence("NotNil", Check::NotNil)
}

/// Got is nil, or an empty string, slice, array or map, possibly behind
/// pointers.
#[track_caller]
#[must_use]
pub fn empty() -> Value {
    presence("Empty", Check::Empty)
}

#[track_caller]
#[must_use]
pub fn not_empty() -> Value {
    presence("NotEmpty", Check::NotEmpty)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Len
// ═══════════════════════════════════════════════════════════════════════════════

/// Compares the length of got (as a `usize`) with laxness on, so any integer
/// or numeric rule works as expected length.
pub struct Len {
    base: OpBase,
    expected: Value,
}

impl fmt::Display for Len {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "len={}", self.expected)
    }
}

impl Operator for Len {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let got = got.concrete();
        let Some(len) = got.len() else {
            return self.base.collect(ctx, || {
                MatchError::new(ErrorKind::TypeMismatch, "bad kind")
                    .got(type_name(got))
                    .expected("String, Vec, array or Map")
            });
        };
        let len = len.into_value();
        ctx.descend(PathStep::Func("len"), |ctx| {
            ctx.with_lax(true, |ctx| ctx.compare(&len, &self.expected))
        })
    }
}

/// `len(got)` matches `expected`.
///
/// ```
/// use deepmatch::ops::{gt, len};
///
/// assert!(deepmatch::eq_deeply(vec![1, 2, 3], len(3i64)));
/// assert!(deepmatch::eq_deeply("abc", len(gt(2i64))));
/// ```
#[track_caller]
#[must_use]
pub fn len(expected: impl IntoValue) -> Value {
    op(Len {
        base: OpBase::new("Len"),
        expected: expected.into_value(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Interface, Slice};
    use crate::{eq_deeply, eq_deeply_error};
    use std::collections::HashMap;

    #[test]
    fn test_isa() {
        assert!(eq_deeply(1i64, isa::<i64>()));
        assert!(eq_deeply(Value::Interface(Interface::new("Any", crate::value(1i64))), isa::<i64>()));
        assert!(eq_deeply(Value::Interface(Interface::nil("Shape")), isa_type(Type::interface("Shape"))));
        let err = eq_deeply_error("x", isa::<i64>()).unwrap_err();
        assert_eq!(err.got_rendering(), Some("String"));
        assert_eq!(err.expected_rendering(), Some("i64"));
    }

    #[test]
    fn test_nil_and_not_nil() {
        assert!(eq_deeply(Value::Invalid, nil()));
        assert!(eq_deeply(Option::<i64>::None, nil()));
        assert!(eq_deeply(Value::Slice(Slice::nil(Type::Bool)), nil()));
        assert!(!eq_deeply(Vec::<bool>::new(), nil()));
        assert!(!eq_deeply(0i64, nil()));

        assert!(eq_deeply(Some(1i64), not_nil()));
        let err = eq_deeply_error(Value::Invalid, not_nil()).unwrap_err();
        assert_eq!(err.message(), "nil value");
    }

    #[test]
    fn test_empty() {
        assert!(eq_deeply("", empty()));
        assert!(eq_deeply(Vec::<i64>::new(), empty()));
        assert!(eq_deeply(HashMap::<String, i64>::new(), empty()));
        assert!(eq_deeply(Value::Invalid, empty()));
        assert!(eq_deeply(Some(String::new()), empty()));
        assert!(!eq_deeply(vec![1i64], empty()));
        assert!(eq_deeply(vec![1i64], not_empty()));
        assert!(!eq_deeply(Option::<String>::None, not_empty()));

        let err = eq_deeply_error(5i64, empty()).unwrap_err();
        assert_eq!(err.message(), "bad kind");
    }

    #[test]
    fn test_len() {
        assert!(eq_deeply(vec![1i64, 2], len(2i64)));
        assert!(eq_deeply(vec![1i64, 2], len(2u8)));
        assert!(eq_deeply("héllo", len(6usize)));
        let err = eq_deeply_error(vec![1i64], len(3i64)).unwrap_err();
        assert_eq!(err.path(), "len(DATA)");
        assert!(!eq_deeply(vec![1i64], len(3i64)));
    }

    #[test]
    fn test_len_scoped_laxness() {
        // the override does not leak past the length comparison
        let err = eq_deeply_error(vec![1i32], crate::ops::all([len(1i64), crate::value(vec![1i64])]));
        assert!(err.is_err());
    }
}
