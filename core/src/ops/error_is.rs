//! Wrapped-error membership.

use std::fmt;

use crate::context::Context;
use crate::error::{ErrorKind, MatchError, MatchResult};
use crate::operator::{op, op_base_accessors, OpBase, Operator};
use crate::value::{IntoValue, Type, Value};

/// Got is an error whose `source()` chain holds the expected one.
///
/// The expected side is either an error (found by identity, see
/// [`ErrorValue::is`](crate::ErrorValue::is)), a rule or string applied to
/// every message of the chain, or nil for "no error".
pub struct ErrorIs {
    base: OpBase,
    expected: Value,
}

impl ErrorIs {
    fn fail(&self, ctx: &mut Context<'_>, got: &Value, message: &'static str) -> MatchResult {
        self.base.collect(ctx, || {
            MatchError::new(ErrorKind::ValueMismatch, message)
                .got(got)
                .expected(&self.expected)
        })
    }
}

impl fmt::Display for ErrorIs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ErrorIs({})", self.expected)
    }
}

impl Operator for ErrorIs {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let got = got.concrete();
        match got {
            Value::Invalid | Value::Interface(_) => {
                if self.expected.is_invalid() {
                    return Ok(());
                }
                self.base.collect(ctx, || {
                    MatchError::new(ErrorKind::NilMismatch, "nil error")
                        .got("nil")
                        .expected(&self.expected)
                })
            }
            Value::Error(err) => {
                let found = match &self.expected {
                    Value::Invalid => false,
                    Value::Error(expected) => err.chain().any(|link| expected.is(link)),
                    rule => err
                        .chain()
                        .map(|link| Value::String(link.to_string()))
                        .any(|message| ctx.matches(&message, rule)),
                };
                if found {
                    Ok(())
                } else {
                    self.fail(ctx, got, "is not the error")
                }
            }
            other => self.base.collect(ctx, || {
                MatchError::new(ErrorKind::TypeMismatch, "type mismatch")
                    .got(other.ty().map_or_else(|| "nil".to_string(), |t| t.to_string()))
                    .expected(Type::Error)
            }),
        }
    }

    fn type_behind(&self) -> Option<Type> {
        Some(Type::Error)
    }

    fn handle_invalid(&self) -> bool {
        true
    }
}

/// Got's error chain contains `expected`.
///
/// ```
/// use deepmatch::ops::{error_is, has_prefix};
/// use deepmatch::{ErrorValue, Value};
///
/// let err = Value::Error(ErrorValue::new(std::io::Error::other("disk full")));
/// assert!(deepmatch::eq_deeply(err.clone(), error_is(has_prefix("disk"))));
/// assert!(deepmatch::eq_deeply(Value::Invalid, error_is(Value::Invalid)));
/// ```
#[track_caller]
#[must_use]
pub fn error_is(expected: impl IntoValue) -> Value {
    op(ErrorIs {
        base: OpBase::new("ErrorIs"),
        expected: expected.into_value(),
    })
}
