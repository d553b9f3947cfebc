//! Ordering rules: ranges, one-sided bounds and tolerance.
//!
//! Bounds are numbers or strings. Bounds given out of order are swapped at
//! construction. With laxness on, any numeric got is compared to numeric
//! bounds regardless of width or signedness.

use std::cmp::Ordering;
use std::fmt;

use crate::context::Context;
use crate::error::{ErrorKind, MatchError, MatchResult, UsageError};
use crate::operator::{op, op_base_accessors, OpBase, Operator};
use crate::value::{IntoValue, Type, Value};

/// Inclusiveness of the two bounds of [`between_bounds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bounds {
    /// `from ≤ got ≤ to`
    #[default]
    InIn,
    /// `from ≤ got < to`
    InOut,
    /// `from < got ≤ to`
    OutIn,
    /// `from < got < to`
    OutOut,
}

impl Bounds {
    fn inclusive(self) -> (bool, bool) {
        match self {
            Self::InIn => (true, true),
            Self::InOut => (true, false),
            Self::OutIn => (false, true),
            Self::OutOut => (false, false),
        }
    }
}

#[derive(Clone)]
struct Bound {
    value: Value,
    inclusive: bool,
}

enum Shape {
    Between,
    Gt,
    Gte,
    Lt,
    Lte,
    Approx { num: Value, tolerance: Value },
}

/// A lower and/or upper bound on got.
pub struct Ordered {
    base: OpBase,
    lower: Option<Bound>,
    upper: Option<Bound>,
    shape: Shape,
}

struct TypeMismatch;

fn order(lax: bool, got: &Value, bound: &Value) -> Result<Option<Ordering>, TypeMismatch> {
    if let (Value::String(a), Value::String(b)) = (got, bound) {
        return Ok(Some(a.cmp(b)));
    }
    if !lax && got.ty() != bound.ty() {
        return Err(TypeMismatch);
    }
    match (got.as_number(), bound.as_number()) {
        (Some(a), Some(b)) => Ok(a.partial_cmp(b)),
        _ => Err(TypeMismatch),
    }
}

fn orderable(v: &Value) -> bool {
    matches!(
        v,
        Value::Int(..) | Value::Uint(..) | Value::Float(..) | Value::String(_)
    )
}

impl Ordered {
    #[track_caller]
    fn new(name: &'static str, lower: Option<Bound>, upper: Option<Bound>, shape: Shape) -> Self {
        let mut base = OpBase::new(name);
        for bound in lower.iter().chain(upper.iter()) {
            if !orderable(&bound.value) {
                base.flag(UsageError::BadArgument {
                    op: name,
                    reason: format!("cannot order values of type {}", type_name(&bound.value)),
                });
            }
        }
        Self {
            base,
            lower,
            upper,
            shape,
        }
    }

    fn bound_type(&self) -> Option<Type> {
        self.lower.as_ref().or(self.upper.as_ref())?.value.ty()
    }
}

fn type_name(v: &Value) -> String {
    v.ty().map_or_else(|| "nil".to_string(), |t| t.to_string())
}

impl fmt::Display for Ordered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = |b: &Bound, strict: &'static str, loose: &'static str| {
            if b.inclusive {
                loose
            } else {
                strict
            }
        };
        match (&self.shape, &self.lower, &self.upper) {
            (Shape::Approx { num, tolerance }, ..) => write!(f, "{num} ± {tolerance}"),
            (Shape::Between, Some(lo), Some(hi)) => write!(
                f,
                "{} {} got {} {}",
                lo.value,
                sign(lo, "<", "≤"),
                sign(hi, "<", "≤"),
                hi.value
            ),
            (Shape::Gt | Shape::Gte, Some(lo), _) => write!(f, "{} {}", sign(lo, ">", "≥"), lo.value),
            (Shape::Lt | Shape::Lte, _, Some(hi)) => write!(f, "{} {}", sign(hi, "<", "≤"), hi.value),
            _ => f.write_str(self.base.name()),
        }
    }
}

impl Operator for Ordered {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let got = got.concrete();
        let checks = [
            self.lower.as_ref().map(|b| (b, Ordering::Greater)),
            self.upper.as_ref().map(|b| (b, Ordering::Less)),
        ];
        for (bound, wanted) in checks.into_iter().flatten() {
            let ok = match order(ctx.be_lax(), got, &bound.value) {
                Ok(Some(ord)) => ord == wanted || (bound.inclusive && ord == Ordering::Equal),
                Ok(None) => false,
                Err(TypeMismatch) => {
                    return self.base.collect(ctx, || {
                        MatchError::new(ErrorKind::TypeMismatch, "type mismatch")
                            .got(type_name(got))
                            .expected(type_name(&bound.value))
                    });
                }
            };
            if !ok {
                return self.base.collect(ctx, || {
                    MatchError::new(ErrorKind::ValueMismatch, "values differ")
                        .got(got)
                        .expected(self)
                });
            }
        }
        Ok(())
    }

    fn type_behind(&self) -> Option<Type> {
        self.bound_type()
    }
}

/// `from ≤ got ≤ to`.
#[track_caller]
#[must_use]
pub fn between(from: impl IntoValue, to: impl IntoValue) -> Value {
    between_bounds(from, to, Bounds::InIn)
}

/// `from ⋚ got ⋚ to` with the inclusiveness given by `bounds`.
///
/// ```
/// use deepmatch::ops::{between_bounds, Bounds};
///
/// let rule = between_bounds(10i64, 1i64, Bounds::InOut);
/// assert_eq!(rule.to_string(), "1 < got ≤ 10");
/// assert!(deepmatch::eq_deeply(10i64, rule));
/// ```
#[track_caller]
#[must_use]
pub fn between_bounds(from: impl IntoValue, to: impl IntoValue, bounds: Bounds) -> Value {
    let (mut from, mut to) = (from.into_value(), to.into_value());
    let (mut from_in, mut to_in) = bounds.inclusive();

    let mismatch = from.ty() != to.ty();
    if !mismatch && matches!(order(false, &from, &to), Ok(Some(Ordering::Greater))) {
        std::mem::swap(&mut from, &mut to);
        std::mem::swap(&mut from_in, &mut to_in);
    }
    let usage = mismatch.then(|| UsageError::IncompatibleBounds {
        op: "Between",
        from: type_name(&from),
        to: type_name(&to),
    });

    let mut rule = Ordered::new(
        "Between",
        Some(Bound {
            value: from,
            inclusive: from_in,
        }),
        Some(Bound {
            value: to,
            inclusive: to_in,
        }),
        Shape::Between,
    );
    if let Some(usage) = usage {
        rule.base.flag(usage);
    }
    op(rule)
}

#[track_caller]
fn one_sided(name: &'static str, bound: Value, lower: bool, inclusive: bool, shape: Shape) -> Value {
    let bound = Some(Bound {
        value: bound,
        inclusive,
    });
    let (lower, upper) = if lower { (bound, None) } else { (None, bound) };
    op(Ordered::new(name, lower, upper, shape))
}

/// `got > bound`
#[track_caller]
#[must_use]
pub fn gt(bound: impl IntoValue) -> Value {
    one_sided("Gt", bound.into_value(), true, false, Shape::Gt)
}

/// `got ≥ bound`
#[track_caller]
#[must_use]
pub fn gte(bound: impl IntoValue) -> Value {
    one_sided("Gte", bound.into_value(), true, true, Shape::Gte)
}

/// `got < bound`
#[track_caller]
#[must_use]
pub fn lt(bound: impl IntoValue) -> Value {
    one_sided("Lt", bound.into_value(), false, false, Shape::Lt)
}

/// `got ≤ bound`
#[track_caller]
#[must_use]
pub fn lte(bound: impl IntoValue) -> Value {
    one_sided("Lte", bound.into_value(), false, true, Shape::Lte)
}

/// `num - tolerance ≤ got ≤ num + tolerance`. Both must share a numeric type.
#[track_caller]
#[must_use]
pub fn approx(num: impl IntoValue, tolerance: impl IntoValue) -> Value {
    let (num, tolerance) = (num.into_value(), tolerance.into_value());
    let bounds = match (&num, &tolerance) {
        (Value::Int(k, n), Value::Int(_, t)) if num.ty() == tolerance.ty() => Some((
            Value::Int(*k, n.saturating_sub(*t)),
            Value::Int(*k, n.saturating_add(*t)),
        )),
        (Value::Uint(k, n), Value::Uint(_, t)) if num.ty() == tolerance.ty() => Some((
            Value::Uint(*k, n.saturating_sub(*t)),
            Value::Uint(*k, n.saturating_add(*t)),
        )),
        (Value::Float(k, n), Value::Float(_, t)) if num.ty() == tolerance.ty() => {
            Some((Value::Float(*k, n - t), Value::Float(*k, n + t)))
        }
        _ => None,
    };

    let shape = Shape::Approx {
        num: num.clone(),
        tolerance: tolerance.clone(),
    };
    let Some((lo, hi)) = bounds else {
        let mut rule = Ordered::new("N", None, None, shape);
        rule.base.flag(UsageError::BadArgument {
            op: "N",
            reason: format!(
                "number and tolerance must share a numeric type, got {} and {}",
                type_name(&num),
                type_name(&tolerance)
            ),
        });
        return op(rule);
    };
    op(Ordered::new(
        "N",
        Some(Bound {
            value: lo,
            inclusive: true,
        }),
        Some(Bound {
            value: hi,
            inclusive: true,
        }),
        shape,
    ))
}
