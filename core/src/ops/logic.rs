//! Literal, wildcard and logical combinators.

use std::fmt;

use crate::context::Context;
use crate::error::{ErrorKind, MatchError, MatchResult};
use crate::operator::{op, op_base_accessors, OpBase, Operator};
use crate::ops::join;
use crate::path::PathStep;
use crate::value::{IntoValue, Type, Value};

// ═══════════════════════════════════════════════════════════════════════════════
// Equal / Ignore
// ═══════════════════════════════════════════════════════════════════════════════

/// Plain deep equality, as a rule node.
pub struct Equal {
    base: OpBase,
    expected: Value,
}

impl Equal {
    #[track_caller]
    #[must_use]
    pub fn new(expected: Value) -> Self {
        Self {
            base: OpBase::new("Equal"),
            expected,
        }
    }
}

impl fmt::Display for Equal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expected)
    }
}

impl Operator for Equal {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        ctx.compare(got, &self.expected)
    }

    fn type_behind(&self) -> Option<Type> {
        self.expected.ty()
    }

    fn handle_invalid(&self) -> bool {
        true
    }
}

/// Compares deeply with `expected`.
#[track_caller]
#[must_use]
pub fn equal(expected: impl IntoValue) -> Value {
    op(Equal::new(expected.into_value()))
}

/// Matches anything, nil included.
pub struct Ignore {
    base: OpBase,
}

impl fmt::Display for Ignore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Ignore()")
    }
}

impl Operator for Ignore {
    op_base_accessors!();

    fn match_value(&self, _ctx: &mut Context<'_>, _got: &Value) -> MatchResult {
        Ok(())
    }

    fn handle_invalid(&self) -> bool {
        true
    }
}

#[track_caller]
#[must_use]
pub fn ignore() -> Value {
    op(Ignore {
        base: OpBase::new("Ignore"),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// All / Any / None / Not
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Logic {
    All,
    Any,
    None,
}

/// Conjunction, disjunction and negated disjunction over expected values.
pub struct Combinator {
    base: OpBase,
    logic: Logic,
    items: Vec<Value>,
}

impl Combinator {
    fn all(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let total = self.items.len();
        for (i, item) in self.items.iter().enumerate() {
            let label = format!("<All#{}/{total}>", i + 1);
            let res = ctx.descend(PathStep::Custom(label), |ctx| ctx.compare_final(got, item));
            if let Err(origin) = res {
                if ctx.is_boolean() {
                    return Err(origin);
                }
                return self.base.collect(ctx, || {
                    MatchError::new(
                        ErrorKind::ValueMismatch,
                        format!("compared (part {} of {total})", i + 1),
                    )
                    .got(got)
                    .expected(item)
                    .origin(origin)
                });
            }
        }
        Ok(())
    }

    fn any(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        if self.items.iter().any(|item| ctx.matches(got, item)) {
            return Ok(());
        }
        self.base.collect(ctx, || {
            MatchError::new(ErrorKind::ValueMismatch, "comparing with Any")
                .got(got)
                .expected(self)
        })
    }

    fn none(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let total = self.items.len();
        for (i, item) in self.items.iter().enumerate() {
            if ctx.matches(got, item) {
                return self.base.collect(ctx, || {
                    MatchError::new(
                        ErrorKind::ValueMismatch,
                        format!("comparing with None (part {} of {total} is OK)", i + 1),
                    )
                    .got(got)
                    .expected(item)
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.base.name(), join(&self.items))
    }
}

impl Operator for Combinator {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        match self.logic {
            Logic::All => self.all(ctx, got),
            Logic::Any => self.any(ctx, got),
            Logic::None => self.none(ctx, got),
        }
    }

    /// The single type shared by every typed item, if any.
    fn type_behind(&self) -> Option<Type> {
        if self.logic == Logic::None {
            return None;
        }
        let mut types = self.items.iter().filter_map(Value::ty);
        let first = types.next()?;
        types.all(|t| t == first).then_some(first)
    }

    fn handle_invalid(&self) -> bool {
        true
    }
}

#[track_caller]
fn combinator<I>(name: &'static str, logic: Logic, items: I) -> Value
where
    I: IntoIterator,
    I::Item: IntoValue,
{
    op(Combinator {
        base: OpBase::new(name),
        logic,
        items: items.into_iter().map(IntoValue::into_value).collect(),
    })
}

/// Matches if every item matches.
///
/// ```
/// use deepmatch::ops::{all, gt, lt};
///
/// assert!(deepmatch::eq_deeply(5i64, all([gt(0i64), lt(10i64)])));
/// assert!(!deepmatch::eq_deeply(15i64, all([gt(0i64), lt(10i64)])));
/// ```
#[track_caller]
#[must_use]
pub fn all<I>(items: I) -> Value
where
    I: IntoIterator,
    I::Item: IntoValue,
{
    combinator("All", Logic::All, items)
}

/// Matches if at least one item matches.
#[track_caller]
#[must_use]
pub fn any<I>(items: I) -> Value
where
    I: IntoIterator,
    I::Item: IntoValue,
{
    combinator("Any", Logic::Any, items)
}

/// Matches if no item matches.
#[track_caller]
#[must_use]
pub fn none<I>(items: I) -> Value
where
    I: IntoIterator,
    I::Item: IntoValue,
{
    combinator("None", Logic::None, items)
}

/// Matches if `item` does not.
pub struct Not {
    base: OpBase,
    item: Value,
}

impl fmt::Display for Not {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Not({})", self.item)
    }
}

impl Operator for Not {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        if !ctx.matches(got, &self.item) {
            return Ok(());
        }
        self.base.collect(ctx, || {
            MatchError::new(ErrorKind::ValueMismatch, "comparing with Not")
                .got(got)
                .expected(self)
        })
    }

    fn handle_invalid(&self) -> bool {
        true
    }
}

#[track_caller]
#[must_use]
pub fn not(item: impl IntoValue) -> Value {
    op(Not {
        base: OpBase::new("Not"),
        item: item.into_value(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{between, gt, lt};
    use crate::{eq_deeply, eq_deeply_error};

    #[test]
    fn test_all() {
        let rule = all([gt(0i64), lt(10i64)]);
        assert!(eq_deeply(5i64, rule.clone()));
        assert!(!eq_deeply(15i64, rule.clone()));
        assert!(!eq_deeply(-1i64, rule.clone()));

        let err = eq_deeply_error(15i64, rule).unwrap_err();
        assert_eq!(err.message(), "compared (part 2 of 2)");
        let origin = err.origin_error().unwrap();
        assert_eq!(origin.path(), "DATA<All#2/2>");
        assert_eq!(err.location().unwrap().name, "All");
    }

    #[test]
    fn test_any() {
        let rule = any([gt(10i64), lt(0i64)]);
        assert!(eq_deeply(-1i64, rule.clone()));
        assert!(eq_deeply(15i64, rule.clone()));
        assert!(!eq_deeply(5i64, rule.clone()));
        assert_eq!(
            eq_deeply_error(5i64, rule).unwrap_err().message(),
            "comparing with Any"
        );
    }

    #[test]
    fn test_none() {
        let rule = none([1i64, 2]);
        assert!(eq_deeply(3i64, rule.clone()));
        let err = eq_deeply_error(2i64, rule).unwrap_err();
        assert_eq!(err.message(), "comparing with None (part 2 of 2 is OK)");
    }

    #[test]
    fn test_not() {
        let rule = not(between(1i64, 5i64));
        assert!(eq_deeply(6i64, rule.clone()));
        assert!(!eq_deeply(3i64, rule));
    }

    #[test]
    fn test_nil_handling() {
        assert!(eq_deeply(Value::Invalid, ignore()));
        assert!(eq_deeply(Value::Invalid, equal(Value::Invalid)));
        assert!(eq_deeply(Value::Invalid, not(1i64)));
        assert!(eq_deeply(Value::Invalid, any([1i64.into_value(), Value::Invalid])));
    }

    #[test]
    fn test_display_and_type_behind() {
        let rule = all([gt(0i64), lt(10i64)]);
        assert_eq!(rule.to_string(), "All(> 0, < 10)");
        assert_eq!(rule.ty(), Some(Type::Int(crate::value::IntKind::I64)));
        assert_eq!(any([1i64.into_value(), "x".into_value()]).ty(), None);
    }
}
