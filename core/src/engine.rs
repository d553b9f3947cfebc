//! The recursive matcher
//!
//! [`deep_value_equal`] walks a got value and an expected value in lock-step.
//! At each step it decides, in this order:
//!
//! 1. an anchor placeholder in expected is replaced by its rule;
//! 2. a rule node on the got side is rejected (unless tolerated);
//! 3. a rule node on the expected side takes over ([`match_operator`]);
//! 4. untyped nil on either side;
//! 5. differing types: interfaces are unwrapped, laxness converts, otherwise
//!    a type mismatch;
//! 6. same types: one strategy per kind.
//!
//! Every mismatch goes through [`Context::collect`]. `Ok` from a collect
//! means "recorded, keep walking siblings"; `Err` means "stop" (boolean-only
//! mode or error limit reached) and is propagated with `?`.

use std::sync::Arc;

use crate::callback::{self, Outcome};
use crate::context::Context;
use crate::error::{ErrorKind, MatchError, MatchResult};
use crate::operator::Operator;
use crate::path::PathStep;
use crate::value::{same_key, Map, Ptr, Slice, StructValue, Value};

/// Placeholder rendering for a side that has no value.
pub(crate) const NON_EXISTENT: &str = "<non-existent value>";

/// Compare `got` against `expected` at the current path of `ctx`.
pub fn deep_value_equal(ctx: &mut Context<'_>, got: &Value, expected: &Value) -> MatchResult {
    if let Some(op) = ctx.resolve_anchor(expected) {
        tracing::trace!(operator = op.name(), path = %ctx.path(), "resolved anchor");
        return match_operator(ctx, op.as_ref(), got);
    }

    if let Value::Op(got_op) = got {
        if !ctx.operator_in_got() {
            return ctx.collect_with(|| {
                MatchError::new(
                    ErrorKind::OperatorOnGot,
                    "found an operator in the got value, rules belong on the expected side",
                )
                .got(got)
                .expected(expected)
            });
        }
        return match expected {
            Value::Op(exp_op) if Arc::ptr_eq(got_op, exp_op) => Ok(()),
            Value::Op(exp_op) => match_operator(ctx, exp_op.as_ref(), got),
            _ => values_differ(ctx, got, expected),
        };
    }

    if let Value::Op(op) = expected {
        return match_operator(ctx, op.as_ref(), got);
    }

    if got.is_invalid() || expected.is_invalid() {
        let other = if got.is_invalid() { expected } else { got };
        if other.is_invalid() || matches!(other, Value::Interface(i) if i.is_nil()) {
            return Ok(());
        }
        return ctx.collect_with(|| {
            MatchError::new(ErrorKind::NilMismatch, "values differ")
                .got(got)
                .expected(expected)
        });
    }

    let got_ty = got.ty();
    let expected_ty = expected.ty();
    if got_ty != expected_ty {
        if let Value::Interface(i) = got {
            if let Some(inner) = i.inner() {
                return deep_value_equal(ctx, inner, expected);
            }
        }
        if let Value::Interface(i) = expected {
            if let Some(inner) = i.inner() {
                return deep_value_equal(ctx, got, inner);
            }
        }
        if ctx.be_lax() {
            if let Some(converted) = got_ty.as_ref().and_then(|t| expected.convert_to(t)) {
                return deep_value_equal(ctx, got, &converted);
            }
        }
        return ctx.collect_with(|| {
            MatchError::new(ErrorKind::TypeMismatch, "type mismatch")
                .got(got_ty.map_or_else(|| "nil".to_string(), |t| t.to_string()))
                .expected(expected_ty.map_or_else(|| "nil".to_string(), |t| t.to_string()))
        });
    }

    match (got, expected) {
        (Value::Bool(a), Value::Bool(b)) => scalar(ctx, a == b, got, expected),
        (Value::Int(_, a), Value::Int(_, b)) => scalar(ctx, a == b, got, expected),
        (Value::Uint(_, a), Value::Uint(_, b)) => scalar(ctx, a == b, got, expected),
        (Value::Float(_, a), Value::Float(_, b)) => scalar(ctx, a == b, got, expected),
        (Value::String(a), Value::String(b)) => scalar(ctx, a == b, got, expected),
        (Value::Ptr(g), Value::Ptr(e)) => compare_ptr(ctx, got, expected, g, e),
        (Value::Slice(g), Value::Slice(e)) => compare_slice(ctx, got, expected, g, e),
        (Value::Array(g), Value::Array(e)) => compare_items(ctx, g.items(), e.items()),
        (Value::Map(g), Value::Map(e)) => compare_map(ctx, got, expected, g, e),
        (Value::Struct(g), Value::Struct(e)) => compare_struct(ctx, g, e),
        (Value::Interface(g), Value::Interface(e)) => match (g.inner(), e.inner()) {
            (None, None) => Ok(()),
            (Some(gi), Some(ei)) => deep_value_equal(ctx, gi, ei),
            _ => ctx.collect_with(|| {
                MatchError::new(ErrorKind::NilMismatch, "values differ")
                    .got(got)
                    .expected(expected)
            }),
        },
        (Value::Func(g), Value::Func(e)) => {
            if g.is_nil() && e.is_nil() {
                return Ok(());
            }
            ctx.collect_with(|| {
                MatchError::new(ErrorKind::CannotCompare, "functions mismatch")
                    .summary("<can not be compared>")
            })
        }
        (Value::Chan(g), Value::Chan(e)) => scalar(ctx, g.addr() == e.addr(), got, expected),
        (Value::Error(g), Value::Error(e)) => {
            // value equality; identity matters only to ErrorIs
            scalar(ctx, g.ptr_eq(e) || g.message() == e.message(), got, expected)
        }
        _ => ctx.collect_with(|| {
            MatchError::new(ErrorKind::TypeMismatch, "type mismatch")
                .got(got)
                .expected(expected)
        }),
    }
}

/// Hand `got` over to a rule node, after the usage and nil checks.
pub fn match_operator(ctx: &mut Context<'_>, op: &dyn Operator, got: &Value) -> MatchResult {
    tracing::trace!(operator = op.name(), path = %ctx.path(), "dispatching to operator");

    if let Some(usage) = op.usage_error() {
        return ctx.collect_with(|| {
            let err = MatchError::new(
                ErrorKind::Usage,
                format!("bad usage of {} operator", op.name()),
            )
            .summary(usage.to_string());
            match op.location() {
                Some(location) => err.located(location),
                None => err,
            }
        });
    }

    let nil_got = match got {
        Value::Invalid => true,
        Value::Interface(i) => i.is_nil(),
        _ => false,
    };
    if nil_got && !op.handle_invalid() {
        return ctx.collect_with(|| {
            let err = MatchError::new(ErrorKind::NilMismatch, "nil value")
                .got("nil")
                .expected(op);
            match op.location() {
                Some(location) => err.located(location),
                None => err,
            }
        });
    }

    op.match_value(ctx, got)
}

pub(crate) fn values_differ(ctx: &mut Context<'_>, got: &Value, expected: &Value) -> MatchResult {
    ctx.collect_with(|| {
        MatchError::new(ErrorKind::ValueMismatch, "values differ")
            .got(got)
            .expected(expected)
    })
}

fn scalar(ctx: &mut Context<'_>, equal: bool, got: &Value, expected: &Value) -> MatchResult {
    if equal {
        Ok(())
    } else {
        values_differ(ctx, got, expected)
    }
}

fn nil_or_not(nil: bool) -> &'static str {
    if nil {
        "nil"
    } else {
        "not nil"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Reference kinds
// ═══════════════════════════════════════════════════════════════════════════════

fn compare_ptr(
    ctx: &mut Context<'_>,
    got: &Value,
    expected: &Value,
    g: &Ptr,
    e: &Ptr,
) -> MatchResult {
    match (g.addr(), e.addr()) {
        (None, None) => Ok(()),
        (Some(a), Some(b)) if a == b => Ok(()),
        (Some(_), Some(_)) => {
            if ctx.visited().enter(got, expected) {
                return Ok(());
            }
            let res = ctx.descend(PathStep::Deref, |ctx| match (g.get(), e.get()) {
                (Some(gv), Some(ev)) => deep_value_equal(ctx, gv, ev),
                (None, None) => Ok(()),
                _ => values_differ(ctx, got, expected),
            });
            ctx.visited().leave(got, expected);
            res
        }
        _ => ctx.collect_with(|| {
            MatchError::new(ErrorKind::NilMismatch, "values differ")
                .got(got)
                .expected(expected)
        }),
    }
}

fn compare_slice(
    ctx: &mut Context<'_>,
    got: &Value,
    expected: &Value,
    g: &Slice,
    e: &Slice,
) -> MatchResult {
    match (g.items(), e.items()) {
        (None, None) => Ok(()),
        (Some(gi), Some(ei)) => {
            if g.addr() == e.addr() {
                return Ok(());
            }
            if ctx.visited().enter(got, expected) {
                return Ok(());
            }
            let res = compare_items(ctx, gi, ei);
            ctx.visited().leave(got, expected);
            res
        }
        _ => ctx.collect_with(|| {
            MatchError::new(ErrorKind::NilMismatch, "nil slice")
                .got(nil_or_not(g.is_nil()))
                .expected(nil_or_not(e.is_nil()))
        }),
    }
}

/// Element-wise comparison. A length difference is reported once, at the
/// first index present on one side only, listing what is left over.
pub(crate) fn compare_items(ctx: &mut Context<'_>, got: &[Value], expected: &[Value]) -> MatchResult {
    let common = got.len().min(expected.len());
    for (i, (g, e)) in got.iter().zip(expected).enumerate() {
        ctx.descend(PathStep::Index(i), |ctx| deep_value_equal(ctx, g, e))?;
    }
    if got.len() == expected.len() {
        return Ok(());
    }
    ctx.descend(PathStep::Index(common), |ctx| {
        ctx.collect_with(|| {
            if got.len() > expected.len() {
                MatchError::new(ErrorKind::LengthMismatch, "got value out of range")
                    .got(render_rest(&got[common..]))
                    .expected(NON_EXISTENT)
            } else {
                MatchError::new(ErrorKind::LengthMismatch, "expected value out of range")
                    .got(NON_EXISTENT)
                    .expected(render_rest(&expected[common..]))
            }
        })
    })
}

fn render_rest(items: &[Value]) -> String {
    match items {
        [single] => single.to_string(),
        many => {
            let rendered: Vec<String> = many.iter().map(ToString::to_string).collect();
            format!("({})", rendered.join(", "))
        }
    }
}

fn compare_map(
    ctx: &mut Context<'_>,
    got: &Value,
    expected: &Value,
    g: &Map,
    e: &Map,
) -> MatchResult {
    match (g.entries(), e.entries()) {
        (None, None) => Ok(()),
        (Some(_), Some(entries)) => {
            if g.addr() == e.addr() {
                return Ok(());
            }
            if ctx.visited().enter(got, expected) {
                return Ok(());
            }
            let res = compare_map_entries(ctx, g, entries, false, false);
            ctx.visited().leave(got, expected);
            res
        }
        _ => ctx.collect_with(|| {
            MatchError::new(ErrorKind::NilMismatch, "nil map")
                .got(nil_or_not(g.is_nil()))
                .expected(nil_or_not(e.is_nil()))
        }),
    }
}

/// Compare the values of shared keys, then report the key-set difference.
///
/// Expected entries are visited in rendered-key order so the error order
/// does not depend on map iteration order.
pub(crate) fn compare_map_entries(
    ctx: &mut Context<'_>,
    got: &Map,
    expected: &[(Value, Value)],
    allow_missing: bool,
    allow_extra: bool,
) -> MatchResult {
    let mut sorted: Vec<(String, &Value, &Value)> = expected
        .iter()
        .map(|(k, v)| (k.to_string(), k, v))
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut missing = Vec::new();
    for (rendered, key, exp_value) in sorted {
        match got.get(key) {
            Some(got_value) => {
                ctx.descend(PathStep::MapKey(rendered), |ctx| {
                    deep_value_equal(ctx, got_value, exp_value)
                })?;
            }
            None if !allow_missing => missing.push(rendered),
            None => {}
        }
    }

    let mut extra: Vec<String> = if allow_extra {
        Vec::new()
    } else {
        got.entries()
            .unwrap_or_default()
            .iter()
            .filter(|(k, _)| !expected.iter().any(|(ek, _)| same_key(k, ek)))
            .map(|(k, _)| k.to_string())
            .collect()
    };
    extra.sort();

    if missing.is_empty() && extra.is_empty() {
        return Ok(());
    }
    ctx.collect_with(|| {
        MatchError::new(ErrorKind::SetMismatch, "comparing hash keys of %%")
            .summary(set_summary("key", &missing, &extra))
    })
}

/// `Missing 2 keys: ("a", "b")` / `Extra item: 3` lines for set-like errors.
/// Both lists must already be sorted.
pub(crate) fn set_summary(noun: &str, missing: &[String], extra: &[String]) -> String {
    let line = |label: &str, items: &[String]| match items {
        [single] => format!("{label} {noun}: {single}"),
        many => format!("{label} {} {noun}s: ({})", many.len(), many.join(", ")),
    };
    let mut lines = Vec::with_capacity(2);
    if !missing.is_empty() {
        lines.push(line("Missing", missing));
    }
    if !extra.is_empty() {
        lines.push(line("Extra", extra));
    }
    lines.join("\n")
}

// ═══════════════════════════════════════════════════════════════════════════════
// Structs
// ═══════════════════════════════════════════════════════════════════════════════

fn compare_struct(ctx: &mut Context<'_>, got: &StructValue, expected: &StructValue) -> MatchResult {
    if ctx.config().uses_equal(got.name()) {
        if let Some(equal) = got.equal_method() {
            return match callback::invoke(|| equal(got, expected)) {
                Outcome::Returned(true) => Ok(()),
                Outcome::Returned(false) => ctx.collect_with(|| {
                    MatchError::new(ErrorKind::ValueMismatch, "got.equal(expected) failed")
                        .got(Value::Struct(got.clone()))
                        .expected(Value::Struct(expected.clone()))
                }),
                Outcome::Panicked(report) => ctx.descend(PathStep::PanicReturn, |ctx| {
                    ctx.collect(report.into_error("equal method panicked"))
                }),
            };
        }
    }

    let same_layout = got.fields().len() == expected.fields().len()
        && got
            .fields()
            .iter()
            .zip(expected.fields())
            .all(|(g, e)| g.name == e.name && g.exported == e.exported);
    if !same_layout {
        return ctx.collect_with(|| {
            let names = |s: &StructValue| {
                let names: Vec<&str> = s.fields().iter().map(|f| &*f.name).collect();
                format!("{} {{ {} }}", s.name(), names.join(", "))
            };
            MatchError::new(ErrorKind::TypeMismatch, "struct layouts differ")
                .got(names(got))
                .expected(names(expected))
        });
    }

    let skip_unexported = ctx.config().ignores_unexported(got.name());
    for (g, e) in got.fields().iter().zip(expected.fields()) {
        if skip_unexported && !g.exported {
            continue;
        }
        ctx.descend(PathStep::Field(Arc::clone(&g.name)), |ctx| {
            deep_value_equal(ctx, &g.value, &e.value)
        })?;
    }
    Ok(())
}
