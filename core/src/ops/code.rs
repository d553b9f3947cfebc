//! User code as rules: predicates and transforms.
//!
//! Callbacks run behind [`invoke`](crate::callback::invoke); a panic becomes
//! a `Panic` mismatch at `→panic()` instead of unwinding through the test.

use std::fmt;
use std::sync::Arc;

use crate::callback::{invoke, Outcome, PanicReport};
use crate::context::Context;
use crate::error::{ErrorKind, MatchError, MatchResult, UsageError};
use crate::operator::{op, op_base_accessors, OpBase, Operator};
use crate::path::PathStep;
use crate::value::{IntoValue, Value};

type Predicate = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;
type Transform = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

fn report_panic(base: &OpBase, ctx: &mut Context<'_>, report: PanicReport) -> MatchResult {
    ctx.descend(PathStep::PanicReturn, |ctx| {
        base.collect(ctx, || report.into_error(&format!("{} panicked", base.name())))
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Code
// ═══════════════════════════════════════════════════════════════════════════════

/// A predicate over got.
pub struct Code {
    base: OpBase,
    predicate: Predicate,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Code(<fn>)")
    }
}

impl Operator for Code {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        match invoke(|| (self.predicate)(got)) {
            Outcome::Returned(Ok(())) => Ok(()),
            Outcome::Returned(Err(reason)) => self.base.collect(ctx, || {
                let err = MatchError::new(ErrorKind::ValueMismatch, "ran code with %% as argument")
                    .got(got)
                    .expected(self);
                if reason.is_empty() {
                    err
                } else {
                    err.summary(reason)
                }
            }),
            Outcome::Panicked(report) => report_panic(&self.base, ctx, report),
        }
    }
}

/// Matches when `predicate(got)` returns `true`.
///
/// ```
/// use deepmatch::ops::code;
/// use deepmatch::Value;
///
/// let even = code(|v| matches!(v, Value::Int(_, n) if n % 2 == 0));
/// assert!(deepmatch::eq_deeply(4i64, even.clone()));
/// assert!(!deepmatch::eq_deeply(3i64, even));
/// ```
#[track_caller]
#[must_use]
pub fn code(predicate: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Value {
    op(Code {
        base: OpBase::new("Code"),
        predicate: Arc::new(move |v: &Value| if predicate(v) { Ok(()) } else { Err(String::new()) }),
    })
}

/// Like [`code`]; the `Err` text is shown in the failure.
#[track_caller]
#[must_use]
pub fn code_result(predicate: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static) -> Value {
    op(Code {
        base: OpBase::new("Code"),
        predicate: Arc::new(predicate),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Smuggle
// ═══════════════════════════════════════════════════════════════════════════════

/// One accessor of a smuggle path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Access {
    Field(String),
    Index(usize),
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, ".{name}"),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// Parse `a.b[2].c` (a leading dot is allowed).
fn parse_path(path: &str) -> Result<Vec<Access>, String> {
    let mut accesses = Vec::new();
    for (n, segment) in path.strip_prefix('.').unwrap_or(path).split('.').enumerate() {
        let (name, mut rest) = match segment.find('[') {
            Some(i) => segment.split_at(i),
            None => (segment, ""),
        };
        if name.is_empty() && (n > 0 || rest.is_empty()) {
            return Err(format!("empty field name in {path:?}"));
        }
        if !name.is_empty() {
            accesses.push(Access::Field(name.to_string()));
        }
        while !rest.is_empty() {
            let close = rest
                .find(']')
                .ok_or_else(|| format!("unclosed '[' in {path:?}"))?;
            let index = rest[1..close]
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("bad index {:?} in {path:?}", &rest[1..close]))?;
            accesses.push(Access::Index(index));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err(format!("unexpected {rest:?} in {path:?}"));
            }
        }
    }
    Ok(accesses)
}

/// Follow `accesses` from `root`, through pointers and interfaces.
fn navigate(root: &Value, accesses: &[Access]) -> Result<Value, String> {
    let mut current = root.clone();
    for access in accesses {
        loop {
            current = match &current {
                Value::Interface(i) => match i.inner() {
                    Some(inner) => inner.clone(),
                    None => return Err(format!("nil interface before {access}")),
                },
                Value::Ptr(p) => match p.get() {
                    Some(target) => target.clone(),
                    None => return Err(format!("nil pointer before {access}")),
                },
                _ => break,
            };
        }
        current = match (access, &current) {
            (Access::Field(name), Value::Struct(s)) => match s.get(name) {
                Some(field) => field.value.clone(),
                None => return Err(format!("{} has no field {name:?}", s.name())),
            },
            (Access::Field(name), Value::Map(m)) => match m.get(&Value::String(name.clone())) {
                Some(v) => v.clone(),
                None => return Err(format!("key {name:?} not found")),
            },
            (Access::Index(i), got) if got.as_items().is_some() => {
                match got.as_items().and_then(|items| items.get(*i)) {
                    Some(v) => v.clone(),
                    None => return Err(format!("index {i} out of range")),
                }
            }
            (access, got) => {
                return Err(format!(
                    "cannot apply {access} to {}",
                    got.ty().map_or_else(|| "nil".to_string(), |t| t.to_string())
                ));
            }
        };
    }
    Ok(current)
}

/// Transforms got, then compares the result with an expected value.
pub struct Smuggle {
    base: OpBase,
    label: String,
    transform: Transform,
    expected: Value,
}

impl fmt::Display for Smuggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Smuggle({}, {})", self.label, self.expected)
    }
}

impl Operator for Smuggle {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        match invoke(|| (self.transform)(got)) {
            Outcome::Returned(Ok(smuggled)) => {
                let label = self.label.clone();
                ctx.descend(PathStep::Custom(label), |ctx| ctx.compare(&smuggled, &self.expected))
            }
            Outcome::Returned(Err(reason)) => self.base.collect(ctx, || {
                MatchError::new(ErrorKind::ValueMismatch, "ran smuggle code with %% as argument")
                    .summary(reason)
            }),
            Outcome::Panicked(report) => report_panic(&self.base, ctx, report),
        }
    }

    fn handle_invalid(&self) -> bool {
        true
    }
}

/// Compare `transform(got)` with `expected`, at path `DATA<smuggled>`.
///
/// ```
/// use deepmatch::ops::{gt, smuggle};
/// use deepmatch::Value;
///
/// let doubled = smuggle(
///     |v| match v {
///         Value::Int(_, n) => Ok(deepmatch::value(n * 2)),
///         other => Err(format!("not an int: {other}")),
///     },
///     gt(10i64),
/// );
/// assert!(deepmatch::eq_deeply(6i64, doubled));
/// ```
#[track_caller]
#[must_use]
pub fn smuggle(
    transform: impl Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    expected: impl IntoValue,
) -> Value {
    op(Smuggle {
        base: OpBase::new("Smuggle"),
        label: "<smuggled>".to_string(),
        transform: Arc::new(transform),
        expected: expected.into_value(),
    })
}

/// Compare the value found at `path` (like `"a.b[2]"`) inside got with
/// `expected`. Pointers and interfaces along the way are followed; a
/// `String`-keyed map can be entered with a field name.
///
/// ```
/// use deepmatch::ops::smuggle_path;
/// use deepmatch::StructValue;
///
/// let got = StructValue::new("Order")
///     .field("lines", vec![StructValue::new("Line").field("qty", 2i64)]);
/// assert!(deepmatch::eq_deeply(got, smuggle_path("lines[0].qty", 2i64)));
/// ```
#[track_caller]
#[must_use]
pub fn smuggle_path(path: &str, expected: impl IntoValue) -> Value {
    let mut base = OpBase::new("Smuggle");
    let accesses = parse_path(path).unwrap_or_else(|reason| {
        base.flag(UsageError::BadArgument {
            op: "Smuggle",
            reason,
        });
        Vec::new()
    });
    let label: String = accesses.iter().map(ToString::to_string).collect();
    op(Smuggle {
        base,
        label,
        transform: Arc::new(move |got: &Value| navigate(got, &accesses)),
        expected: expected.into_value(),
    })
}
