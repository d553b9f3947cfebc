//! deepmatch-test: conformance tooling and extension rules
//!
//! Shows how rules are built outside the core crate: [`Sorted`] and
//! [`Unique`] implement [`Operator`] against the public API only, and
//! [`register_test_rules`] makes them loadable from expectation documents.
//!
//! # Example
//!
//! ```
//! use deepmatch_test::prelude::*;
//!
//! assert!(eq_deeply(vec![1i64, 2, 2, 5], sorted()));
//! assert!(!eq_deeply(vec!["a", "b", "a"], unique()));
//!
//! let (recorder, t) = recording();
//! t.cmp(vec![3i64, 1], sorted());
//! assert_eq!(recorder.len(), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use deepmatch::{
    op, Assert, Context, ErrorKind, MatchError, MatchResult, OpBase, Operator, OperatorLocation,
    PathStep, Recorder, Value,
};

#[cfg(feature = "fixtures")]
pub mod fixture;

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{recording, sorted, sorted_desc, unique, Sorted, Unique};
    pub use deepmatch::prelude::*;
}

/// An [`Assert`] feeding a [`Recorder`] the caller keeps a handle on.
#[must_use]
pub fn recording() -> (Arc<Recorder>, Assert<Arc<Recorder>>) {
    let recorder = Arc::new(Recorder::new());
    let t = Assert::new(Arc::clone(&recorder));
    (recorder, t)
}

fn items<'v>(
    base: &OpBase,
    ctx: &mut Context<'_>,
    got: &'v Value,
) -> Result<&'v [Value], MatchResult> {
    match got {
        Value::Slice(s) if s.is_nil() => Ok(&[]),
        other => other.as_items().ok_or_else(|| {
            let location = base.location();
            ctx.collect_with(|| {
                MatchError::new(ErrorKind::TypeMismatch, "bad kind")
                    .got(other.ty().map_or_else(|| "nil".to_string(), |t| t.to_string()))
                    .expected("Vec or array")
                    .located(location)
            })
        }),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sorted
// ═══════════════════════════════════════════════════════════════════════════════

/// Items of got are in non-decreasing (or non-increasing) order.
pub struct Sorted {
    base: OpBase,
    descending: bool,
}

impl fmt::Display for Sorted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.descending {
            "SortedDesc()"
        } else {
            "Sorted()"
        })
    }
}

impl Operator for Sorted {
    fn name(&self) -> &'static str {
        self.base.name()
    }

    fn location(&self) -> Option<OperatorLocation> {
        Some(self.base.location())
    }

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let got = got.concrete();
        let items = match items(&self.base, ctx, got) {
            Ok(items) => items,
            Err(res) => return res,
        };
        for (i, pair) in items.windows(2).enumerate() {
            let bound = if self.descending {
                deepmatch::ops::lte(pair[0].clone())
            } else {
                deepmatch::ops::gte(pair[0].clone())
            };
            if !ctx.matches(&pair[1], &bound) {
                let location = self.base.location();
                return ctx.descend(PathStep::Index(i + 1), |ctx| {
                    ctx.collect_with(|| {
                        MatchError::new(ErrorKind::ValueMismatch, "out of order")
                            .got(&pair[1])
                            .expected(bound)
                            .located(location)
                    })
                });
            }
        }
        Ok(())
    }
}

#[track_caller]
fn sorted_rule(name: &'static str, descending: bool) -> Value {
    op(Sorted {
        base: OpBase::new(name),
        descending,
    })
}

/// Got is a slice or array sorted in non-decreasing order.
#[track_caller]
#[must_use]
pub fn sorted() -> Value {
    sorted_rule("Sorted", false)
}

/// Got is a slice or array sorted in non-increasing order.
#[track_caller]
#[must_use]
pub fn sorted_desc() -> Value {
    sorted_rule("SortedDesc", true)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Unique
// ═══════════════════════════════════════════════════════════════════════════════

/// No two items of got are deeply equal.
pub struct Unique {
    base: OpBase,
}

impl fmt::Display for Unique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unique()")
    }
}

impl Operator for Unique {
    fn name(&self) -> &'static str {
        self.base.name()
    }

    fn location(&self) -> Option<OperatorLocation> {
        Some(self.base.location())
    }

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let got = got.concrete();
        let items = match items(&self.base, ctx, got) {
            Ok(items) => items,
            Err(res) => return res,
        };
        for (i, item) in items.iter().enumerate() {
            let Some(first) = items[..i].iter().position(|prev| ctx.matches(item, prev)) else {
                continue;
            };
            let location = self.base.location();
            return ctx.descend(PathStep::Index(i), |ctx| {
                ctx.collect_with(|| {
                    MatchError::new(ErrorKind::ValueMismatch, "duplicate item")
                        .summary(format!("{item} already seen at index {first}"))
                        .located(location)
                })
            });
        }
        Ok(())
    }
}

/// Got is a slice or array without duplicates.
#[track_caller]
#[must_use]
pub fn unique() -> Value {
    op(Unique {
        base: OpBase::new("Unique"),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry support (feature = "registry")
// ═══════════════════════════════════════════════════════════════════════════════

/// Register core rules plus `Sorted`, `SortedDesc` and `Unique`.
#[cfg(feature = "registry")]
#[must_use]
pub fn register_test_rules(builder: deepmatch::RuleRegistryBuilder) -> deepmatch::RuleRegistryBuilder {
    deepmatch::register_core_rules(builder)
        .rule("Sorted", |args| {
            let [] = deepmatch::exact_args::<0>("Sorted", args)?;
            Ok(sorted())
        })
        .rule("SortedDesc", |args| {
            let [] = deepmatch::exact_args::<0>("SortedDesc", args)?;
            Ok(sorted_desc())
        })
        .rule("Unique", |args| {
            let [] = deepmatch::exact_args::<0>("Unique", args)?;
            Ok(unique())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepmatch::{eq_deeply, eq_deeply_error, ops};

    #[test]
    fn test_sorted() {
        assert!(eq_deeply(vec![1i64, 1, 4], sorted()));
        assert!(eq_deeply(Vec::<i64>::new(), sorted()));
        assert!(eq_deeply(["a", "b", "c"], sorted()));
        assert!(eq_deeply(vec![9i64, 3, 3], sorted_desc()));

        let err = eq_deeply_error(vec![1i64, 5, 2], sorted()).unwrap_err();
        assert_eq!(err.path(), "DATA[2]");
        assert_eq!(err.message(), "out of order");
        assert_eq!(err.expected_rendering(), Some("≥ 5"));
    }

    #[test]
    fn test_unique() {
        assert!(eq_deeply(vec!["a", "b"], unique()));
        let err = eq_deeply_error(vec![1i64, 2, 1], unique()).unwrap_err();
        assert_eq!(err.path(), "DATA[2]");
        assert_eq!(err.summary_text(), Some("1 already seen at index 0"));
    }

    #[test]
    fn test_bad_kind_is_located() {
        let err = eq_deeply_error(3i64, unique()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(err.location().map(|l| l.to_string().contains("Unique")), Some(true));
    }

    #[test]
    fn test_composes_with_core_rules() {
        let rule = ops::all([sorted(), unique(), ops::len(3i64)]);
        assert!(eq_deeply(vec![1i64, 2, 3], rule.clone()));
        assert!(!eq_deeply(vec![1i64, 1, 3], rule));
    }

    #[test]
    fn test_recording_helper() {
        let (recorder, t) = recording();
        assert!(t.cmp(1i64, 1i64));
        assert!(!t.cmp(1i64, 2i64));
        assert_eq!(recorder.len(), 1);
    }
}

#[cfg(all(test, feature = "registry"))]
mod registry_tests {
    use super::*;
    use deepmatch::json::from_json;
    use deepmatch::{eq_deeply, RuleRegistryBuilder};
    use serde_json::json;

    #[test]
    fn test_extension_rules_load() {
        let registry = register_test_rules(RuleRegistryBuilder::new()).build();
        assert!(registry.contains("Sorted"));
        assert!(registry.contains("Bag"));

        let expected = registry
            .load(&json!({"ids": {"$op": "All", "args": [{"$op": "Sorted"}, {"$op": "Unique"}]}}))
            .unwrap();
        assert!(eq_deeply(from_json(&json!({"ids": [1, 4, 9]})), expected.clone()));
        assert!(!eq_deeply(from_json(&json!({"ids": [4, 1]})), expected));
    }
}
