//! Ordered and unordered container rules over slices and arrays.
//!
//! [`list`] compares element by element, like a literal would, but its items
//! may be rules. The bag and set families ignore order:
//!
//! | rule | missing items | extra items | duplicates |
//! |------|---------------|-------------|------------|
//! | `Bag` | error | error | counted |
//! | `SubBagOf` | allowed | error | counted |
//! | `SuperBagOf` | error | allowed | counted |
//! | `Set` | error | error | ignored |
//! | `SubSetOf` | allowed | error | ignored |
//! | `SuperSetOf` | error | allowed | ignored |
//! | `NotAny` | n/a | none of the items may appear | ignored |

use std::fmt;

use crate::context::Context;
use crate::engine::{compare_items, set_summary};
use crate::error::{ErrorKind, MatchError, MatchResult};
use crate::operator::{op, op_base_accessors, OpBase, Operator};
use crate::ops::join;
use crate::value::{IntoValue, Value};

fn collect_items<I>(items: I) -> Vec<Value>
where
    I: IntoIterator,
    I::Item: IntoValue,
{
    items.into_iter().map(IntoValue::into_value).collect()
}

/// Items of a slice or array got; a nil slice has none.
fn got_items(got: &Value) -> Option<&[Value]> {
    match got {
        Value::Slice(s) => Some(s.items().unwrap_or_default()),
        Value::Array(a) => Some(a.items()),
        _ => None,
    }
}

fn bad_kind(got: &Value) -> MatchError {
    MatchError::new(ErrorKind::TypeMismatch, "bad kind")
        .got(got.ty().map_or_else(|| "nil".to_string(), |t| t.to_string()))
        .expected("Vec or array")
}

// ═══════════════════════════════════════════════════════════════════════════════
// List
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered element-wise comparison.
pub struct List {
    base: OpBase,
    items: Vec<Value>,
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "List({})", join(&self.items))
    }
}

impl Operator for List {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let got = got.concrete();
        match got_items(got) {
            Some(items) => compare_items(ctx, items, &self.items),
            None => self.base.collect(ctx, || bad_kind(got)),
        }
    }
}

/// Got is a slice or array whose items match `items` in order.
///
/// ```
/// use deepmatch::ops::{gt, list};
/// use deepmatch::value;
///
/// assert!(deepmatch::eq_deeply(vec![1i64, 7], list([value(1i64), gt(5i64)])));
/// ```
#[track_caller]
#[must_use]
pub fn list<I>(items: I) -> Value
where
    I: IntoIterator,
    I::Item: IntoValue,
{
    op(List {
        base: OpBase::new("List"),
        items: collect_items(items),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Bags and sets
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Bag,
    SubBag,
    SuperBag,
    Set,
    SubSet,
    SuperSet,
    NotAny,
}

impl Flavor {
    fn is_set(self) -> bool {
        matches!(self, Self::Set | Self::SubSet | Self::SuperSet)
    }

    fn allow_missing(self) -> bool {
        matches!(self, Self::SubBag | Self::SubSet)
    }

    fn allow_extra(self) -> bool {
        matches!(self, Self::SuperBag | Self::SuperSet)
    }
}

/// Order-insensitive container comparison.
pub struct Unordered {
    base: OpBase,
    flavor: Flavor,
    items: Vec<Value>,
}

fn sorted(values: Vec<&Value>) -> Vec<String> {
    let mut rendered: Vec<String> = values.into_iter().map(ToString::to_string).collect();
    rendered.sort();
    rendered
}

impl Unordered {
    /// Indices of expected items consumed, and got items left unmatched.
    fn pair_up<'g>(&self, ctx: &mut Context<'_>, got: &'g [Value]) -> (Vec<bool>, Vec<&'g Value>) {
        let mut used = vec![false; self.items.len()];
        let mut extra = Vec::new();
        for item in got {
            let mut found = false;
            for (i, expected) in self.items.iter().enumerate() {
                if !self.flavor.is_set() && used[i] {
                    continue;
                }
                if ctx.matches(item, expected) {
                    used[i] = true;
                    found = true;
                    if !self.flavor.is_set() {
                        break;
                    }
                }
            }
            if !found {
                extra.push(item);
            }
        }
        (used, extra)
    }

    fn not_any(&self, ctx: &mut Context<'_>, got: &Value, items: &[Value]) -> MatchResult {
        let found: Vec<&Value> = self
            .items
            .iter()
            .filter(|expected| items.iter().any(|item| ctx.matches(item, expected)))
            .collect();
        if found.is_empty() {
            return Ok(());
        }
        let found = sorted(found);
        self.base.collect(ctx, || {
            MatchError::new(ErrorKind::SetMismatch, "comparing %% as a NotAny")
                .got(got)
                .expected(self)
                .summary(set_summary("item", &[], &found))
        })
    }
}

impl fmt::Display for Unordered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.base.name(), join(&self.items))
    }
}

impl Operator for Unordered {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let got = got.concrete();
        let Some(items) = got_items(got) else {
            return self.base.collect(ctx, || bad_kind(got));
        };
        if self.flavor == Flavor::NotAny {
            return self.not_any(ctx, got, items);
        }

        let (used, extra) = self.pair_up(ctx, items);
        let missing: Vec<&Value> = if self.flavor.allow_missing() {
            Vec::new()
        } else {
            self.items
                .iter()
                .zip(&used)
                .filter(|(_, used)| !**used)
                .map(|(v, _)| v)
                .collect()
        };
        let extra = if self.flavor.allow_extra() {
            Vec::new()
        } else {
            extra
        };
        if missing.is_empty() && extra.is_empty() {
            return Ok(());
        }

        let (missing, extra) = (sorted(missing), sorted(extra));
        let name = self.base.name();
        self.base.collect(ctx, || {
            MatchError::new(ErrorKind::SetMismatch, format!("comparing %% as a {name}"))
                .summary(set_summary("item", &missing, &extra))
        })
    }
}

#[track_caller]
fn unordered<I>(name: &'static str, flavor: Flavor, items: I) -> Value
where
    I: IntoIterator,
    I::Item: IntoValue,
{
    op(Unordered {
        base: OpBase::new(name),
        flavor,
        items: collect_items(items),
    })
}

macro_rules! unordered_ctor {
    ($($(#[$doc:meta])* $fn:ident => $name:literal, $flavor:ident;)*) => {$(
        $(#[$doc])*
        #[track_caller]
        #[must_use]
        pub fn $fn<I>(items: I) -> Value
        where
            I: IntoIterator,
            I::Item: IntoValue,
        {
            unordered($name, Flavor::$flavor, items)
        }
    )*};
}

unordered_ctor! {
    /// Same items in any order, duplicates counted.
    ///
    /// ```
    /// use deepmatch::ops::bag;
    ///
    /// assert!(deepmatch::eq_deeply(vec![3i64, 1, 1], bag([1i64, 1, 3])));
    /// assert!(!deepmatch::eq_deeply(vec![3i64, 1], bag([1i64, 1, 3])));
    /// ```
    bag => "Bag", Bag;
    /// Every got item is one of `items`, each used at most once.
    sub_bag_of => "SubBagOf", SubBag;
    /// Got holds at least `items`, duplicates counted.
    super_bag_of => "SuperBagOf", SuperBag;
    /// Same items in any order, duplicates ignored.
    set => "Set", Set;
    /// Every got item is one of `items`.
    sub_set_of => "SubSetOf", SubSet;
    /// Got holds at least every one of `items`.
    super_set_of => "SuperSetOf", SuperSet;
    /// Got holds none of `items`.
    not_any => "NotAny", NotAny;
}
