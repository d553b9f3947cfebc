//! Anchors — rules smuggled into ordinarily typed literals
//!
//! A typed literal cannot hold a rule: a `Vec<i64>` only holds `i64`s. An
//! anchor gets around that. [`Session::anchor`] registers a rule and returns
//! a placeholder of the wanted type, a value chosen from the top of the
//! type's range (or a tagged string). When the engine meets that placeholder
//! on the expected side, it applies the rule instead.
//!
//! ```
//! use deepmatch::{ops, Config, Session};
//!
//! let session = Session::new();
//! let expected = vec![1i64, session.anchor::<i64>(ops::gt(1i64)), 3];
//! let res = deepmatch::evaluate_detailed(&Config::default(), &session, vec![1i64, 7, 3], expected);
//! assert!(res.is_ok());
//! // anchors are gone after the call
//! assert!(session.is_empty());
//! ```
//!
//! Sessions are explicit and owned by the caller. They are safe to share
//! between threads; the table sits behind a mutex.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::context::AnchorTable;
use crate::operator::Operator;
use crate::ops::Equal;
use crate::value::{FloatKind, IntKind, IntoValue, Type, UintKind, Value};

/// Types that can stand in for a rule inside a literal.
pub trait Anchorable: IntoValue + Clone + Sized {
    /// The `seq`-th placeholder of this type, `None` once the range is used up.
    fn placeholder(seq: u64) -> Option<Self>;
}

macro_rules! anchorable_int {
    ($($t:ty),*) => {$(
        impl Anchorable for $t {
            fn placeholder(seq: u64) -> Option<Self> {
                <$t>::MAX.checked_sub(<$t>::try_from(seq).ok()?)
            }
        }
    )*};
}

anchorable_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Anchorable for f32 {
    fn placeholder(seq: u64) -> Option<Self> {
        Some(f32::MAX / (seq as f32 + 2.0))
    }
}

impl Anchorable for f64 {
    fn placeholder(seq: u64) -> Option<Self> {
        Some(f64::MAX / (seq as f64 + 2.0))
    }
}

impl Anchorable for String {
    fn placeholder(seq: u64) -> Option<Self> {
        Some(format!("<deepmatch anchor #{seq}>"))
    }
}

/// Lookup key of a placeholder value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnchorKey {
    Int(IntKind, i64),
    Uint(UintKind, u64),
    Float(FloatKind, u64),
    String(String),
}

impl AnchorKey {
    /// Key of `value` if it is of an anchorable type.
    #[must_use]
    pub fn of(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Int(k, v) => Self::Int(*k, *v),
            Value::Uint(k, v) => Self::Uint(*k, *v),
            Value::Float(k, v) => Self::Float(*k, v.to_bits()),
            Value::String(s) => Self::String(s.clone()),
            _ => return None,
        })
    }
}

#[derive(Default)]
struct AnchorState {
    anchors: AnchorTable,
    next: HashMap<Type, u64>,
    persist: bool,
}

impl AnchorState {
    fn is_idle(&self) -> bool {
        self.anchors.is_empty() && !self.persist
    }
}

/// Anchor tables, one per logical test.
///
/// A test is identified by its name; `None` is the anonymous test used by
/// the methods on `Session` itself. Tests never see or clear each other's
/// anchors, so sub-tests sharing a session may run in parallel.
#[derive(Default)]
pub struct Session {
    tests: Mutex<HashMap<Option<String>, AnchorState>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tests = self.lock();
        f.debug_struct("Session")
            .field("tests", &tests.len())
            .field("anchors", &tests.values().map(|t| t.anchors.len()).sum::<usize>())
            .finish()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Option<String>, AnchorState>> {
        self.tests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Anchors of the test named `test`.
    #[must_use]
    pub fn test<'s>(&'s self, test: Option<&'s str>) -> TestAnchors<'s> {
        TestAnchors { session: self, test }
    }

    /// Register `rule` for the anonymous test. See [`TestAnchors::anchor`].
    #[track_caller]
    pub fn anchor<T: Anchorable>(&self, rule: impl IntoValue) -> T {
        self.test(None).anchor(rule)
    }

    /// Keep the anonymous test's anchors across top-level calls.
    pub fn set_persist(&self, persist: bool) {
        self.test(None).set_persist(persist);
    }

    #[must_use]
    pub fn persist(&self) -> bool {
        self.test(None).persist()
    }

    /// Drop every anchor of every test.
    pub fn reset(&self) {
        let mut tests = self.lock();
        let total: usize = tests.values().map(|t| t.anchors.len()).sum();
        if total > 0 {
            tracing::trace!(anchors = total, "reset all anchors");
        }
        for state in tests.values_mut() {
            state.anchors.clear();
            state.next.clear();
        }
        tests.retain(|_, state| !state.is_idle());
    }

    /// Anchors registered across all tests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().values().map(|t| t.anchors.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the anonymous test's table, for one matching pass.
    #[must_use]
    pub fn snapshot(&self) -> AnchorTable {
        self.test(None).snapshot()
    }

    /// End of a top-level comparison in the anonymous test.
    pub fn end_call(&self) {
        self.test(None).end_call();
    }
}

/// The anchors of one test inside a [`Session`].
#[derive(Clone, Copy)]
pub struct TestAnchors<'s> {
    session: &'s Session,
    test: Option<&'s str>,
}

impl std::fmt::Debug for TestAnchors<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestAnchors")
            .field("test", &self.test)
            .field("anchors", &self.len())
            .finish()
    }
}

impl TestAnchors<'_> {
    fn with<T>(&self, f: impl FnOnce(&mut AnchorState) -> T) -> T {
        let mut tests = self.session.lock();
        let key = self.test.map(str::to_string);
        let state = tests.entry(key.clone()).or_default();
        let out = f(state);
        if state.is_idle() {
            tests.remove(&key);
        }
        out
    }

    fn read<T>(&self, f: impl FnOnce(Option<&AnchorState>) -> T) -> T {
        let tests = self.session.lock();
        f(tests.get(&self.test.map(str::to_string)))
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.test
    }

    /// Register `rule` and return the placeholder standing for it.
    ///
    /// A literal `rule` is anchored as an equality rule.
    ///
    /// # Panics
    ///
    /// If the rule's type is known and is not `T`, or if the placeholders of
    /// `T` are exhausted. Both are errors in the test code.
    #[track_caller]
    pub fn anchor<T: Anchorable>(&self, rule: impl IntoValue) -> T {
        let op: Arc<dyn Operator> = match rule.into_value() {
            Value::Op(op) => op,
            literal => Arc::new(Equal::new(literal)),
        };
        let ty = T::static_type();
        if let Some(behind) = op.type_behind() {
            if behind != ty {
                panic!("cannot anchor {} operator of type {behind} as {ty}", op.name());
            }
        }

        let claimed = self.with(|state| {
            let seq = state.next.entry(ty.clone()).or_insert(0);
            let n = *seq;
            *seq += 1;
            let placeholder = T::placeholder(n)?;
            if let Some(key) = AnchorKey::of(&placeholder.clone().into_value()) {
                tracing::trace!(test = ?self.test, operator = op.name(), ty = %ty, seq = n, "anchored operator");
                state.anchors.insert(key, Arc::clone(&op));
            }
            Some(placeholder)
        });
        let Some(placeholder) = claimed else {
            panic!("no anchor placeholders left for {ty}");
        };
        placeholder
    }

    /// Keep anchors across top-level calls until [`reset`](Self::reset).
    pub fn set_persist(&self, persist: bool) {
        self.with(|state| state.persist = persist);
    }

    #[must_use]
    pub fn persist(&self) -> bool {
        self.read(|state| state.is_some_and(|s| s.persist))
    }

    /// Drop this test's anchors.
    pub fn reset(&self) {
        self.with(|state| {
            if !state.anchors.is_empty() {
                tracing::trace!(test = ?self.test, anchors = state.anchors.len(), "reset anchors");
            }
            state.anchors.clear();
            state.next.clear();
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read(|state| state.map_or(0, |s| s.anchors.len()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of this test's table, for one matching pass.
    #[must_use]
    pub fn snapshot(&self) -> AnchorTable {
        self.read(|state| state.map(|s| s.anchors.clone()).unwrap_or_default())
    }

    /// Called after every top-level comparison: clears non-persistent anchors.
    pub fn end_call(&self) {
        if !self.persist() {
            self.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;

    #[test]
    fn test_int_placeholders_from_top() {
        assert_eq!(i64::placeholder(0), Some(i64::MAX));
        assert_eq!(i8::placeholder(1), Some(i8::MAX - 1));
        assert_eq!(u8::placeholder(255), Some(0));
        assert_eq!(u8::placeholder(256), None);
    }

    #[test]
    fn test_string_placeholder() {
        assert_eq!(String::placeholder(3).unwrap(), "<deepmatch anchor #3>");
    }

    #[test]
    fn test_anchor_registers_distinct_placeholders() {
        let session = Session::new();
        let a: i64 = session.anchor(ops::gt(0i64));
        let b: i64 = session.anchor(ops::lt(0i64));
        assert_ne!(a, b);
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn test_end_call_respects_persist() {
        let session = Session::new();
        let _: i32 = session.anchor(ops::ignore());
        session.set_persist(true);
        session.end_call();
        assert_eq!(session.len(), 1);

        session.set_persist(false);
        session.end_call();
        assert!(session.is_empty());
    }

    #[test]
    fn test_literal_anchor_is_equality() {
        let session = Session::new();
        let placeholder: String = session.anchor("abc");
        let snapshot = session.snapshot();
        let key = AnchorKey::of(&Value::String(placeholder)).unwrap();
        assert_eq!(snapshot[&key].name(), "Equal");
    }

    #[test]
    #[should_panic(expected = "cannot anchor")]
    fn test_anchor_type_mismatch_panics() {
        let session = Session::new();
        let _: String = session.anchor(ops::gt(1i64));
    }

    #[test]
    fn test_tests_keep_separate_tables() {
        let session = Session::new();
        let a = session.test(Some("a"));
        let b = session.test(Some("b"));
        let pa: i64 = a.anchor(ops::gt(5i64));
        let pb: i64 = b.anchor(ops::lt(0i64));
        // placeholders restart per test
        assert_eq!(pa, pb);
        assert_eq!(session.len(), 2);

        b.end_call();
        assert!(b.is_empty());
        assert_eq!(a.len(), 1);
        assert!(session.test(None).is_empty());

        let key = AnchorKey::of(&pa.into_value()).unwrap();
        assert_eq!(a.snapshot()[&key].name(), "Gt");
    }

    #[test]
    fn test_persist_is_per_test() {
        let session = Session::new();
        let a = session.test(Some("a"));
        a.set_persist(true);
        let _: i64 = a.anchor(ops::ignore());
        let _: i64 = session.anchor(ops::ignore());

        session.end_call();
        a.end_call();
        assert_eq!(a.len(), 1);
        assert_eq!(session.len(), 1);

        session.reset();
        assert!(session.is_empty());
        assert!(a.persist());
    }
}
