//! `Context` — per-call state threaded through the engine
//!
//! One context is built for each top-level comparison. It owns the [`Path`],
//! the [`Visited`] set and the error accumulator, and copies the mode flags
//! out of the [`Config`] so rules can scope overrides (`Len` turns laxness
//! on for its nested rule, combinators probe candidates in boolean-only mode).
//!
//! # Error accumulation
//!
//! [`Context::collect`] records a mismatch at the current path:
//!
//! - In boolean-only mode nothing is recorded; a detail-free sentinel comes
//!   back as `Err` so the whole descent stops at once.
//! - Otherwise the error is kept and `Ok(())` is returned, so the engine goes
//!   on with siblings, until the limit is exceeded. Then a single
//!   "too many errors" marker is appended and every later call returns `Err`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::engine;
use crate::error::{MatchError, MatchResult};
use crate::operator::Operator;
use crate::path::{Path, PathStep};
use crate::session::AnchorKey;
use crate::value::Value;
use crate::visited::Visited;

/// Anchored rules visible to one matching pass.
pub type AnchorTable = HashMap<AnchorKey, Arc<dyn Operator>>;

#[derive(Debug)]
struct Accumulator {
    max: i64,
    errors: Vec<MatchError>,
    truncated: bool,
}

impl Accumulator {
    fn new(max: i64) -> Self {
        Self {
            max,
            errors: Vec::new(),
            truncated: false,
        }
    }

    fn push(&mut self, err: MatchError) -> MatchResult {
        if self.truncated {
            return Err(MatchError::too_many_errors());
        }
        if self.max >= 0 && self.errors.len() as i64 >= self.max.max(1) {
            self.errors.push(MatchError::too_many_errors());
            self.truncated = true;
            return Err(MatchError::too_many_errors());
        }
        self.errors.push(err);
        Ok(())
    }

    fn finish(self, res: MatchResult) -> MatchResult {
        match MatchError::chain(self.errors) {
            Some(chain) => Err(chain),
            None => res,
        }
    }
}

/// Mutable state of one matching pass.
pub struct Context<'a> {
    path: Path,
    visited: Visited,
    errors: Accumulator,
    boolean: bool,
    be_lax: bool,
    operator_in_got: bool,
    config: &'a Config,
    anchors: Option<&'a AnchorTable>,
}

impl<'a> Context<'a> {
    /// A context collecting detailed errors.
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self {
            path: Path::new(&config.root_name),
            visited: Visited::new(),
            errors: Accumulator::new(config.max_errors),
            boolean: false,
            be_lax: config.be_lax,
            operator_in_got: config.operator_in_got,
            config,
            anchors: None,
        }
    }

    /// A context that stops at the first mismatch without details.
    #[must_use]
    pub fn boolean(config: &'a Config) -> Self {
        let mut ctx = Self::new(config);
        ctx.boolean = true;
        ctx
    }

    /// Resolve anchor placeholders met in expected values against `anchors`.
    #[must_use]
    pub fn with_anchors(mut self, anchors: &'a AnchorTable) -> Self {
        if !anchors.is_empty() {
            self.anchors = Some(anchors);
        }
        self
    }

    #[must_use]
    pub fn config(&self) -> &'a Config {
        self.config
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    #[must_use]
    pub fn is_boolean(&self) -> bool {
        self.boolean
    }

    #[inline]
    #[must_use]
    pub fn be_lax(&self) -> bool {
        self.be_lax
    }

    #[inline]
    #[must_use]
    pub fn operator_in_got(&self) -> bool {
        self.operator_in_got
    }

    /// Whether the error limit was exceeded.
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.errors.truncated
    }

    pub(crate) fn visited(&mut self) -> &mut Visited {
        &mut self.visited
    }

    /// Record `err` at the current path.
    pub fn collect(&mut self, err: MatchError) -> MatchResult {
        self.collect_with(|| err)
    }

    /// Like [`collect`](Self::collect), building the error only when details
    /// are wanted.
    pub fn collect_with(&mut self, err: impl FnOnce() -> MatchError) -> MatchResult {
        if self.boolean {
            return Err(MatchError::boolean());
        }
        let err = err().at(self.path.to_string());
        self.errors.push(err)
    }

    /// Run `f` one step deeper.
    pub fn descend<T>(&mut self, step: PathStep, f: impl FnOnce(&mut Self) -> T) -> T {
        self.path.push(step);
        let out = f(self);
        self.path.pop();
        out
    }

    /// Run `f` with laxness switched to `lax`.
    pub fn with_lax<T>(&mut self, lax: bool, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.be_lax, lax);
        let out = f(self);
        self.be_lax = saved;
        out
    }

    /// Compare at the current path, feeding this context's accumulator.
    pub fn compare(&mut self, got: &Value, expected: &Value) -> MatchResult {
        engine::deep_value_equal(self, got, expected)
    }

    /// Yes/no probe. Records nothing.
    pub fn matches(&mut self, got: &Value, expected: &Value) -> bool {
        let saved = std::mem::replace(&mut self.boolean, true);
        let res = engine::deep_value_equal(self, got, expected);
        self.boolean = saved;
        res.is_ok()
    }

    /// Compare with a fresh accumulator and return the complete error chain,
    /// so the caller can decide what to report.
    pub fn compare_final(&mut self, got: &Value, expected: &Value) -> MatchResult {
        if self.boolean {
            return engine::deep_value_equal(self, got, expected);
        }
        let saved = std::mem::replace(&mut self.errors, Accumulator::new(self.config.max_errors));
        let res = engine::deep_value_equal(self, got, expected);
        let inner = std::mem::replace(&mut self.errors, saved);
        inner.finish(res)
    }

    /// The rule anchored behind a placeholder value, if any.
    #[must_use]
    pub fn resolve_anchor(&self, expected: &Value) -> Option<Arc<dyn Operator>> {
        let anchors = self.anchors?;
        let key = AnchorKey::of(expected)?;
        anchors.get(&key).cloned()
    }

    /// Consume the context, turning collected errors into the result.
    pub fn finish(self, res: MatchResult) -> MatchResult {
        self.errors.finish(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn mismatch() -> MatchError {
        MatchError::new(ErrorKind::ValueMismatch, "values differ")
    }

    #[test]
    fn test_collect_records_path() {
        let config = Config::default();
        let mut ctx = Context::new(&config);
        let res = ctx.descend(PathStep::Index(2), |ctx| ctx.collect(mismatch()));
        assert!(res.is_ok());
        let err = ctx.finish(Ok(())).unwrap_err();
        assert_eq!(err.path(), "DATA[2]");
    }

    #[test]
    fn test_boolean_mode_short_circuits() {
        let config = Config::default();
        let mut ctx = Context::boolean(&config);
        let mut built = false;
        let res = ctx.collect_with(|| {
            built = true;
            mismatch()
        });
        assert_eq!(res.unwrap_err().kind(), ErrorKind::Boolean);
        assert!(!built);
    }

    #[test]
    fn test_limit_appends_marker_once() {
        let config = Config::default().max_errors(2);
        let mut ctx = Context::new(&config);
        assert!(ctx.collect(mismatch()).is_ok());
        assert!(ctx.collect(mismatch()).is_ok());
        assert!(ctx.collect(mismatch()).is_err());
        assert!(ctx.collect(mismatch()).is_err());
        assert!(ctx.truncated());

        let err = ctx.finish(Ok(())).unwrap_err();
        assert_eq!(err.len(), 3);
        assert_eq!(err.iter().last().unwrap().kind(), ErrorKind::TooManyErrors);
    }

    #[test]
    fn test_zero_limit_behaves_as_one() {
        let config = Config::default().max_errors(0);
        let mut ctx = Context::new(&config);
        assert!(ctx.collect(mismatch()).is_ok());
        assert!(ctx.collect(mismatch()).is_err());
    }

    #[test]
    fn test_negative_limit_is_unlimited() {
        let config = Config::default().max_errors(-1);
        let mut ctx = Context::new(&config);
        for _ in 0..50 {
            assert!(ctx.collect(mismatch()).is_ok());
        }
        assert_eq!(ctx.finish(Ok(())).unwrap_err().len(), 50);
    }

    #[test]
    fn test_with_lax_restores() {
        let config = Config::default();
        let mut ctx = Context::new(&config);
        assert!(ctx.with_lax(true, |ctx| ctx.be_lax()));
        assert!(!ctx.be_lax());
    }

    #[test]
    fn test_compare_final_isolated() {
        let config = Config::default();
        let mut ctx = Context::new(&config);
        let res = ctx.compare_final(&crate::value(1i64), &crate::value(2i64));
        assert!(res.is_err());
        assert!(ctx.finish(Ok(())).is_ok());
    }
}
