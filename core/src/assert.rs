//! Entry points and the reporting sink.
//!
//! The free functions are the whole contract:
//!
//! - [`eq_deeply`] answers yes or no as fast as possible, no details.
//! - [`eq_deeply_error`] returns the full error chain, default config.
//! - [`evaluate_detailed`] is the same with an explicit [`Config`] and
//!   [`Session`], resolving anchors and clearing them afterwards.
//! - [`evaluate`] renders a failure and hands it to a [`Reporter`].
//!
//! [`Assert`] bundles a reporter, a config and a shared session for tests
//! that make many comparisons.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use deepmatch::{ops, Assert, Recorder};
//!
//! let recorder = Arc::new(Recorder::new());
//! let t = Assert::new(Arc::clone(&recorder)).named("users");
//!
//! assert!(t.cmp(vec![1i64, 2], ops::bag([2i64, 1])));
//! assert!(!t.cmp(3i64, ops::between(5i64, 9i64)));
//!
//! let reports = recorder.reports();
//! assert_eq!(reports.len(), 1);
//! assert!(reports[0].message.starts_with("Failed test 'users'"));
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::config::Config;
use crate::context::Context;
use crate::error::{MatchError, MatchResult};
use crate::session::{Anchorable, Session, TestAnchors};
use crate::value::{IntoValue, Value};

// ═══════════════════════════════════════════════════════════════════════════════
// Reporting sink
// ═══════════════════════════════════════════════════════════════════════════════

/// Receives rendered failures.
///
/// The core never formats colors or manages test lifecycles; it only hands
/// over the message and whether the test should stop.
pub trait Reporter: Send + Sync {
    fn report(&self, message: &str, fatal: bool);
}

impl<R: Reporter + ?Sized> Reporter for Arc<R> {
    fn report(&self, message: &str, fatal: bool) {
        (**self).report(message, fatal);
    }
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn report(&self, message: &str, fatal: bool) {
        (**self).report(message, fatal);
    }
}

/// Panics on fatal failures, logs the others at `error` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicReporter;

impl Reporter for PanicReporter {
    fn report(&self, message: &str, fatal: bool) {
        if fatal {
            panic!("{message}");
        }
        tracing::error!("{message}");
    }
}

/// One failure seen by a [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub message: String,
    pub fatal: bool,
}

/// Keeps every failure for later inspection.
#[derive(Debug, Default)]
pub struct Recorder {
    reports: Mutex<Vec<Report>>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the failures recorded so far.
    #[must_use]
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Reporter for Recorder {
    fn report(&self, message: &str, fatal: bool) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Report {
                message: message.to_string(),
                fatal,
            });
    }
}

fn failure_message(name: Option<&str>, err: &MatchError) -> String {
    match name {
        Some(name) => format!("Failed test '{name}'\n{err}"),
        None => format!("Failed test\n{err}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Free functions
// ═══════════════════════════════════════════════════════════════════════════════

/// Compare `got` with `expected`, reporting a failure to `reporter`.
pub fn evaluate<R: Reporter + ?Sized>(
    reporter: &R,
    config: &Config,
    session: &Session,
    got: impl IntoValue,
    expected: impl IntoValue,
) -> bool {
    report_outcome(reporter, config, None, evaluate_detailed(config, session, got, expected))
}

fn report_outcome<R: Reporter + ?Sized>(
    reporter: &R,
    config: &Config,
    name: Option<&str>,
    res: MatchResult,
) -> bool {
    match res {
        Ok(()) => true,
        Err(err) => {
            reporter.report(&failure_message(name, &err), config.failure_is_fatal);
            false
        }
    }
}

/// Compare `got` with `expected` and return every mismatch found.
///
/// Anchors registered on `session` for the anonymous test are visible to
/// this call; non-persistent ones are dropped once it returns, whatever the
/// outcome.
pub fn evaluate_detailed(
    config: &Config,
    session: &Session,
    got: impl IntoValue,
    expected: impl IntoValue,
) -> MatchResult {
    evaluate_in(config, session.test(None), got.into_value(), expected.into_value())
}

fn evaluate_in(config: &Config, test: TestAnchors<'_>, got: Value, expected: Value) -> MatchResult {
    let anchors = test.snapshot();

    let mut ctx = Context::new(config).with_anchors(&anchors);
    let res = ctx.compare(&got, &expected);
    let res = ctx.finish(res);
    test.end_call();

    if let Err(err) = &res {
        debug!(
            test = ?test.name(),
            path = err.path(),
            errors = err.len(),
            truncated = err.is_truncated(),
            "deep comparison failed"
        );
    }
    res
}

/// Yes/no comparison with the default config. Stops at the first mismatch.
///
/// ```
/// use deepmatch::{eq_deeply, ops};
///
/// assert!(eq_deeply(vec!["a", "b"], vec!["a", "b"]));
/// assert!(eq_deeply(12i64, ops::all([ops::gt(10i64), ops::lt(20i64)])));
/// assert!(!eq_deeply(12i64, 12u8));
/// ```
#[must_use]
pub fn eq_deeply(got: impl IntoValue, expected: impl IntoValue) -> bool {
    let config = Config::default();
    let mut ctx = Context::boolean(&config);
    ctx.compare(&got.into_value(), &expected.into_value()).is_ok()
}

/// Detailed comparison with the default config and no anchors.
///
/// ```
/// use deepmatch::eq_deeply_error;
///
/// let err = eq_deeply_error(vec![1i64, 2, 3], vec![1i64, 2, 4]).unwrap_err();
/// assert_eq!(err.path(), "DATA[2]");
/// assert_eq!(err.got_rendering(), Some("3"));
/// ```
pub fn eq_deeply_error(got: impl IntoValue, expected: impl IntoValue) -> MatchResult {
    let config = Config::default();
    let mut ctx = Context::new(&config);
    let res = ctx.compare(&got.into_value(), &expected.into_value());
    ctx.finish(res)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Assert
// ═══════════════════════════════════════════════════════════════════════════════

/// A reporter, a config and an anchor session bound together.
///
/// Anchors belong to the assertion's name: a [`sub`](Self::sub) shares the
/// session but never sees or clears its parent's or siblings' anchors.
#[derive(Debug, Clone)]
pub struct Assert<R> {
    reporter: R,
    config: Config,
    session: Arc<Session>,
    name: Option<String>,
}

impl<R: Reporter> Assert<R> {
    #[must_use]
    pub fn new(reporter: R) -> Self {
        Self {
            reporter,
            config: Config::default(),
            session: Arc::new(Session::new()),
            name: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Name shown in failure messages.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    #[must_use]
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// This assertion's anchors.
    #[must_use]
    pub fn anchors(&self) -> TestAnchors<'_> {
        self.session.test(self.name())
    }

    /// Compare and report a failure. Returns whether it matched.
    pub fn cmp(&self, got: impl IntoValue, expected: impl IntoValue) -> bool {
        let res = self.cmp_error(got, expected);
        report_outcome(&self.reporter, &self.config, self.name(), res)
    }

    /// Compare without reporting.
    pub fn cmp_error(&self, got: impl IntoValue, expected: impl IntoValue) -> MatchResult {
        evaluate_in(&self.config, self.anchors(), got.into_value(), expected.into_value())
    }

    /// See [`TestAnchors::anchor`].
    #[track_caller]
    pub fn anchor<T: Anchorable>(&self, rule: impl IntoValue) -> T {
        self.anchors().anchor(rule)
    }

    /// Keep anchors across [`cmp`](Self::cmp) calls until
    /// [`TestAnchors::reset`].
    pub fn set_anchors_persist(&self, persist: bool) {
        self.anchors().set_persist(persist);
    }
}

impl<R: Reporter + Clone> Assert<R> {
    /// Child assertion sharing this one's reporter, config and session.
    #[must_use]
    pub fn sub(&self, name: impl AsRef<str>) -> Self {
        let name = match &self.name {
            Some(parent) => format!("{parent}/{}", name.as_ref()),
            None => name.as_ref().to_string(),
        };
        Self {
            reporter: self.reporter.clone(),
            config: self.config.clone(),
            session: Arc::clone(&self.session),
            name: Some(name),
        }
    }
}
