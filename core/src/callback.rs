//! Invoking user callbacks
//!
//! User predicates, transforms and equality hooks may panic. [`invoke`] runs
//! them behind `catch_unwind` and hands back a tagged [`Outcome`], so a
//! panicking callback becomes a mismatch of that one comparison.
//!
//! The stack is gone by the time `catch_unwind` returns, so the trace is
//! taken by a panic hook while the panicking frames still exist. The hook
//! is installed once per process and chains to the previous one for panics
//! raised outside [`invoke`].

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::sync::Once;

use crate::error::{ErrorKind, MatchError};

/// Result of running a user callback.
#[derive(Debug)]
pub enum Outcome<T> {
    Returned(T),
    Panicked(PanicReport),
}

/// What a panicking callback left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicReport {
    /// The panic message, when the payload is a string.
    pub payload: String,
    /// Where the panic was raised.
    pub location: Option<String>,
    /// Stack at the panic site.
    pub backtrace: Option<String>,
}

impl PanicReport {
    /// A `Panic` mismatch carrying this report.
    #[must_use]
    pub fn into_error(self, message: &str) -> MatchError {
        MatchError::new(ErrorKind::Panic, message).summary(self.to_string())
    }
}

impl fmt::Display for PanicReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panic: {}", self.payload)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        if let Some(backtrace) = &self.backtrace {
            write!(f, "\n{backtrace}")?;
        }
        Ok(())
    }
}

struct Captured {
    location: Option<String>,
    backtrace: String,
}

thread_local! {
    /// Nesting depth of [`invoke`] on this thread.
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static CAPTURED: RefCell<Option<Captured>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            if DEPTH.with(Cell::get) == 0 {
                previous(info);
                return;
            }
            let captured = Captured {
                location: info.location().map(ToString::to_string),
                backtrace: Backtrace::force_capture().to_string(),
            };
            CAPTURED.with(|slot| *slot.borrow_mut() = Some(captured));
        }));
    });
}

/// Holds one level of [`DEPTH`] for its lifetime.
struct DepthGuard;

impl DepthGuard {
    fn enter() -> Self {
        DEPTH.with(|d| d.set(d.get() + 1));
        Self
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Run `f`, catching any panic.
pub fn invoke<T>(f: impl FnOnce() -> T) -> Outcome<T> {
    install_hook();
    let res = {
        let _depth = DepthGuard::enter();
        panic::catch_unwind(AssertUnwindSafe(f))
    };
    match res {
        Ok(value) => Outcome::Returned(value),
        Err(payload) => {
            let captured = CAPTURED.with(|slot| slot.borrow_mut().take());
            Outcome::Panicked(PanicReport {
                payload: payload_message(payload.as_ref()),
                location: captured.as_ref().and_then(|c| c.location.clone()),
                backtrace: captured.map(|c| c.backtrace),
            })
        }
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
