//! deepmatch - recursive deep comparison with embeddable rules
//!
//! Compares a *got* value against an *expected* value that may hold rule
//! nodes (operators) anywhere in its tree, and reports every mismatch with
//! the path that leads to it.
//!
//! # Architecture
//!
//! - [`Value`] - closed sum type over every kind the engine walks (scalars,
//!   pointers, slices, arrays, maps, structs, interfaces, functions,
//!   channels, errors) plus [`Value::Op`], an embedded rule node
//! - [`Operator`] - the rule capability: match, type behind, render
//! - [`Context`] - per-call state: [`Path`], [`Visited`] set, error
//!   accumulator, mode flags copied from [`Config`]
//! - [`engine`] - the recursive matcher, one handler per kind
//! - [`ops`] - built-in rules
//! - [`Session`] - anchors: rules smuggled into typed literals
//!
//! # Key Design Insights
//!
//! 1. **Mismatches are data**: every failure is a [`MatchError`] in a chain,
//!    so combinators can inspect sub-results and decide their own outcome.
//!
//! 2. **Cycles end structurally**: the [`Visited`] set remembers the
//!    (got, expected) address pairs under comparison. No depth counter.
//!
//! 3. **Two modes**: boolean-only passes stop at the first mismatch and build
//!    no error text; detailed passes keep going until `max_errors`.
//!
//! # Example
//!
//! ```
//! use deepmatch::prelude::*;
//!
//! let got = StructValue::new("User")
//!     .field("name", "bob")
//!     .field("age", 42i64)
//!     .field("tags", vec!["admin", "ops"])
//!     .into_value();
//!
//! let model = StructValue::new("User")
//!     .field("name", "bob")
//!     .field("age", 0i64)
//!     .field("tags", Vec::<String>::new())
//!     .into_value();
//!
//! let expected = ops::sstruct(
//!     model.clone(),
//!     [
//!         ("age", ops::between(18i64, 99i64)),
//!         ("tags", ops::bag(["ops", "admin"])),
//!     ],
//! );
//! assert!(eq_deeply(got.clone(), expected));
//!
//! let expected = ops::struct_of(model, [("age", ops::lt(40i64)), ("tags", ops::ignore())]);
//! let err = eq_deeply_error(got, expected).unwrap_err();
//! assert_eq!(err.path(), "DATA.age");
//! ```
//!
//! # Extensions
//!
//! - `json` and the rule registry - JSON documents as values, rule objects
//!   built by name (feature = `"registry"`)
//! - `deepmatch-test` - YAML conformance fixtures (internal)

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod assert;
mod callback;
mod config;
mod context;
mod error;
mod operator;
mod path;
mod session;
mod value;
mod visited;

pub mod engine;
pub mod ops;

#[cfg(feature = "registry")]
pub mod json;
#[cfg(feature = "registry")]
mod registry;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

// Values
pub use value::{
    value, Array, Chan, EqualFn, ErrorValue, Field, FloatKind, Func, IntKind, Interface,
    IntoValue, Kind, Map, Ptr, Slice, StructValue, Type, UintKind, Value,
};

// Plumbing
pub use context::{AnchorTable, Context};
pub use path::{Path, PathStep};
pub use visited::Visited;

// Rules
pub use operator::{op, OpBase, Operator};
pub use session::{AnchorKey, Anchorable, Session, TestAnchors};

// Entry points
pub use assert::{
    eq_deeply, eq_deeply_error, evaluate, evaluate_detailed, Assert, PanicReporter, Recorder,
    Report, Reporter,
};
pub use callback::{invoke, Outcome, PanicReport};
pub use config::{default_max_errors, Config};

// Errors
pub use error::{ErrorKind, MatchError, MatchResult, OperatorLocation, UsageError};

// Registry (feature-gated)
#[cfg(feature = "registry")]
pub use registry::{
    exact_args, register_core_rules, string_arg, RegistryError, RuleFactory, RuleRegistry,
    RuleRegistryBuilder, ARGS_KEY, RULE_KEY,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use deepmatch::prelude::*;
/// ```
pub mod prelude {
    pub use crate::ops;
    pub use crate::{
        // Entry points
        eq_deeply,
        eq_deeply_error,
        evaluate,
        evaluate_detailed,
        // Values
        value,
        Assert,
        Config,
        // Errors
        ErrorKind,
        IntoValue,
        MatchError,
        MatchResult,
        // Rules
        Operator,
        Session,
        StructValue,
        Type,
        Value,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Mismatches reported per top-level call when nothing overrides it.
pub const DEFAULT_MAX_ERRORS: i64 = 10;

/// Environment variable overriding [`DEFAULT_MAX_ERRORS`] once per process.
///
/// A negative value means unlimited.
pub const MAX_ERRORS_ENV: &str = "DEEPMATCH_MAX_ERRORS";
