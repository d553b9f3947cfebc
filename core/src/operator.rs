//! `Operator` — the capability every rule node implements
//!
//! An operator sits in the expected tree where a literal would otherwise be.
//! When the engine reaches it, it hands over the got value and lets the
//! operator decide, through the [`Context`], how to compare.
//!
//! The engine has no closed list of operators. Implement the trait to add one:
//!
//! ```
//! use std::fmt;
//! use std::sync::Arc;
//! use deepmatch::{Context, ErrorKind, MatchError, MatchResult, OpBase, Operator, Value};
//!
//! struct Even(OpBase);
//!
//! impl fmt::Display for Even {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         f.write_str("Even()")
//!     }
//! }
//!
//! impl Operator for Even {
//!     fn name(&self) -> &'static str { "Even" }
//!
//!     fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
//!         match got {
//!             Value::Int(_, v) if v % 2 == 0 => Ok(()),
//!             _ => self.0.collect(ctx, || {
//!                 MatchError::new(ErrorKind::ValueMismatch, "not even")
//!                     .got(got)
//!                     .expected(self)
//!             }),
//!         }
//!     }
//!
//!     fn location(&self) -> Option<deepmatch::OperatorLocation> {
//!         Some(self.0.location())
//!     }
//! }
//!
//! let even = Value::Op(Arc::new(Even(OpBase::new("Even"))));
//! assert!(deepmatch::eq_deeply(4i64, even.clone()));
//! assert!(!deepmatch::eq_deeply(3i64, even));
//! ```

use std::fmt::Display;
use std::panic::Location;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{MatchError, MatchResult, OperatorLocation, UsageError};
use crate::value::{Type, Value};

/// A rule node in an expected tree.
///
/// Implementations are immutable once built and may be shared across
/// threads and matching passes.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Operator`",
    label = "this type cannot be used as a rule in an expected value",
    note = "use a built-in operator (all, any, between, contains, ...) or implement `name` and `match_value`"
)]
pub trait Operator: Send + Sync + Display + 'static {
    /// Short name used in diagnostics, e.g. `"Between"`.
    fn name(&self) -> &'static str;

    /// Compare `got` against this rule, reporting mismatches through `ctx`.
    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult;

    /// Best-effort type of the values this rule matches. `None` is always valid.
    fn type_behind(&self) -> Option<Type> {
        None
    }

    /// Opt in to receiving nil got values instead of an automatic "nil value"
    /// mismatch.
    fn handle_invalid(&self) -> bool {
        false
    }

    /// Where the rule was built.
    fn location(&self) -> Option<OperatorLocation> {
        None
    }

    /// Misuse detected while building the rule.
    fn usage_error(&self) -> Option<&UsageError> {
        None
    }
}

/// State shared by built-in operators: name, construction site and any
/// construction-time misuse.
#[derive(Debug, Clone)]
pub struct OpBase {
    name: &'static str,
    location: OperatorLocation,
    usage: Option<UsageError>,
}

impl OpBase {
    /// Record the caller as the construction site.
    #[track_caller]
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            location: OperatorLocation::new(name, Location::caller()),
            usage: None,
        }
    }

    #[must_use]
    pub fn with_usage(mut self, usage: UsageError) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Keep the first usage error found.
    pub fn flag(&mut self, usage: UsageError) {
        if self.usage.is_none() {
            self.usage = Some(usage);
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn location(&self) -> OperatorLocation {
        self.location
    }

    #[must_use]
    pub fn usage(&self) -> Option<&UsageError> {
        self.usage.as_ref()
    }

    /// Collect an error raised by this operator, tagged with its location.
    ///
    /// The closure is not called in boolean-only mode.
    pub fn collect(&self, ctx: &mut Context<'_>, err: impl FnOnce() -> MatchError) -> MatchResult {
        let location = self.location;
        ctx.collect_with(|| err().located(location))
    }
}

/// Wrap an operator as an expected value.
#[must_use]
pub fn op(operator: impl Operator) -> Value {
    Value::Op(Arc::new(operator))
}

/// Implements the boilerplate [`Operator`] accessors for a struct with a
/// `base: OpBase` field.
macro_rules! op_base_accessors {
    () => {
        fn name(&self) -> &'static str {
            self.base.name()
        }

        fn location(&self) -> Option<$crate::error::OperatorLocation> {
            Some(self.base.location())
        }

        fn usage_error(&self) -> Option<&$crate::error::UsageError> {
            self.base.usage()
        }
    };
}

pub(crate) use op_base_accessors;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_base_records_caller() {
        let base = OpBase::new("Test");
        let line = line!() - 1;
        assert_eq!(base.location().line, line);
        assert!(base.location().file.ends_with("operator.rs"));
        assert_eq!(base.name(), "Test");
    }

    #[test]
    fn test_first_usage_error_wins() {
        let mut base = OpBase::new("Test");
        base.flag(UsageError::BadArgument {
            op: "Test",
            reason: "first".into(),
        });
        base.flag(UsageError::BadArgument {
            op: "Test",
            reason: "second".into(),
        });
        assert_eq!(base.usage().unwrap().to_string(), "Test: first");
    }
}
