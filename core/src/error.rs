//! Match errors and usage errors
//!
//! A failed comparison produces a chain of [`MatchError`]s in discovery
//! order. Each record carries the rendered path, a message, the rendered
//! got/expected sides and optionally the error of a nested comparison that
//! caused it (its *origin*). A chain truncated by the error limit ends with a
//! [`ErrorKind::TooManyErrors`] marker.
//!
//! Misuse detected while building a rule is a [`UsageError`]. It is stored
//! on the rule and reported the first time the rule is matched.

use std::fmt;
use std::panic::Location;

use crate::MAX_ERRORS_ENV;

// ═══════════════════════════════════════════════════════════════════════════════
// ErrorKind
// ═══════════════════════════════════════════════════════════════════════════════

/// Category of a [`MatchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Same type, different value.
    ValueMismatch,
    /// Types differ and laxness did not help.
    TypeMismatch,
    /// Nil on one side only (nil slice, nil map, nil pointer, nil value).
    NilMismatch,
    /// Sequences of different lengths.
    LengthMismatch,
    /// Missing or extra keys/items in a map, bag or set.
    SetMismatch,
    /// Values that cannot be compared at all, like two non-nil functions.
    CannotCompare,
    /// A rule that was built wrong.
    Usage,
    /// A rule node was found on the got side.
    OperatorOnGot,
    /// A user callback panicked.
    Panic,
    /// Terminal marker of a truncated chain.
    TooManyErrors,
    /// Detail-free sentinel returned in boolean-only mode.
    Boolean,
}

/// Where a rule was built, for `[under operator X at file:line]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorLocation {
    pub name: &'static str,
    pub file: &'static str,
    pub line: u32,
}

impl OperatorLocation {
    #[must_use]
    pub fn new(name: &'static str, caller: &'static Location<'static>) -> Self {
        Self {
            name,
            file: caller.file(),
            line: caller.line(),
        }
    }
}

impl fmt::Display for OperatorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[under operator {} at {}:{}]", self.name, self.file, self.line)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MatchError
// ═══════════════════════════════════════════════════════════════════════════════

/// One mismatch, linked to the next one found during the same pass.
///
/// The message may contain `%%`, replaced by the path when the error is
/// collected.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchError {
    kind: ErrorKind,
    message: String,
    path: String,
    got: Option<String>,
    expected: Option<String>,
    summary: Option<String>,
    location: Option<OperatorLocation>,
    origin: Option<Box<MatchError>>,
    next: Option<Box<MatchError>>,
}

/// Outcome of one comparison step.
pub type MatchResult = Result<(), MatchError>;

impl MatchError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: String::new(),
            got: None,
            expected: None,
            summary: None,
            location: None,
            origin: None,
            next: None,
        }
    }

    /// Detail-free sentinel for boolean-only mode.
    #[must_use]
    pub fn boolean() -> Self {
        Self::new(ErrorKind::Boolean, "mismatch")
    }

    /// Terminal marker of a truncated chain.
    #[must_use]
    pub fn too_many_errors() -> Self {
        Self::new(
            ErrorKind::TooManyErrors,
            format!("Too many errors (use {MAX_ERRORS_ENV}=-1 to see all)"),
        )
    }

    #[must_use]
    pub fn got(mut self, got: impl fmt::Display) -> Self {
        self.got = Some(got.to_string());
        self
    }

    #[must_use]
    pub fn expected(mut self, expected: impl fmt::Display) -> Self {
        self.expected = Some(expected.to_string());
        self
    }

    /// Free-form detail shown instead of got/expected.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Attach the nested error that caused this one.
    #[must_use]
    pub fn origin(mut self, origin: MatchError) -> Self {
        self.origin = Some(Box::new(origin));
        self
    }

    #[must_use]
    pub fn located(mut self, location: OperatorLocation) -> Self {
        if self.location.is_none() {
            self.location = Some(location);
        }
        self
    }

    /// Fix the path and expand `%%` in the message.
    pub(crate) fn at(mut self, path: String) -> Self {
        if self.message.contains("%%") {
            self.message = self.message.replace("%%", &path);
        }
        self.path = path;
        self
    }

    /// Link errors in order. Returns `None` for an empty list.
    #[must_use]
    pub fn chain(errors: Vec<MatchError>) -> Option<MatchError> {
        errors.into_iter().rev().fold(None, |next, mut err| {
            err.next = next.map(Box::new);
            Some(err)
        })
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn got_rendering(&self) -> Option<&str> {
        self.got.as_deref()
    }

    #[must_use]
    pub fn expected_rendering(&self) -> Option<&str> {
        self.expected.as_deref()
    }

    #[must_use]
    pub fn summary_text(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    #[must_use]
    pub fn location(&self) -> Option<&OperatorLocation> {
        self.location.as_ref()
    }

    #[must_use]
    pub fn origin_error(&self) -> Option<&MatchError> {
        self.origin.as_deref()
    }

    #[must_use]
    pub fn next_error(&self) -> Option<&MatchError> {
        self.next.as_deref()
    }

    /// This error and every following one.
    pub fn iter(&self) -> impl Iterator<Item = &MatchError> {
        std::iter::successors(Some(self), |e| e.next_error())
    }

    /// Number of records in the chain, truncation marker included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.iter().any(|e| e.kind == ErrorKind::TooManyErrors)
    }

    fn write_one(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{indent}{}", self.message)?;
        } else {
            write!(f, "{indent}{}: {}", self.path, self.message)?;
        }
        if let Some(summary) = &self.summary {
            for line in summary.lines() {
                write!(f, "\n{indent}\t{line}")?;
            }
        } else {
            if let Some(got) = &self.got {
                write!(f, "\n{indent}\t     got: {got}")?;
            }
            if let Some(expected) = &self.expected {
                write!(f, "\n{indent}\texpected: {expected}")?;
            }
        }
        if let Some(origin) = &self.origin {
            write!(f, "\n{indent}Originates from following error:\n")?;
            let nested = format!("{indent}\t");
            let mut first = true;
            for err in origin.iter() {
                if !first {
                    writeln!(f)?;
                }
                first = false;
                err.write_one(f, &nested)?;
            }
        }
        if let Some(location) = &self.location {
            write!(f, "\n{indent}{location}")?;
        }
        Ok(())
    }
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            err.write_one(f, "")?;
        }
        Ok(())
    }
}

impl std::error::Error for MatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.origin
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// UsageError
// ═══════════════════════════════════════════════════════════════════════════════

/// A rule built with arguments it cannot work with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    /// An argument of the wrong shape or type.
    #[error("{op}: {reason}")]
    BadArgument { op: &'static str, reason: String },

    /// Range bounds of different types.
    #[error("{op}: bounds must share a type, got {from} and {to}")]
    IncompatibleBounds {
        op: &'static str,
        from: String,
        to: String,
    },

    /// An override naming a field the model does not have.
    #[error("{op}: {model} has no field {field:?}")]
    UnknownField {
        op: &'static str,
        model: String,
        field: String,
    },

    /// A pattern that does not compile.
    #[error("{op}: invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        op: &'static str,
        pattern: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_substitution() {
        let err = MatchError::new(ErrorKind::SetMismatch, "comparing hash keys of %%")
            .at("DATA.m".to_string());
        assert_eq!(err.message(), "comparing hash keys of DATA.m");
        assert_eq!(err.path(), "DATA.m");
    }

    #[test]
    fn test_chain_order_and_len() {
        let chain = MatchError::chain(vec![
            MatchError::new(ErrorKind::ValueMismatch, "a"),
            MatchError::new(ErrorKind::ValueMismatch, "b"),
            MatchError::too_many_errors(),
        ])
        .unwrap();
        let messages: Vec<&str> = chain.iter().map(MatchError::message).collect();
        assert_eq!(messages[..2], ["a", "b"]);
        assert_eq!(chain.len(), 3);
        assert!(chain.is_truncated());
        assert!(MatchError::chain(Vec::new()).is_none());
    }

    #[test]
    fn test_display() {
        let err = MatchError::new(ErrorKind::ValueMismatch, "values differ")
            .got(3)
            .expected(4)
            .at("DATA[2]".to_string());
        assert_eq!(
            err.to_string(),
            "DATA[2]: values differ\n\t     got: 3\n\texpected: 4"
        );
    }

    #[test]
    fn test_display_origin_and_location() {
        let origin = MatchError::new(ErrorKind::ValueMismatch, "values differ")
            .got(1)
            .expected(2)
            .at("DATA".to_string());
        let err = MatchError::new(ErrorKind::ValueMismatch, "compared (part 1 of 2)")
            .origin(origin)
            .located(OperatorLocation {
                name: "All",
                file: "t.rs",
                line: 7,
            })
            .at("DATA".to_string());

        let rendered = err.to_string();
        assert!(rendered.contains("Originates from following error:\n\tDATA: values differ"));
        assert!(rendered.ends_with("[under operator All at t.rs:7]"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_usage_error_display() {
        let err = UsageError::IncompatibleBounds {
            op: "Between",
            from: "i64".into(),
            to: "String".into(),
        };
        assert_eq!(
            err.to_string(),
            "Between: bounds must share a type, got i64 and String"
        );
    }
}
