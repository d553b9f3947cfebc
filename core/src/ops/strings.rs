//! String rules: prefix, suffix and regular expressions.
//!
//! Regular expressions use the `regex` crate, which matches in linear time.

use std::fmt;

use crate::context::Context;
use crate::error::{ErrorKind, MatchError, MatchResult, UsageError};
use crate::operator::{op, op_base_accessors, OpBase, Operator};
use crate::value::{Type, Value};

enum Pattern {
    Prefix { value: String, ignore_case: bool },
    Suffix { value: String, ignore_case: bool },
    /// `None` when the pattern failed to compile; the usage error says why.
    Regex { source: String, re: Option<regex::Regex> },
}

impl Pattern {
    fn matches(&self, input: &str) -> bool {
        match self {
            Self::Prefix { value, ignore_case } => {
                if *ignore_case {
                    input
                        .get(..value.len())
                        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(value))
                } else {
                    input.starts_with(value.as_str())
                }
            }
            Self::Suffix { value, ignore_case } => {
                if *ignore_case {
                    input
                        .len()
                        .checked_sub(value.len())
                        .and_then(|start| input.get(start..))
                        .is_some_and(|suffix| suffix.eq_ignore_ascii_case(value))
                } else {
                    input.ends_with(value.as_str())
                }
            }
            Self::Regex { re, .. } => re.as_ref().is_some_and(|re| re.is_match(input)),
        }
    }
}

/// Matches a string got against a [`Pattern`].
pub struct StringRule {
    base: OpBase,
    pattern: Pattern,
}

impl fmt::Display for StringRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pattern {
            Pattern::Prefix { value, .. } | Pattern::Suffix { value, .. } => {
                write!(f, "{}({value:?})", self.base.name())
            }
            Pattern::Regex { source, .. } => write!(f, "Re({source:?})"),
        }
    }
}

impl Operator for StringRule {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let Some(input) = got.concrete().as_str() else {
            return self.base.collect(ctx, || {
                MatchError::new(ErrorKind::TypeMismatch, "type mismatch")
                    .got(got.ty().map_or_else(|| "nil".to_string(), |t| t.to_string()))
                    .expected(Type::String)
            });
        };
        if self.pattern.matches(input) {
            return Ok(());
        }
        self.base.collect(ctx, || {
            MatchError::new(ErrorKind::ValueMismatch, "values differ")
                .got(got)
                .expected(self)
        })
    }

    fn type_behind(&self) -> Option<Type> {
        Some(Type::String)
    }
}

#[track_caller]
fn affix(name: &'static str, pattern: Pattern) -> Value {
    op(StringRule {
        base: OpBase::new(name),
        pattern,
    })
}

/// String starting with `prefix`.
#[track_caller]
#[must_use]
pub fn has_prefix(prefix: impl Into<String>) -> Value {
    affix(
        "HasPrefix",
        Pattern::Prefix {
            value: prefix.into(),
            ignore_case: false,
        },
    )
}

/// Like [`has_prefix`], ignoring ASCII case.
#[track_caller]
#[must_use]
pub fn has_prefix_ignore_case(prefix: impl Into<String>) -> Value {
    affix(
        "HasPrefix",
        Pattern::Prefix {
            value: prefix.into(),
            ignore_case: true,
        },
    )
}

/// String ending with `suffix`.
#[track_caller]
#[must_use]
pub fn has_suffix(suffix: impl Into<String>) -> Value {
    affix(
        "HasSuffix",
        Pattern::Suffix {
            value: suffix.into(),
            ignore_case: false,
        },
    )
}

/// Like [`has_suffix`], ignoring ASCII case.
#[track_caller]
#[must_use]
pub fn has_suffix_ignore_case(suffix: impl Into<String>) -> Value {
    affix(
        "HasSuffix",
        Pattern::Suffix {
            value: suffix.into(),
            ignore_case: true,
        },
    )
}

/// String matching the regular expression `pattern` anywhere.
///
/// An invalid pattern is reported when the rule is matched.
///
/// ```
/// use deepmatch::ops::re;
///
/// assert!(deepmatch::eq_deeply("user-42", re(r"^user-\d+$")));
/// assert!(!deepmatch::eq_deeply("user-x", re(r"^user-\d+$")));
/// ```
#[track_caller]
#[must_use]
pub fn re(pattern: &str) -> Value {
    let mut base = OpBase::new("Re");
    let compiled = match regex::Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            base.flag(UsageError::InvalidPattern {
                op: "Re",
                pattern: pattern.to_string(),
                reason: err.to_string(),
            });
            None
        }
    };
    op(StringRule {
        base,
        pattern: Pattern::Regex {
            source: pattern.to_string(),
            re: compiled,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Interface;
    use crate::{eq_deeply, eq_deeply_error};

    #[test]
    fn test_prefix_suffix() {
        assert!(eq_deeply("/api/users", has_prefix("/api")));
        assert!(!eq_deeply("/other", has_prefix("/api")));
        assert!(eq_deeply("main.rs", has_suffix(".rs")));
        assert!(!eq_deeply("main.py", has_suffix(".rs")));
    }

    #[test]
    fn test_ignore_case() {
        assert!(eq_deeply("/API/users", has_prefix_ignore_case("/api")));
        assert!(eq_deeply("README.MD", has_suffix_ignore_case(".md")));
        assert!(!eq_deeply("a", has_suffix_ignore_case("long")));
    }

    #[test]
    fn test_regex() {
        assert!(eq_deeply("user-123", re(r"^user-\d+$")));
        let err = eq_deeply_error("x", re("[bad")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.summary_text().unwrap().contains("invalid pattern"));
    }

    #[test]
    fn test_non_string_got() {
        let err = eq_deeply_error(12i64, has_prefix("1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(err.expected_rendering(), Some("String"));
    }

    #[test]
    fn test_interface_got_unwrapped() {
        let got = Value::Interface(Interface::new("Display", crate::value("hello")));
        assert!(eq_deeply(got, has_prefix("he")));
    }

    #[test]
    fn test_display() {
        assert_eq!(has_prefix("ab").to_string(), "HasPrefix(\"ab\")");
        assert_eq!(re("^a").to_string(), "Re(\"^a\")");
    }
}
