//! Comparison configuration.
//!
//! A [`Config`] is read once when a matching pass starts. The pass copies the
//! mode flags into its context, so rules may scope overrides without touching
//! the caller's configuration.
//!
//! With the `serde` feature, every field is optional when deserializing:
//!
//! ```yaml
//! root_name: got
//! max_errors: -1
//! be_lax: true
//! ignore_unexported_types: [Secret]
//! ```

use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::{DEFAULT_MAX_ERRORS, MAX_ERRORS_ENV};

/// Toggles for one matching pass.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct Config {
    /// Label of the path root.
    pub root_name: String,

    /// Mismatches reported before truncating. Negative means unlimited,
    /// zero behaves as one.
    pub max_errors: i64,

    /// Whether a failed assertion aborts the test.
    pub failure_is_fatal: bool,

    /// Honor custom equality methods on every struct type.
    pub use_equal: bool,

    /// Honor custom equality methods on these struct types only.
    pub use_equal_types: BTreeSet<String>,

    /// Compare convertible values of different types after conversion.
    pub be_lax: bool,

    /// Skip unexported fields of every struct type.
    pub ignore_unexported: bool,

    /// Skip unexported fields of these struct types only.
    pub ignore_unexported_types: BTreeSet<String>,

    /// Tolerate rule nodes on the got side.
    pub operator_in_got: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_name: "DATA".to_string(),
            max_errors: default_max_errors(),
            failure_is_fatal: false,
            use_equal: false,
            use_equal_types: BTreeSet::new(),
            be_lax: false,
            ignore_unexported: false,
            ignore_unexported_types: BTreeSet::new(),
            operator_in_got: false,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    #[must_use]
    pub fn max_errors(mut self, max: i64) -> Self {
        self.max_errors = max;
        self
    }

    #[must_use]
    pub fn failure_is_fatal(mut self, fatal: bool) -> Self {
        self.failure_is_fatal = fatal;
        self
    }

    #[must_use]
    pub fn use_equal(mut self, enabled: bool) -> Self {
        self.use_equal = enabled;
        self
    }

    #[must_use]
    pub fn use_equal_for(mut self, type_name: impl Into<String>) -> Self {
        self.use_equal_types.insert(type_name.into());
        self
    }

    #[must_use]
    pub fn be_lax(mut self, lax: bool) -> Self {
        self.be_lax = lax;
        self
    }

    #[must_use]
    pub fn ignore_unexported(mut self, ignore: bool) -> Self {
        self.ignore_unexported = ignore;
        self
    }

    #[must_use]
    pub fn ignore_unexported_of(mut self, type_name: impl Into<String>) -> Self {
        self.ignore_unexported_types.insert(type_name.into());
        self
    }

    #[must_use]
    pub fn operator_in_got(mut self, allowed: bool) -> Self {
        self.operator_in_got = allowed;
        self
    }

    /// Whether the equality hook of struct type `name` is honored.
    #[must_use]
    pub fn uses_equal(&self, name: &str) -> bool {
        self.use_equal || self.use_equal_types.contains(name)
    }

    /// Whether unexported fields of struct type `name` are skipped.
    #[must_use]
    pub fn ignores_unexported(&self, name: &str) -> bool {
        self.ignore_unexported || self.ignore_unexported_types.contains(name)
    }
}

/// [`DEFAULT_MAX_ERRORS`], unless the environment overrides it.
///
/// The variable is read once per process.
#[must_use]
pub fn default_max_errors() -> i64 {
    static MAX: OnceLock<i64> = OnceLock::new();
    *MAX.get_or_init(|| {
        std::env::var(MAX_ERRORS_ENV)
            .ok()
            .map_or(DEFAULT_MAX_ERRORS, |raw| parse_max_errors(&raw))
    })
}

fn parse_max_errors(raw: &str) -> i64 {
    match raw.trim().parse::<i64>() {
        Ok(max) => max,
        Err(err) => {
            tracing::warn!(
                var = MAX_ERRORS_ENV,
                value = raw,
                error = %err,
                "ignoring unparsable error limit"
            );
            DEFAULT_MAX_ERRORS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.root_name, "DATA");
        assert!(!config.be_lax);
        assert!(!config.operator_in_got);
    }

    #[test]
    fn test_builders() {
        let config = Config::new()
            .root_name("got")
            .max_errors(-1)
            .be_lax(true)
            .use_equal_for("Money")
            .ignore_unexported_of("Secret");
        assert_eq!(config.root_name, "got");
        assert_eq!(config.max_errors, -1);
        assert!(config.be_lax);
        assert!(config.uses_equal("Money"));
        assert!(!config.uses_equal("Other"));
        assert!(config.ignores_unexported("Secret"));
        assert!(!config.ignores_unexported("Other"));
        assert!(config.clone().ignore_unexported(true).ignores_unexported("Other"));
    }

    #[test]
    fn test_parse_max_errors() {
        assert_eq!(parse_max_errors("-1"), -1);
        assert_eq!(parse_max_errors(" 3 "), 3);
        assert_eq!(parse_max_errors("lots"), DEFAULT_MAX_ERRORS);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_partial() {
        let config: Config =
            serde_json::from_str(r#"{"be_lax": true, "ignore_unexported_types": ["S"]}"#).unwrap();
        assert!(config.be_lax);
        assert_eq!(config.root_name, "DATA");
        assert!(config.ignores_unexported("S"));
    }
}
