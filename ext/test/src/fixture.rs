//! Conformance test fixture runner
//!
//! Loads YAML fixtures and runs them against the deepmatch engine.
//!
//! ```yaml
//! name: slices
//! description: element-wise comparison
//! config:
//!   max_errors: 2
//! cases:
//!   - name: last element differs
//!     got: [1, 2, 3]
//!     expected: [1, 2, 4]
//!     expect: mismatch
//!     paths: ["DATA[2]"]
//! ```
//!
//! `got` is plain data. `expected` may hold rule objects
//! (`{"$op": "Gt", "args": [0]}`), built with [`register_test_rules`].

use deepmatch::json::from_json;
use deepmatch::{evaluate_detailed, Config, ErrorKind, MatchError, RuleRegistry, RuleRegistryBuilder, Session};
use serde::Deserialize;

use crate::register_test_rules;

/// A complete test fixture
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: Config,
    pub cases: Vec<TestCase>,
}

/// Expected outcome of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expect {
    Match,
    Mismatch,
}

/// Test case
#[derive(Debug, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub got: serde_json::Value,
    pub expected: serde_json::Value,
    pub expect: Expect,
    /// Number of errors in the chain, truncation marker included.
    #[serde(default)]
    pub errors: Option<usize>,
    /// Leading error paths, in chain order.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Message of the first error.
    #[serde(default)]
    pub message: Option<String>,
    /// Kind of the first error, as its variant name (`TypeMismatch`, ...).
    #[serde(default)]
    pub kind: Option<String>,
}

/// Result of running a single test case
#[derive(Debug)]
pub struct CaseResult {
    pub case_name: String,
    pub passed: bool,
    /// Why the case failed, if it did.
    pub reason: Option<String>,
}

impl TestCase {
    fn check(&self, registry: &RuleRegistry, config: &Config) -> Result<(), String> {
        let expected = registry
            .load(&self.expected)
            .map_err(|e| format!("cannot load expected: {e}"))?;
        let got = from_json(&self.got);
        let res = evaluate_detailed(config, &Session::new(), got, expected);

        match (self.expect, res) {
            (Expect::Match, Ok(())) => Ok(()),
            (Expect::Match, Err(err)) => Err(format!("expected a match, got:\n{err}")),
            (Expect::Mismatch, Ok(())) => Err("expected a mismatch, got a match".to_string()),
            (Expect::Mismatch, Err(err)) => self.check_error(&err),
        }
    }

    fn check_error(&self, err: &MatchError) -> Result<(), String> {
        if let Some(errors) = self.errors {
            if err.len() != errors {
                return Err(format!("expected {errors} error(s), got {}:\n{err}", err.len()));
            }
        }
        let paths: Vec<&str> = err.iter().map(MatchError::path).take(self.paths.len()).collect();
        if paths != self.paths {
            return Err(format!("expected paths {:?}, got {paths:?}", self.paths));
        }
        if let Some(message) = &self.message {
            if err.message() != message {
                return Err(format!("expected message {message:?}, got {:?}", err.message()));
            }
        }
        if let Some(kind) = &self.kind {
            let actual = kind_name(err.kind());
            if actual != *kind {
                return Err(format!("expected kind {kind}, got {actual}"));
            }
        }
        Ok(())
    }
}

fn kind_name(kind: ErrorKind) -> String {
    format!("{kind:?}")
}

impl Fixture {
    /// Parse a fixture from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse multiple fixtures from a YAML file with `---` separators
    pub fn from_yaml_multi(yaml: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        let mut fixtures = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            fixtures.push(Self::deserialize(doc)?);
        }
        Ok(fixtures)
    }

    /// Run all test cases and return results
    pub fn run(&self) -> Vec<CaseResult> {
        let registry = register_test_rules(RuleRegistryBuilder::new()).build();
        self.cases
            .iter()
            .map(|case| {
                let outcome = case.check(&registry, &self.config);
                tracing::debug!(
                    fixture = %self.name,
                    case = %case.name,
                    passed = outcome.is_ok(),
                    "ran fixture case"
                );
                CaseResult {
                    case_name: case.name.clone(),
                    passed: outcome.is_ok(),
                    reason: outcome.err(),
                }
            })
            .collect()
    }

    /// Run all test cases and panic on first failure
    pub fn run_and_assert(&self) {
        for result in self.run() {
            assert!(
                result.passed,
                "Fixture '{}' case '{}' failed: {}",
                self.name,
                result.case_name,
                result.reason.unwrap_or_default()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
name: inline
description: runner smoke test
config:
  root_name: doc
cases:
  - name: equal
    got: {a: [1, 2]}
    expected: {a: [1, 2]}
    expect: match
  - name: rule
    got: 5
    expected: {$op: Between, args: [1, 9]}
    expect: match
  - name: path
    got: {a: [1, 2]}
    expected: {a: [1, 3]}
    expect: mismatch
    errors: 1
    paths: ['doc["a"][1]']
    message: values differ
    kind: ValueMismatch
"#;

    #[test]
    fn test_inline_fixture_passes() {
        let fixture = Fixture::from_yaml(YAML).unwrap();
        assert_eq!(fixture.config.root_name, "doc");
        fixture.run_and_assert();
    }

    #[test]
    fn test_wrong_expectation_is_reported() {
        let mut fixture = Fixture::from_yaml(YAML).unwrap();
        fixture.cases[0].expect = Expect::Mismatch;
        let results = fixture.run();
        assert!(!results[0].passed);
        assert_eq!(results[0].reason.as_deref(), Some("expected a mismatch, got a match"));
        assert!(results[1].passed);
    }

    #[test]
    fn test_unknown_rule_fails_the_case() {
        let fixture = Fixture::from_yaml(
            "name: x\ncases:\n  - {name: c, got: 1, expected: {$op: Nope}, expect: match}\n",
        )
        .unwrap();
        let results = fixture.run();
        assert!(results[0].reason.as_deref().unwrap_or("").starts_with("cannot load expected"));
    }
}
