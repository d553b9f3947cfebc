//! Rule registry: named factories turning JSON rule objects into rule nodes.
//!
//! An expectation document is plain JSON where any object of the shape
//! `{"$op": "Name", "args": [...]}` stands for a rule. Arguments are loaded
//! recursively, so rules nest:
//!
//! ```
//! use deepmatch::json::from_json;
//! use deepmatch::{register_core_rules, RuleRegistryBuilder};
//! use serde_json::json;
//!
//! let registry = register_core_rules(RuleRegistryBuilder::new()).build();
//! let expected = registry
//!     .load(&json!({
//!         "id": {"$op": "All", "args": [{"$op": "Gt", "args": [0]}, {"$op": "Lt", "args": [100]}]},
//!         "tags": {"$op": "Bag", "args": ["b", "a"]}
//!     }))
//!     .unwrap();
//!
//! let got = from_json(&json!({"id": 42, "tags": ["a", "b"]}));
//! assert!(deepmatch::eq_deeply(got, expected));
//! ```
//!
//! # Immutability after build
//!
//! Factories are registered on a [`RuleRegistryBuilder`]; [`build`] freezes
//! them into a [`RuleRegistry`] that can be shared across threads.
//!
//! [`build`]: RuleRegistryBuilder::build

use std::collections::HashMap;

use crate::json;
use crate::ops;
use crate::value::Value;

/// Key marking an object as a rule.
pub const RULE_KEY: &str = "$op";

/// Key holding a rule's arguments.
pub const ARGS_KEY: &str = "args";

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors from loading an expectation document.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The rule name is not registered.
    #[error("unknown rule \"{name}\"{}", available_hint(.available))]
    UnknownRule {
        name: String,
        /// Registered names, sorted, for self-correcting messages.
        available: Vec<String>,
    },

    /// Wrong number of arguments.
    #[error("{rule}: expected {expected} argument(s), got {got}")]
    Arity {
        rule: String,
        expected: String,
        got: usize,
    },

    /// An argument or the rule object itself has the wrong shape.
    #[error("{rule}: {reason}")]
    InvalidArgument { rule: String, reason: String },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn available_hint(available: &[String]) -> String {
    if available.is_empty() {
        " - no rules are registered".to_string()
    } else {
        format!(" - registered: {}", available.join(", "))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Argument helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Exactly `N` arguments.
///
/// # Errors
///
/// [`RegistryError::Arity`] when the count differs.
pub fn exact_args<const N: usize>(rule: &str, args: Vec<Value>) -> Result<[Value; N], RegistryError> {
    let got = args.len();
    <[Value; N]>::try_from(args).map_err(|_| RegistryError::Arity {
        rule: rule.to_string(),
        expected: N.to_string(),
        got,
    })
}

/// The argument as a string.
///
/// # Errors
///
/// [`RegistryError::InvalidArgument`] when it is not one.
pub fn string_arg(rule: &str, arg: &Value) -> Result<String, RegistryError> {
    arg.as_str()
        .map(str::to_string)
        .ok_or_else(|| RegistryError::InvalidArgument {
            rule: rule.to_string(),
            reason: format!("expected a string argument, got {arg}"),
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// Type-erased rule factory: loaded arguments in, rule node out.
pub type RuleFactory = Box<dyn Fn(Vec<Value>) -> Result<Value, RegistryError> + Send + Sync>;

/// Builder for constructing a [`RuleRegistry`].
#[derive(Default)]
pub struct RuleRegistryBuilder {
    factories: HashMap<String, RuleFactory>,
}

impl RuleRegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`. A later registration replaces an
    /// earlier one.
    #[must_use]
    pub fn rule<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, RegistryError> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_owned(), Box::new(factory));
        self
    }

    /// Freeze the registry. No further registration is possible.
    #[must_use]
    pub fn build(self) -> RuleRegistry {
        RuleRegistry {
            factories: self.factories,
        }
    }
}

macro_rules! nullary {
    ($builder:expr, $($name:literal => $ctor:path),* $(,)?) => {
        $builder$(.rule($name, |args| {
            let [] = exact_args::<0>($name, args)?;
            Ok($ctor())
        }))*
    };
}

macro_rules! unary {
    ($builder:expr, $($name:literal => $ctor:path),* $(,)?) => {
        $builder$(.rule($name, |args| {
            let [arg] = exact_args::<1>($name, args)?;
            Ok($ctor(arg))
        }))*
    };
}

macro_rules! variadic {
    ($builder:expr, $($name:literal => $ctor:path),* $(,)?) => {
        $builder$(.rule($name, |args| Ok($ctor(args))))*
    };
}

macro_rules! model {
    ($builder:expr, $($name:literal => $ctor:path),* $(,)?) => {
        $builder$(.rule($name, |args| {
            let [model] = exact_args::<1>($name, args)?;
            Ok($ctor(model, Vec::<(Value, Value)>::new()))
        }))*
    };
}

macro_rules! string_rule {
    ($builder:expr, $($name:literal => $ctor:path),* $(,)?) => {
        $builder$(.rule($name, |args| {
            let [arg] = exact_args::<1>($name, args)?;
            Ok($ctor(string_arg($name, &arg)?))
        }))*
    };
}

/// Register the built-in rules that make sense in a JSON document.
///
/// Names match the rules' own names in diagnostics: `All`, `Any`, `None`,
/// `Not`, `Ignore`, `Nil`, `NotNil`, `Empty`, `NotEmpty`, `Gt`, `Gte`, `Lt`,
/// `Lte`, `Between`, `N`, `Len`, `HasPrefix`, `HasSuffix`, `Re`, `Contains`,
/// `ContainsKey`, `List`, `Bag`, `SubBagOf`, `SuperBagOf`, `Set`,
/// `SubSetOf`, `SuperSetOf`, `NotAny`, `Map`, `SubMapOf`, `SuperMapOf`,
/// `Smuggle`.
#[must_use]
pub fn register_core_rules(builder: RuleRegistryBuilder) -> RuleRegistryBuilder {
    let builder = nullary!(builder,
        "Ignore" => ops::ignore,
        "Nil" => ops::nil,
        "NotNil" => ops::not_nil,
        "Empty" => ops::empty,
        "NotEmpty" => ops::not_empty,
    );
    let builder = unary!(builder,
        "Not" => ops::not,
        "Gt" => ops::gt,
        "Gte" => ops::gte,
        "Lt" => ops::lt,
        "Lte" => ops::lte,
        "Len" => ops::len,
        "Contains" => ops::contains,
        "ContainsKey" => ops::contains_key,
    );
    let builder = variadic!(builder,
        "All" => ops::all,
        "Any" => ops::any,
        "None" => ops::none,
        "List" => ops::list,
        "Bag" => ops::bag,
        "SubBagOf" => ops::sub_bag_of,
        "SuperBagOf" => ops::super_bag_of,
        "Set" => ops::set,
        "SubSetOf" => ops::sub_set_of,
        "SuperSetOf" => ops::super_set_of,
        "NotAny" => ops::not_any,
    );
    let builder = model!(builder,
        "Map" => ops::map_of,
        "SubMapOf" => ops::sub_map_of,
        "SuperMapOf" => ops::super_map_of,
    );
    let builder = string_rule!(builder,
        "HasPrefix" => ops::has_prefix,
        "HasSuffix" => ops::has_suffix,
    );
    builder
        .rule("Re", |args| {
            let [pattern] = exact_args::<1>("Re", args)?;
            Ok(ops::re(&string_arg("Re", &pattern)?))
        })
        .rule("Between", |args| {
            let [from, to] = exact_args::<2>("Between", args)?;
            Ok(ops::between(from, to))
        })
        .rule("N", |args| {
            let [num, tolerance] = exact_args::<2>("N", args)?;
            Ok(ops::approx(num, tolerance))
        })
        .rule("Smuggle", |args| {
            let [path, expected] = exact_args::<2>("Smuggle", args)?;
            Ok(ops::smuggle_path(&string_arg("Smuggle", &path)?, expected))
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable registry of rule factories.
pub struct RuleRegistry {
    factories: HashMap<String, RuleFactory>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.names())
            .finish()
    }
}

impl RuleRegistry {
    /// Convert an expectation document, building rule objects on the way.
    ///
    /// # Errors
    ///
    /// [`RegistryError`] for unknown rules, wrong arities and malformed rule
    /// objects.
    pub fn load(&self, doc: &serde_json::Value) -> Result<Value, RegistryError> {
        match doc {
            serde_json::Value::Array(items) => Ok(json::array(
                items
                    .iter()
                    .map(|item| self.load(item))
                    .collect::<Result<_, _>>()?,
            )),
            serde_json::Value::Object(entries) => match entries.get(RULE_KEY) {
                Some(name) => self.load_rule(name, entries),
                None => Ok(json::object(
                    entries
                        .iter()
                        .map(|(k, v)| Ok((k.clone(), self.load(v)?)))
                        .collect::<Result<_, RegistryError>>()?,
                )),
            },
            scalar => Ok(json::convert_scalar(scalar)),
        }
    }

    /// Parse `text` as JSON, then [`load`](Self::load) it.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Json`] on a syntax error, otherwise as [`load`](Self::load).
    pub fn load_str(&self, text: &str) -> Result<Value, RegistryError> {
        let doc: serde_json::Value = serde_json::from_str(text)?;
        self.load(&doc)
    }

    fn load_rule(
        &self,
        name: &serde_json::Value,
        entries: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Value, RegistryError> {
        let Some(name) = name.as_str() else {
            return Err(RegistryError::InvalidArgument {
                rule: RULE_KEY.to_string(),
                reason: format!("rule name must be a string, got {name}"),
            });
        };
        if let Some(key) = entries.keys().find(|k| *k != RULE_KEY && *k != ARGS_KEY) {
            return Err(RegistryError::InvalidArgument {
                rule: name.to_string(),
                reason: format!("unexpected key {key:?} in rule object"),
            });
        }
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::UnknownRule {
                name: name.to_string(),
                available: self.names().into_iter().map(str::to_string).collect(),
            })?;

        let args = match entries.get(ARGS_KEY) {
            None => Vec::new(),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .map(|item| self.load(item))
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(RegistryError::InvalidArgument {
                    rule: name.to_string(),
                    reason: format!("{ARGS_KEY} must be an array, got {other}"),
                })
            }
        };
        tracing::trace!(rule = name, args = args.len(), "building rule");
        factory(args)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered rule names (sorted).
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::from_json;
    use crate::{eq_deeply, eq_deeply_error, ErrorKind};
    use serde_json::json;

    fn registry() -> RuleRegistry {
        register_core_rules(RuleRegistryBuilder::new()).build()
    }

    #[test]
    fn test_plain_documents_load_as_data() {
        let doc = json!({"a": [1, 2.5, null, "x"]});
        let loaded = registry().load(&doc).unwrap();
        assert!(eq_deeply(from_json(&doc), loaded));
    }

    #[test]
    fn test_nested_rules() {
        let expected = registry()
            .load(&json!({"$op": "Not", "args": [{"$op": "Between", "args": [1, 5]}]}))
            .unwrap();
        assert!(eq_deeply(6i64, expected.clone()));
        assert!(!eq_deeply(3i64, expected));
    }

    #[test]
    fn test_rule_inside_data() {
        let expected = registry()
            .load(&json!({"name": {"$op": "HasPrefix", "args": ["bo"]}, "age": 3}))
            .unwrap();
        assert!(eq_deeply(from_json(&json!({"name": "bob", "age": 3})), expected.clone()));

        let err = eq_deeply_error(from_json(&json!({"name": "al", "age": 3})), expected).unwrap_err();
        assert_eq!(err.path(), r#"DATA["name"]"#);
    }

    #[test]
    fn test_args_default_to_empty() {
        let expected = registry().load(&json!({"$op": "NotNil"})).unwrap();
        assert!(eq_deeply(from_json(&json!(1)), expected));
    }

    #[test]
    fn test_unknown_rule_lists_available() {
        let err = registry().load(&json!({"$op": "Nope"})).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("unknown rule \"Nope\" - registered: All, Any, Bag"));
        assert!(matches!(err, RegistryError::UnknownRule { .. }));

        let empty = RuleRegistryBuilder::new().build();
        let err = empty.load(&json!({"$op": "Gt"})).unwrap_err();
        assert!(err.to_string().ends_with("no rules are registered"));
    }

    #[test]
    fn test_arity_and_shape_errors() {
        let err = registry().load(&json!({"$op": "Gt", "args": []})).unwrap_err();
        assert_eq!(err.to_string(), "Gt: expected 1 argument(s), got 0");

        let err = registry().load(&json!({"$op": "Re", "args": [3]})).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument { .. }));

        let err = registry().load(&json!({"$op": "Gt", "args": 3})).unwrap_err();
        assert!(err.to_string().contains("args must be an array"));

        let err = registry().load(&json!({"$op": "Gt", "arg": [3]})).unwrap_err();
        assert!(err.to_string().contains("unexpected key"));
    }

    #[test]
    fn test_load_str_reports_json_errors() {
        let err = registry().load_str("{").unwrap_err();
        assert!(matches!(err, RegistryError::Json(_)));
    }

    #[test]
    fn test_usage_errors_surface_at_match_time() {
        let expected = registry()
            .load(&json!({"$op": "Between", "args": [1, "z"]}))
            .unwrap();
        let err = eq_deeply_error(2i64, expected).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_custom_rule() {
        let registry = RuleRegistryBuilder::new()
            .rule("Positive", |args| {
                let [] = exact_args::<0>("Positive", args)?;
                Ok(ops::gt(0i64))
            })
            .build();
        assert_eq!(registry.names(), vec!["Positive"]);
        assert!(eq_deeply(5i64, registry.load(&json!({"$op": "Positive"})).unwrap()));
    }

    #[test]
    fn test_smuggle_path_over_documents() {
        let expected = registry()
            .load(&json!({"$op": "Smuggle", "args": ["user.ids[1]", 7]}))
            .unwrap();
        assert!(eq_deeply(from_json(&json!({"user": {"ids": [3, 7]}})), expected));
    }
}
