//! Structural overrides: a literal model with some fields or keys replaced
//! by nested rules.

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::engine::compare_map_entries;
use crate::error::{ErrorKind, MatchError, MatchResult, UsageError};
use crate::operator::{op, op_base_accessors, OpBase, Operator};
use crate::path::PathStep;
use crate::value::{same_key, IntoValue, Map, StructValue, Type, Value};

fn type_name(v: &Value) -> String {
    v.ty().map_or_else(|| "nil".to_string(), |t| t.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Struct / SStruct
// ═══════════════════════════════════════════════════════════════════════════════

/// Field-wise comparison against a model struct, with overrides.
///
/// `Struct` only checks the model fields that are non-zero plus overrides.
/// `SStruct` checks every field.
pub struct StructRule {
    base: OpBase,
    name: Arc<str>,
    by_ptr: bool,
    fields: Vec<(Arc<str>, bool, Value)>,
}

impl StructRule {
    #[track_caller]
    fn build<I, N, V>(op_name: &'static str, strict: bool, model: Value, overrides: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: IntoValue,
    {
        let mut base = OpBase::new(op_name);
        let (by_ptr, model) = match model {
            Value::Struct(s) => (false, s),
            Value::Ptr(p) => match p.get() {
                Some(Value::Struct(s)) => (true, s.clone()),
                target => {
                    base.flag(UsageError::BadArgument {
                        op: op_name,
                        reason: match target {
                            Some(other) => format!("model must point to a struct, got &{}", type_name(other)),
                            None => "model is a nil pointer".to_string(),
                        },
                    });
                    (true, StructValue::new("<invalid>"))
                }
            },
            other => {
                base.flag(UsageError::BadArgument {
                    op: op_name,
                    reason: format!("model must be a struct or a pointer to one, got {}", type_name(&other)),
                });
                (false, StructValue::new("<invalid>"))
            }
        };

        let mut overrides: Vec<(String, Value)> = overrides
            .into_iter()
            .map(|(n, v)| (n.as_ref().to_string(), v.into_value()))
            .collect();
        for (field, _) in &overrides {
            if model.get(field).is_none() {
                base.flag(UsageError::UnknownField {
                    op: op_name,
                    model: model.name().to_string(),
                    field: field.clone(),
                });
            }
        }

        let fields = model
            .fields()
            .iter()
            .filter_map(|f| {
                let expected = match overrides.iter().position(|(n, _)| **n == *f.name) {
                    Some(i) => overrides.swap_remove(i).1,
                    None if strict || !f.value.is_zero() => f.value.clone(),
                    None => return None,
                };
                Some((Arc::clone(&f.name), f.exported, expected))
            })
            .collect();

        Self {
            base,
            name: Arc::from(model.name()),
            by_ptr,
            fields,
        }
    }

    fn compare_fields(&self, ctx: &mut Context<'_>, got: &StructValue) -> MatchResult {
        let skip_unexported = ctx.config().ignores_unexported(got.name());
        for (name, exported, expected) in &self.fields {
            if skip_unexported && !exported {
                continue;
            }
            let Some(field) = got.get(name) else {
                return self.base.collect(ctx, || {
                    MatchError::new(ErrorKind::TypeMismatch, format!("field {name} not found"))
                        .got(Value::Struct(got.clone()))
                        .expected(self)
                });
            };
            ctx.descend(PathStep::Field(Arc::clone(name)), |ctx| {
                ctx.compare(&field.value, expected)
            })?;
        }
        Ok(())
    }

    fn wrong_type(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let expected = self.type_behind();
        self.base.collect(ctx, || {
            MatchError::new(ErrorKind::TypeMismatch, "type mismatch")
                .got(type_name(got))
                .expected(expected.map_or_else(String::new, |t| t.to_string()))
        })
    }
}

impl fmt::Display for StructRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}{} {{", self.base.name(), if self.by_ptr { "&" } else { "" }, self.name)?;
        for (i, (name, _, value)) in self.fields.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{name}: {value}")?;
        }
        if self.fields.is_empty() {
            f.write_str("})")
        } else {
            f.write_str(" })")
        }
    }
}

impl Operator for StructRule {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let got = got.concrete();
        if self.by_ptr {
            let Value::Ptr(ptr) = got else {
                return self.wrong_type(ctx, got);
            };
            return match ptr.get() {
                Some(Value::Struct(s)) if *s.name() == *self.name => {
                    ctx.descend(PathStep::Deref, |ctx| self.compare_fields(ctx, s))
                }
                None if ptr.is_null() => self.base.collect(ctx, || {
                    MatchError::new(ErrorKind::NilMismatch, "values differ")
                        .got(got)
                        .expected(self)
                }),
                _ => self.wrong_type(ctx, got),
            };
        }
        match got {
            Value::Struct(s) if *s.name() == *self.name => self.compare_fields(ctx, s),
            _ => self.wrong_type(ctx, got),
        }
    }

    fn type_behind(&self) -> Option<Type> {
        let ty = Type::Struct(Arc::clone(&self.name));
        Some(if self.by_ptr { Type::ptr(ty) } else { ty })
    }
}

/// Compare got with `model`, checking only non-zero model fields and the
/// `overrides`.
///
/// ```
/// use deepmatch::ops::{gt, struct_of};
/// use deepmatch::{StructValue, Value};
///
/// let got = StructValue::new("User").field("name", "bob").field("age", 42i64);
/// let model = StructValue::new("User").field("name", "bob").field("age", 0i64);
/// assert!(deepmatch::eq_deeply(got, struct_of(model, [("age", gt(18i64))])));
/// ```
#[track_caller]
#[must_use]
pub fn struct_of<I, N, V>(model: impl IntoValue, overrides: I) -> Value
where
    I: IntoIterator<Item = (N, V)>,
    N: AsRef<str>,
    V: IntoValue,
{
    op(StructRule::build("Struct", false, model.into_value(), overrides))
}

/// Like [`struct_of`] but every model field is compared, zero or not.
#[track_caller]
#[must_use]
pub fn sstruct<I, N, V>(model: impl IntoValue, overrides: I) -> Value
where
    I: IntoIterator<Item = (N, V)>,
    N: AsRef<str>,
    V: IntoValue,
{
    op(StructRule::build("SStruct", true, model.into_value(), overrides))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Map / SubMapOf / SuperMapOf
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MapFlavor {
    Exact,
    Sub,
    Super,
}

/// Key-wise comparison against model entries plus overrides.
pub struct MapRule {
    base: OpBase,
    flavor: MapFlavor,
    ty: Option<Type>,
    entries: Vec<(Value, Value)>,
}

impl MapRule {
    #[track_caller]
    fn build<I, K, V>(op_name: &'static str, flavor: MapFlavor, model: Value, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: IntoValue,
        V: IntoValue,
    {
        let mut base = OpBase::new(op_name);
        let (ty, mut entries) = match &model {
            Value::Map(m) => (model.ty(), m.entries().unwrap_or_default().to_vec()),
            other => {
                base.flag(UsageError::BadArgument {
                    op: op_name,
                    reason: format!("model must be a map, got {}", type_name(other)),
                });
                (None, Vec::new())
            }
        };
        for (k, v) in overrides {
            let (k, v) = (k.into_value(), v.into_value());
            match entries.iter_mut().find(|(ek, _)| same_key(ek, &k)) {
                Some(entry) => entry.1 = v,
                None => entries.push((k, v)),
            }
        }
        Self {
            base,
            flavor,
            ty,
            entries,
        }
    }
}

impl fmt::Display for MapRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rendered: Vec<String> = self
            .entries
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect();
        rendered.sort();
        write!(f, "{}({{{}}})", self.base.name(), rendered.join(", "))
    }
}

impl Operator for MapRule {
    op_base_accessors!();

    fn match_value(&self, ctx: &mut Context<'_>, got: &Value) -> MatchResult {
        let got = got.concrete();
        let got_map: &Map = match got {
            Value::Map(m) if got.ty() == self.ty => m,
            _ => {
                return self.base.collect(ctx, || {
                    MatchError::new(ErrorKind::TypeMismatch, "type mismatch")
                        .got(type_name(got))
                        .expected(self.ty.as_ref().map_or_else(String::new, ToString::to_string))
                });
            }
        };
        compare_map_entries(
            ctx,
            got_map,
            &self.entries,
            self.flavor == MapFlavor::Sub,
            self.flavor == MapFlavor::Super,
        )
    }

    fn type_behind(&self) -> Option<Type> {
        self.ty.clone()
    }
}

macro_rules! map_ctor {
    ($($(#[$doc:meta])* $fn:ident => $name:literal, $flavor:ident;)*) => {$(
        $(#[$doc])*
        #[track_caller]
        #[must_use]
        pub fn $fn<I, K, V>(model: impl IntoValue, overrides: I) -> Value
        where
            I: IntoIterator<Item = (K, V)>,
            K: IntoValue,
            V: IntoValue,
        {
            op(MapRule::build($name, MapFlavor::$flavor, model.into_value(), overrides))
        }
    )*};
}

map_ctor! {
    /// Got has exactly the model keys (plus override keys), values compared
    /// deeply.
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use deepmatch::ops::{gt, map_of};
    ///
    /// let got: HashMap<&str, i64> = [("a", 1), ("b", 9)].into_iter().collect();
    /// let model: HashMap<&str, i64> = [("a", 1)].into_iter().collect();
    /// assert!(deepmatch::eq_deeply(got, map_of(model, [("b", gt(5i64))])));
    /// ```
    map_of => "Map", Exact;
    /// Got keys are a subset of the expected keys.
    sub_map_of => "SubMapOf", Sub;
    /// Got keys are a superset of the expected keys.
    super_map_of => "SuperMapOf", Super;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{gt, has_prefix, ignore};
    use crate::value::Ptr;
    use crate::{eq_deeply, eq_deeply_error};
    use std::collections::BTreeMap;

    fn user(name: &str, age: i64) -> StructValue {
        StructValue::new("User").field("name", name).field("age", age)
    }

    fn no_overrides() -> Vec<(&'static str, Value)> {
        Vec::new()
    }

    #[test]
    fn test_struct_skips_zero_fields() {
        assert!(eq_deeply(user("bob", 42), struct_of(user("bob", 0), no_overrides())));
        assert!(!eq_deeply(user("al", 42), struct_of(user("bob", 0), no_overrides())));
    }

    #[test]
    fn test_sstruct_checks_everything() {
        assert!(!eq_deeply(user("bob", 42), sstruct(user("bob", 0), no_overrides())));
        assert!(eq_deeply(user("bob", 42), sstruct(user("bob", 0), [("age", ignore())])));
    }

    #[test]
    fn test_struct_override_path() {
        let err = eq_deeply_error(user("bob", 12), struct_of(user("", 0), [("age", gt(18i64))]))
            .unwrap_err();
        assert_eq!(err.path(), "DATA.age");
    }

    #[test]
    fn test_unknown_override_field() {
        let err = eq_deeply_error(user("bob", 1), struct_of(user("", 0), [("email", ignore())]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.summary_text().unwrap().contains("\"email\""));
    }

    #[test]
    fn test_struct_type_mismatch() {
        let other = StructValue::new("Admin").field("name", "bob");
        let err = eq_deeply_error(other, struct_of(user("bob", 0), no_overrides())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(err.expected_rendering(), Some("User"));
    }

    #[test]
    fn test_struct_by_pointer() {
        let model = Value::Ptr(Ptr::new(Type::structure("User"), user("", 0).into_value()));
        let rule = struct_of(model, [("name", has_prefix("b"))]);
        let got = Value::Ptr(Ptr::new(Type::structure("User"), user("bob", 3).into_value()));
        assert!(eq_deeply(got, rule.clone()));
        let nil = Value::Ptr(Ptr::null(Type::structure("User")));
        assert_eq!(
            eq_deeply_error(nil, rule).unwrap_err().kind(),
            ErrorKind::NilMismatch
        );
    }

    #[test]
    fn test_pointer_model_without_struct_is_misuse() {
        let got = Value::Ptr(Ptr::new(Type::structure("User"), user("bob", 3).into_value()));

        let nil_model = Value::Ptr(Ptr::null(Type::structure("User")));
        let err = eq_deeply_error(got.clone(), struct_of(nil_model, no_overrides())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(err.message(), "bad usage of Struct operator");
        assert!(err.summary_text().unwrap().contains("nil pointer"));

        let int_model = Value::Ptr(Ptr::new(Type::Int(crate::value::IntKind::I64), 3i64.into_value()));
        let err = eq_deeply_error(got, sstruct(int_model, no_overrides())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.summary_text().unwrap().contains("must point to a struct, got &i64"));
    }

    #[test]
    fn test_map_flavors() {
        let got: BTreeMap<&str, i64> = [("a", 1), ("b", 2)].into_iter().collect();
        let model: BTreeMap<&str, i64> = [("a", 1)].into_iter().collect();
        let none: Vec<(&str, i64)> = Vec::new();

        assert!(!eq_deeply(got.clone(), map_of(model.clone(), none.clone())));
        assert!(eq_deeply(got.clone(), super_map_of(model.clone(), none.clone())));
        assert!(!eq_deeply(got.clone(), sub_map_of(model.clone(), none.clone())));
        assert!(eq_deeply(got.clone(), sub_map_of(model.clone(), [("b", 2i64), ("c", 3)])));
        assert!(eq_deeply(got, map_of(model, [("b", gt(1i64))])));
    }

    #[test]
    fn test_map_override_replaces_model_entry() {
        let got: BTreeMap<&str, i64> = [("a", 7)].into_iter().collect();
        let model: BTreeMap<&str, i64> = [("a", 1)].into_iter().collect();
        assert!(eq_deeply(got, map_of(model, [("a", gt(5i64))])));
    }

    #[test]
    fn test_map_type_mismatch() {
        let got: BTreeMap<&str, i32> = [("a", 1)].into_iter().collect();
        let model: BTreeMap<&str, i64> = [("a", 1)].into_iter().collect();
        let none: Vec<(&str, i64)> = Vec::new();
        let err = eq_deeply_error(got, map_of(model, none)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }
}
