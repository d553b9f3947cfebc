//! `Value` — Uniform runtime values with static types
//!
//! Everything the engine compares flows through [`Value`]: scalars, pointers,
//! composites, interface wrappers, functions, channels, errors and embedded
//! rule nodes. The enum is closed; the engine dispatches on it with `match`.
//!
//! # Identity
//!
//! Pointers, slices, maps and channels share their storage through `Arc`, so
//! two values can be "the same underlying storage". That identity is what the
//! visited set keys on to make traversal of cyclic graphs terminate.
//!
//! # Building cycles
//!
//! A pointer's target is a set-once cell. Create it with [`Ptr::pending`], build
//! the structure that refers back to it, then [`Ptr::set`] the target:
//!
//! ```
//! use deepmatch::{Ptr, StructValue, Type, Value};
//!
//! let node = Ptr::pending(Type::structure("Node"));
//! let value = StructValue::new("Node")
//!     .field("id", 1i64)
//!     .field("next", Value::Ptr(node.clone()))
//!     .into_value();
//! node.set(value).unwrap();
//! assert!(node.get().is_some());
//! ```
//!
//! Cyclic graphs built this way are never freed; they are meant for the
//! lifetime of a test.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::operator::Operator;

// ═══════════════════════════════════════════════════════════════════════════════
// Kinds and types
// ═══════════════════════════════════════════════════════════════════════════════

/// Signed integer widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntKind {
    I8,
    I16,
    I32,
    I64,
    Isize,
}

impl IntKind {
    /// Rust spelling of the type.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Isize => "isize",
        }
    }

    /// Truncate `v` the way an `as` cast to this width does.
    #[must_use]
    pub fn wrap(self, v: i128) -> i64 {
        match self {
            Self::I8 => i64::from(v as i8),
            Self::I16 => i64::from(v as i16),
            Self::I32 => i64::from(v as i32),
            Self::I64 => v as i64,
            Self::Isize => v as isize as i64,
        }
    }
}

/// Unsigned integer widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UintKind {
    U8,
    U16,
    U32,
    U64,
    Usize,
}

impl UintKind {
    /// Rust spelling of the type.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Usize => "usize",
        }
    }

    /// Truncate `v` the way an `as` cast to this width does.
    #[must_use]
    pub fn wrap(self, v: i128) -> u64 {
        match self {
            Self::U8 => u64::from(v as u8),
            Self::U16 => u64::from(v as u16),
            Self::U32 => u64::from(v as u32),
            Self::U64 => v as u64,
            Self::Usize => v as usize as u64,
        }
    }
}

/// Floating point widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FloatKind {
    F32,
    F64,
}

impl FloatKind {
    /// Rust spelling of the type.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    /// Round `v` to this width.
    #[must_use]
    pub fn round(self, v: f64) -> f64 {
        match self {
            Self::F32 => f64::from(v as f32),
            Self::F64 => v,
        }
    }
}

/// The coarse shape of a value, used to pick a comparison strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Invalid,
    Bool,
    Int,
    Uint,
    Float,
    String,
    Ptr,
    Slice,
    Array,
    Map,
    Struct,
    Interface,
    Func,
    Chan,
    Error,
    Operator,
}

/// Static type of a value.
///
/// Rendered with Rust-flavoured syntax: `i64`, `&T`, `Vec<T>`, `[T; N]`,
/// `Map<K, V>`, `dyn Name`, `Chan<T>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Int(IntKind),
    Uint(UintKind),
    Float(FloatKind),
    String,
    Ptr(Box<Type>),
    Slice(Box<Type>),
    Array(usize, Box<Type>),
    Map(Box<Type>, Box<Type>),
    Struct(Arc<str>),
    Interface(Arc<str>),
    /// A function, identified by its signature.
    Func(Arc<str>),
    Chan(Box<Type>),
    Error,
    /// A dynamically typed slot: any value may live there.
    Any,
    /// A rule node whose type cannot be inferred.
    Operator,
}

impl Type {
    /// `&T`
    #[must_use]
    pub fn ptr(pointee: Type) -> Self {
        Self::Ptr(Box::new(pointee))
    }

    /// `Vec<T>`
    #[must_use]
    pub fn slice(elem: Type) -> Self {
        Self::Slice(Box::new(elem))
    }

    /// `[T; N]`
    #[must_use]
    pub fn array(len: usize, elem: Type) -> Self {
        Self::Array(len, Box::new(elem))
    }

    /// `Map<K, V>`
    #[must_use]
    pub fn map(key: Type, value: Type) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// A named struct type.
    #[must_use]
    pub fn structure(name: &str) -> Self {
        Self::Struct(Arc::from(name))
    }

    /// A named interface (trait object) type.
    #[must_use]
    pub fn interface(name: &str) -> Self {
        Self::Interface(Arc::from(name))
    }

    /// A function type, identified by its signature.
    #[must_use]
    pub fn func(signature: &str) -> Self {
        Self::Func(Arc::from(signature))
    }

    /// `Chan<T>`
    #[must_use]
    pub fn chan(elem: Type) -> Self {
        Self::Chan(Box::new(elem))
    }

    /// Kind of values of this type.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::Bool => Kind::Bool,
            Self::Int(_) => Kind::Int,
            Self::Uint(_) => Kind::Uint,
            Self::Float(_) => Kind::Float,
            Self::String => Kind::String,
            Self::Ptr(_) => Kind::Ptr,
            Self::Slice(_) => Kind::Slice,
            Self::Array(..) => Kind::Array,
            Self::Map(..) => Kind::Map,
            Self::Struct(_) => Kind::Struct,
            Self::Interface(_) | Self::Any => Kind::Interface,
            Self::Func(_) => Kind::Func,
            Self::Chan(_) => Kind::Chan,
            Self::Error => Kind::Error,
            Self::Operator => Kind::Operator,
        }
    }

    /// Returns `true` for integer and float types.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Uint(_) | Self::Float(_))
    }

    /// Returns `true` if values of this type can be nil.
    #[must_use]
    pub fn is_nillable(&self) -> bool {
        matches!(
            self.kind(),
            Kind::Ptr | Kind::Slice | Kind::Map | Kind::Interface | Kind::Func | Kind::Chan | Kind::Error
        )
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int(k) => f.write_str(k.name()),
            Self::Uint(k) => f.write_str(k.name()),
            Self::Float(k) => f.write_str(k.name()),
            Self::String => f.write_str("String"),
            Self::Ptr(t) => write!(f, "&{t}"),
            Self::Slice(t) => write!(f, "Vec<{t}>"),
            Self::Array(n, t) => write!(f, "[{t}; {n}]"),
            Self::Map(k, v) => write!(f, "Map<{k}, {v}>"),
            Self::Struct(name) => f.write_str(name),
            Self::Interface(name) => write!(f, "dyn {name}"),
            Self::Func(sig) => write!(f, "fn{sig}"),
            Self::Chan(t) => write!(f, "Chan<{t}>"),
            Self::Error => f.write_str("dyn Error"),
            Self::Any => f.write_str("dyn Any"),
            Self::Operator => f.write_str("Operator"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Reference-like payloads
// ═══════════════════════════════════════════════════════════════════════════════

/// A possibly-nil pointer to a set-once target.
#[derive(Clone)]
pub struct Ptr {
    pointee: Type,
    cell: Option<Arc<OnceLock<Value>>>,
}

impl Ptr {
    /// A pointer to `value`.
    #[must_use]
    pub fn new(pointee: Type, value: Value) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(value);
        Self {
            pointee,
            cell: Some(Arc::new(cell)),
        }
    }

    /// A nil pointer.
    #[must_use]
    pub fn null(pointee: Type) -> Self {
        Self {
            pointee,
            cell: None,
        }
    }

    /// A non-nil pointer whose target is set later with [`set`](Self::set).
    #[must_use]
    pub fn pending(pointee: Type) -> Self {
        Self {
            pointee,
            cell: Some(Arc::new(OnceLock::new())),
        }
    }

    /// Set the target of a pending pointer.
    ///
    /// # Errors
    ///
    /// Gives `value` back if the pointer is nil or already set.
    pub fn set(&self, value: Value) -> Result<(), Value> {
        match &self.cell {
            Some(cell) => cell.set(value),
            None => Err(value),
        }
    }

    /// The target, if the pointer is non-nil and set.
    #[must_use]
    pub fn get(&self) -> Option<&Value> {
        self.cell.as_ref().and_then(|c| c.get())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.cell.is_none()
    }

    #[must_use]
    pub fn pointee(&self) -> &Type {
        &self.pointee
    }

    pub(crate) fn addr(&self) -> Option<usize> {
        self.cell.as_ref().map(|c| Arc::as_ptr(c) as usize)
    }
}

/// A possibly-nil growable sequence (`Vec<T>`).
#[derive(Clone)]
pub struct Slice {
    elem: Type,
    items: Option<Arc<Vec<Value>>>,
}

impl Slice {
    #[must_use]
    pub fn new(elem: Type, items: Vec<Value>) -> Self {
        Self {
            elem,
            items: Some(Arc::new(items)),
        }
    }

    /// A nil slice, distinct from an empty one.
    #[must_use]
    pub fn nil(elem: Type) -> Self {
        Self { elem, items: None }
    }

    #[must_use]
    pub fn elem(&self) -> &Type {
        &self.elem
    }

    #[must_use]
    pub fn items(&self) -> Option<&[Value]> {
        self.items.as_deref().map(Vec::as_slice)
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.items.is_none()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items().map_or(0, <[Value]>::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn addr(&self) -> Option<usize> {
        self.items.as_ref().map(|v| Arc::as_ptr(v) as usize)
    }
}

/// A fixed-size sequence (`[T; N]`). Value semantics: never registered as visited.
#[derive(Clone)]
pub struct Array {
    elem: Type,
    items: Vec<Value>,
}

impl Array {
    #[must_use]
    pub fn new(elem: Type, items: Vec<Value>) -> Self {
        Self { elem, items }
    }

    #[must_use]
    pub fn elem(&self) -> &Type {
        &self.elem
    }

    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.items
    }
}

/// A possibly-nil map. Keys are looked up with hash-key semantics
/// (scalars by value, pointers by address).
#[derive(Clone)]
pub struct Map {
    key: Type,
    value: Type,
    entries: Option<Arc<Vec<(Value, Value)>>>,
}

impl Map {
    #[must_use]
    pub fn new(key: Type, value: Type, entries: Vec<(Value, Value)>) -> Self {
        Self {
            key,
            value,
            entries: Some(Arc::new(entries)),
        }
    }

    #[must_use]
    pub fn nil(key: Type, value: Type) -> Self {
        Self {
            key,
            value,
            entries: None,
        }
    }

    #[must_use]
    pub fn key_type(&self) -> &Type {
        &self.key
    }

    #[must_use]
    pub fn value_type(&self) -> &Type {
        &self.value
    }

    #[must_use]
    pub fn entries(&self) -> Option<&[(Value, Value)]> {
        self.entries.as_deref().map(Vec::as_slice)
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.entries.is_none()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().map_or(0, <[(Value, Value)]>::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look a key up.
    #[must_use]
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries()?
            .iter()
            .find(|(k, _)| same_key(k, key))
            .map(|(_, v)| v)
    }

    pub(crate) fn addr(&self) -> Option<usize> {
        self.entries.as_ref().map(|v| Arc::as_ptr(v) as usize)
    }
}

/// Custom equality hook attached to a struct value.
pub type EqualFn = Arc<dyn Fn(&StructValue, &StructValue) -> bool + Send + Sync>;

/// One struct field.
#[derive(Clone)]
pub struct Field {
    pub name: Arc<str>,
    pub exported: bool,
    pub value: Value,
}

/// A struct value: a type name and fields in declaration order.
#[derive(Clone)]
pub struct StructValue {
    name: Arc<str>,
    fields: Vec<Field>,
    equal: Option<EqualFn>,
}

impl StructValue {
    /// Start building a struct value of the named type.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            fields: Vec::new(),
            equal: None,
        }
    }

    /// Append an exported field.
    #[must_use]
    pub fn field(mut self, name: &str, value: impl IntoValue) -> Self {
        self.fields.push(Field {
            name: Arc::from(name),
            exported: true,
            value: value.into_value(),
        });
        self
    }

    /// Append an unexported (private) field.
    #[must_use]
    pub fn unexported(mut self, name: &str, value: impl IntoValue) -> Self {
        self.fields.push(Field {
            name: Arc::from(name),
            exported: false,
            value: value.into_value(),
        });
        self
    }

    /// Attach an equality method, honored when the configuration says so.
    #[must_use]
    pub fn with_equal(
        mut self,
        equal: impl Fn(&StructValue, &StructValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.equal = Some(Arc::new(equal));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| &*f.name == name)
    }

    #[must_use]
    pub fn equal_method(&self) -> Option<&EqualFn> {
        self.equal.as_ref()
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Struct(self)
    }
}

/// A trait-object slot: names the interface, holds a concrete value or nil.
#[derive(Clone)]
pub struct Interface {
    name: Arc<str>,
    inner: Option<Box<Value>>,
}

impl Interface {
    #[must_use]
    pub fn new(name: &str, inner: Value) -> Self {
        Self {
            name: Arc::from(name),
            inner: Some(Box::new(inner)),
        }
    }

    #[must_use]
    pub fn nil(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            inner: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn inner(&self) -> Option<&Value> {
        self.inner.as_deref()
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.inner.is_none()
    }
}

/// A function value. Two non-nil functions can never be compared.
#[derive(Clone)]
pub struct Func {
    signature: Arc<str>,
    body: Option<Arc<dyn Any + Send + Sync>>,
}

impl Func {
    #[must_use]
    pub fn new(signature: &str, body: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            signature: Arc::from(signature),
            body: Some(body),
        }
    }

    #[must_use]
    pub fn nil(signature: &str) -> Self {
        Self {
            signature: Arc::from(signature),
            body: None,
        }
    }

    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.body.is_none()
    }
}

/// Opaque channel identity. Contents are never observed.
struct ChanSlot;

/// A channel value, compared by identity only.
#[derive(Clone)]
pub struct Chan {
    elem: Type,
    slot: Option<Arc<ChanSlot>>,
}

impl Chan {
    /// A fresh channel, distinct from every other.
    #[must_use]
    pub fn new(elem: Type) -> Self {
        Self {
            elem,
            slot: Some(Arc::new(ChanSlot)),
        }
    }

    #[must_use]
    pub fn nil(elem: Type) -> Self {
        Self { elem, slot: None }
    }

    #[must_use]
    pub fn elem(&self) -> &Type {
        &self.elem
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.slot.is_none()
    }

    pub(crate) fn addr(&self) -> Option<usize> {
        self.slot.as_ref().map(|s| Arc::as_ptr(s) as usize)
    }
}

/// An error value with its `source()` chain.
///
/// Deep equality compares errors as values: the same allocation, or the
/// same rendered message. Chain membership ([`is`](Self::is), `ErrorIs`)
/// goes by identity only.
#[derive(Clone)]
pub struct ErrorValue {
    inner: Arc<dyn std::error::Error + Send + Sync>,
}

impl ErrorValue {
    #[must_use]
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(err),
        }
    }

    /// Wrap an already shared error, keeping its identity.
    #[must_use]
    pub fn shared(inner: Arc<dyn std::error::Error + Send + Sync>) -> Self {
        Self { inner }
    }

    /// The error followed by its sources, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &(dyn std::error::Error + 'static)> {
        let head: &(dyn std::error::Error + 'static) = self.inner.as_ref();
        std::iter::successors(Some(head), |e| e.source())
    }

    /// `link` is this very error: same allocation. Two errors with the same
    /// message are still different errors.
    #[must_use]
    pub fn is(&self, link: &(dyn std::error::Error + 'static)) -> bool {
        std::ptr::addr_eq(
            link as *const dyn std::error::Error,
            Arc::as_ptr(&self.inner),
        )
    }

    #[must_use]
    pub fn message(&self) -> String {
        self.inner.to_string()
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Value
// ═══════════════════════════════════════════════════════════════════════════════

/// A runtime value together with enough information to know its static type.
///
/// `Invalid` is the untyped nil. `Op` embeds a rule node in an expected tree.
#[derive(Clone)]
pub enum Value {
    Invalid,
    Bool(bool),
    Int(IntKind, i64),
    Uint(UintKind, u64),
    Float(FloatKind, f64),
    String(String),
    Ptr(Ptr),
    Slice(Slice),
    Array(Array),
    Map(Map),
    Struct(StructValue),
    Interface(Interface),
    Func(Func),
    Chan(Chan),
    Error(ErrorValue),
    Op(Arc<dyn Operator>),
}

pub(crate) static INVALID: Value = Value::Invalid;

impl Value {
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::Invalid => Kind::Invalid,
            Self::Bool(_) => Kind::Bool,
            Self::Int(..) => Kind::Int,
            Self::Uint(..) => Kind::Uint,
            Self::Float(..) => Kind::Float,
            Self::String(_) => Kind::String,
            Self::Ptr(_) => Kind::Ptr,
            Self::Slice(_) => Kind::Slice,
            Self::Array(_) => Kind::Array,
            Self::Map(_) => Kind::Map,
            Self::Struct(_) => Kind::Struct,
            Self::Interface(_) => Kind::Interface,
            Self::Func(_) => Kind::Func,
            Self::Chan(_) => Kind::Chan,
            Self::Error(_) => Kind::Error,
            Self::Op(_) => Kind::Operator,
        }
    }

    /// Static type. `None` for the untyped nil and for rule nodes whose
    /// type cannot be inferred.
    #[must_use]
    pub fn ty(&self) -> Option<Type> {
        Some(match self {
            Self::Invalid => return None,
            Self::Bool(_) => Type::Bool,
            Self::Int(k, _) => Type::Int(*k),
            Self::Uint(k, _) => Type::Uint(*k),
            Self::Float(k, _) => Type::Float(*k),
            Self::String(_) => Type::String,
            Self::Ptr(p) => Type::ptr(p.pointee.clone()),
            Self::Slice(s) => Type::slice(s.elem.clone()),
            Self::Array(a) => Type::array(a.items.len(), a.elem.clone()),
            Self::Map(m) => Type::map(m.key.clone(), m.value.clone()),
            Self::Struct(s) => Type::Struct(Arc::clone(&s.name)),
            Self::Interface(i) => Type::Interface(Arc::clone(&i.name)),
            Self::Func(f) => Type::Func(Arc::clone(&f.signature)),
            Self::Chan(c) => Type::chan(c.elem.clone()),
            Self::Error(_) => Type::Error,
            Self::Op(op) => return op.type_behind(),
        })
    }

    /// The untyped nil.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }

    /// Untyped nil, or a nil pointer/slice/map/interface/function/channel.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        match self {
            Self::Invalid => true,
            Self::Ptr(p) => p.is_null(),
            Self::Slice(s) => s.is_nil(),
            Self::Map(m) => m.is_nil(),
            Self::Interface(i) => i.is_nil(),
            Self::Func(f) => f.is_nil(),
            Self::Chan(c) => c.is_nil(),
            _ => false,
        }
    }

    /// Unwrap non-nil interface slots down to the concrete value.
    #[must_use]
    pub fn concrete(&self) -> &Value {
        let mut current = self;
        while let Self::Interface(i) = current {
            match i.inner() {
                Some(inner) => current = inner,
                None => break,
            }
        }
        current
    }

    /// Returns `true` if this is the zero value of its type.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Invalid => true,
            Self::Bool(b) => !b,
            Self::Int(_, v) => *v == 0,
            Self::Uint(_, v) => *v == 0,
            Self::Float(_, v) => *v == 0.0,
            Self::String(s) => s.is_empty(),
            Self::Array(a) => a.items.iter().all(Value::is_zero),
            Self::Struct(s) => s.fields.iter().all(|f| f.value.is_zero()),
            Self::Error(_) | Self::Op(_) => false,
            other => other.is_nil(),
        }
    }

    /// Length of strings (bytes), slices, arrays and maps.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.len()),
            Self::Slice(s) => Some(s.len()),
            Self::Array(a) => Some(a.items.len()),
            Self::Map(m) => Some(m.len()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Items of a slice or array. A nil slice yields `None`.
    #[must_use]
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Self::Slice(s) => s.items(),
            Self::Array(a) => Some(a.items()),
            _ => None,
        }
    }

    /// Bytes of a `Vec<u8>` or `[u8; N]`.
    #[must_use]
    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        let elem = match self {
            Self::Slice(s) => &s.elem,
            Self::Array(a) => &a.elem,
            _ => return None,
        };
        if *elem != Type::Uint(UintKind::U8) {
            return None;
        }
        self.as_items()?
            .iter()
            .map(|v| match v {
                Self::Uint(_, b) => u8::try_from(*b).ok(),
                _ => None,
            })
            .collect()
    }

    /// Convert a numeric value to another numeric type, `as`-cast style.
    ///
    /// Identical types convert to a clone. Anything else returns `None`.
    #[must_use]
    pub fn convert_to(&self, target: &Type) -> Option<Value> {
        if self.ty().as_ref() == Some(target) {
            return Some(self.clone());
        }
        let converted = match (self, target) {
            (Self::Int(_, v), Type::Int(k)) => Self::Int(*k, k.wrap(i128::from(*v))),
            (Self::Int(_, v), Type::Uint(k)) => Self::Uint(*k, k.wrap(i128::from(*v))),
            (Self::Int(_, v), Type::Float(k)) => Self::Float(*k, k.round(*v as f64)),
            (Self::Uint(_, v), Type::Int(k)) => Self::Int(*k, k.wrap(i128::from(*v))),
            (Self::Uint(_, v), Type::Uint(k)) => Self::Uint(*k, k.wrap(i128::from(*v))),
            (Self::Uint(_, v), Type::Float(k)) => Self::Float(*k, k.round(*v as f64)),
            (Self::Float(_, v), Type::Int(k)) => Self::Int(*k, k.wrap(v.trunc() as i128)),
            (Self::Float(_, v), Type::Uint(k)) => Self::Uint(*k, k.wrap(v.trunc() as i128)),
            (Self::Float(_, v), Type::Float(k)) => Self::Float(*k, k.round(*v)),
            _ => return None,
        };
        Some(converted)
    }

    /// The typed nil of `ty`, for pointer, interface, map, slice, channel,
    /// function and error types. `Any` slots hold the untyped nil.
    #[must_use]
    pub fn nil_of(ty: &Type) -> Option<Value> {
        Some(match ty {
            Type::Ptr(t) => Self::Ptr(Ptr::null((**t).clone())),
            Type::Slice(t) => Self::Slice(Slice::nil((**t).clone())),
            Type::Map(k, v) => Self::Map(Map::nil((**k).clone(), (**v).clone())),
            Type::Interface(name) => Self::Interface(Interface::nil(name)),
            Type::Func(sig) => Self::Func(Func::nil(sig)),
            Type::Chan(t) => Self::Chan(Chan::nil((**t).clone())),
            Type::Any | Type::Error => Self::Invalid,
            _ => return None,
        })
    }

    /// Numeric view used by ordering rules.
    pub(crate) fn as_number(&self) -> Option<Number> {
        match self {
            Self::Int(_, v) => Some(Number::Int(i128::from(*v))),
            Self::Uint(_, v) => Some(Number::Int(i128::from(*v))),
            Self::Float(_, v) => Some(Number::Float(*v)),
            _ => None,
        }
    }
}

/// Numbers widened for cross-kind ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    pub(crate) fn partial_cmp(self, other: Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(&b)),
            (Self::Int(a), Self::Float(b)) => (a as f64).partial_cmp(&b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(b as f64)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(&b),
        }
    }
}

/// Hash-key equality: scalars by value, reference kinds by identity,
/// arrays and structs member-wise.
pub(crate) fn same_key(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Invalid, Value::Invalid) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(k1, x), Value::Int(k2, y)) => k1 == k2 && x == y,
        (Value::Uint(k1, x), Value::Uint(k2, y)) => k1 == k2 && x == y,
        (Value::Float(k1, x), Value::Float(k2, y)) => k1 == k2 && x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Ptr(x), Value::Ptr(y)) => x.pointee == y.pointee && x.addr() == y.addr(),
        (Value::Chan(x), Value::Chan(y)) => x.elem == y.elem && x.addr() == y.addr(),
        (Value::Error(x), Value::Error(y)) => x.ptr_eq(y),
        (Value::Interface(x), Value::Interface(y)) => {
            x.name == y.name
                && match (x.inner(), y.inner()) {
                    (None, None) => true,
                    (Some(p), Some(q)) => same_key(p, q),
                    _ => false,
                }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.items.len() == y.items.len()
                && x.items.iter().zip(&y.items).all(|(p, q)| same_key(p, q))
        }
        (Value::Struct(x), Value::Struct(y)) => {
            x.name == y.name
                && x.fields.len() == y.fields.len()
                && x.fields
                    .iter()
                    .zip(&y.fields)
                    .all(|(p, q)| p.name == q.name && same_key(&p.value, &q.value))
        }
        _ => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Rendering
// ═══════════════════════════════════════════════════════════════════════════════

/// Single-line rendering. Map entries are sorted by rendered key; a pointer
/// met again while rendering its own target prints `&<cycle>`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        render(self, &mut Vec::new(), &mut out);
        f.write_str(&out)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn render_nil(ty: Option<Type>, out: &mut String) {
    use fmt::Write;
    match ty {
        Some(ty) => {
            let _ = write!(out, "{ty}(nil)");
        }
        None => out.push_str("nil"),
    }
}

fn render_seq(items: &[Value], stack: &mut Vec<usize>, out: &mut String) {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        render(item, stack, out);
    }
    out.push(']');
}

fn render(value: &Value, stack: &mut Vec<usize>, out: &mut String) {
    use fmt::Write;
    match value {
        Value::Invalid => out.push_str("nil"),
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Int(_, v) => {
            let _ = write!(out, "{v}");
        }
        Value::Uint(_, v) => {
            let _ = write!(out, "{v}");
        }
        Value::Float(_, v) => {
            let _ = write!(out, "{v:?}");
        }
        Value::String(s) => {
            let _ = write!(out, "{s:?}");
        }
        Value::Ptr(p) => {
            let Some(addr) = p.addr() else {
                return render_nil(value.ty(), out);
            };
            if stack.contains(&addr) {
                out.push_str("&<cycle>");
                return;
            }
            out.push('&');
            match p.get() {
                Some(target) => {
                    stack.push(addr);
                    render(target, stack, out);
                    stack.pop();
                }
                None => out.push_str("<unset>"),
            }
        }
        Value::Slice(s) => match s.items() {
            Some(items) => render_seq(items, stack, out),
            None => render_nil(value.ty(), out),
        },
        Value::Array(a) => render_seq(a.items(), stack, out),
        Value::Map(m) => {
            let Some(entries) = m.entries() else {
                return render_nil(value.ty(), out);
            };
            let mut rendered: Vec<(String, String)> = entries
                .iter()
                .map(|(k, v)| {
                    let (mut key, mut val) = (String::new(), String::new());
                    render(k, stack, &mut key);
                    render(v, stack, &mut val);
                    (key, val)
                })
                .collect();
            rendered.sort();
            out.push('{');
            for (i, (k, v)) in rendered.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{k}: {v}");
            }
            out.push('}');
        }
        Value::Struct(s) => {
            out.push_str(s.name());
            if s.fields().is_empty() {
                out.push_str(" {}");
                return;
            }
            out.push_str(" { ");
            for (i, field) in s.fields().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}: ", field.name);
                render(&field.value, stack, out);
            }
            out.push_str(" }");
        }
        Value::Interface(i) => match i.inner() {
            Some(inner) => render(inner, stack, out),
            None => render_nil(value.ty(), out),
        },
        Value::Func(func) => {
            if func.is_nil() {
                render_nil(value.ty(), out);
            } else {
                let _ = write!(out, "<fn{}>", func.signature());
            }
        }
        Value::Chan(c) => match c.addr() {
            Some(addr) => {
                let _ = write!(out, "Chan<{}>({addr:#x})", c.elem());
            }
            None => render_nil(value.ty(), out),
        },
        Value::Error(e) => {
            let _ = write!(out, "Error({:?})", e.message());
        }
        Value::Op(op) => {
            let _ = write!(out, "{op}");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IntoValue
// ═══════════════════════════════════════════════════════════════════════════════

/// Conversion of Rust values into [`Value`], with a static type.
///
/// Implement it for your own types to compare them:
///
/// ```
/// use deepmatch::{IntoValue, StructValue, Type, Value};
///
/// struct Person { name: String, age: u32 }
///
/// impl IntoValue for Person {
///     fn static_type() -> Type { Type::structure("Person") }
///     fn into_value(self) -> Value {
///         StructValue::new("Person")
///             .field("name", self.name)
///             .field("age", self.age)
///             .into_value()
///     }
/// }
/// ```
pub trait IntoValue {
    /// The type every value of `Self` converts to.
    fn static_type() -> Type
    where
        Self: Sized;

    fn into_value(self) -> Value;
}

/// Shorthand for [`IntoValue::into_value`].
pub fn value(v: impl IntoValue) -> Value {
    v.into_value()
}

impl IntoValue for Value {
    fn static_type() -> Type {
        Type::Any
    }

    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for StructValue {
    fn static_type() -> Type {
        Type::Any
    }

    fn into_value(self) -> Value {
        Value::Struct(self)
    }
}

macro_rules! into_value_int {
    ($($t:ty => $k:ident),* $(,)?) => {$(
        impl IntoValue for $t {
            fn static_type() -> Type {
                Type::Int(IntKind::$k)
            }

            fn into_value(self) -> Value {
                Value::Int(IntKind::$k, self as i64)
            }
        }
    )*};
}

macro_rules! into_value_uint {
    ($($t:ty => $k:ident),* $(,)?) => {$(
        impl IntoValue for $t {
            fn static_type() -> Type {
                Type::Uint(UintKind::$k)
            }

            fn into_value(self) -> Value {
                Value::Uint(UintKind::$k, self as u64)
            }
        }
    )*};
}

into_value_int!(i8 => I8, i16 => I16, i32 => I32, i64 => I64, isize => Isize);
into_value_uint!(u8 => U8, u16 => U16, u32 => U32, u64 => U64, usize => Usize);

impl IntoValue for f32 {
    fn static_type() -> Type {
        Type::Float(FloatKind::F32)
    }

    fn into_value(self) -> Value {
        Value::Float(FloatKind::F32, f64::from(self))
    }
}

impl IntoValue for f64 {
    fn static_type() -> Type {
        Type::Float(FloatKind::F64)
    }

    fn into_value(self) -> Value {
        Value::Float(FloatKind::F64, self)
    }
}

impl IntoValue for bool {
    fn static_type() -> Type {
        Type::Bool
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for String {
    fn static_type() -> Type {
        Type::String
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for &str {
    fn static_type() -> Type {
        Type::String
    }

    fn into_value(self) -> Value {
        Value::String(self.to_owned())
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn static_type() -> Type {
        Type::slice(T::static_type())
    }

    fn into_value(self) -> Value {
        Value::Slice(Slice::new(
            T::static_type(),
            self.into_iter().map(IntoValue::into_value).collect(),
        ))
    }
}

impl<T: IntoValue, const N: usize> IntoValue for [T; N] {
    fn static_type() -> Type {
        Type::array(N, T::static_type())
    }

    fn into_value(self) -> Value {
        Value::Array(Array::new(
            T::static_type(),
            self.into_iter().map(IntoValue::into_value).collect(),
        ))
    }
}

/// `None` is a nil pointer, `Some(v)` a pointer to `v`.
impl<T: IntoValue> IntoValue for Option<T> {
    fn static_type() -> Type {
        Type::ptr(T::static_type())
    }

    fn into_value(self) -> Value {
        match self {
            Some(v) => Value::Ptr(Ptr::new(T::static_type(), v.into_value())),
            None => Value::Ptr(Ptr::null(T::static_type())),
        }
    }
}

impl<T: IntoValue> IntoValue for Box<T> {
    fn static_type() -> Type {
        Type::ptr(T::static_type())
    }

    fn into_value(self) -> Value {
        Value::Ptr(Ptr::new(T::static_type(), (*self).into_value()))
    }
}

impl<K: IntoValue, V: IntoValue, S> IntoValue for HashMap<K, V, S> {
    fn static_type() -> Type {
        Type::map(K::static_type(), V::static_type())
    }

    fn into_value(self) -> Value {
        Value::Map(Map::new(
            K::static_type(),
            V::static_type(),
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        ))
    }
}

impl<K: IntoValue, V: IntoValue> IntoValue for BTreeMap<K, V> {
    fn static_type() -> Type {
        Type::map(K::static_type(), V::static_type())
    }

    fn into_value(self) -> Value {
        Value::Map(Map::new(
            K::static_type(),
            V::static_type(),
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_types() {
        assert_eq!(i64::static_type(), Type::Int(IntKind::I64));
        assert_eq!(Vec::<u8>::static_type(), Type::slice(Type::Uint(UintKind::U8)));
        assert_eq!(Option::<String>::static_type(), Type::ptr(Type::String));
        assert_eq!(
            HashMap::<String, i32>::static_type(),
            Type::map(Type::String, Type::Int(IntKind::I32))
        );
    }

    #[test]
    fn test_type_display() {
        assert_eq!(Type::ptr(Type::Int(IntKind::I64)).to_string(), "&i64");
        assert_eq!(Type::slice(Type::String).to_string(), "Vec<String>");
        assert_eq!(Type::array(3, Type::Bool).to_string(), "[bool; 3]");
        assert_eq!(
            Type::map(Type::String, Type::Any).to_string(),
            "Map<String, dyn Any>"
        );
        assert_eq!(Type::interface("Shape").to_string(), "dyn Shape");
    }

    #[test]
    fn test_nil_and_zero() {
        assert!(Value::Invalid.is_nil());
        assert!(Option::<i64>::None.into_value().is_nil());
        assert!(!Some(0i64).into_value().is_nil());
        assert!(Value::Slice(Slice::nil(Type::Bool)).is_nil());
        assert!(!Vec::<bool>::new().into_value().is_nil());

        assert!(0i32.into_value().is_zero());
        assert!(String::new().into_value().is_zero());
        assert!(!1u8.into_value().is_zero());
        assert!(StructValue::new("P").field("a", 0i64).into_value().is_zero());
    }

    #[test]
    fn test_convert_to() {
        let v = 123.9f64.into_value();
        let converted = v.convert_to(&Type::Int(IntKind::I64)).unwrap();
        assert!(matches!(converted, Value::Int(IntKind::I64, 123)));

        let v = 300i64.into_value();
        assert!(matches!(
            v.convert_to(&Type::Uint(UintKind::U8)),
            Some(Value::Uint(UintKind::U8, 44))
        ));

        assert!("x".into_value().convert_to(&Type::Bool).is_none());
    }

    #[test]
    fn test_nil_of() {
        let nil = Value::nil_of(&Type::ptr(Type::Bool)).unwrap();
        assert_eq!(nil.ty(), Some(Type::ptr(Type::Bool)));
        assert!(nil.is_nil());
        assert!(Value::nil_of(&Type::Int(IntKind::I8)).is_none());
        assert!(Value::nil_of(&Type::Any).unwrap().is_invalid());
    }

    #[test]
    fn test_pending_pointer_cycle() {
        let ptr = Ptr::pending(Type::structure("Node"));
        let node = StructValue::new("Node")
            .field("next", Value::Ptr(ptr.clone()))
            .into_value();
        assert!(ptr.set(node).is_ok());
        assert!(ptr.set(Value::Invalid).is_err());

        let Some(Value::Struct(s)) = ptr.get() else {
            panic!("expected a struct behind the pointer");
        };
        let Value::Ptr(next) = &s.get("next").unwrap().value else {
            panic!("expected a pointer field");
        };
        assert_eq!(next.addr(), ptr.addr());
    }

    #[test]
    fn test_map_get_uses_key_semantics() {
        let mut m = HashMap::new();
        m.insert("a".to_string(), 1i64);
        let Value::Map(map) = m.into_value() else {
            panic!("expected a map");
        };
        assert!(map.get(&"a".into_value()).is_some());
        assert!(map.get(&"b".into_value()).is_none());
        assert!(map.get(&1i64.into_value()).is_none());
    }

    #[test]
    fn test_error_chain() {
        #[derive(Debug)]
        struct Outer(std::io::Error);
        impl fmt::Display for Outer {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("outer")
            }
        }
        impl std::error::Error for Outer {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let err = ErrorValue::new(Outer(std::io::Error::other("inner")));
        let messages: Vec<String> = err.chain().map(ToString::to_string).collect();
        assert_eq!(messages, vec!["outer", "inner"]);
    }

    #[test]
    fn test_render() {
        assert_eq!(vec![1i64, 2, 3].into_value().to_string(), "[1, 2, 3]");
        assert_eq!("hi".into_value().to_string(), "\"hi\"");
        assert_eq!(1.5f64.into_value().to_string(), "1.5");
        assert_eq!(123f64.into_value().to_string(), "123.0");
        assert_eq!(
            Value::Slice(Slice::nil(Type::Int(IntKind::I64))).to_string(),
            "Vec<i64>(nil)"
        );
        assert_eq!(
            StructValue::new("P")
                .field("a", 1i64)
                .field("b", Some("x"))
                .into_value()
                .to_string(),
            "P { a: 1, b: &\"x\" }"
        );

        let mut m = BTreeMap::new();
        m.insert("z".to_string(), 1i64);
        m.insert("a".to_string(), 2i64);
        assert_eq!(m.into_value().to_string(), "{\"a\": 2, \"z\": 1}");
    }

    #[test]
    fn test_render_cycle() {
        let ptr = Ptr::pending(Type::structure("Node"));
        let node = StructValue::new("Node")
            .field("next", Value::Ptr(ptr.clone()))
            .into_value();
        ptr.set(node).unwrap();
        assert_eq!(
            Value::Ptr(ptr).to_string(),
            "&Node { next: &<cycle> }"
        );
    }

    #[test]
    fn test_value_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Value>();
    }
}
