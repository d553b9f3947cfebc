//! Built-in rule nodes.
//!
//! Every constructor returns a [`Value`] holding the rule, so rules nest
//! anywhere a value can: inside other rules, inside `Vec<Value>` literals,
//! as struct and map overrides, or behind an anchor placeholder.
//!
//! | family | rules |
//! |--------|-------|
//! | logic | [`equal`], [`ignore`], [`all`], [`any`], [`none`], [`not`] |
//! | ordering | [`between`], [`between_bounds`], [`gt`], [`gte`], [`lt`], [`lte`], [`approx`] |
//! | strings | [`has_prefix`], [`has_suffix`], [`re`] and their case-insensitive forms |
//! | membership | [`contains`], [`contains_key`], [`error_is`] |
//! | containers | [`list`], [`bag`], [`set`] and their sub/super forms, [`not_any`] |
//! | shapes | [`struct_of`], [`sstruct`], [`map_of`], [`sub_map_of`], [`super_map_of`] |
//! | types | [`isa`], [`nil`], [`not_nil`], [`empty`], [`not_empty`], [`len`] |
//! | code | [`code`], [`code_result`], [`smuggle`], [`smuggle_path`] |
//!
//! Custom rules implement [`Operator`](crate::Operator) and are wrapped with
//! [`op`](crate::op).

mod code;
mod container;
mod contains;
mod error_is;
mod logic;
mod ordered;
mod strings;
mod structural;
mod types;

pub use code::{code, code_result, smuggle, smuggle_path, Code, Smuggle};
pub use container::{
    bag, list, not_any, set, sub_bag_of, sub_set_of, super_bag_of, super_set_of, List, Unordered,
};
pub use contains::{contains, contains_key, Contains, ContainsKey};
pub use error_is::{error_is, ErrorIs};
pub use logic::{all, any, equal, ignore, none, not, Combinator, Equal, Ignore, Not};
pub use ordered::{approx, between, between_bounds, gt, gte, lt, lte, Bounds, Ordered};
pub use strings::{
    has_prefix, has_prefix_ignore_case, has_suffix, has_suffix_ignore_case, re, StringRule,
};
pub use structural::{map_of, sstruct, struct_of, sub_map_of, super_map_of, MapRule, StructRule};
pub use types::{empty, isa, isa_type, len, nil, not_empty, not_nil, Isa, Len, Presence};

use crate::value::Value;

/// `a, b, c`
pub(crate) fn join(items: &[Value]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
