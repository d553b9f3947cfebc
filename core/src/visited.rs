//! Visited set — cycle guard for recursive descent
//!
//! Holds the (got, expected) storage pairs currently on the recursion stack.
//! Only reference kinds with shared storage are registered; value kinds
//! cannot cycle.

use std::collections::HashSet;

use crate::value::{Kind, Value};

type Pair = (usize, usize, Kind);

#[derive(Debug, Default)]
pub struct Visited {
    pairs: HashSet<Pair>,
}

impl Visited {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the pair. Returns `true` if it was already being compared.
    ///
    /// Pairs that cannot cycle (scalars, nil references, mismatched kinds)
    /// are never registered and always return `false`.
    pub fn enter(&mut self, got: &Value, expected: &Value) -> bool {
        match pair(got, expected) {
            Some(pair) => !self.pairs.insert(pair),
            None => false,
        }
    }

    /// Undo a previous [`enter`](Self::enter) that returned `false`.
    pub fn leave(&mut self, got: &Value, expected: &Value) {
        if let Some(pair) = pair(got, expected) {
            self.pairs.remove(&pair);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn pair(got: &Value, expected: &Value) -> Option<Pair> {
    let (g, e, kind) = match (got, expected) {
        (Value::Ptr(g), Value::Ptr(e)) => (g.addr()?, e.addr()?, Kind::Ptr),
        (Value::Slice(g), Value::Slice(e)) => (g.addr()?, e.addr()?, Kind::Slice),
        (Value::Map(g), Value::Map(e)) => (g.addr()?, e.addr()?, Kind::Map),
        _ => return None,
    };
    Some((g, e, kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::IntoValue;

    #[test]
    fn test_enter_leave_balanced() {
        let a = Some(1i64).into_value();
        let b = Some(1i64).into_value();
        let mut visited = Visited::new();

        assert!(!visited.enter(&a, &b));
        assert!(visited.enter(&a, &b));
        visited.leave(&a, &b);
        assert!(visited.is_empty());
        assert!(!visited.enter(&a, &b));
    }

    #[test]
    fn test_pairs_are_ordered() {
        let a = vec![1i64].into_value();
        let b = vec![1i64].into_value();
        let mut visited = Visited::new();

        assert!(!visited.enter(&a, &b));
        assert!(!visited.enter(&b, &a));
        assert_eq!(visited.len(), 2);
    }

    #[test]
    fn test_value_kinds_never_registered() {
        let mut visited = Visited::new();
        let a = 1i64.into_value();
        assert!(!visited.enter(&a, &a));
        assert!(!visited.enter(&a, &a));
        assert!(visited.is_empty());

        let nil = Option::<i64>::None.into_value();
        assert!(!visited.enter(&nil, &nil));
        assert!(visited.is_empty());
    }
}
