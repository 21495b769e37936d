//! Lexically scoped environments for inference.
//!
//! An [`Environment`] is a chain of scopes: lookups walk outward, inserts
//! always land in the innermost scope. Opening a child scope snapshots the
//! receiver, so bindings added to an outer scope afterwards are not visible
//! through the child. Lowering only extends the module scope between items,
//! never while a child scope is live, so the snapshot is always current.

use std::collections::BTreeMap;
use std::rc::Rc;

/// A chain of binding scopes.
///
/// `Clone` copies only the receiver's own bindings and shares the parent
/// chain, capturing the environment as it is at one point without seeing
/// bindings added later.
#[derive(Debug, Clone)]
pub struct Environment<T> {
    parent: Option<Rc<Environment<T>>>,
    bindings: BTreeMap<String, T>,
}

impl<T> Environment<T> {
    pub fn new() -> Self {
        Self {
            parent: None,
            bindings: BTreeMap::new(),
        }
    }

    /// Bind `name` in this scope, shadowing any outer binding of the same
    /// name without affecting it. Re-binding a name replaces it.
    pub fn insert(&mut self, name: impl Into<String>, value: T) {
        self.bindings.insert(name.into(), value);
    }

    /// Find the nearest binding of `name`, walking outward.
    pub fn lookup(&self, name: &str) -> Option<&T> {
        match self.bindings.get(name) {
            Some(value) => Some(value),
            None => self.parent.as_deref()?.lookup(name),
        }
    }

    /// Iterate this scope's own bindings, ignoring parents.
    pub fn local_bindings(&self) -> impl Iterator<Item = (&String, &T)> {
        self.bindings.iter()
    }

    /// Visit every reachable value, including bindings shadowed by an inner
    /// scope.
    pub fn for_each_value(&self, visit: &mut impl FnMut(&T)) {
        for value in self.bindings.values() {
            visit(value);
        }
        if let Some(parent) = &self.parent {
            parent.for_each_value(visit);
        }
    }
}

impl<T: Clone> Environment<T> {
    /// Open a scope whose parent is a snapshot of `self`.
    pub fn new_child(&self) -> Environment<T> {
        Environment {
            parent: Some(Rc::new(self.clone())),
            bindings: BTreeMap::new(),
        }
    }
}

impl<T> Default for Environment<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outward() {
        let mut outer = Environment::new();
        outer.insert("x", 1);
        let inner = outer.new_child();
        assert_eq!(inner.lookup("x"), Some(&1));
        assert_eq!(inner.lookup("y"), None);
    }

    #[test]
    fn insert_shadows_without_touching_the_parent() {
        let mut outer = Environment::new();
        outer.insert("x", 1);
        let mut inner = outer.new_child();
        inner.insert("x", 2);
        assert_eq!(inner.lookup("x"), Some(&2));
        assert_eq!(outer.lookup("x"), Some(&1));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut env = Environment::new();
        env.insert("x", 1);
        env.insert("x", 2);
        assert_eq!(env.lookup("x"), Some(&2));
        assert_eq!(env.local_bindings().count(), 1);
    }

    #[test]
    fn child_snapshots_the_receiver() {
        let mut outer = Environment::new();
        outer.insert("early", 1);
        let inner = outer.new_child();
        outer.insert("late", 2);
        assert_eq!(inner.lookup("early"), Some(&1));
        assert_eq!(inner.lookup("late"), None);
    }

    #[test]
    fn clone_copies_own_scope_and_shares_the_parent() {
        let mut outer = Environment::new();
        outer.insert("x", 1);
        let mut inner = outer.new_child();
        inner.insert("y", 2);

        let mut copy = inner.clone();
        copy.insert("z", 3);
        assert_eq!(copy.lookup("x"), Some(&1));
        assert_eq!(copy.lookup("y"), Some(&2));
        assert_eq!(inner.lookup("z"), None);
    }

    #[test]
    fn for_each_value_includes_shadowed_bindings() {
        let mut outer = Environment::new();
        outer.insert("x", 1);
        let mut inner = outer.new_child();
        inner.insert("x", 2);

        let mut seen = Vec::new();
        inner.for_each_value(&mut |v| seen.push(*v));
        assert_eq!(seen, vec![2, 1]);
    }
}
