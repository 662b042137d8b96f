#![forbid(unsafe_code)]

//! Keyed attribute store consulted by views and extension helpers.
//!
//! Every view carries an [`Environment`]: a map from string keys to
//! type-erased values. Entries are written with a `cascades` flag; a
//! cascading entry is visible to descendant views (the walk up the parent
//! chain is performed by the view registry, which only consults entries
//! whose flag is set when resolving through an ancestor).
//!
//! # Invariants
//!
//! 1. A key holds at most one value; writing replaces.
//! 2. Reads with the wrong type return `None` rather than fail.
//! 3. The store itself has no notion of views; cascading is a flag it
//!    records, not a lookup it performs.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

/// Well-known environment keys used by the built-in extension helpers.
pub mod keys {
    /// Horizontal text alignment hint ([`TextAlignment`](super::TextAlignment)).
    pub const TEXT_ALIGNMENT: &str = "text.alignment";
}

/// Horizontal text alignment hint stored in the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextAlignment {
    Leading,
    Center,
    Trailing,
    Justified,
}

struct Entry {
    value: Rc<dyn Any>,
    cascades: bool,
}

/// A per-view keyed attribute store.
#[derive(Default)]
pub struct Environment {
    entries: HashMap<String, Entry>,
}

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Store `value` under `key`, replacing any previous entry.
    ///
    /// `cascades` marks the entry as visible to descendant views.
    pub fn set<T: 'static>(&mut self, key: impl Into<String>, value: T, cascades: bool) {
        self.entries.insert(
            key.into(),
            Entry {
                value: Rc::new(value),
                cascades,
            },
        );
    }

    /// Read the entry under `key` as a `T`.
    ///
    /// Returns `None` when the key is absent or holds a different type.
    #[must_use]
    pub fn get<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        self.entries
            .get(key)
            .and_then(|e| e.value.downcast_ref::<T>())
            .cloned()
    }

    /// Like [`get`](Self::get), but only for entries marked cascading.
    ///
    /// Used when resolving a key through an ancestor view.
    #[must_use]
    pub fn get_if_cascading<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        self.entries
            .get(key)
            .filter(|e| e.cascades)
            .and_then(|e| e.value.downcast_ref::<T>())
            .cloned()
    }

    /// Remove the entry under `key`, returning whether one existed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("len", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let mut env = Environment::new();
        env.set(keys::TEXT_ALIGNMENT, TextAlignment::Center, false);
        assert_eq!(
            env.get::<TextAlignment>(keys::TEXT_ALIGNMENT),
            Some(TextAlignment::Center)
        );
    }

    #[test]
    fn wrong_type_reads_none() {
        let mut env = Environment::new();
        env.set("padding", 8.0f32, false);
        assert_eq!(env.get::<i32>("padding"), None);
        assert_eq!(env.get::<f32>("padding"), Some(8.0));
    }

    #[test]
    fn replace_overwrites() {
        let mut env = Environment::new();
        env.set("title", String::from("a"), false);
        env.set("title", String::from("b"), false);
        assert_eq!(env.get::<String>("title").as_deref(), Some("b"));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn cascading_filter() {
        let mut env = Environment::new();
        env.set("local", 1i32, false);
        env.set("inherited", 2i32, true);
        assert_eq!(env.get_if_cascading::<i32>("local"), None);
        assert_eq!(env.get_if_cascading::<i32>("inherited"), Some(2));
        // A plain read sees both.
        assert_eq!(env.get::<i32>("local"), Some(1));
    }

    #[test]
    fn remove_clears_entry() {
        let mut env = Environment::new();
        env.set("k", 1u8, false);
        assert!(env.remove("k"));
        assert!(!env.remove("k"));
        assert!(env.is_empty());
    }
}
