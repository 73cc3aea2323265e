//! Chained symbol tables
//!
//! One generic scope serves every stage: the type scope maps names to
//! types, and the value scope maps names to shaped globals at build time and
//! to live values at run time.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared reference to a scope
pub type ScopeRef<T> = Rc<RefCell<Scope<T>>>;

/// Names bound at one level, plus the enclosing level
#[derive(Debug)]
pub struct Scope<T> {
    symbols: HashMap<String, T>,
    parent: Option<ScopeRef<T>>,
}

impl<T: Clone> Scope<T> {
    /// Create a root scope
    pub fn new() -> Self {
        Scope {
            symbols: HashMap::new(),
            parent: None,
        }
    }

    pub fn with_parent(parent: ScopeRef<T>) -> Self {
        Scope {
            symbols: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Wrap in Rc<RefCell<>>
    pub fn into_ref(self) -> ScopeRef<T> {
        Rc::new(RefCell::new(self))
    }

    /// Bind at this level; fails if the name is already bound here
    pub fn try_bind(&mut self, name: impl Into<String>, value: T) -> bool {
        let name = name.into();
        if self.symbols.contains_key(&name) {
            return false;
        }
        self.symbols.insert(name, value);
        true
    }

    /// Look a name up here, then outward through the parents
    pub fn try_get(&self, name: &str) -> Option<T> {
        if let Some(value) = self.symbols.get(name) {
            Some(value.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().try_get(name)
        } else {
            None
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.borrow().has(name))
    }

    /// Bindings at this level, to be put back with [`Scope::restore`]
    pub fn checkpoint(&self) -> Checkpoint<T> {
        Checkpoint {
            symbols: self.symbols.clone(),
        }
    }

    /// Drop every binding made at this level since `checkpoint`
    pub fn restore(&mut self, checkpoint: Checkpoint<T>) {
        self.symbols = checkpoint.symbols;
    }

    /// Names bound at this level, sorted
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.symbols.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Saved bindings of one scope level
#[derive(Debug, Clone)]
pub struct Checkpoint<T> {
    symbols: HashMap<String, T>,
}

impl<T> Checkpoint<T> {
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.symbols.values()
    }
}

impl<T: Clone> Default for Scope<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a child scope of `parent`
pub fn child_scope<T: Clone>(parent: &ScopeRef<T>) -> ScopeRef<T> {
    Scope::with_parent(Rc::clone(parent)).into_ref()
}
