// ABOUTME: Lexical scope chain used for both interpreter scopes and function closures

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates the global scope, populated by the caller with built-ins.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    /// Creates a child scope with the given parent in its lookup chain.
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Writes a binding in this scope only. This is the language's sole
    /// assignment primitive: it never walks the parent chain to find an
    /// existing binding to overwrite, so a function can never implicitly
    /// mutate a variable in its closure's scope.
    pub fn assign(&self, name: String, value: Value) {
        self.bindings.borrow_mut().insert(name, value);
    }

    /// Searches this scope, then its ancestors, returning the first binding.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }
}
