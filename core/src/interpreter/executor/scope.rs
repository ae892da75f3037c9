//! Lexical scopes
//!
//! Scopes form a parent chain shared by closures, frames and evaluation
//! capabilities. A closure that captures a scope it is stored in creates an
//! `Rc` cycle; such scopes live until the process exits.

use super::types::Val;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub type Env = Rc<Scope>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Function body or program root: target of `var` declarations
    Function,
    Block,
}

#[derive(Debug, Clone)]
struct Binding {
    value: Val,
    mutable: bool,
}

/// Why an assignment was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignError {
    Undeclared,
    Constant,
}

pub struct Scope {
    vars: RefCell<HashMap<String, Binding>>,
    parent: Option<Env>,
    kind: ScopeKind,
}

impl Scope {
    pub fn root() -> Env {
        Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: None,
            kind: ScopeKind::Function,
        })
    }

    pub fn child(parent: &Env, kind: ScopeKind) -> Env {
        Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
            kind,
        })
    }

    /// Fresh sibling holding a copy of this scope's bindings.
    ///
    /// Used by `for(let ...)` so closures created in one iteration keep
    /// that iteration's values.
    pub fn copy_of(env: &Env) -> Env {
        Rc::new(Scope {
            vars: RefCell::new(env.vars.borrow().clone()),
            parent: env.parent.clone(),
            kind: env.kind,
        })
    }

    /// Nearest enclosing function scope (self included)
    pub fn function_scope(env: &Env) -> Env {
        let mut current = env.clone();
        loop {
            if current.kind == ScopeKind::Function {
                return current;
            }
            match &current.parent {
                Some(parent) => current = parent.clone(),
                None => return current,
            }
        }
    }

    pub fn declare(&self, name: impl Into<String>, value: Val, mutable: bool) {
        self.vars
            .borrow_mut()
            .insert(name.into(), Binding { value, mutable });
    }

    pub fn lookup(&self, name: &str) -> Option<Val> {
        if let Some(binding) = self.vars.borrow().get(name) {
            return Some(binding.value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Declared directly in this scope
    pub fn has_own(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name) || self.parent.as_ref().is_some_and(|p| p.has(name))
    }

    pub fn assign(&self, name: &str, value: Val) -> Result<(), AssignError> {
        if let Some(binding) = self.vars.borrow_mut().get_mut(name) {
            if !binding.mutable {
                return Err(AssignError::Constant);
            }
            binding.value = value;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(AssignError::Undeclared),
        }
    }

    /// Names declared directly in this scope, sorted
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vars.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("kind", &self.kind)
            .field("names", &self.local_names())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
