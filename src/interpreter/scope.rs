//! The call stack of scopes (§3 "Scope").

use crate::interpreter::value::RuntimeValue;
use crate::intern::Symbol;
use std::collections::HashMap;

/// A mapping from name to runtime value, plus an optional pending return
/// value slot, per §3. One `Scope` is pushed per function/procedure
/// activation and per program start; popped on return or completion.
#[derive(Debug, Default)]
pub struct Scope {
    vars: HashMap<Symbol, RuntimeValue>,
    pub pending_return: Option<RuntimeValue>,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    pub fn declare(&mut self, name: Symbol, value: RuntimeValue) {
        self.vars.insert(name, value);
    }

    pub fn get(&self, name: Symbol) -> Option<&RuntimeValue> {
        self.vars.get(&name)
    }

    pub fn get_mut(&mut self, name: Symbol) -> Option<&mut RuntimeValue> {
        self.vars.get_mut(&name)
    }

    pub fn contains(&self, name: Symbol) -> bool {
        self.vars.contains_key(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &RuntimeValue)> {
        self.vars.iter().map(|(k, v)| (*k, v))
    }
}

/// The ordered sequence of scopes, global at the bottom (§3).
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack { frames: vec![Scope::new()] }
    }

    pub fn push(&mut self, scope: Scope) {
        self.frames.push(scope);
    }

    pub fn pop(&mut self) -> Option<Scope> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    pub fn top(&self) -> &Scope {
        self.frames.last().expect("scope stack is never empty")
    }

    pub fn top_mut(&mut self) -> &mut Scope {
        self.frames.last_mut().expect("scope stack is never empty")
    }

    /// Searches frames top-down and returns the innermost binding (§3, §4.3
    /// "Scope discipline").
    pub fn lookup(&self, name: Symbol) -> Option<&RuntimeValue> {
        self.frames.iter().rev().find_map(|f| f.get(name))
    }

    /// Mutates the innermost binding in place; the `For` aliasing rule (§9)
    /// depends on this finding the same cell `lookup` would read.
    pub fn lookup_mut(&mut self, name: Symbol) -> Option<&mut RuntimeValue> {
        self.frames.iter_mut().rev().find(|f| f.contains(name)).and_then(|f| f.get_mut(name))
    }

    pub fn declare_in_top(&mut self, name: Symbol, value: RuntimeValue) {
        self.top_mut().declare(name, value);
    }

    /// Deep-copies the merged view of every live variable, inner frames
    /// overriding outer ones (§4.3 `Step`'s `snapshot`, GLOSSARY `Snapshot`).
    pub fn snapshot(&self) -> HashMap<Symbol, RuntimeValue> {
        let mut merged = HashMap::new();
        for frame in &self.frames {
            for (name, value) in frame.iter() {
                merged.insert(name, value.clone());
            }
        }
        merged
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
