//! Events produced by `Handle::advance` (§4.3, GLOSSARY "Event").

use crate::interpreter::value::RuntimeValue;
use crate::intern::Symbol;
use serde::Serialize;
use std::collections::HashMap;

/// A deep copy of every live variable across the scope stack at the moment
/// a `Step` event was emitted, inner frames overriding outer (§3, §6).
pub type Snapshot = HashMap<Symbol, RuntimeValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    Step { line: u32, snapshot: Snapshot },
    Output { text: String },
    Input { name: Symbol, expected_type: crate::ast::BaseType },
    Error { message: String },
    Done,
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Error { .. } | Event::Done)
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Event::Step { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }
}

// `serde(tag = "type")` on `Event` needs `BaseType` to be serializable too.
impl Serialize for crate::ast::BaseType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let name = match self {
            crate::ast::BaseType::Integer => "Integer",
            crate::ast::BaseType::Real => "Real",
            crate::ast::BaseType::Boolean => "Boolean",
            crate::ast::BaseType::String => "String",
            crate::ast::BaseType::Char => "Char",
        };
        serializer.serialize_str(name)
    }
}

// `Symbol` carries no interner, so it serializes as its raw index; a host
// wanting the original name resolves it via the `Interner` it already holds.
impl Serialize for Symbol {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.index() as u64)
    }
}
