//! The compiled program model.
//!
//! Everything is name-addressed and serializable, so a compiled program
//! can be dumped, inspected and loaded without the analyzer's tables.

use serde::{Deserialize, Serialize};

use crate::instruction::Instruction;

/// One `[start, end)` range guarded by a handler. Entries are matched
/// first to last; the thrown value is the only stack entry at `handler`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionEntry {
    pub start: u32,
    pub end: u32,
    pub handler: u32,
    /// Fully qualified name of the caught throwable class.
    pub class: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledField {
    pub name: String,
    /// Type name, for inspection only.
    pub ty: String,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledMethod {
    pub name: String,
    /// `name(param,...)` with fully qualified type names; the invoke key.
    pub signature: String,
    pub is_static: bool,
    /// Physical local slots, receiver and arguments included.
    pub locals: u16,
    pub max_stack: u16,
    pub code: Vec<Instruction>,
    pub exceptions: Vec<ExceptionEntry>,
}

/// A compiled constructor. `signature` is the parenthesized parameter
/// list alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledConstructor {
    pub signature: String,
    pub locals: u16,
    pub max_stack: u16,
    pub code: Vec<Instruction>,
    pub exceptions: Vec<ExceptionEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledClass {
    /// Fully qualified name.
    pub name: String,
    pub is_interface: bool,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<CompiledField>,
    pub methods: Vec<CompiledMethod>,
    pub constructors: Vec<CompiledConstructor>,
}

/// All classes produced from one analysis, synthesized closure classes
/// included.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompiledProgram {
    pub classes: Vec<CompiledClass>,
}

impl CompiledProgram {
    pub fn class(&self, name: &str) -> Option<&CompiledClass> {
        self.classes.iter().find(|c| c.name == name)
    }
}

impl CompiledClass {
    pub fn method(&self, signature: &str) -> Option<&CompiledMethod> {
        self.methods.iter().find(|m| m.signature == signature)
    }
}
