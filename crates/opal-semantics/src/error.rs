//! Semantic diagnostics.

use opal_syntax::Location;
use thiserror::Error;

/// Every kind of diagnostic the analyzer can produce.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticErrorKind {
    #[error("incompatible type: expected {expected}, found {found}")]
    IncompatibleType { expected: String, found: String },

    #[error("incompatible operand types {lhs} and {rhs} for '{op}'")]
    IncompatibleOperandType {
        op: String,
        lhs: String,
        rhs: String,
    },

    #[error("variable '{name}' is not found")]
    VariableNotFound { name: String },

    #[error("class '{name}' is not found")]
    ClassNotFound { name: String },

    #[error("field '{name}' is not found in {class}")]
    FieldNotFound { class: String, name: String },

    #[error("method '{name}' is not found in {class}")]
    MethodNotFound { class: String, name: String },

    #[error("reference to method '{name}' in {class} is ambiguous")]
    AmbiguousMethod { class: String, name: String },

    #[error("duplicate local variable '{name}'")]
    DuplicateLocalVariable { name: String },

    #[error("duplicate class '{name}'")]
    DuplicateClass { name: String },

    #[error("duplicate field '{name}' in {class}")]
    DuplicateField { class: String, name: String },

    #[error("duplicate method '{name}' in {class}")]
    DuplicateMethod { class: String, name: String },

    #[error("duplicate global variable '{name}'")]
    DuplicateGlobalVariable { name: String },

    #[error("duplicate function '{name}'")]
    DuplicateFunction { name: String },

    #[error("method '{name}' in {class} is not accessible from here")]
    MethodNotAccessible { class: String, name: String },

    #[error("field '{name}' in {class} is not accessible from here")]
    FieldNotAccessible { class: String, name: String },

    #[error("class '{name}' is not accessible from here")]
    ClassNotAccessible { name: String },

    #[error("inheritance of class '{name}' is cyclic")]
    CyclicInheritance { name: String },

    #[error("'{name}' cannot be inherited here")]
    IllegalInheritance { name: String },

    #[error("static method '{name}' in {class} cannot be called on an instance")]
    IllegalMethodCall { class: String, name: String },

    #[error("cannot return a value here")]
    CannotReturnValue,

    #[error("no matching constructor found for {class}")]
    ConstructorNotFound { class: String },

    #[error("reference to a constructor of {class} is ambiguous")]
    AmbiguousConstructor { class: String },

    #[error("an interface type is required, found {found}")]
    InterfaceRequired { found: String },

    #[error("this feature is not implemented")]
    UnimplementedFeature,

    #[error("duplicate constructor in {class}")]
    DuplicateConstructor { class: String },

    #[error("delegated method '{name}' is generated twice in {class}")]
    DuplicateGeneratedMethod { class: String, name: String },

    #[error("{found} is not a boxable type")]
    IsNotBoxableType { found: String },

    #[error("the left side of an assignment must be assignable")]
    LValueRequired,
}

/// One reported diagnostic: what, where, in which file.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{source_file}:{location}: {kind}")]
pub struct CompileError {
    pub kind: SemanticErrorKind,
    pub location: Location,
    pub source_file: String,
}

/// Aggregate failure returned when any pass produced diagnostics.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("compilation failed with {} error(s)", errors.len())]
pub struct CompilationFailure {
    pub errors: Vec<CompileError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_render() {
        let kind = SemanticErrorKind::IncompatibleType {
            expected: "int".into(),
            found: "boolean".into(),
        };
        assert_eq!(
            kind.to_string(),
            "incompatible type: expected int, found boolean"
        );

        let err = CompileError {
            kind,
            location: Location::new(3, 7),
            source_file: "main.opl".into(),
        };
        assert_eq!(
            err.to_string(),
            "main.opl:3:7: incompatible type: expected int, found boolean"
        );
    }
}
