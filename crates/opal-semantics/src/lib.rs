//! Semantic analysis for Opal sources.
//!
//! [`pass::Analyzer`] takes parsed compilation units through four passes:
//! class table construction, header analysis, duplication checking with
//! delegation synthesis, and type checking. The result is a [`symbols::ClassTable`]
//! whose member bodies carry typed [`ir`], ready for code generation.

pub mod config;
pub mod error;
pub mod frame;
pub mod ir;
pub mod pass;
pub mod platform;
pub mod reporter;
pub mod resolver;
pub mod symbols;
pub mod types;

pub use config::CompilerConfig;
pub use error::{CompilationFailure, CompileError, SemanticErrorKind};
pub use pass::{Analysis, Analyzer};
pub use symbols::{ClassTable, Lookup};
pub use types::{BasicType, ClassId, TypeRef};
