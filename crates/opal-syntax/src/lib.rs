//! Abstract syntax trees for the Opal language.
//!
//! This crate defines the parsed-source contract consumed by the semantic
//! analyzer: compilation units, declarations, statements, expressions, type
//! specifiers, source locations and modifier bits. It deliberately contains
//! no parser; front ends (and tests) construct these trees directly.
//!
//! Declaration nodes carry a [`NodeId`] so later phases can associate them
//! with resolved symbols without holding references into the tree.

pub mod decl;
pub mod expr;
pub mod location;
pub mod modifier;
pub mod node;
pub mod stmt;
pub mod types;

pub use decl::*;
pub use expr::*;
pub use location::Location;
pub use modifier::Modifiers;
pub use node::{NodeId, NodeIdGen};
pub use stmt::*;
pub use types::{PrimitiveKind, TypeName, TypeSpec};
