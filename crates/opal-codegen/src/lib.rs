//! Code generation for analyzed Opal programs.
//!
//! Consumes an [`Analysis`](opal_semantics::Analysis) and produces a
//! [`CompiledProgram`]: one [`CompiledClass`] per source class (plus one
//! per closure expression), each method a flat instruction sequence with
//! resolved branch targets, exception tables and a computed maximum
//! operand stack depth.

pub mod builder;
pub mod error;
pub mod frame_layout;
pub mod generator;
pub mod instruction;
pub mod output;

pub use builder::{CodeBody, CodeBuilder, LabelId};
pub use error::CodegenError;
pub use frame_layout::FrameLayout;
pub use generator::generate;
pub use instruction::{num_kind, CmpOp, Instruction, NumKind};
pub use output::{
    CompiledClass, CompiledConstructor, CompiledField, CompiledMethod, CompiledProgram,
    ExceptionEntry,
};
