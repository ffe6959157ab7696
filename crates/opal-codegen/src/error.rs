//! Code generation errors.
//!
//! These indicate internal inconsistencies, not user mistakes: the
//! analyzer rejects ill-formed programs before code generation starts.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    #[error("label {label} was never bound")]
    UnboundLabel { label: u32 },

    #[error("operand stack underflow at instruction {at}")]
    StackUnderflow { at: usize },

    #[error("inconsistent stack depth at instruction {at}: {first} vs {second}")]
    InconsistentStack { at: usize, first: u16, second: u16 },

    #[error("branch to instruction {target} is out of bounds")]
    BranchOutOfBounds { target: u32 },

    #[error("method body for {class}.{method} is missing")]
    MissingBody { class: String, method: String },
}
