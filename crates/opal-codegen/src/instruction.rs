//! The generated instruction set.
//!
//! A compiled method is a flat sequence of stack-machine instructions.
//! Branch targets are instruction indices; classes and members are
//! referenced by name so the output stays self-describing when
//! serialized.
//!
//! Two conventions differ from classic JVM-style encodings and matter
//! to consumers: comparisons ([`Instruction::Cmp`], `RefCmp`) push a
//! boolean directly instead of branching to load a constant, and frame
//! cells are typed, so `FrameLoad`/`FrameStore` carry a width tag and
//! primitives cross frame boundaries without boxing.

use serde::{Deserialize, Serialize};

use opal_semantics::{BasicType, TypeRef};

/// Arithmetic family of a value on the operand stack. The sub-int types
/// (`byte`, `short`, `char`, `boolean`) compute as `Int`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumKind {
    Int,
    Long,
    Float,
    Double,
}

impl NumKind {
    /// Stack slots a value of this kind occupies.
    pub fn width(self) -> u16 {
        match self {
            NumKind::Long | NumKind::Double => 2,
            _ => 1,
        }
    }
}

/// The arithmetic family of a basic type; `None` for `void`.
pub fn num_kind(ty: TypeRef) -> Option<NumKind> {
    match ty {
        TypeRef::Basic(BasicType::Long) => Some(NumKind::Long),
        TypeRef::Basic(BasicType::Float) => Some(NumKind::Float),
        TypeRef::Basic(BasicType::Double) => Some(NumKind::Double),
        TypeRef::Basic(BasicType::Void) => None,
        TypeRef::Basic(_) => Some(NumKind::Int),
        _ => None,
    }
}

/// Comparison operators carried by [`Instruction::Cmp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// One stack-machine instruction.
///
/// `wide` flags mark values occupying two stack slots (`long`/`double`);
/// `args` and `ret` on the invoke family are slot counts, receiver
/// excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    // ===== Constants =====
    ConstNull,
    ConstBool(bool),
    ConstInt(i32),
    ConstLong(i64),
    ConstChar(char),
    ConstFloat(f32),
    ConstDouble(f64),
    ConstStr(String),

    // ===== Stack manipulation =====
    /// Drop the top slot.
    Pop,
    /// Drop the top two slots.
    Pop2,
    /// Duplicate the top value.
    Dup { wide: bool },
    /// Duplicate the top value below the single slot beneath it.
    DupX1 { wide: bool },
    /// Duplicate the top value below the two slots beneath it.
    DupX2 { wide: bool },

    // ===== Locals and frame objects =====
    /// Push a local variable.
    Load { slot: u16, wide: bool },
    /// Pop into a local variable.
    Store { slot: u16, wide: bool },
    /// Push a fresh frame object with `size` cells.
    NewFrame { size: u16 },
    /// Pop a frame object, push the value in cell `slot`.
    FrameLoad { slot: u16, wide: bool },
    /// Pop a frame object, then a value; store the value in cell `slot`.
    FrameStore { slot: u16, wide: bool },

    // ===== Arithmetic and conversion =====
    Add(NumKind),
    Sub(NumKind),
    Mul(NumKind),
    Div(NumKind),
    Rem(NumKind),
    Neg(NumKind),
    /// Shift distance is always an `int` on top of the stack.
    Shl(NumKind),
    Shr(NumKind),
    UShr(NumKind),
    BitAnd(NumKind),
    BitOr(NumKind),
    BitXor(NumKind),
    /// Numeric conversion between arithmetic families.
    Convert { from: NumKind, to: NumKind },

    // ===== Comparison and logic =====
    /// Pop two values of `kind`, push a `boolean`.
    Cmp { op: CmpOp, kind: NumKind },
    /// Pop two references, push identity (in)equality.
    RefCmp { negated: bool },
    /// Boolean negation.
    Not,

    // ===== Control flow =====
    Jump { target: u32 },
    JumpIfTrue { target: u32 },
    JumpIfFalse { target: u32 },
    JumpIfNull { target: u32 },
    JumpIfNonNull { target: u32 },

    // ===== Fields =====
    GetField { class: String, field: String, wide: bool },
    PutField { class: String, field: String, wide: bool },
    GetStatic { class: String, field: String, wide: bool },
    PutStatic { class: String, field: String, wide: bool },

    // ===== Objects and arrays =====
    /// Push an uninitialized instance.
    New { class: String },
    /// Pop `dims` sizes, push an array of the named component type.
    NewArray { component: String, dims: u8 },
    ArrayLoad { wide: bool },
    ArrayStore { wide: bool },
    ArrayLength,
    CheckCast { class: String },
    InstanceOf { class: String },

    // ===== Calls =====
    /// Virtual dispatch through the receiver under the arguments.
    InvokeVirtual { class: String, method: String, args: u16, ret: u16 },
    /// Non-virtual dispatch to a superclass method.
    InvokeSuper { class: String, method: String, args: u16, ret: u16 },
    InvokeStatic { class: String, method: String, args: u16, ret: u16 },
    /// Constructor call; pops the arguments and the receiver.
    InvokeCtor { class: String, signature: String, args: u16 },

    // ===== Returns and exceptions =====
    ReturnValue { wide: bool },
    ReturnVoid,
    /// Pop a throwable reference and unwind.
    Throw,
}

impl Instruction {
    /// Net stack effect as `(pops, pushes)`, in slots.
    pub fn stack_effect(&self) -> (u16, u16) {
        use Instruction::*;
        let w = |wide: &bool| if *wide { 2 } else { 1 };
        match self {
            ConstNull | ConstBool(_) | ConstInt(_) | ConstChar(_) | ConstFloat(_)
            | ConstStr(_) => (0, 1),
            ConstLong(_) | ConstDouble(_) => (0, 2),
            Pop => (1, 0),
            Pop2 => (2, 0),
            Dup { wide } => (w(wide), 2 * w(wide)),
            DupX1 { wide } => (w(wide) + 1, 2 * w(wide) + 1),
            DupX2 { wide } => (w(wide) + 2, 2 * w(wide) + 2),
            Load { wide, .. } => (0, w(wide)),
            Store { wide, .. } => (w(wide), 0),
            NewFrame { .. } => (0, 1),
            FrameLoad { wide, .. } => (1, w(wide)),
            FrameStore { wide, .. } => (w(wide) + 1, 0),
            Add(k) | Sub(k) | Mul(k) | Div(k) | Rem(k) | BitAnd(k) | BitOr(k) | BitXor(k) => {
                (2 * k.width(), k.width())
            }
            Shl(k) | Shr(k) | UShr(k) => (k.width() + 1, k.width()),
            Neg(k) => (k.width(), k.width()),
            Convert { from, to } => (from.width(), to.width()),
            Cmp { kind, .. } => (2 * kind.width(), 1),
            RefCmp { .. } => (2, 1),
            Not => (1, 1),
            Jump { .. } => (0, 0),
            JumpIfTrue { .. } | JumpIfFalse { .. } | JumpIfNull { .. }
            | JumpIfNonNull { .. } => (1, 0),
            GetField { wide, .. } => (1, w(wide)),
            PutField { wide, .. } => (w(wide) + 1, 0),
            GetStatic { wide, .. } => (0, w(wide)),
            PutStatic { wide, .. } => (w(wide), 0),
            New { .. } => (0, 1),
            NewArray { dims, .. } => (*dims as u16, 1),
            ArrayLoad { wide } => (2, w(wide)),
            ArrayStore { wide } => (w(wide) + 2, 0),
            ArrayLength => (1, 1),
            CheckCast { .. } | InstanceOf { .. } => (1, 1),
            InvokeVirtual { args, ret, .. } | InvokeSuper { args, ret, .. } => (args + 1, *ret),
            InvokeStatic { args, ret, .. } => (*args, *ret),
            InvokeCtor { args, .. } => (args + 1, 0),
            ReturnValue { wide } => (w(wide), 0),
            ReturnVoid => (0, 0),
            Throw => (1, 0),
        }
    }

    /// Whether control never falls through to the next instruction.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Jump { .. }
                | Instruction::ReturnValue { .. }
                | Instruction::ReturnVoid
                | Instruction::Throw
        )
    }

    /// Branch target, when the instruction has one.
    pub fn branch_target(&self) -> Option<u32> {
        match self {
            Instruction::Jump { target }
            | Instruction::JumpIfTrue { target }
            | Instruction::JumpIfFalse { target }
            | Instruction::JumpIfNull { target }
            | Instruction::JumpIfNonNull { target } => Some(*target),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_flags_change_stack_effects() {
        assert_eq!(Instruction::Dup { wide: false }.stack_effect(), (1, 2));
        assert_eq!(Instruction::Dup { wide: true }.stack_effect(), (2, 4));
        assert_eq!(Instruction::ConstLong(1).stack_effect(), (0, 2));
        assert_eq!(
            Instruction::InvokeVirtual {
                class: "a.B".into(),
                method: "m(int)".into(),
                args: 1,
                ret: 2,
            }
            .stack_effect(),
            (2, 2)
        );
    }

    #[test]
    fn sub_int_types_compute_as_int() {
        assert_eq!(num_kind(TypeRef::Basic(BasicType::Byte)), Some(NumKind::Int));
        assert_eq!(num_kind(TypeRef::Basic(BasicType::Boolean)), Some(NumKind::Int));
        assert_eq!(num_kind(TypeRef::Basic(BasicType::Long)), Some(NumKind::Long));
        assert_eq!(num_kind(TypeRef::Basic(BasicType::Void)), None);
        assert_eq!(num_kind(TypeRef::Null), None);
    }
}
