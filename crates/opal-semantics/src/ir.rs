//! Typed intermediate representation.
//!
//! Every expression node knows its resolved type; member references are
//! `(class, index)` handles into the class table. Loop sugar, foreach,
//! select and cond are already lowered away by the time IR exists.

use opal_syntax::NodeId;
use rustc_hash::FxHashMap;

use crate::frame::{CapturedBinding, FrameSnapshot, LocalBinding};
use crate::symbols::{ConstructorRef, FieldRef, MethodRef};
use crate::types::{ArrayId, BasicType, ClassId, TypeRef};

/// Binary operators surviving into IR. Comparisons yield `boolean`;
/// `LogicalAnd`/`LogicalOr`/`Elvis` keep their short-circuit meaning and
/// are lowered to branches during code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrBinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    LogicalAnd,
    LogicalOr,
    Elvis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrUnaryOp {
    Neg,
    Not,
    BitNot,
}

/// A typed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum IrExpr {
    Int { value: i32 },
    Long { value: i64 },
    Char { value: char },
    Float { value: f32 },
    Double { value: f64 },
    Bool { value: bool },
    Str { value: String, ty: TypeRef },
    Null,
    /// List literal, building an instance of the platform list type.
    List { elements: Vec<IrExpr>, ty: TypeRef },
    This { ty: TypeRef },
    RefLocal { binding: CapturedBinding },
    SetLocal { binding: CapturedBinding, value: Box<IrExpr> },
    RefField { target: Box<IrExpr>, field: FieldRef, ty: TypeRef },
    SetField { target: Box<IrExpr>, field: FieldRef, value: Box<IrExpr>, ty: TypeRef },
    RefStaticField { field: FieldRef, ty: TypeRef },
    SetStaticField { field: FieldRef, value: Box<IrExpr>, ty: TypeRef },
    ArrayLength { target: Box<IrExpr> },
    ArrayRef { target: Box<IrExpr>, index: Box<IrExpr>, ty: TypeRef },
    ArraySet {
        target: Box<IrExpr>,
        index: Box<IrExpr>,
        value: Box<IrExpr>,
        ty: TypeRef,
    },
    Unary { op: IrUnaryOp, ty: TypeRef, operand: Box<IrExpr> },
    Binary { op: IrBinOp, ty: TypeRef, lhs: Box<IrExpr>, rhs: Box<IrExpr> },
    /// Widening/narrowing numeric conversion or reference downcast.
    Cast { value: Box<IrExpr>, to: TypeRef },
    IsInstance { value: Box<IrExpr>, of: TypeRef },
    Call {
        target: Box<IrExpr>,
        method: MethodRef,
        args: Vec<IrExpr>,
        ty: TypeRef,
    },
    CallStatic { method: MethodRef, args: Vec<IrExpr>, ty: TypeRef },
    /// Non-virtual call to a superclass method.
    CallSuper {
        target: Box<IrExpr>,
        method: MethodRef,
        args: Vec<IrExpr>,
        ty: TypeRef,
    },
    New { ctor: ConstructorRef, args: Vec<IrExpr>, ty: TypeRef },
    NewArray { array: ArrayId, sizes: Vec<IrExpr> },
    NewClosure(Box<IrClosure>),
    /// Evaluate in order, yield the last value. Intermediate values are
    /// dropped.
    Begin { exprs: Vec<IrExpr> },
}

impl IrExpr {
    pub fn int(value: i32) -> Self {
        IrExpr::Int { value }
    }

    pub fn ty(&self) -> TypeRef {
        match self {
            IrExpr::Int { .. } => TypeRef::INT,
            IrExpr::Long { .. } => TypeRef::LONG,
            IrExpr::Char { .. } => TypeRef::CHAR,
            IrExpr::Float { .. } => TypeRef::FLOAT,
            IrExpr::Double { .. } => TypeRef::DOUBLE,
            IrExpr::Bool { .. } => TypeRef::BOOLEAN,
            IrExpr::Str { ty, .. } => *ty,
            IrExpr::Null => TypeRef::Null,
            IrExpr::List { ty, .. } => *ty,
            IrExpr::This { ty } => *ty,
            IrExpr::RefLocal { binding } => binding.ty,
            IrExpr::SetLocal { binding, .. } => binding.ty,
            IrExpr::RefField { ty, .. } => *ty,
            IrExpr::SetField { ty, .. } => *ty,
            IrExpr::RefStaticField { ty, .. } => *ty,
            IrExpr::SetStaticField { ty, .. } => *ty,
            IrExpr::ArrayLength { .. } => TypeRef::INT,
            IrExpr::ArrayRef { ty, .. } => *ty,
            IrExpr::ArraySet { ty, .. } => *ty,
            IrExpr::Unary { ty, .. } => *ty,
            IrExpr::Binary { ty, .. } => *ty,
            IrExpr::Cast { to, .. } => *to,
            IrExpr::IsInstance { .. } => TypeRef::BOOLEAN,
            IrExpr::Call { ty, .. } => *ty,
            IrExpr::CallStatic { ty, .. } => *ty,
            IrExpr::CallSuper { ty, .. } => *ty,
            IrExpr::New { ty, .. } => *ty,
            IrExpr::NewArray { array, .. } => TypeRef::Array(*array),
            IrExpr::NewClosure(c) => TypeRef::Class(c.interface),
            IrExpr::Begin { exprs } => exprs.last().map(IrExpr::ty).unwrap_or(TypeRef::VOID),
        }
    }

    /// Whether the value occupies two stack slots.
    pub fn is_wide(&self) -> bool {
        matches!(self.ty(), TypeRef::Basic(BasicType::Long | BasicType::Double))
    }
}

/// A closure expression after checking: the interface it implements, the
/// single interface method it provides, its checked body and captured
/// frame shape.
#[derive(Debug, Clone, PartialEq)]
pub struct IrClosure {
    pub interface: ClassId,
    pub method: MethodRef,
    pub params: Vec<TypeRef>,
    pub return_type: TypeRef,
    pub body: IrStmt,
    pub frame: FrameSnapshot,
    /// Creation context is an instance member, so the synthesized class
    /// carries a reference to the enclosing instance.
    pub has_outer: bool,
}

/// A typed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum IrStmt {
    Block(Vec<IrStmt>),
    Expression(IrExpr),
    If {
        condition: IrExpr,
        then_branch: Box<IrStmt>,
        else_branch: Option<Box<IrStmt>>,
    },
    /// Pre-test loop; `for` and `foreach` forms are lowered into this.
    Loop { condition: IrExpr, body: Box<IrStmt> },
    Return { value: Option<IrExpr> },
    Throw { value: IrExpr },
    Try { body: Box<IrStmt>, catches: Vec<IrCatch> },
    Nop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrCatch {
    /// Slot the caught value is bound to, always in the innermost frame.
    pub binding: LocalBinding,
    pub body: IrStmt,
}

/// A checked member body: statements plus the frame they run in.
#[derive(Debug, Clone, PartialEq)]
pub struct IrBody {
    pub frame: FrameSnapshot,
    pub block: IrStmt,
}

/// What a declaration node resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclTarget {
    Class(ClassId),
    Field(FieldRef),
    Method(MethodRef),
    Constructor(ConstructorRef),
}

/// Bidirectional map between declaration nodes and their symbols.
///
/// Forward lookups are a dense vector indexed by `NodeId`; the reverse
/// direction serves later phases that only hold a symbol handle and need
/// the declaring node back.
#[derive(Debug, Default)]
pub struct DeclMap {
    targets: Vec<Option<DeclTarget>>,
    nodes: FxHashMap<DeclTarget, NodeId>,
}

impl DeclMap {
    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            targets: vec![None; nodes],
            nodes: FxHashMap::default(),
        }
    }

    pub fn bind(&mut self, node: NodeId, target: DeclTarget) {
        if node.index() >= self.targets.len() {
            self.targets.resize(node.index() + 1, None);
        }
        self.targets[node.index()] = Some(target);
        self.nodes.insert(target, node);
    }

    pub fn target_of(&self, node: NodeId) -> Option<DeclTarget> {
        self.targets.get(node.index()).copied().flatten()
    }

    pub fn node_of(&self, target: DeclTarget) -> Option<NodeId> {
        self.nodes.get(&target).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_takes_the_last_type() {
        let e = IrExpr::Begin {
            exprs: vec![IrExpr::int(1), IrExpr::Long { value: 2 }],
        };
        assert_eq!(e.ty(), TypeRef::LONG);
        assert!(e.is_wide());
    }

    #[test]
    fn decl_map_is_bidirectional() {
        let mut map = DeclMap::with_capacity(2);
        let target = DeclTarget::Class(ClassId(7));
        map.bind(NodeId(1), target);
        assert_eq!(map.target_of(NodeId(1)), Some(target));
        assert_eq!(map.target_of(NodeId(0)), None);
        assert_eq!(map.node_of(target), Some(NodeId(1)));
        // binding past the initial capacity grows the table
        let late = DeclTarget::Class(ClassId(9));
        map.bind(NodeId(10), late);
        assert_eq!(map.target_of(NodeId(10)), Some(late));
    }
}
