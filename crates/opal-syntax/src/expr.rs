//! Expression AST nodes.

use crate::location::Location;
use crate::stmt::BlockStatement;
use crate::types::TypeSpec;

/// Expression (produces a value).
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Integer literal: 42
    Int(IntLiteral),
    /// Long literal: 42L
    Long(LongLiteral),
    /// Character literal: 'a'
    Char(CharLiteral),
    /// Float literal: 3.14f
    Float(FloatLiteral),
    /// Double literal: 3.14
    Double(DoubleLiteral),
    /// Boolean literal: true, false
    Boolean(BooleanLiteral),
    /// String literal: "hello"
    Str(StringLiteral),
    /// Null literal
    Null(Location),
    /// List literal: [1, 2, 3]
    List(ListLiteral),
    /// Bare identifier: a local, or a field of the current instance
    Id(Identifier),
    /// The current instance: `self`
    CurrentInstance(Location),
    /// Unary operation: -x, !b, ~n, +x
    Unary(UnaryExpression),
    /// Binary operation, including comparisons, logical and elvis
    Binary(BinaryExpression),
    /// Simple assignment: lhs = rhs
    Assign(Assignment),
    /// Compound assignment: lhs += rhs and friends
    CompoundAssign(CompoundAssignment),
    /// Member access: target.name
    MemberSelect(MemberSelect),
    /// Static field access: Type::name
    StaticFieldSelect(StaticFieldSelect),
    /// Instance method call: target.name(args)
    Call(MethodCall),
    /// Unqualified call: name(args), resolved against the current class
    UnqualifiedCall(UnqualifiedCall),
    /// Superclass method call: super.name(args)
    SuperCall(SuperCall),
    /// Static method call: Type::name(args)
    StaticCall(StaticCall),
    /// Index access: target[index]
    Indexing(Indexing),
    /// Object creation: new Type(args)
    New(NewObject),
    /// Array creation: new Type[n][m]
    NewArray(NewArray),
    /// Cast: expr : Type
    Cast(Cast),
    /// Instance test: expr is Type
    IsInstance(IsInstance),
    /// Post-increment: x++
    PostIncrement(PostUpdate),
    /// Post-decrement: x--
    PostDecrement(PostUpdate),
    /// Anonymous implementation of one interface method
    Closure(ClosureExpression),
}

impl Expression {
    /// Source position of this expression.
    pub fn location(&self) -> Location {
        match self {
            Expression::Int(e) => e.loc,
            Expression::Long(e) => e.loc,
            Expression::Char(e) => e.loc,
            Expression::Float(e) => e.loc,
            Expression::Double(e) => e.loc,
            Expression::Boolean(e) => e.loc,
            Expression::Str(e) => e.loc,
            Expression::Null(loc) => *loc,
            Expression::List(e) => e.loc,
            Expression::Id(e) => e.loc,
            Expression::CurrentInstance(loc) => *loc,
            Expression::Unary(e) => e.loc,
            Expression::Binary(e) => e.loc,
            Expression::Assign(e) => e.loc,
            Expression::CompoundAssign(e) => e.loc,
            Expression::MemberSelect(e) => e.loc,
            Expression::StaticFieldSelect(e) => e.loc,
            Expression::Call(e) => e.loc,
            Expression::UnqualifiedCall(e) => e.loc,
            Expression::SuperCall(e) => e.loc,
            Expression::StaticCall(e) => e.loc,
            Expression::Indexing(e) => e.loc,
            Expression::New(e) => e.loc,
            Expression::NewArray(e) => e.loc,
            Expression::Cast(e) => e.loc,
            Expression::IsInstance(e) => e.loc,
            Expression::PostIncrement(e) => e.loc,
            Expression::PostDecrement(e) => e.loc,
            Expression::Closure(e) => e.loc,
        }
    }

    pub fn int(value: i32, loc: Location) -> Self {
        Expression::Int(IntLiteral { value, loc })
    }

    pub fn string(value: impl Into<String>, loc: Location) -> Self {
        Expression::Str(StringLiteral {
            value: value.into(),
            loc,
        })
    }

    pub fn boolean(value: bool, loc: Location) -> Self {
        Expression::Boolean(BooleanLiteral { value, loc })
    }

    pub fn id(name: impl Into<String>, loc: Location) -> Self {
        Expression::Id(Identifier {
            name: name.into(),
            loc,
        })
    }

    pub fn binary(op: BinaryOp, lhs: Expression, rhs: Expression, loc: Location) -> Self {
        Expression::Binary(BinaryExpression {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            loc,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntLiteral {
    pub value: i32,
    pub loc: Location,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LongLiteral {
    pub value: i64,
    pub loc: Location,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharLiteral {
    pub value: char,
    pub loc: Location,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatLiteral {
    pub value: f32,
    pub loc: Location,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoubleLiteral {
    pub value: f64,
    pub loc: Location,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BooleanLiteral {
    pub value: bool,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    pub value: String,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListLiteral {
    pub elements: Vec<Expression>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub loc: Location,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// +x
    Plus,
    /// -x
    Minus,
    /// !b
    Not,
    /// ~n
    BitNot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    pub op: UnaryOp,
    pub operand: Box<Expression>,
    pub loc: Location,
}

/// Binary operators, including comparisons and short-circuit forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    Xor,
    /// <<
    Shl,
    /// >> (arithmetic)
    Shr,
    /// >>> (logical)
    UShr,
    Lt,
    Gt,
    Le,
    Ge,
    /// == (structural on references)
    Eq,
    /// !=
    Ne,
    /// === (reference identity)
    RefEq,
    /// !==
    RefNe,
    /// && (short-circuit)
    And,
    /// || (short-circuit)
    Or,
    /// ?: null-coalescing
    Elvis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub op: BinaryOp,
    pub lhs: Box<Expression>,
    pub rhs: Box<Expression>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub lhs: Box<Expression>,
    pub rhs: Box<Expression>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompoundAssignment {
    pub op: BinaryOp,
    pub lhs: Box<Expression>,
    pub rhs: Box<Expression>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberSelect {
    pub target: Box<Expression>,
    pub name: String,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticFieldSelect {
    pub type_spec: TypeSpec,
    pub name: String,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub target: Box<Expression>,
    pub name: String,
    pub args: Vec<Expression>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnqualifiedCall {
    pub name: String,
    pub args: Vec<Expression>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuperCall {
    pub name: String,
    pub args: Vec<Expression>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticCall {
    pub type_spec: TypeSpec,
    pub name: String,
    pub args: Vec<Expression>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Indexing {
    pub target: Box<Expression>,
    pub index: Box<Expression>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewObject {
    pub type_spec: TypeSpec,
    pub args: Vec<Expression>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewArray {
    /// Component type; the created array has `sizes.len()` dimensions on top.
    pub type_spec: TypeSpec,
    pub sizes: Vec<Expression>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cast {
    pub target: Box<Expression>,
    pub type_spec: TypeSpec,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IsInstance {
    pub target: Box<Expression>,
    pub type_spec: TypeSpec,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostUpdate {
    pub target: Box<Expression>,
    pub loc: Location,
}

/// `#Interface.method(params) { body }`: an anonymous object implementing
/// one method of an interface, capturing enclosing locals.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureExpression {
    pub interface: TypeSpec,
    pub method_name: String,
    pub params: Vec<Parameter>,
    pub body: BlockStatement,
    pub loc: Location,
}

/// A formal parameter of a method, constructor, function or closure.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub type_spec: TypeSpec,
    pub loc: Location,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_spec: TypeSpec, loc: Location) -> Self {
        Self {
            name: name.into(),
            type_spec,
            loc,
        }
    }
}
