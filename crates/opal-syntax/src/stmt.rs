//! Statement AST nodes.

use crate::expr::Expression;
use crate::location::Location;
use crate::types::TypeSpec;

/// Statement (executed for effect).
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Block(BlockStatement),
    /// An expression evaluated for its side effect
    Expression(ExpressionStatement),
    /// Two-armed conditional
    If(IfStatement),
    /// Multi-armed conditional: cond { c1: b1; c2: b2; else: b }
    Cond(CondStatement),
    While(WhileStatement),
    For(ForStatement),
    /// foreach v in collection { body }
    Foreach(ForeachStatement),
    /// select scrutinee { case v1, v2: b1; else: b }
    Select(SelectStatement),
    Return(ReturnStatement),
    Throw(ThrowStatement),
    Try(TryStatement),
    LocalVar(LocalVarStatement),
    Break(Location),
    Continue(Location),
    Synchronized(SynchronizedStatement),
    Empty(Location),
}

impl Statement {
    pub fn location(&self) -> Location {
        match self {
            Statement::Block(s) => s.loc,
            Statement::Expression(s) => s.loc,
            Statement::If(s) => s.loc,
            Statement::Cond(s) => s.loc,
            Statement::While(s) => s.loc,
            Statement::For(s) => s.loc,
            Statement::Foreach(s) => s.loc,
            Statement::Select(s) => s.loc,
            Statement::Return(s) => s.loc,
            Statement::Throw(s) => s.loc,
            Statement::Try(s) => s.loc,
            Statement::LocalVar(s) => s.loc,
            Statement::Break(loc) => *loc,
            Statement::Continue(loc) => *loc,
            Statement::Synchronized(s) => s.loc,
            Statement::Empty(loc) => *loc,
        }
    }

    pub fn expression(expr: Expression) -> Self {
        let loc = expr.location();
        Statement::Expression(ExpressionStatement { expr, loc })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub statements: Vec<Statement>,
    pub loc: Location,
}

impl BlockStatement {
    pub fn new(statements: Vec<Statement>, loc: Location) -> Self {
        Self { statements, loc }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub expr: Expression,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_block: BlockStatement,
    pub else_block: Option<BlockStatement>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CondStatement {
    /// Condition/body pairs, tested in order.
    pub clauses: Vec<(Expression, BlockStatement)>,
    pub else_block: Option<BlockStatement>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: BlockStatement,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    /// Initializer, usually a local declaration or expression statement.
    pub init: Option<Box<Statement>>,
    /// Missing condition means an infinite loop.
    pub condition: Option<Expression>,
    pub update: Option<Expression>,
    pub body: BlockStatement,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeachStatement {
    pub var_name: String,
    pub var_type: TypeSpec,
    pub collection: Expression,
    pub body: BlockStatement,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub scrutinee: Expression,
    /// Each case lists one or more candidate values.
    pub cases: Vec<(Vec<Expression>, BlockStatement)>,
    pub else_block: Option<BlockStatement>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub value: Option<Expression>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThrowStatement {
    pub value: Expression,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    pub body: BlockStatement,
    pub catches: Vec<CatchClause>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub var_name: String,
    pub var_type: TypeSpec,
    pub body: BlockStatement,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVarStatement {
    pub name: String,
    pub type_spec: TypeSpec,
    pub init: Option<Expression>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynchronizedStatement {
    pub target: Expression,
    pub body: BlockStatement,
    pub loc: Location,
}
