//! Declarations and compilation units.

use crate::expr::{Expression, Parameter};
use crate::location::Location;
use crate::modifier::Modifiers;
use crate::node::NodeId;
use crate::stmt::{BlockStatement, Statement};
use crate::types::TypeSpec;

/// One parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    /// Path of the source file, used in diagnostics and for naming the
    /// synthetic main class.
    pub source_file: String,
    /// `module a.b;` header, if any.
    pub module_name: Option<String>,
    pub imports: Vec<ImportDecl>,
    pub toplevels: Vec<TopLevel>,
}

impl CompilationUnit {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            module_name: None,
            imports: Vec::new(),
            toplevels: Vec::new(),
        }
    }
}

/// A single import item. `simple_name` of `"*"` imports a whole namespace
/// (`fqcn` then ends in `.*`).
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub simple_name: String,
    pub fqcn: String,
    pub loc: Location,
}

impl ImportDecl {
    pub fn single(simple_name: impl Into<String>, fqcn: impl Into<String>, loc: Location) -> Self {
        Self {
            simple_name: simple_name.into(),
            fqcn: fqcn.into(),
            loc,
        }
    }

    pub fn on_demand(namespace: &str, loc: Location) -> Self {
        Self {
            simple_name: "*".to_string(),
            fqcn: format!("{namespace}.*"),
            loc,
        }
    }
}

/// A top-level item of a compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub enum TopLevel {
    Class(ClassDecl),
    Interface(InterfaceDecl),
    /// `def name(params): type { body }` outside any class.
    Function(FunctionDecl),
    /// `var name: type;` outside any class.
    GlobalVar(GlobalVarDecl),
    /// A bare statement; collected into the synthetic main class.
    Statement(Statement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub node_id: NodeId,
    pub modifiers: Modifiers,
    pub name: String,
    pub super_class: Option<TypeSpec>,
    pub interfaces: Vec<TypeSpec>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub constructors: Vec<ConstructorDecl>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub node_id: NodeId,
    pub modifiers: Modifiers,
    pub name: String,
    /// Super-interfaces.
    pub interfaces: Vec<TypeSpec>,
    pub methods: Vec<InterfaceMethodDecl>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub node_id: NodeId,
    pub modifiers: Modifiers,
    pub name: String,
    pub type_spec: TypeSpec,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub node_id: NodeId,
    pub modifiers: Modifiers,
    pub name: String,
    pub params: Vec<Parameter>,
    /// Missing return type means `void`.
    pub return_type: Option<TypeSpec>,
    /// Absent for abstract methods.
    pub body: Option<BlockStatement>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    pub node_id: NodeId,
    pub modifiers: Modifiers,
    pub params: Vec<Parameter>,
    /// Arguments forwarded to the superclass constructor.
    pub super_args: Vec<Expression>,
    pub body: BlockStatement,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceMethodDecl {
    pub node_id: NodeId,
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_type: Option<TypeSpec>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub node_id: NodeId,
    pub modifiers: Modifiers,
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_type: Option<TypeSpec>,
    pub body: BlockStatement,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVarDecl {
    pub node_id: NodeId,
    pub modifiers: Modifiers,
    pub name: String,
    pub type_spec: TypeSpec,
    pub loc: Location,
}
