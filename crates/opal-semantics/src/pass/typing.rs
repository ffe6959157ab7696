//! Pass 4: type checking and IR building.
//!
//! Every member body is checked in its own [`LocalContext`]; the result is
//! typed IR stored back on the member symbol. Loop and select sugar is
//! lowered here so the code generator only sees `If`, `Loop`, `Try` and
//! straight-line statements.

use opal_syntax::{
    Assignment, BinaryExpression, BinaryOp, BlockStatement, ClassDecl, ClosureExpression,
    CompilationUnit, CompoundAssignment, ConstructorDecl, Expression, ForeachStatement, Location,
    MethodDecl, PostUpdate, Statement, TopLevel, TypeSpec, UnaryOp,
};

use crate::error::SemanticErrorKind;
use crate::frame::{CapturedBinding, LocalBinding, LocalContext};
use crate::ir::{DeclTarget, IrBinOp, IrBody, IrCatch, IrClosure, IrExpr, IrStmt, IrUnaryOp};
use crate::pass::AnalysisContext;
use crate::resolver::NameResolver;
use crate::symbols::{default_value, ConstructorRef, Lookup, MethodRef};
use crate::types::{promote, BasicType, ClassId, TypeRef};

pub(crate) fn run(ctx: &mut AnalysisContext, units: &[CompilationUnit]) {
    for (unit_index, unit) in units.iter().enumerate() {
        ctx.reporter.set_source_file(&unit.source_file);
        let resolver = ctx.units[unit_index].resolver.clone();
        let mut statements: Vec<&Statement> = Vec::new();

        for toplevel in &unit.toplevels {
            match toplevel {
                TopLevel::Class(decl) => check_class(ctx, &resolver, decl),
                TopLevel::Function(decl) => {
                    if let (Some(main), Some(DeclTarget::Method(r))) = (
                        ctx.units[unit_index].main_class,
                        ctx.decl_map.target_of(decl.node_id),
                    ) {
                        check_function_body(ctx, &resolver, main, r, decl);
                    }
                }
                TopLevel::Statement(stmt) => statements.push(stmt),
                _ => {}
            }
        }

        if !statements.is_empty() {
            if let Some(main) = ctx.units[unit_index].main_class {
                check_entry_points(ctx, &resolver, main, &statements);
            }
        }
    }

    finish_default_constructors(ctx);
}

fn check_class(ctx: &mut AnalysisContext, resolver: &NameResolver, decl: &ClassDecl) {
    let Some(DeclTarget::Class(id)) = ctx.decl_map.target_of(decl.node_id) else {
        return;
    };
    for method in &decl.methods {
        if let Some(DeclTarget::Method(r)) = ctx.decl_map.target_of(method.node_id) {
            check_method_body(ctx, resolver, id, r, method);
        }
    }
    for ctor in &decl.constructors {
        if let Some(DeclTarget::Constructor(r)) = ctx.decl_map.target_of(ctor.node_id) {
            check_constructor_body(ctx, resolver, id, r, ctor);
        }
    }
}

fn check_method_body(
    ctx: &mut AnalysisContext,
    resolver: &NameResolver,
    class: ClassId,
    r: MethodRef,
    decl: &MethodDecl,
) {
    let Some(body) = &decl.body else {
        return;
    };
    let sym = ctx.table.method(r);
    let params = sym.params.clone();
    let return_type = sym.return_type;
    let is_static = sym.modifiers.is_static();

    let mut checker = BodyChecker::new(ctx, resolver.clone(), class, is_static, return_type);
    for (param, &ty) in decl.params.iter().zip(&params) {
        checker.local.add(&param.name, ty);
    }
    let mut block = checker.check_block(body);
    add_return_node(&mut block, return_type);
    let frame = checker.local.finish();
    ctx.table.method_mut(r).body = Some(IrBody { frame, block });
}

fn check_function_body(
    ctx: &mut AnalysisContext,
    resolver: &NameResolver,
    main: ClassId,
    r: MethodRef,
    decl: &opal_syntax::FunctionDecl,
) {
    let sym = ctx.table.method(r);
    let params = sym.params.clone();
    let return_type = sym.return_type;

    let mut checker = BodyChecker::new(ctx, resolver.clone(), main, false, return_type);
    for (param, &ty) in decl.params.iter().zip(&params) {
        checker.local.add(&param.name, ty);
    }
    let mut block = checker.check_block(&decl.body);
    add_return_node(&mut block, return_type);
    let frame = checker.local.finish();
    ctx.table.method_mut(r).body = Some(IrBody { frame, block });
}

fn check_constructor_body(
    ctx: &mut AnalysisContext,
    resolver: &NameResolver,
    class: ClassId,
    r: ConstructorRef,
    decl: &ConstructorDecl,
) {
    let params = ctx.table.constructor(r).params.clone();
    let mut checker = BodyChecker::new(ctx, resolver.clone(), class, false, TypeRef::VOID);
    for (param, &ty) in decl.params.iter().zip(&params) {
        checker.local.add(&param.name, ty);
    }

    let super_args: Option<Vec<IrExpr>> = decl
        .super_args
        .iter()
        .map(|a| checker.check_expr(a))
        .collect();
    let super_call = super_args.and_then(|args| {
        let super_class = checker.ctx.table.class(class).super_class?;
        checker.resolve_constructor(super_class, args, decl.loc)
    });

    let mut block = checker.check_block(&decl.body);
    add_return_node(&mut block, TypeRef::VOID);
    let frame = checker.local.finish();
    let ctor = ctx.table.constructor_mut(r);
    ctor.super_call = super_call;
    ctor.body = Some(IrBody { frame, block });
}

/// Top-level statements become the main class's instance `run` method, and
/// a static `main` that instantiates the class and calls it.
fn check_entry_points(
    ctx: &mut AnalysisContext,
    resolver: &NameResolver,
    main: ClassId,
    statements: &[&Statement],
) {
    let args_ty = ctx.string_array();
    let Some(run_index) = ctx.table.class(main).methods.iter().position(|m| m.name == "run")
    else {
        return;
    };
    let run_ref = MethodRef {
        class: main,
        index: run_index,
    };

    let mut checker = BodyChecker::new(ctx, resolver.clone(), main, false, TypeRef::VOID);
    checker.local.add("args", args_ty);
    let mut body: Vec<IrStmt> = statements.iter().map(|s| checker.check_stmt(s)).collect();
    body.push(IrStmt::Return { value: None });
    let frame = checker.local.finish();
    ctx.table.method_mut(run_ref).body = Some(IrBody {
        frame,
        block: IrStmt::Block(body),
    });

    let Some(main_index) = ctx
        .table
        .class(main)
        .methods
        .iter()
        .position(|m| m.name == "main" && m.modifiers.is_static())
    else {
        return;
    };
    let Lookup::Found(ctor) = ctx.table.find_constructor(main, &[]) else {
        return;
    };
    let args_binding = CapturedBinding {
        frame: 0,
        index: 0,
        ty: args_ty,
    };
    let call = IrExpr::Call {
        target: Box::new(IrExpr::New {
            ctor,
            args: vec![],
            ty: TypeRef::Class(main),
        }),
        method: run_ref,
        args: vec![IrExpr::RefLocal {
            binding: args_binding,
        }],
        ty: TypeRef::VOID,
    };
    ctx.table
        .method_mut(MethodRef {
            class: main,
            index: main_index,
        })
        .body = Some(IrBody {
        frame: crate::frame::FrameSnapshot {
            entries: vec![args_ty],
            closed: false,
            depth: 0,
        },
        block: IrStmt::Block(vec![IrStmt::Expression(call), IrStmt::Return { value: None }]),
    });
}

/// Synthesized default constructors get a trivial body calling the
/// no-argument superclass constructor.
fn finish_default_constructors(ctx: &mut AnalysisContext) {
    for class in ctx.source_classes.clone() {
        let symbol = ctx.table.class(class);
        if symbol.is_interface() {
            continue;
        }
        let super_class = symbol.super_class;
        for index in 0..symbol.constructors.len() {
            let r = ConstructorRef { class, index };
            if ctx.table.constructor(r).body.is_some() {
                continue;
            }
            let super_call = super_class.and_then(|s| match ctx.table.find_constructor(s, &[]) {
                Lookup::Found(c) => Some((c, vec![])),
                _ => {
                    let name = ctx.table.class(s).name.clone();
                    let loc = ctx
                        .class_locations
                        .get(&class)
                        .copied()
                        .unwrap_or_else(Location::generated);
                    ctx.report(SemanticErrorKind::ConstructorNotFound { class: name }, loc);
                    None
                }
            });
            let params = ctx.table.constructor(r).params.clone();
            let ctor = ctx.table.constructor_mut(r);
            ctor.super_call = super_call;
            ctor.body = Some(IrBody {
                frame: crate::frame::FrameSnapshot {
                    entries: params,
                    closed: false,
                    depth: 0,
                },
                block: IrStmt::Block(vec![IrStmt::Return { value: None }]),
            });
        }
    }
}

fn add_return_node(block: &mut IrStmt, return_type: TypeRef) {
    if let IrStmt::Block(stmts) = block {
        stmts.push(IrStmt::Return {
            value: default_value(return_type),
        });
    }
}

struct BodyChecker<'a> {
    ctx: &'a mut AnalysisContext,
    resolver: NameResolver,
    class: ClassId,
    local: LocalContext,
    return_type: TypeRef,
}

impl<'a> BodyChecker<'a> {
    fn new(
        ctx: &'a mut AnalysisContext,
        resolver: NameResolver,
        class: ClassId,
        is_static: bool,
        return_type: TypeRef,
    ) -> Self {
        Self {
            ctx,
            resolver,
            class,
            local: LocalContext::new(is_static),
            return_type,
        }
    }

    fn report(&mut self, kind: SemanticErrorKind, loc: Location) {
        self.ctx.report(kind, loc);
    }

    fn type_name(&self, ty: TypeRef) -> String {
        self.ctx.table.type_name(ty)
    }

    fn resolve_spec(&mut self, spec: &TypeSpec, loc: Location) -> Option<TypeRef> {
        match self.resolver.resolve(spec, &mut self.ctx.table) {
            Some(ty) => Some(ty),
            None => {
                self.report(
                    SemanticErrorKind::ClassNotFound {
                        name: spec.to_string(),
                    },
                    loc,
                );
                None
            }
        }
    }

    /// The class whose members serve an expression of type `ty`. Arrays
    /// and `null` fall back to the root class.
    fn member_class(&self, ty: TypeRef) -> Option<ClassId> {
        match ty {
            TypeRef::Class(id) => Some(id),
            TypeRef::Array(_) | TypeRef::Null => Some(self.ctx.platform.object),
            TypeRef::Basic(_) => None,
        }
    }

    fn coerce(value: IrExpr, to: TypeRef) -> IrExpr {
        if value.ty() == to {
            value
        } else {
            IrExpr::Cast {
                value: Box::new(value),
                to,
            }
        }
    }

    fn expect_assignable(&mut self, value: IrExpr, to: TypeRef, loc: Location) -> Option<IrExpr> {
        if self.ctx.table.is_assignable(to, value.ty()) {
            Some(Self::coerce(value, to))
        } else {
            self.report(
                SemanticErrorKind::IncompatibleType {
                    expected: self.type_name(to),
                    found: self.type_name(value.ty()),
                },
                loc,
            );
            None
        }
    }

    fn expect_boolean(&mut self, value: IrExpr, loc: Location) -> Option<IrExpr> {
        if value.ty().is_boolean() {
            Some(value)
        } else {
            self.report(
                SemanticErrorKind::IncompatibleType {
                    expected: "boolean".into(),
                    found: self.type_name(value.ty()),
                },
                loc,
            );
            None
        }
    }

    // ----- expressions ----------------------------------------------------

    fn check_expr(&mut self, expr: &Expression) -> Option<IrExpr> {
        match expr {
            Expression::Int(e) => Some(IrExpr::Int { value: e.value }),
            Expression::Long(e) => Some(IrExpr::Long { value: e.value }),
            Expression::Char(e) => Some(IrExpr::Char { value: e.value }),
            Expression::Float(e) => Some(IrExpr::Float { value: e.value }),
            Expression::Double(e) => Some(IrExpr::Double { value: e.value }),
            Expression::Boolean(e) => Some(IrExpr::Bool { value: e.value }),
            Expression::Str(e) => Some(IrExpr::Str {
                value: e.value.clone(),
                ty: TypeRef::Class(self.ctx.platform.string),
            }),
            Expression::Null(_) => Some(IrExpr::Null),
            Expression::List(e) => {
                // list cells hold references, so basic elements are boxed
                let elements: Option<Vec<IrExpr>> = e
                    .elements
                    .iter()
                    .map(|el| {
                        let el_loc = el.location();
                        let v = self.check_expr(el)?;
                        self.boxed_value(v, el_loc)
                    })
                    .collect();
                Some(IrExpr::List {
                    elements: elements?,
                    ty: TypeRef::Class(self.ctx.platform.list),
                })
            }
            Expression::Id(e) => self.check_id(&e.name, e.loc),
            Expression::CurrentInstance(_) => Some(IrExpr::This {
                ty: TypeRef::Class(self.class),
            }),
            Expression::Unary(e) => self.check_unary(e.op, &e.operand, e.loc),
            Expression::Binary(e) => self.check_binary(e),
            Expression::Assign(e) => self.check_assign(e),
            Expression::CompoundAssign(e) => self.check_compound_assign(e),
            Expression::MemberSelect(e) => self.check_member_select(&e.target, &e.name, e.loc),
            Expression::StaticFieldSelect(e) => {
                self.check_static_field(&e.type_spec, &e.name, e.loc, None)
            }
            Expression::Call(e) => self.check_call(&e.target, &e.name, &e.args, e.loc),
            Expression::UnqualifiedCall(e) => self.check_unqualified_call(&e.name, &e.args, e.loc),
            Expression::SuperCall(e) => self.check_super_call(&e.name, &e.args, e.loc),
            Expression::StaticCall(e) => {
                self.check_static_call(&e.type_spec, &e.name, &e.args, e.loc)
            }
            Expression::Indexing(e) => self.check_indexing(&e.target, &e.index, e.loc),
            Expression::New(e) => self.check_new(&e.type_spec, &e.args, e.loc),
            Expression::NewArray(e) => self.check_new_array(&e.type_spec, &e.sizes, e.loc),
            Expression::Cast(e) => {
                let value = self.check_expr(&e.target)?;
                let to = self.resolve_spec(&e.type_spec, e.loc)?;
                Some(Self::coerce(value, to))
            }
            Expression::IsInstance(e) => {
                let value = self.check_expr(&e.target)?;
                let of = self.resolve_spec(&e.type_spec, e.loc)?;
                if !value.ty().is_reference() || !of.is_reference() {
                    self.report(
                        SemanticErrorKind::IncompatibleOperandType {
                            op: "is".into(),
                            lhs: self.type_name(value.ty()),
                            rhs: self.type_name(of),
                        },
                        e.loc,
                    );
                    return None;
                }
                Some(IrExpr::IsInstance {
                    value: Box::new(value),
                    of,
                })
            }
            Expression::PostIncrement(e) => self.check_post_update(e, IrBinOp::Add, "++"),
            Expression::PostDecrement(e) => self.check_post_update(e, IrBinOp::Sub, "--"),
            Expression::Closure(e) => self.check_closure(e),
        }
    }

    fn check_id(&mut self, name: &str, loc: Location) -> Option<IrExpr> {
        if let Some(binding) = self.local.lookup(name) {
            return Some(IrExpr::RefLocal { binding });
        }
        if !self.local.is_static {
            if let Some(field) = self.ctx.table.find_field(self.class, name) {
                let sym = self.ctx.table.field(field);
                let (modifiers, ty) = (sym.modifiers, sym.ty);
                if !self
                    .ctx
                    .table
                    .is_member_accessible(modifiers, field.class, self.class)
                {
                    self.report(
                        SemanticErrorKind::FieldNotAccessible {
                            class: self.ctx.table.class(field.class).name.clone(),
                            name: name.to_string(),
                        },
                        loc,
                    );
                    return None;
                }
                return Some(IrExpr::RefField {
                    target: Box::new(IrExpr::This {
                        ty: TypeRef::Class(self.class),
                    }),
                    field,
                    ty,
                });
            }
        }
        self.report(
            SemanticErrorKind::VariableNotFound {
                name: name.to_string(),
            },
            loc,
        );
        None
    }

    fn check_unary(&mut self, op: UnaryOp, operand: &Expression, loc: Location) -> Option<IrExpr> {
        let value = self.check_expr(operand)?;
        let ty = value.ty();
        match op {
            UnaryOp::Plus => {
                if ty.is_numeric() {
                    Some(value)
                } else {
                    self.operand_error("+", ty, ty, loc)
                }
            }
            UnaryOp::Minus => {
                let Some(basic) = ty.as_basic().filter(|b| b.is_numeric()) else {
                    return self.operand_error("-", ty, ty, loc);
                };
                let promoted = TypeRef::Basic(unary_promote(basic));
                Some(IrExpr::Unary {
                    op: IrUnaryOp::Neg,
                    ty: promoted,
                    operand: Box::new(Self::coerce(value, promoted)),
                })
            }
            UnaryOp::Not => {
                if !ty.is_boolean() {
                    return self.operand_error("!", ty, ty, loc);
                }
                Some(IrExpr::Unary {
                    op: IrUnaryOp::Not,
                    ty: TypeRef::BOOLEAN,
                    operand: Box::new(value),
                })
            }
            UnaryOp::BitNot => {
                let Some(basic) = ty.as_basic().filter(|b| b.is_integer()) else {
                    return self.operand_error("~", ty, ty, loc);
                };
                let promoted = TypeRef::Basic(unary_promote(basic));
                Some(IrExpr::Unary {
                    op: IrUnaryOp::BitNot,
                    ty: promoted,
                    operand: Box::new(Self::coerce(value, promoted)),
                })
            }
        }
    }

    fn operand_error(&mut self, op: &str, lhs: TypeRef, rhs: TypeRef, loc: Location) -> Option<IrExpr> {
        self.report(
            SemanticErrorKind::IncompatibleOperandType {
                op: op.to_string(),
                lhs: self.type_name(lhs),
                rhs: self.type_name(rhs),
            },
            loc,
        );
        None
    }

    fn check_binary(&mut self, e: &BinaryExpression) -> Option<IrExpr> {
        use BinaryOp::*;
        match e.op {
            Add => self.check_add(e),
            Sub | Mul | Div | Mod => self.check_arith(e),
            Shl | Shr | UShr => self.check_shift(e),
            BitAnd | BitOr | Xor => self.check_bit_op(e),
            Lt | Gt | Le | Ge => self.check_relational(e),
            Eq | Ne => self.check_equality(e, false),
            RefEq | RefNe => self.check_equality(e, true),
            And | Or => self.check_logical(e),
            Elvis => self.check_elvis(e),
        }
    }

    /// `+` on two basic operands is arithmetic; anything else becomes
    /// string concatenation through `toString`.
    fn check_add(&mut self, e: &BinaryExpression) -> Option<IrExpr> {
        let lhs = self.check_expr(&e.lhs)?;
        let rhs = self.check_expr(&e.rhs)?;
        if lhs.ty().is_basic() && rhs.ty().is_basic() {
            return self.arith_result(IrBinOp::Add, "+", lhs, rhs, e.loc);
        }
        let left = self.string_value(lhs, e.loc)?;
        let right = self.string_value(rhs, e.loc)?;
        let string = self.ctx.platform.string;
        let (concat, args) = self.resolve_method(string, "concat", vec![right], e.loc)?;
        let ret = self.ctx.table.method(concat).return_type;
        Some(IrExpr::Call {
            target: Box::new(left),
            method: concat,
            args,
            ty: ret,
        })
    }

    /// Box a basic value into its platform wrapper class; references pass
    /// through.
    fn boxed_value(&mut self, value: IrExpr, loc: Location) -> Option<IrExpr> {
        let TypeRef::Basic(basic) = value.ty() else {
            return Some(value);
        };
        let Some(class) = self.ctx.platform.boxed_class(basic) else {
            self.report(
                SemanticErrorKind::IsNotBoxableType {
                    found: basic.name().to_string(),
                },
                loc,
            );
            return None;
        };
        let ctor = self.resolve_constructor(class, vec![value], loc)?;
        Some(IrExpr::New {
            ctor: ctor.0,
            args: ctor.1,
            ty: TypeRef::Class(class),
        })
    }

    /// A value of any type as a string: basic values are boxed first, then
    /// `toString` is called.
    fn string_value(&mut self, value: IrExpr, loc: Location) -> Option<IrExpr> {
        let boxed = self.boxed_value(value, loc)?;
        let class = self.member_class(boxed.ty())?;
        let (to_string, args) = self.resolve_method(class, "toString", vec![], loc)?;
        let ret = self.ctx.table.method(to_string).return_type;
        Some(IrExpr::Call {
            target: Box::new(boxed),
            method: to_string,
            args,
            ty: ret,
        })
    }

    fn check_arith(&mut self, e: &BinaryExpression) -> Option<IrExpr> {
        let lhs = self.check_expr(&e.lhs)?;
        let rhs = self.check_expr(&e.rhs)?;
        let (op, name) = match e.op {
            BinaryOp::Sub => (IrBinOp::Sub, "-"),
            BinaryOp::Mul => (IrBinOp::Mul, "*"),
            BinaryOp::Div => (IrBinOp::Div, "/"),
            _ => (IrBinOp::Rem, "%"),
        };
        self.arith_result(op, name, lhs, rhs, e.loc)
    }

    fn arith_result(
        &mut self,
        op: IrBinOp,
        name: &str,
        lhs: IrExpr,
        rhs: IrExpr,
        loc: Location,
    ) -> Option<IrExpr> {
        let (lt, rt) = (lhs.ty(), rhs.ty());
        let promoted = match (lt.as_basic(), rt.as_basic()) {
            (Some(a), Some(b)) => promote(a, b),
            _ => None,
        };
        let Some(promoted) = promoted else {
            return self.operand_error(name, lt, rt, loc);
        };
        let ty = TypeRef::Basic(promoted);
        Some(IrExpr::Binary {
            op,
            ty,
            lhs: Box::new(Self::coerce(lhs, ty)),
            rhs: Box::new(Self::coerce(rhs, ty)),
        })
    }

    /// Shifts on a reference left operand are sugar for its `add` method;
    /// otherwise both operands must be integers, the left is promoted and
    /// the right coerced to `int`.
    fn check_shift(&mut self, e: &BinaryExpression) -> Option<IrExpr> {
        let lhs = self.check_expr(&e.lhs)?;
        let rhs = self.check_expr(&e.rhs)?;
        if !lhs.ty().is_basic() {
            let class = self.member_class(lhs.ty())?;
            let (method, args) = self.resolve_method(class, "add", vec![rhs], e.loc)?;
            let ret = self.ctx.table.method(method).return_type;
            return Some(IrExpr::Call {
                target: Box::new(lhs),
                method,
                args,
                ty: ret,
            });
        }
        let op = match e.op {
            BinaryOp::Shl => IrBinOp::Shl,
            BinaryOp::Shr => IrBinOp::Shr,
            _ => IrBinOp::UShr,
        };
        let name = match op {
            IrBinOp::Shl => "<<",
            IrBinOp::Shr => ">>",
            _ => ">>>",
        };
        let (lt, rt) = (lhs.ty(), rhs.ty());
        let (Some(lb), Some(rb)) = (lt.as_basic(), rt.as_basic()) else {
            return self.operand_error(name, lt, rt, e.loc);
        };
        if !lb.is_integer() || !rb.is_integer() {
            return self.operand_error(name, lt, rt, e.loc);
        }
        let ty = TypeRef::Basic(unary_promote(lb));
        Some(IrExpr::Binary {
            op,
            ty,
            lhs: Box::new(Self::coerce(lhs, ty)),
            rhs: Box::new(Self::coerce(rhs, TypeRef::INT)),
        })
    }

    /// `&`, `|` and `^` accept two integers (promoted) or two booleans.
    fn check_bit_op(&mut self, e: &BinaryExpression) -> Option<IrExpr> {
        let lhs = self.check_expr(&e.lhs)?;
        let rhs = self.check_expr(&e.rhs)?;
        let (op, name) = match e.op {
            BinaryOp::BitAnd => (IrBinOp::BitAnd, "&"),
            BinaryOp::BitOr => (IrBinOp::BitOr, "|"),
            _ => (IrBinOp::BitXor, "^"),
        };
        let (lt, rt) = (lhs.ty(), rhs.ty());
        if lt.is_boolean() && rt.is_boolean() {
            return Some(IrExpr::Binary {
                op,
                ty: TypeRef::BOOLEAN,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        }
        if lt.is_integer() && rt.is_integer() {
            return self.arith_result(op, name, lhs, rhs, e.loc);
        }
        self.operand_error(name, lt, rt, e.loc)
    }

    fn check_relational(&mut self, e: &BinaryExpression) -> Option<IrExpr> {
        let lhs = self.check_expr(&e.lhs)?;
        let rhs = self.check_expr(&e.rhs)?;
        let (op, name) = match e.op {
            BinaryOp::Lt => (IrBinOp::Lt, "<"),
            BinaryOp::Gt => (IrBinOp::Gt, ">"),
            BinaryOp::Le => (IrBinOp::Le, "<="),
            _ => (IrBinOp::Ge, ">="),
        };
        let (lt, rt) = (lhs.ty(), rhs.ty());
        let promoted = match (lt.as_basic(), rt.as_basic()) {
            (Some(a), Some(b)) => promote(a, b),
            _ => None,
        };
        let Some(promoted) = promoted else {
            return self.operand_error(name, lt, rt, e.loc);
        };
        let operand_ty = TypeRef::Basic(promoted);
        Some(IrExpr::Binary {
            op,
            ty: TypeRef::BOOLEAN,
            lhs: Box::new(Self::coerce(lhs, operand_ty)),
            rhs: Box::new(Self::coerce(rhs, operand_ty)),
        })
    }

    /// `==`/`!=` on references is structural (`equals`); `===`/`!==`
    /// compares raw references. Mixing a basic and a reference operand is
    /// an error either way.
    fn check_equality(&mut self, e: &BinaryExpression, identity: bool) -> Option<IrExpr> {
        let lhs = self.check_expr(&e.lhs)?;
        let rhs = self.check_expr(&e.rhs)?;
        let negated = matches!(e.op, BinaryOp::Ne | BinaryOp::RefNe);
        let name = match e.op {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::RefEq => "===",
            _ => "!==",
        };
        let (lt, rt) = (lhs.ty(), rhs.ty());

        if lt.is_reference() && rt.is_reference() {
            let result = if identity {
                IrExpr::Binary {
                    op: if negated { IrBinOp::Ne } else { IrBinOp::Eq },
                    ty: TypeRef::BOOLEAN,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                }
            } else {
                let equals = self.create_equals(lhs, rhs, e.loc)?;
                if negated {
                    IrExpr::Unary {
                        op: IrUnaryOp::Not,
                        ty: TypeRef::BOOLEAN,
                        operand: Box::new(equals),
                    }
                } else {
                    equals
                }
            };
            return Some(result);
        }
        if lt.is_reference() != rt.is_reference() {
            return self.operand_error(name, lt, rt, e.loc);
        }

        let op = if negated { IrBinOp::Ne } else { IrBinOp::Eq };
        if lt.is_boolean() && rt.is_boolean() {
            return Some(IrExpr::Binary {
                op,
                ty: TypeRef::BOOLEAN,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        }
        let promoted = match (lt.as_basic(), rt.as_basic()) {
            (Some(a), Some(b)) => promote(a, b),
            _ => None,
        };
        let Some(promoted) = promoted else {
            return self.operand_error(name, lt, rt, e.loc);
        };
        let operand_ty = TypeRef::Basic(promoted);
        Some(IrExpr::Binary {
            op,
            ty: TypeRef::BOOLEAN,
            lhs: Box::new(Self::coerce(lhs, operand_ty)),
            rhs: Box::new(Self::coerce(rhs, operand_ty)),
        })
    }

    /// `lhs.equals(rhs)` with the argument widened to the root class.
    fn create_equals(&mut self, lhs: IrExpr, rhs: IrExpr, loc: Location) -> Option<IrExpr> {
        let object = TypeRef::Class(self.ctx.platform.object);
        let rhs = self.expect_assignable(rhs, object, loc)?;
        let class = self.member_class(lhs.ty())?;
        let (equals, args) = self.resolve_method(class, "equals", vec![rhs], loc)?;
        let ret = self.ctx.table.method(equals).return_type;
        Some(IrExpr::Call {
            target: Box::new(lhs),
            method: equals,
            args,
            ty: ret,
        })
    }

    fn check_logical(&mut self, e: &BinaryExpression) -> Option<IrExpr> {
        let lhs = self.check_expr(&e.lhs)?;
        let rhs = self.check_expr(&e.rhs)?;
        let name = if e.op == BinaryOp::And { "&&" } else { "||" };
        if !lhs.ty().is_boolean() || !rhs.ty().is_boolean() {
            return self.operand_error(name, lhs.ty(), rhs.ty(), e.loc);
        }
        Some(IrExpr::Binary {
            op: if e.op == BinaryOp::And {
                IrBinOp::LogicalAnd
            } else {
                IrBinOp::LogicalOr
            },
            ty: TypeRef::BOOLEAN,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    /// `a ?: b` yields `a` unless it is null. Both sides must be
    /// references and the right assignable to the left's type.
    fn check_elvis(&mut self, e: &BinaryExpression) -> Option<IrExpr> {
        let lhs = self.check_expr(&e.lhs)?;
        let rhs = self.check_expr(&e.rhs)?;
        let (lt, rt) = (lhs.ty(), rhs.ty());
        if !lt.is_reference() || !rt.is_reference() || !self.ctx.table.is_assignable(lt, rt) {
            return self.operand_error("?:", lt, rt, e.loc);
        }
        Some(IrExpr::Binary {
            op: IrBinOp::Elvis,
            ty: lt,
            lhs: Box::new(lhs),
            rhs: Box::new(Self::coerce(rhs, lt)),
        })
    }

    // ----- assignment -----------------------------------------------------

    fn check_assign(&mut self, e: &Assignment) -> Option<IrExpr> {
        match &*e.lhs {
            Expression::Id(id) => {
                let value = self.check_expr(&e.rhs)?;
                match self.local.lookup(&id.name) {
                    Some(binding) => {
                        let value = self.expect_assignable(value, binding.ty, e.loc)?;
                        Some(IrExpr::SetLocal {
                            binding,
                            value: Box::new(value),
                        })
                    }
                    None => {
                        // first assignment declares the local
                        let ty = value.ty();
                        if ty.is_void() {
                            self.report(
                                SemanticErrorKind::IncompatibleType {
                                    expected: "a value".into(),
                                    found: "void".into(),
                                },
                                e.loc,
                            );
                            return None;
                        }
                        let index = self.local.add(&id.name, ty)?;
                        Some(IrExpr::SetLocal {
                            binding: CapturedBinding {
                                frame: 0,
                                index,
                                ty,
                            },
                            value: Box::new(value),
                        })
                    }
                }
            }
            Expression::MemberSelect(m)
                if matches!(&*m.target, Expression::CurrentInstance(_)) =>
            {
                let value = self.check_expr(&e.rhs)?;
                let Some(field) = self.ctx.table.find_field(self.class, &m.name) else {
                    self.report(
                        SemanticErrorKind::FieldNotFound {
                            class: self.ctx.table.class(self.class).name.clone(),
                            name: m.name.clone(),
                        },
                        e.loc,
                    );
                    return None;
                };
                let ty = self.ctx.table.field(field).ty;
                let value = self.expect_assignable(value, ty, e.loc)?;
                Some(IrExpr::SetField {
                    target: Box::new(IrExpr::This {
                        ty: TypeRef::Class(self.class),
                    }),
                    field,
                    value: Box::new(value),
                    ty,
                })
            }
            Expression::Indexing(ix) => {
                let target = self.check_expr(&ix.target)?;
                let index = self.check_expr(&ix.index)?;
                let value = self.check_expr(&e.rhs)?;
                match target.ty() {
                    TypeRef::Array(array) => {
                        let index = self.expect_assignable(index, TypeRef::INT, e.loc)?;
                        let element = self.ctx.table.element_type(array);
                        let value = self.expect_assignable(value, element, e.loc)?;
                        Some(IrExpr::ArraySet {
                            target: Box::new(target),
                            index: Box::new(index),
                            value: Box::new(value),
                            ty: element,
                        })
                    }
                    TypeRef::Class(class) => {
                        let (method, args) =
                            self.resolve_method(class, "set", vec![index, value], e.loc)?;
                        let ret = self.ctx.table.method(method).return_type;
                        Some(IrExpr::Call {
                            target: Box::new(target),
                            method,
                            args,
                            ty: ret,
                        })
                    }
                    other => {
                        self.report(
                            SemanticErrorKind::IncompatibleType {
                                expected: "an array or indexable object".into(),
                                found: self.type_name(other),
                            },
                            e.loc,
                        );
                        None
                    }
                }
            }
            Expression::StaticFieldSelect(s) => {
                let value = self.check_expr(&e.rhs)?;
                self.check_static_field(&s.type_spec, &s.name, e.loc, Some(value))
            }
            Expression::MemberSelect(_) => {
                self.report(SemanticErrorKind::UnimplementedFeature, e.loc);
                None
            }
            _ => {
                self.report(SemanticErrorKind::LValueRequired, e.loc);
                None
            }
        }
    }

    fn check_compound_assign(&mut self, e: &CompoundAssignment) -> Option<IrExpr> {
        self.report(SemanticErrorKind::UnimplementedFeature, e.loc);
        None
    }

    /// `x++`/`x--` on a numeric local: save the old value into a
    /// temporary, store the updated value, yield the old one.
    fn check_post_update(
        &mut self,
        e: &PostUpdate,
        op: IrBinOp,
        name: &str,
    ) -> Option<IrExpr> {
        let Expression::Id(id) = &*e.target else {
            self.report(SemanticErrorKind::UnimplementedFeature, e.loc);
            return None;
        };
        let Some(binding) = self.local.lookup(&id.name) else {
            self.report(
                SemanticErrorKind::VariableNotFound {
                    name: id.name.clone(),
                },
                e.loc,
            );
            return None;
        };
        if !binding.ty.is_numeric() {
            return self.operand_error(name, binding.ty, binding.ty, e.loc);
        }
        let temp_name = self.local.temp_name();
        let index = self.local.add(&temp_name, binding.ty)?;
        let temp = CapturedBinding {
            frame: 0,
            index,
            ty: binding.ty,
        };
        let one = Self::coerce(IrExpr::int(1), binding.ty);
        Some(IrExpr::Begin {
            exprs: vec![
                IrExpr::SetLocal {
                    binding: temp,
                    value: Box::new(IrExpr::RefLocal { binding }),
                },
                IrExpr::SetLocal {
                    binding,
                    value: Box::new(IrExpr::Binary {
                        op,
                        ty: binding.ty,
                        lhs: Box::new(IrExpr::RefLocal { binding: temp }),
                        rhs: Box::new(one),
                    }),
                },
                IrExpr::RefLocal { binding: temp },
            ],
        })
    }

    // ----- member access and calls ---------------------------------------

    /// `target.name` resolution order: array length, exact field, zero-arg
    /// method `name`, then the `getName`/`isName` accessors.
    fn check_member_select(
        &mut self,
        target: &Expression,
        name: &str,
        loc: Location,
    ) -> Option<IrExpr> {
        let target = self.check_expr(target)?;
        if let TypeRef::Array(_) = target.ty() {
            if name == "length" || name == "size" {
                return Some(IrExpr::ArrayLength {
                    target: Box::new(target),
                });
            }
            self.report(
                SemanticErrorKind::FieldNotFound {
                    class: self.type_name(target.ty()),
                    name: name.to_string(),
                },
                loc,
            );
            return None;
        }
        let Some(class) = self.member_class(target.ty()) else {
            self.report(
                SemanticErrorKind::FieldNotFound {
                    class: self.type_name(target.ty()),
                    name: name.to_string(),
                },
                loc,
            );
            return None;
        };

        let mut inaccessible_field = false;
        if let Some(field) = self.ctx.table.find_field(class, name) {
            let sym = self.ctx.table.field(field);
            let (modifiers, ty) = (sym.modifiers, sym.ty);
            if self
                .ctx
                .table
                .is_member_accessible(modifiers, field.class, self.class)
            {
                return Some(IrExpr::RefField {
                    target: Box::new(target),
                    field,
                    ty,
                });
            }
            inaccessible_field = true;
        }

        for candidate in accessor_names(name) {
            match self.try_zero_arg_method(class, &candidate, loc)? {
                Some(method) => {
                    let ret = self.ctx.table.method(method).return_type;
                    return Some(IrExpr::Call {
                        target: Box::new(target),
                        method,
                        args: vec![],
                        ty: ret,
                    });
                }
                None => continue,
            }
        }

        let class_name = self.ctx.table.class(class).name.clone();
        let kind = if inaccessible_field {
            SemanticErrorKind::FieldNotAccessible {
                class: class_name,
                name: name.to_string(),
            }
        } else {
            SemanticErrorKind::FieldNotFound {
                class: class_name,
                name: name.to_string(),
            }
        };
        self.report(kind, loc);
        None
    }

    /// `Ok(Some(_))` found, `Ok(None)` keep trying other candidate names,
    /// outer `None` abort (ambiguity or access violation was reported).
    fn try_zero_arg_method(
        &mut self,
        class: ClassId,
        name: &str,
        loc: Location,
    ) -> Option<Option<MethodRef>> {
        match self.ctx.table.find_method(class, name, &[]) {
            Lookup::NotFound => Some(None),
            Lookup::Ambiguous(_) => {
                self.report(
                    SemanticErrorKind::AmbiguousMethod {
                        class: self.ctx.table.class(class).name.clone(),
                        name: name.to_string(),
                    },
                    loc,
                );
                None
            }
            Lookup::Found(r) => {
                let modifiers = self.ctx.table.method(r).modifiers;
                if !self
                    .ctx
                    .table
                    .is_member_accessible(modifiers, r.class, self.class)
                {
                    self.report(
                        SemanticErrorKind::MethodNotAccessible {
                            class: self.ctx.table.class(class).name.clone(),
                            name: name.to_string(),
                        },
                        loc,
                    );
                    return None;
                }
                Some(Some(r))
            }
        }
    }

    /// Full overload resolution plus accessibility, with argument casts
    /// inserted for the chosen signature.
    fn resolve_method(
        &mut self,
        class: ClassId,
        name: &str,
        args: Vec<IrExpr>,
        loc: Location,
    ) -> Option<(MethodRef, Vec<IrExpr>)> {
        let tys: Vec<TypeRef> = args.iter().map(IrExpr::ty).collect();
        match self.ctx.table.find_method(class, name, &tys) {
            Lookup::NotFound => {
                self.report(
                    SemanticErrorKind::MethodNotFound {
                        class: self.ctx.table.class(class).name.clone(),
                        name: name.to_string(),
                    },
                    loc,
                );
                None
            }
            Lookup::Ambiguous(_) => {
                self.report(
                    SemanticErrorKind::AmbiguousMethod {
                        class: self.ctx.table.class(class).name.clone(),
                        name: name.to_string(),
                    },
                    loc,
                );
                None
            }
            Lookup::Found(r) => {
                let sym = self.ctx.table.method(r);
                let (modifiers, params) = (sym.modifiers, sym.params.clone());
                if !self
                    .ctx
                    .table
                    .is_member_accessible(modifiers, r.class, self.class)
                {
                    self.report(
                        SemanticErrorKind::MethodNotAccessible {
                            class: self.ctx.table.class(class).name.clone(),
                            name: name.to_string(),
                        },
                        loc,
                    );
                    return None;
                }
                let args = args
                    .into_iter()
                    .zip(params)
                    .map(|(a, p)| Self::coerce(a, p))
                    .collect();
                Some((r, args))
            }
        }
    }

    fn resolve_constructor(
        &mut self,
        class: ClassId,
        args: Vec<IrExpr>,
        loc: Location,
    ) -> Option<(ConstructorRef, Vec<IrExpr>)> {
        let tys: Vec<TypeRef> = args.iter().map(IrExpr::ty).collect();
        match self.ctx.table.find_constructor(class, &tys) {
            Lookup::NotFound => {
                self.report(
                    SemanticErrorKind::ConstructorNotFound {
                        class: self.ctx.table.class(class).name.clone(),
                    },
                    loc,
                );
                None
            }
            Lookup::Ambiguous(_) => {
                self.report(
                    SemanticErrorKind::AmbiguousConstructor {
                        class: self.ctx.table.class(class).name.clone(),
                    },
                    loc,
                );
                None
            }
            Lookup::Found(r) => {
                let params = self.ctx.table.constructor(r).params.clone();
                let args = args
                    .into_iter()
                    .zip(params)
                    .map(|(a, p)| Self::coerce(a, p))
                    .collect();
                Some((r, args))
            }
        }
    }

    fn check_args(&mut self, args: &[Expression]) -> Option<Vec<IrExpr>> {
        args.iter().map(|a| self.check_expr(a)).collect()
    }

    fn check_call(
        &mut self,
        target: &Expression,
        name: &str,
        args: &[Expression],
        loc: Location,
    ) -> Option<IrExpr> {
        let target = self.check_expr(target)?;
        let args = self.check_args(args)?;
        let Some(class) = self.member_class(target.ty()) else {
            self.report(
                SemanticErrorKind::MethodNotFound {
                    class: self.type_name(target.ty()),
                    name: name.to_string(),
                },
                loc,
            );
            return None;
        };
        let (method, args) = self.resolve_method(class, name, args, loc)?;
        let sym = self.ctx.table.method(method);
        if sym.modifiers.is_static() {
            self.report(
                SemanticErrorKind::IllegalMethodCall {
                    class: self.ctx.table.class(class).name.clone(),
                    name: name.to_string(),
                },
                loc,
            );
            return None;
        }
        let ret = sym.return_type;
        Some(IrExpr::Call {
            target: Box::new(target),
            method,
            args,
            ty: ret,
        })
    }

    /// A bare `name(args)` resolves against the current class; static
    /// methods dispatch statically, instance methods through `self`.
    fn check_unqualified_call(
        &mut self,
        name: &str,
        args: &[Expression],
        loc: Location,
    ) -> Option<IrExpr> {
        let args = self.check_args(args)?;
        let (method, args) = self.resolve_method(self.class, name, args, loc)?;
        let sym = self.ctx.table.method(method);
        let ret = sym.return_type;
        if sym.modifiers.is_static() {
            return Some(IrExpr::CallStatic { method, args, ty: ret });
        }
        if self.local.is_static {
            self.report(
                SemanticErrorKind::IllegalMethodCall {
                    class: self.ctx.table.class(self.class).name.clone(),
                    name: name.to_string(),
                },
                loc,
            );
            return None;
        }
        Some(IrExpr::Call {
            target: Box::new(IrExpr::This {
                ty: TypeRef::Class(self.class),
            }),
            method,
            args,
            ty: ret,
        })
    }

    fn check_super_call(
        &mut self,
        name: &str,
        args: &[Expression],
        loc: Location,
    ) -> Option<IrExpr> {
        let Some(super_class) = self.ctx.table.class(self.class).super_class else {
            self.report(
                SemanticErrorKind::MethodNotFound {
                    class: self.ctx.table.class(self.class).name.clone(),
                    name: name.to_string(),
                },
                loc,
            );
            return None;
        };
        let args = self.check_args(args)?;
        let (method, args) = self.resolve_method(super_class, name, args, loc)?;
        let ret = self.ctx.table.method(method).return_type;
        Some(IrExpr::CallSuper {
            target: Box::new(IrExpr::This {
                ty: TypeRef::Class(self.class),
            }),
            method,
            args,
            ty: ret,
        })
    }

    fn check_static_call(
        &mut self,
        spec: &TypeSpec,
        name: &str,
        args: &[Expression],
        loc: Location,
    ) -> Option<IrExpr> {
        let ty = self.resolve_spec(spec, loc)?;
        let TypeRef::Class(class) = ty else {
            self.report(
                SemanticErrorKind::ClassNotFound {
                    name: spec.to_string(),
                },
                loc,
            );
            return None;
        };
        let args = self.check_args(args)?;
        let (method, args) = self.resolve_method(class, name, args, loc)?;
        let sym = self.ctx.table.method(method);
        if !sym.modifiers.is_static() {
            self.report(
                SemanticErrorKind::IllegalMethodCall {
                    class: self.ctx.table.class(class).name.clone(),
                    name: name.to_string(),
                },
                loc,
            );
            return None;
        }
        let ret = sym.return_type;
        Some(IrExpr::CallStatic { method, args, ty: ret })
    }

    /// `Type::name` read, or write when `value` is given.
    fn check_static_field(
        &mut self,
        spec: &TypeSpec,
        name: &str,
        loc: Location,
        value: Option<IrExpr>,
    ) -> Option<IrExpr> {
        let ty = self.resolve_spec(spec, loc)?;
        let TypeRef::Class(class) = ty else {
            self.report(
                SemanticErrorKind::ClassNotFound {
                    name: spec.to_string(),
                },
                loc,
            );
            return None;
        };
        let Some(field) = self.ctx.table.find_field(class, name) else {
            self.report(
                SemanticErrorKind::FieldNotFound {
                    class: self.ctx.table.class(class).name.clone(),
                    name: name.to_string(),
                },
                loc,
            );
            return None;
        };
        let sym = self.ctx.table.field(field);
        let (modifiers, field_ty) = (sym.modifiers, sym.ty);
        if !modifiers.is_static() {
            self.report(
                SemanticErrorKind::FieldNotFound {
                    class: self.ctx.table.class(class).name.clone(),
                    name: name.to_string(),
                },
                loc,
            );
            return None;
        }
        if !self
            .ctx
            .table
            .is_member_accessible(modifiers, field.class, self.class)
        {
            self.report(
                SemanticErrorKind::FieldNotAccessible {
                    class: self.ctx.table.class(class).name.clone(),
                    name: name.to_string(),
                },
                loc,
            );
            return None;
        }
        match value {
            None => Some(IrExpr::RefStaticField { field, ty: field_ty }),
            Some(v) => {
                let v = self.expect_assignable(v, field_ty, loc)?;
                Some(IrExpr::SetStaticField {
                    field,
                    value: Box::new(v),
                    ty: field_ty,
                })
            }
        }
    }

    fn check_indexing(
        &mut self,
        target: &Expression,
        index: &Expression,
        loc: Location,
    ) -> Option<IrExpr> {
        let target = self.check_expr(target)?;
        let index = self.check_expr(index)?;
        match target.ty() {
            TypeRef::Array(array) => {
                let index = self.expect_assignable(index, TypeRef::INT, loc)?;
                let ty = self.ctx.table.element_type(array);
                Some(IrExpr::ArrayRef {
                    target: Box::new(target),
                    index: Box::new(index),
                    ty,
                })
            }
            TypeRef::Class(class) => {
                let (method, args) = self.resolve_method(class, "get", vec![index], loc)?;
                let ret = self.ctx.table.method(method).return_type;
                Some(IrExpr::Call {
                    target: Box::new(target),
                    method,
                    args,
                    ty: ret,
                })
            }
            other => {
                self.report(
                    SemanticErrorKind::IncompatibleType {
                        expected: "an array or indexable object".into(),
                        found: self.type_name(other),
                    },
                    loc,
                );
                None
            }
        }
    }

    fn check_new(&mut self, spec: &TypeSpec, args: &[Expression], loc: Location) -> Option<IrExpr> {
        let ty = self.resolve_spec(spec, loc)?;
        let TypeRef::Class(class) = ty else {
            self.report(
                SemanticErrorKind::ClassNotFound {
                    name: spec.to_string(),
                },
                loc,
            );
            return None;
        };
        if self.ctx.table.class(class).is_interface() {
            self.report(
                SemanticErrorKind::ConstructorNotFound {
                    class: self.ctx.table.class(class).name.clone(),
                },
                loc,
            );
            return None;
        }
        if !self.ctx.table.is_class_accessible(class, self.class) {
            self.report(
                SemanticErrorKind::ClassNotAccessible {
                    name: self.ctx.table.class(class).name.clone(),
                },
                loc,
            );
            return None;
        }
        let args = self.check_args(args)?;
        let (ctor, args) = self.resolve_constructor(class, args, loc)?;
        Some(IrExpr::New {
            ctor,
            args,
            ty: TypeRef::Class(class),
        })
    }

    fn check_new_array(
        &mut self,
        spec: &TypeSpec,
        sizes: &[Expression],
        loc: Location,
    ) -> Option<IrExpr> {
        let component = self.resolve_spec(spec, loc)?;
        let sizes: Option<Vec<IrExpr>> = sizes
            .iter()
            .map(|s| {
                let s = self.check_expr(s)?;
                self.expect_assignable(s, TypeRef::INT, loc)
            })
            .collect();
        let array = match component {
            TypeRef::Array(inner) => {
                let sym = self.ctx.table.array(inner);
                let (base, dims) = (sym.base, sym.dims);
                self.ctx.table.load_array(base, dims + sizes.as_ref()?.len())
            }
            base => self.ctx.table.load_array(base, sizes.as_ref()?.len()),
        };
        Some(IrExpr::NewArray {
            array,
            sizes: sizes?,
        })
    }

    /// An anonymous implementation of one interface method. The created
    /// object may outlive every enclosing frame, so they are all marked
    /// closed.
    fn check_closure(&mut self, e: &ClosureExpression) -> Option<IrExpr> {
        let ty = self.resolve_spec(&e.interface, e.loc)?;
        let iface = match ty {
            TypeRef::Class(id) if self.ctx.table.class(id).is_interface() => id,
            other => {
                self.report(
                    SemanticErrorKind::InterfaceRequired {
                        found: self.type_name(other),
                    },
                    e.loc,
                );
                return None;
            }
        };
        let params: Option<Vec<TypeRef>> = e
            .params
            .iter()
            .map(|p| self.resolve_spec(&p.type_spec, p.loc))
            .collect();
        let params = params?;

        let method = self
            .ctx
            .table
            .interface_methods(iface)
            .into_iter()
            .find(|&r| {
                let m = self.ctx.table.method(r);
                m.name == e.method_name && m.params == params
            });
        let Some(method) = method else {
            self.report(
                SemanticErrorKind::MethodNotFound {
                    class: self.ctx.table.class(iface).name.clone(),
                    name: e.method_name.clone(),
                },
                e.loc,
            );
            return None;
        };
        let return_type = self.ctx.table.method(method).return_type;

        self.local.open_frame();
        for (param, &ty) in e.params.iter().zip(&params) {
            if self.local.add(&param.name, ty).is_none() {
                self.report(
                    SemanticErrorKind::DuplicateLocalVariable {
                        name: param.name.clone(),
                    },
                    param.loc,
                );
            }
        }
        self.local.mark_enclosing_closed();
        let saved = std::mem::replace(&mut self.return_type, return_type);
        let mut body = self.check_block(&e.body);
        add_return_node(&mut body, return_type);
        self.return_type = saved;
        let frame = self.local.close_frame();

        Some(IrExpr::NewClosure(Box::new(IrClosure {
            interface: iface,
            method,
            params,
            return_type,
            body,
            frame,
            has_outer: !self.local.is_static,
        })))
    }

    // ----- statements -----------------------------------------------------

    fn check_block(&mut self, block: &BlockStatement) -> IrStmt {
        self.local.open_scope();
        let stmts = block.statements.iter().map(|s| self.check_stmt(s)).collect();
        self.local.close_scope();
        IrStmt::Block(stmts)
    }

    fn check_stmt(&mut self, stmt: &Statement) -> IrStmt {
        match stmt {
            Statement::Block(b) => self.check_block(b),
            Statement::Expression(e) => match self.check_expr(&e.expr) {
                Some(ir) => IrStmt::Expression(ir),
                None => IrStmt::Nop,
            },
            Statement::If(s) => {
                let condition = self
                    .check_expr(&s.condition)
                    .and_then(|c| self.expect_boolean(c, s.loc));
                let then_branch = self.check_block(&s.then_block);
                let else_branch = s.else_block.as_ref().map(|b| Box::new(self.check_block(b)));
                match condition {
                    Some(condition) => IrStmt::If {
                        condition,
                        then_branch: Box::new(then_branch),
                        else_branch,
                    },
                    None => IrStmt::Nop,
                }
            }
            Statement::Cond(s) => {
                // fold the clauses into nested ifs, else innermost
                let mut acc = s
                    .else_block
                    .as_ref()
                    .map(|b| self.check_block(b));
                for (cond, block) in s.clauses.iter().rev() {
                    let condition = self
                        .check_expr(cond)
                        .and_then(|c| self.expect_boolean(c, s.loc));
                    let then_branch = self.check_block(block);
                    acc = match condition {
                        Some(condition) => Some(IrStmt::If {
                            condition,
                            then_branch: Box::new(then_branch),
                            else_branch: acc.map(Box::new),
                        }),
                        None => acc,
                    };
                }
                acc.unwrap_or(IrStmt::Nop)
            }
            Statement::While(s) => {
                let condition = self
                    .check_expr(&s.condition)
                    .and_then(|c| self.expect_boolean(c, s.loc));
                let body = self.check_block(&s.body);
                match condition {
                    Some(condition) => IrStmt::Loop {
                        condition,
                        body: Box::new(body),
                    },
                    None => IrStmt::Nop,
                }
            }
            Statement::For(s) => {
                self.local.open_scope();
                let mut stmts = Vec::new();
                if let Some(init) = &s.init {
                    stmts.push(self.check_stmt(init));
                }
                let condition = match &s.condition {
                    Some(c) => self
                        .check_expr(c)
                        .and_then(|c| self.expect_boolean(c, s.loc)),
                    None => Some(IrExpr::Bool { value: true }),
                };
                let mut body_stmts = vec![self.check_block(&s.body)];
                if let Some(update) = &s.update {
                    if let Some(ir) = self.check_expr(update) {
                        body_stmts.push(IrStmt::Expression(ir));
                    }
                }
                self.local.close_scope();
                match condition {
                    Some(condition) => {
                        stmts.push(IrStmt::Loop {
                            condition,
                            body: Box::new(IrStmt::Block(body_stmts)),
                        });
                        IrStmt::Block(stmts)
                    }
                    None => IrStmt::Nop,
                }
            }
            Statement::Foreach(s) => self.check_foreach(s),
            Statement::Select(s) => self.check_select(s),
            Statement::Return(s) => self.check_return(s),
            Statement::Throw(s) => {
                let Some(value) = self.check_expr(&s.value) else {
                    return IrStmt::Nop;
                };
                let throwable = TypeRef::Class(self.ctx.platform.throwable);
                if !self.ctx.table.is_assignable(throwable, value.ty()) {
                    self.report(
                        SemanticErrorKind::IncompatibleType {
                            expected: self.type_name(throwable),
                            found: self.type_name(value.ty()),
                        },
                        s.loc,
                    );
                    return IrStmt::Nop;
                }
                IrStmt::Throw { value }
            }
            Statement::Try(s) => {
                let body = self.check_block(&s.body);
                let throwable = TypeRef::Class(self.ctx.platform.throwable);
                let mut catches = Vec::new();
                for clause in &s.catches {
                    self.local.open_scope();
                    let ty = self.resolve_spec(&clause.var_type, clause.loc);
                    if let Some(ty) = ty {
                        if !self.ctx.table.is_assignable(throwable, ty) {
                            self.report(
                                SemanticErrorKind::IncompatibleType {
                                    expected: self.type_name(throwable),
                                    found: self.type_name(ty),
                                },
                                clause.loc,
                            );
                        } else if let Some(index) = self.local.add(&clause.var_name, ty) {
                            let handler = self.check_block(&clause.body);
                            catches.push(IrCatch {
                                binding: LocalBinding { index, ty },
                                body: handler,
                            });
                        } else {
                            self.report(
                                SemanticErrorKind::DuplicateLocalVariable {
                                    name: clause.var_name.clone(),
                                },
                                clause.loc,
                            );
                        }
                    }
                    self.local.close_scope();
                }
                IrStmt::Try {
                    body: Box::new(body),
                    catches,
                }
            }
            Statement::LocalVar(s) => {
                let Some(ty) = self.resolve_spec(&s.type_spec, s.loc) else {
                    return IrStmt::Nop;
                };
                if self.local.lookup_current_scope(&s.name).is_some() {
                    self.report(
                        SemanticErrorKind::DuplicateLocalVariable {
                            name: s.name.clone(),
                        },
                        s.loc,
                    );
                    return IrStmt::Nop;
                }
                let Some(index) = self.local.add(&s.name, ty) else {
                    return IrStmt::Nop;
                };
                let init = match &s.init {
                    Some(e) => self
                        .check_expr(e)
                        .and_then(|v| self.expect_assignable(v, ty, s.loc)),
                    None => default_value(ty),
                };
                match init {
                    Some(value) => IrStmt::Expression(IrExpr::SetLocal {
                        binding: CapturedBinding {
                            frame: 0,
                            index,
                            ty,
                        },
                        value: Box::new(value),
                    }),
                    None => IrStmt::Nop,
                }
            }
            Statement::Break(loc) | Statement::Continue(loc) => {
                self.report(SemanticErrorKind::UnimplementedFeature, *loc);
                IrStmt::Nop
            }
            Statement::Synchronized(s) => {
                self.report(SemanticErrorKind::UnimplementedFeature, s.loc);
                IrStmt::Nop
            }
            Statement::Empty(_) => IrStmt::Nop,
        }
    }

    fn check_return(&mut self, s: &opal_syntax::ReturnStatement) -> IrStmt {
        match &s.value {
            Some(value) => {
                if self.return_type.is_void() {
                    self.report(SemanticErrorKind::CannotReturnValue, s.loc);
                    return IrStmt::Nop;
                }
                let ret = self.return_type;
                match self
                    .check_expr(value)
                    .and_then(|v| self.expect_assignable(v, ret, s.loc))
                {
                    Some(value) => IrStmt::Return { value: Some(value) },
                    None => IrStmt::Nop,
                }
            }
            None => {
                if !self.return_type.is_void() {
                    self.report(
                        SemanticErrorKind::IncompatibleType {
                            expected: self.type_name(self.return_type),
                            found: "void".into(),
                        },
                        s.loc,
                    );
                    return IrStmt::Nop;
                }
                IrStmt::Return { value: None }
            }
        }
    }

    /// Arrays iterate by index; anything else goes through the iterator
    /// protocol.
    fn check_foreach(&mut self, s: &ForeachStatement) -> IrStmt {
        let Some(collection) = self.check_expr(&s.collection) else {
            return IrStmt::Nop;
        };
        let Some(var_ty) = self.resolve_spec(&s.var_type, s.loc) else {
            return IrStmt::Nop;
        };
        self.local.open_scope();
        let result = match collection.ty() {
            TypeRef::Array(array) => self.foreach_array(s, collection, array, var_ty),
            TypeRef::Class(_) => self.foreach_collection(s, collection, var_ty),
            other => {
                self.report(
                    SemanticErrorKind::IncompatibleType {
                        expected: "an array or iterable object".into(),
                        found: self.type_name(other),
                    },
                    s.loc,
                );
                IrStmt::Nop
            }
        };
        self.local.close_scope();
        result
    }

    fn foreach_array(
        &mut self,
        s: &ForeachStatement,
        collection: IrExpr,
        array: crate::types::ArrayId,
        var_ty: TypeRef,
    ) -> IrStmt {
        let col_name = self.local.temp_name();
        let cnt_name = self.local.temp_name();
        let (Some(col_idx), Some(cnt_idx)) = (
            self.local.add(&col_name, collection.ty()),
            self.local.add(&cnt_name, TypeRef::INT),
        ) else {
            return IrStmt::Nop;
        };
        let col = CapturedBinding {
            frame: 0,
            index: col_idx,
            ty: collection.ty(),
        };
        let cnt = CapturedBinding {
            frame: 0,
            index: cnt_idx,
            ty: TypeRef::INT,
        };
        let Some(var_idx) = self.local.add(&s.var_name, var_ty) else {
            self.report(
                SemanticErrorKind::DuplicateLocalVariable {
                    name: s.var_name.clone(),
                },
                s.loc,
            );
            return IrStmt::Nop;
        };
        let var = CapturedBinding {
            frame: 0,
            index: var_idx,
            ty: var_ty,
        };

        let element_ty = self.ctx.table.element_type(array);
        let element = IrExpr::ArrayRef {
            target: Box::new(IrExpr::RefLocal { binding: col }),
            index: Box::new(IrExpr::RefLocal { binding: cnt }),
            ty: element_ty,
        };
        let Some(element) = self.expect_assignable(element, var_ty, s.loc) else {
            return IrStmt::Nop;
        };
        let body = self.check_block(&s.body);

        IrStmt::Block(vec![
            IrStmt::Expression(IrExpr::SetLocal {
                binding: col,
                value: Box::new(collection),
            }),
            IrStmt::Expression(IrExpr::SetLocal {
                binding: cnt,
                value: Box::new(IrExpr::int(0)),
            }),
            IrStmt::Loop {
                condition: IrExpr::Binary {
                    op: IrBinOp::Lt,
                    ty: TypeRef::BOOLEAN,
                    lhs: Box::new(IrExpr::RefLocal { binding: cnt }),
                    rhs: Box::new(IrExpr::ArrayLength {
                        target: Box::new(IrExpr::RefLocal { binding: col }),
                    }),
                },
                body: Box::new(IrStmt::Block(vec![
                    IrStmt::Expression(IrExpr::SetLocal {
                        binding: var,
                        value: Box::new(element),
                    }),
                    body,
                    IrStmt::Expression(IrExpr::SetLocal {
                        binding: cnt,
                        value: Box::new(IrExpr::Binary {
                            op: IrBinOp::Add,
                            ty: TypeRef::INT,
                            lhs: Box::new(IrExpr::RefLocal { binding: cnt }),
                            rhs: Box::new(IrExpr::int(1)),
                        }),
                    }),
                ])),
            },
        ])
    }

    fn foreach_collection(
        &mut self,
        s: &ForeachStatement,
        collection: IrExpr,
        var_ty: TypeRef,
    ) -> IrStmt {
        let Some(class) = self.member_class(collection.ty()) else {
            return IrStmt::Nop;
        };
        let Some((iterator_m, _)) = self.resolve_method(class, "iterator", vec![], s.loc) else {
            return IrStmt::Nop;
        };
        let iter_ty = self.ctx.table.method(iterator_m).return_type;
        let Some(iter_class) = self.member_class(iter_ty) else {
            return IrStmt::Nop;
        };
        let Some((has_next, _)) = self.resolve_method(iter_class, "hasNext", vec![], s.loc) else {
            return IrStmt::Nop;
        };
        let Some((next, _)) = self.resolve_method(iter_class, "next", vec![], s.loc) else {
            return IrStmt::Nop;
        };

        let col_name = self.local.temp_name();
        let iter_name = self.local.temp_name();
        let (Some(col_idx), Some(iter_idx)) = (
            self.local.add(&col_name, collection.ty()),
            self.local.add(&iter_name, iter_ty),
        ) else {
            return IrStmt::Nop;
        };
        let col = CapturedBinding {
            frame: 0,
            index: col_idx,
            ty: collection.ty(),
        };
        let iter = CapturedBinding {
            frame: 0,
            index: iter_idx,
            ty: iter_ty,
        };
        let Some(var_idx) = self.local.add(&s.var_name, var_ty) else {
            self.report(
                SemanticErrorKind::DuplicateLocalVariable {
                    name: s.var_name.clone(),
                },
                s.loc,
            );
            return IrStmt::Nop;
        };
        let var = CapturedBinding {
            frame: 0,
            index: var_idx,
            ty: var_ty,
        };

        let next_ret = self.ctx.table.method(next).return_type;
        let next_call = IrExpr::Call {
            target: Box::new(IrExpr::RefLocal { binding: iter }),
            method: next,
            args: vec![],
            ty: next_ret,
        };
        // the downcast is skipped when the element type is already the root
        let element = if var_ty == TypeRef::Class(self.ctx.platform.object) {
            next_call
        } else {
            IrExpr::Cast {
                value: Box::new(next_call),
                to: var_ty,
            }
        };
        let has_next_ret = self.ctx.table.method(has_next).return_type;
        let body = self.check_block(&s.body);

        IrStmt::Block(vec![
            IrStmt::Expression(IrExpr::SetLocal {
                binding: col,
                value: Box::new(collection),
            }),
            IrStmt::Expression(IrExpr::SetLocal {
                binding: iter,
                value: Box::new(IrExpr::Call {
                    target: Box::new(IrExpr::RefLocal { binding: col }),
                    method: iterator_m,
                    args: vec![],
                    ty: iter_ty,
                }),
            }),
            IrStmt::Loop {
                condition: IrExpr::Call {
                    target: Box::new(IrExpr::RefLocal { binding: iter }),
                    method: has_next,
                    args: vec![],
                    ty: has_next_ret,
                },
                body: Box::new(IrStmt::Block(vec![
                    IrStmt::Expression(IrExpr::SetLocal {
                        binding: var,
                        value: Box::new(element),
                    }),
                    body,
                ])),
            },
        ])
    }

    /// The scrutinee is evaluated once into a temporary; each case becomes
    /// an or-chain of comparisons, folded into nested ifs.
    fn check_select(&mut self, s: &opal_syntax::SelectStatement) -> IrStmt {
        let Some(scrutinee) = self.check_expr(&s.scrutinee) else {
            return IrStmt::Nop;
        };
        self.local.open_scope();
        let tmp_name = self.local.temp_name();
        let Some(index) = self.local.add(&tmp_name, scrutinee.ty()) else {
            self.local.close_scope();
            return IrStmt::Nop;
        };
        let tmp = CapturedBinding {
            frame: 0,
            index,
            ty: scrutinee.ty(),
        };
        let head = IrStmt::Expression(IrExpr::SetLocal {
            binding: tmp,
            value: Box::new(scrutinee),
        });

        let mut acc = match &s.else_block {
            Some(b) => self.check_block(b),
            None => IrStmt::Nop,
        };
        for (values, block) in s.cases.iter().rev() {
            let mut condition: Option<IrExpr> = None;
            for value in values {
                let Some(cmp) = self.case_compare(tmp, value) else {
                    continue;
                };
                condition = Some(match condition {
                    None => cmp,
                    Some(prev) => IrExpr::Binary {
                        op: IrBinOp::LogicalOr,
                        ty: TypeRef::BOOLEAN,
                        lhs: Box::new(prev),
                        rhs: Box::new(cmp),
                    },
                });
            }
            let then_branch = self.check_block(block);
            if let Some(condition) = condition {
                acc = IrStmt::If {
                    condition,
                    then_branch: Box::new(then_branch),
                    else_branch: Some(Box::new(acc)),
                };
            }
        }
        self.local.close_scope();
        IrStmt::Block(vec![head, acc])
    }

    fn case_compare(&mut self, tmp: CapturedBinding, value: &Expression) -> Option<IrExpr> {
        let loc = value.location();
        let value = self.check_expr(value)?;
        let scrutinee = IrExpr::RefLocal { binding: tmp };
        if tmp.ty.is_reference() {
            self.create_equals(scrutinee, value, loc)
        } else {
            let value = self.expect_assignable(value, tmp.ty, loc)?;
            Some(IrExpr::Binary {
                op: IrBinOp::Eq,
                ty: TypeRef::BOOLEAN,
                lhs: Box::new(scrutinee),
                rhs: Box::new(value),
            })
        }
    }
}

/// Zero-argument method names tried for a member read `target.name`:
/// the name itself, then the `get`/`is` accessor forms.
fn accessor_names(name: &str) -> [String; 3] {
    let mut capitalized = String::with_capacity(name.len());
    let mut chars = name.chars();
    if let Some(first) = chars.next() {
        capitalized.extend(first.to_uppercase());
        capitalized.push_str(chars.as_str());
    }
    [
        name.to_string(),
        format!("get{capitalized}"),
        format!("is{capitalized}"),
    ]
}

/// Single-operand promotion: the sub-int integers compute as `int`.
fn unary_promote(b: BasicType) -> BasicType {
    match b {
        BasicType::Byte | BasicType::Short | BasicType::Char => BasicType::Int,
        other => other,
    }
}

