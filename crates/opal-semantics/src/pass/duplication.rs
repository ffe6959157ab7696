//! Pass 3: duplicate member detection and delegation synthesis.

use rustc_hash::FxHashSet;

use opal_syntax::{ClassDecl, CompilationUnit, InterfaceDecl, Modifiers, TopLevel};

use crate::error::SemanticErrorKind;
use crate::frame::{CapturedBinding, FrameSnapshot};
use crate::ir::{DeclTarget, IrBody, IrExpr, IrStmt};
use crate::pass::AnalysisContext;
use crate::symbols::{FieldRef, MethodRef, MethodSymbol};
use crate::types::{ClassId, TypeRef};

type Signature = (String, Vec<TypeRef>);

pub(crate) fn run(ctx: &mut AnalysisContext, units: &[CompilationUnit]) {
    for (unit_index, unit) in units.iter().enumerate() {
        ctx.reporter.set_source_file(&unit.source_file);
        for toplevel in &unit.toplevels {
            match toplevel {
                TopLevel::Class(decl) => {
                    check_class(ctx, decl);
                    synthesize_delegates(ctx, decl);
                }
                TopLevel::Interface(decl) => check_interface(ctx, decl),
                _ => {}
            }
        }
        check_main_class(ctx, unit_index, unit);
    }
}

fn method_ref_of(ctx: &AnalysisContext, node: opal_syntax::NodeId) -> Option<MethodRef> {
    match ctx.decl_map.target_of(node) {
        Some(DeclTarget::Method(r)) => Some(r),
        _ => None,
    }
}

fn check_class(ctx: &mut AnalysisContext, decl: &ClassDecl) {
    let Some(DeclTarget::Class(id)) = ctx.decl_map.target_of(decl.node_id) else {
        return;
    };
    let class_name = ctx.table.class(id).name.clone();

    let mut fields: FxHashSet<String> = FxHashSet::default();
    for field in &decl.fields {
        if !fields.insert(field.name.clone()) {
            ctx.report(
                SemanticErrorKind::DuplicateField {
                    class: class_name.clone(),
                    name: field.name.clone(),
                },
                field.loc,
            );
        }
    }

    let mut methods: FxHashSet<Signature> = FxHashSet::default();
    for method in &decl.methods {
        let Some(r) = method_ref_of(ctx, method.node_id) else {
            continue;
        };
        let sym = ctx.table.method(r);
        if !methods.insert((sym.name.clone(), sym.params.clone())) {
            ctx.report(
                SemanticErrorKind::DuplicateMethod {
                    class: class_name.clone(),
                    name: method.name.clone(),
                },
                method.loc,
            );
        }
    }

    let mut ctors: FxHashSet<Vec<TypeRef>> = FxHashSet::default();
    for ctor in &decl.constructors {
        let Some(DeclTarget::Constructor(r)) = ctx.decl_map.target_of(ctor.node_id) else {
            continue;
        };
        let params = ctx.table.constructor(r).params.clone();
        if !ctors.insert(params) {
            ctx.report(
                SemanticErrorKind::DuplicateConstructor {
                    class: class_name.clone(),
                },
                ctor.loc,
            );
        }
    }
}

fn check_interface(ctx: &mut AnalysisContext, decl: &InterfaceDecl) {
    let Some(DeclTarget::Class(id)) = ctx.decl_map.target_of(decl.node_id) else {
        return;
    };
    let class_name = ctx.table.class(id).name.clone();
    let mut methods: FxHashSet<Signature> = FxHashSet::default();
    for method in &decl.methods {
        let Some(r) = method_ref_of(ctx, method.node_id) else {
            continue;
        };
        let sym = ctx.table.method(r);
        if !methods.insert((sym.name.clone(), sym.params.clone())) {
            ctx.report(
                SemanticErrorKind::DuplicateMethod {
                    class: class_name.clone(),
                    name: method.name.clone(),
                },
                method.loc,
            );
        }
    }
}

/// Top-level functions and globals share the main class; their collisions
/// get their own diagnostics.
fn check_main_class(ctx: &mut AnalysisContext, unit_index: usize, unit: &CompilationUnit) {
    if ctx.units[unit_index].main_class.is_none() {
        return;
    }
    let mut functions: FxHashSet<Signature> = FxHashSet::default();
    let mut globals: FxHashSet<String> = FxHashSet::default();
    for toplevel in &unit.toplevels {
        match toplevel {
            TopLevel::Function(decl) => {
                let Some(r) = method_ref_of(ctx, decl.node_id) else {
                    continue;
                };
                let sym = ctx.table.method(r);
                if !functions.insert((sym.name.clone(), sym.params.clone())) {
                    ctx.report(
                        SemanticErrorKind::DuplicateFunction {
                            name: decl.name.clone(),
                        },
                        decl.loc,
                    );
                }
            }
            TopLevel::GlobalVar(decl) => {
                if !globals.insert(decl.name.clone()) {
                    ctx.report(
                        SemanticErrorKind::DuplicateGlobalVariable {
                            name: decl.name.clone(),
                        },
                        decl.loc,
                    );
                }
            }
            _ => {}
        }
    }
}

/// For every delegate field, generate a forwarding method for each
/// interface method the class does not declare itself.
fn synthesize_delegates(ctx: &mut AnalysisContext, decl: &ClassDecl) {
    let Some(DeclTarget::Class(id)) = ctx.decl_map.target_of(decl.node_id) else {
        return;
    };
    let declared: FxHashSet<Signature> = ctx
        .table
        .class(id)
        .methods
        .iter()
        .map(|m| (m.name.clone(), m.params.clone()))
        .collect();
    let mut generated: FxHashSet<Signature> = FxHashSet::default();

    for field_decl in &decl.fields {
        if !field_decl.modifiers.is_delegate() {
            continue;
        }
        let Some(DeclTarget::Field(field)) = ctx.decl_map.target_of(field_decl.node_id) else {
            continue;
        };
        let TypeRef::Class(iface) = ctx.table.field(field).ty else {
            continue;
        };
        if !ctx.table.class(iface).is_interface() {
            // already reported during header analysis
            continue;
        }
        for target in ctx.table.interface_methods(iface) {
            let sym = ctx.table.method(target);
            let sig = (sym.name.clone(), sym.params.clone());
            if declared.contains(&sig) {
                continue;
            }
            if generated.contains(&sig) {
                ctx.report(
                    SemanticErrorKind::DuplicateGeneratedMethod {
                        class: ctx.table.class(id).name.clone(),
                        name: sig.0,
                    },
                    field_decl.loc,
                );
                continue;
            }
            generated.insert(sig);
            add_forwarding_method(ctx, id, field, target);
        }
    }
}

/// `method(a…) { return this.field.method(a…); }`
fn add_forwarding_method(
    ctx: &mut AnalysisContext,
    class: ClassId,
    field: FieldRef,
    target: MethodRef,
) {
    let target_sym = ctx.table.method(target);
    let name = target_sym.name.clone();
    let params = target_sym.params.clone();
    let return_type = target_sym.return_type;
    let field_ty = ctx.table.field(field).ty;

    let args: Vec<IrExpr> = params
        .iter()
        .enumerate()
        .map(|(index, &ty)| IrExpr::RefLocal {
            binding: CapturedBinding {
                frame: 0,
                index,
                ty,
            },
        })
        .collect();
    let receiver = IrExpr::RefField {
        target: Box::new(IrExpr::This {
            ty: TypeRef::Class(class),
        }),
        field,
        ty: field_ty,
    };
    let call = IrExpr::Call {
        target: Box::new(receiver),
        method: target,
        args,
        ty: return_type,
    };
    let block = if return_type.is_void() {
        IrStmt::Block(vec![IrStmt::Expression(call), IrStmt::Return { value: None }])
    } else {
        IrStmt::Block(vec![IrStmt::Return { value: Some(call) }])
    };

    ctx.table.class_mut(class).methods.push(MethodSymbol {
        modifiers: Modifiers::PUBLIC,
        name,
        params: params.clone(),
        return_type,
        body: Some(IrBody {
            frame: FrameSnapshot {
                entries: params,
                closed: false,
                depth: 0,
            },
            block,
        }),
    });
}
