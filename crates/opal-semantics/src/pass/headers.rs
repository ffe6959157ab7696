//! Pass 2: type hierarchy, member signatures, cycle detection.

use rustc_hash::FxHashSet;

use opal_syntax::{
    ClassDecl, CompilationUnit, InterfaceDecl, Location, Modifiers, Parameter, TopLevel, TypeSpec,
};

use crate::error::SemanticErrorKind;
use crate::ir::DeclTarget;
use crate::pass::AnalysisContext;
use crate::resolver::NameResolver;
use crate::symbols::{ClassKind, ConstructorRef, ConstructorSymbol, FieldRef, FieldSymbol, MethodRef, MethodSymbol};
use crate::types::{ClassId, TypeRef};

pub(crate) fn run(ctx: &mut AnalysisContext, units: &[CompilationUnit]) {
    for (unit_index, unit) in units.iter().enumerate() {
        ctx.reporter.set_source_file(&unit.source_file);
        let resolver = ctx.units[unit_index].resolver.clone();
        for toplevel in &unit.toplevels {
            match toplevel {
                TopLevel::Class(decl) => class_header(ctx, &resolver, decl),
                TopLevel::Interface(decl) => interface_header(ctx, &resolver, decl),
                _ => {}
            }
        }
        main_class_members(ctx, &resolver, unit_index, unit);
    }

    check_cycles(ctx, units);
}

fn class_id_of(ctx: &AnalysisContext, node: opal_syntax::NodeId) -> Option<ClassId> {
    match ctx.decl_map.target_of(node) {
        Some(DeclTarget::Class(id)) => Some(id),
        _ => None,
    }
}

fn class_header(ctx: &mut AnalysisContext, resolver: &NameResolver, decl: &ClassDecl) {
    // dropped as a duplicate in pass 1
    let Some(id) = class_id_of(ctx, decl.node_id) else {
        return;
    };

    let super_class = match &decl.super_class {
        Some(spec) => resolve_parent(ctx, resolver, spec, decl.loc, ClassKind::Class),
        None => Some(ctx.platform.object),
    };
    ctx.table.class_mut(id).super_class = Some(super_class.unwrap_or(ctx.platform.object));

    for spec in &decl.interfaces {
        if let Some(iface) = resolve_parent(ctx, resolver, spec, decl.loc, ClassKind::Interface) {
            ctx.table.class_mut(id).interfaces.push(iface);
        }
    }

    for field in &decl.fields {
        let Some(ty) = resolve_type(ctx, resolver, &field.type_spec, field.loc) else {
            continue;
        };
        if field.modifiers.is_delegate() && !is_interface_type(ctx, ty) {
            ctx.report(
                SemanticErrorKind::InterfaceRequired {
                    found: ctx.table.type_name(ty),
                },
                field.loc,
            );
        }
        let index = ctx.table.class(id).fields.len();
        ctx.table.class_mut(id).fields.push(FieldSymbol {
            modifiers: field.modifiers,
            name: field.name.clone(),
            ty,
        });
        ctx.decl_map
            .bind(field.node_id, DeclTarget::Field(FieldRef { class: id, index }));
    }

    for method in &decl.methods {
        let Some(params) = resolve_params(ctx, resolver, &method.params) else {
            continue;
        };
        let Some(return_type) = resolve_return(ctx, resolver, &method.return_type, method.loc)
        else {
            continue;
        };
        let index = ctx.table.class(id).methods.len();
        ctx.table.class_mut(id).methods.push(MethodSymbol {
            modifiers: method.modifiers,
            name: method.name.clone(),
            params,
            return_type,
            body: None,
        });
        ctx.decl_map.bind(
            method.node_id,
            DeclTarget::Method(MethodRef { class: id, index }),
        );
    }

    for ctor in &decl.constructors {
        let Some(params) = resolve_params(ctx, resolver, &ctor.params) else {
            continue;
        };
        let index = ctx.table.class(id).constructors.len();
        ctx.table.class_mut(id).constructors.push(ConstructorSymbol {
            modifiers: ctor.modifiers,
            params,
            super_call: None,
            body: None,
        });
        ctx.decl_map.bind(
            ctor.node_id,
            DeclTarget::Constructor(ConstructorRef { class: id, index }),
        );
    }

    add_default_constructor(ctx, id);
}

fn interface_header(ctx: &mut AnalysisContext, resolver: &NameResolver, decl: &InterfaceDecl) {
    let Some(id) = class_id_of(ctx, decl.node_id) else {
        return;
    };
    ctx.table.class_mut(id).super_class = Some(ctx.platform.object);
    for spec in &decl.interfaces {
        if let Some(iface) = resolve_parent(ctx, resolver, spec, decl.loc, ClassKind::Interface) {
            ctx.table.class_mut(id).interfaces.push(iface);
        }
    }
    for method in &decl.methods {
        let Some(params) = resolve_params(ctx, resolver, &method.params) else {
            continue;
        };
        let Some(return_type) = resolve_return(ctx, resolver, &method.return_type, method.loc)
        else {
            continue;
        };
        let index = ctx.table.class(id).methods.len();
        ctx.table.class_mut(id).methods.push(MethodSymbol {
            modifiers: Modifiers::PUBLIC | Modifiers::ABSTRACT,
            name: method.name.clone(),
            params,
            return_type,
            body: None,
        });
        ctx.decl_map.bind(
            method.node_id,
            DeclTarget::Method(MethodRef { class: id, index }),
        );
    }
}

/// Top-level functions, globals and the entry points attach to the unit's
/// synthetic main class.
fn main_class_members(
    ctx: &mut AnalysisContext,
    resolver: &NameResolver,
    unit_index: usize,
    unit: &CompilationUnit,
) {
    let Some(main) = ctx.units[unit_index].main_class else {
        return;
    };
    for toplevel in &unit.toplevels {
        match toplevel {
            TopLevel::Function(decl) => {
                let Some(params) = resolve_params(ctx, resolver, &decl.params) else {
                    continue;
                };
                let Some(return_type) = resolve_return(ctx, resolver, &decl.return_type, decl.loc)
                else {
                    continue;
                };
                let index = ctx.table.class(main).methods.len();
                ctx.table.class_mut(main).methods.push(MethodSymbol {
                    modifiers: decl.modifiers | Modifiers::PUBLIC,
                    name: decl.name.clone(),
                    params,
                    return_type,
                    body: None,
                });
                ctx.decl_map.bind(
                    decl.node_id,
                    DeclTarget::Method(MethodRef { class: main, index }),
                );
            }
            TopLevel::GlobalVar(decl) => {
                let Some(ty) = resolve_type(ctx, resolver, &decl.type_spec, decl.loc) else {
                    continue;
                };
                let index = ctx.table.class(main).fields.len();
                ctx.table.class_mut(main).fields.push(FieldSymbol {
                    modifiers: decl.modifiers | Modifiers::PUBLIC,
                    name: decl.name.clone(),
                    ty,
                });
                ctx.decl_map
                    .bind(decl.node_id, DeclTarget::Field(FieldRef { class: main, index }));
            }
            _ => {}
        }
    }
    if ctx.units[unit_index].has_statements {
        let args = ctx.string_array();
        let main_sym = ctx.table.class_mut(main);
        main_sym.methods.push(MethodSymbol {
            modifiers: Modifiers::PUBLIC,
            name: "run".into(),
            params: vec![args],
            return_type: TypeRef::VOID,
            body: None,
        });
        main_sym.methods.push(MethodSymbol {
            modifiers: Modifiers::PUBLIC | Modifiers::STATIC,
            name: "main".into(),
            params: vec![args],
            return_type: TypeRef::VOID,
            body: None,
        });
    }
    add_default_constructor(ctx, main);
}

fn add_default_constructor(ctx: &mut AnalysisContext, id: ClassId) {
    let symbol = ctx.table.class_mut(id);
    if symbol.kind == ClassKind::Class && symbol.constructors.is_empty() {
        symbol.constructors.push(ConstructorSymbol {
            modifiers: Modifiers::PUBLIC,
            params: vec![],
            super_call: None,
            body: None,
        });
    }
}

fn resolve_type(
    ctx: &mut AnalysisContext,
    resolver: &NameResolver,
    spec: &TypeSpec,
    loc: Location,
) -> Option<TypeRef> {
    match resolver.resolve(spec, &mut ctx.table) {
        Some(ty) => Some(ty),
        None => {
            ctx.report(
                SemanticErrorKind::ClassNotFound {
                    name: spec.to_string(),
                },
                loc,
            );
            None
        }
    }
}

fn resolve_return(
    ctx: &mut AnalysisContext,
    resolver: &NameResolver,
    spec: &Option<TypeSpec>,
    loc: Location,
) -> Option<TypeRef> {
    match spec {
        Some(spec) => resolve_type(ctx, resolver, spec, loc),
        None => Some(TypeRef::VOID),
    }
}

/// All parameter types, or `None` if any failed to resolve; the member is
/// then dropped, its diagnostic already reported.
fn resolve_params(
    ctx: &mut AnalysisContext,
    resolver: &NameResolver,
    params: &[Parameter],
) -> Option<Vec<TypeRef>> {
    params
        .iter()
        .map(|p| resolve_type(ctx, resolver, &p.type_spec, p.loc))
        .collect()
}

/// Resolve a superclass or super-interface reference, checking its kind.
/// A kind mismatch is reported but the edge is still installed.
fn resolve_parent(
    ctx: &mut AnalysisContext,
    resolver: &NameResolver,
    spec: &TypeSpec,
    loc: Location,
    expected: ClassKind,
) -> Option<ClassId> {
    let ty = resolve_type(ctx, resolver, spec, loc)?;
    let TypeRef::Class(id) = ty else {
        ctx.report(
            SemanticErrorKind::IllegalInheritance {
                name: ctx.table.type_name(ty),
            },
            loc,
        );
        return None;
    };
    if ctx.table.class(id).kind != expected {
        ctx.report(
            SemanticErrorKind::IllegalInheritance {
                name: ctx.table.class(id).name.clone(),
            },
            loc,
        );
    }
    Some(id)
}

fn is_interface_type(ctx: &AnalysisContext, ty: TypeRef) -> bool {
    matches!(ty, TypeRef::Class(id) if ctx.table.class(id).is_interface())
}

/// Iterative reachability check: a class whose hierarchy reaches back to
/// itself is cyclic. Offending edges are cut back to the root class so
/// later hierarchy walks terminate.
fn check_cycles(ctx: &mut AnalysisContext, _units: &[CompilationUnit]) {
    let cyclic: Vec<ClassId> = ctx
        .source_classes
        .iter()
        .copied()
        .filter(|&id| reaches_itself(ctx, id))
        .collect();
    for id in cyclic {
        let name = ctx.table.class(id).name.clone();
        let file = ctx.table.class(id).source_file.clone().unwrap_or_default();
        let loc = ctx
            .class_locations
            .get(&id)
            .copied()
            .unwrap_or_else(Location::generated);
        ctx.reporter.set_source_file(&file);
        ctx.report(SemanticErrorKind::CyclicInheritance { name }, loc);
        let object = ctx.platform.object;
        let symbol = ctx.table.class_mut(id);
        symbol.super_class = Some(object);
        symbol.interfaces.clear();
    }
}

fn reaches_itself(ctx: &AnalysisContext, start: ClassId) -> bool {
    let mut stack = vec![start];
    let mut visited = FxHashSet::default();
    while let Some(id) = stack.pop() {
        let symbol = ctx.table.class(id);
        let parents = symbol.super_class.into_iter().chain(symbol.interfaces.iter().copied());
        for next in parents {
            if next == start {
                return true;
            }
            if visited.insert(next) {
                stack.push(next);
            }
        }
    }
    false
}
