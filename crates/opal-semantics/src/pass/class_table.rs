//! Pass 1: build the class table and per-unit import scopes.

use opal_syntax::{CompilationUnit, Location, Modifiers, TopLevel};

use crate::error::SemanticErrorKind;
use crate::ir::DeclTarget;
use crate::pass::{AnalysisContext, UnitScope};
use crate::platform::DEFAULT_NAMESPACES;
use crate::resolver::{ImportItem, ImportList, NameResolver};
use crate::symbols::{ClassKind, ClassSymbol};
use crate::types::ClassId;

pub(crate) fn run(ctx: &mut AnalysisContext, units: &[CompilationUnit]) {
    for unit in units {
        ctx.reporter.set_source_file(&unit.source_file);
        let resolver = NameResolver::new(import_scope(unit));
        let mut scope = UnitScope {
            resolver,
            main_class: None,
            has_statements: false,
        };

        for toplevel in &unit.toplevels {
            match toplevel {
                TopLevel::Class(decl) => {
                    let symbol = source_class(
                        ClassKind::Class,
                        decl.modifiers,
                        &qualify(unit, &decl.name),
                        unit,
                    );
                    if let Some(id) = install(ctx, symbol, decl.loc) {
                        ctx.decl_map.bind(decl.node_id, DeclTarget::Class(id));
                    }
                }
                TopLevel::Interface(decl) => {
                    let symbol = source_class(
                        ClassKind::Interface,
                        decl.modifiers,
                        &qualify(unit, &decl.name),
                        unit,
                    );
                    if let Some(id) = install(ctx, symbol, decl.loc) {
                        ctx.decl_map.bind(decl.node_id, DeclTarget::Class(id));
                    }
                }
                TopLevel::Statement(_) => scope.has_statements = true,
                TopLevel::Function(_) | TopLevel::GlobalVar(_) => {}
            }
        }

        // functions, globals and bare statements need a class to live on
        let needs_main = unit.toplevels.iter().any(|t| {
            matches!(
                t,
                TopLevel::Function(_) | TopLevel::GlobalVar(_) | TopLevel::Statement(_)
            )
        });
        if needs_main {
            let name = qualify(unit, &main_class_name(&unit.source_file));
            let mut symbol = source_class(ClassKind::Class, Modifiers::PUBLIC, &name, unit);
            symbol.super_class = Some(ctx.platform.object);
            scope.main_class = install(ctx, symbol, first_nontype_location(unit));
        }

        ctx.units.push(scope);
    }
}

/// Implicit namespaces, the unit's own namespace, then explicit imports.
/// The resolver scans single-type items before on-demand items, so the
/// implicit wildcards never shadow an explicit single-type import.
fn import_scope(unit: &CompilationUnit) -> ImportList {
    let mut imports = ImportList::new();
    for ns in DEFAULT_NAMESPACES {
        imports.add(ImportItem::on_demand(ns));
    }
    imports.add(ImportItem::on_demand(
        unit.module_name.as_deref().unwrap_or(""),
    ));
    for decl in &unit.imports {
        imports.add(ImportItem {
            simple_name: decl.simple_name.clone(),
            fqcn: decl.fqcn.clone(),
        });
    }
    imports
}

fn qualify(unit: &CompilationUnit, simple: &str) -> String {
    match &unit.module_name {
        Some(module) => format!("{module}.{simple}"),
        None => simple.to_string(),
    }
}

/// `dir/fib.opl` names its synthetic class `fibMain`.
fn main_class_name(source_file: &str) -> String {
    let base = source_file
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source_file);
    let stem = base.split('.').next().unwrap_or(base);
    format!("{stem}Main")
}

fn source_class(
    kind: ClassKind,
    modifiers: Modifiers,
    name: &str,
    unit: &CompilationUnit,
) -> ClassSymbol {
    let mut symbol = ClassSymbol::new(kind, modifiers, name);
    symbol.source_file = Some(unit.source_file.clone());
    symbol.is_source = true;
    symbol
}

/// First definition wins; later ones are reported and dropped.
fn install(ctx: &mut AnalysisContext, symbol: ClassSymbol, loc: Location) -> Option<ClassId> {
    let name = symbol.name.clone();
    match ctx.table.insert_class(symbol) {
        Ok(id) => {
            ctx.source_classes.push(id);
            ctx.class_locations.insert(id, loc);
            Some(id)
        }
        Err(_) => {
            ctx.report(SemanticErrorKind::DuplicateClass { name }, loc);
            None
        }
    }
}

fn first_nontype_location(unit: &CompilationUnit) -> Location {
    unit.toplevels
        .iter()
        .find_map(|t| match t {
            TopLevel::Function(d) => Some(d.loc),
            TopLevel::GlobalVar(d) => Some(d.loc),
            TopLevel::Statement(s) => Some(s.location()),
            _ => None,
        })
        .unwrap_or_else(Location::generated)
}
