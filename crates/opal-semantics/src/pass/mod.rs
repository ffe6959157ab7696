//! The analysis passes.
//!
//! Four passes run to completion, in order, over every unit:
//!
//! 1. class table construction ([`class_table`]): every declared class and
//!    interface gets a symbol and every unit gets its import scope;
//! 2. header analysis ([`headers`]): hierarchy edges, member signatures,
//!    cycle detection;
//! 3. duplication checking and delegation synthesis ([`duplication`]);
//! 4. type checking ([`typing`]): member bodies become typed IR.
//!
//! Diagnostics accumulate across all passes; the session fails as a whole
//! if any were reported.

pub(crate) mod class_table;
pub(crate) mod duplication;
pub(crate) mod headers;
pub(crate) mod typing;

use rustc_hash::FxHashMap;

use opal_syntax::{CompilationUnit, Location};

use crate::config::CompilerConfig;
use crate::error::{CompilationFailure, SemanticErrorKind};
use crate::ir::DeclMap;
use crate::platform::Platform;
use crate::reporter::Reporter;
use crate::resolver::NameResolver;
use crate::symbols::ClassTable;
use crate::types::{ClassId, TypeRef};

/// Per-unit analysis state: its import scope and, when the unit has
/// non-type top-levels, the synthesized main class.
#[derive(Debug)]
pub struct UnitScope {
    pub resolver: NameResolver,
    pub main_class: Option<ClassId>,
    /// The unit declares bare top-level statements.
    pub has_statements: bool,
}

/// Shared mutable state threaded through the passes.
#[derive(Debug)]
pub struct AnalysisContext {
    pub table: ClassTable,
    pub platform: Platform,
    pub decl_map: DeclMap,
    pub reporter: Reporter,
    pub units: Vec<UnitScope>,
    /// Source classes in declaration order, synthesized main classes last
    /// per unit.
    pub source_classes: Vec<ClassId>,
    pub class_locations: FxHashMap<ClassId, Location>,
}

impl AnalysisContext {
    fn new(config: &CompilerConfig) -> Self {
        let mut table = ClassTable::new();
        let platform = Platform::install(&mut table);
        Self {
            table,
            platform,
            decl_map: DeclMap::default(),
            reporter: Reporter::new(config),
            units: Vec::new(),
            source_classes: Vec::new(),
            class_locations: FxHashMap::default(),
        }
    }

    pub fn report(&mut self, kind: SemanticErrorKind, location: Location) {
        self.reporter.report(kind, location);
    }

    /// `opal.lang.String[]`, the parameter type of entry points.
    pub fn string_array(&mut self) -> TypeRef {
        let string = self.platform.string;
        TypeRef::Array(self.table.load_array(TypeRef::Class(string), 1))
    }
}

/// Result of a successful analysis.
#[derive(Debug)]
pub struct Analysis {
    pub table: ClassTable,
    pub platform: Platform,
    /// Source-defined classes, in declaration order.
    pub classes: Vec<ClassId>,
    pub decl_map: DeclMap,
}

/// The pass driver.
#[derive(Debug, Default)]
pub struct Analyzer {
    config: CompilerConfig,
}

impl Analyzer {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Analyze all units together. All four passes always run to
    /// completion so diagnostics from later passes are not masked by
    /// earlier ones.
    pub fn process(&self, units: &[CompilationUnit]) -> Result<Analysis, CompilationFailure> {
        let mut ctx = AnalysisContext::new(&self.config);
        class_table::run(&mut ctx, units);
        headers::run(&mut ctx, units);
        duplication::run(&mut ctx, units);
        typing::run(&mut ctx, units);
        if ctx.reporter.has_errors() {
            return Err(CompilationFailure {
                errors: ctx.reporter.into_errors(),
            });
        }
        Ok(Analysis {
            table: ctx.table,
            platform: ctx.platform,
            classes: ctx.source_classes,
            decl_map: ctx.decl_map,
        })
    }
}
