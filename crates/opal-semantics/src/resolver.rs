//! Name resolution against a unit's import scope.

use opal_syntax::{TypeName, TypeSpec};

use crate::symbols::ClassTable;
use crate::types::{BasicType, ClassId, TypeRef};

/// One entry of an import scope. `simple_name == "*"` imports a whole
/// namespace; its `fqcn` then ends in `*`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportItem {
    pub simple_name: String,
    pub fqcn: String,
}

impl ImportItem {
    pub fn single(simple_name: impl Into<String>, fqcn: impl Into<String>) -> Self {
        Self {
            simple_name: simple_name.into(),
            fqcn: fqcn.into(),
        }
    }

    /// On-demand import of `namespace`. An empty namespace imports the
    /// default package.
    pub fn on_demand(namespace: &str) -> Self {
        let fqcn = if namespace.is_empty() {
            "*".to_string()
        } else {
            format!("{namespace}.*")
        };
        Self {
            simple_name: "*".to_string(),
            fqcn,
        }
    }

    pub fn is_on_demand(&self) -> bool {
        self.simple_name == "*"
    }

    /// The fully qualified candidate this item proposes for `name`, if any.
    pub fn candidate(&self, name: &str) -> Option<String> {
        if self.simple_name == "*" {
            let prefix = &self.fqcn[..self.fqcn.len() - 1];
            Some(format!("{prefix}{name}"))
        } else if self.simple_name == name {
            Some(self.fqcn.clone())
        } else {
            None
        }
    }
}

/// Ordered import scope of one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct ImportList {
    items: Vec<ImportItem>,
}

impl ImportList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: ImportItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[ImportItem] {
        &self.items
    }
}

/// Resolves source type names to semantic types through an import scope.
#[derive(Debug, Clone)]
pub struct NameResolver {
    imports: ImportList,
}

impl NameResolver {
    pub fn new(imports: ImportList) -> Self {
        Self { imports }
    }

    /// Resolve a class name. Qualified names bypass the import scope.
    /// Simple names go through two phases: every single-type import in
    /// declaration order, then every on-demand import in declaration
    /// order. First hit wins, so a single-type import always beats a
    /// wildcard no matter where it was written.
    pub fn resolve_class(&self, name: &str, table: &ClassTable) -> Option<ClassId> {
        if name.contains('.') {
            return table.lookup(name);
        }
        for on_demand in [false, true] {
            for item in self.imports.items() {
                if item.is_on_demand() != on_demand {
                    continue;
                }
                if let Some(candidate) = item.candidate(name) {
                    if let Some(id) = table.lookup(&candidate) {
                        return Some(id);
                    }
                }
            }
        }
        None
    }

    /// Resolve a full type specifier, interning array types as needed.
    pub fn resolve(&self, spec: &TypeSpec, table: &mut ClassTable) -> Option<TypeRef> {
        let base = match &spec.name {
            TypeName::Primitive(kind) => TypeRef::Basic(BasicType::from_primitive(*kind)),
            TypeName::Named(name) => TypeRef::Class(self.resolve_class(name, table)?),
        };
        if spec.dims == 0 {
            Some(base)
        } else {
            Some(TypeRef::Array(table.load_array(base, spec.dims)))
        }
    }
}
