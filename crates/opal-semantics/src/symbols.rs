//! Class symbols, the class table, member lookup and overload resolution.
//!
//! Symbols are stored in flat arenas indexed by [`ClassId`]/[`ArrayId`];
//! everything else holds copyable handles. Members live inline on their
//! class and are referenced by `(class, index)` pairs.

use rustc_hash::FxHashMap;

use opal_syntax::Modifiers;

use crate::ir::{IrBody, IrExpr};
use crate::types::{ArrayId, BasicType, ClassId, TypeRef};

/// Handle to a method of a class in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub class: ClassId,
    pub index: usize,
}

/// Handle to a field of a class in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub class: ClassId,
    pub index: usize,
}

/// Handle to a constructor of a class in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstructorRef {
    pub class: ClassId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
}

#[derive(Debug, Clone)]
pub struct FieldSymbol {
    pub modifiers: Modifiers,
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone)]
pub struct MethodSymbol {
    pub modifiers: Modifiers,
    pub name: String,
    pub params: Vec<TypeRef>,
    pub return_type: TypeRef,
    /// Filled by the body-checking pass; absent for abstract and external
    /// methods.
    pub body: Option<IrBody>,
}

#[derive(Debug, Clone)]
pub struct ConstructorSymbol {
    pub modifiers: Modifiers,
    pub params: Vec<TypeRef>,
    /// Resolved superclass constructor and its arguments.
    pub super_call: Option<(ConstructorRef, Vec<IrExpr>)>,
    pub body: Option<IrBody>,
}

/// A class or interface.
#[derive(Debug, Clone)]
pub struct ClassSymbol {
    pub kind: ClassKind,
    pub modifiers: Modifiers,
    /// Fully qualified name.
    pub name: String,
    pub super_class: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub fields: Vec<FieldSymbol>,
    pub methods: Vec<MethodSymbol>,
    pub constructors: Vec<ConstructorSymbol>,
    pub source_file: Option<String>,
    /// True for classes defined by the compiled sources, false for
    /// platform-supplied ones.
    pub is_source: bool,
}

impl ClassSymbol {
    pub fn new(kind: ClassKind, modifiers: Modifiers, name: impl Into<String>) -> Self {
        Self {
            kind,
            modifiers,
            name: name.into(),
            super_class: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            source_file: None,
            is_source: false,
        }
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Name without the package prefix.
    pub fn simple_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(i) => &self.name[i + 1..],
            None => &self.name,
        }
    }

    /// Package prefix, empty for the default package.
    pub fn package(&self) -> &str {
        match self.name.rfind('.') {
            Some(i) => &self.name[..i],
            None => "",
        }
    }
}

/// An interned array type. `base` is the innermost component type.
#[derive(Debug, Clone)]
pub struct ArraySymbol {
    pub base: TypeRef,
    pub dims: usize,
}

/// Result of overload resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<R> {
    Found(R),
    NotFound,
    Ambiguous(Vec<R>),
}

/// All classes, interfaces and interned array types of one session.
#[derive(Debug, Default)]
pub struct ClassTable {
    classes: Vec<ClassSymbol>,
    by_name: FxHashMap<String, ClassId>,
    arrays: Vec<ArraySymbol>,
    array_index: FxHashMap<(TypeRef, usize), ArrayId>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class under its fully qualified name. On a name collision the
    /// existing id is returned as the error.
    pub fn insert_class(&mut self, symbol: ClassSymbol) -> Result<ClassId, ClassId> {
        if let Some(&existing) = self.by_name.get(&symbol.name) {
            return Err(existing);
        }
        let id = ClassId(self.classes.len() as u32);
        self.by_name.insert(symbol.name.clone(), id);
        self.classes.push(symbol);
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn class(&self, id: ClassId) -> &ClassSymbol {
        &self.classes[id.index()]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassSymbol {
        &mut self.classes[id.index()]
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn class_ids(&self) -> impl Iterator<Item = ClassId> {
        (0..self.classes.len() as u32).map(ClassId)
    }

    pub fn method(&self, r: MethodRef) -> &MethodSymbol {
        &self.classes[r.class.index()].methods[r.index]
    }

    pub fn method_mut(&mut self, r: MethodRef) -> &mut MethodSymbol {
        &mut self.classes[r.class.index()].methods[r.index]
    }

    pub fn field(&self, r: FieldRef) -> &FieldSymbol {
        &self.classes[r.class.index()].fields[r.index]
    }

    pub fn constructor(&self, r: ConstructorRef) -> &ConstructorSymbol {
        &self.classes[r.class.index()].constructors[r.index]
    }

    pub fn constructor_mut(&mut self, r: ConstructorRef) -> &mut ConstructorSymbol {
        &mut self.classes[r.class.index()].constructors[r.index]
    }

    /// Intern the array type with the given innermost component and
    /// dimension. Equal array types always share an id.
    pub fn load_array(&mut self, base: TypeRef, dims: usize) -> ArrayId {
        if let Some(&id) = self.array_index.get(&(base, dims)) {
            return id;
        }
        let id = ArrayId(self.arrays.len() as u32);
        self.arrays.push(ArraySymbol { base, dims });
        self.array_index.insert((base, dims), id);
        id
    }

    pub fn array(&self, id: ArrayId) -> &ArraySymbol {
        &self.arrays[id.index()]
    }

    /// Type yielded by indexing into the given array type once.
    pub fn element_type(&mut self, id: ArrayId) -> TypeRef {
        let ArraySymbol { base, dims } = *self.array(id);
        if dims == 1 {
            base
        } else {
            TypeRef::Array(self.load_array(base, dims - 1))
        }
    }

    /// Human-readable name of a type, for diagnostics.
    pub fn type_name(&self, ty: TypeRef) -> String {
        match ty {
            TypeRef::Basic(b) => b.name().to_string(),
            TypeRef::Class(id) => self.class(id).name.clone(),
            TypeRef::Array(id) => {
                let a = self.array(id);
                let mut s = self.type_name(a.base);
                for _ in 0..a.dims {
                    s.push_str("[]");
                }
                s
            }
            TypeRef::Null => "null".to_string(),
        }
    }

    // ----- hierarchy ------------------------------------------------------

    /// Whether `sup` is reachable from `sub` through superclass and
    /// interface edges (reflexively).
    pub fn class_extends(&self, sup: ClassId, sub: ClassId) -> bool {
        if sup == sub {
            return true;
        }
        let symbol = self.class(sub);
        if let Some(s) = symbol.super_class {
            if self.class_extends(sup, s) {
                return true;
            }
        }
        symbol
            .interfaces
            .iter()
            .any(|&i| self.class_extends(sup, i))
    }

    /// Whether a value of type `sub` may stand where `sup` is required.
    pub fn is_super_type(&self, sup: TypeRef, sub: TypeRef) -> bool {
        match (sup, sub) {
            (TypeRef::Basic(a), TypeRef::Basic(b)) => a.widens_from(b),
            (TypeRef::Class(a), TypeRef::Class(b)) => self.class_extends(a, b),
            (TypeRef::Class(_) | TypeRef::Array(_), TypeRef::Null) => true,
            (TypeRef::Array(a), TypeRef::Array(b)) => {
                let (aa, ab) = (self.array(a), self.array(b));
                aa.dims == ab.dims
                    && match (aa.base, ab.base) {
                        // reference components are covariant
                        (TypeRef::Class(x), TypeRef::Class(y)) => self.class_extends(x, y),
                        (x, y) => x == y,
                    }
            }
            _ => false,
        }
    }

    pub fn is_assignable(&self, to: TypeRef, from: TypeRef) -> bool {
        self.is_super_type(to, from)
    }

    // ----- member lookup --------------------------------------------------

    /// Exact field lookup, walking superclasses then interfaces.
    pub fn find_field(&self, class: ClassId, name: &str) -> Option<FieldRef> {
        let symbol = self.class(class);
        if let Some(index) = symbol.fields.iter().position(|f| f.name == name) {
            return Some(FieldRef { class, index });
        }
        if let Some(s) = symbol.super_class {
            if let Some(found) = self.find_field(s, name) {
                return Some(found);
            }
        }
        symbol
            .interfaces
            .iter()
            .find_map(|&i| self.find_field(i, name))
    }

    /// All methods with the given name visible on `class`, deduplicated by
    /// signature; a subclass declaration shadows an inherited one.
    pub fn methods_named(&self, class: ClassId, name: &str) -> Vec<MethodRef> {
        let mut out = Vec::new();
        let mut seen: Vec<Vec<TypeRef>> = Vec::new();
        self.collect_methods_named(class, name, &mut out, &mut seen);
        out
    }

    fn collect_methods_named(
        &self,
        class: ClassId,
        name: &str,
        out: &mut Vec<MethodRef>,
        seen: &mut Vec<Vec<TypeRef>>,
    ) {
        let symbol = self.class(class);
        for (index, m) in symbol.methods.iter().enumerate() {
            if m.name == name && !seen.iter().any(|s| s[..] == m.params[..]) {
                seen.push(m.params.clone());
                out.push(MethodRef { class, index });
            }
        }
        if let Some(s) = symbol.super_class {
            self.collect_methods_named(s, name, out, seen);
        }
        for &i in &symbol.interfaces {
            self.collect_methods_named(i, name, out, seen);
        }
    }

    /// All methods of an interface and its super-interfaces, deduplicated
    /// by signature.
    pub fn interface_methods(&self, iface: ClassId) -> Vec<MethodRef> {
        let mut out = Vec::new();
        let mut seen: Vec<(String, Vec<TypeRef>)> = Vec::new();
        self.collect_interface_methods(iface, &mut out, &mut seen);
        out
    }

    fn collect_interface_methods(
        &self,
        iface: ClassId,
        out: &mut Vec<MethodRef>,
        seen: &mut Vec<(String, Vec<TypeRef>)>,
    ) {
        let symbol = self.class(iface);
        for (index, m) in symbol.methods.iter().enumerate() {
            if !seen.iter().any(|(n, p)| *n == m.name && p[..] == m.params[..]) {
                seen.push((m.name.clone(), m.params.clone()));
                out.push(MethodRef { class: iface, index });
            }
        }
        for &i in &symbol.interfaces {
            self.collect_interface_methods(i, out, seen);
        }
    }

    /// Overload resolution for `name(args)` on `class`.
    ///
    /// Applicable candidates are collected along the hierarchy; when more
    /// than one applies the pairwise most specific wins, and a tie is
    /// reported as ambiguous.
    pub fn find_method(&self, class: ClassId, name: &str, args: &[TypeRef]) -> Lookup<MethodRef> {
        let mut candidates: Vec<MethodRef> = self
            .methods_named(class, name)
            .into_iter()
            .filter(|&r| self.params_applicable(&self.method(r).params, args))
            .collect();
        self.disambiguate(&mut candidates, |r| self.method(r).params.clone())
    }

    /// Overload resolution for `new class(args)`.
    pub fn find_constructor(&self, class: ClassId, args: &[TypeRef]) -> Lookup<ConstructorRef> {
        let mut candidates: Vec<ConstructorRef> = (0..self.class(class).constructors.len())
            .map(|index| ConstructorRef { class, index })
            .filter(|&r| self.params_applicable(&self.constructor(r).params, args))
            .collect();
        self.disambiguate(&mut candidates, |r| self.constructor(r).params.clone())
    }

    fn params_applicable(&self, params: &[TypeRef], args: &[TypeRef]) -> bool {
        params.len() == args.len()
            && params
                .iter()
                .zip(args)
                .all(|(&p, &a)| self.is_assignable(p, a))
    }

    /// Each parameter of `narrow` is assignable to the matching parameter
    /// of `wide`.
    fn params_all_assignable(&self, wide: &[TypeRef], narrow: &[TypeRef]) -> bool {
        wide.len() == narrow.len()
            && wide
                .iter()
                .zip(narrow)
                .all(|(&w, &n)| self.is_assignable(w, n))
    }

    fn disambiguate<R: Copy>(
        &self,
        candidates: &mut Vec<R>,
        params_of: impl Fn(R) -> Vec<TypeRef>,
    ) -> Lookup<R> {
        match candidates.len() {
            0 => Lookup::NotFound,
            1 => Lookup::Found(candidates[0]),
            _ => {
                // most specific first
                candidates.sort_by(|&a, &b| {
                    let (pa, pb) = (params_of(a), params_of(b));
                    let a_narrower = self.params_all_assignable(&pb, &pa);
                    let b_narrower = self.params_all_assignable(&pa, &pb);
                    b_narrower.cmp(&a_narrower)
                });
                let first = params_of(candidates[0]);
                let second = params_of(candidates[1]);
                let strictly = self.params_all_assignable(&second, &first)
                    && !self.params_all_assignable(&first, &second);
                if strictly {
                    Lookup::Found(candidates[0])
                } else {
                    Lookup::Ambiguous(candidates.clone())
                }
            }
        }
    }

    // ----- accessibility --------------------------------------------------

    /// A class is visible everywhere in its own package, and outside it
    /// unless marked internal.
    pub fn is_class_accessible(&self, target: ClassId, context: ClassId) -> bool {
        let (t, c) = (self.class(target), self.class(context));
        t.package() == c.package() || !t.modifiers.is_internal()
    }

    /// Member accessibility from `context`.
    pub fn is_member_accessible(
        &self,
        modifiers: Modifiers,
        declaring: ClassId,
        context: ClassId,
    ) -> bool {
        if declaring == context {
            return true;
        }
        if self.class(declaring).package() == self.class(context).package() {
            return true;
        }
        if modifiers.is_public() {
            return true;
        }
        modifiers.is_protected() && self.class_extends(declaring, context)
    }
}

/// Default value for a basic type; used to pad missing initializers and
/// synthesized returns.
pub fn default_value(ty: TypeRef) -> Option<IrExpr> {
    match ty {
        TypeRef::Basic(BasicType::Void) => None,
        TypeRef::Basic(BasicType::Byte)
        | TypeRef::Basic(BasicType::Short)
        | TypeRef::Basic(BasicType::Int) => Some(IrExpr::int(0)),
        TypeRef::Basic(BasicType::Char) => Some(IrExpr::Char { value: '\0' }),
        TypeRef::Basic(BasicType::Long) => Some(IrExpr::Long { value: 0 }),
        TypeRef::Basic(BasicType::Float) => Some(IrExpr::Float { value: 0.0 }),
        TypeRef::Basic(BasicType::Double) => Some(IrExpr::Double { value: 0.0 }),
        TypeRef::Basic(BasicType::Boolean) => Some(IrExpr::Bool { value: false }),
        TypeRef::Class(_) | TypeRef::Array(_) | TypeRef::Null => Some(IrExpr::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_chain() -> (ClassTable, ClassId, ClassId, ClassId) {
        let mut table = ClassTable::new();
        let object = table
            .insert_class(ClassSymbol::new(
                ClassKind::Class,
                Modifiers::PUBLIC,
                "lang.Object",
            ))
            .unwrap();
        let mut animal = ClassSymbol::new(ClassKind::Class, Modifiers::PUBLIC, "zoo.Animal");
        animal.super_class = Some(object);
        let animal = table.insert_class(animal).unwrap();
        let mut cat = ClassSymbol::new(ClassKind::Class, Modifiers::PUBLIC, "zoo.Cat");
        cat.super_class = Some(animal);
        let cat = table.insert_class(cat).unwrap();
        (table, object, animal, cat)
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut table = ClassTable::new();
        let first = table
            .insert_class(ClassSymbol::new(ClassKind::Class, Modifiers::PUBLIC, "A"))
            .unwrap();
        let err = table
            .insert_class(ClassSymbol::new(ClassKind::Class, Modifiers::PUBLIC, "A"))
            .unwrap_err();
        assert_eq!(first, err);
    }

    #[test]
    fn super_type_walks_the_chain() {
        let (table, object, animal, cat) = table_with_chain();
        assert!(table.is_super_type(TypeRef::Class(object), TypeRef::Class(cat)));
        assert!(table.is_super_type(TypeRef::Class(animal), TypeRef::Class(cat)));
        assert!(!table.is_super_type(TypeRef::Class(cat), TypeRef::Class(animal)));
        assert!(table.is_super_type(TypeRef::Class(cat), TypeRef::Null));
    }

    #[test]
    fn arrays_intern_and_are_covariant() {
        let (mut table, object, animal, cat) = table_with_chain();
        let a1 = table.load_array(TypeRef::Class(cat), 1);
        let a2 = table.load_array(TypeRef::Class(cat), 1);
        assert_eq!(a1, a2);
        let animal_arr = table.load_array(TypeRef::Class(animal), 1);
        assert!(table.is_super_type(TypeRef::Array(animal_arr), TypeRef::Array(a1)));
        assert!(!table.is_super_type(TypeRef::Array(a1), TypeRef::Array(animal_arr)));
        let int_arr = table.load_array(TypeRef::INT, 1);
        assert!(!table.is_super_type(TypeRef::Array(animal_arr), TypeRef::Array(int_arr)));
        let _ = object;
    }

    #[test]
    fn element_type_drops_one_dimension() {
        let mut table = ClassTable::new();
        let a2 = table.load_array(TypeRef::INT, 2);
        let elem = table.element_type(a2);
        let a1 = table.load_array(TypeRef::INT, 1);
        assert_eq!(elem, TypeRef::Array(a1));
        assert_eq!(table.element_type(a1), TypeRef::INT);
    }

    #[test]
    fn overload_resolution_prefers_most_specific() {
        let (mut table, _object, animal, cat) = table_with_chain();
        {
            let sym = table.class_mut(animal);
            sym.methods.push(MethodSymbol {
                modifiers: Modifiers::PUBLIC,
                name: "feed".into(),
                params: vec![TypeRef::Class(animal)],
                return_type: TypeRef::VOID,
                body: None,
            });
            sym.methods.push(MethodSymbol {
                modifiers: Modifiers::PUBLIC,
                name: "feed".into(),
                params: vec![TypeRef::Class(cat)],
                return_type: TypeRef::VOID,
                body: None,
            });
        }
        match table.find_method(animal, "feed", &[TypeRef::Class(cat)]) {
            Lookup::Found(r) => assert_eq!(table.method(r).params, vec![TypeRef::Class(cat)]),
            other => panic!("expected unique match, got {other:?}"),
        }
        match table.find_method(animal, "feed", &[TypeRef::Class(animal)]) {
            Lookup::Found(r) => assert_eq!(table.method(r).params, vec![TypeRef::Class(animal)]),
            other => panic!("expected unique match, got {other:?}"),
        }
        assert_eq!(
            table.find_method(animal, "feed", &[TypeRef::INT]),
            Lookup::NotFound
        );
    }

    #[test]
    fn overload_resolution_reports_ties() {
        let (mut table, object, _animal, cat) = table_with_chain();
        {
            let sym = table.class_mut(cat);
            sym.methods.push(MethodSymbol {
                modifiers: Modifiers::PUBLIC,
                name: "pick".into(),
                params: vec![TypeRef::Class(object), TypeRef::Class(cat)],
                return_type: TypeRef::VOID,
                body: None,
            });
            sym.methods.push(MethodSymbol {
                modifiers: Modifiers::PUBLIC,
                name: "pick".into(),
                params: vec![TypeRef::Class(cat), TypeRef::Class(object)],
                return_type: TypeRef::VOID,
                body: None,
            });
        }
        let args = [TypeRef::Class(cat), TypeRef::Class(cat)];
        match table.find_method(cat, "pick", &args) {
            Lookup::Ambiguous(all) => assert_eq!(all.len(), 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn subclass_method_shadows_inherited_signature() {
        let (mut table, _object, animal, cat) = table_with_chain();
        for id in [animal, cat] {
            table.class_mut(id).methods.push(MethodSymbol {
                modifiers: Modifiers::PUBLIC,
                name: "speak".into(),
                params: vec![],
                return_type: TypeRef::VOID,
                body: None,
            });
        }
        let found = table.methods_named(cat, "speak");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].class, cat);
    }

    #[test]
    fn accessibility_rules() {
        let (table, _object, animal, cat) = table_with_chain();
        // same package
        assert!(table.is_member_accessible(Modifiers::PRIVATE, animal, cat));
        let (table2, object, _animal, _cat) = table_with_chain();
        // cross package: public only, protected from subtypes
        assert!(table2.is_member_accessible(Modifiers::PUBLIC, object, _cat));
        assert!(table2.is_member_accessible(Modifiers::PROTECTED, object, _cat));
        assert!(!table2.is_member_accessible(Modifiers::PRIVATE, object, _cat));
        assert!(!table2.is_member_accessible(Modifiers::PROTECTED, _cat, object));
    }
}
