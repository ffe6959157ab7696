//! The seeded platform class table.
//!
//! These are the externally provided classes every compilation can see:
//! the root object type, strings, throwable, the boxed value types and the
//! collection interfaces that `foreach` and list literals lower onto.

use opal_syntax::Modifiers;

use crate::symbols::{ClassKind, ClassSymbol, ClassTable, ConstructorSymbol, MethodSymbol};
use crate::types::{BasicType, ClassId, TypeRef};

pub const ROOT_CLASS: &str = "opal.lang.Object";
pub const STRING_CLASS: &str = "opal.lang.String";
pub const THROWABLE_CLASS: &str = "opal.lang.Throwable";
pub const LIST_INTERFACE: &str = "opal.util.List";
pub const ARRAY_LIST_CLASS: &str = "opal.util.ArrayList";
pub const ITERATOR_INTERFACE: &str = "opal.util.Iterator";

/// Namespaces implicitly imported into every unit.
pub const DEFAULT_NAMESPACES: [&str; 2] = ["opal.lang", "opal.util"];

/// Well-known classes, resolved once at session start.
#[derive(Debug, Clone)]
pub struct Platform {
    pub object: ClassId,
    pub string: ClassId,
    pub throwable: ClassId,
    pub list: ClassId,
    pub array_list: ClassId,
    pub iterator: ClassId,
    boxed: Vec<(BasicType, ClassId)>,
}

impl Platform {
    /// Seed `table` with the platform classes and return the handles.
    pub fn install(table: &mut ClassTable) -> Platform {
        let object = add_class(table, ClassKind::Class, ROOT_CLASS, None);
        let string = add_class(table, ClassKind::Class, STRING_CLASS, Some(object));
        let throwable = add_class(table, ClassKind::Class, THROWABLE_CLASS, Some(object));
        // interface values still widen to the root class
        let iterator = add_class(table, ClassKind::Interface, ITERATOR_INTERFACE, Some(object));
        let list = add_class(table, ClassKind::Interface, LIST_INTERFACE, Some(object));
        let array_list = add_class(table, ClassKind::Class, ARRAY_LIST_CLASS, Some(object));
        table.class_mut(array_list).interfaces.push(list);

        let obj = TypeRef::Class(object);
        let str_ty = TypeRef::Class(string);
        let list_ty = TypeRef::Class(list);
        let iter_ty = TypeRef::Class(iterator);

        add_method(table, object, "equals", vec![obj], TypeRef::BOOLEAN);
        add_method(table, object, "hashCode", vec![], TypeRef::INT);
        add_method(table, object, "toString", vec![], str_ty);
        add_ctor(table, object, vec![]);

        add_method(table, string, "concat", vec![str_ty], str_ty);
        add_method(table, string, "length", vec![], TypeRef::INT);

        add_ctor(table, throwable, vec![]);
        add_ctor(table, throwable, vec![str_ty]);
        add_method(table, throwable, "getMessage", vec![], str_ty);

        add_abstract_method(table, iterator, "hasNext", vec![], TypeRef::BOOLEAN);
        add_abstract_method(table, iterator, "next", vec![], obj);

        add_abstract_method(table, list, "size", vec![], TypeRef::INT);
        add_abstract_method(table, list, "get", vec![TypeRef::INT], obj);
        add_abstract_method(table, list, "add", vec![obj], list_ty);
        add_abstract_method(table, list, "iterator", vec![], iter_ty);

        add_ctor(table, array_list, vec![]);
        add_method(table, array_list, "size", vec![], TypeRef::INT);
        add_method(table, array_list, "get", vec![TypeRef::INT], obj);
        add_method(table, array_list, "add", vec![obj], list_ty);
        add_method(table, array_list, "iterator", vec![], iter_ty);

        let mut boxed = Vec::new();
        for (basic, name) in BOXED_NAMES {
            let id = add_class(table, ClassKind::Class, name, Some(object));
            add_ctor(table, id, vec![TypeRef::Basic(basic)]);
            boxed.push((basic, id));
        }

        Platform {
            object,
            string,
            throwable,
            list,
            array_list,
            iterator,
            boxed,
        }
    }

    /// The wrapper class for a basic type, if it has one.
    pub fn boxed_class(&self, basic: BasicType) -> Option<ClassId> {
        self.boxed
            .iter()
            .find(|(b, _)| *b == basic)
            .map(|&(_, id)| id)
    }
}

const BOXED_NAMES: [(BasicType, &str); 8] = [
    (BasicType::Byte, "opal.lang.Byte"),
    (BasicType::Short, "opal.lang.Short"),
    (BasicType::Char, "opal.lang.Character"),
    (BasicType::Int, "opal.lang.Integer"),
    (BasicType::Long, "opal.lang.Long"),
    (BasicType::Float, "opal.lang.Float"),
    (BasicType::Double, "opal.lang.Double"),
    (BasicType::Boolean, "opal.lang.Boolean"),
];

fn add_class(
    table: &mut ClassTable,
    kind: ClassKind,
    name: &str,
    super_class: Option<ClassId>,
) -> ClassId {
    let mut symbol = ClassSymbol::new(kind, Modifiers::PUBLIC, name);
    symbol.super_class = super_class;
    match table.insert_class(symbol) {
        Ok(id) | Err(id) => id,
    }
}

fn add_method(
    table: &mut ClassTable,
    class: ClassId,
    name: &str,
    params: Vec<TypeRef>,
    return_type: TypeRef,
) {
    table.class_mut(class).methods.push(MethodSymbol {
        modifiers: Modifiers::PUBLIC,
        name: name.to_string(),
        params,
        return_type,
        body: None,
    });
}

fn add_abstract_method(
    table: &mut ClassTable,
    class: ClassId,
    name: &str,
    params: Vec<TypeRef>,
    return_type: TypeRef,
) {
    table.class_mut(class).methods.push(MethodSymbol {
        modifiers: Modifiers::PUBLIC | Modifiers::ABSTRACT,
        name: name.to_string(),
        params,
        return_type,
        body: None,
    });
}

fn add_ctor(table: &mut ClassTable, class: ClassId, params: Vec<TypeRef>) {
    table.class_mut(class).constructors.push(ConstructorSymbol {
        modifiers: Modifiers::PUBLIC,
        params,
        super_call: None,
        body: None,
    });
}
