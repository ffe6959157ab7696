//! Semantic types.
//!
//! `TypeRef` is a small copyable handle; everything structural (hierarchy
//! walks, member lookup, array components) lives in the
//! [`ClassTable`](crate::symbols::ClassTable).

use opal_syntax::PrimitiveKind;
use std::fmt;

/// Index of a class or interface in the class table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

impl ClassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of an interned array type in the class table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayId(pub u32);

impl ArrayId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The built-in value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Void,
}

impl BasicType {
    pub fn from_primitive(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Byte => BasicType::Byte,
            PrimitiveKind::Short => BasicType::Short,
            PrimitiveKind::Char => BasicType::Char,
            PrimitiveKind::Int => BasicType::Int,
            PrimitiveKind::Long => BasicType::Long,
            PrimitiveKind::Float => BasicType::Float,
            PrimitiveKind::Double => BasicType::Double,
            PrimitiveKind::Boolean => BasicType::Boolean,
            PrimitiveKind::Void => BasicType::Void,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BasicType::Byte => "byte",
            BasicType::Short => "short",
            BasicType::Char => "char",
            BasicType::Int => "int",
            BasicType::Long => "long",
            BasicType::Float => "float",
            BasicType::Double => "double",
            BasicType::Boolean => "boolean",
            BasicType::Void => "void",
        }
    }

    /// Byte, short, char, int and long.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BasicType::Byte | BasicType::Short | BasicType::Char | BasicType::Int | BasicType::Long
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, BasicType::Float | BasicType::Double)
    }

    /// Stack/frame slots occupied by a value of this type.
    pub fn width(self) -> usize {
        match self {
            BasicType::Long | BasicType::Double => 2,
            BasicType::Void => 0,
            _ => 1,
        }
    }

    /// Whether a value of `source` silently widens to `self`.
    pub fn widens_from(self, source: BasicType) -> bool {
        use BasicType::*;
        match self {
            Double => source.is_numeric(),
            Float => source.is_integer() || source == Float,
            Long => source.is_integer(),
            Int => matches!(source, Char | Byte | Short | Int),
            Short => matches!(source, Byte | Short),
            Char => source == Char,
            Byte => source == Byte,
            Boolean => source == Boolean,
            Void => source == Void,
        }
    }
}

/// Binary numeric promotion. `None` when either side is not numeric.
pub fn promote(a: BasicType, b: BasicType) -> Option<BasicType> {
    if !a.is_numeric() || !b.is_numeric() {
        return None;
    }
    use BasicType::*;
    Some(if a == Double || b == Double {
        Double
    } else if a == Float || b == Float {
        Float
    } else if a == Long || b == Long {
        Long
    } else {
        Int
    })
}

/// A semantic type handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Basic(BasicType),
    Class(ClassId),
    Array(ArrayId),
    /// The type of the `null` literal, assignable to any reference type.
    Null,
}

impl TypeRef {
    pub const VOID: TypeRef = TypeRef::Basic(BasicType::Void);
    pub const BOOLEAN: TypeRef = TypeRef::Basic(BasicType::Boolean);
    pub const INT: TypeRef = TypeRef::Basic(BasicType::Int);
    pub const LONG: TypeRef = TypeRef::Basic(BasicType::Long);
    pub const FLOAT: TypeRef = TypeRef::Basic(BasicType::Float);
    pub const DOUBLE: TypeRef = TypeRef::Basic(BasicType::Double);
    pub const CHAR: TypeRef = TypeRef::Basic(BasicType::Char);

    pub fn as_basic(self) -> Option<BasicType> {
        match self {
            TypeRef::Basic(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_basic(self) -> bool {
        matches!(self, TypeRef::Basic(_))
    }

    pub fn is_reference(self) -> bool {
        matches!(self, TypeRef::Class(_) | TypeRef::Array(_) | TypeRef::Null)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, TypeRef::Basic(b) if b.is_numeric())
    }

    pub fn is_integer(self) -> bool {
        matches!(self, TypeRef::Basic(b) if b.is_integer())
    }

    pub fn is_boolean(self) -> bool {
        self == TypeRef::BOOLEAN
    }

    pub fn is_void(self) -> bool {
        self == TypeRef::VOID
    }

    pub fn width(self) -> usize {
        match self {
            TypeRef::Basic(b) => b.width(),
            _ => 1,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Basic(b) => write!(f, "{}", b.name()),
            TypeRef::Class(id) => write!(f, "class#{}", id.0),
            TypeRef::Array(id) => write!(f, "array#{}", id.0),
            TypeRef::Null => write!(f, "null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BasicType::*;

    #[test]
    fn promotion_is_commutative_and_ranked() {
        assert_eq!(promote(Int, Long), Some(Long));
        assert_eq!(promote(Long, Int), Some(Long));
        assert_eq!(promote(Byte, Short), Some(Int));
        assert_eq!(promote(Char, Char), Some(Int));
        assert_eq!(promote(Long, Float), Some(Float));
        assert_eq!(promote(Float, Double), Some(Double));
        assert_eq!(promote(Int, Boolean), None);
        assert_eq!(promote(Void, Int), None);
    }

    #[test]
    fn widening_table() {
        assert!(Double.widens_from(Char));
        assert!(Float.widens_from(Long));
        assert!(Long.widens_from(Byte));
        assert!(Int.widens_from(Char));
        assert!(!Int.widens_from(Long));
        assert!(Short.widens_from(Byte));
        assert!(!Short.widens_from(Char));
        assert!(Boolean.widens_from(Boolean));
        assert!(!Boolean.widens_from(Int));
    }

    #[test]
    fn widths() {
        assert_eq!(Long.width(), 2);
        assert_eq!(Double.width(), 2);
        assert_eq!(Int.width(), 1);
        assert_eq!(Void.width(), 0);
        assert_eq!(TypeRef::Null.width(), 1);
    }
}
