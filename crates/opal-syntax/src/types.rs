//! Syntactic type specifiers.
//!
//! A `TypeSpec` is purely what the source wrote: a primitive or a (possibly
//! unqualified) class name, plus an array dimension. Resolution to semantic
//! types happens in the analyzer.

use std::fmt;

/// The primitive types of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
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

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Void => "void",
        }
    }
}

/// The base of a type specifier, before array dimensions are applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeName {
    Primitive(PrimitiveKind),
    /// A class or interface name as written, simple or fully qualified.
    Named(String),
}

/// A type as written in source: base name plus array dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeSpec {
    pub name: TypeName,
    /// Number of `[]` suffixes; 0 for non-array types.
    pub dims: usize,
}

impl TypeSpec {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self {
            name: TypeName::Primitive(kind),
            dims: 0,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: TypeName::Named(name.into()),
            dims: 0,
        }
    }

    pub fn array_of(name: TypeName, dims: usize) -> Self {
        Self { name, dims }
    }

    pub fn is_array(&self) -> bool {
        self.dims > 0
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            TypeName::Primitive(p) => write!(f, "{}", p.name())?,
            TypeName::Named(n) => write!(f, "{n}")?,
        }
        for _ in 0..self.dims {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_dimensions() {
        let t = TypeSpec::array_of(TypeName::Primitive(PrimitiveKind::Int), 2);
        assert_eq!(t.to_string(), "int[][]");
        assert_eq!(TypeSpec::named("List").to_string(), "List");
    }
}
