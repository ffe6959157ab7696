//! Declaration modifier bits.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A set of declaration modifiers, stored as a bitmask.
///
/// Access defaults (when none of `PUBLIC`/`PROTECTED`/`PRIVATE` is set) are
/// decided by the semantic phases, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(pub u16);

impl Modifiers {
    /// Visible only inside the defining module.
    pub const INTERNAL: Modifiers = Modifiers(0x0001);
    pub const SYNCHRONIZED: Modifiers = Modifiers(0x0002);
    pub const FINAL: Modifiers = Modifiers(0x0004);
    pub const ABSTRACT: Modifiers = Modifiers(0x0008);
    pub const VOLATILE: Modifiers = Modifiers(0x0010);
    pub const STATIC: Modifiers = Modifiers(0x0020);
    pub const PUBLIC: Modifiers = Modifiers(0x0080);
    pub const PROTECTED: Modifiers = Modifiers(0x0100);
    pub const PRIVATE: Modifiers = Modifiers(0x0200);
    /// Field whose interface methods are forwarded onto the owning class.
    pub const DELEGATE: Modifiers = Modifiers(0x0400);

    pub const fn empty() -> Self {
        Modifiers(0)
    }

    pub const fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Modifiers) {
        self.0 |= other.0;
    }

    pub const fn union(self, other: Modifiers) -> Self {
        Modifiers(self.0 | other.0)
    }

    pub const fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }

    pub const fn is_public(self) -> bool {
        self.contains(Self::PUBLIC)
    }

    pub const fn is_private(self) -> bool {
        self.contains(Self::PRIVATE)
    }

    pub const fn is_protected(self) -> bool {
        self.contains(Self::PROTECTED)
    }

    pub const fn is_internal(self) -> bool {
        self.contains(Self::INTERNAL)
    }

    pub const fn is_abstract(self) -> bool {
        self.contains(Self::ABSTRACT)
    }

    pub const fn is_delegate(self) -> bool {
        self.contains(Self::DELEGATE)
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        self.union(rhs)
    }
}

impl BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Modifiers) {
        self.insert(rhs);
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: &[(Modifiers, &str)] = &[
            (Modifiers::PUBLIC, "public"),
            (Modifiers::PROTECTED, "protected"),
            (Modifiers::PRIVATE, "private"),
            (Modifiers::INTERNAL, "internal"),
            (Modifiers::STATIC, "static"),
            (Modifiers::FINAL, "final"),
            (Modifiers::ABSTRACT, "abstract"),
            (Modifiers::SYNCHRONIZED, "synchronized"),
            (Modifiers::VOLATILE, "volatile"),
            (Modifiers::DELEGATE, "delegate"),
        ];
        let mut first = true;
        for (bit, name) in NAMES {
            if self.contains(*bit) {
                if !first {
                    write!(f, " ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_contains() {
        let mut m = Modifiers::empty();
        m |= Modifiers::PUBLIC;
        m |= Modifiers::STATIC;
        assert!(m.is_public());
        assert!(m.is_static());
        assert!(!m.is_private());
        assert!(m.contains(Modifiers::PUBLIC | Modifiers::STATIC));
    }

    #[test]
    fn display_orders_access_first() {
        let m = Modifiers::STATIC | Modifiers::PUBLIC;
        assert_eq!(m.to_string(), "public static");
    }
}
