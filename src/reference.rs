use std::fmt::{Display, Formatter};

/// Handle of a node in the [`Bdd`][crate::bdd::Bdd] node table.
///
/// Ids `0` and `1` are the false and true terminals.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Ref(u32);

impl Ref {
    pub const ZERO: Ref = Ref(0);
    pub const ONE: Ref = Ref(1);

    /// Marks the low child of a node sitting on the free list.
    pub(crate) const INVALID: Ref = Ref(u32::MAX);

    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn constant(value: bool) -> Self {
        if value {
            Self::ONE
        } else {
            Self::ZERO
        }
    }

    /// Return the raw id of the node.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Return the id of the node as a table index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_one(self) -> bool {
        self.0 == 1
    }

    pub const fn is_const(self) -> bool {
        self.0 < 2
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            0 => write!(f, "⊥"),
            1 => write!(f, "⊤"),
            n => write!(f, "@{}", n),
        }
    }
}
