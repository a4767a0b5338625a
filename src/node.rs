use crate::reference::Ref;

/// Saturation value of reference counters. A node that reaches it stays alive forever.
pub(crate) const MAX_REF: u32 = 0x3ff;

/// Slot of the node table.
///
/// Besides its own content, every slot also owns one hash bucket: `hash` is the head
/// of the chain of nodes whose hash value is this slot's index. The two roles are
/// independent, so allocating or freeing a node never touches `hash`.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Node {
    /// Order position of the node's variable, or the variable itself while the
    /// table is in [`LevelMode::Variable`][crate::table::LevelMode::Variable].
    pub level: u32,
    pub low: Ref,
    pub high: Ref,
    pub refcount: u32,
    /// Next node in the same hash chain, or in the free list.
    pub next: u32,
    pub hash: u32,
    pub mark: bool,
}

impl Node {
    pub fn free() -> Self {
        Self {
            level: 0,
            low: Ref::INVALID,
            high: Ref::ZERO,
            refcount: 0,
            next: 0,
            hash: 0,
            mark: false,
        }
    }

    pub fn terminal(value: Ref, level: u32) -> Self {
        Self {
            level,
            low: value,
            high: value,
            refcount: MAX_REF,
            next: 0,
            hash: 0,
            mark: false,
        }
    }

    pub fn is_free(&self) -> bool {
        self.low == Ref::INVALID
    }

    pub fn inc_ref(&mut self) {
        if self.refcount != MAX_REF {
            self.refcount += 1;
        }
    }

    pub fn dec_ref(&mut self) {
        if self.refcount != MAX_REF && self.refcount > 0 {
            self.refcount -= 1;
        }
    }
}
