//! Per-variable hash regions used while a reordering session runs.
//!
//! During reordering the unique table is split into one region per variable: the
//! bucket heads of variable `v` are the `hash` fields of slots
//! `start..start + size`. A region never exceeds `max_size` slots, which keeps the
//! regions of all variables disjoint.
//!
//! ```text
//! slots:   [ v0 buckets | v1 buckets | v2 buckets | ... ]
//!            ^start(0)    ^start(1)    ^start(2)
//! ```
//!
//! Nodes of a variable can then be enumerated by walking its buckets alone, which is
//! what makes an adjacent swap proportional to the size of the two levels involved.

use crate::prime::prime_lte;
use crate::reference::Ref;
use crate::utils::pair;

#[derive(Debug, Clone, Default)]
pub(crate) struct LevelData {
    /// First slot of the region.
    pub start: usize,
    /// Number of buckets in use.
    pub size: usize,
    /// Upper bound on `size`.
    pub max_size: usize,
    /// Live nodes labelled with this variable.
    pub node_num: usize,
}

impl LevelData {
    /// Slot holding the bucket head for the children `(low, high)`.
    #[inline]
    pub fn bucket(&self, low: Ref, high: Ref) -> usize {
        self.start + (pair(low.raw() as u64, high.raw() as u64) % self.size as u64) as usize
    }

    /// Number of buckets appropriate for `node_num` nodes.
    pub fn fitting_size(&self) -> usize {
        let mut size = (self.node_num * 5 / 4).min(self.max_size);
        if size >= 4 {
            size = prime_lte(size);
        }
        size.max(1)
    }

    /// Whether the region is much too sparse or too dense for its nodes.
    pub fn is_badly_sized(&self) -> bool {
        self.node_num < self.size / 3 || (self.node_num >= self.size * 3 / 2 && self.size < self.max_size)
    }
}

/// Regions for `var_num` variables in a table of `table_size` slots.
pub(crate) fn level_lookup(node_nums: &[usize], table_size: usize) -> Vec<LevelData> {
    let var_num = node_nums.len().max(1);
    let max_size = (table_size / var_num).max(1);
    node_nums
        .iter()
        .enumerate()
        .map(|(v, &node_num)| {
            let mut level = LevelData {
                start: v * max_size,
                size: 0,
                max_size,
                node_num,
            };
            level.size = level.fitting_size();
            level
        })
        .collect()
}
