//! Variable blocks: a forest of nested variable ranges constraining reordering.
//!
//! A block covers the variables `first..=last` (by index) which must sit on
//! consecutive levels. Reordering moves blocks as a whole; only the children of a
//! block that is not `fixed` are permuted among themselves. Two blocks are either
//! disjoint or one contains the other.
//!
//! Blocks live in an arena and refer to each other by index. The children of a block
//! (and the roots of the forest) are kept ordered by their position in the current
//! variable order.

use log::debug;

use crate::error::{BddError, Result};

pub(crate) type BlockId = usize;

#[derive(Debug, Clone)]
pub(crate) struct Block {
    pub first: u32,
    pub last: u32,
    pub fixed: bool,
    /// Member variables ordered by level.
    pub seq: Vec<u32>,
    pub children: Vec<BlockId>,
}

impl Block {
    pub fn size(&self) -> u32 {
        self.last - self.first + 1
    }

    pub fn contains(&self, var: u32) -> bool {
        self.first <= var && var <= self.last
    }
}

#[derive(Debug, Default)]
pub(crate) struct BlockTree {
    blocks: Vec<Block>,
    pub roots: Vec<BlockId>,
}

impl BlockTree {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.roots.clear();
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id]
    }

    pub fn set_children(&mut self, id: BlockId, children: Vec<BlockId>) {
        self.blocks[id].children = children;
    }

    /// Top level of a block in the order given by `var2level`.
    pub fn top_level(&self, id: BlockId, var2level: &[u32]) -> u32 {
        let block = &self.blocks[id];
        (block.first..=block.last)
            .map(|v| var2level[v as usize])
            .min()
            .unwrap_or(0)
    }

    /// Insert the range `first..=last`, returning the block that covers exactly it.
    ///
    /// Inserting an existing range returns that block. A new range nested in an
    /// existing block is inserted among its children, and existing blocks nested in
    /// the new range become its children.
    pub fn add_range(&mut self, first: u32, last: u32, fixed: bool, var2level: &[u32]) -> Result<BlockId> {
        debug_assert!(first <= last);
        self.add_rec(None, first, last, fixed, var2level)
    }

    fn siblings(&self, parent: Option<BlockId>) -> &Vec<BlockId> {
        match parent {
            Some(id) => &self.blocks[id].children,
            None => &self.roots,
        }
    }

    fn siblings_mut(&mut self, parent: Option<BlockId>) -> &mut Vec<BlockId> {
        match parent {
            Some(id) => &mut self.blocks[id].children,
            None => &mut self.roots,
        }
    }

    fn add_rec(
        &mut self,
        parent: Option<BlockId>,
        first: u32,
        last: u32,
        fixed: bool,
        var2level: &[u32],
    ) -> Result<BlockId> {
        let mut covered = Vec::new();
        for id in self.siblings(parent).clone() {
            let block = &self.blocks[id];
            if block.first == first && block.last == last {
                return Ok(id);
            }
            if block.first <= first && last <= block.last {
                return self.add_rec(Some(id), first, last, fixed, var2level);
            }
            if first <= block.first && block.last <= last {
                covered.push(id);
            } else if first <= block.last && block.first <= last {
                return Err(BddError::PartialBlockOverlap { first, last });
            }
        }

        let id = self.blocks.len();
        debug!("new block #{} over {}..={} (fixed: {})", id, first, last, fixed);
        self.blocks.push(Block {
            first,
            last,
            fixed,
            seq: Vec::new(),
            children: covered.clone(),
        });

        let mut siblings = std::mem::take(self.siblings_mut(parent));
        siblings.retain(|b| !covered.contains(b));
        siblings.push(id);
        siblings.sort_by_key(|&b| self.top_level(b, var2level));
        *self.siblings_mut(parent) = siblings;

        self.update_block_seq(id, var2level);
        Ok(id)
    }

    fn update_block_seq(&mut self, id: BlockId, var2level: &[u32]) {
        let block = &mut self.blocks[id];
        let mut seq: Vec<u32> = (block.first..=block.last).collect();
        seq.sort_by_key(|&v| var2level[v as usize]);
        block.seq = seq;
    }

    /// Recompute the member sequence of every block after a reordering.
    pub fn update_seq(&mut self, var2level: &[u32]) {
        for id in 0..self.blocks.len() {
            self.update_block_seq(id, var2level);
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn identity(n: u32) -> Vec<u32> {
        (0..=n).collect()
    }

    #[test]
    fn test_disjoint_ranges_are_siblings() {
        let order = identity(6);
        let mut tree = BlockTree::default();
        let b = tree.add_range(3, 5, false, &order).unwrap();
        let a = tree.add_range(0, 1, false, &order).unwrap();
        assert_eq!(tree.roots, vec![a, b]);
        assert!(tree.block(a).children.is_empty());
    }

    #[test]
    fn test_exact_match_is_idempotent() {
        let order = identity(4);
        let mut tree = BlockTree::default();
        let a = tree.add_range(1, 2, false, &order).unwrap();
        assert_eq!(tree.add_range(1, 2, true, &order).unwrap(), a);
        assert_eq!(tree.roots.len(), 1);
    }

    #[test]
    fn test_nested_range_becomes_child() {
        let order = identity(8);
        let mut tree = BlockTree::default();
        let outer = tree.add_range(0, 5, false, &order).unwrap();
        let inner = tree.add_range(2, 3, true, &order).unwrap();
        assert_eq!(tree.roots, vec![outer]);
        assert_eq!(tree.block(outer).children, vec![inner]);
        assert!(tree.block(inner).fixed);
    }

    #[test]
    fn test_covering_range_lifts_siblings() {
        let order = identity(8);
        let mut tree = BlockTree::default();
        let a = tree.add_range(0, 1, false, &order).unwrap();
        let b = tree.add_range(2, 3, false, &order).unwrap();
        let c = tree.add_range(6, 7, false, &order).unwrap();
        let outer = tree.add_range(0, 4, false, &order).unwrap();
        assert_eq!(tree.roots, vec![outer, c]);
        assert_eq!(tree.block(outer).children, vec![a, b]);
    }

    #[test]
    fn test_partial_overlap_is_rejected() {
        let order = identity(8);
        let mut tree = BlockTree::default();
        tree.add_range(0, 3, false, &order).unwrap();
        assert_eq!(
            tree.add_range(2, 5, false, &order),
            Err(BddError::PartialBlockOverlap { first: 2, last: 5 })
        );
        tree.add_range(0, 1, false, &order).unwrap();
        assert!(tree.add_range(1, 2, false, &order).is_err());
    }

    #[test]
    fn test_siblings_follow_order() {
        // Order: 2 3 0 1
        let var2level = vec![2, 3, 0, 1, 4];
        let mut tree = BlockTree::default();
        let a = tree.add_range(0, 1, false, &var2level).unwrap();
        let b = tree.add_range(2, 3, false, &var2level).unwrap();
        assert_eq!(tree.roots, vec![b, a]);
        assert_eq!(tree.top_level(a, &var2level), 2);
    }

    #[test]
    fn test_update_seq() {
        let mut var2level = identity(4);
        let mut tree = BlockTree::default();
        let a = tree.add_range(0, 2, false, &var2level).unwrap();
        assert_eq!(tree.block(a).seq, vec![0, 1, 2]);
        var2level[0] = 2;
        var2level[2] = 0;
        tree.update_seq(&var2level);
        assert_eq!(tree.block(a).seq, vec![2, 1, 0]);
    }
}
