//! The node table: arena, unique table, free list and reference counts.
//!
//! # Layout
//!
//! All nodes live in one `Vec<Node>` and are addressed by `u32` ids. Slots `0` and
//! `1` hold the false and true terminals, which are pinned and never change. Every
//! other slot is either a live node or a member of the free list, which is threaded
//! through the `next` field and marked by an invalid low child.
//!
//! The unique table is embedded into the arena: the `hash` field of slot `i` is the
//! head of the chain of live nodes hashing to `i`, and chains continue through `next`.
//! This makes [`make_node`][NodeTable::make_node] canonical: at most one live node
//! exists for each `(level, low, high)` triple.
//!
//! # Reclamation
//!
//! Reference counts are plain counters that saturate at a pinned maximum. Dropping a
//! count to zero does not free anything; nodes are reclaimed by [`gbc`][NodeTable::gbc],
//! a mark and sweep collection run only when `make_node` finds no free slot. The roots
//! of the collection are the nodes with a positive count and the ref stack, which
//! protects intermediate results of a running recursion.
//!
//! # Levels
//!
//! A node stores the *order position* of its variable. While a reordering session
//! runs, the same field holds the *variable index* instead (see [`LevelMode`]); the
//! accessors [`order_position_of`][NodeTable::order_position_of] and
//! [`variable_of`][NodeTable::variable_of] read it correctly in both modes.

use log::debug;

use crate::error::{BddError, Interrupt};
use crate::node::{Node, MAX_REF};
use crate::prime::{prime_gte, prime_lte};
use crate::reference::Ref;
use crate::utils::triple;

/// Interpretation of the `level` field of stored nodes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LevelMode {
    /// The field holds the order position. This is the normal state.
    Position,
    /// The field holds the variable index. Only during a reordering session.
    Variable,
}

pub struct NodeTable {
    pub(crate) nodes: Vec<Node>,
    pub(crate) free_pos: u32,
    pub(crate) free_num: usize,
    pub(crate) var_num: u32,
    /// Order position of each variable, plus the terminal pseudo-variable `var_num`.
    pub(crate) var2level: Vec<u32>,
    /// Variable at each order position, plus the terminal pseudo-level `var_num`.
    pub(crate) level2var: Vec<u32>,
    ref_stack: Vec<Ref>,
    mode: LevelMode,
    max_node_increase: usize,
    max_node_size: usize,
    min_free_nodes: usize,
    produced: u64,
    gc_count: usize,
    /// Used-node count from which a collection requests an automatic reordering.
    reorder_trigger: Option<usize>,
}

impl NodeTable {
    pub fn new(node_size: usize, max_node_increase: usize, max_node_size: usize, min_free_nodes: usize) -> Self {
        let size = prime_gte(node_size.max(3));
        let mut nodes = vec![Node::free(); size];
        nodes[0] = Node::terminal(Ref::ZERO, 0);
        nodes[1] = Node::terminal(Ref::ONE, 0);

        // Thread the free list through all non-terminal slots.
        for (n, node) in nodes.iter_mut().enumerate().skip(2) {
            node.next = if n + 1 < size { (n + 1) as u32 } else { 0 };
        }

        Self {
            nodes,
            free_pos: 2,
            free_num: size - 2,
            var_num: 0,
            var2level: vec![0],
            level2var: vec![0],
            ref_stack: Vec::new(),
            mode: LevelMode::Position,
            max_node_increase,
            max_node_size,
            min_free_nodes,
            produced: 0,
            gc_count: 0,
            reorder_trigger: None,
        }
    }

    /// Number of slots, including terminals and free slots.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn free_num(&self) -> usize {
        self.free_num
    }

    /// Number of occupied slots, including both terminals.
    pub fn used_num(&self) -> usize {
        self.size() - self.free_num
    }

    pub fn produced(&self) -> u64 {
        self.produced
    }

    pub fn gc_count(&self) -> usize {
        self.gc_count
    }

    #[cfg(test)]
    pub fn mode(&self) -> LevelMode {
        self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: LevelMode) {
        debug!("level mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
    }

    pub(crate) fn set_reorder_trigger(&mut self, trigger: Option<usize>) {
        self.reorder_trigger = trigger;
    }

    pub(crate) fn max_node_size(&self) -> usize {
        self.max_node_size
    }

    pub(crate) fn max_node_increase(&self) -> usize {
        self.max_node_increase
    }

    /// Grow the variable universe to `var_num`, appending the new variables at the bottom.
    pub(crate) fn extend_levels(&mut self, var_num: u32) {
        assert!(var_num >= self.var_num, "Variable universe cannot shrink");
        assert_eq!(self.mode, LevelMode::Position);

        let old = self.var_num as usize;
        self.var2level.truncate(old);
        self.level2var.truncate(old);
        for v in old as u32..=var_num {
            self.var2level.push(v);
            self.level2var.push(v);
        }
        self.var_num = var_num;
        self.nodes[0].level = var_num;
        self.nodes[1].level = var_num;
    }

    #[inline]
    pub(crate) fn node(&self, r: Ref) -> &Node {
        &self.nodes[r.index()]
    }

    /// Raw content of the level field, whatever the current mode.
    #[inline]
    pub fn raw_level(&self, r: Ref) -> u32 {
        self.nodes[r.index()].level
    }

    #[inline]
    pub fn low(&self, r: Ref) -> Ref {
        self.nodes[r.index()].low
    }

    #[inline]
    pub fn high(&self, r: Ref) -> Ref {
        self.nodes[r.index()].high
    }

    pub fn refcount(&self, r: Ref) -> u32 {
        self.nodes[r.index()].refcount
    }

    /// Position of the node's variable in the current order. Terminals are at `var_num`.
    #[inline]
    pub fn order_position_of(&self, r: Ref) -> u32 {
        let raw = self.raw_level(r);
        match self.mode {
            LevelMode::Position => raw,
            LevelMode::Variable => self.var2level[raw as usize],
        }
    }

    /// Variable tested by the node. Terminals report `var_num`.
    #[inline]
    pub fn variable_of(&self, r: Ref) -> u32 {
        let raw = self.raw_level(r);
        match self.mode {
            LevelMode::Position => self.level2var[raw as usize],
            LevelMode::Variable => raw,
        }
    }

    /// Check that `r` denotes a terminal or a live node.
    pub fn check(&self, r: Ref) -> Result<(), BddError> {
        if r.index() >= self.size() || (!r.is_const() && self.nodes[r.index()].is_free()) {
            return Err(BddError::InvalidNode(r));
        }
        Ok(())
    }

    pub fn inc_ref(&mut self, r: Ref) {
        self.nodes[r.index()].inc_ref();
    }

    pub fn dec_ref(&mut self, r: Ref) {
        self.nodes[r.index()].dec_ref();
    }

    pub(crate) fn pin(&mut self, r: Ref) {
        self.nodes[r.index()].refcount = MAX_REF;
    }
}

// Ref stack.
impl NodeTable {
    #[inline]
    pub(crate) fn push_ref(&mut self, r: Ref) -> Ref {
        self.ref_stack.push(r);
        r
    }

    /// Read the `k`-th entry from the top of the stack, starting at 1.
    #[inline]
    pub(crate) fn read_ref(&self, k: usize) -> Ref {
        self.ref_stack[self.ref_stack.len() - k]
    }

    #[inline]
    pub(crate) fn pop_ref(&mut self, n: usize) {
        let len = self.ref_stack.len();
        self.ref_stack.truncate(len - n);
    }

    pub(crate) fn clear_ref_stack(&mut self) {
        self.ref_stack.clear();
    }
}

// Unique table.
impl NodeTable {
    #[inline]
    fn node_hash(&self, level: u32, low: Ref, high: Ref) -> usize {
        (triple(level as u64, low.raw() as u64, high.raw() as u64) % self.size() as u64) as usize
    }

    /// Find or create the node `(level, low, high)`.
    ///
    /// Returns `low` when both children are equal. The new node starts with a zero
    /// reference count; callers protect it with the ref stack or `inc_ref`.
    ///
    /// When the free list is empty, this runs a garbage collection, which may request
    /// an automatic reordering through [`Interrupt::Reorder`], and grows the table if
    /// the collection recovered too little.
    pub(crate) fn make_node(&mut self, level: u32, low: Ref, high: Ref) -> Result<Ref, Interrupt> {
        debug_assert_eq!(self.mode, LevelMode::Position);
        debug_assert!(level < self.order_position_of(low) && level < self.order_position_of(high));

        if low == high {
            return Ok(low);
        }

        let mut hash = self.node_hash(level, low, high);
        let mut res = self.nodes[hash].hash;
        while res != 0 {
            let node = &self.nodes[res as usize];
            if node.level == level && node.low == low && node.high == high {
                return Ok(Ref::new(res));
            }
            res = node.next;
        }

        if self.free_pos == 0 {
            self.gbc();

            if let Some(trigger) = self.reorder_trigger {
                if self.used_num() >= trigger {
                    return Err(Interrupt::Reorder);
                }
            }

            // A failed growth is fine as long as the collection freed a slot.
            if self.free_num * 100 / self.size() <= self.min_free_nodes && self.resize(true).is_ok() {
                hash = self.node_hash(level, low, high);
            }
        }

        let Some(res) = self.take_free_slot() else {
            return Err(BddError::NodeTableExhausted(self.size()).into());
        };
        let next = self.nodes[hash].hash;
        let node = &mut self.nodes[res as usize];
        node.level = level;
        node.low = low;
        node.high = high;
        node.refcount = 0;
        node.mark = false;
        node.next = next;
        self.nodes[hash].hash = res;

        Ok(Ref::new(res))
    }

    /// Grow the arena to the largest prime not exceeding twice its size, bounded by
    /// the configured increase and maximum.
    ///
    /// With `rehash`, chains and the free list are rebuilt for the new size. Without
    /// it, existing chains are kept as they are (the reordering engine owns the hash
    /// layout then) and the new slots are prepended to the free list.
    pub(crate) fn resize(&mut self, rehash: bool) -> Result<(), BddError> {
        let old_size = self.size();
        if self.max_node_size > 0 && old_size >= self.max_node_size {
            return Err(BddError::NodeTableExhausted(old_size));
        }

        let mut new_size = old_size * 2;
        if self.max_node_increase > 0 && new_size > old_size + self.max_node_increase {
            new_size = old_size + self.max_node_increase;
        }
        if self.max_node_size > 0 && new_size > self.max_node_size {
            new_size = self.max_node_size;
        }
        let new_size = prime_lte(new_size);
        if new_size <= old_size {
            return Err(BddError::NodeTableExhausted(old_size));
        }

        debug!("resizing node table from {} to {} slots", old_size, new_size);
        self.nodes.resize(new_size, Node::free());

        if rehash {
            self.rehash();
        } else {
            for n in old_size..new_size {
                self.nodes[n].next = if n + 1 < new_size { (n + 1) as u32 } else { self.free_pos };
            }
            self.free_pos = old_size as u32;
            self.free_num += new_size - old_size;
        }

        Ok(())
    }

    /// Pop a slot from the free list, leaving its content and hash chains to the caller.
    pub(crate) fn take_free_slot(&mut self) -> Option<u32> {
        if self.free_pos == 0 {
            return None;
        }
        let res = self.free_pos;
        self.free_pos = self.nodes[res as usize].next;
        self.free_num -= 1;
        self.produced += 1;
        Some(res)
    }

    /// Put the slot `n`, already unlinked from its hash chain, back on the free list.
    pub(crate) fn release_slot(&mut self, n: u32) {
        let node = &mut self.nodes[n as usize];
        node.low = Ref::INVALID;
        node.refcount = 0;
        node.mark = false;
        node.next = self.free_pos;
        self.free_pos = n;
        self.free_num += 1;
    }

    /// Rebuild all hash chains and the free list from the live nodes.
    fn rehash(&mut self) {
        for node in self.nodes.iter_mut() {
            node.hash = 0;
        }
        self.free_pos = 0;
        self.free_num = 0;

        for n in (2..self.size()).rev() {
            if self.nodes[n].is_free() {
                self.nodes[n].next = self.free_pos;
                self.free_pos = n as u32;
                self.free_num += 1;
            } else {
                let node = self.nodes[n];
                let hash = self.node_hash(node.level, node.low, node.high);
                self.nodes[n].next = self.nodes[hash].hash;
                self.nodes[hash].hash = n as u32;
            }
        }
    }
}

// Garbage collection and marking.
impl NodeTable {
    /// Collect every node unreachable from a referenced node or the ref stack.
    pub fn gbc(&mut self) {
        assert_eq!(self.mode, LevelMode::Position, "Garbage collection during reordering");
        debug!(
            "gbc #{}: {} of {} slots free before collection",
            self.gc_count + 1,
            self.free_num,
            self.size()
        );

        let stack = std::mem::take(&mut self.ref_stack);
        for &r in &stack {
            self.mark_rec(r);
        }
        self.ref_stack = stack;

        for n in 2..self.size() {
            if self.nodes[n].refcount > 0 {
                self.mark_rec(Ref::new(n as u32));
            }
        }

        for node in self.nodes.iter_mut() {
            node.hash = 0;
        }
        self.free_pos = 0;
        self.free_num = 0;

        for n in (2..self.size()).rev() {
            let node = self.nodes[n];
            if node.mark && !node.is_free() {
                let hash = self.node_hash(node.level, node.low, node.high);
                let head = self.nodes[hash].hash;
                let node = &mut self.nodes[n];
                node.mark = false;
                node.next = head;
                self.nodes[hash].hash = n as u32;
            } else {
                let node = &mut self.nodes[n];
                node.low = Ref::INVALID;
                node.mark = false;
                node.next = self.free_pos;
                self.free_pos = n as u32;
                self.free_num += 1;
            }
        }

        self.gc_count += 1;
        debug!("gbc #{}: {} slots free after collection", self.gc_count, self.free_num);
    }

    /// Mark all nodes reachable from `r`, returning the number of newly marked nodes.
    pub(crate) fn mark_rec(&mut self, r: Ref) -> usize {
        if r.is_const() {
            return 0;
        }
        let node = &mut self.nodes[r.index()];
        if node.mark || node.is_free() {
            return 0;
        }
        node.mark = true;
        let (low, high) = (node.low, node.high);
        1 + self.mark_rec(low) + self.mark_rec(high)
    }

    pub(crate) fn unmark_rec(&mut self, r: Ref) {
        if r.is_const() {
            return;
        }
        let node = &mut self.nodes[r.index()];
        if !node.mark || node.is_free() {
            return;
        }
        node.mark = false;
        let (low, high) = (node.low, node.high);
        self.unmark_rec(low);
        self.unmark_rec(high);
    }
}
