//! A reordering session: exclusive access to the node table while variables move.
//!
//! Opening a session switches the table into [`LevelMode::Variable`], replaces the
//! reference counts by exact parent counts and rehashes every live node into the
//! region of its variable (see [`LevelData`]). In that state an adjacent swap only
//! touches the nodes of the two variables involved. Closing the session restores
//! the external reference counts and the position mode and runs a full collection.

use log::debug;

use crate::error::BddError;
use crate::reference::Ref;
use crate::reorder::interaction::InteractionMatrix;
use crate::subtable::{level_lookup, LevelData};
use crate::table::{LevelMode, NodeTable};

pub(crate) struct Session<'a> {
    table: &'a mut NodeTable,
    /// Hash regions, indexed by variable.
    levels: Vec<LevelData>,
    matrix: InteractionMatrix,
    /// Nodes referenced from outside the table, with their external counts.
    ext_roots: Vec<(u32, u32)>,
    swaps: usize,
    /// The arena grew during the current swap.
    resized: bool,
}

fn add_ref_rec(table: &mut NodeTable, r: Ref) {
    if r.is_const() {
        return;
    }
    if table.refcount(r) == 0 {
        let (low, high) = (table.low(r), table.high(r));
        add_ref_rec(table, low);
        add_ref_rec(table, high);
    }
    table.inc_ref(r);
}

impl<'a> Session<'a> {
    pub fn new(table: &'a mut NodeTable) -> Self {
        let size = table.size();
        let var_num = table.var_num as usize;

        let mut ext_roots = Vec::new();
        for n in 2..size {
            let node = &mut table.nodes[n];
            if node.is_free() {
                continue;
            }
            if node.refcount > 0 {
                ext_roots.push((n as u32, node.refcount));
            }
            node.level = table.level2var[node.level as usize];
        }
        table.set_mode(LevelMode::Variable);

        for &(n, _) in &ext_roots {
            let r = Ref::new(n);
            let (low, high) = (table.low(r), table.high(r));
            add_ref_rec(table, low);
            add_ref_rec(table, high);
        }

        let roots: Vec<u32> = ext_roots.iter().map(|&(n, _)| n).collect();
        let matrix = InteractionMatrix::build(table, &roots);

        let mut node_nums = vec![0; var_num];
        for node in &table.nodes[2..] {
            if !node.is_free() && node.refcount > 0 {
                node_nums[node.level as usize] += 1;
            }
        }

        debug!(
            "reordering session opened: {} external roots, {} slots",
            ext_roots.len(),
            size
        );

        let mut session = Self {
            levels: level_lookup(&node_nums, size),
            table,
            matrix,
            ext_roots,
            swaps: 0,
            resized: false,
        };
        session.rehash();
        session
    }

    pub fn var_num(&self) -> u32 {
        self.table.var_num
    }

    pub fn swaps(&self) -> usize {
        self.swaps
    }

    /// Live nodes, terminals included.
    pub fn node_num(&self) -> usize {
        self.table.used_num()
    }

    pub fn level_of(&self, var: u32) -> u32 {
        self.table.var2level[var as usize]
    }

    pub fn var_at(&self, level: u32) -> u32 {
        self.table.level2var[level as usize]
    }

    /// Live nodes labelled with `var`.
    pub fn var_node_num(&self, var: u32) -> usize {
        self.levels[var as usize].node_num
    }

    /// Size above which sifting stops exploring in one direction.
    pub fn sift_bound(&self, best: usize) -> usize {
        let bound = best / 5 + best;
        if self.table.max_node_size() > 0 {
            let cap = self
                .table
                .max_node_size()
                .saturating_sub(self.table.max_node_increase())
                .saturating_sub(2);
            bound.min(cap)
        } else {
            bound
        }
    }

    /// Rebuild all chains and the free list for the current regions. Nodes without
    /// references are dropped.
    fn rehash(&mut self) {
        let table = &mut *self.table;
        for node in table.nodes.iter_mut() {
            node.hash = 0;
        }
        table.free_pos = 0;
        table.free_num = 0;

        for n in (2..table.size()).rev() {
            let node = table.nodes[n];
            if !node.is_free() && node.refcount > 0 {
                let bucket = self.levels[node.level as usize].bucket(node.low, node.high);
                table.nodes[n].next = table.nodes[bucket].hash;
                table.nodes[bucket].hash = n as u32;
            } else {
                table.release_slot(n as u32);
            }
        }
    }

    /// Recompute the regions for the current arena size and rehash everything.
    fn rehash_all(&mut self) {
        let mut node_nums = vec![0; self.table.var_num as usize];
        for node in &self.table.nodes[2..] {
            if !node.is_free() && node.refcount > 0 {
                node_nums[node.level as usize] += 1;
            }
        }
        self.levels = level_lookup(&node_nums, self.table.size());
        self.rehash();
    }

    fn link(&mut self, var: u32, n: u32) {
        let node = self.table.nodes[n as usize];
        let bucket = self.levels[var as usize].bucket(node.low, node.high);
        self.table.nodes[n as usize].next = self.table.nodes[bucket].hash;
        self.table.nodes[bucket].hash = n;
        self.levels[var as usize].node_num += 1;
    }

    /// Unlink all nodes of `var` from their chains.
    fn unlink_all(&mut self, var: u32) -> Vec<u32> {
        let level = &mut self.levels[var as usize];
        let (start, size) = (level.start, level.size);
        level.node_num = 0;

        let mut nodes = Vec::new();
        for bucket in start..start + size {
            let mut r = self.table.nodes[bucket].hash;
            self.table.nodes[bucket].hash = 0;
            while r != 0 {
                nodes.push(r);
                r = self.table.nodes[r as usize].next;
            }
        }
        nodes
    }

    /// Find or create `(var, low, high)`, adding a reference to the result.
    ///
    /// A free slot must have been reserved with [`Session::reserve`].
    fn make_node(&mut self, var: u32, low: Ref, high: Ref) -> Ref {
        if low == high {
            self.table.inc_ref(low);
            return low;
        }

        let bucket = self.levels[var as usize].bucket(low, high);
        let mut res = self.table.nodes[bucket].hash;
        while res != 0 {
            let node = &self.table.nodes[res as usize];
            if node.level == var && node.low == low && node.high == high {
                let res = Ref::new(res);
                self.table.inc_ref(res);
                return res;
            }
            res = node.next;
        }

        let Some(res) = self.table.take_free_slot() else {
            unreachable!("No slot reserved for a node created while swapping");
        };
        let head = self.table.nodes[bucket].hash;
        let node = &mut self.table.nodes[res as usize];
        node.level = var;
        node.low = low;
        node.high = high;
        node.refcount = 1;
        node.mark = false;
        node.next = head;
        self.table.nodes[bucket].hash = res;
        self.levels[var as usize].node_num += 1;
        self.table.inc_ref(low);
        self.table.inc_ref(high);
        Ref::new(res)
    }

    /// Grow the arena until `count` slots are free. Chains are left in place; the
    /// regions are recomputed once the swap is complete.
    fn reserve(&mut self, count: usize) -> Result<(), BddError> {
        while self.table.free_num() < count {
            self.table.resize(false)?;
            self.resized = true;
        }
        Ok(())
    }

    /// Move `var` one level down, exchanging it with the variable below.
    pub fn var_down(&mut self, var: u32) -> Result<(), BddError> {
        let level = self.level_of(var);
        if level + 1 >= self.var_num() {
            return Ok(());
        }
        let var1 = self.var_at(level + 1);

        if self.matrix.depends(var, var1) {
            // Nodes of `var` without a child labelled `var1` stay as they are.
            let mut pending = Vec::new();
            for n in self.unlink_all(var) {
                let r = Ref::new(n);
                let (low, high) = (self.table.low(r), self.table.high(r));
                if self.table.raw_level(low) == var1 || self.table.raw_level(high) == var1 {
                    pending.push(n);
                } else {
                    self.link(var, n);
                }
            }

            if let Err(e) = self.reserve(2 * pending.len()) {
                for n in pending {
                    self.link(var, n);
                }
                if self.resized {
                    self.resized = false;
                    self.rehash_all();
                }
                return Err(e);
            }

            self.swap_pending(var, var1, &pending);
            self.local_gc(var1);

            if !self.resized {
                self.fit(var);
                self.fit(var1);
            }
        }

        let table = &mut *self.table;
        table.level2var[level as usize] = var1;
        table.level2var[level as usize + 1] = var;
        table.var2level[var as usize] = level + 1;
        table.var2level[var1 as usize] = level;
        self.swaps += 1;

        if self.resized {
            self.resized = false;
            self.rehash_all();
        }
        Ok(())
    }

    /// Move `var` one level up.
    pub fn var_up(&mut self, var: u32) -> Result<(), BddError> {
        let level = self.level_of(var);
        if level == 0 {
            return Ok(());
        }
        self.var_down(self.var_at(level - 1))
    }

    /// Rewrite every pending `var` node in place as a `var1` node over two new `var`
    /// nodes built from its grandchildren.
    fn swap_pending(&mut self, var: u32, var1: u32, pending: &[u32]) {
        for &n in pending {
            let r = Ref::new(n);
            let (f0, f1) = (self.table.low(r), self.table.high(r));
            let (f00, f01) = if self.table.raw_level(f0) == var1 {
                (self.table.low(f0), self.table.high(f0))
            } else {
                (f0, f0)
            };
            let (f10, f11) = if self.table.raw_level(f1) == var1 {
                (self.table.low(f1), self.table.high(f1))
            } else {
                (f1, f1)
            };

            let low = self.make_node(var, f00, f10);
            let high = self.make_node(var, f01, f11);

            // The old children may still be alive; the local collection decides.
            self.table.dec_ref(f0);
            self.table.dec_ref(f1);

            let node = &mut self.table.nodes[n as usize];
            node.level = var1;
            node.low = low;
            node.high = high;
            self.link(var1, n);
        }
    }

    /// Free the nodes of `var` that lost their last parent.
    fn local_gc(&mut self, var: u32) {
        let mut freed = 0;
        for n in self.unlink_all(var) {
            let r = Ref::new(n);
            if self.table.refcount(r) > 0 {
                self.link(var, n);
            } else {
                let (low, high) = (self.table.low(r), self.table.high(r));
                self.table.dec_ref(low);
                self.table.dec_ref(high);
                self.table.release_slot(n);
                freed += 1;
            }
        }
        if freed > 0 {
            debug!("local gc of variable {}: {} nodes freed", var, freed);
        }
    }

    /// Resize the region of `var` when it is badly dimensioned for its nodes.
    fn fit(&mut self, var: u32) {
        if !self.levels[var as usize].is_badly_sized() {
            return;
        }
        let nodes = self.unlink_all(var);
        let level = &mut self.levels[var as usize];
        level.node_num = nodes.len();
        level.size = level.fitting_size();
        level.node_num = 0;
        for n in nodes {
            self.link(var, n);
        }
    }

    /// Close the session, restoring the external reference counts and the position mode.
    pub fn done(self) {
        let table = self.table;
        for node in table.nodes[2..].iter_mut() {
            if !node.is_free() {
                node.refcount = 0;
            }
        }
        for &(n, count) in &self.ext_roots {
            table.nodes[n as usize].refcount = count;
        }
        for n in 2..table.size() {
            if !table.nodes[n].is_free() {
                let var = table.nodes[n].level;
                table.nodes[n].level = table.var2level[var as usize];
            }
        }
        table.set_mode(LevelMode::Position);
        debug!("reordering session closed after {} swaps", self.swaps);
        table.gbc();
    }
}
