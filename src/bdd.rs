//! The [`Bdd`] manager.
//!
//! The manager owns the [`NodeTable`], the operation caches and all per-algorithm
//! scratch tables. Every algorithm of the crate is an `impl Bdd` block in its own
//! module ([`apply`][crate::apply], [`sat`][crate::sat], [`inspect`][crate::inspect],
//! [`reorder`][crate::reorder]) working on the table through `&mut self`.
//!
//! # Reference counting
//!
//! Every [`Ref`] returned by a manager operation carries one reference owned by the
//! caller. It keeps the node (and everything below it) alive across garbage
//! collections and reorderings until it is released with [`Bdd::del_ref`]. The
//! variable nodes returned by [`Bdd::ith_var`] and [`Bdd::nith_var`] are pinned and
//! need no bookkeeping.
//!
//! # Operation protocol
//!
//! Recursive algorithms return `Result<Ref, Interrupt>` and protect their intermediate
//! results on the ref stack. A top-level operation runs through [`Bdd::run`], which
//! clears the stack, translates interrupts into [`BddError`] and, when the node table
//! asks for it, performs an automatic reordering and retries the operation from scratch.

use std::fmt::Debug;

use log::debug;
use num_bigint::BigUint;

use crate::apply::QuantTable;
use crate::cache::OpCache;
use crate::config::KernelConfig;
use crate::error::{BddError, Interrupt, Result};
use crate::inspect::SupportTable;
use crate::reference::Ref;
use crate::reorder::ReorderState;
use crate::table::NodeTable;
use crate::tree::BlockTree;

pub struct Bdd {
    pub(crate) table: NodeTable,
    /// Results of `apply` and `not`.
    pub(crate) apply_cache: OpCache<Ref>,
    /// Results of `exists` and `for_all`.
    pub(crate) quant_cache: OpCache<Ref>,
    /// Results of `restrict`.
    pub(crate) misc_cache: OpCache<Ref>,
    pub(crate) count_cache: OpCache<BigUint>,
    pub(crate) path_cache: OpCache<BigUint>,
    /// Pinned nodes of `x` and `!x` for every variable, interleaved.
    vars: Vec<Ref>,
    pub(crate) quant: QuantTable,
    pub(crate) support: SupportTable,
    pub(crate) blocks: BlockTree,
    pub(crate) reorder: ReorderState,
    cache_ratio: usize,
}

/// Counters describing the state of a manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelStatistics {
    pub node_size: usize,
    pub free_nodes: usize,
    /// Occupied slots, terminals included.
    pub used_nodes: usize,
    /// Nodes created since construction.
    pub produced: u64,
    pub var_num: u32,
    pub cache_size: usize,
    pub gc_count: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub reorderings: usize,
}

impl Bdd {
    fn empty(config: &KernelConfig) -> Self {
        let table = NodeTable::new(
            config.node_size,
            config.max_node_increase,
            config.max_node_size,
            config.min_free_nodes,
        );
        let cache_size = if config.cache_ratio > 0 {
            table.size() / config.cache_ratio
        } else {
            config.cache_size
        };
        let reorder = ReorderState::new(config, table.size());

        Self {
            table,
            apply_cache: OpCache::new(cache_size),
            quant_cache: OpCache::new(cache_size),
            misc_cache: OpCache::new(cache_size),
            count_cache: OpCache::new(cache_size),
            path_cache: OpCache::new(cache_size),
            vars: Vec::new(),
            quant: QuantTable::default(),
            support: SupportTable::default(),
            blocks: BlockTree::default(),
            reorder,
            cache_ratio: config.cache_ratio,
        }
    }

    pub fn new(config: KernelConfig) -> Result<Self> {
        debug!("new manager with {:?}", config);
        let mut bdd = Self::empty(&config);
        bdd.set_var_num(config.var_num)?;
        bdd.update_reorder_trigger();
        Ok(bdd)
    }

    /// Create a manager with default parameters and `var_num` variables.
    pub fn with_vars(var_num: u32) -> Result<Self> {
        Self::new(KernelConfig::default().with_var_num(var_num))
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Self::empty(&KernelConfig::default())
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bdd")
            .field("var_num", &self.table.var_num)
            .field("node_size", &self.table.size())
            .field("free_nodes", &self.table.free_num())
            .field("cache_size", &self.apply_cache.size())
            .finish()
    }
}

// Variables.
impl Bdd {
    pub fn var_num(&self) -> u32 {
        self.table.var_num
    }

    /// Grow the variable universe to `var_num` variables. New variables are placed
    /// at the bottom of the order.
    pub fn set_var_num(&mut self, var_num: u32) -> Result<()> {
        let current = self.table.var_num;
        if var_num < current {
            return Err(BddError::DecreasingVarNum {
                current,
                requested: var_num,
            });
        }
        if var_num == current {
            return Ok(());
        }
        debug!("set_var_num: {} -> {}", current, var_num);

        self.disable_reorder();
        let result = self.create_vars(current, var_num);
        self.enable_reorder();
        result?;

        // Counts are relative to the terminal level, which moved down.
        self.reset_caches();
        self.quant.resize(var_num as usize);
        self.support.resize(var_num as usize);
        Ok(())
    }

    /// Add `extra` variables to the universe.
    pub fn extend_var_num(&mut self, extra: u32) -> Result<()> {
        self.set_var_num(self.table.var_num + extra)
    }

    fn create_vars(&mut self, from: u32, to: u32) -> Result<()> {
        self.table.extend_levels(to);
        for v in from..to {
            let level = self.table.var2level[v as usize];
            let pos = self.make_node(level, Ref::ZERO, Ref::ONE).map_err(Interrupt::into_error)?;
            self.table.pin(pos);
            let neg = self.make_node(level, Ref::ONE, Ref::ZERO).map_err(Interrupt::into_error)?;
            self.table.pin(neg);
            self.vars.push(pos);
            self.vars.push(neg);
        }
        Ok(())
    }

    pub(crate) fn check_var(&self, var: u32) -> Result<()> {
        if var >= self.table.var_num {
            return Err(BddError::VariableOutOfRange {
                var,
                var_num: self.table.var_num,
            });
        }
        Ok(())
    }

    /// The function `x_var`.
    pub fn ith_var(&self, var: u32) -> Result<Ref> {
        self.check_var(var)?;
        Ok(self.vars[2 * var as usize])
    }

    /// The function `!x_var`.
    pub fn nith_var(&self, var: u32) -> Result<Ref> {
        self.check_var(var)?;
        Ok(self.vars[2 * var as usize + 1])
    }

    /// Position of `var` in the current variable order.
    pub fn level_of(&self, var: u32) -> Result<u32> {
        self.check_var(var)?;
        Ok(self.table.var2level[var as usize])
    }

    /// Variable at position `level` of the current order.
    pub fn var_at_level(&self, level: u32) -> Result<u32> {
        if level >= self.table.var_num {
            return Err(BddError::VariableOutOfRange {
                var: level,
                var_num: self.table.var_num,
            });
        }
        Ok(self.table.level2var[level as usize])
    }

    /// The current variable order, from the top level down.
    pub fn order(&self) -> Vec<u32> {
        self.table.level2var[..self.table.var_num as usize].to_vec()
    }
}

// Nodes.
impl Bdd {
    fn check_internal(&self, r: Ref) -> Result<()> {
        self.table.check(r)?;
        if r.is_const() {
            return Err(BddError::TerminalNode(r));
        }
        Ok(())
    }

    /// Variable tested by the root of `r`.
    pub fn var(&self, r: Ref) -> Result<u32> {
        self.check_internal(r)?;
        Ok(self.table.variable_of(r))
    }

    /// Else-branch of `r`.
    pub fn low(&self, r: Ref) -> Result<Ref> {
        self.check_internal(r)?;
        Ok(self.table.low(r))
    }

    /// Then-branch of `r`.
    pub fn high(&self, r: Ref) -> Result<Ref> {
        self.check_internal(r)?;
        Ok(self.table.high(r))
    }

    pub fn add_ref(&mut self, r: Ref) -> Result<Ref> {
        self.table.check(r)?;
        self.table.inc_ref(r);
        Ok(r)
    }

    pub fn del_ref(&mut self, r: Ref) -> Result<()> {
        self.table.check(r)?;
        self.table.dec_ref(r);
        Ok(())
    }

    pub fn ref_count(&self, r: Ref) -> Result<u32> {
        self.table.check(r)?;
        Ok(self.table.refcount(r))
    }

    /// Reclaim all nodes that are neither referenced nor reachable from a referenced node.
    pub fn gc(&mut self) {
        self.table.gbc();
        self.reset_caches();
    }

    pub fn statistics(&self) -> KernelStatistics {
        let caches = [
            (self.apply_cache.hits(), self.apply_cache.misses()),
            (self.quant_cache.hits(), self.quant_cache.misses()),
            (self.misc_cache.hits(), self.misc_cache.misses()),
            (self.count_cache.hits(), self.count_cache.misses()),
            (self.path_cache.hits(), self.path_cache.misses()),
        ];
        KernelStatistics {
            node_size: self.table.size(),
            free_nodes: self.table.free_num(),
            used_nodes: self.table.used_num(),
            produced: self.table.produced(),
            var_num: self.table.var_num,
            cache_size: self.apply_cache.size(),
            gc_count: self.table.gc_count(),
            cache_hits: caches.iter().map(|c| c.0).sum(),
            cache_misses: caches.iter().map(|c| c.1).sum(),
            reorderings: self.reorder.sessions,
        }
    }
}

// Construction helpers.
impl Bdd {
    /// Conjunction of literals `(var, phase)`. Contradicting literals yield false.
    pub fn cube(&mut self, literals: &[(u32, bool)]) -> Result<Ref> {
        for &(var, _) in literals {
            self.check_var(var)?;
        }
        self.run(|bdd| {
            let mut lits: Vec<(u32, bool)> = literals
                .iter()
                .map(|&(var, phase)| (bdd.table.var2level[var as usize], phase))
                .collect();
            lits.sort_unstable();
            lits.dedup();
            if lits.windows(2).any(|w| w[0].0 == w[1].0) {
                return Ok(Ref::ZERO);
            }

            let mut res = Ref::ONE;
            for &(level, phase) in lits.iter().rev() {
                res = if phase {
                    bdd.make_node(level, Ref::ZERO, res)?
                } else {
                    bdd.make_node(level, res, Ref::ZERO)?
                };
                bdd.table.push_ref(res);
            }
            Ok(res)
        })
    }

    /// Positive cube of `vars`, the encoding of a variable set.
    pub fn var_set(&mut self, vars: &[u32]) -> Result<Ref> {
        let literals: Vec<(u32, bool)> = vars.iter().map(|&v| (v, true)).collect();
        self.cube(&literals)
    }

    /// Variables of the positive cube `r`, from the top of the order down.
    pub fn scan_set(&self, r: Ref) -> Result<Vec<u32>> {
        self.table.check(r)?;
        let mut vars = Vec::new();
        let mut n = r;
        while !n.is_const() {
            if !self.table.low(n).is_zero() {
                return Err(BddError::NotAVariableSet(r));
            }
            vars.push(self.table.variable_of(n));
            n = self.table.high(n);
        }
        if n.is_zero() {
            return Err(BddError::NotAVariableSet(r));
        }
        Ok(vars)
    }

    /// Evaluate `r` under a total assignment indexed by variable.
    pub fn eval(&self, r: Ref, assignment: &[bool]) -> Result<bool> {
        self.table.check(r)?;
        let mut n = r;
        while !n.is_const() {
            let var = self.table.variable_of(n);
            let value = *assignment.get(var as usize).ok_or(BddError::VariableOutOfRange {
                var,
                var_num: assignment.len() as u32,
            })?;
            n = if value { self.table.high(n) } else { self.table.low(n) };
        }
        Ok(n.is_one())
    }
}

// Kernel plumbing shared by all algorithms.
impl Bdd {
    /// [`NodeTable::make_node`] that keeps the caches consistent with collections.
    pub(crate) fn make_node(&mut self, level: u32, low: Ref, high: Ref) -> std::result::Result<Ref, Interrupt> {
        let gc_count = self.table.gc_count();
        let size = self.table.size();
        let res = self.table.make_node(level, low, high);
        if self.table.gc_count() != gc_count {
            if self.cache_ratio > 0 && self.table.size() != size {
                self.resize_caches(self.table.size() / self.cache_ratio);
            } else {
                self.reset_caches();
            }
        }
        res
    }

    pub(crate) fn reset_caches(&mut self) {
        self.apply_cache.reset();
        self.quant_cache.reset();
        self.misc_cache.reset();
        self.count_cache.reset();
        self.path_cache.reset();
    }

    fn resize_caches(&mut self, size: usize) {
        debug!("resizing operation caches to {}", size);
        self.apply_cache.resize(size);
        self.quant_cache.resize(size);
        self.misc_cache.resize(size);
        self.count_cache.resize(size);
        self.path_cache.resize(size);
    }

    /// Run a top-level operation and hand one reference on its result to the caller.
    pub(crate) fn run<F>(&mut self, mut op: F) -> Result<Ref>
    where
        F: FnMut(&mut Self) -> std::result::Result<Ref, Interrupt>,
    {
        loop {
            self.table.clear_ref_stack();
            let outcome = op(self);
            self.table.clear_ref_stack();
            match outcome {
                Ok(res) => {
                    self.table.inc_ref(res);
                    return Ok(res);
                }
                Err(Interrupt::Reorder) => self.auto_reorder()?,
                Err(interrupt) => return Err(interrupt.into_error()),
            }
        }
    }

    pub(crate) fn with_reorder_disabled<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.disable_reorder();
        let res = f(self);
        self.enable_reorder();
        res
    }
}
