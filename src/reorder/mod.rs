//! Dynamic variable reordering.
//!
//! # Why ordering matters
//!
//! The size of a BDD is highly sensitive to the variable order. For
//! `f = (x₁ ∧ y₁) ∨ (x₂ ∧ y₂) ∨ ... ∨ (xₙ ∧ yₙ)`:
//!
//! - the order `x₁, y₁, x₂, y₂, ..., xₙ, yₙ` gives O(n) nodes,
//! - the order `x₁, x₂, ..., xₙ, y₁, ..., yₙ` gives O(2ⁿ) nodes.
//!
//! Finding an optimal order is NP-complete, so the manager improves the current one
//! with local transformations built from a single primitive: the exchange of two
//! adjacent variables, which only rewrites nodes of the upper variable that have a
//! child labelled with the lower one.
//!
//! # Methods
//!
//! - **Window permutation** ([`ReorderMethod::Win2`], [`ReorderMethod::Win3`]): slide a
//!   window of two or three neighbours over the order and keep the best permutation
//!   of each window. The `Ite` variants repeat until nothing changes.
//! - **Sifting** ([`ReorderMethod::Sift`]): move each variable, largest level first,
//!   through all positions and leave it where the table was smallest. Exploration in
//!   one direction stops once the table grows 20% over the best size seen.
//!   [`ReorderMethod::SiftIte`] repeats while the size decreases.
//! - **Random** ([`ReorderMethod::Random`]): random adjacent exchanges, seeded by
//!   [`KernelConfig::random_seed`] for reproducibility.
//!
//! # Variable blocks
//!
//! Variables can be grouped into blocks with [`Bdd::add_variable_block`]. A block
//! moves as one unit, and the members of a `fixed` block keep their relative order.
//! Reordering runs the chosen method on the top-level blocks and free variables, then
//! recursively inside every block that is not fixed.
//!
//! # Automatic reordering
//!
//! With [`Bdd::set_auto_reorder`], a garbage collection that leaves more live nodes
//! than the current threshold interrupts the running operation. The manager then
//! reorders and retries the operation from scratch. After each automatic session the
//! threshold is raised to at least twice the live node count.
//!
//! # References
//!
//! - R. Rudell. "Dynamic variable ordering for ordered binary decision diagrams."
//!   ICCAD 1993.
//! - M. Fujita, Y. Matsunaga, T. Kakuda. "On variable ordering of binary decision
//!   diagrams for the application of multi-level logic synthesis." EDAC 1991.

mod interaction;
mod session;
mod strategy;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::bdd::Bdd;
use crate::config::KernelConfig;
use crate::error::{BddError, Result};
use crate::reference::Ref;
use crate::tree::{BlockId, BlockTree};

use self::session::Session;
use self::strategy::{Chain, Unit};

/// Reordering heuristics.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ReorderMethod {
    /// Leave the order unchanged.
    #[default]
    None,
    Win2,
    Win2Ite,
    Win3,
    Win3Ite,
    Sift,
    SiftIte,
    Random,
}

impl ReorderMethod {
    pub const ALL: [ReorderMethod; 8] = [
        ReorderMethod::None,
        ReorderMethod::Win2,
        ReorderMethod::Win2Ite,
        ReorderMethod::Win3,
        ReorderMethod::Win3Ite,
        ReorderMethod::Sift,
        ReorderMethod::SiftIte,
        ReorderMethod::Random,
    ];

    fn name(self) -> &'static str {
        match self {
            ReorderMethod::None => "none",
            ReorderMethod::Win2 => "win2",
            ReorderMethod::Win2Ite => "win2ite",
            ReorderMethod::Win3 => "win3",
            ReorderMethod::Win3Ite => "win3ite",
            ReorderMethod::Sift => "sift",
            ReorderMethod::SiftIte => "siftite",
            ReorderMethod::Random => "random",
        }
    }

    fn apply(self, chain: &mut Chain, session: &mut Session<'_>, rng: &mut ChaCha8Rng) -> Result<()> {
        match self {
            ReorderMethod::None => Ok(()),
            ReorderMethod::Win2 => chain.win2(session),
            ReorderMethod::Win2Ite => chain.win2_ite(session),
            ReorderMethod::Win3 => chain.win3(session),
            ReorderMethod::Win3Ite => chain.win3_ite(session),
            ReorderMethod::Sift => chain.sift(session),
            ReorderMethod::SiftIte => chain.sift_ite(session),
            ReorderMethod::Random => chain.random(session, rng),
        }
    }
}

impl Display for ReorderMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ReorderMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.name() == lower)
            .ok_or_else(|| format!("unknown reordering method '{}'", s))
    }
}

/// Statistics of one reordering session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderStats {
    pub method: ReorderMethod,
    /// Number of adjacent variable exchanges performed.
    pub swaps: usize,
    /// Live nodes (terminals included) when the session started.
    pub initial_size: usize,
    /// Live nodes when the session ended.
    pub final_size: usize,
}

impl ReorderStats {
    /// Relative size reduction, negative when the table grew.
    pub fn reduction_ratio(&self) -> f64 {
        if self.initial_size == 0 {
            return 0.0;
        }
        1.0 - (self.final_size as f64 / self.initial_size as f64)
    }

    pub fn reduction_percent(&self) -> f64 {
        self.reduction_ratio() * 100.0
    }
}

/// Reordering bookkeeping of a manager.
#[derive(Debug)]
pub(crate) struct ReorderState {
    auto_method: ReorderMethod,
    auto_times: usize,
    /// Nesting depth of `disable_reorder`.
    disabled: u32,
    /// Live node count from which an automatic session starts.
    threshold: usize,
    last: Option<ReorderStats>,
    rng: ChaCha8Rng,
    /// Sessions run so far, manual and automatic.
    pub sessions: usize,
}

impl ReorderState {
    pub fn new(config: &KernelConfig, table_size: usize) -> Self {
        Self {
            auto_method: config.auto_reorder,
            auto_times: config.auto_reorder_times,
            disabled: 0,
            threshold: table_size * (100 - config.min_free_nodes.min(100)) / 100,
            last: None,
            rng: ChaCha8Rng::seed_from_u64(config.random_seed),
            sessions: 0,
        }
    }
}

/// Units of a run of levels `start..end`: the given blocks and the remaining free
/// variables, in order.
fn chain_over(session: &Session<'_>, blocks: &BlockTree, members: &[BlockId], start: u32, end: u32) -> Chain {
    let mut units = Vec::new();
    let mut level = start;
    while level < end {
        let var = session.var_at(level);
        let block = members.iter().copied().find(|&b| blocks.block(b).contains(var));
        let size = block.map_or(1, |b| blocks.block(b).size());
        units.push(Unit {
            block,
            size,
            tag: units.len(),
        });
        level += size;
    }
    Chain { start, units }
}

fn reorder_block(
    session: &mut Session<'_>,
    blocks: &mut BlockTree,
    id: BlockId,
    method: ReorderMethod,
    rng: &mut ChaCha8Rng,
) -> Result<()> {
    let block = blocks.block(id);
    if !block.fixed && block.size() > 1 {
        // Members have not moved relative to each other yet, so `seq` starts at the top.
        let start = block.seq.first().map_or(0, |&v| session.level_of(v));
        let end = start + block.size();
        let mut chain = chain_over(session, blocks, &block.children, start, end);
        method.apply(&mut chain, session, rng)?;
        let children = chain.units.iter().filter_map(|u| u.block).collect();
        blocks.set_children(id, children);
    }

    for child in blocks.block(id).children.clone() {
        reorder_block(session, blocks, child, method, rng)?;
    }
    Ok(())
}

fn reorder_tree(
    session: &mut Session<'_>,
    blocks: &mut BlockTree,
    method: ReorderMethod,
    rng: &mut ChaCha8Rng,
) -> Result<()> {
    let mut chain = chain_over(session, blocks, &blocks.roots, 0, session.var_num());
    method.apply(&mut chain, session, rng)?;
    blocks.roots = chain.units.iter().filter_map(|u| u.block).collect();

    for root in blocks.roots.clone() {
        reorder_block(session, blocks, root, method, rng)?;
    }
    Ok(())
}

impl Bdd {
    /// Improve the variable order with `method`.
    ///
    /// Every function referenced from outside the manager keeps its meaning, and all
    /// `Ref`s held by the caller stay valid. Operation caches are cleared.
    ///
    /// # Examples
    ///
    /// ```
    /// use bdd_kernel::bdd::Bdd;
    /// use bdd_kernel::reorder::ReorderMethod;
    ///
    /// let mut bdd = Bdd::with_vars(4).unwrap();
    /// // (x0 & x2) | (x1 & x3) is smaller with x0, x2 adjacent.
    /// let a = bdd.apply_and(bdd.ith_var(0).unwrap(), bdd.ith_var(2).unwrap()).unwrap();
    /// let b = bdd.apply_and(bdd.ith_var(1).unwrap(), bdd.ith_var(3).unwrap()).unwrap();
    /// let f = bdd.apply_or(a, b).unwrap();
    ///
    /// let stats = bdd.reorder(ReorderMethod::Sift).unwrap();
    /// assert!(stats.final_size <= stats.initial_size);
    /// assert!(bdd.eval(f, &[true, false, true, false]).unwrap());
    /// ```
    pub fn reorder(&mut self, method: ReorderMethod) -> Result<ReorderStats> {
        debug!("reorder(method = {})", method);
        self.session(method, |session, blocks, rng| reorder_tree(session, blocks, method, rng))
    }

    /// Exchange the levels of the variables `a` and `b`.
    ///
    /// Not available while variable blocks are declared.
    pub fn swap_variables(&mut self, a: u32, b: u32) -> Result<()> {
        if !self.blocks.is_empty() {
            return Err(BddError::SwapWithBlocks);
        }
        self.check_var(a)?;
        self.check_var(b)?;
        if a == b {
            return Ok(());
        }
        debug!("swap_variables({}, {})", a, b);

        self.session(ReorderMethod::None, |session, _, _| {
            let (l1, l2) = {
                let (la, lb) = (session.level_of(a), session.level_of(b));
                (la.min(lb), la.max(lb))
            };
            let upper = session.var_at(l1);
            let lower = session.var_at(l2);
            for _ in l1..l2 {
                session.var_down(upper)?;
            }
            for _ in l1..l2 - 1 {
                session.var_up(lower)?;
            }
            Ok(())
        })
        .map(|_| ())
    }

    /// Run `f` inside a reordering session and record its statistics.
    fn session<F>(&mut self, method: ReorderMethod, f: F) -> Result<ReorderStats>
    where
        F: FnOnce(&mut Session<'_>, &mut BlockTree, &mut ChaCha8Rng) -> Result<()>,
    {
        self.reset_caches();
        let mut session = Session::new(&mut self.table);
        let initial_size = session.node_num();
        let outcome = f(&mut session, &mut self.blocks, &mut self.reorder.rng);
        let stats = ReorderStats {
            method,
            swaps: session.swaps(),
            initial_size,
            final_size: session.node_num(),
        };
        session.done();
        self.blocks.update_seq(&self.table.var2level);
        self.reset_caches();
        self.reorder.sessions += 1;
        outcome?;

        info!(
            "reordering ({}): {} -> {} nodes ({:.1}% reduction) in {} swaps",
            method,
            stats.initial_size,
            stats.final_size,
            stats.reduction_percent(),
            stats.swaps
        );
        self.reorder.last = Some(stats.clone());
        Ok(stats)
    }

    /// Statistics of the most recent successful reordering.
    pub fn last_reorder_stats(&self) -> Option<&ReorderStats> {
        self.reorder.last.as_ref()
    }

    /// Declare the variables `first..=last` as a block.
    ///
    /// The variables must occupy consecutive levels. When `fixed`, reordering keeps
    /// their relative order. Blocks may nest but must not partially overlap.
    pub fn add_variable_block(&mut self, first: u32, last: u32, fixed: bool) -> Result<()> {
        self.check_var(first)?;
        self.check_var(last)?;
        if first > last {
            return Err(BddError::InvalidBlock { first, last });
        }
        let levels = (first..=last).map(|v| self.table.var2level[v as usize]);
        let (min, max) = levels.fold((u32::MAX, 0), |(lo, hi), l| (lo.min(l), hi.max(l)));
        if max - min != last - first {
            return Err(BddError::InvalidBlock { first, last });
        }
        self.blocks.add_range(first, last, fixed, &self.table.var2level)?;
        Ok(())
    }

    /// Declare a block spanning the smallest and largest variable of the cube `set`.
    pub fn add_variable_block_set(&mut self, set: Ref, fixed: bool) -> Result<()> {
        let vars = self.scan_set(set)?;
        let (Some(&first), Some(&last)) = (vars.iter().min(), vars.iter().max()) else {
            return Err(BddError::NotAVariableSet(set));
        };
        self.add_variable_block(first, last, fixed)
    }

    /// Declare every variable as a fixed singleton block.
    pub fn add_variable_block_all(&mut self) -> Result<()> {
        for var in 0..self.var_num() {
            self.add_variable_block(var, var, true)?;
        }
        Ok(())
    }

    pub fn clear_variable_blocks(&mut self) {
        self.blocks.clear();
    }

    /// Enable automatic reordering with `method`, for at most `times` sessions.
    pub fn set_auto_reorder(&mut self, method: ReorderMethod, times: usize) {
        self.reorder.auto_method = method;
        self.reorder.auto_times = times;
        self.update_reorder_trigger();
    }

    /// Suspend automatic reordering. Calls nest.
    pub fn disable_reorder(&mut self) {
        self.reorder.disabled += 1;
        self.update_reorder_trigger();
    }

    pub fn enable_reorder(&mut self) {
        self.reorder.disabled = self.reorder.disabled.saturating_sub(1);
        self.update_reorder_trigger();
    }

    /// Arm the node table to request a session once it holds `threshold` live nodes.
    pub(crate) fn update_reorder_trigger(&mut self) {
        let state = &self.reorder;
        let armed = state.auto_method != ReorderMethod::None
            && state.disabled == 0
            && state.auto_times > 0
            && self.table.var_num > 1;
        self.table.set_reorder_trigger(armed.then_some(state.threshold));
    }

    /// Session requested by the node table in the middle of an operation.
    pub(crate) fn auto_reorder(&mut self) -> Result<()> {
        let method = self.reorder.auto_method;
        self.reorder.auto_times = self.reorder.auto_times.saturating_sub(1);
        debug!("automatic reordering, {} sessions left", self.reorder.auto_times);

        let outcome = self.session(method, |session, blocks, rng| reorder_tree(session, blocks, method, rng));
        if let Ok(stats) = &outcome {
            self.reorder.threshold = self.reorder.threshold.max(2 * stats.final_size);
        }
        self.update_reorder_trigger();
        outcome.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    /// `(x0 & y0) | (x1 & y1) | ...` with all `x` above all `y`.
    fn separated_pairs(bdd: &mut Bdd, n: u32) -> Ref {
        let mut terms = Vec::new();
        for i in 0..n {
            let x = bdd.ith_var(i).unwrap();
            let y = bdd.ith_var(n + i).unwrap();
            terms.push(bdd.apply_and(x, y).unwrap());
        }
        bdd.apply_or_many(terms).unwrap()
    }

    fn truth_table(bdd: &Bdd, f: Ref) -> Vec<bool> {
        let n = bdd.var_num() as usize;
        (0..1u32 << n)
            .map(|bits| {
                let assignment: Vec<bool> = (0..n).map(|i| bits & (1 << i) != 0).collect();
                bdd.eval(f, &assignment).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_method_names() {
        for method in ReorderMethod::ALL {
            assert_eq!(method.to_string().parse::<ReorderMethod>(), Ok(method));
        }
        assert_eq!("SIFT".parse::<ReorderMethod>(), Ok(ReorderMethod::Sift));
        assert!("bubble".parse::<ReorderMethod>().is_err());
    }

    #[test]
    fn test_reorder_preserves_functions() {
        for method in ReorderMethod::ALL {
            let mut bdd = Bdd::with_vars(6).unwrap();
            let f = separated_pairs(&mut bdd, 3);
            let expected = truth_table(&bdd, f);

            let stats = bdd.reorder(method).unwrap();
            assert_eq!(stats.method, method);
            assert_eq!(truth_table(&bdd, f), expected, "method {}", method);
            if method != ReorderMethod::Random {
                assert!(stats.final_size <= stats.initial_size, "method {}", method);
            }
            assert_eq!(bdd.last_reorder_stats(), Some(&stats));
        }
    }

    #[test]
    fn test_sift_shrinks_separated_pairs() {
        let mut bdd = Bdd::with_vars(8).unwrap();
        separated_pairs(&mut bdd, 4);
        let stats = bdd.reorder(ReorderMethod::Sift).unwrap();
        assert!(stats.final_size < stats.initial_size);
        assert!(stats.swaps > 0);
        assert!(stats.reduction_percent() > 0.0);
    }

    #[test]
    fn test_none_keeps_order() {
        let mut bdd = Bdd::with_vars(4).unwrap();
        separated_pairs(&mut bdd, 2);
        let stats = bdd.reorder(ReorderMethod::None).unwrap();
        assert_eq!(stats.swaps, 0);
        assert_eq!(stats.initial_size, stats.final_size);
        assert_eq!(bdd.order(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_win2_reverts_swap_without_gain() {
        let mut bdd = Bdd::with_vars(2).unwrap();
        let x = bdd.ith_var(0).unwrap();
        let y = bdd.ith_var(1).unwrap();
        let f = bdd.apply_and(x, y).unwrap();

        let stats = bdd.reorder(ReorderMethod::Win2).unwrap();
        assert_eq!(stats.swaps, 2);
        assert_eq!(stats.initial_size, stats.final_size);
        assert_eq!(bdd.order(), vec![0, 1]);
        assert_eq!(bdd.node_count(f).unwrap(), 2);
    }

    #[test]
    fn test_swap_variables() {
        let mut bdd = Bdd::with_vars(4).unwrap();
        let f = separated_pairs(&mut bdd, 2);
        let expected = truth_table(&bdd, f);

        bdd.swap_variables(1, 3).unwrap();
        assert_eq!(bdd.order(), vec![0, 3, 2, 1]);
        assert_eq!(truth_table(&bdd, f), expected);

        bdd.swap_variables(3, 0).unwrap();
        assert_eq!(bdd.order(), vec![3, 0, 2, 1]);
        bdd.swap_variables(2, 2).unwrap();
        assert_eq!(truth_table(&bdd, f), expected);

        assert!(matches!(
            bdd.swap_variables(0, 4),
            Err(BddError::VariableOutOfRange { var: 4, .. })
        ));
    }

    #[test]
    fn test_swap_rejected_with_blocks() {
        let mut bdd = Bdd::with_vars(4).unwrap();
        bdd.add_variable_block(0, 1, false).unwrap();
        assert_eq!(bdd.swap_variables(0, 2), Err(BddError::SwapWithBlocks));
        bdd.clear_variable_blocks();
        bdd.swap_variables(0, 2).unwrap();
    }

    #[test]
    fn test_block_must_be_contiguous() {
        let mut bdd = Bdd::with_vars(4).unwrap();
        bdd.swap_variables(1, 3).unwrap();
        // Order: 0 3 2 1
        assert_eq!(
            bdd.add_variable_block(0, 1, false),
            Err(BddError::InvalidBlock { first: 0, last: 1 })
        );
        bdd.add_variable_block(2, 3, false).unwrap();
        assert_eq!(
            bdd.add_variable_block(3, 2, false),
            Err(BddError::InvalidBlock { first: 3, last: 2 })
        );
    }

    #[test]
    fn test_blocks_move_as_units() {
        let mut bdd = Bdd::with_vars(6).unwrap();
        let f = separated_pairs(&mut bdd, 3);
        let expected = truth_table(&bdd, f);
        bdd.add_variable_block(0, 2, true).unwrap();
        bdd.add_variable_block(3, 5, false).unwrap();

        bdd.reorder(ReorderMethod::Sift).unwrap();
        assert_eq!(truth_table(&bdd, f), expected);

        let levels: Vec<u32> = (0..6).map(|v| bdd.level_of(v).unwrap()).collect();
        // The fixed block keeps its internal order.
        assert_eq!(levels[1], levels[0] + 1);
        assert_eq!(levels[2], levels[0] + 2);
        // The other block stays contiguous.
        let (lo, hi) = (levels[3..].iter().min().unwrap(), levels[3..].iter().max().unwrap());
        assert_eq!(hi - lo, 2);
    }

    #[test]
    fn test_block_set_and_all() {
        let mut bdd = Bdd::with_vars(4).unwrap();
        let set = bdd.var_set(&[1, 2]).unwrap();
        bdd.add_variable_block_set(set, false).unwrap();
        assert_eq!(bdd.add_variable_block_set(Ref::ONE, false), Err(BddError::NotAVariableSet(Ref::ONE)));
        bdd.add_variable_block_all().unwrap();
        bdd.reorder(ReorderMethod::Win2Ite).unwrap();
        // Variables 1 and 2 stay adjacent.
        let levels: Vec<u32> = (0..4).map(|v| bdd.level_of(v).unwrap()).collect();
        assert_eq!(levels[1].abs_diff(levels[2]), 1);
    }

    #[test]
    fn test_auto_reorder() {
        let config = KernelConfig::default()
            .with_node_size(100)
            .with_var_num(12)
            .with_auto_reorder(ReorderMethod::Sift, 5);
        let mut bdd = Bdd::new(config).unwrap();
        let f = separated_pairs(&mut bdd, 6);

        assert!(bdd.statistics().reorderings >= 1);
        assert!(bdd.last_reorder_stats().is_some());
        for i in 0..6 {
            let mut assignment = vec![false; 12];
            assert!(!bdd.eval(f, &assignment).unwrap());
            assignment[i] = true;
            assignment[6 + i] = true;
            assert!(bdd.eval(f, &assignment).unwrap());
        }
    }

    #[test]
    fn test_disabled_auto_reorder() {
        let config = KernelConfig::default()
            .with_node_size(100)
            .with_var_num(12)
            .with_auto_reorder(ReorderMethod::Sift, 5);
        let mut bdd = Bdd::new(config).unwrap();
        bdd.disable_reorder();
        separated_pairs(&mut bdd, 6);
        bdd.enable_reorder();
        assert_eq!(bdd.statistics().reorderings, 0);
        assert_eq!(bdd.order(), (0..12).collect::<Vec<_>>());
    }
}
