//! Search strategies over a chain of sibling blocks.
//!
//! A [`Chain`] is a run of consecutive levels split into units: declared blocks and
//! single free variables. Strategies only ever exchange two neighbouring units with
//! [`Chain::block_down`], so each unit keeps its internal order.

use log::debug;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::error::Result;
use crate::reorder::session::Session;
use crate::tree::BlockId;

#[derive(Debug, Clone)]
pub(crate) struct Unit {
    /// The declared block, or `None` for a single free variable.
    pub block: Option<BlockId>,
    /// Number of variables.
    pub size: u32,
    /// Identity of the unit within its chain.
    pub tag: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Chain {
    /// Level of the first variable of the first unit.
    pub start: u32,
    pub units: Vec<Unit>,
}

impl Chain {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Top level of the `i`-th unit.
    fn level_of(&self, i: usize) -> u32 {
        self.start + self.units[..i].iter().map(|u| u.size).sum::<u32>()
    }

    fn position_of(&self, tag: usize) -> usize {
        self.units.iter().position(|u| u.tag == tag).unwrap_or(0)
    }

    /// Exchange the `i`-th unit with the one below it.
    pub fn block_down(&mut self, session: &mut Session<'_>, i: usize) -> Result<()> {
        let top = self.level_of(i);
        let (upper, lower) = (self.units[i].size, self.units[i + 1].size);
        for k in (0..upper).rev() {
            let var = session.var_at(top + k);
            for _ in 0..lower {
                session.var_down(var)?;
            }
        }
        self.units.swap(i, i + 1);
        debug!(
            "block_down at level {}: {} + {} variables, {} nodes",
            top,
            upper,
            lower,
            session.node_num()
        );
        Ok(())
    }

    /// Sum of the node counts of the variables of the `i`-th unit.
    fn unit_node_num(&self, session: &Session<'_>, i: usize) -> usize {
        let top = self.level_of(i);
        (top..top + self.units[i].size)
            .map(|level| session.var_node_num(session.var_at(level)))
            .sum()
    }

    /// Try every neighbouring exchange once, keeping those that shrink the table.
    pub fn win2(&mut self, session: &mut Session<'_>) -> Result<()> {
        for i in 0..self.len().saturating_sub(1) {
            self.win2_step(session, i)?;
        }
        Ok(())
    }

    fn win2_step(&mut self, session: &mut Session<'_>, i: usize) -> Result<()> {
        let best = session.node_num();
        self.block_down(session, i)?;
        if session.node_num() >= best {
            self.block_down(session, i)?;
        }
        Ok(())
    }

    pub fn win2_ite(&mut self, session: &mut Session<'_>) -> Result<()> {
        loop {
            let last = session.node_num();
            self.win2(session)?;
            if session.node_num() == last {
                return Ok(());
            }
        }
    }

    /// Try all permutations of every window of three neighbouring units.
    pub fn win3(&mut self, session: &mut Session<'_>) -> Result<()> {
        if self.len() == 2 {
            return self.win2_step(session, 0);
        }
        for i in 0..self.len().saturating_sub(2) {
            self.win3_window(session, i)?;
        }
        Ok(())
    }

    /// Visit the six orders of the window at `i` by alternating the two possible
    /// exchanges, then return to the smallest one.
    fn win3_window(&mut self, session: &mut Session<'_>, i: usize) -> Result<()> {
        let mut best = session.node_num();
        let mut best_state = 0;
        for j in 0..5 {
            self.block_down(session, i + j % 2)?;
            if session.node_num() < best {
                best = session.node_num();
                best_state = j + 1;
            }
        }

        // State 5 is reached after exchanges 0..5; exchange 5 closes the cycle.
        let forward = (best_state + 1) % 6;
        let backward = 5 - best_state;
        if forward < backward {
            for j in 5..5 + forward {
                self.block_down(session, i + j % 2)?;
            }
        } else {
            for j in (best_state..5).rev() {
                self.block_down(session, i + j % 2)?;
            }
        }
        Ok(())
    }

    pub fn win3_ite(&mut self, session: &mut Session<'_>) -> Result<()> {
        loop {
            let last = session.node_num();
            self.win3(session)?;
            if session.node_num() == last {
                return Ok(());
            }
        }
    }

    /// Move every unit, largest first, to its best position in the chain.
    pub fn sift(&mut self, session: &mut Session<'_>) -> Result<()> {
        let mut order: Vec<(usize, usize)> = (0..self.len())
            .map(|i| (self.units[i].tag, self.unit_node_num(session, i)))
            .collect();
        order.sort_by(|a, b| b.1.cmp(&a.1));

        let middle = self.len() / 2;
        for (tag, _) in order {
            self.sift_unit(session, tag, middle)?;
        }
        Ok(())
    }

    fn sift_unit(&mut self, session: &mut Session<'_>, tag: usize, middle: usize) -> Result<()> {
        let mut pos = self.position_of(tag);
        let mut best = session.node_num();
        let mut best_pos = pos;
        let mut max_allowed = session.sift_bound(best);
        let mut up = pos <= middle;

        for _ in 0..2 {
            let mut first = true;
            if up {
                while pos > 0 && (session.node_num() <= max_allowed || first) {
                    first = false;
                    self.block_down(session, pos - 1)?;
                    pos -= 1;
                    if session.node_num() < best {
                        best = session.node_num();
                        best_pos = pos;
                        max_allowed = session.sift_bound(best);
                    }
                }
            } else {
                while pos + 1 < self.len() && (session.node_num() <= max_allowed || first) {
                    first = false;
                    self.block_down(session, pos)?;
                    pos += 1;
                    if session.node_num() < best {
                        best = session.node_num();
                        best_pos = pos;
                        max_allowed = session.sift_bound(best);
                    }
                }
            }
            up = !up;
        }

        while pos < best_pos {
            self.block_down(session, pos)?;
            pos += 1;
        }
        while pos > best_pos {
            self.block_down(session, pos - 1)?;
            pos -= 1;
        }
        Ok(())
    }

    pub fn sift_ite(&mut self, session: &mut Session<'_>) -> Result<()> {
        loop {
            let last = session.node_num();
            self.sift(session)?;
            if session.node_num() >= last {
                return Ok(());
            }
        }
    }

    /// Perform random neighbouring exchanges.
    pub fn random(&mut self, session: &mut Session<'_>, rng: &mut ChaCha8Rng) -> Result<()> {
        let len = self.len();
        if len < 2 {
            return Ok(());
        }
        for _ in 0..4 * len {
            let i = rng.gen_range(0..len);
            if i + 1 < len {
                self.block_down(session, i)?;
            }
        }
        Ok(())
    }
}
