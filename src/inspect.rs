//! Structural queries: node counts, supports and node listings.

use crate::bdd::Bdd;
use crate::error::Result;
use crate::reference::Ref;

/// A node of a diagram, as reported by [`Bdd::all_nodes`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct NodeInfo {
    pub node: Ref,
    pub var: u32,
    pub low: Ref,
    pub high: Ref,
}

/// Scratch table of [`Bdd::support`], indexed by order position.
#[derive(Debug, Default)]
pub(crate) struct SupportTable {
    set: Vec<u32>,
    id: u32,
    min: u32,
    max: u32,
}

impl SupportTable {
    pub fn resize(&mut self, var_num: usize) {
        self.set = vec![0; var_num];
        self.id = 0;
    }

    fn next_id(&mut self) {
        if self.id == 0x0FFF_FFFF {
            self.set.fill(0);
            self.id = 0;
        }
        self.id += 1;
    }
}

impl Bdd {
    /// Number of internal nodes of `r`.
    pub fn node_count(&mut self, r: Ref) -> Result<usize> {
        self.node_count_many(&[r])
    }

    /// Number of internal nodes of the shared diagram rooted at `roots`.
    pub fn node_count_many(&mut self, roots: &[Ref]) -> Result<usize> {
        for &r in roots {
            self.table.check(r)?;
        }
        let count = roots.iter().map(|&r| self.table.mark_rec(r)).sum();
        for &r in roots {
            self.table.unmark_rec(r);
        }
        Ok(count)
    }

    /// Number of nodes of `r` labelled with each variable.
    pub fn var_profile(&mut self, r: Ref) -> Result<Vec<usize>> {
        self.table.check(r)?;
        let mut profile = vec![0; self.table.var_num as usize];
        self.var_profile_rec(r, &mut profile);
        self.table.unmark_rec(r);
        Ok(profile)
    }

    fn var_profile_rec(&mut self, r: Ref, profile: &mut [usize]) {
        if r.is_const() || self.table.node(r).mark {
            return;
        }
        profile[self.table.variable_of(r) as usize] += 1;
        self.table.nodes[r.index()].mark = true;
        self.var_profile_rec(self.table.low(r), profile);
        self.var_profile_rec(self.table.high(r), profile);
    }

    /// All internal nodes of `r`, ordered by id.
    pub fn all_nodes(&mut self, r: Ref) -> Result<Vec<NodeInfo>> {
        self.table.check(r)?;
        self.table.mark_rec(r);
        let nodes = (2..self.table.size())
            .filter(|&n| self.table.nodes[n].mark)
            .map(|n| {
                let node = Ref::new(n as u32);
                NodeInfo {
                    node,
                    var: self.table.variable_of(node),
                    low: self.table.low(node),
                    high: self.table.high(node),
                }
            })
            .collect();
        self.table.unmark_rec(r);
        Ok(nodes)
    }

    /// Positive cube of all variables `r` depends on.
    pub fn support(&mut self, r: Ref) -> Result<Ref> {
        self.table.check(r)?;
        if r.is_const() {
            return Ok(Ref::ONE);
        }

        self.support.next_id();
        self.support.min = self.table.order_position_of(r);
        self.support.max = self.support.min;
        self.support_rec(r);
        self.table.unmark_rec(r);

        self.with_reorder_disabled(|bdd| {
            bdd.run(|bdd| {
                let mut res = Ref::ONE;
                for level in (bdd.support.min..=bdd.support.max).rev() {
                    if bdd.support.set[level as usize] == bdd.support.id {
                        res = bdd.make_node(level, Ref::ZERO, res)?;
                        bdd.table.push_ref(res);
                    }
                }
                Ok(res)
            })
        })
    }

    fn support_rec(&mut self, r: Ref) {
        if r.is_const() || self.table.node(r).mark {
            return;
        }
        let level = self.table.order_position_of(r);
        self.support.set[level as usize] = self.support.id;
        self.support.max = self.support.max.max(level);
        self.table.nodes[r.index()].mark = true;
        self.support_rec(self.table.low(r));
        self.support_rec(self.table.high(r));
    }
}
