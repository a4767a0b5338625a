//! Variable interaction matrix.
//!
//! Two variables interact when some externally referenced function depends on both.
//! Swapping two adjacent variables that do not interact cannot change any node, so
//! the swap degenerates into an update of the order tables.

use crate::bitset::BitSet;
use crate::reference::Ref;
use crate::table::NodeTable;

#[derive(Debug, Clone)]
pub(crate) struct InteractionMatrix {
    rows: Vec<BitSet>,
}

impl InteractionMatrix {
    pub fn new(var_num: usize) -> Self {
        Self {
            rows: vec![BitSet::new(var_num); var_num],
        }
    }

    pub fn set(&mut self, a: u32, b: u32) {
        self.rows[a as usize].insert(b as usize);
        self.rows[b as usize].insert(a as usize);
    }

    pub fn depends(&self, a: u32, b: u32) -> bool {
        self.rows[a as usize].contains(b as usize)
    }

    /// Matrix of the functions rooted at `roots`.
    ///
    /// The table must be in variable mode, so that the level field of every node holds
    /// its variable.
    pub fn build(table: &NodeTable, roots: &[u32]) -> Self {
        let var_num = table.var_num as usize;
        let mut matrix = Self::new(var_num);
        let mut visited = vec![0u32; table.size()];
        let mut stack = Vec::new();

        for (stamp, &root) in (1u32..).zip(roots) {
            let mut support = BitSet::new(var_num);
            stack.push(Ref::new(root));
            while let Some(r) = stack.pop() {
                if r.is_const() || visited[r.index()] == stamp {
                    continue;
                }
                visited[r.index()] = stamp;
                support.insert(table.raw_level(r) as usize);
                stack.push(table.low(r));
                stack.push(table.high(r));
            }

            let vars: Vec<usize> = support.iter().collect();
            for (i, &a) in vars.iter().enumerate() {
                for &b in &vars[i..] {
                    matrix.set(a as u32, b as u32);
                }
            }
        }

        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric() {
        let mut matrix = InteractionMatrix::new(4);
        matrix.set(1, 3);
        assert!(matrix.depends(1, 3));
        assert!(matrix.depends(3, 1));
        assert!(!matrix.depends(0, 1));
    }

    #[test]
    fn test_build_from_roots() {
        let mut table = NodeTable::new(100, 0, 0, 20);
        table.extend_levels(4);
        // Functions over {0, 1} and {2}; with the identity order levels are variables.
        let b = table.make_node(1, Ref::ZERO, Ref::ONE).unwrap();
        let f = table.make_node(0, Ref::ZERO, b).unwrap();
        let g = table.make_node(2, Ref::ONE, Ref::ZERO).unwrap();

        let matrix = InteractionMatrix::build(&table, &[f.raw(), g.raw()]);
        assert!(matrix.depends(0, 1));
        assert!(matrix.depends(2, 2));
        assert!(!matrix.depends(1, 2));
        assert!(!matrix.depends(0, 3));
    }
}
