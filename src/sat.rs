//! Satisfying assignments and model counting.

use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::error::{BddError, Interrupt, Result};
use crate::reference::Ref;

type Step = std::result::Result<Ref, Interrupt>;

/// A (partial) assignment indexed by variable: `0` is false, `1` is true and `-1`
/// marks a variable left unassigned.
pub type Profile = Vec<i8>;

const COUNT_SAT: u64 = 0;

impl Bdd {
    /// One satisfying path of `r` as a cube over the variables on the path.
    ///
    /// Returns false for an unsatisfiable `r`.
    pub fn sat_one(&mut self, r: Ref) -> Result<Ref> {
        self.table.check(r)?;
        if r.is_const() {
            return Ok(r);
        }
        self.with_reorder_disabled(|bdd| bdd.run(|bdd| bdd.sat_one_rec(r)))
    }

    fn sat_one_rec(&mut self, r: Ref) -> Step {
        if r.is_const() {
            return Ok(r);
        }
        let level = self.table.order_position_of(r);
        let (low, high) = (self.table.low(r), self.table.high(r));
        let res = if low.is_zero() {
            let res = self.sat_one_rec(high)?;
            self.make_node(level, Ref::ZERO, res)?
        } else {
            let res = self.sat_one_rec(low)?;
            self.make_node(level, res, Ref::ZERO)?
        };
        Ok(self.table.push_ref(res))
    }

    /// One satisfying assignment of `r` which additionally fixes every variable of the
    /// positive cube `var` missing from the chosen path to the constant `pol`.
    pub fn sat_one_set(&mut self, r: Ref, var: Ref, pol: Ref) -> Result<Ref> {
        self.table.check(r)?;
        self.table.check(var)?;
        self.table.check(pol)?;
        if r.is_zero() {
            return Ok(r);
        }
        if !pol.is_const() {
            return Err(BddError::NonConstantPolarity(pol));
        }
        self.check_positive_cube(var)?;

        let pol = pol.is_one();
        self.with_reorder_disabled(|bdd| bdd.run(|bdd| bdd.sat_one_set_rec(r, var, pol)))
    }

    pub(crate) fn check_positive_cube(&self, var: Ref) -> Result<()> {
        let mut n = var;
        while !n.is_const() {
            if !self.table.low(n).is_zero() {
                return Err(BddError::NotAVariableSet(var));
            }
            n = self.table.high(n);
        }
        if n.is_zero() {
            return Err(BddError::NotAVariableSet(var));
        }
        Ok(())
    }

    fn sat_one_set_rec(&mut self, r: Ref, var: Ref, pol: bool) -> Step {
        if r.is_const() && var.is_const() {
            return Ok(r);
        }

        let level = self.table.order_position_of(r);
        let var_level = self.table.order_position_of(var);

        let res = if level < var_level {
            let (low, high) = (self.table.low(r), self.table.high(r));
            if low.is_zero() {
                let res = self.sat_one_set_rec(high, var, pol)?;
                self.make_node(level, Ref::ZERO, res)?
            } else {
                let res = self.sat_one_set_rec(low, var, pol)?;
                self.make_node(level, res, Ref::ZERO)?
            }
        } else if var_level < level {
            let res = self.sat_one_set_rec(r, self.table.high(var), pol)?;
            if pol {
                self.make_node(var_level, Ref::ZERO, res)?
            } else {
                self.make_node(var_level, res, Ref::ZERO)?
            }
        } else {
            let (low, high) = (self.table.low(r), self.table.high(r));
            let rest = self.table.high(var);
            if low.is_zero() {
                let res = self.sat_one_set_rec(high, rest, pol)?;
                self.make_node(level, Ref::ZERO, res)?
            } else {
                let res = self.sat_one_set_rec(low, rest, pol)?;
                self.make_node(level, res, Ref::ZERO)?
            }
        };
        Ok(self.table.push_ref(res))
    }

    /// One satisfying assignment of `r` as a minterm over all variables. Variables not
    /// constrained by the chosen path are set to false.
    pub fn full_sat_one(&mut self, r: Ref) -> Result<Ref> {
        self.table.check(r)?;
        if r.is_zero() {
            return Ok(r);
        }
        self.with_reorder_disabled(|bdd| {
            bdd.run(|bdd| {
                let mut res = bdd.full_sat_one_rec(r)?;
                for level in (0..bdd.table.order_position_of(r)).rev() {
                    res = bdd.make_node(level, res, Ref::ZERO)?;
                    bdd.table.push_ref(res);
                }
                Ok(res)
            })
        })
    }

    fn full_sat_one_rec(&mut self, r: Ref) -> Step {
        if r.is_const() {
            return Ok(r);
        }

        let level = self.table.order_position_of(r);
        let (low, high) = (self.table.low(r), self.table.high(r));
        let (child, positive) = if low.is_zero() { (high, true) } else { (low, false) };

        let mut res = self.full_sat_one_rec(child)?;
        for skipped in (level + 1..self.table.order_position_of(child)).rev() {
            res = self.make_node(skipped, res, Ref::ZERO)?;
            self.table.push_ref(res);
        }
        res = if positive {
            self.make_node(level, Ref::ZERO, res)?
        } else {
            self.make_node(level, res, Ref::ZERO)?
        };
        Ok(self.table.push_ref(res))
    }

    /// All paths from `r` to true, each as a [`Profile`].
    pub fn all_sat(&self, r: Ref) -> Result<Vec<Profile>> {
        self.all_paths(r, Ref::ONE)
    }

    /// All paths from `r` to false, each as a [`Profile`].
    pub fn all_unsat(&self, r: Ref) -> Result<Vec<Profile>> {
        self.all_paths(r, Ref::ZERO)
    }

    fn all_paths(&self, r: Ref, target: Ref) -> Result<Vec<Profile>> {
        self.table.check(r)?;
        let mut profile = vec![-1; self.table.var_num as usize];
        let mut paths = Vec::new();
        self.all_paths_rec(r, target, &mut profile, &mut paths);
        Ok(paths)
    }

    fn all_paths_rec(&self, r: Ref, target: Ref, profile: &mut Profile, paths: &mut Vec<Profile>) {
        if r == target {
            paths.push(profile.clone());
            return;
        }
        if r.is_const() {
            return;
        }

        let level = self.table.order_position_of(r);
        let var = self.table.variable_of(r) as usize;
        for (child, value) in [(self.table.low(r), 0), (self.table.high(r), 1)] {
            if child.is_const() && child != target {
                continue;
            }
            profile[var] = value;
            for skipped in level + 1..self.table.order_position_of(child) {
                profile[self.table.level2var[skipped as usize] as usize] = -1;
            }
            self.all_paths_rec(child, target, profile, paths);
        }
    }

    /// Number of satisfying assignments of `r` over all `var_num` variables.
    pub fn sat_count(&mut self, r: Ref) -> Result<BigUint> {
        self.table.check(r)?;
        let level = self.table.order_position_of(r) as usize;
        Ok((BigUint::from(1u32) << level) * self.sat_count_rec(r))
    }

    fn sat_count_rec(&mut self, r: Ref) -> BigUint {
        if r.is_const() {
            return BigUint::from(r.raw());
        }

        let hash = r.raw() as u64;
        if let Some(count) = self.count_cache.get(hash, r.raw(), 0, COUNT_SAT) {
            return count;
        }

        let level = self.table.order_position_of(r);
        let (low, high) = (self.table.low(r), self.table.high(r));
        let low_gap = (self.table.order_position_of(low) - level - 1) as usize;
        let high_gap = (self.table.order_position_of(high) - level - 1) as usize;
        let count = (self.sat_count_rec(low) << low_gap) + (self.sat_count_rec(high) << high_gap);

        self.count_cache.insert(hash, r.raw(), 0, COUNT_SAT, count.clone());
        count
    }

    /// Number of paths from `r` to true.
    pub fn path_count_one(&mut self, r: Ref) -> Result<BigUint> {
        self.table.check(r)?;
        Ok(self.path_count_rec(r, Ref::ONE))
    }

    /// Number of paths from `r` to false.
    pub fn path_count_zero(&mut self, r: Ref) -> Result<BigUint> {
        self.table.check(r)?;
        Ok(self.path_count_rec(r, Ref::ZERO))
    }

    fn path_count_rec(&mut self, r: Ref, target: Ref) -> BigUint {
        if r.is_const() {
            return if r == target { BigUint::from(1u32) } else { BigUint::ZERO };
        }

        let hash = r.raw() as u64;
        let tag = target.raw() as u64;
        if let Some(count) = self.path_cache.get(hash, r.raw(), 0, tag) {
            return count;
        }

        let (low, high) = (self.table.low(r), self.table.high(r));
        let count = self.path_count_rec(low, target) + self.path_count_rec(high, target);

        self.path_cache.insert(hash, r.raw(), 0, tag, count.clone());
        count
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn setup(n: u32) -> (Bdd, Vec<Ref>) {
        let bdd = Bdd::with_vars(n).unwrap();
        let vars = (0..n).map(|v| bdd.ith_var(v).unwrap()).collect();
        (bdd, vars)
    }

    #[test]
    fn test_sat_one() {
        let (mut bdd, v) = setup(3);
        let f = bdd.apply_and(v[0], v[2]).unwrap();
        let sat = bdd.sat_one(f).unwrap();
        assert_eq!(sat, f);

        assert_eq!(bdd.sat_one(Ref::ZERO).unwrap(), Ref::ZERO);
        assert_eq!(bdd.sat_one(Ref::ONE).unwrap(), Ref::ONE);
    }

    #[test]
    fn test_sat_one_implies_function() {
        let (mut bdd, v) = setup(4);
        let a = bdd.apply_xor(v[0], v[1]).unwrap();
        let b = bdd.apply_or(v[2], v[3]).unwrap();
        let f = bdd.apply_and(a, b).unwrap();
        let sat = bdd.sat_one(f).unwrap();
        assert_ne!(sat, Ref::ZERO);
        assert_eq!(bdd.apply_imply(sat, f).unwrap(), Ref::ONE);
    }

    #[test]
    fn test_sat_one_set() {
        let (mut bdd, v) = setup(4);
        let f = bdd.apply_or(v[0], v[1]).unwrap();
        let set = bdd.var_set(&[0, 1, 2, 3]).unwrap();

        let sat = bdd.sat_one_set(f, set, Ref::ONE).unwrap();
        // Path: x0 = 0, x1 = 1; the free variables x2 and x3 follow the polarity.
        let expected = bdd.cube(&[(0, false), (1, true), (2, true), (3, true)]).unwrap();
        assert_eq!(sat, expected);

        let sat = bdd.sat_one_set(f, set, Ref::ZERO).unwrap();
        let expected = bdd.cube(&[(0, false), (1, true), (2, false), (3, false)]).unwrap();
        assert_eq!(sat, expected);
    }

    #[test]
    fn test_sat_one_set_errors() {
        let (mut bdd, v) = setup(2);
        let f = bdd.apply_or(v[0], v[1]).unwrap();
        assert_eq!(bdd.sat_one_set(f, v[0], v[1]), Err(BddError::NonConstantPolarity(v[1])));
        let mixed = bdd.cube(&[(0, false)]).unwrap();
        assert_eq!(bdd.sat_one_set(f, mixed, Ref::ONE), Err(BddError::NotAVariableSet(mixed)));
        assert_eq!(bdd.sat_one_set(Ref::ZERO, v[0], Ref::ONE).unwrap(), Ref::ZERO);
    }

    #[test]
    fn test_full_sat_one() {
        let (mut bdd, v) = setup(4);
        let f = bdd.apply_and(v[1], v[3]).unwrap();
        let sat = bdd.full_sat_one(f).unwrap();
        let expected = bdd.cube(&[(0, false), (1, true), (2, false), (3, true)]).unwrap();
        assert_eq!(sat, expected);

        let all_false = bdd.cube(&[(0, false), (1, false), (2, false), (3, false)]).unwrap();
        assert_eq!(bdd.full_sat_one(Ref::ONE).unwrap(), all_false);
        assert_eq!(bdd.full_sat_one(Ref::ZERO).unwrap(), Ref::ZERO);
    }

    #[test]
    fn test_all_sat() {
        let (mut bdd, v) = setup(3);
        let f = bdd.apply_or(v[0], v[2]).unwrap();
        let mut paths = bdd.all_sat(f).unwrap();
        paths.sort();
        assert_eq!(paths, vec![vec![0, -1, 1], vec![1, -1, -1]]);

        assert_eq!(bdd.all_sat(Ref::ONE).unwrap(), vec![vec![-1, -1, -1]]);
        assert!(bdd.all_sat(Ref::ZERO).unwrap().is_empty());
    }

    #[test]
    fn test_all_unsat() {
        let (mut bdd, v) = setup(3);
        let f = bdd.apply_or(v[0], v[2]).unwrap();
        assert_eq!(bdd.all_unsat(f).unwrap(), vec![vec![0, -1, 0]]);
        assert!(bdd.all_unsat(Ref::ONE).unwrap().is_empty());
    }

    #[test]
    fn test_sat_count() {
        let (mut bdd, v) = setup(4);
        assert_eq!(bdd.sat_count(Ref::ZERO).unwrap(), BigUint::ZERO);
        assert_eq!(bdd.sat_count(Ref::ONE).unwrap(), BigUint::from(16u32));
        assert_eq!(bdd.sat_count(v[2]).unwrap(), BigUint::from(8u32));

        let f = bdd.apply_and(v[0], v[3]).unwrap();
        assert_eq!(bdd.sat_count(f).unwrap(), BigUint::from(4u32));

        let g = bdd.apply_or(v[1], v[2]).unwrap();
        assert_eq!(bdd.sat_count(g).unwrap(), BigUint::from(12u32));

        let h = bdd.apply_xor(v[0], v[3]).unwrap();
        assert_eq!(bdd.sat_count(h).unwrap(), BigUint::from(8u32));
    }

    #[test]
    fn test_sat_count_after_extending_vars() {
        let (mut bdd, v) = setup(2);
        let f = bdd.apply_and(v[0], v[1]).unwrap();
        assert_eq!(bdd.sat_count(f).unwrap(), BigUint::from(1u32));
        assert_eq!(bdd.path_count_one(f).unwrap(), BigUint::from(1u32));

        bdd.extend_var_num(2).unwrap();
        assert_eq!(bdd.sat_count(f).unwrap(), BigUint::from(4u32));
        assert_eq!(bdd.sat_count(Ref::ONE).unwrap(), BigUint::from(16u32));
        assert_eq!(bdd.path_count_one(f).unwrap(), BigUint::from(1u32));
    }

    #[test]
    fn test_sat_count_many_vars() {
        let bdd_vars = 100;
        let (mut bdd, v) = setup(bdd_vars);
        let expected = BigUint::from(1u32) << 99usize;
        assert_eq!(bdd.sat_count(v[50]).unwrap(), expected);
    }

    #[test]
    fn test_path_counts() {
        let (mut bdd, v) = setup(3);
        let f = bdd.apply_or(v[0], v[2]).unwrap();
        assert_eq!(bdd.path_count_one(f).unwrap(), BigUint::from(2u32));
        assert_eq!(bdd.path_count_zero(f).unwrap(), BigUint::from(1u32));

        let g = bdd.apply_xor(v[0], v[1]).unwrap();
        assert_eq!(bdd.path_count_one(g).unwrap(), BigUint::from(2u32));
        assert_eq!(bdd.path_count_zero(g).unwrap(), BigUint::from(2u32));

        assert_eq!(bdd.path_count_one(Ref::ONE).unwrap(), BigUint::from(1u32));
        assert_eq!(bdd.path_count_zero(Ref::ONE).unwrap(), BigUint::ZERO);
    }
}
