//! Boolean operators, negation, quantification and restriction.
//!
//! All algorithms here follow the same scheme: terminal cases first, then a lookup in
//! the matching operation cache, then Shannon expansion on the topmost variable of the
//! operands. Intermediate results are kept on the ref stack until the node combining
//! them is created, so a garbage collection triggered deep in the recursion never
//! reclaims them.
//!
//! ```
//! use bdd_kernel::bdd::Bdd;
//! use bdd_kernel::apply::Operator;
//!
//! let mut bdd = Bdd::with_vars(2).unwrap();
//! let x = bdd.ith_var(0).unwrap();
//! let y = bdd.ith_var(1).unwrap();
//! let f = bdd.apply(x, y, Operator::And).unwrap();
//! let g = bdd.exists(f, x).unwrap();
//! assert_eq!(g, y);
//! ```

use crate::bdd::Bdd;
use crate::error::{BddError, Interrupt, Result};
use crate::handler::{ComputationHandler, NopHandler};
use crate::reference::Ref;
use crate::utils::{pair, triple};

type Step = std::result::Result<Ref, Interrupt>;

/// Binary Boolean operators.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Operator {
    And,
    Xor,
    Or,
    Nand,
    Nor,
    /// `a → b`
    Implication,
    /// `a ↔ b`
    Biimplication,
    /// `a ∧ ¬b`
    Difference,
    /// `¬a ∧ b`
    Less,
    /// `b → a`
    InverseImplication,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::And,
        Operator::Xor,
        Operator::Or,
        Operator::Nand,
        Operator::Nor,
        Operator::Implication,
        Operator::Biimplication,
        Operator::Difference,
        Operator::Less,
        Operator::InverseImplication,
    ];

    /// Cache tag of the operator.
    const fn code(self) -> u64 {
        self as u64
    }

    /// Truth table indexed by `(a << 1) | b`.
    const fn table(self) -> [bool; 4] {
        match self {
            Operator::And => [false, false, false, true],
            Operator::Xor => [false, true, true, false],
            Operator::Or => [false, true, true, true],
            Operator::Nand => [true, true, true, false],
            Operator::Nor => [true, false, false, false],
            Operator::Implication => [true, true, false, true],
            Operator::Biimplication => [true, false, false, true],
            Operator::Difference => [false, false, true, false],
            Operator::Less => [false, true, false, false],
            Operator::InverseImplication => [true, false, true, true],
        }
    }

    pub const fn eval(self, a: bool, b: bool) -> bool {
        self.table()[((a as usize) << 1) | b as usize]
    }
}

/// Cache tag of negation, distinct from every [`Operator`] code.
const NOT_CODE: u64 = 10;

// Low three bits of a quantification/restriction cache id.
const CACHE_EXISTS: u64 = 0;
const CACHE_FOR_ALL: u64 = 1;
const CACHE_RESTRICT: u64 = 2;

/// Membership table of the variable set of the running quantification or restriction.
///
/// Entries are indexed by order position. An entry belongs to the current set when it
/// equals the current epoch id (or its negation, for negative restriction literals), so
/// switching to a new set only bumps the id.
#[derive(Debug, Default)]
pub(crate) struct QuantTable {
    set: Vec<i32>,
    id: i32,
    /// Deepest level of the current set.
    last: u32,
}

impl QuantTable {
    pub fn resize(&mut self, var_num: usize) {
        self.set = vec![0; var_num];
        self.id = 0;
        self.last = 0;
    }

    fn next_id(&mut self) {
        if self.id == i32::MAX {
            self.set.fill(0);
            self.id = 0;
        }
        self.id += 1;
    }

    fn contains(&self, level: u32) -> bool {
        self.set[level as usize] == self.id
    }

    /// Phase of `level` in the current signed set.
    fn phase(&self, level: u32) -> Option<bool> {
        let entry = self.set[level as usize];
        if entry == self.id {
            Some(true)
        } else if entry == -self.id {
            Some(false)
        } else {
            None
        }
    }
}

impl Bdd {
    #[inline]
    fn level(&self, r: Ref) -> u32 {
        self.table.order_position_of(r)
    }

    /// Load the positive cube `var` into the quantification table.
    fn load_var_set(&mut self, var: Ref) {
        self.quant.next_id();
        let mut n = var;
        while !n.is_const() {
            let level = self.level(n);
            self.quant.set[level as usize] = self.quant.id;
            self.quant.last = level;
            n = self.table.high(n);
        }
    }

    /// Load the cube `var` with phases into the quantification table.
    fn load_signed_var_set(&mut self, var: Ref) -> Result<()> {
        self.quant.next_id();
        let mut n = var;
        while !n.is_const() {
            let level = self.level(n);
            let (low, high) = (self.table.low(n), self.table.high(n));
            if low.is_zero() {
                self.quant.set[level as usize] = self.quant.id;
                n = high;
            } else if high.is_zero() {
                self.quant.set[level as usize] = -self.quant.id;
                n = low;
            } else {
                return Err(BddError::NotAVariableSet(var));
            }
            self.quant.last = level;
        }
        Ok(())
    }
}

// Binary operators.
impl Bdd {
    pub fn apply(&mut self, l: Ref, r: Ref, op: Operator) -> Result<Ref> {
        self.apply_with(l, r, op, &mut NopHandler)
    }

    pub fn apply_with(&mut self, l: Ref, r: Ref, op: Operator, handler: &mut dyn ComputationHandler) -> Result<Ref> {
        self.table.check(l)?;
        self.table.check(r)?;
        handler.started();
        self.run(|bdd| {
            bdd.table.push_ref(l);
            bdd.table.push_ref(r);
            bdd.apply_rec(l, r, op, &mut *handler)
        })
    }

    pub fn apply_and(&mut self, l: Ref, r: Ref) -> Result<Ref> {
        self.apply(l, r, Operator::And)
    }

    pub fn apply_or(&mut self, l: Ref, r: Ref) -> Result<Ref> {
        self.apply(l, r, Operator::Or)
    }

    pub fn apply_xor(&mut self, l: Ref, r: Ref) -> Result<Ref> {
        self.apply(l, r, Operator::Xor)
    }

    pub fn apply_imply(&mut self, l: Ref, r: Ref) -> Result<Ref> {
        self.apply(l, r, Operator::Implication)
    }

    pub fn apply_equiv(&mut self, l: Ref, r: Ref) -> Result<Ref> {
        self.apply(l, r, Operator::Biimplication)
    }

    /// Conjunction of all `nodes`, true for none.
    pub fn apply_and_many(&mut self, nodes: impl IntoIterator<Item = Ref>) -> Result<Ref> {
        self.fold(nodes, Ref::ONE, Operator::And)
    }

    /// Disjunction of all `nodes`, false for none.
    pub fn apply_or_many(&mut self, nodes: impl IntoIterator<Item = Ref>) -> Result<Ref> {
        self.fold(nodes, Ref::ZERO, Operator::Or)
    }

    fn fold(&mut self, nodes: impl IntoIterator<Item = Ref>, init: Ref, op: Operator) -> Result<Ref> {
        let mut res = init;
        for node in nodes {
            let next = self.apply(res, node, op)?;
            self.del_ref(res)?;
            res = next;
        }
        Ok(res)
    }

    pub(crate) fn apply_rec(&mut self, l: Ref, r: Ref, op: Operator, handler: &mut dyn ComputationHandler) -> Step {
        match op {
            Operator::And => {
                if l == r {
                    return Ok(l);
                }
                if l.is_zero() || r.is_zero() {
                    return Ok(Ref::ZERO);
                }
                if l.is_one() {
                    return Ok(r);
                }
                if r.is_one() {
                    return Ok(l);
                }
            }
            Operator::Or => {
                if l == r {
                    return Ok(l);
                }
                if l.is_one() || r.is_one() {
                    return Ok(Ref::ONE);
                }
                if l.is_zero() {
                    return Ok(r);
                }
                if r.is_zero() {
                    return Ok(l);
                }
            }
            Operator::Xor => {
                if l == r {
                    return Ok(Ref::ZERO);
                }
                if l.is_zero() {
                    return Ok(r);
                }
                if r.is_zero() {
                    return Ok(l);
                }
            }
            Operator::Nand => {
                if l.is_zero() || r.is_zero() {
                    return Ok(Ref::ONE);
                }
            }
            Operator::Nor => {
                if l.is_one() || r.is_one() {
                    return Ok(Ref::ZERO);
                }
            }
            Operator::Implication => {
                if l.is_zero() || r.is_one() {
                    return Ok(Ref::ONE);
                }
                if l.is_one() {
                    return Ok(r);
                }
            }
            _ => {}
        }

        if l.is_const() && r.is_const() {
            return Ok(Ref::constant(op.eval(l.is_one(), r.is_one())));
        }

        if !handler.should_resume() {
            return Err(Interrupt::Canceled);
        }

        let hash = triple(l.raw() as u64, r.raw() as u64, op.code());
        if let Some(res) = self.apply_cache.get(hash, l.raw(), r.raw(), op.code()) {
            return Ok(res);
        }

        let (ll, rl) = (self.level(l), self.level(r));
        let (level, l0, l1, r0, r1) = if ll == rl {
            (ll, self.table.low(l), self.table.high(l), self.table.low(r), self.table.high(r))
        } else if ll < rl {
            (ll, self.table.low(l), self.table.high(l), r, r)
        } else {
            (rl, l, l, self.table.low(r), self.table.high(r))
        };

        let low = self.apply_rec(l0, r0, op, handler)?;
        self.table.push_ref(low);
        let high = self.apply_rec(l1, r1, op, handler)?;
        self.table.push_ref(high);
        let res = self.make_node(level, self.table.read_ref(2), self.table.read_ref(1))?;
        self.table.pop_ref(2);

        self.apply_cache.insert(hash, l.raw(), r.raw(), op.code(), res);
        Ok(res)
    }
}

// Negation.
impl Bdd {
    pub fn apply_not(&mut self, r: Ref) -> Result<Ref> {
        self.apply_not_with(r, &mut NopHandler)
    }

    pub fn apply_not_with(&mut self, r: Ref, handler: &mut dyn ComputationHandler) -> Result<Ref> {
        self.table.check(r)?;
        handler.started();
        self.run(|bdd| {
            bdd.table.push_ref(r);
            bdd.not_rec(r, &mut *handler)
        })
    }

    fn not_rec(&mut self, r: Ref, handler: &mut dyn ComputationHandler) -> Step {
        if r.is_zero() {
            return Ok(Ref::ONE);
        }
        if r.is_one() {
            return Ok(Ref::ZERO);
        }
        if !handler.should_resume() {
            return Err(Interrupt::Canceled);
        }

        let hash = r.raw() as u64;
        if let Some(res) = self.apply_cache.get(hash, r.raw(), 0, NOT_CODE) {
            return Ok(res);
        }

        let low = self.not_rec(self.table.low(r), handler)?;
        self.table.push_ref(low);
        let high = self.not_rec(self.table.high(r), handler)?;
        self.table.push_ref(high);
        let res = self.make_node(self.level(r), self.table.read_ref(2), self.table.read_ref(1))?;
        self.table.pop_ref(2);

        self.apply_cache.insert(hash, r.raw(), 0, NOT_CODE, res);
        Ok(res)
    }
}

// Quantification.
impl Bdd {
    /// Existential quantification of the variables of the positive cube `var`.
    pub fn exists(&mut self, r: Ref, var: Ref) -> Result<Ref> {
        self.exists_with(r, var, &mut NopHandler)
    }

    pub fn exists_with(&mut self, r: Ref, var: Ref, handler: &mut dyn ComputationHandler) -> Result<Ref> {
        self.quantify(r, var, Operator::Or, CACHE_EXISTS, handler)
    }

    /// Universal quantification of the variables of the positive cube `var`.
    pub fn for_all(&mut self, r: Ref, var: Ref) -> Result<Ref> {
        self.for_all_with(r, var, &mut NopHandler)
    }

    pub fn for_all_with(&mut self, r: Ref, var: Ref, handler: &mut dyn ComputationHandler) -> Result<Ref> {
        self.quantify(r, var, Operator::And, CACHE_FOR_ALL, handler)
    }

    fn quantify(
        &mut self,
        r: Ref,
        var: Ref,
        op: Operator,
        tag: u64,
        handler: &mut dyn ComputationHandler,
    ) -> Result<Ref> {
        self.table.check(r)?;
        self.table.check(var)?;
        if var.is_const() {
            return self.add_ref(r);
        }
        self.check_positive_cube(var)?;
        handler.started();
        self.run(|bdd| {
            bdd.load_var_set(var);
            bdd.table.push_ref(r);
            bdd.table.push_ref(var);
            let id = ((var.raw() as u64) << 3) | tag;
            bdd.quant_rec(r, op, id, &mut *handler)
        })
    }

    fn quant_rec(&mut self, r: Ref, op: Operator, id: u64, handler: &mut dyn ComputationHandler) -> Step {
        if r.is_const() || self.level(r) > self.quant.last {
            return Ok(r);
        }
        if !handler.should_resume() {
            return Err(Interrupt::Canceled);
        }

        let hash = r.raw() as u64;
        if let Some(res) = self.quant_cache.get(hash, r.raw(), 0, id) {
            return Ok(res);
        }

        let level = self.level(r);
        let low = self.quant_rec(self.table.low(r), op, id, handler)?;
        self.table.push_ref(low);
        let high = self.quant_rec(self.table.high(r), op, id, handler)?;
        self.table.push_ref(high);
        let res = if self.quant.contains(level) {
            self.apply_rec(low, high, op, handler)?
        } else {
            self.make_node(level, low, high)?
        };
        self.table.pop_ref(2);

        self.quant_cache.insert(hash, r.raw(), 0, id, res);
        Ok(res)
    }
}

// Restriction.
impl Bdd {
    /// Cofactor of `r` for the assignment encoded by the cube `var`: a positive literal
    /// sets the variable to true, a negative one to false.
    pub fn restrict(&mut self, r: Ref, var: Ref) -> Result<Ref> {
        self.restrict_with(r, var, &mut NopHandler)
    }

    pub fn restrict_with(&mut self, r: Ref, var: Ref, handler: &mut dyn ComputationHandler) -> Result<Ref> {
        self.table.check(r)?;
        self.table.check(var)?;
        if var.is_const() {
            return self.add_ref(r);
        }
        handler.started();
        self.run(|bdd| {
            bdd.load_signed_var_set(var)?;
            bdd.table.push_ref(r);
            bdd.table.push_ref(var);
            let id = ((var.raw() as u64) << 3) | CACHE_RESTRICT;
            bdd.restrict_rec(r, id, &mut *handler)
        })
    }

    fn restrict_rec(&mut self, r: Ref, id: u64, handler: &mut dyn ComputationHandler) -> Step {
        if r.is_const() || self.level(r) > self.quant.last {
            return Ok(r);
        }
        if !handler.should_resume() {
            return Err(Interrupt::Canceled);
        }

        let hash = pair(r.raw() as u64, id);
        if let Some(res) = self.misc_cache.get(hash, r.raw(), 0, id) {
            return Ok(res);
        }

        let level = self.level(r);
        let res = match self.quant.phase(level) {
            Some(true) => self.restrict_rec(self.table.high(r), id, handler)?,
            Some(false) => self.restrict_rec(self.table.low(r), id, handler)?,
            None => {
                let low = self.restrict_rec(self.table.low(r), id, handler)?;
                self.table.push_ref(low);
                let high = self.restrict_rec(self.table.high(r), id, handler)?;
                self.table.push_ref(high);
                let res = self.make_node(level, low, high)?;
                self.table.pop_ref(2);
                res
            }
        };

        self.misc_cache.insert(hash, r.raw(), 0, id, res);
        Ok(res)
    }
}
