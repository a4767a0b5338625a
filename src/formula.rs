//! Conversion between propositional formulas and BDDs.
//!
//! [`Bdd::build`] compiles a [`Formula`] bottom-up with [`Operator`] applications.
//! [`Bdd::to_formula`] goes the other way and writes a diagram as a disjunction of its
//! paths, through any [`FormulaFactory`] so callers can target their own formula type.
//! Variable names are mapped to BDD variable indices by a [`VariableRegistry`].

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use crate::apply::Operator;
use crate::bdd::Bdd;
use crate::error::{BddError, Result};
use crate::reference::Ref;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Formula {
    Constant(bool),
    /// Variable name and phase.
    Literal(String, bool),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Implication(Box<Formula>, Box<Formula>),
    Equivalence(Box<Formula>, Box<Formula>),
}

impl Formula {
    pub fn var(name: impl Into<String>) -> Self {
        Formula::Literal(name.into(), true)
    }

    pub fn lit(name: impl Into<String>, phase: bool) -> Self {
        Formula::Literal(name.into(), phase)
    }

    pub fn not(value: Self) -> Self {
        match value {
            Formula::Constant(b) => Formula::Constant(!b),
            Formula::Literal(name, phase) => Formula::Literal(name, !phase),
            Formula::Not(inner) => *inner,
            _ => Formula::Not(Box::new(value)),
        }
    }

    pub fn and(operands: Vec<Self>) -> Self {
        Formula::And(operands)
    }

    pub fn or(operands: Vec<Self>) -> Self {
        Formula::Or(operands)
    }

    pub fn implies(lhs: Self, rhs: Self) -> Self {
        Formula::Implication(Box::new(lhs), Box::new(rhs))
    }

    pub fn equiv(lhs: Self, rhs: Self) -> Self {
        Formula::Equivalence(Box::new(lhs), Box::new(rhs))
    }

    /// Evaluate under `assignment`, which maps variable names to values.
    pub fn evaluate<F>(&self, assignment: &F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        match self {
            Formula::Constant(b) => *b,
            Formula::Literal(name, phase) => assignment(name) == *phase,
            Formula::Not(f) => !f.evaluate(assignment),
            Formula::And(ops) => ops.iter().all(|f| f.evaluate(assignment)),
            Formula::Or(ops) => ops.iter().any(|f| f.evaluate(assignment)),
            Formula::Implication(a, b) => !a.evaluate(assignment) || b.evaluate(assignment),
            Formula::Equivalence(a, b) => a.evaluate(assignment) == b.evaluate(assignment),
        }
    }

    /// Names of all variables, in order of first occurrence.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Formula::Constant(_) => {}
            Formula::Literal(name, _) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Formula::Not(f) => f.collect_variables(names),
            Formula::And(ops) | Formula::Or(ops) => {
                for f in ops {
                    f.collect_variables(names);
                }
            }
            Formula::Implication(a, b) | Formula::Equivalence(a, b) => {
                a.collect_variables(names);
                b.collect_variables(names);
            }
        }
    }
}

impl Display for Formula {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn join(f: &mut Formatter<'_>, ops: &[Formula], sep: &str) -> std::fmt::Result {
            write!(f, "(")?;
            for (i, op) in ops.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", sep)?;
                }
                write!(f, "{}", op)?;
            }
            write!(f, ")")
        }

        match self {
            Formula::Constant(true) => write!(f, "$true"),
            Formula::Constant(false) => write!(f, "$false"),
            Formula::Literal(name, true) => write!(f, "{}", name),
            Formula::Literal(name, false) => write!(f, "~{}", name),
            Formula::Not(inner) => write!(f, "~{}", inner),
            Formula::And(ops) => join(f, ops, "&"),
            Formula::Or(ops) => join(f, ops, "|"),
            Formula::Implication(a, b) => write!(f, "({} => {})", a, b),
            Formula::Equivalence(a, b) => write!(f, "({} <=> {})", a, b),
        }
    }
}

/// Bidirectional map between variable names and BDD variable indices.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    names: Vec<String>,
    indices: HashMap<String, u32>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `name`, assigning the next free index to unknown names.
    pub fn register(&mut self, name: &str) -> u32 {
        if let Some(&index) = self.indices.get(name) {
            return index;
        }
        let index = self.names.len() as u32;
        self.names.push(name.to_string());
        self.indices.insert(name.to_string(), index);
        index
    }

    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.indices.get(name).copied()
    }

    pub fn name(&self, index: u32) -> Option<&str> {
        self.names.get(index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Constructor of the formulas produced by [`Bdd::to_formula`].
pub trait FormulaFactory {
    type Formula;

    fn constant(&mut self, value: bool) -> Self::Formula;
    fn literal(&mut self, name: &str, phase: bool) -> Self::Formula;
    fn and(&mut self, operands: Vec<Self::Formula>) -> Self::Formula;
    fn or(&mut self, operands: Vec<Self::Formula>) -> Self::Formula;
    fn not(&mut self, operand: Self::Formula) -> Self::Formula;
}

/// Factory for [`Formula`] which folds constants and flattens nested operators.
#[derive(Debug, Default, Copy, Clone)]
pub struct BasicFactory;

impl BasicFactory {
    fn nary(operands: Vec<Formula>, conjunction: bool) -> Formula {
        let mut flat = Vec::with_capacity(operands.len());
        for op in operands {
            match op {
                Formula::Constant(b) if b == conjunction => {}
                Formula::Constant(_) => return Formula::Constant(!conjunction),
                Formula::And(inner) if conjunction => flat.extend(inner),
                Formula::Or(inner) if !conjunction => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Formula::Constant(conjunction),
            1 => flat.remove(0),
            _ if conjunction => Formula::And(flat),
            _ => Formula::Or(flat),
        }
    }
}

impl FormulaFactory for BasicFactory {
    type Formula = Formula;

    fn constant(&mut self, value: bool) -> Formula {
        Formula::Constant(value)
    }

    fn literal(&mut self, name: &str, phase: bool) -> Formula {
        Formula::lit(name, phase)
    }

    fn and(&mut self, operands: Vec<Formula>) -> Formula {
        Self::nary(operands, true)
    }

    fn or(&mut self, operands: Vec<Formula>) -> Formula {
        Self::nary(operands, false)
    }

    fn not(&mut self, operand: Formula) -> Formula {
        Formula::not(operand)
    }
}

impl Bdd {
    /// Compile `formula`, registering its variables and growing the universe as needed.
    pub fn build(&mut self, formula: &Formula, registry: &mut VariableRegistry) -> Result<Ref> {
        for name in formula.variables() {
            registry.register(name);
        }
        if registry.len() as u32 > self.var_num() {
            self.set_var_num(registry.len() as u32)?;
        }
        self.build_rec(formula, registry)
    }

    fn build_rec(&mut self, formula: &Formula, registry: &VariableRegistry) -> Result<Ref> {
        match formula {
            Formula::Constant(b) => Ok(Ref::constant(*b)),
            Formula::Literal(name, phase) => {
                let var = registry.index_of(name).ok_or_else(|| {
                    BddError::InvalidState(format!("variable {} is not registered", name))
                })?;
                if *phase {
                    self.ith_var(var)
                } else {
                    self.nith_var(var)
                }
            }
            Formula::Not(f) => {
                let inner = self.build_rec(f, registry)?;
                let res = self.apply_not(inner)?;
                self.del_ref(inner)?;
                Ok(res)
            }
            Formula::And(ops) => self.build_nary(ops, registry, Ref::ONE, Operator::And),
            Formula::Or(ops) => self.build_nary(ops, registry, Ref::ZERO, Operator::Or),
            Formula::Implication(a, b) => self.build_binary(a, b, registry, Operator::Implication),
            Formula::Equivalence(a, b) => self.build_binary(a, b, registry, Operator::Biimplication),
        }
    }

    fn build_nary(&mut self, ops: &[Formula], registry: &VariableRegistry, init: Ref, op: Operator) -> Result<Ref> {
        let mut res = init;
        for f in ops {
            let operand = self.build_rec(f, registry)?;
            let next = self.apply(res, operand, op)?;
            self.del_ref(operand)?;
            self.del_ref(res)?;
            res = next;
        }
        Ok(res)
    }

    fn build_binary(&mut self, a: &Formula, b: &Formula, registry: &VariableRegistry, op: Operator) -> Result<Ref> {
        let lhs = self.build_rec(a, registry)?;
        let rhs = self.build_rec(b, registry)?;
        let res = self.apply(lhs, rhs, op)?;
        self.del_ref(lhs)?;
        self.del_ref(rhs)?;
        Ok(res)
    }

    /// Write `r` as a disjunction over its paths to true.
    ///
    /// With `follow_true` unset the paths to false are written instead and the result
    /// is negated, which is shorter for functions with few false paths.
    pub fn to_formula<F: FormulaFactory>(
        &self,
        r: Ref,
        follow_true: bool,
        factory: &mut F,
        registry: &VariableRegistry,
    ) -> Result<F::Formula> {
        self.table.check(r)?;
        let target = Ref::constant(follow_true);
        let res = self.to_formula_rec(r, target, factory, registry)?;
        Ok(if follow_true { res } else { factory.not(res) })
    }

    fn to_formula_rec<F: FormulaFactory>(
        &self,
        r: Ref,
        target: Ref,
        factory: &mut F,
        registry: &VariableRegistry,
    ) -> Result<F::Formula> {
        if r.is_const() {
            return Ok(factory.constant(r == target));
        }

        let var = self.table.variable_of(r);
        let name = registry.name(var).ok_or(BddError::VariableOutOfRange {
            var,
            var_num: registry.len() as u32,
        })?;

        let mut terms = Vec::with_capacity(2);
        for (child, phase) in [(self.table.low(r), false), (self.table.high(r), true)] {
            if child.is_const() && child != target {
                continue;
            }
            let rest = self.to_formula_rec(child, target, factory, registry)?;
            let lit = factory.literal(name, phase);
            terms.push(factory.and(vec![lit, rest]));
        }
        Ok(factory.or(terms))
    }
}
