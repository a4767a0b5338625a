//! # bdd-kernel: a reference-counted BDD kernel with dynamic variable reordering
//!
//! **`bdd-kernel`** is a manager-centric library for **Binary Decision Diagrams (BDDs)**:
//! canonical, shared graphs representing Boolean functions over a fixed set of
//! variables. On top of the classic algebra it provides model counting, satisfying
//! assignments, and a reordering engine that shrinks the graph by changing the
//! variable order while every function keeps its meaning.
//!
//! ## Key Features
//!
//! - **Manager-Centric Architecture**: all nodes live in one [`Bdd`][crate::bdd::Bdd]
//!   manager. Structural sharing (hash consing) keeps every function canonical.
//! - **Reference Counting**: every [`Ref`][crate::reference::Ref] returned by a public
//!   operation carries one reference owned by the caller. Functions without references
//!   are reclaimed by the garbage collector; release them with
//!   [`Bdd::del_ref`][crate::bdd::Bdd::del_ref].
//! - **Full Operator Set**: all ten binary [`Operator`][crate::apply::Operator]s,
//!   negation, restriction and quantification.
//! - **Dynamic Reordering**: sifting, window permutation and random search, manual or
//!   automatic, constrained by nested [variable blocks][crate::bdd::Bdd::add_variable_block].
//! - **Cancellation**: long operations consult a
//!   [`ComputationHandler`][crate::handler::ComputationHandler] at every step.
//!
//! ## Basic Usage
//!
//! ```rust
//! use bdd_kernel::bdd::Bdd;
//!
//! // 1. A manager with three variables, numbered from 0
//! let mut bdd = Bdd::with_vars(3).unwrap();
//! let x0 = bdd.ith_var(0).unwrap();
//! let not_x1 = bdd.nith_var(1).unwrap();
//!
//! // 2. f = x0 AND (NOT x1)
//! let f = bdd.apply_and(x0, not_x1).unwrap();
//!
//! // 3. Two of the eight assignments satisfy f: x2 is free
//! assert_eq!(bdd.sat_count(f).unwrap(), num_bigint::BigUint::from(2u32));
//! assert!(bdd.eval(f, &[true, false, true]).unwrap());
//!
//! // 4. Release the function once it is no longer needed
//! bdd.del_ref(f).unwrap();
//! ```
//!
//! ## Core Components
//!
//! - **[`bdd`]**: the [`Bdd`][crate::bdd::Bdd] manager, variables and reference handling.
//! - **[`apply`]**: binary operators, negation, restriction and quantification.
//! - **[`sat`]**: satisfying assignments and model counting.
//! - **[`inspect`]**: supports, node counts and graph traversal.
//! - **[`formula`]**: conversion from and to Boolean formulas.
//! - **[`reorder`]**: dynamic variable reordering.

pub mod apply;
pub mod bdd;
mod bitset;
mod cache;
pub mod config;
pub mod error;
pub mod formula;
pub mod handler;
pub mod inspect;
mod node;
pub mod prime;
pub mod reference;
pub mod reorder;
pub mod sat;
mod subtable;
mod table;
mod tree;
pub mod utils;
