//! # banyan-bdd: reference-counted BDD/ZDD factory with finite domains
//!
//! **`banyan-bdd`** is a manager-centric library for the symbolic
//! manipulation of Boolean functions as **Binary Decision Diagrams**
//! (and, under the same store, zero-suppressed diagrams).
//!
//! ## What is a BDD?
//!
//! A Binary Decision Diagram represents a Boolean function as a directed
//! acyclic graph with structural sharing. For a fixed variable ordering the
//! representation is **canonical**: every function has exactly one node,
//! which makes equivalence, satisfiability, and validity checks constant
//! time once the diagram is built.
//!
//! ## Key features
//!
//! - **Factory-centric architecture**: every operation goes through the
//!   [`Factory`][crate::factory::Factory], which owns the hash-consed node
//!   store, the operator cache, and the variable ordering.
//! - **Reference-counted handles**: [`Bdd`][crate::factory::Bdd] handles
//!   are affine (no `Copy`/`Clone`); operations incref their result, and
//!   the consuming `*_with` family releases operands by move, so the type
//!   system rules out double-free.
//! - **Mark-and-sweep reclamation**: unreferenced nodes are collected on
//!   demand; in-flight results of recursive operations are pinned on a ref
//!   stack, so a collection can safely hit at any interior `mk`.
//! - **Two reduction rules**: one [`Mode`][crate::types::Mode] flag selects
//!   BDD or ZDD reduction at construction time.
//! - **Finite domains**: integer-valued variables encoded across blocks of
//!   Boolean variables, with value, interval, equality, and adder
//!   constraints.
//!
//! ## Basic usage
//!
//! ```rust
//! use banyan_bdd::{Factory, Mode, Var};
//!
//! // 1. Initialize the factory and declare variables.
//! let mut fac = Factory::new(Mode::Bdd);
//! fac.set_var_num(2);
//!
//! let x0 = fac.ith_var(Var::new(0)).unwrap();
//! let x1 = fac.ith_var(Var::new(1)).unwrap();
//!
//! // 2. Build a formula: f = x0 AND (NOT x1).
//! let not_x1 = fac.not(&x1);
//! let f = fac.and(&x0, &not_x1);
//!
//! // 3. Check properties.
//! assert!(!fac.is_zero(&f)); // satisfiable
//! assert!(!fac.is_one(&f));  // not a tautology
//! assert_eq!(fac.sat_count(&f), 1u32.into());
//!
//! // 4. Release what you no longer need.
//! fac.free(f);
//! fac.free(not_x1);
//! ```
//!
//! ## Core components
//!
//! - [`factory`]: the factory, handle discipline, and node construction.
//! - [`store`]: the flat node store with its unique table and GC.
//! - [`apply`]: the recursive operator family (apply, not, ITE).
//! - [`quant`]: quantification, fused apply-quantify, relational product.
//! - [`subst`]: compose, vector composition, renaming, cofactors.
//! - [`domain`]: finite-domain (integer) variables.
//! - [`iter`]: satisfying-assignment enumeration.

pub mod apply;
pub mod cache;
pub mod domain;
pub mod dot;
pub mod error;
pub mod factory;
pub mod iter;
pub mod node;
pub mod pairing;
pub mod print;
pub mod quant;
pub mod sat;
pub mod store;
pub mod subst;
pub mod types;
pub mod utils;
pub mod varset;

pub use crate::apply::Op;
pub use crate::domain::Domain;
pub use crate::error::{Error, Result};
pub use crate::factory::{Bdd, Factory};
pub use crate::iter::{AllSatIter, MintermIter};
pub use crate::pairing::Pairing;
pub use crate::print::{DefaultNamer, DomainNamer};
pub use crate::quant::Quant;
pub use crate::types::{Level, Mode, Ref, Trit, Var};
pub use crate::varset::VarSet;
