//! Constraint-based type solver.
//!
//! This module implements the inference core: open types containing type
//! variables, a constraint graph over an `ena` union-find store, a
//! DPLL-style backtracking search over disjunctions, and the scored
//! solutions the expression rewriter consumes.
//!
//! Key pieces:
//!
//! - **Intern / types**: structural `TypeKey`s hash-consed to `TypeId`s
//! - **System**: variable store, worklists, opening of generic types
//! - **Simplify**: tri-state local constraint discharge
//! - **Solve**: checkpointed search, scoring, ambiguity detection

mod constraint;
mod fold;
mod format;
mod graph;
mod intern;
mod locator;
mod shuffle;
mod simplify;
mod solution;
mod solve;
mod system;
mod types;

pub use constraint::*;
pub use fold::*;
pub use format::*;
pub use graph::*;
pub use intern::*;
pub use locator::*;
pub use shuffle::*;
pub use solution::*;
pub use solve::*;
pub use system::*;
pub use types::*;

#[cfg(test)]
mod fold_tests;
#[cfg(test)]
mod intern_tests;
#[cfg(test)]
mod shuffle_tests;
#[cfg(test)]
mod solve_tests;
#[cfg(test)]
mod system_tests;
