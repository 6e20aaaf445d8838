//! aster-sema: semantic analysis for the Aster compiler.
//!
//! The middle end of an ahead-of-time-compiled, statically typed
//! language: constraint-based type inference over an expression tree, a
//! generic-parameter archetype resolver, and a solution-driven expression
//! rewriter producing fully typed, fully coerced trees for IR lowering.
//!
//! Pipeline: parsed expression → [`generics::ArchetypeBuilder`] resolves
//! the enclosing generic environment → [`solver::ConstraintSystem`] opens
//! types and generates constraints → solver search → winning
//! [`solver::Solution`] → [`checker::ExprRewriter`] → typed tree.
//!
//! The solver and rewriter are single-threaded, synchronous, and
//! non-reentrant per constraint-system instance. All type, constraint
//! and archetype storage is append-only for the duration of a check
//! request; backtracking rewinds the union-find and worklists through
//! explicit checkpoints, never by freeing.

// String interning for identifier deduplication
pub mod interner;
pub use interner::{Atom, Interner};

// Source spans
pub mod span;
pub use span::Span;

// Centralized limits and thresholds
pub mod limits;

// Diagnostic infrastructure
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticBag, DiagnosticSeverity};

// Tracing subscriber setup (ASTER_LOG / ASTER_LOG_FORMAT)
pub mod tracing_config;

// Expression tree and arena storage
pub mod ast;

// Declaration table: values, nominals, protocols, literal registry
pub mod decls;

// Constraint-based type solver
pub mod solver;

// Generic-environment resolution (archetypes)
pub mod generics;

// Type checking orchestration and the expression rewriter
pub mod checker;
pub use checker::typecheck_expr;

// Shared test fixtures
#[cfg(test)]
pub mod test_fixtures;
