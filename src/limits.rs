//! Centralized limits and thresholds.
//!
//! Every guard that bounds the solver's search or recursion lives here so
//! the budgets are visible in one place and can be tuned together.

/// Maximum number of solver states explored during a single solve.
///
/// The disjunction search is worst-case exponential; crossing this budget
/// aborts the solve with an "expression too complex" diagnostic rather
/// than running away.
pub const MAX_SOLVER_STATES: usize = 65_536;

/// Maximum nesting depth of disjunction decision points.
///
/// Matches the recursion ceiling used by the fixed-point walks elsewhere
/// in the compiler.
pub const MAX_DISJUNCTION_DEPTH: usize = 8;

/// Maximum optional wrapping depth the coercion machinery will traverse.
pub const MAX_OPTIONAL_DEPTH: usize = 16;

/// Maximum recursion depth for structural type matching before the match
/// is considered divergent (protects against pathological self-referential
/// shapes reaching the solver).
pub const MAX_MATCH_DEPTH: usize = 256;

/// Red-zone/stack-growth parameters for deep recursive simplification.
pub const STACK_RED_ZONE: usize = 96 * 1024;
pub const STACK_GROWTH: usize = 1024 * 1024;
