//! Generic-environment resolution.
//!
//! Turns a declaration's generic parameter list and requirements into
//! concrete per-parameter archetype types. The builder accumulates
//! potential archetypes, unifies same-type classes, and finalizes once
//! into an immutable [`GenericEnvironment`].

mod builder;

pub use builder::{ArchetypeBuilder, GenericEnvironment};
