//! Solutions and scoring.
//!
//! A `Solution` is the immutable record of one successful solve: the
//! variable bindings, the overload choice per locator, the disjunction
//! branch taken per locator, any applied fixes, and the score used to
//! rank competing solutions. Multiple solutions may exist concurrently
//! during search; only one is retained for rewriting.

use crate::solver::constraint::OverloadChoice;
use crate::solver::fold::{self, FoldMemo};
use crate::solver::intern::TypeInterner;
use crate::solver::locator::LocatorId;
use crate::solver::types::{TypeId, TypeKey, TypeVar};
use rustc_hash::FxHashMap;

/// The penalty dimensions of a score, listed most significant first.
///
/// The specific weights are tunable; the contract is only that scores
/// order solutions deterministically and that "natural" solutions (no
/// unwraps, default literal types, no injections) score zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreKind {
    /// A member was reached through a force-unwrapped optional base.
    UnwrappedOptionalMember = 0,
    /// A literal bound to a type other than its protocol's default.
    NonDefaultLiteral = 1,
    /// A value was implicitly injected into an optional.
    ValueToOptional = 2,
    /// A tuple argument needed reshuffling or default-filling.
    TupleConversion = 3,
}

/// Number of score dimensions.
pub const SCORE_KINDS: usize = 4;

/// A solution score: a vector of penalty counts compared
/// lexicographically, most significant dimension first. Lower is better.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Score(pub [u32; SCORE_KINDS]);

impl Score {
    pub fn zero() -> Score {
        Score::default()
    }

    /// Increase one dimension by one.
    pub fn increase(&mut self, kind: ScoreKind) {
        self.0[kind as usize] += 1;
    }

    /// Accumulate another score into this one, dimension-wise.
    pub fn merge(&mut self, other: Score) {
        for (slot, add) in self.0.iter_mut().zip(other.0.iter()) {
            *slot += add;
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&n| n == 0)
    }
}

/// A recovery annotation applied to keep an otherwise-failing solve
/// alive for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fix {
    pub kind: FixKind,
    pub locator: LocatorId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixKind {
    /// An optional value was used where its payload type was required;
    /// recovery force-unwraps it.
    ForceOptional,
}

/// The overload selected at one locator, with the type it was opened to.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedOverload {
    pub choice: OverloadChoice,
    /// The opened type of the referenced declaration (type variables
    /// replaced, still in terms of the solution's bindings).
    pub opened_ty: TypeId,
    /// (generic parameter type, opened replacement) pairs recorded when
    /// the declaration's signature was opened.
    pub substitutions: Vec<(TypeId, TypeId)>,
}

/// An immutable record of the winning bindings and choices.
#[derive(Clone, Debug, Default)]
pub struct Solution {
    /// Fully-substituted concrete binding per type variable.
    pub bindings: FxHashMap<TypeVar, TypeId>,
    /// Selected overload per locator.
    pub overload_choices: FxHashMap<LocatorId, SelectedOverload>,
    /// Selected branch index per disjunction locator.
    pub disjunction_choices: FxHashMap<LocatorId, usize>,
    /// Recovery annotations applied during the solve.
    pub fixes: Vec<Fix>,
    /// The accumulated penalty score.
    pub score: Score,
}

impl Solution {
    /// Replace every type-variable occurrence in `ty` with its binding.
    ///
    /// Memoize across calls by passing the same `memo`; a shared subterm
    /// is substituted once, not once per path.
    pub fn simplify_type(
        &self,
        interner: &TypeInterner,
        ty: TypeId,
        memo: &mut FoldMemo,
    ) -> TypeId {
        fold::transform_type(interner, ty, memo, &mut |_, key| match key {
            TypeKey::Variable(var) => Some(
                self.bindings
                    .get(var)
                    .copied()
                    .unwrap_or(TypeId::ERROR),
            ),
            _ => None,
        })
    }

    /// The binding for one variable, if it has one.
    pub fn binding(&self, var: TypeVar) -> Option<TypeId> {
        self.bindings.get(&var).copied()
    }

    /// True if the two solutions agree on every binding and overload
    /// choice. Which disjunction branch produced them is irrelevant:
    /// equal outcomes reached along different search paths are one
    /// solution, not an ambiguity.
    pub fn same_as(&self, other: &Solution) -> bool {
        self.bindings == other.bindings
            && self.overload_choices.len() == other.overload_choices.len()
            && self.overload_choices.iter().all(|(locator, selected)| {
                other
                    .overload_choices
                    .get(locator)
                    .is_some_and(|o| o.choice == selected.choice)
            })
    }
}
