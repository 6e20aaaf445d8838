//! The constraint solver search.
//!
//! A depth-first backtracking search over disjunctions with iterative
//! local simplification between choice points: structurally a DPLL-style
//! solver without clause learning.
//!
//! Per attempt: **Simplify** drains the active worklist until it is empty
//! or a constraint errors. **Choose** picks the disjunction with the
//! fewest live choices (insertion order on ties) and forks the search per
//! branch through an explicit checkpoint. With no disjunctions left,
//! unbound variables are bound from candidates gathered off their
//! relational constraints plus literal-protocol defaults. A state with
//! nothing left unsolved and no free variables snapshots a candidate
//! `Solution`; candidates are compared by score, and a tie at the best
//! score is ambiguity, not an arbitrary pick.
//!
//! The search is bounded: a global explored-state budget and a ceiling on
//! disjunction nesting. Exceeding either is the "expression too complex"
//! outcome, never a crash.

use crate::limits;
use crate::solver::constraint::{ConstraintId, ConstraintKind, ConstraintStatus, MatchKind};
use crate::solver::fold;
use crate::solver::locator::LocatorId;
use crate::solver::solution::Solution;
use crate::solver::system::{ConstraintSystem, FailureRecord};
use crate::solver::types::{TypeKey, TypeId, TypeVar};
use rustc_hash::FxHashMap;
use tracing::{debug, debug_span, trace};

/// The terminal state of a solve.
#[derive(Clone, Debug)]
pub enum SolveOutcome {
    /// Exactly one best-scored complete solution.
    Success(Solution),
    /// Two or more complete solutions tied at the best score.
    Ambiguous(Vec<Solution>),
    /// No complete solution; carries the failure basis for diagnostics.
    Failure(SolveFailure),
    /// The search budget was exhausted.
    TooComplex,
}

/// Why a solve failed.
#[derive(Clone, Debug)]
pub enum SolveFailure {
    /// The first-encountered failing constraint.
    Constraint(FailureRecord),
    /// A type variable had no candidate bindings; the locator points at
    /// the expression that introduced it.
    Unresolved(LocatorId),
}

/// Sentinel for budget exhaustion, propagated out of the recursion.
struct Overflow;

impl<'a> ConstraintSystem<'a> {
    /// Run the search to a terminal state.
    pub fn solve(&mut self) -> SolveOutcome {
        let span = debug_span!("solve");
        let _enter = span.enter();

        // Constraint generation may already have recorded a structural
        // contradiction; there is nothing to search.
        if let Some(failure) = &self.first_failure
            && self.failed.is_some()
        {
            return SolveOutcome::Failure(SolveFailure::Constraint(failure.clone()));
        }

        let mut solutions = Vec::new();
        let overflowed = self.solve_rec(&mut solutions, 0).is_err();

        if solutions.is_empty() {
            if overflowed {
                return SolveOutcome::TooComplex;
            }
            if let Some(failure) = &self.first_failure {
                return SolveOutcome::Failure(SolveFailure::Constraint(failure.clone()));
            }
            if let Some(locator) = self.unresolved_failure {
                return SolveOutcome::Failure(SolveFailure::Unresolved(locator));
            }
            // Mined nothing specific: fall back to the whole expression.
            return SolveOutcome::Failure(SolveFailure::Unresolved(LocatorId(0)));
        }

        let best = solutions
            .iter()
            .map(|s| s.score)
            .min()
            .unwrap_or_default();
        let mut winners: Vec<Solution> = Vec::new();
        for solution in solutions {
            if solution.score != best {
                continue;
            }
            // Equal solutions reached along different search paths are
            // one solution, not an ambiguity.
            if winners.iter().any(|w| w.same_as(&solution)) {
                continue;
            }
            winners.push(solution);
        }

        debug!(count = winners.len(), "solver candidates at best score");
        if winners.len() == 1 {
            SolveOutcome::Success(winners.into_iter().next().unwrap_or_default())
        } else {
            SolveOutcome::Ambiguous(winners)
        }
    }

    fn solve_rec(&mut self, out: &mut Vec<Solution>, depth: usize) -> Result<(), Overflow> {
        if self.explored_states >= limits::MAX_SOLVER_STATES {
            return Err(Overflow);
        }
        self.explored_states += 1;

        // Simplify until quiescent or contradiction.
        if !self.run_simplify_worklist() {
            return Ok(());
        }

        // Choose a disjunction decision point.
        if let Some(disjunction) = self.best_disjunction() {
            if depth >= limits::MAX_DISJUNCTION_DEPTH {
                return Err(Overflow);
            }
            let (nested, locator) = {
                let constraint = &self.constraints[disjunction.0 as usize];
                match &constraint.kind {
                    ConstraintKind::Disjunction { nested } => {
                        (nested.clone(), constraint.locator)
                    }
                    _ => unreachable!("best_disjunction returned a non-disjunction"),
                }
            };
            trace!(choices = nested.len(), "entering disjunction");
            for (index, &choice) in nested.iter().enumerate() {
                let checkpoint = self.checkpoint();
                self.disjunction_choices.insert(locator, index);
                self.statuses[disjunction.0 as usize] = ConstraintStatus::Retired;
                self.statuses[choice.0 as usize] = ConstraintStatus::Active;
                self.active.push(choice);
                let result = self.solve_rec(out, depth + 1);
                self.restore(checkpoint);
                result?;
            }
            return Ok(());
        }

        // Bind a free variable from its gathered candidates.
        match self.next_binding_candidates() {
            BindingStep::Bind(var, candidates) => {
                trace!(
                    var = var.index(),
                    count = candidates.len(),
                    "trying candidate bindings"
                );
                for ty in candidates {
                    let checkpoint = self.checkpoint();
                    if !self.occurs_in(var, ty) {
                        self.assign_fixed_type(var, ty);
                        let result = self.solve_rec(out, depth);
                        self.restore(checkpoint);
                        result?;
                    } else {
                        self.restore(checkpoint);
                    }
                }
                Ok(())
            }
            BindingStep::Stuck(var) => {
                let locator = self.var_locator(var);
                if self.unresolved_failure.is_none() {
                    self.unresolved_failure = Some(locator);
                }
                Ok(())
            }
            BindingStep::AllBound => {
                if self.is_fully_solved() {
                    let solution = self.build_solution();
                    debug!(score = ?solution.score, "candidate solution");
                    out.push(solution);
                } else if let Some(stuck) = self.first_unsolved_constraint() {
                    // A constraint is still blocked even though every
                    // variable is bound; treat it as the failure basis.
                    self.record_failure(stuck);
                }
                Ok(())
            }
        }
    }

    /// Drain the active worklist. Returns false when the branch died.
    pub(crate) fn run_simplify_worklist(&mut self) -> bool {
        while let Some(id) = self.active.pop() {
            if self.statuses[id.0 as usize] != ConstraintStatus::Active {
                continue;
            }
            let result = self.simplify_constraint(id);
            self.settle(id, result);
            if self.failed.is_some() {
                return false;
            }
        }
        self.failed.is_none()
    }

    /// The unresolved disjunction with the fewest live choices, first by
    /// choice count then by insertion order.
    fn best_disjunction(&self) -> Option<ConstraintId> {
        let mut best: Option<(usize, ConstraintId)> = None;
        for (index, constraint) in self.constraints.iter().enumerate() {
            if self.statuses[index] != ConstraintStatus::Inactive {
                continue;
            }
            let ConstraintKind::Disjunction { nested } = &constraint.kind else {
                continue;
            };
            let count = nested.len();
            match best {
                None => best = Some((count, ConstraintId(index as u32))),
                Some((best_count, _)) if count < best_count => {
                    best = Some((count, ConstraintId(index as u32)));
                }
                _ => {}
            }
        }
        best.map(|(_, id)| id)
    }

    fn first_unsolved_constraint(&self) -> Option<ConstraintId> {
        self.statuses
            .iter()
            .position(|&s| s == ConstraintStatus::Active || s == ConstraintStatus::Inactive)
            .map(|index| ConstraintId(index as u32))
    }

    /// Pick the unbound representative with the fewest candidates.
    fn next_binding_candidates(&mut self) -> BindingStep {
        let var_count = self.var_count();
        let mut best: Option<(TypeVar, Vec<TypeId>)> = None;
        let mut first_stuck: Option<TypeVar> = None;
        for index in 0..var_count {
            let var = TypeVar(index as u32);
            let root = self.representative(var);
            if root != var {
                continue;
            }
            if self.fixed_binding(root).is_some() {
                continue;
            }
            let candidates = self.gather_binding_candidates(root);
            if candidates.is_empty() {
                if first_stuck.is_none() {
                    first_stuck = Some(root);
                }
                continue;
            }
            match &best {
                None => best = Some((root, candidates)),
                Some((_, existing)) if candidates.len() < existing.len() => {
                    best = Some((root, candidates));
                }
                _ => {}
            }
        }
        match (best, first_stuck) {
            (Some((var, candidates)), _) => BindingStep::Bind(var, candidates),
            (None, Some(var)) => BindingStep::Stuck(var),
            (None, None) => BindingStep::AllBound,
        }
    }

    /// Candidate bindings for one unbound representative: the concrete
    /// far side of each relational constraint mentioning it, then the
    /// literal protocol's default type for literal variables.
    fn gather_binding_candidates(&mut self, root: TypeVar) -> Vec<TypeId> {
        let mut candidates = Vec::new();
        let mentioning: Vec<ConstraintId> = self.graph.constraints_mentioning(root).to_vec();
        for id in mentioning {
            if self.statuses[id.0 as usize] != ConstraintStatus::Inactive {
                continue;
            }
            let ConstraintKind::Relation { kind, left, right } =
                self.constraints[id.0 as usize].kind.clone()
            else {
                continue;
            };
            if kind < MatchKind::Subtype {
                continue;
            }
            let left = self.resolve_shallow(left);
            let right = self.resolve_shallow(right);
            let far = match (self.types.lookup(left), self.types.lookup(right)) {
                (Some(TypeKey::Variable(v)), _) if self.representative(v) == root => right,
                (_, Some(TypeKey::Variable(v))) if self.representative(v) == root => left,
                _ => continue,
            };
            let far = self.resolve_type_fully(far);
            let far = self.types.rvalue(far);
            if fold::contains_type_variables(self.types, far) || far.is_error() {
                continue;
            }
            if !candidates.contains(&far) {
                candidates.push(far);
            }
        }
        if let Some(kind) = self.literal_kind_of(root)
            && let Some(default) = self.decls.literal_default(kind)
            && !candidates.contains(&default)
        {
            candidates.push(default);
        }
        candidates
    }

    /// True when every constraint outside unselected disjunction
    /// branches has been retired.
    fn is_fully_solved(&self) -> bool {
        self.statuses.iter().all(|&s| {
            matches!(
                s,
                ConstraintStatus::Retired | ConstraintStatus::InDisjunction
            )
        })
    }

    /// Snapshot the current bindings and choices as an immutable
    /// solution.
    fn build_solution(&mut self) -> Solution {
        let var_count = self.var_count();
        let mut bindings = FxHashMap::default();
        for index in 0..var_count {
            let var = TypeVar(index as u32);
            let var_ty = self.types.variable(var);
            let resolved = self.resolve_type_fully(var_ty);
            debug_assert!(
                !fold::contains_type_variables(self.types, resolved),
                "complete solution has a free variable"
            );
            bindings.insert(var, resolved);
        }
        Solution {
            bindings,
            overload_choices: self.overload_choices.clone(),
            disjunction_choices: self.disjunction_choices.clone(),
            fixes: self.fixes.clone(),
            score: self.score,
        }
    }
}

enum BindingStep {
    /// Try these candidates for this representative.
    Bind(TypeVar, Vec<TypeId>),
    /// Some representative is unbound with no candidates.
    Stuck(TypeVar),
    /// Every variable is bound.
    AllBound,
}
