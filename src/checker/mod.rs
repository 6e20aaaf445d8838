//! Type checking orchestration.
//!
//! The public entry point for checking one expression: generate
//! constraints, run the solver, and either rewrite the tree into its
//! fully typed form or surface exactly one primary diagnostic (with
//! secondary notes for ambiguity candidates). The erroring expression's
//! type is set to the error placeholder so downstream passes can tell
//! "already diagnosed" from "untyped".

pub mod coerce;
pub mod literals;
mod rewrite;

pub use rewrite::ExprRewriter;

use crate::ast::{ExprArena, ExprId};
use crate::decls::DeclTable;
use crate::diagnostics::{Diagnostic, DiagnosticBag, DiagnosticRelatedInfo, codes};
use crate::generics::GenericEnvironment;
use crate::interner::Interner;
use crate::solver::{
    ConstraintKind, ConstraintSystem, FailureRecord, SolveFailure, SolveOutcome, TypeInterner,
    format_type,
};
use crate::solver::TypeId;
use tracing::debug_span;

#[cfg(test)]
mod coerce_tests;
#[cfg(test)]
mod e2e_tests;

/// Check one expression against an optional contextual type, inside an
/// optional generic environment (the enclosing declaration's, as
/// resolved by the archetype builder).
///
/// On success the arena holds the fully typed, fully coerced tree and the
/// returned id is the (possibly wrapped) root. On failure one primary
/// diagnostic lands in `bag`, the root's type becomes the error type, and
/// the original root id is returned.
pub fn typecheck_expr(
    types: &TypeInterner,
    decls: &DeclTable,
    names: &Interner,
    environment: Option<&GenericEnvironment>,
    arena: &mut ExprArena,
    root: ExprId,
    contextual: Option<TypeId>,
    bag: &mut DiagnosticBag,
) -> Result<ExprId, ()> {
    let span = debug_span!("typecheck_expr", root = root.index());
    let _enter = span.enter();

    // Contextual types written inside a generic declaration mention its
    // parameters; they stand for the enclosing archetypes here.
    let contextual = contextual.map(|target| match environment {
        Some(environment) => environment.map_type(types, target),
        None => target,
    });

    let mut system = ConstraintSystem::new(types, decls);
    let root_ty = system.generate_constraints(arena, root);
    if let Some(target) = contextual {
        system.add_contextual_type(root, root_ty, target);
    }

    match system.solve() {
        SolveOutcome::Success(solution) => {
            let mut rewriter =
                ExprRewriter::new(types, decls, arena, &solution, system.locator_table());
            let rewritten = rewriter.rewrite_expr(root);
            let final_root = match contextual {
                Some(target) => rewriter.coerce_to_type(rewritten, target),
                None => rewritten,
            };
            Ok(final_root)
        }
        SolveOutcome::Ambiguous(solutions) => {
            let mut diagnostic = Diagnostic::error(
                arena.span(root),
                "expression is ambiguous: multiple solutions score equally well",
                codes::AMBIGUOUS,
            );
            // Point at the first locator where the candidates diverge,
            // with one note per competing declaration.
            if let Some((locator, candidates)) = first_divergence(&solutions) {
                let anchor = system.locator_anchor(locator);
                for choice in candidates {
                    let related = match choice.decl() {
                        Some(decl) => {
                            let name = names.resolve(decls.decl(decl).name());
                            DiagnosticRelatedInfo::new(
                                decls.decl(decl).span,
                                format!("candidate '{}' found here", name),
                            )
                        }
                        None => DiagnosticRelatedInfo::new(
                            arena.span(anchor),
                            "candidate found here".to_string(),
                        ),
                    };
                    diagnostic = diagnostic.with_related(related);
                }
            }
            bag.add(diagnostic);
            arena.set_ty(root, TypeId::ERROR);
            Err(())
        }
        SolveOutcome::Failure(failure) => {
            let diagnostic = match failure {
                SolveFailure::Constraint(record) => {
                    failure_diagnostic(&record, &system, types, decls, names, arena)
                }
                SolveFailure::Unresolved(locator) => {
                    let anchor = system.locator_anchor(locator);
                    Diagnostic::error(
                        arena.span(anchor),
                        "type of expression is ambiguous without more context",
                        codes::UNRESOLVED_TYPE,
                    )
                }
            };
            bag.add(diagnostic);
            arena.set_ty(root, TypeId::ERROR);
            Err(())
        }
        SolveOutcome::TooComplex => {
            bag.error(
                arena.span(root),
                "the expression is too complex to be solved in reasonable time; \
                 consider breaking it into distinct sub-expressions",
                codes::TOO_COMPLEX,
            );
            arena.set_ty(root, TypeId::ERROR);
            Err(())
        }
    }
}

/// Map the first-failing constraint onto a primary diagnostic.
fn failure_diagnostic(
    record: &FailureRecord,
    system: &ConstraintSystem<'_>,
    types: &TypeInterner,
    decls: &DeclTable,
    names: &Interner,
    arena: &ExprArena,
) -> Diagnostic {
    let anchor = system.locator_anchor(record.constraint.locator);
    let span = arena.span(anchor);
    let (left, right) = record.resolved;
    match &record.constraint.kind {
        ConstraintKind::Relation { .. } => Diagnostic::error(
            span,
            format!(
                "cannot convert value of type '{}' to expected type '{}'",
                format_type(types, decls, names, left),
                format_type(types, decls, names, right),
            ),
            codes::TYPE_MISMATCH,
        ),
        ConstraintKind::ConformsTo { protocol, .. } => Diagnostic::error(
            span,
            format!(
                "type '{}' does not conform to protocol '{}'",
                format_type(types, decls, names, left),
                names.resolve(decls.protocol(*protocol).name),
            ),
            codes::PROTOCOL_CONFORMANCE,
        ),
        ConstraintKind::LiteralConformsTo { .. } => Diagnostic::error(
            span,
            format!(
                "type '{}' is not expressible by this literal",
                format_type(types, decls, names, left),
            ),
            codes::LITERAL_NOT_EXPRESSIBLE,
        ),
        ConstraintKind::ApplicableFunction { .. } => Diagnostic::error(
            span,
            format!(
                "cannot call value of type '{}' with arguments of type '{}'",
                format_type(types, decls, names, right),
                format_type(types, decls, names, left),
            ),
            codes::CANNOT_CALL,
        ),
        ConstraintKind::ValueMember { name, .. } => Diagnostic::error(
            span,
            format!(
                "value of type '{}' has no member '{}'",
                format_type(types, decls, names, left),
                names.resolve(*name),
            ),
            codes::NO_SUCH_MEMBER,
        ),
        ConstraintKind::BindOverload { .. } | ConstraintKind::Disjunction { .. } => {
            Diagnostic::error(
                span,
                "no overload candidate matches this use",
                codes::TYPE_MISMATCH,
            )
        }
    }
}

/// The lowest locator where the tied solutions picked different
/// overloads, with the competing choices in solution order.
fn first_divergence(
    solutions: &[crate::solver::Solution],
) -> Option<(crate::solver::LocatorId, Vec<crate::solver::OverloadChoice>)> {
    let first = solutions.first()?;
    let mut locators: Vec<crate::solver::LocatorId> =
        first.overload_choices.keys().copied().collect();
    locators.sort();
    for locator in locators {
        let mut choices: Vec<crate::solver::OverloadChoice> = Vec::new();
        for solution in solutions {
            if let Some(selected) = solution.overload_choices.get(&locator)
                && !choices.contains(&selected.choice)
            {
                choices.push(selected.choice);
            }
        }
        if choices.len() > 1 {
            return Some((locator, choices));
        }
    }
    None
}
