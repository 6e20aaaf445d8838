//! The expression rewriter.
//!
//! A state-free tree transform driven entirely by the winning
//! [`Solution`]: visits every node exactly once, bottom-up, replacing
//! residual type variables with their bindings, resolving overloaded
//! references to concrete declarations with substitution lists, and
//! inserting the coercion nodes the solution implies.
//!
//! By the time this runs the solution is internally consistent; an
//! inconsistency here is a solver bug, not user error, so the contract
//! violations are debug assertions rather than diagnostics.

use crate::ast::{ConformanceRef, ExprArena, ExprId, ExprKind};
use crate::decls::{DeclTable, Requirement};
use crate::solver::{
    FoldMemo, LocatorTable, OverloadChoice, PathElem, SelectedOverload, Solution, TupleElement,
    TypeId, TypeInterner, TypeKey,
};
use tracing::trace;

/// Rewrites one expression tree according to one solution.
pub struct ExprRewriter<'a> {
    pub(crate) types: &'a TypeInterner,
    pub(crate) decls: &'a DeclTable,
    pub(crate) arena: &'a mut ExprArena,
    pub(crate) solution: &'a Solution,
    pub(crate) locators: &'a LocatorTable,
    /// Shared substitution memo: a type reachable along several paths is
    /// substituted once.
    memo: FoldMemo,
}

impl<'a> ExprRewriter<'a> {
    pub fn new(
        types: &'a TypeInterner,
        decls: &'a DeclTable,
        arena: &'a mut ExprArena,
        solution: &'a Solution,
        locators: &'a LocatorTable,
    ) -> ExprRewriter<'a> {
        ExprRewriter {
            types,
            decls,
            arena,
            solution,
            locators,
            memo: FoldMemo::default(),
        }
    }

    /// Replace every type-variable occurrence in `ty` with its binding.
    pub(crate) fn solved_ty(&mut self, ty: TypeId) -> TypeId {
        self.solution.simplify_type(self.types, ty, &mut self.memo)
    }

    /// Rewrite one node and its children; returns the replacement id
    /// (often the same node, mutated in place).
    pub fn rewrite_expr(&mut self, expr: ExprId) -> ExprId {
        let kind = self.arena.get(expr).kind.clone();
        let open_ty = self.arena.ty(expr);
        let solved = self.solved_ty(open_ty);
        trace!(expr = expr.index(), "rewrite");

        match kind {
            ExprKind::IntegerLiteral(_)
            | ExprKind::FloatLiteral(_)
            | ExprKind::StringLiteral(_)
            | ExprKind::BooleanLiteral(_)
            | ExprKind::NilLiteral => self.convert_literal(expr, solved),

            ExprKind::DeclRef(decl) => {
                // Generic references carry their substitution record.
                if let Some(selected) = self.selected_overload(expr, &[]) {
                    let substitutions = self.resolve_substitutions(&selected);
                    let conformances = self.conformance_records(decl, &substitutions);
                    self.arena.replace_kind(
                        expr,
                        ExprKind::SpecializedRef {
                            decl,
                            substitutions,
                            conformances,
                        },
                    );
                }
                self.arena.set_ty(expr, solved);
                expr
            }

            ExprKind::OverloadedRef(_) => {
                let selected = self.selected_overload(expr, &[]);
                let Some(selected) = selected else {
                    debug_assert!(false, "no overload recorded for reference");
                    self.arena.set_ty(expr, TypeId::ERROR);
                    return expr;
                };
                let Some(decl) = selected.choice.decl() else {
                    debug_assert!(false, "reference overload without declaration");
                    self.arena.set_ty(expr, TypeId::ERROR);
                    return expr;
                };
                let substitutions = self.resolve_substitutions(&selected);
                let conformances = self.conformance_records(decl, &substitutions);
                self.arena.replace_kind(
                    expr,
                    ExprKind::SpecializedRef {
                        decl,
                        substitutions,
                        conformances,
                    },
                );
                self.arena.set_ty(expr, solved);
                expr
            }

            ExprKind::Member { base, name } => {
                let base = self.rewrite_expr(base);
                let selected = self.selected_overload(expr, &[PathElem::Member(name)]);
                let Some(selected) = selected else {
                    debug_assert!(false, "no overload recorded for member access");
                    self.arena.set_ty(expr, TypeId::ERROR);
                    return expr;
                };
                match selected.choice {
                    OverloadChoice::TupleIndex(index) => {
                        let base = self.load_if_lvalue(base);
                        self.arena
                            .replace_kind(expr, ExprKind::TupleElement { base, index });
                    }
                    OverloadChoice::Decl(decl) => {
                        let substitutions = self.resolve_substitutions(&selected);
                        self.arena.replace_kind(
                            expr,
                            ExprKind::MemberRef {
                                base,
                                decl,
                                substitutions,
                            },
                        );
                    }
                    OverloadChoice::DeclViaUnwrappedOptional(decl) => {
                        let base = self.load_if_lvalue(base);
                        let base_ty = self.arena.ty(base);
                        let payload = match self.types.lookup(base_ty) {
                            Some(TypeKey::Optional(payload)) => payload,
                            _ => {
                                debug_assert!(false, "unwrapping choice on non-optional base");
                                base_ty
                            }
                        };
                        let span = self.arena.span(base);
                        let unwrapped =
                            self.arena
                                .add_typed(ExprKind::ForceUnwrap(base), payload, span);
                        let substitutions = self.resolve_substitutions(&selected);
                        self.arena.replace_kind(
                            expr,
                            ExprKind::MemberRef {
                                base: unwrapped,
                                decl,
                                substitutions,
                            },
                        );
                    }
                    OverloadChoice::BaseType => {
                        // The member access passes the base through.
                        self.arena.set_ty(expr, self.arena.ty(base));
                        return base;
                    }
                    OverloadChoice::TypeDecl(decl) => {
                        self.arena.replace_kind(
                            expr,
                            ExprKind::MemberRef {
                                base,
                                decl,
                                substitutions: Vec::new(),
                            },
                        );
                    }
                }
                self.arena.set_ty(expr, solved);
                expr
            }

            ExprKind::Call { callee, arg } => {
                let callee = self.rewrite_expr(callee);
                let callee = self.load_if_lvalue(callee);
                let arg = self.rewrite_expr(arg);
                let callee_ty = self.arena.ty(callee);
                let arg = match self.types.lookup(callee_ty) {
                    Some(TypeKey::Function(shape_id)) => {
                        let shape = self.types.function_shape(shape_id);
                        self.coerce_call_arguments(arg, &shape)
                    }
                    _ => {
                        debug_assert!(
                            callee_ty.is_error(),
                            "call through a non-function callee survived solving"
                        );
                        arg
                    }
                };
                self.arena.replace_kind(expr, ExprKind::Call { callee, arg });
                self.arena.set_ty(expr, solved);
                expr
            }

            ExprKind::Tuple { elements, labels } => {
                let mut rewritten = Vec::with_capacity(elements.len());
                let mut element_types = Vec::with_capacity(elements.len());
                for (index, &element) in elements.iter().enumerate() {
                    let element = self.rewrite_expr(element);
                    let element = self.load_if_lvalue(element);
                    element_types.push(TupleElement::new(labels[index], self.arena.ty(element)));
                    rewritten.push(element);
                }
                let tuple_ty = self.types.tuple(element_types);
                self.arena.replace_kind(
                    expr,
                    ExprKind::Tuple {
                        elements: rewritten,
                        labels,
                    },
                );
                self.arena.set_ty(expr, tuple_ty);
                expr
            }

            ExprKind::Paren(inner) => {
                let inner = self.rewrite_expr(inner);
                self.arena.replace_kind(expr, ExprKind::Paren(inner));
                self.arena.set_ty(expr, self.arena.ty(inner));
                expr
            }

            ExprKind::ForceUnwrap(sub) => {
                let sub = self.rewrite_expr(sub);
                let sub = self.load_if_lvalue(sub);
                self.arena.replace_kind(expr, ExprKind::ForceUnwrap(sub));
                self.arena.set_ty(expr, solved);
                expr
            }

            _ => {
                debug_assert!(false, "rewriter-introduced node visited twice");
                expr
            }
        }
    }

    /// The overload the solution recorded at (anchor, path).
    fn selected_overload(&self, anchor: ExprId, path: &[PathElem]) -> Option<SelectedOverload> {
        let locator = self.locators.find(anchor, path)?;
        self.solution.overload_choices.get(&locator).cloned()
    }

    /// Resolve an overload's opened substitutions against the solution:
    /// each (generic parameter, opened variable) pair becomes (generic
    /// parameter, concrete type).
    fn resolve_substitutions(&mut self, selected: &SelectedOverload) -> Vec<(TypeId, TypeId)> {
        selected
            .substitutions
            .iter()
            .map(|&(param, var)| (param, self.solved_ty(var)))
            .collect()
    }

    /// The protocol-conformance witnesses required by the declaration's
    /// `ConformsTo` requirements, instantiated at the solution's
    /// concrete types.
    fn conformance_records(
        &mut self,
        decl: crate::decls::DeclId,
        substitutions: &[(TypeId, TypeId)],
    ) -> Vec<ConformanceRef> {
        let Some(signature) = self.decls.decl_generics(decl) else {
            return Vec::new();
        };
        let mut records = Vec::new();
        for requirement in &signature.requirements {
            if let Requirement::Conformance { subject, protocol } = *requirement {
                let conforming = substitutions
                    .iter()
                    .find(|(param, _)| *param == subject)
                    .map(|(_, concrete)| *concrete);
                if let Some(conforming) = conforming {
                    records.push(ConformanceRef {
                        protocol,
                        conforming,
                    });
                }
            }
        }
        records
    }
}
