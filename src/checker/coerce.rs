//! Coercion insertion.
//!
//! Makes an expression's type match a required destination type by
//! inserting explicit conversion nodes: loads, class upcasts, optional
//! bind/inject chains, tuple shuffles, scalar-to-tuple promotion, and
//! existential erasure. Coercing a value to its own type is a no-op and
//! returns the expression unchanged.
//!
//! The solver has already proven every conversion requested here exists;
//! a shape this code cannot handle is a solver bug, guarded by debug
//! assertions.

use crate::ast::{ConformanceRef, ExprId, ExprKind, ShuffleSource};
use crate::checker::rewrite::ExprRewriter;
use crate::solver::{
    FunctionShape, TupleElement, TypeId, TypeKey, is_identity_mapping, match_call_arguments,
    match_tuple_elements,
};

impl<'a> ExprRewriter<'a> {
    /// Insert a `Load` when the expression is an lvalue reference.
    pub(crate) fn load_if_lvalue(&mut self, expr: ExprId) -> ExprId {
        let ty = self.arena.ty(expr);
        match self.types.lookup(ty) {
            Some(TypeKey::LValue(object)) => {
                let span = self.arena.span(expr);
                self.arena.add_typed(ExprKind::Load(expr), object, span)
            }
            _ => expr,
        }
    }

    /// Coerce `expr` to `target`, inserting whatever conversion nodes
    /// the type difference requires. Identity coercions return `expr`
    /// unchanged.
    pub fn coerce_to_type(&mut self, expr: ExprId, target: TypeId) -> ExprId {
        let ty = self.arena.ty(expr);
        if ty == target {
            return expr;
        }
        if ty.is_error() || target.is_error() {
            return expr;
        }

        if matches!(self.types.lookup(ty), Some(TypeKey::LValue(_))) {
            let loaded = self.load_if_lvalue(expr);
            return self.coerce_to_type(loaded, target);
        }

        let (from_depth, _) = self.types.optional_depth_of(ty);
        let (to_depth, _) = self.types.optional_depth_of(target);
        if from_depth > 0 || to_depth > 0 {
            return self.coerce_optional(expr, ty, target, from_depth, to_depth);
        }

        match (self.types.lookup(ty), self.types.lookup(target)) {
            (Some(TypeKey::Tuple(from)), Some(TypeKey::Tuple(to))) => {
                let from = self.types.tuple_list(from);
                let to = self.types.tuple_list(to);
                self.coerce_tuple(expr, &from, &to, target)
            }
            (Some(TypeKey::Nominal(sub)), Some(TypeKey::Nominal(sup))) => {
                debug_assert!(self.decls.is_subclass(sub, sup));
                let span = self.arena.span(expr);
                self.arena
                    .add_typed(ExprKind::DerivedToBase(expr), target, span)
            }
            (_, Some(TypeKey::Protocol(_))) | (_, Some(TypeKey::Existential(_))) => {
                // One conformance record per protocol in the existential.
                let protocols = self
                    .types
                    .existential_protocols(target)
                    .unwrap_or_default();
                let conformances: Vec<ConformanceRef> = protocols
                    .into_iter()
                    .map(|protocol| ConformanceRef {
                        protocol,
                        conforming: ty,
                    })
                    .collect();
                let span = self.arena.span(expr);
                self.arena.add_typed(
                    ExprKind::Erasure {
                        sub: expr,
                        conformances,
                    },
                    target,
                    span,
                )
            }
            (_, Some(TypeKey::Tuple(to))) => {
                let to = self.types.tuple_list(to);
                debug_assert_eq!(to.len(), 1, "scalar-to-tuple needs a unary destination");
                let coerced = self.coerce_to_type(expr, to[0].ty);
                let span = self.arena.span(coerced);
                self.arena.add_typed(
                    ExprKind::ScalarToTuple {
                        sub: coerced,
                        label: to[0].label,
                    },
                    target,
                    span,
                )
            }
            _ => {
                debug_assert!(false, "solver admitted a conversion the rewriter cannot emit");
                expr
            }
        }
    }

    /// Depth-aware optional coercion: counts the wrap-depth difference
    /// and inserts that many injections, with a bind/evaluate chain when
    /// the payload itself also converts.
    fn coerce_optional(
        &mut self,
        expr: ExprId,
        ty: TypeId,
        target: TypeId,
        from_depth: u32,
        to_depth: u32,
    ) -> ExprId {
        let span = self.arena.span(expr);

        if from_depth == 0 {
            // Convert to the payload, then inject.
            let payload_target = match self.types.lookup(target) {
                Some(TypeKey::Optional(payload)) => payload,
                _ => {
                    debug_assert!(false, "zero-depth source against non-optional target");
                    return expr;
                }
            };
            let coerced = self.coerce_to_type(expr, payload_target);
            return self
                .arena
                .add_typed(ExprKind::InjectIntoOptional(coerced), target, span);
        }

        if to_depth >= from_depth {
            // Same payload, extra wrapping: pure re-injection with no
            // intervening unwrap.
            let extra = to_depth - from_depth;
            let mut peeled = target;
            for _ in 0..extra {
                peeled = match self.types.lookup(peeled) {
                    Some(TypeKey::Optional(payload)) => payload,
                    _ => break,
                };
            }
            if peeled == ty {
                let mut current = expr;
                let mut current_ty = ty;
                for _ in 0..extra {
                    current_ty = self.types.optional(current_ty);
                    current = self.arena.add_typed(
                        ExprKind::InjectIntoOptional(current),
                        current_ty,
                        span,
                    );
                }
                return current;
            }
        }

        if to_depth == 0 {
            debug_assert!(
                false,
                "optional-to-scalar coercion requires an explicit unwrap"
            );
            return expr;
        }

        // Payload conversion under matching optionality: bind the value,
        // convert, re-inject, and mark the evaluation boundary.
        let bound_ty = match self.types.lookup(ty) {
            Some(TypeKey::Optional(payload)) => payload,
            _ => ty,
        };
        let payload_target = match self.types.lookup(target) {
            Some(TypeKey::Optional(payload)) => payload,
            _ => target,
        };
        let bound = self
            .arena
            .add_typed(ExprKind::BindOptional(expr), bound_ty, span);
        let coerced = self.coerce_to_type(bound, payload_target);
        let injected = self
            .arena
            .add_typed(ExprKind::InjectIntoOptional(coerced), target, span);
        self.arena
            .add_typed(ExprKind::OptionalEvaluation(injected), target, span)
    }

    /// Tuple-to-tuple conversion: element coercions in place (the source
    /// is a tuple literal by construction), wrapped in a shuffle when
    /// the mapping is not the identity.
    fn coerce_tuple(
        &mut self,
        expr: ExprId,
        from: &[TupleElement],
        to: &[TupleElement],
        target: TypeId,
    ) -> ExprId {
        let mapping = match match_tuple_elements(from, to) {
            Ok(mapping) => mapping,
            Err(_) => {
                debug_assert!(false, "solver admitted an unmatchable tuple conversion");
                return expr;
            }
        };

        if let ExprKind::Tuple { elements, labels } = self.arena.get(expr).kind.clone() {
            let mut coerced = elements.clone();
            let mut coerced_types: Vec<TupleElement> = from.to_vec();
            for (dest, source) in mapping.iter().enumerate() {
                if let ShuffleSource::Argument(i) = source {
                    let index = *i as usize;
                    let new_element = self.coerce_to_type(elements[index], to[dest].ty);
                    coerced[index] = new_element;
                    coerced_types[index] =
                        TupleElement::new(from[index].label, self.arena.ty(new_element));
                }
            }
            let new_ty = self.types.tuple(coerced_types);
            self.arena.replace_kind(
                expr,
                ExprKind::Tuple {
                    elements: coerced,
                    labels,
                },
            );
            self.arena.set_ty(expr, new_ty);
        }

        if is_identity_mapping(&mapping, from.len()) && self.arena.ty(expr) == target {
            return expr;
        }
        let span = self.arena.span(expr);
        self.arena.add_typed(
            ExprKind::TupleShuffle {
                sub: expr,
                mapping,
            },
            target,
            span,
        )
    }

    /// Argument-to-parameter coercion for a call: coerces each matched
    /// element to its parameter type and wraps the argument tuple in a
    /// shuffle when reordering, defaults, or variadic collection apply.
    pub(crate) fn coerce_call_arguments(
        &mut self,
        arg: ExprId,
        shape: &FunctionShape,
    ) -> ExprId {
        let ExprKind::Tuple { elements, labels } = self.arena.get(arg).kind.clone() else {
            debug_assert!(false, "call argument is always a tuple node");
            return arg;
        };

        let from: Vec<TupleElement> = elements
            .iter()
            .zip(labels.iter())
            .map(|(&element, &label)| TupleElement::new(label, self.arena.ty(element)))
            .collect();
        let mapping = match match_call_arguments(&from, &shape.params) {
            Ok(mapping) => mapping,
            Err(_) => {
                debug_assert!(false, "solver admitted an inapplicable call");
                return arg;
            }
        };

        let mut coerced = elements.clone();
        let mut coerced_types = from.clone();
        for (param_index, source) in mapping.iter().enumerate() {
            let param = &shape.params[param_index];
            let sources: &[u32] = match source {
                ShuffleSource::Argument(i) => std::slice::from_ref(i),
                ShuffleSource::Variadic(list) => list.as_slice(),
                ShuffleSource::DefaultArgument(_) => &[],
            };
            for &i in sources {
                let index = i as usize;
                let new_element = self.coerce_to_type(elements[index], param.ty);
                coerced[index] = new_element;
                coerced_types[index] =
                    TupleElement::new(from[index].label, self.arena.ty(new_element));
            }
        }

        let changed = coerced != elements;
        if changed {
            let new_ty = self.types.tuple(coerced_types);
            self.arena.replace_kind(
                arg,
                ExprKind::Tuple {
                    elements: coerced,
                    labels,
                },
            );
            self.arena.set_ty(arg, new_ty);
        }

        if is_identity_mapping(&mapping, elements.len()) {
            return arg;
        }
        let span = self.arena.span(arg);
        let param_tuple: Vec<TupleElement> = shape
            .params
            .iter()
            .map(|param| TupleElement::new(param.label, param.ty))
            .collect();
        let shuffle_ty = self.types.tuple(param_tuple);
        self.arena.add_typed(
            ExprKind::TupleShuffle { sub: arg, mapping },
            shuffle_ty,
            span,
        )
    }
}
