//! Constraint simplification.
//!
//! One attempt at locally discharging a constraint. Simplification is
//! tri-state: `Solved` retires the constraint, `Unsolved` refiles it
//! against the variables blocking it, `Error` fails the current branch.
//! It never panics on user input and never throws; contradiction is a
//! return value.
//!
//! Matching under `Bind`/`Equal` recurses inline and binds variables on
//! the spot. Matching under the looser kinds decomposes composite types
//! into spawned element constraints instead: a stalled relation then
//! always has a type variable at its top level, which is what the
//! solver's binding stage gathers candidates from.
//!
//! Score penalties discovered while matching (optional injections, tuple
//! reshuffles) accumulate into a pending score that is only applied when
//! the constraint solves, so a constraint re-simplified after stalling
//! cannot double-count.

use crate::ast::ShuffleSource;
use crate::decls::LiteralKind;
use crate::limits;
use crate::solver::constraint::{
    ConstraintId, ConstraintKind, MatchKind, OverloadChoice, SimplifyResult,
};
use crate::solver::fold::FoldMemo;
use crate::solver::locator::{LocatorId, PathElem};
use crate::solver::shuffle;
use crate::solver::solution::{Fix, FixKind, Score, ScoreKind, SelectedOverload};
use crate::solver::system::ConstraintSystem;
use crate::solver::types::{IntrinsicKind, TupleElement, TypeId, TypeKey, TypeVar};
use rustc_hash::FxHashMap;
use tracing::trace;

impl<'a> ConstraintSystem<'a> {
    /// Attempt to discharge one constraint.
    pub(crate) fn simplify_constraint(&mut self, id: ConstraintId) -> SimplifyResult {
        let constraint = self.constraints[id.0 as usize].clone();
        let locator = constraint.locator;
        let mut pending = Score::zero();
        let result = match constraint.kind {
            ConstraintKind::Relation { kind, left, right } => {
                self.match_types(left, right, kind, locator, &mut pending)
            }
            ConstraintKind::ConformsTo { ty, protocol } => self.simplify_conforms(ty, protocol),
            ConstraintKind::LiteralConformsTo { ty, literal } => {
                self.simplify_literal(ty, literal)
            }
            ConstraintKind::ApplicableFunction {
                arg,
                callee,
                result,
            } => self.simplify_applicable(arg, callee, result, locator, &mut pending),
            ConstraintKind::ValueMember { base, name, member } => {
                self.simplify_member(base, name, member, locator, &mut pending)
            }
            ConstraintKind::BindOverload {
                overload_ty,
                choice,
                base,
            } => self.simplify_bind_overload(overload_ty, choice, base, locator, &mut pending),
            // Disjunctions are decision points for the solver, never
            // locally simplified.
            ConstraintKind::Disjunction { .. } => SimplifyResult::Unsolved,
        };
        if result == SimplifyResult::Solved {
            self.score.merge(pending);
        }
        result
    }

    /// Spawn a follow-up relation discovered while decomposing a
    /// composite match.
    fn spawn_relation(&mut self, kind: MatchKind, left: TypeId, right: TypeId, locator: LocatorId) {
        self.add_constraint(ConstraintKind::Relation { kind, left, right }, locator);
    }

    // =========================================================================
    // Structural matching
    // =========================================================================

    /// Relate `left` to `right` under `kind`. Variables bind for `Bind`
    /// and `Equal`; under the looser kinds an unbound variable stalls the
    /// match so the solver's binding stage can decide.
    pub(crate) fn match_types(
        &mut self,
        left: TypeId,
        right: TypeId,
        kind: MatchKind,
        locator: LocatorId,
        pending: &mut Score,
    ) -> SimplifyResult {
        self.match_types_at(left, right, kind, locator, pending, 0)
    }

    fn match_types_at(
        &mut self,
        left: TypeId,
        right: TypeId,
        kind: MatchKind,
        locator: LocatorId,
        pending: &mut Score,
        depth: usize,
    ) -> SimplifyResult {
        if depth > limits::MAX_MATCH_DEPTH {
            return SimplifyResult::Error;
        }
        stacker::maybe_grow(limits::STACK_RED_ZONE, limits::STACK_GROWTH, || {
            self.match_types_impl(left, right, kind, locator, pending, depth)
        })
    }

    fn match_types_impl(
        &mut self,
        left: TypeId,
        right: TypeId,
        kind: MatchKind,
        locator: LocatorId,
        pending: &mut Score,
        depth: usize,
    ) -> SimplifyResult {
        let mut left = self.resolve_shallow(left);
        let mut right = self.resolve_shallow(right);

        // Everything looser than Bind operates on object types.
        if kind >= MatchKind::Equal {
            if let Some(TypeKey::LValue(object)) = self.types.lookup(left) {
                left = self.resolve_shallow(object);
            }
            if let Some(TypeKey::LValue(object)) = self.types.lookup(right) {
                right = self.resolve_shallow(object);
            }
        }

        if left == right {
            return SimplifyResult::Solved;
        }
        // The error type matches everything silently; the mismatch was
        // already diagnosed wherever the error type came from.
        if left.is_error() || right.is_error() {
            return SimplifyResult::Solved;
        }

        let left_key = self.types.lookup(left);
        let right_key = self.types.lookup(right);

        match (&left_key, &right_key) {
            (Some(TypeKey::Variable(l)), Some(TypeKey::Variable(r))) => {
                if kind <= MatchKind::Equal {
                    self.merge_equivalence_classes(*l, *r);
                    SimplifyResult::Solved
                } else {
                    SimplifyResult::Unsolved
                }
            }
            (Some(TypeKey::Variable(var)), _) => {
                if kind <= MatchKind::Equal {
                    self.bind_variable(*var, right)
                } else {
                    SimplifyResult::Unsolved
                }
            }
            (_, Some(TypeKey::Variable(var))) => {
                if kind <= MatchKind::Equal {
                    self.bind_variable(*var, left)
                } else {
                    SimplifyResult::Unsolved
                }
            }
            _ => {
                if kind <= MatchKind::Equal {
                    self.match_strict(left, right, kind, locator, pending, depth)
                } else {
                    self.match_loose(left, right, kind, locator, pending)
                }
            }
        }
    }

    /// Bind an unbound variable to a concrete type, with occurs check.
    /// Variables not flagged for lvalue binding take the object type.
    fn bind_variable(&mut self, var: TypeVar, ty: TypeId) -> SimplifyResult {
        let root = self.representative(var);
        let mut ty = self.resolve_shallow(ty);
        if !self
            .var_options(root)
            .contains(crate::solver::system::TypeVarOptions::CAN_BIND_TO_LVALUE)
        {
            ty = self.types.rvalue(ty);
        }
        if self.occurs_in(root, ty) {
            trace!(var = root.index(), "occurs check failed");
            return SimplifyResult::Error;
        }
        self.assign_fixed_type(root, ty);
        SimplifyResult::Solved
    }

    /// Strict structural matching for `Bind` and `Equal`: inline
    /// recursion, shape and labels must line up exactly.
    fn match_strict(
        &mut self,
        left: TypeId,
        right: TypeId,
        kind: MatchKind,
        locator: LocatorId,
        pending: &mut Score,
        depth: usize,
    ) -> SimplifyResult {
        let left_key = self.types.lookup(left);
        let right_key = self.types.lookup(right);

        match (&left_key, &right_key) {
            (Some(TypeKey::Tuple(l)), Some(TypeKey::Tuple(r))) => {
                let from = self.types.tuple_list(*l);
                let to = self.types.tuple_list(*r);
                if from.len() != to.len() {
                    return SimplifyResult::Error;
                }
                let mut outcome = SimplifyResult::Solved;
                for (f, t) in from.iter().zip(to.iter()) {
                    if f.label != t.label {
                        return SimplifyResult::Error;
                    }
                    match self.match_types_at(f.ty, t.ty, kind, locator, pending, depth + 1) {
                        SimplifyResult::Error => return SimplifyResult::Error,
                        SimplifyResult::Unsolved => outcome = SimplifyResult::Unsolved,
                        SimplifyResult::Solved => {}
                    }
                }
                outcome
            }
            (Some(TypeKey::Function(l)), Some(TypeKey::Function(r))) => {
                let from = self.types.function_shape(*l);
                let to = self.types.function_shape(*r);
                if from.params.len() != to.params.len() {
                    return SimplifyResult::Error;
                }
                let mut outcome = SimplifyResult::Solved;
                for (f, t) in from.params.iter().zip(to.params.iter()) {
                    if f.label != t.label || f.variadic != t.variadic {
                        return SimplifyResult::Error;
                    }
                    match self.match_types_at(f.ty, t.ty, kind, locator, pending, depth + 1) {
                        SimplifyResult::Error => return SimplifyResult::Error,
                        SimplifyResult::Unsolved => outcome = SimplifyResult::Unsolved,
                        SimplifyResult::Solved => {}
                    }
                }
                match self.match_types_at(
                    from.result,
                    to.result,
                    kind,
                    locator,
                    pending,
                    depth + 1,
                ) {
                    SimplifyResult::Error => SimplifyResult::Error,
                    SimplifyResult::Unsolved => SimplifyResult::Unsolved,
                    SimplifyResult::Solved => outcome,
                }
            }
            (Some(TypeKey::Optional(l)), Some(TypeKey::Optional(r))) => {
                self.match_types_at(*l, *r, kind, locator, pending, depth + 1)
            }
            (Some(TypeKey::Metatype(l)), Some(TypeKey::Metatype(r))) => {
                self.match_types_at(*l, *r, kind, locator, pending, depth + 1)
            }
            (Some(TypeKey::BoundGeneric(ln, la)), Some(TypeKey::BoundGeneric(rn, ra)))
                if ln == rn =>
            {
                let largs = self.types.type_list(*la);
                let rargs = self.types.type_list(*ra);
                if largs.len() != rargs.len() {
                    return SimplifyResult::Error;
                }
                let mut outcome = SimplifyResult::Solved;
                for (&a, &b) in largs.iter().zip(rargs.iter()) {
                    match self.match_types_at(a, b, kind, locator, pending, depth + 1) {
                        SimplifyResult::Error => return SimplifyResult::Error,
                        SimplifyResult::Unsolved => outcome = SimplifyResult::Unsolved,
                        SimplifyResult::Solved => {}
                    }
                }
                outcome
            }
            (Some(TypeKey::LValue(l)), Some(TypeKey::LValue(r))) => {
                self.match_types_at(*l, *r, kind, locator, pending, depth + 1)
            }
            (Some(TypeKey::DependentMember { .. }), _)
            | (_, Some(TypeKey::DependentMember { .. })) => SimplifyResult::Unsolved,
            _ => SimplifyResult::Error,
        }
    }

    /// Loose matching for `Subtype` and `Conversion`: leaf relations are
    /// decided directly; composite shapes decompose into spawned element
    /// constraints and succeed, letting the elements carry the outcome.
    fn match_loose(
        &mut self,
        left: TypeId,
        right: TypeId,
        kind: MatchKind,
        locator: LocatorId,
        pending: &mut Score,
    ) -> SimplifyResult {
        let left_key = self.types.lookup(left);
        let right_key = self.types.lookup(right);

        // Optional depth handling first, so wrap-depth differences are
        // decided before structural decomposition.
        if kind == MatchKind::Conversion {
            match (&left_key, &right_key) {
                (Some(TypeKey::Optional(l)), Some(TypeKey::Optional(r))) => {
                    // Same-kind optional-to-optional: pure re-wrap.
                    self.spawn_relation(kind, *l, *r, locator);
                    return SimplifyResult::Solved;
                }
                (_, Some(TypeKey::Optional(payload))) => {
                    // Value-to-optional injection.
                    let payload_locator = self.locators.extend(locator, PathElem::OptionalPayload);
                    self.spawn_relation(kind, left, *payload, payload_locator);
                    pending.increase(ScoreKind::ValueToOptional);
                    return SimplifyResult::Solved;
                }
                (Some(TypeKey::Optional(_)), _) => {
                    // Losing optionality needs an explicit unwrap; in
                    // diagnostic mode record a fix and continue.
                    if self.allow_fixes {
                        let (_, payload) = self.types.optional_depth_of(left);
                        self.spawn_relation(kind, payload, right, locator);
                        self.fixes.push(Fix {
                            kind: FixKind::ForceOptional,
                            locator,
                        });
                        return SimplifyResult::Solved;
                    }
                    return SimplifyResult::Error;
                }
                _ => {}
            }
        }

        match (&left_key, &right_key) {
            // Never is the bottom type under subtyping.
            (Some(TypeKey::Intrinsic(IntrinsicKind::Never)), _) => SimplifyResult::Solved,

            (Some(TypeKey::Tuple(l)), Some(TypeKey::Tuple(r))) => {
                let from = self.types.tuple_list(*l);
                let to = self.types.tuple_list(*r);
                if kind == MatchKind::Subtype {
                    if from.len() != to.len() {
                        return SimplifyResult::Error;
                    }
                    for (index, (f, t)) in from.iter().zip(to.iter()).enumerate() {
                        if f.label != t.label {
                            return SimplifyResult::Error;
                        }
                        let element_locator = self
                            .locators
                            .extend(locator, PathElem::TupleElement(index as u32));
                        self.spawn_relation(kind, f.ty, t.ty, element_locator);
                    }
                    SimplifyResult::Solved
                } else {
                    self.decompose_tuple_conversion(&from, &to, locator, pending)
                }
            }

            (Some(TypeKey::Function(l)), Some(TypeKey::Function(r))) => {
                let from = self.types.function_shape(*l);
                let to = self.types.function_shape(*r);
                if from.params.len() != to.params.len() {
                    return SimplifyResult::Error;
                }
                for (index, (f, t)) in from.params.iter().zip(to.params.iter()).enumerate() {
                    if f.label != t.label || f.variadic != t.variadic {
                        return SimplifyResult::Error;
                    }
                    // Parameters are contravariant under subtyping.
                    let param_locator = self
                        .locators
                        .extend(locator, PathElem::ApplyArgument(index as u32));
                    self.spawn_relation(MatchKind::Subtype, t.ty, f.ty, param_locator);
                }
                let result_locator = self.locators.extend(locator, PathElem::FunctionResult);
                self.spawn_relation(MatchKind::Subtype, from.result, to.result, result_locator);
                SimplifyResult::Solved
            }

            (Some(TypeKey::Optional(l)), Some(TypeKey::Optional(r))) => {
                // Subtype between optionals matches payloads at depth.
                self.spawn_relation(kind, *l, *r, locator);
                SimplifyResult::Solved
            }

            (Some(TypeKey::Metatype(l)), Some(TypeKey::Metatype(r))) => {
                self.spawn_relation(kind, *l, *r, locator);
                SimplifyResult::Solved
            }

            (Some(TypeKey::BoundGeneric(ln, la)), Some(TypeKey::BoundGeneric(rn, ra)))
                if ln == rn =>
            {
                // Generic arguments are invariant.
                let largs = self.types.type_list(*la);
                let rargs = self.types.type_list(*ra);
                if largs.len() != rargs.len() {
                    return SimplifyResult::Error;
                }
                for (index, (&a, &b)) in largs.iter().zip(rargs.iter()).enumerate() {
                    let arg_locator = self
                        .locators
                        .extend(locator, PathElem::GenericParameter(index as u32));
                    self.spawn_relation(MatchKind::Equal, a, b, arg_locator);
                }
                SimplifyResult::Solved
            }

            // Class subtyping walks the superclass chain.
            (Some(TypeKey::Nominal(sub)), Some(TypeKey::Nominal(sup))) => {
                if self.decls.is_subclass(*sub, *sup) {
                    SimplifyResult::Solved
                } else {
                    SimplifyResult::Error
                }
            }

            // Existential erasure: the concrete type must conform to
            // every protocol in the destination.
            (_, Some(TypeKey::Protocol(_))) | (_, Some(TypeKey::Existential(_))) => {
                let protocols = self
                    .types
                    .existential_protocols(right)
                    .unwrap_or_default();
                for protocol in protocols {
                    if !self.lookup_conformance(left, protocol) {
                        return SimplifyResult::Error;
                    }
                }
                SimplifyResult::Solved
            }

            // Archetype against a class bound.
            (Some(TypeKey::Archetype(id)), Some(TypeKey::Nominal(_))) => {
                let data = self.types.archetype_data(*id);
                match data.superclass {
                    Some(bound) => {
                        self.spawn_relation(kind, bound, right, locator);
                        SimplifyResult::Solved
                    }
                    None => SimplifyResult::Error,
                }
            }

            // Scalar-to-tuple promotion: a single-element destination
            // tuple absorbs a scalar under conversion.
            (_, Some(TypeKey::Tuple(r))) if kind == MatchKind::Conversion => {
                let to = self.types.tuple_list(*r);
                if to.len() == 1 {
                    let element_locator =
                        self.locators.extend(locator, PathElem::TupleElement(0));
                    self.spawn_relation(kind, left, to[0].ty, element_locator);
                    pending.increase(ScoreKind::TupleConversion);
                    SimplifyResult::Solved
                } else {
                    SimplifyResult::Error
                }
            }

            (Some(TypeKey::DependentMember { .. }), _)
            | (_, Some(TypeKey::DependentMember { .. })) => SimplifyResult::Unsolved,

            _ => SimplifyResult::Error,
        }
    }

    fn decompose_tuple_conversion(
        &mut self,
        from: &[TupleElement],
        to: &[TupleElement],
        locator: LocatorId,
        pending: &mut Score,
    ) -> SimplifyResult {
        let mapping = match shuffle::match_tuple_elements(from, to) {
            Ok(mapping) => mapping,
            Err(_) => return SimplifyResult::Error,
        };
        for (dest, source) in mapping.iter().enumerate() {
            let ShuffleSource::Argument(i) = source else {
                // Plain tuple conversions have no defaults or variadics.
                return SimplifyResult::Error;
            };
            let element_locator = self
                .locators
                .extend(locator, PathElem::TupleElement(dest as u32));
            self.spawn_relation(
                MatchKind::Conversion,
                from[*i as usize].ty,
                to[dest].ty,
                element_locator,
            );
        }
        if !shuffle::is_identity_mapping(&mapping, from.len()) {
            pending.increase(ScoreKind::TupleConversion);
        }
        SimplifyResult::Solved
    }

    // =========================================================================
    // Protocol and literal conformance
    // =========================================================================

    fn simplify_conforms(
        &mut self,
        ty: TypeId,
        protocol: crate::decls::ProtocolId,
    ) -> SimplifyResult {
        let resolved = self.resolve_shallow(ty);
        if resolved.is_error() {
            return SimplifyResult::Solved;
        }
        match self.types.lookup(resolved) {
            Some(TypeKey::Variable(_)) => SimplifyResult::Unsolved,
            Some(TypeKey::DependentMember { .. }) => SimplifyResult::Unsolved,
            Some(_) => {
                if self.lookup_conformance(resolved, protocol) {
                    SimplifyResult::Solved
                } else {
                    SimplifyResult::Error
                }
            }
            None => SimplifyResult::Error,
        }
    }

    fn simplify_literal(&mut self, ty: TypeId, literal: LiteralKind) -> SimplifyResult {
        let resolved = self.resolve_shallow(ty);
        if resolved.is_error() {
            return SimplifyResult::Solved;
        }
        match self.types.lookup(resolved) {
            Some(TypeKey::Variable(_)) => SimplifyResult::Unsolved,
            Some(_) => {
                if self.decls.literal_conforms(self.types, resolved, literal) {
                    SimplifyResult::Solved
                } else {
                    SimplifyResult::Error
                }
            }
            None => SimplifyResult::Error,
        }
    }

    // =========================================================================
    // Function application
    // =========================================================================

    fn simplify_applicable(
        &mut self,
        arg: TypeId,
        callee: TypeId,
        result: TypeId,
        locator: LocatorId,
        pending: &mut Score,
    ) -> SimplifyResult {
        let callee = self.resolve_shallow(callee);
        let callee = self.types.rvalue(callee);
        let shape = match self.types.lookup(callee) {
            Some(TypeKey::Variable(_)) => return SimplifyResult::Unsolved,
            Some(TypeKey::Function(shape_id)) => self.types.function_shape(shape_id),
            Some(TypeKey::Error) => return SimplifyResult::Solved,
            _ => return SimplifyResult::Error,
        };

        let arg = self.resolve_shallow(arg);
        let elements = match self.types.lookup(arg) {
            Some(TypeKey::Tuple(list)) => self.types.tuple_list(list).to_vec(),
            Some(TypeKey::Variable(_)) => return SimplifyResult::Unsolved,
            // A non-tuple argument is a degenerate one-element tuple.
            _ => vec![TupleElement::unlabeled(arg)],
        };

        let mapping = match shuffle::match_call_arguments(&elements, &shape.params) {
            Ok(mapping) => mapping,
            Err(_) => return SimplifyResult::Error,
        };

        // Decompose into one conversion per matched argument; failures
        // and stalls ride on the spawned constraints.
        for (param_index, source) in mapping.iter().enumerate() {
            let param = &shape.params[param_index];
            let arg_locator = self
                .locators
                .extend(locator, PathElem::ApplyArgument(param_index as u32));
            let sources: &[u32] = match source {
                ShuffleSource::Argument(i) => std::slice::from_ref(i),
                ShuffleSource::Variadic(list) => list.as_slice(),
                ShuffleSource::DefaultArgument(_) => &[],
            };
            for &i in sources {
                self.spawn_relation(
                    MatchKind::Conversion,
                    elements[i as usize].ty,
                    param.ty,
                    arg_locator,
                );
            }
        }

        if !shuffle::is_identity_mapping(&mapping, elements.len()) {
            pending.increase(ScoreKind::TupleConversion);
        }

        // The result type follows from the callee's shape.
        let result_locator = self.locators.extend(locator, PathElem::FunctionResult);
        self.spawn_relation(MatchKind::Equal, result, shape.result, result_locator);
        SimplifyResult::Solved
    }

    // =========================================================================
    // Member resolution
    // =========================================================================

    fn simplify_member(
        &mut self,
        base: TypeId,
        name: crate::interner::Atom,
        member: TypeId,
        locator: LocatorId,
        pending: &mut Score,
    ) -> SimplifyResult {
        let resolved_base = self.resolve_shallow(base);
        let resolved_base = self.types.rvalue(resolved_base);
        if resolved_base.is_error() {
            return SimplifyResult::Solved;
        }

        match self.types.lookup(resolved_base) {
            Some(TypeKey::Variable(_)) => SimplifyResult::Unsolved,
            Some(TypeKey::Tuple(list)) => {
                let elements = self.types.tuple_list(list);
                let Some(index) = elements.iter().position(|e| e.label == name) else {
                    return SimplifyResult::Error;
                };
                self.record_overload(
                    locator,
                    OverloadChoice::TupleIndex(index as u32),
                    elements[index].ty,
                    Vec::new(),
                );
                self.match_types(
                    member,
                    elements[index].ty,
                    MatchKind::Equal,
                    locator,
                    pending,
                )
            }
            Some(TypeKey::Optional(payload)) => {
                // Member access through an optional base resolves against
                // the payload via an unwrapping choice, at a score cost.
                let payload = self.resolve_shallow(payload);
                let candidates = self.lookup_members(payload, name);
                match candidates.len() {
                    0 => SimplifyResult::Error,
                    1 => self.bind_member_choice(
                        member,
                        OverloadChoice::DeclViaUnwrappedOptional(candidates[0]),
                        payload,
                        locator,
                        pending,
                    ),
                    _ => {
                        let alternatives = candidates
                            .iter()
                            .map(|&decl| ConstraintKind::BindOverload {
                                overload_ty: member,
                                choice: OverloadChoice::DeclViaUnwrappedOptional(decl),
                                base: Some(payload),
                            })
                            .collect();
                        self.add_disjunction(alternatives, locator);
                        SimplifyResult::Solved
                    }
                }
            }
            Some(TypeKey::Nominal(_)) | Some(TypeKey::BoundGeneric(_, _)) => {
                let candidates = self.lookup_members(resolved_base, name);
                match candidates.len() {
                    0 => SimplifyResult::Error,
                    1 => {
                        let choice = self.member_choice(candidates[0]);
                        self.bind_member_choice(member, choice, resolved_base, locator, pending)
                    }
                    _ => {
                        let alternatives = candidates
                            .iter()
                            .map(|&decl| ConstraintKind::BindOverload {
                                overload_ty: member,
                                choice: self.member_choice(decl),
                                base: Some(resolved_base),
                            })
                            .collect();
                        self.add_disjunction(alternatives, locator);
                        SimplifyResult::Solved
                    }
                }
            }
            _ => SimplifyResult::Error,
        }
    }

    /// Nested type declarations resolve as type references; everything
    /// else is a plain value member.
    fn member_choice(&self, decl: crate::decls::DeclId) -> OverloadChoice {
        match self.decls.decl(decl).kind {
            crate::decls::DeclKind::Nominal(_) => OverloadChoice::TypeDecl(decl),
            _ => OverloadChoice::Decl(decl),
        }
    }

    fn bind_member_choice(
        &mut self,
        member: TypeId,
        choice: OverloadChoice,
        base: TypeId,
        locator: LocatorId,
        pending: &mut Score,
    ) -> SimplifyResult {
        let Some(decl) = choice.decl() else {
            return SimplifyResult::Error;
        };
        let opened = self.open_member_type(decl, base, locator);
        self.record_overload(locator, choice, opened.ty, opened.substitutions);
        if matches!(choice, OverloadChoice::DeclViaUnwrappedOptional(_)) {
            pending.increase(ScoreKind::UnwrappedOptionalMember);
        }
        self.match_types(member, opened.ty, MatchKind::Bind, locator, pending)
    }

    /// Open a member's declared type against a concrete base: the
    /// enclosing nominal's generic parameters are replaced by the base's
    /// arguments before the member's own signature is opened.
    fn open_member_type(
        &mut self,
        decl: crate::decls::DeclId,
        base: TypeId,
        locator: LocatorId,
    ) -> crate::solver::system::OpenedType {
        let declared = self.decls.decl_type(self.types, decl);
        let generics = self.decls.decl_generics(decl).cloned();

        let substituted = match self.types.lookup(base) {
            Some(TypeKey::BoundGeneric(nominal, args)) => {
                let nominal_decl = self.decls.nominal(nominal);
                let args = self.types.type_list(args);
                let mut map: FxHashMap<TypeId, TypeId> = FxHashMap::default();
                if let Some(sig) = &nominal_decl.generics {
                    for (param, &arg) in sig.params.iter().zip(args.iter()) {
                        let param_ty =
                            self.types.generic_param(param.depth, param.index, param.name);
                        map.insert(param_ty, arg);
                    }
                }
                let types = self.types;
                let mut memo = FoldMemo::default();
                crate::solver::fold::transform_type(types, declared, &mut memo, &mut |id, key| {
                    match key {
                        TypeKey::GenericParam(_) => map.get(&id).copied(),
                        _ => None,
                    }
                })
            }
            _ => declared,
        };

        self.open_type(substituted, generics.as_ref(), locator)
    }

    pub(crate) fn record_overload(
        &mut self,
        locator: LocatorId,
        choice: OverloadChoice,
        opened_ty: TypeId,
        substitutions: Vec<(TypeId, TypeId)>,
    ) {
        self.overload_choices.insert(
            locator,
            SelectedOverload {
                choice,
                opened_ty,
                substitutions,
            },
        );
    }

    // =========================================================================
    // Overload binding
    // =========================================================================

    fn simplify_bind_overload(
        &mut self,
        overload_ty: TypeId,
        choice: OverloadChoice,
        base: Option<TypeId>,
        locator: LocatorId,
        pending: &mut Score,
    ) -> SimplifyResult {
        let Some(decl) = choice.decl() else {
            return SimplifyResult::Error;
        };
        let opened = match base {
            Some(base) => self.open_member_type(decl, base, locator),
            None => self.open_decl_type(decl, locator),
        };
        self.record_overload(locator, choice, opened.ty, opened.substitutions);
        if matches!(choice, OverloadChoice::DeclViaUnwrappedOptional(_)) {
            pending.increase(ScoreKind::UnwrappedOptionalMember);
        }
        self.match_types(overload_ty, opened.ty, MatchKind::Bind, locator, pending)
    }
}
