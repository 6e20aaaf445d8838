//! The constraint system.
//!
//! Owns the type-variable store (an `ena` unification table plus
//! per-variable side data), the constraint arena and worklists, the
//! constraint graph, the locator table, and the lookup memo tables. The
//! constraint-generation walk over an expression tree lives here too: it
//! assigns open types to every node bottom-up and files the constraints
//! the solver will work on.
//!
//! Backtracking is explicit: `checkpoint` captures the unification
//! snapshot and clones the worklist/graph/score state; `restore` rewinds
//! all of it. Nothing else in the system is mutated during a solve.

use crate::ast::{ExprArena, ExprId, ExprKind};
use crate::decls::{DeclTable, GenericSignature, LiteralKind, Requirement};
use crate::interner::Atom;
use crate::solver::constraint::{
    Constraint, ConstraintId, ConstraintKind, ConstraintStatus, MatchKind, SimplifyResult,
};
use crate::solver::fold::{self, FoldMemo};
use crate::solver::graph::ConstraintGraph;
use crate::solver::intern::TypeInterner;
use crate::solver::locator::{LocatorId, LocatorTable, PathElem};
use crate::solver::solution::{Fix, Score, ScoreKind, SelectedOverload};
use crate::solver::types::{TupleElement, TypeId, TypeKey, TypeVar};
use bitflags::bitflags;
use ena::unify::{InPlace, InPlaceUnificationTable, NoError, Snapshot, UnifyKey, UnifyValue};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// The fixed binding of a type variable, if solved.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TypeVarValue(pub Option<TypeId>);

impl UnifyKey for TypeVar {
    type Value = TypeVarValue;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TypeVar(u)
    }

    fn tag() -> &'static str {
        "TypeVar"
    }
}

impl UnifyValue for TypeVarValue {
    type Error = NoError;

    fn unify_values(a: &Self, b: &Self) -> Result<Self, Self::Error> {
        match (a.0, b.0) {
            (None, None) => Ok(TypeVarValue(None)),
            (Some(t), None) | (None, Some(t)) => Ok(TypeVarValue(Some(t))),
            (Some(a), Some(b)) if a == b => Ok(TypeVarValue(Some(a))),
            // Incompatible bindings are rejected before unification; keep
            // the first so rollback state stays well-formed.
            (Some(a), Some(_)) => Ok(TypeVarValue(Some(a))),
        }
    }
}

bitflags! {
    /// Behavior flags for a type variable.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TypeVarOptions: u8 {
        /// The variable may bind to an lvalue type (member bases).
        const CAN_BIND_TO_LVALUE = 1 << 0;
    }
}

/// Per-variable side data, indexed by the variable's raw index.
#[derive(Clone, Debug)]
pub(crate) struct TypeVarData {
    pub locator: LocatorId,
    pub options: TypeVarOptions,
    /// The literal kind this variable was created for, if any; drives
    /// defaulting and scoring.
    pub literal: Option<LiteralKind>,
}

/// A fresh opening of a (possibly generic) declared type.
#[derive(Clone, Debug)]
pub struct OpenedType {
    pub ty: TypeId,
    /// (generic parameter type, fresh variable type) pairs.
    pub substitutions: Vec<(TypeId, TypeId)>,
}

/// The durable record of a failed constraint, kept across rollbacks so
/// the first failure anchors the primary diagnostic.
#[derive(Clone, Debug)]
pub struct FailureRecord {
    pub constraint: Constraint,
    /// The operand types as resolved at the moment of failure.
    pub resolved: (TypeId, TypeId),
}

/// An explicit solver-state checkpoint; see module docs.
pub(crate) struct Checkpoint {
    snapshot: Snapshot<InPlace<TypeVar>>,
    var_data_len: usize,
    constraints_len: usize,
    statuses: Vec<ConstraintStatus>,
    active: Vec<ConstraintId>,
    graph: ConstraintGraph,
    score: Score,
    failed: Option<ConstraintId>,
    overload_choices: FxHashMap<LocatorId, SelectedOverload>,
    disjunction_choices: FxHashMap<LocatorId, usize>,
    opened_dependent: FxHashMap<(TypeVar, Atom), TypeVar>,
    fixes: Vec<Fix>,
}

/// The constraint system for one expression check. Single-threaded and
/// non-reentrant; see the crate-level concurrency notes.
pub struct ConstraintSystem<'a> {
    pub(crate) types: &'a TypeInterner,
    pub(crate) decls: &'a DeclTable,
    pub(crate) table: InPlaceUnificationTable<TypeVar>,
    pub(crate) var_data: Vec<TypeVarData>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) statuses: Vec<ConstraintStatus>,
    /// Constraints awaiting (re-)simplification, processed LIFO.
    pub(crate) active: Vec<ConstraintId>,
    pub(crate) graph: ConstraintGraph,
    pub(crate) locators: LocatorTable,
    /// Memo for repeated openings of `Base.Assoc` dependent members.
    pub(crate) opened_dependent: FxHashMap<(TypeVar, Atom), TypeVar>,
    /// Member lookup memo, keyed by (resolved base type, name).
    member_lookup_cache: FxHashMap<(TypeId, Atom), Arc<Vec<crate::decls::DeclId>>>,
    /// Conformance memo, keyed by (resolved type, protocol).
    conformance_cache: FxHashMap<(TypeId, crate::decls::ProtocolId), bool>,
    /// Running penalty score for the current branch.
    pub(crate) score: Score,
    /// The failing constraint of the current branch, if any.
    pub(crate) failed: Option<ConstraintId>,
    /// The first failure seen across the whole solve; survives rollback.
    pub(crate) first_failure: Option<FailureRecord>,
    /// The first variable that dead-ended with no candidate bindings;
    /// survives rollback, anchors the "cannot infer" diagnostic.
    pub(crate) unresolved_failure: Option<LocatorId>,
    /// Overload choices recorded along the current branch.
    pub(crate) overload_choices: FxHashMap<LocatorId, SelectedOverload>,
    /// Disjunction branch indices recorded along the current branch.
    pub(crate) disjunction_choices: FxHashMap<LocatorId, usize>,
    /// Fixes applied along the current branch.
    pub(crate) fixes: Vec<Fix>,
    /// Whether recovery fixes may be applied at all.
    pub(crate) allow_fixes: bool,
    /// Search budget accounting; never rolled back.
    pub(crate) explored_states: usize,
}

impl<'a> ConstraintSystem<'a> {
    pub fn new(types: &'a TypeInterner, decls: &'a DeclTable) -> ConstraintSystem<'a> {
        ConstraintSystem {
            types,
            decls,
            table: InPlaceUnificationTable::new(),
            var_data: Vec::new(),
            constraints: Vec::new(),
            statuses: Vec::new(),
            active: Vec::new(),
            graph: ConstraintGraph::new(),
            locators: LocatorTable::new(),
            opened_dependent: FxHashMap::default(),
            member_lookup_cache: FxHashMap::default(),
            conformance_cache: FxHashMap::default(),
            score: Score::zero(),
            failed: None,
            first_failure: None,
            unresolved_failure: None,
            overload_choices: FxHashMap::default(),
            disjunction_choices: FxHashMap::default(),
            fixes: Vec::new(),
            allow_fixes: false,
            explored_states: 0,
        }
    }

    /// Permit recovery fixes (diagnostic mode).
    pub fn set_allow_fixes(&mut self, allow: bool) {
        self.allow_fixes = allow;
    }

    pub fn interner(&self) -> &'a TypeInterner {
        self.types
    }

    pub fn decl_table(&self) -> &'a DeclTable {
        self.decls
    }

    /// The locator table, for post-solve lookup by the rewriter and
    /// diagnostics.
    pub fn locator_table(&self) -> &LocatorTable {
        &self.locators
    }

    /// The anchor expression of a locator.
    pub fn locator_anchor(&self, locator: LocatorId) -> crate::ast::ExprId {
        self.locators.anchor(locator)
    }

    // =========================================================================
    // Type variables
    // =========================================================================

    /// Allocate a fresh type variable; the graph node is created lazily
    /// on first constraint reference. Returns the variable's type.
    pub fn create_type_var(&mut self, locator: LocatorId, options: TypeVarOptions) -> TypeId {
        let var = self.table.new_key(TypeVarValue(None));
        debug_assert_eq!(var.index() as usize, self.var_data.len());
        self.var_data.push(TypeVarData {
            locator,
            options,
            literal: None,
        });
        self.types.variable(var)
    }

    /// Allocate a fresh type variable standing for a literal of `kind`.
    pub fn create_literal_var(&mut self, locator: LocatorId, kind: LiteralKind) -> TypeId {
        let ty = self.create_type_var(locator, TypeVarOptions::empty());
        if let Some(TypeKey::Variable(var)) = self.types.lookup(ty) {
            self.var_data[var.index() as usize].literal = Some(kind);
        }
        ty
    }

    pub(crate) fn var_count(&self) -> usize {
        self.var_data.len()
    }

    /// The representative of a variable's equivalence class.
    pub fn representative(&mut self, var: TypeVar) -> TypeVar {
        self.table.find(var)
    }

    /// The fixed binding of a variable's class, if solved.
    pub fn fixed_binding(&mut self, var: TypeVar) -> Option<TypeId> {
        self.table.probe_value(var).0
    }

    /// The literal kind of a variable's class, if any.
    pub(crate) fn literal_kind_of(&mut self, var: TypeVar) -> Option<LiteralKind> {
        let root = self.table.find(var);
        self.var_data[root.index() as usize].literal
    }

    pub(crate) fn var_locator(&mut self, var: TypeVar) -> LocatorId {
        let root = self.table.find(var);
        self.var_data[root.index() as usize].locator
    }

    pub(crate) fn var_options(&mut self, var: TypeVar) -> TypeVarOptions {
        let root = self.table.find(var);
        self.var_data[root.index() as usize].options
    }

    /// Merge two equivalence classes and re-activate every constraint
    /// attached to either, so previously stuck simplifications retry.
    ///
    /// The caller guarantees at most one side carries a fixed binding;
    /// merging two differently-bound classes is a constraint failure
    /// decided before this point.
    pub fn merge_equivalence_classes(&mut self, a: TypeVar, b: TypeVar) {
        let root_a = self.table.find(a);
        let root_b = self.table.find(b);
        if root_a == root_b {
            return;
        }
        debug_assert!(
            self.table.probe_value(root_a).0.is_none()
                || self.table.probe_value(root_b).0.is_none()
                || self.table.probe_value(root_a).0 == self.table.probe_value(root_b).0
        );

        let literal_a = self.var_data[root_a.index() as usize].literal;
        let literal_b = self.var_data[root_b.index() as usize].literal;
        let options_a = self.var_data[root_a.index() as usize].options;
        let options_b = self.var_data[root_b.index() as usize].options;

        // Cannot fail: TypeVarValue's unify is total.
        self.table.unify_var_var(root_a, root_b).ok();
        let new_root = self.table.find(root_a);

        let data = &mut self.var_data[new_root.index() as usize];
        data.literal = literal_a.or(literal_b);
        data.options = options_a | options_b;

        self.graph.merge_nodes(new_root, &[root_a, root_b]);
        self.reactivate_mentioning(new_root);
    }

    /// Record a fixed binding for a variable's class and re-activate
    /// affected constraints. Also applies the literal-defaulting score
    /// signal: binding a literal variable away from its protocol's
    /// default type makes the branch strictly less "natural".
    pub fn assign_fixed_type(&mut self, var: TypeVar, ty: TypeId) {
        let root = self.table.find(var);
        debug_assert!(self.table.probe_value(root).0.is_none());
        trace!(var = root.index(), ty = ty.index(), "bind type variable");

        if let Some(kind) = self.var_data[root.index() as usize].literal
            && let Some(default) = self.decls.literal_default(kind)
            && ty != default
        {
            self.score.increase(ScoreKind::NonDefaultLiteral);
        }

        self.table.union_value(root, TypeVarValue(Some(ty)));
        self.reactivate_mentioning(root);
    }

    fn reactivate_mentioning(&mut self, var: TypeVar) {
        let mentioning: Vec<ConstraintId> =
            self.graph.constraints_mentioning(var).to_vec();
        for id in mentioning {
            if self.statuses[id.0 as usize] == ConstraintStatus::Inactive {
                self.statuses[id.0 as usize] = ConstraintStatus::Active;
                self.active.push(id);
            }
        }
    }

    // =========================================================================
    // Type resolution
    // =========================================================================

    /// Resolve the top level of `ty`: follow variable bindings to a fixed
    /// point and canonicalize unbound variables to their representative.
    pub fn resolve_shallow(&mut self, ty: TypeId) -> TypeId {
        let mut current = ty;
        loop {
            match self.types.lookup(current) {
                Some(TypeKey::Variable(var)) => {
                    let root = self.table.find(var);
                    match self.table.probe_value(root).0 {
                        Some(bound) => current = bound,
                        None => return self.types.variable(root),
                    }
                }
                _ => return current,
            }
        }
    }

    /// Substitute every bound variable in `ty`, recursively, leaving
    /// unbound variables canonicalized. Terminates because the occurs
    /// check forbids cyclic bindings.
    pub fn resolve_type_fully(&mut self, ty: TypeId) -> TypeId {
        let mut current = ty;
        loop {
            let mut vars = Vec::new();
            fold::collect_type_variables(self.types, current, &mut vars);
            if vars.is_empty() {
                return current;
            }
            let mut map: FxHashMap<TypeVar, TypeId> = FxHashMap::default();
            let mut any_bound = false;
            for var in vars {
                let root = self.table.find(var);
                if let Some(bound) = self.table.probe_value(root).0 {
                    map.insert(var, bound);
                    any_bound = true;
                } else if root != var {
                    map.insert(var, self.types.variable(root));
                }
            }
            if map.is_empty() {
                return current;
            }
            let types = self.types;
            let mut memo = FoldMemo::default();
            current = fold::transform_type(types, current, &mut memo, &mut |_, key| match key {
                TypeKey::Variable(var) => map.get(var).copied(),
                _ => None,
            });
            if !any_bound {
                return current;
            }
        }
    }

    /// Occurs check: does `var`'s class appear inside `ty`?
    pub fn occurs_in(&mut self, var: TypeVar, ty: TypeId) -> bool {
        let root = self.table.find(var);
        let resolved = self.resolve_type_fully(ty);
        let mut vars = Vec::new();
        fold::collect_type_variables(self.types, resolved, &mut vars);
        vars.iter().any(|&v| self.table.find(v) == root)
    }

    // =========================================================================
    // Constraint filing
    // =========================================================================

    /// Add a constraint, attempting immediate local simplification.
    ///
    /// Trivially satisfiable constraints retire on the spot; a structural
    /// contradiction records the failing constraint (check
    /// [`ConstraintSystem::has_failure`] after a batch of adds); anything
    /// blocked on a variable is filed into the graph and the inactive
    /// set for later re-activation.
    pub fn add_constraint(&mut self, kind: ConstraintKind, locator: LocatorId) -> ConstraintId {
        let id = ConstraintId(self.constraints.len() as u32);
        self.constraints.push(Constraint { kind, locator });
        self.statuses.push(ConstraintStatus::Active);
        let result = self.simplify_constraint(id);
        self.settle(id, result);
        id
    }

    /// Create a disjunction over the given alternative constraint kinds.
    /// Nested constraints are parked until the solver picks a branch.
    pub fn add_disjunction(
        &mut self,
        alternatives: Vec<ConstraintKind>,
        locator: LocatorId,
    ) -> ConstraintId {
        debug_assert!(!alternatives.is_empty());
        let mut nested = Vec::with_capacity(alternatives.len());
        for kind in alternatives {
            let id = ConstraintId(self.constraints.len() as u32);
            self.constraints.push(Constraint { kind, locator });
            self.statuses.push(ConstraintStatus::InDisjunction);
            nested.push(id);
        }
        let id = ConstraintId(self.constraints.len() as u32);
        self.constraints.push(Constraint {
            kind: ConstraintKind::Disjunction { nested },
            locator,
        });
        self.statuses.push(ConstraintStatus::Inactive);
        self.file_in_graph(id);
        id
    }

    /// Register `id` in the graph under every variable it mentions (by
    /// representative), so binding any of them re-activates it.
    pub(crate) fn file_in_graph(&mut self, id: ConstraintId) {
        let mut vars = Vec::new();
        for ty in self.constraint_types(id) {
            fold::collect_type_variables(self.types, ty, &mut vars);
        }
        let canonical: Vec<TypeVar> = vars.iter().map(|&v| self.table.find(v)).collect();
        self.graph.add_constraint(id, &canonical);
    }

    /// The operand types a constraint mentions.
    pub(crate) fn constraint_types(&self, id: ConstraintId) -> Vec<TypeId> {
        match &self.constraints[id.0 as usize].kind {
            ConstraintKind::Relation { left, right, .. } => vec![*left, *right],
            ConstraintKind::ConformsTo { ty, .. } => vec![*ty],
            ConstraintKind::LiteralConformsTo { ty, .. } => vec![*ty],
            ConstraintKind::ApplicableFunction {
                arg,
                callee,
                result,
            } => {
                vec![*arg, *callee, *result]
            }
            ConstraintKind::ValueMember { base, member, .. } => vec![*base, *member],
            ConstraintKind::BindOverload {
                overload_ty, base, ..
            } => {
                let mut tys = vec![*overload_ty];
                tys.extend(*base);
                tys
            }
            ConstraintKind::Disjunction { nested } => {
                let mut tys = Vec::new();
                for &n in nested {
                    tys.extend(self.constraint_types(n));
                }
                tys
            }
        }
    }

    /// Move a constraint to its post-simplification home.
    pub(crate) fn settle(&mut self, id: ConstraintId, result: SimplifyResult) {
        match result {
            SimplifyResult::Solved => {
                self.statuses[id.0 as usize] = ConstraintStatus::Retired;
            }
            SimplifyResult::Unsolved => {
                self.statuses[id.0 as usize] = ConstraintStatus::Inactive;
                self.file_in_graph(id);
            }
            SimplifyResult::Error => {
                self.statuses[id.0 as usize] = ConstraintStatus::Failed;
                self.record_failure(id);
            }
        }
    }

    pub(crate) fn record_failure(&mut self, id: ConstraintId) {
        debug!(constraint = id.0, "constraint failed");
        if self.failed.is_none() {
            self.failed = Some(id);
        }
        if self.first_failure.is_none() {
            let constraint = self.constraints[id.0 as usize].clone();
            let resolved = match &constraint.kind {
                ConstraintKind::Relation { left, right, .. } => {
                    (self.resolve_type_fully(*left), self.resolve_type_fully(*right))
                }
                ConstraintKind::ConformsTo { ty, .. }
                | ConstraintKind::LiteralConformsTo { ty, .. } => {
                    let r = self.resolve_type_fully(*ty);
                    (r, r)
                }
                ConstraintKind::ApplicableFunction { arg, callee, .. } => {
                    (self.resolve_type_fully(*arg), self.resolve_type_fully(*callee))
                }
                ConstraintKind::ValueMember { base, member, .. } => {
                    (self.resolve_type_fully(*base), self.resolve_type_fully(*member))
                }
                ConstraintKind::BindOverload { overload_ty, .. } => {
                    let r = self.resolve_type_fully(*overload_ty);
                    (r, r)
                }
                ConstraintKind::Disjunction { .. } => (TypeId::ERROR, TypeId::ERROR),
            };
            self.first_failure = Some(FailureRecord {
                constraint,
                resolved,
            });
        }
    }

    /// True once any constraint in the current branch has failed.
    pub fn has_failure(&self) -> bool {
        self.failed.is_some()
    }

    // =========================================================================
    // Lookup memo tables
    // =========================================================================

    /// Member lookup, cached per (base type, name).
    pub(crate) fn lookup_members(
        &mut self,
        base: TypeId,
        name: Atom,
    ) -> Arc<Vec<crate::decls::DeclId>> {
        if let Some(cached) = self.member_lookup_cache.get(&(base, name)) {
            return cached.clone();
        }
        let results = match self.types.lookup(base) {
            Some(TypeKey::Nominal(id)) | Some(TypeKey::BoundGeneric(id, _)) => {
                self.decls.lookup_member(id, name)
            }
            _ => Vec::new(),
        };
        let arc = Arc::new(results);
        self.member_lookup_cache.insert((base, name), arc.clone());
        arc
    }

    /// Conformance lookup, cached per (type, protocol).
    pub(crate) fn lookup_conformance(
        &mut self,
        ty: TypeId,
        protocol: crate::decls::ProtocolId,
    ) -> bool {
        if let Some(&cached) = self.conformance_cache.get(&(ty, protocol)) {
            return cached;
        }
        let result = self.decls.conforms_to(self.types, ty, protocol);
        self.conformance_cache.insert((ty, protocol), result);
        result
    }

    // =========================================================================
    // Opening generic types
    // =========================================================================

    /// Open a declared type into the variable space: every generic
    /// parameter becomes a fresh type variable, dependent members are
    /// opened memoized per (base variable, member name), and the
    /// signature's requirements are filed against the fresh variables.
    pub fn open_type(
        &mut self,
        ty: TypeId,
        signature: Option<&GenericSignature>,
        locator: LocatorId,
    ) -> OpenedType {
        let Some(sig) = signature else {
            return OpenedType {
                ty,
                substitutions: Vec::new(),
            };
        };

        let mut substitutions = Vec::new();
        let mut map: FxHashMap<TypeId, TypeId> = FxHashMap::default();
        for (index, param) in sig.params.iter().enumerate() {
            let param_ty = self
                .types
                .generic_param(param.depth, param.index, param.name);
            let var_locator = self
                .locators
                .extend(locator, PathElem::GenericParameter(index as u32));
            let var_ty = self.create_type_var(var_locator, TypeVarOptions::empty());
            map.insert(param_ty, var_ty);
            substitutions.push((param_ty, var_ty));
        }

        let opened = self.substitute_opened(ty, &map);

        for (index, requirement) in sig.requirements.iter().enumerate() {
            let req_locator = self
                .locators
                .extend(locator, PathElem::Requirement(index as u32));
            match *requirement {
                Requirement::Conformance { subject, protocol } => {
                    let subject = self.substitute_opened(subject, &map);
                    self.add_constraint(
                        ConstraintKind::ConformsTo {
                            ty: subject,
                            protocol,
                        },
                        req_locator,
                    );
                }
                Requirement::Superclass { subject, bound } => {
                    let subject = self.substitute_opened(subject, &map);
                    let bound = self.substitute_opened(bound, &map);
                    self.add_constraint(
                        ConstraintKind::Relation {
                            kind: MatchKind::Subtype,
                            left: subject,
                            right: bound,
                        },
                        req_locator,
                    );
                }
                Requirement::SameType { first, second } => {
                    let first = self.substitute_opened(first, &map);
                    let second = self.substitute_opened(second, &map);
                    self.add_constraint(
                        ConstraintKind::Relation {
                            kind: MatchKind::Equal,
                            left: first,
                            right: second,
                        },
                        req_locator,
                    );
                }
            }
        }

        OpenedType {
            ty: opened,
            substitutions,
        }
    }

    /// Open the declared type of `decl` at `locator`.
    pub fn open_decl_type(
        &mut self,
        decl: crate::decls::DeclId,
        locator: LocatorId,
    ) -> OpenedType {
        let declared = self.decls.decl_type(self.types, decl);
        let generics = self.decls.decl_generics(decl).cloned();
        self.open_type(declared, generics.as_ref(), locator)
    }

    /// Replace generic parameters per `map` and open dependent members
    /// against the fresh variables, memoized so `T.Element` is the same
    /// variable wherever it appears.
    fn substitute_opened(&mut self, ty: TypeId, map: &FxHashMap<TypeId, TypeId>) -> TypeId {
        let types = self.types;
        // Two passes: parameters first, then dependent members over the
        // rewritten bases, so the memo key is always a variable.
        let mut memo = FoldMemo::default();
        let with_params = fold::transform_type(types, ty, &mut memo, &mut |id, key| match key {
            TypeKey::GenericParam(_) => map.get(&id).copied(),
            _ => None,
        });
        self.open_dependent_members(with_params)
    }

    fn open_dependent_members(&mut self, ty: TypeId) -> TypeId {
        let types = self.types;
        match types.lookup(ty) {
            Some(TypeKey::DependentMember { base, assoc }) => {
                let opened_base = self.open_dependent_members(base);
                match types.lookup(opened_base) {
                    Some(TypeKey::Variable(base_var)) => {
                        let root = self.table.find(base_var);
                        if let Some(&existing) = self.opened_dependent.get(&(root, assoc)) {
                            return types.variable(existing);
                        }
                        let locator = self.var_locator(root);
                        let member_locator = self.locators.extend(locator, PathElem::Member(assoc));
                        let var_ty =
                            self.create_type_var(member_locator, TypeVarOptions::empty());
                        if let Some(TypeKey::Variable(new_var)) = types.lookup(var_ty) {
                            self.opened_dependent.insert((root, assoc), new_var);
                        }
                        var_ty
                    }
                    _ => types.dependent_member(opened_base, assoc),
                }
            }
            Some(TypeKey::Tuple(list)) => {
                let elements = types.tuple_list(list);
                let mut changed = false;
                let mut rebuilt = Vec::with_capacity(elements.len());
                for element in elements.iter() {
                    let new_ty = self.open_dependent_members(element.ty);
                    changed |= new_ty != element.ty;
                    rebuilt.push(TupleElement::new(element.label, new_ty));
                }
                if changed { types.tuple(rebuilt) } else { ty }
            }
            Some(TypeKey::Function(shape_id)) => {
                let shape = types.function_shape(shape_id);
                let mut changed = false;
                let mut params = Vec::with_capacity(shape.params.len());
                for param in &shape.params {
                    let new_ty = self.open_dependent_members(param.ty);
                    changed |= new_ty != param.ty;
                    params.push(crate::solver::types::ParamInfo {
                        ty: new_ty,
                        ..*param
                    });
                }
                let result = self.open_dependent_members(shape.result);
                changed |= result != shape.result;
                if changed {
                    types.function(params, result)
                } else {
                    ty
                }
            }
            Some(TypeKey::Optional(payload)) => {
                let new_payload = self.open_dependent_members(payload);
                if new_payload != payload {
                    types.optional(new_payload)
                } else {
                    ty
                }
            }
            Some(TypeKey::BoundGeneric(nominal, args)) => {
                let arg_list = types.type_list(args);
                let mut changed = false;
                let mut rebuilt = Vec::with_capacity(arg_list.len());
                for &arg in arg_list.iter() {
                    let new_arg = self.open_dependent_members(arg);
                    changed |= new_arg != arg;
                    rebuilt.push(new_arg);
                }
                if changed {
                    types.bound_generic(nominal, rebuilt)
                } else {
                    ty
                }
            }
            Some(TypeKey::Metatype(instance)) => {
                let new_instance = self.open_dependent_members(instance);
                if new_instance != instance {
                    types.metatype(new_instance)
                } else {
                    ty
                }
            }
            Some(TypeKey::LValue(object)) => {
                let new_object = self.open_dependent_members(object);
                if new_object != object {
                    types.lvalue(new_object)
                } else {
                    ty
                }
            }
            _ => ty,
        }
    }

    // =========================================================================
    // Constraint generation
    // =========================================================================

    /// Walk an untyped expression tree bottom-up, assigning an open type
    /// to every node and filing the constraints that relate them. Returns
    /// the root's open type.
    pub fn generate_constraints(&mut self, arena: &mut ExprArena, expr: ExprId) -> TypeId {
        let kind = arena.get(expr).kind.clone();
        let ty = match kind {
            ExprKind::IntegerLiteral(_) => self.literal_constraints(expr, LiteralKind::Integer),
            ExprKind::FloatLiteral(_) => self.literal_constraints(expr, LiteralKind::Float),
            ExprKind::StringLiteral(_) => self.literal_constraints(expr, LiteralKind::String),
            ExprKind::BooleanLiteral(_) => self.literal_constraints(expr, LiteralKind::Boolean),
            ExprKind::NilLiteral => self.literal_constraints(expr, LiteralKind::Nil),
            ExprKind::DeclRef(decl) => {
                let locator = self.locators.for_expr(expr);
                let opened = self.open_decl_type(decl, locator);
                // Direct references to generic declarations still need a
                // substitution record for the rewriter.
                if !opened.substitutions.is_empty() {
                    self.record_overload(
                        locator,
                        crate::solver::constraint::OverloadChoice::Decl(decl),
                        opened.ty,
                        opened.substitutions.clone(),
                    );
                }
                opened.ty
            }
            ExprKind::OverloadedRef(candidates) => {
                let locator = self.locators.for_expr(expr);
                let overload_ty =
                    self.create_type_var(locator, TypeVarOptions::CAN_BIND_TO_LVALUE);
                let alternatives = candidates
                    .iter()
                    .map(|&decl| ConstraintKind::BindOverload {
                        overload_ty,
                        choice: crate::solver::constraint::OverloadChoice::Decl(decl),
                        base: None,
                    })
                    .collect();
                self.add_disjunction(alternatives, locator);
                overload_ty
            }
            ExprKind::Member { base, name } => {
                let base_ty = self.generate_constraints(arena, base);
                let locator = self.locators.intern(expr, vec![PathElem::Member(name)]);
                let member_ty =
                    self.create_type_var(locator, TypeVarOptions::CAN_BIND_TO_LVALUE);
                self.add_constraint(
                    ConstraintKind::ValueMember {
                        base: base_ty,
                        name,
                        member: member_ty,
                    },
                    locator,
                );
                member_ty
            }
            ExprKind::Call { callee, arg } => {
                let callee_ty = self.generate_constraints(arena, callee);
                let arg_ty = self.generate_constraints(arena, arg);
                let locator = self.locators.intern(expr, vec![PathElem::ApplyFunction]);
                let result_locator = self.locators.intern(expr, vec![PathElem::FunctionResult]);
                let result_ty = self.create_type_var(result_locator, TypeVarOptions::empty());
                self.add_constraint(
                    ConstraintKind::ApplicableFunction {
                        arg: arg_ty,
                        callee: callee_ty,
                        result: result_ty,
                    },
                    locator,
                );
                result_ty
            }
            ExprKind::Tuple { elements, labels } => {
                let mut tuple_elements = Vec::with_capacity(elements.len());
                for (index, &element) in elements.iter().enumerate() {
                    let element_ty = self.generate_constraints(arena, element);
                    // Tuples are rvalues; element references load first.
                    let element_ty = self.types.rvalue(element_ty);
                    tuple_elements.push(TupleElement::new(labels[index], element_ty));
                }
                self.types.tuple(tuple_elements)
            }
            ExprKind::Paren(inner) => self.generate_constraints(arena, inner),
            ExprKind::ForceUnwrap(sub) => {
                let sub_ty = self.generate_constraints(arena, sub);
                let locator = self.locators.intern(expr, vec![PathElem::OptionalPayload]);
                let payload = self.create_type_var(locator, TypeVarOptions::empty());
                let optional = self.types.optional(payload);
                self.add_constraint(
                    ConstraintKind::Relation {
                        kind: MatchKind::Equal,
                        left: sub_ty,
                        right: optional,
                    },
                    locator,
                );
                payload
            }
            _ => {
                debug_assert!(false, "rewriter-only node reached constraint generation");
                TypeId::ERROR
            }
        };
        arena.set_ty(expr, ty);
        ty
    }

    fn literal_constraints(&mut self, expr: ExprId, kind: LiteralKind) -> TypeId {
        let locator = self
            .locators
            .intern(expr, vec![PathElem::LiteralConformance]);
        let ty = self.create_literal_var(locator, kind);
        self.add_constraint(
            ConstraintKind::LiteralConformsTo { ty, literal: kind },
            locator,
        );
        ty
    }

    /// File a conversion from the root expression's type to a contextual
    /// destination type (e.g. an annotated binding).
    pub fn add_contextual_type(&mut self, expr: ExprId, expr_ty: TypeId, target: TypeId) {
        let locator = self.locators.for_expr(expr);
        self.add_constraint(
            ConstraintKind::Relation {
                kind: MatchKind::Conversion,
                left: expr_ty,
                right: target,
            },
            locator,
        );
    }

    // =========================================================================
    // Checkpoint / restore
    // =========================================================================

    pub(crate) fn checkpoint(&mut self) -> Checkpoint {
        Checkpoint {
            snapshot: self.table.snapshot(),
            var_data_len: self.var_data.len(),
            constraints_len: self.constraints.len(),
            statuses: self.statuses.clone(),
            active: self.active.clone(),
            graph: self.graph.clone(),
            score: self.score,
            failed: self.failed,
            overload_choices: self.overload_choices.clone(),
            disjunction_choices: self.disjunction_choices.clone(),
            opened_dependent: self.opened_dependent.clone(),
            fixes: self.fixes.clone(),
        }
    }

    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        self.table.rollback_to(checkpoint.snapshot);
        self.var_data.truncate(checkpoint.var_data_len);
        self.constraints.truncate(checkpoint.constraints_len);
        self.statuses = checkpoint.statuses;
        self.active = checkpoint.active;
        self.graph = checkpoint.graph;
        self.score = checkpoint.score;
        self.failed = checkpoint.failed;
        self.overload_choices = checkpoint.overload_choices;
        self.disjunction_choices = checkpoint.disjunction_choices;
        self.opened_dependent = checkpoint.opened_dependent;
        self.fixes = checkpoint.fixes;
    }
}
