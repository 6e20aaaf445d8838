//! The archetype builder.
//!
//! Given a set of generic parameters and their requirements (conformance,
//! superclass, same-type), builds one potential archetype per parameter
//! (and lazily per accessed associated type), unifies same-type
//! equivalence classes with a union-find over the potential records, and
//! finalizes each class into a concrete archetype type exactly once.
//!
//! Inconsistent requirements (conflicting superclasses) are reported
//! through the diagnostic bag and the offending requirement dropped, so
//! building continues and further independent errors still surface.

use crate::decls::{DeclTable, GenericParamDecl, GenericSignature, ProtocolId, Requirement};
use crate::diagnostics::{DiagnosticBag, codes};
use crate::interner::{Atom, Interner};
use crate::solver::{ArchetypeData, FoldMemo, TypeId, TypeInterner, TypeKey, transform_type};
use crate::span::Span;
use rustc_hash::FxHashMap;
use tracing::debug;

/// The not-yet-finalized notion of "the type denoted by generic
/// parameter P, or P.Assoc, recursively".
#[derive(Clone, Debug)]
struct PotentialArchetype {
    name: Atom,
    parent: Option<usize>,
    /// Union-find parent pointer; self-index when representative.
    rep: usize,
    /// Accumulated conformance set (inheritance-closed); minimized at
    /// finalization.
    conforms_to: Vec<ProtocolId>,
    /// Narrowest superclass bound seen so far.
    superclass: Option<TypeId>,
    /// Nested associated types, created lazily by name.
    children: Vec<(Atom, usize)>,
}

/// The finalized environment: parameter and associated types mapped to
/// their archetypes. Read-only after construction.
#[derive(Clone, Debug, Default)]
pub struct GenericEnvironment {
    /// (generic parameter type, archetype type), in declaration order.
    params: Vec<(TypeId, TypeId)>,
    /// (parent archetype type, member name) to nested archetype type.
    nested: FxHashMap<(TypeId, Atom), TypeId>,
}

impl GenericEnvironment {
    /// The archetype for a generic parameter type, if registered.
    pub fn archetype(&self, param_ty: TypeId) -> Option<TypeId> {
        self.params
            .iter()
            .find(|(param, _)| *param == param_ty)
            .map(|(_, archetype)| *archetype)
    }

    /// All archetypes in deterministic declaration order.
    pub fn all_archetypes(&self) -> Vec<TypeId> {
        self.params.iter().map(|(_, archetype)| *archetype).collect()
    }

    /// Substitute generic parameters and dependent members in `ty` with
    /// their archetypes.
    pub fn map_type(&self, interner: &TypeInterner, ty: TypeId) -> TypeId {
        let mut current = ty;
        loop {
            let mut memo = FoldMemo::default();
            let next = transform_type(interner, current, &mut memo, &mut |id, key| {
                match key {
                    TypeKey::GenericParam(_) => self.archetype(id),
                    TypeKey::DependentMember { base, assoc } => {
                        // Only resolvable once the base has become an
                        // archetype; outer iterations get it there.
                        if matches!(interner.lookup(*base), Some(TypeKey::Archetype(_))) {
                            self.nested.get(&(*base, *assoc)).copied()
                        } else {
                            None
                        }
                    }
                    _ => None,
                }
            });
            if next == current {
                return current;
            }
            current = next;
        }
    }
}

/// Builds archetypes for one generic signature. See the module docs.
pub struct ArchetypeBuilder<'a> {
    types: &'a TypeInterner,
    decls: &'a DeclTable,
    names: &'a Interner,
    potentials: Vec<PotentialArchetype>,
    /// Registered top-level parameters, in declaration order.
    params: Vec<(GenericParamDecl, usize)>,
    finalized: bool,
    environment: GenericEnvironment,
}

impl<'a> ArchetypeBuilder<'a> {
    pub fn new(
        types: &'a TypeInterner,
        decls: &'a DeclTable,
        names: &'a Interner,
    ) -> ArchetypeBuilder<'a> {
        ArchetypeBuilder {
            types,
            decls,
            names,
            potentials: Vec::new(),
            params: Vec::new(),
            finalized: false,
            environment: GenericEnvironment::default(),
        }
    }

    /// Register a new top-level generic parameter. Returns false if the
    /// parameter was already added.
    pub fn add_generic_parameter(&mut self, param: GenericParamDecl) -> bool {
        debug_assert!(!self.finalized);
        if self
            .params
            .iter()
            .any(|(p, _)| p.depth == param.depth && p.index == param.index)
        {
            return false;
        }
        let index = self.potentials.len();
        self.potentials.push(PotentialArchetype {
            name: param.name,
            parent: None,
            rep: index,
            conforms_to: Vec::new(),
            superclass: None,
            children: Vec::new(),
        });
        self.params.push((param, index));
        true
    }

    /// Add all parameters and requirements of a signature.
    pub fn add_signature(&mut self, signature: &GenericSignature, bag: &mut DiagnosticBag) {
        for param in &signature.params {
            self.add_generic_parameter(*param);
        }
        for requirement in &signature.requirements {
            self.add_requirement(requirement, bag);
        }
    }

    /// Add one requirement. Returns true if an inconsistency was
    /// diagnosed (the requirement is dropped and building continues).
    pub fn add_requirement(&mut self, requirement: &Requirement, bag: &mut DiagnosticBag) -> bool {
        debug_assert!(!self.finalized);
        match *requirement {
            Requirement::Conformance { subject, protocol } => {
                let Some(potential) = self.resolve_potential(subject) else {
                    bag.error(
                        Span::SYNTHESIZED,
                        "requirement names an unknown generic parameter",
                        codes::UNKNOWN_GENERIC_PARAMETER,
                    );
                    return true;
                };
                let root = self.find(potential);
                // The requirement carries the protocol's whole
                // inheritance closure so later queries are lookups.
                for implied in self.decls.protocol_closure(protocol) {
                    if !self.potentials[root].conforms_to.contains(&implied) {
                        self.potentials[root].conforms_to.push(implied);
                    }
                }
                false
            }
            Requirement::Superclass { subject, bound } => {
                let Some(potential) = self.resolve_potential(subject) else {
                    bag.error(
                        Span::SYNTHESIZED,
                        "requirement names an unknown generic parameter",
                        codes::UNKNOWN_GENERIC_PARAMETER,
                    );
                    return true;
                };
                let root = self.find(potential);
                self.narrow_superclass(root, bound, bag)
            }
            Requirement::SameType { first, second } => {
                let first_potential = self.resolve_potential(first);
                let second_potential = self.resolve_potential(second);
                match (first_potential, second_potential) {
                    (Some(a), Some(b)) => self.merge(a, b, bag),
                    _ => {
                        bag.error(
                            Span::SYNTHESIZED,
                            "same-type requirement does not relate two generic parameters",
                            codes::INCONSISTENT_SAME_TYPE,
                        );
                        true
                    }
                }
            }
        }
    }

    /// Walk a concrete (possibly generic-containing) surface type and
    /// replay the declared requirements of every bound-generic nominal
    /// it applies, against this builder's own parameters.
    pub fn infer_requirements(&mut self, ty: TypeId, bag: &mut DiagnosticBag) {
        match self.types.lookup(ty) {
            Some(TypeKey::BoundGeneric(nominal, args)) => {
                let nominal_decl = self.decls.nominal(nominal);
                let args = self.types.type_list(args);
                if let Some(signature) = nominal_decl.generics.clone() {
                    let mut map: FxHashMap<TypeId, TypeId> = FxHashMap::default();
                    for (param, &arg) in signature.params.iter().zip(args.iter()) {
                        let param_ty =
                            self.types.generic_param(param.depth, param.index, param.name);
                        map.insert(param_ty, arg);
                    }
                    for requirement in &signature.requirements {
                        self.infer_one_requirement(requirement, &map, bag);
                    }
                }
                for &arg in args.iter() {
                    self.infer_requirements(arg, bag);
                }
            }
            Some(TypeKey::Tuple(list)) => {
                for element in self.types.tuple_list(list).iter() {
                    self.infer_requirements(element.ty, bag);
                }
            }
            Some(TypeKey::Function(shape_id)) => {
                let shape = self.types.function_shape(shape_id);
                for param in &shape.params {
                    self.infer_requirements(param.ty, bag);
                }
                self.infer_requirements(shape.result, bag);
            }
            Some(TypeKey::Optional(payload)) => self.infer_requirements(payload, bag),
            Some(TypeKey::Metatype(instance)) => self.infer_requirements(instance, bag),
            _ => {}
        }
    }

    fn infer_one_requirement(
        &mut self,
        requirement: &Requirement,
        map: &FxHashMap<TypeId, TypeId>,
        bag: &mut DiagnosticBag,
    ) {
        let substitute = |builder: &ArchetypeBuilder<'a>, ty: TypeId| -> TypeId {
            let mut memo = FoldMemo::default();
            transform_type(builder.types, ty, &mut memo, &mut |id, key| match key {
                TypeKey::GenericParam(_) => map.get(&id).copied(),
                _ => None,
            })
        };
        match *requirement {
            Requirement::Conformance { subject, protocol } => {
                let subject = substitute(self, subject);
                // Only parameters of this signature pick up implied
                // requirements; concrete subjects are checked by the
                // solver when the type is used.
                if self.resolve_potential(subject).is_some() {
                    self.add_requirement(&Requirement::Conformance { subject, protocol }, bag);
                }
            }
            Requirement::Superclass { subject, bound } => {
                let subject = substitute(self, subject);
                let bound = substitute(self, bound);
                if self.resolve_potential(subject).is_some() {
                    self.add_requirement(&Requirement::Superclass { subject, bound }, bag);
                }
            }
            Requirement::SameType { first, second } => {
                let first = substitute(self, first);
                let second = substitute(self, second);
                if self.resolve_potential(first).is_some()
                    && self.resolve_potential(second).is_some()
                {
                    self.add_requirement(&Requirement::SameType { first, second }, bag);
                }
            }
        }
    }

    /// Single irreversible finalization pass: one archetype per
    /// equivalence class, in deterministic order (declaration depth then
    /// index; nested associated types lexicographically by name), with
    /// the conformance set minimized and canonically sorted.
    pub fn assign_archetypes(&mut self) {
        debug_assert!(!self.finalized);
        let mut class_archetypes: FxHashMap<usize, TypeId> = FxHashMap::default();

        let params = self.params.clone();
        for (param, potential) in &params {
            let root = self.find(*potential);
            let archetype_ty = match class_archetypes.get(&root) {
                Some(&existing) => existing,
                None => {
                    let ty = self.build_archetype(root, None, self.potentials[root].name);
                    class_archetypes.insert(root, ty);
                    ty
                }
            };
            let param_ty = self
                .types
                .generic_param(param.depth, param.index, param.name);
            self.environment.params.push((param_ty, archetype_ty));
        }

        debug!(count = self.environment.params.len(), "archetypes assigned");
        self.finalized = true;
    }

    fn build_archetype(&mut self, root: usize, parent: Option<TypeId>, name: Atom) -> TypeId {
        let conforms_to = self.minimize_conformances(&self.potentials[root].conforms_to.clone());
        let superclass = self.potentials[root].superclass;

        let parent_id = parent.and_then(|ty| match self.types.lookup(ty) {
            Some(TypeKey::Archetype(id)) => Some(id),
            _ => None,
        });
        let archetype_ty = self.types.archetype(ArchetypeData {
            name,
            parent: parent_id,
            conforms_to,
            superclass,
        });

        // Nested associated types become child archetypes, ordered
        // lexicographically by name so codegen is bit-reproducible.
        let mut children: Vec<(Atom, usize)> = self.potentials[root].children.clone();
        children.sort_by_key(|(child_name, _)| self.names.resolve(*child_name));
        for (child_name, child) in children {
            let child_root = self.find(child);
            let qualified = self.names.intern(&format!(
                "{}.{}",
                self.names.resolve(name),
                self.names.resolve(child_name)
            ));
            let child_ty = self.build_archetype(child_root, Some(archetype_ty), qualified);
            self.environment
                .nested
                .insert((archetype_ty, child_name), child_ty);
        }

        archetype_ty
    }

    /// Read-only query, valid only after finalization.
    pub fn archetype(&self, param: &GenericParamDecl) -> Option<TypeId> {
        assert!(
            self.finalized,
            "archetype() queried before assign_archetypes()"
        );
        let param_ty = self
            .types
            .generic_param(param.depth, param.index, param.name);
        self.environment.archetype(param_ty)
    }

    /// Read-only query, valid only after finalization.
    pub fn all_archetypes(&self) -> Vec<TypeId> {
        assert!(
            self.finalized,
            "all_archetypes() queried before assign_archetypes()"
        );
        self.environment.all_archetypes()
    }

    /// Consume the builder, producing the finalized environment.
    pub fn into_environment(mut self) -> GenericEnvironment {
        if !self.finalized {
            self.assign_archetypes();
        }
        self.environment
    }

    /// Drop any protocol implied by another protocol already in the set,
    /// then sort canonically by (module, name). Protocol inheritance
    /// graphs are finite and acyclic, so one removal pass suffices.
    pub fn minimize_conformances(&self, protocols: &[ProtocolId]) -> Vec<ProtocolId> {
        let mut kept: Vec<ProtocolId> = Vec::new();
        for &candidate in protocols {
            let implied_by_other = protocols.iter().any(|&other| {
                other != candidate && self.decls.protocol_implies(other, candidate)
            });
            if !implied_by_other && !kept.contains(&candidate) {
                kept.push(candidate);
            }
        }
        kept.sort_by_key(|&p| {
            let decl = self.decls.protocol(p);
            (self.names.resolve(decl.module), self.names.resolve(decl.name))
        });
        kept
    }

    // =========================================================================
    // Potential-archetype resolution and union-find
    // =========================================================================

    /// Resolve a subject type (generic parameter or dependent-member
    /// chain) to its potential archetype, creating nested entries
    /// lazily.
    fn resolve_potential(&mut self, ty: TypeId) -> Option<usize> {
        match self.types.lookup(ty)? {
            TypeKey::GenericParam(info) => self
                .params
                .iter()
                .find(|(p, _)| p.depth == info.depth && p.index == info.index)
                .map(|(_, potential)| *potential),
            TypeKey::DependentMember { base, assoc } => {
                let base_potential = self.resolve_potential(base)?;
                let root = self.find(base_potential);
                if let Some(&(_, existing)) = self.potentials[root]
                    .children
                    .iter()
                    .find(|(name, _)| *name == assoc)
                {
                    return Some(existing);
                }
                let index = self.potentials.len();
                self.potentials.push(PotentialArchetype {
                    name: assoc,
                    parent: Some(root),
                    rep: index,
                    conforms_to: Vec::new(),
                    superclass: None,
                    children: Vec::new(),
                });
                self.potentials[root].children.push((assoc, index));
                Some(index)
            }
            _ => None,
        }
    }

    /// Union-find lookup with path compression.
    fn find(&mut self, index: usize) -> usize {
        let parent = self.potentials[index].rep;
        if parent == index {
            return index;
        }
        let root = self.find(parent);
        self.potentials[index].rep = root;
        root
    }

    /// Merge two equivalence classes, migrating conformance and
    /// superclass data onto the surviving representative and recursively
    /// merging same-named nested types. Returns true if a conflict was
    /// diagnosed.
    fn merge(&mut self, a: usize, b: usize, bag: &mut DiagnosticBag) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return false;
        }
        // The lower index survives, keeping ordering deterministic.
        let (survivor, absorbed) = if root_a < root_b {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        self.potentials[absorbed].rep = survivor;

        let absorbed_conformances = std::mem::take(&mut self.potentials[absorbed].conforms_to);
        for protocol in absorbed_conformances {
            if !self.potentials[survivor].conforms_to.contains(&protocol) {
                self.potentials[survivor].conforms_to.push(protocol);
            }
        }

        let mut diagnosed = false;
        if let Some(bound) = self.potentials[absorbed].superclass.take() {
            diagnosed |= self.narrow_superclass(survivor, bound, bag);
        }

        // Same-named nested types of merged parents are the same type.
        let absorbed_children = std::mem::take(&mut self.potentials[absorbed].children);
        for (name, child) in absorbed_children {
            if let Some(&(_, existing)) = self.potentials[survivor]
                .children
                .iter()
                .find(|(n, _)| *n == name)
            {
                diagnosed |= self.merge(existing, child, bag);
            } else {
                self.potentials[survivor].children.push((name, child));
            }
        }

        diagnosed
    }

    /// Record or narrow a superclass bound; conflicting unrelated
    /// classes are diagnosed and the new bound dropped.
    fn narrow_superclass(
        &mut self,
        root: usize,
        bound: TypeId,
        bag: &mut DiagnosticBag,
    ) -> bool {
        let existing = self.potentials[root].superclass;
        match existing {
            None => {
                self.potentials[root].superclass = Some(bound);
                false
            }
            Some(current) if current == bound => false,
            Some(current) => {
                let current_nominal = match self.types.lookup(current) {
                    Some(TypeKey::Nominal(id)) => Some(id),
                    _ => None,
                };
                let bound_nominal = match self.types.lookup(bound) {
                    Some(TypeKey::Nominal(id)) => Some(id),
                    _ => None,
                };
                match (current_nominal, bound_nominal) {
                    (Some(current_id), Some(bound_id)) => {
                        if self.decls.is_subclass(current_id, bound_id) {
                            // Existing bound is already the narrower one.
                            false
                        } else if self.decls.is_subclass(bound_id, current_id) {
                            self.potentials[root].superclass = Some(bound);
                            false
                        } else {
                            bag.error(
                                Span::SYNTHESIZED,
                                format!(
                                    "generic parameter '{}' cannot be a subclass of both '{}' and '{}'",
                                    self.names.resolve(self.potentials[root].name),
                                    self.names.resolve(self.decls.nominal(current_id).name),
                                    self.names.resolve(self.decls.nominal(bound_id).name),
                                ),
                                codes::CONFLICTING_SUPERCLASS,
                            );
                            true
                        }
                    }
                    _ => {
                        bag.error(
                            Span::SYNTHESIZED,
                            "superclass requirement does not name a class",
                            codes::CONFLICTING_SUPERCLASS,
                        );
                        true
                    }
                }
            }
        }
    }
}
