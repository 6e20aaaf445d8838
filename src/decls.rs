//! Declaration table.
//!
//! Models the name-lookup collaborator the solver calls out to: value
//! declarations with overload sets, nominal types with members and
//! conformances, protocols with inheritance and associated types, and the
//! literal-protocol registry. Lookup is a pure function of its arguments;
//! the constraint system layers its own per-solve memo tables on top.

use crate::interner::Atom;
use crate::solver::{TypeId, TypeInterner, TypeKey};
use crate::span::Span;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

/// Handle to a declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeclId(pub u32);

/// Handle to a nominal type declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NominalId(pub u32);

/// Handle to a protocol declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProtocolId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NominalKind {
    Struct,
    Class,
    Enum,
}

/// The literal forms an expression can take; each maps to one literal
/// protocol in the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum LiteralKind {
    Integer,
    Float,
    String,
    Boolean,
    Nil,
}

/// A generic parameter declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenericParamDecl {
    pub name: Atom,
    pub depth: u32,
    pub index: u32,
}

/// A requirement in a generic signature. Subject types are written in
/// terms of `GenericParam` and `DependentMember` types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    /// The subject must conform to the protocol.
    Conformance { subject: TypeId, protocol: ProtocolId },
    /// The subject must be (a subclass of) the bound.
    Superclass { subject: TypeId, bound: TypeId },
    /// The two subjects are the same type.
    SameType { first: TypeId, second: TypeId },
}

/// The generic signature of a declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenericSignature {
    pub params: Vec<GenericParamDecl>,
    pub requirements: Vec<Requirement>,
}

/// A function declaration. `ty` is the declared function type, written in
/// terms of `GenericParam` types when `generics` is present.
#[derive(Clone, Debug)]
pub struct FuncDecl {
    pub name: Atom,
    pub ty: TypeId,
    pub generics: Option<GenericSignature>,
}

/// A variable or constant declaration.
#[derive(Clone, Debug)]
pub struct VarDecl {
    pub name: Atom,
    pub ty: TypeId,
    /// Mutable bindings produce lvalue references.
    pub is_mutable: bool,
}

#[derive(Clone, Debug)]
pub enum DeclKind {
    Func(FuncDecl),
    Var(VarDecl),
    /// A nominal type used as a value (metatype reference).
    Nominal(NominalId),
}

/// One declaration in the table.
#[derive(Clone, Debug)]
pub struct Decl {
    pub kind: DeclKind,
    pub span: Span,
}

impl Decl {
    pub fn name(&self) -> Atom {
        match &self.kind {
            DeclKind::Func(f) => f.name,
            DeclKind::Var(v) => v.name,
            DeclKind::Nominal(_) => Atom::NONE,
        }
    }
}

/// A nominal type declaration.
#[derive(Clone, Debug)]
pub struct NominalDecl {
    pub name: Atom,
    pub kind: NominalKind,
    /// Superclass, classes only.
    pub superclass: Option<NominalId>,
    pub generics: Option<GenericSignature>,
    /// Declared protocol conformances.
    pub conformances: Vec<ProtocolId>,
    /// Member declarations, in declaration order.
    pub members: Vec<DeclId>,
}

/// A protocol declaration.
#[derive(Clone, Debug)]
pub struct ProtocolDecl {
    pub name: Atom,
    /// The defining module, used for canonical ordering.
    pub module: Atom,
    pub inherited: Vec<ProtocolId>,
    pub assoc_types: Vec<Atom>,
}

/// One entry in the literal-protocol registry.
#[derive(Clone, Copy, Debug)]
pub struct LiteralProtocol {
    pub kind: LiteralKind,
    pub protocol: ProtocolId,
    /// The type a literal of this kind defaults to when context does not
    /// force another conforming type. `None` means there is no default
    /// (nil literals always need context).
    pub default_type: Option<TypeId>,
}

/// The declaration table for one compilation context. Append-only.
#[derive(Default)]
pub struct DeclTable {
    decls: Vec<Decl>,
    nominals: Vec<NominalDecl>,
    protocols: Vec<ProtocolDecl>,
    /// Top-level value namespace; one entry per name, declaration order
    /// preserved so overload sets iterate deterministically.
    top_level: IndexMap<Atom, Vec<DeclId>>,
    literal_protocols: Vec<LiteralProtocol>,
    /// Types conforming to a literal protocol, with the witness
    /// initializer used by the rewriter. `None` means the conversion is a
    /// builtin construction (intrinsic destination).
    literal_conformances: FxHashMap<(TypeId, LiteralKind), Option<DeclId>>,
    /// Conformances of non-nominal (intrinsic, existential) types.
    builtin_conformances: FxHashMap<TypeId, Vec<ProtocolId>>,
}

impl DeclTable {
    pub fn new() -> DeclTable {
        DeclTable::default()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    pub fn add_protocol(&mut self, proto: ProtocolDecl) -> ProtocolId {
        let id = ProtocolId(self.protocols.len() as u32);
        self.protocols.push(proto);
        id
    }

    pub fn add_nominal(&mut self, nominal: NominalDecl) -> NominalId {
        let id = NominalId(self.nominals.len() as u32);
        self.nominals.push(nominal);
        id
    }

    /// Add a declaration without binding a top-level name (members).
    pub fn add_decl(&mut self, decl: Decl) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(decl);
        id
    }

    /// Add a declaration and bind it into the top-level namespace,
    /// extending the overload set for its name.
    pub fn add_top_level(&mut self, decl: Decl) -> DeclId {
        let name = decl.name();
        let id = self.add_decl(decl);
        self.top_level.entry(name).or_default().push(id);
        id
    }

    /// Add a member declaration to a nominal.
    pub fn add_member(&mut self, nominal: NominalId, decl: Decl) -> DeclId {
        let id = self.add_decl(decl);
        self.nominals[nominal.0 as usize].members.push(id);
        id
    }

    pub fn add_conformance(&mut self, nominal: NominalId, protocol: ProtocolId) {
        let decl = &mut self.nominals[nominal.0 as usize];
        if !decl.conformances.contains(&protocol) {
            decl.conformances.push(protocol);
        }
    }

    /// Record a conformance for a non-nominal type (intrinsics).
    pub fn add_builtin_conformance(&mut self, ty: TypeId, protocol: ProtocolId) {
        let list = self.builtin_conformances.entry(ty).or_default();
        if !list.contains(&protocol) {
            list.push(protocol);
        }
    }

    pub fn register_literal_protocol(
        &mut self,
        kind: LiteralKind,
        protocol: ProtocolId,
        default_type: Option<TypeId>,
    ) {
        self.literal_protocols.push(LiteralProtocol {
            kind,
            protocol,
            default_type,
        });
    }

    /// Record that `ty` can be built from a literal of `kind`. A `witness`
    /// of `None` marks a builtin construction.
    pub fn add_literal_conformance(
        &mut self,
        ty: TypeId,
        kind: LiteralKind,
        witness: Option<DeclId>,
    ) {
        self.literal_conformances.insert((ty, kind), witness);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.0 as usize]
    }

    pub fn nominal(&self, id: NominalId) -> &NominalDecl {
        &self.nominals[id.0 as usize]
    }

    pub fn protocol(&self, id: ProtocolId) -> &ProtocolDecl {
        &self.protocols[id.0 as usize]
    }

    /// The declared (unopened) type of a value declaration.
    pub fn decl_type(&self, interner: &TypeInterner, id: DeclId) -> TypeId {
        match &self.decl(id).kind {
            DeclKind::Func(f) => f.ty,
            DeclKind::Var(v) => {
                if v.is_mutable {
                    interner.lvalue(v.ty)
                } else {
                    v.ty
                }
            }
            DeclKind::Nominal(nominal) => interner.metatype(interner.nominal(*nominal)),
        }
    }

    /// The generic signature of a declaration, if it has one.
    pub fn decl_generics(&self, id: DeclId) -> Option<&GenericSignature> {
        match &self.decl(id).kind {
            DeclKind::Func(f) => f.generics.as_ref(),
            _ => None,
        }
    }

    /// The overload set bound to a top-level name, in declaration order.
    pub fn lookup_top_level(&self, name: Atom) -> &[DeclId] {
        self.top_level.get(&name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Member lookup on a nominal, walking the superclass chain.
    /// Declaration order within each class, subclass entries first.
    pub fn lookup_member(&self, nominal: NominalId, name: Atom) -> Vec<DeclId> {
        let mut results = Vec::new();
        let mut current = Some(nominal);
        let mut seen = FxHashSet::default();
        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            let decl = self.nominal(id);
            for &member in &decl.members {
                if self.decl(member).name() == name {
                    results.push(member);
                }
            }
            current = decl.superclass;
        }
        results
    }

    /// The protocol's transitive inheritance closure, including itself.
    pub fn protocol_closure(&self, protocol: ProtocolId) -> Vec<ProtocolId> {
        let mut closure = Vec::new();
        let mut worklist = vec![protocol];
        let mut seen = FxHashSet::default();
        while let Some(p) = worklist.pop() {
            if !seen.insert(p) {
                continue;
            }
            closure.push(p);
            worklist.extend(self.protocol(p).inherited.iter().copied());
        }
        closure.sort();
        closure
    }

    /// True if conforming to `protocol` implies conforming to `target`.
    pub fn protocol_implies(&self, protocol: ProtocolId, target: ProtocolId) -> bool {
        self.protocol_closure(protocol).contains(&target)
    }

    /// True if `sub` is `sup` or a subclass of it.
    pub fn is_subclass(&self, sub: NominalId, sup: NominalId) -> bool {
        let mut current = Some(sub);
        let mut seen = FxHashSet::default();
        while let Some(id) = current {
            if id == sup {
                return true;
            }
            if !seen.insert(id) {
                break;
            }
            current = self.nominal(id).superclass;
        }
        false
    }

    /// Protocol conformance check for a concrete type.
    ///
    /// Covers declared conformances (including those implied by protocol
    /// inheritance), the superclass chain for classes, and the builtin
    /// registry for intrinsics. Existentials conform when their protocol
    /// list implies the target.
    pub fn conforms_to(
        &self,
        interner: &TypeInterner,
        ty: TypeId,
        protocol: ProtocolId,
    ) -> bool {
        match interner.lookup(ty) {
            Some(TypeKey::Nominal(id)) | Some(TypeKey::BoundGeneric(id, _)) => {
                let mut current = Some(id);
                let mut seen = FxHashSet::default();
                while let Some(nominal) = current {
                    if !seen.insert(nominal) {
                        break;
                    }
                    let decl = self.nominal(nominal);
                    for &declared in &decl.conformances {
                        if self.protocol_implies(declared, protocol) {
                            return true;
                        }
                    }
                    current = decl.superclass;
                }
                false
            }
            Some(TypeKey::Protocol(p)) => self.protocol_implies(p, protocol),
            Some(TypeKey::Existential(list)) => interner
                .protocol_list(list)
                .iter()
                .any(|&p| self.protocol_implies(p, protocol)),
            Some(TypeKey::Archetype(id)) => interner
                .archetype_data(id)
                .conforms_to
                .iter()
                .any(|&p| self.protocol_implies(p, protocol)),
            Some(TypeKey::Error) => true,
            _ => self
                .builtin_conformances
                .get(&ty)
                .is_some_and(|list| list.iter().any(|&p| self.protocol_implies(p, protocol))),
        }
    }

    /// The registry entry for a literal kind, if the host registered one.
    pub fn literal_protocol(&self, kind: LiteralKind) -> Option<&LiteralProtocol> {
        self.literal_protocols.iter().find(|p| p.kind == kind)
    }

    /// The default type for a literal kind.
    pub fn literal_default(&self, kind: LiteralKind) -> Option<TypeId> {
        self.literal_protocol(kind).and_then(|p| p.default_type)
    }

    /// True if a literal of `kind` can produce a value of `ty`.
    pub fn literal_conforms(
        &self,
        interner: &TypeInterner,
        ty: TypeId,
        kind: LiteralKind,
    ) -> bool {
        // Any optional type is expressible by nil.
        if kind == LiteralKind::Nil {
            return matches!(interner.lookup(ty), Some(TypeKey::Optional(_)));
        }
        self.literal_conformances.contains_key(&(ty, kind))
    }

    /// The witness initializer for a literal conversion; `None` for
    /// builtin constructions.
    pub fn literal_witness(&self, ty: TypeId, kind: LiteralKind) -> Option<DeclId> {
        self.literal_conformances.get(&(ty, kind)).copied().flatten()
    }
}
