//! Type interning for structural deduplication.
//!
//! This module implements the interning engine that converts `TypeKey`
//! structures into lightweight `TypeId` handles. Interning goes through a
//! single `RwLock`: the solver is single-threaded per constraint system,
//! but the interner is shared by reference between the constraint system,
//! the archetype builder and the rewriter, so it needs interior
//! mutability. The store is append-only for the lifetime of a check
//! request; nothing is ever freed individually.

use crate::decls::{NominalId, ProtocolId};
use crate::interner::Atom;
use crate::solver::types::*;
use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

struct SliceInterner<T> {
    items: Vec<Arc<[T]>>,
    map: FxHashMap<Arc<[T]>, u32>,
}

impl<T> SliceInterner<T>
where
    T: Eq + Hash,
{
    fn new() -> Self {
        let empty: Arc<[T]> = Arc::from(Vec::new());
        let mut map = FxHashMap::default();
        map.insert(empty.clone(), 0);
        SliceInterner {
            items: vec![empty],
            map,
        }
    }

    fn intern(&mut self, items: Vec<T>) -> u32 {
        if items.is_empty() {
            return 0;
        }

        if let Some(&id) = self.map.get(items.as_slice()) {
            return id;
        }

        let arc: Arc<[T]> = items.into();
        let id = self.items.len() as u32;
        self.items.push(arc.clone());
        self.map.insert(arc, id);
        id
    }

    fn get(&self, id: u32) -> Arc<[T]> {
        self.items[id as usize].clone()
    }
}

struct ValueInterner<T> {
    items: Vec<Arc<T>>,
    map: FxHashMap<Arc<T>, u32>,
}

impl<T> ValueInterner<T>
where
    T: Eq + Hash,
{
    fn new() -> Self {
        ValueInterner {
            items: Vec::new(),
            map: FxHashMap::default(),
        }
    }

    fn intern(&mut self, value: T) -> u32 {
        if let Some(&id) = self.map.get(&value) {
            return id;
        }

        let arc = Arc::new(value);
        let id = self.items.len() as u32;
        self.items.push(arc.clone());
        self.map.insert(arc, id);
        id
    }

    fn get(&self, id: u32) -> Arc<T> {
        self.items[id as usize].clone()
    }
}

struct InternerState {
    key_to_id: FxHashMap<TypeKey, TypeId>,
    id_to_key: Vec<TypeKey>,
    tuple_lists: SliceInterner<TupleElement>,
    type_lists: SliceInterner<TypeId>,
    protocol_lists: SliceInterner<ProtocolId>,
    function_shapes: ValueInterner<FunctionShape>,
    /// Archetypes are allocated, never deduped; see `ArchetypeId`.
    archetypes: Vec<Arc<ArchetypeData>>,
}

/// The type store for one compilation context.
pub struct TypeInterner {
    state: RwLock<InternerState>,
}

impl TypeInterner {
    pub fn new() -> TypeInterner {
        let mut state = InternerState {
            key_to_id: FxHashMap::default(),
            id_to_key: Vec::with_capacity(TypeId::FIRST_DYNAMIC as usize),
            tuple_lists: SliceInterner::new(),
            type_lists: SliceInterner::new(),
            protocol_lists: SliceInterner::new(),
            function_shapes: ValueInterner::new(),
            archetypes: Vec::new(),
        };

        // Pre-register the fixed-id types in constant order. The empty
        // tuple list is slot 0 of the tuple side table, so Void can be
        // registered structurally.
        let fixed: [TypeKey; TypeId::FIRST_DYNAMIC as usize] = [
            TypeKey::Error,
            TypeKey::Intrinsic(IntrinsicKind::Never),
            TypeKey::Tuple(TupleListId(0)),
            TypeKey::Intrinsic(IntrinsicKind::Bool),
            TypeKey::Intrinsic(IntrinsicKind::Int),
            TypeKey::Intrinsic(IntrinsicKind::Int8),
            TypeKey::Intrinsic(IntrinsicKind::Int16),
            TypeKey::Intrinsic(IntrinsicKind::Int32),
            TypeKey::Intrinsic(IntrinsicKind::Int64),
            TypeKey::Intrinsic(IntrinsicKind::UInt),
            TypeKey::Intrinsic(IntrinsicKind::UInt8),
            TypeKey::Intrinsic(IntrinsicKind::UInt16),
            TypeKey::Intrinsic(IntrinsicKind::UInt32),
            TypeKey::Intrinsic(IntrinsicKind::UInt64),
            TypeKey::Intrinsic(IntrinsicKind::Float32),
            TypeKey::Intrinsic(IntrinsicKind::Float64),
            TypeKey::Intrinsic(IntrinsicKind::String),
            TypeKey::Intrinsic(IntrinsicKind::Character),
        ];
        for (index, key) in fixed.into_iter().enumerate() {
            let id = TypeId(index as u32);
            debug_assert_eq!(key.fixed_id().unwrap_or(id), id);
            state.key_to_id.insert(key.clone(), id);
            state.id_to_key.push(key);
        }

        TypeInterner {
            state: RwLock::new(state),
        }
    }

    /// Intern a structural key, returning its canonical id.
    pub fn intern(&self, key: TypeKey) -> TypeId {
        {
            let state = self.state.read().unwrap();
            if let Some(&id) = state.key_to_id.get(&key) {
                return id;
            }
        }
        let mut state = self.state.write().unwrap();
        if let Some(&id) = state.key_to_id.get(&key) {
            return id;
        }
        let id = TypeId(state.id_to_key.len() as u32);
        state.id_to_key.push(key.clone());
        state.key_to_id.insert(key, id);
        id
    }

    /// Look up the structure behind an id.
    pub fn lookup(&self, id: TypeId) -> Option<TypeKey> {
        let state = self.state.read().unwrap();
        state.id_to_key.get(id.0 as usize).cloned()
    }

    // =========================================================================
    // Normalizing constructors
    // =========================================================================

    /// Intern a tuple type. The empty tuple is `Void`.
    pub fn tuple(&self, elements: Vec<TupleElement>) -> TypeId {
        let list = {
            let mut state = self.state.write().unwrap();
            TupleListId(state.tuple_lists.intern(elements))
        };
        self.intern(TypeKey::Tuple(list))
    }

    /// Intern a function type.
    pub fn function(&self, params: Vec<ParamInfo>, result: TypeId) -> TypeId {
        let shape = {
            let mut state = self.state.write().unwrap();
            FunctionShapeId(state.function_shapes.intern(FunctionShape { params, result }))
        };
        self.intern(TypeKey::Function(shape))
    }

    /// Wrap one level of optionality around `payload`.
    pub fn optional(&self, payload: TypeId) -> TypeId {
        self.intern(TypeKey::Optional(payload))
    }

    /// Wrap `depth` levels of optionality around `payload`.
    pub fn optional_depth(&self, payload: TypeId, depth: u32) -> TypeId {
        let mut ty = payload;
        for _ in 0..depth {
            ty = self.optional(ty);
        }
        ty
    }

    pub fn nominal(&self, id: NominalId) -> TypeId {
        self.intern(TypeKey::Nominal(id))
    }

    pub fn bound_generic(&self, id: NominalId, args: Vec<TypeId>) -> TypeId {
        let list = {
            let mut state = self.state.write().unwrap();
            TypeListId(state.type_lists.intern(args))
        };
        self.intern(TypeKey::BoundGeneric(id, list))
    }

    pub fn protocol(&self, id: ProtocolId) -> TypeId {
        self.intern(TypeKey::Protocol(id))
    }

    /// Intern a protocol-composition existential. The member list is
    /// sorted and deduplicated so compositions are canonical; a
    /// single-member composition collapses to the plain protocol type.
    pub fn existential(&self, mut protocols: Vec<ProtocolId>) -> TypeId {
        protocols.sort();
        protocols.dedup();
        if protocols.len() == 1 {
            return self.protocol(protocols[0]);
        }
        let list = {
            let mut state = self.state.write().unwrap();
            ProtocolListId(state.protocol_lists.intern(protocols))
        };
        self.intern(TypeKey::Existential(list))
    }

    pub fn metatype(&self, instance: TypeId) -> TypeId {
        self.intern(TypeKey::Metatype(instance))
    }

    pub fn generic_param(&self, depth: u32, index: u32, name: Atom) -> TypeId {
        self.intern(TypeKey::GenericParam(GenericParamInfo { depth, index, name }))
    }

    /// Allocate a fresh archetype and intern its type. Each call produces
    /// a distinct type.
    pub fn archetype(&self, data: ArchetypeData) -> TypeId {
        let id = {
            let mut state = self.state.write().unwrap();
            let id = ArchetypeId(state.archetypes.len() as u32);
            state.archetypes.push(Arc::new(data));
            id
        };
        self.intern(TypeKey::Archetype(id))
    }

    pub fn dependent_member(&self, base: TypeId, assoc: Atom) -> TypeId {
        self.intern(TypeKey::DependentMember { base, assoc })
    }

    pub fn variable(&self, var: TypeVar) -> TypeId {
        self.intern(TypeKey::Variable(var))
    }

    pub fn lvalue(&self, object: TypeId) -> TypeId {
        self.intern(TypeKey::LValue(object))
    }

    // =========================================================================
    // Side-table accessors
    // =========================================================================

    pub fn tuple_list(&self, id: TupleListId) -> Arc<[TupleElement]> {
        self.state.read().unwrap().tuple_lists.get(id.0)
    }

    pub fn type_list(&self, id: TypeListId) -> Arc<[TypeId]> {
        self.state.read().unwrap().type_lists.get(id.0)
    }

    pub fn protocol_list(&self, id: ProtocolListId) -> Arc<[ProtocolId]> {
        self.state.read().unwrap().protocol_lists.get(id.0)
    }

    pub fn function_shape(&self, id: FunctionShapeId) -> Arc<FunctionShape> {
        self.state.read().unwrap().function_shapes.get(id.0)
    }

    pub fn archetype_data(&self, id: ArchetypeId) -> Arc<ArchetypeData> {
        self.state.read().unwrap().archetypes[id.0 as usize].clone()
    }

    // =========================================================================
    // Structural queries
    // =========================================================================

    /// Strip the lvalue wrapper, if present.
    pub fn rvalue(&self, ty: TypeId) -> TypeId {
        match self.lookup(ty) {
            Some(TypeKey::LValue(object)) => object,
            _ => ty,
        }
    }

    /// Count the optional wrapping depth of `ty` and return the fully
    /// unwrapped payload.
    pub fn optional_depth_of(&self, ty: TypeId) -> (u32, TypeId) {
        let mut depth = 0;
        let mut current = ty;
        while let Some(TypeKey::Optional(payload)) = self.lookup(current) {
            depth += 1;
            current = payload;
        }
        (depth, current)
    }

    /// The protocol members of an existential type, if `ty` is one.
    pub fn existential_protocols(&self, ty: TypeId) -> Option<Vec<ProtocolId>> {
        match self.lookup(ty)? {
            TypeKey::Protocol(p) => Some(vec![p]),
            TypeKey::Existential(list) => Some(self.protocol_list(list).to_vec()),
            _ => None,
        }
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        TypeInterner::new()
    }
}
