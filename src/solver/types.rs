//! Structural type representation.
//!
//! Types are hash-consed into lightweight `TypeId` handles by the
//! `TypeInterner`; the full structure behind a handle is a `TypeKey`, a
//! closed tagged union. Composite payloads (tuple element lists, function
//! shapes, protocol lists) are interned separately and referenced by their
//! own id types, so a `TypeKey` is always small and cheap to clone.
//!
//! Benefits:
//! - O(1) type equality (just compare TypeId values)
//! - Memory efficient (each unique structure stored once)
//! - Cache-friendly (work with u32 handles instead of heap objects)

use crate::decls::{NominalId, ProtocolId};
use crate::interner::Atom;
use serde::Serialize;

/// A lightweight handle to an interned type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub u32);

impl TypeId {
    /// The error placeholder type. Downstream passes treat it as
    /// "already diagnosed" and stay silent about it.
    pub const ERROR: TypeId = TypeId(0);
    /// The uninhabited type.
    pub const NEVER: TypeId = TypeId(1);
    /// The empty tuple.
    pub const VOID: TypeId = TypeId(2);
    pub const BOOL: TypeId = TypeId(3);
    pub const INT: TypeId = TypeId(4);
    pub const INT8: TypeId = TypeId(5);
    pub const INT16: TypeId = TypeId(6);
    pub const INT32: TypeId = TypeId(7);
    pub const INT64: TypeId = TypeId(8);
    pub const UINT: TypeId = TypeId(9);
    pub const UINT8: TypeId = TypeId(10);
    pub const UINT16: TypeId = TypeId(11);
    pub const UINT32: TypeId = TypeId(12);
    pub const UINT64: TypeId = TypeId(13);
    pub const FLOAT32: TypeId = TypeId(14);
    pub const FLOAT64: TypeId = TypeId(15);
    pub const STRING: TypeId = TypeId(16);
    pub const CHARACTER: TypeId = TypeId(17);

    /// Number of pre-registered types; dynamic ids start here.
    pub(crate) const FIRST_DYNAMIC: u32 = 18;

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_error(self) -> bool {
        self == TypeId::ERROR
    }
}

/// The built-in scalar types of the language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IntrinsicKind {
    Never,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    Character,
}

impl IntrinsicKind {
    /// The canonical display name, matching the surface language.
    pub fn name(self) -> &'static str {
        match self {
            IntrinsicKind::Never => "Never",
            IntrinsicKind::Bool => "Bool",
            IntrinsicKind::Int => "Int",
            IntrinsicKind::Int8 => "Int8",
            IntrinsicKind::Int16 => "Int16",
            IntrinsicKind::Int32 => "Int32",
            IntrinsicKind::Int64 => "Int64",
            IntrinsicKind::UInt => "UInt",
            IntrinsicKind::UInt8 => "UInt8",
            IntrinsicKind::UInt16 => "UInt16",
            IntrinsicKind::UInt32 => "UInt32",
            IntrinsicKind::UInt64 => "UInt64",
            IntrinsicKind::Float32 => "Float32",
            IntrinsicKind::Float64 => "Float64",
            IntrinsicKind::String => "String",
            IntrinsicKind::Character => "Character",
        }
    }

    /// True for the fixed-width and platform integer types.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            IntrinsicKind::Int
                | IntrinsicKind::Int8
                | IntrinsicKind::Int16
                | IntrinsicKind::Int32
                | IntrinsicKind::Int64
                | IntrinsicKind::UInt
                | IntrinsicKind::UInt8
                | IntrinsicKind::UInt16
                | IntrinsicKind::UInt32
                | IntrinsicKind::UInt64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, IntrinsicKind::Float32 | IntrinsicKind::Float64)
    }
}

/// A type variable: a placeholder standing for an as-yet-unknown concrete
/// type during inference. The representative link and the fixed binding
/// live in the constraint system's unification table, not here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeVar(pub u32);

impl TypeVar {
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Handle to an interned tuple element list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TupleListId(pub u32);

/// Handle to an interned plain type list (generic arguments).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TypeListId(pub u32);

/// Handle to an interned, canonically sorted protocol list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ProtocolListId(pub u32);

/// Handle to an interned function shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct FunctionShapeId(pub u32);

/// Handle to an archetype record. Archetypes have identity: two archetypes
/// built from distinct generic parameters are distinct types even when
/// their requirement sets coincide, so these are allocated, not deduped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ArchetypeId(pub u32);

/// One element of a tuple type. `label` is `Atom::NONE` for positional
/// elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TupleElement {
    pub label: Atom,
    pub ty: TypeId,
}

impl TupleElement {
    pub fn new(label: Atom, ty: TypeId) -> TupleElement {
        TupleElement { label, ty }
    }

    pub fn unlabeled(ty: TypeId) -> TupleElement {
        TupleElement {
            label: Atom::NONE,
            ty,
        }
    }
}

/// One parameter of a function type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParamInfo {
    /// Argument label at the call site; `Atom::NONE` for unlabeled.
    pub label: Atom,
    pub ty: TypeId,
    /// The declaration provides a default expression for this parameter.
    pub has_default: bool,
    /// Variadic tail parameter; `ty` is the element type.
    pub variadic: bool,
}

impl ParamInfo {
    pub fn new(label: Atom, ty: TypeId) -> ParamInfo {
        ParamInfo {
            label,
            ty,
            has_default: false,
            variadic: false,
        }
    }
}

/// The uncurried shape of a function type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionShape {
    pub params: Vec<ParamInfo>,
    pub result: TypeId,
}

/// A generic parameter as written in a declaration's signature: identified
/// by nesting depth and index, carrying its source name for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct GenericParamInfo {
    pub depth: u32,
    pub index: u32,
    pub name: Atom,
}

/// The finalized stand-in type for one generic-parameter equivalence
/// class, produced by the archetype builder.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArchetypeData {
    /// Display name: the parameter name, or `Parent.AssocName` for nested
    /// associated types.
    pub name: Atom,
    /// Parent archetype for nested associated types.
    pub parent: Option<ArchetypeId>,
    /// Minimized, canonically ordered conformance requirements.
    pub conforms_to: Vec<ProtocolId>,
    /// Narrowest superclass bound, if any.
    pub superclass: Option<TypeId>,
}

/// The structure of an interned type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKey {
    /// A built-in scalar type.
    Intrinsic(IntrinsicKind),
    /// A tuple; `Void` is the empty tuple.
    Tuple(TupleListId),
    /// A function type.
    Function(FunctionShapeId),
    /// One level of optionality around the payload type.
    Optional(TypeId),
    /// A non-generic struct/class/enum.
    Nominal(NominalId),
    /// A generic nominal applied to arguments.
    BoundGeneric(NominalId, TypeListId),
    /// A protocol used as a type (single-protocol existential).
    Protocol(ProtocolId),
    /// A protocol-composition existential.
    Existential(ProtocolListId),
    /// The type of a type.
    Metatype(TypeId),
    /// An unresolved generic parameter, only valid inside declaration
    /// signatures; opening replaces these with type variables.
    GenericParam(GenericParamInfo),
    /// A finalized generic-parameter stand-in.
    Archetype(ArchetypeId),
    /// `Base.AssocName` where `Base` is not yet resolved.
    DependentMember { base: TypeId, assoc: Atom },
    /// A reference to a type variable owned by a constraint system.
    Variable(TypeVar),
    /// The type of a mutable reference; loads convert to the object type.
    LValue(TypeId),
    /// The error placeholder.
    Error,
}

impl TypeKey {
    /// The pre-registered singleton id for this key, if it has one
    /// (intrinsics and the error type).
    pub(crate) fn fixed_id(&self) -> Option<TypeId> {
        match self {
            TypeKey::Error => Some(TypeId::ERROR),
            TypeKey::Intrinsic(kind) => Some(match kind {
                IntrinsicKind::Never => TypeId::NEVER,
                IntrinsicKind::Bool => TypeId::BOOL,
                IntrinsicKind::Int => TypeId::INT,
                IntrinsicKind::Int8 => TypeId::INT8,
                IntrinsicKind::Int16 => TypeId::INT16,
                IntrinsicKind::Int32 => TypeId::INT32,
                IntrinsicKind::Int64 => TypeId::INT64,
                IntrinsicKind::UInt => TypeId::UINT,
                IntrinsicKind::UInt8 => TypeId::UINT8,
                IntrinsicKind::UInt16 => TypeId::UINT16,
                IntrinsicKind::UInt32 => TypeId::UINT32,
                IntrinsicKind::UInt64 => TypeId::UINT64,
                IntrinsicKind::Float32 => TypeId::FLOAT32,
                IntrinsicKind::Float64 => TypeId::FLOAT64,
                IntrinsicKind::String => TypeId::STRING,
                IntrinsicKind::Character => TypeId::CHARACTER,
            }),
            _ => None,
        }
    }
}
