//! Expression tree and arena storage.
//!
//! Expressions are stored contiguously in an `ExprArena` and referenced by
//! index, so parent/child edges are plain handle fields and the whole tree
//! is trivially relocatable. Every node carries a type slot: the
//! constraint-generation walk fills it with an "open" type (containing
//! type variables) and the rewriter replaces it with the solved concrete
//! type.
//!
//! The kinds split into two groups: the surface forms the caller builds
//! (`IntegerLiteral` through `Paren`) and the implicit forms only the
//! rewriter introduces (`Load` through `DefaultArgument`).

use crate::decls::{DeclId, ProtocolId};
use crate::interner::Atom;
use crate::solver::TypeId;
use crate::span::Span;
use serde::Serialize;

/// Handle to an expression node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ExprId(pub u32);

impl ExprId {
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// A protocol conformance discovered during solving, attached to erasure
/// and specialization nodes so IR generation can emit witness tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConformanceRef {
    pub protocol: ProtocolId,
    /// The concrete type providing the conformance.
    pub conforming: TypeId,
}

/// One destination slot of a tuple shuffle: where the value comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShuffleSource {
    /// Source tuple element by index.
    Argument(u32),
    /// No argument given; the callee's default for this parameter.
    DefaultArgument(u32),
    /// The listed source elements are collected into the variadic tail.
    Variadic(Vec<u32>),
}

/// An expression node kind.
#[derive(Clone, Debug)]
pub enum ExprKind {
    // ------------------------------------------------------------------
    // Surface forms
    // ------------------------------------------------------------------
    /// An integer literal, kept as source text until a type is chosen.
    IntegerLiteral(Atom),
    FloatLiteral(Atom),
    StringLiteral(Atom),
    BooleanLiteral(bool),
    NilLiteral,
    /// A reference to a uniquely resolved declaration.
    DeclRef(DeclId),
    /// A name that resolved to several candidate declarations; the solver
    /// picks one.
    OverloadedRef(Vec<DeclId>),
    /// An unresolved member access `base.name`.
    Member { base: ExprId, name: Atom },
    /// A call; `arg` is always a `Tuple` node.
    Call { callee: ExprId, arg: ExprId },
    /// A tuple literal; `labels` is parallel to `elements`.
    Tuple {
        elements: Vec<ExprId>,
        labels: Vec<Atom>,
    },
    Paren(ExprId),
    /// An explicit force-unwrap (`x!`). Also introduced implicitly by
    /// the rewriter for unwrapping member bases.
    ForceUnwrap(ExprId),

    // ------------------------------------------------------------------
    // Rewriter-introduced forms
    // ------------------------------------------------------------------
    /// Load an rvalue out of an lvalue reference.
    Load(ExprId),
    /// Upcast a class instance to a superclass type.
    DerivedToBase(ExprId),
    /// Wrap a value into one more level of optionality.
    InjectIntoOptional(ExprId),
    /// Bind one level of optionality inside an enclosing
    /// `OptionalEvaluation`; short-circuits to nil when the value is nil.
    BindOptional(ExprId),
    /// The boundary of a bind/inject chain produced by depth-changing
    /// optional coercions.
    OptionalEvaluation(ExprId),
    /// Reorder/expand a tuple to match a parameter list. `mapping` has
    /// one entry per destination slot: a source element, a callee-side
    /// default, or the source elements collected by the variadic
    /// injection call.
    TupleShuffle {
        sub: ExprId,
        mapping: Vec<ShuffleSource>,
    },
    /// Promote a scalar argument to a one-element tuple.
    ScalarToTuple { sub: ExprId, label: Atom },
    /// Erase a concrete value into an existential, carrying one
    /// conformance record per protocol in the destination.
    Erasure {
        sub: ExprId,
        conformances: Vec<ConformanceRef>,
    },
    /// A member reference resolved to a concrete declaration.
    MemberRef {
        base: ExprId,
        decl: DeclId,
        substitutions: Vec<(TypeId, TypeId)>,
    },
    /// A tuple element projection chosen by overload resolution.
    TupleElement { base: ExprId, index: u32 },
    /// An overloaded reference resolved to a concrete declaration with a
    /// generic substitution list and its conformance witnesses.
    SpecializedRef {
        decl: DeclId,
        /// (generic parameter type, concrete replacement) pairs.
        substitutions: Vec<(TypeId, TypeId)>,
        conformances: Vec<ConformanceRef>,
    },
    /// A literal converted to its concrete type. `witness` is the
    /// protocol initializer used, or `None` for a builtin construction.
    LiteralInit {
        literal: ExprId,
        witness: Option<DeclId>,
    },
    /// Placeholder for an expression that already produced a diagnostic.
    ErrorExpr,
}

/// An expression node: kind, type slot, and source span.
#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    /// `TypeId::ERROR` until the constraint-generation walk assigns an
    /// open type; after rewriting, the solved concrete type.
    pub ty: TypeId,
    pub span: Span,
}

/// Arena-based storage for expression nodes.
/// Nodes are stored contiguously and referenced by index.
#[derive(Debug, Default)]
pub struct ExprArena {
    pub exprs: Vec<Expr>,
}

impl ExprArena {
    pub fn new() -> ExprArena {
        ExprArena { exprs: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> ExprArena {
        ExprArena {
            exprs: Vec::with_capacity(capacity),
        }
    }

    /// Add a node to the arena and return its index.
    pub fn add(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let index = self.exprs.len() as u32;
        self.exprs.push(Expr {
            kind,
            ty: TypeId::ERROR,
            span,
        });
        ExprId(index)
    }

    /// Add an already-typed node (rewriter use).
    pub fn add_typed(&mut self, kind: ExprKind, ty: TypeId, span: Span) -> ExprId {
        let id = self.add(kind, span);
        self.exprs[id.0 as usize].ty = ty;
        id
    }

    /// Get a node by index.
    pub fn get(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }

    /// Get a mutable node by index.
    pub fn get_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.0 as usize]
    }

    /// The type currently assigned to a node.
    pub fn ty(&self, id: ExprId) -> TypeId {
        self.get(id).ty
    }

    pub fn set_ty(&mut self, id: ExprId, ty: TypeId) {
        self.get_mut(id).ty = ty;
    }

    pub fn span(&self, id: ExprId) -> Span {
        self.get(id).span
    }

    /// Replace a node's kind in place, keeping type and span.
    pub fn replace_kind(&mut self, id: ExprId, kind: ExprKind) -> ExprKind {
        std::mem::replace(&mut self.get_mut(id).kind, kind)
    }

    /// Get the number of nodes.
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    /// Check if the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}
