//! Constraint records.
//!
//! A constraint relates one or two types under a kind, tagged with the
//! locator it came from. Constraints live in the constraint system's
//! arena; their status tracks which worklist (if any) currently holds
//! them. Simplification is tri-state and never panics on user input.

use crate::decls::{DeclId, LiteralKind, ProtocolId};
use crate::interner::Atom;
use crate::solver::locator::LocatorId;
use crate::solver::types::TypeId;

/// Handle to a constraint in the system's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(pub u32);

/// How strictly two types must relate.
///
/// Ordered from strictest to loosest; matching at one kind permits
/// everything the stricter kinds permit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    /// Exact equality, including lvalue-ness.
    Bind,
    /// Equality of object types; lvalues convert to rvalues.
    Equal,
    /// Implicit subtyping: class upcast, existential erasure.
    Subtype,
    /// Full conversion: subtyping plus optional injection, tuple
    /// shuffles, scalar-to-tuple promotion.
    Conversion,
}

/// One of the ways an overloaded reference can resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverloadChoice {
    /// A concrete declaration.
    Decl(DeclId),
    /// A declaration found through a force-unwrapped optional base.
    DeclViaUnwrappedOptional(DeclId),
    /// Projection of a tuple element.
    TupleIndex(u32),
    /// The base type itself passes through unchanged.
    BaseType,
    /// A reference to a type declaration (metatype).
    TypeDecl(DeclId),
}

impl OverloadChoice {
    /// The declaration this choice refers to, if any.
    pub fn decl(&self) -> Option<DeclId> {
        match self {
            OverloadChoice::Decl(d)
            | OverloadChoice::DeclViaUnwrappedOptional(d)
            | OverloadChoice::TypeDecl(d) => Some(*d),
            OverloadChoice::TupleIndex(_) | OverloadChoice::BaseType => None,
        }
    }
}

/// The payload of a constraint.
#[derive(Clone, Debug)]
pub enum ConstraintKind {
    /// `left` relates to `right` under `kind`.
    Relation {
        kind: MatchKind,
        left: TypeId,
        right: TypeId,
    },
    /// `ty` conforms to `protocol`.
    ConformsTo { ty: TypeId, protocol: ProtocolId },
    /// `ty` is expressible by a literal of `literal` kind.
    LiteralConformsTo { ty: TypeId, literal: LiteralKind },
    /// `callee` can be applied to the argument tuple `arg`, producing
    /// `result`.
    ApplicableFunction {
        arg: TypeId,
        callee: TypeId,
        result: TypeId,
    },
    /// `base` has a member `name` of type `member`.
    ValueMember {
        base: TypeId,
        name: Atom,
        member: TypeId,
    },
    /// Bind `overload_ty` to the opened type of `choice`. Only ever
    /// appears nested inside a disjunction. `base` carries the concrete
    /// base type for member choices so self-substitution can apply.
    BindOverload {
        overload_ty: TypeId,
        choice: OverloadChoice,
        base: Option<TypeId>,
    },
    /// Exactly one of the nested constraints must hold.
    Disjunction { nested: Vec<ConstraintId> },
}

/// A constraint record.
#[derive(Clone, Debug)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub locator: LocatorId,
}

impl Constraint {
    pub fn is_disjunction(&self) -> bool {
        matches!(self.kind, ConstraintKind::Disjunction { .. })
    }
}

/// Where a constraint currently lives.
///
/// Every unresolved constraint is reachable from exactly one of the
/// active worklist, the inactive worklist, or a disjunction's nested
/// list; `Retired` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintStatus {
    Active,
    Inactive,
    /// Nested inside a disjunction; only activated when its branch is
    /// chosen.
    InDisjunction,
    Retired,
    Failed,
}

/// The tri-state outcome of one simplification attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimplifyResult {
    /// The constraint is satisfied and can be retired.
    Solved,
    /// Progress is blocked on an unbound type variable.
    Unsolved,
    /// The constraint is unsatisfiable; the enclosing solve attempt
    /// fails unless backtracking offers another branch.
    Error,
}
