//! Constraint locators.
//!
//! A locator names a position inside the expression being checked: an
//! anchor node plus a path of structural steps. Locators tag constraints
//! for diagnostics and key the recorded overload choices. They are
//! hash-consed: two locators with equal (anchor, path) share one id, so
//! equality is an integer comparison.

use crate::ast::ExprId;
use crate::interner::Atom;
use rustc_hash::FxHashMap;

/// Handle to an interned locator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocatorId(pub u32);

/// One structural step of a locator path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathElem {
    /// The n-th argument of a call.
    ApplyArgument(u32),
    /// The callee of a call.
    ApplyFunction,
    /// The result type of a call.
    FunctionResult,
    /// The n-th element of a tuple.
    TupleElement(u32),
    /// A member access by name.
    Member(Atom),
    /// The n-th opened generic parameter of a reference.
    GenericParameter(u32),
    /// The conformance requirement attached to a literal.
    LiteralConformance,
    /// The payload of an optional.
    OptionalPayload,
    /// A requirement emitted while opening a generic signature.
    Requirement(u32),
}

/// An interned locator: anchor expression plus structural path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Locator {
    pub anchor: ExprId,
    pub path: Vec<PathElem>,
}

/// Hash-consing table for locators, owned by one constraint system.
#[derive(Default)]
pub struct LocatorTable {
    locators: Vec<Locator>,
    map: FxHashMap<Locator, LocatorId>,
}

impl LocatorTable {
    pub fn new() -> LocatorTable {
        LocatorTable::default()
    }

    /// Intern a locator. Idempotent: equal (anchor, path) pairs return
    /// the same id.
    pub fn intern(&mut self, anchor: ExprId, path: Vec<PathElem>) -> LocatorId {
        let locator = Locator { anchor, path };
        if let Some(&id) = self.map.get(&locator) {
            return id;
        }
        let id = LocatorId(self.locators.len() as u32);
        self.locators.push(locator.clone());
        self.map.insert(locator, id);
        id
    }

    /// Intern the locator for an expression itself (empty path).
    pub fn for_expr(&mut self, anchor: ExprId) -> LocatorId {
        self.intern(anchor, Vec::new())
    }

    /// Intern the locator formed by appending `elem` to an existing one.
    pub fn extend(&mut self, base: LocatorId, elem: PathElem) -> LocatorId {
        let locator = self.get(base);
        let anchor = locator.anchor;
        let mut path = locator.path.clone();
        path.push(elem);
        self.intern(anchor, path)
    }

    pub fn get(&self, id: LocatorId) -> &Locator {
        &self.locators[id.0 as usize]
    }

    /// Look up an already-interned locator without creating it.
    pub fn find(&self, anchor: ExprId, path: &[PathElem]) -> Option<LocatorId> {
        let locator = Locator {
            anchor,
            path: path.to_vec(),
        };
        self.map.get(&locator).copied()
    }

    /// The anchor expression of a locator.
    pub fn anchor(&self, id: LocatorId) -> ExprId {
        self.locators[id.0 as usize].anchor
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}
