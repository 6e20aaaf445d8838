use crate::ast::{ExprArena, ExprId, ExprKind, ShuffleSource};
use crate::checker::ExprRewriter;
use crate::interner::Atom;
use crate::solver::{LocatorTable, Solution, TupleElement, TypeId};
use crate::span::Span;
use crate::test_fixtures::{Fixture, fixture};

struct Harness {
    arena: ExprArena,
    solution: Solution,
    locators: LocatorTable,
}

impl Harness {
    fn new() -> Harness {
        Harness {
            arena: ExprArena::new(),
            solution: Solution::default(),
            locators: LocatorTable::new(),
        }
    }

    fn rewriter<'a>(&'a mut self, f: &'a Fixture) -> ExprRewriter<'a> {
        ExprRewriter::new(
            &f.types,
            &f.decls,
            &mut self.arena,
            &self.solution,
            &self.locators,
        )
    }

    fn value(&mut self, ty: TypeId) -> ExprId {
        self.arena
            .add_typed(ExprKind::ErrorExpr, ty, Span::SYNTHESIZED)
    }
}

#[test]
fn test_identity_coercion_is_noop() {
    let f = fixture();
    let mut h = Harness::new();
    let expr = h.value(TypeId::INT);
    let before = h.arena.len();

    let mut rewriter = h.rewriter(&f);
    let result = rewriter.coerce_to_type(expr, TypeId::INT);

    assert_eq!(result, expr);
    assert_eq!(h.arena.len(), before, "identity coercion allocates nothing");
}

#[test]
fn test_optional_depth_inserts_exactly_one_injection() {
    // Int?? to Int??? inserts exactly one injection.
    let f = fixture();
    let int2 = f.types.optional_depth(TypeId::INT, 2);
    let int3 = f.types.optional_depth(TypeId::INT, 3);
    let mut h = Harness::new();
    let expr = h.value(int2);

    let mut rewriter = h.rewriter(&f);
    let result = rewriter.coerce_to_type(expr, int3);

    assert_eq!(h.arena.ty(result), int3);
    let ExprKind::InjectIntoOptional(inner) = h.arena.get(result).kind.clone() else {
        panic!("expected an injection at the top");
    };
    assert_eq!(inner, expr, "exactly one injection was inserted");
}

#[test]
fn test_same_depth_optional_is_noop() {
    let f = fixture();
    let int1 = f.types.optional(TypeId::INT);
    let mut h = Harness::new();
    let expr = h.value(int1);
    let before = h.arena.len();

    let mut rewriter = h.rewriter(&f);
    let result = rewriter.coerce_to_type(expr, int1);

    assert_eq!(result, expr);
    assert_eq!(h.arena.len(), before);
}

#[test]
fn test_value_to_optional_converts_then_injects() {
    let f = fixture();
    let mut h = Harness::new();
    let expr = h.value(TypeId::INT);

    let mut rewriter = h.rewriter(&f);
    let result = rewriter.coerce_to_type(expr, f.types.optional(TypeId::INT));

    let ExprKind::InjectIntoOptional(inner) = h.arena.get(result).kind.clone() else {
        panic!("expected an injection");
    };
    assert_eq!(inner, expr);
}

#[test]
fn test_load_from_lvalue() {
    let f = fixture();
    let mut h = Harness::new();
    let expr = h.value(f.types.lvalue(TypeId::INT));

    let mut rewriter = h.rewriter(&f);
    let result = rewriter.coerce_to_type(expr, TypeId::INT);

    let ExprKind::Load(inner) = h.arena.get(result).kind.clone() else {
        panic!("expected a load");
    };
    assert_eq!(inner, expr);
    assert_eq!(h.arena.ty(result), TypeId::INT);
}

#[test]
fn test_erasure_carries_conformances() {
    let f = fixture();
    let target = f.types.protocol(f.hashable);
    let mut h = Harness::new();
    let expr = h.value(TypeId::INT);

    let mut rewriter = h.rewriter(&f);
    let result = rewriter.coerce_to_type(expr, target);

    let ExprKind::Erasure { sub, conformances } = h.arena.get(result).kind.clone() else {
        panic!("expected an erasure");
    };
    assert_eq!(sub, expr);
    assert_eq!(conformances.len(), 1);
    assert_eq!(conformances[0].protocol, f.hashable);
    assert_eq!(conformances[0].conforming, TypeId::INT);
}

#[test]
fn test_class_upcast() {
    let mut f = fixture();
    let base = f.add_class("View", None);
    let derived = f.add_class("Button", Some(base));
    let mut h = Harness::new();
    let expr = h.value(f.types.nominal(derived));

    let mut rewriter = h.rewriter(&f);
    let result = rewriter.coerce_to_type(expr, f.types.nominal(base));

    assert!(matches!(
        h.arena.get(result).kind,
        ExprKind::DerivedToBase(_)
    ));
    assert_eq!(h.arena.ty(result), f.types.nominal(base));
}

#[test]
fn test_tuple_shuffle_reorders_by_label() {
    let f = fixture();
    let y = f.atom("y");
    let from = f.types.tuple(vec![
        TupleElement::unlabeled(TypeId::INT),
        TupleElement::new(y, TypeId::STRING),
    ]);
    let to = f.types.tuple(vec![
        TupleElement::new(y, TypeId::STRING),
        TupleElement::unlabeled(TypeId::INT),
    ]);

    let mut h = Harness::new();
    let first = h.value(TypeId::INT);
    let second = h.value(TypeId::STRING);
    let tuple = h.arena.add_typed(
        ExprKind::Tuple {
            elements: vec![first, second],
            labels: vec![Atom::NONE, y],
        },
        from,
        Span::SYNTHESIZED,
    );

    let mut rewriter = h.rewriter(&f);
    let result = rewriter.coerce_to_type(tuple, to);

    let ExprKind::TupleShuffle { sub, mapping } = h.arena.get(result).kind.clone() else {
        panic!("expected a tuple shuffle");
    };
    assert_eq!(sub, tuple);
    assert_eq!(
        mapping,
        vec![ShuffleSource::Argument(1), ShuffleSource::Argument(0)]
    );
    assert_eq!(h.arena.ty(result), to);
}

#[test]
fn test_scalar_to_tuple_promotion() {
    let f = fixture();
    let label = f.atom("count");
    let target = f
        .types
        .tuple(vec![TupleElement::new(label, TypeId::INT)]);
    let mut h = Harness::new();
    let expr = h.value(TypeId::INT);

    let mut rewriter = h.rewriter(&f);
    let result = rewriter.coerce_to_type(expr, target);

    let ExprKind::ScalarToTuple { sub, label: found } = h.arena.get(result).kind.clone() else {
        panic!("expected a scalar-to-tuple promotion");
    };
    assert_eq!(sub, expr);
    assert_eq!(found, label);
    assert_eq!(h.arena.ty(result), target);
}

#[test]
fn test_payload_conversion_uses_bind_chain() {
    // Int? to Hashable? converts the payload under a bind/inject chain
    // bounded by an optional evaluation.
    let f = fixture();
    let from = f.types.optional(TypeId::INT);
    let to = f.types.optional(f.types.protocol(f.hashable));
    let mut h = Harness::new();
    let expr = h.value(from);

    let mut rewriter = h.rewriter(&f);
    let result = rewriter.coerce_to_type(expr, to);

    assert_eq!(h.arena.ty(result), to);
    let ExprKind::OptionalEvaluation(inner) = h.arena.get(result).kind.clone() else {
        panic!("expected an optional evaluation boundary");
    };
    let ExprKind::InjectIntoOptional(erased) = h.arena.get(inner).kind.clone() else {
        panic!("expected an injection under the evaluation");
    };
    assert!(matches!(
        h.arena.get(erased).kind,
        ExprKind::Erasure { .. }
    ));
}
