use super::*;
use crate::interner::Atom;

#[test]
fn test_interner_intrinsics() {
    let interner = TypeInterner::new();

    // Intrinsics should be pre-registered
    assert!(matches!(
        interner.lookup(TypeId::INT),
        Some(TypeKey::Intrinsic(IntrinsicKind::Int))
    ));
    assert!(matches!(
        interner.lookup(TypeId::STRING),
        Some(TypeKey::Intrinsic(IntrinsicKind::String))
    ));
    assert!(matches!(interner.lookup(TypeId::ERROR), Some(TypeKey::Error)));
}

#[test]
fn test_void_is_empty_tuple() {
    let interner = TypeInterner::new();

    let void = interner.tuple(vec![]);
    assert_eq!(void, TypeId::VOID);
}

#[test]
fn test_interner_deduplication() {
    let interner = TypeInterner::new();

    let pair1 = interner.tuple(vec![
        TupleElement::unlabeled(TypeId::INT),
        TupleElement::unlabeled(TypeId::STRING),
    ]);
    let pair2 = interner.tuple(vec![
        TupleElement::unlabeled(TypeId::INT),
        TupleElement::unlabeled(TypeId::STRING),
    ]);
    let swapped = interner.tuple(vec![
        TupleElement::unlabeled(TypeId::STRING),
        TupleElement::unlabeled(TypeId::INT),
    ]);

    assert_eq!(pair1, pair2);
    assert_ne!(pair1, swapped);
}

#[test]
fn test_tuple_labels_distinguish() {
    let interner = TypeInterner::new();
    let label = Atom(42);

    let unlabeled = interner.tuple(vec![
        TupleElement::unlabeled(TypeId::INT),
        TupleElement::unlabeled(TypeId::INT),
    ]);
    let labeled = interner.tuple(vec![
        TupleElement::new(label, TypeId::INT),
        TupleElement::unlabeled(TypeId::INT),
    ]);

    assert_ne!(unlabeled, labeled);
}

#[test]
fn test_function_shape_roundtrip() {
    let interner = TypeInterner::new();

    let fn_ty = interner.function(
        vec![ParamInfo::new(Atom::NONE, TypeId::INT)],
        TypeId::BOOL,
    );
    let Some(TypeKey::Function(shape_id)) = interner.lookup(fn_ty) else {
        panic!("expected a function key");
    };
    let shape = interner.function_shape(shape_id);
    assert_eq!(shape.params.len(), 1);
    assert_eq!(shape.params[0].ty, TypeId::INT);
    assert_eq!(shape.result, TypeId::BOOL);

    let again = interner.function(
        vec![ParamInfo::new(Atom::NONE, TypeId::INT)],
        TypeId::BOOL,
    );
    assert_eq!(fn_ty, again);
}

#[test]
fn test_existential_canonicalization() {
    let interner = TypeInterner::new();
    let p = crate::decls::ProtocolId(0);
    let q = crate::decls::ProtocolId(1);

    // Order-insensitive and deduplicated
    let a = interner.existential(vec![q, p, q]);
    let b = interner.existential(vec![p, q]);
    assert_eq!(a, b);

    // Single member collapses to the plain protocol type
    let single = interner.existential(vec![p]);
    assert_eq!(single, interner.protocol(p));
}

#[test]
fn test_optional_depth_of() {
    let interner = TypeInterner::new();

    let int2 = interner.optional_depth(TypeId::INT, 2);
    let (depth, payload) = interner.optional_depth_of(int2);
    assert_eq!(depth, 2);
    assert_eq!(payload, TypeId::INT);

    let (zero, same) = interner.optional_depth_of(TypeId::INT);
    assert_eq!(zero, 0);
    assert_eq!(same, TypeId::INT);
}

#[test]
fn test_rvalue_strips_lvalue() {
    let interner = TypeInterner::new();

    let lvalue = interner.lvalue(TypeId::INT);
    assert_eq!(interner.rvalue(lvalue), TypeId::INT);
    assert_eq!(interner.rvalue(TypeId::INT), TypeId::INT);
}

#[test]
fn test_archetypes_have_identity() {
    let interner = TypeInterner::new();
    let data = ArchetypeData {
        name: Atom(1),
        parent: None,
        conforms_to: vec![],
        superclass: None,
    };

    let a = interner.archetype(data.clone());
    let b = interner.archetype(data);
    assert_ne!(a, b, "each archetype allocation is a distinct type");
}
