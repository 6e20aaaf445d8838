use super::*;
use crate::interner::Atom;

#[test]
fn test_transform_replaces_generic_params() {
    let interner = TypeInterner::new();
    let t = interner.generic_param(0, 0, Atom(1));
    let pair = interner.tuple(vec![
        TupleElement::unlabeled(t),
        TupleElement::unlabeled(t),
    ]);

    let mut memo = FoldMemo::default();
    let result = transform_type(&interner, pair, &mut memo, &mut |id, key| match key {
        TypeKey::GenericParam(_) if id == t => Some(TypeId::INT),
        _ => None,
    });

    let expected = interner.tuple(vec![
        TupleElement::unlabeled(TypeId::INT),
        TupleElement::unlabeled(TypeId::INT),
    ]);
    assert_eq!(result, expected);
    // The shared subterm was computed once.
    assert_eq!(memo.get(&t), Some(&TypeId::INT));
}

#[test]
fn test_transform_unchanged_returns_same_id() {
    let interner = TypeInterner::new();
    let fn_ty = interner.function(
        vec![ParamInfo::new(Atom::NONE, TypeId::INT)],
        TypeId::STRING,
    );

    let mut memo = FoldMemo::default();
    let result = transform_type(&interner, fn_ty, &mut memo, &mut |_, _| None);
    assert_eq!(result, fn_ty);
}

#[test]
fn test_transform_rebuilds_nested_structure() {
    let interner = TypeInterner::new();
    let var = interner.variable(TypeVar(0));
    let optional_fn = interner.optional(interner.function(
        vec![ParamInfo::new(Atom::NONE, var)],
        var,
    ));

    let mut memo = FoldMemo::default();
    let result = transform_type(&interner, optional_fn, &mut memo, &mut |_, key| match key {
        TypeKey::Variable(_) => Some(TypeId::BOOL),
        _ => None,
    });

    let expected = interner.optional(interner.function(
        vec![ParamInfo::new(Atom::NONE, TypeId::BOOL)],
        TypeId::BOOL,
    ));
    assert_eq!(result, expected);
}

#[test]
fn test_collect_type_variables_dedupes() {
    let interner = TypeInterner::new();
    let v0 = interner.variable(TypeVar(0));
    let v1 = interner.variable(TypeVar(1));
    let tuple = interner.tuple(vec![
        TupleElement::unlabeled(v0),
        TupleElement::unlabeled(v1),
        TupleElement::unlabeled(v0),
    ]);

    let mut vars = Vec::new();
    collect_type_variables(&interner, tuple, &mut vars);
    assert_eq!(vars, vec![TypeVar(0), TypeVar(1)]);
}

#[test]
fn test_contains_type_variables() {
    let interner = TypeInterner::new();
    let concrete = interner.optional(TypeId::INT);
    assert!(!contains_type_variables(&interner, concrete));

    let open = interner.optional(interner.variable(TypeVar(3)));
    assert!(contains_type_variables(&interner, open));
}

#[test]
fn test_is_polymorphic() {
    let interner = TypeInterner::new();
    let param = interner.generic_param(0, 0, Atom(7));
    assert!(is_polymorphic(&interner, param));

    let dependent = interner.dependent_member(param, Atom(8));
    assert!(is_polymorphic(&interner, dependent));

    assert!(!is_polymorphic(&interner, TypeId::INT));
}
