use super::*;
use crate::ast::ShuffleSource;
use crate::interner::Atom;

fn unlabeled(ty: TypeId) -> TupleElement {
    TupleElement::unlabeled(ty)
}

fn labeled(label: Atom, ty: TypeId) -> TupleElement {
    TupleElement::new(label, ty)
}

#[test]
fn test_identity_match() {
    let elements = [unlabeled(TypeId::INT), unlabeled(TypeId::STRING)];
    let params = [
        ParamInfo::new(Atom::NONE, TypeId::INT),
        ParamInfo::new(Atom::NONE, TypeId::STRING),
    ];

    let mapping = match_call_arguments(&elements, &params).unwrap();
    assert!(is_identity_mapping(&mapping, elements.len()));
}

#[test]
fn test_label_reorder_roundtrip() {
    // (Int, y: String) against (y: String, Int): reorder without loss.
    let y = Atom(40);
    let from = [unlabeled(TypeId::INT), labeled(y, TypeId::STRING)];
    let to = [labeled(y, TypeId::STRING), unlabeled(TypeId::INT)];

    let mapping = match_tuple_elements(&from, &to).unwrap();
    assert_eq!(
        mapping,
        vec![ShuffleSource::Argument(1), ShuffleSource::Argument(0)]
    );

    // Re-applying the mapping in the other direction recovers the
    // original order.
    let inverse = match_tuple_elements(&to, &from).unwrap();
    assert_eq!(
        inverse,
        vec![ShuffleSource::Argument(1), ShuffleSource::Argument(0)]
    );
    let mut recovered: Vec<usize> = vec![0; from.len()];
    for (dest, source) in inverse.iter().enumerate() {
        let ShuffleSource::Argument(i) = source else {
            panic!("unexpected non-argument source");
        };
        let ShuffleSource::Argument(original) = mapping[*i as usize] else {
            panic!("unexpected non-argument source");
        };
        recovered[dest] = original as usize;
    }
    assert_eq!(recovered, vec![0, 1]);
}

#[test]
fn test_defaulted_parameter() {
    let elements = [unlabeled(TypeId::INT)];
    let mut defaulted = ParamInfo::new(Atom::NONE, TypeId::STRING);
    defaulted.has_default = true;
    let params = [ParamInfo::new(Atom::NONE, TypeId::INT), defaulted];

    let mapping = match_call_arguments(&elements, &params).unwrap();
    assert_eq!(
        mapping,
        vec![ShuffleSource::Argument(0), ShuffleSource::DefaultArgument(1)]
    );
    assert!(!is_identity_mapping(&mapping, elements.len()));
}

#[test]
fn test_missing_argument() {
    let elements: [TupleElement; 0] = [];
    let params = [ParamInfo::new(Atom::NONE, TypeId::INT)];

    assert_eq!(
        match_call_arguments(&elements, &params),
        Err(ShuffleError::MissingArgument(0))
    );
}

#[test]
fn test_extra_argument() {
    let elements = [unlabeled(TypeId::INT), unlabeled(TypeId::INT)];
    let params = [ParamInfo::new(Atom::NONE, TypeId::INT)];

    assert_eq!(
        match_call_arguments(&elements, &params),
        Err(ShuffleError::ExtraArgument(1))
    );
}

#[test]
fn test_variadic_collection() {
    let elements = [
        unlabeled(TypeId::STRING),
        unlabeled(TypeId::INT),
        unlabeled(TypeId::INT),
    ];
    let mut variadic = ParamInfo::new(Atom::NONE, TypeId::INT);
    variadic.variadic = true;
    let params = [ParamInfo::new(Atom::NONE, TypeId::STRING), variadic];

    let mapping = match_call_arguments(&elements, &params).unwrap();
    assert_eq!(
        mapping,
        vec![
            ShuffleSource::Argument(0),
            ShuffleSource::Variadic(vec![1, 2]),
        ]
    );
}

#[test]
fn test_empty_variadic() {
    let mut variadic = ParamInfo::new(Atom::NONE, TypeId::INT);
    variadic.variadic = true;
    let params = [variadic];

    let mapping = match_call_arguments(&[], &params).unwrap();
    assert_eq!(mapping, vec![ShuffleSource::Variadic(vec![])]);
}

#[test]
fn test_label_mismatch_is_rejected() {
    let wrong = Atom(50);
    let elements = [labeled(wrong, TypeId::INT)];
    let params = [ParamInfo::new(Atom::NONE, TypeId::INT)];

    assert!(match_call_arguments(&elements, &params).is_err());
}
