use super::*;
use crate::decls::{GenericParamDecl, GenericSignature, Requirement};
use crate::test_fixtures::fixture;

fn root_locator(system: &mut ConstraintSystem<'_>) -> LocatorId {
    system.locators.for_expr(crate::ast::ExprId(0))
}

fn fresh_var(system: &mut ConstraintSystem<'_>) -> TypeVar {
    let locator = root_locator(system);
    let ty = system.create_type_var(locator, TypeVarOptions::empty());
    match system.interner().lookup(ty) {
        Some(TypeKey::Variable(var)) => var,
        _ => panic!("create_type_var did not produce a variable type"),
    }
}

#[test]
fn test_union_find_idempotent_and_transitive() {
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    root_locator(&mut system);

    let v1 = fresh_var(&mut system);
    let v2 = fresh_var(&mut system);
    let v3 = fresh_var(&mut system);

    system.merge_equivalence_classes(v1, v2);
    system.merge_equivalence_classes(v2, v3);

    // rep(rep(v)) == rep(v)
    let rep = system.representative(v1);
    assert_eq!(system.representative(rep), rep);

    // merged chains share one representative
    assert_eq!(system.representative(v1), system.representative(v3));
    assert_eq!(system.representative(v2), system.representative(v3));
}

#[test]
fn test_assign_fixed_type_resolves() {
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    root_locator(&mut system);

    let v1 = fresh_var(&mut system);
    let v2 = fresh_var(&mut system);
    system.merge_equivalence_classes(v1, v2);
    system.assign_fixed_type(v1, TypeId::INT);

    // Both class members resolve through the representative.
    let v2_ty = f.types.variable(v2);
    assert_eq!(system.resolve_shallow(v2_ty), TypeId::INT);
}

#[test]
fn test_resolve_type_fully_substitutes_nested() {
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    root_locator(&mut system);

    let v1 = fresh_var(&mut system);
    let v2 = fresh_var(&mut system);
    // v1 := (v2,); v2 := Int — nested substitution must reach a fixed
    // point.
    let tuple = f
        .types
        .tuple(vec![TupleElement::unlabeled(f.types.variable(v2))]);
    system.assign_fixed_type(v1, tuple);
    system.assign_fixed_type(v2, TypeId::INT);

    let resolved = system.resolve_type_fully(f.types.variable(v1));
    let expected = f.types.tuple(vec![TupleElement::unlabeled(TypeId::INT)]);
    assert_eq!(resolved, expected);
}

#[test]
fn test_occurs_check_rejects_cycles() {
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    root_locator(&mut system);

    let v1 = fresh_var(&mut system);
    let containing = f
        .types
        .tuple(vec![TupleElement::unlabeled(f.types.variable(v1))]);
    assert!(system.occurs_in(v1, containing));
    assert!(!system.occurs_in(v1, TypeId::INT));
}

#[test]
fn test_open_type_replaces_generic_params() {
    let mut f = fixture();
    let t_atom = f.atom("T");
    let t = f.types.generic_param(0, 0, t_atom);
    let fn_ty = f.types.function(
        vec![ParamInfo::new(crate::interner::Atom::NONE, t)],
        t,
    );
    let signature = GenericSignature {
        params: vec![GenericParamDecl {
            name: t_atom,
            depth: 0,
            index: 0,
        }],
        requirements: vec![Requirement::Conformance {
            subject: t,
            protocol: f.hashable,
        }],
    };

    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    let locator = root_locator(&mut system);
    let opened = system.open_type(fn_ty, Some(&signature), locator);

    assert_eq!(opened.substitutions.len(), 1);
    let (param, var_ty) = opened.substitutions[0];
    assert_eq!(param, t);
    assert!(matches!(
        f.types.lookup(var_ty),
        Some(TypeKey::Variable(_))
    ));
    // The opened function mentions the fresh variable, not the
    // parameter.
    assert!(!crate::solver::is_polymorphic(&f.types, opened.ty));
    assert!(crate::solver::contains_type_variables(&f.types, opened.ty));

    // Binding the fresh variable to a conforming type discharges the
    // requirement that opening filed.
    let Some(TypeKey::Variable(var)) = f.types.lookup(var_ty) else {
        panic!("expected variable");
    };
    system.assign_fixed_type(var, TypeId::INT);
    assert!(run_to_quiescence(&mut system));
}

#[test]
fn test_open_type_conformance_failure_is_recorded() {
    let mut f = fixture();
    let foo = f.add_struct("Foo");
    let t_atom = f.atom("T");
    let t = f.types.generic_param(0, 0, t_atom);
    let signature = GenericSignature {
        params: vec![GenericParamDecl {
            name: t_atom,
            depth: 0,
            index: 0,
        }],
        requirements: vec![Requirement::Conformance {
            subject: t,
            protocol: f.hashable,
        }],
    };

    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    let locator = root_locator(&mut system);
    let opened = system.open_type(t, Some(&signature), locator);

    let Some(TypeKey::Variable(var)) = f.types.lookup(opened.ty) else {
        panic!("expected the opened parameter to be a variable");
    };
    // Foo does not conform to Hashable.
    system.assign_fixed_type(var, f.types.nominal(foo));
    assert!(!run_to_quiescence(&mut system));
    assert!(system.has_failure());
}

#[test]
fn test_dependent_member_opening_is_memoized() {
    let mut f = fixture();
    let t_atom = f.atom("T");
    let element = f.atom("Element");
    let t = f.types.generic_param(0, 0, t_atom);
    let t_element = f.types.dependent_member(t, element);
    let pair = f.types.tuple(vec![
        TupleElement::unlabeled(t_element),
        TupleElement::unlabeled(t_element),
    ]);
    let signature = GenericSignature {
        params: vec![GenericParamDecl {
            name: t_atom,
            depth: 0,
            index: 0,
        }],
        requirements: vec![],
    };

    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    let locator = root_locator(&mut system);
    let opened = system.open_type(pair, Some(&signature), locator);

    let Some(TypeKey::Tuple(list)) = f.types.lookup(opened.ty) else {
        panic!("expected a tuple");
    };
    let elements = f.types.tuple_list(list);
    // Repeated access to T.Element yields the same variable.
    assert_eq!(elements[0].ty, elements[1].ty);
    assert!(matches!(
        f.types.lookup(elements[0].ty),
        Some(TypeKey::Variable(_))
    ));
}

#[test]
fn test_checkpoint_restore_rewinds_bindings() {
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    root_locator(&mut system);

    let v1 = fresh_var(&mut system);
    system.assign_fixed_type(v1, TypeId::INT);

    let checkpoint = system.checkpoint();
    let v2 = fresh_var(&mut system);
    system.assign_fixed_type(v2, TypeId::STRING);
    system.merge_equivalence_classes(v1, v1);

    system.restore(checkpoint);

    // The pre-checkpoint binding survives; the post-checkpoint variable
    // and its binding are gone.
    assert_eq!(system.fixed_binding(v1), Some(TypeId::INT));
    assert_eq!(system.var_count(), 1);
}

#[test]
fn test_optional_to_scalar_conversion_is_rejected() {
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    let locator = root_locator(&mut system);

    let int2 = f.types.optional_depth(TypeId::INT, 2);
    system.add_constraint(
        ConstraintKind::Relation {
            kind: MatchKind::Conversion,
            left: int2,
            right: TypeId::INT,
        },
        locator,
    );
    assert!(system.has_failure());
}

#[test]
fn test_trivial_bind_retires_immediately() {
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    let locator = root_locator(&mut system);

    system.add_constraint(
        ConstraintKind::Relation {
            kind: MatchKind::Bind,
            left: TypeId::INT,
            right: TypeId::INT,
        },
        locator,
    );
    assert!(!system.has_failure());
}

/// Drive the worklist by hand; true if the system stayed consistent.
fn run_to_quiescence(system: &mut ConstraintSystem<'_>) -> bool {
    system.run_simplify_worklist()
}
