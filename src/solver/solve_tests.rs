use super::*;
use crate::decls::LiteralKind;
use crate::test_fixtures::fixture;

fn root_locator(system: &mut ConstraintSystem<'_>) -> LocatorId {
    system.locators.for_expr(crate::ast::ExprId(0))
}

#[test]
fn test_literal_defaults_to_int() {
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    let locator = root_locator(&mut system);

    let literal = system.create_literal_var(locator, LiteralKind::Integer);
    system.add_constraint(
        ConstraintKind::LiteralConformsTo {
            ty: literal,
            literal: LiteralKind::Integer,
        },
        locator,
    );

    let SolveOutcome::Success(solution) = system.solve() else {
        panic!("expected a unique solution");
    };
    assert_eq!(solution.bindings.get(&TypeVar(0)), Some(&TypeId::INT));
    assert!(solution.score.is_zero(), "the default type costs nothing");
}

#[test]
fn test_destination_drives_literal_type() {
    // A conversion to Int8 beats the Int default: Int does not convert
    // to Int8, so the only complete solution binds the literal to Int8
    // at a non-default-literal penalty.
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    let locator = root_locator(&mut system);

    let literal = system.create_literal_var(locator, LiteralKind::Integer);
    system.add_constraint(
        ConstraintKind::LiteralConformsTo {
            ty: literal,
            literal: LiteralKind::Integer,
        },
        locator,
    );
    system.add_constraint(
        ConstraintKind::Relation {
            kind: MatchKind::Conversion,
            left: literal,
            right: TypeId::INT8,
        },
        locator,
    );

    let SolveOutcome::Success(solution) = system.solve() else {
        panic!("expected a unique solution");
    };
    assert_eq!(solution.bindings.get(&TypeVar(0)), Some(&TypeId::INT8));
    let mut expected = Score::zero();
    expected.increase(ScoreKind::NonDefaultLiteral);
    assert_eq!(solution.score, expected);
}

#[test]
fn test_value_to_optional_injection_scores() {
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    let locator = root_locator(&mut system);

    let literal = system.create_literal_var(locator, LiteralKind::Integer);
    system.add_constraint(
        ConstraintKind::LiteralConformsTo {
            ty: literal,
            literal: LiteralKind::Integer,
        },
        locator,
    );
    system.add_constraint(
        ConstraintKind::Relation {
            kind: MatchKind::Conversion,
            left: literal,
            right: f.types.optional(TypeId::INT),
        },
        locator,
    );

    let SolveOutcome::Success(solution) = system.solve() else {
        panic!("expected a unique solution");
    };
    // Int (the default) converts into Int? with one injection; binding
    // straight to Int? fails the literal conformance, so the injection
    // path is the unique solution.
    assert_eq!(solution.bindings.get(&TypeVar(0)), Some(&TypeId::INT));
    let mut expected = Score::zero();
    expected.increase(ScoreKind::ValueToOptional);
    assert_eq!(solution.score, expected);
}

#[test]
fn test_unresolved_variable_fails() {
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    let locator = root_locator(&mut system);

    // A variable with no relational constraints and no literal default
    // cannot be inferred.
    system.create_type_var(locator, TypeVarOptions::empty());
    match system.solve() {
        SolveOutcome::Failure(SolveFailure::Unresolved(_)) => {}
        other => panic!("expected an unresolved failure, got {:?}", other),
    }
}

#[test]
fn test_contradiction_reports_first_failure() {
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    let locator = root_locator(&mut system);

    system.add_constraint(
        ConstraintKind::Relation {
            kind: MatchKind::Conversion,
            left: TypeId::STRING,
            right: TypeId::INT,
        },
        locator,
    );

    match system.solve() {
        SolveOutcome::Failure(SolveFailure::Constraint(record)) => {
            assert_eq!(record.resolved, (TypeId::STRING, TypeId::INT));
        }
        other => panic!("expected a constraint failure, got {:?}", other),
    }
}

#[test]
fn test_disjunction_picks_surviving_branch() {
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    let locator = root_locator(&mut system);

    let var = system.create_type_var(locator, TypeVarOptions::empty());
    // var == String fails the later Int constraint; var == Int survives.
    system.add_disjunction(
        vec![
            ConstraintKind::Relation {
                kind: MatchKind::Bind,
                left: var,
                right: TypeId::STRING,
            },
            ConstraintKind::Relation {
                kind: MatchKind::Bind,
                left: var,
                right: TypeId::INT,
            },
        ],
        locator,
    );
    system.add_constraint(
        ConstraintKind::Relation {
            kind: MatchKind::Subtype,
            left: var,
            right: TypeId::INT,
        },
        locator,
    );

    let SolveOutcome::Success(solution) = system.solve() else {
        panic!("expected a unique solution");
    };
    assert_eq!(solution.bindings.get(&TypeVar(0)), Some(&TypeId::INT));
    assert_eq!(solution.disjunction_choices.get(&locator), Some(&1));
}

#[test]
fn test_tied_solutions_are_ambiguous() {
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    let locator = root_locator(&mut system);

    let var = system.create_type_var(locator, TypeVarOptions::empty());
    // Both branches complete with a zero score and different bindings.
    system.add_disjunction(
        vec![
            ConstraintKind::Relation {
                kind: MatchKind::Bind,
                left: var,
                right: TypeId::STRING,
            },
            ConstraintKind::Relation {
                kind: MatchKind::Bind,
                left: var,
                right: TypeId::INT,
            },
        ],
        locator,
    );

    match system.solve() {
        SolveOutcome::Ambiguous(solutions) => assert_eq!(solutions.len(), 2),
        other => panic!("expected ambiguity, got {:?}", other),
    }
}

#[test]
fn test_equal_solutions_along_different_paths_deduplicate() {
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    let locator = root_locator(&mut system);

    let var = system.create_type_var(locator, TypeVarOptions::empty());
    // Both branches bind var to the same type; one solution, not an
    // ambiguity.
    system.add_disjunction(
        vec![
            ConstraintKind::Relation {
                kind: MatchKind::Bind,
                left: var,
                right: TypeId::INT,
            },
            ConstraintKind::Relation {
                kind: MatchKind::Equal,
                left: var,
                right: TypeId::INT,
            },
        ],
        locator,
    );

    match system.solve() {
        SolveOutcome::Success(solution) => {
            assert_eq!(solution.bindings.get(&TypeVar(0)), Some(&TypeId::INT));
        }
        other => panic!("expected deduplicated success, got {:?}", other),
    }
}

#[test]
fn test_determinism_across_runs() {
    // Solving the same input twice yields identical bindings, choices
    // and scores.
    let run = || {
        let f = fixture();
        let mut system = ConstraintSystem::new(&f.types, &f.decls);
        let locator = root_locator(&mut system);
        let literal = system.create_literal_var(locator, LiteralKind::Integer);
        system.add_constraint(
            ConstraintKind::LiteralConformsTo {
                ty: literal,
                literal: LiteralKind::Integer,
            },
            locator,
        );
        system.add_constraint(
            ConstraintKind::Relation {
                kind: MatchKind::Conversion,
                left: literal,
                right: TypeId::INT64,
            },
            locator,
        );
        match system.solve() {
            SolveOutcome::Success(solution) => solution,
            other => panic!("expected success, got {:?}", other),
        }
    };

    let first = run();
    let second = run();
    assert!(first.same_as(&second));
    assert_eq!(first.score, second.score);
    assert_eq!(first.bindings, second.bindings);
}

#[test]
fn test_fix_mode_recovers_from_missing_unwrap() {
    // In diagnostic mode the solver records a force-unwrap fix instead
    // of failing the conversion outright.
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    system.set_allow_fixes(true);
    let locator = root_locator(&mut system);

    system.add_constraint(
        ConstraintKind::Relation {
            kind: MatchKind::Conversion,
            left: f.types.optional(TypeId::INT),
            right: TypeId::INT,
        },
        locator,
    );

    let SolveOutcome::Success(solution) = system.solve() else {
        panic!("fix mode keeps the solve alive");
    };
    assert_eq!(solution.fixes.len(), 1);
    assert_eq!(solution.fixes[0].kind, FixKind::ForceOptional);
}

#[test]
fn test_deep_disjunction_nesting_is_too_complex() {
    let f = fixture();
    let mut system = ConstraintSystem::new(&f.types, &f.decls);
    let locator = root_locator(&mut system);

    // More stacked decision points than the recursion ceiling allows.
    for _ in 0..(crate::limits::MAX_DISJUNCTION_DEPTH + 2) {
        let var = system.create_type_var(locator, TypeVarOptions::empty());
        system.add_disjunction(
            vec![
                ConstraintKind::Relation {
                    kind: MatchKind::Bind,
                    left: var,
                    right: TypeId::INT,
                },
                ConstraintKind::Relation {
                    kind: MatchKind::Bind,
                    left: var,
                    right: TypeId::INT,
                },
            ],
            locator,
        );
    }

    match system.solve() {
        SolveOutcome::TooComplex => {}
        other => panic!("expected complexity overflow, got {:?}", other),
    }
}
