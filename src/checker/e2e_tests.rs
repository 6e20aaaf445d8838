//! End-to-end scenarios: constraint generation through rewriting.

use crate::ast::{ExprArena, ExprKind};
use crate::checker::typecheck_expr;
use crate::decls::{GenericParamDecl, GenericSignature, Requirement};
use crate::diagnostics::{DiagnosticBag, codes};
use crate::interner::Atom;
use crate::solver::{ParamInfo, TypeId};
use crate::span::Span;
use crate::test_fixtures::fixture;

fn span() -> Span {
    Span::SYNTHESIZED
}

#[test]
fn test_out_of_range_literal_still_produces_typed_tree() {
    // `let x: Int8 = 300`: the value-range check is an external
    // collaborator; the core must still pick Int8 (destination-driven)
    // and produce a valid, fully typed tree.
    let f = fixture();
    let mut arena = ExprArena::new();
    let literal = arena.add(ExprKind::IntegerLiteral(f.atom("300")), span());
    let mut bag = DiagnosticBag::new();

    let root = typecheck_expr(
        &f.types,
        &f.decls,
        &f.names,
        None,
        &mut arena,
        literal,
        Some(TypeId::INT8),
        &mut bag,
    )
    .expect("the core typechecks the literal; overflow is diagnosed later");

    assert!(bag.is_empty());
    assert_eq!(arena.ty(root), TypeId::INT8);
}

#[test]
fn test_overload_selection_is_deterministic() {
    // `f(Int)` and `f(String)` called as `f(1)`: the Int overload wins,
    // and solving the same input twice picks it identically.
    let check = || {
        let mut f = fixture();
        let f_int = f.add_func("f", &[TypeId::INT], TypeId::VOID);
        let f_string = f.add_func("f", &[TypeId::STRING], TypeId::VOID);
        let mut arena = ExprArena::new();
        let callee = arena.add(ExprKind::OverloadedRef(vec![f_int, f_string]), span());
        let literal = arena.add(ExprKind::IntegerLiteral(f.atom("1")), span());
        let arg = arena.add(
            ExprKind::Tuple {
                elements: vec![literal],
                labels: vec![Atom::NONE],
            },
            span(),
        );
        let call = arena.add(ExprKind::Call { callee, arg }, span());
        let mut bag = DiagnosticBag::new();

        typecheck_expr(
            &f.types, &f.decls, &f.names, None, &mut arena, call, None, &mut bag,
        )
        .expect("typecheck succeeds");
        assert!(bag.is_empty());

        let ExprKind::SpecializedRef { decl, .. } = arena.get(callee).kind.clone() else {
            panic!("expected a resolved callee");
        };
        (decl, f_int)
    };

    let (first_choice, f_int) = check();
    assert_eq!(first_choice, f_int);
    let (second_choice, _) = check();
    assert_eq!(first_choice, second_choice);
}

#[test]
fn test_unsatisfied_generic_bound_fails_cleanly() {
    // `func f<T: Hashable>(T)` called with a non-conforming Foo: a
    // conformance contradiction, not a crash.
    let mut f = fixture();
    let foo = f.add_struct("Foo");
    let t_atom = f.atom("T");
    let t = f.types.generic_param(0, 0, t_atom);
    let fn_ty = f
        .types
        .function(vec![ParamInfo::new(Atom::NONE, t)], TypeId::VOID);
    let f_decl = f.add_generic_func(
        "f",
        fn_ty,
        GenericSignature {
            params: vec![GenericParamDecl {
                name: t_atom,
                depth: 0,
                index: 0,
            }],
            requirements: vec![Requirement::Conformance {
                subject: t,
                protocol: f.hashable,
            }],
        },
    );
    let foo_value = f.add_let("foo", f.types.nominal(foo));

    let mut arena = ExprArena::new();
    let callee = arena.add(ExprKind::DeclRef(f_decl), span());
    let foo_ref = arena.add(ExprKind::DeclRef(foo_value), span());
    let arg = arena.add(
        ExprKind::Tuple {
            elements: vec![foo_ref],
            labels: vec![Atom::NONE],
        },
        span(),
    );
    let call = arena.add(ExprKind::Call { callee, arg }, span());
    let mut bag = DiagnosticBag::new();

    let result = typecheck_expr(
        &f.types, &f.decls, &f.names, None, &mut arena, call, None, &mut bag,
    );

    assert!(result.is_err());
    assert_eq!(bag.error_count(), 1);
    let diagnostic = bag.iter().next().expect("one diagnostic");
    assert_eq!(diagnostic.code, codes::PROTOCOL_CONFORMANCE);
    assert!(diagnostic.message.contains("Foo"));
    assert!(diagnostic.message.contains("Hashable"));
    // Downstream passes can tell "already diagnosed" from "untyped".
    assert_eq!(arena.ty(call), TypeId::ERROR);
}

#[test]
fn test_satisfied_generic_bound_specializes() {
    // The same generic function applied to a conforming type records
    // the substitution and its conformance witness.
    let mut f = fixture();
    let t_atom = f.atom("T");
    let t = f.types.generic_param(0, 0, t_atom);
    let fn_ty = f.types.function(vec![ParamInfo::new(Atom::NONE, t)], t);
    let f_decl = f.add_generic_func(
        "identity",
        fn_ty,
        GenericSignature {
            params: vec![GenericParamDecl {
                name: t_atom,
                depth: 0,
                index: 0,
            }],
            requirements: vec![Requirement::Conformance {
                subject: t,
                protocol: f.hashable,
            }],
        },
    );

    let mut arena = ExprArena::new();
    let callee = arena.add(ExprKind::DeclRef(f_decl), span());
    let literal = arena.add(ExprKind::IntegerLiteral(f.atom("3")), span());
    let arg = arena.add(
        ExprKind::Tuple {
            elements: vec![literal],
            labels: vec![Atom::NONE],
        },
        span(),
    );
    let call = arena.add(ExprKind::Call { callee, arg }, span());
    let mut bag = DiagnosticBag::new();

    let root = typecheck_expr(
        &f.types, &f.decls, &f.names, None, &mut arena, call, None, &mut bag,
    )
    .expect("typecheck succeeds");

    assert!(bag.is_empty());
    assert_eq!(arena.ty(root), TypeId::INT);
}

#[test]
fn test_ambiguous_overloads_report_candidates() {
    let mut f = fixture();
    let f_one = f.add_func("f", &[TypeId::INT], TypeId::VOID);
    let f_two = f.add_func("f", &[TypeId::INT], TypeId::VOID);
    let mut arena = ExprArena::new();
    let callee = arena.add(ExprKind::OverloadedRef(vec![f_one, f_two]), span());
    let literal = arena.add(ExprKind::IntegerLiteral(f.atom("1")), span());
    let arg = arena.add(
        ExprKind::Tuple {
            elements: vec![literal],
            labels: vec![Atom::NONE],
        },
        span(),
    );
    let call = arena.add(ExprKind::Call { callee, arg }, span());
    let mut bag = DiagnosticBag::new();

    let result = typecheck_expr(
        &f.types, &f.decls, &f.names, None, &mut arena, call, None, &mut bag,
    );

    assert!(result.is_err());
    let diagnostic = bag.iter().next().expect("one diagnostic");
    assert_eq!(diagnostic.code, codes::AMBIGUOUS);
    assert_eq!(diagnostic.related.len(), 2, "both candidates are listed");
}

#[test]
fn test_optional_context_injects_literal() {
    // `let x: Int? = 1` wraps the converted literal in an injection.
    let f = fixture();
    let mut arena = ExprArena::new();
    let literal = arena.add(ExprKind::IntegerLiteral(f.atom("1")), span());
    let mut bag = DiagnosticBag::new();
    let target = f.types.optional(TypeId::INT);

    let root = typecheck_expr(
        &f.types,
        &f.decls,
        &f.names,
        None,
        &mut arena,
        literal,
        Some(target),
        &mut bag,
    )
    .expect("typecheck succeeds");

    assert!(bag.is_empty());
    assert_eq!(arena.ty(root), target);
    assert!(matches!(
        arena.get(root).kind,
        ExprKind::InjectIntoOptional(_)
    ));
}

#[test]
fn test_archetype_satisfies_conformance_inside_generic_body() {
    // Inside `func g<T: Hashable>(x: T)`, the body's `x` has the
    // archetype type for T; passing it to `f<U: Equatable>(U)` succeeds
    // because the archetype's conformance set implies Equatable.
    let mut f = fixture();
    let mut bag = DiagnosticBag::new();

    let t_atom = f.atom("T");
    let t = f.types.generic_param(0, 0, t_atom);
    let mut builder =
        crate::generics::ArchetypeBuilder::new(&f.types, &f.decls, &f.names);
    builder.add_generic_parameter(GenericParamDecl {
        name: t_atom,
        depth: 0,
        index: 0,
    });
    builder.add_requirement(
        &Requirement::Conformance {
            subject: t,
            protocol: f.hashable,
        },
        &mut bag,
    );
    let environment = builder.into_environment();
    let archetype = environment.archetype(t).expect("archetype for T");

    let u_atom = f.atom("U");
    let u = f.types.generic_param(0, 0, u_atom);
    let callee_ty = f
        .types
        .function(vec![ParamInfo::new(Atom::NONE, u)], TypeId::VOID);
    let callee_decl = f.add_generic_func(
        "takeEquatable",
        callee_ty,
        GenericSignature {
            params: vec![GenericParamDecl {
                name: u_atom,
                depth: 0,
                index: 0,
            }],
            requirements: vec![Requirement::Conformance {
                subject: u,
                protocol: f.equatable,
            }],
        },
    );
    let x_decl = f.add_let("x", archetype);

    let mut arena = ExprArena::new();
    let callee = arena.add(ExprKind::DeclRef(callee_decl), span());
    let x_ref = arena.add(ExprKind::DeclRef(x_decl), span());
    let arg = arena.add(
        ExprKind::Tuple {
            elements: vec![x_ref],
            labels: vec![Atom::NONE],
        },
        span(),
    );
    let call = arena.add(ExprKind::Call { callee, arg }, span());

    let root = typecheck_expr(
        &f.types,
        &f.decls,
        &f.names,
        Some(&environment),
        &mut arena,
        call,
        None,
        &mut bag,
    )
    .expect("the archetype's conformances satisfy the requirement");

    assert!(bag.is_empty());
    assert_eq!(arena.ty(root), TypeId::VOID);
    assert_eq!(arena.ty(x_ref), archetype);
}

#[test]
fn test_nil_requires_context() {
    let f = fixture();
    let mut arena = ExprArena::new();
    let nil = arena.add(ExprKind::NilLiteral, span());
    let mut bag = DiagnosticBag::new();

    let result = typecheck_expr(
        &f.types, &f.decls, &f.names, None, &mut arena, nil, None, &mut bag,
    );

    assert!(result.is_err());
    let diagnostic = bag.iter().next().expect("one diagnostic");
    assert_eq!(diagnostic.code, codes::UNRESOLVED_TYPE);
}

#[test]
fn test_nil_with_optional_context() {
    let f = fixture();
    let mut arena = ExprArena::new();
    let nil = arena.add(ExprKind::NilLiteral, span());
    let mut bag = DiagnosticBag::new();
    let target = f.types.optional(TypeId::STRING);

    let root = typecheck_expr(
        &f.types,
        &f.decls,
        &f.names,
        None,
        &mut arena,
        nil,
        Some(target),
        &mut bag,
    )
    .expect("typecheck succeeds");

    assert!(bag.is_empty());
    assert_eq!(arena.ty(root), target);
}

#[test]
fn test_explicit_unwraps_remove_optionality() {
    // `x!!` where x: Int?? reaches Int; the solver rejects the same
    // conversion without the unwraps.
    let mut f = fixture();
    let int2 = f.types.optional_depth(TypeId::INT, 2);
    let x = f.add_let("x", int2);

    let mut arena = ExprArena::new();
    let x_ref = arena.add(ExprKind::DeclRef(x), span());
    let once = arena.add(ExprKind::ForceUnwrap(x_ref), span());
    let twice = arena.add(ExprKind::ForceUnwrap(once), span());
    let mut bag = DiagnosticBag::new();

    let root = typecheck_expr(
        &f.types,
        &f.decls,
        &f.names,
        None,
        &mut arena,
        twice,
        Some(TypeId::INT),
        &mut bag,
    )
    .expect("explicit unwraps make the conversion legal");

    assert!(bag.is_empty());
    assert_eq!(arena.ty(root), TypeId::INT);
    assert_eq!(arena.ty(once), f.types.optional(TypeId::INT));
}

#[test]
fn test_type_mismatch_reports_both_types() {
    let mut f = fixture();
    let s = f.add_let("s", TypeId::STRING);
    let mut arena = ExprArena::new();
    let s_ref = arena.add(ExprKind::DeclRef(s), span());
    let mut bag = DiagnosticBag::new();

    let result = typecheck_expr(
        &f.types,
        &f.decls,
        &f.names,
        None,
        &mut arena,
        s_ref,
        Some(TypeId::INT),
        &mut bag,
    );

    assert!(result.is_err());
    let diagnostic = bag.iter().next().expect("one diagnostic");
    assert_eq!(diagnostic.code, codes::TYPE_MISMATCH);
    assert!(diagnostic.message.contains("String"));
    assert!(diagnostic.message.contains("Int"));
}

#[test]
fn test_no_such_member_diagnostic() {
    let mut f = fixture();
    let point = f.add_struct("Point");
    f.add_property(point, "x", TypeId::INT, false);
    let p = f.add_let("p", f.types.nominal(point));

    let mut arena = ExprArena::new();
    let base = arena.add(ExprKind::DeclRef(p), span());
    let member = arena.add(
        ExprKind::Member {
            base,
            name: f.atom("missing"),
        },
        span(),
    );
    let mut bag = DiagnosticBag::new();

    let result = typecheck_expr(
        &f.types, &f.decls, &f.names, None, &mut arena, member, None, &mut bag,
    );

    assert!(result.is_err());
    let diagnostic = bag.iter().next().expect("one diagnostic");
    assert_eq!(diagnostic.code, codes::NO_SUCH_MEMBER);
    assert!(diagnostic.message.contains("missing"));
}
