//! Shared test fixtures.
//!
//! One standard declaration table per test: the literal protocols with
//! their default types, builtin conformances for the intrinsics, and the
//! usual protocol ladder (Hashable inherits Equatable). Tests build
//! their own functions and nominals on top.

use crate::decls::{
    Decl, DeclId, DeclKind, DeclTable, FuncDecl, GenericSignature, LiteralKind, NominalDecl,
    NominalKind, ProtocolDecl, ProtocolId, VarDecl,
};
use crate::interner::{Atom, Interner};
use crate::solver::{ParamInfo, TypeId, TypeInterner};
use crate::span::Span;

pub struct Fixture {
    pub types: TypeInterner,
    pub names: Interner,
    pub decls: DeclTable,
    pub equatable: ProtocolId,
    pub hashable: ProtocolId,
    pub comparable: ProtocolId,
}

/// Build the standard environment used across solver and checker tests.
pub fn fixture() -> Fixture {
    let types = TypeInterner::new();
    let names = Interner::new();
    let mut decls = DeclTable::new();
    let module = names.intern("Aster");

    let protocol = |names: &Interner, name: &str, inherited: Vec<ProtocolId>| ProtocolDecl {
        name: names.intern(name),
        module,
        inherited,
        assoc_types: Vec::new(),
    };

    let equatable = decls.add_protocol(protocol(&names, "Equatable", vec![]));
    let hashable = decls.add_protocol(protocol(&names, "Hashable", vec![equatable]));
    let comparable = decls.add_protocol(protocol(&names, "Comparable", vec![equatable]));

    let integer_literal = decls.add_protocol(protocol(&names, "IntegerLiteral", vec![]));
    let float_literal = decls.add_protocol(protocol(&names, "FloatLiteral", vec![]));
    let string_literal = decls.add_protocol(protocol(&names, "StringLiteral", vec![]));
    let boolean_literal = decls.add_protocol(protocol(&names, "BooleanLiteral", vec![]));
    let nil_literal = decls.add_protocol(protocol(&names, "NilLiteral", vec![]));

    decls.register_literal_protocol(LiteralKind::Integer, integer_literal, Some(TypeId::INT));
    decls.register_literal_protocol(LiteralKind::Float, float_literal, Some(TypeId::FLOAT64));
    decls.register_literal_protocol(LiteralKind::String, string_literal, Some(TypeId::STRING));
    decls.register_literal_protocol(LiteralKind::Boolean, boolean_literal, Some(TypeId::BOOL));
    decls.register_literal_protocol(LiteralKind::Nil, nil_literal, None);

    let integers = [
        TypeId::INT,
        TypeId::INT8,
        TypeId::INT16,
        TypeId::INT32,
        TypeId::INT64,
        TypeId::UINT,
        TypeId::UINT8,
        TypeId::UINT16,
        TypeId::UINT32,
        TypeId::UINT64,
    ];
    for ty in integers {
        decls.add_literal_conformance(ty, LiteralKind::Integer, None);
        decls.add_builtin_conformance(ty, hashable);
        decls.add_builtin_conformance(ty, comparable);
    }
    for ty in [TypeId::FLOAT32, TypeId::FLOAT64] {
        decls.add_literal_conformance(ty, LiteralKind::Integer, None);
        decls.add_literal_conformance(ty, LiteralKind::Float, None);
        decls.add_builtin_conformance(ty, hashable);
        decls.add_builtin_conformance(ty, comparable);
    }
    decls.add_literal_conformance(TypeId::STRING, LiteralKind::String, None);
    decls.add_builtin_conformance(TypeId::STRING, hashable);
    decls.add_literal_conformance(TypeId::BOOL, LiteralKind::Boolean, None);
    decls.add_builtin_conformance(TypeId::BOOL, hashable);

    Fixture {
        types,
        names,
        decls,
        equatable,
        hashable,
        comparable,
    }
}

impl Fixture {
    pub fn atom(&self, name: &str) -> Atom {
        self.names.intern(name)
    }

    /// Register a top-level function with unlabeled parameters.
    pub fn add_func(&mut self, name: &str, params: &[TypeId], result: TypeId) -> DeclId {
        let param_infos = params
            .iter()
            .map(|&ty| ParamInfo::new(Atom::NONE, ty))
            .collect();
        let ty = self.types.function(param_infos, result);
        self.decls.add_top_level(Decl {
            kind: DeclKind::Func(FuncDecl {
                name: self.names.intern(name),
                ty,
                generics: None,
            }),
            span: Span::SYNTHESIZED,
        })
    }

    /// Register a generic top-level function from an explicit signature.
    pub fn add_generic_func(
        &mut self,
        name: &str,
        ty: TypeId,
        generics: GenericSignature,
    ) -> DeclId {
        self.decls.add_top_level(Decl {
            kind: DeclKind::Func(FuncDecl {
                name: self.names.intern(name),
                ty,
                generics: Some(generics),
            }),
            span: Span::SYNTHESIZED,
        })
    }

    /// Register a top-level constant.
    pub fn add_let(&mut self, name: &str, ty: TypeId) -> DeclId {
        self.decls.add_top_level(Decl {
            kind: DeclKind::Var(VarDecl {
                name: self.names.intern(name),
                ty,
                is_mutable: false,
            }),
            span: Span::SYNTHESIZED,
        })
    }

    /// Register an empty struct.
    pub fn add_struct(&mut self, name: &str) -> crate::decls::NominalId {
        self.decls.add_nominal(NominalDecl {
            name: self.names.intern(name),
            kind: NominalKind::Struct,
            superclass: None,
            generics: None,
            conformances: Vec::new(),
            members: Vec::new(),
        })
    }

    /// Register a class with an optional superclass.
    pub fn add_class(
        &mut self,
        name: &str,
        superclass: Option<crate::decls::NominalId>,
    ) -> crate::decls::NominalId {
        self.decls.add_nominal(NominalDecl {
            name: self.names.intern(name),
            kind: NominalKind::Class,
            superclass,
            generics: None,
            conformances: Vec::new(),
            members: Vec::new(),
        })
    }

    /// Register a stored property on a nominal.
    pub fn add_property(
        &mut self,
        nominal: crate::decls::NominalId,
        name: &str,
        ty: TypeId,
        is_mutable: bool,
    ) -> DeclId {
        self.decls.add_member(
            nominal,
            Decl {
                kind: DeclKind::Var(VarDecl {
                    name: self.names.intern(name),
                    ty,
                    is_mutable,
                }),
                span: Span::SYNTHESIZED,
            },
        )
    }
}
