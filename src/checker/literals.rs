//! Literal-to-concrete-type conversion.
//!
//! A two-phase protocol-witness conversion. Intrinsic destinations take
//! the builtin path: the literal is constructed directly from its raw
//! compiler value. Nominal destinations go through the literal protocol's
//! initializer witness, applied to the (builtin-converted) value at the
//! protocol's default type.

use crate::ast::{ExprId, ExprKind};
use crate::checker::rewrite::ExprRewriter;
use crate::decls::LiteralKind;
use crate::solver::{TypeId, TypeKey};

impl<'a> ExprRewriter<'a> {
    /// Convert a literal node to its solution-chosen concrete type.
    pub(crate) fn convert_literal(&mut self, expr: ExprId, target: TypeId) -> ExprId {
        let kind = match &self.arena.get(expr).kind {
            ExprKind::IntegerLiteral(_) => LiteralKind::Integer,
            ExprKind::FloatLiteral(_) => LiteralKind::Float,
            ExprKind::StringLiteral(_) => LiteralKind::String,
            ExprKind::BooleanLiteral(_) => LiteralKind::Boolean,
            ExprKind::NilLiteral => LiteralKind::Nil,
            _ => {
                debug_assert!(false, "convert_literal on a non-literal node");
                return expr;
            }
        };

        // nil is already the empty case of the destination optional; no
        // construction happens.
        if kind == LiteralKind::Nil {
            debug_assert!(matches!(
                self.types.lookup(target),
                Some(TypeKey::Optional(_)) | Some(TypeKey::Error)
            ));
            self.arena.set_ty(expr, target);
            return expr;
        }

        let span = self.arena.span(expr);

        // Phase one: builtin conversion when the destination supports
        // direct construction from the raw value.
        if matches!(self.types.lookup(target), Some(TypeKey::Intrinsic(_))) {
            self.arena.set_ty(expr, target);
            return self.arena.add_typed(
                ExprKind::LiteralInit {
                    literal: expr,
                    witness: None,
                },
                target,
                span,
            );
        }

        // Phase two: the general literal-protocol initializer, invoked
        // with the builtin-converted argument at the default type.
        let witness = self.decls.literal_witness(target, kind);
        let argument = match self.decls.literal_default(kind) {
            Some(default) if default != target => {
                self.arena.set_ty(expr, default);
                self.arena.add_typed(
                    ExprKind::LiteralInit {
                        literal: expr,
                        witness: None,
                    },
                    default,
                    span,
                )
            }
            _ => {
                self.arena.set_ty(expr, target);
                expr
            }
        };
        self.arena.add_typed(
            ExprKind::LiteralInit {
                literal: argument,
                witness,
            },
            target,
            span,
        )
    }
}
