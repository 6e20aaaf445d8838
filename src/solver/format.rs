//! Type formatting for diagnostics.
//!
//! Renders interned types back into surface syntax. Only diagnostics go
//! through here; the solver itself never compares formatted strings.

use crate::decls::DeclTable;
use crate::interner::Interner;
use crate::solver::intern::TypeInterner;
use crate::solver::types::{TypeId, TypeKey};

/// Render `ty` in surface syntax, e.g. `(Int, label: String) -> Bool?`.
pub fn format_type(
    types: &TypeInterner,
    decls: &DeclTable,
    names: &Interner,
    ty: TypeId,
) -> String {
    match types.lookup(ty) {
        None => "<invalid>".to_string(),
        Some(TypeKey::Error) => "<<error type>>".to_string(),
        Some(TypeKey::Intrinsic(kind)) => kind.name().to_string(),
        Some(TypeKey::Tuple(list)) => {
            let elements = types.tuple_list(list);
            let rendered: Vec<String> = elements
                .iter()
                .map(|element| {
                    let inner = format_type(types, decls, names, element.ty);
                    if element.label.is_some() {
                        format!("{}: {}", names.resolve(element.label), inner)
                    } else {
                        inner
                    }
                })
                .collect();
            format!("({})", rendered.join(", "))
        }
        Some(TypeKey::Function(shape_id)) => {
            let shape = types.function_shape(shape_id);
            let params: Vec<String> = shape
                .params
                .iter()
                .map(|param| {
                    let mut inner = format_type(types, decls, names, param.ty);
                    if param.variadic {
                        inner.push_str("...");
                    }
                    if param.label.is_some() {
                        format!("{}: {}", names.resolve(param.label), inner)
                    } else {
                        inner
                    }
                })
                .collect();
            format!(
                "({}) -> {}",
                params.join(", "),
                format_type(types, decls, names, shape.result)
            )
        }
        Some(TypeKey::Optional(payload)) => {
            let inner = format_type(types, decls, names, payload);
            // Composite payloads need parentheses to read back correctly.
            if matches!(
                types.lookup(payload),
                Some(TypeKey::Function(_)) | Some(TypeKey::Existential(_))
            ) {
                format!("({})?", inner)
            } else {
                format!("{}?", inner)
            }
        }
        Some(TypeKey::Nominal(id)) => names.resolve(decls.nominal(id).name),
        Some(TypeKey::BoundGeneric(id, args)) => {
            let rendered: Vec<String> = types
                .type_list(args)
                .iter()
                .map(|&arg| format_type(types, decls, names, arg))
                .collect();
            format!(
                "{}<{}>",
                names.resolve(decls.nominal(id).name),
                rendered.join(", ")
            )
        }
        Some(TypeKey::Protocol(id)) => names.resolve(decls.protocol(id).name),
        Some(TypeKey::Existential(list)) => {
            let rendered: Vec<String> = types
                .protocol_list(list)
                .iter()
                .map(|&p| names.resolve(decls.protocol(p).name))
                .collect();
            if rendered.is_empty() {
                "Any".to_string()
            } else {
                rendered.join(" & ")
            }
        }
        Some(TypeKey::Metatype(instance)) => {
            format!("{}.Type", format_type(types, decls, names, instance))
        }
        Some(TypeKey::GenericParam(info)) => names.resolve(info.name),
        Some(TypeKey::Archetype(id)) => names.resolve(types.archetype_data(id).name),
        Some(TypeKey::DependentMember { base, assoc }) => {
            format!(
                "{}.{}",
                format_type(types, decls, names, base),
                names.resolve(assoc)
            )
        }
        Some(TypeKey::Variable(var)) => format!("${}", var.index()),
        Some(TypeKey::LValue(object)) => {
            format!("@lvalue {}", format_type(types, decls, names, object))
        }
    }
}
