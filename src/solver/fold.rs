//! Recursive type transforms.
//!
//! Implements the substitution primitive shared by type opening, solution
//! application and archetype substitution: a pure recursive function over
//! the tagged-union representation, memoized on node identity so a type
//! appearing under multiple paths is rewritten once, not once per path.

use crate::solver::intern::TypeInterner;
use crate::solver::types::*;
use rustc_hash::{FxHashMap, FxHashSet};

/// A memo table for one transform pass. Callers reuse the table across
/// related calls (e.g. every node of one expression tree) so structural
/// sharing stays linear.
pub type FoldMemo = FxHashMap<TypeId, TypeId>;

/// Rewrite `ty` bottom-up, replacing any subterm for which `f` returns a
/// replacement. `f` is consulted before recursion; returning `Some`
/// short-circuits descent into that subterm.
pub fn transform_type<F>(
    interner: &TypeInterner,
    ty: TypeId,
    memo: &mut FoldMemo,
    f: &mut F,
) -> TypeId
where
    F: FnMut(TypeId, &TypeKey) -> Option<TypeId>,
{
    if let Some(&cached) = memo.get(&ty) {
        return cached;
    }

    let Some(key) = interner.lookup(ty) else {
        return ty;
    };

    let result = if let Some(replacement) = f(ty, &key) {
        replacement
    } else {
        transform_children(interner, ty, &key, memo, f)
    };

    memo.insert(ty, result);
    result
}

fn transform_children<F>(
    interner: &TypeInterner,
    ty: TypeId,
    key: &TypeKey,
    memo: &mut FoldMemo,
    f: &mut F,
) -> TypeId
where
    F: FnMut(TypeId, &TypeKey) -> Option<TypeId>,
{
    match key {
        TypeKey::Intrinsic(_)
        | TypeKey::Nominal(_)
        | TypeKey::Protocol(_)
        | TypeKey::Existential(_)
        | TypeKey::GenericParam(_)
        | TypeKey::Archetype(_)
        | TypeKey::Variable(_)
        | TypeKey::Error => ty,
        TypeKey::Tuple(list) => {
            let elements = interner.tuple_list(*list);
            let mut changed = false;
            let mut rebuilt = Vec::with_capacity(elements.len());
            for element in elements.iter() {
                let new_ty = transform_type(interner, element.ty, memo, f);
                changed |= new_ty != element.ty;
                rebuilt.push(TupleElement::new(element.label, new_ty));
            }
            if changed { interner.tuple(rebuilt) } else { ty }
        }
        TypeKey::Function(shape_id) => {
            let shape = interner.function_shape(*shape_id);
            let mut changed = false;
            let mut params = Vec::with_capacity(shape.params.len());
            for param in &shape.params {
                let new_ty = transform_type(interner, param.ty, memo, f);
                changed |= new_ty != param.ty;
                params.push(ParamInfo {
                    ty: new_ty,
                    ..*param
                });
            }
            let result = transform_type(interner, shape.result, memo, f);
            changed |= result != shape.result;
            if changed {
                interner.function(params, result)
            } else {
                ty
            }
        }
        TypeKey::Optional(payload) => {
            let new_payload = transform_type(interner, *payload, memo, f);
            if new_payload != *payload {
                interner.optional(new_payload)
            } else {
                ty
            }
        }
        TypeKey::BoundGeneric(nominal, args) => {
            let arg_list = interner.type_list(*args);
            let mut changed = false;
            let mut rebuilt = Vec::with_capacity(arg_list.len());
            for &arg in arg_list.iter() {
                let new_arg = transform_type(interner, arg, memo, f);
                changed |= new_arg != arg;
                rebuilt.push(new_arg);
            }
            if changed {
                interner.bound_generic(*nominal, rebuilt)
            } else {
                ty
            }
        }
        TypeKey::Metatype(instance) => {
            let new_instance = transform_type(interner, *instance, memo, f);
            if new_instance != *instance {
                interner.metatype(new_instance)
            } else {
                ty
            }
        }
        TypeKey::DependentMember { base, assoc } => {
            let new_base = transform_type(interner, *base, memo, f);
            if new_base != *base {
                interner.dependent_member(new_base, *assoc)
            } else {
                ty
            }
        }
        TypeKey::LValue(object) => {
            let new_object = transform_type(interner, *object, memo, f);
            if new_object != *object {
                interner.lvalue(new_object)
            } else {
                ty
            }
        }
    }
}

/// Collect every type variable occurring in `ty` into `out`, in first-visit
/// order, without duplicates.
pub fn collect_type_variables(interner: &TypeInterner, ty: TypeId, out: &mut Vec<TypeVar>) {
    let mut visited = FxHashSet::default();
    collect_vars_inner(interner, ty, &mut visited, out);
}

fn collect_vars_inner(
    interner: &TypeInterner,
    ty: TypeId,
    visited: &mut FxHashSet<TypeId>,
    out: &mut Vec<TypeVar>,
) {
    if !visited.insert(ty) {
        return;
    }
    let Some(key) = interner.lookup(ty) else {
        return;
    };
    match key {
        TypeKey::Variable(var) => {
            if !out.contains(&var) {
                out.push(var);
            }
        }
        TypeKey::Tuple(list) => {
            for element in interner.tuple_list(list).iter() {
                collect_vars_inner(interner, element.ty, visited, out);
            }
        }
        TypeKey::Function(shape_id) => {
            let shape = interner.function_shape(shape_id);
            for param in &shape.params {
                collect_vars_inner(interner, param.ty, visited, out);
            }
            collect_vars_inner(interner, shape.result, visited, out);
        }
        TypeKey::Optional(payload) => collect_vars_inner(interner, payload, visited, out),
        TypeKey::BoundGeneric(_, args) => {
            for &arg in interner.type_list(args).iter() {
                collect_vars_inner(interner, arg, visited, out);
            }
        }
        TypeKey::Metatype(instance) => collect_vars_inner(interner, instance, visited, out),
        TypeKey::DependentMember { base, .. } => collect_vars_inner(interner, base, visited, out),
        TypeKey::LValue(object) => collect_vars_inner(interner, object, visited, out),
        TypeKey::Intrinsic(_)
        | TypeKey::Nominal(_)
        | TypeKey::Protocol(_)
        | TypeKey::Existential(_)
        | TypeKey::GenericParam(_)
        | TypeKey::Archetype(_)
        | TypeKey::Error => {}
    }
}

/// True if `ty` mentions any type variable.
pub fn contains_type_variables(interner: &TypeInterner, ty: TypeId) -> bool {
    let mut vars = Vec::new();
    collect_type_variables(interner, ty, &mut vars);
    !vars.is_empty()
}

/// True if `ty` mentions any unresolved generic parameter or dependent
/// member (i.e. it still needs opening before the solver can use it).
pub fn is_polymorphic(interner: &TypeInterner, ty: TypeId) -> bool {
    let mut found = false;
    let mut memo = FoldMemo::default();
    transform_type(interner, ty, &mut memo, &mut |_, key| {
        if matches!(
            key,
            TypeKey::GenericParam(_) | TypeKey::DependentMember { .. }
        ) {
            found = true;
        }
        None
    });
    found
}
