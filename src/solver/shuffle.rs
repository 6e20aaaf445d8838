//! Argument-to-parameter and tuple-to-tuple matching.
//!
//! Computes the shuffle mapping that lines a source tuple up with a
//! destination parameter list: by label where labels are given, by
//! position otherwise, detecting default-valued parameters that receive
//! no argument and collecting trailing arguments into a variadic tail.
//! The same mapping drives both the solver (does a conversion exist?) and
//! the rewriter (emit the `TupleShuffle` node).

use crate::ast::ShuffleSource;
use crate::solver::types::{ParamInfo, TupleElement};

/// Why a source tuple cannot be matched to a parameter list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShuffleError {
    /// A non-defaulted parameter received no argument.
    MissingArgument(u32),
    /// A source element matched no parameter.
    ExtraArgument(u32),
    /// An argument label disagreed with the parameter's label.
    LabelMismatch(u32),
}

/// Compute the shuffle mapping from `elements` onto `params`.
///
/// Parameters are filled in order. A variadic parameter (always last)
/// absorbs every remaining unconsumed element. Labels must agree exactly;
/// an unlabeled parameter only consumes unlabeled elements.
pub fn match_call_arguments(
    elements: &[TupleElement],
    params: &[ParamInfo],
) -> Result<Vec<ShuffleSource>, ShuffleError> {
    let mut consumed = vec![false; elements.len()];
    let mut mapping = Vec::with_capacity(params.len());

    for (param_index, param) in params.iter().enumerate() {
        if param.variadic {
            let mut collected = Vec::new();
            for (i, element) in elements.iter().enumerate() {
                if consumed[i] {
                    continue;
                }
                if element.label.is_some() && element.label != param.label {
                    return Err(ShuffleError::LabelMismatch(i as u32));
                }
                consumed[i] = true;
                collected.push(i as u32);
            }
            mapping.push(ShuffleSource::Variadic(collected));
            continue;
        }

        let found = elements
            .iter()
            .enumerate()
            .find(|(i, element)| !consumed[*i] && element.label == param.label);
        match found {
            Some((i, _)) => {
                consumed[i] = true;
                mapping.push(ShuffleSource::Argument(i as u32));
            }
            None if param.has_default => {
                mapping.push(ShuffleSource::DefaultArgument(param_index as u32));
            }
            None => return Err(ShuffleError::MissingArgument(param_index as u32)),
        }
    }

    if let Some(extra) = consumed.iter().position(|&c| !c) {
        return Err(ShuffleError::ExtraArgument(extra as u32));
    }

    Ok(mapping)
}

/// Compute the mapping between two plain tuple types of equal length:
/// labelled elements match by label, the rest by position.
pub fn match_tuple_elements(
    from: &[TupleElement],
    to: &[TupleElement],
) -> Result<Vec<ShuffleSource>, ShuffleError> {
    let params: Vec<ParamInfo> = to
        .iter()
        .map(|element| ParamInfo::new(element.label, element.ty))
        .collect();
    match_call_arguments(from, &params)
}

/// True if the mapping moves every source element to its own position
/// with nothing defaulted or collected.
pub fn is_identity_mapping(mapping: &[ShuffleSource], source_len: usize) -> bool {
    mapping.len() == source_len
        && mapping
            .iter()
            .enumerate()
            .all(|(i, source)| matches!(source, ShuffleSource::Argument(n) if *n as usize == i))
}
