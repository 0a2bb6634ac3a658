// Generators for values and random variables
//
//  Copyright (C) 2020-2023 The LPhyBEAST Developers.
//
//  This file is part of LPhyBEAST.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Values and the state nodes of random variables.
//!
//! A constant is nested where it is first used;
//!   a latent random variable becomes a state node in the model
//!   section,
//!     estimated by the chain starting from its sampled value.

use crate::{
    gen::{
        Element, Fragment, GenContext, GenError, GenResult, Generated,
        GeneratorKey, Placement, Registry, Roles,
    },
    model::{Alignment, LogicalType, ModelNode, TimeTree, Value},
};

/// Classes translated as parameters.
const PARAMETER_CLASSES: &[&str] = &[
    "Boolean",
    "Integer",
    "Double",
    "Boolean[]",
    "Integer[]",
    "Double[]",
    "Double[][]",
];

/// Classes with no standalone translation;
///   generators that need them read their values directly.
const UNTRANSLATED_CLASSES: &[&str] = &["String", "String[]", "Taxa"];

pub(super) fn register(registry: &mut Registry) {
    for class in PARAMETER_CLASSES {
        registry.register_fn(GeneratorKey::value(*class), "parameter", constant);
        registry.register_fn(
            GeneratorKey::random(*class),
            "state parameter",
            state,
        );
    }

    registry.register_fn(GeneratorKey::value("Alignment"), "alignment", alignment);
    registry.register_fn(GeneratorKey::random("Alignment"), "alignment", alignment);

    registry.register_fn(GeneratorKey::value("TimeTree"), "tree", tree);
    registry.register_fn(GeneratorKey::random("TimeTree"), "state tree", tree);

    for class in UNTRANSLATED_CLASSES {
        registry.register_fn(GeneratorKey::value(*class), "untranslated", |_, _| {
            Ok(Generated::none())
        });
    }
}

/// Parameter element for a numeric or boolean value.
pub fn parameter(value: &Value) -> Result<Element, GenError> {
    let spec = match value {
        Value::Boolean(_) | Value::BooleanArray(_) => "BooleanParameter",
        Value::Integer(_) | Value::IntegerArray(_) => "IntegerParameter",
        Value::Real(_) | Value::RealArray(_) | Value::RealMatrix(_) => {
            "RealParameter"
        }
        _ => {
            return Err(GenError::Unsupported(format!(
                "values of class `{}` cannot be parameters",
                value.class()
            )))
        }
    };

    let text = value.parameter_text().ok_or(GenError::MissingValue)?;
    let el = Element::spec("parameter", spec).attr("value", text);

    match value {
        Value::RealMatrix(rows) => {
            let columns = rows.first().map(Vec::len).unwrap_or(0);

            // The flattened value is only meaningful for equal rows.
            if rows.iter().any(|row| row.len() != columns) {
                return Err(GenError::ParamValue {
                    param: "value".into(),
                    expected: "a rectangular matrix".into(),
                });
            }

            Ok(el.attr("minordimension", columns.to_string()))
        }
        _ => Ok(el),
    }
}

fn constant(node: &ModelNode, _: &GenContext) -> GenResult {
    let value = node.value().ok_or(GenError::MissingValue)?;
    let el = parameter(value)?.attr("estimate", "false");

    Ok(Generated::one(Fragment::new(el)))
}

fn state(node: &ModelNode, _: &GenContext) -> GenResult {
    let value = node.value().ok_or(GenError::MissingValue)?;

    Ok(Generated::one(
        Fragment::new(parameter(value)?)
            .placement(Placement::MODEL)
            .roles(Roles::STATE | Roles::LOG)
            .dimension(value.dimension()),
    ))
}

fn alignment(node: &ModelNode, ctx: &GenContext) -> GenResult {
    let Some(Value::Alignment(aln)) = node.value() else {
        return Err(GenError::MissingValue);
    };

    let data_type = ctx.data_type(&aln.sequence_type).ok_or_else(|| {
        GenError::Unsupported(format!(
            "no data type for sequence type `{}`",
            aln.sequence_type
        ))
    })?;

    Ok(Generated::one(
        Fragment::new(alignment_element(aln, data_type)?)
            .placement(Placement::DATA),
    ))
}

fn alignment_element(
    aln: &Alignment,
    data_type: &str,
) -> Result<Element, GenError> {
    if aln.sequences.is_empty() {
        return Err(GenError::Unsupported("alignment has no sequences".into()));
    }

    aln.sequences.iter().try_fold(
        Element::spec("data", "Alignment").attr("dataType", data_type),
        |el, seq| {
            if seq.data.is_empty() {
                return Err(GenError::Unsupported(format!(
                    "sequence of taxon `{}` is empty",
                    seq.taxon
                )));
            }

            Ok(el.child(
                Element::spec("sequence", "Sequence")
                    .attr("taxon", &seq.taxon)
                    .attr("value", &seq.data),
            ))
        },
    )
}

/// Trees are parsed from Newick;
///   a random tree is additionally a state node.
fn tree(node: &ModelNode, _: &GenContext) -> GenResult {
    let Some(Value::Tree(tree)) = node.value() else {
        return Err(GenError::MissingValue);
    };

    let frag = Fragment::new(tree_element(tree));

    Ok(Generated::one(if node.logical() == LogicalType::RandomVariable {
        frag.placement(Placement::MODEL)
            .roles(Roles::STATE | Roles::TREE_LOG)
            .dimension(tree.internal_node_count())
    } else {
        frag
    }))
}

fn tree_element(tree: &TimeTree) -> Element {
    Element::spec("tree", "TreeParser")
        .attr("newick", &tree.newick)
        .attr("IsLabelledNewick", "true")
        .attr("adjustTipHeights", "false")
}
