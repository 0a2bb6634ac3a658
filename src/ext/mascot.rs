// Structured coalescent extension
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

//! Structured coalescent by marginal approximation (MASCOT).
//!
//! The `StructuredCoalescent` distribution places a prior on a tree whose
//!   tips are sampled from several demes,
//!     parameterized by a migration matrix built with the
//!     `migrationMatrix` function:
//!
//! ```text
//! M = migrationMatrix(theta=Θ, m=m);
//! ψ ~ StructuredCoalescent(M=M, taxa=taxa, demes=demes);
//! ```
//!
//! The matrix is translated by its computed value,
//!   but nothing references it;
//!     its population sizes and migration rates are referenced directly
//!     by the constant dynamics of the tree prior.

use super::{Contributions, Extension, ExtensionError};
use crate::{
    gen::{
        builtin::{taxon_set, tree_prior},
        Element, GenContext, GenError, GenResult, GeneratorKey,
    },
    model::{ModelNode, NodeKind, NodeRef, Value},
};

pub const NAME: &str = "mascot";

const MIGRATION_MATRIX: &str = "migrationMatrix";

struct Mascot;

pub fn extension() -> Result<Box<dyn Extension>, ExtensionError> {
    Ok(Box::new(Mascot))
}

impl Extension for Mascot {
    fn name(&self) -> &str {
        NAME
    }

    fn register(&self, contrib: &mut Contributions) -> Result<(), ExtensionError> {
        contrib
            .generator_fn(
                GeneratorKey::distribution("StructuredCoalescent"),
                "Mascot",
                structured_coalescent,
            )
            .exclude_function(MIGRATION_MATRIX);

        Ok(())
    }
}

fn structured_coalescent(_: &ModelNode, ctx: &GenContext) -> GenResult {
    ctx.expect_args(&["M", "taxa", "demes", "sort"])?;

    let (theta, m) = migration_matrix(ctx)?;
    let taxa = taxon_names(ctx.value("taxa")?)?;
    let demes = deme_names(ctx.value("demes")?, taxa.len())?;

    let dimension = match ctx.model().get(theta).value() {
        Some(value) if value.dimension() > 0 => value.dimension(),
        _ => distinct(&demes),
    };

    let ne = ctx.reference("theta", theta)?;
    let migration = ctx.reference("m", m)?;

    let type_trait = Element::spec("typeTrait", "TraitSet")
        .attr("traitname", "type")
        .attr(
            "value",
            taxa.iter()
                .zip(&demes)
                .map(|(taxon, deme)| format!("{taxon}={deme}"))
                .collect::<Vec<_>>()
                .join(","),
        )
        .child(taxon_set("taxa", &taxa));

    tree_prior(ctx, |tree| {
        Ok(Element::spec("distribution", "mascot.distribution.Mascot")
            .attr_ref("tree", tree)
            .child(
                Element::spec("dynamics", "mascot.dynamics.Constant")
                    .attr("dimension", dimension.to_string())
                    .attr_ref("Ne", ne)
                    .attr_ref("backwardsMigration", migration)
                    .child(type_trait),
            )
            .child(
                Element::spec(
                    "structuredTreeIntervals",
                    "mascot.distribution.StructuredTreeIntervals",
                )
                .attr_ref("tree", tree),
            ))
    })
}

/// Population sizes and migration rates of the matrix `M`.
fn migration_matrix(ctx: &GenContext) -> Result<(NodeRef, NodeRef), GenError> {
    let not_a_matrix = || GenError::ParamValue {
        param: "M".into(),
        expected: format!("the result of `{MIGRATION_MATRIX}`"),
    };

    let matrix = ctx.model().get(ctx.required("M")?);

    match matrix.kind() {
        NodeKind::DeterministicFunction { function, .. }
            if function == MIGRATION_MATRIX =>
        {
            let theta = matrix.arg("theta").ok_or_else(not_a_matrix)?;
            let m = matrix.arg("m").ok_or_else(not_a_matrix)?;

            Ok((theta, m))
        }
        _ => Err(not_a_matrix()),
    }
}

fn taxon_names(value: &Value) -> Result<Vec<String>, GenError> {
    match value {
        Value::Taxa(taxa) => Ok(taxa.iter().map(|t| t.name.clone()).collect()),
        Value::Alignment(aln) => {
            Ok(aln.sequences.iter().map(|s| s.taxon.clone()).collect())
        }
        Value::TextArray(names) => Ok(names.clone()),
        _ => Err(GenError::ParamValue {
            param: "taxa".into(),
            expected: "taxa".into(),
        }),
    }
}

/// Deme of each taxon,
///   which must be given for every one.
fn deme_names(value: &Value, taxa: usize) -> Result<Vec<String>, GenError> {
    match value.as_text_array() {
        Some(demes) if demes.len() == taxa => Ok(demes.to_vec()),
        _ => Err(GenError::ParamValue {
            param: "demes".into(),
            expected: format!("a deme name for each of {taxa} taxa"),
        }),
    }
}

fn distinct(names: &[String]) -> usize {
    let mut names = names.iter().collect::<Vec<_>>();
    names.sort();
    names.dedup();
    names.len()
}
