// Generators for tree priors
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

//! Tree priors.
//!
//! A latent tree additionally receives the standard set of tree
//!   operators.
//!
//! Birth-death priors take the age of the root as a parameter.
//! A latent root age is not a parameter of its own:
//!   its prior becomes a calibration on the root of the tree,
//!     and the tree operators move it.

use super::{
    distributions,
    operators::{fixed_root_tree_operators, tree_operators},
};
use crate::{
    gen::{
        Element, Fragment, FragmentRef, GenContext, GenError, GenResult,
        Generated, GeneratorKey, Registry, Roles,
    },
    model::{real_text, ModelNode, NodeKind, NodeRef, Value},
};
use tracing::warn;

const ROOT_AGE: &str = "rootAge";

const MRCA_PRIOR: &str = "beast.base.evolution.tree.MRCAPrior";

const SEQUENTIAL_SAMPLING: &str =
    "bdtree.likelihood.BirthDeathSequentialSampling";

pub(super) fn register(registry: &mut Registry) {
    registry.register_fn(GeneratorKey::distribution("Yule"), "Yule", yule);
    registry.register_fn(
        GeneratorKey::distribution("Coalescent"),
        "Coalescent",
        coalescent,
    );
    registry.register_fn(
        GeneratorKey::distribution("SerialCoalescent"),
        "SerialCoalescent",
        coalescent,
    );
    registry.register_fn(
        GeneratorKey::distribution("BirthDeathSampling"),
        "BirthDeathSampling",
        birth_death_sampling,
    );
    registry.register_fn(
        GeneratorKey::distribution("BirthDeathSerialSampling"),
        "BirthDeathSerialSampling",
        birth_death_serial_sampling,
    );

    registry.absorb_param("BirthDeathSampling", ROOT_AGE);
    registry.absorb_param("BirthDeathSerialSampling", ROOT_AGE);
}
fn yule(_: &ModelNode, ctx: &GenContext) -> GenResult {
    ctx.expect_args(&["lambda", "n", "taxa"])?;

    tree_prior(ctx, |tree| {
        Ok(Element::spec("distribution", "YuleModel")
            .attr_ref("tree", tree)
            .attr_ref("birthDiffRate", ctx.input("lambda")?))
    })
}

/// Constant-population coalescent,
///   with or without serially sampled tips.
///
/// Tip ages of a serially sampled tree are carried by the tree itself.
fn coalescent(_: &ModelNode, ctx: &GenContext) -> GenResult {
    ctx.expect_args(&["theta", "n", "taxa", "ages"])?;

    tree_prior(ctx, |tree| {
        Ok(Element::spec("distribution", "Coalescent")
            .child(
                Element::spec("populationModel", "ConstantPopulation")
                    .attr_ref("popSize", ctx.input("theta")?),
            )
            .child(
                Element::spec("treeIntervals", "TreeIntervals")
                    .attr_ref("tree", tree),
            ))
    })
}

/// Birth-death process with incomplete sampling of extant taxa,
///   conditioned on the age of the root.
fn birth_death_sampling(_: &ModelNode, ctx: &GenContext) -> GenResult {
    ctx.expect_args(&[
        "diversification",
        "turnover",
        "rho",
        ROOT_AGE,
        "n",
        "taxa",
    ])?;

    let root_age = latent_root_age(ctx).ok_or_else(|| GenError::ParamValue {
        param: ROOT_AGE.into(),
        expected: "a random variable".into(),
    })?;

    let mut gen = tree_prior_with(ctx, tree_operators, |tree| {
        Ok(Element::spec("distribution", "BirthDeathGernhard08Model")
            .attr_ref("tree", tree)
            .attr_ref("birthDiffRate", ctx.input("diversification")?)
            .attr_ref("relativeDeathRate", ctx.input("turnover")?)
            .attr_ref("sampleProbability", ctx.input("rho")?)
            .attr("type", "labeled")
            .attr("conditionalOnRoot", "true"))
    })?;

    gen.push(root_calibration(ctx, root_age)?);

    Ok(gen)
}

/// Birth-death process with serially sampled tips.
///
/// The root age is either fixed,
///   leaving the root height alone,
///   or bounded by a uniform prior.
fn birth_death_serial_sampling(_: &ModelNode, ctx: &GenContext) -> GenResult {
    ctx.expect_args(&[
        "lambda", "mu", "rho", "psi", ROOT_AGE, "n", "taxa", "ages",
    ])?;

    let el = |tree: FragmentRef| -> Result<Element, GenError> {
        Ok(Element::spec("distribution", SEQUENTIAL_SAMPLING)
            .attr_ref("tree", tree)
            .attr_ref("birthRate", ctx.input("lambda")?)
            .attr_ref("deathRate", ctx.input("mu")?)
            .attr_ref("rho", ctx.input("rho")?)
            .attr_ref("psi", ctx.input("psi")?))
    };

    match latent_root_age(ctx) {
        Some(root_age) => {
            let (lower, upper) = root_age_bounds(ctx, root_age);

            let mut gen = tree_prior_with(ctx, tree_operators, |tree| {
                Ok(el(tree)?.attr("lower", lower).attr("upper", upper))
            })?;

            gen.push(root_calibration(ctx, root_age)?);
            Ok(gen)
        }
        None => {
            let age = ctx
                .value(ROOT_AGE)?
                .as_real()
                .ok_or_else(|| GenError::ParamValue {
                    param: ROOT_AGE.into(),
                    expected: "a number".into(),
                })?;

            tree_prior_with(ctx, fixed_root_tree_operators, |tree| {
                Ok(el(tree)?.attr(ROOT_AGE, real_text(age)))
            })
        }
    }
}

/// The distribution of a latent root age,
///   if the root age is latent.
fn latent_root_age(ctx: &GenContext) -> Option<NodeRef> {
    match ctx.model().get(ctx.arg(ROOT_AGE)?).kind() {
        NodeKind::RandomVariable {
            distribution,
            observed: None,
            ..
        } => Some(*distribution),
        _ => None,
    }
}

/// Bounds of a uniform root age prior,
///   or the whole real line for any other prior.
fn root_age_bounds(ctx: &GenContext, root_age: NodeRef) -> (String, String) {
    let node = ctx.model().get(root_age);
    let bound = |param: &str| {
        node.arg(param)
            .and_then(|arg| ctx.model().get(arg).value())
            .and_then(Value::as_real)
            .map(real_text)
    };

    match (node.class(), bound("lower"), bound("upper")) {
        (Some("Uniform"), Some(lower), Some(upper)) => (lower, upper),
        (class, ..) => {
            warn!(
                prior = class.unwrap_or_default(),
                "root age prior has no bounds; the root is unbounded"
            );

            ("-Infinity".into(), "Infinity".into())
        }
    }
}

/// Calibration of the root of the tree variate by the root age
///   distribution `root_age`.
fn root_calibration(
    ctx: &GenContext,
    root_age: NodeRef,
) -> Result<Fragment, GenError> {
    let variate = ctx.variate_node()?;
    let tree = ctx.reference("variate", ctx.variate()?)?;

    let taxa = match variate.value() {
        Some(Value::Tree(tree)) => tree.leaf_labels(),
        _ => None,
    }
    .ok_or_else(|| GenError::ParamValue {
        param: "taxa".into(),
        expected: "a tree with labelled leaves".into(),
    })?;

    let roles = if variate.is_observed() {
        Roles::LIKELIHOOD
    } else {
        Roles::PRIOR
    };

    Ok(Fragment::new(
        Element::spec("distribution", MRCA_PRIOR)
            .attr_ref("tree", tree)
            .child(taxon_set("taxonset", &taxa))
            .child(distributions::distr(ctx, root_age)?),
    )
    .suffix("rootAge.prior")
    .roles(roles))
}

/// Set of taxa declared by name,
///   as the element `name`.
pub fn taxon_set(name: &str, taxa: &[String]) -> Element {
    taxa.iter()
        .fold(Element::spec(name, "TaxonSet"), |set, taxon| {
            set.child(
                Element::new("taxon")
                    .attr("id", taxon.as_str())
                    .attr("spec", "Taxon"),
            )
        })
}

/// Prior on the tree variate of the distribution being translated,
///   along with operators on the tree if it is latent.
///
/// This is shared with extensions providing tree priors of their own.
pub fn tree_prior(
    ctx: &GenContext,
    build: impl FnOnce(FragmentRef) -> Result<Element, GenError>,
) -> GenResult {
    tree_prior_with(ctx, tree_operators, build)
}

fn tree_prior_with(
    ctx: &GenContext,
    operators: fn(FragmentRef, usize) -> Vec<Fragment>,
    build: impl FnOnce(FragmentRef) -> Result<Element, GenError>,
) -> GenResult {
    let variate = ctx.variate_node()?;
    let tree = ctx.reference("variate", ctx.variate()?)?;

    let internal_nodes = match variate.value() {
        Some(Value::Tree(tree)) => tree.internal_node_count(),
        Some(other) => {
            return Err(GenError::Unsupported(format!(
                "tree prior generates a value of class `{}`",
                other.class()
            )))
        }
        None => 1,
    };

    let observed = variate.is_observed();
    let roles = if observed {
        Roles::LIKELIHOOD
    } else {
        Roles::PRIOR
    };

    let mut gen = Generated::none();
    gen.push_primary(Fragment::new(build(tree)?).suffix("prior").roles(roles));

    if !observed {
        for op in operators(tree, internal_nodes) {
            gen.push(op);
        }
    }

    Ok(gen)
}
