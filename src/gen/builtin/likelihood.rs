// Generator for the phylogenetic tree likelihood
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

use super::{
    distributions,
    operators::{relaxed_clock_operators, up_down_operator},
};
use crate::{
    gen::{
        Element, Fragment, FragmentRef, GenContext, GenError, GenResult,
        Generated, GeneratorKey, Registry, Roles,
    },
    model::{LogicalType, ModelNode, NodeKind, NodeRef, Value},
};

pub(super) fn register(registry: &mut Registry) {
    registry.register_fn(
        GeneratorKey::distribution("PhyloCTMC"),
        "PhyloCTMC",
        phylo_ctmc,
    );

    // Gamma site rates become the categories of the site model.
    registry.absorb_param("PhyloCTMC", "siteRates");
}

/// Parameters of `PhyloCTMC` with a translation.
///
/// The sequence length and data type are implied by the alignment.
const PARAMS: &[&str] = &[
    "tree",
    "Q",
    "mu",
    "siteRates",
    "branchRates",
    "L",
    "n",
    "dataType",
];

const RATE_STATISTIC: &str = "beast.base.evolution.RateStatistic";

/// Tree likelihood of an alignment under a substitution model,
///   with gamma distributed site rates
///   and a strict or uncorrelated relaxed clock.
fn phylo_ctmc(_: &ModelNode, ctx: &GenContext) -> GenResult {
    ctx.expect_args(PARAMS)?;

    let data = ctx.reference("variate", ctx.variate()?)?;
    let tree = ctx.input("tree")?;
    let mu = ctx.opt_input("mu")?;

    let mut gen = Generated::none();

    let el = Element::spec("distribution", "ThreadedTreeLikelihood")
        .attr_ref("data", data)
        .attr_ref("tree", tree)
        .child(site_model(ctx)?);

    let el = match ctx.arg("branchRates") {
        Some(rates) => el.child_ref(
            "branchRateModel",
            relaxed_clock(ctx, &mut gen, rates, tree, mu)?,
        ),
        None => {
            let clock = Element::spec("branchRateModel", "StrictClockModel");

            el.child(match mu {
                Some(mu) => clock.attr_ref("clock.rate", mu),
                None => clock.attr("clock.rate", "1.0"),
            })
        }
    };

    gen.push_primary(
        Fragment::new(el)
            .suffix("treeLikelihood")
            .roles(Roles::LIKELIHOOD | Roles::LOG),
    );

    // A rate estimated together with the tree it scales is strongly
    //   correlated with the tree height.
    if let (Some(mu), Some(tree_node), None) =
        (ctx.arg("mu"), ctx.arg("tree"), ctx.arg("branchRates"))
    {
        let model = ctx.model();

        if is_latent(model.get(mu)) && is_latent(model.get(tree_node)) {
            gen.push(up_down_operator(
                ctx.reference("mu", mu)?,
                ctx.reference("tree", tree_node)?,
            ));
        }
    }

    Ok(gen)
}

/// Site model of the substitution model `Q`,
///   with gamma rate categories if site rates are given.
fn site_model(ctx: &GenContext) -> Result<Element, GenError> {
    let el = Element::spec("siteModel", "SiteModel");

    let el = match ctx.arg("siteRates") {
        None => el.attr("gammaCategoryCount", "1"),
        Some(rates) => {
            let gamma = drawn_from(ctx, rates, "DiscretizedGamma")
                .ok_or_else(|| GenError::ParamValue {
                    param: "siteRates".into(),
                    expected: "drawn from `DiscretizedGamma`".into(),
                })?;

            let shape = gamma
                .arg("shape")
                .ok_or_else(|| GenError::MissingParam("shape".into()))?;

            el.attr("gammaCategoryCount", category_count(ctx, gamma)?)
                .attr_ref("shape", ctx.reference("shape", shape)?)
        }
    };

    Ok(el.child_ref("substModel", ctx.input("Q")?))
}

/// Number of gamma rate categories.
fn category_count(
    ctx: &GenContext,
    gamma: &ModelNode,
) -> Result<String, GenError> {
    gamma
        .arg("ncat")
        .and_then(|ncat| ctx.model().get(ncat).value())
        .and_then(Value::as_integer)
        .filter(|&n| n > 0)
        .map(|n| n.to_string())
        .ok_or_else(|| GenError::ParamValue {
            param: "ncat".into(),
            expected: "a positive integer".into(),
        })
}

/// Uncorrelated relaxed clock over lognormal branch `rates`,
///   logging its rate statistics.
fn relaxed_clock(
    ctx: &GenContext,
    gen: &mut Generated,
    rates: NodeRef,
    tree: FragmentRef,
    mu: Option<FragmentRef>,
) -> Result<FragmentRef, GenError> {
    let dist = match ctx.model().get(rates).kind() {
        NodeKind::RandomVariable { distribution, .. }
            if drawn_from(ctx, rates, "LogNormal").is_some() =>
        {
            *distribution
        }
        _ => {
            return Err(GenError::ParamValue {
                param: "branchRates".into(),
                expected: "drawn from `LogNormal`".into(),
            })
        }
    };

    let rates_ref = ctx.reference("branchRates", rates)?;

    let clock = Element::spec("branchRateModel", "UCRelaxedClockModel")
        .attr_ref("rates", rates_ref)
        .attr_ref("tree", tree)
        .child(distributions::distr(ctx, dist)?);

    let clock = match mu {
        Some(mu) => clock.attr_ref("clock.rate", mu),
        None => clock,
    };

    let clock = gen.push(Fragment::new(clock).suffix("relaxedClock"));

    gen.push(
        Fragment::new(
            Element::spec("log", RATE_STATISTIC)
                .attr_ref("branchratemodel", clock)
                .attr_ref("tree", tree),
        )
        .suffix("rateStat")
        .roles(Roles::LOG),
    );

    let model = ctx.model();
    let tree_node = ctx.required("tree")?;

    if is_latent(model.get(rates)) && is_latent(model.get(tree_node)) {
        let shape = match model.get(tree_node).value() {
            Some(Value::Tree(t)) => t.leaf_labels().zip(t.root_height()),
            _ => None,
        };

        let (labels, root_height) =
            shape.ok_or_else(|| GenError::ParamValue {
                param: "tree".into(),
                expected: "a tree with branch lengths".into(),
            })?;

        for op in relaxed_clock_operators(
            clock,
            tree,
            rates_ref,
            root_height,
            (2 * labels.len()).saturating_sub(1),
        ) {
            gen.push(op);
        }
    }

    Ok(clock)
}

/// The node generating the random variable `node`,
///   if it is the distribution `name`.
fn drawn_from<'a>(
    ctx: &GenContext<'a>,
    node: NodeRef,
    name: &str,
) -> Option<&'a ModelNode> {
    let model = ctx.model();

    match model.get(node).kind() {
        NodeKind::RandomVariable { distribution, .. } => {
            let dist = model.get(*distribution);

            match dist.kind() {
                NodeKind::Distribution { name: n, .. } if n == name => {
                    Some(dist)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn is_latent(node: &ModelNode) -> bool {
    node.logical() == LogicalType::RandomVariable
        && !node.is_observed()
}
