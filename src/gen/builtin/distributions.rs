// Generators for parametric prior distributions
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

//! Parametric distributions over parameters.
//!
//! Each is translated into a `Prior` on its variate wrapping the BEAST 2
//!   distribution of the same family.
//! A prior on an observed variate is part of the likelihood instead.
//!
//! Any family may be vectorized with `replicates`,
//!   drawing an array of independent values;
//!     the prior then applies to each element of its variate.

use super::operators::{parameter_operator, Support};
use crate::{
    gen::{
        Element, Fragment, FragmentRef, GenContext, GenError, GenResult, Generated,
        GeneratorKey, Registry, Roles,
    },
    model::{ModelNode, NodeKind, NodeRef, Value},
};

/// Parameter drawing independent copies of the variate.
const REPLICATES: &str = "replicates";

const BERNOULLI: &str = "beastlabs.math.distributions.BernoulliDistribution";

/// A parametric distribution and its BEAST 2 counterpart.
struct Family {
    /// LPhy distribution name.
    name: &'static str,

    /// BEAST 2 distribution class.
    spec: &'static str,

    /// LPhy parameter names and the BEAST 2 inputs they map to.
    params: &'static [(&'static str, &'static str)],

    /// Parameters are given as literal values rather than references.
    by_value: bool,

    support: Support,
}

const FAMILIES: &[Family] = &[
    Family {
        name: "Normal",
        spec: "Normal",
        params: &[("mean", "mean"), ("sd", "sigma")],
        by_value: false,
        support: Support::Real,
    },
    Family {
        name: "LogNormal",
        spec: "LogNormalDistributionModel",
        params: &[("meanlog", "M"), ("sdlog", "S")],
        by_value: false,
        support: Support::Positive,
    },
    Family {
        name: "Exp",
        spec: "Exponential",
        params: &[("mean", "mean")],
        by_value: false,
        support: Support::Positive,
    },
    Family {
        name: "Gamma",
        spec: "Gamma",
        params: &[("shape", "alpha"), ("scale", "beta")],
        by_value: false,
        support: Support::Positive,
    },
    Family {
        name: "InverseGamma",
        spec: "InverseGamma",
        params: &[("alpha", "alpha"), ("beta", "beta")],
        by_value: false,
        support: Support::Positive,
    },
    Family {
        name: "Beta",
        spec: "Beta",
        params: &[("alpha", "alpha"), ("beta", "beta")],
        by_value: false,
        support: Support::Real,
    },
    // BEAST 2 bounds are plain numbers.
    Family {
        name: "Uniform",
        spec: "Uniform",
        params: &[("lower", "lower"), ("upper", "upper")],
        by_value: true,
        support: Support::Real,
    },
    Family {
        name: "Dirichlet",
        spec: "Dirichlet",
        params: &[("conc", "alpha")],
        by_value: false,
        support: Support::Simplex,
    },
    Family {
        name: "Poisson",
        spec: "Poisson",
        params: &[("lambda", "lambda")],
        by_value: false,
        support: Support::Integer,
    },
];

pub(super) fn register(registry: &mut Registry) {
    for family in FAMILIES {
        registry.register_fn(
            GeneratorKey::distribution(family.name),
            family.name,
            move |node, ctx| prior(family, node, ctx),
        );
    }

    registry.register_fn(
        GeneratorKey::distribution("Bernoulli"),
        "Bernoulli",
        bernoulli,
    );
}

/// The `distr` element of the parametric distribution `dist`,
///   which need not be the node being translated.
///
/// Generators that fold a random variable into a construct of their own
///   use this to carry over the distribution it was drawn from.
pub fn distr(ctx: &GenContext, dist: NodeRef) -> Result<Element, GenError> {
    let node = ctx.model().get(dist);

    let family = match node.kind() {
        NodeKind::Distribution { name, .. } => {
            FAMILIES.iter().find(|family| family.name == name)
        }
        _ => None,
    };

    match family {
        Some(family) => family_distr(family, ctx, node),
        None => Err(GenError::Unsupported(format!(
            "`{}` is not a parametric distribution",
            node.class().unwrap_or(node.display_name())
        ))),
    }
}

fn family_distr(
    family: &Family,
    ctx: &GenContext,
    node: &ModelNode,
) -> Result<Element, GenError> {
    family.params.iter().try_fold(
        Element::spec("distr", family.spec),
        |distr, (param, input)| {
            let arg = node
                .arg(param)
                .ok_or_else(|| GenError::MissingParam((*param).into()))?;

            if family.by_value {
                let text = ctx
                    .model()
                    .get(arg)
                    .value()
                    .and_then(Value::parameter_text)
                    .ok_or_else(|| GenError::ParamValue {
                        param: (*param).into(),
                        expected: "a number".into(),
                    })?;

                Ok(distr.attr(*input, text))
            } else {
                Ok(distr.attr_ref(*input, ctx.reference(param, arg)?))
            }
        },
    )
}

fn prior(family: &Family, node: &ModelNode, ctx: &GenContext) -> GenResult {
    let names = family
        .params
        .iter()
        .map(|(name, _)| *name)
        .chain([REPLICATES])
        .collect::<Vec<_>>();
    ctx.expect_args(&names)?;

    let x = ctx.reference("variate", ctx.variate()?)?;
    let distr = family_distr(family, ctx, node)?;

    variate_distribution(
        ctx,
        Element::spec("distribution", "Prior")
            .attr_ref("x", x)
            .child(distr),
        x,
        family.support,
    )
}

/// Independent Bernoulli trials,
///   optionally requiring a minimum number of successes.
fn bernoulli(_: &ModelNode, ctx: &GenContext) -> GenResult {
    ctx.expect_args(&["p", REPLICATES, "minSuccesses"])?;

    let x = ctx.reference("variate", ctx.variate()?)?;
    let el = Element::spec("distribution", BERNOULLI)
        .attr_ref("p", ctx.input("p")?)
        .attr_ref("parameter", x);

    let el = match ctx.opt_input("minSuccesses")? {
        Some(min) => el.attr_ref("minSuccesses", min),
        None => el,
    };

    variate_distribution(ctx, el, x, Support::Boolean)
}

/// The distribution `el` of the variate `x`,
///   and an operator on the variate if it is latent.
fn variate_distribution(
    ctx: &GenContext,
    el: Element,
    x: FragmentRef,
    support: Support,
) -> GenResult {
    let observed = ctx.variate_observed();
    let roles = if observed {
        Roles::LIKELIHOOD
    } else {
        Roles::PRIOR
    };

    let mut gen = Generated::none();
    gen.push_primary(Fragment::new(el).suffix("prior").roles(roles));

    if !observed {
        let dimension = ctx
            .variate_node()?
            .value()
            .map(Value::dimension)
            .unwrap_or(1);

        gen.push(parameter_operator(x, support, dimension));
    }

    Ok(gen)
}
