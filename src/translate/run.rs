// Assembly of the inference run
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

//! Assembly of the inference run from translated fragments.
//!
//! Generators declare the part each fragment plays through its
//!   [`Roles`];
//!     this module gathers them into the run:
//!
//!   - the state,
//!       holding every [`Roles::STATE`] fragment;
//!   - the posterior,
//!       a compound of the prior ([`Roles::PRIOR`]) and the likelihood
//!       ([`Roles::LIKELIHOOD`]);
//!   - the screen and trace loggers,
//!       the latter logging every [`Roles::LOG`] fragment;
//!   - a tree logger for each [`Roles::TREE_LOG`] fragment;
//!   - and the `MCMC` or `CoupledMCMC` run element itself.
//!
//! Operators are not gathered here;
//!   they are emitted within the run from their own section.

use super::{Arena, IdLabel, TranslateError};
use crate::{
    config::RunConfig,
    gen::{Element, Fragment, FragmentId, Placement, Roles},
    global::{NUM_OF_SAMPLES, SCREEN_LOG_FACTOR},
};
use tracing::{info, warn};

pub const STATE_ID: &str = "state";
pub const PRIOR_ID: &str = "prior";
pub const LIKELIHOOD_ID: &str = "likelihood";
pub const POSTERIOR_ID: &str = "posterior";
pub const TRACE_LOGGER_ID: &str = "Logger";
pub const SCREEN_LOGGER_ID: &str = "ScreenLogger";
pub const MCMC_ID: &str = "mcmc";
pub const MC3_ID: &str = "mcmcmc";

const COUPLED_MCMC: &str = "beast.coupledMCMC.CoupledMCMC";
const TREE_STAT_LOGGER: &str = "beast.base.evolution.tree.TreeStatLogger";

/// Fragments of the arena by the roles they play.
#[derive(Debug, Default)]
struct Gathered {
    state: Vec<FragmentId>,
    priors: Vec<FragmentId>,
    likelihoods: Vec<FragmentId>,
    logged: Vec<FragmentId>,
    trees: Vec<(FragmentId, IdLabel)>,

    /// Total free dimensions of the state.
    dimension: usize,
}

fn gather(arena: &Arena) -> Gathered {
    let mut gathered = Gathered::default();

    for (i, doc) in arena.fragments.iter().enumerate() {
        let (id, roles) = (FragmentId::new(i), doc.fragment.roles);

        if roles.contains(Roles::STATE) {
            gathered.state.push(id);
            gathered.dimension += doc.fragment.dimension;
        }
        if roles.contains(Roles::PRIOR) {
            gathered.priors.push(id);
        }
        if roles.contains(Roles::LIKELIHOOD) {
            gathered.likelihoods.push(id);
        }
        if roles.contains(Roles::LOG) {
            gathered.logged.push(id);
        }
        if roles.contains(Roles::TREE_LOG) {
            gathered.trees.push((id, doc.label.clone()));
        }
    }

    gathered
}

/// Append the inference run to `arena`,
///   returning its root fragment.
pub(super) fn assemble(
    arena: &mut Arena,
    config: &RunConfig,
) -> Result<FragmentId, TranslateError> {
    let gathered = gather(arena);

    if gathered.state.is_empty() {
        return Err(TranslateError::NoState);
    }

    let log_every = config.log_every();
    let pre_burnin = config.pre_burnin(gathered.dimension);

    if config.samples() < NUM_OF_SAMPLES / 2 {
        warn!(
            samples = config.samples(),
            preferred = NUM_OF_SAMPLES,
            "too few samples would be logged"
        );
    }

    let state = arena.push(
        inline(gathered.state.iter().fold(Element::new("state"), |el, id| {
            el.child_ref("stateNode", *id)
        })),
        IdLabel::Fixed(STATE_ID),
    );

    let prior = compound(arena, &gathered.priors, PRIOR_ID, false);
    let likelihood =
        compound(arena, &gathered.likelihoods, LIKELIHOOD_ID, true);

    let posterior = arena.push(
        inline(
            prior
                .iter()
                .chain(&likelihood)
                .fold(compound_element(), |el, id| {
                    el.child_ref("distribution", *id)
                }),
        ),
        IdLabel::Fixed(POSTERIOR_ID),
    );

    // Screen output summarizes the run;
    //   the trace holds every logged value.
    let summary = [Some(posterior), likelihood, prior]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    arena.push(
        in_loggers(logger(
            log_every.saturating_mul(SCREEN_LOG_FACTOR),
            None,
            &summary,
        )),
        IdLabel::Fixed(SCREEN_LOGGER_ID),
    );

    let mut traced = summary.clone();
    traced.extend(&gathered.logged);

    for (tree, label) in &gathered.trees {
        let stat = arena.push(
            inline(Element::spec("log", TREE_STAT_LOGGER).attr_ref("tree", *tree)),
            label.derive("treeStat"),
        );

        traced.push(stat);
    }

    arena.push(
        in_loggers(logger(
            log_every,
            Some(format!("{}.log", config.file_stem)),
            &traced,
        )),
        IdLabel::Fixed(TRACE_LOGGER_ID),
    );

    let several_trees = gathered.trees.len() > 1;

    for (tree, label) in &gathered.trees {
        let file = match (several_trees, label) {
            (true, IdLabel::Node { base, .. }) => {
                format!("{}.{}.trees", config.file_stem, base)
            }
            _ => format!("{}.trees", config.file_stem),
        };

        arena.push(
            in_loggers(logger(log_every, Some(file), &[*tree]).attr("mode", "tree")),
            label.derive("treeLogger"),
        );
    }

    let (run, id) = match &config.mc3 {
        None => (Element::spec("run", "MCMC"), MCMC_ID),
        Some(mc3) => (
            Element::spec("run", COUPLED_MCMC)
                .attr("chains", mc3.chains.to_string())
                .attr("deltaTemperature", mc3.delta_temperature.to_string())
                .attr("resampleEvery", mc3.resample_every.to_string())
                .attr("target", mc3.target.to_string()),
            MC3_ID,
        ),
    };

    let run = run
        .attr("chainLength", config.chain_length.to_string())
        .attr_opt("preBurnin", (pre_burnin > 0).then(|| pre_burnin.to_string()))
        .attr_opt("sampleFromPrior", config.sample_from_prior.then_some("true"))
        .child_ref("state", state)
        .child_ref("distribution", posterior);

    info!(
        chain_length = config.chain_length,
        log_every,
        pre_burnin,
        state_nodes = gathered.state.len(),
        coupled = config.mc3.is_some(),
        "inference run assembled"
    );

    Ok(arena.push(inline(run), IdLabel::Fixed(id)))
}

fn inline(element: Element<FragmentId>) -> Fragment<FragmentId> {
    Fragment::new(element)
}

fn compound_element() -> Element<FragmentId> {
    Element::spec("distribution", "CompoundDistribution")
}

/// Compound of `members`,
///   or [`None`] if there are none.
fn compound(
    arena: &mut Arena,
    members: &[FragmentId],
    id: &'static str,
    threaded: bool,
) -> Option<FragmentId> {
    if members.is_empty() {
        return None;
    }

    let el = members.iter().fold(compound_element(), |el, member| {
        el.child_ref("distribution", *member)
    });

    let el = if threaded {
        el.attr("useThreads", "true")
    } else {
        el
    };

    Some(arena.push(inline(el), IdLabel::Fixed(id)))
}

fn logger(
    log_every: u64,
    file_name: Option<String>,
    logged: &[FragmentId],
) -> Element<FragmentId> {
    let el = Element::spec("logger", "Logger")
        .attr_opt("fileName", file_name)
        .attr("logEvery", log_every.to_string());

    logged.iter().fold(el, |el, id| el.child_ref("log", *id))
}

fn in_loggers(element: Element<FragmentId>) -> Fragment<FragmentId> {
    Fragment::new(element).placement(Placement::LOGGERS)
}
