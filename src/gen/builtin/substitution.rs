// Generators for substitution models
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

//! Substitution models.
//!
//! LPhy constructs rate matrices with deterministic functions;
//!   each is translated into the BEAST 2 substitution model it
//!   parameterizes.
//! Substitution models are nested within the site model of the tree
//!   likelihood using them.

use crate::{
    gen::{
        Element, Fragment, FragmentRef, GenContext, GenResult, Generated,
        GeneratorKey, Registry,
    },
    model::ModelNode,
};

const EQUAL_NUCLEOTIDE_FREQUENCIES: &str = "0.25 0.25 0.25 0.25";

pub(super) fn register(registry: &mut Registry) {
    registry.register_fn(GeneratorKey::function("jukesCantor"), "JC69", jc69);
    registry.register_fn(GeneratorKey::function("k80"), "K80", k80);
    registry.register_fn(GeneratorKey::function("f81"), "F81", f81);
    registry.register_fn(GeneratorKey::function("hky"), "HKY", hky);
    registry.register_fn(GeneratorKey::function("gtr"), "GTR", gtr);
    registry.register_fn(GeneratorKey::function("tn93"), "TN93", tn93);
    registry.register_fn(GeneratorKey::function("wag"), "WAG", wag);
}

fn subst_model(spec: &str) -> Element {
    Element::spec("substModel", spec)
}

fn frequencies(freq: FragmentRef) -> Element {
    Element::spec("frequencies", "Frequencies").attr_ref("frequencies", freq)
}

fn equal_frequencies() -> Element {
    Element::spec("frequencies", "Frequencies")
        .attr("frequencies", EQUAL_NUCLEOTIDE_FREQUENCIES)
}

fn one(el: Element) -> GenResult {
    Ok(Generated::one(Fragment::new(el)))
}

fn jc69(_: &ModelNode, ctx: &GenContext) -> GenResult {
    ctx.expect_args(&[])?;
    one(subst_model("JukesCantor"))
}

fn k80(_: &ModelNode, ctx: &GenContext) -> GenResult {
    ctx.expect_args(&["kappa"])?;

    one(subst_model("HKY")
        .attr_ref("kappa", ctx.input("kappa")?)
        .child(equal_frequencies()))
}

/// F81 is HKY without a transition/transversion bias.
fn f81(_: &ModelNode, ctx: &GenContext) -> GenResult {
    ctx.expect_args(&["freq"])?;

    one(subst_model("HKY")
        .attr("kappa", "1.0")
        .child(frequencies(ctx.input("freq")?)))
}

fn hky(_: &ModelNode, ctx: &GenContext) -> GenResult {
    ctx.expect_args(&["kappa", "freq"])?;

    one(subst_model("HKY")
        .attr_ref("kappa", ctx.input("kappa")?)
        .child(frequencies(ctx.input("freq")?)))
}

fn gtr(_: &ModelNode, ctx: &GenContext) -> GenResult {
    ctx.expect_args(&["rates", "freq"])?;

    one(subst_model("GTR")
        .attr_ref("rates", ctx.input("rates")?)
        .child(frequencies(ctx.input("freq")?)))
}

fn tn93(_: &ModelNode, ctx: &GenContext) -> GenResult {
    ctx.expect_args(&["kappa1", "kappa2", "freq"])?;

    one(subst_model("TN93")
        .attr_ref("kappa1", ctx.input("kappa1")?)
        .attr_ref("kappa2", ctx.input("kappa2")?)
        .child(frequencies(ctx.input("freq")?)))
}

/// Empirical amino acid model with optional frequencies.
fn wag(_: &ModelNode, ctx: &GenContext) -> GenResult {
    ctx.expect_args(&["freq"])?;

    let el = subst_model("WAG");

    one(match ctx.opt_input("freq")? {
        Some(freq) => el.child(frequencies(freq)),
        None => el,
    })
}
