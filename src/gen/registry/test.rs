// Test generator registry
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

use super::*;
use crate::{
    gen::Generated,
    model::{Model, ModelBuilder, NodeRef, Value},
    span::Span,
};

fn named(name: &'static str) -> Arc<dyn Generator> {
    Arc::new(FnGenerator::new(name, |_: &ModelNode, _: &GenContext| {
        Ok(Generated::none())
    }))
}

fn model() -> Model {
    ModelBuilder::new()
        .constant("c", Value::Real(1.0))
        .distribution("d", "LogNormal", [("meanlog", "c"), ("sdlog", "c")])
        .at(4, 9)
        .random("x", "d", Some(Value::Real(2.0)))
        .build()
        .unwrap()
}

fn node(model: &Model, id: &str) -> NodeRef {
    model.lookup(id).unwrap()
}

#[test]
fn exact_class_preferred_over_logical_type() {
    let mut registry = Registry::new();
    registry.register(
        GeneratorKey::logical(LogicalType::Distribution),
        named("any distribution"),
    );
    registry.register(GeneratorKey::distribution("LogNormal"), named("lognormal"));

    let model = model();
    let d = model.get(node(&model, "d"));

    assert_eq!("lognormal", registry.resolve(d).unwrap().name());
}

#[test]
fn falls_back_to_logical_type() {
    let mut registry = Registry::new();
    registry.register(
        GeneratorKey::logical(LogicalType::Distribution),
        named("any distribution"),
    );
    registry.register(GeneratorKey::distribution("Normal"), named("normal"));

    let model = model();
    let d = model.get(node(&model, "d"));

    assert_eq!("any distribution", registry.resolve(d).unwrap().name());
}

#[test]
fn later_registration_replaces_earlier() {
    let mut registry = Registry::new();
    let key = GeneratorKey::distribution("LogNormal");

    assert!(registry.register(key.clone(), named("built-in")).is_none());

    let prev = registry.register(key.clone(), named("extension"));
    assert_eq!(Some("built-in"), prev.as_ref().map(|gen| gen.name()));

    let model = model();
    let d = model.get(node(&model, "d"));

    assert_eq!("extension", registry.resolve(d).unwrap().name());
    assert_eq!(1, registry.len());
}

#[test]
fn unresolvable_node_is_unsupported_construct() {
    let registry = Registry::new();
    let model = model();
    let d = model.get(node(&model, "d"));

    let err = registry.resolve(d).err().unwrap();

    assert_eq!("d", err.node.id);
    assert_eq!(LogicalType::Distribution, err.node.logical);
    assert_eq!(Some("LogNormal".into()), err.node.class);
    assert_eq!(Span::new(4, 9), err.node.span);
    assert_eq!("Distribution<LogNormal>", err.node.shape());
    assert_eq!("unsupported construct `d` (Distribution<LogNormal>)", err.to_string());
    assert_eq!(2, err.describe().len());
}

#[test]
fn random_variable_resolved_by_value_class() {
    let mut registry = Registry::new();
    registry.register(GeneratorKey::random("Double"), named("real state"));

    let model = model();
    let x = model.get(node(&model, "x"));

    assert_eq!("real state", registry.resolve(x).unwrap().name());
}

#[test]
fn data_types_last_writer_wins() {
    let mut registry = Registry::new();
    assert_eq!(None, registry.data_type("nucleotide"));

    registry.register_data_type("nucleotide", "nucleotide");
    registry.register_data_type("nucleotide", "nucleotideDiploid");

    assert_eq!(Some("nucleotideDiploid"), registry.data_type("nucleotide"));
}

#[test]
fn absorbed_params_by_distribution() {
    let mut registry = Registry::new();
    registry.absorb_param("PhyloCTMC", "siteRates");
    registry.absorb_param("PhyloCTMC", "siteRates");

    assert!(registry.absorbs("PhyloCTMC", "siteRates"));
    assert!(!registry.absorbs("PhyloCTMC", "branchRates"));
    assert!(!registry.absorbs("Yule", "siteRates"));

    let builtins = Registry::with_builtins();
    assert!(builtins.absorbs("PhyloCTMC", "siteRates"));
    assert!(builtins.absorbs("BirthDeathSampling", "rootAge"));
}

#[test]
fn keys_sorted_and_lookup_exact() {
    let mut registry = Registry::new();
    registry.register(GeneratorKey::value("Double"), named("double"));
    registry.register(GeneratorKey::distribution("Exp"), named("exp"));
    registry.register(
        GeneratorKey::logical(LogicalType::Distribution),
        named("any"),
    );

    assert_eq!(
        vec![
            GeneratorKey::logical(LogicalType::Distribution),
            GeneratorKey::distribution("Exp"),
            GeneratorKey::value("Double"),
        ],
        registry.keys(),
    );

    // Lookup does not fall back.
    assert!(registry.lookup(&GeneratorKey::distribution("Gamma")).is_none());
    assert_eq!(
        Some("exp"),
        registry
            .lookup(&GeneratorKey::distribution("Exp"))
            .map(|gen| gen.name())
    );
}

#[test]
fn builtins_cover_common_shapes() {
    let registry = Registry::with_builtins();

    for key in [
        GeneratorKey::value("Double"),
        GeneratorKey::value("Alignment"),
        GeneratorKey::random("Double[]"),
        GeneratorKey::random("TimeTree"),
        GeneratorKey::distribution("LogNormal"),
        GeneratorKey::distribution("PhyloCTMC"),
        GeneratorKey::distribution("Yule"),
        GeneratorKey::function("hky"),
        GeneratorKey::function("nexus"),
    ] {
        assert!(registry.lookup(&key).is_some(), "{key}");
    }

    assert_eq!(Some("nucleotide"), registry.data_type("nucleotide"));
}
