// Test topological sort of the model graph
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
    model::{ModelBuilder, Value},
    span::Span,
};

fn sorted_ids(model: &Model) -> Vec<String> {
    let live = model.live_nodes();

    model
        .topo_sort(&live)
        .map(|result| result.map(|node| model.get(node).id().to_string()))
        .collect::<Result<_, _>>()
        .unwrap()
}

fn position(ids: &[String], id: &str) -> usize {
    ids.iter().position(|x| x == id).unwrap()
}

#[test]
fn every_node_follows_its_dependencies() {
    let model = ModelBuilder::new()
        .random("Theta", "d_theta", Some(Value::Real(1.0)))
        .distribution("d_theta", "LogNormal", [("meanlog", "c1"), ("sdlog", "c2")])
        .constant("c1", Value::Real(3.0))
        .constant("c2", Value::Real(1.0))
        .random("psi", "d_psi", None)
        .distribution("d_psi", "Coalescent", [("theta", "Theta")])
        .build()
        .unwrap();

    let ids = sorted_ids(&model);
    assert_eq!(6, ids.len());

    for node in model.nodes() {
        let at = position(&ids, model.get(node).id());

        for dep in model.dependencies(node) {
            assert!(
                position(&ids, model.get(dep).id()) < at,
                "{} must precede {}",
                model.get(dep).id(),
                model.get(node).id(),
            );
        }
    }
}

#[test]
fn independent_nodes_keep_declaration_order() {
    let model = ModelBuilder::new()
        .value("c", Value::Real(3.0))
        .value("a", Value::Real(1.0))
        .value("b", Value::Real(2.0))
        .build()
        .unwrap();

    assert_eq!(vec!["c", "a", "b"], sorted_ids(&model));
}

#[test]
fn dependencies_visited_in_declaration_order() {
    // `f` is declared first but depends on `y` and then `x`,
    //   so those are emitted before it in that order.
    let model = ModelBuilder::new()
        .function("f", "sum", [("a", "y"), ("b", "x")], None)
        .value("x", Value::Real(1.0))
        .value("y", Value::Real(2.0))
        .build()
        .unwrap();

    assert_eq!(vec!["y", "x", "f"], sorted_ids(&model));
}

#[test]
fn shared_dependency_emitted_once() {
    let model = ModelBuilder::new()
        .value("shared", Value::Real(1.0))
        .function("f", "exp", [("x", "shared")], None)
        .function("g", "log", [("x", "shared")], None)
        .function("h", "sum", [("a", "f"), ("b", "g")], None)
        .build()
        .unwrap();

    assert_eq!(vec!["shared", "f", "g", "h"], sorted_ids(&model));
}

#[test]
fn sort_is_deterministic() {
    let build = || {
        ModelBuilder::new()
            .value("x", Value::Real(1.0))
            .function("f", "exp", [("x", "x")], None)
            .function("g", "sum", [("a", "f"), ("b", "x")], None)
            .random("y", "d", None)
            .distribution("d", "Normal", [("mean", "g"), ("sd", "x")])
            .build()
            .unwrap()
    };

    assert_eq!(sorted_ids(&build()), sorted_ids(&build()));
}

#[test]
fn cycle_reported_and_traversal_ends() {
    let model = ModelBuilder::new()
        .function("f", "exp", [("x", "g")], None)
        .at(1, 1)
        .function("g", "log", [("x", "f")], None)
        .at(2, 1)
        .build()
        .unwrap();

    let live = model.live_nodes();
    let mut sort = model.topo_sort(&live);

    assert_eq!(
        Some(Err(ModelError::Cycle {
            id: "f".into(),
            span: Span::new(1, 1),
        })),
        sort.next(),
    );

    assert_eq!(None, sort.next());
}

#[test]
fn explicit_init_limits_traversal() {
    let model = ModelBuilder::new()
        .value("x", Value::Real(1.0))
        .value("unrelated", Value::Real(2.0))
        .function("f", "exp", [("x", "x")], None)
        .build()
        .unwrap();

    let f = model.lookup("f").unwrap();
    let sorted = topo_sort(&model, [f].into_iter())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(vec![model.lookup("x").unwrap(), f], sorted);
}
