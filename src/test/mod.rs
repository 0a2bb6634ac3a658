// Shared fixtures for tests
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

use crate::model::{Alignment, ModelBuilder, Sequence, TimeTree, Value};

/// Ensures that tests will hit debug assertions.
///
/// Debug assertions are used to enforce invariants that would certainly be
///   hit by tests if violated,
///     and so have no need to be included in release builds.
///
/// If this test fails,
///   then optimization settings are inhibiting debug assertions.
/// See the documentation for [`debug_assert!`] for more information.
#[test]
#[should_panic]
fn uses_debug_assertions() {
    debug_assert!(false, "should panic");
}

/// Nucleotide alignment with one short sequence per taxon.
pub fn alignment(taxa: &[&str]) -> Value {
    Value::Alignment(Alignment {
        sequence_type: "nucleotide".into(),
        sequences: taxa
            .iter()
            .map(|taxon| Sequence {
                taxon: (*taxon).into(),
                data: "ACGTACGTAC".into(),
            })
            .collect(),
    })
}

pub fn tree(newick: &str) -> Value {
    Value::Tree(TimeTree {
        newick: newick.into(),
    })
}

/// HKY model of a four-taxon alignment on a fixed tree,
///   estimating only `kappa`.
///
/// Further nodes may be declared in the model block.
pub fn hky_model() -> ModelBuilder {
    ModelBuilder::new()
        .source("hky.lphy")
        .data_block()
        .value("aln", alignment(&["A", "B", "C", "D"]))
        .model_block()
        .constant("m", Value::Real(1.0))
        .constant("s", Value::Real(0.5))
        .distribution("d_kappa", "LogNormal", [("meanlog", "m"), ("sdlog", "s")])
        .random("kappa", "d_kappa", Some(Value::Real(2.0)))
        .constant("freq", Value::RealArray(vec![0.25; 4]))
        .function("Q", "hky", [("kappa", "kappa"), ("freq", "freq")], None)
        .value("tree", tree("((A:1.0,B:1.0):1.0,(C:1.0,D:1.0):1.0);"))
        .distribution("d_D", "PhyloCTMC", [("tree", "tree"), ("Q", "Q")])
        .observed("D", "d_D", "aln")
}
