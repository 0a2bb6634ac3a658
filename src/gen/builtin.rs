// Built-in generators
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

//! Built-in generators.
//!
//! These cover the values,
//!   distributions and functions of core LPhy that have a BEAST 2
//!   counterpart.
//! Extensions may override any of them by registering the same key
//!   (see [`crate::ext`]).

mod distributions;
mod likelihood;
pub mod operators;
mod substitution;
mod trees;
mod values;

pub use trees::{taxon_set, tree_prior};
pub use values::parameter;

use super::Registry;

/// LPhy sequence types and their BEAST 2 data type names.
const DATA_TYPES: &[(&str, &str)] = &[
    ("nucleotide", "nucleotide"),
    ("aminoacid", "aminoacid"),
    ("binary", "binary"),
];

/// Functions that only read or reshape data,
///   translated by their computed value.
const VALUE_ONLY_FUNCTIONS: &[&str] = &[
    "nexus",
    "fasta",
    "readNexus",
    "readFasta",
    "taxa",
    "ntaxa",
    "nchar",
    "rep",
    "split",
];

/// Register every built-in generator with `registry`.
pub fn register(registry: &mut Registry) {
    values::register(registry);
    distributions::register(registry);
    trees::register(registry);
    likelihood::register(registry);
    substitution::register(registry);

    for (sequence_type, data_type) in DATA_TYPES {
        registry.register_data_type(*sequence_type, *data_type);
    }

    for id in VALUE_ONLY_FUNCTIONS {
        registry.exclude_function(*id);
    }
}
