// LPhy model graph
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

//! In-memory representation of a parsed LPhy model.
//!
//! A [`Model`] is a directed acyclic graph of [`ModelNode`]s:
//!   random variables,
//!   the distributions that generate them,
//!   deterministic functions,
//!   and data values.
//! The graph is produced once per translation run,
//!   either from an interchange document (see [`load`]) or directly via
//!   [`ModelBuilder`],
//!   and is immutable thereafter.
//!
//! Edges
//! =====
//! Edges point from a node to each node that must be translated before
//!   it.
//! This is the direction of parameter and argument references,
//!   with one exception:
//!     a random variable names its generating distribution,
//!     but the edge runs from the distribution to the random variable.
//! Values are therefore translated before the distributions that place
//!   priors or likelihoods on them,
//!     which is what the target format expects
//!       (a prior references the state node it constrains).
//!
//! An observed random variable additionally depends on the data-block
//!   value it is bound to,
//!     whose translation it aliases.

mod error;
mod graph;
pub mod load;
mod node;
mod value;
pub mod visit;

pub use error::ModelError;
pub use graph::{
    Decl, DeclKind, Dep, Model, ModelBuilder, ModelResult, NodeRef,
};
pub use node::{Arg, LogicalType, ModelNode, NodeDesc, NodeKind};
pub use value::{real_text, Alignment, Sequence, Taxon, TimeTree, Value};
