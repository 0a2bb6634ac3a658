// Global constants
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

//! System-wide static configuration.
//!
//! Subsystems should reference these values rather than defining their own
//!   and risk incompatibilities as the target format changes.
//!
//! By convention,
//!   import this entire module rather than individual members and reference
//!   them as `global::foo` to emphasize their nature.

/// A size capable of representing every node of a single model graph.
///
/// LPhy models are small relative to this limit even after vectorized
///   functions are expanded by the parser.
pub type ModelIndexSize = u32;

/// Version attribute of the root `beast` element.
pub const BEAST_VERSION: &str = "2.7";

/// Packages searched by BEAST when resolving unqualified `spec`
///   attributes.
pub const BEAST_NAMESPACE: &str = "beast.base.inference\
    :beast.base.inference.parameter\
    :beast.base.inference.distribution\
    :beast.base.evolution.alignment\
    :beast.base.evolution.tree\
    :beast.base.evolution.tree.coalescent\
    :beast.base.evolution.speciation\
    :beast.base.evolution.sitemodel\
    :beast.base.evolution.substitutionmodel\
    :beast.base.evolution.likelihood\
    :beast.base.evolution.branchratemodel\
    :beast.base.evolution.operator\
    :beast.base.evolution";

/// Number of samples the trace logger should record over the whole chain.
///
/// The default logging frequency is derived from this value and the
///   chain length.
pub const NUM_OF_SAMPLES: u64 = 2000;

/// Default MCMC chain length.
pub const DEFAULT_CHAIN_LENGTH: u64 = 1_000_000;

/// Screen logging is this many times less frequent than trace logging.
pub const SCREEN_LOG_FACTOR: u64 = 100;

/// Exponent applied to a parameter dimension to derive operator weights.
pub const OPERATOR_WEIGHT_POW: f64 = 0.7;

/// Exponent used for operators that should not dominate large trees.
pub const OPERATOR_WEIGHT_POW_LOW: f64 = 0.2;
