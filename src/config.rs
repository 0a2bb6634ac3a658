// Translation configuration
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

//! Configuration of a translation run.
//!
//! A [`Config`] is assembled by the command line driver,
//!   or directly by library users,
//!   and is validated once before translation begins.
//! Every setting has a default,
//!   so `Config::default()` is a valid configuration.
//!
//! The run settings describe the inference the generated document will
//!   perform;
//!     they do not affect how individual model nodes are translated.

use crate::{
    ext::{Catalog, ExtensionError},
    global::{DEFAULT_CHAIN_LENGTH, NUM_OF_SAMPLES},
};
use std::{
    error::Error,
    fmt::{self, Display},
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub run: RunConfig,
    pub extensions: ExtensionSelection,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.run.validate()
    }

    /// Extensions to load,
    ///   drawn from those compiled into this program.
    pub fn catalog(&self) -> Result<Catalog, ConfigError> {
        self.extensions.catalog(Catalog::builtin())
    }
}

/// Settings of the generated inference run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Total number of MCMC iterations.
    pub chain_length: u64,

    /// Logging frequency;
    ///   [`None`] derives it from the chain length.
    pub log_every: Option<u64>,

    /// Iterations run before the main loop;
    ///   [`None`] derives it from the size of the state.
    pub pre_burnin: Option<u64>,

    /// Ignore the likelihood and sample from the prior alone.
    pub sample_from_prior: bool,

    /// Stem of the trace and tree log file names.
    pub file_stem: String,

    /// Run Metropolis-coupled MCMC rather than a single chain.
    pub mc3: Option<Mc3Config>,

    /// Keep non-ASCII letters in element ids rather than spelling them
    ///   out.
    pub unicode_ids: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            chain_length: DEFAULT_CHAIN_LENGTH,
            log_every: None,
            pre_burnin: None,
            sample_from_prior: false,
            file_stem: "lphybeast".into(),
            mc3: None,
            unicode_ids: false,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_length < NUM_OF_SAMPLES {
            return Err(ConfigError::ChainTooShort(self.chain_length));
        }

        match self.log_every {
            Some(0) => return Err(ConfigError::ZeroLogEvery),
            Some(n) if n > self.chain_length => {
                return Err(ConfigError::LogEveryExceedsChain {
                    log_every: n,
                    chain_length: self.chain_length,
                })
            }
            _ => (),
        }

        if self.file_stem.is_empty() {
            return Err(ConfigError::EmptyFileStem);
        }

        match &self.mc3 {
            Some(mc3) => mc3.validate(),
            None => Ok(()),
        }
    }

    /// Logging frequency in iterations.
    pub fn log_every(&self) -> u64 {
        self.log_every
            .unwrap_or(self.chain_length / NUM_OF_SAMPLES)
            .max(1)
    }

    /// Number of samples the trace logger will record.
    pub fn samples(&self) -> u64 {
        self.chain_length / self.log_every()
    }

    /// Pre-burnin for a state of `dimension` free dimensions.
    pub fn pre_burnin(&self, dimension: usize) -> u64 {
        self.pre_burnin.unwrap_or(dimension as u64 * 10)
    }
}

/// Settings of a Metropolis-coupled run.
#[derive(Debug, Clone, PartialEq)]
pub struct Mc3Config {
    pub chains: u32,
    pub delta_temperature: f64,
    pub resample_every: u64,
    pub target: f64,
}

impl Mc3Config {
    pub fn with_chains(chains: u32) -> Self {
        Self {
            chains,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.chains < 2 {
            return Err(ConfigError::TooFewChains(self.chains));
        }

        if !(self.target > 0.0 && self.target < 1.0) {
            return Err(ConfigError::Mc3Target(self.target));
        }

        Ok(())
    }
}

impl Default for Mc3Config {
    fn default() -> Self {
        Self {
            chains: 4,
            delta_temperature: 0.1,
            resample_every: 1000,
            target: 0.234,
        }
    }
}

/// Extensions enabled for a run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExtensionSelection {
    #[default]
    All,
    Only(Vec<String>),
    None,
}

impl ExtensionSelection {
    pub fn catalog(&self, available: Catalog) -> Result<Catalog, ConfigError> {
        match self {
            Self::All => Ok(available),
            Self::Only(names) => Ok(available.select(names.as_slice())?),
            Self::None => Ok(Catalog::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Too few iterations to log the expected number of samples.
    ChainTooShort(u64),

    ZeroLogEvery,

    /// Nothing would ever be logged.
    LogEveryExceedsChain { log_every: u64, chain_length: u64 },

    EmptyFileStem,

    TooFewChains(u32),

    /// Target acceptance probability of chain swaps is not a probability.
    Mc3Target(f64),

    Extension(ExtensionError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ConfigError::*;

        match self {
            ChainTooShort(len) => write!(
                f,
                "chain length {len} is too short; \
                   it must be at least {NUM_OF_SAMPLES}"
            ),
            ZeroLogEvery => write!(f, "log frequency must be positive"),
            LogEveryExceedsChain {
                log_every,
                chain_length,
            } => write!(
                f,
                "log frequency {log_every} exceeds chain length {chain_length}"
            ),
            EmptyFileStem => write!(f, "log file stem must not be empty"),
            TooFewChains(n) => write!(
                f,
                "coupled MCMC requires at least 2 chains, but {n} given"
            ),
            Mc3Target(target) => write!(
                f,
                "target swap acceptance {target} must lie between 0 and 1"
            ),
            Extension(e) => e.fmt(f),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Extension(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ExtensionError> for ConfigError {
    fn from(e: ExtensionError) -> Self {
        Self::Extension(e)
    }
}
