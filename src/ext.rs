// Loading of generator extensions
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

//! Extensions contributing generators to the registry.
//!
//! An [`Extension`] contributes generators for constructs that core LPhy
//!   does not provide,
//!     or overrides built-in generators for constructs it does.
//! Extensions see only the public [`GeneratorKey`] and [`Generator`]
//!   contract;
//!     they never see the translation engine.
//!
//! Extensions are enumerated by a [`Catalog`] of constructors and loaded
//!   by [`load_extensions`].
//! Each extension registers into its own staging [`Contributions`];
//!   only an extension that initializes successfully has its
//!   contributions applied to the registry.
//! A failing extension,
//!   whether it returns an error or panics,
//!   is reported as an [`ExtensionLoadWarning`] and loading continues
//!   with the next,
//!     since a broken optional extension must not prevent translation
//!     of a model that does not use it.
//!
//! Contributions are applied in catalog order after the built-ins,
//!   so later extensions override earlier ones and all extensions
//!   override built-in generators
//!     (see [`Registry::register`]).
//!
//! Generators are matched by key name alone,
//!   so an extension compiled separately from the core matches exactly
//!   the nodes a built-in generator would.

pub mod mascot;

use crate::gen::{
    FnGenerator, GenContext, GenResult, Generator, GeneratorKey, Registry,
};
use crate::model::ModelNode;
use std::{
    any::Any,
    error::Error,
    fmt::{self, Display},
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use tracing::{debug, info, warn};

/// A module contributing generators.
pub trait Extension {
    fn name(&self) -> &str;

    /// Stage this extension's generators and data types.
    ///
    /// Nothing staged is applied to the registry if this fails.
    fn register(&self, contrib: &mut Contributions) -> Result<(), ExtensionError>;
}

/// Constructor of an extension.
pub type Constructor = fn() -> Result<Box<dyn Extension>, ExtensionError>;

/// Generators and data types staged by a single extension.
#[derive(Default)]
pub struct Contributions {
    generators: Vec<(GeneratorKey, Arc<dyn Generator>)>,
    data_types: Vec<(String, String)>,
    exclusions: Vec<String>,
}

impl Contributions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generator(
        &mut self,
        key: GeneratorKey,
        gen: Arc<dyn Generator>,
    ) -> &mut Self {
        self.generators.push((key, gen));
        self
    }

    pub fn generator_fn<S, F>(
        &mut self,
        key: GeneratorKey,
        name: S,
        f: F,
    ) -> &mut Self
    where
        S: Into<String>,
        F: Fn(&ModelNode, &GenContext) -> GenResult + Send + Sync + 'static,
    {
        self.generator(key, Arc::new(FnGenerator::new(name, f)))
    }

    /// See [`Registry::register_data_type`].
    pub fn data_type<S: Into<String>, D: Into<String>>(
        &mut self,
        sequence_type: S,
        data_type: D,
    ) -> &mut Self {
        self.data_types.push((sequence_type.into(), data_type.into()));
        self
    }

    /// See [`Registry::exclude_function`].
    pub fn exclude_function<S: Into<String>>(&mut self, id: S) -> &mut Self {
        self.exclusions.push(id.into());
        self
    }

    /// Keys of every generator staged,
    ///   in the order they were staged.
    pub fn keys(&self) -> Vec<GeneratorKey> {
        self.generators
            .iter()
            .map(|(key, _)| key.clone())
            .chain(self.exclusions.iter().map(GeneratorKey::function))
            .collect()
    }

    fn apply(self, registry: &mut Registry) {
        for (key, gen) in self.generators {
            registry.register(key, gen);
        }

        for id in self.exclusions {
            registry.exclude_function(id);
        }

        for (sequence_type, data_type) in self.data_types {
            registry.register_data_type(sequence_type, data_type);
        }
    }
}

/// Named extension constructors in load order.
#[derive(Clone, Default)]
pub struct Catalog {
    entries: Vec<(String, Constructor)>,
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every extension compiled into this program.
    pub fn builtin() -> Self {
        Self::new().with(mascot::NAME, mascot::extension)
    }

    pub fn with<S: Into<String>>(mut self, name: S, ctor: Constructor) -> Self {
        self.entries.push((name.into(), ctor));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Restrict this catalog to the extensions named in `names`,
    ///   retaining catalog order.
    pub fn select<S: AsRef<str>>(self, names: &[S]) -> Result<Self, ExtensionError> {
        if let Some(unknown) = names
            .iter()
            .map(AsRef::as_ref)
            .find(|name| !self.names().any(|known| known == *name))
        {
            return Err(ExtensionError::Unknown(unknown.into()));
        }

        let entries = self
            .entries
            .into_iter()
            .filter(|(name, _)| names.iter().any(|n| n.as_ref() == name.as_str()))
            .collect();

        Ok(Self { entries })
    }
}

/// Outcome of loading a single extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionReport {
    pub name: String,

    /// Keys registered by this extension;
    ///   empty if it failed to load.
    pub keys: Vec<GeneratorKey>,

    pub warnings: Vec<ExtensionLoadWarning>,
}

impl ExtensionReport {
    pub fn is_loaded(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Load every extension of `catalog` into `registry`.
///
/// This never fails;
///   an extension that fails to load is reported with a warning and
///   contributes nothing.
pub fn load_extensions(
    catalog: &Catalog,
    registry: &mut Registry,
) -> Vec<ExtensionReport> {
    catalog
        .entries
        .iter()
        .map(|(name, ctor)| load_one(name, *ctor, registry))
        .collect()
}

fn load_one(
    name: &str,
    ctor: Constructor,
    registry: &mut Registry,
) -> ExtensionReport {
    debug!(extension = name, "loading extension");

    let staged = panic::catch_unwind(AssertUnwindSafe(|| {
        let ext = ctor()?;
        let mut contrib = Contributions::new();

        ext.register(&mut contrib)?;
        Ok::<_, ExtensionError>(contrib)
    }))
    .unwrap_or_else(|payload| Err(ExtensionError::Panicked(panic_message(payload))));

    match staged {
        Ok(contrib) => {
            let keys = contrib.keys();
            contrib.apply(registry);

            info!(extension = name, generators = keys.len(), "extension loaded");

            ExtensionReport {
                name: name.into(),
                keys,
                warnings: vec![],
            }
        }

        Err(cause) => {
            let warning = ExtensionLoadWarning {
                extension: name.into(),
                cause,
            };

            warn!("{warning}");

            ExtensionReport {
                name: name.into(),
                keys: vec![],
                warnings: vec![warning],
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|msg| msg.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".into())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    /// The extension failed to initialize or to register its generators.
    Failed(String),

    /// The extension panicked while initializing or registering.
    Panicked(String),

    /// No extension of this name is in the catalog.
    Unknown(String),
}

impl Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Failed(msg) => write!(f, "{msg}"),
            Self::Panicked(msg) => write!(f, "panicked: {msg}"),
            Self::Unknown(name) => write!(f, "unknown extension `{name}`"),
        }
    }
}

impl Error for ExtensionError {}

/// An extension failed to load and contributes nothing.
///
/// This is never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionLoadWarning {
    pub extension: String,
    pub cause: ExtensionError,
}

impl Display for ExtensionLoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "extension `{}` was not loaded: {}",
            self.extension, self.cause
        )
    }
}

impl Error for ExtensionLoadWarning {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.cause)
    }
}

#[cfg(test)]
mod test;
