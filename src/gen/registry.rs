// Registry of generators keyed by node shape
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

//! Registry of [`Generator`]s.
//!
//! Resolution is by [`GeneratorKey`]:
//!   an exact `(logical type, class)` match is tried first,
//!   then a match on the logical type alone.
//! Registering a key that is already present replaces its generator.
//! This last-writer-wins policy is how extensions override built-ins:
//!   extensions are always registered after the built-ins,
//!     in catalog order.
//!
//! ```
//! use lphybeast::gen::{Generated, GeneratorKey, Registry};
//!
//! let mut registry = Registry::new();
//! registry.register_fn(GeneratorKey::distribution("Exp"), "first", |_, _| {
//!     Ok(Generated::none())
//! });
//! registry.register_fn(GeneratorKey::distribution("Exp"), "second", |_, _| {
//!     Ok(Generated::none())
//! });
//!
//! let gen = registry.lookup(&GeneratorKey::distribution("Exp")).unwrap();
//! assert_eq!("second", gen.name());
//! ```

use super::{builtin, FnGenerator, GenContext, GenResult, Generator, GeneratorKey};
use crate::{
    diagnose::{Annotate, AnnotatedSpan, Diagnostic},
    model::{LogicalType, ModelNode, NodeDesc},
};
use fxhash::FxHashMap;
use std::{
    error::Error,
    fmt::{self, Display},
    sync::Arc,
};
use tracing::{debug, info};

#[derive(Clone)]
struct Entry {
    key: GeneratorKey,
    gen: Arc<dyn Generator>,
}

/// Generators available to a translation run.
///
/// A registry is populated at startup and is read-only thereafter;
///   it may be shared between concurrent translation runs.
#[derive(Default, Clone)]
pub struct Registry {
    /// Entries keyed by logical type and then by class.
    exact: FxHashMap<LogicalType, FxHashMap<String, Entry>>,

    /// Entries keyed by logical type alone.
    fallback: FxHashMap<LogicalType, Entry>,

    /// Target data type names by LPhy sequence type.
    data_types: FxHashMap<String, String>,

    /// Parameters of each distribution whose latent random variables are
    ///   translated by that distribution rather than on their own.
    absorbed: FxHashMap<String, Vec<String>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding all built-in generators.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register(&mut registry);
        registry
    }

    /// Register `gen` under `key`,
    ///   returning the generator it replaced,
    ///     if any.
    pub fn register(
        &mut self,
        key: GeneratorKey,
        gen: Arc<dyn Generator>,
    ) -> Option<Arc<dyn Generator>> {
        let entry = Entry {
            key: key.clone(),
            gen,
        };

        let prev = match &key.class {
            Some(class) => self
                .exact
                .entry(key.logical)
                .or_default()
                .insert(class.clone(), entry),
            None => self.fallback.insert(key.logical, entry),
        };

        match &prev {
            Some(prev) => info!(
                key = %key,
                replaced = prev.gen.name(),
                "generator overridden"
            ),
            None => debug!(key = %key, "generator registered"),
        }

        prev.map(|entry| entry.gen)
    }

    /// Register a plain function as the generator for `key`.
    pub fn register_fn<S, F>(&mut self, key: GeneratorKey, name: S, f: F)
    where
        S: Into<String>,
        F: Fn(&ModelNode, &GenContext) -> GenResult + Send + Sync + 'static,
    {
        self.register(key, Arc::new(FnGenerator::new(name, f)));
    }

    /// Translate the function `id` by the generator for its computed
    ///   value rather than by a generator of its own.
    ///
    /// This is used for functions that merely produce data,
    ///   such as reading an alignment from a file.
    pub fn exclude_function<S: Into<String>>(&mut self, id: S) {
        let id = id.into();
        let name = format!("value-only {id}");

        self.register_fn(GeneratorKey::function(id), name, |node, ctx| {
            ctx.translate_value(node)
        });
    }

    /// Have the generator of `distribution` translate the latent random
    ///   variable given as its parameter `param`,
    ///     along with the distribution that variable is drawn from.
    ///
    /// The variable then generates nothing of its own;
    ///   the consuming generator reads it from the model instead.
    /// Gamma site rates,
    ///   for example,
    ///   become attributes of the site model of a tree likelihood.
    pub fn absorb_param<D: Into<String>, P: Into<String>>(
        &mut self,
        distribution: D,
        param: P,
    ) {
        let params = self.absorbed.entry(distribution.into()).or_default();
        let param = param.into();

        if !params.contains(&param) {
            params.push(param);
        }
    }

    /// Whether the parameter `param` of `distribution` is absorbed.
    ///
    /// See [`Registry::absorb_param`].
    pub fn absorbs(&self, distribution: &str, param: &str) -> bool {
        self.absorbed
            .get(distribution)
            .map_or(false, |params| params.iter().any(|p| p == param))
    }

    /// Map the LPhy sequence type `sequence_type` to the target data
    ///   type `data_type`.
    pub fn register_data_type<S: Into<String>, D: Into<String>>(
        &mut self,
        sequence_type: S,
        data_type: D,
    ) {
        let sequence_type = sequence_type.into();
        let data_type = data_type.into();

        debug!(%sequence_type, %data_type, "data type registered");
        self.data_types.insert(sequence_type, data_type);
    }

    pub fn data_type(&self, sequence_type: &str) -> Option<&str> {
        self.data_types.get(sequence_type).map(String::as_str)
    }

    /// Generator registered under exactly `key`.
    pub fn lookup(&self, key: &GeneratorKey) -> Option<&dyn Generator> {
        let entry = match &key.class {
            Some(class) => self
                .exact
                .get(&key.logical)
                .and_then(|classes| classes.get(class)),
            None => self.fallback.get(&key.logical),
        };

        entry.map(|entry| entry.gen.as_ref())
    }

    /// Select the generator for `node`,
    ///   preferring a match on its concrete class.
    pub fn resolve(
        &self,
        node: &ModelNode,
    ) -> Result<&dyn Generator, UnsupportedConstruct> {
        let logical = node.logical();

        let exact = node.class().and_then(|class| {
            self.exact
                .get(&logical)
                .and_then(|classes| classes.get(class))
        });

        exact
            .or_else(|| self.fallback.get(&logical))
            .map(|entry| entry.gen.as_ref())
            .ok_or_else(|| UnsupportedConstruct {
                node: node.describe(),
            })
    }

    /// Every registered key,
    ///   sorted.
    pub fn keys(&self) -> Vec<GeneratorKey> {
        let mut keys = self
            .exact
            .values()
            .flat_map(|classes| classes.values())
            .chain(self.fallback.values())
            .map(|entry| entry.key.clone())
            .collect::<Vec<_>>();

        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.exact.values().map(|classes| classes.len()).sum::<usize>()
            + self.fallback.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// No generator is registered for the shape of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedConstruct {
    pub node: NodeDesc,
}

impl Display for UnsupportedConstruct {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unsupported construct {}", self.node)
    }
}

impl Error for UnsupportedConstruct {}

impl Diagnostic for UnsupportedConstruct {
    fn describe(&self) -> Vec<AnnotatedSpan> {
        self.node
            .span
            .error(format!("no generator for {}", self.node.shape()))
            .with_help(
                "an extension providing this construct may not be loaded",
            )
            .to_vec()
    }
}

#[cfg(test)]
mod test;
