// Generators translating model nodes into fragments
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

//! Generators translating model nodes into target fragments.
//!
//! A [`Generator`] translates one shape of model node into one or more
//!   [`Fragment`]s.
//! Generators are selected by [`GeneratorKey`] from a [`Registry`]:
//!   a key pairs the logical type of a node with an optional concrete
//!   class,
//!     and the most specific registered key wins.
//!
//! Generators never see the translation engine.
//! They are given the node being translated and a [`GenContext`] with
//!   read-only access to the model and to the nodes already translated;
//!     dependencies are referenced by [`FragmentRef::Node`] and are
//!     guaranteed to have been translated first.
//!
//! Built-in generators live in [`builtin`];
//!   extensions contribute more through [`crate::ext`].

pub mod builtin;
mod context;
mod fragment;
mod registry;

pub use context::GenContext;
pub use fragment::{
    AttrValue, Child, Element, Fragment, FragmentId, FragmentRef, Placement,
    Roles, Section,
};
pub use registry::{Registry, UnsupportedConstruct};

use crate::model::{LogicalType, ModelNode};
use std::{
    error::Error,
    fmt::{self, Display},
};

/// Selects a [`Generator`] for a model node.
///
/// Keys are compared by name only,
///   so a generator contributed by an extension matches exactly the same
///   nodes as a built-in one would.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeneratorKey {
    pub logical: LogicalType,
    pub class: Option<String>,
}

impl GeneratorKey {
    /// Key matching any node of the given logical type.
    pub fn logical(logical: LogicalType) -> Self {
        Self {
            logical,
            class: None,
        }
    }

    /// Key matching nodes of the given logical type and concrete class.
    pub fn class<S: Into<String>>(logical: LogicalType, class: S) -> Self {
        Self {
            logical,
            class: Some(class.into()),
        }
    }

    pub fn distribution<S: Into<String>>(name: S) -> Self {
        Self::class(LogicalType::Distribution, name)
    }

    pub fn function<S: Into<String>>(id: S) -> Self {
        Self::class(LogicalType::DeterministicFunction, id)
    }

    pub fn value<S: Into<String>>(class: S) -> Self {
        Self::class(LogicalType::DataValue, class)
    }

    pub fn random<S: Into<String>>(class: S) -> Self {
        Self::class(LogicalType::RandomVariable, class)
    }
}

impl Display for GeneratorKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.class {
            Some(class) => write!(f, "{}<{}>", self.logical, class),
            None => write!(f, "{}", self.logical),
        }
    }
}

/// Translates model nodes of one shape into target fragments.
pub trait Generator: Send + Sync {
    /// Name of this generator for diagnostics and logging.
    fn name(&self) -> &str;

    fn generate(&self, node: &ModelNode, ctx: &GenContext) -> GenResult;
}

pub type GenResult = Result<Generated, GenError>;

/// A [`Generator`] backed by a plain function.
pub struct FnGenerator<F> {
    name: String,
    f: F,
}

impl<F> FnGenerator<F>
where
    F: Fn(&ModelNode, &GenContext) -> GenResult + Send + Sync,
{
    pub fn new<S: Into<String>>(name: S, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Generator for FnGenerator<F>
where
    F: Fn(&ModelNode, &GenContext) -> GenResult + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, node: &ModelNode, ctx: &GenContext) -> GenResult {
        (self.f)(node, ctx)
    }
}

/// Output of a [`Generator`].
///
/// Fragments are ordered as they were pushed and may reference one
///   another by [`FragmentRef::Local`] index.
/// The primary fragment,
///   if any,
///   is what other nodes reference when they depend on this one.
#[derive(Debug, Default)]
pub struct Generated {
    fragments: Vec<Fragment>,
    primary: Option<usize>,
}

impl Generated {
    /// Nothing to emit.
    ///
    /// Nodes depending on a node that generated nothing cannot reference
    ///   it.
    pub fn none() -> Self {
        Self::default()
    }

    /// A single primary fragment.
    pub fn one(fragment: Fragment) -> Self {
        let mut gen = Self::none();
        gen.push_primary(fragment);
        gen
    }

    /// Add a secondary fragment,
    ///   returning a reference to it.
    pub fn push(&mut self, fragment: Fragment) -> FragmentRef {
        self.fragments.push(fragment);
        FragmentRef::Local(self.fragments.len() - 1)
    }

    /// Add the primary fragment,
    ///   replacing any previous designation.
    pub fn push_primary(&mut self, fragment: Fragment) -> FragmentRef {
        let local = self.push(fragment);
        self.primary = Some(self.fragments.len() - 1);
        local
    }

    pub fn primary(&self) -> Option<&Fragment> {
        self.primary.and_then(|i| self.fragments.get(i))
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Fragment>, Option<usize>) {
        (self.fragments, self.primary)
    }
}

/// A generator was unable to translate its node.
///
/// These errors do not identify the node;
///   the translation engine attaches that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    /// A required parameter or argument is absent.
    MissingParam(String),

    /// A parameter or argument is present that the target format has no
    ///   counterpart for.
    UnexpectedParam(String),

    /// A parameter does not hold the kind of value required.
    ParamValue { param: String, expected: String },

    /// A dependency generated no fragment that could be referenced.
    Untranslated { param: String, node: String },

    /// The node has no computed value,
    ///   but translation requires one.
    MissingValue,

    /// The node is recognized but some aspect of it cannot be expressed
    ///   in the target format.
    Unsupported(String),
}

impl Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use GenError::*;

        match self {
            MissingParam(param) => write!(f, "missing parameter `{param}`"),
            UnexpectedParam(param) => {
                write!(f, "parameter `{param}` cannot be translated")
            }
            ParamValue { param, expected } => {
                write!(f, "parameter `{param}` must be {expected}")
            }
            Untranslated { param, node } => write!(
                f,
                "parameter `{param}` refers to `{node}`, \
                   which has no translation"
            ),
            MissingValue => write!(f, "no computed value available"),
            Unsupported(msg) => write!(f, "{msg}"),
        }
    }
}

impl Error for GenError {}
