// Model graph nodes
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

//! Nodes of the model graph.

use super::{NodeRef, Value};
use crate::span::Span;
use std::fmt::{self, Display};

/// Logical type of a model node.
///
/// This is the coarse half of a
///   [`GeneratorKey`](crate::gen::GeneratorKey).
/// Each variant has a stable string name
///   (see [`LogicalType::as_str`])
///   so that generators contributed by extensions are matched by name
///   rather than by any Rust type identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogicalType {
    RandomVariable,
    Distribution,
    DeterministicFunction,
    DataValue,
}

impl LogicalType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RandomVariable => "RandomVariable",
            Self::Distribution => "Distribution",
            Self::DeterministicFunction => "DeterministicFunction",
            Self::DataValue => "DataValue",
        }
    }
}

impl Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named parameter or argument referencing another node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub name: String,
    pub node: NodeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A variable drawn from `distribution`.
    ///
    /// An observed random variable is bound to the data-block node
    ///   `observed`;
    ///     otherwise it is latent and will be estimated.
    /// `value` is the value sampled by the LPhy runtime,
    ///   used as the initial state of the chain.
    RandomVariable {
        distribution: NodeRef,
        observed: Option<NodeRef>,
        value: Option<Value>,
    },

    /// Application of the function `function` to ordered, named
    ///   arguments,
    ///     along with its computed value if known.
    DeterministicFunction {
        function: String,
        args: Vec<Arg>,
        value: Option<Value>,
    },

    /// A literal.
    DataValue(Value),

    /// A generative distribution with named parameters.
    Distribution { name: String, params: Vec<Arg> },
}

/// A node of the model graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
    id: String,
    name: Option<String>,
    span: Span,
    kind: NodeKind,
}

impl ModelNode {
    pub fn new(
        id: String,
        name: Option<String>,
        span: Span,
        kind: NodeKind,
    ) -> Self {
        Self {
            id,
            name,
            span,
            kind,
        }
    }

    /// Unique identifier of this node within its model.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name given to this node by the modeler,
    ///   if any.
    ///
    /// Literals and distributions are usually anonymous.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name if present,
    ///   otherwise identifier.
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or(&self.id)
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn logical(&self) -> LogicalType {
        match self.kind {
            NodeKind::RandomVariable { .. } => LogicalType::RandomVariable,
            NodeKind::DeterministicFunction { .. } => {
                LogicalType::DeterministicFunction
            }
            NodeKind::DataValue(_) => LogicalType::DataValue,
            NodeKind::Distribution { .. } => LogicalType::Distribution,
        }
    }

    /// Concrete class of this node.
    ///
    /// This is the value class for random variables and data values,
    ///   the distribution name for distributions,
    ///   and the function identifier for deterministic functions.
    /// A random variable without a known value has no concrete class.
    pub fn class(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::RandomVariable { value, .. } => {
                value.as_ref().map(Value::class)
            }
            NodeKind::DeterministicFunction { function, .. } => {
                Some(function.as_str())
            }
            NodeKind::DataValue(value) => Some(value.class()),
            NodeKind::Distribution { name, .. } => Some(name.as_str()),
        }
    }

    /// Value held or computed by this node.
    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::RandomVariable { value, .. }
            | NodeKind::DeterministicFunction { value, .. } => value.as_ref(),
            NodeKind::DataValue(value) => Some(value),
            NodeKind::Distribution { .. } => None,
        }
    }

    /// Named parameters of a distribution or arguments of a function.
    pub fn args(&self) -> &[Arg] {
        match &self.kind {
            NodeKind::DeterministicFunction { args, .. }
            | NodeKind::Distribution { params: args, .. } => args,
            _ => &[],
        }
    }

    /// Look up a parameter or argument by name.
    pub fn arg(&self, name: &str) -> Option<NodeRef> {
        self.args()
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| arg.node)
    }

    pub fn is_observed(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::RandomVariable {
                observed: Some(_),
                ..
            }
        )
    }

    /// Identifying summary of this node for diagnostics.
    pub fn describe(&self) -> NodeDesc {
        NodeDesc {
            id: self.id.clone(),
            name: self.name.clone(),
            logical: self.logical(),
            class: self.class().map(String::from),
            span: self.span,
        }
    }
}

/// Owned description of a node,
///   retained by errors after the model is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDesc {
    pub id: String,
    pub name: Option<String>,
    pub logical: LogicalType,
    pub class: Option<String>,
    pub span: Span,
}

impl NodeDesc {
    /// Shape of the node as it appears in generator keys,
    ///   e.g. `Distribution<LogNormal>`.
    pub fn shape(&self) -> String {
        match &self.class {
            Some(class) => format!("{}<{}>", self.logical, class),
            None => self.logical.to_string(),
        }
    }
}

impl Display for NodeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if *name != self.id => {
                write!(f, "`{}` (node `{}`, {})", name, self.id, self.shape())
            }
            _ => write!(f, "`{}` ({})", self.id, self.shape()),
        }
    }
}
