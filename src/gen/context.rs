// Context available to generators
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

use super::{
    FragmentId, FragmentRef, GenError, GenResult, GeneratorKey, Registry,
};
use crate::model::{LogicalType, Model, ModelNode, NodeRef, Value};
use fxhash::FxHashMap;

/// Read-only view of a translation run given to a
///   [`Generator`](super::Generator).
///
/// Every dependency of the node being translated has already been
///   translated when its generator is invoked.
pub struct GenContext<'a> {
    model: &'a Model,
    registry: &'a Registry,

    /// Primary fragment of each translated node,
    ///   or [`None`] if it generated nothing.
    resolved: &'a FxHashMap<NodeRef, Option<FragmentId>>,

    node: NodeRef,
}

impl<'a> GenContext<'a> {
    pub fn new(
        model: &'a Model,
        registry: &'a Registry,
        resolved: &'a FxHashMap<NodeRef, Option<FragmentId>>,
        node: NodeRef,
    ) -> Self {
        Self {
            model,
            registry,
            resolved,
            node,
        }
    }

    pub fn model(&self) -> &'a Model {
        self.model
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Node being translated.
    pub fn node_ref(&self) -> NodeRef {
        self.node
    }

    pub fn node(&self) -> &'a ModelNode {
        self.model.get(self.node)
    }

    /// Parameter or argument `name` of the node being translated.
    pub fn arg(&self, name: &str) -> Option<NodeRef> {
        self.node().arg(name)
    }

    pub fn required(&self, name: &str) -> Result<NodeRef, GenError> {
        self.arg(name)
            .ok_or_else(|| GenError::MissingParam(name.into()))
    }

    /// Primary fragment of an already translated node.
    pub fn fragment(&self, node: NodeRef) -> Option<FragmentId> {
        self.resolved.get(&node).copied().flatten()
    }

    /// Reference to the translation of the required parameter `name`.
    pub fn input(&self, name: &str) -> Result<FragmentRef, GenError> {
        let node = self.required(name)?;
        self.reference(name, node)
    }

    /// Reference to the translation of the parameter `name`,
    ///   if present.
    pub fn opt_input(
        &self,
        name: &str,
    ) -> Result<Option<FragmentRef>, GenError> {
        self.arg(name)
            .map(|node| self.reference(name, node))
            .transpose()
    }

    /// Reference to the translation of `node`,
    ///   reached through the parameter `param`.
    pub fn reference(
        &self,
        param: &str,
        node: NodeRef,
    ) -> Result<FragmentRef, GenError> {
        match self.fragment(node) {
            Some(_) => Ok(FragmentRef::Node(node)),
            None => Err(GenError::Untranslated {
                param: param.into(),
                node: self.model.get(node).display_name().into(),
            }),
        }
    }

    /// Computed value of the required parameter `name`.
    pub fn value(&self, name: &str) -> Result<&'a Value, GenError> {
        let node = self.required(name)?;

        self.model
            .get(node)
            .value()
            .ok_or_else(|| GenError::ParamValue {
                param: name.into(),
                expected: "a known value".into(),
            })
    }

    /// Random variable generated by the distribution being translated.
    pub fn variate(&self) -> Result<NodeRef, GenError> {
        self.model.variate(self.node).ok_or_else(|| {
            GenError::Unsupported(
                "distribution generates no random variable".into(),
            )
        })
    }

    pub fn variate_node(&self) -> Result<&'a ModelNode, GenError> {
        self.variate().map(|node| self.model.get(node))
    }

    /// Whether the variate of the distribution being translated is
    ///   observed as data.
    pub fn variate_observed(&self) -> bool {
        self.model
            .variate(self.node)
            .map(|node| self.model.get(node).is_observed())
            .unwrap_or(false)
    }

    /// Fail on any parameter not listed in `known`.
    pub fn expect_args(&self, known: &[&str]) -> Result<(), GenError> {
        match self
            .node()
            .args()
            .iter()
            .find(|arg| !known.contains(&arg.name.as_str()))
        {
            Some(arg) => Err(GenError::UnexpectedParam(arg.name.clone())),
            None => Ok(()),
        }
    }

    /// Target data type for an LPhy sequence type.
    pub fn data_type(&self, sequence_type: &str) -> Option<&'a str> {
        self.registry.data_type(sequence_type)
    }

    /// Translate `node` by the generator registered for the class of its
    ///   computed value,
    ///     as if it were a data value.
    pub fn translate_value(&self, node: &ModelNode) -> GenResult {
        let value = node.value().ok_or(GenError::MissingValue)?;
        let key = GeneratorKey::value(value.class());

        self.registry
            .lookup(&key)
            .or_else(|| {
                self.registry
                    .lookup(&GeneratorKey::logical(LogicalType::DataValue))
            })
            .ok_or_else(|| {
                GenError::Unsupported(format!("no generator for `{key}`"))
            })?
            .generate(node, self)
    }
}
