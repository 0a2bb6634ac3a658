// Model graph
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

//! Model graph and its construction.

use super::{
    node::{Arg, ModelNode, NodeKind},
    visit::{topo_sort, TopoPostOrderDfs},
    ModelError, Value,
};
use crate::{global, span::Span};
use fixedbitset::FixedBitSet;
use fxhash::FxHashMap;
use petgraph::{
    graph::{DiGraph, EdgeIndex, NodeIndex},
    visit::EdgeRef,
};
use std::fmt::{self, Debug};
use tracing::warn;

pub type ModelResult<T> = Result<T, ModelError>;

type Ix = global::ModelIndexSize;

/// Reference to a node of a [`Model`].
///
/// References are dense and follow declaration order:
///   data-block nodes first,
///   then model-block nodes,
///   each in the order they were declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(NodeIndex<Ix>);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0.index()
    }
}

/// Reason one node must be translated before another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dep {
    /// Distribution parameter.
    Param,
    /// Random variable generated by a distribution.
    Variate,
    /// Function argument.
    Argument,
    /// Data value aliased by an observed random variable.
    Observation,
}

/// An LPhy model graph.
///
/// See the [parent module](super) for the meaning of edges.
pub struct Model {
    graph: DiGraph<ModelNode, Dep, Ix>,

    /// Lookup by node id.
    index: FxHashMap<String, NodeRef>,

    /// Number of leading nodes that belong to the data block.
    data_len: usize,

    /// Random variable generated by each distribution.
    variates: FxHashMap<NodeRef, NodeRef>,

    roots: Vec<NodeRef>,
    outputs: Vec<NodeRef>,

    /// Name of the LPhy source file,
    ///   if known.
    source: Option<String>,
}

impl Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[Model: {} nodes, {} edges]",
            self.graph.node_count(),
            self.graph.edge_count()
        )
    }
}

impl Model {
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, node: NodeRef) -> &ModelNode {
        &self.graph[node.0]
    }

    pub fn lookup(&self, id: &str) -> Option<NodeRef> {
        self.index.get(id).copied()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// All nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.graph.node_indices().map(NodeRef)
    }

    /// Data-block nodes in declaration order.
    pub fn data_block(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.nodes().take(self.data_len)
    }

    pub fn in_data_block(&self, node: NodeRef) -> bool {
        node.index() < self.data_len
    }

    /// Nodes from which liveness is computed.
    ///
    /// These are the declared roots if any were declared,
    ///   otherwise every node of the graph.
    pub fn roots(&self) -> Vec<NodeRef> {
        if !self.roots.is_empty() {
            return self.roots.clone();
        }

        self.nodes().collect()
    }

    /// Nodes explicitly marked as output targets.
    pub fn outputs(&self) -> &[NodeRef] {
        &self.outputs
    }

    /// Nodes that must be translated before `node`,
    ///   in the order their references were declared.
    pub fn dependencies(&self, node: NodeRef) -> Vec<NodeRef> {
        let mut deps = self
            .graph
            .edges(node.0)
            .map(|edge| (edge.id(), NodeRef(edge.target())))
            .collect::<Vec<(EdgeIndex<Ix>, NodeRef)>>();

        deps.sort_by_key(|(edge, _)| *edge);
        deps.into_iter().map(|(_, target)| target).collect()
    }

    /// Every node referenced by `node`,
    ///   including the distribution of a random variable.
    pub fn references(&self, node: NodeRef) -> Vec<NodeRef> {
        let mut refs = self.dependencies(node);

        if let NodeKind::RandomVariable { distribution, .. } =
            self.get(node).kind()
        {
            refs.push(*distribution);
        }

        refs
    }

    /// Random variable generated by the distribution `node`.
    pub fn variate(&self, node: NodeRef) -> Option<NodeRef> {
        self.variates.get(&node).copied()
    }

    /// Data-block node aliased by the observed random variable `node`.
    pub fn observation(&self, node: NodeRef) -> Option<NodeRef> {
        match self.get(node).kind() {
            NodeKind::RandomVariable { observed, .. } => *observed,
            _ => None,
        }
    }

    /// Nodes reachable from roots,
    ///   the data block,
    ///   and output targets.
    ///
    /// Nodes that are not live are dead code in the model and are logged
    ///   as such.
    pub fn live_nodes(&self) -> FixedBitSet {
        let mut live = FixedBitSet::with_capacity(self.len());
        let mut stack = self.roots();

        stack.extend(self.data_block());
        stack.extend(self.outputs.iter().copied());

        while let Some(node) = stack.pop() {
            if live.put(node.index()) {
                continue;
            }

            stack.extend(self.references(node));
        }

        for node in self.nodes().filter(|n| !live.contains(n.index())) {
            warn!(
                node = self.get(node).id(),
                "dropping node unreachable from any root"
            );
        }

        live
    }

    /// Topological sort of the live nodes.
    ///
    /// See [`TopoPostOrderDfs`].
    pub fn topo_sort(&self, live: &FixedBitSet) -> TopoPostOrderDfs<'_> {
        topo_sort(self, self.nodes().filter(|n| live.contains(n.index())))
    }
}

/// Declaration of a node with references by node id,
///   prior to resolution into a [`Model`].
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub id: String,
    pub name: Option<String>,
    pub span: Span,
    pub kind: DeclKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Random {
        distribution: String,
        observed: Option<String>,
        value: Option<Value>,
    },
    Function {
        function: String,
        args: Vec<(String, String)>,
        value: Option<Value>,
    },
    Value(Value),
    Distribution {
        name: String,
        params: Vec<(String, String)>,
    },
}

/// Incremental construction of a [`Model`].
///
/// Nodes may reference nodes declared after them;
///   references are resolved by [`ModelBuilder::build`],
///     which also validates the structural invariants of the graph.
///
/// Convenience methods declare named nodes,
///   except for [`ModelBuilder::constant`] and
///   [`ModelBuilder::distribution`],
///     which declare anonymous ones
///       (as literals and distributions usually are in LPhy).
#[derive(Debug, Default)]
pub struct ModelBuilder {
    data: Vec<Decl>,
    model: Vec<Decl>,
    roots: Vec<String>,
    outputs: Vec<String>,
    source: Option<String>,
    in_data: bool,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare subsequent nodes in the data block.
    pub fn data_block(mut self) -> Self {
        self.in_data = true;
        self
    }

    /// Declare subsequent nodes in the model block.
    pub fn model_block(mut self) -> Self {
        self.in_data = false;
        self
    }

    pub fn source<S: Into<String>>(mut self, name: S) -> Self {
        self.source = Some(name.into());
        self
    }

    pub fn decl(mut self, decl: Decl) -> Self {
        self.push(decl);
        self
    }

    pub fn push(&mut self, decl: Decl) {
        if self.in_data {
            self.data.push(decl);
        } else {
            self.model.push(decl);
        }
    }

    fn named(self, id: &str, kind: DeclKind) -> Self {
        self.decl(Decl {
            id: id.into(),
            name: Some(id.into()),
            span: Span::default(),
            kind,
        })
    }

    fn anonymous(self, id: &str, kind: DeclKind) -> Self {
        self.decl(Decl {
            id: id.into(),
            name: None,
            span: Span::default(),
            kind,
        })
    }

    /// Declare a named value.
    pub fn value(self, id: &str, value: Value) -> Self {
        self.named(id, DeclKind::Value(value))
    }

    /// Declare an anonymous literal.
    pub fn constant(self, id: &str, value: Value) -> Self {
        self.anonymous(id, DeclKind::Value(value))
    }

    /// Declare an anonymous distribution.
    pub fn distribution<'a>(
        self,
        id: &str,
        name: &str,
        params: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        self.anonymous(
            id,
            DeclKind::Distribution {
                name: name.into(),
                params,
            },
        )
    }

    /// Declare a latent random variable drawn from `distribution`.
    pub fn random(
        self,
        id: &str,
        distribution: &str,
        value: Option<Value>,
    ) -> Self {
        self.named(
            id,
            DeclKind::Random {
                distribution: distribution.into(),
                observed: None,
                value,
            },
        )
    }

    /// Declare a random variable drawn from `distribution` and observed
    ///   as the data-block node `data`.
    pub fn observed(self, id: &str, distribution: &str, data: &str) -> Self {
        self.named(
            id,
            DeclKind::Random {
                distribution: distribution.into(),
                observed: Some(data.into()),
                value: None,
            },
        )
    }

    pub fn function<'a>(
        self,
        id: &str,
        function: &str,
        args: impl IntoIterator<Item = (&'a str, &'a str)>,
        value: Option<Value>,
    ) -> Self {
        let args = args
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        self.named(
            id,
            DeclKind::Function {
                function: function.into(),
                args,
                value,
            },
        )
    }

    /// Set the span of the most recently declared node.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        let last = if self.in_data {
            self.data.last_mut()
        } else {
            self.model.last_mut()
        };

        if let Some(decl) = last {
            decl.span = Span::new(line, column);
        }

        self
    }

    pub fn root(mut self, id: &str) -> Self {
        self.roots.push(id.into());
        self
    }

    pub fn output(mut self, id: &str) -> Self {
        self.outputs.push(id.into());
        self
    }

    pub fn add_root<S: Into<String>>(&mut self, id: S) {
        self.roots.push(id.into());
    }

    pub fn add_output<S: Into<String>>(&mut self, id: S) {
        self.outputs.push(id.into());
    }

    pub fn set_source<S: Into<String>>(&mut self, name: S) {
        self.source = Some(name.into());
    }

    pub fn set_data_block(&mut self, in_data: bool) {
        self.in_data = in_data;
    }

    /// Resolve references and validate the graph.
    ///
    /// Cycles are _not_ detected here;
    ///   they are reported by the topological sort,
    ///     which must guard against them anyway.
    pub fn build(self) -> ModelResult<Model> {
        let data_len = self.data.len();
        let decls = self.data.into_iter().chain(self.model).collect::<Vec<_>>();

        let mut graph: DiGraph<ModelNode, Dep, Ix> =
            DiGraph::with_capacity(decls.len(), decls.len() * 2);
        let mut index: FxHashMap<String, NodeRef> = FxHashMap::default();
        let mut spans = Vec::with_capacity(decls.len());

        for (i, decl) in decls.iter().enumerate() {
            let node = NodeRef(NodeIndex::new(i));

            if let Some(first) = index.get(&decl.id) {
                return Err(ModelError::DuplicateId {
                    id: decl.id.clone(),
                    first: decls[first.index()].span,
                    second: decl.span,
                });
            }

            index.insert(decl.id.clone(), node);
            spans.push(decl.span);
        }

        let resolve = |from: &Decl, target: &str| {
            index.get(target).copied().ok_or_else(|| ModelError::DanglingRef {
                from: from.id.clone(),
                target: target.into(),
                span: from.span,
            })
        };

        let resolve_args = |from: &Decl, args: &[(String, String)]| {
            args.iter()
                .map(|(name, target)| {
                    resolve(from, target).map(|node| Arg {
                        name: name.clone(),
                        node,
                    })
                })
                .collect::<ModelResult<Vec<_>>>()
        };

        let mut nodes = Vec::with_capacity(decls.len());
        for decl in &decls {
            let kind = match &decl.kind {
                DeclKind::Random {
                    distribution,
                    observed,
                    value,
                } => NodeKind::RandomVariable {
                    distribution: resolve(decl, distribution)?,
                    observed: observed
                        .as_deref()
                        .map(|data| resolve(decl, data))
                        .transpose()?,
                    value: value.clone(),
                },
                DeclKind::Function {
                    function,
                    args,
                    value,
                } => NodeKind::DeterministicFunction {
                    function: function.clone(),
                    args: resolve_args(decl, args)?,
                    value: value.clone(),
                },
                DeclKind::Value(value) => NodeKind::DataValue(value.clone()),
                DeclKind::Distribution { name, params } => {
                    NodeKind::Distribution {
                        name: name.clone(),
                        params: resolve_args(decl, params)?,
                    }
                }
            };

            nodes.push(ModelNode::new(
                decl.id.clone(),
                decl.name.clone(),
                decl.span,
                kind,
            ));
        }

        let lookup = |id: &String| {
            index
                .get(id)
                .copied()
                .ok_or_else(|| ModelError::UnknownRoot { id: id.clone() })
        };

        let roots = self.roots.iter().map(lookup).collect::<ModelResult<_>>()?;
        let outputs =
            self.outputs.iter().map(lookup).collect::<ModelResult<_>>()?;

        for node in nodes {
            graph.add_node(node);
        }

        let mut variates: FxHashMap<NodeRef, NodeRef> = FxHashMap::default();

        // Edges are added per node in the order references were declared,
        //   which is relied upon by `Model::dependencies`.
        for i in 0..graph.node_count() {
            let from = NodeRef(NodeIndex::new(i));
            let edges = edges_of(&graph, from, data_len)?;

            for (target, dep) in edges {
                graph.add_edge(from.0, target.0, dep);
            }

            if let NodeKind::RandomVariable { distribution, .. } =
                graph[from.0].kind()
            {
                let dist = *distribution;

                if let Some(&prev) = variates.get(&dist) {
                    return Err(ModelError::SharedDistribution {
                        distribution: graph[dist.0].id().into(),
                        first: graph[prev.0].id().into(),
                        second: graph[from.0].id().into(),
                        span: spans[i],
                    });
                }

                variates.insert(dist, from);
                graph.add_edge(dist.0, from.0, Dep::Variate);
            }
        }

        Ok(Model {
            graph,
            index,
            data_len,
            variates,
            roots,
            outputs,
            source: self.source,
        })
    }
}

/// Outgoing dependency edges of `from`,
///   validating the kinds of the nodes referenced.
fn edges_of(
    graph: &DiGraph<ModelNode, Dep, Ix>,
    from: NodeRef,
    data_len: usize,
) -> ModelResult<Vec<(NodeRef, Dep)>> {
    let node = &graph[from.0];

    match node.kind() {
        NodeKind::RandomVariable {
            distribution,
            observed,
            ..
        } => {
            let dist = &graph[distribution.0];
            if !matches!(dist.kind(), NodeKind::Distribution { .. }) {
                return Err(ModelError::NotADistribution {
                    variable: node.id().into(),
                    target: dist.id().into(),
                    span: node.span(),
                });
            }

            match observed {
                Some(data)
                    if data.index() >= data_len
                        || !is_data_value(graph, *data) =>
                {
                    Err(ModelError::BadObservation {
                        variable: node.id().into(),
                        target: graph[data.0].id().into(),
                        span: node.span(),
                    })
                }
                Some(data) => Ok(vec![(*data, Dep::Observation)]),
                None => Ok(vec![]),
            }
        }

        NodeKind::DeterministicFunction { args, .. } => {
            Ok(args.iter().map(|arg| (arg.node, Dep::Argument)).collect())
        }

        NodeKind::Distribution { params, .. } => {
            Ok(params.iter().map(|arg| (arg.node, Dep::Param)).collect())
        }

        NodeKind::DataValue(_) => Ok(vec![]),
    }
}

/// Whether `node` holds or computes a value that an observation can bind
///   to.
fn is_data_value(graph: &DiGraph<ModelNode, Dep, Ix>, node: NodeRef) -> bool {
    matches!(
        graph[node.0].kind(),
        NodeKind::DataValue(_) | NodeKind::DeterministicFunction { .. }
    )
}
