// Translation of a model graph into a document
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

//! Translation engine.
//!
//! [`translate`] lowers a [`Model`] into a [`Document`]:
//!   an arena of fragments,
//!   their placement into document sections,
//!   and the inference run assembled from them.
//! The document carries no ids or markup;
//!   that is the job of the [emitter](crate::emit).
//!
//! Ordering
//! ========
//! Live nodes are translated in the order of a post-order depth-first
//!   traversal of the model graph
//!     (see [`TopoPostOrderDfs`](crate::model::visit::TopoPostOrderDfs)),
//!   starting from nodes in declaration order.
//! Every node is therefore translated after each node it depends on,
//!   and nodes that do not depend on one another are translated in the
//!   order they were declared.
//!
//! Sharing
//! =======
//! The primary fragment of each translated node is recorded in a map
//!   from node to [`FragmentId`].
//! Generators reference dependencies through that map,
//!   so a node used by several others is translated exactly once and
//!   every use refers to the same fragment.
//!
//! Failure
//! =======
//! Translation fails closed:
//!   the first node that cannot be translated aborts the run with an
//!   error naming that node,
//!     and no document is produced.
//! The only non-fatal conditions are those that lose nothing the user
//!   asked for,
//!     such as dropping a node unreachable from any root,
//!   and those are logged.

mod run;
mod section;

pub use section::Sections;

use crate::{
    config::{ConfigError, RunConfig},
    diagnose::{Annotate, AnnotatedSpan, Diagnostic},
    gen::{
        Fragment, FragmentId, FragmentRef, GenContext, GenError, Generated,
        Registry, UnsupportedConstruct,
    },
    model::{Model, ModelError, NodeDesc, NodeKind, NodeRef},
    span::UNKNOWN_SPAN,
};
use fixedbitset::FixedBitSet;
use fxhash::FxHashMap;
use std::{
    error::Error,
    fmt::{self, Display},
};
use tracing::{debug, info, warn};

/// Source of the id of a fragment.
///
/// The emitter derives stable ids from labels alone;
///   see [`crate::emit::id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdLabel {
    /// Fragment translated from a model node.
    Node {
        /// Name the id is derived from.
        base: String,

        /// Identifier of the originating node,
        ///   used to disambiguate colliding names.
        node: String,

        suffix: Option<String>,
    },

    /// Fragment of the assembled run,
    ///   which has a fixed id.
    Fixed(&'static str),
}

impl IdLabel {
    /// Label of a fragment derived from the same node as `self`,
    ///   distinguished by `suffix`.
    pub fn derive(&self, suffix: &str) -> Self {
        match self {
            Self::Node { base, node, .. } => Self::Node {
                base: base.clone(),
                node: node.clone(),
                suffix: Some(suffix.into()),
            },
            Self::Fixed(name) => Self::Node {
                base: (*name).into(),
                node: (*name).into(),
                suffix: Some(suffix.into()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocFragment {
    pub fragment: Fragment<FragmentId>,
    pub label: IdLabel,
}

/// Fragments in the order they were produced,
///   indexed by [`FragmentId`].
#[derive(Debug, Default)]
struct Arena {
    fragments: Vec<DocFragment>,
    sections: Sections,
}

impl Arena {
    fn next_id(&self) -> FragmentId {
        FragmentId::new(self.fragments.len())
    }

    fn push(&mut self, fragment: Fragment<FragmentId>, label: IdLabel) -> FragmentId {
        let id = self.next_id();

        self.sections.route(fragment.placement, id);
        self.fragments.push(DocFragment { fragment, label });

        id
    }
}

/// A translated model,
///   ready to be emitted.
#[derive(Debug)]
pub struct Document {
    arena: Arena,

    /// Root element of the inference run.
    run: FragmentId,

    unicode_ids: bool,
    source: Option<String>,
}

impl Document {
    pub fn get(&self, id: FragmentId) -> &DocFragment {
        &self.arena.fragments[id.index()]
    }

    /// Every fragment,
    ///   in the order produced.
    pub fn fragments(&self) -> &[DocFragment] {
        &self.arena.fragments
    }

    pub fn sections(&self) -> &Sections {
        &self.arena.sections
    }

    pub fn run(&self) -> FragmentId {
        self.run
    }

    /// Whether ids may retain non-ASCII letters.
    pub fn unicode_ids(&self) -> bool {
        self.unicode_ids
    }

    /// Name of the LPhy source file the model was read from,
    ///   if known.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.arena.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.fragments.is_empty()
    }
}

/// Translate `model` using the generators of `registry`.
pub fn translate(
    model: &Model,
    registry: &Registry,
    config: &RunConfig,
) -> Result<Document, TranslateError> {
    config.validate()?;

    let live = model.live_nodes();
    let mut translator =
        Translator::new(model, registry, absorbed_nodes(model, registry, &live));

    for node in model.topo_sort(&live) {
        translator.translate_node(node?)?;
    }

    let Translator { mut arena, .. } = translator;
    let run = run::assemble(&mut arena, config)?;

    info!(
        fragments = arena.fragments.len(),
        source = model.source().unwrap_or("<unknown>"),
        "model translated"
    );

    Ok(Document {
        arena,
        run,
        unicode_ids: config.unicode_ids,
        source: model.source().map(String::from),
    })
}

struct Translator<'a> {
    model: &'a Model,
    registry: &'a Registry,

    /// Primary fragment of each translated node,
    ///   or [`None`] if the node produced nothing referenceable.
    resolved: FxHashMap<NodeRef, Option<FragmentId>>,

    /// Nodes translated by the generator of the distribution consuming
    ///   them.
    absorbed: FixedBitSet,

    arena: Arena,
}

impl<'a> Translator<'a> {
    fn new(
        model: &'a Model,
        registry: &'a Registry,
        absorbed: FixedBitSet,
    ) -> Self {
        Self {
            model,
            registry,
            resolved: FxHashMap::default(),
            absorbed,
            arena: Arena::default(),
        }
    }

    fn translate_node(&mut self, node: NodeRef) -> Result<(), TranslateError> {
        let (model, registry) = (self.model, self.registry);
        let mnode = model.get(node);

        if self.absorbed.contains(node.index()) {
            debug!(node = mnode.id(), "absorbed by its consumer");

            self.resolved.insert(node, None);
            return Ok(());
        }

        // Observed data is translated once,
        //   as the data-block value it is bound to.
        if let Some(data) = model.observation(node) {
            let alias = self.resolved.get(&data).copied().flatten();

            debug!(
                node = mnode.id(),
                data = model.get(data).id(),
                "observed variable aliases its data"
            );

            self.resolved.insert(node, alias);
            return Ok(());
        }

        if let NodeKind::Distribution { name, .. } = mnode.kind() {
            if model.variate(node).is_none() {
                warn!(
                    node = mnode.id(),
                    distribution = %name,
                    "skipping distribution that generates no random variable"
                );

                self.resolved.insert(node, None);
                return Ok(());
            }
        }

        let gen = registry.resolve(mnode)?;
        let ctx = GenContext::new(model, registry, &self.resolved, node);

        debug!(node = mnode.id(), generator = gen.name(), "translating");

        let generated =
            gen.generate(mnode, &ctx).map_err(|err| TranslateError::Generator {
                node: mnode.describe(),
                generator: gen.name().into(),
                err,
            })?;

        let primary = self.ingest(node, generated).map_err(|err| {
            TranslateError::Generator {
                node: mnode.describe(),
                generator: gen.name().into(),
                err,
            }
        })?;

        self.resolved.insert(node, primary);
        Ok(())
    }

    /// Move the fragments of `generated` into the arena,
    ///   returning the id of the primary fragment.
    fn ingest(
        &mut self,
        node: NodeRef,
        generated: Generated,
    ) -> Result<Option<FragmentId>, GenError> {
        let (fragments, primary) = generated.into_parts();
        let first = self.arena.next_id().index();
        let count = fragments.len();

        let resolve = |r: FragmentRef| match r {
            FragmentRef::Node(dep) => {
                self.resolved.get(&dep).copied().flatten().ok_or_else(|| {
                    GenError::Untranslated {
                        param: "reference".into(),
                        node: self.model.get(dep).display_name().into(),
                    }
                })
            }
            FragmentRef::Local(i) if i < count => Ok(FragmentId::new(first + i)),
            FragmentRef::Local(i) => Err(GenError::Unsupported(format!(
                "reference to fragment {i} of {count} generated"
            ))),
        };

        let mapped = fragments
            .into_iter()
            .map(|frag| frag.try_map_refs(&resolve))
            .collect::<Result<Vec<_>, _>>()?;

        let node_id = self.model.get(node).id();
        let base = base_name(self.model, node);

        for frag in mapped {
            let label = IdLabel::Node {
                base: base.into(),
                node: node_id.into(),
                suffix: frag.suffix.clone(),
            };

            self.arena.push(frag, label);
        }

        Ok(primary.map(|i| FragmentId::new(first + i)))
    }
}

/// Latent random variables given as absorbed parameters of live
///   distributions,
///     and the distributions they are drawn from.
///
/// See [`Registry::absorb_param`].
fn absorbed_nodes(
    model: &Model,
    registry: &Registry,
    live: &FixedBitSet,
) -> FixedBitSet {
    let mut absorbed = FixedBitSet::with_capacity(model.len());

    for node in model.nodes().filter(|node| live.contains(node.index())) {
        let NodeKind::Distribution { name, params } = model.get(node).kind()
        else {
            continue;
        };

        let absorbed_args =
            params.iter().filter(|arg| registry.absorbs(name, &arg.name));

        for arg in absorbed_args {
            if let NodeKind::RandomVariable {
                distribution,
                observed: None,
                ..
            } = model.get(arg.node).kind()
            {
                absorbed.insert(arg.node.index());
                absorbed.insert(distribution.index());
            }
        }
    }

    absorbed
}

/// Name from which the ids of the fragments of `node` are derived.
///
/// Distributions are usually anonymous,
///   so their fragments are named after the variable they generate
///     (`kappa.prior` rather than the identifier of the distribution).
fn base_name(model: &Model, node: NodeRef) -> &str {
    let mnode = model.get(node);

    match (mnode.name(), mnode.kind()) {
        (Some(name), _) => name,
        (None, NodeKind::Distribution { .. }) => model
            .variate(node)
            .map(|variate| base_name(model, variate))
            .unwrap_or(mnode.id()),
        (None, _) => mnode.id(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TranslateError {
    Config(ConfigError),
    Model(ModelError),
    Unsupported(UnsupportedConstruct),

    /// A generator failed to translate a node.
    Generator {
        node: NodeDesc,
        generator: String,
        err: GenError,
    },

    /// The model has nothing to estimate.
    NoState,
}

impl Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TranslateError::*;

        match self {
            Config(e) => e.fmt(f),
            Model(e) => e.fmt(f),
            Unsupported(e) => e.fmt(f),
            Generator { node, err, .. } => {
                write!(f, "cannot translate {node}: {err}")
            }
            NoState => write!(f, "model has no latent random variables"),
        }
    }
}

impl Error for TranslateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use TranslateError::*;

        match self {
            Config(e) => Some(e),
            Model(e) => Some(e),
            Unsupported(e) => Some(e),
            Generator { err, .. } => Some(err),
            NoState => None,
        }
    }
}

impl From<ConfigError> for TranslateError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ModelError> for TranslateError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<UnsupportedConstruct> for TranslateError {
    fn from(e: UnsupportedConstruct) -> Self {
        Self::Unsupported(e)
    }
}

impl Diagnostic for TranslateError {
    fn describe(&self) -> Vec<AnnotatedSpan> {
        use TranslateError::*;

        match self {
            Config(_) => vec![],
            Model(e) => e.describe(),
            Unsupported(e) => e.describe(),
            Generator {
                node,
                generator,
                err,
            } => vec![
                node.span.error(format!("{err}")),
                node.span.note(format!(
                    "while translating {} with generator `{generator}`",
                    node.shape()
                )),
            ],
            NoState => UNKNOWN_SPAN
                .help("a model must have at least one latent random variable")
                .into(),
        }
    }
}

#[cfg(test)]
mod test;
