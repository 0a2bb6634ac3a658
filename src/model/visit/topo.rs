// Topological sort of the model graph
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

//! Topological sort of a [`Model`].
//!
//! This topological sort is a depth-first search (DFS) that emits nodes in
//!   post-order.
//! Intuitively,
//!   it emits nodes sorted in such a way that every node appears after each
//!   of its dependencies.
//!
//! The ordering is deterministic:
//!   starting nodes are taken in declaration order and the dependencies of
//!   each node are visited in the order they were declared,
//!     so independent nodes are emitted in declaration order.
//! Translation output is therefore stable and diffable between runs on
//!   the same model.
//!
//! A node may be reachable by any number of paths,
//!   but only the first visit is emitted.

use super::super::{Model, ModelError, NodeRef};
use fixedbitset::FixedBitSet;

/// Topologically sort the nodes reachable from `init`.
///
/// The first node produced by `init` will be the first node whose
///   dependencies are explored.
pub fn topo_sort(
    model: &Model,
    init: impl Iterator<Item = NodeRef>,
) -> TopoPostOrderDfs {
    TopoPostOrderDfs::new(model, init)
}

/// Topological sort implemented as a post-order depth-first search (DFS).
///
/// See the [module-level documentation](self) for important information
///   about this traversal.
pub struct TopoPostOrderDfs<'a> {
    /// Reference [`Model`].
    model: &'a Model,

    /// DFS stack.
    ///
    /// As nodes are visited,
    ///   their dependencies are pushed onto the stack in reverse order so
    ///   that the first-declared dependency is visited first.
    /// The traversal ends once the stack becomes empty.
    stack: Vec<NodeRef>,

    /// Nodes whose dependencies have been pushed onto [`Self::stack`].
    ///
    /// A visited node is only present in [`Self::stack`] until it is
    ///   finished,
    ///     after which it appears in [`Self::finished`].
    visited: FixedBitSet,

    /// Nodes that have been emitted and popped from [`Self::stack`].
    ///
    /// This is used for cycle detection.
    /// A node that is visited but not yet finished lies on the current
    ///   DFS path;
    ///     encountering it again as a dependency means that the path
    ///     leads back to itself.
    finished: FixedBitSet,

    /// Set once a cycle has been reported,
    ///   ending the traversal.
    failed: bool,
}

/// Initial capacity of the [`TopoPostOrderDfs`] stack.
///
/// The current number is arbitrary and only intended to reduce initial
///   small re-allocations.
const INIT_STACK_CAP: usize = 32;

impl<'a> TopoPostOrderDfs<'a> {
    fn new(model: &'a Model, init: impl Iterator<Item = NodeRef>) -> Self {
        let set_cap = model.len();

        let mut stack = Vec::with_capacity(INIT_STACK_CAP);
        stack.extend(init);
        stack.reverse();

        Self {
            model,
            stack,
            visited: FixedBitSet::with_capacity(set_cap),
            finished: FixedBitSet::with_capacity(set_cap),
            failed: false,
        }
    }
}

impl<'a> Iterator for TopoPostOrderDfs<'a> {
    type Item = Result<NodeRef, ModelError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let next = *self.stack.last()?;

            if self.visited.put(next.index()) {
                self.stack.pop(); // next

                if !self.finished.put(next.index()) {
                    break Some(Ok(next));
                } else {
                    // Must have been visited by another path.
                    continue;
                }
            }

            let deps = self.model.dependencies(next);

            if let Some(&cyclic) = deps.iter().find(|dep| {
                self.visited.contains(dep.index())
                    && !self.finished.contains(dep.index())
            }) {
                self.failed = true;
                self.stack.clear();

                let node = self.model.get(cyclic);
                break Some(Err(ModelError::Cycle {
                    id: node.id().into(),
                    span: node.span(),
                }));
            }

            self.stack.extend(
                deps.into_iter()
                    .rev()
                    .filter(|dep| !self.finished.contains(dep.index())),
            );
        }
    }
}

#[cfg(test)]
mod test;
