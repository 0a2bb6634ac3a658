// Translated fragments of the target document
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

//! Fragments of the target document.
//!
//! A [`Fragment`] is the translated form of one model node,
//!   or of one of the several target constructs that a node expands
//!   into.
//! Fragments are pre-serialization:
//!   they carry no ids of their own,
//!     and refer to one another by [`FragmentRef`] rather than by
//!     nesting copies,
//!   so that a fragment for a shared node is a single instance no matter
//!     how many times it is used.
//!
//! The type parameter `R` is the reference type.
//! Generators produce `Fragment<FragmentRef>`;
//!   the translation engine rewrites those references into arena
//!   indices
//!     (`Fragment<FragmentId>`)
//!   as it ingests each generator's output.

use crate::model::NodeRef;
use std::ops::BitOr;

/// Reference to a fragment from within a generator's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentRef {
    /// The primary fragment of a model node that has already been
    ///   translated.
    Node(NodeRef),

    /// A fragment at the given index of the same
    ///   [`Generated`](super::Generated) output.
    Local(usize),
}

/// Index of an ingested fragment in the translation arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(usize);

impl FragmentId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Value of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue<R = FragmentRef> {
    Text(String),

    /// Reference to another fragment,
    ///   serialized as `@id`.
    ///
    /// If the target is inline and has not yet been emitted,
    ///   it is instead nested as a child element named after the
    ///   attribute.
    Ref(R),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Child<R = FragmentRef> {
    /// Anonymous element owned by its parent.
    Element(Element<R>),

    /// Another fragment used as the input named `role`.
    Ref { role: String, target: R },

    Text(String),
}

/// An element with ordered attributes and children.
///
/// Order is preserved exactly as built.
#[derive(Debug, Clone, PartialEq)]
pub struct Element<R = FragmentRef> {
    pub name: String,
    pub attrs: Vec<(String, AttrValue<R>)>,
    pub children: Vec<Child<R>>,
}

impl<R> Element<R> {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Shorthand for an element with a `spec` attribute naming its
    ///   target class.
    pub fn spec<S: Into<String>, C: Into<String>>(name: S, class: C) -> Self {
        Self::new(name).attr("spec", class)
    }

    pub fn attr<K: Into<String>, V: Into<String>>(
        mut self,
        name: K,
        value: V,
    ) -> Self {
        self.attrs.push((name.into(), AttrValue::Text(value.into())));
        self
    }

    pub fn attr_ref<K: Into<String>>(mut self, name: K, target: R) -> Self {
        self.attrs.push((name.into(), AttrValue::Ref(target)));
        self
    }

    /// Add an attribute only if a value is present.
    pub fn attr_opt<K: Into<String>, V: Into<String>>(
        self,
        name: K,
        value: Option<V>,
    ) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    pub fn child(mut self, element: Element<R>) -> Self {
        self.children.push(Child::Element(element));
        self
    }

    pub fn child_ref<S: Into<String>>(mut self, role: S, target: R) -> Self {
        self.children.push(Child::Ref {
            role: role.into(),
            target,
        });
        self
    }

    pub fn text<S: Into<String>>(mut self, text: S) -> Self {
        self.children.push(Child::Text(text.into()));
        self
    }

    /// Value of the text attribute `name`,
    ///   if present.
    pub fn attr_text(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find_map(|(k, v)| match v {
            AttrValue::Text(text) if k == name => Some(text.as_str()),
            _ => None,
        })
    }

    /// Rewrite every reference within this element and its descendants.
    pub fn try_map_refs<S, E>(
        self,
        f: &mut impl FnMut(R) -> Result<S, E>,
    ) -> Result<Element<S>, E> {
        let attrs = self
            .attrs
            .into_iter()
            .map(|(name, value)| {
                Ok((
                    name,
                    match value {
                        AttrValue::Text(text) => AttrValue::Text(text),
                        AttrValue::Ref(target) => AttrValue::Ref(f(target)?),
                    },
                ))
            })
            .collect::<Result<_, E>>()?;

        let children = self
            .children
            .into_iter()
            .map(|child| {
                Ok(match child {
                    Child::Element(el) => Child::Element(el.try_map_refs(f)?),
                    Child::Ref { role, target } => Child::Ref {
                        role,
                        target: f(target)?,
                    },
                    Child::Text(text) => Child::Text(text),
                })
            })
            .collect::<Result<_, E>>()?;

        Ok(Element {
            name: self.name,
            attrs,
            children,
        })
    }
}

impl<R: Copy> Element<R> {
    /// Every reference within this element and its descendants,
    ///   in document order.
    pub fn refs(&self) -> Vec<R> {
        let mut refs = Vec::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs(&self, refs: &mut Vec<R>) {
        refs.extend(self.attrs.iter().filter_map(|(_, v)| match v {
            AttrValue::Ref(target) => Some(*target),
            AttrValue::Text(_) => None,
        }));

        for child in &self.children {
            match child {
                Child::Element(el) => el.collect_refs(refs),
                Child::Ref { target, .. } => refs.push(*target),
                Child::Text(_) => (),
            }
        }
    }
}

/// Top-level section of the target document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    /// Alignments and other observed data.
    Data,
    /// State nodes, distributions and deterministic functions.
    Model,
    /// MCMC proposal operators.
    Operators,
    /// Trace and tree loggers.
    Loggers,
}

/// Where a fragment belongs in the target document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub section: Section,

    /// Inline fragments are not emitted at their section slot;
    ///   they are nested at their first use and referenced by id
    ///   thereafter,
    ///     and are dropped entirely if nothing uses them.
    pub inline: bool,
}

impl Placement {
    pub const DATA: Self = Self::top(Section::Data);
    pub const MODEL: Self = Self::top(Section::Model);
    pub const OPERATORS: Self = Self::top(Section::Operators);
    pub const LOGGERS: Self = Self::top(Section::Loggers);

    /// Nested at first use within the model.
    pub const INLINE: Self = Self {
        section: Section::Model,
        inline: true,
    };

    const fn top(section: Section) -> Self {
        Self {
            section,
            inline: false,
        }
    }
}

/// Roles a fragment plays in the assembled inference configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Roles(u8);

impl Roles {
    pub const NONE: Self = Self(0);
    /// Estimated state node.
    pub const STATE: Self = Self(1);
    /// Member of the prior compound distribution.
    pub const PRIOR: Self = Self(1 << 1);
    /// Member of the likelihood compound distribution.
    pub const LIKELIHOOD: Self = Self(1 << 2);
    /// Logged by the trace logger.
    pub const LOG: Self = Self(1 << 3);
    /// Logged by a tree logger of its own.
    pub const TREE_LOG: Self = Self(1 << 4);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Roles {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// The translated form of a model node.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment<R = FragmentRef> {
    pub element: Element<R>,

    /// Appended to the id base of the originating node,
    ///   distinguishing the several fragments a node may expand into.
    pub suffix: Option<String>,

    pub placement: Placement,
    pub roles: Roles,

    /// Number of free dimensions of a state node.
    pub dimension: usize,
}

impl<R> Fragment<R> {
    /// A new inline fragment with no roles.
    pub fn new(element: Element<R>) -> Self {
        Self {
            element,
            suffix: None,
            placement: Placement::INLINE,
            roles: Roles::NONE,
            dimension: 0,
        }
    }

    pub fn suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn roles(mut self, roles: Roles) -> Self {
        self.roles = roles;
        self
    }

    pub fn dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn try_map_refs<S, E>(
        self,
        mut f: impl FnMut(R) -> Result<S, E>,
    ) -> Result<Fragment<S>, E> {
        Ok(Fragment {
            element: self.element.try_map_refs(&mut f)?,
            suffix: self.suffix,
            placement: self.placement,
            roles: self.roles,
            dimension: self.dimension,
        })
    }
}
