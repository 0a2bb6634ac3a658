// Lowering of documents into XIR
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

//! Lowering of a [`Document`] into a stream of XIR [`Token`]s.
//!
//! A fragment placed in a section is emitted exactly once,
//!   at its section slot.
//! An inline fragment is emitted at its first use,
//!   nested within the element using it and named after the input it
//!   fills;
//!     every later use refers to it by id.
//! References are only ever made to fragments already emitted,
//!   so every `idref` and `@id` of the output refers to an element that
//!   precedes it.

use super::EmitError;
use crate::{
    gen::{AttrValue, Child, Element, FragmentId, Section},
    translate::{Document, IdLabel},
    xir::{self, QName, Token},
};
use fixedbitset::FixedBitSet;

const INDENT: &str = "    ";

pub(super) struct Lowerer<'d> {
    doc: &'d Document,
    ids: &'d [String],

    /// Fragments already emitted.
    emitted: FixedBitSet,

    /// Number of references to each fragment.
    refs: Vec<usize>,

    tokens: Vec<Token>,
    depth: usize,
}

impl<'d> Lowerer<'d> {
    pub fn new(doc: &'d Document, ids: &'d [String]) -> Self {
        let mut refs = vec![0; doc.len()];

        for frag in doc.fragments() {
            for target in frag.fragment.element.refs() {
                refs[target.index()] += 1;
            }
        }

        Self {
            doc,
            ids,
            emitted: FixedBitSet::with_capacity(doc.len()),
            refs,
            tokens: Vec::new(),
            depth: 0,
        }
    }

    /// Lower the body of the document into the element `root`.
    pub fn lower(
        mut self,
        root: QName,
        attrs: &[(&str, &str)],
        comment: Option<String>,
    ) -> Result<Vec<Token>, EmitError> {
        self.tokens.push(Token::Open(root.clone()));

        for (name, value) in attrs {
            self.attr(name, value.to_string(), "beast")?;
        }

        self.depth += 1;

        if let Some(comment) = comment {
            self.newline();
            self.tokens.push(Token::Comment(comment));
        }

        let doc = self.doc;
        let sections = doc.sections();

        for section in [Section::Data, Section::Model] {
            for &id in sections.get(section) {
                self.newline();
                self.fragment(id, None, &[])?;
            }
        }

        let trailing = [
            sections.get(Section::Operators),
            sections.get(Section::Loggers),
        ]
        .concat();

        self.newline();
        self.fragment(doc.run(), None, &trailing)?;

        self.depth -= 1;
        self.newline();
        self.tokens.push(Token::Close(Some(root)));
        self.tokens.push(Token::Text("\n".into()));

        Ok(self.tokens)
    }

    fn newline(&mut self) {
        self.tokens
            .push(Token::Text(format!("\n{}", INDENT.repeat(self.depth))));
    }

    fn id(&self, id: FragmentId) -> &'d str {
        &self.ids[id.index()]
    }

    /// Whether the id of a fragment appears in the output.
    ///
    /// Inline fragments used only once need no id.
    fn prints_id(&self, id: FragmentId) -> bool {
        let frag = self.doc.get(id);

        !frag.fragment.placement.inline
            || self.refs[id.index()] > 1
            || matches!(frag.label, IdLabel::Fixed(_))
    }

    /// Emit the fragment `id`,
    ///   named `tag` rather than by its own element name if provided.
    fn fragment(
        &mut self,
        id: FragmentId,
        tag: Option<&str>,
        trailing: &[FragmentId],
    ) -> Result<(), EmitError> {
        self.emitted.insert(id.index());

        let doc = self.doc;
        let el = &doc.get(id).fragment.element;
        let own_id = self.prints_id(id).then(|| self.id(id));

        self.element(el, tag.unwrap_or(&el.name), own_id, id, trailing)
    }

    fn element(
        &mut self,
        el: &Element<FragmentId>,
        tag: &str,
        own_id: Option<&str>,
        owner: FragmentId,
        trailing: &[FragmentId],
    ) -> Result<(), EmitError> {
        let name = self.qname(tag, owner)?;
        self.tokens.push(Token::Open(name.clone()));

        if let Some(own_id) = own_id {
            self.attr("id", own_id.to_string(), own_id)?;
        }

        // Inline targets of attribute references are nested as children
        //   named after the attribute.
        let mut nested = Vec::new();

        for (attr, value) in &el.attrs {
            match value {
                AttrValue::Text(text) => {
                    self.attr(attr, text.clone(), self.id(owner))?
                }
                AttrValue::Ref(target) if self.emitted.contains(target.index()) => {
                    self.ref_attr(attr, *target)?
                }
                AttrValue::Ref(target) if self.is_inline(*target) => {
                    // Mark now so that a second reference within this same
                    //   element is by id.
                    self.emitted.insert(target.index());
                    nested.push((attr.as_str(), *target));
                }
                AttrValue::Ref(target) => {
                    return Err(self.unresolved(owner, *target))
                }
            }
        }

        if nested.is_empty() && el.children.is_empty() && trailing.is_empty() {
            self.tokens.push(Token::Close(None));
            return Ok(());
        }

        let pretty = !el.children.iter().any(|c| matches!(c, Child::Text(_)));
        self.depth += 1;

        for (attr, target) in nested {
            self.newline();
            self.fragment(target, Some(attr), &[])?;
        }

        for child in &el.children {
            if pretty {
                self.newline();
            }

            match child {
                Child::Element(child) => {
                    self.element(child, &child.name, None, owner, &[])?
                }
                Child::Ref { role, target } => self.child_ref(role, *target, owner)?,
                Child::Text(text) => {
                    self.check(text, owner)?;
                    self.tokens.push(Token::Text(text.clone()));
                }
            }
        }

        for &id in trailing {
            self.newline();
            self.fragment(id, None, &[])?;
        }

        self.depth -= 1;

        if pretty {
            self.newline();
        }

        self.tokens.push(Token::Close(Some(name)));
        Ok(())
    }

    fn child_ref(
        &mut self,
        role: &str,
        target: FragmentId,
        owner: FragmentId,
    ) -> Result<(), EmitError> {
        if self.emitted.contains(target.index()) {
            let name = self.qname(role, owner)?;
            let idref = self.id(target);

            self.tokens.push(Token::Open(name));
            self.attr("idref", idref.to_string(), idref)?;
            self.tokens.push(Token::Close(None));

            Ok(())
        } else if self.is_inline(target) {
            self.fragment(target, Some(role), &[])
        } else {
            Err(self.unresolved(owner, target))
        }
    }

    fn ref_attr(&mut self, attr: &str, target: FragmentId) -> Result<(), EmitError> {
        let id = self.id(target);
        let name = self.qname(attr, target)?;

        self.check(id, target)?;
        self.tokens.push(Token::AttrName(name));
        self.tokens.push(Token::AttrValueFragment("@".into()));
        self.tokens.push(Token::AttrValue(id.into()));

        Ok(())
    }

    fn attr(
        &mut self,
        attr: &str,
        value: String,
        fragment: &str,
    ) -> Result<(), EmitError> {
        if let Some(ch) = xir::invalid_char(&value) {
            return Err(EmitError::InvalidChar {
                fragment: fragment.into(),
                ch,
            });
        }

        let name = QName::try_from(attr).map_err(|err| EmitError::InvalidName {
            fragment: fragment.into(),
            err,
        })?;

        self.tokens.push(Token::AttrName(name));
        self.tokens.push(Token::AttrValue(value));

        Ok(())
    }

    fn is_inline(&self, id: FragmentId) -> bool {
        self.doc.get(id).fragment.placement.inline
    }

    fn check(&self, value: &str, owner: FragmentId) -> Result<(), EmitError> {
        match xir::invalid_char(value) {
            Some(ch) => Err(EmitError::InvalidChar {
                fragment: self.id(owner).into(),
                ch,
            }),
            None => Ok(()),
        }
    }

    fn qname(&self, name: &str, owner: FragmentId) -> Result<QName, EmitError> {
        QName::try_from(name).map_err(|err| EmitError::InvalidName {
            fragment: self.id(owner).into(),
            err,
        })
    }

    fn unresolved(&self, owner: FragmentId, target: FragmentId) -> EmitError {
        EmitError::Unresolved {
            fragment: self.id(owner).into(),
            target: self.id(target).into(),
        }
    }
}
