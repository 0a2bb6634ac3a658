// Diagnostic system
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

//! Diagnostics describing failures in terms of the LPhy model.
//!
//! An error that a user may act upon implements [`Diagnostic`],
//!   pointing at the statements of the LPhy source responsible for it.
//! Locations are [`Span`]s taken from the model graph,
//!   each annotated with a severity [`Level`] and an optional label;
//!   a [`Reporter`] renders them in the style of `rustc`.
//!
//! Failures that have no location in the model,
//!   such as writing output,
//!   simply describe nothing and are rendered by their [`Display`] alone.

mod report;

pub use report::{Report, Reporter, VisualReporter};

use crate::span::Span;
use std::{borrow::Cow, error::Error, fmt};

/// An error that can describe where in the model it arose.
pub trait Diagnostic: Error + Sized {
    /// Annotated locations explaining this error,
    ///   most relevant first.
    fn describe(&self) -> Vec<AnnotatedSpan>;
}

/// Severity of an annotation.
///
/// Variants are ordered from most to least severe.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// A bug in the translator or in one of its generators.
    InternalError,

    #[default]
    Error,

    /// Context for another annotation.
    Note,

    /// A suggestion for resolving the problem.
    Help,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InternalError => "internal error",
            Self::Error => "error",
            Self::Note => "note",
            Self::Help => "help",
        })
    }
}

/// Text displayed alongside an annotated location.
pub type Label<'l> = Cow<'l, str>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedSpan<'l> {
    span: Span,
    level: Level,
    label: Option<Label<'l>>,
}

impl<'l> AnnotatedSpan<'l> {
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Follow this annotation with help at the same location.
    pub fn with_help<L: Into<Label<'l>>>(self, help: L) -> [Self; 2] {
        let span = self.span;
        [self, span.help(help)]
    }
}

impl<'l> From<AnnotatedSpan<'l>> for Vec<AnnotatedSpan<'l>> {
    fn from(aspan: AnnotatedSpan<'l>) -> Self {
        vec![aspan]
    }
}

/// Annotation of locations.
pub trait Annotate: Sized {
    fn annotate<'l>(self, level: Level, label: Option<Label<'l>>) -> AnnotatedSpan<'l>;

    fn internal_error<'l, L: Into<Label<'l>>>(self, label: L) -> AnnotatedSpan<'l> {
        self.annotate(Level::InternalError, Some(label.into()))
    }

    fn error<'l, L: Into<Label<'l>>>(self, label: L) -> AnnotatedSpan<'l> {
        self.annotate(Level::Error, Some(label.into()))
    }

    fn note<'l, L: Into<Label<'l>>>(self, label: L) -> AnnotatedSpan<'l> {
        self.annotate(Level::Note, Some(label.into()))
    }

    fn help<'l, L: Into<Label<'l>>>(self, label: L) -> AnnotatedSpan<'l> {
        self.annotate(Level::Help, Some(label.into()))
    }
}

impl Annotate for Span {
    fn annotate<'l>(self, level: Level, label: Option<Label<'l>>) -> AnnotatedSpan<'l> {
        AnnotatedSpan { span: self, level, label }
    }
}
