// Model graph errors
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

//! Errors resulting from malformed model graphs.

use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::{
    diagnose::{Annotate, AnnotatedSpan, Diagnostic},
    span::Span,
};

/// A structural invariant of the model graph was violated.
///
/// These errors are fatal;
///   a malformed model cannot be partially translated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Two nodes were declared with the same id.
    DuplicateId { id: String, first: Span, second: Span },

    /// A node references an id that was never declared.
    DanglingRef {
        from: String,
        target: String,
        span: Span,
    },

    /// A random variable names a generator that is not a distribution.
    NotADistribution {
        variable: String,
        target: String,
        span: Span,
    },

    /// A single distribution node generates more than one random
    ///   variable.
    SharedDistribution {
        distribution: String,
        first: String,
        second: String,
        span: Span,
    },

    /// An observed random variable is bound to something other than a
    ///   data-block value.
    BadObservation {
        variable: String,
        target: String,
        span: Span,
    },

    /// A declared root or output target does not exist.
    UnknownRoot { id: String },

    /// The graph contains a cycle through the node `id`.
    Cycle { id: String, span: Span },
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ModelError::*;

        match self {
            DuplicateId { id, .. } => write!(f, "duplicate node id `{id}`"),
            DanglingRef { from, target, .. } => {
                write!(f, "node `{from}` references undeclared node `{target}`")
            }
            NotADistribution {
                variable, target, ..
            } => write!(
                f,
                "random variable `{variable}` is generated by `{target}`, \
                   which is not a distribution"
            ),
            SharedDistribution {
                distribution,
                first,
                second,
                ..
            } => write!(
                f,
                "distribution `{distribution}` generates both \
                   `{first}` and `{second}`"
            ),
            BadObservation {
                variable, target, ..
            } => write!(
                f,
                "random variable `{variable}` is observed as `{target}`, \
                   which is not a data-block value"
            ),
            UnknownRoot { id } => {
                write!(f, "root or output `{id}` is not a declared node")
            }
            Cycle { id, .. } => {
                write!(f, "model graph contains a cycle through `{id}`")
            }
        }
    }
}

impl Error for ModelError {}

impl Diagnostic for ModelError {
    fn describe(&self) -> Vec<AnnotatedSpan> {
        use ModelError::*;

        match self {
            DuplicateId { first, second, .. } => vec![
                first.note("first declared here"),
                second.error("declared again here"),
            ],

            DanglingRef { span, .. } => span
                .error("reference to undeclared node")
                .with_help("the interchange document may be truncated")
                .to_vec(),

            NotADistribution { span, .. } => {
                vec![span.error("expected a distribution")]
            }

            SharedDistribution { span, .. } => span
                .error("distribution already generates another variable")
                .with_help(
                    "each random variable must have its own generator node",
                )
                .to_vec(),

            BadObservation { span, .. } => {
                vec![span.error("observation must name a data-block value")]
            }

            UnknownRoot { .. } => vec![],

            Cycle { span, .. } => span
                .error("node depends on itself")
                .with_help("LPhy models must be acyclic")
                .to_vec(),
        }
    }
}
