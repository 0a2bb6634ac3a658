// Source locations
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

//! Mapping of model nodes to their location in LPhy source.
//!
//! A [`Span`] records the line and column of the statement that declared
//!   a model node.
//! The LPhy parser is an external collaborator,
//!   so spans are only as precise as the interchange document that
//!   carried the model;
//!     nodes without location information receive [`UNKNOWN_SPAN`].
//!
//! ```
//! use lphybeast::span::{Span, UNKNOWN_SPAN};
//!
//! let span = Span::new(3, 1);
//! assert_eq!(3, span.line());
//! assert_eq!(1, span.column());
//! assert!(span.is_known());
//!
//! assert!(!UNKNOWN_SPAN.is_known());
//! ```

use serde::Deserialize;
use std::fmt::{self, Display};

/// Line and column of a declaration, both 1-indexed.
///
/// A line of `0` denotes an unknown location.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Deserialize,
)]
pub struct Span {
    line: u32,
    #[serde(default = "first_column")]
    column: u32,
}

fn first_column() -> u32 {
    1
}

/// Span of a node whose origin is not known.
pub const UNKNOWN_SPAN: Span = Span::new(0, 0);

impl Span {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    /// Whether this span refers to an actual source location.
    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(f, "<unknown>")
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn displays_line_and_column() {
        assert_eq!("12:4", Span::new(12, 4).to_string());
        assert_eq!("<unknown>", UNKNOWN_SPAN.to_string());
    }

    #[test]
    fn deserializes_with_default_column() {
        let span: Span = serde_json::from_str(r#"{"line": 7}"#).unwrap();
        assert_eq!(Span::new(7, 1), span);
    }
}
