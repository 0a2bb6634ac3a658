// XIR errors
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

//! XIR error information.

use std::fmt::Display;

/// Error attempting to produce a XIR object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Provided name contains a `':'`.
    NCColon(String),

    /// Provided QName is not valid.
    InvalidQName(String),

    /// A value contains a character that cannot be represented in
    ///   XML 1.0,
    ///     even when escaped.
    InvalidChar(char),

    /// Comment contains the sequence `--`,
    ///   which would terminate it early.
    InvalidComment(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NCColon(name) => {
                write!(f, "NCName `{name}` cannot contain ':'")
            }
            Self::InvalidQName(name) => write!(f, "invalid QName `{name}`"),
            Self::InvalidChar(c) => write!(
                f,
                "character U+{:04X} cannot be represented in XML 1.0",
                u32::from(*c)
            ),
            Self::InvalidComment(_) => {
                write!(f, "comment cannot contain `--`")
            }
        }
    }
}

impl std::error::Error for Error {}
