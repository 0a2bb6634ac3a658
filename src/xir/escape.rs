// XIR escaping
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

//! Escaping for writers.
//!
//! An [`Escaper`] is required by XIR writers.
//!
//! Safety
//! ======
//! The purpose of this type is to provide safety against XML injection by
//!   encapsulating all responsibility within a single object.
//! The idea is simple:
//!   a value held by a XIR [`Token`](super::Token) _always_ represents an
//!   unescaped string.
//! This prevents, primarily,
//!
//!  1. XML injection (via lack of escaping); and
//!  2. Erroneous multiple escaping.
//!
//! Values originate from the modeler
//!   (node names, taxon names, sequence data),
//!   so this is not merely theoretical.
//!
//! Escaping alone cannot represent every character;
//!   XML 1.0 forbids most control characters outright.
//! Those are rejected rather than silently dropped,
//!   since a silently altered taxon name would corrupt the analysis.

use super::Error;
use std::borrow::Cow;

/// XIR escaper.
///
/// Escapers are responsible for properly escaping characters on write.
/// This is the only part of the system defending XIR against XML
///   injection.
pub trait Escaper: Default {
    /// Escape a string such that it becomes suitable for writing into an
    ///   XML document as an attribute value or text.
    ///
    /// The value is assumed to contain only valid XML characters.
    fn escape_str(value: &str) -> Cow<str>;

    /// Escape the given value,
    ///   failing if it contains characters not representable in XML 1.0.
    #[inline]
    fn escape<'a>(&self, value: &'a str) -> Result<Cow<'a, str>, Error> {
        match invalid_char(value) {
            Some(c) => Err(Error::InvalidChar(c)),
            None => Ok(Self::escape_str(value)),
        }
    }
}

/// Escape using [`quick_xml`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickXmlEscaper {}

impl Escaper for QuickXmlEscaper {
    #[inline]
    fn escape_str(value: &str) -> Cow<str> {
        quick_xml::escape::escape(value)
    }
}

pub type DefaultEscaper = QuickXmlEscaper;

/// First character of `value` not permitted by XML 1.0,
///   if any.
///
/// See <https://www.w3.org/TR/xml/#NT-Char>.
pub fn invalid_char(value: &str) -> Option<char> {
    value.chars().find(|c| {
        !matches!(
            *c,
            '\t' | '\n' | '\r'
                | '\u{20}'..='\u{D7FF}'
                | '\u{E000}'..='\u{FFFD}'
                | '\u{10000}'..='\u{10FFFF}'
        )
    })
}
