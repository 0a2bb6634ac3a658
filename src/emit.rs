// XML emitter
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

//! Emission of a translated [`Document`] as BEAST 2 XML.
//!
//! Emission happens in three steps:
//!
//!   1. Every fragment is assigned a stable id (see [`id`]);
//!   2. The document is lowered into a stream of XIR [`Token`]s,
//!        placing each fragment once and referring to it by id
//!        thereafter;
//!   3. The stream is written by [`XmlWriter`],
//!        which escapes every attribute value and text node.
//!
//! All output is produced into memory.
//! Nothing is returned unless every step succeeds,
//!   so a caller writing the result to a file never leaves a truncated
//!   document behind.

pub mod id;
mod lower;

use crate::{
    diagnose::{Annotate, AnnotatedSpan, Diagnostic},
    global,
    span::UNKNOWN_SPAN,
    translate::Document,
    xir::{
        self,
        writer::{self, XmlWriter},
        Escaper, QName, Token,
    },
};
use lower::Lowerer;
use std::{
    error::Error,
    fmt::{self, Display},
};
use tracing::{debug, trace};

const XML_DECL: &[u8] =
    b"<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n";

/// Emit `document` as an XML byte stream,
///   escaping values with `escaper`.
pub fn emit<E: Escaper>(
    document: &Document,
    escaper: &E,
) -> Result<Vec<u8>, EmitError> {
    let ids = id::assign(document);
    let tokens = lower(document, &ids)?;

    trace!(tokens = tokens.len(), "document lowered");

    let mut writer = XmlWriter::new(Vec::from(XML_DECL), escaper);
    writer.write_all(tokens)?;
    let buf = writer.finish()?;

    debug!(bytes = buf.len(), "document emitted");

    Ok(buf)
}

/// Lower `document` into XIR using the fragment ids `ids`.
pub fn lower(document: &Document, ids: &[String]) -> Result<Vec<Token>, EmitError> {
    // Both of these are static and known to be valid.
    let root = QName::new_local("beast").map_err(|err| EmitError::InvalidName {
        fragment: "beast".into(),
        err,
    })?;

    Lowerer::new(document, ids).lower(
        root,
        &[
            ("version", global::BEAST_VERSION),
            ("namespace", global::BEAST_NAMESPACE),
        ],
        Some(banner(document.source())),
    )
}

/// Comment identifying the translator and the model it translated.
///
/// A source name that cannot appear within a comment is omitted.
fn banner(source: Option<&str>) -> String {
    let version = env!("CARGO_PKG_VERSION");

    match source {
        Some(src) if !src.contains("--") && xir::invalid_char(src).is_none() => {
            format!(" Generated by lphybeast {version} from {src} ")
        }
        _ => format!(" Generated by lphybeast {version} "),
    }
}

#[derive(Debug)]
pub enum EmitError {
    /// A value of the fragment with the given id contains a character
    ///   that cannot be represented in XML 1.0.
    InvalidChar { fragment: String, ch: char },

    /// An element or attribute name of the fragment with the given id is
    ///   not a valid XML name.
    InvalidName { fragment: String, err: xir::Error },

    /// A fragment refers to another that was not emitted before it.
    ///
    /// This represents a bug in a generator or in the translation
    ///   engine.
    Unresolved { fragment: String, target: String },

    Write(writer::Error),
}

impl Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use EmitError::*;

        match self {
            InvalidChar { fragment, ch } => write!(
                f,
                "element `{fragment}` contains character U+{:04X}, \
                   which cannot be represented in XML",
                u32::from(*ch),
            ),
            InvalidName { fragment, err } => {
                write!(f, "element `{fragment}` has an invalid name: {err}")
            }
            Unresolved { fragment, target } => write!(
                f,
                "element `{fragment}` refers to `{target}`, \
                   which has not been emitted",
            ),
            Write(e) => e.fmt(f),
        }
    }
}

impl Error for EmitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidName { err, .. } => Some(err),
            Self::Write(e) => Some(e),
            _ => None,
        }
    }
}

impl From<writer::Error> for EmitError {
    fn from(e: writer::Error) -> Self {
        Self::Write(e)
    }
}

impl Diagnostic for EmitError {
    fn describe(&self) -> Vec<AnnotatedSpan> {
        use EmitError::*;

        match self {
            InvalidChar { .. } => UNKNOWN_SPAN
                .help("remove control characters from names and values")
                .into(),
            Unresolved { .. } | InvalidName { .. } => vec![
                UNKNOWN_SPAN.internal_error(self.to_string()),
                UNKNOWN_SPAN.help(
                    "this is a bug in a generator; \
                       please report it with the model that triggered it",
                ),
            ],
            Write(_) => vec![],
        }
    }
}
