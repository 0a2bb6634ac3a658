// XML IR (XIR)
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

//! Intermediate representation (IR) of an XML document.
//!
//! XIR serves as an abstraction layer atop of whatever XML library is
//!   used (e.g. `quick_xml`).
//! XIR is _not_ intended to be comprehensive,
//!   or even general-purpose---it
//!     exists only to write the documents this translator produces.
//!
//! The [emitter](crate::emit) lowers a translated document into a stream
//!   of [`Token`]s,
//!     which are then written by [`writer::XmlWriter`].
//! Tokens always hold _unescaped_ values;
//!   escaping is the responsibility of the writer's [`Escaper`] alone,
//!     so that no value can be escaped twice or not at all.
//!
//! _Note:_ XIR refers to "opening" and "closing" tags,
//!   as opposed to "start" and "end" as used in the XML specification.

mod error;
mod escape;
pub mod writer;

pub use error::Error;
pub use escape::{invalid_char, DefaultEscaper, Escaper, QuickXmlEscaper};

use std::fmt::Display;

/// A qualified name (namespace prefix and local name).
///
/// Names are validated on construction so that writers need not
///   consider them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName(Option<String>, String);

impl QName {
    /// Create a new name from a local name only.
    pub fn new_local<S: Into<String>>(local_name: S) -> Result<Self, Error> {
        let local = local_name.into();
        validate_ncname(&local)?;

        Ok(Self(None, local))
    }

    /// Namespace prefix,
    ///   if any.
    pub fn prefix(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Local part of a name (name without namespace).
    pub fn local_name(&self) -> &str {
        &self.1
    }
}

/// Validate an XML name minus `":"`.
///
/// This is stricter than it need be for non-ASCII names,
///   which the target format does not use.
///
/// See <https://www.w3.org/TR/REC-xml-names/#NT-NCName>.
fn validate_ncname(name: &str) -> Result<(), Error> {
    let mut chars = name.chars();

    let valid_start = chars
        .next()
        .map(|c| c.is_alphabetic() || c == '_')
        .unwrap_or(false);

    let valid_rest =
        chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if valid_start && valid_rest {
        Ok(())
    } else if name.contains(':') {
        Err(Error::NCColon(name.into()))
    } else {
        Err(Error::InvalidQName(name.into()))
    }
}

impl TryFrom<&str> for QName {
    type Error = Error;

    /// Parse a name,
    ///   splitting it on the first colon into a namespace prefix and
    ///   local part.
    ///
    /// The prefix and local part must each be a valid NCName.
    fn try_from(name: &str) -> Result<Self, Self::Error> {
        match name.split_once(':') {
            Some((prefix, local)) => {
                if prefix.is_empty() || local.is_empty() {
                    return Err(Error::InvalidQName(name.into()));
                }

                validate_ncname(prefix)?;
                validate_ncname(local)?;

                Ok(Self(Some(prefix.into()), local.into()))
            }
            None => Self::new_local(name),
        }
    }
}

impl TryFrom<(&str, &str)> for QName {
    type Error = Error;

    fn try_from((prefix, local): (&str, &str)) -> Result<Self, Self::Error> {
        validate_ncname(prefix)?;
        validate_ncname(local)?;

        Ok(Self(Some(prefix.into()), local.into()))
    }
}

impl Display for QName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QName(Some(prefix), local) => write!(f, "{}:{}", prefix, local),
            QName(None, local) => local.fmt(f),
        }
    }
}

/// XML tokens produced by the emitter.
///
/// Tokens are flat:
///   nesting is expressed by the order of [`Token::Open`] and
///   [`Token::Close`] alone,
///     and a [`writer::XmlWriter`] need only know its current state to
///     write the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Open(QName),

    /// Closing tag of the innermost open element,
    ///   or [`None`] to self-close it.
    ///
    /// Self-closing is explicit so that a writer never has to guess
    ///   whether an element was meant to be empty.
    Close(Option<QName>),

    /// Element attribute name.
    AttrName(QName),

    /// Element attribute value.
    AttrValue(String),

    /// A portion of an element attribute value.
    ///
    /// This allows for concatenating values into an attribute value
    ///   (such as the `@` of a reference and the id it names)
    ///   without having to first allocate the whole.
    /// The last fragment must be a [`Token::AttrValue`].
    AttrValueFragment(String),

    /// Comment node.
    ///
    /// Comments are not escaped,
    ///   and so must not contain `--`.
    Comment(String),

    /// Character data as part of an element.
    Text(String),
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // _Do not_ render large amounts of text here;
        //   alignments may be arbitrarily large.
        match self {
            Self::Open(qname) => write!(f, "`<{}>`", qname),
            Self::Close(Some(qname)) => write!(f, "`</{}>`", qname),
            Self::Close(None) => write!(f, "`/>`"),
            Self::AttrName(qname) => write!(f, "`@{}`", qname),
            Self::AttrValue(..) => write!(f, "attribute value"),
            Self::AttrValueFragment(..) => write!(f, "attribute value fragment"),
            Self::Comment(..) => write!(f, "comment"),
            Self::Text(..) => write!(f, "text"),
        }
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    type TestResult = Result<(), Error>;

    /// Hastily produce a [`Token::Open`].
    pub fn open(name: &str) -> Token {
        Token::Open(name.try_into().unwrap())
    }

    /// Hastily produce a [`Token::Close`].
    pub fn close(name: Option<&str>) -> Token {
        Token::Close(name.map(|name| name.try_into().unwrap()))
    }

    pub fn attr(name: &str) -> Token {
        Token::AttrName(name.try_into().unwrap())
    }

    mod name {
        use super::*;

        #[test]
        fn local_name_from_local_part_only() -> TestResult {
            let name = QName::new_local("foo")?;

            assert_eq!("foo", name.local_name());
            assert_eq!(None, name.prefix());

            Ok(())
        }

        #[test]
        fn fully_qualified_name() -> TestResult {
            let name: QName = ("foons", "foo").try_into()?;

            assert_eq!(Some("foons"), name.prefix());
            assert_eq!("foo", name.local_name());
            assert_eq!("foons:foo", name.to_string());

            Ok(())
        }

        #[test]
        fn splits_on_colon() -> TestResult {
            let name: QName = "xsi:type".try_into()?;

            assert_eq!(Some("xsi"), name.prefix());
            assert_eq!("type", name.local_name());

            Ok(())
        }

        #[test]
        fn dotted_names_are_valid() -> TestResult {
            let name: QName = "clock.rate".try_into()?;
            assert_eq!("clock.rate", name.local_name());

            Ok(())
        }

        #[test]
        fn local_name_fails_with_colon() {
            assert_eq!(
                Err(Error::NCColon("a:b".into())),
                QName::new_local("a:b"),
            );
        }

        #[test]
        fn rejects_invalid_names() {
            for name in ["", "1abc", "a b", "a<b", ":a", "a:"] {
                assert!(
                    QName::try_from(name).is_err(),
                    "`{name}` should be rejected",
                );
            }
        }
    }
}
