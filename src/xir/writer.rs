// XIR writer
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

//! Writing of XIR token streams as XML.
//!
//! [`XmlWriter`] is a finite state machine;
//!   each [`Token`] is written immediately,
//!     and the current [`WriterState`] alone determines whether it is
//!     valid and whether a preceding opening tag must first be closed.
//! The writer additionally tracks the names of open elements so that it
//!   never produces an unbalanced document,
//!     even when the token stream is faulty.

use super::{Error as XirError, Escaper, QName, Token};
use std::{
    fmt::{self, Display},
    io::{self, Write},
};

pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Xir(XirError),

    /// A token cannot follow the previous one.
    UnexpectedToken(String, WriterState),

    /// A closing tag does not match the innermost open element.
    Mismatched { open: Option<String>, close: String },

    /// The stream ended with elements still open.
    Unclosed(Vec<String>),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => e.fmt(f),
            Self::Xir(e) => e.fmt(f),
            Self::UnexpectedToken(tok, state) => {
                write!(f, "unexpected {tok} while writing XML ({state:?})")
            }
            Self::Mismatched {
                open: Some(open),
                close,
            } => write!(f, "closing tag `{close}` does not match `{open}`"),
            Self::Mismatched { open: None, close } => {
                write!(f, "closing tag `{close}` has no opening tag")
            }
            Self::Unclosed(names) => {
                write!(f, "unclosed elements: {}", names.join(", "))
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Xir(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<XirError> for Error {
    fn from(e: XirError) -> Self {
        Self::Xir(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriterState {
    /// Between nodes.
    #[default]
    NodeExpected,

    /// Within an opening tag that has not yet been terminated by `>`.
    NodeOpen,

    /// Immediately after an attribute name.
    AttrNameAdjacent,

    /// Within an attribute value that is being written in fragments.
    AttrFragmentAdjacent,
}

/// Writer of a XIR [`Token`] stream into `sink`.
pub struct XmlWriter<'e, W: Write, E: Escaper> {
    sink: W,
    escaper: &'e E,
    state: WriterState,

    /// Names of open elements,
    ///   innermost last.
    open: Vec<QName>,
}

impl<'e, W: Write, E: Escaper> XmlWriter<'e, W, E> {
    pub fn new(sink: W, escaper: &'e E) -> Self {
        Self {
            sink,
            escaper,
            state: WriterState::default(),
            open: Vec::new(),
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Number of elements currently open.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Write each token of `toks` in order.
    pub fn write_all<I: IntoIterator<Item = Token>>(&mut self, toks: I) -> Result {
        toks.into_iter().try_for_each(|tok| self.write(tok))
    }

    /// Write a single token.
    pub fn write(&mut self, tok: Token) -> Result {
        use WriterState::*;

        self.state = match (tok, self.state) {
            (Token::Open(name), NodeExpected | NodeOpen) => {
                self.terminate_open_tag()?;
                self.sink.write_all(b"<")?;
                self.name(&name)?;
                self.open.push(name);

                NodeOpen
            }

            (Token::Close(None), NodeOpen) => {
                self.open.pop();
                self.sink.write_all(b"/>")?;

                NodeExpected
            }

            (Token::Close(Some(name)), NodeExpected | NodeOpen) => {
                match self.open.pop() {
                    Some(open) if open == name => (),
                    open => {
                        return Err(Error::Mismatched {
                            open: open.map(|o| o.to_string()),
                            close: name.to_string(),
                        })
                    }
                }

                // `<foo></foo>` if nothing was written since opening.
                self.terminate_open_tag()?;
                self.sink.write_all(b"</")?;
                self.name(&name)?;
                self.sink.write_all(b">")?;

                NodeExpected
            }

            (Token::AttrName(name), NodeOpen) => {
                self.sink.write_all(b" ")?;
                self.name(&name)?;

                AttrNameAdjacent
            }

            (Token::AttrValue(value), AttrNameAdjacent | AttrFragmentAdjacent) => {
                if self.state == AttrNameAdjacent {
                    self.sink.write_all(b"=\"")?;
                }
                self.escaped(&value)?;
                self.sink.write_all(b"\"")?;

                NodeOpen
            }

            (Token::AttrValueFragment(value), AttrNameAdjacent | AttrFragmentAdjacent) => {
                if self.state == AttrNameAdjacent {
                    self.sink.write_all(b"=\"")?;
                }
                self.escaped(&value)?;

                AttrFragmentAdjacent
            }

            (Token::Text(text), NodeExpected | NodeOpen) => {
                self.terminate_open_tag()?;
                self.escaped(&text)?;

                NodeExpected
            }

            (Token::Comment(comment), NodeExpected | NodeOpen) => {
                if comment.contains("--") || comment.ends_with('-') {
                    return Err(XirError::InvalidComment(comment).into());
                }
                if let Some(c) = super::invalid_char(&comment) {
                    return Err(XirError::InvalidChar(c).into());
                }

                self.terminate_open_tag()?;
                self.sink.write_all(b"<!--")?;
                self.sink.write_all(comment.as_bytes())?;
                self.sink.write_all(b"-->")?;

                NodeExpected
            }

            // Anything else would produce malformed XML.
            (tok, state) => {
                return Err(Error::UnexpectedToken(tok.to_string(), state))
            }
        };

        Ok(())
    }

    /// Complete the document,
    ///   returning the sink.
    pub fn finish(mut self) -> Result<W> {
        match self.state {
            WriterState::NodeExpected if self.open.is_empty() => {
                self.sink.flush()?;
                Ok(self.sink)
            }
            WriterState::NodeExpected | WriterState::NodeOpen => Err(Error::Unclosed(
                self.open.iter().map(QName::to_string).collect(),
            )),
            state => Err(Error::UnexpectedToken("end of document".into(), state)),
        }
    }

    fn terminate_open_tag(&mut self) -> Result {
        if self.state == WriterState::NodeOpen {
            self.sink.write_all(b">")?;
        }

        Ok(())
    }

    fn name(&mut self, name: &QName) -> Result {
        if let Some(prefix) = name.prefix() {
            self.sink.write_all(prefix.as_bytes())?;
            self.sink.write_all(b":")?;
        }

        Ok(self.sink.write_all(name.local_name().as_bytes())?)
    }

    fn escaped(&mut self, value: &str) -> Result {
        let escaped = self.escaper.escape(value)?;
        Ok(self.sink.write_all(escaped.as_bytes())?)
    }
}
