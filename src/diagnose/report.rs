// Diagnostic report rendering
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

//! Rendering of diagnostic information.

// NB: `write!` together with `\n` is preferred to `writeln!` so that there
//   is only a single sequence of characters to search for while tracking
//   down newlines,
//     rather than using both.

use super::{AnnotatedSpan, Diagnostic, Level};
use crate::span::Span;
use std::fmt::{self, Display};

pub trait Reporter {
    /// Render diagnostic report.
    ///
    /// The provided [`Report`] implements [`Display`].
    /// Render the entire report before writing it anywhere so that output
    ///   is not interleaved with concurrent processes.
    ///
    /// This method does not return [`Result`] and should never fail.
    fn render<'d, D: Diagnostic>(&self, diagnostic: &'d D) -> Report<'d, D>;
}

/// Source text available to a reporter for excerpting.
#[derive(Debug, Clone)]
struct Source {
    name: String,
    lines: Option<Vec<String>>,
}

/// Render diagnostic report in a highly visual way.
///
/// When the LPhy source text is available,
///   the offending line is excerpted with a marker beneath the column of
///   the declaration.
/// Otherwise only the location is printed.
#[derive(Debug, Clone, Default)]
pub struct VisualReporter {
    source: Option<Source>,
}

impl VisualReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reporter that names the source file in locations but cannot
    ///   excerpt it.
    pub fn with_source_name<S: Into<String>>(name: S) -> Self {
        Self {
            source: Some(Source {
                name: name.into(),
                lines: None,
            }),
        }
    }

    /// Reporter that excerpts lines from the provided source text.
    pub fn with_source<S: Into<String>>(name: S, text: &str) -> Self {
        Self {
            source: Some(Source {
                name: name.into(),
                lines: Some(text.lines().map(String::from).collect()),
            }),
        }
    }

    fn line_text(&self, span: Span) -> Option<&str> {
        let lines = self.source.as_ref()?.lines.as_ref()?;
        let index = usize::try_from(span.line()).ok()?.checked_sub(1)?;

        lines.get(index).map(String::as_str)
    }

    fn location(&self, span: Span) -> String {
        match &self.source {
            Some(Source { name, .. }) => format!("{name}:{span}"),
            None => format!("line {}, column {}", span.line(), span.column()),
        }
    }
}

impl Reporter for VisualReporter {
    fn render<'d, D: Diagnostic>(&self, diagnostic: &'d D) -> Report<'d, D> {
        let mut report = Report::empty(diagnostic);

        for aspan in diagnostic.describe() {
            report.push(self, aspan);
        }

        report
    }
}

/// A rendered diagnostic.
#[derive(Debug)]
pub struct Report<'d, D: Diagnostic> {
    diagnostic: &'d D,
    level: Level,
    secs: Vec<Section>,
}

/// A location excerpt or a trailing footnote.
#[derive(Debug)]
enum Section {
    Location {
        location: String,
        excerpt: Option<(u32, String)>,
        marks: Vec<(u32, Level, Option<String>)>,
    },
    Footnote(Level, String),
}

impl<'d, D: Diagnostic> Report<'d, D> {
    fn empty(diagnostic: &'d D) -> Self {
        Self {
            diagnostic,
            level: Level::default(),
            secs: Vec::new(),
        }
    }

    /// Severity of the most severe annotation in the report.
    pub fn level(&self) -> Level {
        self.level
    }

    fn push(&mut self, reporter: &VisualReporter, aspan: AnnotatedSpan) {
        let span = aspan.span();
        let level = aspan.level();
        let label = aspan.label().map(String::from);

        self.level = self.level.min(level);

        if !span.is_known() {
            if let Some(text) = label {
                self.secs.push(Section::Footnote(level, text));
            }
            return;
        }

        // Squash consecutive annotations of the same line into one excerpt.
        let location = reporter.location(span);
        if let Some(Section::Location {
            location: prev,
            marks,
            ..
        }) = self.secs.last_mut()
        {
            if *prev == location {
                marks.push((span.column(), level, label));
                return;
            }
        }

        self.secs.push(Section::Location {
            location,
            excerpt: reporter
                .line_text(span)
                .map(|text| (span.line(), text.to_string())),
            marks: vec![(span.column(), level, label)],
        });
    }
}

impl<'d, D: Diagnostic> Display for Report<'d, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}\n", self.level, self.diagnostic)?;

        for sec in &self.secs {
            match sec {
                Section::Location {
                    location,
                    excerpt: Some((line, text)),
                    marks,
                } => {
                    let gutter = " ".repeat(line.to_string().len());
                    write!(f, "{gutter}--> {location}\n")?;
                    write!(f, "{gutter} |\n")?;
                    write!(f, "{line} | {text}\n")?;

                    for (col, level, label) in marks {
                        let pad = " ".repeat((*col as usize).saturating_sub(1));
                        match label {
                            Some(label) => write!(
                                f,
                                "{gutter} | {pad}^ {level}: {label}\n"
                            )?,
                            None => write!(f, "{gutter} | {pad}^\n")?,
                        }
                    }
                }

                Section::Location {
                    location,
                    excerpt: None,
                    marks,
                } => {
                    write!(f, "  --> {location}\n")?;

                    for (_, level, label) in marks {
                        if let Some(label) = label {
                            write!(f, "   = {level}: {label}\n")?;
                        }
                    }
                }

                Section::Footnote(level, text) => {
                    write!(f, "   = {level}: {text}\n")?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diagnose::Annotate;
    use std::error::Error;

    #[derive(Debug)]
    struct StubError(Vec<AnnotatedSpan<'static>>);

    impl Display for StubError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "stub failure")
        }
    }

    impl Error for StubError {}

    impl Diagnostic for StubError {
        fn describe(&self) -> Vec<AnnotatedSpan> {
            self.0.clone()
        }
    }

    #[test]
    fn renders_header_without_spans() {
        let err = StubError(vec![]);
        let report = VisualReporter::new().render(&err).to_string();

        assert_eq!("error: stub failure\n", report);
    }

    #[test]
    fn renders_unknown_spans_as_footnotes() {
        let err = StubError(vec![Span::default().help("try this")]);
        let report = VisualReporter::new().render(&err).to_string();

        assert_eq!("error: stub failure\n   = help: try this\n", report);
    }

    #[test]
    fn excerpts_source_line_with_marker() {
        let src = "m = 1.0;\nkappa ~ Foo(m);\n";
        let err = StubError(vec![Span::new(2, 9).error("unknown distribution")]);

        let report = VisualReporter::with_source("model.lphy", src)
            .render(&err)
            .to_string();

        assert_eq!(
            "error: stub failure\n\
             \x20--> model.lphy:2:9\n\
             \x20 |\n\
             2 | kappa ~ Foo(m);\n\
             \x20 |         ^ error: unknown distribution\n",
            report
        );
    }

    #[test]
    fn squashes_annotations_on_same_location() {
        let span = Span::new(4, 1);
        let err = StubError(span.error("first").with_help("second").to_vec());

        let report = VisualReporter::with_source_name("m.lphy")
            .render(&err)
            .to_string();

        assert_eq!(
            "error: stub failure\n  --> m.lphy:4:1\n   = error: first\n   = help: second\n",
            report
        );
    }

    #[test]
    fn report_level_is_most_severe() {
        let err = StubError(vec![
            Span::new(1, 1).note("a"),
            Span::new(2, 1).internal_error("b"),
        ]);

        assert_eq!(
            Level::InternalError,
            VisualReporter::new().render(&err).level()
        );
    }
}
