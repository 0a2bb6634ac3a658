// Translation driver
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

//! End-to-end translation of an interchange document into a BEAST 2 XML
//!   file.
//!
//! The driver ties the pipeline together:
//!   it loads the model,
//!   populates a registry with built-in generators and the selected
//!     extensions,
//!   translates,
//!   and emits.
//! The output file is written only once the whole document has been
//!   emitted into memory.
//! An output left by an earlier run is removed when translation fails,
//!   so no output exists after any failure.

use crate::{
    config::{Config, ConfigError},
    diagnose::{AnnotatedSpan, Diagnostic},
    emit::{emit, EmitError},
    ext::{load_extensions, ExtensionReport},
    gen::Registry,
    model::load::{from_reader, LoadError},
    translate::{translate, TranslateError},
    xir::DefaultEscaper,
};
use std::{
    error::Error,
    fmt::{self, Display},
    fs::{self, File},
    io::{self, BufReader},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// A single translation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
    pub config: Config,
}

/// Result of a successful translation.
#[derive(Debug)]
pub struct Outcome {
    /// One report per extension in the selection,
    ///   including those that failed to load.
    pub extensions: Vec<ExtensionReport>,

    /// Number of bytes written.
    pub written: usize,
}

/// Registry of built-in generators and the extensions selected by
///   `config`.
pub fn registry(
    config: &Config,
) -> Result<(Registry, Vec<ExtensionReport>), ConfigError> {
    let catalog = config.catalog()?;
    let mut registry = Registry::with_builtins();
    let reports = load_extensions(&catalog, &mut registry);

    debug!(generators = registry.len(), "registry populated");

    Ok((registry, reports))
}

/// Translate the interchange document at `input` into XML held in
///   memory.
pub fn translate_file(
    input: &Path,
    config: &Config,
) -> Result<(Vec<u8>, Vec<ExtensionReport>), DriverError> {
    config.validate()?;

    let file = File::open(input).map_err(|err| DriverError::Read {
        path: input.into(),
        err,
    })?;

    let model = from_reader(BufReader::new(file))?;
    info!(path = %input.display(), nodes = model.len(), "model loaded");

    let (registry, reports) = registry(config)?;
    let doc = translate(&model, &registry, &config.run)?;
    let xml = emit(&doc, &DefaultEscaper::default())?;

    Ok((xml, reports))
}

/// Perform `job`,
///   writing the output file only if translation succeeds.
pub fn run(job: &Job) -> Result<Outcome, DriverError> {
    let (xml, extensions) =
        translate_file(&job.input, &job.config).map_err(|err| {
            remove_stale_output(job);
            err
        })?;

    fs::write(&job.output, &xml).map_err(|err| {
        // A partial file is worse than none.
        let _ = fs::remove_file(&job.output);

        DriverError::Write {
            path: job.output.clone(),
            err,
        }
    })?;

    info!(path = %job.output.display(), bytes = xml.len(), "output written");

    Ok(Outcome {
        extensions,
        written: xml.len(),
    })
}

/// Remove the output of an earlier run,
///   unless it is the input itself.
fn remove_stale_output(job: &Job) {
    let same = match (fs::canonicalize(&job.input), fs::canonicalize(&job.output)) {
        (Ok(input), Ok(output)) => input == output,
        _ => false,
    };

    if !same && fs::remove_file(&job.output).is_ok() {
        info!(path = %job.output.display(), "stale output removed");
    }
}

/// Default output path for `input`:
///   the same path with an `xml` extension.
pub fn default_output(input: &Path) -> PathBuf {
    input.with_extension("xml")
}

/// Stem used to name log and tree files written by BEAST,
///   derived from the output path.
pub fn file_stem(output: &Path) -> Option<String> {
    output
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(String::from)
}

#[derive(Debug)]
pub enum DriverError {
    /// The input document could not be read.
    Read { path: PathBuf, err: io::Error },

    /// The output document could not be written.
    Write { path: PathBuf, err: io::Error },

    Load(LoadError),
    Config(ConfigError),
    Translate(TranslateError),
    Emit(EmitError),
}

impl DriverError {
    /// Whether this error originates from writing output rather than
    ///   from the input or its translation.
    pub fn is_output_error(&self) -> bool {
        matches!(self, Self::Write { .. })
    }
}

impl Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Read { path, err } => {
                write!(f, "cannot read `{}`: {err}", path.display())
            }
            Self::Write { path, err } => {
                write!(f, "cannot write `{}`: {err}", path.display())
            }
            Self::Load(e) => Display::fmt(e, f),
            Self::Config(e) => Display::fmt(e, f),
            Self::Translate(e) => Display::fmt(e, f),
            Self::Emit(e) => Display::fmt(e, f),
        }
    }
}

impl Error for DriverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { err, .. } | Self::Write { err, .. } => Some(err),
            Self::Load(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Translate(e) => Some(e),
            Self::Emit(e) => Some(e),
        }
    }
}

impl From<LoadError> for DriverError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

impl From<ConfigError> for DriverError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<TranslateError> for DriverError {
    fn from(e: TranslateError) -> Self {
        Self::Translate(e)
    }
}

impl From<EmitError> for DriverError {
    fn from(e: EmitError) -> Self {
        Self::Emit(e)
    }
}

impl Diagnostic for DriverError {
    fn describe(&self) -> Vec<AnnotatedSpan> {
        match self {
            Self::Load(e) => e.describe(),
            Self::Translate(e) => e.describe(),
            Self::Emit(e) => e.describe(),
            Self::Read { .. } | Self::Write { .. } | Self::Config(_) => vec![],
        }
    }
}
