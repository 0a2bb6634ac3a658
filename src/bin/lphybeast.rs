// LPhyBEAST translator
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

//! Translate an evaluated LPhy model into a BEAST 2 XML document.
//!
//! The input is the interchange document written by the LPhy runtime;
//!   see [`lphybeast::model::load`].

extern crate lphybeast;

use getopts::{Fail, Matches, Options};
use lphybeast::{
    config::{Config, ConfigError, ExtensionSelection, Mc3Config, RunConfig},
    diagnose::{Reporter, VisualReporter},
    driver::{self, DriverError, Job},
    trace,
};
use std::{
    env,
    fmt::{self, Display},
    path::PathBuf,
    str::FromStr,
};

#[derive(Debug, PartialEq)]
enum Command {
    Translate(Job),
    Usage,
}

/// Invalid command line.
#[derive(Debug, PartialEq)]
enum UsageError {
    Opts(Fail),

    /// An option value could not be parsed.
    BadValue { opt: &'static str, value: String },

    /// Two options that cannot be used together.
    Conflict(&'static str, &'static str),

    /// Options that parse but describe an unusable run.
    Config(ConfigError),
}

impl Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opts(e) => Display::fmt(e, f),
            Self::BadValue { opt, value } => {
                write!(f, "invalid value `{value}` for --{opt}")
            }
            Self::Conflict(a, b) => write!(f, "--{a} cannot be used with --{b}"),
            Self::Config(e) => Display::fmt(e, f),
        }
    }
}

impl From<Fail> for UsageError {
    fn from(e: Fail) -> Self {
        Self::Opts(e)
    }
}

impl From<ConfigError> for UsageError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

fn exit_code(e: &DriverError) -> exitcode::ExitCode {
    match e {
        DriverError::Write { .. } => exitcode::IOERR,
        DriverError::Config(_) => exitcode::USAGE,
        _ => exitcode::DATAERR,
    }
}

pub fn main() {
    trace::init();

    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = get_opts();
    let usage = opts.usage(&format!("Usage: {} [OPTIONS] INPUT", program));

    match parse_options(opts, args) {
        Ok(Command::Translate(job)) => {
            let reporter =
                VisualReporter::with_source_name(job.input.display().to_string());

            if let Err(e) = driver::run(&job) {
                // Rendered in full before writing so that output is not
                //   interleaved with other processes.
                let report = reporter.render(&e).to_string();
                eprintln!(
                    "{report}\nfatal: failed to translate `{}`",
                    job.input.display()
                );

                std::process::exit(exit_code(&e));
            }

            std::process::exit(exitcode::OK);
        }
        Ok(Command::Usage) => {
            println!("{}", usage);
            std::process::exit(exitcode::OK);
        }
        Err(e) => {
            eprintln!("{}", e);
            println!("{}", usage);
            std::process::exit(exitcode::USAGE);
        }
    }
}

fn get_opts() -> Options {
    let mut opts = Options::new();
    opts.optopt("o", "output", "set output file name", "FILE");
    opts.optopt("l", "chain-length", "set MCMC chain length", "N");
    opts.optopt("b", "pre-burnin", "set MCMC pre-burnin", "N");
    opts.optopt("", "log-every", "set trace logging frequency", "N");
    opts.optflag("", "sample-from-prior", "ignore the likelihood");
    opts.optopt("", "mc3", "run Metropolis-coupled MCMC", "CHAINS");
    opts.optopt("", "ext", "load only the named extensions", "NAME[,NAME]");
    opts.optflag("", "no-ext", "load no extensions");
    opts.optflag("", "unicode", "keep non-ASCII letters in ids");
    opts.optflag("h", "help", "print this help menu");

    opts
}

/// Parse the numeric value of option `name`,
///   if present.
fn num_opt<T: FromStr>(
    matches: &Matches,
    name: &'static str,
) -> Result<Option<T>, UsageError> {
    match matches.opt_str(name) {
        Some(value) => match value.parse() {
            Ok(n) => Ok(Some(n)),
            Err(_) => Err(UsageError::BadValue { opt: name, value }),
        },
        None => Ok(None),
    }
}

fn parse_options(
    opts: Options,
    args: Vec<String>,
) -> Result<Command, UsageError> {
    let matches = opts.parse(&args[1..])?;

    if matches.opt_present("h") {
        return Ok(Command::Usage);
    }

    let input = match matches.free.len() {
        0 => return Err(Fail::OptionMissing(String::from("INPUT")).into()),
        1 => PathBuf::from(&matches.free[0]),
        _ => {
            return Err(Fail::UnrecognizedOption(matches.free[1].clone()).into())
        }
    };

    let output = match matches.opt_str("o") {
        Some(m) => PathBuf::from(m),
        None => driver::default_output(&input),
    };

    let defaults = RunConfig::default();

    let run = RunConfig {
        chain_length: num_opt(&matches, "chain-length")?
            .unwrap_or(defaults.chain_length),
        log_every: num_opt(&matches, "log-every")?,
        pre_burnin: num_opt(&matches, "pre-burnin")?,
        sample_from_prior: matches.opt_present("sample-from-prior"),
        file_stem: driver::file_stem(&output).unwrap_or(defaults.file_stem),
        mc3: num_opt(&matches, "mc3")?.map(Mc3Config::with_chains),
        unicode_ids: matches.opt_present("unicode"),
    };

    let extensions = match (matches.opt_str("ext"), matches.opt_present("no-ext")) {
        (Some(_), true) => return Err(UsageError::Conflict("ext", "no-ext")),
        (Some(names), false) => ExtensionSelection::Only(
            names
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect(),
        ),
        (None, true) => ExtensionSelection::None,
        (None, false) => ExtensionSelection::All,
    };

    let config = Config { run, extensions };

    // Reject unusable settings (and unknown extension names) as bad
    //   options rather than failing later as translation errors.
    config.validate()?;
    config.catalog()?;

    Ok(Command::Translate(Job {
        input,
        output,
        config,
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("program")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    fn parse(list: &[&str]) -> Result<Command, UsageError> {
        parse_options(get_opts(), args(list))
    }

    fn job(list: &[&str]) -> Job {
        match parse(list) {
            Ok(Command::Translate(job)) => job,
            other => panic!("expected translation: {other:?}"),
        }
    }

    #[test]
    fn parse_options_help() {
        assert_eq!(Ok(Command::Usage), parse(&["-h"]));
        assert_eq!(Ok(Command::Usage), parse(&["--help", "foo.json"]));
    }

    #[test]
    fn parse_options_invalid() {
        match parse(&["--invalid", "foo.json"]) {
            Err(UsageError::Opts(Fail::UnrecognizedOption(opt))) => {
                assert_eq!("invalid", opt)
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parse_options_missing_input() {
        match parse(&[]) {
            Err(UsageError::Opts(Fail::OptionMissing(message))) => {
                assert_eq!("INPUT", message)
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parse_options_too_many_args() {
        match parse(&["foo.json", "bar.json"]) {
            Err(UsageError::Opts(Fail::UnrecognizedOption(message))) => {
                assert_eq!("bar.json", message)
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parse_options_defaults() {
        let job = job(&["dir/hky.json"]);

        assert_eq!(PathBuf::from("dir/hky.json"), job.input);
        assert_eq!(PathBuf::from("dir/hky.xml"), job.output);
        assert_eq!("hky", job.config.run.file_stem);
        assert_eq!(
            RunConfig::default().chain_length,
            job.config.run.chain_length
        );
        assert_eq!(ExtensionSelection::All, job.config.extensions);
    }

    #[test]
    fn parse_options_output_names_logs() {
        let job = job(&["-o", "out/run1.xml", "hky.json"]);

        assert_eq!(PathBuf::from("out/run1.xml"), job.output);
        assert_eq!("run1", job.config.run.file_stem);
    }

    #[test]
    fn parse_options_run_settings() {
        let job = job(&[
            "-l",
            "2000000",
            "-b",
            "0",
            "--log-every",
            "1000",
            "--sample-from-prior",
            "--mc3",
            "4",
            "--unicode",
            "hky.json",
        ]);

        let run = job.config.run;
        assert_eq!(2_000_000, run.chain_length);
        assert_eq!(Some(0), run.pre_burnin);
        assert_eq!(Some(1000), run.log_every);
        assert!(run.sample_from_prior);
        assert_eq!(Some(Mc3Config::with_chains(4)), run.mc3);
        assert!(run.unicode_ids);
    }

    #[test]
    fn parse_options_non_numeric() {
        assert!(matches!(
            parse(&["-l", "many", "hky.json"]),
            Err(UsageError::BadValue { opt: "chain-length", .. })
        ));
    }

    #[test]
    fn parse_options_rejects_invalid_config() {
        assert!(matches!(
            parse(&["--log-every", "0", "hky.json"]),
            Err(UsageError::Config(ConfigError::ZeroLogEvery))
        ));
        assert!(matches!(
            parse(&["-l", "10000", "--log-every", "20000", "hky.json"]),
            Err(UsageError::Config(ConfigError::LogEveryExceedsChain { .. }))
        ));
        assert!(matches!(
            parse(&["--mc3", "1", "hky.json"]),
            Err(UsageError::Config(ConfigError::TooFewChains(1)))
        ));
    }

    #[test]
    fn parse_options_extensions() {
        assert_eq!(
            ExtensionSelection::Only(vec!["mascot".into()]),
            job(&["--ext", "mascot", "hky.json"]).config.extensions
        );
        assert_eq!(
            ExtensionSelection::None,
            job(&["--no-ext", "hky.json"]).config.extensions
        );
    }

    #[test]
    fn parse_options_unknown_extension() {
        assert!(matches!(
            parse(&["--ext", "mascot,beastlabs", "hky.json"]),
            Err(UsageError::Config(ConfigError::Extension(_)))
        ));
    }

    #[test]
    fn parse_options_conflicting_extensions() {
        assert!(matches!(
            parse(&["--ext", "mascot", "--no-ext", "hky.json"]),
            Err(UsageError::Conflict("ext", "no-ext"))
        ));
    }
}
