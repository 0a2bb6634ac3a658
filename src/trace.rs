// Tracing initialization
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

//! Initialization of diagnostic logging.
//!
//! The library only emits [`tracing`] events;
//!   it is up to a program to install a subscriber,
//!     which [`init`] does for `lphybeast`.
//!
//! Verbosity is controlled by the `LPHYBEAST_LOG` environment variable
//!   using [`EnvFilter`] directives,
//!     e.g. `LPHYBEAST_LOG=lphybeast::translate=debug`.
//! Output is written to standard error so that it never mixes with a
//!   document written to standard output.

use std::{io, sync::Once};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "LPHYBEAST_LOG";

/// Directives used when [`LOG_ENV`] is unset or invalid.
pub const DEFAULT_DIRECTIVES: &str = "lphybeast=warn";

static INIT: Once = Once::new();

/// Install the global subscriber.
///
/// Calling this more than once has no further effect.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

        // Another subscriber may already be installed by a host program;
        //   that one wins.
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .without_time(),
            )
            .with(filter)
            .try_init();
    });
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();

        assert!(INIT.is_completed());
    }

    #[test]
    fn default_directives_parse() {
        assert!(DEFAULT_DIRECTIVES.parse::<EnvFilter>().is_ok());
    }
}
