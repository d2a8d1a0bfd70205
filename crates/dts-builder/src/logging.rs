//! Progress reporting and logger setup
//!
//! Library code reports progress through [`Progress`], which carries the
//! verbosity switch explicitly instead of reading process-wide state.

use std::fmt;

use log::{LevelFilter, info};

/// Verbosity-gated progress sink backed by the `log` facade
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    verbose: bool,
}

impl Progress {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub const fn is_enabled(self) -> bool {
        self.verbose
    }

    /// Emit one progress message at info level when verbose
    pub fn report(self, args: fmt::Arguments<'_>) {
        if self.verbose {
            info!("{args}");
        }
    }
}

/// Report progress with `format!`-style arguments
#[macro_export]
macro_rules! progress {
    ($progress:expr, $($arg:tt)+) => {
        $progress.report(format_args!($($arg)+))
    };
}

/// Map `-v`/`-q` counts to a level filter; the default shows progress
pub fn level_filter(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Warn;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialise `env_logger`; `RUST_LOG` overrides the given level
pub fn init_logger(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .parse_default_env();
    // A logger may already be installed when embedded in another program
    let _ = builder.try_init();
}
