//! Tracing setup for the `wsync` binary.
//!
//! Diagnostics go to stderr; command results are printed to stdout, so
//! `wsync pending --json | jq` keeps working at any verbosity.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much diagnostic output to emit, from least to most.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Warnings and errors, e.g. a failed immediate sync.
    #[default]
    Normal,
    /// Adds request URLs and store activity.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Map `-q` and the number of `-v` flags to a level. `-q` wins.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// The most detailed level that will be emitted.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directive scoped to this crate's targets.
    #[must_use]
    pub fn directive(self) -> String {
        format!("workshop_sync={}", self.level())
    }
}

/// Install the global subscriber.
///
/// A `RUST_LOG` value replaces the verbosity-derived filter. Calling this
/// more than once is harmless; later calls are no-ops.
///
/// # Examples
///
/// ```no_run
/// use workshop_sync::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(false, 1));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= Verbosity::Verbose)
                .without_time(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(Verbosity::from_flags(true, 3), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, 5), Verbosity::Trace);
    }

    #[test]
    fn test_normal_shows_warnings() {
        assert_eq!(Verbosity::default().level(), Level::WARN);
        assert_eq!(Verbosity::Normal.directive(), "workshop_sync=WARN");
    }

    #[test]
    fn test_ordering_follows_detail() {
        assert!(Verbosity::Quiet < Verbosity::Normal);
        assert!(Verbosity::Normal < Verbosity::Verbose);
        assert!(Verbosity::Verbose < Verbosity::Trace);
    }

    #[test]
    fn test_repeat_init_is_harmless() {
        init_logging(Verbosity::Quiet);
        init_logging(Verbosity::Trace);
    }
}
