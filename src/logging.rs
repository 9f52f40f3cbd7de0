//! Diagnostic logging on stderr.
//!
//! stdout carries command output only; everything from `tracing` goes to stderr.
//! `RUST_LOG` takes precedence over the verbosity flag.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Filter directive for a `-v` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "impact_scope=warn",
        1 => "impact_scope=info",
        _ => "impact_scope=debug",
    }
}

/// Install the global subscriber. Safe to call more than once; later calls are
/// ignored.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .without_time();

    let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(default_directive(0), "impact_scope=warn");
        assert_eq!(default_directive(1), "impact_scope=info");
        assert_eq!(default_directive(5), "impact_scope=debug");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(0);
        init(2);
    }
}
