//! Tracing subscriber setup.
//!
//! Logs go to stderr so `--stdout` and `--json` output stays clean.
//! `RUST_LOG` takes precedence over the verbosity flag.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Map `-v` occurrences to a default level.
pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Build the subscriber used by the binary.
pub fn build_subscriber(verbose: u8) -> impl tracing::Subscriber + Send + Sync {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level_for_verbosity(verbose).into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(verbose: u8) {
    let _ = tracing::subscriber::set_global_default(build_subscriber(verbose));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for_verbosity(0), LevelFilter::WARN);
        assert_eq!(level_for_verbosity(1), LevelFilter::INFO);
        assert_eq!(level_for_verbosity(2), LevelFilter::DEBUG);
        assert_eq!(level_for_verbosity(9), LevelFilter::TRACE);
    }

    #[test]
    fn test_subscriber_scoped() {
        let subscriber = build_subscriber(2);
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("visible at debug");
        });
    }
}
