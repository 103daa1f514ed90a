//! Tracing bootstrap.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::constants::DEFAULT_LOG_FILTER;

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into())
}

/// Install the global subscriber: `RUST_LOG` filter (default `info`) plus fmt output.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_tracing() -> bool {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_LOG_FILTER))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

/// Subscriber for tests: output goes through the test harness capture.
pub fn init_test_tracing() -> bool {
    tracing_subscriber::registry()
        .with(env_filter("debug"))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_is_refused() {
        // whichever call wins, a global subscriber is in place afterwards
        let _ = init_tracing();
        assert!(!init_tracing());
        assert!(!init_test_tracing());
    }
}
