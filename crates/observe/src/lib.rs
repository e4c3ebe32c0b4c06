//! Logging initialization shared by binaries and tests.

use {std::sync::Once, tracing_subscriber::EnvFilter};

/// Initializes the tracing subscriber. `env_filter` uses the
/// `tracing_subscriber::EnvFilter` syntax, e.g. `"info,auction=debug"`.
pub fn initialize(env_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_writer(std::io::stderr)
        .init();
}

/// Like [`initialize`], but can be called multiple times in a row. Later
/// calls are ignored.
///
/// Useful for tests, where every `#[test]` may race to set the global
/// subscriber.
pub fn initialize_reentrant(env_filter: &str) {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(env_filter))
            .with_writer(std::io::stderr)
            .try_init();
    });
}
