//! Tracing subscriber setup for applications embedding a session
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the binary (or test) that owns the process.

use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g.
/// `"tickline_state=debug,info"`) is used. `json` switches to one JSON
/// object per event.
pub fn init_tracing(default_directive: &str, json: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    }
}

/// Subscriber for tests: output captured per test, repeated calls ignored
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}
