//! Logging setup for applications embedding this crate
//!
//! The library only emits `tracing` events. Installing a subscriber is left
//! to the application; these helpers install the usual `fmt` + `EnvFilter`
//! stack.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset. Keeps this crate and the SDK quiet.
pub const DEFAULT_FILTER: &str = "warn";

/// Install a global subscriber, reading `RUST_LOG` when set.
///
/// Returns an error if a global subscriber is already installed.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter())
        .try_init()
}

/// Like [`try_init`], ignoring an already-installed subscriber
pub fn init() {
    let _ = try_init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
