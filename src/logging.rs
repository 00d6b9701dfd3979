//! Logging initialization
//!
//! Structured logging via tracing-subscriber, honoring `RUST_LOG` when set
//! and falling back to the configured level otherwise.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for the embedding process.
///
/// Call once at startup, before any store or engine construction.
pub fn init(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("habitfuel_core={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
