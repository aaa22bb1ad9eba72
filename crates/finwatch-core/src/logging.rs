//! Tracing setup shared by the function binaries.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "finwatch_core=info,finwatch_clients=info,warn";

/// Installs a JSON `fmt` subscriber filtered by `RUST_LOG`.
///
/// Output goes to stdout without ANSI colours or timestamps; the function
/// runtime's log capture adds both. Calling this more than once is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .without_time()
                .with_target(false)
                .with_current_span(false),
        )
        .try_init();
}
