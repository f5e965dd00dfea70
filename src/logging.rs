//! Tracing initialization

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "ECOPROXY_LOG";

/// Filter used when [`LOG_ENV`] is unset or invalid
pub const DEFAULT_FILTER: &str = "ecoproxy=info";

static INIT: Once = Once::new();

/// Install a `fmt` subscriber filtered by `ECOPROXY_LOG`.
///
/// Format: `ECOPROXY_LOG=ecoproxy::assumptions=debug,ecoproxy=warn`.
/// Calling it more than once is a no-op, and an already installed global
/// subscriber is left in place.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let installed = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .try_init();
        if installed.is_err() {
            tracing::debug!("global subscriber already set, keeping it");
        }
    });
}
