//! Logging initialization and configuration.

use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter used when neither `RUST_LOG` nor the config provides one.
pub const DEFAULT_LOG_FILTER: &str = "info,frameflight_renderer=debug";

/// Initialize the logging system with tracing.
///
/// `RUST_LOG` takes precedence over `filter`. Calling this twice is harmless;
/// the second global subscriber install is ignored.
///
/// Returns `true` if this call installed the subscriber.
///
/// # Example
/// ```
/// frameflight_core::init_logging(frameflight_core::DEFAULT_LOG_FILTER);
/// tracing::info!("Pipeline initialized");
/// ```
pub fn init_logging(filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let directives = filter.to_string();

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init()
        .is_ok();
    if installed {
        debug!("Logging initialized with filter '{}'", directives);
    }
    installed
}
