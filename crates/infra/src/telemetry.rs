//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over the configured level so operators can
//! raise verbosity for one run without touching configuration. The execution
//! summary is logged under `changecast::summary`; filter on that target to
//! keep only the per-run report.

use changecast_domain::{ChangecastError, LoggingSettings, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// Returns `Ok(false)` when a subscriber was already installed, e.g. by a
/// test harness or an earlier call.
///
/// # Errors
/// Returns `ChangecastError::Config` when the configured level is not a
/// valid filter directive.
pub fn init_tracing(settings: &LoggingSettings) -> Result<bool> {
    let filter = build_filter(settings)?;

    let installed = if settings.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).flatten_event(true))
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init()
            .is_ok()
    };

    if installed {
        tracing::debug!(level = %settings.level, json = settings.json, "Logging initialized");
    }
    Ok(installed)
}

fn build_filter(settings: &LoggingSettings) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&settings.level).map_err(|e| {
        ChangecastError::Config(format!("logging.level: invalid filter '{}': {e}", settings.level))
    })
}
