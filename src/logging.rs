//! Logging setup and the observability sink for non-fatal pipeline failures.

use std::error::Error;
use tracing_subscriber::EnvFilter;

/// Receives non-fatal pipeline failures.
///
/// Per-frame failures never propagate to the caller of
/// [`StreamController::process_incoming_frame`](crate::StreamController::process_incoming_frame);
/// they are counted and reported here instead.
pub trait ObservabilitySink: Send + Sync + 'static {
    fn report(&self, message: &str, error: Option<&(dyn Error + 'static)>);
}

/// Sink that forwards reports to `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ObservabilitySink for TracingSink {
    fn report(&self, message: &str, error: Option<&(dyn Error + 'static)>) {
        match error {
            Some(err) => tracing::error!(error = %err, "{}", message),
            None => tracing::error!("{}", message),
        }
    }
}

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (for example `"dronestream=info"`).
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok()
}
