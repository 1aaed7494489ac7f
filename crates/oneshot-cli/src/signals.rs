//! Termination signal registration.

use std::io;

use oneshot_engine::ShutdownToken;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use thiserror::Error;

/// Errors reported while installing signal handlers.
#[derive(Debug, Error)]
#[error("failed to install signal handlers: {source}")]
pub(crate) struct SignalError {
    #[source]
    source: io::Error,
}

/// Routes SIGINT and SIGTERM to `shutdown`.
///
/// Delivery only sets the flag; repeated signals have no further effect.
pub(crate) fn install(shutdown: &ShutdownToken) -> Result<(), SignalError> {
    for signal in [SIGINT, SIGTERM] {
        flag::register(signal, shutdown.flag()).map_err(|source| SignalError { source })?;
    }
    Ok(())
}
