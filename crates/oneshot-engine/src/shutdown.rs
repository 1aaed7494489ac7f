//! Cooperative cancellation shared between signal delivery, the response
//! emitter, and the engine loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Handle to the process-wide shutdown flag.
///
/// Clones share one atomic cell. Once triggered the flag never clears.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Creates an untriggered token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Repeated calls have no further effect.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Exposes the underlying cell for registration with signal handlers.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}
