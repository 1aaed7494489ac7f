//! Structured reporting for request lifecycle milestones.

use oneshot_engine::{EngineError, EngineParams};

use crate::dispatch::DispatchError;

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Observer for the single-request lifecycle.
pub(crate) trait LifecycleReporter {
    /// Invoked before the engine loads its model.
    fn engine_loading(&self, params: &EngineParams);

    /// Invoked when the engine fails to load.
    fn engine_load_failed(&self, error: &EngineError);

    /// Invoked once the processing loop accepts work.
    fn engine_ready(&self);

    /// Invoked before the request is handed to the dispatcher.
    fn request_dispatched(&self, operation: &str);

    /// Invoked when the operation cannot be routed.
    fn dispatch_failed(&self, error: &DispatchError);

    /// Invoked after the response has been emitted.
    fn response_emitted(&self, success: bool);

    /// Invoked when the processing loop thread panicked.
    fn worker_panicked(&self);

    /// Invoked after the worker has been joined.
    fn shutdown_complete(&self);
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct StructuredLifecycleReporter;

impl LifecycleReporter for StructuredLifecycleReporter {
    fn engine_loading(&self, params: &EngineParams) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "engine_loading",
            model = ?params.model,
            ctx_size = params.ctx_size,
            parallel = params.parallel,
            embedding = params.embedding,
            "loading model"
        );
    }

    fn engine_load_failed(&self, error: &EngineError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "engine_load_failed",
            error = %error,
            "engine failed to load"
        );
    }

    fn engine_ready(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "engine_ready",
            "processing loop ready"
        );
    }

    fn request_dispatched(&self, operation: &str) {
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            event = "request_dispatched",
            operation,
            "dispatching request"
        );
    }

    fn dispatch_failed(&self, error: &DispatchError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "dispatch_failed",
            error = %error,
            "request could not be routed"
        );
    }

    fn response_emitted(&self, success: bool) {
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            event = "response_emitted",
            success,
            "response emitted"
        );
    }

    fn worker_panicked(&self) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "worker_panicked",
            "processing loop thread panicked"
        );
    }

    fn shutdown_complete(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "shutdown_complete",
            "engine stopped"
        );
    }
}
