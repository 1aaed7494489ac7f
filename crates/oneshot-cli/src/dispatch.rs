//! Route dispatch.
//!
//! Resolves the canonical operation to a [`Route`] and invokes exactly one
//! handler. Handler failures, including panics, become buffered 500
//! responses here so the emitter always receives a response.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use oneshot_engine::{
    ErrorType, HandlerResult, Route, RouteHandlers, RouteRequest, RouteResponse,
    STATUS_HANDLER_FAILURE, ShutdownToken,
};
use thiserror::Error;
use tracing::{debug, error, warn};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub(crate) enum DispatchError {
    #[error("unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },
}

/// Builds the request for `operation` and runs its handler.
pub(crate) fn dispatch<H>(
    handlers: &H,
    operation: &str,
    body: String,
    shutdown: &ShutdownToken,
) -> Result<RouteResponse, DispatchError>
where
    H: RouteHandlers + ?Sized,
{
    let route: Route = operation
        .parse()
        .map_err(|_| DispatchError::UnsupportedOperation {
            operation: operation.to_owned(),
        })?;
    let request = RouteRequest::new(route, body, shutdown.clone());
    debug!(target: DISPATCH_TARGET, route = %route, "dispatching request");
    Ok(invoke(handlers, &request))
}

fn invoke<H>(handlers: &H, request: &RouteRequest) -> RouteResponse
where
    H: RouteHandlers + ?Sized,
{
    match panic::catch_unwind(AssertUnwindSafe(|| call_handler(handlers, request))) {
        Ok(Ok(response)) => response,
        Ok(Err(failure)) => {
            warn!(
                target: DISPATCH_TARGET,
                route = %request.route(),
                error = %failure,
                "handler failed"
            );
            RouteResponse::error(
                STATUS_HANDLER_FAILURE,
                &failure.to_string(),
                failure.error_type(),
            )
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(
                target: DISPATCH_TARGET,
                route = %request.route(),
                panic = %message,
                "handler panicked"
            );
            RouteResponse::error(STATUS_HANDLER_FAILURE, &message, ErrorType::Server)
        }
    }
}

fn call_handler<H>(handlers: &H, request: &RouteRequest) -> HandlerResult
where
    H: RouteHandlers + ?Sized,
{
    match request.route() {
        Route::Chat => handlers.post_chat_completions(request),
        Route::Completion => handlers.post_completions(request),
        Route::Embedding => handlers.post_embeddings(request),
        Route::Rerank => handlers.post_rerank(request),
        Route::Tokenize => handlers.post_tokenize(request),
        Route::Detokenize => handlers.post_detokenize(request),
        Route::ApplyTemplate => handlers.post_apply_template(request),
        Route::Props => handlers.get_props(request),
        Route::Health => handlers.get_health(request),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_owned())
}
