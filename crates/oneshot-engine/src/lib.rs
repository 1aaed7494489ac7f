//! Serving-engine boundary for the `oneshot` CLI.
//!
//! The crate defines what the request orchestrator needs from an engine:
//! canonical [`Route`]s, the single [`RouteRequest`] handed to a handler, the
//! buffered-or-streaming [`RouteResponse`], the shared [`ShutdownToken`], and
//! the [`ServingEngine`]/[`RouteHandlers`] traits. [`EngineParams`] parses the
//! generic serving flags forwarded by the CLI. [`LocalEngine`] is the bundled
//! deterministic reference engine.

mod engine;
mod errors;
mod local;
mod params;
mod response;
mod route;
mod shutdown;

pub use engine::{HandlerResult, RouteHandlers, ServingEngine};
pub use errors::{EngineError, HandlerError};
pub use local::LocalEngine;
pub use params::{AUTO_PARALLEL, EngineParams};
pub use response::{
    ChunkSource, ChunkStream, ErrorType, RouteResponse, STATUS_HANDLER_FAILURE, STATUS_OK,
    STATUS_UNAVAILABLE, error_body,
};
pub use route::{Route, RouteRequest, UnsupportedRoute};
pub use shutdown::ShutdownToken;
