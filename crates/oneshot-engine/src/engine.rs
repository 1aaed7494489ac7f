//! Contracts between the request orchestrator and a serving engine.

use crate::errors::{EngineError, HandlerError};
use crate::params::EngineParams;
use crate::response::RouteResponse;
use crate::route::RouteRequest;
use crate::shutdown::ShutdownToken;

/// Result type returned by route handlers.
pub type HandlerResult = Result<RouteResponse, HandlerError>;

/// One handler per canonical route.
///
/// Handlers are invoked synchronously from the main thread. Whether the
/// returned response is buffered or streaming is the handler's decision.
pub trait RouteHandlers {
    /// `chat`: OpenAI-style chat completion.
    fn post_chat_completions(&self, request: &RouteRequest) -> HandlerResult;
    /// `completion`: raw prompt completion.
    fn post_completions(&self, request: &RouteRequest) -> HandlerResult;
    /// `embedding`: embedding vectors.
    fn post_embeddings(&self, request: &RouteRequest) -> HandlerResult;
    /// `rerank`: document relevance scores.
    fn post_rerank(&self, request: &RouteRequest) -> HandlerResult;
    /// `tokenize`: text to token ids.
    fn post_tokenize(&self, request: &RouteRequest) -> HandlerResult;
    /// `detokenize`: token ids to text.
    fn post_detokenize(&self, request: &RouteRequest) -> HandlerResult;
    /// `apply-template`: chat template rendering.
    fn post_apply_template(&self, request: &RouteRequest) -> HandlerResult;
    /// `props`: engine and model properties.
    fn get_props(&self, request: &RouteRequest) -> HandlerResult;
    /// `health`: liveness probe.
    fn get_health(&self, request: &RouteRequest) -> HandlerResult;
}

/// Lifecycle surface of a serving engine.
///
/// The orchestrator calls [`load`](Self::load) and [`init`](Self::init) on
/// the main thread, runs [`run_loop`](Self::run_loop) on a dedicated worker
/// thread, and waits on [`wait_ready`](Self::wait_ready) before submitting
/// its single request. [`terminate`](Self::terminate) must make `run_loop`
/// return promptly.
pub trait ServingEngine: RouteHandlers + Send + Sync {
    /// Loads the model described by `params`.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when the model cannot be loaded.
    fn load(&mut self, params: &EngineParams) -> Result<(), EngineError>;

    /// Prepares internal queues once the model is loaded.
    fn init(&mut self);

    /// Serves queued work until terminated or `shutdown` is triggered.
    fn run_loop(&self, shutdown: &ShutdownToken);

    /// Blocks until `run_loop` accepts work, or has already exited.
    fn wait_ready(&self);

    /// Requests loop termination without blocking.
    fn terminate(&self);
}
