//! Test doubles for the CLI runtime.
//!
//! Supplies a scripted serving engine that journals every lifecycle call,
//! recording route handlers and reporters, and scripted stream sources so
//! unit tests can assert ordering without a real model.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use oneshot_config::Config;
use oneshot_engine::{
    ChunkSource, EngineError, EngineParams, HandlerError, HandlerResult, RouteHandlers,
    RouteRequest, RouteResponse, ServingEngine, ShutdownToken,
};
use serde_json::json;

use crate::config::ConfigLoader;
use crate::dispatch::DispatchError;
use crate::errors::AppError;
use crate::health::LifecycleReporter;

/// Shared, ordered log of engine calls.
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal {
    events: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub(crate) fn record(&self, event: impl Into<String>) {
        self.events.lock().expect("journal lock").push(event.into());
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().expect("journal lock").clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadBehaviour {
    Succeed,
    Fail,
}

type ResponseFactory = Box<dyn Fn() -> RouteResponse + Send + Sync>;

/// Serving engine that answers every route with a scripted response.
pub(crate) struct FakeEngine {
    load: LoadBehaviour,
    journal: Journal,
    bodies: Journal,
    respond: ResponseFactory,
    ready: Mutex<bool>,
    ready_signal: Condvar,
    terminated: AtomicBool,
}

impl FakeEngine {
    pub(crate) fn new(load: LoadBehaviour) -> Self {
        Self {
            load,
            journal: Journal::default(),
            bodies: Journal::default(),
            respond: Box::new(|| RouteResponse::json(&json!({"status": "ok"}))),
            ready: Mutex::new(false),
            ready_signal: Condvar::new(),
            terminated: AtomicBool::new(false),
        }
    }

    pub(crate) fn with_response(
        mut self,
        respond: impl Fn() -> RouteResponse + Send + Sync + 'static,
    ) -> Self {
        self.respond = Box::new(respond);
        self
    }

    pub(crate) fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Bodies of every request that reached a handler.
    pub(crate) fn bodies(&self) -> Journal {
        self.bodies.clone()
    }

    fn answer(&self, handler: &str, request: &RouteRequest) -> HandlerResult {
        self.journal.record(handler);
        self.bodies.record(request.body());
        Ok((self.respond)())
    }
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        self.journal.record("drop");
    }
}

impl RouteHandlers for FakeEngine {
    fn post_chat_completions(&self, request: &RouteRequest) -> HandlerResult {
        self.answer("post_chat_completions", request)
    }

    fn post_completions(&self, request: &RouteRequest) -> HandlerResult {
        self.answer("post_completions", request)
    }

    fn post_embeddings(&self, request: &RouteRequest) -> HandlerResult {
        self.answer("post_embeddings", request)
    }

    fn post_rerank(&self, request: &RouteRequest) -> HandlerResult {
        self.answer("post_rerank", request)
    }

    fn post_tokenize(&self, request: &RouteRequest) -> HandlerResult {
        self.answer("post_tokenize", request)
    }

    fn post_detokenize(&self, request: &RouteRequest) -> HandlerResult {
        self.answer("post_detokenize", request)
    }

    fn post_apply_template(&self, request: &RouteRequest) -> HandlerResult {
        self.answer("post_apply_template", request)
    }

    fn get_props(&self, request: &RouteRequest) -> HandlerResult {
        self.answer("get_props", request)
    }

    fn get_health(&self, request: &RouteRequest) -> HandlerResult {
        self.answer("get_health", request)
    }
}

impl ServingEngine for FakeEngine {
    fn load(&mut self, _params: &EngineParams) -> Result<(), EngineError> {
        self.journal.record("load");
        match self.load {
            LoadBehaviour::Succeed => Ok(()),
            LoadBehaviour::Fail => Err(EngineError::EmptyModel {
                path: PathBuf::from("fake.gguf"),
            }),
        }
    }

    fn init(&mut self) {
        self.journal.record("init");
    }

    fn run_loop(&self, _shutdown: &ShutdownToken) {
        self.journal.record("run_loop:start");
        *self.ready.lock().expect("ready lock") = true;
        self.ready_signal.notify_all();
        // Only `terminate` ends the loop so the journal order is deterministic.
        while !self.terminated.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(5));
        }
        self.journal.record("run_loop:stop");
    }

    fn wait_ready(&self) {
        let mut ready = self.ready.lock().expect("ready lock");
        while !*ready {
            ready = self.ready_signal.wait(ready).expect("ready wait");
        }
        self.journal.record("wait_ready");
    }

    fn terminate(&self) {
        self.journal.record("terminate");
        self.terminated.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandlerBehaviour {
    Succeed,
    Fail,
    Panic,
}

/// Route handlers that record each call and its body.
pub(crate) struct RecordingHandlers {
    behaviour: HandlerBehaviour,
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingHandlers {
    pub(crate) fn new(behaviour: HandlerBehaviour) -> Self {
        Self {
            behaviour,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub(crate) fn bodies(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }

    fn handle(&self, name: &str, request: &RouteRequest) -> HandlerResult {
        self.calls
            .lock()
            .expect("calls lock")
            .push((name.to_owned(), request.body().to_owned()));
        match self.behaviour {
            HandlerBehaviour::Succeed => Ok(RouteResponse::json(&json!({"handler": name}))),
            HandlerBehaviour::Fail => Err(HandlerError::invalid_request("scripted failure")),
            HandlerBehaviour::Panic => panic!("scripted panic"),
        }
    }
}

impl RouteHandlers for RecordingHandlers {
    fn post_chat_completions(&self, request: &RouteRequest) -> HandlerResult {
        self.handle("post_chat_completions", request)
    }

    fn post_completions(&self, request: &RouteRequest) -> HandlerResult {
        self.handle("post_completions", request)
    }

    fn post_embeddings(&self, request: &RouteRequest) -> HandlerResult {
        self.handle("post_embeddings", request)
    }

    fn post_rerank(&self, request: &RouteRequest) -> HandlerResult {
        self.handle("post_rerank", request)
    }

    fn post_tokenize(&self, request: &RouteRequest) -> HandlerResult {
        self.handle("post_tokenize", request)
    }

    fn post_detokenize(&self, request: &RouteRequest) -> HandlerResult {
        self.handle("post_detokenize", request)
    }

    fn post_apply_template(&self, request: &RouteRequest) -> HandlerResult {
        self.handle("post_apply_template", request)
    }

    fn get_props(&self, request: &RouteRequest) -> HandlerResult {
        self.handle("get_props", request)
    }

    fn get_health(&self, request: &RouteRequest) -> HandlerResult {
        self.handle("get_health", request)
    }
}

/// Reporter that keeps event names in call order.
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    events: Mutex<Vec<&'static str>>,
}

impl RecordingReporter {
    pub(crate) fn events(&self) -> Vec<&'static str> {
        self.events.lock().expect("events lock").clone()
    }

    fn push(&self, event: &'static str) {
        self.events.lock().expect("events lock").push(event);
    }
}

impl LifecycleReporter for RecordingReporter {
    fn engine_loading(&self, _params: &EngineParams) {
        self.push("engine_loading");
    }

    fn engine_load_failed(&self, _error: &EngineError) {
        self.push("engine_load_failed");
    }

    fn engine_ready(&self) {
        self.push("engine_ready");
    }

    fn request_dispatched(&self, _operation: &str) {
        self.push("request_dispatched");
    }

    fn dispatch_failed(&self, _error: &DispatchError) {
        self.push("dispatch_failed");
    }

    fn response_emitted(&self, _success: bool) {
        self.push("response_emitted");
    }

    fn worker_panicked(&self) {
        self.push("worker_panicked");
    }

    fn shutdown_complete(&self) {
        self.push("shutdown_complete");
    }
}

/// Chunk source that can trigger shutdown after a number of chunks.
pub(crate) struct ScriptedChunks {
    chunks: VecDeque<String>,
    status: u16,
    delivered: usize,
    trigger: Option<(usize, ShutdownToken)>,
}

impl ScriptedChunks {
    pub(crate) fn new(chunks: &[&str], status: u16) -> Self {
        Self {
            chunks: chunks.iter().map(|chunk| (*chunk).to_owned()).collect(),
            status,
            delivered: 0,
            trigger: None,
        }
    }

    pub(crate) fn trigger_after(mut self, delivered: usize, shutdown: &ShutdownToken) -> Self {
        self.trigger = Some((delivered, shutdown.clone()));
        self
    }
}

impl ChunkSource for ScriptedChunks {
    fn next_chunk(&mut self) -> Option<String> {
        let chunk = self.chunks.pop_front()?;
        self.delivered += 1;
        if let Some((after, shutdown)) = &self.trigger {
            if self.delivered >= *after {
                shutdown.trigger();
            }
        }
        Some(chunk)
    }

    fn status(&self) -> u16 {
        self.status
    }
}

/// Writer whose every operation fails.
pub(crate) struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }
}

/// Loader that ignores arguments and returns a fixed configuration.
pub(crate) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(crate) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}
