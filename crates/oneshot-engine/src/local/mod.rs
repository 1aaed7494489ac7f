//! Deterministic in-process reference engine.
//!
//! `LocalEngine` treats the model file as opaque bytes: it fingerprints them
//! to seed embeddings and answers generation requests by echoing the last
//! user turn. Every route is served, which makes the binary usable end to end
//! without a native runtime.

mod embed;
mod generate;
mod handlers;
mod model;
mod payloads;
mod queue;
mod stream;
mod template;
mod tokenizer;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use tracing::{debug, info, warn};

use self::embed::embed;
use self::generate::run_generation;
use self::model::LoadedModel;
use self::queue::{Readiness, Task, TaskQueue};
use self::tokenizer::ByteTokenizer;
use crate::engine::ServingEngine;
use crate::errors::EngineError;
use crate::params::EngineParams;
use crate::shutdown::ShutdownToken;

const ENGINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::local");

/// Interval at which the loop re-checks its stop conditions while idle.
pub(crate) const LOOP_POLL: Duration = Duration::from_millis(50);

/// Reference engine bundled with the CLI.
#[derive(Default)]
pub struct LocalEngine {
    params: EngineParams,
    model: Option<LoadedModel>,
    queue: Option<TaskQueue>,
    readiness: Readiness,
    terminated: AtomicBool,
    requests: AtomicU64,
    tokenizer: ByteTokenizer,
}

impl LocalEngine {
    /// Creates an engine with no model loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once a model has been loaded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    fn halted(&self, shutdown: &ShutdownToken) -> bool {
        self.terminated.load(Ordering::SeqCst) || shutdown.is_triggered()
    }

    fn embedding_seed(&self) -> u64 {
        self.model
            .as_ref()
            .map_or(self.params.seed, |model| model.seed)
    }

    fn process(&self, task: Task, shutdown: &ShutdownToken) {
        match task {
            Task::Generate { job, events } => {
                debug!(target: ENGINE_TARGET, prompt_tokens = job.prompt_tokens, "generating");
                run_generation(&job, &events, self.tokenizer, || self.halted(shutdown));
            }
            Task::Embed { inputs, reply } => {
                debug!(target: ENGINE_TARGET, inputs = inputs.len(), "embedding");
                let seed = self.embedding_seed();
                let vectors = inputs
                    .iter()
                    .map(|tokens| embed(tokens, self.params.embd_dim, seed))
                    .collect();
                let _ = reply.send(vectors);
            }
        }
    }
}

impl ServingEngine for LocalEngine {
    fn load(&mut self, params: &EngineParams) -> Result<(), EngineError> {
        let path = params.model_path()?;
        params.validate()?;
        let model = LoadedModel::load(path, params.seed)?;
        info!(
            target: ENGINE_TARGET,
            path = %model.path.display(),
            size_bytes = model.size_bytes,
            fingerprint = model.short_fingerprint(),
            "model loaded"
        );
        self.params = params.clone();
        self.model = Some(model);
        Ok(())
    }

    fn init(&mut self) {
        if self.queue.is_none() {
            self.queue = Some(TaskQueue::new());
        }
        debug!(
            target: ENGINE_TARGET,
            slots = self.params.parallel,
            kv_unified = self.params.kv_unified,
            "engine initialised"
        );
    }

    fn run_loop(&self, shutdown: &ShutdownToken) {
        let receiver = self.queue.as_ref().and_then(TaskQueue::take_receiver);
        self.readiness.mark();
        let Some(receiver) = receiver else {
            warn!(target: ENGINE_TARGET, "processing loop has no task queue; call init once before run_loop");
            return;
        };
        info!(target: ENGINE_TARGET, "processing loop started");
        while !self.halted(shutdown) {
            match receiver.recv_timeout(LOOP_POLL) {
                Ok(task) => self.process(task, shutdown),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!(target: ENGINE_TARGET, "processing loop stopped");
    }

    fn wait_ready(&self) {
        self.readiness.wait();
    }

    fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }
}
