//! Task hand-off between request handlers and the processing loop.

use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::{Condvar, Mutex, PoisonError};

use super::generate::{GenerationEvent, GenerationJob};
use crate::errors::HandlerError;

/// Work submitted to the processing loop.
pub(crate) enum Task {
    /// Produce pieces incrementally on `events`.
    Generate {
        job: GenerationJob,
        events: Sender<GenerationEvent>,
    },
    /// Embed each token sequence; the loop replies exactly once.
    Embed {
        inputs: Vec<Vec<u32>>,
        reply: SyncSender<Vec<Vec<f32>>>,
    },
}

/// Multi-producer queue whose receiver is claimed by the processing loop.
pub(crate) struct TaskQueue {
    sender: Sender<Task>,
    receiver: Mutex<Option<Receiver<Task>>>,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    pub(crate) fn submit(&self, task: Task) -> Result<(), HandlerError> {
        self.sender
            .send(task)
            .map_err(|_| HandlerError::unavailable("engine loop is not running"))
    }

    /// Hands the receiver to the loop; `None` once already claimed.
    pub(crate) fn take_receiver(&self) -> Option<Receiver<Task>> {
        self.receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// One-shot latch recording that the processing loop is accepting work.
#[derive(Default)]
pub(crate) struct Readiness {
    ready: Mutex<bool>,
    signal: Condvar,
}

impl Readiness {
    pub(crate) fn mark(&self) {
        let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        *ready = true;
        self.signal.notify_all();
    }

    pub(crate) fn wait(&self) {
        let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        while !*ready {
            ready = self
                .signal
                .wait(ready)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        *self.ready.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
