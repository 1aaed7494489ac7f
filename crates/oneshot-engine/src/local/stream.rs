//! Server-sent-event framing for streamed generation.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use serde_json::{Value, json};

use super::generate::{GenerationEvent, GenerationSummary};
use crate::response::{
    ChunkSource, ErrorType, STATUS_HANDLER_FAILURE, STATUS_OK, error_body,
};
use crate::shutdown::ShutdownToken;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Chunk layout for a streamed route.
#[derive(Debug, Clone)]
pub(crate) enum Framing {
    /// OpenAI `chat.completion.chunk` events followed by `[DONE]`.
    Chat {
        id: String,
        model: String,
        created: u64,
    },
    /// Native `{content, stop}` events.
    Completion { model: String },
}

impl Framing {
    fn opening(&self) -> Option<Value> {
        match self {
            Self::Chat { .. } => {
                Some(self.chat_chunk(&json!({"role": "assistant", "content": ""}), None))
            }
            Self::Completion { .. } => None,
        }
    }

    fn piece(&self, piece: &str) -> Value {
        match self {
            Self::Chat { .. } => self.chat_chunk(&json!({"content": piece}), None),
            Self::Completion { .. } => json!({"content": piece, "stop": false}),
        }
    }

    fn closing(&self, summary: &GenerationSummary) -> Vec<String> {
        match self {
            Self::Chat { .. } => {
                let mut chunk = self.chat_chunk(&json!({}), Some(summary.finish.as_str()));
                chunk["usage"] = usage(summary);
                vec![sse(&chunk), "data: [DONE]\n\n".to_owned()]
            }
            Self::Completion { model } => {
                let chunk = json!({
                    "content": "",
                    "stop": true,
                    "model": model,
                    "stop_type": summary.finish.stop_type(),
                    "tokens_predicted": summary.completion_tokens,
                    "tokens_evaluated": summary.prompt_tokens,
                });
                vec![sse(&chunk)]
            }
        }
    }

    fn chat_chunk(&self, delta: &Value, finish_reason: Option<&str>) -> Value {
        let (id, model, created) = match self {
            Self::Chat { id, model, created } => (id.as_str(), model.as_str(), *created),
            Self::Completion { model } => ("", model.as_str(), 0),
        };
        json!({
            "id": id,
            "object": "chat.completion.chunk",
            "created": created,
            "model": model,
            "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}],
        })
    }
}

pub(crate) fn usage(summary: &GenerationSummary) -> Value {
    json!({
        "prompt_tokens": summary.prompt_tokens,
        "completion_tokens": summary.completion_tokens,
        "total_tokens": summary.prompt_tokens + summary.completion_tokens,
    })
}

fn sse(value: &Value) -> String {
    format!("data: {value}\n\n")
}

/// Lazily converts generation events into SSE chunks.
pub(crate) struct GenerationStream {
    events: Receiver<GenerationEvent>,
    cancel: ShutdownToken,
    framing: Framing,
    pending: VecDeque<String>,
    finished: bool,
    status: u16,
}

impl GenerationStream {
    pub(crate) fn new(
        events: Receiver<GenerationEvent>,
        cancel: ShutdownToken,
        framing: Framing,
    ) -> Self {
        let pending = framing.opening().iter().map(sse).collect();
        Self {
            events,
            cancel,
            framing,
            pending,
            finished: false,
            status: STATUS_OK,
        }
    }

    fn fail(&mut self, message: &str) -> Option<String> {
        self.finished = true;
        self.status = STATUS_HANDLER_FAILURE;
        Some(sse(&error_body(
            STATUS_HANDLER_FAILURE,
            message,
            ErrorType::Server,
        )))
    }
}

impl ChunkSource for GenerationStream {
    fn next_chunk(&mut self) -> Option<String> {
        if let Some(chunk) = self.pending.pop_front() {
            return Some(chunk);
        }
        if self.finished {
            return None;
        }
        loop {
            if self.cancel.is_triggered() {
                self.finished = true;
                return None;
            }
            match self.events.recv_timeout(POLL_INTERVAL) {
                Ok(GenerationEvent::Piece(piece)) => return Some(sse(&self.framing.piece(&piece))),
                Ok(GenerationEvent::Done(summary)) => {
                    self.finished = true;
                    if summary.cancelled {
                        return None;
                    }
                    self.pending.extend(self.framing.closing(&summary));
                    return self.pending.pop_front();
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return self.fail("generation ended before completion");
                }
            }
        }
    }

    fn status(&self) -> u16 {
        self.status
    }
}
