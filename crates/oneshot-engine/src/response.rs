//! Responses produced by route handlers.
//!
//! A response is either buffered, with status and payload known up front, or
//! streaming, where chunks are produced lazily and the terminal status is
//! only final once the stream is drained.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};
use strum::{Display, IntoStaticStr};

/// HTTP-style status for a successful response.
pub const STATUS_OK: u16 = 200;
/// Status attached to failures raised while a handler runs.
pub const STATUS_HANDLER_FAILURE: u16 = 500;
/// Status reported while the model is not loaded.
pub const STATUS_UNAVAILABLE: u16 = 503;

/// Machine-readable tag carried in error payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
#[serde(into = "&'static str")]
pub enum ErrorType {
    /// The request body was malformed or semantically invalid.
    #[strum(serialize = "invalid_request_error")]
    InvalidRequest,
    /// The engine failed while serving a valid request.
    #[strum(serialize = "server_error")]
    Server,
    /// The engine was started without support for the operation.
    #[strum(serialize = "not_supported_error")]
    NotSupported,
    /// The engine is not ready to serve.
    #[strum(serialize = "unavailable_error")]
    Unavailable,
}

impl ErrorType {
    /// Returns the wire tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Builds the `{"error":{"code","message","type"}}` payload.
#[must_use]
pub fn error_body(status: u16, message: &str, kind: ErrorType) -> Value {
    json!({
        "error": {
            "code": status,
            "message": message,
            "type": kind.as_str(),
        }
    })
}

/// Lazily produced sequence of output chunks.
pub trait ChunkSource: Send {
    /// Blocks until the next chunk is available; `None` ends the stream.
    fn next_chunk(&mut self) -> Option<String>;

    /// Status of the stream. Final only after `next_chunk` returned `None`.
    fn status(&self) -> u16;
}

/// Owned streaming body.
pub struct ChunkStream {
    source: Box<dyn ChunkSource>,
}

impl ChunkStream {
    /// Wraps a chunk source.
    pub fn new(source: impl ChunkSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Stream over chunks that are already materialised.
    #[must_use]
    pub fn from_chunks<I>(chunks: I, status: u16) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self::new(ReadyChunks {
            chunks: chunks.into_iter().collect(),
            status,
        })
    }

    /// Pulls the next chunk from the source.
    pub fn next_chunk(&mut self) -> Option<String> {
        self.source.next_chunk()
    }

    /// Current status of the source.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.source.status()
    }
}

impl fmt::Debug for ChunkStream {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ChunkStream")
            .field("status", &self.source.status())
            .finish_non_exhaustive()
    }
}

struct ReadyChunks {
    chunks: VecDeque<String>,
    status: u16,
}

impl ChunkSource for ReadyChunks {
    fn next_chunk(&mut self) -> Option<String> {
        self.chunks.pop_front()
    }

    fn status(&self) -> u16 {
        self.status
    }
}

/// Result of running one route handler.
#[derive(Debug)]
pub enum RouteResponse {
    /// Entire payload and status known before any output is written.
    Buffered {
        /// HTTP-style status code.
        status: u16,
        /// Response body.
        payload: String,
    },
    /// Chunks produced incrementally.
    Streaming(ChunkStream),
}

impl RouteResponse {
    /// Buffered response with an arbitrary status.
    #[must_use]
    pub fn buffered(status: u16, payload: impl Into<String>) -> Self {
        Self::Buffered {
            status,
            payload: payload.into(),
        }
    }

    /// Buffered `200` response carrying a JSON value.
    #[must_use]
    pub fn json(value: &Value) -> Self {
        Self::buffered(STATUS_OK, value.to_string())
    }

    /// Buffered error response with the structured error payload.
    #[must_use]
    pub fn error(status: u16, message: &str, kind: ErrorType) -> Self {
        Self::buffered(status, error_body(status, message, kind).to_string())
    }

    /// Streaming response over the given source.
    pub fn streaming(source: impl ChunkSource + 'static) -> Self {
        Self::Streaming(ChunkStream::new(source))
    }
}
