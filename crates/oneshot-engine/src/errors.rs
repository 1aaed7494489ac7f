//! Errors raised by the engine boundary.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::response::ErrorType;

/// Failures while loading or configuring the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No model path was supplied.
    #[error("model path is required (use -m/--model)")]
    MissingModel,
    /// The model file could not be read.
    #[error("failed to read model '{path}': {source}")]
    ModelRead {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The model file contained no data.
    #[error("model file '{path}' is empty")]
    EmptyModel {
        /// Path that was requested.
        path: PathBuf,
    },
    /// A parameter value is outside its accepted range.
    #[error("invalid value for {name}: {message}")]
    InvalidParameter {
        /// Flag name.
        name: &'static str,
        /// Explanation of the accepted range.
        message: String,
    },
}

impl EngineError {
    /// Creates an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

/// Failures raised while a route handler serves a request.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The body was not valid JSON for the route.
    #[error("malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),
    /// The body was valid JSON but semantically unusable.
    #[error("{message}")]
    InvalidRequest {
        /// Human-readable explanation.
        message: String,
    },
    /// The engine was started without the capability the route needs.
    #[error("{message}")]
    NotSupported {
        /// Human-readable explanation.
        message: String,
    },
    /// The engine cannot serve yet (not loaded or loop stopped).
    #[error("{message}")]
    Unavailable {
        /// Human-readable explanation.
        message: String,
    },
    /// Unexpected engine failure.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable explanation.
        message: String,
    },
}

impl HandlerError {
    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a not-supported error.
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Tag used in the structured error payload.
    #[must_use]
    pub const fn error_type(&self) -> ErrorType {
        match self {
            Self::MalformedBody(_) | Self::InvalidRequest { .. } => ErrorType::InvalidRequest,
            Self::NotSupported { .. } => ErrorType::NotSupported,
            Self::Unavailable { .. } => ErrorType::Unavailable,
            Self::Internal { .. } => ErrorType::Server,
        }
    }
}
