//! Error types for the CLI runtime.

use std::sync::Arc;

use oneshot_engine::EngineError;
use thiserror::Error;

use crate::options::OptionsError;
use crate::payload::PayloadError;
use crate::signals::SignalError;
use crate::telemetry::TelemetryError;

/// Failures that end the run before a request is dispatched.
#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Options(#[from] OptionsError),
    #[error("{0}")]
    EngineArguments(clap::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Signals(#[from] SignalError),
}

impl AppError {
    /// Argument errors are followed by the operation-layer usage text.
    pub(crate) const fn shows_usage(&self) -> bool {
        matches!(
            self,
            Self::Options(_)
                | Self::Engine(EngineError::MissingModel | EngineError::InvalidParameter { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_errors_show_usage() {
        let error = AppError::from(OptionsError::MissingValue {
            flag: "--text".to_owned(),
        });
        assert!(error.shows_usage());
        assert!(AppError::from(EngineError::MissingModel).shows_usage());
    }

    #[test]
    fn payload_errors_do_not_show_usage() {
        let error = AppError::from(PayloadError::MissingDocuments);
        assert!(!error.shows_usage());
        assert_eq!(
            error.to_string(),
            "rerank requires at least one --document or --documents-file line"
        );
    }
}
