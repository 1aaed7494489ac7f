//! Engine parameter parsing.
//!
//! Every flag the operation layer does not recognise is forwarded here. The
//! parser owns the generic serving knobs (model path, context size, slot
//! count) and the defaulting policy that depends on the selected route.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::warn;

use crate::errors::EngineError;
use crate::route::Route;

const PARAMS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::params");

/// Slot count applied when the caller leaves parallelism at its default.
pub const AUTO_PARALLEL: u32 = 4;

/// Generic serving parameters.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "oneshot",
    about = "Engine parameters accepted after the operation flags",
    disable_version_flag = true
)]
pub struct EngineParams {
    /// Path to the model file.
    #[arg(short = 'm', long = "model", value_name = "PATH")]
    pub model: Option<PathBuf>,
    /// Name reported for the model; defaults to the model file stem.
    #[arg(short = 'a', long = "alias", value_name = "NAME")]
    pub alias: Option<String>,
    /// Prompt used when the operation layer supplies no text.
    #[arg(short = 'p', long = "prompt", value_name = "TEXT", default_value = "")]
    pub prompt: String,
    /// Maximum number of tokens to generate; -1 for no limit.
    #[arg(
        short = 'n',
        long = "n-predict",
        value_name = "N",
        default_value_t = -1,
        allow_negative_numbers = true
    )]
    pub n_predict: i32,
    /// Context window in tokens.
    #[arg(short = 'c', long = "ctx-size", value_name = "N", default_value_t = 4096)]
    pub ctx_size: u32,
    /// Worker threads available to the engine; 0 picks automatically.
    #[arg(long = "threads", value_name = "N", default_value_t = 0)]
    pub threads: u32,
    /// Number of parallel slots.
    #[arg(long = "parallel", visible_alias = "np", value_name = "N", default_value_t = 1)]
    pub parallel: u32,
    /// Share one KV cache across all slots.
    #[arg(long = "kv-unified", visible_alias = "kvu")]
    pub kv_unified: bool,
    /// Serve embeddings and reranking.
    #[arg(long = "embedding", visible_alias = "embeddings")]
    pub embedding: bool,
    /// Dimensionality of embedding vectors.
    #[arg(long = "embd-dim", value_name = "N", default_value_t = 64)]
    pub embd_dim: usize,
    /// Seed mixed into deterministic model behaviour.
    #[arg(long = "seed", value_name = "N", default_value_t = 42)]
    pub seed: u64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            model: None,
            alias: None,
            prompt: String::new(),
            n_predict: -1,
            ctx_size: 4096,
            threads: 0,
            parallel: 1,
            kv_unified: false,
            embedding: false,
            embd_dim: 64,
            seed: 42,
        }
    }
}

impl EngineParams {
    /// Parses forwarded arguments. `program` becomes `argv[0]`.
    ///
    /// # Errors
    ///
    /// Returns the clap error for unknown flags or bad values, including the
    /// help and version pseudo-errors.
    pub fn parse_forwarded<I>(program: impl Into<OsString>, args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator,
        I::Item: Into<OsString> + Clone,
    {
        let argv = std::iter::once(program.into()).chain(args.into_iter().map(Into::into));
        Self::try_parse_from(argv)
    }

    /// Adjusts parameters that depend on the selected operation.
    ///
    /// Embedding and rerank force embedding mode. A default single slot
    /// without a unified cache is widened to [`AUTO_PARALLEL`] slots sharing
    /// one cache.
    pub fn apply_route_defaults(&mut self, operation: &str) {
        if operation.parse::<Route>().is_ok_and(Route::needs_embeddings) {
            self.embedding = true;
        }
        if self.parallel == 1 && !self.kv_unified {
            warn!(
                target: PARAMS_TARGET,
                parallel = AUTO_PARALLEL,
                "setting parallel = {AUTO_PARALLEL} and kv_unified = true (pass --kv-unified to keep one slot)"
            );
            self.parallel = AUTO_PARALLEL;
            self.kv_unified = true;
        }
        if self.alias.is_none() {
            self.alias = self
                .model
                .as_deref()
                .and_then(Path::file_stem)
                .map(|stem| stem.to_string_lossy().into_owned());
        }
    }

    /// Returns the model path.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingModel`] when `-m` was not given.
    pub fn model_path(&self) -> Result<&Path, EngineError> {
        self.model.as_deref().ok_or(EngineError::MissingModel)
    }

    /// Name reported in responses.
    #[must_use]
    pub fn model_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or("model")
    }

    /// Checks value ranges that clap cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParameter`] naming the offending flag.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.ctx_size == 0 {
            return Err(EngineError::invalid_parameter(
                "--ctx-size",
                "must be greater than zero",
            ));
        }
        if self.parallel == 0 {
            return Err(EngineError::invalid_parameter(
                "--parallel",
                "must be greater than zero",
            ));
        }
        if self.embd_dim == 0 {
            return Err(EngineError::invalid_parameter(
                "--embd-dim",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}
