//! Canonical routes and the single request handed to a route handler.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::shutdown::ShutdownToken;

/// Closed set of operations the engine serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// OpenAI-style chat completion.
    Chat,
    /// Raw prompt completion.
    Completion,
    /// Embedding vectors for one or more inputs.
    Embedding,
    /// Relevance scores for documents against a query.
    Rerank,
    /// Text to token ids.
    Tokenize,
    /// Token ids to text.
    Detokenize,
    /// Render chat messages through the model's chat template.
    ApplyTemplate,
    /// Engine and model properties.
    Props,
    /// Liveness probe.
    Health,
}

impl Route {
    /// Every route, in dispatch-table order.
    pub const ALL: [Self; 9] = [
        Self::Chat,
        Self::Completion,
        Self::Embedding,
        Self::Rerank,
        Self::Tokenize,
        Self::Detokenize,
        Self::ApplyTemplate,
        Self::Props,
        Self::Health,
    ];

    /// Returns the canonical identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Completion => "completion",
            Self::Embedding => "embedding",
            Self::Rerank => "rerank",
            Self::Tokenize => "tokenize",
            Self::Detokenize => "detokenize",
            Self::ApplyTemplate => "apply-template",
            Self::Props => "props",
            Self::Health => "health",
        }
    }

    /// Returns `true` for routes that need the engine in embedding mode.
    #[must_use]
    pub const fn needs_embeddings(self) -> bool {
        matches!(self, Self::Embedding | Self::Rerank)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned when a string is not a canonical route identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported operation: {0}")]
pub struct UnsupportedRoute(String);

impl UnsupportedRoute {
    /// Creates an error for the offending identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier that failed to parse.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Route {
    type Err = UnsupportedRoute;

    /// Parses canonical identifiers only; synonyms are resolved upstream.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|route| route.as_str() == value)
            .ok_or_else(|| UnsupportedRoute::new(value))
    }
}

/// The one request handed to a route handler.
///
/// Built once per run and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    route: Route,
    headers: BTreeMap<String, String>,
    body: String,
    shutdown: ShutdownToken,
}

impl RouteRequest {
    /// Builds a request with an empty header map.
    #[must_use]
    pub fn new(route: Route, body: impl Into<String>, shutdown: ShutdownToken) -> Self {
        Self {
            route,
            headers: BTreeMap::new(),
            body: body.into(),
            shutdown,
        }
    }

    /// Canonical route this request targets.
    #[must_use]
    pub const fn route(&self) -> Route {
        self.route
    }

    /// Header placeholder kept for parity with networked handlers.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Raw JSON body.
    #[must_use]
    pub fn body(&self) -> &str {
        self.body.as_str()
    }

    /// Cancellation check polled by long-running handlers.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Token shared with the handler's background work.
    #[must_use]
    pub const fn shutdown(&self) -> &ShutdownToken {
        &self.shutdown
    }
}
