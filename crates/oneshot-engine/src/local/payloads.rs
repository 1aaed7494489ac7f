//! Request bodies accepted by the reference engine.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::errors::HandlerError;

pub(crate) fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, HandlerError> {
    Ok(serde_json::from_str(body)?)
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatMessage {
    pub(crate) role: String,
    #[serde(default)]
    pub(crate) content: MessageContent,
}

/// Message content as plain text or as OpenAI content parts.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl MessageContent {
    /// Concatenated text; non-text parts are ignored.
    pub(crate) fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter(|part| part.kind == "text")
                .map(|part| part.text.as_str())
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ContentPart {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatRequest {
    pub(crate) messages: Vec<ChatMessage>,
    #[serde(default)]
    pub(crate) stream: bool,
    #[serde(default, alias = "max_completion_tokens")]
    pub(crate) max_tokens: Option<i64>,
    #[serde(default)]
    pub(crate) n_predict: Option<i64>,
}

impl ChatRequest {
    /// Text of the final user turn, or empty when there is none.
    pub(crate) fn last_user_text(&self) -> String {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == "user")
            .map(|message| message.content.text())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionRequest {
    pub(crate) prompt: PromptInput,
    #[serde(default)]
    pub(crate) stream: bool,
    #[serde(default)]
    pub(crate) n_predict: Option<i64>,
    #[serde(default)]
    pub(crate) max_tokens: Option<i64>,
}

/// A completion prompt as text or pre-tokenised ids.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PromptInput {
    Text(String),
    Tokens(Vec<u32>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingRequest {
    #[serde(alias = "content")]
    pub(crate) input: EmbeddingInput,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

impl EmbeddingInput {
    pub(crate) fn into_vec(self) -> Vec<String> {
        match self {
            Self::Single(text) => vec![text],
            Self::Batch(texts) => texts,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RerankRequest {
    pub(crate) query: String,
    #[serde(alias = "texts")]
    pub(crate) documents: Vec<String>,
    #[serde(default)]
    pub(crate) top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenizeRequest {
    pub(crate) content: String,
    #[serde(default)]
    pub(crate) add_special: bool,
    #[serde(default)]
    pub(crate) with_pieces: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetokenizeRequest {
    #[serde(default)]
    pub(crate) tokens: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplyTemplateRequest {
    pub(crate) messages: Vec<ChatMessage>,
}

/// Resolves a per-request generation limit against the engine default.
///
/// Negative values mean "no limit".
pub(crate) fn generation_limit(requested: Option<i64>, default: i32) -> Option<usize> {
    let limit = requested.unwrap_or_else(|| i64::from(default));
    usize::try_from(limit).ok()
}
