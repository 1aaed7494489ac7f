//! Operation name normalisation.

/// Maps a user-supplied operation name to its canonical identifier.
///
/// Matching is case-insensitive. Names outside the synonym table pass through
/// lower-cased so dispatch can reject them with a precise error.
pub(crate) fn normalize_operation(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let canonical = match lowered.as_str() {
        "chat/completions" | "chat-completions" | "chat_completion" => "chat",
        "completions" | "completion" | "cmpl" => "completion",
        "emb" | "embedding" | "embeddings" => "embedding",
        "reranking" => "rerank",
        "health" | "healthz" => "health",
        _ => return lowered,
    };
    canonical.to_owned()
}
