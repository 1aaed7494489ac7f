//! Route handlers for [`LocalEngine`].

use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};

use super::embed::cosine;
use super::generate::{GenerationEvent, GenerationJob, GenerationSummary};
use super::model::LoadedModel;
use super::payloads::{
    ApplyTemplateRequest, ChatRequest, CompletionRequest, DetokenizeRequest, EmbeddingRequest,
    PromptInput, RerankRequest, TokenizeRequest, generation_limit, parse_body,
};
use super::queue::{Task, TaskQueue};
use super::stream::{Framing, GenerationStream, usage};
use super::template::{TEMPLATE_NAME, render_chatml};
use super::tokenizer::VOCAB_SIZE;
use super::{LOOP_POLL, LocalEngine};
use crate::engine::{HandlerResult, RouteHandlers};
use crate::errors::HandlerError;
use crate::response::{ErrorType, RouteResponse, STATUS_UNAVAILABLE};
use crate::route::RouteRequest;
use crate::shutdown::ShutdownToken;

impl LocalEngine {
    fn loaded(&self) -> Result<&LoadedModel, HandlerError> {
        self.model
            .as_ref()
            .ok_or_else(|| HandlerError::unavailable("model is not loaded"))
    }

    fn task_queue(&self) -> Result<&TaskQueue, HandlerError> {
        self.queue
            .as_ref()
            .ok_or_else(|| HandlerError::unavailable("engine is not initialised"))
    }

    fn check_context(&self, tokens: usize) -> Result<(), HandlerError> {
        let limit = usize::try_from(self.params.ctx_size).unwrap_or(usize::MAX);
        if tokens > limit {
            return Err(HandlerError::invalid_request(format!(
                "input ({tokens} tokens) exceeds the context size ({limit} tokens)"
            )));
        }
        Ok(())
    }

    fn require_embeddings(&self) -> Result<(), HandlerError> {
        if self.params.embedding {
            Ok(())
        } else {
            Err(HandlerError::not_supported(
                "this engine does not serve embeddings; start it with --embedding",
            ))
        }
    }

    fn next_id(&self, prefix: &str) -> Result<String, HandlerError> {
        let model = self.loaded()?;
        let sequence = self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{prefix}-{}-{sequence}", model.short_fingerprint()))
    }

    fn submit_generation(
        &self,
        job: GenerationJob,
    ) -> Result<Receiver<GenerationEvent>, HandlerError> {
        let (events, receiver) = mpsc::channel();
        self.task_queue()?.submit(Task::Generate { job, events })?;
        Ok(receiver)
    }

    fn embed_all(
        &self,
        texts: &[String],
        cancel: &ShutdownToken,
    ) -> Result<(Vec<Vec<f32>>, usize), HandlerError> {
        let inputs: Vec<Vec<u32>> = texts
            .iter()
            .map(|text| self.tokenizer.encode(text, true))
            .collect();
        for tokens in &inputs {
            self.check_context(tokens.len())?;
        }
        let token_count = inputs.iter().map(Vec::len).sum();
        let (reply, receiver) = mpsc::sync_channel(1);
        self.task_queue()?.submit(Task::Embed { inputs, reply })?;
        let vectors = await_reply(&receiver, cancel)?;
        Ok((vectors, token_count))
    }
}

fn await_reply<T>(receiver: &Receiver<T>, cancel: &ShutdownToken) -> Result<T, HandlerError> {
    loop {
        if cancel.is_triggered() {
            return Err(HandlerError::unavailable("request cancelled"));
        }
        match receiver.recv_timeout(LOOP_POLL) {
            Ok(value) => return Ok(value),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(HandlerError::internal(
                    "engine loop stopped before completing the request",
                ));
            }
        }
    }
}

fn collect_generation(
    receiver: &Receiver<GenerationEvent>,
    cancel: &ShutdownToken,
) -> Result<(String, GenerationSummary), HandlerError> {
    let mut text = String::new();
    loop {
        match await_reply(receiver, cancel)? {
            GenerationEvent::Piece(piece) => text.push_str(&piece),
            GenerationEvent::Done(summary) if summary.cancelled => {
                return Err(HandlerError::unavailable("request cancelled"));
            }
            GenerationEvent::Done(summary) => return Ok((text, summary)),
        }
    }
}

fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

impl RouteHandlers for LocalEngine {
    fn post_chat_completions(&self, request: &RouteRequest) -> HandlerResult {
        let body: ChatRequest = parse_body(request.body())?;
        if body.messages.is_empty() {
            return Err(HandlerError::invalid_request(
                "'messages' must contain at least one message",
            ));
        }
        let prompt = render_chatml(&body.messages, true);
        let prompt_tokens = self.tokenizer.encode(&prompt, true).len();
        self.check_context(prompt_tokens)?;
        let id = self.next_id("chatcmpl")?;
        let model = self.params.model_alias().to_owned();
        let created = unix_time();

        let receiver = self.submit_generation(GenerationJob {
            source: body.last_user_text(),
            prompt_tokens,
            max_pieces: generation_limit(body.max_tokens.or(body.n_predict), self.params.n_predict),
        })?;
        if body.stream {
            let framing = Framing::Chat { id, model, created };
            return Ok(RouteResponse::streaming(GenerationStream::new(
                receiver,
                request.shutdown().clone(),
                framing,
            )));
        }
        let (content, summary) = collect_generation(&receiver, request.shutdown())?;
        Ok(RouteResponse::json(&json!({
            "id": id,
            "object": "chat.completion",
            "created": created,
            "model": model,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": summary.finish.as_str(),
            }],
            "usage": usage(&summary),
        })))
    }

    fn post_completions(&self, request: &RouteRequest) -> HandlerResult {
        let body: CompletionRequest = parse_body(request.body())?;
        let (source, prompt_tokens) = match &body.prompt {
            PromptInput::Text(text) => (text.clone(), self.tokenizer.encode(text, true).len()),
            PromptInput::Tokens(ids) => (self.tokenizer.decode(ids)?, ids.len()),
        };
        self.check_context(prompt_tokens)?;
        self.loaded()?;
        let model = self.params.model_alias().to_owned();

        let receiver = self.submit_generation(GenerationJob {
            source,
            prompt_tokens,
            max_pieces: generation_limit(body.n_predict.or(body.max_tokens), self.params.n_predict),
        })?;
        if body.stream {
            return Ok(RouteResponse::streaming(GenerationStream::new(
                receiver,
                request.shutdown().clone(),
                Framing::Completion { model },
            )));
        }
        let (content, summary) = collect_generation(&receiver, request.shutdown())?;
        Ok(RouteResponse::json(&json!({
            "content": content,
            "model": model,
            "stop": true,
            "stop_type": summary.finish.stop_type(),
            "tokens_predicted": summary.completion_tokens,
            "tokens_evaluated": summary.prompt_tokens,
        })))
    }

    fn post_embeddings(&self, request: &RouteRequest) -> HandlerResult {
        self.require_embeddings()?;
        let body: EmbeddingRequest = parse_body(request.body())?;
        let texts = body.input.into_vec();
        if texts.is_empty() {
            return Err(HandlerError::invalid_request("'input' must not be empty"));
        }
        let (vectors, token_count) = self.embed_all(&texts, request.shutdown())?;
        let data: Vec<Value> = vectors
            .into_iter()
            .enumerate()
            .map(|(index, embedding)| {
                json!({"object": "embedding", "index": index, "embedding": embedding})
            })
            .collect();
        Ok(RouteResponse::json(&json!({
            "object": "list",
            "model": self.params.model_alias(),
            "data": data,
            "usage": {"prompt_tokens": token_count, "total_tokens": token_count},
        })))
    }

    fn post_rerank(&self, request: &RouteRequest) -> HandlerResult {
        self.require_embeddings()?;
        let body: RerankRequest = parse_body(request.body())?;
        if body.query.is_empty() {
            return Err(HandlerError::invalid_request("'query' must not be empty"));
        }
        if body.documents.is_empty() {
            return Err(HandlerError::invalid_request(
                "'documents' must contain at least one document",
            ));
        }
        let mut texts = Vec::with_capacity(body.documents.len() + 1);
        texts.push(body.query);
        texts.extend(body.documents);
        let (vectors, token_count) = self.embed_all(&texts, request.shutdown())?;

        let Some((query, documents)) = vectors.split_first() else {
            return Err(HandlerError::internal("engine returned no embeddings"));
        };
        let mut scored: Vec<(usize, f32)> = documents
            .iter()
            .enumerate()
            .map(|(index, document)| (index, cosine(query, document)))
            .collect();
        scored.sort_by(|left, right| right.1.total_cmp(&left.1));
        if let Some(top_n) = body.top_n {
            scored.truncate(top_n);
        }
        let results: Vec<Value> = scored
            .into_iter()
            .map(|(index, score)| json!({"index": index, "relevance_score": score}))
            .collect();
        Ok(RouteResponse::json(&json!({
            "object": "list",
            "model": self.params.model_alias(),
            "results": results,
            "usage": {"prompt_tokens": token_count, "total_tokens": token_count},
        })))
    }

    fn post_tokenize(&self, request: &RouteRequest) -> HandlerResult {
        let body: TokenizeRequest = parse_body(request.body())?;
        let ids = self.tokenizer.encode(&body.content, body.add_special);
        let tokens: Vec<Value> = if body.with_pieces {
            ids.iter()
                .map(|&id| Ok(json!({"id": id, "piece": self.tokenizer.piece(id)?})))
                .collect::<Result<_, HandlerError>>()?
        } else {
            ids.iter().map(|&id| json!(id)).collect()
        };
        Ok(RouteResponse::json(&json!({ "tokens": tokens })))
    }

    fn post_detokenize(&self, request: &RouteRequest) -> HandlerResult {
        let body: DetokenizeRequest = parse_body(request.body())?;
        let content = self.tokenizer.decode(&body.tokens)?;
        Ok(RouteResponse::json(&json!({ "content": content })))
    }

    fn post_apply_template(&self, request: &RouteRequest) -> HandlerResult {
        let body: ApplyTemplateRequest = parse_body(request.body())?;
        Ok(RouteResponse::json(&json!({
            "prompt": render_chatml(&body.messages, true),
        })))
    }

    fn get_props(&self, _request: &RouteRequest) -> HandlerResult {
        let model = self.loaded()?;
        Ok(RouteResponse::json(&json!({
            "model_alias": self.params.model_alias(),
            "model_path": model.path.display().to_string(),
            "model_size": model.size_bytes,
            "model_fingerprint": model.fingerprint,
            "n_ctx": self.params.ctx_size,
            "total_slots": self.params.parallel,
            "kv_unified": self.params.kv_unified,
            "embedding": self.params.embedding,
            "embd_dim": self.params.embd_dim,
            "vocab_size": VOCAB_SIZE,
            "chat_template": TEMPLATE_NAME,
            "bos_token": "<s>",
            "eos_token": "</s>",
            "default_generation_settings": {
                "n_predict": self.params.n_predict,
                "n_ctx": self.params.ctx_size,
                "seed": self.params.seed,
            },
        })))
    }

    fn get_health(&self, _request: &RouteRequest) -> HandlerResult {
        if self.model.is_some() && self.queue.is_some() && self.readiness.is_ready() {
            Ok(RouteResponse::json(&json!({"status": "ok"})))
        } else {
            Ok(RouteResponse::error(
                STATUS_UNAVAILABLE,
                "Loading model",
                ErrorType::Unavailable,
            ))
        }
    }
}
