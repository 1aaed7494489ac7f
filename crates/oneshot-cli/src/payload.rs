//! Request body construction.
//!
//! A body comes from exactly one source, in precedence order: inline text,
//! a body file, stdin, or a body auto-built from the operation flags.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::options::CliOptions;

#[derive(Debug, Error)]
pub(crate) enum PayloadError {
    #[error("failed to open file {path}: {source}", path = .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read request body from stdin: {0}")]
    ReadStdin(#[source] io::Error),
    #[error("{operation} requires --text or -p/--prompt content")]
    MissingText { operation: String },
    #[error("rerank requires at least one --document or --documents-file line")]
    MissingDocuments,
    #[error("rerank requires --query or fallback text (--text or -p/--prompt)")]
    MissingQuery,
    #[error("operation '{operation}' requires a JSON body (--body/--body-file/--stdin)")]
    BodyRequired { operation: String },
    #[error("failed to serialise request body: {0}")]
    Serialise(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    messages: [ChatTurn<'a>; 1],
    stream: bool,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    prompt: &'a str,
    stream: bool,
}

#[derive(Serialize)]
struct EmbeddingBody<'a> {
    input: &'a str,
}

#[derive(Serialize)]
struct RerankBody<'a> {
    query: &'a str,
    documents: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    top_n: Option<usize>,
}

#[derive(Serialize)]
struct TokenizeBody<'a> {
    content: &'a str,
}

/// Produces the single JSON body for `operation`.
///
/// `fallback_text` is the engine's `-p/--prompt` value, used when `--text`
/// is absent. `stdin` is read only when `--stdin` was given.
pub(crate) fn build_payload(
    options: &CliOptions,
    operation: &str,
    fallback_text: &str,
    stdin: &mut dyn Read,
) -> Result<String, PayloadError> {
    if let Some(body) = options.body.as_ref().filter(|body| !body.is_empty()) {
        return Ok(body.clone());
    }
    if let Some(path) = &options.body_file {
        return read_file(path);
    }
    if options.use_stdin {
        let mut body = String::new();
        stdin
            .read_to_string(&mut body)
            .map_err(PayloadError::ReadStdin)?;
        return Ok(body);
    }

    let text = options
        .text
        .as_deref()
        .filter(|text| !text.is_empty())
        .unwrap_or(fallback_text);
    let stream = options.stream.unwrap_or(false);
    let require_text = || {
        if text.is_empty() {
            Err(PayloadError::MissingText {
                operation: operation.to_owned(),
            })
        } else {
            Ok(text)
        }
    };

    let body = match operation {
        "chat" => serde_json::to_string(&ChatBody {
            messages: [ChatTurn {
                role: "user",
                content: require_text()?,
            }],
            stream,
        })?,
        "completion" => serde_json::to_string(&CompletionBody {
            prompt: require_text()?,
            stream,
        })?,
        "embedding" => serde_json::to_string(&EmbeddingBody {
            input: require_text()?,
        })?,
        "rerank" => {
            let documents = collect_documents(options)?;
            let query = options
                .query
                .as_deref()
                .filter(|query| !query.is_empty())
                .unwrap_or(text);
            if query.is_empty() {
                return Err(PayloadError::MissingQuery);
            }
            serde_json::to_string(&RerankBody {
                query,
                documents: &documents,
                top_n: options.top_n,
            })?
        }
        "tokenize" => serde_json::to_string(&TokenizeBody {
            content: require_text()?,
        })?,
        other => {
            return Err(PayloadError::BodyRequired {
                operation: other.to_owned(),
            });
        }
    };
    Ok(body)
}

fn read_file(path: &Path) -> Result<String, PayloadError> {
    fs::read_to_string(path).map_err(|source| PayloadError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

/// `--document` values followed by the non-blank lines of `--documents-file`.
fn collect_documents(options: &CliOptions) -> Result<Vec<String>, PayloadError> {
    let mut documents = options.documents.clone();
    if let Some(path) = &options.documents_file {
        let contents = read_file(path)?;
        documents.extend(
            contents
                .lines()
                .map(|line| line.trim_end_matches('\r'))
                .filter(|line| !line.is_empty())
                .map(str::to_owned),
        );
    }
    if documents.is_empty() {
        return Err(PayloadError::MissingDocuments);
    }
    Ok(documents)
}
