//! Operation-layer argument scanning.
//!
//! Flags owned by this layer are consumed here; every other token is kept in
//! order and forwarded to the engine parameter parser.

use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;

/// Operation used when none is given.
pub(crate) const DEFAULT_OPERATION: &str = "chat";

/// Options owned by the operation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CliOptions {
    pub(crate) operation: String,
    pub(crate) body: Option<String>,
    pub(crate) body_file: Option<PathBuf>,
    pub(crate) use_stdin: bool,
    pub(crate) text: Option<String>,
    pub(crate) query: Option<String>,
    pub(crate) documents: Vec<String>,
    pub(crate) documents_file: Option<PathBuf>,
    pub(crate) top_n: Option<usize>,
    pub(crate) stream: Option<bool>,
    pub(crate) show_help: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            operation: DEFAULT_OPERATION.to_owned(),
            body: None,
            body_file: None,
            use_stdin: false,
            text: None,
            query: None,
            documents: Vec::new(),
            documents_file: None,
            top_n: None,
            stream: None,
            show_help: false,
        }
    }
}

/// Result of scanning the operation-layer arguments.
#[derive(Debug, Default)]
pub(crate) struct ParsedArgs {
    pub(crate) options: CliOptions,
    /// Tokens for the engine parameter parser, in their original order.
    pub(crate) forwarded: Vec<OsString>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub(crate) enum OptionsError {
    #[error("missing value for {flag}")]
    MissingValue { flag: String },
    #[error("invalid value for --top-n: '{value}' is not a non-negative integer")]
    InvalidTopN { value: String },
}

/// Scans `args` (without the program name).
pub(crate) fn parse_cli_args(args: &[OsString]) -> Result<ParsedArgs, OptionsError> {
    let mut parsed = ParsedArgs::default();
    let mut operation_set = false;
    let mut tokens = args.iter();

    while let Some(token) = tokens.next() {
        let text = token.to_string_lossy();
        let flag = text.as_ref();
        let mut value = || {
            tokens
                .next()
                .map(|next| next.to_string_lossy().into_owned())
                .ok_or_else(|| OptionsError::MissingValue {
                    flag: flag.to_owned(),
                })
        };
        let options = &mut parsed.options;
        match flag {
            "--op" | "--mode" | "--route" => {
                options.operation = value()?;
                operation_set = true;
            }
            "--body" | "--json" | "--input-json" => options.body = Some(value()?),
            "--body-file" | "--json-file" => options.body_file = Some(PathBuf::from(value()?)),
            "--text" | "-t" => options.text = Some(value()?),
            "--query" => options.query = Some(value()?),
            "--document" | "--doc" => options.documents.push(value()?),
            "--documents-file" => options.documents_file = Some(PathBuf::from(value()?)),
            "--top-n" => {
                let raw = value()?;
                let top_n = raw.trim().parse::<usize>();
                options.top_n = Some(top_n.map_err(|_| OptionsError::InvalidTopN { value: raw })?);
            }
            "--stdin" => options.use_stdin = true,
            "--stream" => options.stream = Some(true),
            "--no-stream" => options.stream = Some(false),
            "--help-cli" => options.show_help = true,
            positional if !operation_set && !positional.is_empty() && !positional.starts_with('-') => {
                options.operation = positional.to_owned();
                operation_set = true;
            }
            _ => parsed.forwarded.push(token.clone()),
        }
    }

    Ok(parsed)
}

/// Usage text for the operation layer.
pub(crate) fn usage(program: &str) -> String {
    format!(
        "\
Single-request inference CLI (no network listener)
Usage: {program} [config opts] [operation] [operation opts] [engine opts]
Configuration opts (must come first):
  --config-path <path>   TOML configuration file
  --log-filter <expr>    Diagnostic filter (default: warn)
  --log-format <fmt>     Diagnostic format: compact or json
Operation opts:
  --op <name>            Route to run (chat, completion, embeddings, rerank, tokenize,
                         detokenize, apply-template, props, health); default chat
  --text, -t <str>       Plain text used when no JSON body is supplied
  --body, --json <str>   Raw JSON payload (same shape as the HTTP API)
  --body-file <path>     File containing the raw JSON payload
  --stdin                Read the raw JSON payload from stdin
  --query <str>          Rerank query (falls back to --text or -p)
  --document <str>       Rerank document (repeatable)
  --documents-file <p>   Newline-delimited rerank documents
  --top-n <n>            Rerank cutoff (non-negative integer)
  --stream, --no-stream  Override the stream flag of chat and completion bodies
  --help-cli             Show this help without loading a model
Engine opts: see `{program} --help`
Examples:
  {program} chat --text \"hello\" -m model.gguf --no-stream
  {program} embeddings --text \"embed me\" -m model.gguf
  {program} rerank --query \"title\" --document \"doc a\" --document \"doc b\" -m model.gguf --top-n 1
  {program} chat --body-file request.json -m model.gguf
"
    )
}
