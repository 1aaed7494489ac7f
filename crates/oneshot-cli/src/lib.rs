//! Command-line runtime for the `oneshot` single-request front end.
//!
//! A run loads layered configuration, installs telemetry, scans the
//! operation-layer flags, forwards the rest to the engine parameter parser,
//! builds exactly one request body, and hands it to the lifecycle
//! coordinator. IO streams and the configuration loader are injected so the
//! runtime can be exercised from tests.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::process::ExitCode;

use clap::error::ErrorKind;
use oneshot_engine::{EngineParams, LocalEngine, ServingEngine, ShutdownToken};
use tracing::debug;

mod config;
mod dispatch;
mod emit;
mod errors;
mod health;
mod lifecycle;
mod operation;
mod options;
mod payload;
mod signals;
mod telemetry;

use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::AppError;
use health::StructuredLifecycleReporter;
use lifecycle::{SingleRequest, run_single_request};
use operation::normalize_operation;
use options::{parse_cli_args, usage};
use payload::build_payload;

const RUNTIME_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runtime");
const DEFAULT_PROGRAM: &str = "oneshot";

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, R: Read, W: Write, E: Write> {
    pub(crate) stdin: &'a mut R,
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, R: Read, W: Write, E: Write> IoStreams<'a, R, W, E> {
    pub(crate) fn new(stdin: &'a mut R, stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
        }
    }
}

struct CliRunner<'a, R: Read, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'a, R, W, E>,
    loader: &'a L,
}

impl<'a, R, W, E, L> CliRunner<'a, R, W, E, L>
where
    R: Read,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(io: &'a mut IoStreams<'a, R, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        self.run_with_engine(args, LocalEngine::new())
    }

    fn run_with_engine<I, S>(&mut self, args: I, engine: S) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
        S: ServingEngine,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let program = args
            .first()
            .map_or_else(
                || DEFAULT_PROGRAM.to_owned(),
                |arg| arg.to_string_lossy().into_owned(),
            );

        match self.execute(&args, engine) {
            Ok(exit_code) => exit_code,
            Err(error) => {
                let _ = writeln!(self.io.stderr, "{error}");
                if error.shows_usage() {
                    let _ = write!(self.io.stderr, "{}", usage(&program));
                }
                ExitCode::FAILURE
            }
        }
    }

    fn execute<S: ServingEngine>(
        &mut self,
        args: &[OsString],
        engine: S,
    ) -> Result<ExitCode, AppError> {
        let split = split_config_arguments(args);
        let config = self.loader.load(&split.config_arguments)?;
        telemetry::initialise(&config)?;

        let program = args
            .first()
            .cloned()
            .unwrap_or_else(|| OsString::from(DEFAULT_PROGRAM));
        let tokens = args.get(split.command_start..).unwrap_or_default();
        let parsed = parse_cli_args(tokens)?;
        if parsed.options.show_help {
            let _ = write!(self.io.stderr, "{}", usage(&program.to_string_lossy()));
            return Ok(ExitCode::SUCCESS);
        }

        let mut params = match EngineParams::parse_forwarded(program, parsed.forwarded) {
            Ok(params) => params,
            Err(error)
                if matches!(
                    error.kind(),
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
                ) =>
            {
                let _ = write!(self.io.stdout, "{}", error.render());
                return Ok(ExitCode::SUCCESS);
            }
            Err(error) => return Err(AppError::EngineArguments(error)),
        };

        let operation = normalize_operation(&parsed.options.operation);
        params.apply_route_defaults(&operation);
        params.model_path()?;
        params.validate()?;
        let body = build_payload(
            &parsed.options,
            &operation,
            &params.prompt,
            &mut *self.io.stdin,
        )?;
        debug!(
            target: RUNTIME_TARGET,
            operation = %operation,
            body_len = body.len(),
            "request body ready"
        );

        let shutdown = ShutdownToken::new();
        signals::install(&shutdown)?;
        let request = SingleRequest {
            params: &params,
            operation: &operation,
            body,
            shutdown: &shutdown,
        };
        Ok(run_single_request(
            engine,
            request,
            &StructuredLifecycleReporter,
            &mut *self.io.stdout,
            &mut *self.io.stderr,
        ))
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdin, stdout, stderr);
    CliRunner::new(&mut io, &OrthoConfigLoader).run(args)
}

#[cfg(test)]
mod tests;
