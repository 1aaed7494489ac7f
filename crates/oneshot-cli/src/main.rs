//! CLI entrypoint for the `oneshot` single-request front end.
//!
//! The binary delegates to [`oneshot_cli::run`], which loads configuration,
//! builds the request body, runs the engine for exactly one request, and
//! writes the response.

use std::io::{self, StdinLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdin: StdinLock<'static> = io::stdin().lock();
    let mut stdout: StdoutLock<'static> = io::stdout().lock();
    // Left unlocked: the engine thread logs to stderr while the main thread
    // blocks on the response.
    let mut stderr = io::stderr();
    oneshot_cli::run(std::env::args_os(), &mut stdin, &mut stdout, &mut stderr)
}
