//! Response emission and exit-code policy.

use std::io::{self, Write};
use std::process::ExitCode;

use oneshot_engine::{ChunkStream, RouteResponse, ShutdownToken};
use tracing::{info, warn};

const EMIT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::emit");

/// Drains `response` to the output streams and returns the exit code.
///
/// Successful buffered payloads go to `stdout`, failed ones (status >= 400)
/// to `stderr`. Stream chunks go to `stdout` and are flushed one at a time.
/// Write failures are logged and reported as failure.
pub(crate) fn emit_response<W, E>(
    response: RouteResponse,
    shutdown: &ShutdownToken,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode
where
    W: Write,
    E: Write,
{
    let outcome = match response {
        RouteResponse::Buffered { status, payload } => emit_buffered(status, &payload, stdout, stderr),
        RouteResponse::Streaming(stream) => emit_stream(stream, shutdown, stdout),
    };
    outcome.unwrap_or_else(|error| {
        warn!(target: EMIT_TARGET, error = %error, "failed to write response");
        ExitCode::FAILURE
    })
}

fn emit_buffered<W, E>(
    status: u16,
    payload: &str,
    stdout: &mut W,
    stderr: &mut E,
) -> io::Result<ExitCode>
where
    W: Write,
    E: Write,
{
    if is_failure(status) {
        writeln!(stderr, "{payload}")?;
        stderr.flush()?;
        return Ok(ExitCode::FAILURE);
    }
    writeln!(stdout, "{payload}")?;
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn emit_stream<W: Write>(
    mut stream: ChunkStream,
    shutdown: &ShutdownToken,
    stdout: &mut W,
) -> io::Result<ExitCode> {
    while !shutdown.is_triggered() {
        let Some(chunk) = stream.next_chunk() else {
            break;
        };
        stdout.write_all(chunk.as_bytes())?;
        stdout.flush()?;
    }
    if shutdown.is_triggered() {
        info!(target: EMIT_TARGET, "stream interrupted by shutdown");
        return Ok(ExitCode::FAILURE);
    }
    Ok(if is_failure(stream.status()) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

const fn is_failure(status: u16) -> bool {
    status >= 400
}
