//! Single-request lifecycle coordination.
//!
//! The engine is loaded and initialised on the calling thread, its
//! processing loop runs on the `engine-loop` worker, and exactly one request
//! is dispatched once the loop reports ready. Teardown always sets the
//! shutdown token, terminates the engine, joins the worker and only then
//! drops the engine.

use std::io::Write;
use std::process::ExitCode;
use std::thread;

use oneshot_engine::{EngineParams, ServingEngine, ShutdownToken};

use crate::dispatch::dispatch;
use crate::emit::emit_response;
use crate::health::LifecycleReporter;

const WORKER_NAME: &str = "engine-loop";

/// Stops the engine loop when dropped, including while unwinding.
struct StopOnDrop<'a, S: ServingEngine> {
    engine: &'a S,
    shutdown: &'a ShutdownToken,
}

impl<S: ServingEngine> Drop for StopOnDrop<'_, S> {
    fn drop(&mut self) {
        self.shutdown.trigger();
        self.engine.terminate();
    }
}

/// Everything needed to serve the one request of this run.
pub(crate) struct SingleRequest<'a> {
    pub(crate) params: &'a EngineParams,
    pub(crate) operation: &'a str,
    pub(crate) body: String,
    pub(crate) shutdown: &'a ShutdownToken,
}

/// Loads `engine`, serves `request`, and tears the engine down.
pub(crate) fn run_single_request<S, R, W, E>(
    mut engine: S,
    request: SingleRequest<'_>,
    reporter: &R,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode
where
    S: ServingEngine,
    R: LifecycleReporter + ?Sized,
    W: Write,
    E: Write,
{
    reporter.engine_loading(request.params);
    if let Err(error) = engine.load(request.params) {
        reporter.engine_load_failed(&error);
        let _ = writeln!(stderr, "{error}");
        return ExitCode::FAILURE;
    }
    engine.init();

    let shutdown = request.shutdown;
    let exit_code = thread::scope(|scope| {
        let engine = &engine;
        let worker = match thread::Builder::new()
            .name(WORKER_NAME.to_owned())
            .spawn_scoped(scope, move || engine.run_loop(shutdown))
        {
            Ok(worker) => worker,
            Err(error) => {
                let _ = writeln!(stderr, "failed to start {WORKER_NAME} thread: {error}");
                return ExitCode::FAILURE;
            }
        };
        let stop = StopOnDrop { engine, shutdown };
        engine.wait_ready();
        reporter.engine_ready();

        reporter.request_dispatched(request.operation);
        let exit_code = match dispatch(engine, request.operation, request.body, shutdown) {
            Ok(response) => {
                let exit_code = emit_response(response, shutdown, stdout, stderr);
                reporter.response_emitted(exit_code == ExitCode::SUCCESS);
                exit_code
            }
            Err(error) => {
                reporter.dispatch_failed(&error);
                let _ = writeln!(stderr, "{error}");
                ExitCode::FAILURE
            }
        };

        drop(stop);
        if worker.join().is_err() {
            reporter.worker_panicked();
        }
        exit_code
    });
    reporter.shutdown_complete();
    drop(engine);
    exit_code
}
