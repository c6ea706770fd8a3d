//! flowpoll — Binary Entrypoint
//! One stateless batch invocation: load trigger specs from a workflow file,
//! evaluate each through the runner, emit results as JSON lines on stdout.
//! All cross-invocation memory lives in the file cache under the state dir.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use flowpoll::adapters::ReqwestFetcher;
use flowpoll::workflow;
use flowpoll::{FileCache, RunContext, TriggerRunner};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn load_context() -> RunContext {
    // Webhook deliveries are queued by the (external) ingestion endpoint and
    // handed to this invocation as a JSON context file.
    let path = match std::env::var("FLOWPOLL_CONTEXT") {
        Ok(p) => p,
        Err(_) => return RunContext::default(),
    };
    match std::fs::read_to_string(&path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!(error = %e, path = %path, "context file unreadable, using empty");
            RunContext::default()
        }),
        Err(e) => {
            tracing::warn!(error = %e, path = %path, "context file missing, using empty");
            RunContext::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op elsewhere.
    let _ = dotenvy::dotenv();
    init_tracing();

    let specs = match std::env::args().nth(1) {
        Some(path) => workflow::load_triggers_from(Path::new(&path)),
        None => workflow::load_triggers_default(),
    };
    let specs = match specs {
        Ok(specs) => specs,
        Err(e) => {
            tracing::error!(error = %e, "failed to load workflow");
            return ExitCode::FAILURE;
        }
    };
    if specs.is_empty() {
        tracing::warn!("no triggers configured, nothing to do");
        return ExitCode::SUCCESS;
    }
    if let Err(e) = workflow::validate_kinds(&specs) {
        tracing::error!(error = %e, "workflow validation failed");
        return ExitCode::FAILURE;
    }

    let state_dir = std::env::var("FLOWPOLL_STATE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("state/flowpoll"));
    let cache = Arc::new(FileCache::new(state_dir));
    let http = Arc::new(ReqwestFetcher::new());
    let runner = TriggerRunner::new(cache, http);

    let context = load_context();
    let results = runner.run_all(&specs, &context).await;

    let mut failed = false;
    for result in results {
        match result {
            Ok(run) => match serde_json::to_string(&run) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!(error = %e, "failed to serialize run result"),
            },
            Err(_) => failed = true, // already logged by run_all
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
