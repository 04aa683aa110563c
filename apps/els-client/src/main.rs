use els_client::cli::Cli;
use els_client::error::ElsClientError;
use els_client::lifecycle::{SessionEnd, run_session};
use els_client::logger::initialize as LoggerInitialize;

use els_core::output::{FileSink, SessionLog};
use els_core::session::Session;

use std::fs::create_dir_all;
use std::process::exit;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use tokio::io::{stdin, stdout};
use tokio::signal::unix::{SignalKind, signal};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let code = match run(Cli::parse()).await {
        Ok(end) => {
            info!("edh-els finished: {end:?}");
            0
        }
        Err(e) => {
            error!("{e}");
            eprintln!("edh-els: {e}");
            1
        }
    };

    // A blocking stdin read may still be pending; don't wait for it.
    exit(code);
}

async fn run(cli: Cli) -> Result<SessionEnd, ElsClientError> {
    let log_dir = cli.log_dir()?;
    create_dir_all(&log_dir).map_err(|e| {
        ElsClientError::client(format!("Failed to create log directory: {e}"))
    })?;

    LoggerInitialize(&log_dir, cli.log_level())?;

    info!("edh-els starting");
    info!("Log directory: {}", log_dir.display());

    let config = cli.load_config()?;
    let work_dir = cli.workspace_dir()?;
    info!("Workspace: {}", work_dir.display());

    let log = match FileSink::open(&log_dir) {
        Ok(sink) => {
            info!("els server output goes to {}", sink.path().display());
            SessionLog::new(Arc::new(sink))
        }
        Err(e) => {
            warn!("Failed to open els server log, using console: {e}");
            SessionLog::console()
        }
    };

    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
        ElsClientError::client(format!("Failed to install SIGTERM handler: {e}"))
    })?;
    let shutdown = async move {
        if sigterm.recv().await.is_some() {
            info!("Received SIGTERM");
        }
    };

    let session = Session::new(config, work_dir, log);
    run_session(session, stdin(), stdout(), shutdown).await
}
