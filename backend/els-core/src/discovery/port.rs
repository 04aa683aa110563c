use crate::discovery::PortState;
use crate::discovery::process::format_command;
use crate::error::query::ConfigQueryError;
use crate::output::SessionLog;

use common::ErrorLocation;

use std::io::{Error as IoError, ErrorKind};
use std::panic::Location;
use std::path::Path;
use std::process::Stdio;

use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command as TokioCommand;
use tokio::spawn as TokioSpawn;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const REPORT_CHUNK_SIZE: usize = 256;

/// Run the port query command in `work_dir` and return its trimmed stdout.
///
/// # Errors
///
/// * [`ConfigQueryError::Spawn`] - the command could not be started
/// * [`ConfigQueryError::ExitStatus`] - it exited non-zero
/// * [`ConfigQueryError::EmptyOutput`] - it printed only whitespace
pub async fn resolve_port(command: &[String], work_dir: &Path) -> Result<String, ConfigQueryError> {
    let display = format_command(command);
    let Some((program, args)) = command.split_first() else {
        return Err(ConfigQueryError::Spawn {
            message: "port query command is empty".to_string(),
            location: ErrorLocation::from(Location::caller()),
            source: Box::new(IoError::new(ErrorKind::InvalidInput, "empty argv")),
        });
    };

    debug!("Running port query `{display}` in {}", work_dir.display());

    let output = TokioCommand::new(program)
        .args(args)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| ConfigQueryError::Spawn {
            message: format!("Failed to run `{display}`: {e}"),
            location: ErrorLocation::from(Location::caller()),
            source: Box::new(e),
        })?;

    if !output.status.success() {
        return Err(ConfigQueryError::exit_status(
            &display,
            output.status.code(),
            &String::from_utf8_lossy(&output.stderr),
        ));
    }

    let port = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if port.is_empty() {
        return Err(ConfigQueryError::empty_output(&display));
    }

    Ok(port)
}

/// Accumulate a port-report stream until it closes; returns the trimmed text.
///
/// A read error is treated like end-of-stream.
pub async fn read_port_report<R>(mut reader: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut accumulated = Vec::new();
    let mut chunk = [0u8; REPORT_CHUNK_SIZE];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                accumulated.extend_from_slice(&chunk[..n]);
                trace!(
                    "Dyn port updated: {} from segment {}",
                    String::from_utf8_lossy(&accumulated),
                    String::from_utf8_lossy(&chunk[..n])
                );
            }
            Err(e) => {
                debug!("Port report stream failed, treating as closed: {e}");
                break;
            }
        }
    }

    String::from_utf8_lossy(&accumulated).trim().to_string()
}

/// Read a port report in the background and publish a non-empty result.
///
/// `reported` completes only after a port was published; it is dropped
/// unsent for an empty report. Aborting the returned handle drops both.
pub(crate) fn watch_port_report<R>(
    reader: R,
    port_state: PortState,
    log: SessionLog,
    reported: oneshot::Sender<()>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    TokioSpawn(async move {
        let port = read_port_report(reader).await;
        if port.is_empty() {
            debug!("Port report closed without a port, keeping {}", port_state.current());
            return;
        }
        log.line(format!("Got dynamic els port: {port}"));
        port_state.replace(port);
        // The launch cycle may already be over.
        let _ = reported.send(());
    })
}
