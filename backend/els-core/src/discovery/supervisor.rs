//! Launching and tracking the els server process.
//!
//! At most one server is current. [`Supervisor::ensure_server_running`]
//! terminates the tracked process before spawning its replacement, so a
//! relaunch never leaves two servers behind.
//!
//! The child gets four streams: stdin inherited from this process (unless
//! [`LaunchConfig::inherit_stdin`] is off), stdout
//! and stderr piped into the session log, and fd 3 piped into a port-report
//! reader that publishes a dynamically chosen port into [`PortState`].

use crate::config::{EnvOverride, LaunchConfig};
use crate::discovery::PortState;
use crate::discovery::port::watch_port_report;
use crate::discovery::process::{Signal, format_command, signal_pid};
use crate::error::launch::LaunchError;
use crate::output::SessionLog;

use common::ErrorLocation;

use std::io::{Error as IoError, PipeWriter, Result as IoResult, pipe};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::unix::pipe::Receiver as PipeReceiver;
use tokio::process::Child as TokioChild;
use tokio::process::Command as TokioCommand;
use tokio::spawn as TokioSpawn;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Descriptor number the server writes its dynamic port to.
pub const PORT_REPORT_FD: RawFd = 3;

const OUTPUT_CHUNK_SIZE: usize = 8192;

/// A spawned server and the tasks attached to its streams.
///
/// Dropping the handle kills the process.
pub struct ServerProcess {
    pid: u32,
    debug: bool,
    kill_tx: Option<oneshot::Sender<()>>,
    watcher: Option<JoinHandle<()>>,
    port_report: Option<JoinHandle<()>>,
    port_reported: Option<oneshot::Receiver<()>>,
    output_pumps: Vec<JoinHandle<()>>,
}

impl ServerProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Completes once this process has published a port. Can be taken once.
    pub fn take_port_reported(&mut self) -> Option<oneshot::Receiver<()>> {
        self.port_reported.take()
    }

    /// Force-kill the process and wait until it is reaped.
    ///
    /// Idempotent and infallible. The port-report reader is cancelled first
    /// so the stream closing on death cannot publish a stale port.
    pub async fn terminate(&mut self) {
        if let Some(reader) = self.port_report.take() {
            reader.abort();
        }

        let Some(kill_tx) = self.kill_tx.take() else {
            return;
        };

        debug!("Killing els server pid={}", self.pid);
        // The watcher is gone when the process already exited on its own.
        let _ = kill_tx.send(());

        if let Some(watcher) = self.watcher.take()
            && let Err(e) = watcher.await
        {
            debug!("Exit watcher for pid={} ended abnormally: {e}", self.pid);
        }
    }

    /// Best-effort signal delivery; see [`signal_pid`].
    pub fn signal(&self, signal: Signal) -> bool {
        self.kill_tx.is_some() && signal_pid(self.pid, signal)
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        if let Some(reader) = self.port_report.take() {
            reader.abort();
        }
        for pump in self.output_pumps.drain(..) {
            pump.abort();
        }
        // Dropping kill_tx wakes the watcher, which kills the child.
    }
}

/// Owns the current server process for one session.
pub struct Supervisor {
    work_dir: PathBuf,
    launch: LaunchConfig,
    port_state: PortState,
    log: SessionLog,
    current: Option<ServerProcess>,
    launches: u32,
}

impl Supervisor {
    pub fn new(
        work_dir: impl Into<PathBuf>,
        launch: LaunchConfig,
        port_state: PortState,
        log: SessionLog,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            launch,
            port_state,
            log,
            current: None,
            launches: 0,
        }
    }

    /// Terminate any tracked server, then spawn a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError`] when the process cannot be started; nothing is
    /// tracked afterwards in that case.
    pub async fn ensure_server_running(&mut self, debug: bool) -> Result<&mut ServerProcess, LaunchError> {
        self.terminate().await;
        self.launches += 1;

        let argv = self.launch.command(debug).to_vec();
        let debug_env = debug.then_some(&self.launch.debug_env);

        let launched = spawn_server(&argv, &self.work_dir, debug_env, self.launch.inherit_stdin)
            .and_then(|(child, port_report)| self.track(child, port_report, debug));

        match launched {
            Ok(process) => {
                self.log.line(format!("Launched els server pid={}", process.pid));
                Ok(self.current.insert(process))
            }
            Err(e) => {
                self.log.line(format!("Failed launching els server: {e}"));
                Err(e)
            }
        }
    }

    /// Terminate the tracked server, if any. Never fails.
    pub async fn terminate(&mut self) {
        if let Some(mut process) = self.current.take() {
            process.terminate().await;
        }
    }

    /// Forward `signal` to the tracked server. `false` when none is tracked
    /// or delivery failed.
    pub fn forward_signal(&self, signal: Signal) -> bool {
        self.current
            .as_ref()
            .is_some_and(|process| process.signal(signal))
    }

    pub fn current_pid(&self) -> Option<u32> {
        self.current.as_ref().map(ServerProcess::pid)
    }

    /// Number of spawn attempts made, successful or not.
    pub fn launch_count(&self) -> u32 {
        self.launches
    }

    fn track(
        &self,
        mut child: TokioChild,
        port_report: OwnedFd,
        debug: bool,
    ) -> Result<ServerProcess, LaunchError> {
        let pid = child.id().unwrap_or_default();

        let mut output_pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            output_pumps.push(pump_output(stdout, self.log.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            output_pumps.push(pump_output(stderr, self.log.clone()));
        }

        let receiver = PipeReceiver::from_owned_fd(port_report).map_err(|e| LaunchError::Pipe {
            message: format!("Failed to watch port report of pid={pid}: {e}"),
            location: ErrorLocation::from(Location::caller()),
            source: Box::new(e),
        })?;
        let (reported_tx, reported_rx) = oneshot::channel();
        let port_report = watch_port_report(
            receiver,
            self.port_state.clone(),
            self.log.clone(),
            reported_tx,
        );

        let (kill_tx, kill_rx) = oneshot::channel();
        let watcher = watch_exit(child, pid, kill_rx, self.log.clone());

        Ok(ServerProcess {
            pid,
            debug,
            kill_tx: Some(kill_tx),
            watcher: Some(watcher),
            port_report: Some(port_report),
            port_reported: Some(reported_rx),
            output_pumps,
        })
    }
}

pub(crate) fn build_launch_command(
    argv: &[String],
    work_dir: &Path,
    debug_env: Option<&EnvOverride>,
    inherit_stdin: bool,
) -> Result<TokioCommand, LaunchError> {
    let (program, args) = argv.split_first().ok_or_else(|| LaunchError::EmptyCommand {
        message: "els launch command is empty".to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let mut cmd = TokioCommand::new(program);
    cmd.args(args)
        .current_dir(work_dir)
        .stdin(if inherit_stdin { Stdio::inherit() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(env) = debug_env {
        cmd.env(&env.name, &env.value);
    }

    Ok(cmd)
}

fn spawn_server(
    argv: &[String],
    work_dir: &Path,
    debug_env: Option<&EnvOverride>,
    inherit_stdin: bool,
) -> Result<(TokioChild, OwnedFd), LaunchError> {
    let mut cmd = build_launch_command(argv, work_dir, debug_env, inherit_stdin)?;

    let (reader, writer) = pipe().map_err(|e| LaunchError::Pipe {
        message: format!("Failed to create port report pipe: {e}"),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(e),
    })?;
    attach_port_report(&mut cmd, &writer);

    debug!("Spawning `{}` in {}", format_command(argv), work_dir.display());

    let child = cmd.spawn().map_err(|e| LaunchError::Spawn {
        message: format!("Failed to spawn `{}`: {e}", format_command(argv)),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(e),
    })?;

    // Only the child may hold the write end, or the report never closes.
    drop(writer);

    Ok((child, reader.into()))
}

fn attach_port_report(cmd: &mut TokioCommand, writer: &PipeWriter) {
    let write_fd = writer.as_raw_fd();
    // SAFETY: the hook only calls async-signal-safe fcntl/dup2.
    unsafe {
        cmd.pre_exec(move || expose_as_port_report_fd(write_fd));
    }
}

/// Runs in the forked child: make `fd` available as [`PORT_REPORT_FD`]
/// across exec.
fn expose_as_port_report_fd(fd: RawFd) -> IoResult<()> {
    if fd == PORT_REPORT_FD {
        // SAFETY: plain fcntl calls on a descriptor we own.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        if flags < 0 || unsafe { libc::fcntl(fd, libc::F_SETFD, flags & !libc::FD_CLOEXEC) } < 0 {
            return Err(IoError::last_os_error());
        }
        return Ok(());
    }

    // SAFETY: dup2 onto a fixed descriptor number; clears FD_CLOEXEC on it.
    if unsafe { libc::dup2(fd, PORT_REPORT_FD) } < 0 {
        return Err(IoError::last_os_error());
    }
    Ok(())
}

fn pump_output<R>(mut reader: R, log: SessionLog) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    TokioSpawn(async move {
        let mut chunk = vec![0u8; OUTPUT_CHUNK_SIZE];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => log.raw(&String::from_utf8_lossy(&chunk[..n])),
                Err(e) => {
                    debug!("els output stream failed: {e}");
                    break;
                }
            }
        }
    })
}

fn watch_exit(
    mut child: TokioChild,
    pid: u32,
    kill_rx: oneshot::Receiver<()>,
    log: SessionLog,
) -> JoinHandle<()> {
    TokioSpawn(async move {
        tokio::select! {
            status = child.wait() => match status {
                Ok(status) => log.line(format!("els server exited pid={pid} {status}")),
                Err(e) => warn!("Failed waiting on els server pid={pid}: {e}"),
            },
            _ = kill_rx => {
                if let Err(e) = child.kill().await {
                    debug!("Kill of els server pid={pid} failed: {e}");
                }
            }
        }
    })
}
