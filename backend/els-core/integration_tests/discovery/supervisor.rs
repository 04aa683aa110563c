use crate::helpers::{memory_log, sh, wait_for_output};

use els_core::config::LaunchConfig;
use els_core::discovery::PortState;
use els_core::discovery::process::{Signal, is_process_alive, signal_pid};
use els_core::discovery::supervisor::Supervisor;
use els_core::error::launch::LaunchError;

use std::time::Duration;

use tempfile::tempdir;
use tokio::time::timeout;

fn launch(script: &str) -> LaunchConfig {
    LaunchConfig {
        normal: sh(script),
        debug: sh(&format!("echo debug-mode; {script}")),
        ..LaunchConfig::default()
    }
}

/// **VALUE**: Relaunching must never leave two servers running.
///
/// **WHY THIS MATTERS**: Each retry cycle relaunches; an orphan per cycle
/// would pile up processes all competing for the same port.
///
/// **BUG THIS CATCHES**: Would catch a supervisor that spawns before killing,
/// or one that forgets the previous handle.
#[tokio::test]
async fn given_running_server_when_relaunched_twice_then_only_latest_process_is_alive() {
    // GIVEN: A supervisor launching a long-lived process
    let dir = tempdir().unwrap();
    let (_sink, log) = memory_log();
    let mut supervisor = Supervisor::new(dir.path(), launch("exec sleep 30"), PortState::default(), log);

    // WHEN: Launching three times
    let first = supervisor.ensure_server_running(false).await.unwrap().pid();
    let second = supervisor.ensure_server_running(false).await.unwrap().pid();
    let third = supervisor.ensure_server_running(false).await.unwrap().pid();

    // THEN: Only the latest one is alive and tracked
    assert_ne!(first, second);
    assert_ne!(second, third);
    assert!(!is_process_alive(first), "first server must be gone");
    assert!(!is_process_alive(second), "second server must be gone");
    assert!(is_process_alive(third), "latest server must be running");
    assert_eq!(supervisor.current_pid(), Some(third));
    assert_eq!(supervisor.launch_count(), 3);

    // AND: Terminating clears it
    supervisor.terminate().await;
    assert!(!is_process_alive(third));
    assert!(supervisor.current_pid().is_none());
}

/// **VALUE**: Termination is best-effort and idempotent; calling it on an
/// idle supervisor or twice in a row never fails.
#[tokio::test]
async fn given_no_server_when_terminated_repeatedly_then_nothing_happens() {
    let dir = tempdir().unwrap();
    let mut supervisor = Supervisor::new(
        dir.path(),
        launch("exec sleep 30"),
        PortState::default(),
        Default::default(),
    );

    supervisor.terminate().await;
    supervisor.terminate().await;

    assert!(supervisor.current_pid().is_none());
    assert!(!supervisor.forward_signal(Signal::Term));
}

#[tokio::test]
async fn given_exited_server_when_terminated_then_does_not_fail() {
    // GIVEN: A server that exits on its own
    let dir = tempdir().unwrap();
    let (sink, log) = memory_log();
    let mut supervisor = Supervisor::new(dir.path(), launch("exit 3"), PortState::default(), log);
    let pid = supervisor.ensure_server_running(false).await.unwrap().pid();

    // WHEN: Its exit has been observed
    wait_for_output(&sink, &format!("els server exited pid={pid}")).await;

    // THEN: Terminating the dead handle is a no-op
    supervisor.terminate().await;
    assert!(supervisor.current_pid().is_none());
}

/// **VALUE**: stdout and stderr of the server end up in the session output.
#[tokio::test]
async fn given_server_output_when_running_then_forwarded_to_sink() {
    let dir = tempdir().unwrap();
    let (sink, log) = memory_log();
    let mut supervisor = Supervisor::new(
        dir.path(),
        launch("echo els-out; echo els-err >&2; exec sleep 30"),
        PortState::default(),
        log,
    );

    let pid = supervisor.ensure_server_running(false).await.unwrap().pid();

    wait_for_output(&sink, "els-out\n").await;
    wait_for_output(&sink, "els-err\n").await;
    assert!(sink.contents().contains(&format!("Launched els server pid={pid}")));

    supervisor.terminate().await;
}

/// **VALUE**: Debug mode runs the debug command line with the verbose
/// logging override in its environment.
#[tokio::test]
async fn given_debug_mode_when_launched_then_uses_debug_command_and_env() {
    // GIVEN: A launch config whose server prints its log level
    let dir = tempdir().unwrap();
    let (sink, log) = memory_log();
    let mut supervisor = Supervisor::new(
        dir.path(),
        launch("echo level=$EDH_LOG_LEVEL; exec sleep 30"),
        PortState::default(),
        log,
    );

    // WHEN: Launching in debug mode
    let process = supervisor.ensure_server_running(true).await.unwrap();
    assert!(process.is_debug());

    // THEN: The debug argv ran with EDH_LOG_LEVEL=DEBUG
    wait_for_output(&sink, "level=DEBUG\n").await;
    assert!(sink.contents().contains("debug-mode\n"));

    supervisor.terminate().await;
}

/// **VALUE**: A relaunch resets the port accumulator: a report from the
/// killed server must never surface after its replacement started.
#[tokio::test]
async fn given_unfinished_report_when_relaunched_then_stale_report_is_discarded() {
    // GIVEN: A server that writes a partial port but never closes fd 3
    let dir = tempdir().unwrap();
    let (_sink, log) = memory_log();
    let port_state = PortState::new("9000");
    let mut supervisor = Supervisor::new(
        dir.path(),
        launch("printf 4711 >&3; exec sleep 30"),
        port_state.clone(),
        log,
    );
    supervisor.ensure_server_running(false).await.unwrap();

    // WHEN: Relaunching (the old server dies and its fd 3 closes)
    supervisor.ensure_server_running(false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // THEN: The killed server's partial report never reached the port state
    assert_eq!(port_state.current(), "9000");

    supervisor.terminate().await;
}

/// **VALUE**: With stdin handing off disabled the server reads end of file
/// instead of competing for this process's stdin.
///
/// **BUG THIS CATCHES**: Would catch `inherit_stdin` being ignored, which in
/// the stdio bridge lets the server swallow the editor's protocol bytes.
#[tokio::test]
async fn given_stdin_not_inherited_when_launched_then_server_sees_closed_stdin() {
    // GIVEN: A server that reports whether it could read a line
    let dir = tempdir().unwrap();
    let (sink, log) = memory_log();
    let config = LaunchConfig {
        inherit_stdin: false,
        ..launch("if read line; then echo stdin-open; else echo stdin-closed; fi; exec sleep 30")
    };
    let mut supervisor = Supervisor::new(dir.path(), config, PortState::default(), log);

    // WHEN: Launching
    supervisor.ensure_server_running(false).await.unwrap();

    // THEN: Its stdin was at end of file
    wait_for_output(&sink, "stdin-closed\n").await;
    assert!(!sink.contents().contains("stdin-open"));

    supervisor.terminate().await;
}

#[tokio::test]
async fn given_missing_binary_when_launched_then_returns_spawn_error_and_tracks_nothing() {
    let dir = tempdir().unwrap();
    let (sink, log) = memory_log();
    let config = LaunchConfig {
        normal: vec!["/nonexistent/els".to_string()],
        ..LaunchConfig::default()
    };
    let mut supervisor = Supervisor::new(dir.path(), config, PortState::default(), log);

    let result = supervisor.ensure_server_running(false).await;

    assert!(matches!(result, Err(LaunchError::Spawn { .. })));
    assert!(supervisor.current_pid().is_none());
    assert_eq!(supervisor.launch_count(), 1);
    assert!(sink.contents().contains("Failed launching els server"));
}

/// **VALUE**: The termination signal handler relies on forwarding SIGTERM to
/// the tracked server.
#[tokio::test]
async fn given_running_server_when_sigterm_forwarded_then_server_exits() {
    // GIVEN: A running server
    let dir = tempdir().unwrap();
    let (sink, log) = memory_log();
    let mut supervisor = Supervisor::new(dir.path(), launch("exec sleep 30"), PortState::default(), log);
    let pid = supervisor.ensure_server_running(false).await.unwrap().pid();

    // WHEN: Forwarding SIGTERM
    let sent = supervisor.forward_signal(Signal::Term);

    // THEN: It was delivered and the exit gets logged
    assert!(sent);
    timeout(
        Duration::from_secs(5),
        wait_for_output(&sink, &format!("els server exited pid={pid}")),
    )
    .await
    .unwrap();

    supervisor.terminate().await;
}

#[test]
fn given_reserved_pids_when_signalled_then_refuses() {
    assert!(!signal_pid(0, Signal::Term));
    assert!(!signal_pid(1, Signal::Kill));
}

#[test]
fn given_nonexistent_pid_when_signalled_then_returns_false() {
    assert!(!signal_pid(u32::MAX, Signal::Term));
    assert!(!is_process_alive(u32::MAX));
}
