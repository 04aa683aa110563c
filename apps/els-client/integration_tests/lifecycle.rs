use crate::helpers::{config, launched_pid, memory_log, sh};

use els_client::bridge::BridgeEnd;
use els_client::error::ElsClientError;
use els_client::lifecycle::{SessionEnd, run_session};

use els_core::discovery::process::is_process_alive;
use els_core::session::Session;

use std::future::pending;
use std::time::Duration;

use tempfile::tempdir;
use tokio::io::{AsyncWriteExt, duplex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};

/// **VALUE**: The full start hook: query, connect to an already running
/// server, bridge, then finish when the server hangs up.
#[tokio::test]
async fn given_running_server_when_session_runs_then_bridges_until_server_closes() {
    // GIVEN: A listening server announced by the port query
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let dir = tempdir().unwrap();
    let (_sink, log) = memory_log();
    let session = Session::new(
        config(sh(&format!("echo {port}")), sh("exit 1"), 50, 3),
        dir.path(),
        log,
    );
    let (_editor_in, client_in) = duplex(64);
    let (client_out, _editor_out) = duplex(64);

    // WHEN: The server accepts and immediately hangs up
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.shutdown().await.unwrap();
    });
    let end = timeout(
        Duration::from_secs(5),
        run_session(session, client_in, client_out, pending()),
    )
    .await
    .unwrap()
    .unwrap();

    // THEN: The session ended through the bridge
    server.await.unwrap();
    assert_eq!(end, SessionEnd::Bridged(BridgeEnd::ServerClosed));
}

/// **VALUE**: A termination request during the retry wait stops the launched
/// server instead of leaving it running.
///
/// **BUG THIS CATCHES**: Would catch the stop hook being skipped when the
/// establish future is cancelled.
#[tokio::test]
async fn given_launched_server_when_shutdown_requested_then_server_is_stopped() {
    // GIVEN: Nothing listens, the launched server never opens the port,
    // and the retry wait is long
    let dir = tempdir().unwrap();
    let (sink, log) = memory_log();
    let session = Session::new(
        config(sh("echo 1"), sh("exec sleep 30"), 60_000, 3),
        dir.path(),
        log,
    );
    let (_editor_in, client_in) = duplex(64);
    let (client_out, _editor_out) = duplex(64);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let run = tokio::spawn(run_session(session, client_in, client_out, async move {
        let _ = shutdown_rx.await;
    }));

    // WHEN: A server was launched and termination is requested
    let pid = timeout(Duration::from_secs(5), async {
        loop {
            if let Some(pid) = launched_pid(&sink.contents()) {
                break pid;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    shutdown_tx.send(()).unwrap();

    // THEN: The session reports termination and the server is gone
    let end = timeout(Duration::from_secs(5), run).await.unwrap().unwrap().unwrap();
    assert_eq!(end, SessionEnd::Terminated);
    assert!(!is_process_alive(pid), "launched server must be stopped");
}

#[tokio::test]
async fn given_failing_port_query_when_session_runs_then_returns_core_error() {
    let dir = tempdir().unwrap();
    let (_sink, log) = memory_log();
    let session = Session::new(
        config(sh("exit 1"), sh("exit 1"), 50, 3),
        dir.path(),
        log,
    );
    let (_editor_in, client_in) = duplex(64);
    let (client_out, _editor_out) = duplex(64);

    let result = run_session(session, client_in, client_out, pending()).await;

    assert!(matches!(result, Err(ElsClientError::Core { .. })));
}
