use crate::helpers::{fast_config, free_port, memory_log, sh};

use els_core::error::connect::ConnectError;
use els_core::error::establish::EstablishError;
use els_core::error::query::ConfigQueryError;
use els_core::session::Session;

use std::time::Duration;

use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;

/// **VALUE**: A server that is already up must be used as-is.
///
/// **WHY THIS MATTERS**: Spawning a second server next to a healthy one would
/// fight over the port and the workspace state.
///
/// **BUG THIS CATCHES**: Would catch a loop that launches before its first
/// connect attempt.
#[tokio::test]
async fn given_listener_on_configured_port_when_establish_called_then_connects_without_spawning() {
    // GIVEN: A listener already bound on the port the query reports
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let work_dir = tempdir().unwrap();
    let (_sink, log) = memory_log();
    let config = fast_config(sh(&format!("echo {port}")), sh("exec sleep 30"), 3);
    let mut session = Session::new(config, work_dir.path(), log);

    // WHEN: Establishing
    let mut channel = session.establish().await.unwrap();

    // THEN: First attempt wins, nothing was launched, and bytes flow
    assert_eq!(channel.port(), port.to_string());
    assert_eq!(channel.attempt(), 1);
    assert_eq!(session.supervisor().launch_count(), 0);

    let (mut server_side, _) = listener.accept().await.unwrap();
    server_side.write_all(b"Content-Length: 2\r\n\r\n{}").await.unwrap();
    let mut buf = [0u8; 23];
    channel.reader().read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"Content-Length: 2\r\n\r\n{}");
}

/// **VALUE**: With no server ever reachable the loop must spend exactly its
/// budget, launching once per cycle, and report the last connect failure.
///
/// **BUG THIS CATCHES**: Would catch an off-by-one in the attempt budget, a
/// loop that stops launching after the first cycles, or an error that hides
/// which port was tried last.
#[tokio::test]
async fn given_no_listener_when_budget_exhausted_then_launches_once_per_cycle_and_reports_last_error() {
    // GIVEN: A port nobody serves and a launch command that never listens
    let port = free_port().await;
    let work_dir = tempdir().unwrap();
    let (sink, log) = memory_log();
    let config = fast_config(sh(&format!("echo {port}")), sh("exec sleep 30"), 3);
    let mut session = Session::new(config, work_dir.path(), log);

    // WHEN: Establishing
    let result = session.establish().await;

    // THEN: Exhausted after three cycles with three launches
    match result {
        Err(EstablishError::Exhausted { attempts, last, .. }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(last, ConnectError::Io { .. }));
            assert_eq!(last.port(), port.to_string());
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
    assert_eq!(session.supervisor().launch_count(), 3);

    let output = sink.contents();
    assert_eq!(output.matches("Launching els server ... ").count(), 2);
    assert_eq!(output.matches("Try launching els server again ... ").count(), 1);
    assert_eq!(output.matches("Waiting ").count(), 3);

    // AND: Stopping leaves no tracked process
    session.stop().await;
    assert!(session.supervisor().current_pid().is_none());
}

/// **VALUE**: In no-launch mode the client only waits and reconnects.
#[tokio::test]
async fn given_no_launch_mode_when_establish_fails_then_never_spawns() {
    // GIVEN: no_launch set and a launch command that would leave a trace
    let port = free_port().await;
    let work_dir = tempdir().unwrap();
    let marker = work_dir.path().join("launched");
    let (_sink, log) = memory_log();
    let mut config = fast_config(
        sh(&format!("echo {port}")),
        sh(&format!("touch {}", marker.display())),
        4,
    );
    config.no_launch = true;
    let mut session = Session::new(config, work_dir.path(), log);

    // WHEN: Establishing
    let result = session.establish().await;

    // THEN: All four cycles fail without any spawn
    assert!(matches!(result, Err(EstablishError::Exhausted { attempts: 4, .. })));
    assert_eq!(session.supervisor().launch_count(), 0);
    assert!(!marker.exists(), "no-launch mode must not run the launch command");
}

/// **VALUE**: End-to-end dynamic port relocation. The configured port is
/// stale, the launched server announces a different port in two fragments on
/// fd 3, and the second attempt lands there.
///
/// **BUG THIS CATCHES**: Would catch the report fd not being wired into the
/// child, fragments not being concatenated, the new port not being picked up
/// by the next attempt, or the wait not ending early once the report closed
/// (the step here is far longer than the test timeout).
#[tokio::test]
async fn given_stale_port_when_server_reports_dynamic_port_then_second_attempt_connects_there() {
    // GIVEN: A listener on the "dynamic" port and a stale configured port
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dynamic = listener.local_addr().unwrap().port().to_string();
    let stale = free_port().await;
    let (head, tail) = dynamic.split_at(2);
    let script = format!("printf {head} >&3; printf {tail} >&3; exec 3>&-; exec sleep 30");

    let work_dir = tempdir().unwrap();
    let (sink, log) = memory_log();
    let mut config = fast_config(sh(&format!("echo {stale}")), sh(&script), 3);
    config.retry.step_ms = 60_000;
    config.retry.max_wait_ms = None;
    let mut session = Session::new(config, work_dir.path(), log);

    let accept = tokio::spawn(async move { listener.accept().await.map(|(stream, _)| stream) });

    // WHEN: Establishing
    let channel = timeout(Duration::from_secs(10), session.establish())
        .await
        .expect("port report should end the wait early")
        .unwrap();

    // THEN: Connected on the second attempt to the reported port
    assert_eq!(channel.port(), dynamic);
    assert_eq!(channel.attempt(), 2);
    assert_eq!(session.port_state().current(), dynamic);
    assert!(accept.await.unwrap().is_ok());
    assert!(sink.contents().contains(&format!("Got dynamic els port: {dynamic}")));

    session.stop().await;
}

/// **VALUE**: A failing port query is fatal at once: no connect attempt, no
/// launch, no retry.
#[tokio::test]
async fn given_failing_port_query_when_establish_called_then_fails_immediately() {
    // GIVEN: A query command exiting with status 1
    let work_dir = tempdir().unwrap();
    let (sink, log) = memory_log();
    let config = fast_config(sh("exit 1"), sh("exec sleep 30"), 3);
    let mut session = Session::new(config, work_dir.path(), log);

    // WHEN: Establishing
    let result = session.establish().await;

    // THEN: A query error, and the loop never started
    assert!(matches!(
        result,
        Err(EstablishError::Query(ConfigQueryError::ExitStatus { code: Some(1), .. }))
    ));
    assert_eq!(session.supervisor().launch_count(), 0);
    assert!(!sink.contents().contains("Try connecting"));
}

/// **VALUE**: A launch failure is swallowed; the loop keeps cycling and the
/// final error is still the connect failure.
#[tokio::test]
async fn given_missing_server_binary_when_establish_called_then_retries_and_reports_connect_error() {
    let port = free_port().await;
    let work_dir = tempdir().unwrap();
    let (sink, log) = memory_log();
    let config = fast_config(
        sh(&format!("echo {port}")),
        vec!["/nonexistent/els-server".to_string()],
        2,
    );
    let mut session = Session::new(config, work_dir.path(), log);

    let result = session.establish().await;

    let err = result.expect_err("nothing can be reached");
    assert!(err.last_connect_error().is_some());
    assert_eq!(session.supervisor().launch_count(), 2);
    assert_eq!(sink.contents().matches("Failed launching els server").count(), 2);
}
