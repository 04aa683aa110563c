// Unit tests for the single connect attempt and for the retry loop driven
// through a substitute connect step.
// End-to-end runs are in integration_tests/connect/establish.rs

use crate::config::{BackoffShape, ClientConfig, RetryConfig};
use crate::connect::establish::{connect_once, establish_with};
use crate::error::connect::ConnectError;
use crate::output::{MemorySink, SessionLog};
use crate::session::Session;

use std::io::{Error as IoError, ErrorKind};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tempfile::tempdir;
use tokio::net::TcpListener;
use tokio::task::yield_now;

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

fn loop_config(no_launch: bool, policy: BackoffShape, wait_ms: u64) -> ClientConfig {
    let mut config = ClientConfig {
        host: "127.0.0.1".to_string(),
        no_launch,
        port_query: sh("echo 1"),
        retry: RetryConfig {
            policy,
            max_attempts: Some(3),
            wait_ms,
            step_ms: 10,
            max_wait_ms: Some(wait_ms),
        },
        ..ClientConfig::default()
    };
    config.launch.normal = sh("exec sleep 30");
    config.launch.debug = sh("exec sleep 30");
    config
}

fn refused(host: &str, port: &str) -> ConnectError {
    ConnectError::io(host, port, IoError::from(ErrorKind::ConnectionRefused))
}

#[tokio::test]
async fn given_non_numeric_port_when_connect_once_called_then_returns_invalid_port() {
    let result = connect_once("127.0.0.1", "els").await;

    match result {
        Err(ConnectError::InvalidPort { port, .. }) => assert_eq!(port, "els"),
        other => panic!("expected InvalidPort, got {other:?}"),
    }
}

#[tokio::test]
async fn given_port_zero_when_connect_once_called_then_returns_invalid_port() {
    let result = connect_once("127.0.0.1", "0").await;

    assert!(matches!(result, Err(ConnectError::InvalidPort { .. })));
}

/// **VALUE**: A refused connection must come back as a recoverable
/// `ConnectError::Io` naming the port, which the loop keeps as "last failure".
#[tokio::test]
async fn given_closed_port_when_connect_once_called_then_returns_io_error_with_port() {
    // GIVEN: A port that was just released
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port().to_string();
    drop(listener);

    // WHEN: Connecting to it
    let result = connect_once("127.0.0.1", &port).await;

    // THEN: An Io error carrying the port
    let err = result.expect_err("nothing listens on a released port");
    assert!(matches!(err, ConnectError::Io { .. }));
    assert_eq!(err.port(), port);
}

#[tokio::test]
async fn given_listener_when_connect_once_called_then_connects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port().to_string();

    let stream = connect_once("127.0.0.1", &port).await.unwrap();

    assert_eq!(stream.peer_addr().unwrap().port().to_string(), port);
}

/// **VALUE**: A port published while an attempt is in flight must not
/// retarget that attempt; it takes effect at the next attempt.
///
/// **WHY THIS MATTERS**: A dynamic port report can land at any moment. The
/// attempt in flight already chose its port, and its failure must be
/// reported against that port.
///
/// **BUG THIS CATCHES**: Would catch the loop re-reading the port state
/// after the connect started, or the next attempt reusing the old port.
#[tokio::test]
async fn given_port_replaced_during_connect_when_attempt_fails_then_next_attempt_uses_new_port() {
    // GIVEN: A configured port "1" and a live listener at another port
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let live = listener.local_addr().unwrap().port().to_string();
    let dir = tempdir().unwrap();
    let sink = MemorySink::new();
    let mut session = Session::new(
        loop_config(true, BackoffShape::Linear, 50),
        dir.path(),
        SessionLog::new(Arc::new(sink.clone())),
    );
    let port_state = session.port_state().clone();
    let attempted = Arc::new(Mutex::new(Vec::<String>::new()));
    let failed = Arc::new(Mutex::new(Vec::<String>::new()));

    // WHEN: The first attempt sees the port replaced before it fails
    let connect = {
        let attempted = attempted.clone();
        let failed = failed.clone();
        let live = live.clone();
        move |host: String, port: String| {
            let attempted = attempted.clone();
            let failed = failed.clone();
            let port_state = port_state.clone();
            let live = live.clone();
            async move {
                let first = {
                    let mut attempted = attempted.lock().unwrap();
                    attempted.push(port.clone());
                    attempted.len() == 1
                };
                if !first {
                    return connect_once(&host, &port).await;
                }
                port_state.replace(live);
                yield_now().await;
                let err = refused(&host, &port);
                failed.lock().unwrap().push(err.port().to_string());
                Err(err)
            }
        }
    };
    let channel = establish_with(&mut session, connect).await.unwrap();

    // THEN: The failed attempt kept its port; the second used the new one
    assert_eq!(*failed.lock().unwrap(), ["1"]);
    assert_eq!(*attempted.lock().unwrap(), ["1".to_string(), live.clone()]);
    assert_eq!(channel.port(), live);
    assert_eq!(channel.attempt(), 2);
    let output = sink.contents();
    assert!(output.contains("Try connecting to els on port 1\n"));
    assert!(output.contains(&format!("Connected to els on port {live}\n")));
}

/// **VALUE**: Only a port report from the server launched in this cycle may
/// cut the wait short.
///
/// **BUG THIS CATCHES**: Would catch the wait waking on any port change,
/// such as a late report from the server being replaced, which sends the
/// next attempt off before the fresh server had its full wait.
#[tokio::test]
async fn given_port_change_not_from_launched_server_when_waiting_then_full_wait_elapses() {
    // GIVEN: A launched server that never reports, and a 300ms fixed wait
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let live = listener.local_addr().unwrap().port().to_string();
    let dir = tempdir().unwrap();
    let mut session = Session::new(
        loop_config(false, BackoffShape::Fixed, 300),
        dir.path(),
        SessionLog::default(),
    );
    let port_state = session.port_state().clone();
    let calls = Arc::new(Mutex::new(0u32));

    // WHEN: The port changes during the first attempt, outside any launch
    let connect = {
        let calls = calls.clone();
        move |host: String, port: String| {
            let calls = calls.clone();
            let port_state = port_state.clone();
            let live = live.clone();
            async move {
                let call = {
                    let mut calls = calls.lock().unwrap();
                    *calls += 1;
                    *calls
                };
                if call > 1 {
                    return connect_once(&host, &port).await;
                }
                port_state.replace(live);
                Err(refused(&host, &port))
            }
        }
    };
    let started = Instant::now();
    let channel = establish_with(&mut session, connect).await.unwrap();
    let elapsed = started.elapsed();
    session.stop().await;

    // THEN: The second attempt waited out the whole backoff
    assert_eq!(channel.attempt(), 2);
    assert!(
        elapsed >= Duration::from_millis(300),
        "woke early after {elapsed:?}"
    );
}
