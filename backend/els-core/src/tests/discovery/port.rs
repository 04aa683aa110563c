// Unit tests for the port-report reader
// Integration tests for resolve_port are in integration_tests/discovery/port.rs

use crate::discovery::PortState;
use crate::discovery::port::{read_port_report, watch_port_report};
use crate::output::{MemorySink, SessionLog};

use std::sync::Arc;

use tokio::io::{AsyncWriteExt, duplex};
use tokio::sync::oneshot;

/// **VALUE**: The server may write its port in several fragments; only the
/// concatenation at close is meaningful.
///
/// **BUG THIS CATCHES**: Would catch a reader that publishes the first chunk
/// ("123") instead of waiting for end-of-stream ("1234").
#[tokio::test]
async fn given_fragmented_report_when_stream_closes_then_returns_concatenation() {
    // GIVEN: A stream receiving "123" then "4"
    let (mut writer, reader) = duplex(64);
    writer.write_all(b"123").await.unwrap();
    writer.write_all(b"4").await.unwrap();
    drop(writer);

    // WHEN: Reading the report
    let port = read_port_report(reader).await;

    // THEN: Both fragments are joined
    assert_eq!(port, "1234");
}

#[tokio::test]
async fn given_report_with_whitespace_when_read_then_trims() {
    let (mut writer, reader) = duplex(64);
    writer.write_all(b"  9527\n").await.unwrap();
    drop(writer);

    assert_eq!(read_port_report(reader).await, "9527");
}

/// **VALUE**: A launched server that closes its report stream without writing
/// anything must not wipe out the configured port.
#[tokio::test]
async fn given_empty_report_when_watched_then_port_state_unchanged() {
    // GIVEN: A port state seeded with the configured port
    let state = PortState::new("9000");
    let (mut writer, reader) = duplex(64);

    // WHEN: The report closes holding only whitespace
    let (reported_tx, reported_rx) = oneshot::channel();
    let watcher = watch_port_report(reader, state.clone(), SessionLog::console(), reported_tx);
    writer.write_all(b" \n").await.unwrap();
    drop(writer);
    watcher.await.unwrap();

    // THEN: The configured port survives and no report is signalled
    assert_eq!(state.current(), "9000");
    assert!(reported_rx.await.is_err());
}

#[tokio::test]
async fn given_fragmented_report_when_watched_then_port_state_replaced_and_logged() {
    // GIVEN: A session log backed by memory
    let sink = MemorySink::new();
    let log = SessionLog::new(Arc::new(sink.clone()));
    let state = PortState::new("9000");
    let (mut writer, reader) = duplex(64);

    // WHEN: The report streams "123", "4" and closes
    let (reported_tx, reported_rx) = oneshot::channel();
    let watcher = watch_port_report(reader, state.clone(), log, reported_tx);
    writer.write_all(b"123").await.unwrap();
    writer.write_all(b"4").await.unwrap();
    drop(writer);
    watcher.await.unwrap();

    // THEN: The state holds the joined port, the log mentions it, and the
    // launch that owns this reader is told
    assert_eq!(state.current(), "1234");
    assert!(sink.contents().contains("Got dynamic els port: 1234\n"));
    assert!(reported_rx.await.is_ok());
}

/// **VALUE**: Until the stream closes the reported port is not final; a
/// reader cancelled mid-report must leave the state alone.
#[tokio::test]
async fn given_open_report_when_watcher_aborted_then_port_state_unchanged() {
    let state = PortState::new("9000");
    let (mut writer, reader) = duplex(64);

    let (reported_tx, reported_rx) = oneshot::channel();
    let watcher = watch_port_report(reader, state.clone(), SessionLog::console(), reported_tx);
    writer.write_all(b"4711").await.unwrap();
    watcher.abort();
    let _ = watcher.await;
    drop(writer);

    assert_eq!(state.current(), "9000");
    assert!(reported_rx.await.is_err());
}
