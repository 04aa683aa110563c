use crate::ELS_SERVER_LOG_FILE;
use crate::output::{FileSink, LogSink, MemorySink, SessionLog};

use std::fs::read_to_string;
use std::sync::Arc;

use tempfile::tempdir;

#[test]
fn given_sink_when_line_logged_then_appends_trailing_newline() {
    let sink = MemorySink::new();
    let log = SessionLog::new(Arc::new(sink.clone()));

    log.line("Obtaining els config ...");
    log.line("Got configured els port 9000");

    assert_eq!(
        sink.contents(),
        "Obtaining els config ...\nGot configured els port 9000\n"
    );
}

/// **VALUE**: Server output is forwarded as received; adding newlines would
/// split the server's own lines in the middle.
#[test]
fn given_sink_when_raw_text_forwarded_then_written_unchanged() {
    let sink = MemorySink::new();
    let log = SessionLog::new(Arc::new(sink.clone()));

    log.raw("partial ");
    log.raw("line\n");

    assert_eq!(sink.contents(), "partial line\n");
}

/// **VALUE**: The file sink is append-only across sessions; reopening must not
/// truncate the trail of earlier attempts.
#[test]
fn given_existing_log_file_when_sink_reopened_then_appends() {
    // GIVEN: A sink that already wrote one line
    let dir = tempdir().unwrap();
    let first = FileSink::open(dir.path()).unwrap();
    first.append("first\n");
    drop(first);

    // WHEN: Reopening and writing again
    let second = FileSink::open(dir.path()).unwrap();
    second.append("second\n");

    // THEN: Both lines are present, in order
    assert_eq!(second.path(), dir.path().join(ELS_SERVER_LOG_FILE));
    let contents = read_to_string(second.path()).unwrap();
    assert_eq!(contents, "first\nsecond\n");
}

#[test]
fn given_console_log_when_lines_logged_then_does_not_panic() {
    let log = SessionLog::console();

    log.line("no sink yet");
    log.raw("raw output\n");
}
