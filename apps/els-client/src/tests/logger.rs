// Unit tests for logger module initialization logic
// Tests focus on idempotence and error handling

use crate::error::ElsClientError;
use crate::logger::{LOG_FILE_NAME, initialize, level_for, open_log_file};

use std::path::PathBuf;

use log::LevelFilter;
use tempfile::tempdir;

/// **VALUE**: Verifies that calling initialize() multiple times doesn't panic or fail.
///
/// **WHY THIS MATTERS**: fern refuses to install a second global logger. If the
/// guard is lost, a second call would surface as a startup failure.
///
/// **BUG THIS CATCHES**: Would catch if the Once or AtomicBool guards are removed.
#[test]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A valid temporary directory
    let dir = tempdir().unwrap();

    // WHEN: Calling initialize twice
    let result1 = initialize(dir.path(), LevelFilter::Debug);
    let result2 = initialize(dir.path(), LevelFilter::Trace);

    // THEN: Both return Ok and the log file exists
    assert!(result1.is_ok(), "First initialization should succeed");
    assert!(result2.is_ok(), "Second initialization should succeed (idempotent)");
    assert!(dir.path().join(LOG_FILE_NAME).exists());
}

/// **VALUE**: An unwritable log location is an error, not a panic.
///
/// **BUG THIS CATCHES**: Would catch `fern::log_file()` being unwrapped.
#[test]
fn given_invalid_log_path_when_opened_then_returns_client_error() {
    // GIVEN: A path below a character device
    let invalid = PathBuf::from("/dev/null/invalid-path").join(LOG_FILE_NAME);

    // WHEN: Opening the log file
    let result = open_log_file(&invalid);

    // THEN: A Client error naming the path
    match result {
        Err(ElsClientError::Client { message, .. }) => {
            assert!(message.contains("/dev/null/invalid-path"));
        }
        other => panic!("expected Client error, got {other:?}"),
    }
}

#[test]
fn given_verbose_flag_when_level_chosen_then_is_trace() {
    assert_eq!(level_for(true), LevelFilter::Trace);
    assert!(level_for(false) < LevelFilter::Trace);
}
