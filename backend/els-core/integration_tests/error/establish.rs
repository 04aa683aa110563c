use els_core::error::connect::ConnectError;
use els_core::error::establish::EstablishError;
use els_core::error::query::ConfigQueryError;

use std::error::Error;
use std::io::Error as IoError;
use std::io::ErrorKind;

/// **VALUE**: The exhausted error names the attempt count and keeps the last
/// connect failure as its source.
///
/// **WHY THIS MATTERS**: This is the only error a caller sees after a whole
/// retry budget; without the source chain the reason every attempt failed
/// is lost.
///
/// **BUG THIS CATCHES**: Would catch `#[source]` being removed from `last`
/// or `#[track_caller]` being removed from `exhausted()`.
#[test]
fn given_exhausted_error_when_formatted_then_includes_attempts_location_and_source() {
    // GIVEN: An exhausted error wrapping a refused connect
    let last = ConnectError::io(
        "localhost",
        "3721",
        IoError::new(ErrorKind::ConnectionRefused, "connection refused"),
    );
    let err = EstablishError::exhausted(10, last);

    // WHEN: Formatting and walking the chain
    let text = err.to_string();
    let source = err.source().expect("exhausted error has a source");

    // THEN: Attempts and location are in the message; the connect error is the source
    assert!(text.contains("after 10 attempts"));
    assert!(text.contains("establish.rs"));
    assert!(source.to_string().contains("localhost:3721"));
    assert_eq!(err.last_connect_error().map(ConnectError::port), Some("3721"));
}

#[test]
fn given_query_error_when_wrapped_then_is_transparent() {
    let query = ConfigQueryError::empty_output("epm x els-port");
    let expected = query.to_string();

    let err: EstablishError = query.into();

    assert_eq!(err.to_string(), expected);
    assert!(err.last_connect_error().is_none());
}

#[test]
fn given_query_exit_error_when_formatted_then_includes_stderr_and_code() {
    let err = ConfigQueryError::exit_status("epm x els-port", Some(2), "  no package\n");

    let text = err.to_string();

    assert!(text.contains("exited with 2: no package"));
    assert!(text.contains("establish.rs"));
}

#[test]
fn given_query_killed_by_signal_when_formatted_then_mentions_signal() {
    let err = ConfigQueryError::exit_status("epm x els-port", None, "");

    assert!(err.to_string().contains("exited with signal"));
}
