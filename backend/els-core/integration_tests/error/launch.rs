use els_core::error::launch::LaunchError;

use common::ErrorLocation;

use std::error::Error;
use std::io::Error as IoError;
use std::io::ErrorKind;
use std::panic::Location;

/// **VALUE**: Verifies that `LaunchError::Spawn` carries the location of the
/// failed spawn.
///
/// **WHY THIS MATTERS**: Launch failures are swallowed by the retry loop and
/// only show up as a log line; the location is all that tells a developer
/// which spawn path failed.
///
/// **BUG THIS CATCHES**: Would catch the location being dropped from the
/// Display format.
#[test]
fn given_spawn_error_when_formatted_then_includes_message_and_location() {
    // GIVEN: A Spawn error created here
    let err = LaunchError::Spawn {
        message: "Failed to spawn `epm x els`".to_string(),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(IoError::new(ErrorKind::NotFound, "no such file")),
    };

    // WHEN: Formatting it
    let text = err.to_string();

    // THEN: Type, message and location are all present
    assert!(text.contains("Launch Error"));
    assert!(text.contains("epm x els"));
    assert!(text.contains("launch.rs"));
}

#[test]
fn given_spawn_error_when_source_requested_then_returns_io_error() {
    let err = LaunchError::Spawn {
        message: "Failed to spawn".to_string(),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(IoError::new(ErrorKind::PermissionDenied, "denied")),
    };

    let source = err.source().expect("spawn error has a source");

    assert_eq!(source.to_string(), "denied");
}

#[test]
fn given_empty_command_error_when_formatted_then_has_no_source() {
    let err = LaunchError::EmptyCommand {
        message: "els launch command is empty".to_string(),
        location: ErrorLocation::from(Location::caller()),
    };

    assert!(err.to_string().starts_with("Empty Command Error: els launch command is empty"));
    assert!(err.source().is_none());
}
