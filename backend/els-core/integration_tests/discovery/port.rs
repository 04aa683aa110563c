use crate::helpers::sh;

use els_core::discovery::port::resolve_port;
use els_core::error::query::ConfigQueryError;

use tempfile::tempdir;

#[tokio::test]
async fn given_query_printing_port_when_resolved_then_returns_trimmed_port() {
    let dir = tempdir().unwrap();

    let port = resolve_port(&sh("printf '  9000 \\n'"), dir.path()).await.unwrap();

    assert_eq!(port, "9000");
}

/// **VALUE**: The query runs in the workspace directory, where the project's
/// own els configuration lives.
#[tokio::test]
async fn given_workspace_dir_when_resolved_then_query_runs_there() {
    // GIVEN: A port stored in a file inside the workspace
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("els-port"), "7777\n").unwrap();

    // WHEN: Querying with a relative path
    let port = resolve_port(&sh("cat els-port"), dir.path()).await.unwrap();

    // THEN: The file was found relative to the workspace
    assert_eq!(port, "7777");
}

#[tokio::test]
async fn given_query_exiting_non_zero_when_resolved_then_returns_exit_status_error() {
    let dir = tempdir().unwrap();

    let result = resolve_port(&sh("echo no config >&2; exit 3"), dir.path()).await;

    match result {
        Err(ConfigQueryError::ExitStatus { code, message, .. }) => {
            assert_eq!(code, Some(3));
            assert!(message.contains("no config"));
        }
        other => panic!("expected ExitStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn given_query_printing_nothing_when_resolved_then_returns_empty_output_error() {
    let dir = tempdir().unwrap();

    let result = resolve_port(&sh("echo '   '"), dir.path()).await;

    assert!(matches!(result, Err(ConfigQueryError::EmptyOutput { .. })));
}

#[tokio::test]
async fn given_missing_query_binary_when_resolved_then_returns_spawn_error() {
    let dir = tempdir().unwrap();
    let argv = vec!["/nonexistent/epm".to_string()];

    let result = resolve_port(&argv, dir.path()).await;

    assert!(matches!(result, Err(ConfigQueryError::Spawn { .. })));
}
