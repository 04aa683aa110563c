// Unit tests for supervisor private helpers
// Process lifecycle tests live in integration_tests/discovery/supervisor.rs

use crate::config::{EnvOverride, LaunchConfig};
use crate::discovery::supervisor::build_launch_command;
use crate::error::launch::LaunchError;

use std::ffi::OsStr;
use std::path::Path;

/// **VALUE**: The normal launch must run the configured program with its
/// arguments, from the workspace root.
///
/// **BUG THIS CATCHES**: Would catch argv[0] being passed twice, or the working
/// directory not being applied (the server resolves its config relative to it).
#[test]
fn given_normal_argv_when_build_launch_command_called_then_sets_program_args_and_dir() {
    // GIVEN: The default launch configuration
    let launch = LaunchConfig::default();

    // WHEN: Building the normal command
    let cmd = build_launch_command(launch.command(false), Path::new("/tmp"), None, true).unwrap();

    // THEN: Program, arguments and directory match
    let std_cmd = cmd.as_std();
    assert_eq!(std_cmd.get_program(), "/usr/bin/env");
    let args: Vec<&OsStr> = std_cmd.get_args().collect();
    assert_eq!(args, ["epm", "x", "els"]);
    assert_eq!(std_cmd.get_current_dir(), Some(Path::new("/tmp")));
    assert_eq!(std_cmd.get_envs().count(), 0, "normal launch adds no env");
}

/// **VALUE**: Debug mode differs only by command line and one env override.
#[test]
fn given_debug_env_when_build_launch_command_called_then_injects_variable() {
    // GIVEN: A debug env override
    let launch = LaunchConfig::default();
    let env = EnvOverride {
        name: "EDH_LOG_LEVEL".to_string(),
        value: "DEBUG".to_string(),
    };

    // WHEN: Building the debug command
    let cmd = build_launch_command(launch.command(true), Path::new("."), Some(&env), true).unwrap();

    // THEN: The debug program runs with the override set
    let std_cmd = cmd.as_std();
    let args: Vec<&OsStr> = std_cmd.get_args().collect();
    assert_eq!(args, ["stack", "run", "els"]);
    let envs: Vec<_> = std_cmd.get_envs().collect();
    assert_eq!(envs, [(OsStr::new("EDH_LOG_LEVEL"), Some(OsStr::new("DEBUG")))]);
}

#[test]
fn given_empty_argv_when_build_launch_command_called_then_returns_empty_command_error() {
    let result = build_launch_command(&[], Path::new("."), None, false);

    assert!(matches!(result, Err(LaunchError::EmptyCommand { .. })));
}
