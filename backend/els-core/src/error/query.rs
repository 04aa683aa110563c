use common::ErrorLocation;

use std::error::Error as StdError;
use std::panic::Location;

use thiserror::Error as ThisError;

/// The port query command could not produce a port.
///
/// Never retried: a broken query is not expected to heal by itself.
#[derive(Debug, ThisError)]
pub enum ConfigQueryError {
    #[error("Port Query Spawn Error: {message} {location}")]
    Spawn {
        message: String,
        location: ErrorLocation,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("Port Query Exit Error: {message} {location}")]
    ExitStatus {
        message: String,
        code: Option<i32>,
        location: ErrorLocation,
    },

    #[error("Port Query Output Error: {message} {location}")]
    EmptyOutput {
        message: String,
        location: ErrorLocation,
    },
}

impl ConfigQueryError {
    #[track_caller]
    pub fn exit_status(command: &str, code: Option<i32>, stderr: &str) -> Self {
        let status = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
        ConfigQueryError::ExitStatus {
            message: format!("`{command}` exited with {status}: {}", stderr.trim()),
            code,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn empty_output(command: &str) -> Self {
        ConfigQueryError::EmptyOutput {
            message: format!("`{command}` printed no port"),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
