use common::ErrorLocation;

use std::error::Error as StdError;

use thiserror::Error as ThisError;

/// Starting the server process failed. Logged and swallowed by the retry loop.
#[derive(Debug, ThisError)]
pub enum LaunchError {
    #[error("Launch Error: {message} {location}")]
    Spawn {
        message: String,
        location: ErrorLocation,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("Port Report Pipe Error: {message} {location}")]
    Pipe {
        message: String,
        location: ErrorLocation,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("Empty Command Error: {message} {location}")]
    EmptyCommand {
        message: String,
        location: ErrorLocation,
    },
}
