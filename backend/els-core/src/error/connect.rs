use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

/// One socket connect attempt failed. Recoverable: drives the retry loop.
#[derive(Debug, ThisError)]
pub enum ConnectError {
    #[error("Invalid Port Error: {message} {location}")]
    InvalidPort {
        port: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Connect Error: {message} {location}")]
    Io {
        port: String,
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },
}

impl ConnectError {
    #[track_caller]
    pub fn io(host: &str, port: &str, source: IoError) -> Self {
        ConnectError::Io {
            port: port.to_string(),
            message: format!("Failed connecting to {host}:{port}: {source}"),
            location: ErrorLocation::from(Location::caller()),
            source,
        }
    }

    /// Port the failed attempt was aimed at.
    pub fn port(&self) -> &str {
        match self {
            ConnectError::InvalidPort { port, .. } | ConnectError::Io { port, .. } => port,
        }
    }
}
