use els_core::error::{ConfigError, CoreError, EstablishError};

use common::{ErrorLocation, JoinContextError};

use std::panic::Location;

use thiserror::Error;

/// Errors surfaced by the client binary.
///
/// Core errors are flattened to their message here; the session has already
/// logged the details by the time one reaches `main`.
#[derive(Debug, Error)]
pub enum ElsClientError {
    /// Error from this app (CLI, logger, signal setup)
    #[error("Client Error: {message} {location}")]
    Client {
        message: String,
        location: ErrorLocation,
    },

    /// Error from els-core operations (config, establishment)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// The stdio relay failed
    #[error("Bridge Error: {message} {location}")]
    Bridge {
        message: String,
        location: ErrorLocation,
    },
}

impl ElsClientError {
    #[track_caller]
    pub fn client(message: impl Into<String>) -> Self {
        ElsClientError::Client {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn bridge(message: impl Into<String>) -> Self {
        ElsClientError::Bridge {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<CoreError> for ElsClientError {
    #[track_caller]
    fn from(e: CoreError) -> Self {
        ElsClientError::Core {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for ElsClientError {
    #[track_caller]
    fn from(e: ConfigError) -> Self {
        ElsClientError::from(CoreError::from(e))
    }
}

impl From<EstablishError> for ElsClientError {
    #[track_caller]
    fn from(e: EstablishError) -> Self {
        ElsClientError::from(CoreError::from(e))
    }
}

impl From<JoinContextError> for ElsClientError {
    #[track_caller]
    fn from(e: JoinContextError) -> Self {
        ElsClientError::Bridge {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
