use crate::error::connect::ConnectError;
use crate::error::query::ConfigQueryError;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Terminal failures of a connection-establishment call.
///
/// Connect and launch failures inside the loop never surface on their own;
/// only the last connect failure does, wrapped in `Exhausted`.
#[derive(Debug, ThisError)]
pub enum EstablishError {
    #[error(transparent)]
    Query(#[from] ConfigQueryError),

    #[error("Exhausted Error: no els server reachable after {attempts} attempts {location}")]
    Exhausted {
        attempts: u32,
        location: ErrorLocation,
        #[source]
        last: ConnectError,
    },
}

impl EstablishError {
    #[track_caller]
    pub fn exhausted(attempts: u32, last: ConnectError) -> Self {
        EstablishError::Exhausted {
            attempts,
            location: ErrorLocation::from(Location::caller()),
            last,
        }
    }

    /// The connect failure that ended the loop, if it was exhausted.
    pub fn last_connect_error(&self) -> Option<&ConnectError> {
        match self {
            EstablishError::Exhausted { last, .. } => Some(last),
            EstablishError::Query(_) => None,
        }
    }
}
