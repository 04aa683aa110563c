use crate::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// A background task ended abnormally (panicked or was aborted) while its
/// owner still waited on it.
#[derive(Debug, ThisError)]
#[error("Task Error: {task} {message} {location}")]
pub struct JoinContextError {
    pub task: &'static str,
    pub message: String,
    pub location: ErrorLocation,
}

impl JoinContextError {
    #[track_caller]
    pub fn new(task: &'static str, message: impl Into<String>) -> Self {
        Self {
            task,
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
