pub mod error_location;
pub mod join_error;
