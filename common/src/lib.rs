//! Support types shared by the els workspace.
//!
//! ## Architecture
//!
//! - **common** (this crate): error plumbing shared by every layer
//! - **els-core**: port resolution, server supervision and the connect loop
//! - **els-client**: the binary wiring a session to the editor's stdio
//!
//! Nothing in here knows about sockets or processes.

pub mod error;

pub use error::error_location::ErrorLocation;
pub use error::join_error::JoinContextError;
