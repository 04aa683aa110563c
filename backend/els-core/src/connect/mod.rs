//! Turning a possibly stale port into a live channel.
//!
//! [`establish::establish`] is the retry state machine; [`policy`] supplies
//! the wait between attempts and [`channel`] wraps the winning socket.

pub mod channel;
pub mod establish;
pub mod policy;

pub use channel::Channel;
