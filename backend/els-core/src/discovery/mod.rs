//! Finding and running the els server.
//!
//! - [`port`] obtains the configured port and reads dynamic port reports
//! - [`supervisor`] launches, tracks and terminates the server process
//! - [`process`] pid-level helpers (liveness, signal delivery)
//!
//! [`PortState`] is the one value shared between them and the connect loop:
//! "the port to try next".

pub mod port;
pub mod process;
pub mod supervisor;

use std::sync::Arc;

use tokio::sync::watch;

/// The port the next connect attempt will use.
///
/// Written by the port resolver once and by port-report readers whenever a
/// launched server announces a port. Readers capture the value at attempt
/// start; later writes only affect later attempts.
#[derive(Clone)]
pub struct PortState {
    tx: Arc<watch::Sender<String>>,
}

impl PortState {
    pub fn new(initial: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(initial.into());
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> String {
        self.tx.borrow().clone()
    }

    pub fn replace(&self, port: impl Into<String>) {
        self.tx.send_replace(port.into());
    }
}

impl Default for PortState {
    fn default() -> Self {
        Self::new(String::new())
    }
}
