//! One client session: configuration plus the state every component shares.
//!
//! Constructed when the client starts, torn down by [`Session::stop`]. There
//! are no process-wide globals; the port state and the current server
//! handle live here and nowhere else.

use crate::config::ClientConfig;
use crate::connect::Channel;
use crate::connect::establish::establish;
use crate::discovery::PortState;
use crate::discovery::process::Signal;
use crate::discovery::supervisor::Supervisor;
use crate::error::establish::EstablishError;
use crate::output::SessionLog;

use std::path::PathBuf;

use log::info;

pub struct Session {
    pub(crate) config: ClientConfig,
    pub(crate) work_dir: PathBuf,
    pub(crate) port_state: PortState,
    pub(crate) supervisor: Supervisor,
    pub(crate) log: SessionLog,
}

impl Session {
    pub fn new(config: ClientConfig, work_dir: impl Into<PathBuf>, log: SessionLog) -> Self {
        let work_dir = work_dir.into();
        let port_state = PortState::default();
        let supervisor = Supervisor::new(
            work_dir.clone(),
            config.launch.clone(),
            port_state.clone(),
            log.clone(),
        );

        Self {
            config,
            work_dir,
            port_state,
            supervisor,
            log,
        }
    }

    /// Run one connection-establishment sequence.
    pub async fn establish(&mut self) -> Result<Channel, EstablishError> {
        establish(self).await
    }

    /// Force-terminate the tracked server, whatever state the session is in.
    pub async fn stop(&mut self) {
        if let Some(pid) = self.supervisor.current_pid() {
            info!("Stopping els server pid={pid}");
        }
        self.supervisor.terminate().await;
    }

    /// Forward a termination-style signal to the tracked server.
    pub fn forward_signal(&self, signal: Signal) -> bool {
        self.supervisor.forward_signal(signal)
    }

    pub fn port_state(&self) -> &PortState {
        &self.port_state
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }
}
