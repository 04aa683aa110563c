//! Start and stop hooks around one session.
//!
//! Start establishes the channel and hands it to the stdio bridge. Stop
//! always terminates the server, whichever way the session ended: the bridge
//! closing, establishment failing, or a termination request.

use crate::bridge::{BridgeEnd, relay};
use crate::error::ElsClientError;

use els_core::connect::Channel;
use els_core::discovery::process::Signal;
use els_core::error::EstablishError;
use els_core::session::Session;

use std::future::Future;

use log::{error, info};
use tokio::io::{AsyncRead, AsyncWrite};

/// How a session finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Bridged(BridgeEnd),
    Terminated,
}

enum Started {
    Connected(Channel),
    Failed(EstablishError),
    Terminated,
}

/// Run one session to completion.
///
/// `shutdown` resolves on a termination request; the server then receives
/// SIGTERM before being force-stopped.
///
/// # Errors
///
/// Returns an error when establishment gives up or the bridge fails. The
/// server is stopped in both cases.
pub async fn run_session<I, O, S>(
    mut session: Session,
    input: I,
    output: O,
    shutdown: S,
) -> Result<SessionEnd, ElsClientError>
where
    I: AsyncRead + Unpin + Send + 'static,
    O: AsyncWrite + Unpin + Send + 'static,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let started = tokio::select! {
        result = session.establish() => match result {
            Ok(channel) => Started::Connected(channel),
            Err(e) => Started::Failed(e),
        },
        () = &mut shutdown => Started::Terminated,
    };

    let channel = match started {
        Started::Connected(channel) => channel,
        Started::Failed(e) => {
            error!("Giving up on els: {e}");
            session.stop().await;
            return Err(ElsClientError::from(e));
        }
        Started::Terminated => {
            terminate(&mut session).await;
            return Ok(SessionEnd::Terminated);
        }
    };

    info!(
        "Bridging stdio to els on port {} (attempt {})",
        channel.port(),
        channel.attempt()
    );

    let bridged = tokio::select! {
        result = relay(channel, input, output) => Some(result),
        () = &mut shutdown => None,
    };

    match bridged {
        Some(result) => {
            session.stop().await;
            let end = result?;
            info!("Session ended: {end:?}");
            Ok(SessionEnd::Bridged(end))
        }
        None => {
            terminate(&mut session).await;
            Ok(SessionEnd::Terminated)
        }
    }
}

async fn terminate(session: &mut Session) {
    if session.forward_signal(Signal::Term) {
        info!("Forwarded SIGTERM to els server");
    }
    session.stop().await;
}
