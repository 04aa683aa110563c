//! Relays bytes between the editor and an established channel.
//!
//! The editor talks to this process over stdin/stdout; the channel is the
//! socket to the els server. Bytes are passed through without framing.

use crate::error::ElsClientError;

use els_core::connect::Channel;

use common::JoinContextError;

use std::io::Result as IoResult;

use log::debug;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, copy};
use tokio::task::JoinSet;

/// Which side closed first and ended the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeEnd {
    EditorClosed,
    ServerClosed,
}

const EDITOR_TO_SERVER: &str = "editor-to-server relay";
const SERVER_TO_EDITOR: &str = "server-to-editor relay";

/// Relay until either direction reaches end of stream.
///
/// The other direction is cancelled when this returns or is dropped.
///
/// # Errors
///
/// Returns [`ElsClientError::Bridge`] when a read or write fails, or a relay
/// task dies.
pub async fn relay<I, O>(channel: Channel, input: I, output: O) -> Result<BridgeEnd, ElsClientError>
where
    I: AsyncRead + Unpin + Send + 'static,
    O: AsyncWrite + Unpin + Send + 'static,
{
    let (mut server_rx, mut server_tx) = channel.into_split();
    let mut relays = JoinSet::new();

    relays.spawn(async move {
        let mut input = input;
        let copied = copy(&mut input, &mut server_tx).await;
        // Lets the server see end of stream.
        if let Err(e) = server_tx.shutdown().await {
            debug!("Shutting down els socket failed: {e}");
        }
        (BridgeEnd::EditorClosed, EDITOR_TO_SERVER, copied)
    });

    relays.spawn(async move {
        let mut output = output;
        let copied = copy(&mut server_rx, &mut output).await;
        if let Err(e) = output.flush().await {
            debug!("Flushing editor output failed: {e}");
        }
        (BridgeEnd::ServerClosed, SERVER_TO_EDITOR, copied)
    });

    let Some(joined) = relays.join_next().await else {
        return Err(ElsClientError::bridge("No relay task was started"));
    };
    let (end, task, copied) =
        joined.map_err(|e| JoinContextError::new("stdio relay", e.to_string()))?;

    finished(end, task, copied)
}

fn finished(end: BridgeEnd, task: &str, copied: IoResult<u64>) -> Result<BridgeEnd, ElsClientError> {
    let bytes = copied.map_err(|e| ElsClientError::bridge(format!("{task} failed: {e}")))?;
    debug!("{task} closed after {bytes} bytes");
    Ok(end)
}
