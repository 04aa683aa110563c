use std::io::Result as IoResult;
use std::net::SocketAddr;

use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Reader/writer pair over one connected socket.
///
/// No framing happens here; bytes pass through untouched. Both halves live
/// as long as the socket.
#[derive(Debug)]
pub struct Channel {
    port: String,
    attempt: u32,
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

impl Channel {
    pub fn new(stream: TcpStream, port: impl Into<String>, attempt: u32) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            port: port.into(),
            attempt,
            reader,
            writer,
        }
    }

    /// Port the socket was connected to.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// 1-based connect attempt that produced this channel.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn peer_addr(&self) -> IoResult<SocketAddr> {
        self.reader.peer_addr()
    }

    pub fn reader(&mut self) -> &mut OwnedReadHalf {
        &mut self.reader
    }

    pub fn into_split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        (self.reader, self.writer)
    }
}
