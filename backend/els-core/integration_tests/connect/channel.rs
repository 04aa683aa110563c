use els_core::connect::Channel;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// **VALUE**: The channel is a plain byte pipe in both directions; framing
/// belongs to the protocol layer above.
#[tokio::test]
async fn given_connected_socket_when_wrapped_then_reader_and_writer_pass_bytes_through() {
    // GIVEN: A connected socket pair
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).await.unwrap();
    let (mut server, _) = listener.accept().await.unwrap();

    // WHEN: Wrapping the client side
    let channel = Channel::new(client, addr.port().to_string(), 1);
    assert_eq!(channel.peer_addr().unwrap(), addr);
    let (mut reader, mut writer) = channel.into_split();

    // THEN: Writes reach the server and server writes reach the reader
    writer.write_all(b"ping").await.unwrap();
    let mut inbound = [0u8; 4];
    server.read_exact(&mut inbound).await.unwrap();
    assert_eq!(&inbound, b"ping");

    server.write_all(b"pong").await.unwrap();
    let mut outbound = [0u8; 4];
    reader.read_exact(&mut outbound).await.unwrap();
    assert_eq!(&outbound, b"pong");
}

#[tokio::test]
async fn given_peer_closes_when_reading_then_reader_sees_end_of_stream() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).await.unwrap();
    let (server, _) = listener.accept().await.unwrap();
    let mut channel = Channel::new(client, addr.port().to_string(), 1);

    drop(server);

    let mut buf = Vec::new();
    let read = channel.reader().read_to_end(&mut buf).await.unwrap();
    assert_eq!(read, 0);
}
