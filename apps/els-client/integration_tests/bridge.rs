use els_client::bridge::{BridgeEnd, relay};

use els_core::connect::Channel;

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

async fn connected_pair() -> (Channel, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let client = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let (server, _) = listener.accept().await.unwrap();
    (Channel::new(client, port.to_string(), 1), server)
}

/// **VALUE**: Bytes flow both ways unchanged, and the server closing its end
/// finishes the relay.
///
/// **BUG THIS CATCHES**: Would catch the directions being crossed or the
/// relay waiting on the editor after the server went away.
#[tokio::test]
async fn given_bridge_when_server_closes_then_relay_ends_with_server_closed() {
    // GIVEN: A channel to a server and in-memory editor stdio
    let (channel, mut server) = connected_pair().await;
    let (mut editor_in, client_in) = duplex(1024);
    let (client_out, mut editor_out) = duplex(1024);
    let relay = tokio::spawn(relay(channel, client_in, client_out));

    // WHEN: The editor sends a request and the server answers then closes
    editor_in.write_all(b"Content-Length: 2\r\n\r\n{}").await.unwrap();
    let mut request = [0u8; 23];
    server.read_exact(&mut request).await.unwrap();
    server.write_all(b"pong").await.unwrap();
    drop(server);

    // THEN: The editor got the answer and the relay reports the server side
    let mut answer = Vec::new();
    editor_out.read_to_end(&mut answer).await.unwrap();
    assert_eq!(&request, b"Content-Length: 2\r\n\r\n{}");
    assert_eq!(answer, b"pong");

    let end = timeout(Duration::from_secs(5), relay).await.unwrap().unwrap().unwrap();
    assert_eq!(end, BridgeEnd::ServerClosed);
}

/// **VALUE**: When the editor closes stdin the server sees end of stream.
#[tokio::test]
async fn given_bridge_when_editor_closes_then_server_sees_eof() {
    // GIVEN: A running relay
    let (channel, mut server) = connected_pair().await;
    let (editor_in, client_in) = duplex(1024);
    let (client_out, _editor_out) = duplex(1024);
    let relay = tokio::spawn(relay(channel, client_in, client_out));

    // WHEN: The editor closes its input
    drop(editor_in);

    // THEN: The relay ends on the editor side and the socket is shut down
    let end = timeout(Duration::from_secs(5), relay).await.unwrap().unwrap().unwrap();
    assert_eq!(end, BridgeEnd::EditorClosed);

    let mut rest = Vec::new();
    let read = timeout(Duration::from_secs(5), server.read_to_end(&mut rest))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read, 0);
}
