//! Integration tests for the WebSocket request/response transport.
//!
//! These tests spin up a real WebSocket server on a random port and check
//! that request frames reach it and reply frames are captured by `send`.

#[cfg(feature = "websocket")]
mod websocket {
    use biomewire_transport::{
        Deadline, Transport, TransportError, WebSocketTransport,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    /// Starts a server that answers each binary message with the reversed
    /// bytes, and an empty message with an empty acknowledgement.
    async fn start_reversing_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().expect("should have addr");

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("should accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("should upgrade");
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Binary(data) = msg {
                    let mut reply = data.to_vec();
                    reply.reverse();
                    if ws.send(Message::Binary(reply.into())).await.is_err() {
                        break;
                    }
                }
            }
        });

        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn test_send_captures_reply_for_receive() {
        let url = start_reversing_server().await;
        let mut transport = WebSocketTransport::connect(&url, Deadline::never())
            .await
            .expect("should connect");

        transport
            .send(b"biome", Deadline::never())
            .await
            .expect("send should succeed");
        let reply = transport
            .receive(Deadline::never())
            .await
            .expect("reply should be captured");

        assert_eq!(reply, b"emoib");
        assert!(transport.id().into_inner() > 0);
        assert_eq!(transport.endpoint(), url);
    }

    #[tokio::test]
    async fn test_empty_reply_is_an_acknowledgement() {
        let url = start_reversing_server().await;
        let mut transport = WebSocketTransport::connect(&url, Deadline::never())
            .await
            .unwrap();

        transport.send(b"", Deadline::never()).await.unwrap();

        assert!(matches!(
            transport.receive(Deadline::never()).await,
            Err(TransportError::NoResponse)
        ));
    }

    #[tokio::test]
    async fn test_non_websocket_url_is_rejected() {
        let result =
            WebSocketTransport::connect("http://127.0.0.1:1", Deadline::never())
                .await;
        assert!(matches!(result, Err(TransportError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn test_calls_after_close_fail() {
        let url = start_reversing_server().await;
        let mut transport = WebSocketTransport::connect(&url, Deadline::never())
            .await
            .unwrap();

        transport.close().await.expect("close should succeed");

        assert!(matches!(
            transport.send(b"x", Deadline::never()).await,
            Err(TransportError::ConnectionClosed(_))
        ));
    }
}
