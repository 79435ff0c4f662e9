//! Integration tests for the WebSocket links.
//!
//! Both ends are real: a `WebSocketListener` on an OS-assigned port and a
//! `WebSocketConnection` dialed at it, so frames cross an actual socket.

#[cfg(feature = "websocket")]
mod websocket {
    use turnsync_transport::{
        Connection, Listener, WebSocketConnection, WebSocketListener,
    };

    /// Binds on port 0 and returns the listener plus its `ws://` URL.
    async fn bind_any() -> (WebSocketListener, String) {
        let listener = WebSocketListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().expect("should have local addr");
        (listener, format!("ws://{addr}"))
    }

    #[tokio::test]
    async fn test_dial_and_exchange_frames_both_ways() {
        let (mut listener, url) = bind_any().await;

        let server_handle = tokio::spawn(async move {
            listener.accept().await.expect("should accept")
        });

        let client = WebSocketConnection::connect(&url)
            .await
            .expect("client should connect");
        let server = server_handle.await.expect("task should complete");

        assert_ne!(client.id(), server.id());

        client.send(br#"{"type":"Sync"}"#).await.expect("send");
        let frame = server.recv().await.expect("recv").expect("frame");
        assert_eq!(frame, br#"{"type":"Sync"}"#);

        server.send(b"\xff\x00binary").await.expect("send");
        let frame = client.recv().await.expect("recv").expect("frame");
        assert_eq!(frame, b"\xff\x00binary");

        client.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_recv_returns_none_after_peer_closes() {
        let (mut listener, url) = bind_any().await;

        let server_handle = tokio::spawn(async move {
            listener.accept().await.expect("should accept")
        });

        let client = WebSocketConnection::connect(&url)
            .await
            .expect("client should connect");
        let server = server_handle.await.unwrap();

        client.close().await.expect("close");

        let result = server.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on peer close");
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        // Bind then drop to get a port nobody is listening on.
        let (listener, url) = bind_any().await;
        drop(listener);

        let result = WebSocketConnection::connect(&url).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_bad_url_keeps_handshake_error_as_source() {
        use std::error::Error;
        use tokio_tungstenite::tungstenite;
        use turnsync_transport::TransportError;

        let Err(err) = WebSocketConnection::connect("http://127.0.0.1").await
        else {
            panic!("non-ws scheme should not connect");
        };
        assert!(matches!(err, TransportError::ConnectFailed { .. }));

        let source = err.source().expect("should carry a source");
        assert!(
            source.downcast_ref::<tungstenite::Error>().is_some(),
            "source should be the tungstenite error, got {source:?}"
        );
    }
}
