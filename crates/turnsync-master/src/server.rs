//! `MasterServer` builder and accept loop.
//!
//! The network flavour of the master: the same [`MasterState`] as
//! [`LocalMaster`](crate::LocalMaster), shared behind a Tokio `Mutex` by
//! one handler task per connection.

use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::Mutex;
use turnsync_protocol::JsonCodec;
use turnsync_transport::{Listener, WebSocketListener};

use crate::handler::handle_connection;
use crate::{Game, MasterError, MasterState};

/// State shared by every connection handler.
pub(crate) struct ServerState<G: Game> {
    pub(crate) master: Mutex<MasterState<G>>,
    pub(crate) codec: JsonCodec,
}

/// Builder for a [`MasterServer`].
///
/// # Example
///
/// ```rust,ignore
/// let server = MasterServer::<TicTacToe>::builder()
///     .bind("0.0.0.0:8000")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct MasterServerBuilder<G: Game> {
    bind_addr: String,
    _game: PhantomData<fn() -> G>,
}

impl<G: Game> MasterServerBuilder<G> {
    /// Creates a builder bound to `127.0.0.1:8000` by default.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            _game: PhantomData,
        }
    }

    /// Sets the address to listen on. Port 0 picks a free port.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Binds the listener.
    pub async fn build(self) -> Result<MasterServer<G>, MasterError> {
        let listener = WebSocketListener::bind(&self.bind_addr).await?;
        let state = Arc::new(ServerState {
            master: Mutex::new(MasterState::new()),
            codec: JsonCodec,
        });
        Ok(MasterServer { listener, state })
    }
}

impl<G: Game> Default for MasterServerBuilder<G> {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound master server. Call [`run`](Self::run) to serve clients.
pub struct MasterServer<G: Game> {
    listener: WebSocketListener,
    state: Arc<ServerState<G>>,
}

impl<G: Game> MasterServer<G> {
    pub fn builder() -> MasterServerBuilder<G> {
        MasterServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the task is dropped, spawning one handler
    /// per connection.
    pub async fn run(mut self) -> Result<(), MasterError> {
        tracing::info!(addr = ?self.local_addr().ok(), "master server running");

        loop {
            match self.listener.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
