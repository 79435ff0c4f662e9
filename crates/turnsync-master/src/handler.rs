//! Per-connection handler for the master server.
//!
//! Each connection is one subscriber. It has no identity until it sends
//! its first `Sync`; every later `Sync` re-registers it under the identity
//! that frame names, which is how a client's game or seat switch reaches
//! the server.

use std::sync::Arc;

use tokio::sync::mpsc;
use turnsync_client::{ClientId, InboundSender};
use turnsync_protocol::{ClientMessage, Codec};
use turnsync_transport::{Connection, WebSocketConnection};

use crate::server::ServerState;
use crate::{Game, MasterError};

/// Detaches the subscriber when the handler exits, however it exits.
///
/// `Drop` is synchronous, so the async lock is taken in a spawned task.
struct SubscriptionGuard<G: Game> {
    client: ClientId,
    state: Arc<ServerState<G>>,
}

impl<G: Game> Drop for SubscriptionGuard<G> {
    fn drop(&mut self) {
        let client = self.client;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.master.lock().await.detach(client);
        });
    }
}

/// Serves one connection until it closes.
pub(crate) async fn handle_connection<G: Game>(
    conn: WebSocketConnection,
    state: Arc<ServerState<G>>,
) -> Result<(), MasterError> {
    let client = ClientId::new(conn.id().into_inner());
    tracing::debug!(%client, "handling new connection");

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let _guard = SubscriptionGuard {
        client,
        state: Arc::clone(&state),
    };

    loop {
        tokio::select! {
            frame = conn.recv() => match frame {
                Ok(Some(data)) => {
                    handle_frame(&state, client, &outbound_tx, &data).await;
                }
                Ok(None) => {
                    tracing::info!(%client, "connection closed cleanly");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%client, error = %e, "recv error");
                    break;
                }
            },
            Some(msg) = outbound_rx.recv() => {
                let bytes = state.codec.encode(&msg)?;
                conn.send(&bytes).await?;
            }
        }
    }

    // _guard drops here → subscriber detached.
    Ok(())
}

/// Decodes one client frame and runs it against the master.
async fn handle_frame<G: Game>(
    state: &Arc<ServerState<G>>,
    client: ClientId,
    outbound: &InboundSender,
    data: &[u8],
) {
    let msg: ClientMessage = match state.codec.decode(data) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(%client, error = %e, "failed to decode client message");
            return;
        }
    };

    let mut master = state.master.lock().await;
    match msg {
        ClientMessage::Sync {
            game_id,
            player_id,
            num_players,
        } => {
            master.attach(
                client,
                game_id.clone(),
                player_id.clone(),
                outbound.clone(),
            );
            master.on_sync(&game_id, player_id.as_ref(), num_players);
        }
        ClientMessage::Update {
            action,
            version,
            game_id,
            player_id,
        } => {
            if let Err(reason) =
                master.on_update(&action, version, &game_id, player_id.as_ref())
            {
                tracing::debug!(%client, %game_id, %reason, "action rejected");
            }
        }
    }
}
