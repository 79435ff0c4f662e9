//! The network peer: a [`Master`] reached over a WebSocket.
//!
//! [`SocketMaster`] is a thin handle. All I/O happens on a background
//! Tokio task that owns the connection:
//!
//! ```text
//! Transport ──(Command)──▶ link task ──(ClientMessage bytes)──▶ master
//!     ▲                        │
//!     └──(ServerMessage)───────┘◀──(ServerMessage bytes)──────── master
//! ```
//!
//! The task dials, reports `LinkState::Up(epoch)` through a `watch`
//! channel, and on a lost link reports `Down` and re-dials with jittered
//! exponential backoff. Every successful dial bumps the epoch, which makes
//! the client request a fresh sync: the master forgets subscriptions when
//! a connection ends.
//!
//! Messages handed over while the link is down are dropped, not queued.

use rand::Rng;
use tokio::sync::{mpsc, watch};
use turnsync_protocol::{
    Action, ClientMessage, Codec, GameId, JsonCodec, PlayerId, ServerMessage,
};
use turnsync_transport::{Connection, WebSocketConnection};

use crate::{ClientId, InboundSender, Link, LinkState, Master, SocketConfig};

/// Work handed from the handle to the link task.
enum Command {
    Attach(InboundSender),
    Detach,
    Send(ClientMessage),
}

/// Why a connected session ended.
enum SessionEnd {
    LinkLost,
    Shutdown,
}

/// A [`Master`] on the other end of a WebSocket.
///
/// Dropping the handle stops the link task.
pub struct SocketMaster {
    commands: mpsc::UnboundedSender<Command>,
    link: watch::Receiver<LinkState>,
}

impl SocketMaster {
    /// Starts the link task. Must be called from within a Tokio runtime.
    pub fn spawn(config: SocketConfig) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (link_tx, link) = watch::channel(LinkState::Down);
        tokio::spawn(run_link(config, command_rx, link_tx));
        Self { commands, link }
    }

    fn submit(&self, command: Command) {
        // A closed channel means the link task is gone; nothing to deliver to.
        let _ = self.commands.send(command);
    }
}

impl Master for SocketMaster {
    fn attach(&self, link: Link) -> LinkState {
        self.submit(Command::Attach(link.inbound));
        self.link_state()
    }

    fn detach(&self, _client: ClientId) {
        self.submit(Command::Detach);
    }

    fn link_state(&self) -> LinkState {
        *self.link.borrow()
    }

    fn on_update(
        &self,
        action: &Action,
        version: u64,
        game_id: &GameId,
        player_id: Option<&PlayerId>,
    ) {
        self.submit(Command::Send(ClientMessage::Update {
            action: action.clone(),
            version,
            game_id: game_id.clone(),
            player_id: player_id.cloned(),
        }));
    }

    fn on_sync(
        &self,
        game_id: &GameId,
        player_id: Option<&PlayerId>,
        num_players: usize,
    ) {
        self.submit(Command::Send(ClientMessage::Sync {
            game_id: game_id.clone(),
            player_id: player_id.cloned(),
            num_players,
        }));
    }
}

/// Dial / serve / back off, until the handle is dropped.
async fn run_link(
    config: SocketConfig,
    mut commands: mpsc::UnboundedReceiver<Command>,
    link_tx: watch::Sender<LinkState>,
) {
    let codec = JsonCodec;
    let mut inbound: Option<InboundSender> = None;
    let mut epoch: u64 = 0;
    let mut attempt: u32 = 0;

    loop {
        match WebSocketConnection::connect(&config.url).await {
            Ok(conn) => {
                attempt = 0;
                epoch += 1;
                link_tx.send_replace(LinkState::Up(epoch));
                tracing::info!(url = %config.url, epoch, "link to master up");

                let end =
                    serve(&conn, &codec, &mut commands, &mut inbound).await;
                link_tx.send_replace(LinkState::Down);
                match end {
                    SessionEnd::Shutdown => {
                        let _ = conn.close().await;
                        tracing::debug!(url = %config.url, "link task stopped");
                        return;
                    }
                    SessionEnd::LinkLost => {
                        tracing::warn!(url = %config.url, epoch, "link to master lost");
                    }
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, attempt, "dial failed");
            }
        }

        let delay = config.backoff_delay(attempt) + jitter(&config);
        attempt = attempt.saturating_add(1);
        if !wait_offline(delay, &mut commands, &mut inbound).await {
            tracing::debug!(url = %config.url, "link task stopped");
            return;
        }
    }
}

/// Pumps commands out and frames in until the link or the handle goes.
async fn serve(
    conn: &WebSocketConnection,
    codec: &JsonCodec,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    inbound: &mut Option<InboundSender>,
) -> SessionEnd {
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                None => return SessionEnd::Shutdown,
                Some(Command::Attach(tx)) => *inbound = Some(tx),
                Some(Command::Detach) => *inbound = None,
                Some(Command::Send(msg)) => match codec.encode(&msg) {
                    Ok(bytes) => {
                        if let Err(e) = conn.send(&bytes).await {
                            tracing::debug!(error = %e, "send to master failed");
                            return SessionEnd::LinkLost;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "failed to encode client message");
                    }
                },
            },
            frame = conn.recv() => match frame {
                Ok(Some(data)) => deliver(codec, &data, inbound),
                Ok(None) => return SessionEnd::LinkLost,
                Err(e) => {
                    tracing::debug!(error = %e, "recv from master failed");
                    return SessionEnd::LinkLost;
                }
            },
        }
    }
}

/// Decodes one frame and hands it to the attached client, if any.
fn deliver(codec: &JsonCodec, data: &[u8], inbound: &mut Option<InboundSender>) {
    let msg: ServerMessage = match codec.decode(data) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(error = %e, "failed to decode server message");
            return;
        }
    };
    if let Some(tx) = inbound {
        if tx.send(msg).is_err() {
            // Receiver gone: the transport was dropped.
            *inbound = None;
        }
    }
}

/// Sleeps for `delay` while keeping attach/detach current. Returns `false`
/// if the handle was dropped.
async fn wait_offline(
    delay: std::time::Duration,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    inbound: &mut Option<InboundSender>,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            command = commands.recv() => match command {
                None => return false,
                Some(Command::Attach(tx)) => *inbound = Some(tx),
                Some(Command::Detach) => *inbound = None,
                Some(Command::Send(_)) => {
                    tracing::debug!("link down, dropping client message");
                }
            },
        }
    }
}

/// Up to a tenth of the base delay, so clients dropped together do not
/// re-dial together.
fn jitter(config: &SocketConfig) -> std::time::Duration {
    let max_ms = (config.reconnect_base.as_millis() / 10) as u64;
    if max_ms == 0 {
        return std::time::Duration::ZERO;
    }
    std::time::Duration::from_millis(rand::rng().random_range(0..=max_ms))
}
