//! The axum WebSocket handler: one task per connection.
//!
//! A connection's first message must be `auth`. Everything after that is
//! forwarded into the character's ingress mailbox as decoded [`Intent`]s;
//! everything the tick task produces for this character arrives on its
//! egress channel and is forwarded back out over the socket. The two
//! directions run as sibling tasks under `tokio::select!` so a slow reader
//! never blocks delivery of egress traffic and vice versa.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use embervale_core::tick::Intent;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::dispatch::ServerState;
use crate::message::{ClientMessage, PlayerView, ServerMessage, SkillView};

/// Upgrades an incoming HTTP request to a WebSocket and hands it off to
/// [`run_connection`].
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(socket, state))
}

/// Drives one connection end to end: authenticate, register, relay, and
/// clean up on disconnect.
async fn run_connection(mut socket: WebSocket, state: Arc<ServerState>) {
    let token = match wait_for_auth_token(&mut socket).await {
        Some(token) => token,
        None => return,
    };

    let (account_id, snapshot, _outcome, mailbox_tx) = match state.connect(&token).await {
        Ok(connected) => connected,
        Err(err) => {
            let _ = send(&mut socket, ServerMessage::Auth {
                success: false,
                error: Some(err.code().to_string()),
                user_id: None,
                position: None,
            })
            .await;
            tracing::warn!(%err, "login rejected");
            return;
        }
    };

    if send(&mut socket, ServerMessage::Auth {
        success: true,
        error: None,
        user_id: Some(snapshot.id),
        position: Some(snapshot.position.into()),
    })
    .await
    .is_err()
    {
        state.disconnect(account_id);
        return;
    }

    let player_id = snapshot.id;
    let character_creator_completed = snapshot.character_creator_completed;
    let player_skills: Vec<SkillView> = snapshot.skills.iter().copied().map(SkillView::from).collect();
    let _ = send(&mut socket, ServerMessage::SpawnPlayer {
        player: PlayerView::from(snapshot),
        player_skills,
        character_creator_completed,
    })
    .await;

    let (egress_tx, egress_rx) = mpsc::unbounded_channel();
    state.egress.register(player_id, egress_tx);

    let (mut sink, mut stream) = socket.split();
    let is_operator = state.is_operator(account_id);

    let write_task = tokio::spawn(async move { relay_egress(&mut sink, egress_rx).await });

    loop {
        let Some(next) = stream.next().await else { break };
        let Ok(frame) = next else { break };
        match frame {
            Message::Text(text) => {
                let Ok(message) = serde_json::from_str::<ClientMessage>(&text) else { continue };
                handle_client_message(message, player_id, is_operator, &mailbox_tx, &state.egress);
            }
            Message::Close(_) => break,
            Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    write_task.abort();
    state.egress.unregister(player_id);
    state.disconnect(account_id);
}

/// Turns one decoded client message into a mailbox [`Intent`] or an
/// immediate side effect (heartbeat toggling, admin gating).
fn handle_client_message(
    message: ClientMessage,
    player_id: embervale_core::character::CharacterId,
    is_operator: bool,
    mailbox_tx: &crossbeam::channel::Sender<Intent>,
    egress: &crate::dispatch::EgressRegistry,
) {
    match &message {
        ClientMessage::EnableHeartbeat => egress.set_heartbeat(player_id, true),
        ClientMessage::DisableHeartbeat => egress.set_heartbeat(player_id, false),
        ClientMessage::AdminCommand { .. } if !is_operator => return,
        _ => {}
    }

    if let Some(intent) = message.into_intent() {
        let _ = mailbox_tx.send(intent);
    }
}

/// Blocks on the socket until an `auth` message arrives, dropping anything
/// else and giving up after a short grace period.
async fn wait_for_auth_token(socket: &mut WebSocket) -> Option<String> {
    let deadline = tokio::time::sleep(Duration::from_secs(10));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => return None,
            frame = socket.next() => {
                let frame = frame?.ok()?;
                match frame {
                    Message::Text(text) => {
                        if let Ok(ClientMessage::Auth { token }) = serde_json::from_str::<ClientMessage>(&text) {
                            return Some(token);
                        }
                    }
                    Message::Close(_) => return None,
                    Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
                }
            }
        }
    }
}

async fn send(socket: &mut WebSocket, message: ServerMessage) -> Result<(), axum::Error> {
    let text = serde_json::to_string(&message).expect("ServerMessage always serializes");
    socket.send(Message::Text(text.into())).await
}

async fn relay_egress(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    mut egress_rx: mpsc::UnboundedReceiver<ServerMessage>,
) {
    while let Some(message) = egress_rx.recv().await {
        let text = serde_json::to_string(&message).expect("ServerMessage always serializes");
        if sink.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
}
