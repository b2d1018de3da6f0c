//! WebSocket relay — the hosted transport for remote clients.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade with `?room=<id>` → attendee id allocated, room joined,
//!    `Welcome` sent (peers, retained slots of connected peers, op log)
//! 2. Inbound `ClientMessage` → stamped, retained, broadcast to the whole
//!    room including the sender (the echo is the client's apply path)
//! 3. Close → `AttendeeDisconnected` broadcast; retained values are kept
//!
//! Invalid inbound JSON gets an `Error` envelope back on the offending
//! socket; it never disconnects anyone.

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::envelope::{AttendeeId, Body, ClientMessage, Envelope, ServerMessage};
use crate::state::{self, AppState};

pub async fn handle_ws(
    State(app): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(room) = params.get("room").cloned() else {
        return (StatusCode::BAD_REQUEST, "room required").into_response();
    };

    ws.on_upgrade(move |socket| run_ws(socket, app, room))
}

async fn run_ws(mut socket: WebSocket, app: AppState, room: String) {
    let attendee = AttendeeId::new();

    // Per-connection channel for envelopes broadcast by room peers.
    let (tx, mut rx) = mpsc::channel::<Envelope>(256);

    let welcome = state::join_room(&app, &room, attendee, tx).await;
    if send(&mut socket, &ServerMessage::Welcome(welcome)).await.is_err() {
        state::part_room(&app, &room, attendee).await;
        return;
    }

    info!(%attendee, %room, "ws: attendee connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        handle_inbound(&app, &room, attendee, &mut socket, &text).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(envelope) = rx.recv() => {
                if send(&mut socket, &ServerMessage::Envelope(envelope)).await.is_err() {
                    break;
                }
            }
        }
    }

    state::part_room(&app, &room, attendee).await;
    info!(%attendee, %room, "ws: attendee disconnected");
}

async fn handle_inbound(
    app: &AppState,
    room: &str,
    attendee: AttendeeId,
    socket: &mut WebSocket,
    text: &str,
) {
    match ClientMessage::parse(text) {
        Ok(message) => state::publish(app, room, attendee, message).await,
        Err(e) => {
            warn!(%attendee, error = %e, "ws: invalid inbound message");
            let error = ServerMessage::Envelope(Envelope {
                seq: 0,
                from: attendee,
                body: Body::Error { message: e.to_string() },
            });
            let _ = send(socket, &error).await;
        }
    }
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), ()> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize message");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
