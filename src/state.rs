//! Shared relay state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds a map of live rooms; each room has the connected attendees'
//! outboxes, the stamp counter, the retained latest slot values, and the
//! document op log used to seed late joiners.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::info;

use crate::document::DocumentOp;
use crate::envelope::{
    AttendeeId, Body, ClientMessage, ConnectionStatus, Envelope, RetainedSlot, SlotKey, Welcome,
};

// =============================================================================
// ROOM STATE
// =============================================================================

/// Last value retained for one slot cell, with the seq it was stamped with.
#[derive(Debug, Clone)]
pub struct Retained {
    pub seq: u64,
    pub value: serde_json::Value,
}

/// Per-room live state. A room is one shared session: one presence group,
/// one document.
#[derive(Default)]
pub struct RoomState {
    pub seq: u64,
    /// Connected attendees: attendee -> sender for outgoing envelopes.
    pub clients: HashMap<AttendeeId, mpsc::Sender<Envelope>>,
    /// Connection status, kept for attendees that have left too.
    pub status: HashMap<AttendeeId, ConnectionStatus>,
    /// Latest value per (workspace, slot, attendee). Survives disconnect.
    pub retained: HashMap<(String, SlotKey, AttendeeId), Retained>,
    /// Document op log, replayed to late joiners.
    pub ops: Vec<DocumentOp>,
}

impl RoomState {
    fn stamp(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn broadcast(&self, envelope: &Envelope) {
        for tx in self.clients.values() {
            // Best-effort: if an attendee's channel is full, skip it.
            let _ = tx.try_send(envelope.clone());
        }
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared relay state, injected into Axum handlers via the State extractor.
#[derive(Clone, Default)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<String, RoomState>>>,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// =============================================================================
// ROOM OPERATIONS
// =============================================================================

/// Join a room, creating it on first use. Returns the welcome snapshot:
/// connected peers, their retained slot values, and the op log.
/// Disconnected attendees' retained values are excluded.
pub async fn join_room(
    state: &AppState,
    room: &str,
    attendee: AttendeeId,
    tx: mpsc::Sender<Envelope>,
) -> Welcome {
    let mut rooms = state.rooms.write().await;
    let room_state = rooms.entry(room.to_string()).or_default();

    let mut peers: Vec<AttendeeId> = room_state.clients.keys().copied().collect();
    peers.sort_unstable();

    let mut slots: Vec<RetainedSlot> = room_state
        .retained
        .iter()
        .filter(|((_, _, owner), _)| {
            room_state.status.get(owner) == Some(&ConnectionStatus::Connected)
        })
        .map(|((_, slot, owner), retained)| RetainedSlot {
            slot: *slot,
            attendee: *owner,
            value: retained.value.clone(),
        })
        .collect();
    slots.sort_by(|a, b| a.attendee.cmp(&b.attendee));

    let welcome = Welcome { attendee, peers, slots, ops: room_state.ops.clone() };

    room_state.clients.insert(attendee, tx);
    room_state.status.insert(attendee, ConnectionStatus::Connected);

    let seq = room_state.stamp();
    room_state.broadcast(&Envelope { seq, from: attendee, body: Body::AttendeeJoined { attendee } });

    info!(%room, %attendee, clients = room_state.clients.len(), "attendee joined room");
    welcome
}

/// Leave a room. The attendee's retained slot values are kept — projections
/// on the remaining clients filter them out structurally.
pub async fn part_room(state: &AppState, room: &str, attendee: AttendeeId) {
    let mut rooms = state.rooms.write().await;
    let Some(room_state) = rooms.get_mut(room) else {
        return;
    };

    if room_state.clients.remove(&attendee).is_none() {
        return;
    }
    room_state.status.insert(attendee, ConnectionStatus::Disconnected);

    let seq = room_state.stamp();
    room_state.broadcast(&Envelope {
        seq,
        from: attendee,
        body: Body::AttendeeDisconnected { attendee },
    });

    info!(%room, %attendee, remaining = room_state.clients.len(), "attendee left room");
}

/// Stamp and broadcast a client message to every attendee in the room,
/// the sender included — the echo is the client's own apply path.
pub async fn publish(state: &AppState, room: &str, from: AttendeeId, message: ClientMessage) {
    let mut rooms = state.rooms.write().await;
    let Some(room_state) = rooms.get_mut(room) else {
        return;
    };

    let seq = room_state.stamp();
    let body = match message {
        ClientMessage::SlotUpdate { workspace, slot, value } => {
            room_state.retained.insert(
                (workspace.clone(), slot, from),
                Retained { seq, value: value.clone() },
            );
            Body::SlotUpdate { workspace, slot, value }
        }
        ClientMessage::DocOp { op } => {
            room_state.ops.push(op.clone());
            Body::DocOp { op }
        }
    };

    room_state.broadcast(&Envelope { seq, from, body });
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// Join a room with a fresh attendee and return its id and inbox.
    pub async fn seed_attendee(
        state: &AppState,
        room: &str,
    ) -> (AttendeeId, mpsc::Receiver<Envelope>, Welcome) {
        let attendee = AttendeeId::new();
        let (tx, rx) = mpsc::channel(64);
        let welcome = join_room(state, room, attendee, tx).await;
        (attendee, rx, welcome)
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
