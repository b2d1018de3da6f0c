//! In-process transport hub and per-client runtime.
//!
//! ARCHITECTURE
//! ============
//! `LocalHub` plays the role of the replicated transport for in-process
//! sessions: it stamps every published body with a sequence number, retains
//! the latest value per presence slot, appends document ops to the session
//! log, and fans the envelope out to every connected attendee — including
//! the sender. The echo is the single apply path for document ops, so all
//! replicas apply one identical op sequence and converge.
//!
//! LIFECYCLE
//! =========
//! 1. `connect` → inbox created, welcome replay queued, `AttendeeJoined`
//!    broadcast to the others
//! 2. publishes flow through `Outbound::publish`
//! 3. `disconnect` → inbox removed, `AttendeeDisconnected` broadcast;
//!    retained slot values are deliberately kept (the transport remembers,
//!    projections filter)
//!
//! Each client drains its inbox with `pump()` — the single dispatch point
//! of the event-driven model. Nothing here blocks a caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::document::{DocumentHandle, DocumentOp};
use crate::envelope::{
    APP_SELECTION_WORKSPACE, AttendeeId, Body, ConnectionStatus, Envelope, SlotKey,
};
use crate::presence::channel::PresenceWorkspace;

// =============================================================================
// OUTBOUND SEAM
// =============================================================================

/// Publish half of the transport. Fire-and-forget: the call returns
/// immediately and delivery is best-effort, eventually consistent.
pub trait Outbound: Send + Sync {
    fn publish(&self, from: AttendeeId, body: Body);
}

// =============================================================================
// HUB
// =============================================================================

/// Last value retained for one `(workspace, slot, attendee)` cell, with the
/// sequence number it was stamped with.
#[derive(Debug, Clone)]
struct RetainedValue {
    seq: u64,
    value: serde_json::Value,
}

struct HubInner {
    seq: u64,
    inboxes: HashMap<AttendeeId, mpsc::UnboundedSender<Envelope>>,
    status: HashMap<AttendeeId, ConnectionStatus>,
    retained: HashMap<(String, SlotKey, AttendeeId), RetainedValue>,
    ops: Vec<(u64, AttendeeId, DocumentOp)>,
}

/// In-process multi-client broadcast hub.
#[derive(Clone)]
pub struct LocalHub {
    inner: Arc<Mutex<HubInner>>,
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalHub {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                seq: 0,
                inboxes: HashMap::new(),
                status: HashMap::new(),
                retained: HashMap::new(),
                ops: Vec::new(),
            })),
        }
    }

    /// Connect a new attendee. Its inbox is seeded with a replay of the
    /// current session: join events for connected peers, those peers'
    /// retained slot values, and the document op log. Disconnected
    /// attendees' retained values are never replayed.
    #[must_use]
    pub fn connect(&self) -> LocalClient {
        let attendee = AttendeeId::new();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut inner = self.inner.lock().expect("hub poisoned");

            // Replay for the late joiner. Replayed envelopes carry their
            // original sequence numbers; join replays carry seq 0.
            let mut replay = Vec::new();
            let mut peers: Vec<AttendeeId> = inner
                .status
                .iter()
                .filter(|(_, status)| **status == ConnectionStatus::Connected)
                .map(|(id, _)| *id)
                .collect();
            peers.sort_unstable();
            for peer in &peers {
                replay.push(Envelope { seq: 0, from: *peer, body: Body::AttendeeJoined { attendee: *peer } });
            }
            let mut slots: Vec<(&(String, SlotKey, AttendeeId), &RetainedValue)> = inner
                .retained
                .iter()
                .filter(|((_, _, owner), _)| {
                    inner.status.get(owner) == Some(&ConnectionStatus::Connected)
                })
                .collect();
            slots.sort_by_key(|(_, retained)| retained.seq);
            for ((workspace, slot, owner), retained) in slots {
                replay.push(Envelope {
                    seq: retained.seq,
                    from: *owner,
                    body: Body::SlotUpdate {
                        workspace: workspace.clone(),
                        slot: *slot,
                        value: retained.value.clone(),
                    },
                });
            }
            for (seq, from, op) in &inner.ops {
                replay.push(Envelope { seq: *seq, from: *from, body: Body::DocOp { op: op.clone() } });
            }
            for envelope in replay {
                let _ = tx.send(envelope);
            }

            inner.inboxes.insert(attendee, tx);
            inner.status.insert(attendee, ConnectionStatus::Connected);
            info!(%attendee, peers = peers.len(), "attendee connected");
        }

        // Everyone (the new attendee included) observes the join.
        self.publish(attendee, Body::AttendeeJoined { attendee });

        let outbound: Arc<dyn Outbound> = Arc::new(self.clone());
        let presence = PresenceWorkspace::attach(
            APP_SELECTION_WORKSPACE,
            attendee,
            Arc::clone(&outbound),
        );
        let document = DocumentHandle::new(attendee, outbound);

        LocalClient { attendee, rx, presence, document, hub: self.clone() }
    }

    /// Disconnect an attendee. Retained slot values survive; projections
    /// are responsible for excluding them.
    pub fn disconnect(&self, attendee: AttendeeId) {
        {
            let mut inner = self.inner.lock().expect("hub poisoned");
            if inner.inboxes.remove(&attendee).is_none() {
                debug!(%attendee, "disconnect for unknown attendee; ignored");
                return;
            }
            inner.status.insert(attendee, ConnectionStatus::Disconnected);
            info!(%attendee, "attendee disconnected");
        }
        self.publish(attendee, Body::AttendeeDisconnected { attendee });
    }

    /// Transport-level status of an attendee. Unknown ids read as
    /// disconnected.
    #[must_use]
    pub fn status_of(&self, attendee: AttendeeId) -> ConnectionStatus {
        self.inner
            .lock()
            .expect("hub poisoned")
            .status
            .get(&attendee)
            .copied()
            .unwrap_or(ConnectionStatus::Disconnected)
    }

    /// Last value the transport retains for a slot cell, regardless of the
    /// owner's connection status.
    #[must_use]
    pub fn retained_value(&self, workspace: &str, slot: SlotKey, attendee: AttendeeId) -> Option<serde_json::Value> {
        self.inner
            .lock()
            .expect("hub poisoned")
            .retained
            .get(&(workspace.to_string(), slot, attendee))
            .map(|r| r.value.clone())
    }

    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.inner
            .lock()
            .expect("hub poisoned")
            .status
            .values()
            .filter(|s| **s == ConnectionStatus::Connected)
            .count()
    }
}

impl Outbound for LocalHub {
    fn publish(&self, from: AttendeeId, body: Body) {
        let mut inner = self.inner.lock().expect("hub poisoned");
        inner.seq += 1;
        let seq = inner.seq;

        match &body {
            Body::SlotUpdate { workspace, slot, value } => {
                inner.retained.insert(
                    (workspace.clone(), *slot, from),
                    RetainedValue { seq, value: value.clone() },
                );
            }
            Body::DocOp { op } => {
                inner.ops.push((seq, from, op.clone()));
            }
            Body::AttendeeJoined { .. } | Body::AttendeeDisconnected { .. } | Body::Error { .. } => {}
        }

        let envelope = Envelope { seq, from, body };
        for tx in inner.inboxes.values() {
            // Unbounded send only fails when the receiver is gone.
            let _ = tx.send(envelope.clone());
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// One connected session: the inbox plus the client-side components built
/// on top of it. `pump()` is the only dispatch point — all presence and
/// document callbacks fire from inside it, on the caller's thread.
pub struct LocalClient {
    attendee: AttendeeId,
    rx: mpsc::UnboundedReceiver<Envelope>,
    presence: PresenceWorkspace,
    document: DocumentHandle,
    hub: LocalHub,
}

impl LocalClient {
    #[must_use]
    pub fn attendee_id(&self) -> AttendeeId {
        self.attendee
    }

    /// Handle to the presence workspace. Clones share state.
    #[must_use]
    pub fn presence(&self) -> PresenceWorkspace {
        self.presence.clone()
    }

    /// Handle to the document replica and mutation facade.
    #[must_use]
    pub fn document(&self) -> DocumentHandle {
        self.document.clone()
    }

    /// Drain the inbox, dispatching every envelope. Returns the number of
    /// envelopes processed.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(envelope) = self.rx.try_recv() {
            processed += 1;
            self.dispatch(envelope);
        }
        processed
    }

    fn dispatch(&mut self, envelope: Envelope) {
        match envelope.body {
            Body::SlotUpdate { workspace, slot, value } => {
                if workspace == self.presence.address() {
                    self.presence.apply_update(envelope.from, slot, value);
                } else {
                    debug!(%workspace, "slot update for unattached workspace; ignored");
                }
            }
            Body::AttendeeJoined { attendee } => {
                self.presence.apply_joined(attendee);
            }
            Body::AttendeeDisconnected { attendee } => {
                self.presence.apply_disconnected(attendee);
            }
            Body::DocOp { op } => {
                self.document.apply_remote(&op);
            }
            Body::Error { message } => {
                warn!(%message, "transport reported an error");
            }
        }
    }

    /// Leave the session. Consumes the client; its subscriptions die with
    /// the components that hold them.
    pub fn disconnect(self) {
        self.hub.disconnect(self.attendee);
    }
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
