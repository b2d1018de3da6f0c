//! Presence broadcast channel — three latest-value slots per attendee.
//!
//! DESIGN
//! ======
//! A `PresenceWorkspace` is one client's view of a named workspace. Writes
//! go out fire-and-forget through the transport; reads come from a local
//! cache of the latest value per `(slot, attendee)`, updated as envelopes
//! are pumped. Per-attendee updates on a slot arrive in publish order;
//! nothing is guaranteed across attendees.
//!
//! Reading a slot for an attendee that has never published is an absent
//! lookup (`None`), not a failure. `current_values` only reports currently
//! connected attendees — the transport may retain a disconnected
//! attendee's last value, but it never surfaces here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::envelope::{
    AttendeeId, Body, CandidateSelection, ConnectionStatus, JobSelection, SlotKey, UserInfo,
};
use crate::hub::Outbound;
use crate::subs::{HandlerRegistry, Subscription};

// =============================================================================
// EVENTS
// =============================================================================

/// One observed slot write.
#[derive(Debug, Clone)]
pub struct SlotUpdate {
    pub attendee: AttendeeId,
    pub slot: SlotKey,
    pub value: serde_json::Value,
}

/// Attendee lifecycle as observed through the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendeeLifecycle {
    Joined(AttendeeId),
    Disconnected(AttendeeId),
}

// =============================================================================
// WORKSPACE
// =============================================================================

#[derive(Default)]
struct ChannelState {
    latest: HashMap<(SlotKey, AttendeeId), serde_json::Value>,
    status: HashMap<AttendeeId, ConnectionStatus>,
}

/// One client's attachment to a presence workspace. Clones share state.
#[derive(Clone)]
pub struct PresenceWorkspace {
    address: Arc<str>,
    attendee: AttendeeId,
    outbound: Arc<dyn Outbound>,
    state: Arc<Mutex<ChannelState>>,
    slot_events: HandlerRegistry<SlotUpdate>,
    attendee_events: HandlerRegistry<AttendeeLifecycle>,
}

impl PresenceWorkspace {
    #[must_use]
    pub fn attach(address: &str, attendee: AttendeeId, outbound: Arc<dyn Outbound>) -> Self {
        let mut state = ChannelState::default();
        // The local attendee is connected by definition.
        state.status.insert(attendee, ConnectionStatus::Connected);
        Self {
            address: Arc::from(address),
            attendee,
            outbound,
            state: Arc::new(Mutex::new(state)),
            slot_events: HandlerRegistry::new(),
            attendee_events: HandlerRegistry::new(),
        }
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The local attendee this workspace publishes as.
    #[must_use]
    pub fn local_attendee(&self) -> AttendeeId {
        self.attendee
    }

    // -------------------------------------------------------------------------
    // Publishing
    // -------------------------------------------------------------------------

    /// Overwrite the local attendee's value for a slot. Fire-and-forget;
    /// the local cache updates when the envelope echoes back.
    pub fn set_local(&self, slot: SlotKey, value: serde_json::Value) {
        trace!(slot = ?slot, "publishing local slot value");
        self.outbound.publish(
            self.attendee,
            Body::SlotUpdate { workspace: self.address.to_string(), slot, value },
        );
    }

    pub fn set_local_job_selection(&self, value: &JobSelection) {
        self.set_local(SlotKey::JobSelection, to_value(value));
    }

    pub fn set_local_candidate_selection(&self, value: &CandidateSelection) {
        self.set_local(SlotKey::CandidateSelection, to_value(value));
    }

    pub fn set_local_user_info(&self, value: &UserInfo) {
        self.set_local(SlotKey::UserInfo, to_value(value));
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    /// Observe writes to one slot. Fires for local and remote attendees
    /// alike; successive updates from one attendee arrive in publish order.
    #[must_use]
    pub fn on_slot_update(
        &self,
        slot: SlotKey,
        mut handler: impl FnMut(AttendeeId, &serde_json::Value) + Send + 'static,
    ) -> Subscription {
        self.slot_events.subscribe(move |update: &SlotUpdate| {
            if update.slot == slot {
                handler(update.attendee, &update.value);
            }
        })
    }

    /// Observe writes to every slot of the workspace.
    #[must_use]
    pub fn on_any_slot_update(
        &self,
        handler: impl FnMut(&SlotUpdate) + Send + 'static,
    ) -> Subscription {
        self.slot_events.subscribe(handler)
    }

    /// Observe attendee join/disconnect events.
    #[must_use]
    pub fn on_attendee_event(
        &self,
        handler: impl FnMut(&AttendeeLifecycle) + Send + 'static,
    ) -> Subscription {
        self.attendee_events.subscribe(handler)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Latest value an attendee published to a slot. `None` until its
    /// first publish reaches this client.
    #[must_use]
    pub fn value_for(&self, slot: SlotKey, attendee: AttendeeId) -> Option<serde_json::Value> {
        self.state
            .lock()
            .expect("channel poisoned")
            .latest
            .get(&(slot, attendee))
            .cloned()
    }

    /// Snapshot of the latest values held for currently connected
    /// attendees. Used to seed projections after a late subscribe.
    #[must_use]
    pub fn current_values(&self, slot: SlotKey) -> Vec<(AttendeeId, serde_json::Value)> {
        let state = self.state.lock().expect("channel poisoned");
        let mut values: Vec<(AttendeeId, serde_json::Value)> = state
            .latest
            .iter()
            .filter(|((s, attendee), _)| {
                *s == slot && state.status.get(attendee) == Some(&ConnectionStatus::Connected)
            })
            .map(|((_, attendee), value)| (*attendee, value.clone()))
            .collect();
        values.sort_by_key(|(attendee, _)| *attendee);
        values
    }

    /// Connection status as observed through pumped lifecycle events.
    /// Unknown attendees read as disconnected.
    #[must_use]
    pub fn status_of(&self, attendee: AttendeeId) -> ConnectionStatus {
        self.state
            .lock()
            .expect("channel poisoned")
            .status
            .get(&attendee)
            .copied()
            .unwrap_or(ConnectionStatus::Disconnected)
    }

    // -------------------------------------------------------------------------
    // Envelope ingestion (called from the client pump)
    // -------------------------------------------------------------------------

    pub(crate) fn apply_update(&self, attendee: AttendeeId, slot: SlotKey, value: serde_json::Value) {
        {
            let mut state = self.state.lock().expect("channel poisoned");
            state.latest.insert((slot, attendee), value.clone());
            state.status.entry(attendee).or_insert(ConnectionStatus::Connected);
        }
        self.slot_events.emit(&SlotUpdate { attendee, slot, value });
    }

    pub(crate) fn apply_joined(&self, attendee: AttendeeId) {
        self.state
            .lock()
            .expect("channel poisoned")
            .status
            .insert(attendee, ConnectionStatus::Connected);
        self.attendee_events.emit(&AttendeeLifecycle::Joined(attendee));
    }

    pub(crate) fn apply_disconnected(&self, attendee: AttendeeId) {
        self.state
            .lock()
            .expect("channel poisoned")
            .status
            .insert(attendee, ConnectionStatus::Disconnected);
        self.attendee_events.emit(&AttendeeLifecycle::Disconnected(attendee));
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> serde_json::Value {
    // Slot value structs serialize infallibly.
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;
