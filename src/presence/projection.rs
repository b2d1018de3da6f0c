//! Presence projection — who is viewing what, right now.
//!
//! DESIGN
//! ======
//! The projection is a materialized view over the presence event stream:
//! three maps keyed by attendee, maintained by a pure reducer so the
//! update rule is testable without any transport. Construction subscribes
//! first and seeds from `current_values` second; with the single-dispatch
//! pump no update can land between the two.
//!
//! The correctness property that matters: a disconnected attendee is
//! removed from every map the moment its disconnect event is processed,
//! regardless of what the transport still retains for it. Queries can
//! therefore never report a ghost viewer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::envelope::{AttendeeId, CandidateSelection, JobSelection, SlotKey, UserInfo};
use crate::presence::channel::{AttendeeLifecycle, PresenceWorkspace, SlotUpdate};
use crate::subs::Subscription;

// =============================================================================
// EVENTS + STATE
// =============================================================================

/// One input to the reducer.
#[derive(Debug, Clone)]
pub enum PresenceEvent {
    SlotUpdated {
        attendee: AttendeeId,
        slot: SlotKey,
        value: serde_json::Value,
    },
    AttendeeJoined(AttendeeId),
    AttendeeDisconnected(AttendeeId),
}

/// The materialized view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionState {
    /// attendee -> selected job id (non-empty by construction).
    pub job_views: HashMap<AttendeeId, String>,
    /// attendee -> selected candidate id (non-empty by construction).
    pub candidate_views: HashMap<AttendeeId, String>,
    /// attendee -> published identity.
    pub identities: HashMap<AttendeeId, UserInfo>,
}

// =============================================================================
// REDUCER
// =============================================================================

/// Apply one event to the view. The empty-string sentinel deletes; a
/// disconnect removes the attendee everywhere; a join changes nothing
/// (the attendee has not published yet). Malformed slot payloads are
/// ignored.
pub fn reduce(state: &mut ProjectionState, event: &PresenceEvent) {
    match event {
        PresenceEvent::SlotUpdated { attendee, slot: SlotKey::JobSelection, value } => {
            let Ok(selection) = serde_json::from_value::<JobSelection>(value.clone()) else {
                trace!(%attendee, "unparseable job selection; ignored");
                return;
            };
            if selection.job_selected.is_empty() {
                state.job_views.remove(attendee);
            } else {
                state.job_views.insert(*attendee, selection.job_selected);
            }
        }
        PresenceEvent::SlotUpdated { attendee, slot: SlotKey::CandidateSelection, value } => {
            let Ok(selection) = serde_json::from_value::<CandidateSelection>(value.clone()) else {
                trace!(%attendee, "unparseable candidate selection; ignored");
                return;
            };
            if selection.candidate_selected.is_empty() {
                state.candidate_views.remove(attendee);
            } else {
                state.candidate_views.insert(*attendee, selection.candidate_selected);
            }
        }
        PresenceEvent::SlotUpdated { attendee, slot: SlotKey::UserInfo, value } => {
            let Ok(info) = serde_json::from_value::<UserInfo>(value.clone()) else {
                trace!(%attendee, "unparseable user info; ignored");
                return;
            };
            // The all-empty placeholder means "not published yet".
            if info.user_id.is_empty() {
                state.identities.remove(attendee);
            } else {
                state.identities.insert(*attendee, info);
            }
        }
        PresenceEvent::AttendeeJoined(_) => {}
        PresenceEvent::AttendeeDisconnected(attendee) => {
            state.job_views.remove(attendee);
            state.candidate_views.remove(attendee);
            state.identities.remove(attendee);
        }
    }
}

// =============================================================================
// PROJECTION
// =============================================================================

/// Live projection bound to a workspace. Holds its subscriptions; dropping
/// the projection releases them.
pub struct PresenceProjection {
    state: Arc<Mutex<ProjectionState>>,
    _slot_sub: Subscription,
    _attendee_sub: Subscription,
}

impl PresenceProjection {
    #[must_use]
    pub fn new(presence: &PresenceWorkspace) -> Self {
        let state = Arc::new(Mutex::new(ProjectionState::default()));

        // Subscribe before seeding so no update can fall in between.
        let slot_state = Arc::clone(&state);
        let slot_sub = presence.on_any_slot_update(move |update: &SlotUpdate| {
            let mut view = slot_state.lock().expect("projection poisoned");
            reduce(
                &mut view,
                &PresenceEvent::SlotUpdated {
                    attendee: update.attendee,
                    slot: update.slot,
                    value: update.value.clone(),
                },
            );
        });

        let attendee_state = Arc::clone(&state);
        let attendee_sub = presence.on_attendee_event(move |event: &AttendeeLifecycle| {
            let mut view = attendee_state.lock().expect("projection poisoned");
            match event {
                AttendeeLifecycle::Joined(attendee) => {
                    reduce(&mut view, &PresenceEvent::AttendeeJoined(*attendee));
                }
                AttendeeLifecycle::Disconnected(attendee) => {
                    reduce(&mut view, &PresenceEvent::AttendeeDisconnected(*attendee));
                }
            }
        });

        {
            let mut view = state.lock().expect("projection poisoned");
            for slot in SlotKey::ALL {
                for (attendee, value) in presence.current_values(slot) {
                    reduce(&mut view, &PresenceEvent::SlotUpdated { attendee, slot, value });
                }
            }
        }

        Self { state, _slot_sub: slot_sub, _attendee_sub: attendee_sub }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Identities of attendees currently viewing a job. Attendees with no
    /// resolvable identity are silently dropped.
    #[must_use]
    pub fn viewers_of_job(&self, job_id: &str) -> Vec<UserInfo> {
        let state = self.state.lock().expect("projection poisoned");
        viewers_of(&state.job_views, &state.identities, job_id)
    }

    /// Identities of attendees currently viewing a candidate.
    #[must_use]
    pub fn viewers_of_candidate(&self, candidate_id: &str) -> Vec<UserInfo> {
        let state = self.state.lock().expect("projection poisoned");
        viewers_of(&state.candidate_views, &state.identities, candidate_id)
    }

    /// Published identity of one attendee, if any.
    #[must_use]
    pub fn identity_of(&self, attendee: AttendeeId) -> Option<UserInfo> {
        self.state
            .lock()
            .expect("projection poisoned")
            .identities
            .get(&attendee)
            .cloned()
    }

    /// All published identities, for the avatar group. One entry per
    /// attendee — a user on two devices appears twice.
    #[must_use]
    pub fn identities(&self) -> Vec<UserInfo> {
        let state = self.state.lock().expect("projection poisoned");
        let mut entries: Vec<(&AttendeeId, &UserInfo)> = state.identities.iter().collect();
        entries.sort_by_key(|(attendee, _)| **attendee);
        entries.into_iter().map(|(_, info)| info.clone()).collect()
    }

    /// Snapshot of the raw view, for inspection.
    #[must_use]
    pub fn state(&self) -> ProjectionState {
        self.state.lock().expect("projection poisoned").clone()
    }
}

fn viewers_of(
    views: &HashMap<AttendeeId, String>,
    identities: &HashMap<AttendeeId, UserInfo>,
    entity_id: &str,
) -> Vec<UserInfo> {
    let mut viewing: Vec<AttendeeId> = views
        .iter()
        .filter(|(_, selected)| selected.as_str() == entity_id)
        .map(|(attendee, _)| *attendee)
        .collect();
    viewing.sort_unstable();
    viewing
        .into_iter()
        .filter_map(|attendee| identities.get(&attendee).cloned())
        .collect()
}

#[cfg(test)]
#[path = "projection_test.rs"]
mod tests;
