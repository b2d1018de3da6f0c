use super::*;
use crate::envelope::JobSelection;
use crate::hub::LocalHub;
use serde_json::json;

fn info(user_id: &str, name: &str) -> UserInfo {
    UserInfo {
        user_id: user_id.to_string(),
        user_name: name.to_string(),
        user_email: format!("{user_id}@example.com"),
    }
}

fn slot_event(attendee: AttendeeId, slot: SlotKey, value: serde_json::Value) -> PresenceEvent {
    PresenceEvent::SlotUpdated { attendee, slot, value }
}

// =============================================================================
// REDUCER
// =============================================================================

#[test]
fn selection_updates_insert_and_sentinel_removes() {
    let mut state = ProjectionState::default();
    let attendee = AttendeeId::new();

    reduce(&mut state, &slot_event(attendee, SlotKey::JobSelection, json!({ "jobSelected": "1" })));
    assert_eq!(state.job_views.get(&attendee).map(String::as_str), Some("1"));

    reduce(&mut state, &slot_event(attendee, SlotKey::JobSelection, json!({ "jobSelected": "" })));
    assert!(state.job_views.is_empty());

    reduce(
        &mut state,
        &slot_event(attendee, SlotKey::CandidateSelection, json!({ "candidateSelected": "7" })),
    );
    assert_eq!(state.candidate_views.get(&attendee).map(String::as_str), Some("7"));
    reduce(
        &mut state,
        &slot_event(attendee, SlotKey::CandidateSelection, json!({ "candidateSelected": "" })),
    );
    assert!(state.candidate_views.is_empty());
}

#[test]
fn empty_user_id_clears_the_identity() {
    let mut state = ProjectionState::default();
    let attendee = AttendeeId::new();

    reduce(
        &mut state,
        &slot_event(attendee, SlotKey::UserInfo, serde_json::to_value(info("u1", "Alice")).unwrap()),
    );
    assert_eq!(state.identities.len(), 1);

    reduce(
        &mut state,
        &slot_event(attendee, SlotKey::UserInfo, serde_json::to_value(UserInfo::default()).unwrap()),
    );
    assert!(state.identities.is_empty());
}

#[test]
fn disconnect_removes_the_attendee_everywhere() {
    let mut state = ProjectionState::default();
    let leaving = AttendeeId::new();
    let staying = AttendeeId::new();

    for attendee in [leaving, staying] {
        reduce(&mut state, &slot_event(attendee, SlotKey::JobSelection, json!({ "jobSelected": "1" })));
        reduce(
            &mut state,
            &slot_event(attendee, SlotKey::UserInfo, serde_json::to_value(info("u", "U")).unwrap()),
        );
    }

    reduce(&mut state, &PresenceEvent::AttendeeDisconnected(leaving));

    assert!(!state.job_views.contains_key(&leaving));
    assert!(!state.identities.contains_key(&leaving));
    assert!(state.job_views.contains_key(&staying));
    assert!(state.identities.contains_key(&staying));
}

#[test]
fn join_and_malformed_payloads_change_nothing() {
    let mut state = ProjectionState::default();
    let attendee = AttendeeId::new();

    reduce(&mut state, &PresenceEvent::AttendeeJoined(attendee));
    assert_eq!(state, ProjectionState::default());

    reduce(&mut state, &slot_event(attendee, SlotKey::JobSelection, json!("not an object")));
    reduce(&mut state, &slot_event(attendee, SlotKey::UserInfo, json!({ "userId": 42 })));
    assert_eq!(state, ProjectionState::default());
}

// =============================================================================
// LIVE PROJECTION
// =============================================================================

#[test]
fn viewers_resolve_through_published_identities() {
    let hub = LocalHub::new();
    let mut a = hub.connect();
    let mut b = hub.connect();
    a.pump();
    b.pump();

    let projection = PresenceProjection::new(&b.presence());

    a.presence().set_local_user_info(&info("u-alice", "Alice"));
    a.presence().set_local_job_selection(&JobSelection::selected("1"));
    b.pump();

    assert_eq!(projection.viewers_of_job("1"), vec![info("u-alice", "Alice")]);
    assert!(projection.viewers_of_job("2").is_empty());
    assert_eq!(projection.identity_of(a.attendee_id()), Some(info("u-alice", "Alice")));
    assert_eq!(projection.identities(), vec![info("u-alice", "Alice")]);
}

#[test]
fn viewers_without_identities_are_dropped() {
    let hub = LocalHub::new();
    let mut a = hub.connect();
    let mut b = hub.connect();
    a.pump();
    b.pump();

    let projection = PresenceProjection::new(&b.presence());
    a.presence().set_local_job_selection(&JobSelection::selected("1"));
    b.pump();

    assert!(projection.viewers_of_job("1").is_empty());
    assert_eq!(projection.state().job_views.len(), 1);
}

#[test]
fn late_projection_seeds_from_current_values() {
    let hub = LocalHub::new();
    let mut a = hub.connect();
    let mut b = hub.connect();
    a.pump();
    b.pump();

    a.presence().set_local_user_info(&info("u-alice", "Alice"));
    a.presence().set_local_job_selection(&JobSelection::selected("1"));
    b.pump();

    // Built after the updates were pumped: the seed must cover them.
    let projection = PresenceProjection::new(&b.presence());
    assert_eq!(projection.viewers_of_job("1"), vec![info("u-alice", "Alice")]);
}

#[test]
fn disconnect_leaves_no_ghost_viewer() {
    let hub = LocalHub::new();
    let mut a = hub.connect();
    let mut b = hub.connect();
    a.pump();
    b.pump();

    let projection = PresenceProjection::new(&b.presence());
    a.presence().set_local_user_info(&info("u-alice", "Alice"));
    a.presence().set_local_job_selection(&JobSelection::selected("1"));
    b.pump();
    assert_eq!(projection.viewers_of_job("1").len(), 1);

    let departed = a.attendee_id();
    a.disconnect();
    b.pump();

    // The transport still retains the cell; the projection must not.
    assert!(hub.retained_value(crate::envelope::APP_SELECTION_WORKSPACE, SlotKey::JobSelection, departed).is_some());
    assert!(projection.viewers_of_job("1").is_empty());
    assert!(projection.identity_of(departed).is_none());
}
