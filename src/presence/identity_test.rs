use super::*;
use crate::envelope::{APP_SELECTION_WORKSPACE, AttendeeId, Body, SlotKey};
use crate::hub::Outbound;
use serde_json::json;

struct CaptureOutbound {
    sent: Mutex<Vec<Body>>,
}

impl CaptureOutbound {
    fn new() -> Arc<Self> {
        Arc::new(Self { sent: Mutex::new(Vec::new()) })
    }

    fn user_info_publishes(&self) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|body| match body {
                Body::SlotUpdate { slot: SlotKey::UserInfo, value, .. } => Some(value.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Outbound for CaptureOutbound {
    fn publish(&self, _from: AttendeeId, body: Body) {
        self.sent.lock().unwrap().push(body);
    }
}

fn workspace(outbound: Arc<CaptureOutbound>) -> PresenceWorkspace {
    PresenceWorkspace::attach(APP_SELECTION_WORKSPACE, AttendeeId::new(), outbound)
}

#[test]
fn directory_member_carries_email_guest_does_not() {
    let directory = AudienceMember::Directory {
        id: "u1".into(),
        name: "Alice".into(),
        email: "alice@example.com".into(),
    };
    let info = directory.user_info();
    assert_eq!(info.user_email, "alice@example.com");

    let guest = AudienceMember::Guest { id: "g1".into(), name: "Visitor".into() };
    let info = guest.user_info();
    assert_eq!(info.user_id, "g1");
    assert_eq!(info.user_email, "");
}

#[test]
fn resolver_publishes_identity_on_construction() {
    let outbound = CaptureOutbound::new();
    let audience = LocalAudience::new();
    audience.set_myself(Some(AudienceMember::Guest { id: "g1".into(), name: "Visitor".into() }));

    let _resolver = IdentityResolver::new(Arc::new(audience), workspace(outbound.clone()));

    assert_eq!(
        outbound.user_info_publishes(),
        vec![json!({ "userId": "g1", "userName": "Visitor", "userEmail": "" })]
    );
}

#[test]
fn absent_myself_is_a_silent_wait() {
    let outbound = CaptureOutbound::new();
    let audience = LocalAudience::new();

    let _resolver = IdentityResolver::new(Arc::new(audience.clone()), workspace(outbound.clone()));
    assert!(outbound.user_info_publishes().is_empty());

    // The audience connecting later triggers the publish.
    audience.set_myself(Some(AudienceMember::Directory {
        id: "u1".into(),
        name: "Alice".into(),
        email: "alice@example.com".into(),
    }));
    assert_eq!(outbound.user_info_publishes().len(), 1);
}

#[test]
fn membership_churn_republishes_identity() {
    let outbound = CaptureOutbound::new();
    let audience = LocalAudience::new();
    audience.set_myself(Some(AudienceMember::Guest { id: "g1".into(), name: "Visitor".into() }));

    let _resolver = IdentityResolver::new(Arc::new(audience.clone()), workspace(outbound.clone()));
    audience.notify_members_changed();
    audience.notify_members_changed();

    // Construction plus one per change event.
    assert_eq!(outbound.user_info_publishes().len(), 3);
}

#[test]
fn dropping_the_resolver_stops_publication() {
    let outbound = CaptureOutbound::new();
    let audience = LocalAudience::new();
    audience.set_myself(Some(AudienceMember::Guest { id: "g1".into(), name: "Visitor".into() }));

    let resolver = IdentityResolver::new(Arc::new(audience.clone()), workspace(outbound.clone()));
    drop(resolver);
    audience.notify_members_changed();

    assert_eq!(outbound.user_info_publishes().len(), 1, "only the construction publish");
}
