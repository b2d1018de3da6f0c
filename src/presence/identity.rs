//! Identity resolution — who the local user is, and where that comes from.
//!
//! DESIGN
//! ======
//! The audience service is the source of truth for the local member.
//! Identity sources differ in shape (the directory-backed service carries
//! an email, the guest/local one does not), so the member is a tagged
//! union resolved once — never a speculative cast at each consumer.
//!
//! Resolution is best-effort: if the audience has no "myself" record yet
//! (not connected), nothing is published and the resolver simply waits for
//! the next `members_changed` event. This path never errors.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::envelope::UserInfo;
use crate::presence::channel::PresenceWorkspace;
use crate::subs::{HandlerRegistry, Subscription};

// =============================================================================
// AUDIENCE
// =============================================================================

/// A member record as supplied by one of the identity sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudienceMember {
    /// Directory-backed member; carries an email address.
    Directory { id: String, name: String, email: String },
    /// Guest member from the local service; no email.
    Guest { id: String, name: String },
}

impl AudienceMember {
    /// The identity record to publish for this member.
    #[must_use]
    pub fn user_info(&self) -> UserInfo {
        match self {
            AudienceMember::Directory { id, name, email } => UserInfo {
                user_id: id.clone(),
                user_name: name.clone(),
                user_email: email.clone(),
            },
            AudienceMember::Guest { id, name } => UserInfo {
                user_id: id.clone(),
                user_name: name.clone(),
                user_email: String::new(),
            },
        }
    }
}

/// Membership service: who am I, and tell me when membership changes.
pub trait Audience: Send + Sync {
    /// The local member, or `None` while not yet connected.
    fn get_myself(&self) -> Option<AudienceMember>;

    /// Fires on every membership change (connect, reconnect, peers coming
    /// and going).
    fn on_members_changed(&self, handler: Box<dyn FnMut() + Send>) -> Subscription;
}

/// In-process audience used by tests and demos. `set_myself` simulates the
/// service connecting (or reconnecting as someone else).
#[derive(Clone)]
pub struct LocalAudience {
    myself: Arc<Mutex<Option<AudienceMember>>>,
    events: HandlerRegistry<()>,
}

impl Default for LocalAudience {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalAudience {
    #[must_use]
    pub fn new() -> Self {
        Self { myself: Arc::new(Mutex::new(None)), events: HandlerRegistry::new() }
    }

    /// Set the local member and fire `members_changed`.
    pub fn set_myself(&self, member: Option<AudienceMember>) {
        *self.myself.lock().expect("audience poisoned") = member;
        self.events.emit(&());
    }

    /// Fire `members_changed` without touching the local member, as a
    /// remote join/leave would.
    pub fn notify_members_changed(&self) {
        self.events.emit(&());
    }
}

impl Audience for LocalAudience {
    fn get_myself(&self) -> Option<AudienceMember> {
        self.myself.lock().expect("audience poisoned").clone()
    }

    fn on_members_changed(&self, mut handler: Box<dyn FnMut() + Send>) -> Subscription {
        self.events.subscribe(move |(): &()| handler())
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Publishes the local identity into the workspace's user-info slot, on
/// construction and again on every membership change. Dropping the
/// resolver releases its audience subscription.
pub struct IdentityResolver {
    _members_changed: Subscription,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(audience: Arc<dyn Audience>, presence: PresenceWorkspace) -> Self {
        publish_local_identity(audience.as_ref(), &presence);

        let audience_for_events = Arc::clone(&audience);
        let members_changed = audience.on_members_changed(Box::new(move || {
            publish_local_identity(audience_for_events.as_ref(), &presence);
        }));

        Self { _members_changed: members_changed }
    }
}

fn publish_local_identity(audience: &dyn Audience, presence: &PresenceWorkspace) {
    match audience.get_myself() {
        Some(member) => presence.set_local_user_info(&member.user_info()),
        None => debug!("audience has no local member yet; waiting for members_changed"),
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
