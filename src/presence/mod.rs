//! Presence layer: broadcast channel, identity resolution, and the
//! materialized projection of who is viewing what.

pub mod channel;
pub mod identity;
pub mod projection;

pub use channel::{AttendeeLifecycle, PresenceWorkspace, SlotUpdate};
pub use identity::{Audience, AudienceMember, IdentityResolver, LocalAudience};
pub use projection::{PresenceEvent, PresenceProjection, ProjectionState, reduce};
