//! Envelope — the universal broadcast message for hireboard.
//!
//! ARCHITECTURE
//! ============
//! Everything that crosses the transport is an Envelope: presence slot
//! updates, attendee lifecycle events, and document operations. The hub (or
//! the gateway) stamps each envelope with a sequence number and the
//! originating attendee before fan-out, so every replica observes one total
//! order.
//!
//! DESIGN
//! ======
//! - Slot values travel as raw JSON; the typed slot structs in this module
//!   define the schema of the three `appSelection:workspace` slots.
//! - The empty string is the "nothing selected" sentinel for the selection
//!   slots — observers interpret it as a deletion, not a value.
//! - Clients send `ClientMessage` (unstamped); they receive `Envelope`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::DocumentOp;

// =============================================================================
// WORKSPACE ADDRESS
// =============================================================================

/// Fixed address of the shared selection-presence workspace. Any client
/// attaching to this address joins the same presence group.
pub const APP_SELECTION_WORKSPACE: &str = "appSelection:workspace";

// =============================================================================
// ATTENDEE
// =============================================================================

/// One connected session. Distinct from user identity: one user may hold
/// several attendee ids across tabs or devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttendeeId(pub Uuid);

impl AttendeeId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttendeeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AttendeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Connection status of an attendee as seen by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

// =============================================================================
// SLOTS
// =============================================================================

/// The three latest-value slots of the selection workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotKey {
    JobSelection,
    CandidateSelection,
    UserInfo,
}

impl SlotKey {
    /// All slots, in a fixed order. Used for snapshot seeding.
    pub const ALL: [SlotKey; 3] = [SlotKey::JobSelection, SlotKey::CandidateSelection, SlotKey::UserInfo];
}

/// Value of the job-selection slot. Empty string means "no job selected".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSelection {
    pub job_selected: String,
}

impl JobSelection {
    #[must_use]
    pub fn selected(job_id: impl Into<String>) -> Self {
        Self { job_selected: job_id.into() }
    }

    /// The deselection sentinel.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// Value of the candidate-selection slot. Empty string means "none".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSelection {
    pub candidate_selected: String,
}

impl CandidateSelection {
    #[must_use]
    pub fn selected(candidate_id: impl Into<String>) -> Self {
        Self { candidate_selected: candidate_id.into() }
    }

    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// Identity record published into the user-info slot. Immutable per session;
/// re-published whenever the audience reports a membership change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
}

// =============================================================================
// BODY
// =============================================================================

/// Broadcast payload carried by an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Body {
    /// An attendee connected to the session.
    AttendeeJoined { attendee: AttendeeId },
    /// An attendee disconnected. Its retained slot values are stale from
    /// this point on and must be excluded from projections.
    AttendeeDisconnected { attendee: AttendeeId },
    /// Latest-value write to one slot of one workspace.
    SlotUpdate {
        workspace: String,
        slot: SlotKey,
        value: serde_json::Value,
    },
    /// A document mutation, applied by every replica in envelope order.
    DocOp { op: DocumentOp },
    /// Relay-level failure report (bad inbound message). Never fatal.
    Error { message: String },
}

/// A stamped, totally ordered broadcast message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Hub-assigned sequence number; strictly increasing per session.
    pub seq: u64,
    /// The attendee this envelope originated from.
    pub from: AttendeeId,
    pub body: Body,
}

// =============================================================================
// CLIENT MESSAGES
// =============================================================================

/// What a gateway client sends. The relay stamps `seq` and `from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientMessage {
    SlotUpdate {
        workspace: String,
        slot: SlotKey,
        value: serde_json::Value,
    },
    DocOp { op: DocumentOp },
}

/// One retained slot value, as carried in a welcome snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetainedSlot {
    pub slot: SlotKey,
    pub attendee: AttendeeId,
    pub value: serde_json::Value,
}

/// First message a client receives after connecting: its own attendee id,
/// the currently connected peers, their retained slot values, and the
/// document op log. Disconnected attendees' retained values are never
/// included — filtering stale presence is structural, not exceptional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Welcome {
    pub attendee: AttendeeId,
    pub peers: Vec<AttendeeId>,
    pub slots: Vec<RetainedSlot>,
    pub ops: Vec<DocumentOp>,
}

/// Everything the relay sends down a websocket: one welcome, then
/// envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome(Welcome),
    Envelope(Envelope),
}

// =============================================================================
// ERRORS
// =============================================================================

/// Decode failure for inbound gateway messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid message: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl ClientMessage {
    /// Parse an inbound text message.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidJson` if the text is not a valid
    /// client message.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
#[path = "envelope_test.rs"]
mod tests;
