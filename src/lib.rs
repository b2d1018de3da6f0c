//! hireboard — collaborative recruiting dashboard core.
//!
//! The presence and shared-selection layer of a multi-user recruiting
//! dashboard: each connected client publishes what it is looking at into a
//! shared broadcast workspace, consumes its peers' publications into a
//! live projection ("who is viewing this job?"), and reconciles its own
//! selection against a replicated document whose nodes any client may
//! delete at any time.
//!
//! The crate ships two halves:
//! - the client-side machinery ([`hub`], [`presence`], [`selection`],
//!   [`document`]), single-threaded and event-driven per client;
//! - a websocket relay ([`routes`], [`state`]) hosting the same protocol
//!   for remote clients.

pub mod demo;
pub mod document;
pub mod envelope;
pub mod hub;
pub mod presence;
pub mod routes;
pub mod selection;
pub mod state;
pub mod subs;
