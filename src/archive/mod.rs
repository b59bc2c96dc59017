//! Ephemeral message archive
//!
//! A bounded, TTL-expiring in-memory cache of observed envelopes. Every
//! record is reachable through three key forms so that revocation notices
//! with partial addressing still find the original message:
//!
//! ```text
//! strict   chat|message|participant ─┐
//! loose    chat|message             ─┼─► handle ─► ArchivedRecord
//! id-only  message                  ─┘
//! ```

mod identity;
mod store;

pub use identity::MessageIdentity;
pub use store::{ArchiveStore, ArchivedRecord, EVICTION_RATIO, HIGH_WATER_MULTIPLIER};
