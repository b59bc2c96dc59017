//! Content resolution for archived envelopes
//!
//! Unwraps wrapper layers (ephemeral, view-once), extracts text bodies and
//! classifies media. Everything here is a pure function of its input.

mod kind;
pub mod resolver;

pub use kind::{ContentKind, MediaKind, RecoveredContent};
pub use resolver::{
    detect_media_kind, extract_text, location_of, media_of, resolve, revoked_key,
    MAX_WRAPPER_DEPTH,
};
