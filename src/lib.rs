//! Recallbox - Ephemeral Message Archive and Delete Recovery
//!
//! Recallbox keeps a short-lived, in-memory copy of the messages a chat bot
//! observes. When a participant deletes a message for everyone, the engine
//! finds the archived copy and re-sends its content, with a notice naming the
//! chat and the deleter, either to the same chat or to a configured owner.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Channel Adapter                            │
//! │        messages observed feed          messages updated feed        │
//! └───────────────┬──────────────────────────────────┬──────────────────┘
//!                 │ ChannelEvent                      │ ChannelEvent
//! ┌───────────────▼──────────────────────────────────▼──────────────────┐
//! │                      Revocation Correlator                          │
//! │  - Archive ordinary messages (including our own)                    │
//! │  - Normalize revokes from both feeds into one notice                │
//! └───────────────┬──────────────────────────────────┬──────────────────┘
//!                 │ insert / lookup                   │ RevocationNotice
//! ┌───────────────▼────────────────┐  ┌──────────────▼──────────────────┐
//! │          Archive Store         │  │       Recovery Dispatcher        │
//! │  - strict / loose / id keys    │◄─┤  - Content resolver              │
//! │  - TTL sweep                   │  │  - Media re-acquisition          │
//! │  - capacity eviction           │  │  - Send with bare fallback       │
//! └────────────────────────────────┘  └──────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: Engine facade and event pump
//! - [`archive`]: Bounded, expiring message archive
//! - [`recovery`]: Revocation correlation and recovery dispatch
//! - [`content`]: Message content resolution and classification
//! - [`channels`]: Channel adapter trait and message model
//! - [`config`]: Configuration management

pub mod archive;
pub mod channels;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod recovery;

pub use config::RecallConfig;
pub use engine::{RecallEngine, RecallEngineBuilder};
pub use error::{Error, Result};
pub use recovery::{RecoveryOutcome, StatsSnapshot};
