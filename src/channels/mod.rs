//! Channel boundary
//!
//! Message envelopes as delivered by the host transport, the adapter trait
//! the recovery path sends and downloads through, and a console adapter for
//! offline replay.

mod adapter;
mod console;
mod message;
#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{ChannelAdapter, ChannelEvent};
pub use console::ConsoleAdapter;
pub use message::{
    Envelope, ExtendedText, LocationMessage, MediaMessage, MessageContent, MessageKey,
    MessageUpdate, OutboundContent, OutboundMessage, ProtocolKind, ProtocolMessage, SendOptions,
};
