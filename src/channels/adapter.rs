//! Channel adapter boundary
//!
//! The host transport implements [`ChannelAdapter`] for the primitives the
//! recovery path needs and pushes [`ChannelEvent`]s into the engine.

use super::message::{Envelope, MessageUpdate, OutboundMessage};
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Events delivered by the host transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// Batch of newly observed messages, self-sent included
    MessagesObserved { messages: Vec<Envelope> },
    /// Batch of partial updates to existing messages
    MessagesUpdated { updates: Vec<MessageUpdate> },
    /// Transport connected
    Connected { channel: String },
    /// Transport disconnected
    Disconnected { channel: String, reason: String },
}

impl ChannelEvent {
    /// Parse one JSON-encoded event
    pub fn from_json(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|e| Error::MalformedEnvelope(e.to_string()))
    }
}

/// Transport primitives consumed by the recovery path
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Adapter name used in logs
    fn name(&self) -> &str;

    /// Send a message, returning the transport message ID
    async fn send_message(&self, message: OutboundMessage) -> Result<String>;

    /// Download the media referenced by an envelope.
    ///
    /// Return [`Error::MediaExpired`] when the reference is stale and a
    /// re-upload request may refresh it.
    async fn download_media(&self, envelope: &Envelope) -> Result<Bytes>;

    /// Ask the sender's device to re-upload expired media, returning the
    /// envelope with refreshed media references.
    async fn request_media_reupload(&self, envelope: &Envelope) -> Result<Envelope> {
        Err(Error::MediaRecovery(format!(
            "{} does not support media re-upload requests (message {})",
            self.name(),
            envelope.key.message_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::MessageKey;

    #[test]
    fn test_event_json_shape() {
        let json = r#"{
            "event": "messages_observed",
            "messages": [{
                "key": {"chat_id": "c1", "message_id": "m1"},
                "author_id": "alice",
                "message": {"type": "conversation", "body": "hello"}
            }]
        }"#;
        match serde_json::from_str::<ChannelEvent>(json).unwrap() {
            ChannelEvent::MessagesObserved { messages } => {
                assert_eq!(messages.len(), 1);
                assert_eq!(messages[0].key, MessageKey::new("c1", "m1"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_update_event_json_shape() {
        let json = r#"{
            "event": "messages_updated",
            "updates": [{
                "key": {"chat_id": "c1", "message_id": "m9"},
                "message": {"type": "protocol", "body": {"kind": "revoke", "key": {"chat_id": "c1", "message_id": "m1"}}}
            }]
        }"#;
        let event: ChannelEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, ChannelEvent::MessagesUpdated { ref updates } if updates.len() == 1));
    }

    #[test]
    fn test_from_json_reports_malformed_events() {
        let err = ChannelEvent::from_json(r#"{"event": "messages_observed"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedEnvelope(_)));

        let event = ChannelEvent::from_json(r#"{"event": "connected", "channel": "wa"}"#).unwrap();
        assert!(matches!(event, ChannelEvent::Connected { channel } if channel == "wa"));
    }

    struct NoReupload;

    #[async_trait]
    impl ChannelAdapter for NoReupload {
        fn name(&self) -> &str {
            "none"
        }

        async fn send_message(&self, _message: OutboundMessage) -> Result<String> {
            Ok("id".to_string())
        }

        async fn download_media(&self, _envelope: &Envelope) -> Result<Bytes> {
            Err(Error::MediaExpired("gone".to_string()))
        }
    }

    #[tokio::test]
    async fn test_default_reupload_is_unsupported() {
        let envelope = Envelope::text(MessageKey::new("c1", "m1"), "a", "x");
        let err = NoReupload.request_media_reupload(&envelope).await.unwrap_err();
        assert!(matches!(err, Error::MediaRecovery(msg) if msg.contains("m1")));
    }
}
