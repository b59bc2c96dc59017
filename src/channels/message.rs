//! Host message envelopes and outbound messages
//!
//! Envelopes are passed through the engine opaquely and cached verbatim.
//! Content is a closed tagged union: wire kinds the engine does not know
//! deserialize into [`MessageContent::Unsupported`], as do known kinds whose
//! body does not parse.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Addressing triple of a message as reported by the transport
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageKey {
    /// Chat (conversation) identity
    #[serde(default)]
    pub chat_id: String,
    /// Transport-assigned message ID
    pub message_id: String,
    /// Group participant who sent the message (absent in 1:1 chats)
    #[serde(default)]
    pub participant: Option<String>,
    /// Whether the local account sent the message
    #[serde(default)]
    pub from_me: bool,
}

impl MessageKey {
    pub fn new(chat_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            message_id: message_id.into(),
            participant: None,
            from_me: false,
        }
    }

    pub fn with_participant(mut self, participant: impl Into<String>) -> Self {
        self.participant = Some(participant.into());
        self
    }

    pub fn from_me(mut self) -> Self {
        self.from_me = true;
        self
    }
}

/// A message observed on the transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Addressing of this message
    pub key: MessageKey,
    /// Identity of the author (sender) of the message
    #[serde(default)]
    pub author_id: String,
    /// Display name the author chose, if the transport reports one
    #[serde(default)]
    pub push_name: Option<String>,
    /// Transport timestamp in unix seconds
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Message content; absent for stub/system envelopes
    #[serde(default)]
    pub message: Option<MessageContent>,
}

impl Envelope {
    pub fn new(key: MessageKey, author_id: impl Into<String>, message: MessageContent) -> Self {
        Self {
            key,
            author_id: author_id.into(),
            push_name: None,
            timestamp: None,
            message: Some(message),
        }
    }

    /// Best identity for the sender: author, else group participant, else
    /// the chat itself (one-to-one chats)
    pub fn sender_id(&self) -> &str {
        if !self.author_id.is_empty() {
            &self.author_id
        } else {
            self.key
                .participant
                .as_deref()
                .filter(|p| !p.is_empty())
                .unwrap_or(&self.key.chat_id)
        }
    }

    /// Transport timestamp as a UTC time, when present and in range
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Plain text envelope
    pub fn text(key: MessageKey, author_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(key, author_id, MessageContent::Conversation(text.into()))
    }
}

/// Message content node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
#[serde(from = "RawContent")]
pub enum MessageContent {
    /// Plain text
    Conversation(String),
    /// Text with link preview, quoting or mentions
    ExtendedText(ExtendedText),
    Image(MediaMessage),
    Video(MediaMessage),
    Sticker(MediaMessage),
    Audio(MediaMessage),
    Document(MediaMessage),
    Location(LocationMessage),
    /// Disappearing-messages wrapper
    Ephemeral(Box<MessageContent>),
    /// View-once wrapper
    ViewOnce(Box<MessageContent>),
    /// Second-generation view-once wrapper
    ViewOnceV2(Box<MessageContent>),
    /// Protocol control node (revoke, ephemeral settings, ...)
    Protocol(ProtocolMessage),
    /// Any kind this engine does not model
    Unsupported,
}

/// Wire form of a content node before the kind is known
#[derive(Deserialize)]
struct RawContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    body: serde_json::Value,
}

impl From<RawContent> for MessageContent {
    fn from(raw: RawContent) -> Self {
        let kind = raw.kind;
        match Self::from_body(&kind, raw.body) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(kind = %kind, "Malformed content body: {}", e);
                Self::Unsupported
            }
        }
    }
}

impl MessageContent {
    fn from_body(kind: &str, body: serde_json::Value) -> serde_json::Result<Self> {
        use serde_json::from_value;

        Ok(match kind {
            "conversation" => Self::Conversation(from_value(body)?),
            "extended_text" => Self::ExtendedText(from_value(body)?),
            "image" => Self::Image(from_value(body)?),
            "video" => Self::Video(from_value(body)?),
            "sticker" => Self::Sticker(from_value(body)?),
            "audio" => Self::Audio(from_value(body)?),
            "document" => Self::Document(from_value(body)?),
            "location" => Self::Location(from_value(body)?),
            "ephemeral" => Self::Ephemeral(Box::new(from_value(body)?)),
            "view_once" => Self::ViewOnce(Box::new(from_value(body)?)),
            "view_once_v2" => Self::ViewOnceV2(Box::new(from_value(body)?)),
            "protocol" => Self::Protocol(from_value(body)?),
            _ => Self::Unsupported,
        })
    }
}

/// Text body with optional extras
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedText {
    pub text: String,
    #[serde(default)]
    pub matched_text: Option<String>,
    #[serde(default)]
    pub mentions: Vec<String>,
}

/// Downloadable media reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMessage {
    /// Location the host downloads the media from
    #[serde(default)]
    pub url: Option<String>,
    /// Path component used by some transports for re-upload requests
    #[serde(default)]
    pub direct_path: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    /// Original file name (documents)
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_length: Option<u64>,
    /// Voice-note flag (audio)
    #[serde(default)]
    pub ptt: bool,
}

/// Shared location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationMessage {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Protocol control node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolMessage {
    pub kind: ProtocolKind,
    /// Message the control node targets
    #[serde(default)]
    pub key: Option<MessageKey>,
}

/// Protocol control kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    /// Delete-for-everyone
    Revoke,
    EphemeralSetting,
    HistorySyncNotification,
    MessageEdit,
    #[serde(other)]
    Other,
}

/// Partial update delivered on the "messages updated" feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageUpdate {
    /// Message the update applies to
    pub key: MessageKey,
    /// Replacement content carried by the update, if any
    #[serde(default)]
    pub message: Option<MessageContent>,
}

/// Message to send through a channel adapter
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Target chat or user identity
    pub target: String,
    pub content: OutboundContent,
    pub options: SendOptions,
}

impl OutboundMessage {
    pub fn text(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            content: OutboundContent::Text(text.into()),
            options: SendOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SendOptions) -> Self {
        self.options = options;
        self
    }

    /// Same content and target with every send option stripped
    pub fn bare(&self) -> Self {
        Self {
            target: self.target.clone(),
            content: self.content.clone(),
            options: SendOptions::default(),
        }
    }
}

/// Outbound payload
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundContent {
    Text(String),
    Media {
        kind: crate::content::MediaKind,
        data: Bytes,
        mimetype: Option<String>,
        caption: Option<String>,
        file_name: Option<String>,
    },
    Location(LocationMessage),
}

/// Presentation options for a send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Identities mentioned in the message
    pub mentions: Vec<String>,
    /// Mark the message as forwarded by the bot
    pub forwarded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_at_from_timestamp() {
        let mut env = Envelope::text(MessageKey::new("c1", "m1"), "a", "hi");
        assert!(env.observed_at().is_none());

        env.timestamp = Some(1_700_000_000);
        assert_eq!(env.observed_at().map(|t| t.timestamp()), Some(1_700_000_000));

        env.timestamp = Some(i64::MAX);
        assert!(env.observed_at().is_none());
    }

    #[test]
    fn test_key_builders() {
        let key = MessageKey::new("group@g.us", "ABC")
            .with_participant("alice@s.whatsapp.net")
            .from_me();
        assert_eq!(key.chat_id, "group@g.us");
        assert_eq!(key.participant.as_deref(), Some("alice@s.whatsapp.net"));
        assert!(key.from_me);
    }

    #[test]
    fn test_sender_id_fallbacks() {
        let mut env = Envelope::text(MessageKey::new("bob@s.whatsapp.net", "m1"), "", "hi");
        assert_eq!(env.sender_id(), "bob@s.whatsapp.net");

        env.key.participant = Some("carol@s.whatsapp.net".to_string());
        assert_eq!(env.sender_id(), "carol@s.whatsapp.net");

        env.author_id = "dave@s.whatsapp.net".to_string();
        assert_eq!(env.sender_id(), "dave@s.whatsapp.net");
    }

    #[test]
    fn test_envelope_deserialize_image() {
        let json = r#"{
            "key": {"chat_id": "c1", "message_id": "m1"},
            "author_id": "alice",
            "message": {"type": "image", "body": {"url": "file:///tmp/a.jpg", "caption": "pic"}}
        }"#;
        let env: Envelope = serde_json::from_str(json).unwrap();
        match env.message {
            Some(MessageContent::Image(media)) => assert_eq!(media.caption.as_deref(), Some("pic")),
            other => panic!("unexpected content: {:?}", other),
        }
        assert_eq!(env.key.participant, None);
    }

    #[test]
    fn test_unknown_content_is_unsupported() {
        let json = r#"{"type": "poll_creation", "body": {"name": "lunch?"}}"#;
        let content: MessageContent = serde_json::from_str(json).unwrap();
        assert_eq!(content, MessageContent::Unsupported);
    }

    #[test]
    fn test_nested_wrapper_deserialize() {
        let json = r#"{"type": "ephemeral", "body": {"type": "view_once", "body": {"type": "conversation", "body": "hi"}}}"#;
        let content: MessageContent = serde_json::from_str(json).unwrap();
        assert_eq!(
            content,
            MessageContent::Ephemeral(Box::new(MessageContent::ViewOnce(Box::new(
                MessageContent::Conversation("hi".to_string())
            ))))
        );
    }

    #[test]
    fn test_malformed_body_is_unsupported() {
        let json = r#"{"type": "conversation", "body": {"text": 1}}"#;
        let content: MessageContent = serde_json::from_str(json).unwrap();
        assert_eq!(content, MessageContent::Unsupported);

        let json = r#"{"type": "view_once", "body": {"type": "image", "body": 42}}"#;
        let content: MessageContent = serde_json::from_str(json).unwrap();
        assert_eq!(content, MessageContent::ViewOnce(Box::new(MessageContent::Unsupported)));
    }

    #[test]
    fn test_serialize_uses_type_and_body() {
        let content = MessageContent::Conversation("hello".to_string());
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value["type"], "conversation");
        assert_eq!(value["body"], "hello");

        let back: MessageContent = serde_json::from_value(value).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn test_unknown_protocol_kind() {
        let json = r#"{"kind": "app_state_sync_key_share"}"#;
        let proto: ProtocolMessage = serde_json::from_str(json).unwrap();
        assert_eq!(proto.kind, ProtocolKind::Other);
        assert!(proto.key.is_none());
    }

    #[test]
    fn test_bare_strips_options() {
        let msg = OutboundMessage::text("c1", "hi").with_options(SendOptions {
            mentions: vec!["alice".to_string()],
            forwarded: true,
        });
        let bare = msg.bare();
        assert_eq!(bare.target, "c1");
        assert_eq!(bare.content, msg.content);
        assert_eq!(bare.options, SendOptions::default());
    }
}
