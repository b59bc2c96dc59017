//! Message identity and derived lookup keys

use crate::channels::MessageKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite identity of a message: `(chat, message, participant)`.
///
/// `participant_id` is empty for one-to-one chats.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageIdentity {
    pub chat_id: String,
    pub message_id: String,
    pub participant_id: String,
}

impl MessageIdentity {
    pub fn new(
        chat_id: impl Into<String>,
        message_id: impl Into<String>,
        participant_id: impl Into<String>,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            message_id: message_id.into(),
            participant_id: participant_id.into(),
        }
    }

    /// Identity of a transport key
    pub fn from_key(key: &MessageKey) -> Self {
        Self::new(
            key.chat_id.as_str(),
            key.message_id.as_str(),
            key.participant.as_deref().unwrap_or_default(),
        )
    }

    /// Exact key: `chat|message|participant`
    pub fn strict_key(&self) -> String {
        format!("{}|{}|{}", self.chat_id, self.message_id, self.participant_id)
    }

    /// Key tolerating a missing or mismatched participant: `chat|message`
    pub fn loose_key(&self) -> String {
        format!("{}|{}", self.chat_id, self.message_id)
    }

    /// Last-resort key: the message ID alone
    pub fn id_key(&self) -> String {
        self.message_id.clone()
    }

    /// Participant if present, else `None`
    pub fn participant(&self) -> Option<&str> {
        if self.participant_id.is_empty() {
            None
        } else {
            Some(&self.participant_id)
        }
    }
}

impl From<&MessageKey> for MessageIdentity {
    fn from(key: &MessageKey) -> Self {
        Self::from_key(key)
    }
}

impl fmt::Display for MessageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.strict_key())
    }
}
