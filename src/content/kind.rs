//! Content classification types

use crate::channels::MessageContent;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Downloadable or re-sendable media kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Sticker,
    Audio,
    Document,
    Location,
}

impl MediaKind {
    /// Whether the media has bytes the host must download
    pub fn is_downloadable(&self) -> bool {
        !matches!(self, MediaKind::Location)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Sticker => "sticker",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
            MediaKind::Location => "location",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminant of a resolved content node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Image,
    Video,
    Sticker,
    Audio,
    Document,
    Location,
    /// Protocol nodes, unknown kinds, and nesting past the wrapper bound
    Unsupported,
}

impl ContentKind {
    pub fn media_kind(&self) -> Option<MediaKind> {
        match self {
            ContentKind::Image => Some(MediaKind::Image),
            ContentKind::Video => Some(MediaKind::Video),
            ContentKind::Sticker => Some(MediaKind::Sticker),
            ContentKind::Audio => Some(MediaKind::Audio),
            ContentKind::Document => Some(MediaKind::Document),
            ContentKind::Location => Some(MediaKind::Location),
            ContentKind::Text | ContentKind::Unsupported => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Unsupported => "unsupported",
            other => other.media_kind().map(|m| m.as_str()).unwrap_or("unsupported"),
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content recovered from an archived envelope. Never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredContent {
    pub kind: ContentKind,
    /// Text body or caption (empty when the message had none)
    pub text: String,
    /// Re-acquired media bytes, filled in by the dispatcher
    pub media_bytes: Option<Bytes>,
}

impl RecoveredContent {
    /// Classify a content node and extract its text
    pub fn from_content(content: &MessageContent) -> Self {
        let (_, kind) = super::resolve(content);
        Self {
            kind,
            text: super::extract_text(content),
            media_bytes: None,
        }
    }

    pub fn with_media(mut self, bytes: Bytes) -> Self {
        self.media_bytes = Some(bytes);
        self
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        self.kind.media_kind()
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}
