//! Wrapper unwrapping and content classification

use super::kind::{ContentKind, MediaKind};
use crate::channels::{LocationMessage, MediaMessage, MessageContent, MessageKey, ProtocolKind};

/// Maximum number of wrapper layers unwrapped before a node is treated as
/// unsupported.
pub const MAX_WRAPPER_DEPTH: usize = 5;

/// Unwrap wrapper layers and return the innermost node with its kind.
///
/// Payloads nested deeper than [`MAX_WRAPPER_DEPTH`] resolve to the node
/// reached at the bound, classified [`ContentKind::Unsupported`].
pub fn resolve(content: &MessageContent) -> (&MessageContent, ContentKind) {
    let mut node = content;
    let mut depth = 0;

    loop {
        let inner = match node {
            MessageContent::Ephemeral(inner)
            | MessageContent::ViewOnce(inner)
            | MessageContent::ViewOnceV2(inner) => inner.as_ref(),
            _ => return (node, classify(node)),
        };

        if depth == MAX_WRAPPER_DEPTH {
            tracing::debug!(depth, "Wrapper nesting exceeds bound, treating as unsupported");
            return (node, ContentKind::Unsupported);
        }
        depth += 1;
        node = inner;
    }
}

fn classify(node: &MessageContent) -> ContentKind {
    match node {
        MessageContent::Conversation(_) | MessageContent::ExtendedText(_) => ContentKind::Text,
        MessageContent::Image(_) => ContentKind::Image,
        MessageContent::Video(_) => ContentKind::Video,
        MessageContent::Sticker(_) => ContentKind::Sticker,
        MessageContent::Audio(_) => ContentKind::Audio,
        MessageContent::Document(_) => ContentKind::Document,
        MessageContent::Location(_) => ContentKind::Location,
        MessageContent::Protocol(_) | MessageContent::Unsupported => ContentKind::Unsupported,
        MessageContent::Ephemeral(_)
        | MessageContent::ViewOnce(_)
        | MessageContent::ViewOnceV2(_) => ContentKind::Unsupported,
    }
}

/// Text body of a message: conversation text, extended text, image caption,
/// video caption, else empty.
pub fn extract_text(content: &MessageContent) -> String {
    let (node, _) = resolve(content);
    match node {
        MessageContent::Conversation(text) => text.clone(),
        MessageContent::ExtendedText(ext) => ext.text.clone(),
        MessageContent::Image(media) | MessageContent::Video(media) => {
            media.caption.clone().unwrap_or_default()
        }
        _ => String::new(),
    }
}

/// Media kind of a message, `None` for text-only and unsupported content
pub fn detect_media_kind(content: &MessageContent) -> Option<MediaKind> {
    resolve(content).1.media_kind()
}

/// Downloadable media node of a message
pub fn media_of(content: &MessageContent) -> Option<(MediaKind, &MediaMessage)> {
    match resolve(content) {
        (MessageContent::Image(m), ContentKind::Image) => Some((MediaKind::Image, m)),
        (MessageContent::Video(m), ContentKind::Video) => Some((MediaKind::Video, m)),
        (MessageContent::Sticker(m), ContentKind::Sticker) => Some((MediaKind::Sticker, m)),
        (MessageContent::Audio(m), ContentKind::Audio) => Some((MediaKind::Audio, m)),
        (MessageContent::Document(m), ContentKind::Document) => Some((MediaKind::Document, m)),
        _ => None,
    }
}

/// Location node of a message
pub fn location_of(content: &MessageContent) -> Option<&LocationMessage> {
    match resolve(content) {
        (MessageContent::Location(loc), ContentKind::Location) => Some(loc),
        _ => None,
    }
}

/// Target key of a delete-for-everyone control node, if `content` is one
pub fn revoked_key(content: &MessageContent) -> Option<&MessageKey> {
    match resolve(content).0 {
        MessageContent::Protocol(proto) if proto.kind == ProtocolKind::Revoke => proto.key.as_ref(),
        _ => None,
    }
}
