//! Recovery dispatcher
//!
//! Turns a revocation notice into outbound sends: a header, then whatever of
//! the original text and media could be restored. Nothing in here returns an
//! error to the caller; every failure degrades the notice instead.

use super::correlator::RevocationNotice;
use super::notice::{
    compose, NoticeContext, NoticeFormatter, COULD_NOT_RESTORE, MEDIA_NOT_RESTORED,
    NO_TEXT_CONTENT,
};
use super::settings::SettingsHandle;
use super::stats::RecallStats;
use crate::archive::{ArchiveStore, ArchivedRecord};
use crate::channels::{
    ChannelAdapter, Envelope, MessageContent, OutboundContent, OutboundMessage, SendOptions,
};
use crate::content::{location_of, media_of, ContentKind, MediaKind, RecoveredContent};
use crate::error::{Error, Result};
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;

/// What a single recovery produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Feature disabled or chat ignored; nothing sent
    Skipped,
    /// No archived record; "could not restore" notice sent
    Missed,
    /// Full content re-sent
    Restored { kind: ContentKind },
    /// Header and text sent, media could not be re-acquired
    Partial { kind: ContentKind },
}

/// Builds and sends recovery notices
pub struct RecoveryDispatcher {
    store: Arc<ArchiveStore>,
    adapter: Arc<dyn ChannelAdapter>,
    formatter: Arc<dyn NoticeFormatter>,
    settings: Arc<SettingsHandle>,
    stats: Arc<RecallStats>,
}

impl RecoveryDispatcher {
    pub fn new(
        store: Arc<ArchiveStore>,
        adapter: Arc<dyn ChannelAdapter>,
        formatter: Arc<dyn NoticeFormatter>,
        settings: Arc<SettingsHandle>,
        stats: Arc<RecallStats>,
    ) -> Self {
        Self {
            store,
            adapter,
            formatter,
            settings,
            stats,
        }
    }

    /// Recover the message a notice refers to and send the result
    pub async fn recover(&self, notice: &RevocationNotice) -> RecoveryOutcome {
        let settings = self.settings.snapshot();
        if !settings.enabled {
            self.stats.record_skipped();
            return RecoveryOutcome::Skipped;
        }
        self.stats.record_revocation();

        let chat_id = notice.key.chat_id.as_str();
        let sink = settings
            .forward_to
            .clone()
            .unwrap_or_else(|| chat_id.to_string());
        let deleter = notice.deleter();

        let header = self.formatter.header(&NoticeContext {
            time: Utc::now(),
            chat_id,
            deleter_id: deleter,
        });
        let options = SendOptions {
            mentions: vec![deleter.to_string()],
            forwarded: false,
        };

        let Some(record) = self.store.lookup(&notice.key) else {
            tracing::info!(message = %notice.key, "Deleted message not in archive");
            self.stats.record_missed();
            self.send_with_fallback(
                OutboundMessage::text(&sink, compose(&header, COULD_NOT_RESTORE))
                    .with_options(options),
            )
            .await;
            return RecoveryOutcome::Missed;
        };

        let outcome = self.restore(&record, &sink, &header, options).await;
        match &outcome {
            RecoveryOutcome::Partial { .. } => self.stats.record_partial(),
            _ => self.stats.record_restored(),
        }
        tracing::info!(
            message = %notice.key,
            author = %record.author_id,
            outcome = ?outcome,
            "Deleted message recovered"
        );
        outcome
    }

    async fn restore(
        &self,
        record: &ArchivedRecord,
        sink: &str,
        header: &str,
        options: SendOptions,
    ) -> RecoveryOutcome {
        let Some(content) = record.envelope.message.as_ref() else {
            self.send_with_fallback(
                OutboundMessage::text(sink, compose(header, NO_TEXT_CONTENT)).with_options(options),
            )
            .await;
            return RecoveryOutcome::Restored {
                kind: ContentKind::Text,
            };
        };

        let recovered = RecoveredContent::from_content(content);
        let kind = recovered.kind;

        match recovered.media_kind() {
            None => {
                let body = if recovered.text.is_empty() {
                    NO_TEXT_CONTENT
                } else {
                    recovered.text.as_str()
                };
                self.send_with_fallback(
                    OutboundMessage::text(sink, compose(header, body)).with_options(options),
                )
                .await;
                RecoveryOutcome::Restored { kind }
            }
            Some(media_kind) if !media_kind.is_downloadable() => {
                self.send_with_fallback(
                    OutboundMessage::text(sink, compose(header, &recovered.text))
                        .with_options(options),
                )
                .await;
                if let Some(location) = location_of(content) {
                    self.send_with_fallback(OutboundMessage {
                        target: sink.to_string(),
                        content: OutboundContent::Location(location.clone()),
                        options: SendOptions::default(),
                    })
                    .await;
                }
                RecoveryOutcome::Restored { kind }
            }
            Some(media_kind) => match self.acquire_media(&record.envelope).await {
                Ok(data) => {
                    let recovered = recovered.with_media(data);
                    self.send_with_fallback(
                        OutboundMessage::text(sink, header).with_options(options),
                    )
                    .await;
                    self.send_media(sink, media_kind, content, recovered).await;
                    RecoveryOutcome::Restored { kind }
                }
                Err(e) => {
                    tracing::warn!(
                        message = %record.identity,
                        kind = %media_kind,
                        "Media recovery failed: {}",
                        e
                    );
                    let body = if recovered.has_text() {
                        format!("{}\n\n{}", recovered.text, MEDIA_NOT_RESTORED)
                    } else {
                        MEDIA_NOT_RESTORED.to_string()
                    };
                    self.send_with_fallback(
                        OutboundMessage::text(sink, compose(header, &body)).with_options(options),
                    )
                    .await;
                    RecoveryOutcome::Partial { kind }
                }
            },
        }
    }

    async fn send_media(
        &self,
        sink: &str,
        kind: MediaKind,
        content: &MessageContent,
        recovered: RecoveredContent,
    ) {
        let Some(data) = recovered.media_bytes else {
            return;
        };
        let (mimetype, caption, file_name) = match media_of(content) {
            Some((_, media)) => (
                media.mimetype.clone(),
                media.caption.clone(),
                media.file_name.clone(),
            ),
            None => (None, None, None),
        };

        self.send_with_fallback(OutboundMessage {
            target: sink.to_string(),
            content: OutboundContent::Media {
                kind,
                data,
                mimetype,
                caption,
                file_name,
            },
            options: SendOptions {
                mentions: Vec::new(),
                forwarded: true,
            },
        })
        .await;
    }

    /// Download media, with one re-upload round trip for expired references
    async fn acquire_media(&self, envelope: &Envelope) -> Result<Bytes> {
        let data = match self.adapter.download_media(envelope).await {
            Err(Error::MediaExpired(reason)) => {
                tracing::debug!(
                    message_id = %envelope.key.message_id,
                    reason = %reason,
                    "Media reference expired, requesting re-upload"
                );
                let refreshed = self.adapter.request_media_reupload(envelope).await?;
                self.adapter.download_media(&refreshed).await?
            }
            other => other?,
        };

        if data.is_empty() {
            return Err(Error::MediaRecovery(format!(
                "empty media for message {}",
                envelope.key.message_id
            )));
        }
        Ok(data)
    }

    /// Send, falling back to a bare send, then dropping. Returns whether
    /// anything was delivered.
    async fn send_with_fallback(&self, message: OutboundMessage) -> bool {
        let bare = message.bare();
        let target = message.target.clone();

        match self.adapter.send_message(message).await {
            Ok(id) => {
                tracing::debug!(target = %target, id = %id, "Recovery message sent");
                true
            }
            Err(e) => {
                tracing::warn!(target = %target, "Recovery send failed, retrying bare: {}", e);
                self.stats.record_send_fallback();
                match self.adapter.send_message(bare).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::warn!(target = %target, "Bare recovery send failed, dropping: {}", e);
                        self.stats.record_send_dropped();
                        false
                    }
                }
            }
        }
    }
}
