//! Revocation correlator
//!
//! Consumes the two inbound feeds. Ordinary messages are archived; revoke
//! control nodes are matched against the archive and handed to the
//! dispatcher.
//!
//! ```text
//! observed batch ──► ignored chat? ──► revoke? ──yes──► dispatcher
//!                                          │
//!                                          no ──► archive (when enabled)
//!
//! update batch ──► revoke? ──yes──► dispatcher
//! ```

use super::dispatcher::{RecoveryDispatcher, RecoveryOutcome};
use super::settings::SettingsHandle;
use super::stats::RecallStats;
use crate::archive::{ArchiveStore, MessageIdentity};
use crate::channels::{Envelope, MessageKey, MessageUpdate};
use crate::content::revoked_key;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

/// A resolved deletion: which message, and who removed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationNotice {
    /// Identity of the deleted message
    pub key: MessageIdentity,
    /// Identity that sent the revoke, when the feed reports one
    pub revoker_id: Option<String>,
}

impl RevocationNotice {
    /// Build a notice from the revoke's target key. A target without a chat
    /// inherits the chat of the carrying envelope.
    pub fn from_target(target: &MessageKey, carrier_chat: &str, revoker_id: Option<String>) -> Self {
        let chat_id = if target.chat_id.is_empty() {
            carrier_chat
        } else {
            target.chat_id.as_str()
        };
        Self {
            key: MessageIdentity::new(
                chat_id,
                target.message_id.as_str(),
                target.participant.as_deref().unwrap_or_default(),
            ),
            revoker_id: revoker_id.filter(|id| !id.is_empty()),
        }
    }

    /// Deleter shown in the notice: revoker, then participant, then chat
    pub fn deleter(&self) -> &str {
        self.revoker_id
            .as_deref()
            .or_else(|| self.key.participant())
            .unwrap_or(&self.key.chat_id)
    }
}

/// Routes inbound batches to the archive or the dispatcher
pub struct RevocationCorrelator {
    store: Arc<ArchiveStore>,
    dispatcher: Arc<RecoveryDispatcher>,
    settings: Arc<SettingsHandle>,
    ignored_chats: HashSet<String>,
    stats: Arc<RecallStats>,
}

impl RevocationCorrelator {
    pub fn new(
        store: Arc<ArchiveStore>,
        dispatcher: Arc<RecoveryDispatcher>,
        settings: Arc<SettingsHandle>,
        ignored_chats: impl IntoIterator<Item = String>,
        stats: Arc<RecallStats>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            settings,
            ignored_chats: ignored_chats.into_iter().collect(),
            stats,
        }
    }

    pub fn is_ignored(&self, chat_id: &str) -> bool {
        self.ignored_chats.contains(chat_id)
    }

    /// Handle a batch of newly observed messages
    pub async fn on_observed_batch(&self, messages: Vec<Envelope>) -> Vec<RecoveryOutcome> {
        let mut outcomes = Vec::new();

        for envelope in messages {
            if self.is_ignored(&envelope.key.chat_id) {
                continue;
            }
            let Some(content) = envelope.message.as_ref() else {
                continue;
            };

            if let Some(target) = revoked_key(content) {
                let notice = RevocationNotice::from_target(
                    target,
                    &envelope.key.chat_id,
                    Some(envelope.sender_id().to_string()),
                );
                tracing::debug!(message = %notice.key, "Revoke observed in message feed");
                outcomes.push(self.dispatcher.recover(&notice).await);
                continue;
            }

            if !self.settings.is_enabled() {
                continue;
            }

            let identity = MessageIdentity::from_key(&envelope.key);
            let author = envelope.sender_id().to_string();
            let observed_at = envelope.observed_at().unwrap_or_else(Utc::now);
            tracing::trace!(
                message = %identity,
                from_me = envelope.key.from_me,
                push_name = envelope.push_name.as_deref().unwrap_or_default(),
                "Archiving message"
            );
            self.store.insert_at(identity, envelope, author, observed_at);
            self.stats.record_archived();
        }

        outcomes
    }

    /// Handle a batch of message updates. Only revokes are acted on.
    pub async fn on_update_batch(&self, updates: Vec<MessageUpdate>) -> Vec<RecoveryOutcome> {
        let mut outcomes = Vec::new();

        for update in updates {
            if self.is_ignored(&update.key.chat_id) {
                continue;
            }
            let Some(target) = update.message.as_ref().and_then(revoked_key) else {
                continue;
            };

            let notice = RevocationNotice::from_target(target, &update.key.chat_id, None);
            tracing::debug!(message = %notice.key, "Revoke observed in update feed");
            outcomes.push(self.dispatcher.recover(&notice).await);
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::testing::RecordingAdapter;
    use crate::channels::{MessageContent, OutboundContent, ProtocolKind, ProtocolMessage};
    use crate::content::ContentKind;
    use crate::recovery::notice::DefaultNoticeFormatter;
    use crate::recovery::settings::RecoverySettings;
    use std::time::Duration;

    struct Fixture {
        store: Arc<ArchiveStore>,
        adapter: Arc<RecordingAdapter>,
        settings: Arc<SettingsHandle>,
        stats: Arc<RecallStats>,
        correlator: RevocationCorrelator,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(ArchiveStore::new(
            Duration::from_secs(3600),
            Duration::from_secs(600),
            100,
        ));
        let adapter = Arc::new(RecordingAdapter::new());
        let settings = Arc::new(SettingsHandle::new(RecoverySettings {
            enabled: true,
            forward_to: None,
        }));
        let stats = Arc::new(RecallStats::new());
        let dispatcher = Arc::new(RecoveryDispatcher::new(
            Arc::clone(&store),
            adapter.clone(),
            Arc::new(DefaultNoticeFormatter),
            Arc::clone(&settings),
            Arc::clone(&stats),
        ));
        let correlator = RevocationCorrelator::new(
            Arc::clone(&store),
            dispatcher,
            Arc::clone(&settings),
            vec!["status@broadcast".to_string()],
            Arc::clone(&stats),
        );
        Fixture {
            store,
            adapter,
            settings,
            stats,
            correlator,
        }
    }

    fn revoke(target: MessageKey) -> MessageContent {
        MessageContent::Protocol(ProtocolMessage {
            kind: ProtocolKind::Revoke,
            key: Some(target),
        })
    }

    fn text_of(content: &OutboundContent) -> &str {
        match content {
            OutboundContent::Text(text) => text,
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_archive_then_revoke_in_message_feed() {
        let f = fixture();
        let original = Envelope::text(
            MessageKey::new("g1@g.us", "M1").with_participant("alice@s.whatsapp.net"),
            "alice@s.whatsapp.net",
            "hello group",
        );
        assert!(f.correlator.on_observed_batch(vec![original]).await.is_empty());
        assert_eq!(f.store.len(), 1);

        let revoker = Envelope::new(
            MessageKey::new("g1@g.us", "R1").with_participant("alice@s.whatsapp.net"),
            "alice@s.whatsapp.net",
            revoke(MessageKey::new("g1@g.us", "M1").with_participant("alice@s.whatsapp.net")),
        );
        let outcomes = f.correlator.on_observed_batch(vec![revoker]).await;
        assert_eq!(outcomes, vec![RecoveryOutcome::Restored { kind: ContentKind::Text }]);

        let sent = f.adapter.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target, "g1@g.us");
        assert!(text_of(&sent[0].content).ends_with("hello group"));
        assert_eq!(sent[0].options.mentions, vec!["alice@s.whatsapp.net"]);
        // The revoke itself is never archived
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn test_revoke_in_update_feed_uses_participant_as_deleter() {
        let f = fixture();
        f.correlator
            .on_observed_batch(vec![Envelope::text(
                MessageKey::new("g1@g.us", "M1"),
                "bob@s.whatsapp.net",
                "hi",
            )])
            .await;

        let update = MessageUpdate {
            key: MessageKey::new("g1@g.us", "M1"),
            message: Some(revoke(
                MessageKey::new("g1@g.us", "M1").with_participant("bob@s.whatsapp.net"),
            )),
        };
        let outcomes = f.correlator.on_update_batch(vec![update]).await;
        assert_eq!(outcomes, vec![RecoveryOutcome::Restored { kind: ContentKind::Text }]);
        assert_eq!(
            f.adapter.sent()[0].options.mentions,
            vec!["bob@s.whatsapp.net"]
        );
    }

    #[tokio::test]
    async fn test_target_without_chat_inherits_carrier_chat() {
        let f = fixture();
        f.correlator
            .on_observed_batch(vec![Envelope::text(
                MessageKey::new("111@s.whatsapp.net", "M1"),
                "111@s.whatsapp.net",
                "dm",
            )])
            .await;

        let revoker = Envelope::new(
            MessageKey::new("111@s.whatsapp.net", "R1"),
            "111@s.whatsapp.net",
            revoke(MessageKey::new("", "M1")),
        );
        let outcomes = f.correlator.on_observed_batch(vec![revoker]).await;
        assert_eq!(outcomes, vec![RecoveryOutcome::Restored { kind: ContentKind::Text }]);
        assert_eq!(f.adapter.sent()[0].target, "111@s.whatsapp.net");
    }

    #[tokio::test]
    async fn test_self_authored_messages_are_archived() {
        let f = fixture();
        let mine = Envelope::text(
            MessageKey::new("111@s.whatsapp.net", "M1").from_me(),
            "me@s.whatsapp.net",
            "note to self",
        );
        f.correlator.on_observed_batch(vec![mine]).await;
        assert_eq!(f.store.len(), 1);
        assert_eq!(f.stats.snapshot().archived, 1);
    }

    #[tokio::test]
    async fn test_transport_timestamp_used_as_archive_time() {
        let f = fixture();
        let sent_at = Utc::now() - chrono::Duration::hours(1);
        let mut recent = Envelope::text(MessageKey::new("c", "M1"), "c", "recent");
        recent.timestamp = Some(sent_at.timestamp());
        let mut stale = Envelope::text(MessageKey::new("c", "M2"), "c", "stale");
        stale.timestamp = Some((Utc::now() - chrono::Duration::hours(48)).timestamp());

        f.correlator.on_observed_batch(vec![recent, stale]).await;
        assert_eq!(f.store.len(), 2);

        let record = f.store.lookup(&MessageIdentity::new("c", "M1", "")).unwrap();
        assert_eq!(record.inserted_at.timestamp(), sent_at.timestamp());

        // Older than the one-hour TTL of the fixture store
        let outcomes = f
            .correlator
            .on_update_batch(vec![MessageUpdate {
                key: MessageKey::new("c", "M2"),
                message: Some(revoke(MessageKey::new("c", "M2"))),
            }])
            .await;
        assert_eq!(outcomes, vec![RecoveryOutcome::Missed]);
    }

    #[tokio::test]
    async fn test_ignored_chats_and_empty_envelopes_skipped() {
        let f = fixture();
        let status = Envelope::text(
            MessageKey::new("status@broadcast", "S1"),
            "alice@s.whatsapp.net",
            "story",
        );
        let mut empty = Envelope::text(MessageKey::new("c@s.whatsapp.net", "E1"), "c", "x");
        empty.message = None;

        f.correlator.on_observed_batch(vec![status, empty]).await;
        assert!(f.store.is_empty());

        let revoker = Envelope::new(
            MessageKey::new("status@broadcast", "R1"),
            "alice@s.whatsapp.net",
            revoke(MessageKey::new("status@broadcast", "S1")),
        );
        assert!(f.correlator.on_observed_batch(vec![revoker]).await.is_empty());
        assert!(f.adapter.sent().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_stops_archiving_but_keeps_records() {
        let f = fixture();
        f.correlator
            .on_observed_batch(vec![Envelope::text(MessageKey::new("c", "M1"), "c", "a")])
            .await;

        f.settings.set_enabled(false);
        f.settings.set_enabled(false);
        f.correlator
            .on_observed_batch(vec![Envelope::text(MessageKey::new("c", "M2"), "c", "b")])
            .await;
        assert_eq!(f.store.len(), 1);

        let outcomes = f
            .correlator
            .on_observed_batch(vec![Envelope::new(
                MessageKey::new("c", "R1"),
                "c",
                revoke(MessageKey::new("c", "M1")),
            )])
            .await;
        assert_eq!(outcomes, vec![RecoveryOutcome::Skipped]);
        assert!(f.adapter.sent().is_empty());

        f.settings.set_enabled(true);
        let outcomes = f
            .correlator
            .on_update_batch(vec![MessageUpdate {
                key: MessageKey::new("c", "M1"),
                message: Some(revoke(MessageKey::new("c", "M1"))),
            }])
            .await;
        assert_eq!(outcomes, vec![RecoveryOutcome::Restored { kind: ContentKind::Text }]);
    }

    #[tokio::test]
    async fn test_same_revoke_on_both_feeds_recovers_twice() {
        let f = fixture();
        f.correlator
            .on_observed_batch(vec![Envelope::text(MessageKey::new("c", "M1"), "c", "dup")])
            .await;

        let target = MessageKey::new("c", "M1");
        f.correlator
            .on_observed_batch(vec![Envelope::new(
                MessageKey::new("c", "R1"),
                "c",
                revoke(target.clone()),
            )])
            .await;
        f.correlator
            .on_update_batch(vec![MessageUpdate {
                key: target.clone(),
                message: Some(revoke(target)),
            }])
            .await;

        assert_eq!(f.adapter.sent().len(), 2);
        assert_eq!(f.stats.snapshot().revocations, 2);
    }

    #[tokio::test]
    async fn test_non_revoke_updates_ignored() {
        let f = fixture();
        let outcomes = f
            .correlator
            .on_update_batch(vec![
                MessageUpdate {
                    key: MessageKey::new("c", "M1"),
                    message: None,
                },
                MessageUpdate {
                    key: MessageKey::new("c", "M1"),
                    message: Some(MessageContent::Protocol(ProtocolMessage {
                        kind: ProtocolKind::MessageEdit,
                        key: Some(MessageKey::new("c", "M1")),
                    })),
                },
            ])
            .await;
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_deleter_precedence() {
        let notice = RevocationNotice {
            key: MessageIdentity::new("chat", "m", "part"),
            revoker_id: Some("rev".into()),
        };
        assert_eq!(notice.deleter(), "rev");

        let notice = RevocationNotice {
            revoker_id: None,
            ..notice
        };
        assert_eq!(notice.deleter(), "part");

        let notice = RevocationNotice {
            key: MessageIdentity::new("chat", "m", ""),
            revoker_id: None,
        };
        assert_eq!(notice.deleter(), "chat");
    }
}
