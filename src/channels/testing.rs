//! In-memory adapter used by unit tests

use super::adapter::ChannelAdapter;
use super::message::{Envelope, OutboundMessage, SendOptions};
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// How downloads for a message ID behave
#[derive(Debug, Clone)]
pub enum DownloadBehavior {
    Ok(Bytes),
    Fail,
    /// Expired until a re-upload request, then returns the bytes
    ExpiredThenOk(Bytes),
}

/// Records sends and serves canned media
#[derive(Default)]
pub struct RecordingAdapter {
    sent: Mutex<Vec<OutboundMessage>>,
    downloads: Mutex<HashMap<String, DownloadBehavior>>,
    reuploaded: Mutex<Vec<String>>,
    /// Fail sends that carry options (mentions/forwarded)
    fail_decorated_sends: bool,
    fail_all_sends: bool,
    send_attempts: AtomicUsize,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_download(self, message_id: &str, behavior: DownloadBehavior) -> Self {
        self.downloads.lock().insert(message_id.to_string(), behavior);
        self
    }

    pub fn failing_decorated_sends(mut self) -> Self {
        self.fail_decorated_sends = true;
        self
    }

    pub fn failing_all_sends(mut self) -> Self {
        self.fail_all_sends = true;
        self
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().clone()
    }

    pub fn reupload_requests(&self) -> Vec<String> {
        self.reuploaded.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        self.send_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelAdapter for RecordingAdapter {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send_message(&self, message: OutboundMessage) -> Result<String> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        let decorated = message.options != SendOptions::default();
        if self.fail_all_sends || (self.fail_decorated_sends && decorated) {
            return Err(Error::Send("rejected".to_string()));
        }
        let mut sent = self.sent.lock();
        sent.push(message);
        Ok(format!("sent-{}", sent.len()))
    }

    async fn download_media(&self, envelope: &Envelope) -> Result<Bytes> {
        let id = &envelope.key.message_id;
        let behavior = self.downloads.lock().get(id).cloned();
        match behavior {
            Some(DownloadBehavior::Ok(bytes)) => Ok(bytes),
            Some(DownloadBehavior::ExpiredThenOk(bytes)) => {
                if self.reuploaded.lock().contains(id) {
                    Ok(bytes)
                } else {
                    Err(Error::MediaExpired(id.clone()))
                }
            }
            Some(DownloadBehavior::Fail) | None => {
                Err(Error::MediaRecovery(format!("download failed for {}", id)))
            }
        }
    }

    async fn request_media_reupload(&self, envelope: &Envelope) -> Result<Envelope> {
        self.reuploaded.lock().push(envelope.key.message_id.clone());
        Ok(envelope.clone())
    }
}
