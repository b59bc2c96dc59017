//! Console channel adapter
//!
//! Prints outbound messages to stdout and fetches media from `file://` or
//! `http(s)://` references. Used by the `replay` command to drive the engine
//! from recorded event logs.

use super::adapter::ChannelAdapter;
use super::message::{Envelope, OutboundContent, OutboundMessage};
use crate::content::media_of;
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;

/// Adapter that writes sends to stdout
pub struct ConsoleAdapter {
    http: reqwest::Client,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Render an outbound message as one console block
    pub fn render(message: &OutboundMessage) -> String {
        let body = match &message.content {
            OutboundContent::Text(text) => text.clone(),
            OutboundContent::Media {
                kind,
                data,
                mimetype,
                caption,
                file_name,
            } => {
                let mut line = format!("[{} {} bytes", kind, data.len());
                if let Some(mime) = mimetype {
                    line.push_str(&format!(", {}", mime));
                }
                if let Some(name) = file_name {
                    line.push_str(&format!(", {}", name));
                }
                line.push(']');
                if let Some(caption) = caption.as_deref().filter(|c| !c.is_empty()) {
                    line.push(' ');
                    line.push_str(caption);
                }
                line
            }
            OutboundContent::Location(loc) => format!(
                "[location {:.6}, {:.6}{}]",
                loc.latitude,
                loc.longitude,
                loc.name
                    .as_deref()
                    .map(|n| format!(" {}", n))
                    .unwrap_or_default()
            ),
        };
        format!("→ {}\n{}", message.target, body)
    }

    async fn fetch(&self, url: &str) -> Result<Bytes> {
        if let Some(path) = url.strip_prefix("file://") {
            return match tokio::fs::read(path).await {
                Ok(data) => Ok(Bytes::from(data)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(Error::MediaExpired(format!("{} not found", path)))
                }
                Err(e) => Err(e.into()),
            };
        }

        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self.http.get(url).send().await?;
            return match response.status() {
                StatusCode::NOT_FOUND | StatusCode::GONE => {
                    Err(Error::MediaExpired(format!("{} returned {}", url, response.status())))
                }
                _ => Ok(response.error_for_status()?.bytes().await?),
            };
        }

        Err(Error::Channel(format!("console adapter cannot fetch {}", url)))
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelAdapter for ConsoleAdapter {
    fn name(&self) -> &str {
        "console"
    }

    async fn send_message(&self, message: OutboundMessage) -> Result<String> {
        println!("{}\n", Self::render(&message));
        Ok(format!("console-{}", uuid::Uuid::new_v4()))
    }

    async fn download_media(&self, envelope: &Envelope) -> Result<Bytes> {
        let media = envelope
            .message
            .as_ref()
            .and_then(media_of)
            .map(|(_, media)| media)
            .ok_or_else(|| {
                Error::MediaRecovery(format!(
                    "message {} has no downloadable media",
                    envelope.key.message_id
                ))
            })?;

        let url = media.url.as_deref().ok_or_else(|| {
            Error::MediaRecovery(format!("message {} has no media url", envelope.key.message_id))
        })?;

        tracing::debug!(url, "Fetching media");
        self.fetch(url).await
    }
}
