//! Recovery notice text

use chrono::{DateTime, Utc};

/// Body marker when the archive had no record for the deleted message
pub const COULD_NOT_RESTORE: &str = "⚠️ Couldn't restore content: the message was not in the archive.";

/// Body marker for a restored message without text
pub const NO_TEXT_CONTENT: &str = "(no text content)";

/// Body marker when media re-acquisition failed
pub const MEDIA_NOT_RESTORED: &str = "⚠️ Media could not be restored.";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Values available to a notice header
#[derive(Debug, Clone)]
pub struct NoticeContext<'a> {
    /// When the deletion was handled
    pub time: DateTime<Utc>,
    /// Chat the message was deleted from
    pub chat_id: &'a str,
    /// Identity reported as having deleted the message
    pub deleter_id: &'a str,
}

impl NoticeContext<'_> {
    pub fn formatted_time(&self) -> String {
        self.time.format(TIME_FORMAT).to_string()
    }

    /// Mention handle for the deleter (`@` + local part of the identity)
    pub fn deleter_mention(&self) -> String {
        format!("@{}", local_part(self.deleter_id))
    }
}

/// Builds the header line(s) of a recovery notice
pub trait NoticeFormatter: Send + Sync {
    fn header(&self, ctx: &NoticeContext<'_>) -> String;
}

impl<F> NoticeFormatter for F
where
    F: Fn(&NoticeContext<'_>) -> String + Send + Sync,
{
    fn header(&self, ctx: &NoticeContext<'_>) -> String {
        self(ctx)
    }
}

/// Built-in header
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNoticeFormatter;

impl NoticeFormatter for DefaultNoticeFormatter {
    fn header(&self, ctx: &NoticeContext<'_>) -> String {
        format!(
            "🗑️ *Deleted message recovered*\n🕒 {}\n💬 Chat: {}\n👤 Deleted by: {}",
            ctx.formatted_time(),
            ctx.chat_id,
            ctx.deleter_mention()
        )
    }
}

/// Header from a user template with `{time}`, `{chat}` and `{deleter}`
/// placeholders
#[derive(Debug, Clone)]
pub struct TemplateNoticeFormatter {
    template: String,
}

impl TemplateNoticeFormatter {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl NoticeFormatter for TemplateNoticeFormatter {
    fn header(&self, ctx: &NoticeContext<'_>) -> String {
        self.template
            .replace("{time}", &ctx.formatted_time())
            .replace("{chat}", ctx.chat_id)
            .replace("{deleter}", &ctx.deleter_mention())
    }
}

/// Join a header and a body into one message
pub fn compose(header: &str, body: &str) -> String {
    if body.is_empty() {
        header.to_string()
    } else {
        format!("{}\n\n{}", header, body)
    }
}

fn local_part(identity: &str) -> &str {
    identity.split('@').next().unwrap_or(identity)
}
