//! Delete recovery
//!
//! The correlator watches both inbound feeds, archiving ordinary messages and
//! turning revokes into [`RevocationNotice`]s. The dispatcher looks each
//! notice up in the archive and re-sends what it can.

pub mod correlator;
pub mod dispatcher;
pub mod notice;
pub mod settings;
pub mod stats;

pub use correlator::{RevocationCorrelator, RevocationNotice};
pub use dispatcher::{RecoveryDispatcher, RecoveryOutcome};
pub use notice::{
    DefaultNoticeFormatter, NoticeContext, NoticeFormatter, TemplateNoticeFormatter,
};
pub use settings::{RecoverySettings, SettingsHandle};
pub use stats::{RecallStats, StatsSnapshot};
