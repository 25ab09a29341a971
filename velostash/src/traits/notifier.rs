use std::fmt::{self, Display};

use tracing::{error, info, warn};

/// Severity of a [`Notice`] shown to the person using the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
    /// Blocking message: the storage ladder is exhausted and the user has to clear data.
    Fatal,
}

impl Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        };
        f.write_str(label)
    }
}

/// A user-facing message raised by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub level: NoticeLevel,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>, level: NoticeLevel) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level,
        }
    }

    pub(crate) fn storage_full() -> Self {
        Self::new(
            "Storage Full",
            "Browser storage is full. Please delete old bikes/images from the admin panel or clear site data.",
            NoticeLevel::Error,
        )
    }

    pub(crate) fn freeing_space() -> Self {
        Self::new(
            "Storage Full",
            "Attempting to free up storage space...",
            NoticeLevel::Warning,
        )
    }

    pub(crate) fn storage_exhausted() -> Self {
        Self::new(
            "Storage Critically Full",
            "Storage is critically full. Please clear browser data or contact support.",
            NoticeLevel::Fatal,
        )
    }
}

/// Sink for user-facing notices. The view layer implements this to show toasts and dialogs.
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Default [`Notifier`] that forwards notices to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => {
                info!(title = %notice.title, level = %notice.level, "{}", notice.message);
            }
            NoticeLevel::Warning => {
                warn!(title = %notice.title, "{}", notice.message);
            }
            NoticeLevel::Error | NoticeLevel::Fatal => {
                error!(title = %notice.title, level = %notice.level, "{}", notice.message);
            }
        }
    }
}
