use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::core::truncate_for_toast;

/// Display lifetime for reminder toasts
pub const REMINDER_TOAST_DURATION: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
    Reminder,
}

/// What a caller asks to display; the queue fills in id and default duration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastRequest {
    pub message: String,
    pub title: Option<String>,
    pub kind: ToastKind,
    pub duration: Option<Duration>,
}

impl ToastRequest {
    pub fn new(kind: ToastKind, message: impl Into<String>) -> Self {
        ToastRequest {
            message: message.into(),
            title: None,
            kind,
            duration: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Info, message)
    }

    /// Reminder toasts stay up longer than the default
    pub fn reminder(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToastKind::Reminder, message)
            .with_title(title)
            .with_duration(REMINDER_TOAST_DURATION)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: String,
    pub message: String,
    pub title: Option<String>,
    pub kind: ToastKind,
    pub duration: Duration,
}

impl Toast {
    pub fn from_request(request: ToastRequest, default_duration: Duration) -> Self {
        Toast {
            id: Uuid::new_v4().to_string(),
            message: truncate_for_toast(&request.message),
            title: request.title,
            kind: request.kind,
            duration: request.duration.unwrap_or(default_duration),
        }
    }
}
