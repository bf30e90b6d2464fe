//! # Platform Notifications
//!
//! Permission is tri-state and requested lazily: the first fire event while
//! the state is still `Default` triggers the prompt, and its answer sticks.
//! Notifications are only raised when the state is `Granted`.

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    Granted,
    Denied,
    /// Not asked yet
    #[default]
    Default,
}

impl FromStr for PermissionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "granted" => Ok(PermissionState::Granted),
            "denied" => Ok(PermissionState::Denied),
            "default" | "prompt" => Ok(PermissionState::Default),
            other => Err(format!("unknown permission state '{other}'")),
        }
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
            PermissionState::Default => "default",
        };
        write!(f, "{s}")
    }
}

/// Asks the user (or platform) for notification permission
#[async_trait]
pub trait PermissionPrompt: Send + Sync {
    async fn request(&self) -> PermissionState;
}

/// Prompt with a predetermined answer, for headless runs and tests
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt(pub PermissionState);

#[async_trait]
impl PermissionPrompt for FixedPrompt {
    async fn request(&self) -> PermissionState {
        self.0
    }
}

/// Current permission plus the prompt used to resolve `Default`
pub struct PermissionGate {
    state: RwLock<PermissionState>,
    prompt: Arc<dyn PermissionPrompt>,
}

impl PermissionGate {
    pub fn new(initial: PermissionState, prompt: Arc<dyn PermissionPrompt>) -> Self {
        PermissionGate {
            state: RwLock::new(initial),
            prompt,
        }
    }

    pub async fn state(&self) -> PermissionState {
        *self.state.read().await
    }

    /// Resolve permission, prompting only while undecided
    pub async fn ensure_granted(&self) -> bool {
        let current = *self.state.read().await;
        let resolved = match current {
            PermissionState::Default => {
                let answer = self.prompt.request().await;
                debug!("Notification permission prompt answered: {answer}");
                *self.state.write().await = answer;
                answer
            }
            decided => decided,
        };
        resolved == PermissionState::Granted
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Collapses repeated notifications for the same task on platforms that support it
    pub tag: String,
}

/// Delivers platform notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log; the daemon's default sink
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        info!(
            "🔔 {} - {} [{}]",
            notification.title, notification.body, notification.tag
        );
        Ok(())
    }
}
