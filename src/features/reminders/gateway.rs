//! # Remote Reminder Gateway
//!
//! Reminder endpoints of the NavArya backend. Every call except
//! `check_for_reminder` carries the session's bearer token. Errors are
//! returned to the caller as-is; nothing here retries.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Notification-sent marker and reminder detection
//! - 1.0.0: Initial release

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::backend::{BackendClient, GatewayError};
use crate::features::reminders::models::{
    Recurrence, Reminder, ReminderCheck, ReminderRequest, RemoteReminder,
};
use crate::features::reminders::repository::ReminderRepository;
use crate::features::tasks::TaskReminder;

/// `{"success": .., "message": ..}` acknowledgement returned by reminder writes
#[derive(Debug, Clone, Default, Deserialize)]
struct Ack {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

fn default_success() -> bool {
    true
}

#[derive(Serialize)]
struct CheckRequest<'a> {
    content: &'a str,
}

#[derive(Clone)]
pub struct ReminderGateway {
    client: BackendClient,
}

impl ReminderGateway {
    pub fn new(client: BackendClient) -> Self {
        ReminderGateway { client }
    }

    /// Set (or replace) the reminder on a task
    ///
    /// The backend only acknowledges the write, so the returned record is the
    /// one it now holds: the requested time and rule, not yet notified.
    pub async fn add_reminder(
        &self,
        task_id: &str,
        reminder_time: DateTime<Utc>,
        recurring: Option<Recurrence>,
    ) -> Result<TaskReminder, GatewayError> {
        let body = ReminderRequest {
            reminder_time,
            recurring: recurring.clone(),
        };
        let ack: Ack = self
            .client
            .put(&format!("/api/tasks/{task_id}/reminder"), &body)
            .await?;
        check_ack(ack)?;

        info!("⏰ Reminder set on task {task_id} for {reminder_time}");
        Ok(TaskReminder {
            time: reminder_time,
            recurring,
            notification_sent: false,
            last_notification: None,
        })
    }

    pub async fn remove_reminder(&self, task_id: &str) -> Result<(), GatewayError> {
        self.client
            .delete(&format!("/api/tasks/{task_id}/reminder"))
            .await?;
        info!("Reminder removed from task {task_id}");
        Ok(())
    }

    pub async fn get_task_reminders(&self, task_id: &str) -> Result<Vec<TaskReminder>, GatewayError> {
        self.client
            .get(&format!("/api/tasks/{task_id}/reminders"))
            .await
    }

    pub async fn get_reminders(&self) -> Result<Vec<RemoteReminder>, GatewayError> {
        let reminders: Vec<RemoteReminder> = self.client.get("/api/reminders").await?;
        debug!("Fetched {} remote reminders", reminders.len());
        Ok(reminders)
    }

    pub async fn complete_reminder(&self, id: i64) -> Result<(), GatewayError> {
        self.client
            .put_empty(&format!("/api/reminders/{id}/complete"))
            .await
    }

    /// Flag the task's reminder as delivered on the backend
    pub async fn mark_notification_sent(&self, task_id: &str) -> Result<(), GatewayError> {
        self.client
            .put_empty(&format!("/api/tasks/{task_id}/reminder/notification"))
            .await
    }

    /// Ask the backend whether `content` reads like a reminder
    ///
    /// Fails open: any error is logged and reported as `false`.
    pub async fn check_for_reminder(&self, content: &str) -> bool {
        let result: Result<ReminderCheck, GatewayError> = self
            .client
            .post_public("/api/check-reminder", &CheckRequest { content })
            .await;

        match result {
            Ok(check) => check.has_reminder,
            Err(e) => {
                warn!("Reminder check failed, assuming none: {e}");
                false
            }
        }
    }
}

fn check_ack(ack: Ack) -> Result<(), GatewayError> {
    if ack.success {
        return Ok(());
    }
    Err(GatewayError::RequestFailed {
        status: 200,
        message: ack
            .message
            .unwrap_or_else(|| "Backend rejected the reminder".to_string()),
    })
}

#[async_trait]
impl ReminderRepository for ReminderGateway {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn list(&self) -> Result<Vec<Reminder>> {
        let reminders = self.get_reminders().await?;
        Ok(reminders
            .into_iter()
            .filter(|r| !r.is_completed)
            .map(Reminder::from)
            .collect())
    }

    async fn remove(&self, task_id: &str) -> Result<()> {
        Ok(self.remove_reminder(task_id).await?)
    }

    async fn mark_fired(&self, reminder: &Reminder, _now: DateTime<Utc>) -> Result<()> {
        let id: i64 = reminder
            .id
            .parse()
            .with_context(|| format!("Remote reminder id '{}' is not numeric", reminder.id))?;
        Ok(self.complete_reminder(id).await?)
    }
}
