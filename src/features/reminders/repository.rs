use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use std::sync::Arc;

use crate::features::reminders::gateway::ReminderGateway;
use crate::features::reminders::models::{Reminder, ReminderOrigin};
use crate::features::reminders::store::ReminderStore;

/// A reminder tier the notifier can poll: the local store or the backend list
#[async_trait]
pub trait ReminderRepository: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    async fn list(&self) -> Result<Vec<Reminder>>;

    async fn remove(&self, task_id: &str) -> Result<()>;

    /// Record that `reminder` was delivered at `now`
    async fn mark_fired(&self, reminder: &Reminder, now: DateTime<Utc>) -> Result<()>;
}

/// Local store that also reports deliveries of explicit task reminders to
/// the backend. The local mark always happens first, so a failed backend
/// call never loses the local state.
pub struct BackendSyncedStore {
    store: Arc<ReminderStore>,
    gateway: ReminderGateway,
}

impl BackendSyncedStore {
    pub fn new(store: Arc<ReminderStore>, gateway: ReminderGateway) -> Self {
        BackendSyncedStore { store, gateway }
    }

    pub fn store(&self) -> &Arc<ReminderStore> {
        &self.store
    }
}

#[async_trait]
impl ReminderRepository for BackendSyncedStore {
    fn name(&self) -> &'static str {
        "local+backend"
    }

    async fn list(&self) -> Result<Vec<Reminder>> {
        Ok(self.store.list().await)
    }

    async fn remove(&self, task_id: &str) -> Result<()> {
        self.store.remove(task_id).await;
        Ok(())
    }

    async fn mark_fired(&self, reminder: &Reminder, now: DateTime<Utc>) -> Result<()> {
        self.store.mark_fired(&reminder.id, now).await;

        // Text-derived reminders have no backend record to update
        if reminder.origin != ReminderOrigin::Task {
            return Ok(());
        }

        self.gateway.mark_notification_sent(&reminder.task_id).await?;
        debug!("Backend notified of delivery for task {}", reminder.task_id);
        Ok(())
    }
}
