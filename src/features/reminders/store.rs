//! # Local Reminder Store
//!
//! Process-local reminder list fed by the time-expression extractor. Entries
//! keep insertion order, which is also the order the notifier evaluates them.
//! Independent of the backend's standalone reminder list; deliveries of
//! explicit task reminders are reported back through `BackendSyncedStore`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::events::{AppEvent, EventBus};

use crate::features::reminders::extractor::TimeExpressionExtractor;
use crate::features::reminders::models::{Recurrence, Reminder, ReminderOrigin};
use crate::features::reminders::repository::ReminderRepository;
use crate::features::tasks::{Task, TaskReminder};

#[derive(Default)]
pub struct ReminderStore {
    extractor: TimeExpressionExtractor,
    reminders: RwLock<Vec<Reminder>>,
}

impl ReminderStore {
    pub fn new(extractor: TimeExpressionExtractor) -> Self {
        ReminderStore {
            extractor,
            reminders: RwLock::new(Vec::new()),
        }
    }

    /// Create a reminder from a time expression in the task's text
    ///
    /// Returns `None` (and stores nothing) when no future time is found.
    pub async fn create(&self, task: &Task, now: DateTime<Utc>) -> Option<Reminder> {
        let reminder_time = self.extractor.extract_from_task(task, now)?;
        Some(self.upsert(Reminder::for_task(task, reminder_time)).await)
    }

    /// Create a reminder for a time the user picked explicitly
    ///
    /// Past or current times are rejected.
    pub async fn create_explicit(
        &self,
        task: &Task,
        reminder_time: DateTime<Utc>,
        recurring: Option<Recurrence>,
        now: DateTime<Utc>,
    ) -> Option<Reminder> {
        if reminder_time <= now {
            debug!(
                "Rejecting reminder for task {} at {reminder_time}: not in the future",
                task.id
            );
            return None;
        }

        let mut reminder = Reminder::for_task(task, reminder_time);
        reminder.recurring = recurring;
        reminder.origin = ReminderOrigin::Task;
        Some(self.upsert(reminder).await)
    }

    /// Insert, or replace the task's existing entry in place. An entry with
    /// the same time is kept as-is so its delivery state survives re-syncs.
    async fn upsert(&self, reminder: Reminder) -> Reminder {
        let mut reminders = self.reminders.write().await;

        if let Some(existing) = reminders.iter_mut().find(|r| r.task_id == reminder.task_id) {
            if existing.reminder_time == reminder.reminder_time {
                existing.origin = reminder.origin;
                existing.recurring = reminder.recurring;
                return existing.clone();
            }
            *existing = reminder.clone();
        } else {
            reminders.push(reminder.clone());
        }

        info!(
            "Scheduled reminder {} for '{}' at {}",
            reminder.id, reminder.title, reminder.reminder_time
        );
        reminder
    }

    /// Bring the store in line with the current task list
    ///
    /// Completed or deleted tasks lose their reminders. A task with an explicit
    /// reminder never falls back to expressions found in its text, even once
    /// that reminder is in the past. Returns the number of tasks that ended up
    /// with a reminder.
    pub async fn sync_tasks(&self, tasks: &[Task], now: DateTime<Utc>) -> usize {
        {
            let mut reminders = self.reminders.write().await;
            reminders.retain(|r| {
                tasks
                    .iter()
                    .any(|t| t.id == r.task_id && !t.is_completed())
            });
        }

        let mut scheduled = 0;
        for task in tasks.iter().filter(|t| !t.is_completed()) {
            let created = match &task.reminder {
                Some(explicit) => self.sync_explicit(task, explicit, now).await,
                None => self.create(task, now).await,
            };
            if created.is_some() {
                scheduled += 1;
            }
        }

        debug!("Synced {} tasks, {scheduled} with reminders", tasks.len());
        scheduled
    }

    /// Schedule a task's explicit reminder without ever consulting its text
    async fn sync_explicit(
        &self,
        task: &Task,
        explicit: &TaskReminder,
        now: DateTime<Utc>,
    ) -> Option<Reminder> {
        if explicit.time > now {
            return self
                .create_explicit(task, explicit.time, explicit.recurring.clone(), now)
                .await;
        }

        // An entry still inside the explicit time's due window is left alone
        {
            let reminders = self.reminders.read().await;
            if let Some(current) = reminders
                .iter()
                .find(|r| r.task_id == task.id && r.reminder_time == explicit.time && r.is_due(now))
            {
                return Some(current.clone());
            }
        }

        let next = explicit
            .recurring
            .as_ref()
            .and_then(|rule| rule.next_occurrence(explicit.time, now));
        match next {
            Some(at) => {
                self.create_explicit(task, at, explicit.recurring.clone(), now)
                    .await
            }
            None => {
                self.remove(&task.id).await;
                None
            }
        }
    }

    pub async fn list(&self) -> Vec<Reminder> {
        self.reminders.read().await.clone()
    }

    pub async fn get(&self, task_id: &str) -> Option<Reminder> {
        self.reminders
            .read()
            .await
            .iter()
            .find(|r| r.task_id == task_id)
            .cloned()
    }

    /// Remove the task's reminder; `false` if it had none
    pub async fn remove(&self, task_id: &str) -> bool {
        let mut reminders = self.reminders.write().await;
        let before = reminders.len();
        reminders.retain(|r| r.task_id != task_id);
        before != reminders.len()
    }

    /// Reminders inside the due window. `notification_sent` is ignored, so a
    /// fired one-shot reminder stays due until its window closes.
    pub async fn check_due(&self, now: DateTime<Utc>) -> Vec<Reminder> {
        self.reminders
            .read()
            .await
            .iter()
            .filter(|r| r.is_due(now))
            .cloned()
            .collect()
    }

    /// Mark the reminder with `id` as delivered at `now`
    pub async fn mark_fired(&self, id: &str, now: DateTime<Utc>) -> Option<Reminder> {
        let mut reminders = self.reminders.write().await;
        let reminder = reminders.iter_mut().find(|r| r.id == id)?;
        reminder.mark_fired(now);
        Some(reminder.clone())
    }

    pub async fn len(&self) -> usize {
        self.reminders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reminders.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.reminders.write().await.clear();
    }

    /// Re-sync on every `TasksUpdated` published on `bus` until the bus closes
    pub fn attach(self: &Arc<Self>, bus: &EventBus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        let store = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(AppEvent::TasksUpdated(tasks)) => {
                        store.sync_tasks(&tasks, Utc::now()).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Reminder store lagged, {skipped} task updates skipped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[async_trait]
impl ReminderRepository for ReminderStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn list(&self) -> Result<Vec<Reminder>> {
        Ok(ReminderStore::list(self).await)
    }

    async fn remove(&self, task_id: &str) -> Result<()> {
        ReminderStore::remove(self, task_id).await;
        Ok(())
    }

    async fn mark_fired(&self, reminder: &Reminder, now: DateTime<Utc>) -> Result<()> {
        ReminderStore::mark_fired(self, &reminder.id, now).await;
        Ok(())
    }
}
