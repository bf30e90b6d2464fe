//! # Due-Reminder Notifier
//!
//! Polls a reminder repository on a fixed interval. Every reminder inside the
//! due window raises a platform notification (when permitted) and a reminder
//! toast, then is marked fired. Reminders about to come due get a single
//! "upcoming" toast.
//!
//! By default the sent flag does not filter the due set, so a reminder keeps
//! firing on every poll until its five-minute window closes. `dedupe_sent`
//! turns that off.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.2.0: Scan reports and `ReminderFired` events
//! - 1.1.0: Opt-in dedupe of already-sent reminders
//! - 1.0.0: Initial release

use anyhow::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::core::{format_time_until, Config};
use crate::events::{AppEvent, EventBus};
use crate::features::reminders::models::Reminder;
use crate::features::reminders::notification::{Notification, NotificationSink, PermissionGate};
use crate::features::reminders::repository::ReminderRepository;
use crate::features::toasts::ToastRequest;

/// Reminders in the due window, in repository order
pub fn check_due(reminders: &[Reminder], now: DateTime<Utc>, dedupe_sent: bool) -> Vec<Reminder> {
    reminders
        .iter()
        .filter(|r| r.is_due(now))
        .filter(|r| !(dedupe_sent && r.notification_sent))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifierConfig {
    pub poll_interval: Duration,
    pub dedupe_sent: bool,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        NotifierConfig {
            poll_interval: Duration::from_secs(60),
            dedupe_sent: false,
        }
    }
}

impl From<&Config> for NotifierConfig {
    fn from(config: &Config) -> Self {
        NotifierConfig {
            poll_interval: config.poll_interval,
            dedupe_sent: config.dedupe_sent,
        }
    }
}

/// Outcome of one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub due: usize,
    pub notified: usize,
    pub toasted: usize,
    pub warned: usize,
    pub failures: usize,
}

pub struct ReminderNotifier {
    repository: Arc<dyn ReminderRepository>,
    sink: Arc<dyn NotificationSink>,
    permission: Arc<PermissionGate>,
    bus: EventBus,
    /// Reminder id -> reminder time already warned about
    warned: DashMap<String, DateTime<Utc>>,
    config: NotifierConfig,
}

impl ReminderNotifier {
    pub fn new(
        repository: Arc<dyn ReminderRepository>,
        sink: Arc<dyn NotificationSink>,
        permission: Arc<PermissionGate>,
        bus: EventBus,
        config: NotifierConfig,
    ) -> Self {
        ReminderNotifier {
            repository,
            sink,
            permission,
            bus,
            warned: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    /// Due reminders currently held by the repository
    pub async fn check_due(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let reminders = self.repository.list().await?;
        Ok(check_due(&reminders, now, self.config.dedupe_sent))
    }

    /// Run one poll: fire due reminders, then warn about imminent ones
    pub async fn scan(&self, now: DateTime<Utc>) -> ScanReport {
        let mut report = ScanReport::default();

        let reminders = match self.repository.list().await {
            Ok(reminders) => reminders,
            Err(e) => {
                warn!("Failed to list {} reminders: {e}", self.repository.name());
                report.failures += 1;
                return report;
            }
        };

        let due = check_due(&reminders, now, self.config.dedupe_sent);
        report.due = due.len();

        for reminder in &due {
            self.fire(reminder, now, &mut report).await;
        }

        for reminder in reminders.iter().filter(|r| r.is_upcoming(now)) {
            if self.warn_upcoming(reminder, now) {
                report.warned += 1;
            }
        }

        // Forget reminders the repository no longer holds
        self.warned
            .retain(|id, _| reminders.iter().any(|r| &r.id == id));

        if report.due > 0 || report.warned > 0 {
            debug!("Reminder scan: {report:?}");
        }
        report
    }

    async fn fire(&self, reminder: &Reminder, now: DateTime<Utc>, report: &mut ScanReport) {
        info!(
            "⏰ Reminder triggered: {} at {}",
            reminder.title, reminder.reminder_time
        );
        let body = reminder.notification_body();

        if self.permission.ensure_granted().await {
            let notification = Notification {
                title: reminder.title.clone(),
                body: body.clone(),
                tag: reminder.task_id.clone(),
            };
            match self.sink.notify(&notification).await {
                Ok(()) => report.notified += 1,
                Err(e) => {
                    error!("Failed to show notification for {}: {e}", reminder.id);
                    report.failures += 1;
                }
            }
        } else {
            debug!("Notification permission not granted, toast only for {}", reminder.id);
        }

        self.bus.publish(AppEvent::ShowToast(ToastRequest::reminder(
            reminder.title.clone(),
            body,
        )));
        report.toasted += 1;

        if let Err(e) = self.repository.mark_fired(reminder, now).await {
            warn!(
                "Failed to mark {} reminder {} as fired: {e}",
                self.repository.name(),
                reminder.id
            );
            report.failures += 1;
        }

        self.bus.publish(AppEvent::ReminderFired {
            reminder_id: reminder.id.clone(),
            task_id: reminder.task_id.clone(),
            title: reminder.title.clone(),
            at: now,
        });
    }

    /// Raise the upcoming toast unless this occurrence was already warned about
    fn warn_upcoming(&self, reminder: &Reminder, now: DateTime<Utc>) -> bool {
        if self.warned.get(&reminder.id).map(|at| *at) == Some(reminder.reminder_time) {
            return false;
        }
        self.warned.insert(reminder.id.clone(), reminder.reminder_time);

        let message = format!(
            "{} ({})",
            reminder.title,
            format_time_until(reminder.reminder_time, now)
        );
        self.bus.publish(AppEvent::ShowToast(
            ToastRequest::info(message).with_title("Upcoming reminder"),
        ));
        true
    }

    /// Poll forever on the configured interval; the first scan runs at once
    pub fn spawn(self: Arc<Self>) -> NotifierHandle {
        let period = self.config.poll_interval.max(Duration::from_secs(1));
        info!(
            "Reminder notifier started on {} reminders (every {}s)",
            self.repository.name(),
            period.as_secs()
        );

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                self.scan(Utc::now()).await;
            }
        });

        NotifierHandle { handle }
    }
}

/// Running poll loop; stopping or dropping it cancels the loop
pub struct NotifierHandle {
    handle: JoinHandle<()>,
}

impl NotifierHandle {
    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for NotifierHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
