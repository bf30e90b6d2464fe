//! Reminder records, recurrence rules and backend reminder payloads.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::features::tasks::Task;

/// A reminder is due for this long after its time, then goes stale
pub const DUE_LOOKBACK_SECS: i64 = 5 * 60;

/// Reminders this close ahead get an early "upcoming" toast
pub const WARN_LOOKAHEAD_SECS: i64 = 60;

/// Guard against runaway catch-up loops for ancient recurring reminders
const MAX_CATCH_UP_STEPS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    pub frequency: Frequency,
    /// Every `interval` days/weeks/months; zero is treated as one
    pub interval: u32,
    #[serde(
        default,
        with = "crate::core::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<DateTime<Utc>>,
}

impl Recurrence {
    pub fn new(frequency: Frequency, interval: u32) -> Self {
        Recurrence {
            frequency,
            interval,
            end_date: None,
        }
    }

    pub fn until(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// The occurrence following `from`, or `None` once past `end_date`
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let step = self.interval.max(1);
        let next = match self.frequency {
            Frequency::Daily => from.checked_add_signed(Duration::try_days(step as i64)?),
            Frequency::Weekly => from.checked_add_signed(Duration::try_weeks(step as i64)?),
            Frequency::Monthly => from.checked_add_months(Months::new(step)),
        }?;

        match self.end_date {
            Some(end) if next > end => None,
            _ => Some(next),
        }
    }

    /// First occurrence strictly after `now`, stepping from `from`
    pub fn next_occurrence(&self, from: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut current = from;
        for _ in 0..MAX_CATCH_UP_STEPS {
            let next = self.next_after(current)?;
            if next > now {
                return Some(next);
            }
            current = next;
        }
        None
    }
}

/// Where a reminder's time came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderOrigin {
    /// Found in the task's title or description
    #[default]
    Text,
    /// Set explicitly on the task; the backend tracks its delivery
    Task,
    /// Standalone entry of the backend reminder list
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    /// Owning task; used for lookup only
    pub task_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "crate::core::timestamp")]
    pub reminder_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring: Option<Recurrence>,
    #[serde(default)]
    pub notification_sent: bool,
    #[serde(
        default,
        with = "crate::core::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_notification: Option<DateTime<Utc>>,
    #[serde(default)]
    pub origin: ReminderOrigin,
}

impl Reminder {
    pub fn id_for_task(task_id: &str) -> String {
        format!("reminder_{task_id}")
    }

    pub fn for_task(task: &Task, reminder_time: DateTime<Utc>) -> Self {
        Reminder {
            id: Self::id_for_task(&task.id),
            task_id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            reminder_time,
            recurring: task.reminder.as_ref().and_then(|r| r.recurring.clone()),
            notification_sent: false,
            last_notification: None,
            origin: ReminderOrigin::Text,
        }
    }

    /// Due window: `now - 5min < reminder_time <= now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.reminder_time <= now
            && self.reminder_time > now - Duration::seconds(DUE_LOOKBACK_SECS)
    }

    /// Warn window: `now < reminder_time <= now + 1min`
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.reminder_time > now
            && self.reminder_time <= now + Duration::seconds(WARN_LOOKAHEAD_SECS)
    }

    /// Record a delivery at `now`. Recurring reminders move on to their next
    /// occurrence and are re-armed; one-shot (or finished) reminders stay at
    /// their time with `notification_sent` set.
    pub fn mark_fired(&mut self, now: DateTime<Utc>) {
        self.last_notification = Some(now);

        let next = self
            .recurring
            .as_ref()
            .and_then(|rule| rule.next_occurrence(self.reminder_time, now));

        match next {
            Some(next) => {
                self.reminder_time = next;
                self.notification_sent = false;
            }
            None => self.notification_sent = true,
        }
    }

    /// Body text for the platform notification
    pub fn notification_body(&self) -> String {
        let details = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or("No additional details");
        format!("Reminder: {details}")
    }
}

/// Entry of the backend's standalone reminder list (`GET /api/reminders`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteReminder {
    pub id: i64,
    /// Task content/title the reminder was created from
    pub task: String,
    #[serde(with = "crate::core::timestamp")]
    pub reminder_time: DateTime<Utc>,
    #[serde(with = "crate::core::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_due: Option<bool>,
}

impl From<RemoteReminder> for Reminder {
    /// Backend reminders stand alone, so the remote id doubles as the task id
    fn from(remote: RemoteReminder) -> Self {
        Reminder {
            id: remote.id.to_string(),
            task_id: remote.id.to_string(),
            title: remote.task,
            description: None,
            reminder_time: remote.reminder_time,
            recurring: None,
            notification_sent: remote.is_completed,
            last_notification: None,
            origin: ReminderOrigin::Remote,
        }
    }
}

/// Body of `PUT /api/tasks/{id}/reminder`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    #[serde(with = "crate::core::timestamp")]
    pub reminder_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring: Option<Recurrence>,
}

/// Response of `POST /api/check-reminder`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct ReminderCheck {
    #[serde(default)]
    pub has_reminder: bool,
}
