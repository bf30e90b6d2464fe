//! # Event Bus
//!
//! In-process publish/subscribe channel between the notifier, the task
//! gateway and the toast queue. Publishing never blocks and never fails:
//! events sent while nobody is subscribed are dropped.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

use chrono::{DateTime, Utc};
use log::debug;
use tokio::sync::broadcast;

use crate::features::tasks::Task;
use crate::features::toasts::ToastRequest;

/// Default broadcast channel capacity
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum AppEvent {
    ShowToast(ToastRequest),
    TasksUpdated(Vec<Task>),
    ReminderFired {
        reminder_id: String,
        task_id: String,
        title: String,
        at: DateTime<Utc>,
    },
}

impl AppEvent {
    fn kind(&self) -> &'static str {
        match self {
            AppEvent::ShowToast(_) => "show_toast",
            AppEvent::TasksUpdated(_) => "tasks_updated",
            AppEvent::ReminderFired { .. } => "reminder_fired",
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventBus { tx }
    }

    /// Send to every current subscriber; returns how many received it
    pub fn publish(&self, event: AppEvent) -> usize {
        let kind = event.kind();
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No subscribers for {kind} event");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}
