//! # Features Module
//!
//! Feature modules of the reminder service. Each feature lives in its own
//! directory with `mod.rs` re-exporting its public surface.

pub mod reminders;
pub mod tasks;
pub mod toasts;

// Re-export commonly used items
pub use reminders::{
    BackendSyncedStore, LogNotificationSink, NotificationSink, PermissionGate, PermissionState,
    Recurrence, Reminder, ReminderGateway, ReminderNotifier, ReminderRepository, ReminderStore,
    TimeExpressionExtractor,
};
pub use tasks::{LocalCache, Task, TaskGateway};
pub use toasts::{Toast, ToastKind, ToastQueue, ToastRequest};
