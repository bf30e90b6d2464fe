// Core layer - shared types and configuration
pub mod core;

// Backend layer - authenticated HTTP client and errors
pub mod backend;

// Events layer - in-process publish/subscribe
pub mod events;

// Features layer - all feature modules
pub mod features;

// Re-export core config for convenience
pub use core::Config;

pub use backend::{BackendClient, GatewayError, SessionToken, TokenProvider};
pub use events::{AppEvent, EventBus};

// Re-export feature items
pub use features::{
    // Reminders
    BackendSyncedStore, LogNotificationSink, NotificationSink, PermissionGate, PermissionState,
    Recurrence, Reminder, ReminderGateway, ReminderNotifier, ReminderRepository, ReminderStore,
    TimeExpressionExtractor,
    // Tasks
    LocalCache, Task, TaskGateway,
    // Toasts
    Toast, ToastKind, ToastQueue, ToastRequest,
};
