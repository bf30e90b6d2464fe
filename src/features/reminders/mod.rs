//! # Reminders Feature
//!
//! Natural-language reminder extraction, the local and remote reminder tiers,
//! and the notifier that delivers due reminders.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 2.0.0: Repository abstraction over local store and backend list
//! - 1.0.0: Initial release

pub mod extractor;
pub mod gateway;
pub mod models;
pub mod notification;
pub mod notifier;
pub mod repository;
pub mod store;

pub use extractor::{ParseFailure, TimeExpressionExtractor};
pub use gateway::ReminderGateway;
pub use models::{
    Frequency, Recurrence, Reminder, ReminderCheck, ReminderOrigin, ReminderRequest, RemoteReminder,
    DUE_LOOKBACK_SECS, WARN_LOOKAHEAD_SECS,
};
pub use notification::{
    FixedPrompt, LogNotificationSink, Notification, NotificationSink, PermissionGate,
    PermissionPrompt, PermissionState,
};
pub use notifier::{NotifierConfig, NotifierHandle, ReminderNotifier, ScanReport};
pub use repository::{BackendSyncedStore, ReminderRepository};
pub use store::ReminderStore;
