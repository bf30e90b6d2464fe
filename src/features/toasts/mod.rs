//! # Toasts Feature
//!
//! Transient on-screen messages with per-toast expiry.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod models;
pub mod queue;

pub use models::{Toast, ToastKind, ToastRequest, REMINDER_TOAST_DURATION};
pub use queue::{ToastQueue, DEFAULT_MAX_VISIBLE, DEFAULT_TOAST_DURATION};
