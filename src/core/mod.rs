//! # Core Module
//!
//! Configuration, wire timestamp handling and text formatting shared by the
//! reminder, task and toast features.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod config;
pub mod format;
pub mod timestamp;

// Re-export commonly used items
pub use config::Config;
pub use format::{format_time_until, truncate_for_toast, TOAST_TEXT_LIMIT};
