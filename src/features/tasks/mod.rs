//! # Tasks Feature
//!
//! Task records, the backend task endpoints and the offline task cache.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

pub mod cache;
pub mod gateway;
pub mod models;

pub use cache::LocalCache;
pub use gateway::{TaskGateway, TASKS_CACHE_KEY};
pub use models::{NewTask, NewTaskReminder, Task, TaskPriority, TaskReminder, TaskSource, TaskStatus};
