//! # Task Gateway
//!
//! Task CRUD against the backend plus the offline copy of the task list.
//! Reads fall back to the cached list whenever the backend cannot be reached
//! for any reason other than a missing session.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.2.0: Periodic refresh of the task list
//! - 1.1.0: `TasksUpdated` events on local list changes
//! - 1.0.0: Initial release

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::backend::{BackendClient, GatewayError};
use crate::events::{AppEvent, EventBus};
use crate::features::tasks::cache::LocalCache;
use crate::features::tasks::models::{NewTask, Task};

/// Cache key of the offline task list
pub const TASKS_CACHE_KEY: &str = "tasks";

#[derive(Clone)]
pub struct TaskGateway {
    client: BackendClient,
    cache: Arc<LocalCache>,
    bus: EventBus,
}

impl TaskGateway {
    pub fn new(client: BackendClient, cache: Arc<LocalCache>, bus: EventBus) -> Self {
        TaskGateway { client, cache, bus }
    }

    /// Fetch all tasks, refreshing the cache; serve the cache when offline
    pub async fn get_tasks(&self) -> Result<Vec<Task>, GatewayError> {
        match self.client.get::<Vec<Task>>("/api/tasks").await {
            Ok(tasks) => {
                if let Err(e) = self.cache.set(TASKS_CACHE_KEY, &tasks).await {
                    warn!("Failed to cache tasks: {e}");
                }
                debug!("Fetched {} tasks", tasks.len());
                Ok(tasks)
            }
            Err(GatewayError::Unauthenticated) => Err(GatewayError::Unauthenticated),
            Err(e) => {
                warn!("Failed to fetch tasks, using cached list: {e}");
                Ok(self.cached_tasks().await)
            }
        }
    }

    /// Last cached task list; empty when nothing usable is cached
    pub async fn cached_tasks(&self) -> Vec<Task> {
        match self.cache.get::<Vec<Task>>(TASKS_CACHE_KEY).await {
            Ok(tasks) => tasks.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to read task cache: {e}");
                Vec::new()
            }
        }
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task, GatewayError> {
        self.client.get(&format!("/api/tasks/{task_id}")).await
    }

    pub async fn add_task(&self, task: &NewTask) -> Result<Task, GatewayError> {
        let created: Task = self.client.post("/api/tasks", task).await?;
        info!("Created task {} '{}'", created.id, created.title);
        Ok(created)
    }

    pub async fn update_task(&self, task: &Task) -> Result<Task, GatewayError> {
        self.client.put(&format!("/api/tasks/{}", task.id), task).await
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<(), GatewayError> {
        self.client.delete(&format!("/api/tasks/{task_id}")).await?;
        info!("Deleted task {task_id}");
        Ok(())
    }

    /// Fetch the task list and publish it as the new local list
    ///
    /// Offline, the cached list is republished; a missing session is an error.
    pub async fn refresh(&self) -> Result<Vec<Task>, GatewayError> {
        let tasks = self.get_tasks().await?;
        if let Err(e) = self.update_tasks(tasks.clone()).await {
            warn!("Failed to store refreshed tasks: {e}");
        }
        Ok(tasks)
    }

    /// Refresh on every tick of `period`, starting one period from now
    pub fn spawn_refresh(&self, period: Duration) -> JoinHandle<()> {
        let gateway = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // First tick completes immediately; the caller already loaded tasks
            interval.tick().await;
            loop {
                interval.tick().await;
                match gateway.refresh().await {
                    Ok(tasks) => debug!("Refreshed {} tasks", tasks.len()),
                    Err(e) => warn!("Task refresh failed: {e}"),
                }
            }
        })
    }

    /// Replace the local task list and tell subscribers about it
    pub async fn update_tasks(&self, tasks: Vec<Task>) -> anyhow::Result<()> {
        self.cache.set(TASKS_CACHE_KEY, &tasks).await?;
        self.bus.publish(AppEvent::TasksUpdated(tasks));
        Ok(())
    }
}
