//! # Toast Queue
//!
//! Bounded set of visible toasts. Each toast owns a dismissal timer task;
//! evicting, dismissing or clearing a toast aborts its timer so no timer
//! outlives the toast it was armed for.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Event bus subscription via `attach`
//! - 1.0.0: Initial release

use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::events::{AppEvent, EventBus};
use crate::features::toasts::models::{Toast, ToastRequest};

/// Most toasts shown at once
pub const DEFAULT_MAX_VISIBLE: usize = 3;

/// Lifetime of a toast that does not ask for its own
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(5000);

struct Entry {
    toast: Toast,
    timer: Option<JoinHandle<()>>,
}

impl Entry {
    fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[derive(Default)]
struct Inner {
    visible: VecDeque<Entry>,
}

#[derive(Clone)]
pub struct ToastQueue {
    inner: Arc<RwLock<Inner>>,
    max_visible: usize,
    default_duration: Duration,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VISIBLE, DEFAULT_TOAST_DURATION)
    }
}

impl ToastQueue {
    pub fn new(max_visible: usize, default_duration: Duration) -> Self {
        ToastQueue {
            inner: Arc::new(RwLock::new(Inner::default())),
            max_visible: max_visible.max(1),
            default_duration,
        }
    }

    /// Display a toast, evicting the oldest ones while the queue is full
    pub async fn show(&self, request: ToastRequest) -> Toast {
        let toast = Toast::from_request(request, self.default_duration);
        let mut inner = self.inner.write().await;

        while inner.visible.len() >= self.max_visible {
            if let Some(mut oldest) = inner.visible.pop_front() {
                debug!("Evicting toast {}", oldest.toast.id);
                oldest.cancel();
            }
        }

        let timer = self.spawn_expiry(toast.id.clone(), toast.duration);
        inner.visible.push_back(Entry {
            toast: toast.clone(),
            timer: Some(timer),
        });

        toast
    }

    fn spawn_expiry(&self, id: String, after: Duration) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let mut inner = inner.write().await;
            // Dropping our own handle just detaches it
            inner.visible.retain(|entry| entry.toast.id != id);
        })
    }

    /// Remove a toast early; `false` if it was no longer visible
    pub async fn dismiss(&self, id: &str) -> bool {
        let mut inner = self.inner.write().await;
        match inner.visible.iter().position(|entry| entry.toast.id == id) {
            Some(index) => {
                if let Some(mut entry) = inner.visible.remove(index) {
                    entry.cancel();
                }
                true
            }
            None => false,
        }
    }

    /// Visible toasts, oldest first
    pub async fn visible(&self) -> Vec<Toast> {
        self.inner
            .read()
            .await
            .visible
            .iter()
            .map(|entry| entry.toast.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.visible.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.visible.is_empty()
    }

    /// Drop every toast and abort every pending timer
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        for mut entry in inner.visible.drain(..) {
            entry.cancel();
        }
    }

    /// Show every `ShowToast` published on `bus` until the bus closes
    pub fn attach(&self, bus: &EventBus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        let queue = self.clone();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(AppEvent::ShowToast(request)) => {
                        queue.show(request).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Toast listener lagged, {skipped} events skipped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::toasts::models::{ToastKind, REMINDER_TOAST_DURATION};

    #[tokio::test(start_paused = true)]
    async fn test_toast_expires_after_duration() {
        let queue = ToastQueue::default();
        queue.show(ToastRequest::success("Task saved")).await;

        tokio::time::sleep(Duration::from_millis(4999)).await;
        assert_eq!(queue.len().await, 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(queue.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminder_toast_lasts_longer() {
        let queue = ToastQueue::default();
        let toast = queue
            .show(ToastRequest::reminder("Submit report", "Reminder: quarterly numbers"))
            .await;
        assert_eq!(toast.kind, ToastKind::Reminder);
        assert_eq!(toast.duration, REMINDER_TOAST_DURATION);

        tokio::time::sleep(Duration::from_millis(6000)).await;
        assert_eq!(queue.len().await, 1);
        tokio::time::sleep(Duration::from_millis(4001)).await;
        assert!(queue.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fourth_toast_evicts_oldest() {
        let queue = ToastQueue::default();
        let first = queue.show(ToastRequest::info("one")).await;
        queue.show(ToastRequest::info("two")).await;
        queue.show(ToastRequest::info("three")).await;
        queue.show(ToastRequest::info("four")).await;

        let messages: Vec<String> = queue.visible().await.into_iter().map(|t| t.message).collect();
        assert_eq!(messages, vec!["two", "three", "four"]);
        assert!(!queue.dismiss(&first.id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_cancels_timer() {
        let queue = ToastQueue::default();
        let toast = queue.show(ToastRequest::warning("Offline")).await;
        assert!(queue.dismiss(&toast.id).await);
        assert!(queue.is_empty().await);

        // A new toast is not removed by the old toast's deadline
        tokio::time::sleep(Duration::from_millis(4000)).await;
        queue.show(ToastRequest::info("back online")).await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_removes_everything() {
        let queue = ToastQueue::default();
        queue.show(ToastRequest::info("one")).await;
        queue.show(ToastRequest::error("two")).await;
        queue.clear().await;
        assert!(queue.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_shows_published_toasts() {
        let bus = EventBus::default();
        let queue = ToastQueue::default();
        let listener = queue.attach(&bus);

        bus.publish(AppEvent::ShowToast(ToastRequest::info("from the bus")));
        bus.publish(AppEvent::TasksUpdated(vec![]));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let visible = queue.visible().await;
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].message, "from the bus");
        listener.abort();
    }
}
