use anyhow::Result;
use chrono::Utc;
use dotenvy::dotenv;
use log::{error, info, warn};
use std::sync::Arc;

use navarya::backend::{BackendClient, GatewayError, SessionToken};
use navarya::core::Config;
use navarya::events::EventBus;
use navarya::features::reminders::{
    BackendSyncedStore, FixedPrompt, LogNotificationSink, NotifierConfig, PermissionGate,
    PermissionState, ReminderGateway, ReminderNotifier, ReminderRepository, ReminderStore,
};
use navarya::features::tasks::{LocalCache, TaskGateway};
use navarya::features::toasts::ToastQueue;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting NavArya reminder daemon...");

    let session = Arc::new(SessionToken::new(config.auth_token.clone()));
    let signed_in = config.auth_token.is_some();
    let client = BackendClient::new(config.api_url.clone(), session);

    let bus = EventBus::default();
    let toasts = ToastQueue::new(config.toast_max_visible, config.toast_duration);
    let toast_listener = toasts.attach(&bus);

    let cache = Arc::new(LocalCache::new(&config.data_dir));
    let tasks = TaskGateway::new(client.clone(), cache, bus.clone());

    let initial_tasks = match tasks.get_tasks().await {
        Ok(list) => list,
        Err(GatewayError::Unauthenticated) => {
            warn!("Not signed in - using cached tasks only");
            tasks.cached_tasks().await
        }
        Err(e) => {
            error!("Failed to load tasks: {e}");
            Vec::new()
        }
    };

    let store = Arc::new(ReminderStore::default());
    let scheduled = store.sync_tasks(&initial_tasks, Utc::now()).await;
    info!(
        "📋 Loaded {} tasks, {scheduled} with reminders",
        initial_tasks.len()
    );

    // Keep the local store in line with task list changes
    let task_listener = store.attach(&bus);
    let task_refresh = if signed_in {
        Some(tasks.spawn_refresh(config.poll_interval))
    } else {
        None
    };

    // The daemon has nobody to ask, so an undecided permission is granted
    let permission = Arc::new(PermissionGate::new(
        config.notification_permission,
        Arc::new(FixedPrompt(PermissionState::Granted)),
    ));
    let sink = Arc::new(LogNotificationSink);
    let notifier_config = NotifierConfig::from(&config);

    // Deliveries of explicit task reminders are reported to the backend
    let local_repository: Arc<dyn ReminderRepository> = if signed_in {
        Arc::new(BackendSyncedStore::new(
            store.clone(),
            ReminderGateway::new(client.clone()),
        ))
    } else {
        store.clone()
    };

    let local_notifier = Arc::new(ReminderNotifier::new(
        local_repository,
        sink.clone(),
        permission.clone(),
        bus.clone(),
        notifier_config,
    ))
    .spawn();

    let remote_notifier = if signed_in {
        let gateway = Arc::new(ReminderGateway::new(client));
        Some(
            Arc::new(ReminderNotifier::new(
                gateway,
                sink,
                permission,
                bus.clone(),
                notifier_config,
            ))
            .spawn(),
        )
    } else {
        None
    };

    info!("⏰ Reminder daemon running, press Ctrl+C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }

    info!("Shutting down...");
    local_notifier.stop();
    if let Some(remote) = &remote_notifier {
        remote.stop();
    }
    if let Some(refresh) = &task_refresh {
        refresh.abort();
    }
    task_listener.abort();
    toast_listener.abort();
    toasts.clear().await;
    store.clear().await;

    Ok(())
}
