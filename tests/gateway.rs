use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use navarya::backend::{BackendClient, GatewayError, SessionToken};
use navarya::events::{AppEvent, EventBus};
use navarya::features::reminders::{
    BackendSyncedStore, FixedPrompt, Frequency, Notification, NotificationSink, NotifierConfig,
    PermissionGate, PermissionState, Recurrence, ReminderGateway, ReminderNotifier,
    ReminderRepository, ReminderStore,
};
use navarya::features::tasks::{LocalCache, Task, TaskGateway, TASKS_CACHE_KEY};
use navarya::features::toasts::{ToastKind, ToastQueue};

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    authorization: Option<String>,
    body: String,
}

type Responder = Arc<dyn Fn(&Recorded) -> (u16, String) + Send + Sync>;

/// Minimal HTTP/1.1 server answering every request through `respond`
struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    async fn start(respond: impl Fn(&Recorded) -> (u16, String) + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let respond: Responder = Arc::new(respond);

        let log = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let log = log.clone();
                let respond = respond.clone();
                tokio::spawn(async move {
                    handle(stream, log, respond).await;
                });
            }
        });

        StubServer { base_url, requests }
    }

    async fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().await.clone()
    }
}

async fn handle(mut stream: TcpStream, log: Arc<Mutex<Vec<Recorded>>>, respond: Responder) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let Ok(n) = stream.read(&mut chunk).await else {
            return;
        };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    let mut authorization = None;
    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_lowercase().as_str() {
                "authorization" => authorization = Some(value.trim().to_string()),
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                _ => {}
            }
        }
    }

    while buf.len() < header_end + content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    let recorded = Recorded {
        method,
        path,
        authorization,
        body,
    };
    let (status, payload) = respond(&recorded);
    log.lock().await.push(recorded);

    let response = format!(
        "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn signed_in_client(base_url: &str) -> BackendClient {
    BackendClient::new(base_url, Arc::new(SessionToken::new(Some("test-token".to_string()))))
}

fn signed_out_client(base_url: &str) -> BackendClient {
    BackendClient::new(base_url, Arc::new(SessionToken::default()))
}

fn task_json(id: &str, title: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "status": "Pending",
        "priority": "Medium",
        "createdAt": "2025-01-20T08:00:00Z",
        "userId": "u1"
    })
}

#[tokio::test]
async fn test_signed_out_sends_nothing() {
    let server = StubServer::start(|_| (200, "[]".to_string())).await;
    let gateway = ReminderGateway::new(signed_out_client(&server.base_url));

    let result = gateway.get_reminders().await;
    assert!(matches!(result, Err(GatewayError::Unauthenticated)));
    let result = gateway.complete_reminder(7).await;
    assert!(matches!(result, Err(GatewayError::Unauthenticated)));

    assert!(server.requests().await.is_empty());
}

#[tokio::test]
async fn test_bearer_token_and_reminder_body() {
    let server = StubServer::start(|_| {
        (200, r#"{"success": true, "message": "Reminder set successfully"}"#.to_string())
    })
    .await;
    let gateway = ReminderGateway::new(signed_in_client(&server.base_url));
    let at = Utc.with_ymd_and_hms(2025, 1, 22, 17, 0, 0).unwrap();

    let stored = gateway
        .add_reminder("t1", at, Some(Recurrence::new(Frequency::Weekly, 1)))
        .await
        .unwrap();
    assert_eq!(stored.time, at);
    assert!(!stored.notification_sent);

    let requests = server.requests().await;
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(requests[0].path, "/api/tasks/t1/reminder");
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer test-token"));

    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(body["reminderTime"], "2025-01-22T17:00:00.000Z");
    assert_eq!(body["recurring"]["frequency"], "weekly");
}

#[tokio::test]
async fn test_remote_reminder_endpoints() {
    let server = StubServer::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/api/reminders") => (
            200,
            r#"[{"id": 7, "task": "Call dentist", "reminder_time": "2025-01-21T10:00:00",
                 "created_at": "2025-01-20T08:00:00", "is_completed": false},
                {"id": 8, "task": "Old", "reminder_time": "2025-01-01T10:00:00",
                 "created_at": "2024-12-20T08:00:00", "is_completed": true}]"#
                .to_string(),
        ),
        ("GET", "/api/tasks/t1/reminders") => (
            200,
            r#"[{"time": {"seconds": 1737565200, "nanoseconds": 0}, "notificationSent": true}]"#
                .to_string(),
        ),
        _ => (200, r#"{"success": true}"#.to_string()),
    })
    .await;
    let gateway = ReminderGateway::new(signed_in_client(&server.base_url));

    let remote = gateway.get_reminders().await.unwrap();
    assert_eq!(remote.len(), 2);

    // Completed backend reminders are not polled
    let pollable = ReminderRepository::list(&gateway).await.unwrap();
    assert_eq!(pollable.len(), 1);
    assert_eq!(pollable[0].id, "7");

    let task_reminders = gateway.get_task_reminders("t1").await.unwrap();
    assert!(task_reminders[0].notification_sent);

    gateway.remove_reminder("t1").await.unwrap();
    gateway.mark_notification_sent("t1").await.unwrap();
    ReminderRepository::mark_fired(&gateway, &pollable[0], Utc::now())
        .await
        .unwrap();

    let calls: Vec<(String, String)> = server
        .requests()
        .await
        .into_iter()
        .map(|r| (r.method, r.path))
        .collect();
    assert!(calls.contains(&("DELETE".to_string(), "/api/tasks/t1/reminder".to_string())));
    assert!(calls.contains(&(
        "PUT".to_string(),
        "/api/tasks/t1/reminder/notification".to_string()
    )));
    assert!(calls.contains(&("PUT".to_string(), "/api/reminders/7/complete".to_string())));
}

#[tokio::test]
async fn test_complete_reminder_server_error() {
    let server = StubServer::start(|req| match req.path.as_str() {
        "/api/reminders" => (
            200,
            r#"[{"id": 7, "task": "Call dentist", "reminder_time": "2025-01-21T10:00:00",
                 "created_at": "2025-01-20T08:00:00", "is_completed": false}]"#
                .to_string(),
        ),
        _ => (500, r#"{"detail": "database unavailable"}"#.to_string()),
    })
    .await;
    let gateway = ReminderGateway::new(signed_in_client(&server.base_url));

    let before = gateway.get_reminders().await.unwrap();
    let err = gateway.complete_reminder(7).await.unwrap_err();
    match err {
        GatewayError::RequestFailed { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("unexpected error {other:?}"),
    }

    let after = gateway.get_reminders().await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_check_for_reminder_fails_open() {
    let server = StubServer::start(|req| match req.path.as_str() {
        "/api/check-reminder" if req.body.contains("tomorrow") => {
            (200, r#"{"has_reminder": true, "reminder": {"id": 3}}"#.to_string())
        }
        "/api/check-reminder" => (200, "not json".to_string()),
        _ => (404, String::new()),
    })
    .await;

    // No session needed for detection
    let gateway = ReminderGateway::new(signed_out_client(&server.base_url));
    assert!(gateway.check_for_reminder("call mom tomorrow").await);
    assert!(!gateway.check_for_reminder("call mom").await);

    let unreachable = ReminderGateway::new(signed_out_client("http://127.0.0.1:9"));
    assert!(!unreachable.check_for_reminder("call mom tomorrow").await);
}

#[tokio::test]
async fn test_task_list_falls_back_to_cache() {
    let server = StubServer::start(|_| {
        (503, r#"{"error": {"message": "Service unavailable"}}"#.to_string())
    })
    .await;
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(LocalCache::new(dir.path()));
    let cached: Vec<Task> =
        serde_json::from_value(serde_json::json!([task_json("t1", "Cached task")])).unwrap();
    cache.set(TASKS_CACHE_KEY, &cached).await.unwrap();

    let gateway = TaskGateway::new(signed_in_client(&server.base_url), cache, EventBus::default());
    let tasks = gateway.get_tasks().await.unwrap();
    assert_eq!(tasks, cached);

    // Writes are not masked
    let err = gateway.delete_task("t1").await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(err.to_string().contains("Service unavailable"));
}

#[tokio::test]
async fn test_task_list_refreshes_cache() {
    let server = StubServer::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/api/tasks") => (
            200,
            serde_json::json!([task_json("t1", "Fresh"), task_json("t2", "Other")]).to_string(),
        ),
        ("POST", "/api/tasks") => (201, task_json("t3", "Buy milk").to_string()),
        _ => (200, task_json("t1", "Fresh").to_string()),
    })
    .await;
    let dir = TempDir::new().unwrap();
    let gateway = TaskGateway::new(
        signed_in_client(&server.base_url),
        Arc::new(LocalCache::new(dir.path())),
        EventBus::default(),
    );

    assert_eq!(gateway.get_tasks().await.unwrap().len(), 2);
    assert_eq!(gateway.cached_tasks().await.len(), 2);

    let created = gateway
        .add_task(&navarya::features::tasks::NewTask::new("Buy milk", "u1"))
        .await
        .unwrap();
    assert_eq!(created.id, "t3");
    assert_eq!(gateway.get_task("t1").await.unwrap().title, "Fresh");
}

#[derive(Default)]
struct RecordingSink {
    shown: Mutex<Vec<Notification>>,
}

#[async_trait::async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        self.shown.lock().await.push(notification.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_tomorrow_at_five_fires_notification_and_toast() {
    let now = Utc.with_ymd_and_hms(2025, 1, 21, 17, 0, 0).unwrap();
    let task: Task = serde_json::from_value(task_json("t1", "Submit report tomorrow at 5pm")).unwrap();

    let store = Arc::new(ReminderStore::default());
    let reminder = store.create(&task, now).await.unwrap();
    assert_eq!(reminder.reminder_time, now + Duration::hours(24));

    let bus = EventBus::default();
    let toasts = ToastQueue::default();
    let mut events = bus.subscribe();
    let sink = Arc::new(RecordingSink::default());
    let notifier = ReminderNotifier::new(
        store.clone(),
        sink.clone(),
        Arc::new(PermissionGate::new(
            PermissionState::Default,
            Arc::new(FixedPrompt(PermissionState::Granted)),
        )),
        bus,
        NotifierConfig::default(),
    );

    let report = notifier.scan(now + Duration::hours(24)).await;
    assert_eq!(report.due, 1);
    assert_eq!(report.notified, 1);
    assert_eq!(report.toasted, 1);

    let shown = sink.shown.lock().await;
    assert_eq!(shown[0].title, "Submit report tomorrow at 5pm");
    assert_eq!(shown[0].body, "Reminder: No additional details");

    match events.recv().await.unwrap() {
        AppEvent::ShowToast(request) => {
            assert_eq!(request.kind, ToastKind::Reminder);
            let toast = toasts.show(request).await;
            assert_eq!(toast.duration.as_millis(), 10_000);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(store.get("t1").await.unwrap().notification_sent);
}

fn granted() -> Arc<PermissionGate> {
    Arc::new(PermissionGate::new(
        PermissionState::Granted,
        Arc::new(FixedPrompt(PermissionState::Granted)),
    ))
}

#[tokio::test]
async fn test_explicit_reminder_delivery_reported_to_backend() {
    let server = StubServer::start(|_| {
        (200, r#"{"success": true, "message": "Notification marked as sent"}"#.to_string())
    })
    .await;
    let now = Utc.with_ymd_and_hms(2025, 1, 21, 17, 0, 0).unwrap();
    let at = now + Duration::hours(24);

    let store = Arc::new(ReminderStore::default());
    let dentist: Task = serde_json::from_value(task_json("t1", "Dentist")).unwrap();
    store.create_explicit(&dentist, at, None, now).await.unwrap();
    let report_task: Task =
        serde_json::from_value(task_json("t2", "Submit report tomorrow at 5pm")).unwrap();
    store.create(&report_task, now).await.unwrap();

    let repository = Arc::new(BackendSyncedStore::new(
        store.clone(),
        ReminderGateway::new(signed_in_client(&server.base_url)),
    ));
    let notifier = ReminderNotifier::new(
        repository,
        Arc::new(RecordingSink::default()),
        granted(),
        EventBus::default(),
        NotifierConfig::default(),
    );

    let report = notifier.scan(at).await;
    assert_eq!(report.due, 2);
    assert_eq!(report.failures, 0);

    // Only the explicit reminder has a backend record
    let requests = server.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(requests[0].path, "/api/tasks/t1/reminder/notification");
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer test-token"));

    assert!(store.get("t1").await.unwrap().notification_sent);
    assert!(store.get("t2").await.unwrap().notification_sent);
}

#[tokio::test]
async fn test_backend_delivery_failure_counted_and_local_mark_kept() {
    let server = StubServer::start(|_| {
        (500, r#"{"error": {"message": "Database unavailable"}}"#.to_string())
    })
    .await;
    let now = Utc.with_ymd_and_hms(2025, 1, 21, 17, 0, 0).unwrap();
    let at = now + Duration::minutes(30);

    let store = Arc::new(ReminderStore::default());
    let dentist: Task = serde_json::from_value(task_json("t1", "Dentist")).unwrap();
    store.create_explicit(&dentist, at, None, now).await.unwrap();

    let notifier = ReminderNotifier::new(
        Arc::new(BackendSyncedStore::new(
            store.clone(),
            ReminderGateway::new(signed_in_client(&server.base_url)),
        )),
        Arc::new(RecordingSink::default()),
        granted(),
        EventBus::default(),
        NotifierConfig::default(),
    );

    let report = notifier.scan(at).await;
    assert_eq!(report.notified, 1);
    assert_eq!(report.failures, 1);
    assert_eq!(server.requests().await.len(), 1);
    assert!(store.get("t1").await.unwrap().notification_sent);
}

#[tokio::test]
async fn test_refresh_republishes_task_list() {
    let server = StubServer::start(|_| {
        (
            200,
            serde_json::json!([task_json("t1", "Submit report tomorrow at 5pm")]).to_string(),
        )
    })
    .await;
    let dir = TempDir::new().unwrap();
    let bus = EventBus::default();
    let mut events = bus.subscribe();
    let gateway = TaskGateway::new(
        signed_in_client(&server.base_url),
        Arc::new(LocalCache::new(dir.path())),
        bus,
    );

    let tasks = gateway.refresh().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(gateway.cached_tasks().await, tasks);

    match events.recv().await.unwrap() {
        AppEvent::TasksUpdated(published) => assert_eq!(published, tasks),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_store_follows_periodic_refresh() {
    let server = StubServer::start(|_| {
        let due = Utc::now() + Duration::hours(2);
        let mut task = task_json("t1", "Dentist");
        task["reminder"] = serde_json::json!({ "time": due.to_rfc3339() });
        (200, serde_json::json!([task]).to_string())
    })
    .await;
    let dir = TempDir::new().unwrap();
    let bus = EventBus::default();
    let store = Arc::new(ReminderStore::default());
    let listener = store.attach(&bus);
    let gateway = TaskGateway::new(
        signed_in_client(&server.base_url),
        Arc::new(LocalCache::new(dir.path())),
        bus,
    );

    let refresh = gateway.spawn_refresh(std::time::Duration::from_millis(20));
    for _ in 0..100 {
        if !store.is_empty().await {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    refresh.abort();
    listener.abort();

    assert_eq!(store.get("t1").await.unwrap().title, "Dentist");
    assert!(!server.requests().await.is_empty());
}
