//! End-to-end lifecycle tests: delivery, follow-ups, and the resolution
//! poller's settle-once behavior.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use frontdesk_sv::models::{DeliveryStatus, HelpRequest, RequestStatus};
use frontdesk_sv::notify::NotificationSink;
use frontdesk_sv::poller::ResolutionPoller;
use frontdesk_sv::resolver::ResolverConfig;
use frontdesk_sv::sessions::SessionHandle;
use frontdesk_sv::{db, delivery, escalation, AppState};

/// Session handle that records pushed messages and can be told to fail
struct TestHandle {
    sent: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl TestHandle {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(true),
        })
    }

    async fn messages(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl SessionHandle for TestHandle {
    async fn send_message(&self, message: &str) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("transport channel closed");
        }
        self.sent.lock().await.push(message.to_string());
        Ok(())
    }
}

/// Sink that counts notifications instead of logging them
#[derive(Default)]
struct CountingSink {
    supervisor: AtomicUsize,
    customer: AtomicUsize,
}

#[async_trait]
impl NotificationSink for CountingSink {
    async fn notify_supervisor(&self, _request: &HelpRequest) {
        self.supervisor.fetch_add(1, Ordering::SeqCst);
    }

    async fn notify_customer(&self, _customer_phone: &str, _message: &str) {
        self.customer.fetch_add(1, Ordering::SeqCst);
    }
}

async fn setup() -> (AppState, Arc<CountingSink>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let pool = db::init_database_pool(&dir.path().join("frontdesk.db"))
        .await
        .expect("Should open test database");
    db::seed_knowledge(&pool).await.expect("Should seed knowledge");

    let sink = Arc::new(CountingSink::default());
    let state = AppState::new(
        pool,
        sink.clone(),
        ResolverConfig::default(),
        chrono::Duration::hours(1),
    );
    (state, sink, dir)
}

fn poller_for(state: &AppState, sink: Arc<CountingSink>) -> ResolutionPoller {
    ResolutionPoller::new(
        state.db.clone(),
        state.sessions.clone(),
        sink,
        Duration::from_secs(5),
    )
}

async fn escalate_and_answer(state: &AppState, sink: &CountingSink, phone: &str) -> HelpRequest {
    let request = escalation::create_request(
        &state.db,
        sink,
        chrono::Duration::hours(1),
        phone,
        "Do you have parking?",
        None,
        None,
    )
    .await
    .expect("Should create request");

    escalation::respond(&state.db, &request.id, "Yes, free parking in the lot")
        .await
        .expect("Should resolve request")
}

#[tokio::test]
async fn poller_delivers_to_live_session_and_keeps_it_registered() {
    let (state, sink, _dir) = setup().await;
    let handle = TestHandle::new();
    state
        .register_session("+15550001", handle.clone(), "room-1")
        .await
        .unwrap();

    let resolved = escalate_and_answer(&state, sink.as_ref(), "+15550001").await;
    assert_eq!(sink.supervisor.load(Ordering::SeqCst), 1);

    let poller = poller_for(&state, sink.clone());
    let settled = poller.tick().await.unwrap();
    assert_eq!(settled, 1);

    // Answer pushed verbatim through the live session
    let messages = handle.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Yes, free parking in the lot"));

    // Healthy push does not evict the session
    assert!(state.sessions.lookup("+15550001").await.is_some());

    // Settled, and no follow-up queued
    let request = db::requests::get_request(&state.db, &resolved.id).await.unwrap().unwrap();
    assert_eq!(request.delivery_status, DeliveryStatus::Delivered);
    assert!(db::follow_ups::list_all(&state.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn poller_defers_delivery_when_no_session_exists() {
    let (state, sink, _dir) = setup().await;

    let resolved = escalate_and_answer(&state, sink.as_ref(), "+15550002").await;

    let poller = poller_for(&state, sink.clone());
    assert_eq!(poller.tick().await.unwrap(), 1);

    // No directory mutation happened (it was empty and stays empty)
    assert!(state.sessions.is_empty().await);

    // Message queued for the asker's next contact
    let queued = db::follow_ups::list_undelivered_for(&state.db, "+15550002").await.unwrap();
    assert_eq!(queued.len(), 1);
    assert!(queued[0].message.contains("Yes, free parking in the lot"));

    let request = db::requests::get_request(&state.db, &resolved.id).await.unwrap().unwrap();
    assert_eq!(request.delivery_status, DeliveryStatus::Delivered);
}

#[tokio::test]
async fn poller_settles_once_and_never_renotifies() {
    let (state, sink, _dir) = setup().await;

    escalate_and_answer(&state, sink.as_ref(), "+15550003").await;

    let poller = poller_for(&state, sink.clone());
    assert_eq!(poller.tick().await.unwrap(), 1);
    assert_eq!(sink.customer.load(Ordering::SeqCst), 1);

    // Subsequent ticks find nothing to do
    for _ in 0..3 {
        assert_eq!(poller.tick().await.unwrap(), 0);
    }
    assert_eq!(sink.customer.load(Ordering::SeqCst), 1);
    assert_eq!(db::follow_ups::list_all(&state.db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_push_evicts_session_and_queues_follow_up() {
    let (state, sink, _dir) = setup().await;
    let handle = TestHandle::failing();
    state
        .register_session("+15550004", handle, "room-4")
        .await
        .unwrap();

    escalate_and_answer(&state, sink.as_ref(), "+15550004").await;

    let poller = poller_for(&state, sink.clone());
    assert_eq!(poller.tick().await.unwrap(), 1);

    // The dead session was removed and the message deferred
    assert!(state.sessions.lookup("+15550004").await.is_none());
    let queued = db::follow_ups::list_undelivered_for(&state.db, "+15550004").await.unwrap();
    assert_eq!(queued.len(), 1);
}

#[tokio::test]
async fn register_session_drains_queued_follow_ups() {
    let (state, _sink, _dir) = setup().await;

    delivery::defer(&state.db, "+15550005", "Your answer: yes").await.unwrap();
    delivery::defer(&state.db, "+15550005", "A second update").await.unwrap();

    let handle = TestHandle::new();
    let drained = state
        .register_session("+15550005", handle.clone(), "room-5")
        .await
        .unwrap();
    assert_eq!(drained, 2);

    let messages = handle.messages().await;
    assert_eq!(messages, vec!["Your answer: yes", "A second update"]);

    // Queue fully flushed
    assert!(db::follow_ups::list_undelivered_for(&state.db, "+15550005")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn poller_tick_sweeps_expired_requests() {
    let (state, sink, _dir) = setup().await;

    let mut expired = HelpRequest::new(
        "+15550006",
        "Do you sell gift cards?",
        None,
        None,
        chrono::Duration::hours(1),
    );
    expired.created_at = Utc::now() - chrono::Duration::hours(2);
    expired.timeout_at = Utc::now() - chrono::Duration::hours(1);
    db::requests::insert_request(&state.db, &expired).await.unwrap();

    let poller = poller_for(&state, sink.clone());
    poller.tick().await.unwrap();

    let request = db::requests::get_request(&state.db, &expired.id).await.unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::Timeout);
}

#[tokio::test]
async fn resolution_writes_exactly_one_learned_entry() {
    let (state, sink, _dir) = setup().await;

    assert!(!escalation::learned_entry_exists(&state.db, "Do you have parking?")
        .await
        .unwrap());

    escalate_and_answer(&state, sink.as_ref(), "+15550007").await;

    assert_eq!(db::knowledge::count_entries(&state.db).await.unwrap(), 6);
    assert!(escalation::learned_entry_exists(&state.db, "Do you have parking?")
        .await
        .unwrap());

    // The learned answer now resolves directly
    let hit = frontdesk_sv::resolver::resolve_query(
        &state.db,
        &state.resolver,
        "Do you have parking?",
    )
    .await
    .unwrap()
    .expect("learned entry should match");
    assert_eq!(hit.answer, "Yes, free parking in the lot");
}
