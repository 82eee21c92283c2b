mod common;

use async_trait::async_trait;
use common::{
    insert_record, record_synced, registry_for_all, setup_pool, test_sync_config,
    ScriptedHandler,
};
use mockall::mock;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use vistoria_sync::application::ports::{QueueCounts, SyncQueueStore};
use vistoria_sync::infrastructure::offline::{
    SqliteSyncMetadataStore, SqliteSyncQueueStore, SqliteSyncRecordStore,
};
use vistoria_sync::shared::config::SyncConfig;
use vistoria_sync::{
    AppError, ConnectivityMonitor, EntityType, ExecutorState, PassSkipReason, RemoteApplyError,
    RemoteApplyHandler, RemoteApplyRegistry, SyncEngine, SyncOperation, SyncPassOutcome,
    SyncPayload, SyncQueueId, SyncQueueItem,
};

mock! {
    pub Remote {}

    #[async_trait]
    impl RemoteApplyHandler for Remote {
        async fn apply_create(&self, payload: &SyncPayload) -> Result<(), RemoteApplyError>;
        async fn apply_update(&self, payload: &SyncPayload) -> Result<(), RemoteApplyError>;
        async fn apply_delete(&self, payload: &SyncPayload) -> Result<(), RemoteApplyError>;
    }
}

fn engine(
    pool: &sqlx::SqlitePool,
    monitor: Arc<ConnectivityMonitor>,
    handlers: RemoteApplyRegistry,
    config: &SyncConfig,
) -> SyncEngine {
    SyncEngine::from_pool(pool.clone(), monitor, handlers, config)
}

fn report(outcome: &SyncPassOutcome) -> &vistoria_sync::SyncPassReport {
    outcome.report().expect("completed pass")
}

#[tokio::test]
async fn coalesced_changes_make_one_remote_call_per_record() {
    let pool = setup_pool().await;
    insert_record(&pool, EntityType::Client, "c1", false).await;
    insert_record(&pool, EntityType::Photo, "p1", false).await;

    let mut clients = MockRemote::new();
    clients
        .expect_apply_create()
        .withf(|payload| payload.as_json()["nome"] == "Ana Maria")
        .times(1)
        .returning(|_| Ok(()));
    clients.expect_apply_update().times(0);
    let mut photos = MockRemote::new();
    photos.expect_apply_create().times(1).returning(|_| Ok(()));

    let handlers = RemoteApplyRegistry::new()
        .with_handler(EntityType::Client, Arc::new(clients))
        .with_handler(EntityType::Photo, Arc::new(photos));
    let monitor = Arc::new(ConnectivityMonitor::new(true));
    let engine = engine(&pool, monitor, handlers, &test_sync_config());

    engine
        .enqueue_change(EntityType::Client, SyncOperation::Create, json!({"id": "c1", "nome": "Ana"}))
        .await
        .unwrap();
    engine
        .enqueue_change(EntityType::Photo, SyncOperation::Create, json!({"id": "p1"}))
        .await
        .unwrap();
    engine
        .enqueue_change(
            EntityType::Client,
            SyncOperation::Update,
            json!({"id": "c1", "nome": "Ana Maria"}),
        )
        .await
        .unwrap();
    assert_eq!(engine.pending_items().await.unwrap().len(), 2);

    let outcome = engine.force_sync_now().await.unwrap();
    assert_eq!(report(&outcome).succeeded, 2);

    assert!(engine.pending_items().await.unwrap().is_empty());
    assert_eq!(record_synced(&pool, EntityType::Client, "c1").await, Some(true));
    assert_eq!(record_synced(&pool, EntityType::Photo, "p1").await, Some(true));
}

#[tokio::test]
async fn persistently_failing_item_stops_after_retry_budget() {
    let pool = setup_pool().await;
    let handler = ScriptedHandler::new();
    handler.fail_id("i3", RemoteApplyError::Transient("503".into()));
    let monitor = Arc::new(ConnectivityMonitor::new(true));
    let engine = engine(&pool, monitor, registry_for_all(handler.clone()), &test_sync_config());

    for index in 1..=5 {
        let id = format!("i{index}");
        insert_record(&pool, EntityType::Inspection, &id, false).await;
        engine
            .enqueue_change(EntityType::Inspection, SyncOperation::Create, json!({ "id": id }))
            .await
            .unwrap();
    }

    let first = engine.force_sync_now().await.unwrap();
    assert_eq!(report(&first).succeeded, 4);
    assert_eq!(report(&first).failed, 1);
    for id in ["i1", "i2", "i4", "i5"] {
        assert_eq!(record_synced(&pool, EntityType::Inspection, id).await, Some(true));
    }

    for _ in 0..3 {
        engine.force_sync_now().await.unwrap();
    }

    // Tried once per pass until the budget of three ran out.
    assert_eq!(handler.calls_for("i3"), 3);
    let remaining = engine.pending_items().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].attempts, 3);
    assert!(remaining[0].is_permanently_failed());
    assert_eq!(remaining[0].last_error.as_deref(), Some("Transient remote failure: 503"));

    let status = engine.status().await.unwrap();
    assert_eq!(status.pending_count, 1);
    assert_eq!(status.failed_count, 1);
    assert_eq!(record_synced(&pool, EntityType::Inspection, "i3").await, Some(false));
}

#[tokio::test]
async fn successful_pass_flips_record_flag() {
    let pool = setup_pool().await;
    insert_record(&pool, EntityType::Report, "r1", false).await;
    let handler = ScriptedHandler::new();
    let monitor = Arc::new(ConnectivityMonitor::new(true));
    let engine = engine(&pool, monitor, registry_for_all(handler), &test_sync_config());

    engine
        .enqueue_change(EntityType::Report, SyncOperation::Update, json!({"id": "r1"}))
        .await
        .unwrap();
    engine.force_sync_now().await.unwrap();

    assert_eq!(record_synced(&pool, EntityType::Report, "r1").await, Some(true));
    assert!(engine.pending_items().await.unwrap().is_empty());
    let status = engine.status().await.unwrap();
    assert_eq!(status.pending_count, 0);
    assert!(status.last_sync_at.is_some());
}

#[tokio::test]
async fn offline_pass_changes_nothing() {
    let pool = setup_pool().await;
    insert_record(&pool, EntityType::Client, "c1", false).await;
    let handler = ScriptedHandler::new();
    let monitor = Arc::new(ConnectivityMonitor::new(false));
    let engine = engine(&pool, monitor, registry_for_all(handler.clone()), &test_sync_config());

    engine
        .enqueue_change(EntityType::Client, SyncOperation::Create, json!({"id": "c1"}))
        .await
        .unwrap();
    let queue_before = engine.pending_items().await.unwrap();
    let status_before = engine.status().await.unwrap();

    let outcome = engine.force_sync_now().await.unwrap();

    assert_eq!(outcome, SyncPassOutcome::skipped(PassSkipReason::Offline));
    assert!(handler.calls().is_empty());
    assert_eq!(engine.pending_items().await.unwrap(), queue_before);
    assert_eq!(engine.status().await.unwrap(), status_before);
    assert_eq!(record_synced(&pool, EntityType::Client, "c1").await, Some(false));
}

#[tokio::test]
async fn concurrent_passes_run_once() {
    let pool = setup_pool().await;
    let handler = ScriptedHandler::with_delay(Duration::from_millis(100));
    let monitor = Arc::new(ConnectivityMonitor::new(true));
    let engine = engine(&pool, monitor, registry_for_all(handler.clone()), &test_sync_config());
    engine
        .enqueue_change(EntityType::Signature, SyncOperation::Create, json!({"id": "s1"}))
        .await
        .unwrap();

    let (a, b) = tokio::join!(engine.force_sync_now(), engine.force_sync_now());
    let outcomes = [a.unwrap(), b.unwrap()];

    let skipped = outcomes
        .iter()
        .filter(|outcome| **outcome == SyncPassOutcome::skipped(PassSkipReason::AlreadySyncing))
        .count();
    assert_eq!(skipped, 1);
    assert_eq!(handler.calls().len(), 1);
}

#[tokio::test]
async fn permanent_rejection_is_not_retried_and_can_be_resolved() {
    let pool = setup_pool().await;
    insert_record(&pool, EntityType::Client, "bad", false).await;
    insert_record(&pool, EntityType::Client, "gone", false).await;
    let handler = ScriptedHandler::new();
    handler.fail_id("bad", RemoteApplyError::Permanent("cpf invalido".into()));
    handler.fail_id("gone", RemoteApplyError::Permanent("duplicate".into()));
    let monitor = Arc::new(ConnectivityMonitor::new(true));
    let engine = engine(&pool, monitor, registry_for_all(handler.clone()), &test_sync_config());

    for id in ["bad", "gone"] {
        engine
            .enqueue_change(EntityType::Client, SyncOperation::Create, json!({ "id": id }))
            .await
            .unwrap();
    }

    let first = engine.force_sync_now().await.unwrap();
    assert_eq!(report(&first).failed, 2);
    assert_eq!(report(&first).retry_after, None);
    engine.force_sync_now().await.unwrap();
    assert_eq!(handler.calls().len(), 2);

    let failed = engine.failed_items().await.unwrap();
    assert_eq!(failed.len(), 2);
    assert!(failed.iter().all(|item| item.attempts == 1));

    handler.heal_id("bad");
    let bad = SyncQueueId::new("client:bad".into()).unwrap();
    let reset = engine.retry_failed(&bad).await.unwrap();
    assert_eq!(reset.attempts, 0);
    assert!(!reset.is_permanently_failed());

    let gone = SyncQueueId::new("client:gone".into()).unwrap();
    assert!(engine.discard(&gone).await.unwrap());
    assert!(!engine.discard(&gone).await.unwrap());

    engine.force_sync_now().await.unwrap();
    assert!(engine.pending_items().await.unwrap().is_empty());
    assert_eq!(record_synced(&pool, EntityType::Client, "bad").await, Some(true));
    assert_eq!(record_synced(&pool, EntityType::Client, "gone").await, Some(false));
}

#[tokio::test]
async fn status_observers_follow_enqueue_and_pass() {
    let pool = setup_pool().await;
    let handler = ScriptedHandler::new();
    let monitor = Arc::new(ConnectivityMonitor::new(true));
    let engine = engine(&pool, monitor, registry_for_all(handler), &test_sync_config());

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = engine.subscribe_sync_status(move |status| {
        sink.lock().unwrap().push(status.pending_count);
    });

    engine
        .enqueue_change(EntityType::Photo, SyncOperation::Create, json!({"id": "p1"}))
        .await
        .unwrap();
    engine.force_sync_now().await.unwrap();

    let counts = seen.lock().unwrap().clone();
    assert_eq!(counts.first(), Some(&1));
    assert_eq!(counts.last(), Some(&0));

    subscription.unsubscribe();
    subscription.unsubscribe();
    let before = seen.lock().unwrap().len();
    engine
        .enqueue_change(EntityType::Photo, SyncOperation::Update, json!({"id": "p2"}))
        .await
        .unwrap();
    assert_eq!(seen.lock().unwrap().len(), before);
}

#[tokio::test]
async fn online_transition_triggers_background_pass() {
    let pool = setup_pool().await;
    insert_record(&pool, EntityType::Inspection, "v1", false).await;
    let handler = ScriptedHandler::new();
    let monitor = Arc::new(ConnectivityMonitor::new(false));
    let config = SyncConfig {
        auto_sync: true,
        ..test_sync_config()
    };
    let engine = engine(&pool, monitor.clone(), registry_for_all(handler.clone()), &config);

    engine
        .enqueue_change(EntityType::Inspection, SyncOperation::Create, json!({"id": "v1"}))
        .await
        .unwrap();
    let mut status = engine.watch_status();
    assert!(engine.start());

    monitor.set_online(true);
    tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|status| status.is_online && status.pending_count == 0 && !status.is_syncing),
    )
    .await
    .expect("background pass finished")
    .unwrap();

    assert_eq!(handler.called_ids().len(), 1);
    assert_eq!(record_synced(&pool, EntityType::Inspection, "v1").await, Some(true));

    engine.shutdown().await;
    assert!(engine.start());
    engine.shutdown().await;
}

#[tokio::test]
async fn change_enqueued_during_pass_is_kept() {
    struct GatedRemote {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteApplyHandler for GatedRemote {
        async fn apply_create(&self, _payload: &SyncPayload) -> Result<(), RemoteApplyError> {
            Ok(())
        }
        async fn apply_update(&self, _payload: &SyncPayload) -> Result<(), RemoteApplyError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(())
        }
        async fn apply_delete(&self, _payload: &SyncPayload) -> Result<(), RemoteApplyError> {
            Ok(())
        }
    }

    let pool = setup_pool().await;
    insert_record(&pool, EntityType::Report, "r1", false).await;
    let remote = Arc::new(GatedRemote {
        entered: tokio::sync::Notify::new(),
        release: tokio::sync::Notify::new(),
        calls: AtomicUsize::new(0),
    });
    let monitor = Arc::new(ConnectivityMonitor::new(true));
    let engine = Arc::new(engine(
        &pool,
        monitor,
        RemoteApplyRegistry::new().with_handler(EntityType::Report, remote.clone()),
        &test_sync_config(),
    ));

    engine
        .enqueue_change(EntityType::Report, SyncOperation::Update, json!({"id": "r1", "v": 1}))
        .await
        .unwrap();

    let pass = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.force_sync_now().await })
    };
    remote.entered.notified().await;
    engine
        .enqueue_change(EntityType::Report, SyncOperation::Update, json!({"id": "r1", "v": 2}))
        .await
        .unwrap();
    remote.release.notify_one();

    let outcome = pass.await.unwrap().unwrap();
    assert_eq!(report(&outcome).superseded, 1);

    let queued = engine.pending_items().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].payload.as_json()["v"], 2);
    assert_eq!(record_synced(&pool, EntityType::Report, "r1").await, Some(false));

    engine.force_sync_now().await.unwrap();
    assert!(engine.pending_items().await.unwrap().is_empty());
    assert_eq!(record_synced(&pool, EntityType::Report, "r1").await, Some(true));
}

/// Queue store that can hold the next `enqueue` before it touches the database.
struct HeldQueue {
    inner: SqliteSyncQueueStore,
    hold_next: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl HeldQueue {
    fn new(pool: &sqlx::SqlitePool) -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteSyncQueueStore::new(pool.clone()),
            hold_next: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl SyncQueueStore for HeldQueue {
    async fn enqueue(&self, item: SyncQueueItem) -> Result<SyncQueueItem, AppError> {
        if self.hold_next.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.enqueue(item).await
    }
    async fn all(&self) -> Result<Vec<SyncQueueItem>, AppError> {
        self.inner.all().await
    }
    async fn get(&self, id: &SyncQueueId) -> Result<Option<SyncQueueItem>, AppError> {
        self.inner.get(id).await
    }
    async fn failed(&self) -> Result<Vec<SyncQueueItem>, AppError> {
        self.inner.failed().await
    }
    async fn remove(&self, id: &SyncQueueId) -> Result<(), AppError> {
        self.inner.remove(id).await
    }
    async fn remove_applied(&self, item: &SyncQueueItem) -> Result<bool, AppError> {
        self.inner.remove_applied(item).await
    }
    async fn update(&self, item: &SyncQueueItem) -> Result<bool, AppError> {
        self.inner.update(item).await
    }
    async fn counts(&self) -> Result<QueueCounts, AppError> {
        self.inner.counts().await
    }
}

async fn assert_flag_matches_queue(engine: &SyncEngine, pool: &sqlx::SqlitePool, id: &str) {
    let queued = engine
        .pending_items()
        .await
        .unwrap()
        .iter()
        .any(|item| item.entity_id.as_str() == id);
    assert_eq!(
        record_synced(pool, EntityType::Inspection, id).await,
        Some(!queued),
        "record {id} synced flag disagrees with queue (queued = {queued})"
    );
}

#[tokio::test]
async fn edit_landing_after_a_pass_settles_leaves_record_unsynced() {
    let pool = setup_pool().await;
    insert_record(&pool, EntityType::Inspection, "v1", false).await;
    let queue = HeldQueue::new(&pool);
    let handler = ScriptedHandler::new();
    let engine = Arc::new(SyncEngine::new(
        queue.clone(),
        Arc::new(SqliteSyncRecordStore::new(pool.clone())),
        Arc::new(SqliteSyncMetadataStore::new(pool.clone())),
        Arc::new(ConnectivityMonitor::new(true)),
        registry_for_all(handler.clone()),
        &test_sync_config(),
    ));

    engine
        .enqueue_change(EntityType::Inspection, SyncOperation::Update, json!({"id": "v1", "n": 1}))
        .await
        .unwrap();

    queue.hold_next.store(true, Ordering::SeqCst);
    let edit = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .enqueue_change(
                    EntityType::Inspection,
                    SyncOperation::Update,
                    json!({"id": "v1", "n": 2}),
                )
                .await
        })
    };
    queue.entered.notified().await;

    let outcome = engine.force_sync_now().await.unwrap();
    assert_eq!(report(&outcome).succeeded, 1);
    assert_flag_matches_queue(&engine, &pool, "v1").await;

    queue.release.notify_one();
    edit.await.unwrap().unwrap();

    let queued = engine.pending_items().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].payload.as_json()["n"], 2);
    assert_eq!(record_synced(&pool, EntityType::Inspection, "v1").await, Some(false));
    assert_eq!(
        engine
            .is_record_synced(EntityType::Inspection, &queued[0].entity_id)
            .await
            .unwrap(),
        Some(false)
    );
}

#[tokio::test]
async fn record_flag_tracks_queue_under_interleaved_edits_and_passes() {
    let pool = setup_pool().await;
    insert_record(&pool, EntityType::Inspection, "v1", false).await;
    let handler = ScriptedHandler::with_delay(Duration::from_millis(2));
    let engine = engine(
        &pool,
        Arc::new(ConnectivityMonitor::new(true)),
        registry_for_all(handler.clone()),
        &test_sync_config(),
    );

    for n in 0..20 {
        let (pass, edit) = tokio::join!(
            engine.force_sync_now(),
            engine.enqueue_change(
                EntityType::Inspection,
                SyncOperation::Update,
                json!({"id": "v1", "n": n}),
            )
        );
        pass.unwrap();
        edit.unwrap();
        assert_flag_matches_queue(&engine, &pool, "v1").await;
    }

    engine.force_sync_now().await.unwrap();
    assert!(engine.pending_items().await.unwrap().is_empty());
    assert_eq!(record_synced(&pool, EntityType::Inspection, "v1").await, Some(true));
}

#[tokio::test]
async fn manual_sync_during_scheduled_pass_keeps_fast_retry() {
    let pool = setup_pool().await;
    insert_record(&pool, EntityType::Client, "c1", false).await;
    let handler = ScriptedHandler::with_delay(Duration::from_millis(300));
    handler.fail_id("c1", RemoteApplyError::Transient("503".into()));
    let config = SyncConfig {
        auto_sync: true,
        sync_interval_secs: 60,
        retry_delay_secs: 1,
        ..test_sync_config()
    };
    let engine = engine(
        &pool,
        Arc::new(ConnectivityMonitor::new(true)),
        registry_for_all(handler.clone()),
        &config,
    );
    engine
        .enqueue_change(EntityType::Client, SyncOperation::Create, json!({"id": "c1"}))
        .await
        .unwrap();

    let mut state = engine.executor().subscribe_state();
    assert!(engine.start());
    tokio::time::timeout(
        Duration::from_secs(2),
        state.wait_for(|state| *state == ExecutorState::Syncing),
    )
    .await
    .expect("scheduled pass started")
    .unwrap();

    let outcome = engine.force_sync_now().await.unwrap();
    assert_eq!(outcome, SyncPassOutcome::skipped(PassSkipReason::AlreadySyncing));

    // First pass ends near 0.3s; the retry pass follows one second later.
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(
        handler.calls_for("c1") >= 2,
        "retry pass did not run, calls = {}",
        handler.calls_for("c1")
    );

    engine.shutdown().await;
}
