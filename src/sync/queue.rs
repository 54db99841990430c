//! The offline mutation queue.
//!
//! Writes attempted while the terminal is disconnected are appended here,
//! mirrored to local storage after every change and replayed against the
//! remote store when connectivity returns. A replay pass walks a snapshot of
//! the queue in insertion order; confirmed operations are removed, failed
//! ones stay for the next pass.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::connectivity::ConnectivityEvent;
use super::executor::{ReplayExecutor, SyncReport};
use super::notify::{Notice, Notifier};
use super::operation::{OperationKind, QueuedOperation};
use crate::config::Config;
use crate::error::KitchenError;
use crate::remote::{RemoteStore, Row};
use crate::storage::{DurableMirror, DEAD_LETTER_KEY};

/// Queue policy.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Payload field holding the row identifier for update and delete
    pub id_field: String,
    /// Start a replay pass right after enqueueing while online
    pub sync_on_enqueue: bool,
    /// Evict to the dead-letter list after this many failed attempts
    pub max_attempts: Option<u32>,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            sync_on_enqueue: true,
            max_attempts: None,
        }
    }
}

impl From<&Config> for QueueSettings {
    fn from(config: &Config) -> Self {
        Self {
            id_field: config.remote.id_field.clone(),
            sync_on_enqueue: config.queue.sync_on_enqueue,
            max_attempts: config.queue.max_attempts,
        }
    }
}

/// Why a replay request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing queued
    Empty,
    /// Another pass is in flight
    AlreadySyncing,
    /// The queue is shutting down
    ShuttingDown,
}

/// What a call to [`OfflineQueue::replay`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum ReplayOutcome {
    Skipped(SkipReason),
    Completed(SyncReport),
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub dead_lettered: usize,
    pub online: bool,
    pub syncing: bool,
    pub oldest_pending: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct QueueState {
    pending: Vec<QueuedOperation>,
    dead: Vec<QueuedOperation>,
}

struct Inner {
    remote: Arc<dyn RemoteStore>,
    mirror: DurableMirror,
    dead_mirror: DurableMirror,
    notifier: Arc<dyn Notifier>,
    settings: QueueSettings,
    state: Mutex<QueueState>,
    online: AtomicBool,
    syncing: AtomicBool,
    closing: AtomicBool,
}

/// Handle to the offline queue. Clones share the same queue.
#[derive(Clone)]
pub struct OfflineQueue {
    inner: Arc<Inner>,
}

/// Holds the single-flight flag for the duration of a pass.
struct SyncGuard<'a>(&'a AtomicBool);

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl OfflineQueue {
    /// Build a queue, loading whatever the mirror holds from a previous run.
    ///
    /// Dead letters are mirrored next to the queue under their own key.
    ///
    /// # Errors
    ///
    /// Returns an error if the mirror's backing store cannot be read.
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        mirror: DurableMirror,
        notifier: Arc<dyn Notifier>,
        settings: QueueSettings,
        online: bool,
    ) -> Result<Self, KitchenError> {
        let dead_mirror = mirror.sibling(DEAD_LETTER_KEY);
        let state = QueueState {
            pending: mirror.load()?,
            dead: dead_mirror.load()?,
        };

        if !state.pending.is_empty() {
            info!(
                key = mirror.key(),
                count = state.pending.len(),
                "Restored pending offline operations"
            );
        }

        Ok(Self {
            inner: Arc::new(Inner {
                remote,
                mirror,
                dead_mirror,
                notifier,
                settings,
                state: Mutex::new(state),
                online: AtomicBool::new(online),
                syncing: AtomicBool::new(false),
                closing: AtomicBool::new(false),
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        // Every mutation leaves the lists consistent, so a poisoned lock is
        // still safe to use
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.inner.syncing.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    /// Snapshot of pending operations in replay order.
    #[must_use]
    pub fn pending(&self) -> Vec<QueuedOperation> {
        self.state().pending.clone()
    }

    /// Snapshot of evicted operations, oldest eviction first.
    #[must_use]
    pub fn dead_letters(&self) -> Vec<QueuedOperation> {
        self.state().dead.clone()
    }

    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let state = self.state();
        QueueStats {
            pending: state.pending.len(),
            dead_lettered: state.dead.len(),
            online: self.is_online(),
            syncing: self.is_syncing(),
            oldest_pending: state.pending.iter().map(|op| op.enqueued_at).min(),
        }
    }

    /// Queue a write and return its id.
    ///
    /// The write is appended and mirrored before this returns; it is sent
    /// later by a replay pass, started right away in the background when
    /// online and idle. Enqueueing never fails: a mirror write error is
    /// logged and the operation stays queued in memory.
    pub fn enqueue(&self, target: impl Into<String>, kind: OperationKind, payload: Row) -> String {
        let operation = QueuedOperation::new(target, kind, payload);
        let id = operation.id.clone();

        {
            let mut state = self.state();
            debug!(id = %id, table = %operation.target, kind = %kind, "Queued offline operation");
            state.pending.push(operation);
            self.persist_pending(&state.pending);
        }

        if self.inner.settings.sync_on_enqueue && self.is_online() && !self.is_syncing() {
            self.spawn_replay();
        }

        id
    }

    /// Run one replay pass over the current queue.
    ///
    /// Single-flight: returns [`ReplayOutcome::Skipped`] when the queue is
    /// empty or another pass is running. Remote failures are contained in the
    /// returned report; the failed entries stay queued.
    pub async fn replay(&self) -> ReplayOutcome {
        let Some(guard) = SyncGuard::acquire(&self.inner.syncing) else {
            debug!("Replay already in progress");
            return ReplayOutcome::Skipped(SkipReason::AlreadySyncing);
        };
        if self.is_closing() {
            return ReplayOutcome::Skipped(SkipReason::ShuttingDown);
        }

        let snapshot = self.pending();
        if snapshot.is_empty() {
            return ReplayOutcome::Skipped(SkipReason::Empty);
        }

        info!(count = snapshot.len(), "Replaying offline operations");
        let executor =
            ReplayExecutor::new(self.inner.remote.as_ref(), &self.inner.settings.id_field);
        let mut report = executor.execute_all(&snapshot).await;

        self.settle(&mut report);
        drop(guard);

        if report.succeeded > 0 {
            self.inner.notifier.notify(Notice::Synced {
                count: report.succeeded,
            });
        }

        // Checked after the flag is released: an enqueue that still saw the
        // pass running is visible here, one that came later starts its own.
        if self.inner.settings.sync_on_enqueue
            && self.is_online()
            && self.has_unreplayed(&snapshot)
        {
            self.spawn_replay();
        }

        ReplayOutcome::Completed(report)
    }

    /// Whether the live queue holds operations this pass never saw.
    fn has_unreplayed(&self, snapshot: &[QueuedOperation]) -> bool {
        let replayed: HashSet<&str> = snapshot.iter().map(|op| op.id.as_str()).collect();
        self.state()
            .pending
            .iter()
            .any(|op| !replayed.contains(op.id.as_str()))
    }

    /// Apply a finished pass to the live queue.
    fn settle(&self, report: &mut SyncReport) {
        let succeeded: HashSet<String> = report.succeeded_ids().map(String::from).collect();
        let failures: HashMap<String, String> = report
            .failures()
            .map(|(id, e)| (id.to_string(), e.to_string()))
            .collect();
        let max_attempts = self.inner.settings.max_attempts;

        let mut state = self.state();
        let mut kept = Vec::with_capacity(state.pending.len());
        let mut evicted = Vec::new();

        for mut operation in state.pending.drain(..) {
            if succeeded.contains(&operation.id) {
                continue;
            }
            if let Some(message) = failures.get(&operation.id) {
                operation.attempts += 1;
                operation.last_error = Some(message.clone());
                if max_attempts.is_some_and(|max| operation.attempts >= max) {
                    evicted.push(operation);
                    continue;
                }
            }
            kept.push(operation);
        }

        state.pending = kept;
        self.persist_pending(&state.pending);

        if !evicted.is_empty() {
            for operation in &evicted {
                warn!(
                    id = %operation.id,
                    table = %operation.target,
                    attempts = operation.attempts,
                    "Moving operation to dead letters"
                );
            }
            report.dead_lettered = evicted.len();
            state.dead.extend(evicted);
            self.persist_dead(&state.dead);
        }
    }

    /// Empty the queue and its mirror. A pass in flight is not interrupted;
    /// it only removes its own successes from whatever is queued when it
    /// finishes.
    ///
    /// # Errors
    ///
    /// Returns an error if the mirror cannot be removed; the in-memory queue
    /// is empty either way.
    pub fn clear(&self) -> Result<(), KitchenError> {
        let mut state = self.state();
        let dropped = state.pending.len();
        state.pending.clear();
        info!(dropped, "Cleared offline queue");
        self.inner.mirror.clear()
    }

    /// Move every dead letter back to the tail of the queue with its attempt
    /// count reset. Returns how many were requeued.
    ///
    /// # Errors
    ///
    /// Returns an error if either mirror cannot be written.
    pub fn requeue_dead_letters(&self) -> Result<usize, KitchenError> {
        let count = {
            let mut state = self.state();
            let mut revived = std::mem::take(&mut state.dead);
            let count = revived.len();
            revived.iter_mut().for_each(QueuedOperation::reset_attempts);
            state.pending.extend(revived);
            self.inner.mirror.save(&state.pending)?;
            self.inner.dead_mirror.save(&state.dead)?;
            count
        };

        if count > 0 && self.is_online() && !self.is_syncing() {
            self.spawn_replay();
        }
        Ok(count)
    }

    /// Drop every dead letter. Returns how many were dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the dead-letter mirror cannot be removed.
    pub fn purge_dead_letters(&self) -> Result<usize, KitchenError> {
        let mut state = self.state();
        let count = state.dead.len();
        state.dead.clear();
        self.inner.dead_mirror.clear()?;
        Ok(count)
    }

    /// Stop starting passes and wait up to `grace` for a running one to
    /// settle, so confirmed writes leave the mirror before the runtime goes
    /// away. Returns whether the queue went idle in time.
    ///
    /// Enqueueing keeps working afterwards; nothing is replayed.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.inner.closing.store(true, Ordering::SeqCst);

        let idle = tokio::time::timeout(grace, async {
            while self.inner.syncing.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok();

        if !idle {
            warn!(
                grace_ms = grace.as_millis(),
                "Replay still running at shutdown, its operations stay queued"
            );
        }
        idle
    }

    fn is_closing(&self) -> bool {
        self.inner.closing.load(Ordering::SeqCst)
    }

    /// Apply a connectivity event.
    pub fn handle(&self, event: ConnectivityEvent) {
        match event {
            ConnectivityEvent::Online => self.set_online(),
            ConnectivityEvent::Offline => self.set_offline(),
        }
    }

    /// Connectivity returned: notify, then replay if anything is pending.
    pub fn set_online(&self) {
        if self.inner.online.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.notifier.notify(Notice::Online);

        if self.pending_count() > 0 && !self.is_syncing() {
            self.spawn_replay();
        }
    }

    /// Connectivity lost. A pass in flight keeps running.
    pub fn set_offline(&self) {
        if !self.inner.online.swap(false, Ordering::AcqRel) {
            return;
        }
        self.inner.notifier.notify(Notice::Offline);
    }

    fn spawn_replay(&self) {
        if self.is_closing() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let queue = self.clone();
                handle.spawn(async move {
                    let _outcome = queue.replay().await;
                });
            }
            Err(_) => debug!("No async runtime, replay deferred"),
        }
    }

    fn persist_pending(&self, pending: &[QueuedOperation]) {
        if let Err(e) = self.inner.mirror.save(pending) {
            error!(error = %e, "Failed to mirror offline queue");
        }
    }

    fn persist_dead(&self, dead: &[QueuedOperation]) {
        if let Err(e) = self.inner.dead_mirror.save(dead) {
            error!(error = %e, "Failed to mirror dead letters");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MockRemoteStore, RemoteError};
    use crate::storage::{MemoryStore, QUEUE_KEY};
    use crate::sync::notify::ChannelNotifier;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio::sync::{mpsc, Notify, Semaphore};

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn memory_mirror() -> DurableMirror {
        DurableMirror::new(Arc::new(MemoryStore::new()), QUEUE_KEY)
    }

    fn build(
        remote: impl RemoteStore + 'static,
        mirror: DurableMirror,
        settings: QueueSettings,
    ) -> (OfflineQueue, mpsc::UnboundedReceiver<Notice>) {
        let (notifier, rx) = ChannelNotifier::channel();
        let queue =
            OfflineQueue::new(Arc::new(remote), mirror, Arc::new(notifier), settings, false)
                .unwrap();
        (queue, rx)
    }

    fn remote_failing_on(bad_ids: &'static [&'static str]) -> MockRemoteStore {
        let mut remote = MockRemoteStore::new();
        remote.expect_insert().returning(move |_, data| {
            let id = data.get("id").and_then(Value::as_str).unwrap_or_default();
            if bad_ids.contains(&id) {
                Err(RemoteError::Http {
                    status: 500,
                    body: "boom".to_string(),
                })
            } else {
                Ok(())
            }
        });
        remote
    }

    /// Remote whose inserts block until the test hands out permits.
    struct GatedRemote {
        started: Notify,
        gate: Semaphore,
    }

    #[async_trait]
    impl RemoteStore for Arc<GatedRemote> {
        async fn insert(&self, _table: &str, _row: &Row) -> Result<(), RemoteError> {
            self.started.notify_one();
            self.gate
                .acquire()
                .await
                .map_err(|e| RemoteError::Transport(e.to_string()))?
                .forget();
            Ok(())
        }

        async fn update(&self, _: &str, _: &Row, _: &Value) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn delete(&self, _: &str, _: &Value) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn ping(&self) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    #[test]
    fn test_offline_enqueue_counts_and_mirrors() {
        let mirror = memory_mirror();
        let (queue, _rx) = build(MockRemoteStore::new(), mirror.clone(), QueueSettings::default());

        let ids: Vec<String> = (0..5)
            .map(|n| queue.enqueue("orders", OperationKind::Insert, row(json!({"id": n}))))
            .collect();

        assert_eq!(queue.pending_count(), 5);
        let reloaded = mirror.load().unwrap();
        assert_eq!(reloaded, queue.pending());
        assert_eq!(
            reloaded.iter().map(|op| op.id.clone()).collect::<Vec<_>>(),
            ids
        );
    }

    #[test]
    fn test_restart_restores_pending() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let mirror = DurableMirror::new(store.clone(), QUEUE_KEY);

        let (queue, _rx) = build(MockRemoteStore::new(), mirror, QueueSettings::default());
        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o1"})));
        queue.enqueue("orders", OperationKind::Update, row(json!({"id": "o1", "total": 20})));
        let before = queue.pending();
        drop(queue);

        let (restarted, _rx) = build(
            MockRemoteStore::new(),
            DurableMirror::new(store, QUEUE_KEY),
            QueueSettings::default(),
        );
        assert_eq!(restarted.pending(), before);
    }

    #[tokio::test]
    async fn test_replay_empty_queue_is_skipped() {
        let (queue, _rx) = build(MockRemoteStore::new(), memory_mirror(), QueueSettings::default());

        assert_eq!(
            queue.replay().await,
            ReplayOutcome::Skipped(SkipReason::Empty)
        );
        assert!(!queue.is_syncing());
    }

    #[tokio::test]
    async fn test_online_event_syncs_and_notifies() {
        let (queue, mut rx) = build(
            remote_failing_on(&[]),
            memory_mirror(),
            QueueSettings::default(),
        );

        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o1", "total": 18})));
        assert_eq!(queue.pending_count(), 1);

        queue.handle(ConnectivityEvent::Online);

        assert_eq!(rx.recv().await, Some(Notice::Online));
        assert_eq!(rx.recv().await, Some(Notice::Synced { count: 1 }));
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_failed_in_order() {
        let mirror = memory_mirror();
        let (queue, mut rx) = build(
            remote_failing_on(&["b", "d"]),
            mirror.clone(),
            QueueSettings::default(),
        );

        for id in ["a", "b", "c", "d", "e"] {
            queue.enqueue("orders", OperationKind::Insert, row(json!({"id": id})));
        }

        let ReplayOutcome::Completed(report) = queue.replay().await else {
            panic!("replay should run");
        };
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 2);

        let remaining: Vec<_> = queue
            .pending()
            .iter()
            .map(|op| op.payload["id"].clone())
            .collect();
        assert_eq!(remaining, vec![json!("b"), json!("d")]);
        assert!(queue.pending().iter().all(|op| op.attempts == 1));
        assert_eq!(mirror.load().unwrap(), queue.pending());
        assert_eq!(rx.recv().await, Some(Notice::Synced { count: 3 }));
    }

    #[tokio::test]
    async fn test_first_fails_second_succeeds() {
        let (queue, mut rx) = build(
            remote_failing_on(&["first"]),
            memory_mirror(),
            QueueSettings::default(),
        );

        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "first"})));
        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "second"})));

        let _outcome = queue.replay().await;

        assert_eq!(queue.pending_count(), 1);
        assert_eq!(queue.pending()[0].payload["id"], json!("first"));
        assert_eq!(
            queue.pending()[0].last_error.as_deref(),
            Some("http 500: boom")
        );
        assert_eq!(rx.recv().await, Some(Notice::Synced { count: 1 }));
    }

    #[tokio::test]
    async fn test_succeeded_operation_is_never_reissued() {
        let mut remote = MockRemoteStore::new();
        remote
            .expect_insert()
            .withf(|_, data| data.get("id") == Some(&json!("ok")))
            .times(1)
            .returning(|_, _| Ok(()));
        remote
            .expect_insert()
            .withf(|_, data| data.get("id") == Some(&json!("stuck")))
            .times(2)
            .returning(|_, _| Err(RemoteError::Timeout));

        let (queue, _rx) = build(remote, memory_mirror(), QueueSettings::default());
        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "ok"})));
        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "stuck"})));

        let _first = queue.replay().await;
        let _second = queue.replay().await;

        assert_eq!(queue.pending_count(), 1);
        assert_eq!(queue.pending()[0].attempts, 2);
    }

    #[tokio::test]
    async fn test_no_notice_when_everything_fails() {
        let (queue, mut rx) = build(
            remote_failing_on(&["x"]),
            memory_mirror(),
            QueueSettings::default(),
        );
        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "x"})));

        let _outcome = queue.replay().await;

        assert_eq!(queue.pending_count(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_second_replay_while_running_is_noop() {
        let remote = Arc::new(GatedRemote {
            started: Notify::new(),
            gate: Semaphore::new(0),
        });
        let (queue, _rx) = build(Arc::clone(&remote), memory_mirror(), QueueSettings::default());

        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o1"})));
        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o2"})));

        let running = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.replay().await })
        };
        remote.started.notified().await;

        assert!(queue.is_syncing());
        assert_eq!(
            queue.replay().await,
            ReplayOutcome::Skipped(SkipReason::AlreadySyncing)
        );
        assert_eq!(queue.pending_count(), 2);

        remote.gate.add_permits(2);
        let ReplayOutcome::Completed(report) = running.await.unwrap() else {
            panic!("first replay should complete");
        };
        assert_eq!(report.succeeded, 2);
        assert_eq!(queue.pending_count(), 0);
        assert!(!queue.is_syncing());
    }

    #[tokio::test]
    async fn test_enqueue_during_pass_waits_for_follow_up() {
        let remote = Arc::new(GatedRemote {
            started: Notify::new(),
            gate: Semaphore::new(0),
        });
        let (queue, mut rx) = build(Arc::clone(&remote), memory_mirror(), QueueSettings::default());

        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o1"})));
        let running = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.replay().await })
        };
        remote.started.notified().await;

        // Online now, but a pass is running: no second pass starts
        queue.set_online();
        assert_eq!(rx.recv().await, Some(Notice::Online));
        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o2"})));

        remote.gate.add_permits(2);
        let ReplayOutcome::Completed(report) = running.await.unwrap() else {
            panic!("replay should complete");
        };
        assert_eq!(report.total(), 1);
        assert_eq!(rx.recv().await, Some(Notice::Synced { count: 1 }));

        // The follow-up pass picks up the entry enqueued mid-pass
        assert_eq!(rx.recv().await, Some(Notice::Synced { count: 1 }));
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_enqueue_while_online_syncs_in_background() {
        let (queue, mut rx) = build(
            remote_failing_on(&[]),
            memory_mirror(),
            QueueSettings::default(),
        );
        queue.set_online();
        assert_eq!(rx.recv().await, Some(Notice::Online));

        let id = queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o1"})));
        assert!(id.starts_with("op_"));

        assert_eq!(rx.recv().await, Some(Notice::Synced { count: 1 }));
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_sync_on_enqueue_disabled() {
        let settings = QueueSettings {
            sync_on_enqueue: false,
            ..QueueSettings::default()
        };
        // No expectations: a background replay would panic the mock
        let (queue, _rx) = build(MockRemoteStore::new(), memory_mirror(), settings);
        queue.inner.online.store(true, Ordering::Release);

        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o1"})));
        tokio::task::yield_now().await;

        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn test_clear_empties_queue_and_mirror() {
        let mirror = memory_mirror();
        let (queue, _rx) = build(MockRemoteStore::new(), mirror.clone(), QueueSettings::default());
        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o1"})));
        queue.enqueue("orders", OperationKind::Delete, row(json!({"id": "o2"})));

        queue.clear().unwrap();

        assert_eq!(queue.pending_count(), 0);
        assert!(mirror.raw().unwrap().is_none());
        assert!(mirror.load().unwrap().is_empty());

        // Clearing an empty queue is fine too
        queue.clear().unwrap();
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_dead_letter_after_max_attempts() {
        let settings = QueueSettings {
            max_attempts: Some(2),
            ..QueueSettings::default()
        };
        let mirror = memory_mirror();
        let (queue, _rx) = build(remote_failing_on(&["bad"]), mirror.clone(), settings);
        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "bad"})));

        let ReplayOutcome::Completed(first) = queue.replay().await else {
            panic!("replay should run");
        };
        assert_eq!(first.dead_lettered, 0);
        assert_eq!(queue.pending_count(), 1);

        let ReplayOutcome::Completed(second) = queue.replay().await else {
            panic!("replay should run");
        };
        assert_eq!(second.dead_lettered, 1);
        assert_eq!(queue.pending_count(), 0);
        assert_eq!(queue.dead_letters().len(), 1);
        assert_eq!(queue.dead_letters()[0].attempts, 2);
        assert_eq!(mirror.sibling(DEAD_LETTER_KEY).load().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_requeue_and_purge_dead_letters() {
        let settings = QueueSettings {
            max_attempts: Some(1),
            ..QueueSettings::default()
        };
        let (queue, _rx) = build(remote_failing_on(&["bad"]), memory_mirror(), settings);
        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "bad"})));
        let _outcome = queue.replay().await;
        assert_eq!(queue.dead_letters().len(), 1);

        assert_eq!(queue.requeue_dead_letters().unwrap(), 1);
        assert_eq!(queue.pending_count(), 1);
        assert_eq!(queue.pending()[0].attempts, 0);
        assert!(queue.dead_letters().is_empty());

        let _outcome = queue.replay().await;
        assert_eq!(queue.purge_dead_letters().unwrap(), 1);
        assert!(queue.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn test_offline_event_does_not_abort_pass() {
        let remote = Arc::new(GatedRemote {
            started: Notify::new(),
            gate: Semaphore::new(0),
        });
        let (queue, mut rx) = build(Arc::clone(&remote), memory_mirror(), QueueSettings::default());
        queue.set_online();
        assert_eq!(rx.recv().await, Some(Notice::Online));

        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o1"})));
        remote.started.notified().await;

        queue.handle(ConnectivityEvent::Offline);
        assert_eq!(rx.recv().await, Some(Notice::Offline));
        assert!(!queue.is_online());

        remote.gate.add_permits(1);
        assert_eq!(rx.recv().await, Some(Notice::Synced { count: 1 }));
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enqueues_never_strand_while_online() {
        for round in 0..200 {
            let (queue, _rx) = build(
                remote_failing_on(&[]),
                memory_mirror(),
                QueueSettings::default(),
            );
            queue.set_online();

            let writers: Vec<_> = (0..2)
                .map(|writer| {
                    let queue = queue.clone();
                    tokio::spawn(async move {
                        for n in 0..20 {
                            let id = format!("{writer}-{n}");
                            queue.enqueue("orders", OperationKind::Insert, row(json!({"id": id})));
                            tokio::task::yield_now().await;
                        }
                    })
                })
                .collect();
            for writer in writers {
                writer.await.unwrap();
            }

            let drained = tokio::time::timeout(Duration::from_secs(2), async {
                while queue.pending_count() > 0 || queue.is_syncing() {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            })
            .await;
            assert!(
                drained.is_ok(),
                "round {round}: {} operations left while online",
                queue.pending_count()
            );
        }
    }

    #[tokio::test]
    async fn test_clear_during_pass_keeps_later_enqueues() {
        let remote = Arc::new(GatedRemote {
            started: Notify::new(),
            gate: Semaphore::new(0),
        });
        let mirror = memory_mirror();
        let (queue, _rx) = build(Arc::clone(&remote), mirror.clone(), QueueSettings::default());

        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o1"})));
        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o2"})));
        let running = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.replay().await })
        };
        remote.started.notified().await;

        queue.clear().unwrap();
        let later = queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o3"})));

        // o1 is confirmed, o2 fails
        remote.gate.add_permits(1);
        remote.started.notified().await;
        remote.gate.close();

        let ReplayOutcome::Completed(report) = running.await.unwrap() else {
            panic!("replay should complete");
        };
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);

        let pending = queue.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, later);
        assert_eq!(pending[0].attempts, 0);
        assert_eq!(mirror.load().unwrap(), pending);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_running_pass() {
        let remote = Arc::new(GatedRemote {
            started: Notify::new(),
            gate: Semaphore::new(0),
        });
        let mirror = memory_mirror();
        let (queue, _rx) = build(Arc::clone(&remote), mirror.clone(), QueueSettings::default());

        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o1"})));
        let running = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.replay().await })
        };
        remote.started.notified().await;

        let stopping = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.shutdown(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!stopping.is_finished());

        remote.gate.add_permits(1);
        assert!(stopping.await.unwrap());
        assert!(matches!(running.await.unwrap(), ReplayOutcome::Completed(_)));
        assert_eq!(queue.pending_count(), 0);
        assert!(mirror.load().unwrap().is_empty());

        // Still accepts writes, but no longer replays them
        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o2"})));
        assert_eq!(
            queue.replay().await,
            ReplayOutcome::Skipped(SkipReason::ShuttingDown)
        );
        assert_eq!(queue.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_gives_up_after_grace() {
        let remote = Arc::new(GatedRemote {
            started: Notify::new(),
            gate: Semaphore::new(0),
        });
        let (queue, _rx) = build(Arc::clone(&remote), memory_mirror(), QueueSettings::default());

        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o1"})));
        let running = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.replay().await })
        };
        remote.started.notified().await;

        assert!(!queue.shutdown(Duration::from_millis(50)).await);
        assert!(queue.is_syncing());

        remote.gate.add_permits(1);
        let _outcome = running.await.unwrap();
    }

    #[test]
    fn test_repeated_connectivity_events_are_ignored() {
        let (queue, mut rx) = build(
            MockRemoteStore::new(),
            memory_mirror(),
            QueueSettings::default(),
        );

        queue.set_offline();
        assert!(rx.try_recv().is_err());

        queue.set_online();
        queue.set_online();
        assert_eq!(rx.try_recv().unwrap(), Notice::Online);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stats() {
        let (queue, _rx) = build(MockRemoteStore::new(), memory_mirror(), QueueSettings::default());
        assert!(queue.stats().oldest_pending.is_none());

        queue.enqueue("orders", OperationKind::Insert, row(json!({"id": "o1"})));
        let stats = queue.stats();

        assert_eq!(stats.pending, 1);
        assert_eq!(stats.dead_lettered, 0);
        assert!(!stats.online);
        assert!(!stats.syncing);
        assert_eq!(stats.oldest_pending, Some(queue.pending()[0].enqueued_at));
    }
}
