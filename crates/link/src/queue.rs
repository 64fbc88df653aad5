// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable queue of caller actions performed when the network allows.
//!
//! The whole queue is persisted as one JSON array under a single storage key
//! after every change. Writes are serialized through a dedicated lock taken
//! before the snapshot, so the last write always carries the newest state.
//!
//! Actions run in queue order (priority, then age) in batches of
//! `max_concurrent`. A handler failure is retried up to the action's
//! `max_retries`, no sooner than `retry_delay` after the failure.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures_util::future::join_all;
use rideline_core::{
    ActionOutcome, ActionStatus, ConnectionState, Error, QueueConfig, Result, SyncAction,
};
use serde_json::Value;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connectivity::ConnectivityMonitor;
use crate::lock;
use crate::storage::KeyValueStore;

/// Boxed future returned by action handlers.
pub(crate) type HandlerFuture = Pin<Box<dyn Future<Output = Result<ActionOutcome>> + Send + 'static>>;

/// Performs queued actions of one type.
pub(crate) trait ActionHandler: Send + Sync {
    fn handle(&self, action: SyncAction) -> HandlerFuture;
}

impl<F, Fut> ActionHandler for F
where
    F: Fn(SyncAction) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ActionOutcome>> + Send + 'static,
{
    fn handle(&self, action: SyncAction) -> HandlerFuture {
        Box::pin(self(action))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Ready,
    Disposed,
}

struct QueueState {
    actions: Vec<SyncAction>,
    phase: Phase,
    processing: bool,
    /// Earliest time a retried action may run again. Not persisted.
    not_before: HashMap<String, Instant>,
}

impl QueueState {
    fn ensure_ready(&self) -> Result<()> {
        match self.phase {
            Phase::Ready => Ok(()),
            Phase::Created => Err(Error::NotInitialized("offline action queue")),
            Phase::Disposed => Err(Error::Disposed),
        }
    }

    fn sort(&mut self) {
        // Stable, so equal keys keep insertion order
        self.actions.sort_by(|a, b| a.queue_order(b));
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.actions.iter().position(|a| a.id == id)
    }
}

/// Result of a mutation closure passed to `OfflineActionQueue::update`.
enum Update<R> {
    /// Nothing changed; skip the write.
    Unchanged(R),
    Changed(R),
}

/// What happened when one action was attempted.
enum Attempt {
    Finished(ActionOutcome),
    NoHandler,
}

struct Inner {
    config: QueueConfig,
    store: Arc<dyn KeyValueStore>,
    monitor: ConnectivityMonitor,
    state: AsyncMutex<QueueState>,
    handlers: Mutex<HashMap<String, Arc<dyn ActionHandler>>>,
    /// Held across snapshot + write so persistence calls never overlap.
    persist_lock: AsyncMutex<()>,
    snapshots: watch::Sender<Vec<SyncAction>>,
    cancel: CancellationToken,
}

/// The offline action queue.
///
/// Cheap to clone; clones share one queue.
#[derive(Clone)]
pub struct OfflineActionQueue {
    inner: Arc<Inner>,
}

impl OfflineActionQueue {
    pub fn new(
        config: QueueConfig,
        store: Arc<dyn KeyValueStore>,
        monitor: ConnectivityMonitor,
    ) -> Self {
        let (snapshots, _) = watch::channel(Vec::new());
        OfflineActionQueue {
            inner: Arc::new(Inner {
                config,
                store,
                monitor,
                state: AsyncMutex::new(QueueState {
                    actions: Vec::new(),
                    phase: Phase::Created,
                    processing: false,
                    not_before: HashMap::new(),
                }),
                handlers: Mutex::new(HashMap::new()),
                persist_lock: AsyncMutex::new(()),
                snapshots,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Loads the persisted queue and starts the background drain triggers.
    ///
    /// Entries that fail to decode are dropped with a warning. Actions left
    /// `processing` by an unclean shutdown go back to `pending`, and terminal
    /// actions older than `max_action_age` are swept.
    pub async fn initialize(&self) -> Result<()> {
        {
            let state = self.inner.state.lock().await;
            match state.phase {
                Phase::Ready => return Ok(()),
                Phase::Disposed => return Err(Error::Disposed),
                Phase::Created => {}
            }
        }

        let raw = self.inner.store.get(&self.inner.config.storage_key).await?;
        let mut actions = raw.map(|json| decode_actions(&json)).unwrap_or_default();

        for action in actions.iter_mut().filter(|a| a.status == ActionStatus::Processing) {
            warn!(id = %action.id, "action was interrupted mid-flight, requeueing");
            action.status = ActionStatus::Pending;
        }

        let max_age = chrono::Duration::from_std(self.inner.config.max_action_age()).ok();
        if let Some(cutoff) = max_age.and_then(|age| Utc::now().checked_sub_signed(age)) {
            let before = actions.len();
            actions.retain(|a| !(a.status.is_terminal() && a.created_at < cutoff));
            let swept = before - actions.len();
            if swept > 0 {
                info!(swept, "swept expired actions");
            }
        }

        {
            let mut state = self.inner.state.lock().await;
            if state.phase != Phase::Created {
                return state.ensure_ready();
            }
            state.actions = actions;
            state.sort();
            state.phase = Phase::Ready;
            info!(queued = state.actions.len(), "offline action queue loaded");
        }

        // Subscribed here so a transition right after startup is not missed
        let mut network = self.inner.monitor.subscribe();
        let was_online = network.borrow_and_update().is_online();
        tokio::spawn(self.clone().run_triggers(network, was_online));
        // The stored copy is still usable; the next write carries the repairs
        if let Err(e) = self.commit().await {
            warn!(error = %e, "failed to persist the repaired queue");
        }
        Ok(())
    }

    /// Adds an action and, if online, drains the queue right away.
    ///
    /// Returns `Ok(false)` without changing anything when an action with the
    /// same id is already queued. The action starts out `pending` with no
    /// retries used, whatever state it was built with.
    ///
    /// If the queue cannot be persisted the action is not queued and the
    /// storage error is returned, so the call can simply be repeated.
    pub async fn enqueue(&self, mut action: SyncAction) -> Result<bool> {
        let added = self
            .update(|state| {
                state.ensure_ready()?;
                if state.position(&action.id).is_some() {
                    warn!(id = %action.id, "action already queued, ignoring");
                    return Ok(Update::Unchanged(false));
                }
                action.status = ActionStatus::Pending;
                action.retry_count = 0;
                action.last_error = None;
                debug!(id = %action.id, action_type = %action.action_type, priority = %action.priority, "action queued");
                state.actions.push(action);
                state.sort();
                Ok(Update::Changed(true))
            })
            .await?;

        if added && self.inner.monitor.is_online() {
            self.process_queue().await;
        }
        Ok(added)
    }

    /// Deletes an action. Returns `Ok(false)` if it was not queued.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        self.update(|state| {
            state.ensure_ready()?;
            let Some(index) = state.position(id) else {
                return Ok(Update::Unchanged(false));
            };
            state.actions.remove(index);
            state.not_before.remove(id);
            Ok(Update::Changed(true))
        })
        .await
    }

    /// Marks an action cancelled. Returns `Ok(false)` if it was not queued or
    /// has already finished.
    pub async fn cancel(&self, id: &str) -> Result<bool> {
        self.update(|state| {
            state.ensure_ready()?;
            let Some(index) = state.position(id) else {
                return Ok(Update::Unchanged(false));
            };
            if state.actions[index].status.is_terminal() {
                return Ok(Update::Unchanged(false));
            }
            state.actions[index].status = ActionStatus::Cancelled;
            state.not_before.remove(id);
            Ok(Update::Changed(true))
        })
        .await
    }

    /// Sets the handler for an action type, replacing any earlier one.
    ///
    /// An `Err` from the handler, or a panic, counts as a retryable failure.
    pub fn register_handler<F, Fut>(&self, action_type: impl Into<String>, handler: F)
    where
        F: Fn(SyncAction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ActionOutcome>> + Send + 'static,
    {
        let action_type = action_type.into();
        let previous = lock(&self.inner.handlers).insert(action_type.clone(), Arc::new(handler));
        if previous.is_some() {
            debug!(action_type = %action_type, "action handler replaced");
        }
    }

    /// Drains pending actions while online.
    ///
    /// A no-op (returning 0) while offline or while another pass is running.
    /// Each pending action is attempted at most once per pass. Returns how
    /// many actions were attempted.
    pub async fn process_queue(&self) -> usize {
        {
            let mut state = self.inner.state.lock().await;
            if state.phase != Phase::Ready || state.processing {
                return 0;
            }
            if !self.inner.monitor.is_online() {
                return 0;
            }
            state.processing = true;
        }

        let mut attempted = HashSet::new();
        loop {
            if !self.inner.monitor.is_online() {
                debug!("went offline, pausing queue processing");
                break;
            }
            let Some(batch) = self.take_batch(&mut attempted).await else {
                break;
            };
            if batch.is_empty() {
                break;
            }
            // Persist the processing marks so a crash mid-batch is recoverable
            if let Err(e) = self.persist().await {
                warn!(error = %e, "failed to persist queue");
            }

            let jobs = batch.into_iter().map(|action| {
                let handler = lock(&self.inner.handlers).get(&action.action_type).cloned();
                async move {
                    let id = action.id.clone();
                    (id, run_handler(handler, action).await)
                }
            });
            let results = join_all(jobs).await;

            if !self.apply_results(results).await {
                return attempted.len();
            }
            if let Err(e) = self.commit().await {
                warn!(error = %e, "failed to persist queue");
            }
        }

        self.inner.state.lock().await.processing = false;
        attempted.len()
    }

    /// Marks the next batch `processing`. `None` once disposed.
    async fn take_batch(&self, attempted: &mut HashSet<String>) -> Option<Vec<SyncAction>> {
        let mut state = self.inner.state.lock().await;
        if state.phase == Phase::Disposed {
            return None;
        }
        let now = Instant::now();
        let limit = self.inner.config.max_concurrent.max(1);
        let QueueState {
            actions,
            not_before,
            ..
        } = &mut *state;

        let mut batch = Vec::new();
        for action in actions.iter_mut() {
            if batch.len() == limit {
                break;
            }
            let eligible = action.status == ActionStatus::Pending
                && !attempted.contains(&action.id)
                && !matches!(not_before.get(&action.id), Some(t) if *t > now);
            if !eligible {
                continue;
            }
            action.status = ActionStatus::Processing;
            attempted.insert(action.id.clone());
            batch.push(action.clone());
        }
        Some(batch)
    }

    /// Records handler results. Returns false if the queue was disposed
    /// meanwhile, in which case nothing is recorded.
    async fn apply_results(&self, results: Vec<(String, Attempt)>) -> bool {
        let mut state = self.inner.state.lock().await;
        if state.phase == Phase::Disposed {
            return false;
        }
        let retry_at = Instant::now() + self.inner.config.retry_delay();

        for (id, attempt) in results {
            let Some(index) = state.position(&id) else {
                debug!(id = %id, "action removed while in flight");
                continue;
            };
            let action = &mut state.actions[index];
            if action.status != ActionStatus::Processing {
                // Cancelled while in flight
                continue;
            }

            let mut retry = false;
            match attempt {
                Attempt::NoHandler => {
                    let error = Error::HandlerMissing(action.action_type.clone());
                    warn!(id = %id, error = %error, "action failed");
                    action.status = ActionStatus::Failed;
                    action.last_error = Some(error.to_string());
                }
                Attempt::Finished(outcome) if outcome.success => {
                    debug!(id = %id, "action completed");
                    action.status = ActionStatus::Completed;
                    action.last_error = None;
                }
                Attempt::Finished(outcome) => {
                    action.last_error = outcome.error;
                    if outcome.should_retry && action.can_retry() {
                        action.retry_count += 1;
                        action.status = ActionStatus::Pending;
                        retry = true;
                        debug!(id = %id, retry = action.retry_count, "action will be retried");
                    } else {
                        action.status = ActionStatus::Failed;
                        warn!(id = %id, error = ?action.last_error, retries = action.retry_count, "action failed");
                    }
                }
            }

            if retry {
                state.not_before.insert(id, retry_at);
            } else {
                state.not_before.remove(&id);
            }
        }
        true
    }

    pub async fn get(&self, id: &str) -> Option<SyncAction> {
        let state = self.inner.state.lock().await;
        state.position(id).map(|i| state.actions[i].clone())
    }

    /// All actions in queue order.
    pub async fn actions(&self) -> Vec<SyncAction> {
        self.inner.state.lock().await.actions.clone()
    }

    pub async fn get_by_status(&self, status: ActionStatus) -> Vec<SyncAction> {
        self.filtered(|a| a.status == status).await
    }

    pub async fn get_by_type(&self, action_type: &str) -> Vec<SyncAction> {
        self.filtered(|a| a.action_type == action_type).await
    }

    pub async fn pending_count(&self) -> usize {
        let state = self.inner.state.lock().await;
        state
            .actions
            .iter()
            .filter(|a| a.status == ActionStatus::Pending)
            .count()
    }

    /// Deletes completed actions. Failed and cancelled ones are kept.
    pub async fn clear_completed(&self) -> Result<usize> {
        self.retain(|a| a.status != ActionStatus::Completed).await
    }

    /// Deletes every action.
    pub async fn clear_all(&self) -> Result<usize> {
        self.retain(|_| false).await
    }

    /// Stream of queue snapshots in queue order.
    pub fn subscribe(&self) -> watch::Receiver<Vec<SyncAction>> {
        self.inner.snapshots.subscribe()
    }

    /// Stops the background triggers. In-flight handler results are
    /// discarded and every later mutation fails with [`Error::Disposed`].
    pub async fn dispose(&self) {
        let mut state = self.inner.state.lock().await;
        if state.phase == Phase::Disposed {
            return;
        }
        state.phase = Phase::Disposed;
        state.processing = false;
        self.inner.cancel.cancel();
        info!("offline action queue disposed");
    }

    async fn filtered(&self, keep: impl Fn(&SyncAction) -> bool) -> Vec<SyncAction> {
        let state = self.inner.state.lock().await;
        state.actions.iter().filter(|a| keep(a)).cloned().collect()
    }

    async fn retain(&self, keep: impl Fn(&SyncAction) -> bool) -> Result<usize> {
        self.update(|state| {
            state.ensure_ready()?;
            let before = state.actions.len();
            state.actions.retain(|a| keep(a));
            let QueueState {
                actions,
                not_before,
                ..
            } = &mut *state;
            not_before.retain(|id, _| actions.iter().any(|a| &a.id == id));
            let removed = before - state.actions.len();
            Ok(if removed == 0 {
                Update::Unchanged(0)
            } else {
                Update::Changed(removed)
            })
        })
        .await
    }

    /// Applies a caller mutation and persists it while holding the queue, so
    /// no other operation sees a change that is not yet durable. A failed
    /// write puts the queue back the way it was and returns the error.
    async fn update<R>(
        &self,
        change: impl FnOnce(&mut QueueState) -> Result<Update<R>>,
    ) -> Result<R> {
        let _writer = self.inner.persist_lock.lock().await;
        let mut state = self.inner.state.lock().await;
        let saved_actions = state.actions.clone();
        let saved_not_before = state.not_before.clone();

        let value = match change(&mut *state)? {
            Update::Unchanged(value) => return Ok(value),
            Update::Changed(value) => value,
        };

        let written = match serde_json::to_string(&state.actions) {
            Ok(json) => {
                self.inner
                    .store
                    .set(&self.inner.config.storage_key, json)
                    .await
            }
            Err(e) => Err(e.into()),
        };
        if let Err(e) = written {
            warn!(error = %e, "failed to persist queue, change reverted");
            state.actions = saved_actions;
            state.not_before = saved_not_before;
            return Err(e);
        }

        self.inner.snapshots.send_replace(state.actions.clone());
        Ok(value)
    }

    /// Persists the current queue, then notifies subscribers.
    async fn commit(&self) -> Result<()> {
        let result = self.persist().await;
        let snapshot = self.inner.state.lock().await.actions.clone();
        self.inner.snapshots.send_replace(snapshot);
        result
    }

    async fn persist(&self) -> Result<()> {
        let _writer = self.inner.persist_lock.lock().await;
        let json = {
            let state = self.inner.state.lock().await;
            serde_json::to_string(&state.actions)?
        };
        self.inner
            .store
            .set(&self.inner.config.storage_key, json)
            .await
    }

    /// Drains on offline→online transitions and on a periodic safety-net tick.
    async fn run_triggers(
        self,
        mut network: watch::Receiver<ConnectionState>,
        mut was_online: bool,
    ) {
        let mut network_open = true;
        let period = self.inner.config.processing_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.inner.cancel.cancelled() => break,
                changed = network.changed(), if network_open => {
                    if changed.is_err() {
                        debug!("connectivity stream closed, relying on the periodic drain");
                        network_open = false;
                        continue;
                    }
                    let online = network.borrow_and_update().is_online();
                    if online && !was_online {
                        let attempted = self.process_queue().await;
                        info!(attempted, "back online, drained offline queue");
                    }
                    was_online = online;
                }
                _ = ticker.tick() => {
                    if self.inner.monitor.is_online() && self.pending_count().await > 0 {
                        self.process_queue().await;
                    }
                }
            }
        }
        debug!("offline queue triggers stopped");
    }
}

async fn run_handler(handler: Option<Arc<dyn ActionHandler>>, action: SyncAction) -> Attempt {
    let Some(handler) = handler else {
        return Attempt::NoHandler;
    };
    let id = action.id.clone();
    match tokio::spawn(handler.handle(action)).await {
        Ok(Ok(outcome)) => Attempt::Finished(outcome),
        Ok(Err(e)) => Attempt::Finished(ActionOutcome::retry(e.to_string())),
        Err(e) => {
            warn!(id = %id, error = %e, "action handler panicked");
            Attempt::Finished(ActionOutcome::retry(format!("handler panicked: {e}")))
        }
    }
}

/// Decodes a persisted queue, dropping entries that do not parse.
fn decode_actions(json: &str) -> Vec<SyncAction> {
    let entries: Vec<Value> = match serde_json::from_str(json) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "persisted queue is unreadable, starting empty");
            return Vec::new();
        }
    };
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(action) => Some(action),
            Err(e) => {
                warn!(index, error = %e, "dropping malformed queued action");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
