//! Bounded dispatch queue.
//!
//! Item identifiers wait in a FIFO until a concurrency slot frees up. Each
//! dispatch attempt claims exactly one entry and either starts a remote encode
//! (the slot stays taken until a completion event) or releases the slot and
//! moves on to the next entry.
//!
//! The running count is an estimate of the server's in-flight encodes. It is
//! adjusted locally on claim/release/completion and overwritten whenever the
//! server's authoritative count is read, so it may drift between resyncs.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::control::ControlPlane;
use crate::error::Result;
use crate::rules::{resolve_action, RuleTable};

/// Mutable dispatch bookkeeping.
#[derive(Debug, Clone)]
pub struct DispatchState {
    pub queue: VecDeque<String>,
    pub running: usize,
    pub limit: usize,
}

impl DispatchState {
    pub fn new(limit: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            running: 0,
            limit: limit.max(1),
        }
    }
}

/// Result of trying to take the head of the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// Nothing left to dispatch.
    Drained,
    /// Every slot is taken; retry on the next completion.
    Saturated,
    /// The entry now owns one slot.
    Entry(String),
}

/// How a claimed entry was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Started,
    Skipped,
}

pub struct DispatchQueue {
    state: Mutex<DispatchState>,
    config: Arc<Config>,
    control: Arc<dyn ControlPlane>,
    rules: RuleTable,
    shutdown: CancellationToken,
    drained: Notify,
}

impl DispatchQueue {
    pub fn new(
        config: Arc<Config>,
        rules: RuleTable,
        control: Arc<dyn ControlPlane>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            state: Mutex::new(DispatchState::new(config.concurrency)),
            config,
            control,
            rules,
            shutdown,
            drained: Notify::new(),
        }
    }

    /// Append an entry. Duplicates are allowed.
    pub fn enqueue(&self, item_id: impl Into<String>) {
        let item_id = item_id.into();
        let mut state = self.state.lock();
        state.queue.push_back(item_id.clone());
        tracing::debug!(item_id = %item_id, queued = state.queue.len(), "Item queued");
    }

    /// Append an entry unless it is already queued. Returns whether it was added.
    pub fn enqueue_unique(&self, item_id: &str) -> bool {
        let mut state = self.state.lock();
        if state.queue.iter().any(|queued| queued == item_id) {
            return false;
        }
        state.queue.push_back(item_id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }

    pub fn running(&self) -> usize {
        self.state.lock().running
    }

    pub fn limit(&self) -> usize {
        self.state.lock().limit
    }

    /// Copy of the current bookkeeping.
    pub fn snapshot(&self) -> DispatchState {
        self.state.lock().clone()
    }

    /// Take the head of the queue if a slot is free.
    pub fn claim(&self) -> Claim {
        let mut state = self.state.lock();
        if state.queue.is_empty() {
            return Claim::Drained;
        }
        if state.running >= state.limit {
            return Claim::Saturated;
        }
        match state.queue.pop_front() {
            Some(item_id) => {
                state.running += 1;
                if state.queue.is_empty() {
                    self.drained.notify_waiters();
                }
                Claim::Entry(item_id)
            }
            None => Claim::Drained,
        }
    }

    /// Give back one slot.
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.running = state.running.saturating_sub(1);
    }

    /// Overwrite the running count with the server's authoritative value.
    pub fn set_running(&self, running: usize) {
        let mut state = self.state.lock();
        if state.running != running {
            tracing::debug!(local = state.running, remote = running, "Resynced running count");
        }
        state.running = running;
    }

    /// Read the server's in-flight count and adopt it. Failures keep the local value.
    pub async fn resync(&self) {
        match self.control.count_active_jobs().await {
            Ok(count) => self.set_running(count),
            Err(e) => tracing::debug!(error = %e, "Running count resync failed; keeping local value"),
        }
    }

    /// Run dispatch attempts until one starts an encode, the slots are full,
    /// or the queue is empty.
    pub async fn try_dispatch(&self) {
        loop {
            let item_id = match self.claim() {
                Claim::Entry(item_id) => item_id,
                Claim::Saturated => {
                    let state = self.snapshot();
                    tracing::debug!(
                        running = state.running,
                        limit = state.limit,
                        queued = state.queue.len(),
                        "All encode slots busy"
                    );
                    return;
                }
                Claim::Drained => {
                    self.on_drained();
                    return;
                }
            };

            match self.dispatch_one(&item_id).await {
                Ok(Outcome::Started) => {
                    self.resync().await;
                    return;
                }
                Ok(Outcome::Skipped) => {
                    self.release();
                }
                Err(e) => {
                    tracing::warn!(item_id = %item_id, error = %e, "Dispatch failed; dropping item");
                    self.release();
                }
            }
        }
    }

    /// Spawn as many dispatch attempts as there are free slots.
    pub fn fill(self: &Arc<Self>) {
        let attempts = {
            let state = self.state.lock();
            if state.queue.is_empty() {
                1
            } else {
                state
                    .limit
                    .saturating_sub(state.running)
                    .min(state.queue.len())
            }
        };

        for _ in 0..attempts {
            let queue = Arc::clone(self);
            tokio::spawn(async move { queue.try_dispatch().await });
        }
    }

    /// Dispatch after `delay`. Not cancellable.
    pub fn schedule_dispatch(self: &Arc<Self>, delay: Duration) {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.try_dispatch().await;
        });
    }

    /// Keep dispatching until the queue is empty, without relying on
    /// completion events.
    ///
    /// Used after the realtime session has stopped: every `poll` the running
    /// count is resynced and free slots are refilled.
    pub async fn drain(self: &Arc<Self>, poll: Duration) {
        let mut ticker = tokio::time::interval(poll);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        while !self.is_empty() {
            tokio::select! {
                _ = self.wait_drained() => return,
                _ = ticker.tick() => {
                    self.resync().await;
                    self.fill();
                }
            }
        }
    }

    /// Resolve once the queue has been observed empty.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }

    fn on_drained(&self) {
        self.drained.notify_waiters();
        if self.config.exit_when_drained && !self.shutdown.is_cancelled() {
            tracing::info!("Queue drained; shutting down");
            self.shutdown.cancel();
        }
    }

    async fn dispatch_one(&self, item_id: &str) -> Result<Outcome> {
        let Some(info) = self.control.get_item_details(item_id).await? else {
            tracing::info!(item_id = %item_id, "Item has no audio; skipping");
            return Ok(Outcome::Skipped);
        };

        if self.config.is_excluded(&info.codec) {
            tracing::info!(item_id = %item_id, codec = %info.codec, "Codec excluded; skipping");
            return Ok(Outcome::Skipped);
        }

        let Some(params) = resolve_action(&self.rules, &info) else {
            tracing::info!(
                item_id = %item_id,
                codec = %info.codec,
                bit_rate = info.bit_rate,
                channels = info.channels,
                "No conversion rule matched; skipping"
            );
            return Ok(Outcome::Skipped);
        };

        self.control.start_encoding(item_id, &params).await?;
        tracing::info!(item_id = %item_id, target = %params, "Encode requested");

        Ok(Outcome::Started)
    }
}
