// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded-concurrency dispatch engine.
//!
//! A batch is pushed onto a primary queue consumed by a fixed worker pool.
//! Every delivery takes one permit from the shared [`RateLimiter`]. Throttled
//! messages go to a single retry task that holds them in a [`DelayQueue`]
//! and re-enqueues each one as soon as its own cooldown ends. Recipients reported dead are
//! collected in memory and flushed to the [`DeadRecipientSink`] once, after
//! the run.
//!
//! Per-message states:
//!
//! ```text
//! ENQUEUED -> IN_FLIGHT -> SUCCESS | RETRY_SCHEDULED | DEAD | FAILED | EXHAUSTED
//!                               |
//!                               +-- after cooldown --> ENQUEUED
//! ```
//!
//! The run ends when no message is left outside a terminal state, or when the
//! shutdown token fires.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use herald_core::{DeadRecipientSink, DeliveryOutcome, Message, RecipientId, Stats, TransportAdapter};
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::time::DelayQueue;
use tracing::{debug, error, info, warn};

use crate::limiter::RateLimiter;
use crate::recording;

/// Transport deliveries allowed per message.
pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long an idle worker waits on its queue before re-checking for
    /// shutdown.
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

pub struct DispatchEngine {
    transport: Arc<dyn TransportAdapter>,
    sink: Arc<dyn DeadRecipientSink>,
    limiter: Arc<RateLimiter>,
    config: EngineConfig,
}

/// A throttled message waiting for its cooldown.
struct Retry {
    message: Message,
    ready_at: Instant,
}

/// State shared by the workers and the retry task of one run.
struct Run {
    transport: Arc<dyn TransportAdapter>,
    limiter: Arc<RateLimiter>,
    config: EngineConfig,
    success: AtomicU64,
    failed: AtomicU64,
    dead: Mutex<HashSet<RecipientId>>,
    /// Messages not yet in a terminal state.
    outstanding: AtomicUsize,
    drained: Notify,
}

impl Run {
    /// Marks one message terminal.
    fn settle(&self) {
        recording::remove_in_flight(1.0);
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_one();
        }
    }

    fn fail(&self) {
        self.failed.fetch_add(1, Ordering::AcqRel);
        self.settle();
    }

    /// The retry budget is enforced here, before a throttled message is
    /// handed to the retry task.
    async fn dispatch(&self, mut message: Message, retries: &mpsc::Sender<Retry>) {
        let recipient_id = message.recipient_id;
        message.retry_after_seconds = None;
        self.limiter.acquire().await;

        let delivered = AssertUnwindSafe(self.transport.deliver(&message))
            .catch_unwind()
            .await;
        message.attempts += 1;

        let outcome = match delivered {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(recipient_id, "transport panicked during delivery");
                recording::record_delivery("panic");
                self.fail();
                return;
            }
        };
        recording::record_delivery(outcome.label());

        match outcome {
            DeliveryOutcome::Ok => {
                self.success.fetch_add(1, Ordering::AcqRel);
                self.settle();
            }
            DeliveryOutcome::Throttled { cooldown_s } => {
                if message.attempts >= self.config.max_attempts {
                    warn!(
                        recipient_id,
                        attempts = message.attempts,
                        "retry budget exhausted"
                    );
                    self.fail();
                    return;
                }
                let cooldown_s = cooldown_s.max(1);
                message.retry_after_seconds = Some(cooldown_s);
                let ready_at = Instant::now() + Duration::from_secs(u64::from(cooldown_s));
                debug!(recipient_id, cooldown_s, attempts = message.attempts, "retry scheduled");
                recording::record_retry_scheduled();
                if retries.send(Retry { message, ready_at }).await.is_err() {
                    debug!(recipient_id, "retry queue closed, message abandoned");
                }
            }
            DeliveryOutcome::DeadRecipient => {
                debug!(recipient_id, "recipient is unreachable");
                self.dead.lock().await.insert(recipient_id);
                self.settle();
            }
            DeliveryOutcome::TransientOther => self.fail(),
        }
    }
}

impl DispatchEngine {
    pub fn new(
        transport: Arc<dyn TransportAdapter>,
        sink: Arc<dyn DeadRecipientSink>,
        limiter: Arc<RateLimiter>,
        config: EngineConfig,
    ) -> Self {
        Self {
            transport,
            sink,
            limiter,
            config,
        }
    }

    /// Deliver `messages` with `workers` concurrent consumers and wait for the
    /// whole batch to reach a terminal state.
    pub async fn broadcast(&self, messages: Vec<Message>, workers: usize) -> Stats {
        self.broadcast_with_shutdown(messages, workers, CancellationToken::new())
            .await
    }

    /// Like [`broadcast`](Self::broadcast), but stops early when `shutdown`
    /// is cancelled. Deliveries already in flight complete; queued messages
    /// are abandoned and excluded from the stats.
    pub async fn broadcast_with_shutdown(
        &self,
        messages: Vec<Message>,
        workers: usize,
        shutdown: CancellationToken,
    ) -> Stats {
        let total = messages.len();
        if total == 0 {
            return Stats::empty();
        }
        let workers = workers.max(1);

        let (primary_tx, primary_rx) = mpsc::channel::<Message>(total);
        let (retry_tx, retry_rx) = mpsc::channel::<Retry>(total);
        let primary_rx = Arc::new(Mutex::new(primary_rx));
        let stop = shutdown.child_token();

        let run = Arc::new(Run {
            transport: Arc::clone(&self.transport),
            limiter: Arc::clone(&self.limiter),
            config: self.config.clone(),
            success: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dead: Mutex::new(HashSet::new()),
            outstanding: AtomicUsize::new(total),
            drained: Notify::new(),
        });

        info!(total, workers, rate = self.limiter.capacity(), "broadcast started");
        recording::add_in_flight(total as f64);
        let started = Instant::now();

        for message in messages {
            if primary_tx.send(message).await.is_err() {
                run.fail();
            }
        }

        let mut tasks: Vec<JoinHandle<()>> = (0..workers)
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    Arc::clone(&run),
                    Arc::clone(&primary_rx),
                    retry_tx.clone(),
                    stop.clone(),
                ))
            })
            .collect();
        tasks.push(tokio::spawn(retry_loop(
            retry_rx,
            primary_tx,
            stop.clone(),
        )));
        drop(retry_tx);

        tokio::select! {
            _ = run.drained.notified() => {}
            _ = shutdown.cancelled() => {
                warn!(
                    remaining = run.outstanding.load(Ordering::Acquire),
                    "broadcast interrupted by shutdown"
                );
            }
        }
        let elapsed = started.elapsed();
        stop.cancel();

        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "dispatch task ended abnormally");
            }
        }

        let remaining = run.outstanding.load(Ordering::Acquire);
        if remaining > 0 {
            recording::remove_in_flight(remaining as f64);
        }

        let dead = std::mem::take(&mut *run.dead.lock().await);
        if !dead.is_empty() {
            if let Err(e) = self.sink.add_many(&dead).await {
                warn!(error = %e, count = dead.len(), "failed to persist dead recipients");
            }
        }

        let success = run.success.load(Ordering::Acquire);
        let duration_s = elapsed.as_secs_f64();
        let stats = Stats {
            total_duration_s: duration_s,
            total_sent_attempts: success,
            success_count: success,
            failed_count: run.failed.load(Ordering::Acquire),
            average_throughput: if duration_s > 0.0 {
                success as f64 / duration_s
            } else {
                0.0
            },
            total_messages: total as u64,
            blocked_users: dead.len() as u64,
        };
        recording::record_duration(duration_s);
        info!(
            success = stats.success_count,
            failed = stats.failed_count,
            blocked = stats.blocked_users,
            duration_s,
            "broadcast finished"
        );
        stats
    }
}

async fn worker_loop(
    worker: usize,
    run: Arc<Run>,
    queue: Arc<Mutex<mpsc::Receiver<Message>>>,
    retries: mpsc::Sender<Retry>,
    stop: CancellationToken,
) {
    debug!(worker, "dispatch worker started");
    loop {
        let received = {
            let mut rx = queue.lock().await;
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                received = tokio::time::timeout(run.config.poll_interval, rx.recv()) => received,
            }
        };
        match received {
            Ok(Some(message)) => run.dispatch(message, &retries).await,
            Ok(None) => break,
            Err(_idle) => continue,
        }
    }
    debug!(worker, "dispatch worker stopped");
}

async fn retry_loop(
    mut retries: mpsc::Receiver<Retry>,
    primary: mpsc::Sender<Message>,
    stop: CancellationToken,
) {
    let mut pending: DelayQueue<Message> = DelayQueue::new();
    let mut accepting = true;
    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            received = retries.recv(), if accepting => match received {
                Some(Retry { message, ready_at }) => {
                    pending.insert_at(message, ready_at);
                }
                None => accepting = false,
            },
            Some(expired) = pending.next(), if !pending.is_empty() => {
                let mut message = expired.into_inner();
                message.retry_after_seconds = None;
                if primary.send(message).await.is_err() {
                    break;
                }
            }
            else => break,
        }
    }
    debug!(pending = pending.len(), "retry task stopped");
}
