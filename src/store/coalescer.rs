//! Throttled, batched writes against a rate-limited [`KeyValueStore`].
//!
//! A single worker task owns the queue. Handles only send commands to it, so
//! queue state is never shared and at most one flush is in flight at a time:
//! commands that arrive during a flush wait in the channel until it settles.

use super::traits::{KeyValueStore, StoreMap};
use crate::error::QueueError;
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Minimum time between two physical store writes.
pub const THROTTLE_MS: u64 = 2000;
/// Maximum number of queued writes merged into one store call.
pub const MAX_BATCH_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoalescerConfig {
    pub throttle: Duration,
    pub max_batch_size: usize,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            throttle: Duration::from_millis(THROTTLE_MS),
            max_batch_size: MAX_BATCH_SIZE,
        }
    }
}

/// Point-in-time view of the worker, for status output and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoalescerStats {
    pub queued: usize,
    pub timer_armed: bool,
    pub flushes: u64,
    pub failed_flushes: u64,
    pub cleared: u64,
}

struct QueuedWrite {
    key: String,
    value: Value,
    reply: oneshot::Sender<Result<(), QueueError>>,
}

enum Command {
    Write(QueuedWrite),
    Clear(oneshot::Sender<usize>),
    Stats(oneshot::Sender<CoalescerStats>),
}

/// Outcome of one [`WriteCoalescer::write`] call.
///
/// The write is already queued when this is returned; dropping it does not
/// cancel the write, it only discards the outcome.
#[must_use = "the write is queued either way; await this to learn whether it was persisted"]
pub struct PendingWrite {
    rx: oneshot::Receiver<Result<(), QueueError>>,
}

impl Future for PendingWrite {
    type Output = Result<(), QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(QueueError::Closed)))
    }
}

/// Acknowledgement of a [`WriteCoalescer::clear_queue`] call.
///
/// Resolves with the number of writes that were rejected once the worker has
/// processed the clear. Any flush that started earlier has settled by then.
pub struct QueueCleared {
    rx: oneshot::Receiver<usize>,
}

impl Future for QueueCleared {
    type Output = Result<usize, QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.map_err(|_| QueueError::Closed))
    }
}

/// Cloneable handle to the write-coalescing worker.
#[derive(Clone)]
pub struct WriteCoalescer {
    tx: mpsc::UnboundedSender<Command>,
}

impl WriteCoalescer {
    /// Spawn the worker on the current tokio runtime.
    pub fn new(store: Arc<dyn KeyValueStore>, config: CoalescerConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            store,
            config: CoalescerConfig {
                max_batch_size: config.max_batch_size.max(1),
                ..config
            },
            queue: VecDeque::new(),
            deadline: None,
            last_write: None,
            stats: CoalescerStats::default(),
        };
        tokio::spawn(worker.run(rx));
        Self { tx }
    }

    /// Queue `value` under `key`. Never fails synchronously.
    ///
    /// Several writes to the same key may be queued; each caller still gets
    /// its own outcome, and within one batch the last value wins.
    pub fn write(&self, key: impl Into<String>, value: Value) -> PendingWrite {
        let (reply, rx) = oneshot::channel();
        let command = Command::Write(QueuedWrite {
            key: key.into(),
            value,
            reply,
        });
        // If the worker is gone the command (and its reply sender) is dropped
        // here, which resolves the returned future with `Closed`.
        let _ = self.tx.send(command);
        PendingWrite { rx }
    }

    /// Reject every write that has not been handed to the store yet with
    /// [`QueueError::Cleared`] and disarm the flush timer.
    ///
    /// A flush already in flight is not affected. The clear is queued
    /// immediately; await the returned [`QueueCleared`] to know it happened.
    pub fn clear_queue(&self) -> QueueCleared {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Clear(reply));
        QueueCleared { rx }
    }

    pub async fn stats(&self) -> Result<CoalescerStats, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Stats(reply))
            .map_err(|_| QueueError::Closed)?;
        rx.await.map_err(|_| QueueError::Closed)
    }
}

struct Worker {
    store: Arc<dyn KeyValueStore>,
    config: CoalescerConfig,
    queue: VecDeque<QueuedWrite>,
    deadline: Option<Instant>,
    last_write: Option<Instant>,
    stats: CoalescerStats,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        let mut handles_alive = true;

        loop {
            if !handles_alive && self.deadline.is_none() {
                break;
            }
            let deadline = self.deadline;

            tokio::select! {
                biased;

                command = rx.recv(), if handles_alive => match command {
                    Some(Command::Write(write)) => {
                        self.queue.push_back(write);
                        self.schedule();
                    }
                    Some(Command::Clear(reply)) => {
                        let _ = reply.send(self.clear());
                    }
                    Some(Command::Stats(reply)) => {
                        let _ = reply.send(self.snapshot());
                    }
                    None => handles_alive = false,
                },
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() =>
                {
                    self.deadline = None;
                    self.flush().await;
                }
                else => break,
            }
        }

        tracing::debug!(
            flushes = self.stats.flushes,
            failed = self.stats.failed_flushes,
            "Write coalescer stopped"
        );
    }

    /// (Re)arm the timer for the end of the current throttle window.
    fn schedule(&mut self) {
        let now = Instant::now();
        let wait = self.last_write.map_or(Duration::ZERO, |last| {
            self.config.throttle.saturating_sub(now.duration_since(last))
        });
        self.deadline = Some(now + wait);
    }

    async fn flush(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        let take = self.config.max_batch_size.min(self.queue.len());
        let mut entries = StoreMap::new();
        let mut replies = Vec::with_capacity(take);
        for write in self.queue.drain(..take) {
            entries.insert(write.key, write.value);
            replies.push(write.reply);
        }

        tracing::debug!(
            store = self.store.name(),
            batch = replies.len(),
            keys = entries.len(),
            remaining = self.queue.len(),
            "Flushing write batch"
        );

        match self.store.set(entries).await {
            Ok(()) => {
                self.last_write = Some(Instant::now());
                self.stats.flushes += 1;
                for reply in replies {
                    let _ = reply.send(Ok(()));
                }
            }
            Err(e) => {
                self.stats.failed_flushes += 1;
                tracing::warn!(
                    store = self.store.name(),
                    batch = replies.len(),
                    "Store write failed: {e}"
                );
                for reply in replies {
                    let _ = reply.send(Err(QueueError::Store(e.clone())));
                }
            }
        }

        if !self.queue.is_empty() {
            self.schedule();
        }
    }

    fn clear(&mut self) -> usize {
        let cleared = self.queue.len();
        for write in self.queue.drain(..) {
            let _ = write.reply.send(Err(QueueError::Cleared));
        }
        self.deadline = None;
        self.stats.cleared += cleared as u64;
        if cleared > 0 {
            tracing::info!(cleared, "Cleared pending writes");
        }
        cleared
    }

    fn snapshot(&self) -> CoalescerStats {
        CoalescerStats {
            queued: self.queue.len(),
            timer_armed: self.deadline.is_some(),
            ..self.stats
        }
    }
}
