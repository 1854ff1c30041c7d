//! Bounded worker pool.
//!
//! [`WorkerPool`] drives a list of work items through an async handler with
//! at most `concurrency` handlers in flight. Items are admitted in FIFO order
//! and a slot is refilled as soon as an item settles.
//!
//! # Scheduling
//!
//! All handler futures are polled by the task that awaits [`WorkerPool::run`];
//! nothing is spawned. Handlers therefore interleave only at their own await
//! points, and the `on_settled` callback runs on that same task between polls.
//! State mutated from `on_settled` needs no locking.
//!
//! Handlers return plain values. A failed item is just another outcome, so it
//! never cancels its siblings; the pool completes once every item settled.

use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::pin;

use futures::stream::{self, StreamExt};
use thiserror::Error;

/// Errors raised when building a pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("Concurrency must be a positive integer")]
    ZeroConcurrency,
}

/// Fixed-size pool of concurrent handler slots.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    concurrency: NonZeroUsize,
}

impl WorkerPool {
    /// Creates a pool allowing `concurrency` handlers in flight.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ZeroConcurrency`] if `concurrency` is 0.
    pub fn new(concurrency: usize) -> Result<Self, PoolError> {
        NonZeroUsize::new(concurrency)
            .map(|concurrency| Self { concurrency })
            .ok_or(PoolError::ZeroConcurrency)
    }

    /// Configured number of slots.
    pub fn concurrency(&self) -> usize {
        self.concurrency.get()
    }

    /// Slots actually used for `item_count` items.
    pub fn effective_concurrency(&self, item_count: usize) -> usize {
        self.concurrency.get().min(item_count)
    }

    /// Runs `handler` over every item and returns the outcomes in completion
    /// order.
    pub async fn run<T, O, F, Fut>(&self, items: Vec<T>, handler: F) -> Vec<O>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = O>,
    {
        self.run_with(items, handler, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_settled` for each outcome as it
    /// completes.
    pub async fn run_with<T, O, F, Fut, S>(&self, items: Vec<T>, handler: F, mut on_settled: S) -> Vec<O>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = O>,
        S: FnMut(&O),
    {
        if items.is_empty() {
            return Vec::new();
        }

        let slots = self.effective_concurrency(items.len());
        let mut outcomes = Vec::with_capacity(items.len());

        let mut in_flight = pin!(stream::iter(items).map(handler).buffer_unordered(slots));
        while let Some(outcome) = in_flight.next().await {
            on_settled(&outcome);
            outcomes.push(outcome);
        }

        outcomes
    }
}
