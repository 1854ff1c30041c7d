//! Events reported while a run progresses.

use std::time::Duration;

use super::{RequestOutcome, RunSummary};
use crate::stats::Accumulator;

/// Snapshot sent every `progress_interval` settled tiles and on the last
/// tile of a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub zoom: u8,
    /// Settled tiles in this batch.
    pub done: u64,
    /// Tiles in this batch.
    pub total: u64,
    /// Failed tiles in this batch.
    pub failed: u64,
    pub average_response_time: Duration,
    /// Estimated time to finish the batch.
    pub eta: Duration,
    /// Settled tiles across the run.
    pub run_done: u64,
    /// Tiles across the run.
    pub run_total: u64,
    /// Estimated time to finish the run at the current concurrency.
    pub run_eta: Duration,
}

/// Something that happened during a run.
#[derive(Debug)]
pub enum WarmEvent<'a> {
    /// The region touches no tile at the configured zoom levels.
    NoAreaToCover,

    /// Tiles were computed; `batches` holds (zoom, tile count) in run order.
    RunStarted {
        total_tiles: usize,
        batches: &'a [(u8, usize)],
        list_only: bool,
    },

    /// List mode: one tile URL, in batch order.
    TileListed { url: &'a str },

    BatchStarted {
        zoom: u8,
        tiles: usize,
        concurrency: usize,
        max_retries: u32,
    },

    /// A failed attempt is about to be retried after `delay`.
    TileRetry {
        url: &'a str,
        retry: u32,
        max_retries: u32,
        delay: Duration,
        reason: &'a str,
    },

    /// A tile settled successfully. Only sent in verbose mode.
    TileSucceeded {
        zoom: u8,
        outcome: &'a RequestOutcome,
    },

    /// A tile still failed after its last retry.
    TileFailed {
        zoom: u8,
        outcome: &'a RequestOutcome,
    },

    Progress(ProgressReport),

    BatchFinished {
        zoom: u8,
        totals: &'a Accumulator,
        elapsed: Duration,
    },

    RunFinished { summary: &'a RunSummary },
}

/// Receives [`WarmEvent`]s. Called on the task driving the run, so
/// implementations should return quickly.
pub trait WarmObserver {
    fn on_event(&self, event: &WarmEvent<'_>);
}

impl<F> WarmObserver for F
where
    F: Fn(&WarmEvent<'_>),
{
    fn on_event(&self, event: &WarmEvent<'_>) {
        self(event)
    }
}

/// Observer that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl WarmObserver for NullObserver {
    fn on_event(&self, _event: &WarmEvent<'_>) {}
}
