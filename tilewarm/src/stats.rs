//! Timing statistics for a warming run.
//!
//! [`Stats`] keeps two [`Accumulator`]s: one for the zoom batch currently
//! being processed and one for the whole run. The orchestrator resets the
//! zoom scope at every batch boundary. Averages and the ETA are derived on
//! demand from the raw totals.

use std::time::Duration;

use crate::warmer::RequestOutcome;

/// Which accumulator a query reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsScope {
    /// The current zoom batch only
    Zoom,
    /// Everything since the run started
    Run,
}

/// Raw totals for one scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    /// Tiles whose retries have settled, successful or not.
    pub processed: u64,
    /// Settled tiles whose final attempt failed.
    pub failed: u64,
    /// Requests sent, first attempts and retries alike.
    pub attempts: u64,
    /// Sum of final-attempt response times.
    pub response_time: Duration,
    /// Sum of wall time per tile, retries and backoff included.
    pub process_time: Duration,
    /// Sum of response body sizes.
    pub bytes: u64,
}

impl Accumulator {
    fn record(&mut self, outcome: &RequestOutcome, processing: Duration) {
        self.processed += 1;
        if !outcome.is_success() {
            self.failed += 1;
        }
        self.attempts += u64::from(outcome.attempts);
        self.response_time += outcome.response_time;
        self.process_time += processing;
        self.bytes += outcome.bytes.unwrap_or(0);
    }

    /// Mean final-attempt response time; zero before any tile was recorded.
    pub fn average_response_time(&self) -> Duration {
        average(self.response_time, self.processed)
    }

    /// Mean wall time per tile; zero before any tile was recorded.
    pub fn average_process_time(&self) -> Duration {
        average(self.process_time, self.processed)
    }

    /// Requests beyond the first attempt of each tile.
    pub fn retries(&self) -> u64 {
        self.attempts.saturating_sub(self.processed)
    }

    /// Settled tiles that succeeded.
    pub fn succeeded(&self) -> u64 {
        self.processed - self.failed
    }
}

fn average(total: Duration, count: u64) -> Duration {
    match u32::try_from(count) {
        Ok(0) => Duration::ZERO,
        Ok(n) => total / n,
        Err(_) => Duration::from_secs_f64(total.as_secs_f64() / count as f64),
    }
}

/// Zoom-scoped and run-scoped statistics.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    zoom: Accumulator,
    run: Accumulator,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one settled tile in both scopes.
    ///
    /// `processing` is the tile's total wall time including retries.
    pub fn record(&mut self, outcome: &RequestOutcome, processing: Duration) {
        self.zoom.record(outcome, processing);
        self.run.record(outcome, processing);
    }

    /// Clears the zoom scope. Called before a new zoom batch starts.
    pub fn reset_zoom(&mut self) {
        self.zoom = Accumulator::default();
    }

    /// Totals for `scope`.
    pub fn scope(&self, scope: StatsScope) -> &Accumulator {
        match scope {
            StatsScope::Zoom => &self.zoom,
            StatsScope::Run => &self.run,
        }
    }

    pub fn average_response_time(&self, scope: StatsScope) -> Duration {
        self.scope(scope).average_response_time()
    }

    pub fn average_process_time(&self, scope: StatsScope) -> Duration {
        self.scope(scope).average_process_time()
    }

    /// Estimated time to finish `remaining` tiles at `concurrency`.
    ///
    /// `remaining × average process time / concurrency`. This assumes the
    /// observed average holds and that throughput scales linearly with
    /// concurrency. It ignores retries already spent by in-flight tiles and
    /// the tail where fewer than `concurrency` tiles remain.
    pub fn estimated_time_remaining(
        &self,
        scope: StatsScope,
        remaining: u64,
        concurrency: usize,
    ) -> Duration {
        if concurrency == 0 {
            return Duration::ZERO;
        }
        let per_tile = self.average_process_time(scope).as_secs_f64();
        Duration::from_secs_f64(remaining as f64 * per_tile / concurrency as f64)
    }
}
