//! Cancellable fixed-rate loop driving a view's capture-infer-render cycle.

use crate::Result;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation flag
///
/// Clones observe the same flag; once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// How often a cycle is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Once per display refresh
    Refresh { fps: u32 },
    /// Fixed timer period
    Interval(Duration),
}

impl Pacing {
    /// Time between ticks
    #[must_use]
    pub fn period(self) -> Duration {
        match self {
            Self::Refresh { fps } => Duration::from_secs(1) / fps.max(1),
            Self::Interval(period) => period,
        }
    }
}

/// What the loop does after a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Break,
}

/// Counters reported when a loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    /// Cycles run, failed ones included
    pub cycles: u64,
    /// Cycles that returned an error
    pub failures: u64,
    /// Ticks dropped because a cycle overran its period
    pub coalesced_ticks: u64,
}

/// Index of the tick after `tick` that has not yet passed at `elapsed`
///
/// Tick `k` is due at `k * period` from the loop start. Ticks that passed
/// while a cycle was running are skipped rather than queued.
#[must_use]
pub fn next_tick(tick: u64, elapsed: Duration, period: Duration) -> u64 {
    let nominal = tick + 1;
    if period.is_zero() {
        return nominal;
    }
    let passed = elapsed.as_nanos() / period.as_nanos();
    let passed = u64::try_from(passed).unwrap_or(u64::MAX);
    nominal.max(passed.saturating_add(1))
}

/// Runs a cycle at a fixed pace until cancelled
#[derive(Debug, Clone, Copy)]
pub struct LoopDriver {
    pacing: Pacing,
}

impl LoopDriver {
    #[must_use]
    pub fn new(pacing: Pacing) -> Self {
        Self { pacing }
    }

    #[must_use]
    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Run `cycle` until `token` is cancelled or it returns [`LoopControl::Break`]
    ///
    /// The token is checked before every cycle and again before scheduling the
    /// next one. A cycle that returns an error is logged and counted; the loop
    /// carries on.
    pub fn run<F>(&self, token: &CancellationToken, mut cycle: F) -> LoopSummary
    where
        F: FnMut() -> Result<LoopControl>,
    {
        let period = self.pacing.period();
        info!("Loop started with period {period:?}");

        let start = Instant::now();
        let mut summary = LoopSummary::default();
        let mut tick = 0u64;

        while !token.is_cancelled() {
            let control = cycle();
            summary.cycles += 1;
            match control {
                Ok(LoopControl::Continue) => {}
                Ok(LoopControl::Break) => break,
                Err(e) => {
                    warn!("Cycle {} failed: {e}", summary.cycles);
                    summary.failures += 1;
                }
            }

            if token.is_cancelled() {
                break;
            }

            let next = next_tick(tick, start.elapsed(), period);
            let missed = next - tick - 1;
            if missed > 0 {
                debug!("Cycle overran, coalescing {missed} ticks");
                summary.coalesced_ticks += missed;
            }
            tick = next;

            let deadline = start + period.saturating_mul(u32::try_from(tick).unwrap_or(u32::MAX));
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
        }

        info!(
            "Loop stopped after {} cycles ({} failed, {} ticks coalesced)",
            summary.cycles, summary.failures, summary.coalesced_ticks
        );
        summary
    }
}
