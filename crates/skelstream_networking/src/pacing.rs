//! # Frame Pacing
//!
//! Fixed-rate pacing for one streaming loop.
//!
//! ## Design
//!
//! The pacer must:
//! - Derive every target from a monotonic anchor (`target += period`), never
//!   from `now + period`, so scheduling jitter does not accumulate
//! - Suspend cooperatively for the bulk of the wait so other connections run
//! - Spin for the final stretch, since timer wake-ups are only
//!   millisecond-accurate
//! - Observe cancellation during the suspend phase
//!
//! ```text
//!  tick ──── work ────┬──── coarse sleep ────┬─ spin ─┐ target
//!                     │   (cancellable)      │        │
//!                     └─ remaining > 2ms ────┘ 1.5ms ─┘
//! ```

use std::time::{Duration, Instant};

use crate::cancel::CancelSignal;
use crate::{COARSE_SLEEP_THRESHOLD, DEFAULT_FRAME_RATE, SLEEP_MARGIN};

/// Pacing parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacingConfig {
    /// Target interval between frames.
    pub period: Duration,
    /// Remaining time above which the pacer suspends.
    pub coarse_threshold: Duration,
    /// How much earlier than the target the suspend ends.
    pub sleep_margin: Duration,
}

impl PacingConfig {
    /// Parameters for `frame_rate` frames per second with the reference
    /// sleep threshold and margin.
    ///
    /// # Panics
    ///
    /// Panics if `frame_rate` is zero.
    #[must_use]
    pub fn from_rate(frame_rate: u32) -> Self {
        assert!(frame_rate > 0, "frame rate must be positive");
        Self {
            period: Duration::from_secs(1) / frame_rate,
            coarse_threshold: COARSE_SLEEP_THRESHOLD,
            sleep_margin: SLEEP_MARGIN,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self::from_rate(DEFAULT_FRAME_RATE)
    }
}

/// How a wait ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The target time was reached.
    Ready,
    /// Cancellation was observed first.
    Cancelled,
}

/// Pacing statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PacingStats {
    /// Ticks begun.
    pub ticks: u64,
    /// Waits that found their target already passed.
    pub late_ticks: u64,
    /// Times the target was pulled forward after falling more than one
    /// period behind. Each also counts as late.
    pub resyncs: u64,
    /// Shortest observed tick-to-tick interval.
    pub min_period_us: u64,
    /// Longest observed tick-to-tick interval.
    pub max_period_us: u64,
    /// Rolling average tick-to-tick interval.
    pub avg_period_us: u64,
}

/// Anchor-based frame pacer.
#[derive(Debug)]
pub struct FramePacer {
    config: PacingConfig,
    /// Next target; advanced by exactly one period per wait.
    next_target: Instant,
    last_tick: Option<Instant>,
    stats: PacingStats,
}

impl FramePacer {
    /// Creates a pacer anchored at the current instant.
    #[must_use]
    pub fn new(config: PacingConfig) -> Self {
        Self {
            config,
            next_target: Instant::now(),
            last_tick: None,
            stats: PacingStats {
                min_period_us: u64::MAX,
                ..PacingStats::default()
            },
        }
    }

    /// Marks the start of a tick.
    ///
    /// Returns the wall-clock seconds since the previous tick, `0.0` for the
    /// first one.
    pub fn begin_tick(&mut self) -> f32 {
        let now = Instant::now();
        self.stats.ticks += 1;

        let dt = match self.last_tick.replace(now) {
            Some(previous) => now.duration_since(previous),
            None => return 0.0,
        };

        let dt_us = u64::try_from(dt.as_micros()).unwrap_or(u64::MAX);
        self.stats.min_period_us = self.stats.min_period_us.min(dt_us);
        self.stats.max_period_us = self.stats.max_period_us.max(dt_us);
        self.stats.avg_period_us = if self.stats.avg_period_us == 0 {
            dt_us
        } else {
            (self.stats.avg_period_us * 15 + dt_us) / 16
        };

        dt.as_secs_f32()
    }

    /// Waits until the next target.
    ///
    /// Suspends (cancellably) while more than the coarse threshold remains,
    /// then spins. If the loop fell more than one period behind, the target
    /// is pulled forward to now instead of bursting to catch up.
    pub async fn wait_for_next_frame(&mut self, cancel: &mut CancelSignal) -> WaitOutcome {
        self.next_target += self.config.period;
        let now = Instant::now();

        if now > self.next_target + self.config.period {
            self.stats.resyncs += 1;
            self.stats.late_ticks += 1;
            tracing::debug!(
                behind_us = now.duration_since(self.next_target).as_micros(),
                "pacer fell behind, resyncing"
            );
            self.next_target = now;
        }

        match self.next_target.checked_duration_since(now) {
            Some(remaining) if remaining > self.config.coarse_threshold => {
                let wake = self.next_target - self.config.sleep_margin;
                tokio::select! {
                    () = tokio::time::sleep_until(wake.into()) => {}
                    () = cancel.cancelled() => return WaitOutcome::Cancelled,
                }
            }
            Some(_) => {}
            None => self.stats.late_ticks += 1,
        }

        if cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }

        while Instant::now() < self.next_target {
            std::hint::spin_loop();
        }
        WaitOutcome::Ready
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> PacingStats {
        let mut stats = self.stats;
        if stats.min_period_us == u64::MAX {
            stats.min_period_us = 0;
        }
        stats
    }
}
