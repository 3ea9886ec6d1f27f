//! Fixed-period cycle scheduler for serimesh.
//!
//! Drives the announcement cycle: every `interval` a node announces its
//! name and rolls its peer table over. Cycles are the time unit for peer
//! expiry, so the scheduler only needs to be regular, not precise.
//!
//! # Integration
//!
//! The scheduler is designed to sit inside the engine's `tokio::select!`
//! loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = stop.changed() => break,
//!         info = scheduler.wait_for_cycle() => {
//!             announce(&queue, &name);
//!             let visible = peers.end_cycle();
//!         }
//!     }
//! }
//! ```
//!
//! `wait_for_cycle` only mutates state after its sleep completes, so it is
//! safe to drop from a `select!` branch.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the cycle scheduler.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    /// Time between cycles. Default: 5 seconds.
    pub interval: Duration,
    /// Random delay (0–max) added to the *first* cycle so that nodes
    /// powered on together do not announce in lockstep and collide on a
    /// half-duplex line.
    pub initial_jitter: Duration,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            initial_jitter: Duration::from_millis(250),
        }
    }
}

impl CycleConfig {
    /// Shortest supported interval.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`CycleScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                min_ms = Self::MIN_INTERVAL.as_millis() as u64,
                "cycle interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Cycle info (returned to caller each cycle)
// ---------------------------------------------------------------------------

/// Information about a cycle boundary, returned by
/// [`CycleScheduler::wait_for_cycle`].
#[derive(Debug, Clone)]
pub struct CycleInfo {
    /// Monotonically increasing cycle number (starts at 1).
    pub cycle: u64,
    /// `true` if this cycle fired late.
    pub overrun: bool,
    /// How many whole cycles were skipped because of the delay.
    pub cycles_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-period cycle scheduler.
///
/// A late cycle never triggers a burst of catch-up cycles: the next one is
/// always scheduled a full interval after the late one fired.
pub struct CycleScheduler {
    config: CycleConfig,
    cycle_count: u64,
    next: Instant,
}

impl CycleScheduler {
    /// Create a new scheduler from config. The first cycle fires one
    /// interval (plus jitter) from now.
    pub fn new(config: CycleConfig) -> Self {
        let config = config.validated();

        let max_jitter_us = config.initial_jitter.as_micros() as u64;
        let jitter = if max_jitter_us > 0 {
            Duration::from_micros(rand::rng().random_range(0..max_jitter_us))
        } else {
            Duration::ZERO
        };
        let next = Instant::now() + config.interval + jitter;

        debug!(
            interval_ms = config.interval.as_millis() as u64,
            jitter_us = jitter.as_micros() as u64,
            "cycle scheduler created"
        );

        Self {
            config,
            cycle_count: 0,
            next,
        }
    }

    /// Wait until the next cycle boundary. Returns [`CycleInfo`] for it.
    pub async fn wait_for_cycle(&mut self) -> CycleInfo {
        let due = self.next;
        let interval = self.config.interval;
        time::sleep_until(due).await;

        let now = Instant::now();
        self.cycle_count += 1;

        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > interval / 10;
        let mut cycles_skipped = 0u64;
        if overrun {
            cycles_skipped = (late_by.as_nanos() / interval.as_nanos()) as u64;
            if cycles_skipped > 0 {
                warn!(
                    cycle = self.cycle_count,
                    skipped = cycles_skipped,
                    late_ms = late_by.as_millis() as u64,
                    "cycle overrun, skipping ahead"
                );
            }
        }
        // Always schedule from now, not from the missed deadline.
        self.next = now + interval;

        trace!(cycle = self.cycle_count, overrun, "cycle fired");

        CycleInfo {
            cycle: self.cycle_count,
            overrun,
            cycles_skipped,
        }
    }

    /// Number of cycles fired so far.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}
