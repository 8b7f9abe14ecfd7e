use std::time::{Duration, Instant};

use crate::time::clock::millis;

/// Per-frame timing snapshot handed to `update` calls.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct UpdateTime {
    /// Time since the previous tick.
    pub elapsed: Duration,

    /// Sum of every `elapsed` since the clock was created or reset.
    pub total: Duration,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

impl UpdateTime {
    pub fn elapsed_ms(&self) -> f64 {
        millis(self.elapsed)
    }
}

/// Frame clock producing [`UpdateTime`] snapshots.
///
/// `tick` measures wall-clock time between calls; `advance` steps by a fixed
/// amount so simulations and tests stay deterministic.
///
/// Measured delta time is clamped to avoid pathological values when the
/// process is paused by the debugger or stalls.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    total: Duration,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            total: Duration::ZERO,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Resets the baseline and the running total.
    pub fn reset(&mut self) {
        self.last = Instant::now();
        self.total = Duration::ZERO;
    }

    /// Advances by measured wall-clock time.
    pub fn tick(&mut self) -> UpdateTime {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last).clamp(self.dt_min, self.dt_max);
        self.last = now;
        self.step(dt)
    }

    /// Advances by exactly `dt`, ignoring the clamps.
    pub fn advance(&mut self, dt: Duration) -> UpdateTime {
        self.last = Instant::now();
        self.step(dt)
    }

    fn step(&mut self, dt: Duration) -> UpdateTime {
        self.total += dt;
        let time = UpdateTime { elapsed: dt, total: self.total, frame_index: self.frame_index };
        self.frame_index = self.frame_index.wrapping_add(1);
        time
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
