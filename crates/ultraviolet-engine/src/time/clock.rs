use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

// ── State ─────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ClockState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// What a clock does when its elapsed time runs past either end of its
/// duration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LoopBehavior {
    /// Clamp to the end and stay there.
    #[default]
    None,
    /// Wrap back to the start.
    Loop,
    /// Bounce between the ends, flipping direction at each one.
    Reverse,
}

impl FromStr for LoopBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(LoopBehavior::None),
            "loop" => Ok(LoopBehavior::Loop),
            "reverse" => Ok(LoopBehavior::Reverse),
            _ => Err(format!("unknown loop behavior '{}'", s)),
        }
    }
}

impl fmt::Display for LoopBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoopBehavior::None => "none",
            LoopBehavior::Loop => "loop",
            LoopBehavior::Reverse => "reverse",
        })
    }
}

/// A state transition, as reported to subscribers and handlers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClockEvent {
    Started,
    Stopped,
    Paused,
    Resumed,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClockError {
    #[error("clock was used after being released to its pool")]
    Released,
    #[error("stale pool handle (slot {index}, generation {generation})")]
    StaleHandle { index: u32, generation: u32 },
}

// ── Subscribers ───────────────────────────────────────────────────────────

/// Internal observer of a clock, typically an animated property value that
/// must re-resolve its output when the clock starts or stops.
///
/// Subscribers are notified synchronously, before public handlers. They must
/// not call back into the clock that notifies them.
pub trait ClockSubscriber {
    fn clock_state_changed(&mut self, event: ClockEvent);
}

pub type ClockHandler = Box<dyn FnMut(ClockEvent)>;

// ── ClockCore ─────────────────────────────────────────────────────────────

/// State machine, validity flag, and notification lists shared by every
/// clock kind.
pub struct ClockCore {
    state: ClockState,
    valid: bool,
    subscribers: Vec<Weak<RefCell<dyn ClockSubscriber>>>,
    handlers: Vec<ClockHandler>,
}

impl Default for ClockCore {
    fn default() -> Self {
        Self { state: ClockState::Stopped, valid: true, subscribers: Vec::new(), handlers: Vec::new() }
    }
}

impl fmt::Debug for ClockCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClockCore")
            .field("state", &self.state)
            .field("valid", &self.valid)
            .field("subscribers", &self.subscribers.len())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl ClockCore {
    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn ensure_valid(&self) -> Result<(), ClockError> {
        if self.valid { Ok(()) } else { Err(ClockError::Released) }
    }

    /// Marks the clock usable again and clears everything the previous user
    /// attached to it.
    pub fn revalidate(&mut self) {
        self.state = ClockState::Stopped;
        self.subscribers.clear();
        self.handlers.clear();
        self.valid = true;
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
        self.state = ClockState::Stopped;
        self.subscribers.clear();
        self.handlers.clear();
    }

    pub fn subscribe(&mut self, subscriber: &Rc<RefCell<dyn ClockSubscriber>>) {
        self.subscribers.push(Rc::downgrade(subscriber));
    }

    pub fn unsubscribe(&mut self, subscriber: &Rc<RefCell<dyn ClockSubscriber>>) {
        let target = Rc::downgrade(subscriber);
        self.subscribers.retain(|s| !s.ptr_eq(&target));
    }

    pub fn add_handler(&mut self, handler: ClockHandler) {
        self.handlers.push(handler);
    }

    /// Moves to `state` and broadcasts `event`: subscribers first, then
    /// handlers. Dropped subscribers are pruned on the way.
    pub fn transition(&mut self, state: ClockState, event: ClockEvent) {
        log::trace!("clock {:?} -> {:?}", self.state, state);
        self.state = state;
        self.subscribers.retain(|weak| match weak.upgrade() {
            Some(sub) => {
                sub.borrow_mut().clock_state_changed(event);
                true
            }
            None => false,
        });
        for handler in &mut self.handlers {
            handler(event);
        }
    }
}

/// Milliseconds in `d`, exact for whole-millisecond durations.
pub fn millis(d: Duration) -> f64 {
    d.as_secs() as f64 * 1000.0 + d.subsec_nanos() as f64 / 1_000_000.0
}

// ── ClockTiming ───────────────────────────────────────────────────────────

/// Elapsed-time bookkeeping and loop math, in milliseconds.
///
/// `elapsed` stays within `[0, duration]` after every `advance`. `delta` is
/// the direction of travel: `1.0` forward, `-1.0` when a reversing clock is
/// running backwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockTiming {
    pub duration: f64,
    pub loop_behavior: LoopBehavior,
    pub elapsed: f64,
    pub total: f64,
    pub delta: f64,
}

impl Default for ClockTiming {
    fn default() -> Self {
        Self::new(Duration::ZERO, LoopBehavior::None)
    }
}

impl ClockTiming {
    pub fn new(duration: Duration, loop_behavior: LoopBehavior) -> Self {
        Self {
            duration: millis(duration),
            loop_behavior,
            elapsed: 0.0,
            total: 0.0,
            delta: 1.0,
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.total = 0.0;
        self.delta = 1.0;
    }

    pub fn advance(&mut self, dt_ms: f64) {
        self.total += dt_ms;
        let updated = self.elapsed + self.delta * dt_ms;
        if (0.0..=self.duration).contains(&updated) {
            self.elapsed = updated;
            return;
        }
        if self.duration <= 0.0 {
            self.elapsed = 0.0;
            self.delta = 1.0;
            return;
        }
        match self.loop_behavior {
            LoopBehavior::None => {
                self.elapsed = updated.clamp(0.0, self.duration);
                self.delta = 1.0;
            }
            LoopBehavior::Loop => {
                self.elapsed = updated.rem_euclid(self.duration);
                self.delta = 1.0;
            }
            LoopBehavior::Reverse => self.bounce(updated),
        }
    }

    /// Distributes the overshoot past a boundary across the bounce segments
    /// it spans. Every segment is one full duration except the last, which
    /// ends the walk; the parity of the segment count picks the end the last
    /// segment starts from, and so the direction of travel.
    fn bounce(&mut self, updated: f64) {
        let duration = self.duration;
        let (from_end, overshoot) = if updated > duration { (true, updated - duration) } else { (false, -updated) };
        let whole = overshoot.div_euclid(duration);
        let rest = overshoot.rem_euclid(duration);
        let (before_last, into_last) = if rest > 0.0 { (whole, rest) } else { (whole - 1.0, duration) };
        let flipped = before_last.rem_euclid(2.0) == 1.0;
        if from_end != flipped {
            self.elapsed = (duration - into_last).clamp(0.0, duration);
            self.delta = -1.0;
        } else {
            self.elapsed = into_last.clamp(0.0, duration);
            self.delta = 1.0;
        }
    }

    /// Progress through the current pass, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.duration <= 0.0 { 1.0 } else { self.elapsed / self.duration }
    }
}

// ── Clock ─────────────────────────────────────────────────────────────────

/// Behaviour shared by every clock kind: the Stopped/Playing/Paused state
/// machine, validity checks, and time advancement.
///
/// Every transition notifies subscribers before public handlers. `update`
/// is a no-op unless the clock is playing.
pub trait Clock {
    fn core(&self) -> &ClockCore;
    fn core_mut(&mut self) -> &mut ClockCore;
    fn timing(&self) -> &ClockTiming;
    fn timing_mut(&mut self) -> &mut ClockTiming;

    fn state(&self) -> ClockState {
        self.core().state()
    }

    fn is_valid(&self) -> bool {
        self.core().is_valid()
    }

    fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.timing().duration.max(0.0) / 1000.0)
    }

    fn loop_behavior(&self) -> Result<LoopBehavior, ClockError> {
        self.core().ensure_valid()?;
        Ok(self.timing().loop_behavior)
    }

    /// Position within the duration, in milliseconds.
    fn elapsed_ms(&self) -> Result<f64, ClockError> {
        self.core().ensure_valid()?;
        Ok(self.timing().elapsed)
    }

    /// Time spent playing since the last start, in milliseconds.
    fn total_ms(&self) -> Result<f64, ClockError> {
        self.core().ensure_valid()?;
        Ok(self.timing().total)
    }

    /// Restarts from zero, whatever the current state.
    fn start(&mut self) -> Result<(), ClockError> {
        self.core().ensure_valid()?;
        self.timing_mut().reset();
        self.core_mut().transition(ClockState::Playing, ClockEvent::Started);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ClockError> {
        self.core().ensure_valid()?;
        if self.state() == ClockState::Stopped {
            return Ok(());
        }
        self.timing_mut().reset();
        self.core_mut().transition(ClockState::Stopped, ClockEvent::Stopped);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), ClockError> {
        self.core().ensure_valid()?;
        if self.state() == ClockState::Playing {
            self.core_mut().transition(ClockState::Paused, ClockEvent::Paused);
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), ClockError> {
        self.core().ensure_valid()?;
        if self.state() == ClockState::Paused {
            self.core_mut().transition(ClockState::Playing, ClockEvent::Resumed);
        }
        Ok(())
    }

    fn update(&mut self, elapsed: Duration) -> Result<(), ClockError> {
        self.core().ensure_valid()?;
        if self.state() != ClockState::Playing {
            return Ok(());
        }
        self.timing_mut().advance(millis(elapsed));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(duration_ms: u64, behavior: LoopBehavior) -> ClockTiming {
        ClockTiming::new(Duration::from_millis(duration_ms), behavior)
    }

    #[test]
    fn none_clamps_at_end() {
        let mut t = timing(100, LoopBehavior::None);
        t.advance(250.0);
        assert_eq!(t.elapsed, 100.0);
        assert_eq!(t.delta, 1.0);
        assert_eq!(t.total, 250.0);
    }

    #[test]
    fn loop_wraps() {
        let mut t = timing(100, LoopBehavior::Loop);
        t.advance(250.0);
        assert_eq!(t.elapsed, 50.0);
    }

    #[test]
    fn reverse_distributes_overshoot() {
        let mut t = timing(10, LoopBehavior::Reverse);
        t.advance(8.0);
        t.advance(25.0);
        assert_eq!(t.elapsed, 7.0);
        assert_eq!(t.delta, -1.0);

        t.advance(9.0);
        assert_eq!(t.elapsed, 2.0);
        assert_eq!(t.delta, 1.0);
    }

    #[test]
    fn reverse_follows_a_triangle_wave_for_huge_steps() {
        for (step, elapsed, delta) in [(1e9 + 7.0, 7.0, 1.0), (1e9 + 13.0, 7.0, -1.0), (20.0, 0.0, -1.0), (30.0, 10.0, 1.0)] {
            let mut t = timing(10, LoopBehavior::Reverse);
            t.advance(step);
            assert_eq!((t.elapsed, t.delta), (elapsed, delta), "step {step}");
        }
    }

    #[test]
    fn zero_duration_never_spins() {
        let mut t = timing(0, LoopBehavior::Reverse);
        t.advance(1000.0);
        assert_eq!(t.elapsed, 0.0);
    }

    #[test]
    fn loop_behavior_parses_case_insensitively() {
        assert_eq!("Reverse".parse::<LoopBehavior>(), Ok(LoopBehavior::Reverse));
        assert!("bounce".parse::<LoopBehavior>().is_err());
    }
}
