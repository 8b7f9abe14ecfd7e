use std::time::Duration;

use crate::time::clock::{Clock, ClockCore, ClockTiming, LoopBehavior};

/// Master clock of one playing storyboard instance. Owns the elapsed, total,
/// and direction state; the animation clocks of the storyboard's targets
/// follow it through [`AnimationClock::sync`](crate::time::AnimationClock::sync).
#[derive(Debug)]
pub struct StoryboardClock {
    core: ClockCore,
    timing: ClockTiming,
    storyboard: String,
}

impl StoryboardClock {
    pub fn new(storyboard: impl Into<String>, duration: Duration, loop_behavior: LoopBehavior) -> Self {
        Self {
            core: ClockCore::default(),
            timing: ClockTiming::new(duration, loop_behavior),
            storyboard: storyboard.into(),
        }
    }

    pub fn storyboard(&self) -> &str {
        &self.storyboard
    }

    /// `1.0` while running forward, `-1.0` while a reversing clock runs back.
    pub fn delta(&self) -> f64 {
        self.timing.delta
    }

    /// A non-looping clock that has reached the end of its duration.
    pub fn is_finished(&self) -> bool {
        self.timing.loop_behavior == LoopBehavior::None && self.timing.elapsed >= self.timing.duration
    }
}

impl Clock for StoryboardClock {
    fn core(&self) -> &ClockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ClockCore {
        &mut self.core
    }

    fn timing(&self) -> &ClockTiming {
        &self.timing
    }

    fn timing_mut(&mut self) -> &mut ClockTiming {
        &mut self.timing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::clock::ClockState;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn reverse_bounces_and_tracks_direction() {
        let mut clock = StoryboardClock::new("pulse", ms(10), LoopBehavior::Reverse);
        clock.start().unwrap();
        clock.update(ms(8)).unwrap();
        clock.update(ms(25)).unwrap();
        assert_eq!(clock.elapsed_ms().unwrap(), 7.0);
        assert_eq!(clock.delta(), -1.0);
        assert_eq!(clock.total_ms().unwrap(), 33.0);
    }

    #[test]
    fn non_looping_clock_finishes() {
        let mut clock = StoryboardClock::new("fade", ms(100), LoopBehavior::None);
        clock.start().unwrap();
        clock.update(ms(60)).unwrap();
        assert!(!clock.is_finished());
        clock.update(ms(60)).unwrap();
        assert!(clock.is_finished());
        assert_eq!(clock.elapsed_ms().unwrap(), 100.0);
        assert_eq!(clock.state(), ClockState::Playing);
    }

    #[test]
    fn restart_resets_direction() {
        let mut clock = StoryboardClock::new("pulse", ms(10), LoopBehavior::Reverse);
        clock.start().unwrap();
        clock.update(ms(15)).unwrap();
        assert_eq!(clock.delta(), -1.0);
        clock.start().unwrap();
        assert_eq!(clock.delta(), 1.0);
        assert_eq!(clock.elapsed_ms().unwrap(), 0.0);
    }
}
