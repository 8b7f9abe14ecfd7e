use crate::time::clock::{Clock, ClockCore, ClockError, ClockEvent, ClockState, ClockTiming};
use crate::time::pool::Poolable;
use crate::time::storyboard_clock::StoryboardClock;

/// Per-property clock bound to exactly one animated value.
///
/// It carries no timing logic of its own: each frame it copies the timing
/// of its storyboard clock and replays any state change to its own
/// subscribers. Pool-managed through the validity flag in [`ClockCore`].
#[derive(Debug, Default)]
pub struct AnimationClock {
    core: ClockCore,
    timing: ClockTiming,
}

impl AnimationClock {
    /// Mirror `master`'s timing and state.
    pub fn sync(&mut self, master: &StoryboardClock) -> Result<(), ClockError> {
        self.core.ensure_valid()?;
        master.core().ensure_valid()?;
        self.timing = *master.timing();
        let (from, to) = (self.core.state(), master.state());
        if from != to {
            let event = match (from, to) {
                (ClockState::Paused, ClockState::Playing) => ClockEvent::Resumed,
                (_, ClockState::Playing) => ClockEvent::Started,
                (_, ClockState::Paused) => ClockEvent::Paused,
                (_, ClockState::Stopped) => ClockEvent::Stopped,
            };
            self.core.transition(to, event);
        }
        Ok(())
    }

    /// Progress through the current pass, in `[0, 1]`.
    pub fn progress(&self) -> Result<f64, ClockError> {
        self.core.ensure_valid()?;
        Ok(self.timing.progress())
    }
}

impl Clock for AnimationClock {
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

impl Poolable for AnimationClock {
    fn on_retrieved(&mut self) {
        self.timing = ClockTiming::default();
        self.core.revalidate();
    }

    fn on_released(&mut self) {
        self.core.invalidate();
    }
}
