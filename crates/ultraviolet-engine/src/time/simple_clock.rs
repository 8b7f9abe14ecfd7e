use std::time::Duration;

use crate::time::clock::{Clock, ClockCore, ClockTiming, LoopBehavior};
use crate::time::pool::Poolable;

/// A free-standing clock with a duration and loop behavior. Pool-managed:
/// retrieval resets it, release invalidates it.
#[derive(Debug, Default)]
pub struct SimpleClock {
    core: ClockCore,
    timing: ClockTiming,
}

impl SimpleClock {
    pub fn new(duration: Duration, loop_behavior: LoopBehavior) -> Self {
        Self { core: ClockCore::default(), timing: ClockTiming::new(duration, loop_behavior) }
    }

    /// Reconfigures a freshly retrieved pooled clock.
    pub fn configure(&mut self, duration: Duration, loop_behavior: LoopBehavior) {
        self.timing = ClockTiming::new(duration, loop_behavior);
    }
}

impl Clock for SimpleClock {
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

impl Poolable for SimpleClock {
    fn on_retrieved(&mut self) {
        self.timing = ClockTiming::default();
        self.core.revalidate();
    }

    fn on_released(&mut self) {
        self.core.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::time::clock::{ClockError, ClockEvent, ClockState, ClockSubscriber};
    use crate::time::pool::Pool;

    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl ClockSubscriber for Recorder {
        fn clock_state_changed(&mut self, event: ClockEvent) {
            self.log.borrow_mut().push(format!("subscriber {:?}", event));
        }
    }

    #[test]
    fn state_machine() {
        let mut clock = SimpleClock::new(Duration::from_millis(100), LoopBehavior::None);
        clock.update(Duration::from_millis(10)).unwrap();
        assert_eq!(clock.elapsed_ms().unwrap(), 0.0);

        clock.start().unwrap();
        clock.update(Duration::from_millis(10)).unwrap();
        assert_eq!(clock.elapsed_ms().unwrap(), 10.0);

        clock.pause().unwrap();
        assert_eq!(clock.state(), ClockState::Paused);
        clock.update(Duration::from_millis(10)).unwrap();
        assert_eq!(clock.elapsed_ms().unwrap(), 10.0);

        clock.resume().unwrap();
        clock.update(Duration::from_millis(10)).unwrap();
        assert_eq!(clock.elapsed_ms().unwrap(), 20.0);

        clock.stop().unwrap();
        assert_eq!(clock.state(), ClockState::Stopped);
        assert_eq!(clock.elapsed_ms().unwrap(), 0.0);
    }

    #[test]
    fn subscribers_hear_transitions_before_handlers() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut clock = SimpleClock::new(Duration::from_millis(100), LoopBehavior::Loop);
        let sub: Rc<RefCell<dyn ClockSubscriber>> = Rc::new(RefCell::new(Recorder { log: log.clone() }));
        clock.core_mut().subscribe(&sub);
        let handler_log = log.clone();
        clock.core_mut().add_handler(Box::new(move |e| handler_log.borrow_mut().push(format!("handler {:?}", e))));

        clock.start().unwrap();
        clock.pause().unwrap();
        clock.pause().unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["subscriber Started", "handler Started", "subscriber Paused", "handler Paused"]
        );

        clock.core_mut().unsubscribe(&sub);
        clock.resume().unwrap();
        assert_eq!(log.borrow().last().map(String::as_str), Some("handler Resumed"));
    }

    #[test]
    fn released_clock_cannot_be_read() {
        let mut pool: Pool<SimpleClock> = Pool::new("simple clock", 1);
        let handle = pool.retrieve();
        pool.get_mut(handle).unwrap().configure(Duration::from_millis(50), LoopBehavior::None);
        pool.get_mut(handle).unwrap().start().unwrap();
        pool.release(handle).unwrap();

        // A caller that kept a handle is stopped by the generation check.
        assert!(matches!(pool.get(handle), Err(ClockError::StaleHandle { .. })));

        // A clock detached from its pool is stopped by the validity flag.
        let mut detached = SimpleClock::default();
        detached.on_released();
        assert_eq!(detached.start(), Err(ClockError::Released));
        assert_eq!(detached.elapsed_ms(), Err(ClockError::Released));
    }
}
