//! Time: the per-frame update clock and the animation clock family.
//!
//! All clocks share one state machine (`Stopped -> Playing <-> Paused`,
//! `Stop` from either running state) and are driven by an external
//! per-frame `update`. Nothing here is thread-safe; clocks and pools belong
//! to the thread running the frame loop.

mod animation_clock;
mod clock;
mod frame_clock;
mod pool;
mod simple_clock;
mod storyboard_clock;

pub use animation_clock::AnimationClock;
pub use clock::{
    Clock, ClockCore, ClockError, ClockEvent, ClockHandler, ClockState, ClockSubscriber, ClockTiming,
    LoopBehavior, millis,
};
pub use frame_clock::{FrameClock, UpdateTime};
pub use pool::{Handle, Pool, Poolable};
pub use simple_clock::SimpleClock;
pub use storyboard_clock::StoryboardClock;
