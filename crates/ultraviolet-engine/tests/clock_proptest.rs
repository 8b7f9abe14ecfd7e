//! Property-based tests for storyboard clock loop math.

use std::time::Duration;

use proptest::prelude::*;
use ultraviolet_engine::time::{Clock, LoopBehavior, StoryboardClock};

/// Reference model: a reversing clock traces a triangle wave over the
/// unfolded playing time.
fn triangle(unfolded: u64, duration: u64) -> (u64, Option<f64>) {
    let m = unfolded % (2 * duration);
    let position = if m <= duration { m } else { 2 * duration - m };
    // Direction is ambiguous exactly on a boundary.
    let delta = if m == 0 || m == duration {
        None
    } else if m < duration {
        Some(1.0)
    } else {
        Some(-1.0)
    };
    (position, delta)
}

proptest! {
    #[test]
    fn reverse_elapsed_stays_in_range(
        duration in 1u64..1_000,
        steps in prop::collection::vec(0u64..5_000, 1..40),
    ) {
        let mut clock = StoryboardClock::new("sb", Duration::from_millis(duration), LoopBehavior::Reverse);
        clock.start().unwrap();
        let mut unfolded = 0u64;
        for dt in steps {
            clock.update(Duration::from_millis(dt)).unwrap();
            unfolded += dt;

            let elapsed = clock.elapsed_ms().unwrap();
            prop_assert!((0.0..=duration as f64).contains(&elapsed), "elapsed {} outside [0, {}]", elapsed, duration);

            let (expected, delta) = triangle(unfolded, duration);
            prop_assert_eq!(elapsed, expected as f64);
            if let Some(delta) = delta {
                prop_assert_eq!(clock.delta(), delta);
            }
        }
    }

    #[test]
    fn loop_elapsed_wraps(
        duration in 1u64..1_000,
        steps in prop::collection::vec(0u64..5_000, 1..40),
    ) {
        let mut clock = StoryboardClock::new("sb", Duration::from_millis(duration), LoopBehavior::Loop);
        clock.start().unwrap();
        let mut unfolded = 0u64;
        for dt in steps {
            clock.update(Duration::from_millis(dt)).unwrap();
            unfolded += dt;
            let elapsed = clock.elapsed_ms().unwrap();
            // Landing exactly on the end is still in range and is kept.
            let expected = if unfolded > 0 && unfolded % duration == 0 && elapsed == duration as f64 {
                duration
            } else {
                unfolded % duration
            };
            prop_assert_eq!(elapsed, expected as f64);
            prop_assert_eq!(clock.delta(), 1.0);
        }
    }
}
