//! Storyboard playback.
//!
//! Playing a storyboard on an element creates one [`StoryboardClock`] for the
//! storyboard and one pooled [`AnimationClock`] per animated property. Each
//! frame the storyboard clock advances, every animation clock mirrors it,
//! and the [`AnimatedValue`] subscribed to that clock re-evaluates its
//! keyframes. The element tree reads animated values through the topmost
//! layer of the dependency property store.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ultraviolet_engine::time::{
    AnimationClock, Clock, ClockError, ClockEvent, ClockState, ClockSubscriber, Handle, Pool, StoryboardClock,
    UpdateTime,
};

use crate::element::{ElementId, ElementTree};
use crate::registry::DependencyProperty;
use crate::style::{CompiledStoryboard, ResolvedKeyframes};
use crate::value::Value;

// ── AnimatedValue ─────────────────────────────────────────────────────────

/// The animated layer of one property on one element.
///
/// Produces a value only while its clock is playing or paused; a stopped
/// animation yields to the layers beneath it.
pub struct AnimatedValue {
    keyframes: ResolvedKeyframes,
    /// Effective value when playback started; the first segment eases from it.
    base: Value,
    state: ClockState,
    output: Option<Value>,
}

impl AnimatedValue {
    pub fn new(keyframes: ResolvedKeyframes, base: Value) -> Self {
        Self { keyframes, base, state: ClockState::Stopped, output: None }
    }

    pub fn current(&self) -> Option<Value> {
        self.output.clone()
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Hides the output until [`restore`](Self::restore) so the layers
    /// beneath can be read.
    pub fn suspend(&mut self) -> Option<Value> {
        self.output.take()
    }

    pub fn restore(&mut self, output: Option<Value>) {
        self.output = output;
    }

    fn advance(&mut self, elapsed_ms: f64) {
        if self.state != ClockState::Stopped {
            self.output = self.keyframes.evaluate(elapsed_ms, &self.base);
        }
    }
}

impl ClockSubscriber for AnimatedValue {
    fn clock_state_changed(&mut self, event: ClockEvent) {
        match event {
            ClockEvent::Started => {
                self.state = ClockState::Playing;
                self.advance(0.0);
            }
            ClockEvent::Resumed => self.state = ClockState::Playing,
            ClockEvent::Paused => self.state = ClockState::Paused,
            ClockEvent::Stopped => {
                self.state = ClockState::Stopped;
                self.output = None;
            }
        }
    }
}

impl fmt::Debug for AnimatedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimatedValue")
            .field("state", &self.state)
            .field("base", &self.base)
            .field("output", &self.output)
            .finish()
    }
}

// ── Storyboard instances ──────────────────────────────────────────────────

struct AnimationBinding {
    element: ElementId,
    property: Rc<DependencyProperty>,
    clock: Handle<AnimationClock>,
    value: Rc<RefCell<AnimatedValue>>,
}

/// A storyboard playing on one element.
struct StoryboardInstance {
    scope: ElementId,
    storyboard: Rc<CompiledStoryboard>,
    clock: StoryboardClock,
    bindings: Vec<AnimationBinding>,
}

impl StoryboardInstance {
    fn is(&self, scope: ElementId, name: &str) -> bool {
        self.scope == scope && self.storyboard.name == name
    }
}

// ── Animator ──────────────────────────────────────────────────────────────

/// Owns every playing storyboard and the pool their animation clocks come
/// from.
pub struct Animator {
    clocks: Pool<AnimationClock>,
    playing: Vec<StoryboardInstance>,
}

impl Animator {
    pub fn new(initial_clock_capacity: usize) -> Self {
        Self { clocks: Pool::new("animation clock", initial_clock_capacity), playing: Vec::new() }
    }

    /// Starts `storyboard` on `scope`, restarting it if it is already
    /// playing there. Returns the number of properties it animates.
    ///
    /// Each animated property starts from its current effective value, so a
    /// storyboard taking over from another continues where that one was.
    pub fn play(
        &mut self,
        tree: &mut ElementTree,
        storyboard: &Rc<CompiledStoryboard>,
        scope: ElementId,
    ) -> Result<usize, ClockError> {
        self.stop(tree, scope, &storyboard.name)?;

        let mut instance = StoryboardInstance {
            scope,
            storyboard: storyboard.clone(),
            clock: StoryboardClock::new(storyboard.name.clone(), storyboard.duration(), storyboard.loop_behavior),
            bindings: Vec::new(),
        };
        for target in &storyboard.targets {
            for element in target.elements(tree, scope) {
                for animation in &target.animations {
                    let animated = match &animation.navigation {
                        Some(nav) => match nav.navigate(tree, element) {
                            Some(found) => found,
                            None => continue,
                        },
                        None => element,
                    };
                    let Some(property) =
                        tree.find_by_name(animated, animation.property.owner.as_deref(), &animation.property.name)
                    else {
                        log::warn!("storyboard '{}': {} has no property '{}'", storyboard.name, animated, animation.property);
                        continue;
                    };
                    let keyframes = ResolvedKeyframes::new(animation, property.value_type);
                    if keyframes.is_empty() {
                        continue;
                    }
                    let base = tree.get_value(animated, &property);
                    let value = Rc::new(RefCell::new(AnimatedValue::new(keyframes, base)));
                    let subscriber: Rc<RefCell<dyn ClockSubscriber>> = value.clone();
                    let clock = self.clocks.retrieve();
                    self.clocks.get_mut(clock)?.core_mut().subscribe(&subscriber);
                    tree.attach_animation(animated, &property, value.clone());
                    instance.bindings.push(AnimationBinding { element: animated, property, clock, value });
                }
            }
        }

        let animated = instance.bindings.len();
        log::debug!("playing storyboard '{}' on {} ({} properties)", storyboard.name, scope, animated);
        instance.clock.start()?;
        self.sync(&instance)?;
        self.playing.push(instance);
        Ok(animated)
    }

    fn sync(&mut self, instance: &StoryboardInstance) -> Result<(), ClockError> {
        for binding in &instance.bindings {
            let clock = self.clocks.get_mut(binding.clock)?;
            clock.sync(&instance.clock)?;
            let elapsed = clock.elapsed_ms()?;
            binding.value.borrow_mut().advance(elapsed);
        }
        Ok(())
    }

    /// Advances every playing storyboard by one frame. Storyboards that do
    /// not loop hold their final values once they reach the end.
    pub fn update(&mut self, time: &UpdateTime) -> Result<(), ClockError> {
        let mut playing = std::mem::take(&mut self.playing);
        let result = playing.iter_mut().try_for_each(|instance| {
            instance.clock.update(time.elapsed)?;
            self.sync(instance)
        });
        self.playing = playing;
        result
    }

    /// Stops `name` on `scope` and hands every property back to the layers
    /// beneath the animation. Returns whether it was playing.
    pub fn stop(&mut self, tree: &mut ElementTree, scope: ElementId, name: &str) -> Result<bool, ClockError> {
        let Some(at) = self.playing.iter().position(|i| i.is(scope, name)) else {
            return Ok(false);
        };
        let instance = self.playing.remove(at);
        self.retire(tree, instance)?;
        Ok(true)
    }

    /// Stops everything playing on `scope`.
    pub fn stop_all(&mut self, tree: &mut ElementTree, scope: ElementId) -> Result<(), ClockError> {
        let (stopped, kept) = std::mem::take(&mut self.playing).into_iter().partition(|i| i.scope == scope);
        self.playing = kept;
        for instance in stopped {
            self.retire(tree, instance)?;
        }
        Ok(())
    }

    fn retire(&mut self, tree: &mut ElementTree, mut instance: StoryboardInstance) -> Result<(), ClockError> {
        instance.clock.stop()?;
        self.sync(&instance)?;
        for binding in instance.bindings {
            tree.detach_animation(binding.element, &binding.property, &binding.value);
            self.clocks.release(binding.clock)?;
        }
        log::debug!("stopped storyboard '{}' on {}", instance.storyboard.name, instance.scope);
        Ok(())
    }

    pub fn pause(&mut self, scope: ElementId, name: &str) -> Result<bool, ClockError> {
        self.with_instance(scope, name, |clock| clock.pause())
    }

    pub fn resume(&mut self, scope: ElementId, name: &str) -> Result<bool, ClockError> {
        self.with_instance(scope, name, |clock| clock.resume())
    }

    fn with_instance(
        &mut self,
        scope: ElementId,
        name: &str,
        f: impl FnOnce(&mut StoryboardClock) -> Result<(), ClockError>,
    ) -> Result<bool, ClockError> {
        let Some(at) = self.playing.iter().position(|i| i.is(scope, name)) else {
            return Ok(false);
        };
        let mut instance = self.playing.remove(at);
        let result = f(&mut instance.clock).and_then(|()| self.sync(&instance));
        self.playing.insert(at, instance);
        result.map(|()| true)
    }

    pub fn is_playing(&self, scope: ElementId, name: &str) -> bool {
        self.playing.iter().any(|i| i.is(scope, name))
    }

    /// State of the storyboard clock of `name` on `scope`.
    pub fn state(&self, scope: ElementId, name: &str) -> Option<ClockState> {
        self.playing.iter().find(|i| i.is(scope, name)).map(|i| i.clock.state())
    }

    /// Animation clocks currently retrieved from the pool.
    pub fn active_clocks(&self) -> usize {
        self.clocks.active()
    }

    pub fn clock_capacity(&self) -> usize {
        self.clocks.capacity()
    }
}

impl fmt::Debug for Animator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animator")
            .field("playing", &self.playing.iter().map(|i| (i.scope, &i.storyboard.name)).collect::<Vec<_>>())
            .field("active_clocks", &self.clocks.active())
            .finish()
    }
}
