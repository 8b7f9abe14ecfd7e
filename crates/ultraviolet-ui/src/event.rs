use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::element::ElementId;

/// State carried along an event's route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedEventArgs {
    /// `Owner.Name` for routed events, the bare name for standard events.
    pub event: String,
    /// Element the event was raised on.
    pub source: ElementId,
    /// Element whose handlers are currently running.
    pub current: ElementId,
    pub handled: bool,
}

impl RoutedEventArgs {
    pub fn new(event: impl Into<String>, source: ElementId) -> Self {
        Self { event: event.into(), source, current: source, handled: false }
    }

    #[inline]
    pub fn is_handled(&self) -> bool {
        self.handled
    }
}

pub type EventHandler = Rc<dyn Fn(&mut RoutedEventArgs)>;

/// Named handlers that markup attaches with `Click="OnClick"`.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, EventHandler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, handler: impl Fn(&mut RoutedEventArgs) + 'static) -> Self {
        self.handlers.insert(name.into(), Rc::new(handler));
        self
    }

    pub fn get(&self, name: &str) -> Option<&EventHandler> {
        self.handlers.get(name)
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}
