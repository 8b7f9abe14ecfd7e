//! The runtime driver.
//!
//! A [`Presentation`] owns one element tree, the stylesheet applied to it,
//! and the storyboards playing on it. The host calls [`Presentation::update`]
//! once per frame and forwards input as routed events through
//! [`Presentation::raise_event`]; sound effects requested by triggers are
//! queued for the host's audio layer and drained with
//! [`Presentation::take_sound_effects`].

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use ultraviolet_engine::time::UpdateTime;

use crate::animation::Animator;
use crate::binding::{DataSource, ExpressionCache};
use crate::context::UiContext;
use crate::culture::Culture;
use crate::element::{ElementId, ElementTree};
use crate::error::{PresentationError, StylesheetError};
use crate::event::{HandlerTable, RoutedEventArgs};
use crate::localization::LocalizationDatabase;
use crate::registry::{RoutingStrategy, TypeRegistry};
use crate::style::{
    self, CompilationContext, CompiledDocument, CompilerOptions, StyleMatch, Trigger, TriggerAction, TriggerId,
};
use crate::uvml::{compile_template_str, load, InstantiationContext};
use crate::value::Value;

// ── PresentationConfig ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PresentationConfig {
    /// Animation clocks allocated up front; the pool doubles when exhausted.
    pub initial_clock_pool_capacity: usize,
    /// Culture markup literals are read in.
    pub default_culture: Culture,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self { initial_clock_pool_capacity: 16, default_culture: Culture::invariant() }
    }
}

// ── Presentation ──────────────────────────────────────────────────────────

pub struct Presentation {
    ui: UiContext,
    tree: ElementTree,
    handlers: HandlerTable,
    expressions: ExpressionCache,
    compilation: CompilationContext,
    stylesheet: Option<Rc<CompiledDocument>>,
    root: Option<ElementId>,
    matches: Vec<StyleMatch>,
    /// Property triggers whose conditions currently hold, with the elements
    /// their `set` actions touched.
    active_triggers: HashMap<TriggerId, Vec<ElementId>>,
    animator: Animator,
    sound_effects: Vec<String>,
}

impl Presentation {
    pub fn new(registry: Rc<TypeRegistry>, config: PresentationConfig) -> Self {
        let options = CompilerOptions { execution_culture: config.default_culture.clone(), ..CompilerOptions::default() };
        Self {
            ui: UiContext::new(registry.clone()).with_culture(config.default_culture),
            tree: ElementTree::new(registry.clone()),
            handlers: HandlerTable::new(),
            expressions: ExpressionCache::new(),
            compilation: CompilationContext::new(registry).with_options(options),
            stylesheet: None,
            root: None,
            matches: Vec::new(),
            active_triggers: HashMap::new(),
            animator: Animator::new(config.initial_clock_pool_capacity),
            sound_effects: Vec::new(),
        }
    }

    pub fn with_localization(mut self, localization: LocalizationDatabase) -> Self {
        self.ui = self.ui.with_localization(localization);
        self
    }

    /// Handlers markup refers to by name.
    pub fn with_handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn ui(&self) -> &UiContext {
        &self.ui
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ElementTree {
        &mut self.tree
    }

    pub fn root(&self) -> Option<ElementId> {
        self.root
    }

    pub fn stylesheet(&self) -> Option<&CompiledDocument> {
        self.stylesheet.as_deref()
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    /// Style matches in the order they were applied.
    pub fn matches(&self) -> &[StyleMatch] {
        &self.matches
    }

    /// Effective value of the property `name` on `id`.
    pub fn value(&self, id: ElementId, name: &str) -> Option<Value> {
        let property = self.tree.find_by_name(id, None, name)?;
        Some(self.tree.get_value(id, &property))
    }

    /// First element named `name` beneath the root.
    pub fn find(&self, name: &str) -> Option<ElementId> {
        self.tree.find_named(self.root?, name)
    }

    // ── Loading ───────────────────────────────────────────────────────────

    /// Instantiates `markup` as the new root and styles it. Bindings read
    /// from `data_source`, whose type name selects the binding wrapper.
    /// The previous root and everything beneath it leave the tree; when
    /// loading fails, the tree is left as it was.
    pub fn load_markup(
        &mut self,
        markup: &str,
        data_source: Option<Rc<dyn DataSource>>,
    ) -> Result<ElementId, PresentationError> {
        let data_source_type = data_source.as_ref().map(|s| s.type_name().to_string());
        let template =
            compile_template_str(self.ui.registry(), &mut self.expressions, markup, data_source_type.as_deref())?;
        let mut cx = InstantiationContext::new(&self.ui, &self.handlers);
        if let Some(source) = data_source {
            cx = cx.with_data_source(source, &template);
        }
        let root = load(&mut self.tree, &mut cx, &template)?;

        if let Some(previous) = self.root.replace(root) {
            for id in self.tree.descendants(previous) {
                self.animator.stop_all(&mut self.tree, id)?;
            }
            let removed = self.tree.remove_subtree(previous);
            log::debug!("replaced root {previous} ({removed} element(s)) with {root}");
        }
        self.active_triggers.clear();
        self.matches.clear();
        self.apply_styles()?;
        Ok(root)
    }

    /// Compiles `src` and, when it is free of errors, replaces the current
    /// stylesheet and restyles the tree. A rejected stylesheet changes
    /// nothing.
    pub fn load_stylesheet(&mut self, src: &str) -> Result<(), PresentationError> {
        let (parse, doc) = style::compile_str(&self.compilation, src);
        if !parse.ok() {
            log::warn!("stylesheet rejected: {} syntax error(s)", parse.diagnostics.len());
            return Err(StylesheetError::Syntax(parse.diagnostics).into());
        }
        if !doc.is_usable() {
            log::warn!("stylesheet rejected: {} compilation error(s)", doc.diagnostics.len());
            return Err(StylesheetError::Compilation(doc.diagnostics).into());
        }
        log::debug!("stylesheet loaded: {} rule sets, {} storyboards", doc.rule_sets.len(), doc.storyboards.len());
        self.stylesheet = Some(Rc::new(doc));
        self.apply_styles()
    }

    /// Rematches the stylesheet against the whole tree and re-evaluates
    /// property triggers.
    pub fn apply_styles(&mut self) -> Result<(), PresentationError> {
        let (Some(root), Some(doc)) = (self.root, self.stylesheet.clone()) else {
            return Ok(());
        };
        self.matches = style::apply_styles(&mut self.tree, &doc, root);
        self.refresh_triggers()
    }

    // ── Frames ────────────────────────────────────────────────────────────

    /// Advances animations, then enters and leaves property triggers whose
    /// conditions changed.
    pub fn update(&mut self, time: &UpdateTime) -> Result<(), PresentationError> {
        self.animator.update(time)?;
        self.refresh_triggers()
    }

    fn refresh_triggers(&mut self) -> Result<(), PresentationError> {
        let Some(doc) = self.stylesheet.clone() else {
            return Ok(());
        };
        let mut live = HashSet::new();
        for m in self.matches.clone() {
            let Some(rule_set) = doc.rule_set(m.rule_set) else { continue };
            for (index, trigger) in rule_set.triggers.iter().enumerate() {
                let Trigger::Property(trigger) = trigger else { continue };
                let id = TriggerId { source: m.element, rule_set: m.rule_set, index };
                live.insert(id);
                let met = trigger.is_met(&self.tree, m.element);
                match (met, self.active_triggers.contains_key(&id)) {
                    (true, false) => {
                        log::trace!("entering trigger {:?}", id);
                        let touched = self.run_actions(&doc, id, &trigger.actions, m.element, trigger.important)?;
                        self.active_triggers.insert(id, touched);
                    }
                    (false, true) => self.leave_trigger(id),
                    _ => {}
                }
            }
        }
        let stale: Vec<TriggerId> = self.active_triggers.keys().filter(|id| !live.contains(*id)).copied().collect();
        for id in stale {
            self.leave_trigger(id);
        }
        Ok(())
    }

    fn leave_trigger(&mut self, id: TriggerId) {
        log::trace!("leaving trigger {:?}", id);
        for element in self.active_triggers.remove(&id).unwrap_or_default() {
            self.tree.clear_triggered_values(element, id);
        }
    }

    /// Runs `actions` for the trigger `id` fired on `source`. Returns the
    /// elements `set` actions wrote to.
    fn run_actions(
        &mut self,
        doc: &CompiledDocument,
        id: TriggerId,
        actions: &[TriggerAction],
        source: ElementId,
        important: bool,
    ) -> Result<Vec<ElementId>, PresentationError> {
        let mut touched = Vec::new();
        for action in actions {
            match action {
                TriggerAction::Set { property, selector, value, culture } => {
                    for target in TriggerAction::targets(selector.as_ref(), &self.tree, source) {
                        let Some(p) = self.tree.find_by_name(target, property.owner.as_deref(), &property.name) else {
                            log::warn!("{} has no property '{}'", target, property);
                            continue;
                        };
                        let Some(v) = Value::resolve(value, p.value_type, culture) else {
                            log::warn!("cannot read '{}' as {} under culture {}", value, p.value_type, culture);
                            continue;
                        };
                        match self.tree.set_triggered_value(target, &p, id, v, important) {
                            Ok(()) => touched.push(target),
                            Err(err) => log::warn!("trigger set on {}: {}", target, err),
                        }
                    }
                }
                TriggerAction::PlayStoryboard { selector, storyboard } => {
                    let Some(sb) = doc.storyboard(storyboard) else {
                        log::warn!("trigger plays unknown storyboard '{}'", storyboard);
                        continue;
                    };
                    for target in TriggerAction::targets(selector.as_ref(), &self.tree, source) {
                        self.animator.play(&mut self.tree, sb, target)?;
                    }
                }
                TriggerAction::PlaySfx { sound } => self.sound_effects.push(sound.clone()),
            }
        }
        Ok(touched)
    }

    // ── Events ────────────────────────────────────────────────────────────

    /// Raises the event `name` on `source`.
    ///
    /// Routed events bubble from `source` to the root, standard events stay
    /// on `source`. At each element the attached handlers run first, then
    /// the event triggers of the rule sets applied to it. A trigger only
    /// fires for an already handled event when it is marked `handled`.
    pub fn raise_event(&mut self, source: ElementId, name: &str) -> Result<RoutedEventArgs, PresentationError> {
        let ty = self.tree[source].type_name();
        let registry = self.tree.registry().clone();
        let (key, route) = match registry.find_event(name, ty) {
            Some(event) => {
                let route: Vec<ElementId> = match event.routing {
                    RoutingStrategy::Bubble => std::iter::once(source).chain(self.tree.ancestors(source)).collect(),
                    RoutingStrategy::Direct => vec![source],
                };
                (event.to_string(), route)
            }
            None if registry.has_standard_event(name, ty) => (name.to_string(), vec![source]),
            None => return Err(PresentationError::UnknownEvent { element: ty.to_string(), name: name.to_string() }),
        };

        let doc = self.stylesheet.clone();
        let mut args = RoutedEventArgs::new(key.clone(), source);
        for current in route {
            args.current = current;
            for handler in self.tree.handlers(current, &key) {
                handler(&mut args);
            }
            if let Some(doc) = &doc {
                self.run_event_triggers(doc, current, name, &mut args)?;
            }
        }
        log::trace!("raised {} on {} (handled: {})", key, source, args.handled);
        Ok(args)
    }

    fn run_event_triggers(
        &mut self,
        doc: &CompiledDocument,
        element: ElementId,
        name: &str,
        args: &mut RoutedEventArgs,
    ) -> Result<(), PresentationError> {
        let matches: Vec<StyleMatch> = self.matches.iter().filter(|m| m.element == element).copied().collect();
        for m in matches {
            let Some(rule_set) = doc.rule_set(m.rule_set) else { continue };
            for (index, trigger) in rule_set.triggers.iter().enumerate() {
                let Trigger::Event(trigger) = trigger else { continue };
                if !trigger.responds_to(name, args.handled) {
                    continue;
                }
                let id = TriggerId { source: element, rule_set: m.rule_set, index };
                self.run_actions(doc, id, &trigger.actions, element, trigger.important)?;
                if trigger.set_handled {
                    args.handled = true;
                }
            }
        }
        Ok(())
    }

    // ── Visual states and storyboards ─────────────────────────────────────

    /// Moves `id` into `state` of `group`, restyles for the new
    /// pseudo-class, and plays the storyboard of the best matching
    /// transition: important ones first, then those naming the state being
    /// left, then the most specific. Returns whether a storyboard started.
    pub fn go_to_state(&mut self, id: ElementId, group: &str, state: &str) -> Result<bool, PresentationError> {
        let previous = self.tree.set_visual_state(id, group, state);
        if previous.as_deref().is_some_and(|p| p.eq_ignore_ascii_case(state)) {
            return Ok(false);
        }
        self.apply_styles()?;
        let Some(doc) = self.stylesheet.clone() else {
            return Ok(false);
        };
        let storyboard = self
            .matches
            .iter()
            .filter(|m| m.element == id)
            .filter_map(|m| doc.rule_set(m.rule_set))
            .flat_map(|rs| &rs.transitions)
            .filter(|t| t.applies(group, previous.as_deref(), state))
            .max_by_key(|t| (t.important, t.from.is_some()))
            .map(|t| t.storyboard.clone());
        match storyboard {
            Some(name) => self.play_storyboard(id, &name).map(|_| true),
            None => Ok(false),
        }
    }

    /// Plays the stylesheet's storyboard `name` on `id`. Returns the number
    /// of properties it animates.
    pub fn play_storyboard(&mut self, id: ElementId, name: &str) -> Result<usize, PresentationError> {
        let storyboard = self
            .stylesheet
            .as_ref()
            .and_then(|doc| doc.storyboard(name))
            .cloned()
            .ok_or_else(|| PresentationError::UnknownStoryboard(name.to_string()))?;
        Ok(self.animator.play(&mut self.tree, &storyboard, id)?)
    }

    pub fn stop_storyboard(&mut self, id: ElementId, name: &str) -> Result<bool, PresentationError> {
        Ok(self.animator.stop(&mut self.tree, id, name)?)
    }

    /// Sound effects queued by `play-sfx` actions since the last call.
    pub fn take_sound_effects(&mut self) -> Vec<String> {
        std::mem::take(&mut self.sound_effects)
    }
}

impl std::fmt::Debug for Presentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presentation")
            .field("root", &self.root)
            .field("elements", &self.tree.len())
            .field("matches", &self.matches.len())
            .field("active_triggers", &self.active_triggers.len())
            .field("animator", &self.animator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use ultraviolet_engine::time::FrameClock;

    use super::*;
    use crate::controls;

    fn presentation() -> Presentation {
        Presentation::new(Rc::new(controls::standard_registry()), PresentationConfig::default())
    }

    fn loaded(stylesheet: &str) -> Presentation {
        let mut p = presentation();
        p.load_markup(r#"<Grid Name="root"><Button Name="ok"/><TextBlock Name="label"/></Grid>"#, None).unwrap();
        p.load_stylesheet(stylesheet).unwrap();
        p
    }

    fn frame(frames: &mut FrameClock, ms: u64) -> UpdateTime {
        frames.advance(Duration::from_millis(ms))
    }

    #[test]
    fn rejected_stylesheets_change_nothing() {
        let mut p = loaded("Button { Width: 10; }");
        let ok = p.find("ok").unwrap();
        assert_eq!(p.value(ok, "Width"), Some(Value::Double(10.0)));

        let err = p.load_stylesheet("Button { Width: 20 }").unwrap_err();
        assert!(matches!(err, PresentationError::Stylesheet(StylesheetError::Syntax(_))));
        let err = p.load_stylesheet("Button { Width: 20; Wobble: 1; }").unwrap_err();
        assert!(matches!(err, PresentationError::Stylesheet(StylesheetError::Compilation(_))));
        assert_eq!(p.value(ok, "Width"), Some(Value::Double(10.0)));
    }

    #[test]
    fn property_triggers_enter_and_leave() {
        let mut p = loaded(
            "Button { Opacity: 0.5; trigger property IsPressed = { true } { set Opacity { 0.25 } play-sfx { Click } } }",
        );
        let mut frames = FrameClock::new();
        let ok = p.find("ok").unwrap();
        let pressed = p.tree().find_by_name(ok, None, "IsPressed").unwrap();
        assert_eq!(p.value(ok, "Opacity"), Some(Value::Double(0.5)));

        p.tree_mut().set_value(ok, &pressed, Value::Bool(true)).unwrap();
        p.update(&frame(&mut frames, 16)).unwrap();
        assert_eq!(p.value(ok, "Opacity"), Some(Value::Double(0.25)));
        assert_eq!(p.take_sound_effects(), vec!["Click".to_string()]);

        p.update(&frame(&mut frames, 16)).unwrap();
        assert!(p.take_sound_effects().is_empty());

        p.tree_mut().set_value(ok, &pressed, Value::Bool(false)).unwrap();
        p.update(&frame(&mut frames, 16)).unwrap();
        assert_eq!(p.value(ok, "Opacity"), Some(Value::Double(0.5)));
    }

    #[test]
    fn events_bubble_through_handlers_and_triggers() {
        let clicks = Rc::new(Cell::new(0));
        let seen = clicks.clone();
        let mut p = presentation().with_handlers(HandlerTable::new().with("OnClick", move |_| seen.set(seen.get() + 1)));
        p.load_markup(r#"<Grid Name="root"><Button Name="ok" Click="OnClick"/></Grid>"#, None).unwrap();
        p.load_stylesheet(
            "Button { trigger event Click (set-handled) { play-sfx { Tick } } } \
             Grid { trigger event Button.Click { set Opacity { 0.1 } } trigger event Button.Click (handled) { play-sfx { Late } } }",
        )
        .unwrap();
        let ok = p.find("ok").unwrap();
        let root = p.root().unwrap();

        let args = p.raise_event(ok, "Click").unwrap();
        assert!(args.handled);
        assert_eq!(args.event, "Button.Click");
        assert_eq!(clicks.get(), 1);
        assert_eq!(p.take_sound_effects(), vec!["Tick".to_string(), "Late".to_string()]);
        assert_eq!(p.value(root, "Opacity"), Some(Value::Double(1.0)));

        assert!(matches!(p.raise_event(root, "Click"), Err(PresentationError::UnknownEvent { .. })));
    }

    #[test]
    fn visual_state_transitions_play_storyboards() {
        let mut p = loaded(
            "@press { target { animation Opacity { keyframe 100 { 0 } } } } \
             Button { transition (CommonStates, Pressed): press; } \
             Button:pressed { Width: 5; }",
        );
        let mut frames = FrameClock::new();
        let ok = p.find("ok").unwrap();
        assert!(p.go_to_state(ok, "CommonStates", "Pressed").unwrap());
        assert_eq!(p.value(ok, "Width"), Some(Value::Double(5.0)));
        assert!(!p.go_to_state(ok, "CommonStates", "pressed").unwrap());

        p.update(&frame(&mut frames, 50)).unwrap();
        assert_eq!(p.value(ok, "Opacity"), Some(Value::Double(0.5)));
        assert!(p.stop_storyboard(ok, "press").unwrap());
        assert_eq!(p.value(ok, "Opacity"), Some(Value::Double(1.0)));

        assert!(!p.go_to_state(ok, "CommonStates", "Normal").unwrap());
        assert!(p.value(ok, "Width").is_some_and(|w| w.as_f64().is_some_and(f64::is_nan)));
    }

    #[test]
    fn unknown_storyboards_are_errors() {
        let mut p = loaded("Button { }");
        let ok = p.find("ok").unwrap();
        assert_eq!(p.play_storyboard(ok, "nope"), Err(PresentationError::UnknownStoryboard("nope".into())));
    }
}
