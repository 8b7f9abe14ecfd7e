//! Compiled triggers, trigger actions, and visual-state transitions.

use std::cmp::Ordering;
use std::fmt;

use ultraviolet_uvss::ast::QualifiedName;
use ultraviolet_uvss::SyntaxKind;

use crate::culture::Culture;
use crate::element::{ElementId, ElementTree};
use crate::style::selector::CompiledSelector;
use crate::value::Value;

/// Identifies one trigger as attached to one element. Values a trigger sets
/// are tagged with this so leaving the trigger can revert exactly them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId {
    /// The element the trigger's rule set applies to.
    pub source: ElementId,
    pub rule_set: usize,
    /// Position of the trigger within its rule set.
    pub index: usize,
}

// ── Conditions ────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

impl ComparisonOp {
    pub fn from_kind(kind: SyntaxKind) -> Option<Self> {
        Some(match kind {
            SyntaxKind::EqualsToken => ComparisonOp::Equals,
            SyntaxKind::NotEqualsToken => ComparisonOp::NotEquals,
            SyntaxKind::LessThanToken => ComparisonOp::LessThan,
            SyntaxKind::GreaterThanToken => ComparisonOp::GreaterThan,
            SyntaxKind::LessThanEqualsToken => ComparisonOp::LessThanOrEqual,
            SyntaxKind::GreaterThanEqualsToken => ComparisonOp::GreaterThanOrEqual,
            _ => return None,
        })
    }

    /// Equality compares any values; ordering only numbers. Ordering
    /// anything else is never true.
    pub fn evaluate(self, lhs: &Value, rhs: &Value) -> bool {
        let ordering = match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        };
        let equal = match ordering {
            Some(o) => o == Ordering::Equal,
            None => lhs == rhs,
        };
        match self {
            ComparisonOp::Equals => equal,
            ComparisonOp::NotEquals => !equal,
            ComparisonOp::LessThan => ordering == Some(Ordering::Less),
            ComparisonOp::GreaterThan => ordering == Some(Ordering::Greater),
            ComparisonOp::LessThanOrEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            ComparisonOp::GreaterThanOrEqual => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComparisonOp::Equals => "=",
            ComparisonOp::NotEquals => "<>",
            ComparisonOp::LessThan => "<",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::LessThanOrEqual => "<=",
            ComparisonOp::GreaterThanOrEqual => ">=",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerCondition {
    pub property: QualifiedName,
    pub op: ComparisonOp,
    pub value: String,
    pub culture: Culture,
}

impl TriggerCondition {
    /// Compares the property's current value on `id` with the condition
    /// value, resolved as the property's type. Unknown properties and
    /// unparseable values never satisfy a condition.
    pub fn is_met(&self, tree: &ElementTree, id: ElementId) -> bool {
        let Some(property) = tree.find_by_name(id, self.property.owner.as_deref(), &self.property.name) else {
            return false;
        };
        let Some(expected) = Value::resolve(&self.value, property.value_type, &self.culture) else {
            return false;
        };
        self.op.evaluate(&tree.get_value(id, &property), &expected)
    }
}

// ── Actions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerAction {
    /// Sets a property on the triggering element, or on the elements a
    /// selector picks out beneath it.
    Set { property: QualifiedName, selector: Option<CompiledSelector>, value: String, culture: Culture },
    PlayStoryboard { selector: Option<CompiledSelector>, storyboard: String },
    /// Queues a sound effect for the audio layer.
    PlaySfx { sound: String },
}

impl TriggerAction {
    /// Elements an action scoped by `selector` applies to, relative to the
    /// triggering element.
    pub fn targets(selector: Option<&CompiledSelector>, tree: &ElementTree, source: ElementId) -> Vec<ElementId> {
        match selector {
            Some(selector) => selector.select(tree, source),
            None => vec![source],
        }
    }
}

// ── Triggers ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTrigger {
    /// All must hold.
    pub conditions: Vec<TriggerCondition>,
    pub actions: Vec<TriggerAction>,
    pub important: bool,
}

impl PropertyTrigger {
    pub fn is_met(&self, tree: &ElementTree, id: ElementId) -> bool {
        self.conditions.iter().all(|c| c.is_met(tree, id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventTrigger {
    pub event: QualifiedName,
    /// Fires even when the event was already handled.
    pub handled: bool,
    /// Marks the event handled once the actions have run.
    pub set_handled: bool,
    pub actions: Vec<TriggerAction>,
    pub important: bool,
}

impl EventTrigger {
    pub fn responds_to(&self, event: &str, already_handled: bool) -> bool {
        self.event.name == event && (self.handled || !already_handled)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Property(PropertyTrigger),
    Event(EventTrigger),
}

impl Trigger {
    pub fn actions(&self) -> &[TriggerAction] {
        match self {
            Trigger::Property(t) => &t.actions,
            Trigger::Event(t) => &t.actions,
        }
    }

    pub fn is_important(&self) -> bool {
        match self {
            Trigger::Property(t) => t.important,
            Trigger::Event(t) => t.important,
        }
    }
}

// ── Transitions ───────────────────────────────────────────────────────────

/// `transition (group, state[, from]): storyboard;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub group: String,
    pub state: String,
    /// Only applies when leaving this state; `None` applies from any state.
    pub from: Option<String>,
    pub storyboard: String,
    pub important: bool,
}

impl Transition {
    pub fn applies(&self, group: &str, from: Option<&str>, to: &str) -> bool {
        self.group.eq_ignore_ascii_case(group)
            && self.state.eq_ignore_ascii_case(to)
            && match (&self.from, from) {
                (None, _) => true,
                (Some(expected), Some(actual)) => expected.eq_ignore_ascii_case(actual),
                (Some(_), None) => false,
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_comparisons_coerce() {
        assert!(ComparisonOp::Equals.evaluate(&Value::Int(2), &Value::Double(2.0)));
        assert!(ComparisonOp::LessThan.evaluate(&Value::Double(1.5), &Value::Int(2)));
        assert!(ComparisonOp::GreaterThanOrEqual.evaluate(&Value::Int(2), &Value::Int(2)));
        assert!(!ComparisonOp::NotEquals.evaluate(&Value::Int(2), &Value::Int(2)));
    }

    #[test]
    fn non_numeric_values_only_compare_for_equality() {
        let a = Value::String("a".into());
        let b = Value::String("b".into());
        assert!(ComparisonOp::NotEquals.evaluate(&a, &b));
        assert!(!ComparisonOp::LessThan.evaluate(&a, &b));
        assert!(ComparisonOp::Equals.evaluate(&Value::Bool(true), &Value::Bool(true)));
    }

    #[test]
    fn operators_map_from_tokens() {
        assert_eq!(ComparisonOp::from_kind(SyntaxKind::NotEqualsToken), Some(ComparisonOp::NotEquals));
        assert_eq!(ComparisonOp::from_kind(SyntaxKind::PipeToken), None);
        assert_eq!(ComparisonOp::LessThanOrEqual.to_string(), "<=");
    }

    #[test]
    fn event_trigger_respects_handled_flag() {
        let trigger = EventTrigger {
            event: QualifiedName { owner: None, name: "Click".into() },
            handled: false,
            set_handled: false,
            actions: Vec::new(),
            important: false,
        };
        assert!(trigger.responds_to("Click", false));
        assert!(!trigger.responds_to("Click", true));
        assert!(EventTrigger { handled: true, ..trigger.clone() }.responds_to("Click", true));
        assert!(!trigger.responds_to("Tap", false));
    }

    #[test]
    fn transition_from_state_filters() {
        let generic = Transition {
            group: "CommonStates".into(),
            state: "Pressed".into(),
            from: None,
            storyboard: "press".into(),
            important: false,
        };
        let specific = Transition { from: Some("Hover".into()), ..generic.clone() };
        assert!(generic.applies("commonstates", None, "pressed"));
        assert!(specific.applies("CommonStates", Some("hover"), "Pressed"));
        assert!(!specific.applies("CommonStates", Some("Normal"), "Pressed"));
        assert!(!specific.applies("CommonStates", None, "Pressed"));
    }
}
