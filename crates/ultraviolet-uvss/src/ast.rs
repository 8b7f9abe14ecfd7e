//! Typed views over [`SyntaxNode`].
//!
//! Each view is a cheap wrapper around an `Rc<SyntaxNode>` of one kind.
//! Accessors skip missing tokens, so a view over an error-recovered tree
//! reports empty strings or `None` where input was absent.

use std::rc::Rc;

use crate::kind::SyntaxKind;
use crate::syntax::{SyntaxElement, SyntaxNode, SyntaxToken};

macro_rules! ast_node {
    ($(#[$meta:meta])* $name:ident, $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(Rc<SyntaxNode>);

        impl $name {
            pub fn cast(node: &Rc<SyntaxNode>) -> Option<Self> {
                (node.kind() == SyntaxKind::$kind).then(|| Self(node.clone()))
            }

            pub fn syntax(&self) -> &Rc<SyntaxNode> {
                &self.0
            }
        }
    };
}

fn children<T>(node: &SyntaxNode, cast: fn(&Rc<SyntaxNode>) -> Option<T>) -> Vec<T> {
    node.child_nodes().filter_map(cast).collect()
}

fn child<T>(node: &SyntaxNode, cast: fn(&Rc<SyntaxNode>) -> Option<T>) -> Option<T> {
    node.child_nodes().find_map(cast)
}

fn present(token: Option<&Rc<SyntaxToken>>) -> Option<&Rc<SyntaxToken>> {
    token.filter(|t| !t.is_missing())
}

fn identifiers(node: &SyntaxNode) -> impl Iterator<Item = &str> {
    node.child_tokens().filter(|t| t.kind() == SyntaxKind::IdentifierToken && !t.is_missing()).map(|t| t.text())
}

fn has_important(node: &SyntaxNode) -> bool {
    present(node.child_token(SyntaxKind::ImportantKeyword)).is_some()
}

// ── Document ──────────────────────────────────────────────────────────────

ast_node!(Document, Document);

/// A top-level item, in document order.
#[derive(Debug, Clone)]
pub enum DocumentItem {
    RuleSet(RuleSet),
    Storyboard(Storyboard),
    Culture(CultureDirective),
    UnknownDirective(Rc<SyntaxNode>),
    Skipped(Rc<SyntaxNode>),
}

impl Document {
    pub fn items(&self) -> Vec<DocumentItem> {
        self.0
            .child_nodes()
            .filter_map(|n| match n.kind() {
                SyntaxKind::RuleSet => RuleSet::cast(n).map(DocumentItem::RuleSet),
                SyntaxKind::Storyboard => Storyboard::cast(n).map(DocumentItem::Storyboard),
                SyntaxKind::CultureDirective => CultureDirective::cast(n).map(DocumentItem::Culture),
                SyntaxKind::UnknownDirective => Some(DocumentItem::UnknownDirective(n.clone())),
                SyntaxKind::SkippedTokens => Some(DocumentItem::Skipped(n.clone())),
                _ => None,
            })
            .collect()
    }
}

ast_node!(
    /// `$culture { name }`
    CultureDirective,
    CultureDirective
);

impl CultureDirective {
    pub fn culture_name(&self) -> String {
        child(&self.0, BracedValue::cast).map(|v| v.text()).unwrap_or_default()
    }
}

// ── Rule sets ─────────────────────────────────────────────────────────────

ast_node!(RuleSet, RuleSet);

/// An item inside a rule set's block.
#[derive(Debug, Clone)]
pub enum RuleSetItem {
    Rule(Rule),
    PropertyTrigger(PropertyTrigger),
    EventTrigger(EventTrigger),
    Transition(Transition),
    RuleSet(RuleSet),
}

impl RuleSet {
    pub fn selectors(&self) -> Vec<SelectorWithNavigationExpression> {
        children(&self.0, SelectorWithNavigationExpression::cast)
    }

    pub fn items(&self) -> Vec<RuleSetItem> {
        let Some(block) = self.0.child_node(SyntaxKind::Block) else { return Vec::new() };
        block
            .child_nodes()
            .filter_map(|n| match n.kind() {
                SyntaxKind::Rule => Rule::cast(n).map(RuleSetItem::Rule),
                SyntaxKind::PropertyTrigger => PropertyTrigger::cast(n).map(RuleSetItem::PropertyTrigger),
                SyntaxKind::EventTrigger => EventTrigger::cast(n).map(RuleSetItem::EventTrigger),
                SyntaxKind::Transition => Transition::cast(n).map(RuleSetItem::Transition),
                SyntaxKind::RuleSet => RuleSet::cast(n).map(RuleSetItem::RuleSet),
                _ => None,
            })
            .collect()
    }
}

ast_node!(SelectorWithNavigationExpression, SelectorWithNavigationExpression);

impl SelectorWithNavigationExpression {
    pub fn selector(&self) -> Option<Selector> {
        child(&self.0, Selector::cast)
    }

    pub fn navigation_expression(&self) -> Option<NavigationExpression> {
        child(&self.0, NavigationExpression::cast)
    }
}

// ── Selectors ─────────────────────────────────────────────────────────────

ast_node!(Selector, Selector);

/// How a selector part relates to the part before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    VisualChild,
}

impl Selector {
    /// Parts in source order; every part after the first carries the
    /// combinator that joins it to its predecessor.
    pub fn parts(&self) -> Vec<(Option<Combinator>, SelectorPart)> {
        let mut out = Vec::new();
        let mut pending_child = false;
        for element in self.0.children() {
            match element {
                SyntaxElement::Token(t) if t.kind() == SyntaxKind::GreaterThanToken => pending_child = true,
                SyntaxElement::Node(n) => {
                    if let Some(part) = SelectorPart::cast(n) {
                        let combinator = if out.is_empty() {
                            None
                        } else if pending_child {
                            Some(Combinator::VisualChild)
                        } else {
                            Some(Combinator::Descendant)
                        };
                        out.push((combinator, part));
                        pending_child = false;
                    }
                }
                SyntaxElement::Token(_) => {}
            }
        }
        out
    }
}

ast_node!(SelectorPart, SelectorPart);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubPart {
    Id(String),
    Class(String),
    Type(String),
    Universal,
}

impl SelectorPart {
    pub fn sub_parts(&self) -> Vec<SubPart> {
        self.0
            .child_nodes()
            .filter(|n| n.kind() == SyntaxKind::SelectorSubPart && !n.is_missing())
            .filter_map(|n| {
                let first = n.first_token()?;
                let name = || identifiers(n).next().unwrap_or_default().to_string();
                Some(match first.kind() {
                    SyntaxKind::HashToken => SubPart::Id(name()),
                    SyntaxKind::PeriodToken => SubPart::Class(name()),
                    SyntaxKind::AsteriskToken => SubPart::Universal,
                    _ => SubPart::Type(first.text().to_string()),
                })
            })
            .collect()
    }

    pub fn pseudo_class(&self) -> Option<String> {
        let pc = self.0.child_node(SyntaxKind::PseudoClass)?;
        identifiers(pc).next().map(str::to_string)
    }
}

ast_node!(
    /// `(selector)` scoping a trigger action or storyboard target.
    SelectorWithParentheses,
    SelectorWithParentheses
);

impl SelectorWithParentheses {
    pub fn selector(&self) -> Option<Selector> {
        child(&self.0, Selector::cast)
    }
}

ast_node!(
    /// `| Property [as Type]`
    NavigationExpression,
    NavigationExpression
);

impl NavigationExpression {
    pub fn property_name(&self) -> Option<PropertyName> {
        child(&self.0, PropertyName::cast)
    }

    pub fn as_type(&self) -> Option<String> {
        present(self.0.child_token(SyntaxKind::AsKeyword))?;
        identifiers(&self.0).next().map(str::to_string)
    }
}

// ── Names and values ──────────────────────────────────────────────────────

ast_node!(PropertyName, PropertyName);
ast_node!(EventName, EventName);

/// `Name` or `Owner.Name`, shared by property and event names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub owner: Option<String>,
    pub name: String,
}

impl QualifiedName {
    fn from_node(node: &SyntaxNode) -> Self {
        let parts: Vec<&str> = identifiers(node).collect();
        let dotted = present(node.child_token(SyntaxKind::PeriodToken)).is_some();
        match parts.as_slice() {
            [owner, name] if dotted => Self { owner: Some(owner.to_string()), name: name.to_string() },
            [name, ..] => Self { owner: None, name: name.to_string() },
            [] => Self { owner: None, name: String::new() },
        }
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{}.{}", owner, self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl PropertyName {
    pub fn qualified(&self) -> QualifiedName {
        QualifiedName::from_node(&self.0)
    }
}

impl EventName {
    pub fn qualified(&self) -> QualifiedName {
        QualifiedName::from_node(&self.0)
    }
}

ast_node!(
    /// `{ raw tokens }`
    BracedValue,
    PropertyValueWithBraces
);

impl BracedValue {
    /// Inner tokens with interior whitespace collapsed to single spaces.
    pub fn text(&self) -> String {
        let children = self.0.children();
        let inner = match children.len() {
            0..=2 => &[][..],
            n => &children[1..n - 1],
        };
        SyntaxNode::new(SyntaxKind::PropertyValue, inner.to_vec()).collapsed_text()
    }
}

ast_node!(Rule, Rule);

impl Rule {
    pub fn property_name(&self) -> Option<PropertyName> {
        child(&self.0, PropertyName::cast)
    }

    pub fn value_text(&self) -> String {
        self.0.child_node(SyntaxKind::PropertyValue).map(|v| v.collapsed_text()).unwrap_or_default()
    }

    pub fn is_important(&self) -> bool {
        has_important(&self.0)
    }
}

// ── Triggers ──────────────────────────────────────────────────────────────

ast_node!(PropertyTrigger, PropertyTrigger);

impl PropertyTrigger {
    pub fn conditions(&self) -> Vec<PropertyTriggerCondition> {
        children(&self.0, PropertyTriggerCondition::cast)
    }

    pub fn is_important(&self) -> bool {
        has_important(&self.0)
    }

    pub fn actions(&self) -> Vec<TriggerAction> {
        actions_of(&self.0)
    }
}

ast_node!(PropertyTriggerCondition, PropertyTriggerCondition);

impl PropertyTriggerCondition {
    pub fn property_name(&self) -> Option<PropertyName> {
        child(&self.0, PropertyName::cast)
    }

    /// The comparison token kind, e.g. `EqualsToken`; `None` if missing.
    pub fn operator(&self) -> Option<SyntaxKind> {
        self.0
            .child_tokens()
            .find(|t| t.kind().is_comparison_operator() && !t.is_missing())
            .map(|t| t.kind())
    }

    pub fn value_text(&self) -> String {
        child(&self.0, BracedValue::cast).map(|v| v.text()).unwrap_or_default()
    }
}

ast_node!(EventTrigger, EventTrigger);

impl EventTrigger {
    pub fn event_name(&self) -> Option<EventName> {
        child(&self.0, EventName::cast)
    }

    fn has_argument(&self, kind: SyntaxKind) -> bool {
        self.0
            .child_node(SyntaxKind::EventTriggerArgumentList)
            .is_some_and(|args| present(args.child_token(kind)).is_some())
    }

    /// Fires even when the event has already been handled.
    pub fn handled(&self) -> bool {
        self.has_argument(SyntaxKind::HandledKeyword)
    }

    /// Marks the event handled after the actions run.
    pub fn set_handled(&self) -> bool {
        self.has_argument(SyntaxKind::SetHandledKeyword)
    }

    pub fn is_important(&self) -> bool {
        has_important(&self.0)
    }

    pub fn actions(&self) -> Vec<TriggerAction> {
        actions_of(&self.0)
    }
}

#[derive(Debug, Clone)]
pub enum TriggerAction {
    PlayStoryboard { selector: Option<Selector>, storyboard: String },
    PlaySfx { sound: String },
    Set { property: Option<PropertyName>, selector: Option<Selector>, value: String },
}

fn actions_of(trigger: &SyntaxNode) -> Vec<TriggerAction> {
    let Some(block) = trigger.child_node(SyntaxKind::Block) else { return Vec::new() };
    block
        .child_nodes()
        .filter_map(|n| {
            let selector = || child(n, SelectorWithParentheses::cast).and_then(|s| s.selector());
            let value = || child(n, BracedValue::cast).map(|v| v.text()).unwrap_or_default();
            match n.kind() {
                SyntaxKind::PlayStoryboardTriggerAction => {
                    Some(TriggerAction::PlayStoryboard { selector: selector(), storyboard: value() })
                }
                SyntaxKind::PlaySfxTriggerAction => Some(TriggerAction::PlaySfx { sound: value() }),
                SyntaxKind::SetTriggerAction => Some(TriggerAction::Set {
                    property: child(n, PropertyName::cast),
                    selector: selector(),
                    value: value(),
                }),
                _ => None,
            }
        })
        .collect()
}

ast_node!(
    /// `transition (group, state[, from]) [!important]: storyboard;`
    Transition,
    Transition
);

impl Transition {
    fn arguments(&self) -> Vec<String> {
        self.0
            .child_node(SyntaxKind::TransitionArgumentList)
            .map(|args| identifiers(args).map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn group(&self) -> Option<String> {
        self.arguments().into_iter().next()
    }

    pub fn state(&self) -> Option<String> {
        self.arguments().into_iter().nth(1)
    }

    pub fn from_state(&self) -> Option<String> {
        self.arguments().into_iter().nth(2)
    }

    pub fn storyboard(&self) -> String {
        self.0.child_node(SyntaxKind::PropertyValue).map(|v| v.collapsed_text()).unwrap_or_default()
    }

    pub fn is_important(&self) -> bool {
        has_important(&self.0)
    }
}

// ── Storyboards ───────────────────────────────────────────────────────────

ast_node!(Storyboard, Storyboard);

impl Storyboard {
    pub fn name(&self) -> String {
        identifiers(&self.0).next().unwrap_or_default().to_string()
    }

    /// The optional loop behavior identifier after the name.
    pub fn loop_behavior(&self) -> Option<String> {
        identifiers(&self.0).nth(1).map(str::to_string)
    }

    pub fn targets(&self) -> Vec<StoryboardTarget> {
        self.0.child_node(SyntaxKind::Block).map(|b| children(b, StoryboardTarget::cast)).unwrap_or_default()
    }
}

ast_node!(StoryboardTarget, StoryboardTarget);

impl StoryboardTarget {
    pub fn type_name(&self) -> Option<String> {
        identifiers(&self.0).next().map(str::to_string)
    }

    pub fn selector(&self) -> Option<Selector> {
        child(&self.0, SelectorWithParentheses::cast).and_then(|s| s.selector())
    }

    pub fn animations(&self) -> Vec<Animation> {
        self.0.child_node(SyntaxKind::Block).map(|b| children(b, Animation::cast)).unwrap_or_default()
    }
}

ast_node!(Animation, Animation);

impl Animation {
    pub fn property_name(&self) -> Option<PropertyName> {
        child(&self.0, PropertyName::cast)
    }

    pub fn navigation_expression(&self) -> Option<NavigationExpression> {
        child(&self.0, NavigationExpression::cast)
    }

    pub fn keyframes(&self) -> Vec<AnimationKeyframe> {
        self.0.child_node(SyntaxKind::Block).map(|b| children(b, AnimationKeyframe::cast)).unwrap_or_default()
    }
}

ast_node!(AnimationKeyframe, AnimationKeyframe);

impl AnimationKeyframe {
    /// Raw time token text, in milliseconds.
    pub fn time_text(&self) -> Option<&str> {
        present(self.0.child_token(SyntaxKind::NumberToken)).map(|t| t.text())
    }

    pub fn easing(&self) -> Option<String> {
        identifiers(&self.0).next().map(str::to_string)
    }

    pub fn value_text(&self) -> String {
        child(&self.0, BracedValue::cast).map(|v| v.text()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    fn document(src: &str) -> Document {
        let parse = parse_str(src);
        assert!(parse.ok(), "{:?}", parse.diagnostics);
        Document::cast(&parse.root).unwrap()
    }

    fn only_rule_set(src: &str) -> RuleSet {
        match document(src).items().into_iter().next() {
            Some(DocumentItem::RuleSet(rs)) => rs,
            other => panic!("expected rule set, got {other:?}"),
        }
    }

    #[test]
    fn selector_parts_and_combinators() {
        let rs = only_rule_set("#ok.primary:hover Grid > * { }");
        let sel = rs.selectors()[0].selector().unwrap();
        let parts = sel.parts();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].0, None);
        assert_eq!(
            parts[0].1.sub_parts(),
            vec![SubPart::Id("ok".into()), SubPart::Class("primary".into())]
        );
        assert_eq!(parts[0].1.pseudo_class().as_deref(), Some("hover"));
        assert_eq!(parts[1].0, Some(Combinator::Descendant));
        assert_eq!(parts[1].1.sub_parts(), vec![SubPart::Type("Grid".into())]);
        assert_eq!(parts[2].0, Some(Combinator::VisualChild));
        assert_eq!(parts[2].1.sub_parts(), vec![SubPart::Universal]);
    }

    #[test]
    fn rules_and_attached_names() {
        let rs = only_rule_set("Button { Grid.Row: 1; Margin: 1  2 3 4 !important; }");
        let rules: Vec<Rule> = rs
            .items()
            .into_iter()
            .filter_map(|i| match i {
                RuleSetItem::Rule(r) => Some(r),
                _ => None,
            })
            .collect();
        let name = rules[0].property_name().unwrap().qualified();
        assert_eq!(name.owner.as_deref(), Some("Grid"));
        assert_eq!(name.name, "Row");
        assert_eq!(name.to_string(), "Grid.Row");
        assert_eq!(rules[1].value_text(), "1 2 3 4");
        assert!(rules[1].is_important());
        assert!(!rules[0].is_important());
    }

    #[test]
    fn trigger_views() {
        let rs = only_rule_set(
            "Button { trigger event Click (set-handled) { set Width (#a) { 10 } play-sfx { Beep } } }",
        );
        let RuleSetItem::EventTrigger(trigger) = rs.items().remove(0) else { panic!("expected trigger") };
        assert_eq!(trigger.event_name().unwrap().qualified().name, "Click");
        assert!(trigger.set_handled());
        assert!(!trigger.handled());
        let actions = trigger.actions();
        assert!(matches!(&actions[0], TriggerAction::Set { value, selector: Some(_), .. } if value == "10"));
        assert!(matches!(&actions[1], TriggerAction::PlaySfx { sound } if sound == "Beep"));
    }

    #[test]
    fn storyboard_views() {
        let doc = document("@fade reverse { target TextBlock { animation Opacity { keyframe 250 ease-in-sin { 0.5 } } } }");
        let DocumentItem::Storyboard(sb) = doc.items().remove(0) else { panic!("expected storyboard") };
        assert_eq!(sb.name(), "fade");
        assert_eq!(sb.loop_behavior().as_deref(), Some("reverse"));
        let target = &sb.targets()[0];
        assert_eq!(target.type_name().as_deref(), Some("TextBlock"));
        let frame = &target.animations()[0].keyframes()[0];
        assert_eq!(frame.time_text(), Some("250"));
        assert_eq!(frame.easing().as_deref(), Some("ease-in-sin"));
        assert_eq!(frame.value_text(), "0.5");
    }

    #[test]
    fn culture_name() {
        let doc = document("$culture { ru-RU }");
        let DocumentItem::Culture(c) = doc.items().remove(0) else { panic!("expected directive") };
        assert_eq!(c.culture_name(), "ru-RU");
    }
}
