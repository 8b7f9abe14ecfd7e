use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;

use ultraviolet_uvss::ast::{self, Document, DocumentItem, QualifiedName, RuleSetItem};
use ultraviolet_uvss::{parse_str, Parse, SyntaxNode};

use crate::culture::Culture;
use crate::error::{CompilationError, CompilationErrorKind};
use crate::style::easing::Easing;
use crate::style::selector::{CompiledSelector, NavigationExpression};
use crate::style::storyboard::{CompiledAnimation, CompiledStoryboard, Keyframe, StoryboardTarget};
use crate::style::trigger::{
    ComparisonOp, EventTrigger, PropertyTrigger, Transition, Trigger, TriggerAction, TriggerCondition,
};
use crate::style::{CompilationContext, CompiledDocument, CompiledRule, CompiledRuleSet};
use crate::value::{Value, ValueType};

/// Compiles a parsed stylesheet. Never fails: unresolved references and
/// unreadable literals are collected in [`CompiledDocument::diagnostics`].
pub fn compile(ctx: &CompilationContext, root: &Rc<SyntaxNode>) -> CompiledDocument {
    let mut compiler = Compiler {
        ctx,
        offsets: root.descendants_with_offsets().into_iter().map(|(offset, node)| (node as *const SyntaxNode, offset)).collect(),
        culture: Culture::invariant(),
        next_index: 0,
        doc: CompiledDocument::default(),
        storyboard_refs: Vec::new(),
    };
    if let Some(document) = Document::cast(root) {
        compiler.document(&document);
    }
    compiler.finish()
}

/// Parses and compiles `src`. Syntax errors are left in the returned
/// [`Parse`]; the document is compiled from the recovered tree regardless.
pub fn compile_str(ctx: &CompilationContext, src: &str) -> (Parse, CompiledDocument) {
    let parse = parse_str(src);
    let doc = compile(ctx, &parse.root);
    (parse, doc)
}

struct Compiler<'a> {
    ctx: &'a CompilationContext,
    /// Absolute offset of every node, recorded in one pass over the tree.
    offsets: HashMap<*const SyntaxNode, usize>,
    /// Set by the most recent `$culture` directive.
    culture: Culture,
    next_index: usize,
    doc: CompiledDocument,
    storyboard_refs: Vec<(String, Range<usize>)>,
}

impl Compiler<'_> {
    fn finish(mut self) -> CompiledDocument {
        for (name, span) in std::mem::take(&mut self.storyboard_refs) {
            if !self.doc.storyboards.contains_key(&name) {
                self.error(CompilationErrorKind::UnknownStoryboard(name), span);
            }
        }
        log::debug!(
            "compiled {} rule sets, {} storyboards, {} diagnostics (execution culture {})",
            self.doc.rule_sets.len(),
            self.doc.storyboards.len(),
            self.doc.diagnostics.len(),
            self.ctx.options.execution_culture,
        );
        self.doc
    }

    fn error(&mut self, kind: CompilationErrorKind, span: Range<usize>) {
        log::debug!("uvss compilation error at {:?}: {}", span, kind);
        self.doc.diagnostics.push(CompilationError::new(kind, span));
    }

    /// Source span of `node` without its outer trivia.
    fn span(&self, node: &SyntaxNode) -> Range<usize> {
        let offset = self.offsets.get(&(node as *const SyntaxNode)).copied().unwrap_or(0);
        let start = offset + node.first_token().map_or(0, |t| t.leading_width());
        start..start + node.width()
    }

    fn document(&mut self, document: &Document) {
        for item in document.items() {
            match item {
                DocumentItem::Culture(directive) => self.culture_directive(&directive),
                DocumentItem::RuleSet(rs) => self.rule_set(&rs, &[]),
                DocumentItem::Storyboard(sb) => self.storyboard(&sb),
                DocumentItem::UnknownDirective(node) => {
                    log::debug!("ignoring unknown directive '{}'", node.collapsed_text())
                }
                DocumentItem::Skipped(_) => {}
            }
        }
    }

    fn culture_directive(&mut self, directive: &ast::CultureDirective) {
        let name = directive.culture_name();
        match Culture::new(&name) {
            Ok(culture) => self.culture = culture,
            Err(name) => {
                let span = self.span(directive.syntax());
                self.error(CompilationErrorKind::InvalidCulture(name), span);
            }
        }
    }

    // ── Types and names ───────────────────────────────────────────────────

    fn check_type(&mut self, ty: &str, span: &Range<usize>) -> bool {
        if self.ctx.registry.contains(ty) {
            return true;
        }
        if self.ctx.options.report_unknown_types {
            self.error(CompilationErrorKind::UnresolvedType(ty.to_string()), span.clone());
        }
        false
    }

    fn check_selector(&mut self, selector: &CompiledSelector, span: &Range<usize>) {
        let types: Vec<String> = selector.parts().iter().filter_map(|p| p.type_name.clone()).collect();
        for ty in types {
            self.check_type(&ty, span);
        }
        if let Some(ty) = selector.navigation.as_ref().and_then(|n| n.as_type.clone()) {
            self.check_type(&ty, span);
        }
    }

    fn selector(&mut self, selector: Option<ast::Selector>, navigation: Option<NavigationExpression>) -> Option<CompiledSelector> {
        let selector = selector?;
        let compiled = CompiledSelector::from_ast(&selector, navigation);
        let span = self.span(selector.syntax());
        self.check_selector(&compiled, &span);
        Some(compiled)
    }

    /// Element types a selector's matches are known to have.
    fn element_type(selector: &CompiledSelector) -> Option<String> {
        match &selector.navigation {
            Some(nav) => nav.as_type.clone(),
            None => selector.target_type().map(str::to_string),
        }
    }

    /// Checks `name` on every known element type (or on its explicit owner)
    /// and, when the property resolves, that `value` reads as its type.
    fn check_property(&mut self, name: &QualifiedName, types: &[String], value: Option<&str>, span: Range<usize>) {
        let registry = self.ctx.registry.clone();
        let value_type = match &name.owner {
            Some(owner) => {
                if !registry.contains(owner) {
                    self.error(CompilationErrorKind::UnresolvedType(owner.clone()), span);
                    return;
                }
                match registry.find_property(&name.name, owner) {
                    Some(p) => Some(p.value_type),
                    None => {
                        self.error(
                            CompilationErrorKind::UnknownProperty { owner: owner.clone(), name: name.name.clone() },
                            span,
                        );
                        return;
                    }
                }
            }
            None => {
                let mut found = None;
                for ty in types.iter().filter(|t| registry.contains(t)) {
                    match registry.find_property(&name.name, ty) {
                        Some(p) => found = Some(p.value_type),
                        None => {
                            self.error(
                                CompilationErrorKind::UnknownProperty { owner: ty.clone(), name: name.name.clone() },
                                span,
                            );
                            return;
                        }
                    }
                }
                found
            }
        };
        if let (Some(ty), Some(value)) = (value_type, value) {
            self.check_literal(value, ty, span);
        }
    }

    fn check_literal(&mut self, text: &str, ty: ValueType, span: Range<usize>) {
        if matches!(ty, ValueType::Element | ValueType::DataTemplate) {
            return;
        }
        if Value::resolve(text, ty, &self.culture).is_none() {
            let kind = CompilationErrorKind::InvalidLiteral {
                text: text.to_string(),
                expected: ty.to_string(),
                culture: self.culture.name().to_string(),
            };
            self.error(kind, span);
        }
    }

    fn check_event(&mut self, name: &QualifiedName, types: &[String], span: Range<usize>) {
        let registry = self.ctx.registry.clone();
        let exists = |owner: &str| {
            registry.find_event(&name.name, owner).is_some() || registry.has_standard_event(&name.name, owner)
        };
        let owners: Vec<String> = match &name.owner {
            Some(owner) if !registry.contains(owner) => {
                self.error(CompilationErrorKind::UnresolvedType(owner.clone()), span);
                return;
            }
            Some(owner) => vec![owner.clone()],
            None => types.iter().filter(|t| registry.contains(t)).cloned().collect(),
        };
        if let Some(owner) = owners.into_iter().find(|o| !exists(o)) {
            self.error(CompilationErrorKind::UnknownEvent { owner, name: name.name.clone() }, span);
        }
    }

    fn storyboard_ref(&mut self, name: &str, span: Range<usize>) {
        if !name.is_empty() {
            self.storyboard_refs.push((name.to_string(), span));
        }
    }

    // ── Rule sets ─────────────────────────────────────────────────────────

    fn rule_set(&mut self, rs: &ast::RuleSet, parents: &[CompiledSelector]) {
        let mut own = Vec::new();
        for with_nav in rs.selectors() {
            let navigation = with_nav.navigation_expression().and_then(|n| NavigationExpression::from_ast(&n));
            if let Some(selector) = self.selector(with_nav.selector(), navigation) {
                own.push(selector);
            }
        }
        let selectors: Vec<CompiledSelector> = if parents.is_empty() {
            own
        } else {
            parents.iter().flat_map(|p| own.iter().map(move |s| p.nest(s))).collect()
        };
        let types: Vec<String> = selectors.iter().filter_map(Self::element_type).collect();

        let index = self.next_index;
        self.next_index += 1;
        let mut compiled = CompiledRuleSet {
            index,
            selectors: selectors.clone(),
            rules: Vec::new(),
            triggers: Vec::new(),
            transitions: Vec::new(),
        };
        let mut nested = Vec::new();
        for item in rs.items() {
            match item {
                RuleSetItem::Rule(rule) => {
                    if let Some(rule) = self.rule(&rule, &types) {
                        compiled.rules.push(rule);
                    }
                }
                RuleSetItem::PropertyTrigger(t) => {
                    let trigger = self.property_trigger(&t, &types);
                    compiled.triggers.push(Trigger::Property(trigger));
                }
                RuleSetItem::EventTrigger(t) => {
                    if let Some(trigger) = self.event_trigger(&t, &types) {
                        compiled.triggers.push(Trigger::Event(trigger));
                    }
                }
                RuleSetItem::Transition(t) => {
                    if let Some(transition) = self.transition(&t) {
                        compiled.transitions.push(transition);
                    }
                }
                RuleSetItem::RuleSet(inner) => nested.push(inner),
            }
        }
        self.doc.rule_sets.push(compiled);
        for inner in nested {
            self.rule_set(&inner, &selectors);
        }
    }

    fn rule(&mut self, rule: &ast::Rule, types: &[String]) -> Option<CompiledRule> {
        let name = rule.property_name()?.qualified();
        if name.name.is_empty() {
            return None;
        }
        let value = rule.value_text();
        let span = self.span(rule.syntax());
        self.check_property(&name, types, Some(&value), span);
        Some(CompiledRule { property: name, value, culture: self.culture.clone(), important: rule.is_important() })
    }

    // ── Triggers ──────────────────────────────────────────────────────────

    fn property_trigger(&mut self, trigger: &ast::PropertyTrigger, types: &[String]) -> PropertyTrigger {
        let mut conditions = Vec::new();
        for condition in trigger.conditions() {
            let Some(name) = condition.property_name().map(|p| p.qualified()) else { continue };
            let Some(op) = condition.operator().and_then(ComparisonOp::from_kind) else { continue };
            let value = condition.value_text();
            let span = self.span(condition.syntax());
            self.check_property(&name, types, Some(&value), span);
            conditions.push(TriggerCondition { property: name, op, value, culture: self.culture.clone() });
        }
        let span = self.span(trigger.syntax());
        PropertyTrigger {
            conditions,
            actions: self.actions(trigger.actions(), types, span),
            important: trigger.is_important(),
        }
    }

    fn event_trigger(&mut self, trigger: &ast::EventTrigger, types: &[String]) -> Option<EventTrigger> {
        let event = trigger.event_name()?.qualified();
        let span = self.span(trigger.syntax());
        self.check_event(&event, types, span.clone());
        Some(EventTrigger {
            event,
            handled: trigger.handled(),
            set_handled: trigger.set_handled(),
            actions: self.actions(trigger.actions(), types, span),
            important: trigger.is_important(),
        })
    }

    fn actions(&mut self, actions: Vec<ast::TriggerAction>, types: &[String], span: Range<usize>) -> Vec<TriggerAction> {
        let mut out = Vec::new();
        for action in actions {
            match action {
                ast::TriggerAction::Set { property, selector, value } => {
                    let Some(property) = property else { continue };
                    let name = property.qualified();
                    let selector = self.selector(selector, None);
                    let scoped: Vec<String> = match &selector {
                        Some(s) => s.target_type().map(str::to_string).into_iter().collect(),
                        None => types.to_vec(),
                    };
                    let span = self.span(property.syntax());
                    self.check_property(&name, &scoped, Some(&value), span);
                    out.push(TriggerAction::Set { property: name, selector, value, culture: self.culture.clone() });
                }
                ast::TriggerAction::PlayStoryboard { selector, storyboard } => {
                    let selector = self.selector(selector, None);
                    self.storyboard_ref(&storyboard, span.clone());
                    out.push(TriggerAction::PlayStoryboard { selector, storyboard });
                }
                ast::TriggerAction::PlaySfx { sound } => out.push(TriggerAction::PlaySfx { sound }),
            }
        }
        out
    }

    fn transition(&mut self, transition: &ast::Transition) -> Option<Transition> {
        let group = transition.group()?;
        let state = transition.state()?;
        let storyboard = transition.storyboard();
        let span = self.span(transition.syntax());
        self.storyboard_ref(&storyboard, span);
        Some(Transition { group, state, from: transition.from_state(), storyboard, important: transition.is_important() })
    }

    // ── Storyboards ───────────────────────────────────────────────────────

    fn storyboard(&mut self, sb: &ast::Storyboard) {
        let name = sb.name();
        let span = self.span(sb.syntax());
        let loop_behavior = match sb.loop_behavior() {
            None => Default::default(),
            Some(text) => text.parse().unwrap_or_else(|_| {
                self.error(CompilationErrorKind::UnknownLoopBehavior(text), span.clone());
                Default::default()
            }),
        };
        let targets: Vec<StoryboardTarget> = sb.targets().iter().map(|t| self.storyboard_target(t)).collect();
        let compiled = CompiledStoryboard { name: name.clone(), loop_behavior, targets };
        if self.doc.storyboards.insert(name.clone(), Rc::new(compiled)).is_some() {
            log::debug!("storyboard '{}' redefined; the later definition wins", name);
        }
    }

    fn storyboard_target(&mut self, target: &ast::StoryboardTarget) -> StoryboardTarget {
        let span = self.span(target.syntax());
        let type_name = target.type_name();
        let known_type = match &type_name {
            Some(ty) => self.check_type(ty, &span).then(|| ty.clone()),
            None => None,
        };
        let selector = self.selector(target.selector(), None);
        let element_type = known_type.or_else(|| selector.as_ref().and_then(Self::element_type));
        let animations = target.animations().iter().filter_map(|a| self.animation(a, element_type.as_deref())).collect();
        StoryboardTarget { type_name, selector, animations }
    }

    fn animation(&mut self, animation: &ast::Animation, element_type: Option<&str>) -> Option<CompiledAnimation> {
        let property = animation.property_name()?.qualified();
        let navigation = animation.navigation_expression().and_then(|n| NavigationExpression::from_ast(&n));
        let span = self.span(animation.syntax());
        let animated_type = match &navigation {
            Some(nav) => {
                if let Some(ty) = &nav.as_type {
                    self.check_type(ty, &span);
                }
                nav.as_type.clone()
            }
            None => element_type.map(str::to_string),
        };

        let mut keyframes = Vec::new();
        for frame in animation.keyframes() {
            let frame_span = self.span(frame.syntax());
            let Some(time_text) = frame.time_text() else { continue };
            let time = match time_text.parse::<f64>() {
                Ok(t) if t >= 0.0 && t.is_finite() => t,
                _ => {
                    self.error(CompilationErrorKind::InvalidKeyframeTime(time_text.to_string()), frame_span);
                    continue;
                }
            };
            let easing = match frame.easing() {
                None => Easing::default(),
                Some(name) => name.parse().unwrap_or_else(|_| {
                    self.error(CompilationErrorKind::UnknownEasing(name), frame_span.clone());
                    Easing::default()
                }),
            };
            let value = frame.value_text();
            let types: Vec<String> = animated_type.iter().cloned().collect();
            self.check_property(&property, &types, Some(&value), frame_span);
            keyframes.push(Keyframe { time, easing, value, culture: self.culture.clone() });
        }
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        Some(CompiledAnimation { property, navigation, keyframes })
    }
}
