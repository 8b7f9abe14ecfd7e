use std::collections::HashMap;

use crate::element::{ElementId, ElementTree};
use crate::style::selector::Specificity;
use crate::style::{CompiledDocument, CompiledRule};
use crate::value::{Value, ValueType};

/// One rule set matched against one element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StyleMatch {
    /// The element the rules land on. Differs from `source` when the
    /// selector navigates.
    pub element: ElementId,
    /// The element the selector matched.
    pub source: ElementId,
    pub rule_set: usize,
    /// Highest specificity among the rule set's alternatives that matched.
    pub specificity: Specificity,
}

/// Restyles `root` and everything beneath it.
///
/// Styled values are cleared first, then every matching rule set is applied
/// in ascending (specificity, document order), so the most specific and,
/// among equals, the latest rule wins. Returns the matches in that order.
pub fn apply_styles(tree: &mut ElementTree, doc: &CompiledDocument, root: ElementId) -> Vec<StyleMatch> {
    let scope = tree.descendants(root);
    for id in &scope {
        tree.clear_styled_values(*id);
    }

    let mut best: HashMap<(ElementId, ElementId, usize), Specificity> = HashMap::new();
    for rule_set in &doc.rule_sets {
        for selector in &rule_set.selectors {
            for &source in &scope {
                if !selector.matches(tree, source) {
                    continue;
                }
                let element = match &selector.navigation {
                    Some(nav) => match nav.navigate(tree, source) {
                        Some(target) => target,
                        None => continue,
                    },
                    None => source,
                };
                let specificity = best.entry((element, source, rule_set.index)).or_default();
                *specificity = (*specificity).max(selector.specificity());
            }
        }
    }

    let mut matches: Vec<StyleMatch> = best
        .into_iter()
        .map(|((element, source, rule_set), specificity)| StyleMatch { element, source, rule_set, specificity })
        .collect();
    matches.sort_by_key(|m| (m.specificity, m.rule_set, m.element, m.source));

    for m in &matches {
        let Some(rule_set) = doc.rule_set(m.rule_set) else { continue };
        for rule in &rule_set.rules {
            apply_rule(tree, m.element, rule);
        }
    }
    log::debug!("applied {} style matches beneath {}", matches.len(), root);
    matches
}

fn apply_rule(tree: &mut ElementTree, id: ElementId, rule: &CompiledRule) {
    let Some(property) = tree.find_by_name(id, rule.property.owner.as_deref(), &rule.property.name) else {
        log::warn!("{} ({}) has no property '{}'", id, tree[id].type_name(), rule.property);
        return;
    };
    if matches!(property.value_type, ValueType::Element | ValueType::DataTemplate) {
        log::warn!("property {} cannot be styled", property.key());
        return;
    }
    let Some(value) = Value::resolve(&rule.value, property.value_type, &rule.culture) else {
        log::warn!("cannot read '{}' as {} under culture {}", rule.value, property.value_type, rule.culture);
        return;
    };
    if let Err(err) = tree.set_styled_value(id, &property, value, rule.important) {
        log::warn!("styling {} on {}: {}", property.key(), id, err);
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::element::Element;
    use crate::registry::{TypeDescriptor, TypeRegistry};
    use crate::style::{compile_str, CompilationContext};

    fn registry() -> Rc<TypeRegistry> {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeDescriptor::new("Element")
                .property_with_default("Width", ValueType::Double, Value::Double(0.0))
                .property("Content", ValueType::Element),
        );
        registry.register(TypeDescriptor::new("Button").base("Element"));
        registry.register(TypeDescriptor::new("Grid").base("Element"));
        Rc::new(registry)
    }

    struct Fixture {
        tree: ElementTree,
        grid: ElementId,
        ok: ElementId,
        other: ElementId,
    }

    fn fixture() -> Fixture {
        let mut tree = ElementTree::new(registry());
        let grid = tree.insert(Element::new("Grid"));
        let ok = tree.insert(Element::new("Button").with_name(Some("ok")).with_class("primary"));
        let other = tree.insert(Element::new("Button"));
        tree.add_child(grid, ok);
        tree.add_child(grid, other);
        Fixture { tree, grid, ok, other }
    }

    fn width(tree: &ElementTree, id: ElementId) -> Value {
        let property = tree.find_by_name(id, None, "Width").unwrap();
        tree.get_value(id, &property)
    }

    fn apply(f: &mut Fixture, src: &str) -> Vec<StyleMatch> {
        let (_, doc) = compile_str(&CompilationContext::new(f.tree.registry().clone()), src);
        assert!(doc.is_usable(), "{:?}", doc.diagnostics);
        apply_styles(&mut f.tree, &doc, f.grid)
    }

    #[test]
    fn most_specific_rule_wins_regardless_of_order() {
        let mut f = fixture();
        apply(&mut f, "#ok { Width: 3; } .primary { Width: 2; } Button { Width: 1; }");
        assert_eq!(width(&f.tree, f.ok), Value::Double(3.0));
        assert_eq!(width(&f.tree, f.other), Value::Double(1.0));
        assert_eq!(width(&f.tree, f.grid), Value::Double(0.0));
    }

    #[test]
    fn later_rule_wins_among_equals() {
        let mut f = fixture();
        apply(&mut f, "Button { Width: 1; } Button { Width: 2; }");
        assert_eq!(width(&f.tree, f.other), Value::Double(2.0));
    }

    #[test]
    fn important_beats_specificity() {
        let mut f = fixture();
        apply(&mut f, "#ok { Width: 3; } Button { Width: 1 !important; }");
        assert_eq!(width(&f.tree, f.ok), Value::Double(1.0));
    }

    #[test]
    fn reapplying_clears_stale_values() {
        let mut f = fixture();
        apply(&mut f, "Button { Width: 1; }");
        apply(&mut f, "#ok { Width: 5; }");
        assert_eq!(width(&f.tree, f.other), Value::Double(0.0));
        assert_eq!(width(&f.tree, f.ok), Value::Double(5.0));
    }

    #[test]
    fn navigation_redirects_to_the_referenced_element() {
        let mut f = fixture();
        let content = f.tree.find_by_name(f.grid, None, "Content").unwrap();
        f.tree.set_value(f.grid, &content, Value::Element(f.other)).unwrap();
        let matches = apply(&mut f, "Grid | Content as Button { Width: 7; }");
        assert_eq!(width(&f.tree, f.other), Value::Double(7.0));
        assert_eq!(matches, vec![StyleMatch {
            element: f.other,
            source: f.grid,
            rule_set: 0,
            specificity: Specificity { types: 1, ..Default::default() },
        }]);
    }

    #[test]
    fn culture_of_the_rule_reads_the_literal() {
        let mut f = fixture();
        apply(&mut f, "$culture { de-DE }\nButton { Width: 2,5; }");
        assert_eq!(width(&f.tree, f.ok), Value::Double(2.5));
    }
}
