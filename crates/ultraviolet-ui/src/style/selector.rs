//! Compiled selectors and matching against the element tree.

use std::fmt;

use ultraviolet_uvss::ast::{self, QualifiedName, SubPart};

use crate::element::{ElementId, ElementTree};

pub use ultraviolet_uvss::ast::Combinator;

// ── Specificity ───────────────────────────────────────────────────────────

/// Match priority of a selector. Compares ids first, then classes, then
/// pseudo-classes, then types.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Specificity {
    pub ids: u32,
    pub classes: u32,
    pub pseudo_classes: u32,
    pub types: u32,
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.ids, self.classes, self.pseudo_classes, self.types)
    }
}

// ── Parts ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorPart {
    /// How this part relates to the previous one; `None` for the first.
    pub combinator: Option<Combinator>,
    pub type_name: Option<String>,
    pub universal: bool,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub pseudo_class: Option<String>,
}

impl SelectorPart {
    fn from_ast(combinator: Option<Combinator>, part: &ast::SelectorPart) -> Self {
        let mut out = SelectorPart { combinator, pseudo_class: part.pseudo_class(), ..Default::default() };
        for sub in part.sub_parts() {
            match sub {
                SubPart::Id(id) => out.id = Some(id),
                SubPart::Class(class) => out.classes.push(class),
                SubPart::Type(ty) => out.type_name = Some(ty),
                SubPart::Universal => out.universal = true,
            }
        }
        out
    }

    fn matches(&self, tree: &ElementTree, id: ElementId) -> bool {
        let element = &tree[id];
        self.type_name.as_deref().is_none_or(|ty| tree.is_a(id, ty))
            && self.id.as_deref().is_none_or(|name| element.name() == Some(name))
            && self.classes.iter().all(|c| element.has_class(c))
            && self.pseudo_class.as_deref().is_none_or(|pc| tree.has_pseudo_class(id, pc))
    }
}

impl fmt::Display for SelectorPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.universal {
            f.write_str("*")?;
        }
        if let Some(ty) = &self.type_name {
            f.write_str(ty)?;
        }
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        if let Some(pc) = &self.pseudo_class {
            write!(f, ":{pc}")?;
        }
        Ok(())
    }
}

// ── Navigation ────────────────────────────────────────────────────────────

/// `| Property [as Type]`: redirects a match to the element stored in a
/// property of the matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationExpression {
    pub property: QualifiedName,
    pub as_type: Option<String>,
}

impl NavigationExpression {
    pub(crate) fn from_ast(nav: &ast::NavigationExpression) -> Option<Self> {
        let property = nav.property_name()?.qualified();
        Some(Self { property, as_type: nav.as_type() })
    }

    /// The element `from` points at through this expression, if it exists
    /// and satisfies the `as` type.
    pub fn navigate(&self, tree: &ElementTree, from: ElementId) -> Option<ElementId> {
        let property = tree.find_by_name(from, self.property.owner.as_deref(), &self.property.name)?;
        let target = tree.get_value(from, &property).as_element().filter(|t| tree.contains(*t))?;
        match &self.as_type {
            Some(ty) if !tree.is_a(target, ty) => None,
            _ => Some(target),
        }
    }
}

impl fmt::Display for NavigationExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "| {}", self.property)?;
        if let Some(ty) = &self.as_type {
            write!(f, " as {ty}")?;
        }
        Ok(())
    }
}

// ── CompiledSelector ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSelector {
    parts: Vec<SelectorPart>,
    specificity: Specificity,
    pub navigation: Option<NavigationExpression>,
}

impl CompiledSelector {
    pub fn new(parts: Vec<SelectorPart>, navigation: Option<NavigationExpression>) -> Self {
        let mut specificity = Specificity::default();
        for part in &parts {
            specificity.ids += part.id.is_some() as u32;
            specificity.classes += part.classes.len() as u32;
            specificity.pseudo_classes += part.pseudo_class.is_some() as u32;
            specificity.types += part.type_name.is_some() as u32;
        }
        Self { parts, specificity, navigation }
    }

    pub(crate) fn from_ast(selector: &ast::Selector, navigation: Option<NavigationExpression>) -> Self {
        let parts = selector.parts().iter().map(|(c, p)| SelectorPart::from_ast(*c, p)).collect();
        Self::new(parts, navigation)
    }

    /// `self` as an ancestor scope of `inner`, joined by a descendant
    /// combinator. Used to flatten nested rule sets.
    ///
    /// Only `inner`'s navigation survives. A parent's navigation redirects
    /// the parent's own rules; nested rule sets still scope by the visual
    /// tree under the element the parent's parts matched.
    pub(crate) fn nest(&self, inner: &CompiledSelector) -> CompiledSelector {
        let mut parts = self.parts.clone();
        let mut tail = inner.parts.clone();
        if let Some(first) = tail.first_mut() {
            first.combinator = Some(Combinator::Descendant);
        }
        parts.extend(tail);
        CompiledSelector::new(parts, inner.navigation.clone())
    }

    pub fn parts(&self) -> &[SelectorPart] {
        &self.parts
    }

    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// Type named by the rightmost part, which is the type every matched
    /// element has.
    pub fn target_type(&self) -> Option<&str> {
        self.parts.last().and_then(|p| p.type_name.as_deref())
    }

    /// Right-to-left match of `id` against every part.
    pub fn matches(&self, tree: &ElementTree, id: ElementId) -> bool {
        !self.parts.is_empty() && self.matches_from(tree, self.parts.len() - 1, id)
    }

    fn matches_from(&self, tree: &ElementTree, index: usize, id: ElementId) -> bool {
        let part = &self.parts[index];
        if !part.matches(tree, id) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match part.combinator {
            Some(Combinator::VisualChild) => {
                tree[id].parent().is_some_and(|parent| self.matches_from(tree, index - 1, parent))
            }
            _ => tree.ancestors(id).any(|ancestor| self.matches_from(tree, index - 1, ancestor)),
        }
    }

    /// Elements at or beneath `scope` that match, in pre-order.
    pub fn select(&self, tree: &ElementTree, scope: ElementId) -> Vec<ElementId> {
        tree.descendants(scope).into_iter().filter(|id| self.matches(tree, *id)).collect()
    }
}

impl fmt::Display for CompiledSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            match part.combinator {
                Some(Combinator::VisualChild) => f.write_str(" > ")?,
                Some(Combinator::Descendant) => f.write_str(" ")?,
                None if i > 0 => f.write_str(" ")?,
                None => {}
            }
            write!(f, "{part}")?;
        }
        if let Some(nav) = &self.navigation {
            write!(f, " {nav}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use ultraviolet_uvss::ast::{Document, DocumentItem};
    use ultraviolet_uvss::parse_str;

    use super::*;
    use crate::element::Element;
    use crate::registry::{TypeDescriptor, TypeRegistry};
    use crate::value::ValueType;

    fn selector(src: &str) -> CompiledSelector {
        let parse = parse_str(&format!("{src} {{ }}"));
        let doc = Document::cast(&parse.root).unwrap();
        let DocumentItem::RuleSet(rs) = doc.items().remove(0) else { panic!("expected rule set") };
        let with_nav = rs.selectors().remove(0);
        let nav = with_nav.navigation_expression().and_then(|n| NavigationExpression::from_ast(&n));
        CompiledSelector::from_ast(&with_nav.selector().unwrap(), nav)
    }

    fn tree() -> (ElementTree, [ElementId; 4]) {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDescriptor::new("Control").property("Child", ValueType::Element));
        registry.register(TypeDescriptor::new("Grid").base("Control"));
        registry.register(TypeDescriptor::new("Button").base("Control"));
        let mut tree = ElementTree::new(Rc::new(registry));
        let grid = tree.insert(Element::new("Grid").with_name(Some("root")));
        let inner = tree.insert(Element::new("Grid").with_class("panel"));
        let ok = tree.insert(Element::new("Button").with_name(Some("ok")).with_class("primary"));
        let direct = tree.insert(Element::new("Button"));
        tree.add_child(grid, inner);
        tree.add_child(inner, ok);
        tree.add_child(grid, direct);
        (tree, [grid, inner, ok, direct])
    }

    #[test]
    fn specificity_orders_ids_over_classes_over_types() {
        let id = selector("#ok").specificity();
        let classes = selector(".a.b.c Button").specificity();
        let pseudo = selector("Button:hover").specificity();
        let ty = selector("Grid Button").specificity();
        assert!(id > classes);
        assert!(classes > pseudo);
        assert!(pseudo > ty);
        assert_eq!(classes, Specificity { ids: 0, classes: 3, pseudo_classes: 0, types: 1 });
    }

    #[test]
    fn renders_canonically() {
        assert_eq!(selector("#foo:pseudoclass   .bar.baz>qux").to_string(), "#foo:pseudoclass .bar.baz > qux");
        assert_eq!(selector("ListBox|SelectedItem as Button").to_string(), "ListBox | SelectedItem as Button");
    }

    #[test]
    fn descendant_and_child_combinators() {
        let (tree, [grid, inner, ok, direct]) = tree();
        assert!(selector("Grid Button").matches(&tree, ok));
        assert!(selector("#root Button").matches(&tree, ok));
        assert!(!selector("#root > Button").matches(&tree, ok));
        assert!(selector("#root > Button").matches(&tree, direct));
        assert!(selector("Grid > .panel > #ok.primary").matches(&tree, ok));
        assert!(selector("Control").matches(&tree, grid));
        assert!(!selector(".panel Button").matches(&tree, direct));
        assert_eq!(selector("Button").select(&tree, grid), vec![ok, direct]);
        assert_eq!(selector("*").select(&tree, inner), vec![inner, ok]);
    }

    #[test]
    fn descendant_matching_backtracks() {
        let (tree, [_, _, ok, _]) = tree();
        // Every Grid ancestor is tried for the middle part before giving up.
        assert!(selector("#root Grid Button").matches(&tree, ok));
        assert!(!selector("#root .panel Grid Button").matches(&tree, ok));
    }

    #[test]
    fn pseudo_classes_follow_visual_state() {
        let (mut tree, [_, _, ok, _]) = tree();
        let hover = selector("Button:hover");
        assert!(!hover.matches(&tree, ok));
        tree.set_visual_state(ok, "CommonStates", "Hover");
        assert!(hover.matches(&tree, ok));
    }

    #[test]
    fn navigation_follows_element_properties() {
        let (mut tree, [grid, _, ok, _]) = tree();
        let child = tree.registry().find_property("Child", "Control").unwrap();
        tree.set_value(grid, &child, crate::value::Value::Element(ok)).unwrap();
        let nav = selector("Grid | Child as Button").navigation.unwrap();
        assert_eq!(nav.navigate(&tree, grid), Some(ok));
        let wrong_type = selector("Grid | Child as Grid").navigation.unwrap();
        assert_eq!(wrong_type.navigate(&tree, grid), None);
    }

    #[test]
    fn nesting_joins_with_descendant() {
        let nested = selector("#root").nest(&selector("Grid > Button"));
        assert_eq!(nested.to_string(), "#root Grid > Button");
        assert_eq!(nested.specificity(), Specificity { ids: 1, classes: 0, pseudo_classes: 0, types: 2 });
    }

    #[test]
    fn nesting_keeps_only_the_inner_navigation() {
        let parent = selector("Grid | Child as Button");
        let plain = parent.nest(&selector("TextBlock"));
        assert_eq!(plain.to_string(), "Grid TextBlock");
        assert_eq!(plain.navigation, None);
        let redirected = parent.nest(&selector("Border | Child as Grid"));
        assert_eq!(redirected.navigation, selector("Border | Child as Grid").navigation);
    }
}
