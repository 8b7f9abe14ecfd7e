//! Capability table: what each element type can be constructed with and
//! which properties, events, and collections it exposes by name.
//!
//! Types register once at startup (see [`crate::controls`]); instantiation
//! and style compilation only ever look members up by string name here.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::context::UiContext;
use crate::element::Element;
use crate::error::UvmlError;
use crate::value::{Value, ValueType};

// ── Dependency properties ─────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    pub owner: &'static str,
    pub name: &'static str,
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

/// An externally addressable, bindable, animatable property slot.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyProperty {
    pub owner: &'static str,
    pub name: &'static str,
    pub value_type: ValueType,
    pub default: Value,
    /// Settable on any element as `Owner.Name`.
    pub attached: bool,
}

impl DependencyProperty {
    pub fn new(owner: &'static str, name: &'static str, value_type: ValueType) -> Self {
        Self { owner, name, value_type, default: value_type.default_value(), attached: false }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }

    pub fn attached(mut self) -> Self {
        self.attached = true;
        self
    }

    pub fn key(&self) -> PropertyKey {
        PropertyKey { owner: self.owner, name: self.name }
    }
}

// ── Routed events ─────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RoutingStrategy {
    /// Source first, then each visual ancestor up to the root.
    Bubble,
    /// Source only.
    Direct,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RoutedEvent {
    pub owner: &'static str,
    pub name: &'static str,
    pub routing: RoutingStrategy,
}

impl RoutedEvent {
    pub const fn bubble(owner: &'static str, name: &'static str) -> Self {
        Self { owner, name, routing: RoutingStrategy::Bubble }
    }

    pub const fn direct(owner: &'static str, name: &'static str) -> Self {
        Self { owner, name, routing: RoutingStrategy::Direct }
    }
}

impl fmt::Display for RoutedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

// ── Constructors ──────────────────────────────────────────────────────────

/// The constructor shapes a type may offer, in instantiation preference
/// order.
#[derive(Clone, Copy)]
pub enum Constructor {
    ContextAndName(fn(&UiContext, Option<&str>) -> Element),
    Context(fn(&UiContext) -> Element),
    Default(fn() -> Element),
}

impl Constructor {
    fn rank(&self) -> u8 {
        match self {
            Constructor::ContextAndName(_) => 0,
            Constructor::Context(_) => 1,
            Constructor::Default(_) => 2,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Constructor::ContextAndName(_) => "(context, name)",
            Constructor::Context(_) => "(context)",
            Constructor::Default(_) => "()",
        }
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constructor{}", self.shape())
    }
}

/// Uniform entry point synthesized from whichever constructor shape a type
/// offers.
pub type Instantiator = Rc<dyn Fn(&UiContext, Option<&str>) -> Element>;

// ── TypeDescriptor ────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CollectionDescriptor {
    pub name: &'static str,
    /// Items become visual children of the owner.
    pub visual: bool,
}

#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: &'static str,
    pub base: Option<&'static str>,
    constructors: Vec<Constructor>,
    properties: Vec<Rc<DependencyProperty>>,
    events: Vec<RoutedEvent>,
    standard_properties: Vec<(&'static str, ValueType)>,
    standard_events: Vec<&'static str>,
    collections: Vec<CollectionDescriptor>,
    is_collection: bool,
    content_property: Option<&'static str>,
}

impl TypeDescriptor {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            base: None,
            constructors: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            standard_properties: Vec::new(),
            standard_events: Vec::new(),
            collections: Vec::new(),
            is_collection: false,
            content_property: None,
        }
    }

    pub fn base(mut self, base: &'static str) -> Self {
        self.base = Some(base);
        self
    }

    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn property(mut self, name: &'static str, value_type: ValueType) -> Self {
        self.properties.push(Rc::new(DependencyProperty::new(self.name, name, value_type)));
        self
    }

    pub fn property_with_default(mut self, name: &'static str, value_type: ValueType, default: Value) -> Self {
        self.properties.push(Rc::new(DependencyProperty::new(self.name, name, value_type).with_default(default)));
        self
    }

    pub fn attached_property(mut self, name: &'static str, value_type: ValueType) -> Self {
        self.properties.push(Rc::new(DependencyProperty::new(self.name, name, value_type).attached()));
        self
    }

    pub fn routed_event(mut self, event: RoutedEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn standard_property(mut self, name: &'static str, value_type: ValueType) -> Self {
        self.standard_properties.push((name, value_type));
        self
    }

    pub fn standard_event(mut self, name: &'static str) -> Self {
        self.standard_events.push(name);
        self
    }

    pub fn collection(mut self, name: &'static str, visual: bool) -> Self {
        self.collections.push(CollectionDescriptor { name, visual });
        self
    }

    /// The instance itself is the collection its markup children go into.
    pub fn is_collection(mut self) -> Self {
        self.is_collection = true;
        self
    }

    /// Member that markup children and text content populate.
    pub fn content_property(mut self, name: &'static str) -> Self {
        self.content_property = Some(name);
        self
    }

    pub fn properties(&self) -> &[Rc<DependencyProperty>] {
        &self.properties
    }

    pub fn events(&self) -> &[RoutedEvent] {
        &self.events
    }
}

// ── TypeRegistry ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<&'static str, TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: TypeDescriptor) {
        log::trace!("registering type {}", descriptor.name);
        self.types.insert(descriptor.name, descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    /// `ty` followed by each of its base types.
    pub fn ancestry<'a>(&'a self, ty: &str) -> impl Iterator<Item = &'a TypeDescriptor> + 'a {
        std::iter::successors(self.get(ty), move |d| d.base.and_then(|b| self.get(b)))
    }

    pub fn is_a(&self, ty: &str, base: &str) -> bool {
        self.ancestry(ty).any(|d| d.name == base)
    }

    /// Looks `name` up on `owner` and its bases.
    pub fn find_property(&self, name: &str, owner: &str) -> Option<Rc<DependencyProperty>> {
        self.ancestry(owner).find_map(|d| d.properties.iter().find(|p| p.name == name).cloned())
    }

    /// Resolves a possibly owner-qualified property name as used on an
    /// element of type `element_type`.
    pub fn resolve_property(
        &self,
        owner: Option<&str>,
        name: &str,
        element_type: &str,
    ) -> Option<Rc<DependencyProperty>> {
        self.find_property(name, owner.unwrap_or(element_type))
    }

    pub fn find_event(&self, name: &str, owner: &str) -> Option<RoutedEvent> {
        self.ancestry(owner).find_map(|d| d.events.iter().find(|e| e.name == name).copied())
    }

    /// Every routed event registered under `name`, whatever its owner.
    pub fn events_named(&self, name: &str) -> Vec<RoutedEvent> {
        self.types.values().flat_map(|d| d.events.iter().filter(|e| e.name == name).copied()).collect()
    }

    pub fn find_standard_property(&self, name: &str, owner: &str) -> Option<ValueType> {
        self.ancestry(owner)
            .find_map(|d| d.standard_properties.iter().find(|(n, _)| *n == name).map(|(_, t)| *t))
    }

    pub fn has_standard_event(&self, name: &str, owner: &str) -> bool {
        self.ancestry(owner).any(|d| d.standard_events.iter().any(|e| *e == name))
    }

    pub fn find_collection(&self, name: &str, owner: &str) -> Option<CollectionDescriptor> {
        self.ancestry(owner).find_map(|d| d.collections.iter().find(|c| c.name == name).copied())
    }

    pub fn is_collection_type(&self, ty: &str) -> bool {
        self.ancestry(ty).any(|d| d.is_collection)
    }

    pub fn content_property(&self, ty: &str) -> Option<&'static str> {
        self.ancestry(ty).find_map(|d| d.content_property)
    }

    /// Picks the best constructor shape `ty` declares, `(context, name)`
    /// over `(context)` over `()`, and wraps it in a uniform instantiator.
    /// Constructors are not inherited.
    pub fn select_constructor(&self, ty: &str) -> Result<Instantiator, UvmlError> {
        let descriptor = self.get(ty).ok_or_else(|| UvmlError::UnknownType(ty.to_string()))?;
        let best = descriptor
            .constructors
            .iter()
            .min_by_key(|c| c.rank())
            .copied()
            .ok_or_else(|| UvmlError::NoValidConstructor(ty.to_string()))?;
        log::debug!("instantiator for {} uses constructor {}", ty, best.shape());
        let instantiator: Instantiator = match best {
            Constructor::ContextAndName(f) => Rc::new(move |ctx: &UiContext, name: Option<&str>| f(ctx, name)),
            Constructor::Context(f) => Rc::new(move |ctx: &UiContext, _: Option<&str>| f(ctx)),
            Constructor::Default(f) => Rc::new(move |_: &UiContext, _: Option<&str>| f()),
        };
        Ok(instantiator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        let mut r = TypeRegistry::new();
        r.register(
            TypeDescriptor::new("Base")
                .property("Width", ValueType::Double)
                .attached_property("Row", ValueType::Int)
                .routed_event(RoutedEvent::bubble("Base", "Click"))
                .collection("Children", true),
        );
        r.register(
            TypeDescriptor::new("Derived")
                .base("Base")
                .constructor(Constructor::Default(|| Element::new("Derived")))
                .constructor(Constructor::Context(|_| Element::new("Derived")))
                .standard_property("Tag", ValueType::String),
        );
        r
    }

    #[test]
    fn members_are_inherited() {
        let r = registry();
        assert!(r.is_a("Derived", "Base"));
        assert!(!r.is_a("Base", "Derived"));
        assert_eq!(r.find_property("Width", "Derived").map(|p| p.owner), Some("Base"));
        assert!(r.find_event("Click", "Derived").is_some());
        assert!(r.find_collection("Children", "Derived").is_some());
        assert_eq!(r.find_standard_property("Tag", "Derived"), Some(ValueType::String));
        assert_eq!(r.find_standard_property("Tag", "Base"), None);
    }

    #[test]
    fn attached_properties_resolve_through_their_owner() {
        let r = registry();
        let p = r.resolve_property(Some("Base"), "Row", "Derived").unwrap();
        assert!(p.attached);
        assert_eq!(p.key().to_string(), "Base.Row");
        assert!(r.resolve_property(None, "Row", "Unknown").is_none());
    }

    #[test]
    fn constructor_preference_and_failures() {
        let r = registry();
        assert!(r.select_constructor("Derived").is_ok());
        assert_eq!(r.select_constructor("Base").err(), Some(UvmlError::NoValidConstructor("Base".into())));
        assert_eq!(r.select_constructor("Nope").err(), Some(UvmlError::UnknownType("Nope".into())));
    }
}
