//! Dependency property value storage and resolution.
//!
//! Each property keeps independent layers. The effective value is the first
//! present layer in this order:
//!
//! 1. animated
//! 2. important trigger value
//! 3. important styled value
//! 4. local value or binding
//! 5. trigger value
//! 6. styled value
//! 7. the property default

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::animation::AnimatedValue;
use crate::binding::{format_value, CompiledExpression, DataSourceWrapper};
use crate::culture::Culture;
use crate::element::{ElementId, ElementTree};
use crate::error::{PropertyError, UvmlError};
use crate::registry::{DependencyProperty, PropertyKey};
use crate::style::TriggerId;
use crate::value::Value;

/// Where a bound property reads its value from.
#[derive(Debug, Clone)]
pub enum Binding {
    /// A compiled expression evaluated against the element's data source.
    DataSource { member: Rc<CompiledExpression>, format: Option<String>, culture: Culture },
    /// A property of the element's templated parent.
    TemplatedParent { source: Rc<DependencyProperty> },
}

#[derive(Debug, Clone)]
pub enum LocalValue {
    Value(Value),
    Binding(Binding),
}

#[derive(Debug, Clone)]
struct TriggeredValue {
    trigger: TriggerId,
    value: Value,
    important: bool,
}

#[derive(Debug)]
struct PropertyEntry {
    property: Rc<DependencyProperty>,
    local: Option<LocalValue>,
    styled: Option<Value>,
    styled_important: Option<Value>,
    triggered: Vec<TriggeredValue>,
    animated: Option<Rc<RefCell<AnimatedValue>>>,
}

impl PropertyEntry {
    fn new(property: Rc<DependencyProperty>) -> Self {
        Self { property, local: None, styled: None, styled_important: None, triggered: Vec::new(), animated: None }
    }

    fn last_triggered(&self, important: bool) -> Option<&Value> {
        self.triggered.iter().rev().find(|t| t.important == important).map(|t| &t.value)
    }
}

/// Per-element value store.
#[derive(Debug, Default)]
pub struct DependencyValues {
    entries: HashMap<PropertyKey, PropertyEntry>,
}

impl DependencyValues {
    fn entry(&mut self, property: &Rc<DependencyProperty>) -> &mut PropertyEntry {
        self.entries.entry(property.key()).or_insert_with(|| PropertyEntry::new(property.clone()))
    }

    fn get(&self, property: &DependencyProperty) -> Option<&PropertyEntry> {
        self.entries.get(&property.key())
    }

    /// Properties that have any layer set.
    pub fn properties(&self) -> impl Iterator<Item = &Rc<DependencyProperty>> {
        self.entries.values().map(|e| &e.property)
    }
}

fn check_type(property: &DependencyProperty, value: Value) -> Result<Value, PropertyError> {
    let actual = value.kind_name();
    value.coerce(property.value_type, &Culture::invariant()).ok_or_else(|| PropertyError::TypeMismatch {
        owner: property.owner.to_string(),
        name: property.name.to_string(),
        expected: property.value_type.to_string(),
        actual: actual.to_string(),
    })
}

impl ElementTree {
    // ── Reading ───────────────────────────────────────────────────────────

    /// The effective value of `property` on `id`.
    pub fn get_value(&self, id: ElementId, property: &DependencyProperty) -> Value {
        let Some(entry) = self[id].values.get(property) else {
            return property.default.clone();
        };
        if let Some(value) = entry.animated.as_ref().and_then(|a| a.borrow().current()) {
            return value;
        }
        if let Some(value) = entry.last_triggered(true).or(entry.styled_important.as_ref()) {
            return value.clone();
        }
        match &entry.local {
            Some(LocalValue::Value(value)) => return value.clone(),
            Some(LocalValue::Binding(binding)) => {
                if let Some(value) = self.evaluate_binding(id, property, binding) {
                    return value;
                }
            }
            None => {}
        }
        entry
            .last_triggered(false)
            .or(entry.styled.as_ref())
            .cloned()
            .unwrap_or_else(|| property.default.clone())
    }

    /// The value `property` would have with no animation applied.
    pub fn get_base_value(&self, id: ElementId, property: &DependencyProperty) -> Value {
        let animated = self[id].values.get(property).and_then(|e| e.animated.clone());
        match animated {
            Some(a) => {
                let suspended = a.borrow_mut().suspend();
                let value = self.get_value(id, property);
                a.borrow_mut().restore(suspended);
                value
            }
            None => self.get_value(id, property),
        }
    }

    fn evaluate_binding(&self, id: ElementId, property: &DependencyProperty, binding: &Binding) -> Option<Value> {
        match binding {
            Binding::DataSource { member, format, culture } => {
                let source = self.data_source(id)?;
                let raw = source.get(&member.path)?;
                format_value(raw, format.as_deref(), culture).coerce(property.value_type, culture)
            }
            Binding::TemplatedParent { source } => {
                let parent = self[id].templated_parent().filter(|p| self.contains(*p))?;
                self.get_value(parent, source).coerce(property.value_type, &Culture::invariant())
            }
        }
    }

    pub fn local_value(&self, id: ElementId, property: &DependencyProperty) -> Option<&LocalValue> {
        self[id].values.get(property).and_then(|e| e.local.as_ref())
    }

    /// `true` when a local value or binding is set on `id`.
    pub fn has_defined_value(&self, id: ElementId, property: &DependencyProperty) -> bool {
        self.local_value(id, property).is_some()
    }

    pub fn is_animated(&self, id: ElementId, property: &DependencyProperty) -> bool {
        self[id].values.get(property).is_some_and(|e| e.animated.is_some())
    }

    // ── Local values and bindings ─────────────────────────────────────────

    pub fn set_value(&mut self, id: ElementId, property: &Rc<DependencyProperty>, value: Value) -> Result<(), PropertyError> {
        let value = check_type(property, value)?;
        self.element_mut(id).values.entry(property).local = Some(LocalValue::Value(value));
        Ok(())
    }

    pub fn clear_value(&mut self, id: ElementId, property: &Rc<DependencyProperty>) {
        self.element_mut(id).values.entry(property).local = None;
    }

    /// `BindValue`: binds `property` to the wrapper member named by
    /// `expression` (`{{CompiledName}}`, optionally followed by `:Format`).
    pub fn bind_value(
        &mut self,
        id: ElementId,
        property: &Rc<DependencyProperty>,
        wrapper: &DataSourceWrapper,
        expression: &str,
        culture: Culture,
    ) -> Result<(), UvmlError> {
        let (member, format) = wrapper.resolve(expression)?;
        log::trace!("{} binds {} to {}", id, property.key(), member.path);
        self.element_mut(id).values.entry(property).local =
            Some(LocalValue::Binding(Binding::DataSource { member, format, culture }));
        Ok(())
    }

    /// Binds `property` to `source` on the templated parent of `id`.
    pub fn bind_to_templated_parent(&mut self, id: ElementId, property: &Rc<DependencyProperty>, source: Rc<DependencyProperty>) {
        self.element_mut(id).values.entry(property).local = Some(LocalValue::Binding(Binding::TemplatedParent { source }));
    }

    // ── Styles and triggers ───────────────────────────────────────────────

    pub fn set_styled_value(
        &mut self,
        id: ElementId,
        property: &Rc<DependencyProperty>,
        value: Value,
        important: bool,
    ) -> Result<(), PropertyError> {
        let value = check_type(property, value)?;
        let entry = self.element_mut(id).values.entry(property);
        if important {
            entry.styled_important = Some(value);
        } else {
            entry.styled = Some(value);
        }
        Ok(())
    }

    /// Drops every styled value on `id`.
    pub fn clear_styled_values(&mut self, id: ElementId) {
        for entry in self.element_mut(id).values.entries.values_mut() {
            entry.styled = None;
            entry.styled_important = None;
        }
    }

    pub fn set_triggered_value(
        &mut self,
        id: ElementId,
        property: &Rc<DependencyProperty>,
        trigger: TriggerId,
        value: Value,
        important: bool,
    ) -> Result<(), PropertyError> {
        let value = check_type(property, value)?;
        let entry = self.element_mut(id).values.entry(property);
        entry.triggered.retain(|t| t.trigger != trigger);
        entry.triggered.push(TriggeredValue { trigger, value, important });
        Ok(())
    }

    /// Reverts every value `trigger` set on `id`.
    pub fn clear_triggered_values(&mut self, id: ElementId, trigger: TriggerId) {
        for entry in self.element_mut(id).values.entries.values_mut() {
            entry.triggered.retain(|t| t.trigger != trigger);
        }
    }

    pub fn clear_all_triggered_values(&mut self, id: ElementId) {
        for entry in self.element_mut(id).values.entries.values_mut() {
            entry.triggered.clear();
        }
    }

    // ── Animation ─────────────────────────────────────────────────────────

    pub(crate) fn attach_animation(&mut self, id: ElementId, property: &Rc<DependencyProperty>, value: Rc<RefCell<AnimatedValue>>) {
        self.element_mut(id).values.entry(property).animated = Some(value);
    }

    /// Detaches `value` if it is still the animation driving `property`.
    pub(crate) fn detach_animation(&mut self, id: ElementId, property: &Rc<DependencyProperty>, value: &Rc<RefCell<AnimatedValue>>) {
        let entry = self.element_mut(id).values.entry(property);
        if entry.animated.as_ref().is_some_and(|a| Rc::ptr_eq(a, value)) {
            entry.animated = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingExpression, DataSource, ExpressionCache, PropertyBag};
    use crate::element::Element;
    use crate::registry::{TypeDescriptor, TypeRegistry};
    use crate::value::ValueType;

    struct Fixture {
        tree: ElementTree,
        id: ElementId,
        width: Rc<DependencyProperty>,
        text: Rc<DependencyProperty>,
    }

    fn fixture() -> Fixture {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeDescriptor::new("Box")
                .property_with_default("Width", ValueType::Double, Value::Double(10.0))
                .property("Text", ValueType::String),
        );
        let registry = Rc::new(registry);
        let width = registry.find_property("Width", "Box").unwrap();
        let text = registry.find_property("Text", "Box").unwrap();
        let mut tree = ElementTree::new(registry);
        let id = tree.insert(Element::new("Box"));
        Fixture { tree, id, width, text }
    }

    fn trigger(source: ElementId, n: usize) -> TriggerId {
        TriggerId { source, rule_set: 0, index: n }
    }

    #[test]
    fn default_then_styled_then_local() {
        let Fixture { mut tree, id, width, .. } = fixture();
        assert_eq!(tree.get_value(id, &width), Value::Double(10.0));
        tree.set_styled_value(id, &width, Value::Double(20.0), false).unwrap();
        assert_eq!(tree.get_value(id, &width), Value::Double(20.0));
        tree.set_value(id, &width, Value::Int(30)).unwrap();
        assert_eq!(tree.get_value(id, &width), Value::Double(30.0));
        assert!(tree.has_defined_value(id, &width));
    }

    #[test]
    fn important_styles_beat_local_values() {
        let Fixture { mut tree, id, width, .. } = fixture();
        tree.set_value(id, &width, Value::Double(30.0)).unwrap();
        tree.set_styled_value(id, &width, Value::Double(40.0), true).unwrap();
        assert_eq!(tree.get_value(id, &width), Value::Double(40.0));
        tree.clear_styled_values(id);
        assert_eq!(tree.get_value(id, &width), Value::Double(30.0));
    }

    #[test]
    fn triggers_layer_over_styles_and_revert() {
        let Fixture { mut tree, id, width, .. } = fixture();
        tree.set_styled_value(id, &width, Value::Double(20.0), false).unwrap();
        tree.set_triggered_value(id, &width, trigger(id, 0), Value::Double(50.0), false).unwrap();
        assert_eq!(tree.get_value(id, &width), Value::Double(50.0));
        tree.clear_triggered_values(id, trigger(id, 0));
        assert_eq!(tree.get_value(id, &width), Value::Double(20.0));
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let Fixture { mut tree, id, width, .. } = fixture();
        let err = tree.set_value(id, &width, Value::Bool(true)).unwrap_err();
        assert!(matches!(err, PropertyError::TypeMismatch { .. }));
    }

    #[test]
    fn data_source_binding_reads_live_values() {
        let Fixture { mut tree, id, text, .. } = fixture();
        let bag = Rc::new(PropertyBag::new("Player").with("Score", Value::Double(12.5)));
        tree.set_data_source(id, Some(bag.clone() as Rc<dyn DataSource>));
        let mut cache = ExpressionCache::new();
        let name = cache.register("Player", &BindingExpression::parse("{{Score}}").unwrap());
        let wrapper = cache.wrapper("Player").unwrap();
        tree.bind_value(id, &text, &wrapper, &format!("{{{{{name}}}}}:F1"), Culture::invariant()).unwrap();
        assert_eq!(tree.get_value(id, &text), Value::String("12.5".into()));
        bag.set("Score", Value::Double(3.0));
        assert_eq!(tree.get_value(id, &text), Value::String("3.0".into()));
    }

    #[test]
    fn unknown_compiled_name_is_an_error() {
        let Fixture { mut tree, id, text, .. } = fixture();
        let wrapper = DataSourceWrapper::new("Player");
        let err = tree.bind_value(id, &text, &wrapper, "{{Score}}", Culture::invariant()).unwrap_err();
        assert!(matches!(err, UvmlError::MissingCompiledExpression { .. }));
    }
}
