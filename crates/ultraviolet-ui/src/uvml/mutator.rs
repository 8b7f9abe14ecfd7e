//! Mutators: the operations a template runs on a freshly constructed
//! element.
//!
//! Each mutator works in two steps. [`Mutator::instantiate_value`] runs
//! while the target is still initializing and produces its value, which may
//! construct nested elements. [`Mutator::mutate`] runs when the owning
//! template instance is finalized and applies that value to the target.

use std::rc::Rc;

use crate::element::{ElementId, ElementTree};
use crate::error::UvmlError;
use crate::event::EventHandler;
use crate::registry::{DependencyProperty, RoutedEvent};
use crate::uvml::instantiate::{instantiate, InstantiationContext, TemplateInstance};
use crate::uvml::template::TemplateValue;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Mutator {
    SetDependencyProperty { property: Rc<DependencyProperty>, value: TemplateValue },
    /// Binds through the wrapper member `compiled_name`.
    BindDependencyProperty { property: Rc<DependencyProperty>, compiled_name: String, format: Option<String> },
    AddRoutedEventHandler { event: RoutedEvent, handler: String },
    SetStandardProperty { name: String, value: TemplateValue },
    AddStandardEventHandler { event: String, handler: String },
    /// Adds items to a named collection of the target.
    PropertyCollectionItems { collection: String, items: Vec<TemplateValue> },
    /// Adds items to the target, which is itself a collection.
    SelfCollectionItems { items: Vec<TemplateValue> },
}

/// A value computed ahead of mutation.
pub enum PrecomputedValue {
    Value(Value),
    /// A nested element, finalized when the value is consumed.
    Instance(TemplateInstance),
    /// Resolved through the namescope when the value is consumed.
    ElementReference(String),
}

/// What [`Mutator::instantiate_value`] hands to [`Mutator::mutate`].
pub enum MutatorValue {
    Single(PrecomputedValue),
    Items(Vec<PrecomputedValue>),
    Handler(EventHandler),
    /// `{{CompiledName}}` optionally followed by `:Format`.
    Binding(String),
}

impl Mutator {
    pub fn kind(&self) -> &'static str {
        match self {
            Mutator::SetDependencyProperty { .. } => "set-property",
            Mutator::BindDependencyProperty { .. } => "bind-property",
            Mutator::AddRoutedEventHandler { .. } => "add-routed-handler",
            Mutator::SetStandardProperty { .. } => "set-standard",
            Mutator::AddStandardEventHandler { .. } => "add-standard-handler",
            Mutator::PropertyCollectionItems { .. } => "property-collection",
            Mutator::SelfCollectionItems { .. } => "self-collection",
        }
    }

    pub fn instantiate_value(
        &self,
        tree: &mut ElementTree,
        cx: &mut InstantiationContext<'_>,
    ) -> Result<MutatorValue, UvmlError> {
        Ok(match self {
            Mutator::SetDependencyProperty { value, .. } | Mutator::SetStandardProperty { value, .. } => {
                MutatorValue::Single(precompute(value, tree, cx)?)
            }
            Mutator::BindDependencyProperty { compiled_name, format, .. } => {
                let mut expression = format!("{{{{{compiled_name}}}}}");
                if let Some(format) = format {
                    expression.push(':');
                    expression.push_str(format);
                }
                MutatorValue::Binding(expression)
            }
            Mutator::AddRoutedEventHandler { handler, .. } | Mutator::AddStandardEventHandler { handler, .. } => {
                MutatorValue::Handler(cx.handler(handler)?)
            }
            Mutator::PropertyCollectionItems { items, .. } | Mutator::SelfCollectionItems { items } => {
                MutatorValue::Items(items.iter().map(|item| precompute(item, tree, cx)).collect::<Result<_, _>>()?)
            }
        })
    }

    pub fn mutate(
        &self,
        tree: &mut ElementTree,
        cx: &mut InstantiationContext<'_>,
        target: ElementId,
        value: MutatorValue,
    ) -> Result<(), UvmlError> {
        log::trace!("{} on {}", self.kind(), target);
        match (self, value) {
            (Mutator::SetDependencyProperty { property, .. }, MutatorValue::Single(value)) => {
                let nested = matches!(value, PrecomputedValue::Instance(_));
                let value = process_precomputed_value(value, tree, cx)?;
                if let (true, Value::Element(child)) = (nested, &value) {
                    tree.add_child(target, *child);
                }
                tree.set_value(target, property, value)?;
            }
            (Mutator::BindDependencyProperty { property, .. }, MutatorValue::Binding(expression)) => {
                let wrapper = cx.wrapper().ok_or_else(|| UvmlError::MissingCompiledExpression {
                    wrapper: "(none)".into(),
                    expression: expression.clone(),
                })?;
                let culture = cx.culture();
                tree.bind_value(target, property, &wrapper, &expression, culture)?;
            }
            (Mutator::AddRoutedEventHandler { event, .. }, MutatorValue::Handler(handler)) => {
                tree.add_handler(target, event.to_string(), handler);
            }
            (Mutator::AddStandardEventHandler { event, .. }, MutatorValue::Handler(handler)) => {
                tree.add_handler(target, event.clone(), handler);
            }
            (Mutator::SetStandardProperty { name, .. }, MutatorValue::Single(value)) => {
                let value = process_precomputed_value(value, tree, cx)?;
                tree.set_standard(target, name, value)?;
            }
            (Mutator::PropertyCollectionItems { collection, .. }, MutatorValue::Items(items)) => {
                for item in items {
                    let item = collection_item(process_precomputed_value(item, tree, cx)?)?;
                    tree.add_to_collection(target, Some(collection), item)?;
                }
            }
            (Mutator::SelfCollectionItems { .. }, MutatorValue::Items(items)) => {
                for item in items {
                    let item = collection_item(process_precomputed_value(item, tree, cx)?)?;
                    tree.add_to_collection(target, None, item)?;
                }
            }
            (mutator, _) => unreachable!("{} received a value it did not instantiate", mutator.kind()),
        }
        Ok(())
    }
}

fn precompute(
    value: &TemplateValue,
    tree: &mut ElementTree,
    cx: &mut InstantiationContext<'_>,
) -> Result<PrecomputedValue, UvmlError> {
    Ok(match value {
        TemplateValue::Literal { text, value_type } => PrecomputedValue::Value(cx.resolve_literal(text, *value_type)?),
        TemplateValue::ElementReference(name) => PrecomputedValue::ElementReference(name.clone()),
        TemplateValue::DataTemplate(xml) => PrecomputedValue::Value(Value::DataTemplate(xml.clone())),
        TemplateValue::Template(template) => PrecomputedValue::Instance(instantiate(tree, cx, template)?),
    })
}

/// Turns a precomputed value into the value to assign: pending instances
/// are finalized and element references resolved.
pub fn process_precomputed_value(
    value: PrecomputedValue,
    tree: &mut ElementTree,
    cx: &mut InstantiationContext<'_>,
) -> Result<Value, UvmlError> {
    match value {
        PrecomputedValue::Value(value) => Ok(value),
        PrecomputedValue::Instance(mut instance) => instance.finalize(tree, cx).map(Value::Element),
        PrecomputedValue::ElementReference(name) => cx.namescope().resolve(&name).map(Value::Element),
    }
}

fn collection_item(value: Value) -> Result<ElementId, UvmlError> {
    value
        .as_element()
        .ok_or_else(|| UvmlError::InvalidLiteral { text: value.to_string(), expected: "an element".into() })
}
