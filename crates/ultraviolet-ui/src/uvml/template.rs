//! Compiling markup into templates.
//!
//! Every member name in the markup is resolved against the type registry
//! here, so instantiation never looks anything up by string again. Binding
//! expressions are registered on the data-source wrapper of the template's
//! data-source type and stored by compiled member name.

use std::collections::HashSet;
use std::rc::Rc;

use crate::binding::{BindingExpression, DataSourceWrapper, ExpressionCache};
use crate::error::UvmlError;
use crate::registry::{DependencyProperty, TypeRegistry};
use crate::uvml::mutator::Mutator;
use crate::uvml::reader::{parse_xml, XmlElement};
use crate::value::ValueType;

/// Element name of opaque, uninstantiated markup.
pub const DATA_TEMPLATE: &str = "DataTemplate";

/// What a mutator assigns, before instantiation.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    /// Text read as `value_type` when instantiated. `[[KEY]]` looks the
    /// text up in the localization database and `{{null}}` yields the
    /// type's default.
    Literal { text: String, value_type: ValueType },
    /// A named element of the same instantiation. Element-typed members
    /// always take one; `Object` members only when the text is a name the
    /// markup declares.
    ElementReference(String),
    /// Passed through without instantiating.
    DataTemplate(Rc<XmlElement>),
    Template(Rc<Template>),
}

/// One element to construct and the mutators to run on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub type_name: String,
    pub name: Option<String>,
    pub classes: Vec<String>,
    /// Applied in declaration order.
    pub mutators: Vec<Mutator>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    pub root: Rc<Template>,
    pub data_source_type: Option<String>,
    /// Wrapper holding every binding the template uses.
    pub wrapper: Option<Rc<DataSourceWrapper>>,
}

/// Compiles `markup`. Bindings are only allowed when `data_source_type` is
/// given.
pub fn compile_template(
    registry: &TypeRegistry,
    cache: &mut ExpressionCache,
    markup: &XmlElement,
    data_source_type: Option<&str>,
) -> Result<CompiledTemplate, UvmlError> {
    let mut names = HashSet::new();
    declared_names(markup, &mut names);
    let mut compiler = TemplateCompiler { registry, cache, data_source_type, names };
    let root = Rc::new(compiler.template(markup)?);
    let wrapper = data_source_type.and_then(|ty| compiler.cache.wrapper(ty));
    log::debug!(
        "compiled template <{}> with {} bindings",
        root.type_name,
        wrapper.as_ref().map_or(0, |w| w.len())
    );
    Ok(CompiledTemplate { root, data_source_type: data_source_type.map(str::to_string), wrapper })
}

pub fn compile_template_str(
    registry: &TypeRegistry,
    cache: &mut ExpressionCache,
    src: &str,
    data_source_type: Option<&str>,
) -> Result<CompiledTemplate, UvmlError> {
    compile_template(registry, cache, &parse_xml(src)?, data_source_type)
}

/// `Name` attributes of the elements instantiated with `xml`. Data
/// templates are not instantiated, so their names are skipped.
fn declared_names(xml: &XmlElement, names: &mut HashSet<String>) {
    if xml.name == DATA_TEMPLATE {
        return;
    }
    if let Some((_, name)) = xml.attributes.iter().find(|(attr, _)| attr == "Name") {
        names.insert(name.clone());
    }
    for child in &xml.children {
        declared_names(child, names);
    }
}

struct TemplateCompiler<'a> {
    registry: &'a TypeRegistry,
    cache: &'a mut ExpressionCache,
    data_source_type: Option<&'a str>,
    names: HashSet<String>,
}

impl TemplateCompiler<'_> {
    fn markup_error(xml: &XmlElement, message: impl Into<String>) -> UvmlError {
        UvmlError::Markup { line: xml.line, col: 1, message: message.into() }
    }

    fn object(&mut self, xml: &XmlElement) -> Result<TemplateValue, UvmlError> {
        if xml.name == DATA_TEMPLATE {
            return Ok(TemplateValue::DataTemplate(Rc::new(xml.clone())));
        }
        Ok(TemplateValue::Template(Rc::new(self.template(xml)?)))
    }

    fn template(&mut self, xml: &XmlElement) -> Result<Template, UvmlError> {
        if xml.property_element().is_some() {
            return Err(Self::markup_error(xml, format!("property element <{}> outside its owner", xml.name)));
        }
        let ty = xml.name.as_str();
        if !self.registry.contains(ty) {
            return Err(UvmlError::UnknownType(ty.to_string()));
        }
        let mut template =
            Template { type_name: ty.to_string(), name: None, classes: Vec::new(), mutators: Vec::new(), line: xml.line };

        for (attr, value) in &xml.attributes {
            match attr.as_str() {
                "Name" => template.name = Some(value.clone()),
                "Class" => template.classes = value.split_whitespace().map(str::to_string).collect(),
                a if a.starts_with("xmlns") => {}
                _ => template.mutators.push(self.attribute(ty, attr, value)?),
            }
        }

        let mut content = Vec::new();
        for child in &xml.children {
            match child.property_element() {
                Some((owner, member)) => template.mutators.push(self.property_element(ty, owner, member, child)?),
                None => content.push(child),
            }
        }
        if !content.is_empty() || xml.text.is_some() {
            template.mutators.push(self.content(ty, xml, &content)?);
        }
        Ok(template)
    }

    // ── Members ───────────────────────────────────────────────────────────

    fn attribute(&mut self, ty: &str, attr: &str, text: &str) -> Result<Mutator, UvmlError> {
        if let Some((owner, name)) = attr.split_once('.') {
            let property = self.attached(owner, name)?;
            return self.property_value(property, text);
        }
        let r = self.registry;
        if let Some(property) = r.find_property(attr, ty) {
            return self.property_value(property, text);
        }
        if let Some(event) = r.find_event(attr, ty) {
            return Ok(Mutator::AddRoutedEventHandler { event, handler: text.to_string() });
        }
        if r.has_standard_event(attr, ty) {
            return Ok(Mutator::AddStandardEventHandler { event: attr.to_string(), handler: text.to_string() });
        }
        if let Some(value_type) = r.find_standard_property(attr, ty) {
            let value = TemplateValue::Literal { text: text.to_string(), value_type };
            return Ok(Mutator::SetStandardProperty { name: attr.to_string(), value });
        }
        Err(UvmlError::UnknownMember { owner: ty.to_string(), name: attr.to_string() })
    }

    fn attached(&self, owner: &str, name: &str) -> Result<Rc<DependencyProperty>, UvmlError> {
        if !self.registry.contains(owner) {
            return Err(UvmlError::UnknownType(owner.to_string()));
        }
        self.registry
            .find_property(name, owner)
            .ok_or_else(|| UvmlError::UnknownMember { owner: owner.to_string(), name: name.to_string() })
    }

    fn property_value(&mut self, property: Rc<DependencyProperty>, text: &str) -> Result<Mutator, UvmlError> {
        if BindingExpression::is_binding(text) {
            let expression = BindingExpression::parse(text)?;
            let Some(data_source_type) = self.data_source_type else {
                return Err(UvmlError::InvalidBindingExpression(text.to_string()));
            };
            let compiled_name = self.cache.register(data_source_type, &expression);
            return Ok(Mutator::BindDependencyProperty { property, compiled_name, format: expression.format });
        }
        let value = match property.value_type {
            ValueType::Element => TemplateValue::ElementReference(text.trim().to_string()),
            ValueType::Object if self.names.contains(text.trim()) => TemplateValue::ElementReference(text.trim().to_string()),
            value_type => TemplateValue::Literal { text: text.to_string(), value_type },
        };
        Ok(Mutator::SetDependencyProperty { property, value })
    }

    /// `<Owner.Member>` children: a collection, or a single value.
    fn property_element(&mut self, ty: &str, owner: &str, member: &str, xml: &XmlElement) -> Result<Mutator, UvmlError> {
        let own = owner == ty || self.registry.is_a(ty, owner);
        if own && let Some(collection) = self.registry.find_collection(member, ty) {
            let items = xml.children.iter().map(|c| self.object(c)).collect::<Result<_, _>>()?;
            return Ok(Mutator::PropertyCollectionItems { collection: collection.name.to_string(), items });
        }
        let property = match own {
            true => self.registry.find_property(member, ty),
            false => Some(self.attached(owner, member)?),
        };
        if let Some(property) = property {
            return match (xml.children.as_slice(), &xml.text) {
                ([child], None) => Ok(Mutator::SetDependencyProperty { property, value: self.object(child)? }),
                ([], Some(text)) => self.property_value(property, text),
                _ => Err(Self::markup_error(xml, format!("<{}> must hold exactly one value", xml.name))),
            };
        }
        if let (Some(value_type), Some(text)) = (self.registry.find_standard_property(member, ty), &xml.text) {
            let value = TemplateValue::Literal { text: text.clone(), value_type };
            return Ok(Mutator::SetStandardProperty { name: member.to_string(), value });
        }
        Err(UvmlError::UnknownMember { owner: ty.to_string(), name: member.to_string() })
    }

    /// Child elements and text that are not property elements go to the
    /// instance itself when it is a collection, else to its content member.
    fn content(&mut self, ty: &str, xml: &XmlElement, children: &[&XmlElement]) -> Result<Mutator, UvmlError> {
        let r = self.registry;
        if r.is_collection_type(ty) {
            if xml.text.is_some() {
                return Err(Self::markup_error(xml, format!("collection <{ty}> cannot hold text")));
            }
            let items = children.iter().map(|c| self.object(c)).collect::<Result<_, _>>()?;
            return Ok(Mutator::SelfCollectionItems { items });
        }
        let Some(member) = r.content_property(ty) else {
            return Err(UvmlError::UnknownMember { owner: ty.to_string(), name: "(content)".into() });
        };
        if let Some(collection) = r.find_collection(member, ty) {
            let items = children.iter().map(|c| self.object(c)).collect::<Result<_, _>>()?;
            return Ok(Mutator::PropertyCollectionItems { collection: collection.name.to_string(), items });
        }
        if let Some(property) = r.find_property(member, ty) {
            return match (children, &xml.text) {
                ([child], None) => Ok(Mutator::SetDependencyProperty { property, value: self.object(child)? }),
                ([], Some(text)) => self.property_value(property, text),
                _ => Err(Self::markup_error(xml, format!("<{ty}> holds a single content value"))),
            };
        }
        match (r.find_standard_property(member, ty), children, &xml.text) {
            (Some(value_type), [], Some(text)) => Ok(Mutator::SetStandardProperty {
                name: member.to_string(),
                value: TemplateValue::Literal { text: text.clone(), value_type },
            }),
            _ => Err(UvmlError::UnknownMember { owner: ty.to_string(), name: member.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls;

    fn compile(src: &str, data_source_type: Option<&str>) -> Result<CompiledTemplate, UvmlError> {
        let registry = controls::standard_registry();
        compile_template_str(&registry, &mut ExpressionCache::new(), src, data_source_type)
    }

    fn mutators(t: &CompiledTemplate) -> &[Mutator] {
        &t.root.mutators
    }

    #[test]
    fn attributes_map_to_mutators() {
        let t = compile(
            r#"<Button Name="ok" Class="primary big" Width="12.5" Grid.Row="1" Click="OnClick" Initialized="OnInit" Tag="x"/>"#,
            None,
        )
        .unwrap();
        assert_eq!(t.root.name.as_deref(), Some("ok"));
        assert_eq!(t.root.classes, vec!["primary", "big"]);
        let kinds: Vec<&str> = mutators(&t).iter().map(Mutator::kind).collect();
        assert_eq!(
            kinds,
            vec!["set-property", "set-property", "add-routed-handler", "add-standard-handler", "set-standard"]
        );
    }

    #[test]
    fn bindings_register_on_the_wrapper() {
        let t = compile(
            r#"<StackPanel><TextBlock Text="{{Name}}"/><TextBlock Text="{{Score:F1}}"/><TextBlock Text="{{Name}}"/></StackPanel>"#,
            Some("Player"),
        )
        .unwrap();
        let wrapper = t.wrapper.unwrap();
        assert_eq!(wrapper.len(), 2);
        assert_eq!(wrapper.compiled_name_for("Score"), Some("__Expression1"));
    }

    #[test]
    fn bindings_need_a_data_source_type() {
        assert_eq!(
            compile(r#"<TextBlock Text="{{Name}}"/>"#, None).unwrap_err(),
            UvmlError::InvalidBindingExpression("{{Name}}".into())
        );
        assert!(matches!(
            compile(r#"<TextBlock Text="{{1x}}"/>"#, Some("P")),
            Err(UvmlError::InvalidBindingExpression(_))
        ));
    }

    #[test]
    fn content_goes_to_the_content_member() {
        let t = compile("<Grid><Button/><Border><TextBlock>hi</TextBlock></Border></Grid>", None).unwrap();
        let Mutator::PropertyCollectionItems { collection, items } = &mutators(&t)[0] else {
            panic!("expected collection items")
        };
        assert_eq!(collection, "Children");
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn property_elements_and_data_templates() {
        let t = compile(
            "<ListBox><ListBox.ItemTemplate><DataTemplate><TextBlock/></DataTemplate></ListBox.ItemTemplate></ListBox>",
            None,
        )
        .unwrap();
        let Mutator::SetDependencyProperty { value: TemplateValue::DataTemplate(xml), .. } = &mutators(&t)[0] else {
            panic!("expected data template")
        };
        assert_eq!(xml.children[0].name, "TextBlock");
    }

    #[test]
    fn element_typed_properties_take_references() {
        let t = compile(r#"<Border Child="other"/>"#, None).unwrap();
        assert!(matches!(
            &mutators(&t)[0],
            Mutator::SetDependencyProperty { value: TemplateValue::ElementReference(name), .. } if name == "other"
        ));
    }

    #[test]
    fn object_content_is_a_reference_only_to_declared_names() {
        let literal = |t: &CompiledTemplate| match &mutators(t)[0] {
            Mutator::SetDependencyProperty { value: TemplateValue::Literal { text, value_type }, .. } => {
                assert_eq!(*value_type, ValueType::Object);
                text.clone()
            }
            other => panic!("expected a literal, got {other:?}"),
        };
        assert_eq!(literal(&compile("<Button>OK</Button>", None).unwrap()), "OK");
        assert_eq!(literal(&compile(r#"<Button Content="OK"/>"#, None).unwrap()), "OK");

        let t = compile(r#"<StackPanel><Button Content="label"/><TextBlock Name="label"/></StackPanel>"#, None).unwrap();
        let Mutator::PropertyCollectionItems { items, .. } = &mutators(&t)[0] else { panic!("expected children") };
        let TemplateValue::Template(button) = &items[0] else { panic!("expected a nested template") };
        assert!(matches!(
            &button.mutators[0],
            Mutator::SetDependencyProperty { value: TemplateValue::ElementReference(name), .. } if name == "label"
        ));
    }

    #[test]
    fn unknown_names_fail() {
        assert_eq!(compile("<Slider/>", None).unwrap_err(), UvmlError::UnknownType("Slider".into()));
        assert_eq!(
            compile(r#"<Button Wobble="1"/>"#, None).unwrap_err(),
            UvmlError::UnknownMember { owner: "Button".into(), name: "Wobble".into() }
        );
        assert_eq!(compile(r#"<Button Dock.Side="1"/>"#, None).unwrap_err(), UvmlError::UnknownType("Dock".into()));
        assert!(matches!(compile("<ItemCollection>text</ItemCollection>", None), Err(UvmlError::Markup { .. })));
    }
}
