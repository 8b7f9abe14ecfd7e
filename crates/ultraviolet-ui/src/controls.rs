//! The standard control set.
//!
//! Controls carry no behavior of their own here; each is a type descriptor
//! naming its properties, events, collections, and constructors. Layout and
//! rendering belong to the host.

use ultraviolet_engine::paint::Color;

use crate::element::Element;
use crate::registry::{Constructor, RoutedEvent, TypeDescriptor, TypeRegistry};
use crate::value::{Value, ValueType};

pub const VISIBILITY: &[&str] = &["Visible", "Hidden", "Collapsed"];
pub const ORIENTATION: &[&str] = &["Vertical", "Horizontal"];
pub const HORIZONTAL_ALIGNMENT: &[&str] = &["Stretch", "Left", "Center", "Right"];
pub const VERTICAL_ALIGNMENT: &[&str] = &["Stretch", "Top", "Center", "Bottom"];

// ── Constructors ──────────────────────────────────────────────────────────

macro_rules! with_name {
    ($ty:literal) => {
        Constructor::ContextAndName(|_, name| Element::new($ty).with_name(name))
    };
}

macro_rules! with_context {
    ($ty:literal) => {
        Constructor::Context(|_| Element::new($ty))
    };
}

macro_rules! parameterless {
    ($ty:literal) => {
        Constructor::Default(|| Element::new($ty))
    };
}

// ── Registry ──────────────────────────────────────────────────────────────

/// Registry holding every standard control.
pub fn standard_registry() -> TypeRegistry {
    let mut r = TypeRegistry::new();
    register_standard_controls(&mut r);
    r
}

/// Adds the standard controls to `registry`, replacing same-named types.
pub fn register_standard_controls(registry: &mut TypeRegistry) {
    let descriptors = [
        TypeDescriptor::new("FrameworkElement")
            .constructor(parameterless!("FrameworkElement"))
            .property_with_default("Width", ValueType::Double, Value::Double(f64::NAN))
            .property_with_default("Height", ValueType::Double, Value::Double(f64::NAN))
            .property("Margin", ValueType::Thickness)
            .property_with_default("Opacity", ValueType::Double, Value::Double(1.0))
            .property("Visibility", ValueType::Enum(VISIBILITY))
            .property("HorizontalAlignment", ValueType::Enum(HORIZONTAL_ALIGNMENT))
            .property("VerticalAlignment", ValueType::Enum(VERTICAL_ALIGNMENT))
            .property("IsEnabled", ValueType::Bool)
            .standard_property("Tag", ValueType::String)
            .standard_property("ToolTip", ValueType::String)
            .standard_event("Initialized")
            .standard_event("Loaded")
            .routed_event(RoutedEvent::bubble("FrameworkElement", "MouseEnter"))
            .routed_event(RoutedEvent::bubble("FrameworkElement", "MouseLeave"))
            .routed_event(RoutedEvent::bubble("FrameworkElement", "GotFocus"))
            .routed_event(RoutedEvent::bubble("FrameworkElement", "LostFocus")),
        TypeDescriptor::new("Control")
            .base("FrameworkElement")
            .constructor(with_context!("Control"))
            .property("Background", ValueType::Color)
            .property_with_default("Foreground", ValueType::Color, Value::Color(Color::BLACK))
            .property("Padding", ValueType::Thickness)
            .property_with_default("FontSize", ValueType::Double, Value::Double(12.0)),
        // ── Panels ────────────────────────────────────────────────────────
        TypeDescriptor::new("Panel")
            .base("FrameworkElement")
            .property("Background", ValueType::Color)
            .collection("Children", true)
            .content_property("Children"),
        TypeDescriptor::new("Grid")
            .base("Panel")
            .constructor(with_name!("Grid"))
            .attached_property("Row", ValueType::Int)
            .attached_property("Column", ValueType::Int)
            .attached_property("RowSpan", ValueType::Int)
            .attached_property("ColumnSpan", ValueType::Int),
        TypeDescriptor::new("StackPanel")
            .base("Panel")
            .constructor(with_context!("StackPanel"))
            .constructor(parameterless!("StackPanel"))
            .property("Orientation", ValueType::Enum(ORIENTATION)),
        TypeDescriptor::new("Canvas")
            .base("Panel")
            .constructor(parameterless!("Canvas"))
            .attached_property("Left", ValueType::Double)
            .attached_property("Top", ValueType::Double),
        // ── Content ───────────────────────────────────────────────────────
        TypeDescriptor::new("Border")
            .base("FrameworkElement")
            .constructor(with_name!("Border"))
            .property("Child", ValueType::Element)
            .property("Background", ValueType::Color)
            .property("BorderBrush", ValueType::Color)
            .property("BorderThickness", ValueType::Thickness)
            .content_property("Child"),
        TypeDescriptor::new("TextBlock")
            .base("FrameworkElement")
            .constructor(with_name!("TextBlock"))
            .property("Text", ValueType::String)
            .property_with_default("Foreground", ValueType::Color, Value::Color(Color::BLACK))
            .property_with_default("FontSize", ValueType::Double, Value::Double(12.0))
            .content_property("Text"),
        TypeDescriptor::new("Image")
            .base("FrameworkElement")
            .constructor(parameterless!("Image"))
            .property("Source", ValueType::String),
        TypeDescriptor::new("ContentControl")
            .base("Control")
            .constructor(with_name!("ContentControl"))
            .property("Content", ValueType::Object)
            .property("ContentStringFormat", ValueType::String)
            .content_property("Content"),
        TypeDescriptor::new("ContentPresenter")
            .base("FrameworkElement")
            .constructor(with_context!("ContentPresenter"))
            .property("Content", ValueType::Object)
            .property("ContentStringFormat", ValueType::String),
        // ── Interactive ───────────────────────────────────────────────────
        TypeDescriptor::new("Button")
            .base("ContentControl")
            .constructor(with_name!("Button"))
            .property("IsPressed", ValueType::Bool)
            .routed_event(RoutedEvent::bubble("Button", "Click")),
        TypeDescriptor::new("CheckBox")
            .base("ContentControl")
            .constructor(with_name!("CheckBox"))
            .property("IsChecked", ValueType::Bool)
            .routed_event(RoutedEvent::bubble("CheckBox", "Checked"))
            .routed_event(RoutedEvent::bubble("CheckBox", "Unchecked")),
        TypeDescriptor::new("TextBox")
            .base("Control")
            .constructor(with_name!("TextBox"))
            .property("Text", ValueType::String)
            .property("IsReadOnly", ValueType::Bool)
            .routed_event(RoutedEvent::direct("TextBox", "TextChanged")),
        TypeDescriptor::new("ListBox")
            .base("Control")
            .constructor(with_context!("ListBox"))
            .property("ItemTemplate", ValueType::DataTemplate)
            .property_with_default("SelectedIndex", ValueType::Int, Value::Int(-1))
            .collection("Items", true)
            .content_property("Items")
            .routed_event(RoutedEvent::bubble("ListBox", "SelectionChanged")),
        TypeDescriptor::new("ItemCollection").constructor(parameterless!("ItemCollection")).is_collection(),
    ];
    for descriptor in descriptors {
        registry.register(descriptor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UiContext;

    #[test]
    fn controls_inherit_from_framework_element() {
        let r = standard_registry();
        for ty in ["Grid", "StackPanel", "Border", "TextBlock", "Button", "ListBox", "ContentPresenter"] {
            assert!(r.is_a(ty, "FrameworkElement"), "{ty}");
            assert!(r.has_standard_event("Initialized", ty), "{ty}");
        }
        assert!(!r.is_a("ItemCollection", "FrameworkElement"));
    }

    #[test]
    fn content_members() {
        let r = standard_registry();
        assert_eq!(r.content_property("Grid"), Some("Children"));
        assert_eq!(r.content_property("Button"), Some("Content"));
        assert_eq!(r.content_property("ItemCollection"), None);
        assert!(r.is_collection_type("ItemCollection"));
        assert_eq!(r.find_collection("Items", "ListBox").map(|c| c.visual), Some(true));
    }

    #[test]
    fn every_concrete_control_can_be_constructed() {
        let r = std::rc::Rc::new(standard_registry());
        let ctx = UiContext::new(r.clone());
        for ty in ["Grid", "StackPanel", "Canvas", "Border", "TextBlock", "Image", "Button", "CheckBox", "TextBox", "ListBox"] {
            let element = r.select_constructor(ty).unwrap()(&ctx, Some("n"));
            assert_eq!(element.type_name(), ty);
        }
        let grid = r.select_constructor("Grid").unwrap()(&ctx, Some("root"));
        assert_eq!(grid.name(), Some("root"));
        assert!(r.select_constructor("Panel").is_err());
    }

    #[test]
    fn shadowed_members_resolve_to_the_most_derived_owner() {
        let r = standard_registry();
        assert_eq!(r.find_property("Foreground", "TextBlock").map(|p| p.owner), Some("TextBlock"));
        assert_eq!(r.find_property("Foreground", "Button").map(|p| p.owner), Some("Control"));
        assert_eq!(r.find_property("Row", "Grid").map(|p| p.attached), Some(true));
    }
}
