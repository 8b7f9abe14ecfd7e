//! Ultraviolet UI — element tree, UVSS styling and UVML templates on top of
//! `ultraviolet-engine`.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use ultraviolet_ui::prelude::*;
//!
//! let mut ui = Presentation::new(Rc::new(standard_registry()), PresentationConfig::default());
//! let root = ui.load_markup(r#"<Grid><Button Name="ok">OK</Button></Grid>"#, None)?;
//! ui.load_stylesheet("Button { Width: 120; }")?;
//!
//! // In your frame callback:
//! let time = frame_clock.advance(delta);
//! ui.update(&time)?;
//! ```
//!
//! # Registering custom elements
//!
//! Describe the type with a [`registry::TypeDescriptor`] and register it next
//! to the standard controls; UVSS rules and UVML markup can then name it:
//!
//! ```rust,ignore
//! let mut registry = standard_registry();
//! registry.register(
//!     TypeDescriptor::new("Gauge")
//!         .base("Control")
//!         .property("Value", ValueType::Double)
//!         .constructor(Constructor::Default(|| Element::new("Gauge"))),
//! );
//! ```

pub mod animation;
pub mod binding;
pub mod context;
pub mod controls;
pub mod culture;
pub mod dependency;
pub mod element;
pub mod error;
pub mod event;
pub mod localization;
pub mod namescope;
pub mod presentation;
pub mod registry;
pub mod style;
pub mod uvml;
pub mod value;

// Top-level re-exports for the common entry point — `use ultraviolet_ui::Presentation`
pub use presentation::{Presentation, PresentationConfig};

/// Everything needed to load, style and drive a UI — import this in host code.
pub mod prelude {
    pub use crate::binding::{DataSource, PropertyBag};
    pub use crate::context::UiContext;
    pub use crate::controls::standard_registry;
    pub use crate::culture::Culture;
    pub use crate::element::{Element, ElementId, ElementTree};
    pub use crate::error::{PresentationError, PropertyError, StylesheetError, UvmlError};
    pub use crate::event::{HandlerTable, RoutedEventArgs};
    pub use crate::localization::LocalizationDatabase;
    pub use crate::presentation::{Presentation, PresentationConfig};
    pub use crate::registry::{Constructor, RoutedEvent, TypeDescriptor, TypeRegistry};
    pub use crate::value::{Value, ValueType};

    // Re-export the engine primitives everyone needs.
    pub use ultraviolet_engine::paint::Color;
    pub use ultraviolet_engine::time::{FrameClock, UpdateTime};
}
