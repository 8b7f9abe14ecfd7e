//! UVML: markup describing element trees.
//!
//! Markup is read by [`reader`], compiled against the type registry into
//! [`Template`]s by [`template`], and turned into live elements by
//! [`instantiate`] through the [`Mutator`]s each template carries.

pub mod instantiate;
pub mod mutator;
pub mod reader;
pub mod template;

pub use instantiate::{instantiate, load, InstantiationContext, TemplateInstance, CONTENT_PRESENTER};
pub use mutator::{Mutator, MutatorValue, PrecomputedValue, process_precomputed_value};
pub use reader::{parse_xml, XmlElement};
pub use template::{compile_template, compile_template_str, CompiledTemplate, Template, TemplateValue, DATA_TEMPLATE};
