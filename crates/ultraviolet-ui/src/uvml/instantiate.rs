//! Template instantiation.
//!
//! [`instantiate`] constructs an element and precomputes every mutator value
//! but leaves the element untouched beyond its initialization hooks. The
//! returned [`TemplateInstance`] applies the mutators when finalized, which
//! is permitted exactly once.

use std::fmt;
use std::rc::Rc;

use crate::binding::{DataSource, DataSourceWrapper};
use crate::context::UiContext;
use crate::culture::Culture;
use crate::element::{ElementId, ElementTree};
use crate::error::UvmlError;
use crate::event::{EventHandler, HandlerTable};
use crate::namescope::Namescope;
use crate::uvml::mutator::MutatorValue;
use crate::uvml::template::{CompiledTemplate, Template};
use crate::value::{Value, ValueType};

/// Type whose `Content` and `ContentStringFormat` follow its templated
/// parent unless set explicitly.
pub const CONTENT_PRESENTER: &str = "ContentPresenter";
const ALIASED_PROPERTIES: [&str; 2] = ["Content", "ContentStringFormat"];

/// Literal that stands for the target type's default value.
const NULL_LITERAL: &str = "{{null}}";

// ── InstantiationContext ──────────────────────────────────────────────────

/// Everything one instantiation resolves against.
pub struct InstantiationContext<'a> {
    ui: &'a UiContext,
    handlers: &'a HandlerTable,
    wrapper: Option<Rc<DataSourceWrapper>>,
    data_source: Option<Rc<dyn DataSource>>,
    templated_parent: Option<ElementId>,
    culture: Option<Culture>,
    namescope: Namescope,
    /// Every element inserted so far, in insertion order.
    created: Vec<ElementId>,
}

impl<'a> InstantiationContext<'a> {
    pub fn new(ui: &'a UiContext, handlers: &'a HandlerTable) -> Self {
        Self {
            ui,
            handlers,
            wrapper: None,
            data_source: None,
            templated_parent: None,
            culture: None,
            namescope: Namescope::new(),
            created: Vec::new(),
        }
    }

    /// Attaches `source` to every instantiated element and binds through
    /// the compiled template's wrapper.
    pub fn with_data_source(mut self, source: Rc<dyn DataSource>, template: &CompiledTemplate) -> Self {
        self.data_source = Some(source);
        self.wrapper = template.wrapper.clone();
        self
    }

    pub fn with_templated_parent(mut self, parent: ElementId) -> Self {
        self.templated_parent = Some(parent);
        self
    }

    /// Reads literals in `culture` instead of the context's current one.
    pub fn with_culture(mut self, culture: Culture) -> Self {
        self.culture = Some(culture);
        self
    }

    pub fn namescope(&self) -> &Namescope {
        &self.namescope
    }

    pub fn wrapper(&self) -> Option<Rc<DataSourceWrapper>> {
        self.wrapper.clone()
    }

    pub fn culture(&self) -> Culture {
        self.ui.culture().current()
    }

    pub(crate) fn handler(&self, name: &str) -> Result<EventHandler, UvmlError> {
        self.handlers.get(name).cloned().ok_or_else(|| UvmlError::InvalidEventHandler(name.to_string()))
    }

    /// Reads `text` as `ty` in the current culture. `[[KEY]]` reads the
    /// localized string for `KEY` instead.
    pub(crate) fn resolve_literal(&self, text: &str, ty: ValueType) -> Result<Value, UvmlError> {
        let text = text.trim();
        if text == NULL_LITERAL {
            return Ok(ty.default_value());
        }
        let culture = self.culture();
        let localized;
        let text = match text.strip_prefix("[[").and_then(|t| t.strip_suffix("]]")) {
            Some(key) => {
                let found = self.ui.localization().get(&culture, key);
                localized = found.ok_or_else(|| UvmlError::MissingLocalization(key.to_string()))?.text().to_string();
                localized.as_str()
            }
            None => text,
        };
        Value::resolve(text, ty, &culture)
            .ok_or_else(|| UvmlError::InvalidLiteral { text: text.to_string(), expected: ty.to_string() })
    }
}

// ── TemplateInstance ──────────────────────────────────────────────────────

struct PendingInitializer {
    template: Rc<Template>,
    values: Vec<MutatorValue>,
    /// The element and every nested element built for its values.
    created: Vec<ElementId>,
}

enum InstanceState {
    Pending(PendingInitializer),
    Finalized,
}

/// A constructed element whose mutators have not run yet.
pub struct TemplateInstance {
    element: ElementId,
    state: InstanceState,
}

impl TemplateInstance {
    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, InstanceState::Finalized)
    }

    /// Runs the mutators in declaration order, aliases content presenters,
    /// and ends initialization. A second call fails with
    /// [`UvmlError::AlreadyFinalized`] and does nothing. When a mutator
    /// fails, the element and everything built for it leave the tree.
    pub fn finalize(&mut self, tree: &mut ElementTree, cx: &mut InstantiationContext<'_>) -> Result<ElementId, UvmlError> {
        let InstanceState::Pending(pending) = std::mem::replace(&mut self.state, InstanceState::Finalized) else {
            return Err(UvmlError::AlreadyFinalized);
        };
        let ui = cx.ui;
        let _culture = cx.culture.clone().map(|c| ui.culture().enter(c));
        let id = self.element;
        let applied = pending
            .template
            .mutators
            .iter()
            .zip(pending.values)
            .try_for_each(|(mutator, value)| mutator.mutate(tree, cx, id, value));
        if let Err(err) = applied {
            discard(tree, &mut cx.namescope, &pending.created);
            return Err(err);
        }
        alias_content_presenter(tree, id);
        tree.end_init(id);
        log::trace!("finalized <{}> as {}", pending.template.type_name, id);
        Ok(id)
    }
}

impl fmt::Debug for TemplateInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateInstance")
            .field("element", &self.element)
            .field("finalized", &self.is_finalized())
            .finish()
    }
}

fn alias_content_presenter(tree: &mut ElementTree, id: ElementId) {
    if !tree.is_a(id, CONTENT_PRESENTER) {
        return;
    }
    let Some(parent) = tree[id].templated_parent() else { return };
    for name in ALIASED_PROPERTIES {
        let (Some(target), Some(source)) = (tree.find_by_name(id, None, name), tree.find_by_name(parent, None, name))
        else {
            continue;
        };
        if !tree.has_defined_value(id, &target) {
            tree.bind_to_templated_parent(id, &target, source);
        }
    }
}

// ── Instantiation ─────────────────────────────────────────────────────────

/// Removes elements a failed instantiation left behind. Elements already
/// removed with an ancestor are skipped.
fn discard(tree: &mut ElementTree, namescope: &mut Namescope, created: &[ElementId]) {
    namescope.forget(created);
    let removed: usize = created.iter().map(|id| tree.remove_subtree(*id)).sum();
    log::debug!("discarded {removed} element(s) of a failed instantiation");
}

/// Constructs the element `template` describes and precomputes its mutator
/// values, recursively constructing nested templates. On failure nothing
/// it constructed stays in the tree.
pub fn instantiate(
    tree: &mut ElementTree,
    cx: &mut InstantiationContext<'_>,
    template: &Rc<Template>,
) -> Result<TemplateInstance, UvmlError> {
    let ui = cx.ui;
    let _culture = cx.culture.clone().map(|c| ui.culture().enter(c));

    let instantiator = ui.instantiator(&template.type_name)?;
    let element = instantiator(ui, template.name.as_deref());
    let mark = cx.created.len();
    let id = tree.insert(element);
    cx.created.push(id);

    match initialize(tree, cx, template, id) {
        Ok(values) => {
            let created = cx.created[mark..].to_vec();
            Ok(TemplateInstance {
                element: id,
                state: InstanceState::Pending(PendingInitializer { template: template.clone(), values, created }),
            })
        }
        Err(err) => {
            let created = cx.created.split_off(mark);
            discard(tree, &mut cx.namescope, &created);
            Err(err)
        }
    }
}

fn initialize(
    tree: &mut ElementTree,
    cx: &mut InstantiationContext<'_>,
    template: &Template,
    id: ElementId,
) -> Result<Vec<MutatorValue>, UvmlError> {
    if let Some(name) = &template.name {
        cx.namescope.register(name, id)?;
        tree.set_name(id, name);
    }
    tree.begin_init(id);
    tree.set_templated_parent(id, cx.templated_parent);
    for class in &template.classes {
        tree.add_class(id, class);
    }
    if let Some(source) = &cx.data_source {
        tree.set_data_source(id, Some(source.clone()));
    }
    log::trace!("instantiated <{}> as {}", template.type_name, id);

    template.mutators.iter().map(|m| m.instantiate_value(tree, cx)).collect()
}

/// Instantiates and finalizes a compiled template in one go.
pub fn load(tree: &mut ElementTree, cx: &mut InstantiationContext<'_>, template: &CompiledTemplate) -> Result<ElementId, UvmlError> {
    instantiate(tree, cx, &template.root)?.finalize(tree, cx)
}
