//! The live element tree.
//!
//! Elements live in an arena owned by [`ElementTree`] and are addressed by
//! [`ElementId`]: a slot index plus the generation the slot had when the
//! element was inserted. Removing an element frees its slot and bumps the
//! generation, so an id outlives its element only as a stale id.
//! [`ElementTree::get`] returns `None` for stale ids; indexing with one
//! panics like any out-of-bounds index.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Index;
use std::rc::Rc;

use crate::binding::DataSource;
use crate::culture::Culture;
use crate::dependency::DependencyValues;
use crate::error::PropertyError;
use crate::event::{EventHandler, RoutedEventArgs};
use crate::registry::{DependencyProperty, TypeRegistry};
use crate::value::Value;

/// Standard event raised when an element leaves its initialization phase.
pub const INITIALIZED_EVENT: &str = "Initialized";

// ── ElementId ─────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    index: u32,
    generation: u32,
}

impl ElementId {
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.index)
    }
}

// ── Element ───────────────────────────────────────────────────────────────

/// One node of the tree: identity, styling hooks, dependency property
/// values, standard members, event handlers, and collections.
pub struct Element {
    type_name: &'static str,
    name: Option<String>,
    classes: Vec<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    templated_parent: Option<ElementId>,
    initializing: bool,
    data_source: Option<Rc<dyn DataSource>>,
    pub(crate) values: DependencyValues,
    standard: HashMap<String, Value>,
    handlers: Vec<(String, EventHandler)>,
    collections: HashMap<String, Vec<ElementId>>,
    visual_states: BTreeMap<String, String>,
}

impl Element {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            name: None,
            classes: Vec::new(),
            parent: None,
            children: Vec::new(),
            templated_parent: None,
            initializing: false,
            data_source: None,
            values: DependencyValues::default(),
            standard: HashMap::new(),
            handlers: Vec::new(),
            collections: HashMap::new(),
            visual_states: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: Option<&str>) -> Self {
        self.name = name.map(str::to_string);
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn templated_parent(&self) -> Option<ElementId> {
        self.templated_parent
    }

    /// Between begin-init and end-init.
    pub fn is_initializing(&self) -> bool {
        self.initializing
    }

    pub fn standard_value(&self, name: &str) -> Option<&Value> {
        self.standard.get(name)
    }

    /// Items of collection `name`; `None` names the element itself when it
    /// is a collection type.
    pub fn collection(&self, name: Option<&str>) -> &[ElementId] {
        self.collections.get(name.unwrap_or("")).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn visual_state(&self, group: &str) -> Option<&str> {
        self.visual_states.get(group).map(String::as_str)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("type", &self.type_name)
            .field("name", &self.name)
            .field("classes", &self.classes)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("visual_states", &self.visual_states)
            .finish_non_exhaustive()
    }
}

// ── ElementTree ───────────────────────────────────────────────────────────

struct Slot {
    generation: u32,
    element: Option<Element>,
}

pub struct ElementTree {
    registry: Rc<TypeRegistry>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl ElementTree {
    pub fn new(registry: Rc<TypeRegistry>) -> Self {
        Self { registry, slots: Vec::new(), free: Vec::new(), live: 0 }
    }

    pub fn registry(&self) -> &Rc<TypeRegistry> {
        &self.registry
    }

    pub fn insert(&mut self, element: Element) -> ElementId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot { generation: 0, element: None });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = ElementId { index, generation: slot.generation };
        log::trace!("inserted {} as {}", element.type_name, id);
        slot.element = Some(element);
        self.live += 1;
        id
    }

    /// Removes `id` and everything beneath it, detaching `id` from its
    /// parent and from the parent's collections. Returns the number of
    /// elements removed; a stale id removes nothing.
    pub fn remove_subtree(&mut self, id: ElementId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        if let Some(parent) = self[id].parent {
            let parent = self.element_mut(parent);
            parent.children.retain(|c| *c != id);
            for items in parent.collections.values_mut() {
                items.retain(|c| *c != id);
            }
        }
        let doomed = self.descendants(id);
        for removed in &doomed {
            let slot = &mut self.slots[removed.index()];
            slot.element = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(removed.index);
        }
        self.live -= doomed.len();
        log::trace!("removed {} element(s) under {}", doomed.len(), id);
        doomed.len()
    }

    /// Live elements.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.element.as_ref())
    }

    pub(crate) fn element_mut(&mut self, id: ElementId) -> &mut Element {
        match self.slots.get_mut(id.index()) {
            Some(Slot { generation, element: Some(element) }) if *generation == id.generation => element,
            _ => panic!("{id} (generation {}) is not in this tree", id.generation),
        }
    }

    // ── Identity ──────────────────────────────────────────────────────────

    pub fn set_name(&mut self, id: ElementId, name: &str) {
        self.element_mut(id).name = Some(name.to_string());
    }

    pub fn add_class(&mut self, id: ElementId, class: &str) {
        let element = self.element_mut(id);
        if !element.has_class(class) {
            element.classes.push(class.to_string());
        }
    }

    pub fn set_templated_parent(&mut self, id: ElementId, parent: Option<ElementId>) {
        self.element_mut(id).templated_parent = parent;
    }

    pub fn is_a(&self, id: ElementId, ty: &str) -> bool {
        self.registry.is_a(self[id].type_name, ty)
    }

    /// `FindByName`: a dependency property visible on `id`'s type, or on
    /// `owner` when the name is owner-qualified.
    pub fn find_by_name(&self, id: ElementId, owner: Option<&str>, name: &str) -> Option<Rc<DependencyProperty>> {
        self.registry.resolve_property(owner, name, self[id].type_name)
    }

    // ── Structure ─────────────────────────────────────────────────────────

    /// Makes `child` the last visual child of `parent`, detaching it from
    /// any previous parent.
    pub fn add_child(&mut self, parent: ElementId, child: ElementId) {
        if let Some(old) = self[child].parent {
            self.element_mut(old).children.retain(|c| *c != child);
        }
        self.element_mut(child).parent = Some(parent);
        self.element_mut(parent).children.push(child);
    }

    /// Visual ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self[id].parent, move |p| self[*p].parent)
    }

    /// `id` and everything beneath it, in pre-order.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self[next].children.iter().rev());
        }
        out
    }

    /// The first element named `name` at or beneath `root`.
    pub fn find_named(&self, root: ElementId, name: &str) -> Option<ElementId> {
        self.descendants(root).into_iter().find(|id| self[*id].name() == Some(name))
    }

    // ── Initialization ────────────────────────────────────────────────────

    pub fn begin_init(&mut self, id: ElementId) {
        self.element_mut(id).initializing = true;
    }

    /// Leaves the initialization phase and raises [`INITIALIZED_EVENT`].
    pub fn end_init(&mut self, id: ElementId) {
        self.element_mut(id).initializing = false;
        let mut args = RoutedEventArgs::new(INITIALIZED_EVENT, id);
        for handler in self.handlers(id, INITIALIZED_EVENT) {
            handler(&mut args);
        }
    }

    // ── Data sources ──────────────────────────────────────────────────────

    pub fn set_data_source(&mut self, id: ElementId, source: Option<Rc<dyn DataSource>>) {
        self.element_mut(id).data_source = source;
    }

    /// The data source of `id` or of its nearest ancestor that has one.
    pub fn data_source(&self, id: ElementId) -> Option<Rc<dyn DataSource>> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|e| self[e].data_source.clone())
    }

    // ── Standard members ──────────────────────────────────────────────────

    pub fn set_standard(&mut self, id: ElementId, name: &str, value: Value) -> Result<(), PropertyError> {
        let type_name = self[id].type_name;
        let ty = self
            .registry
            .find_standard_property(name, type_name)
            .ok_or_else(|| PropertyError::UnknownProperty { element: type_name.to_string(), name: name.to_string() })?;
        let actual = value.kind_name();
        let value = value.coerce(ty, &Culture::invariant()).ok_or_else(|| PropertyError::TypeMismatch {
            owner: type_name.to_string(),
            name: name.to_string(),
            expected: ty.to_string(),
            actual: actual.to_string(),
        })?;
        self.element_mut(id).standard.insert(name.to_string(), value);
        Ok(())
    }

    /// Appends `item` to collection `name` of `id`, or to `id` itself when
    /// `name` is `None` and `id` is a collection type.
    pub fn add_to_collection(&mut self, id: ElementId, name: Option<&str>, item: ElementId) -> Result<(), PropertyError> {
        let type_name = self[id].type_name;
        let visual = match name {
            None if self.registry.is_collection_type(type_name) => true,
            None => {
                return Err(PropertyError::UnknownCollection { element: type_name.to_string(), name: "(self)".into() });
            }
            Some(name) => self
                .registry
                .find_collection(name, type_name)
                .ok_or_else(|| PropertyError::UnknownCollection { element: type_name.to_string(), name: name.to_string() })?
                .visual,
        };
        self.element_mut(id).collections.entry(name.unwrap_or("").to_string()).or_default().push(item);
        if visual {
            self.add_child(id, item);
        }
        Ok(())
    }

    // ── Events ────────────────────────────────────────────────────────────

    pub fn add_handler(&mut self, id: ElementId, event: impl Into<String>, handler: EventHandler) {
        self.element_mut(id).handlers.push((event.into(), handler));
    }

    pub fn handlers(&self, id: ElementId, event: &str) -> Vec<EventHandler> {
        self[id].handlers.iter().filter(|(e, _)| e == event).map(|(_, h)| h.clone()).collect()
    }

    // ── Visual states ─────────────────────────────────────────────────────

    /// Moves `id` to `state` within `group`, returning the previous state.
    pub fn set_visual_state(&mut self, id: ElementId, group: &str, state: &str) -> Option<String> {
        self.element_mut(id).visual_states.insert(group.to_string(), state.to_string())
    }

    /// Pseudo-classes match the name of any current visual state.
    pub fn has_pseudo_class(&self, id: ElementId, name: &str) -> bool {
        self[id].visual_states.values().any(|s| s.eq_ignore_ascii_case(name))
    }
}

impl Index<ElementId> for ElementTree {
    type Output = Element;

    fn index(&self, id: ElementId) -> &Element {
        match self.get(id) {
            Some(element) => element,
            None => panic!("{id} (generation {}) is not in this tree", id.generation),
        }
    }
}

impl fmt::Debug for ElementTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.slots.iter().filter_map(|s| s.element.as_ref())).finish()
    }
}
