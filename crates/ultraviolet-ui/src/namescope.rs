use std::collections::HashMap;

use crate::element::ElementId;
use crate::error::UvmlError;

/// Name-to-element map for one template instantiation. Elements register
/// as they are constructed; references resolve when mutators apply.
#[derive(Debug, Clone, Default)]
pub struct Namescope {
    names: HashMap<String, ElementId>,
}

impl Namescope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, element: ElementId) -> Result<(), UvmlError> {
        if self.names.contains_key(name) {
            return Err(UvmlError::DuplicateName(name.to_string()));
        }
        self.names.insert(name.to_string(), element);
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<ElementId> {
        self.names.get(name).copied()
    }

    pub fn resolve(&self, name: &str) -> Result<ElementId, UvmlError> {
        self.find(name).ok_or_else(|| UvmlError::ElementNotFound(name.to_string()))
    }

    /// Drops every name registered for one of `elements`.
    pub fn forget(&mut self, elements: &[ElementId]) {
        self.names.retain(|_, id| !elements.contains(id));
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
