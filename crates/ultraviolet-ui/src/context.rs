use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::culture::{Culture, CultureScope};
use crate::error::UvmlError;
use crate::localization::LocalizationDatabase;
use crate::registry::{Instantiator, TypeRegistry};

/// Services shared by everything built on one element tree: the type
/// registry, the localization database, the current culture, and the cache
/// of synthesized instantiators.
pub struct UiContext {
    registry: Rc<TypeRegistry>,
    localization: Rc<LocalizationDatabase>,
    culture: CultureScope,
    instantiators: RefCell<HashMap<String, Instantiator>>,
}

impl UiContext {
    pub fn new(registry: Rc<TypeRegistry>) -> Self {
        Self {
            registry,
            localization: Rc::new(LocalizationDatabase::new()),
            culture: CultureScope::default(),
            instantiators: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_localization(mut self, localization: LocalizationDatabase) -> Self {
        self.localization = Rc::new(localization);
        self
    }

    pub fn with_culture(mut self, culture: Culture) -> Self {
        self.culture = CultureScope::new(culture);
        self
    }

    pub fn registry(&self) -> &Rc<TypeRegistry> {
        &self.registry
    }

    pub fn localization(&self) -> &LocalizationDatabase {
        &self.localization
    }

    pub fn culture(&self) -> &CultureScope {
        &self.culture
    }

    /// Instantiator for `ty`, synthesized on first use and cached.
    pub fn instantiator(&self, ty: &str) -> Result<Instantiator, UvmlError> {
        if let Some(found) = self.instantiators.borrow().get(ty) {
            return Ok(found.clone());
        }
        let created = self.registry.select_constructor(ty)?;
        self.instantiators.borrow_mut().insert(ty.to_string(), created.clone());
        Ok(created)
    }
}

impl std::fmt::Debug for UiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiContext")
            .field("culture", &self.culture.current())
            .field("instantiators", &self.instantiators.borrow().len())
            .finish()
    }
}
