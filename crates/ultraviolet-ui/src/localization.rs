//! In-memory localization service consumed by UVML `[[KEY]]` literals.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::culture::Culture;

/// One localized string: a set of named variants (`singular`, `plural`,
/// ...) plus free-form property tags (`masculine`, `féminin`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalizedString {
    variants: Vec<(String, String)>,
    properties: BTreeSet<String>,
}

impl LocalizedString {
    pub fn new(text: impl Into<String>) -> Self {
        Self { variants: vec![(String::new(), text.into())], properties: BTreeSet::new() }
    }

    pub fn with_variant(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        let name = name.into();
        match self.variants.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = text.into(),
            None => self.variants.push((name, text.into())),
        }
        self
    }

    pub fn with_property(mut self, tag: impl Into<String>) -> Self {
        self.properties.insert(tag.into());
        self
    }

    /// The first variant's text.
    pub fn text(&self) -> &str {
        self.variants.first().map_or("", |(_, t)| t.as_str())
    }

    pub fn variant(&self, name: &str) -> Option<&str> {
        self.variants.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, t)| t.as_str())
    }

    /// `singular` for a count of one, `plural` otherwise; falls back to the
    /// default text when the variant is absent.
    pub fn for_count(&self, count: i64) -> &str {
        let name = if count == 1 { "singular" } else { "plural" };
        self.variant(name).unwrap_or_else(|| self.text())
    }

    pub fn has_property(&self, tag: &str) -> bool {
        self.properties.contains(tag)
    }

    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(String::as_str)
    }
}

impl fmt::Display for LocalizedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Strings keyed by culture name and key.
///
/// Lookup falls back from the full culture name to its language subtag and
/// then to the invariant culture.
#[derive(Debug, Clone, Default)]
pub struct LocalizationDatabase {
    entries: HashMap<String, HashMap<String, LocalizedString>>,
}

impl LocalizationDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, culture: &Culture, key: impl Into<String>, value: LocalizedString) {
        self.entries.entry(culture.name().to_string()).or_default().insert(key.into(), value);
    }

    pub fn with(mut self, culture: &Culture, key: impl Into<String>, value: LocalizedString) -> Self {
        self.insert(culture, key, value);
        self
    }

    pub fn get(&self, culture: &Culture, key: &str) -> Option<&LocalizedString> {
        let language = culture.language();
        [culture.name(), language.as_str(), ""]
            .into_iter()
            .find_map(|name| self.entries.get(name).and_then(|table| table.get(key)))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
