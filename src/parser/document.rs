//! Ordered configuration document

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Keys of one section, in first-appearance order. `None` marks a bare key.
pub type Section = IndexMap<String, Option<String>>;

/// Section name → ordered key map, in first-appearance order
///
/// Serializes as a nested JSON object, e.g.
/// `{"discord": {"clan_identifier": "AB12CD34"}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument {
    sections: IndexMap<String, Section>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a section for writing.
    ///
    /// A new name is appended at the end; an existing name keeps its
    /// position and its keys. Returns `true` when the section already existed.
    pub fn open_section(&mut self, name: &str) -> bool {
        match self.sections.entry(name.to_string()) {
            Entry::Occupied(_) => true,
            Entry::Vacant(slot) => {
                slot.insert(Section::new());
                false
            }
        }
    }

    /// Set a key inside an already opened section.
    ///
    /// Overwrites in place without moving the key. Returns `true` when an
    /// earlier value was replaced; `false` also covers an unknown section,
    /// in which case nothing is written.
    pub fn set(&mut self, section: &str, key: &str, value: Option<String>) -> bool {
        match self.sections.get_mut(section) {
            Some(keys) => keys.insert(key.to_string(), value).is_some(),
            None => false,
        }
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Value of `section.key`; the outer `Option` is presence, the inner one
    /// distinguishes a bare key from `key = value`.
    pub fn get(&self, section: &str, key: &str) -> Option<Option<&str>> {
        self.sections
            .get(section)?
            .get(key)
            .map(|value| value.as_deref())
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections.iter().map(|(name, keys)| (name.as_str(), keys))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
