//! Directory entry: attribute name to a deduplicated list of values.
//!
//! An attribute with no values does not exist; every mutation that would
//! leave one empty removes the key instead. None of these operations fail,
//! existence checks belong to the caller.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute map as exchanged with the protocol engine and stored on disk
pub type Attributes = BTreeMap<String, Vec<String>>;

/// A single directory record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Attributes", into = "Attributes")]
pub struct Entry {
    attrs: Attributes,
}

impl Entry {
    /// Create an entry with no attributes
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute (builder style)
    #[must_use]
    pub fn with_attribute<I, V>(mut self, attr: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.add_values(attr, values);
        self
    }

    /// Values of `attr`, empty if the attribute is absent
    #[must_use]
    pub fn get(&self, attr: &str) -> &[String] {
        self.attrs.get(attr).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether the attribute is present
    #[must_use]
    pub fn has_attribute(&self, attr: &str) -> bool {
        self.attrs.contains_key(attr)
    }

    /// All attributes of this entry
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    /// Iterate attribute names and their values
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of attributes
    #[must_use]
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Whether the entry has no attributes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Union `values` into the attribute, skipping ones already present
    pub fn add_values<I, V>(&mut self, attr: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let attr = attr.into();
        let mut merged = self.attrs.remove(&attr).unwrap_or_default();
        for value in values {
            let value = value.into();
            if !merged.contains(&value) {
                merged.push(value);
            }
        }
        if !merged.is_empty() {
            self.attrs.insert(attr, merged);
        }
    }

    /// Remove exactly these values; the attribute goes away once empty
    pub fn remove_values<I, V>(&mut self, attr: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let Some(current) = self.attrs.get_mut(attr) else {
            return;
        };
        for value in values {
            current.retain(|v| v != value.as_ref());
        }
        if current.is_empty() {
            self.attrs.remove(attr);
        }
    }

    /// Overwrite the attribute's values; an empty list deletes it
    pub fn replace_values<I, V>(&mut self, attr: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let attr = attr.into();
        self.attrs.remove(&attr);
        self.add_values(attr, values);
    }

    /// Drop the attribute entirely
    pub fn delete_attribute(&mut self, attr: &str) -> bool {
        self.attrs.remove(attr).is_some()
    }
}

impl From<Attributes> for Entry {
    fn from(attrs: Attributes) -> Self {
        let mut entry = Self::new();
        for (attr, values) in attrs {
            entry.add_values(attr, values);
        }
        entry
    }
}

impl From<Entry> for Attributes {
    fn from(entry: Entry) -> Self {
        entry.attrs
    }
}
