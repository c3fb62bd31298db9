//! The whole directory: a flat map from normalized DN to entry.

use crate::entry::Entry;
use ldapdb_common::Dn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every entry of the directory keyed by canonical DN.
///
/// There is no parent/child index; subtree membership is decided by
/// [`Dn::is_within`] at search time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Directory {
    entries: BTreeMap<Dn, Entry>,
}

impl Directory {
    /// Create an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry
    #[must_use]
    pub fn get(&self, dn: &Dn) -> Option<&Entry> {
        self.entries.get(dn)
    }

    /// Look up an entry for modification
    pub fn get_mut(&mut self, dn: &Dn) -> Option<&mut Entry> {
        self.entries.get_mut(dn)
    }

    /// Whether an entry exists at `dn`
    #[must_use]
    pub fn contains(&self, dn: &Dn) -> bool {
        self.entries.contains_key(dn)
    }

    /// Insert or overwrite an entry, returning the previous one
    pub fn insert(&mut self, dn: Dn, entry: Entry) -> Option<Entry> {
        self.entries.insert(dn, entry)
    }

    /// Remove an entry
    pub fn remove(&mut self, dn: &Dn) -> Option<Entry> {
        self.entries.remove(dn)
    }

    /// Iterate all entries
    pub fn iter(&self) -> impl Iterator<Item = (&Dn, &Entry)> {
        self.entries.iter()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(Dn, Entry)> for Directory {
    fn from_iter<T: IntoIterator<Item = (Dn, Entry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_normalized_on_load() {
        let dir: Directory = serde_json::from_str(
            r#"{"CN=Bob,DC=Example": {"cn": ["bob"]}, "dc=example": {"dc": ["example"]}}"#,
        )
        .unwrap();
        assert_eq!(dir.len(), 2);
        assert!(dir.contains(&Dn::new("cn=bob,dc=example")));
        assert_eq!(dir.get(&Dn::new("Cn=BOB,dc=EXAMPLE")).unwrap().get("cn"), ["bob"]);
    }

    #[test]
    fn test_serialized_shape() {
        let dir: Directory = [(
            Dn::new("cn=bob"),
            Entry::new().with_attribute("mail", ["bob@x.com"]),
        )]
        .into_iter()
        .collect();
        let json = serde_json::to_value(&dir).unwrap();
        assert_eq!(json, serde_json::json!({"cn=bob": {"mail": ["bob@x.com"]}}));
    }
}
