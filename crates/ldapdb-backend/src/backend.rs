//! Backend trait and the types exchanged with the protocol engine
//!
//! The protocol engine decodes a request, extracts the DN and arguments,
//! and calls one of the four operations below. Matching entries are
//! streamed back through a [`ResultSink`]; failures come back as
//! [`ldapdb_common::Error`] and are mapped to a result code by the engine.

use crate::filter::FilterEvaluator;
use async_trait::async_trait;
use ldapdb_common::{Dn, Error, Result, Scope};
use ldapdb_store::{Attributes, Entry};

/// Receives search results as they are found
pub trait ResultSink {
    /// Send one SearchResultEntry
    fn send_entry(&mut self, dn: &Dn, entry: &Entry);
}

impl<F> ResultSink for F
where
    F: FnMut(&Dn, &Entry),
{
    fn send_entry(&mut self, dn: &Dn, entry: &Entry) {
        self(dn, entry);
    }
}

/// Sink that keeps every result
#[derive(Debug, Default)]
pub struct SearchResults {
    entries: Vec<(Dn, Entry)>,
}

impl SearchResults {
    /// Create an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collected results in the order they were sent
    #[must_use]
    pub fn entries(&self) -> &[(Dn, Entry)] {
        &self.entries
    }

    /// DNs of the collected results
    #[must_use]
    pub fn dns(&self) -> Vec<&str> {
        self.entries.iter().map(|(dn, _)| dn.as_str()).collect()
    }

    /// Number of results
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was sent
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResultSink for SearchResults {
    fn send_entry(&mut self, dn: &Dn, entry: &Entry) {
        self.entries.push((dn.clone(), entry.clone()));
    }
}

/// One change of a ModifyRequest
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Modification {
    /// Union values into the attribute
    Add { attr: String, values: Vec<String> },
    /// Remove the listed values, or the whole attribute if none are listed
    Delete { attr: String, values: Vec<String> },
    /// Set the attribute to exactly these values (none deletes it)
    Replace { attr: String, values: Vec<String> },
}

impl Modification {
    /// Build an add change
    pub fn add<I, V>(attr: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self::Add {
            attr: attr.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a delete change
    pub fn delete<I, V>(attr: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self::Delete {
            attr: attr.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a replace change
    pub fn replace<I, V>(attr: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self::Replace {
            attr: attr.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Decode the operation enumeration of a ModifyRequest change
    pub fn from_wire(operation: i64, attr: String, values: Vec<String>) -> Result<Self> {
        match operation {
            0 => Ok(Self::Add { attr, values }),
            1 => Ok(Self::Delete { attr, values }),
            2 => Ok(Self::Replace { attr, values }),
            other => Err(Error::unwilling_to_perform(format!(
                "unknown modify operation {other}"
            ))),
        }
    }

    /// Apply this change to an entry
    pub fn apply(&self, entry: &mut Entry) {
        match self {
            Self::Add { attr, values } => entry.add_values(attr.as_str(), values.iter().cloned()),
            Self::Delete { attr, values } if values.is_empty() => {
                entry.delete_attribute(attr);
            }
            Self::Delete { attr, values } => entry.remove_values(attr, values),
            Self::Replace { attr, values } => {
                entry.replace_values(attr.as_str(), values.iter().cloned());
            }
        }
    }
}

/// The operations a directory backend answers.
///
/// Implementations: [`crate::MemoryBackend`] for a single process sharing
/// the directory in RAM, [`crate::FileBackend`] for worker processes that
/// share only the snapshot and lock files.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Stream every entry under `base` (per `scope`) that matches `filter`
    async fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &dyn FilterEvaluator,
        sink: &mut (dyn ResultSink + Send),
    ) -> Result<()>;

    /// Create an entry; fails if one already exists at `dn`
    async fn add(&self, dn: &str, attributes: Attributes) -> Result<()>;

    /// Remove the entry at `dn`
    async fn delete(&self, dn: &str) -> Result<()>;

    /// Apply `changes` in order to the entry at `dn`, all or nothing
    async fn modify(&self, dn: &str, changes: Vec<Modification>) -> Result<()>;

    /// Flush state at orderly shutdown
    async fn shutdown(&self) -> Result<()> {
        // Default: nothing buffered
        Ok(())
    }
}
