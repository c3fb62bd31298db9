//! Core type definitions for ldapdb
//!
//! This module defines the distinguished name used as the directory key
//! and the search scopes a client may request.

use crate::error::Error;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distinguished name of a directory entry, kept in canonical (lower) case.
///
/// Two names that differ only in case compare equal, so every lookup and
/// every stored key goes through [`Dn::new`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(from = "String")]
#[display("{_0}")]
pub struct Dn(String);

impl Dn {
    /// Normalize a DN string into its canonical form
    pub fn new(dn: impl AsRef<str>) -> Self {
        Self(dn.as_ref().to_lowercase())
    }

    /// Get the DN as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this entry falls under `base` for a whole-subtree search.
    ///
    /// The namespace is flat, so this is a literal string-suffix test with
    /// no RDN boundary check: `dc=abc=com` is within `c=com`.
    #[must_use]
    pub fn is_within(&self, base: &Self) -> bool {
        self.0.ends_with(&base.0)
    }
}

impl From<String> for Dn {
    fn from(dn: String) -> Self {
        Self::new(dn)
    }
}

impl From<&str> for Dn {
    fn from(dn: &str) -> Self {
        Self::new(dn)
    }
}

impl AsRef<str> for Dn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dn({:?})", self.0)
    }
}

/// Search scope requested by the client
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Only the entry named by the base DN
    BaseObject,
    /// Immediate children of the base DN (not supported by any backend)
    SingleLevel,
    /// The base DN and everything below it
    WholeSubtree,
}

impl Scope {
    /// Decode the scope enumeration of a SearchRequest
    pub fn from_wire(value: i64) -> Result<Self, Error> {
        match value {
            0 => Ok(Self::BaseObject),
            1 => Ok(Self::SingleLevel),
            2 => Ok(Self::WholeSubtree),
            other => Err(Error::unwilling_to_perform(format!("unknown scope {other}"))),
        }
    }

    /// Wire value of this scope
    #[must_use]
    pub const fn to_wire(self) -> i64 {
        match self {
            Self::BaseObject => 0,
            Self::SingleLevel => 1,
            Self::WholeSubtree => 2,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BaseObject => write!(f, "base"),
            Self::SingleLevel => write!(f, "one"),
            Self::WholeSubtree => write!(f, "sub"),
        }
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base" | "baseobject" => Ok(Self::BaseObject),
            "one" | "onelevel" | "singlelevel" => Ok(Self::SingleLevel),
            "sub" | "subtree" | "wholesubtree" => Ok(Self::WholeSubtree),
            other => Err(Error::unwilling_to_perform(format!("unknown scope {other}"))),
        }
    }
}
