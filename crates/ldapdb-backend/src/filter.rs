//! Filter evaluation seam
//!
//! Search filters are decoded and evaluated outside the backend; the
//! backend only asks "does this entry match". [`Filter`] is a small
//! built-in expression for callers that have no evaluator of their own.

use ldapdb_common::Error;
use ldapdb_store::Entry;
use std::str::FromStr;

/// Decides whether an entry matches a search filter
pub trait FilterEvaluator: Send + Sync {
    /// Evaluate against the entry's attributes; must be side-effect free
    fn evaluate(&self, entry: &Entry) -> bool;
}

impl<F> FilterEvaluator for F
where
    F: Fn(&Entry) -> bool + Send + Sync,
{
    fn evaluate(&self, entry: &Entry) -> bool {
        self(entry)
    }
}

/// Minimal filter expression
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    /// Matches every entry
    Any,
    /// Attribute has at least one value
    Present(String),
    /// Attribute has a value equal to this one, ignoring ASCII case
    Equals(String, String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// Presence filter
    pub fn present(attr: impl Into<String>) -> Self {
        Self::Present(attr.into())
    }

    /// Equality filter
    pub fn equals(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals(attr.into(), value.into())
    }

    /// Conjunction of `filters`; empty matches everything
    #[must_use]
    pub fn all(filters: Vec<Self>) -> Self {
        match filters.len() {
            0 => Self::Any,
            1 => filters.into_iter().next().unwrap_or(Self::Any),
            _ => Self::And(filters),
        }
    }
}

impl FilterEvaluator for Filter {
    fn evaluate(&self, entry: &Entry) -> bool {
        match self {
            Self::Any => true,
            Self::Present(attr) => entry.has_attribute(attr),
            Self::Equals(attr, value) => entry
                .get(attr)
                .iter()
                .any(|v| v.eq_ignore_ascii_case(value)),
            Self::And(filters) => filters.iter().all(|f| f.evaluate(entry)),
            Self::Or(filters) => filters.iter().any(|f| f.evaluate(entry)),
            Self::Not(filter) => !filter.evaluate(entry),
        }
    }
}

/// Parses `attr=value`, `attr=*`, `!attr=value` and `*`, with optional
/// surrounding parentheses.
impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s
            .strip_prefix('(')
            .and_then(|inner| inner.strip_suffix(')'))
            .unwrap_or(s)
            .trim();

        if s.is_empty() || s == "*" {
            return Ok(Self::Any);
        }
        if let Some(rest) = s.strip_prefix('!') {
            return Ok(Self::Not(Box::new(rest.parse()?)));
        }

        let (attr, value) = s
            .split_once('=')
            .ok_or_else(|| Error::unwilling_to_perform(format!("unsupported filter {s}")))?;
        let attr = attr.trim();
        if attr.is_empty() {
            return Err(Error::unwilling_to_perform(format!("unsupported filter {s}")));
        }
        if value == "*" {
            Ok(Self::present(attr))
        } else {
            Ok(Self::equals(attr, value))
        }
    }
}
