//! Scope interpretation for search requests.

use crate::backend::ResultSink;
use crate::filter::FilterEvaluator;
use ldapdb_common::{Dn, Error, Result, Scope};
use ldapdb_store::Directory;
use tracing::debug;

/// Run a search over an already refreshed directory.
///
/// Returns the number of entries sent.
pub fn search(
    directory: &Directory,
    base: &Dn,
    scope: Scope,
    filter: &dyn FilterEvaluator,
    sink: &mut dyn ResultSink,
) -> Result<usize> {
    debug!("Search: base={}, scope={}", base, scope);

    match scope {
        Scope::BaseObject => {
            let entry = directory
                .get(base)
                .ok_or_else(|| Error::no_such_object(base.as_str()))?;
            let matched = filter.evaluate(entry);
            debug!("Match={}: {}", matched, base);
            if matched {
                sink.send_entry(base, entry);
                Ok(1)
            } else {
                Ok(0)
            }
        }
        Scope::WholeSubtree => {
            let mut sent = 0;
            for (dn, entry) in directory.iter() {
                debug!("Considering {}", dn);
                if !dn.is_within(base) || !filter.evaluate(entry) {
                    continue;
                }
                debug!("Sending {}", dn);
                sink.send_entry(dn, entry);
                sent += 1;
            }
            Ok(sent)
        }
        Scope::SingleLevel => Err(Error::unwilling_to_perform("OneLevel not implemented")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SearchResults;
    use crate::filter::Filter;
    use ldapdb_store::Entry;

    fn directory() -> Directory {
        [
            (
                Dn::new("dc=example,dc=com"),
                Entry::new().with_attribute("objectClass", ["domain"]),
            ),
            (
                Dn::new("cn=bob,dc=example,dc=com"),
                Entry::new()
                    .with_attribute("objectClass", ["person"])
                    .with_attribute("cn", ["bob"]),
            ),
            (
                Dn::new("cn=carol,dc=other,dc=com"),
                Entry::new()
                    .with_attribute("objectClass", ["person"])
                    .with_attribute("cn", ["carol"]),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_base_object_hit() {
        let mut results = SearchResults::new();
        let sent = search(
            &directory(),
            &Dn::new("CN=Bob,DC=Example,DC=Com"),
            Scope::BaseObject,
            &Filter::Any,
            &mut results,
        )
        .unwrap();
        assert_eq!(sent, 1);
        assert_eq!(results.dns(), vec!["cn=bob,dc=example,dc=com"]);
    }

    #[test]
    fn test_base_object_filter_miss() {
        let mut results = SearchResults::new();
        let sent = search(
            &directory(),
            &Dn::new("cn=bob,dc=example,dc=com"),
            Scope::BaseObject,
            &Filter::equals("cn", "carol"),
            &mut results,
        )
        .unwrap();
        assert_eq!(sent, 0);
        assert!(results.is_empty());
    }

    #[test]
    fn test_base_object_missing() {
        let mut results = SearchResults::new();
        let err = search(
            &directory(),
            &Dn::new("cn=nobody,dc=example,dc=com"),
            Scope::BaseObject,
            &Filter::Any,
            &mut results,
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_subtree_restricts_to_base() {
        let mut results = SearchResults::new();
        search(
            &directory(),
            &Dn::new("dc=example,dc=com"),
            Scope::WholeSubtree,
            &Filter::equals("objectClass", "person"),
            &mut results,
        )
        .unwrap();
        assert_eq!(results.dns(), vec!["cn=bob,dc=example,dc=com"]);
    }

    #[test]
    fn test_subtree_includes_base_entry() {
        let mut results = SearchResults::new();
        search(
            &directory(),
            &Dn::new("dc=example,dc=com"),
            Scope::WholeSubtree,
            &Filter::Any,
            &mut results,
        )
        .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_subtree_of_missing_base_is_empty() {
        let mut results = SearchResults::new();
        let sent = search(
            &directory(),
            &Dn::new("dc=nowhere"),
            Scope::WholeSubtree,
            &Filter::Any,
            &mut results,
        )
        .unwrap();
        assert_eq!(sent, 0);
    }

    #[test]
    fn test_subtree_literal_suffix() {
        let dir: Directory = [(Dn::new("dc=abc=com"), Entry::new())].into_iter().collect();
        let mut results = SearchResults::new();
        search(&dir, &Dn::new("c=com"), Scope::WholeSubtree, &Filter::Any, &mut results).unwrap();
        assert_eq!(results.dns(), vec!["dc=abc=com"]);
    }

    #[test]
    fn test_single_level_unsupported() {
        let mut results = SearchResults::new();
        let err = search(
            &directory(),
            &Dn::new("dc=example,dc=com"),
            Scope::SingleLevel,
            &Filter::Any,
            &mut results,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnwillingToPerform(_)));
        assert!(results.is_empty());
    }
}
