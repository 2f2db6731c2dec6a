//! Domain Classifier (SPEC_FULL.md §4.2).
//!
//! Splits a filter's domain mapping into lowercase, punycoded
//! `included` and `excluded` host lists.

use crate::filter::DomainMap;

/// Result of classifying a `DomainMap`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedDomains {
    pub included: Vec<String>,
    pub excluded: Vec<String>,
}

/// Lowercase and punycode a single host. Hosts that are already
/// ASCII-only round-trip unchanged other than case-folding.
pub fn normalize_host(host: &str) -> String {
    let lower = host.to_lowercase();
    idna::domain_to_ascii(&lower).unwrap_or(lower)
}

/// Classify a filter's domain map into included/excluded host lists.
///
/// The empty-key entry is the map's default for domains not otherwise
/// listed; when it is `true`, every `true` entry elsewhere is redundant
/// (the filter already applies everywhere) and is dropped from
/// `included` rather than emitted.
pub fn classify(domains: &DomainMap) -> ClassifiedDomains {
    let default_included = domains.get("").copied().unwrap_or(false);
    let mut out = ClassifiedDomains::default();

    for (host, &applies) in domains {
        if host.is_empty() {
            continue;
        }
        if !applies {
            out.excluded.push(normalize_host(host));
        } else if !default_included {
            out.included.push(normalize_host(host));
        }
    }

    out.included.sort();
    out.excluded.sort();
    out
}

/// True if `candidate` is `base` itself or a strict subdomain of it.
pub fn is_subdomain_or_self(candidate: &str, base: &str) -> bool {
    candidate == base || candidate.ends_with(&format!(".{base}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, bool)]) -> DomainMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn splits_included_and_excluded() {
        let domains = map(&[("foo.com", true), ("bar.foo.com", false)]);
        let classified = classify(&domains);
        assert_eq!(classified.included, vec!["foo.com".to_string()]);
        assert_eq!(classified.excluded, vec!["bar.foo.com".to_string()]);
    }

    #[test]
    fn default_true_makes_included_redundant() {
        let domains = map(&[("", true), ("foo.com", true), ("bar.com", false)]);
        let classified = classify(&domains);
        assert!(classified.included.is_empty());
        assert_eq!(classified.excluded, vec!["bar.com".to_string()]);
    }

    #[test]
    fn punycodes_and_lowercases() {
        let domains = map(&[("\u{1F408}.CAT", true)]);
        let classified = classify(&domains);
        assert_eq!(classified.included, vec!["xn--zn8h.cat".to_string()]);
    }

    #[test]
    fn subdomain_check() {
        assert!(is_subdomain_or_self("foo.com", "foo.com"));
        assert!(is_subdomain_or_self("bar.foo.com", "foo.com"));
        assert!(!is_subdomain_or_self("otherfoo.com", "foo.com"));
    }
}
