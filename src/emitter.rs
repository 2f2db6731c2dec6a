//! Rule Emitter (SPEC_FULL.md §4.4).
//!
//! Turns one blocking/whitelist `Filter` into zero or more output
//! `Rule`s: one per required URL scheme, with domain constraints,
//! resource types, and the subdocument top-URL exception applied.

use crate::domain;
use crate::filter::{ContentType, Filter, FilterKind, ThirdParty};
use crate::pattern;
use crate::resource_type::{map_resource_types, select_schemes, TargetResourceType};
use crate::rule::{Action, LoadType, Rule, Trigger};

/// Emit the rules for a single blocking or whitelist filter.
///
/// `extra_excluded` carries hostnames that should be excluded from
/// this rule regardless of the filter's own domain map — e.g.
/// `$genericblock` whitelist domains, which the compiler threads into
/// every generic blocking rule.
pub fn emit_url_rules(filter: &Filter, extra_excluded: &[String]) -> Vec<Rule> {
    debug_assert!(matches!(
        filter.kind,
        FilterKind::Blocking | FilterKind::Whitelist
    ));

    let pattern = match &filter.pattern {
        Some(p) if !p.is_empty() => p,
        _ => return Vec::new(),
    };

    let schemes = select_schemes(filter.content_type);
    if schemes.is_empty() {
        return Vec::new();
    }

    let classified = domain::classify(&filter.domains);
    let included = classified.included;
    let mut excluded = classified.excluded;
    excluded.extend(extra_excluded.iter().cloned());
    excluded.sort();
    excluded.dedup();

    let mut rules = Vec::new();

    let probe = pattern::lower_pattern(pattern, schemes[0].prefix());
    if matches!(filter.kind, FilterKind::Whitelist)
        && filter.content_type.contains(ContentType::DOCUMENT)
        && probe.hostname_only
    {
        let hostname = probe.hostname.clone().expect("hostname_only implies hostname");
        let mut trigger = Trigger::new(".*");
        trigger.if_domain = Some(vec![format!("*{hostname}")]);
        rules.push(Rule::new(trigger, Action::ignore_previous_rules()));

        let other_types = filter.content_type - ContentType::DOCUMENT;
        if other_types.is_empty() {
            return rules;
        }
    }

    let base_resource_types = map_resource_types(filter.content_type);

    for scheme in &schemes {
        let lowered = pattern::lower_pattern(pattern, scheme.prefix());

        let mut url_filter = lowered.regexp.clone();
        if !url_filter.starts_with('^') {
            url_filter = if url_filter.contains("://") {
                format!("^{url_filter}")
            } else {
                format!("^{}.*{}", scheme.prefix(), url_filter)
            };
        }

        let case_sensitive = lowered.case_insensitive_safe || filter.match_case;
        if lowered.case_insensitive_safe && !filter.match_case {
            url_filter = url_filter.to_lowercase();
        }

        let mut resource_types = base_resource_types.clone();
        if matches!(filter.kind, FilterKind::Blocking) && lowered.hostname.is_none() {
            resource_types.retain(|t| *t != TargetResourceType::Document);
        }
        if resource_types.is_empty() {
            continue;
        }

        let mut trigger = Trigger::new(url_filter.clone());
        if case_sensitive {
            trigger.url_filter_is_case_sensitive = Some(true);
        }
        trigger.resource_type = Some(
            resource_types
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
        );
        trigger.load_type = match filter.third_party {
            ThirdParty::Any => None,
            ThirdParty::Required => Some(vec![LoadType::ThirdParty]),
            ThirdParty::Forbidden => Some(vec![LoadType::FirstParty]),
        };

        if !included.is_empty() {
            let mut if_domain = Vec::new();
            for d in &included {
                let subdomain_excluded = matches!(filter.kind, FilterKind::Blocking)
                    && excluded
                        .iter()
                        .any(|e| e != d && domain::is_subdomain_or_self(e, d));
                if subdomain_excluded {
                    if_domain.push(d.clone());
                    let www = format!("www.{d}");
                    if !excluded.contains(&www) {
                        if_domain.push(www);
                    }
                } else {
                    if_domain.push(format!("*{d}"));
                }
            }
            trigger.if_domain = Some(if_domain);
        } else if !excluded.is_empty() {
            trigger.unless_domain = Some(excluded.iter().map(|e| format!("*{e}")).collect());
        } else if matches!(filter.kind, FilterKind::Blocking)
            && filter.content_type.contains(ContentType::SUBDOCUMENT)
            && lowered.hostname.is_some()
        {
            trigger.unless_top_url = Some(vec![url_filter.clone()]);
            if case_sensitive {
                trigger.top_url_filter_is_case_sensitive = Some(true);
            }
        }

        let action = match filter.kind {
            FilterKind::Blocking => Action::block(),
            FilterKind::Whitelist => Action::ignore_previous_rules(),
            _ => unreachable!("element-hide kinds never reach emit_url_rules"),
        };

        rules.push(Rule::new(trigger, action));
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DomainMap;

    #[test]
    fn document_whitelist_on_hostname_only_pattern_emits_bypass() {
        let mut filter = Filter::url(FilterKind::Whitelist, "||example.com^".to_string());
        filter.content_type = ContentType::DOCUMENT;
        let rules = emit_url_rules(&filter, &[]);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].trigger.url_filter, ".*");
        assert_eq!(
            rules[0].trigger.if_domain,
            Some(vec!["*example.com".to_string()])
        );
    }

    #[test]
    fn websocket_only_filter() {
        let mut filter = Filter::url(FilterKind::Blocking, "foo".to_string());
        filter.content_type = ContentType::WEBSOCKET;
        let rules = emit_url_rules(&filter, &[]);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].trigger.url_filter, "^wss?://.*foo");
        assert_eq!(rules[0].trigger.resource_type, Some(vec!["raw".to_string()]));
    }

    #[test]
    fn webrtc_only_filter_splits_into_stun_and_turn() {
        let mut filter = Filter::url(FilterKind::Blocking, "foo".to_string());
        filter.content_type = ContentType::WEBRTC;
        let rules = emit_url_rules(&filter, &[]);
        assert_eq!(rules.len(), 2);
        assert!(rules[0].trigger.url_filter.starts_with("^stuns?:"));
        assert!(rules[1].trigger.url_filter.starts_with("^turns?:"));
    }

    #[test]
    fn default_blocking_hostname_filter_gets_unless_top_url() {
        let filter = Filter::url(FilterKind::Blocking, "||example.com".to_string());
        let rules = emit_url_rules(&filter, &[]);
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(
            rule.trigger.url_filter,
            "^[^:]+:(//)?([^/]+\\.)?example\\.com"
        );
        assert_eq!(rule.trigger.url_filter_is_case_sensitive, Some(true));
        assert_eq!(
            rule.trigger.unless_top_url,
            Some(vec![rule.trigger.url_filter.clone()])
        );
    }

    #[test]
    fn subdomain_exception_emits_bare_and_www() {
        let mut domains = DomainMap::new();
        domains.insert("foo.com".to_string(), true);
        domains.insert("bar.foo.com".to_string(), false);
        let mut filter = Filter::url(FilterKind::Blocking, "1".to_string());
        filter.domains = domains;
        let rules = emit_url_rules(&filter, &[]);
        assert_eq!(
            rules[0].trigger.if_domain,
            Some(vec!["foo.com".to_string(), "www.foo.com".to_string()])
        );
    }

    #[test]
    fn plain_domain_without_subdomain_exception_uses_wildcard_form() {
        let mut domains = DomainMap::new();
        domains.insert("foo.com".to_string(), true);
        let mut filter = Filter::url(FilterKind::Blocking, "1".to_string());
        filter.domains = domains;
        let rules = emit_url_rules(&filter, &[]);
        assert_eq!(
            rules[0].trigger.if_domain,
            Some(vec!["*foo.com".to_string()])
        );
    }
}
