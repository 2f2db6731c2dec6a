//! Element-Hide Grouper (SPEC_FULL.md §4.5, §4.5.1).
//!
//! Collates `##selector` filters into per-domain and generic groups,
//! reconciles them against `#@#` selector exceptions and
//! `$elemhide`/`$generichide` whitelist domains, chunks each group
//! under a selector-count cap, and rewrites `#id` selectors to work
//! around the target engine's attribute-selector case-folding.

use std::collections::{HashMap, HashSet};

use crate::domain;
use crate::filter::{Filter, FilterKind};
use crate::rule::{Action, Rule, Trigger};

/// Group element-hide filters into CSS-display-none rules.
///
/// `selector_exceptions` is the set of selectors appearing in any
/// `#@#` filter: any base filter using one of these selectors is
/// dropped outright, since the target format cannot express a
/// selector exception scoped to specific domains. `elemhide_domains`
/// and `generichide_domains` are the hostname-only domains carried by
/// whitelist filters with the `$elemhide` / `$generichide` options.
pub fn group_element_hide_rules(
    filters: &[Filter],
    selector_exceptions: &HashSet<String>,
    elemhide_domains: &[String],
    generichide_domains: &[String],
    selector_limit: usize,
) -> Vec<Rule> {
    let mut generic: Vec<String> = Vec::new();
    let mut per_domain: HashMap<String, Vec<String>> = HashMap::new();

    for filter in filters {
        debug_assert!(matches!(filter.kind, FilterKind::ElementHide));
        let Some(selector) = &filter.selector else {
            continue;
        };
        if selector_exceptions.contains(selector) {
            continue;
        }
        let classified = domain::classify(&filter.domains);
        if !classified.excluded.is_empty() {
            continue;
        }
        if classified.included.is_empty() {
            generic.push(selector.clone());
        } else {
            for d in classified.included {
                per_domain.entry(d).or_default().push(selector.clone());
            }
        }
    }

    let mut generic_exceptions: Vec<String> = elemhide_domains
        .iter()
        .chain(generichide_domains.iter())
        .cloned()
        .collect();
    generic_exceptions.sort();
    generic_exceptions.dedup();

    let mut domain_exceptions: Vec<String> = elemhide_domains.to_vec();
    domain_exceptions.sort();
    domain_exceptions.dedup();

    let mut rules = Vec::new();

    if !generic.is_empty() {
        let unless_domain: Vec<String> = generic_exceptions
            .iter()
            .map(|e| format!("*{e}"))
            .collect();
        rules.extend(build_group_rules(&generic, None, &unless_domain, selector_limit));
    }

    let mut domains: Vec<&String> = per_domain.keys().collect();
    domains.sort();
    for d in domains {
        if domain_exceptions.contains(d) {
            continue;
        }
        let selectors = &per_domain[d];
        let unless_domain: Vec<String> = domain_exceptions
            .iter()
            .filter(|e| domain::is_subdomain_or_self(e, d))
            .map(|e| format!("*{e}"))
            .collect();
        rules.extend(build_group_rules(
            selectors,
            Some(d.as_str()),
            &unless_domain,
            selector_limit,
        ));
    }

    rules
}

fn build_group_rules(
    selectors: &[String],
    domain_scope: Option<&str>,
    unless_domain: &[String],
    selector_limit: usize,
) -> Vec<Rule> {
    let mut rules = Vec::new();
    for chunk in selectors.chunks(selector_limit.max(1)) {
        let joined = chunk.join(",");
        let rewritten = rewrite_id_selectors(&joined);

        let url_filter = match domain_scope {
            None => "^https?://".to_string(),
            Some(d) => format!("^https?://([^/:]*\\.)?{}[/:]", regex::escape(d)),
        };

        let mut trigger = Trigger::new(url_filter);
        trigger.url_filter_is_case_sensitive = Some(true);
        if !unless_domain.is_empty() {
            trigger.unless_domain = Some(unless_domain.to_vec());
        }

        rules.push(Rule::new(trigger, Action::css_display_none(rewritten)));
    }
    rules
}

#[derive(PartialEq)]
enum QuoteState {
    None,
    Double,
    Single,
}

fn is_id_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || (ch as u32) >= 0x80
}

/// Rewrite `#id` selectors to `[id=id]`, tracking quote state so `#`
/// inside a quoted attribute value is left untouched (SPEC_FULL.md
/// §4.5.1).
pub fn rewrite_id_selectors(selector: &str) -> String {
    let chars: Vec<char> = selector.chars().collect();
    let n = chars.len();
    let mut out = String::new();
    let mut state = QuoteState::None;
    let mut i = 0usize;

    while i < n {
        let ch = chars[i];

        if ch == '\\' {
            out.push(ch);
            if i + 1 < n {
                out.push(chars[i + 1]);
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }

        match state {
            QuoteState::None => match ch {
                '"' => {
                    state = QuoteState::Double;
                    out.push(ch);
                    i += 1;
                }
                '\'' => {
                    state = QuoteState::Single;
                    out.push(ch);
                    i += 1;
                }
                '#' => {
                    let start = i + 1;
                    let mut j = start;
                    while j < n && is_id_ident_char(chars[j]) {
                        j += 1;
                    }
                    if j > start {
                        let ident: String = chars[start..j].iter().collect();
                        out.push_str("[id=");
                        out.push_str(&ident);
                        out.push(']');
                        i = j;
                    } else {
                        out.push(ch);
                        i += 1;
                    }
                }
                _ => {
                    out.push(ch);
                    i += 1;
                }
            },
            QuoteState::Double => {
                if ch == '"' {
                    state = QuoteState::None;
                }
                out.push(ch);
                i += 1;
            }
            QuoteState::Single => {
                if ch == '\'' {
                    state = QuoteState::None;
                }
                out.push(ch);
                i += 1;
            }
        }
    }

    out
}
