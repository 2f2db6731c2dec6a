//! Rule-Set Optimizer (SPEC_FULL.md §4.6).
//!
//! Runs per rule category (never merging across categories): Phase A
//! drops url-filters subsumed by a shorter sibling, Phase B merges
//! near-duplicate url-filters via a "close match" edit-distance
//! check, and Phase C unions the `resource_type` and `if_domain`
//! array fields across otherwise-identical rules.
//!
//! Per SPEC_FULL.md §9, rule records stay immutable: phases build a
//! new `Vec<Rule>` rather than flagging records in place, so grouping
//! passes never need a side-table of "redundant"/"merged" flags
//! shared across borrows.

use std::collections::HashMap;

use crate::rule::{Action, LoadType, Rule, Trigger};

/// Regex metacharacters the approximate merge refuses to fold into an
/// alternation or optional group, since doing so could change what
/// the merged pattern matches.
fn is_regex_metachar(ch: char) -> bool {
    matches!(
        ch,
        '.' | '+' | '$' | '?' | '{' | '}' | '(' | ')' | '[' | ']' | '\\'
    )
}

/// Controls how much of the candidate list Phase B searches per rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchWindow {
    /// Only the next `n` rules (by iteration order) are considered.
    Heuristic(usize),
    /// Every later rule is considered.
    Exhaustive,
}

impl Default for SearchWindow {
    fn default() -> Self {
        SearchWindow::Heuristic(1000)
    }
}

/// A key identifying rules that are candidates for the same merge,
/// i.e. identical in every trigger/action field except the one this
/// phase varies.
#[derive(Clone, PartialEq, Eq, Hash)]
struct UrlFilterKey {
    url_filter_is_case_sensitive: Option<bool>,
    resource_type: Option<Vec<String>>,
    load_type: Option<Vec<LoadType>>,
    if_domain: Option<Vec<String>>,
    unless_domain: Option<Vec<String>>,
    unless_top_url: Option<Vec<String>>,
    top_url_filter_is_case_sensitive: Option<bool>,
    action: Action,
}

fn url_filter_key(rule: &Rule) -> UrlFilterKey {
    UrlFilterKey {
        url_filter_is_case_sensitive: rule.trigger.url_filter_is_case_sensitive,
        resource_type: rule.trigger.resource_type.clone(),
        load_type: rule.trigger.load_type.clone(),
        if_domain: rule.trigger.if_domain.clone(),
        unless_domain: rule.trigger.unless_domain.clone(),
        unless_top_url: rule.trigger.unless_top_url.clone(),
        top_url_filter_is_case_sensitive: rule.trigger.top_url_filter_is_case_sensitive,
        action: rule.action.clone(),
    }
}

/// Group rule indices by `url_filter_key`, preserving first-seen order.
fn group_by_url_filter_key(rules: &[Rule]) -> Vec<Vec<usize>> {
    let mut order: Vec<UrlFilterKey> = Vec::new();
    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut key_to_slot: HashMap<UrlFilterKey, usize> = HashMap::new();

    for (i, rule) in rules.iter().enumerate() {
        let key = url_filter_key(rule);
        let slot = *key_to_slot.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            order.len() - 1
        });
        groups.entry(slot).or_default().push(i);
    }

    (0..order.len()).map(|slot| groups[&slot].clone()).collect()
}

/// Phase A: within each url-filter-key group, drop any rule whose
/// `url_filter` is strictly extended by (has as a proper prefix) a
/// shorter sibling's `url_filter` — the shorter pattern already
/// matches everything the longer one would.
pub fn phase_a_redundancy(rules: Vec<Rule>) -> Vec<Rule> {
    let groups = group_by_url_filter_key(&rules);
    let mut keep = vec![true; rules.len()];

    for group in &groups {
        for &i in group {
            for &j in group {
                if i == j {
                    continue;
                }
                let (shorter, longer) = (&rules[j].trigger.url_filter, &rules[i].trigger.url_filter);
                if shorter.len() < longer.len() && longer.starts_with(shorter.as_str()) {
                    keep[i] = false;
                }
            }
        }
    }

    rules
        .into_iter()
        .zip(keep)
        .filter_map(|(rule, k)| k.then_some(rule))
        .collect()
}

/// One way two url-filters can be a "close match".
enum CloseMatch {
    /// Both strings agree outside a single-character slot at `position`.
    /// `base_char`/`other_char` is `None` when that side has nothing at
    /// the slot (an insertion/deletion rather than a substitution).
    Single {
        position: usize,
        base_char: Option<char>,
        other_char: Option<char>,
    },
    /// The shorter string is identical to the longer one with a single
    /// contiguous multi-character span removed at `position`.
    Multi { position: usize, span: String },
}

fn close_match(base: &[char], other: &[char]) -> Option<CloseMatch> {
    let prefix = base
        .iter()
        .zip(other.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = base.len().min(other.len()) - prefix;
    let suffix = base
        .iter()
        .rev()
        .zip(other.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let base_mid = base.len() - prefix - suffix;
    let other_mid = other.len() - prefix - suffix;

    if base_mid <= 1 && other_mid <= 1 {
        if base_mid == 0 && other_mid == 0 {
            return None;
        }
        let base_char = (base_mid == 1).then(|| base[prefix]);
        let other_char = (other_mid == 1).then(|| other[prefix]);
        if [base_char, other_char]
            .into_iter()
            .flatten()
            .any(is_regex_metachar)
        {
            return None;
        }
        return Some(CloseMatch::Single {
            position: prefix,
            base_char,
            other_char,
        });
    }

    let (shorter_mid, longer, longer_mid) = if base.len() < other.len() {
        (base_mid, other, other_mid)
    } else {
        (other_mid, base, base_mid)
    };
    if shorter_mid != 0 || longer_mid < 2 {
        return None;
    }
    let span: String = longer[prefix..prefix + longer_mid].iter().collect();
    if span.chars().any(is_regex_metachar) {
        return None;
    }
    Some(CloseMatch::Multi { position: prefix, span })
}

fn char_class(mut chars: Vec<char>) -> String {
    chars.sort();
    chars.dedup();
    if let Some(pos) = chars.iter().position(|&c| c == '-') {
        chars.remove(pos);
        chars.insert(0, '-');
    }
    let body: String = chars.into_iter().collect();
    format!("[{body}]")
}

/// Phase B: approximate merge. Within each url-filter-key group, scan
/// rules in order; for each not-yet-merged rule, look for same-position
/// single-character close matches (preferring the largest such group,
/// to maximize how many rules fold into one) and for a single
/// multi-character close match, then fold whichever is larger into one
/// rule.
pub fn phase_b_merge(rules: Vec<Rule>, window: SearchWindow) -> Vec<Rule> {
    let groups = group_by_url_filter_key(&rules);
    let mut slots: Vec<Option<Rule>> = rules.into_iter().map(Some).collect();

    for group in &groups {
        let mut merged = vec![false; group.len()];

        for gi in 0..group.len() {
            if merged[gi] {
                continue;
            }
            let base_idx = group[gi];
            let base_chars: Vec<char> = slots[base_idx]
                .as_ref()
                .unwrap()
                .trigger
                .url_filter
                .chars()
                .collect();

            let search_end = match window {
                SearchWindow::Heuristic(w) => (gi + 1 + w).min(group.len()),
                SearchWindow::Exhaustive => group.len(),
            };

            // position -> (base_char_at_position, [(gj, other_char)])
            let mut single_groups: HashMap<usize, (Option<char>, Vec<(usize, Option<char>)>)> =
                HashMap::new();
            let mut multi_candidate: Option<(usize, usize, String)> = None;

            for gj in (gi + 1)..search_end {
                if merged[gj] {
                    continue;
                }
                let other_idx = group[gj];
                let other_chars: Vec<char> = slots[other_idx]
                    .as_ref()
                    .unwrap()
                    .trigger
                    .url_filter
                    .chars()
                    .collect();

                match close_match(&base_chars, &other_chars) {
                    Some(CloseMatch::Single {
                        position,
                        base_char,
                        other_char,
                    }) => {
                        let entry = single_groups
                            .entry(position)
                            .or_insert_with(|| (base_char, Vec::new()));
                        entry.1.push((gj, other_char));
                    }
                    Some(CloseMatch::Multi { position, span }) if multi_candidate.is_none() => {
                        multi_candidate = Some((gj, position, span));
                    }
                    _ => {}
                }
            }

            let best_single = single_groups
                .iter()
                .max_by_key(|(_, (_, members))| members.len());

            let use_single = match (&best_single, &multi_candidate) {
                (Some((_, (_, members))), None) => !members.is_empty(),
                (Some((_, (_, members))), Some(_)) => members.len() + 1 >= 2,
                (None, _) => false,
            };

            if use_single {
                let (&position, (base_char, members)) = best_single.unwrap();
                let base_mid = if base_char.is_some() { 1 } else { 0 };
                let prefix: String = base_chars[..position].iter().collect();
                let suffix: String = base_chars[position + base_mid..].iter().collect();

                let mut present = Vec::new();
                let mut has_empty = base_char.is_none();
                if let Some(c) = base_char {
                    present.push(c);
                }
                for &(gj, other_char) in members {
                    match other_char {
                        Some(c) => present.push(c),
                        None => has_empty = true,
                    }
                    merged[gj] = true;
                }

                let replacement = if present.len() == 1 {
                    if has_empty {
                        format!("{}?", present[0])
                    } else {
                        present[0].to_string()
                    }
                } else {
                    let class = char_class(present);
                    if has_empty {
                        format!("{class}?")
                    } else {
                        class
                    }
                };

                let new_url = format!("{prefix}{replacement}{suffix}");
                slots[base_idx].as_mut().unwrap().trigger.url_filter = new_url;
                for &(gj, _) in members {
                    slots[group[gj]] = None;
                }
            } else if let Some((gj, position, span)) = multi_candidate {
                let other_idx = group[gj];
                let other_chars: Vec<char> = slots[other_idx]
                    .as_ref()
                    .unwrap()
                    .trigger
                    .url_filter
                    .chars()
                    .collect();
                let shorter_chars = if base_chars.len() < other_chars.len() {
                    &base_chars
                } else {
                    &other_chars
                };
                let prefix: String = shorter_chars[..position].iter().collect();
                let suffix: String = shorter_chars[position..].iter().collect();
                let new_url = format!("{prefix}({span})?{suffix}");

                slots[base_idx].as_mut().unwrap().trigger.url_filter = new_url;
                slots[other_idx] = None;
                merged[gj] = true;
            }
        }
    }

    slots.into_iter().flatten().collect()
}

/// Phase C, field-parameterized: group rules by equality of every
/// trigger/action field except `select`, union `select`'s values into
/// the first rule in each group, drop the rest.
fn phase_c_merge_field<K, F, U>(rules: Vec<Rule>, key_of: K, mut union_into_first: U) -> Vec<Rule>
where
    K: Fn(&Rule) -> F,
    F: std::hash::Hash + Eq,
    U: FnMut(&mut Rule, &Rule),
{
    // Bucket by a cheap hash first, then confirm with real equality
    // (F isn't required to support deriving a canonical hash bucket
    // beyond what's needed here).
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hasher;

    let mut keys: Vec<F> = Vec::new();
    let mut key_index: HashMap<u64, Vec<usize>> = HashMap::new();
    let mut buckets: Vec<Vec<usize>> = Vec::new();

    for (i, rule) in rules.iter().enumerate() {
        let key = key_of(rule);
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let hash = hasher.finish();
        let bucket_list = key_index.entry(hash).or_default();
        let existing_slot = bucket_list.iter().find(|&&slot| keys[slot] == key).copied();
        match existing_slot {
            Some(slot) => buckets[slot].push(i),
            None => {
                let slot = keys.len();
                keys.push(key);
                buckets.push(vec![i]);
                bucket_list.push(slot);
            }
        }
    }

    let mut rules: Vec<Option<Rule>> = rules.into_iter().map(Some).collect();
    for bucket in &buckets {
        if bucket.len() < 2 {
            continue;
        }
        let (first, rest) = bucket.split_first().unwrap();
        for &other in rest {
            let other_rule = rules[other].take().unwrap();
            union_into_first(rules[*first].as_mut().unwrap(), &other_rule);
        }
    }

    rules.into_iter().flatten().collect()
}

fn union_strings(base: &mut Option<Vec<String>>, other: &Option<Vec<String>>) {
    match (base.as_mut(), other) {
        (Some(b), Some(o)) => {
            for v in o {
                if !b.contains(v) {
                    b.push(v.clone());
                }
            }
        }
        (None, Some(o)) => *base = Some(o.clone()),
        _ => {}
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct KeyExcludingResourceType {
    url_filter: String,
    url_filter_is_case_sensitive: Option<bool>,
    load_type: Option<Vec<LoadType>>,
    if_domain: Option<Vec<String>>,
    unless_domain: Option<Vec<String>>,
    unless_top_url: Option<Vec<String>>,
    top_url_filter_is_case_sensitive: Option<bool>,
    action: Action,
}

pub fn phase_c_merge_resource_type(rules: Vec<Rule>) -> Vec<Rule> {
    phase_c_merge_field(
        rules,
        |r| KeyExcludingResourceType {
            url_filter: r.trigger.url_filter.clone(),
            url_filter_is_case_sensitive: r.trigger.url_filter_is_case_sensitive,
            load_type: r.trigger.load_type.clone(),
            if_domain: r.trigger.if_domain.clone(),
            unless_domain: r.trigger.unless_domain.clone(),
            unless_top_url: r.trigger.unless_top_url.clone(),
            top_url_filter_is_case_sensitive: r.trigger.top_url_filter_is_case_sensitive,
            action: r.action.clone(),
        },
        |first, other| union_strings(&mut first.trigger.resource_type, &other.trigger.resource_type),
    )
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct KeyExcludingIfDomain {
    url_filter: String,
    url_filter_is_case_sensitive: Option<bool>,
    resource_type: Option<Vec<String>>,
    load_type: Option<Vec<LoadType>>,
    unless_domain: Option<Vec<String>>,
    unless_top_url: Option<Vec<String>>,
    top_url_filter_is_case_sensitive: Option<bool>,
    action: Action,
}

pub fn phase_c_merge_if_domain(rules: Vec<Rule>) -> Vec<Rule> {
    phase_c_merge_field(
        rules,
        |r| KeyExcludingIfDomain {
            url_filter: r.trigger.url_filter.clone(),
            url_filter_is_case_sensitive: r.trigger.url_filter_is_case_sensitive,
            resource_type: r.trigger.resource_type.clone(),
            load_type: r.trigger.load_type.clone(),
            unless_domain: r.trigger.unless_domain.clone(),
            unless_top_url: r.trigger.unless_top_url.clone(),
            top_url_filter_is_case_sensitive: r.trigger.top_url_filter_is_case_sensitive,
            action: r.action.clone(),
        },
        |first, other| union_strings(&mut first.trigger.if_domain, &other.trigger.if_domain),
    )
}
