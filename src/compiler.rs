//! Top-level compiler driver (SPEC_FULL.md §2, §4, §5).
//!
//! `Compiler` owns the category buckets filters are sorted into by
//! `add_filter`, and `generate_rules` drives pattern lowering, domain
//! classification, resource-type mapping, rule emission, element-hide
//! grouping, and (optionally) the rule-set optimizer, in that order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain;
use crate::elemhide;
use crate::emitter;
use crate::error::CompilerError;
use crate::filter::{ContentType, Filter, FilterKind};
use crate::optimizer::SearchWindow;
use crate::pattern;
use crate::resource_type;
use crate::rule::Rule;
use crate::scheduler::OptimizerDriver;

/// Optimizer policy (SPEC_FULL.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Never run the optimizer.
    Off,
    /// Run it only when the generated rule count exceeds 50,000.
    Auto,
    /// Always run it.
    All,
}

impl Default for MergeMode {
    fn default() -> Self {
        MergeMode::Auto
    }
}

/// The compiler's three configuration knobs (SPEC_FULL.md §2.1 item 12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    pub merge: MergeMode,
    pub selector_limit: usize,
    pub heuristic_window: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            merge: MergeMode::Auto,
            selector_limit: 5000,
            heuristic_window: 1000,
        }
    }
}

const AUTO_OPTIMIZE_THRESHOLD: usize = 50_000;

/// Accumulates filters by category and compiles them into a rule list.
///
/// Callers must not invoke `add_filter` concurrently with
/// `generate_rules` on the same instance (SPEC_FULL.md §5); nothing
/// here is `Sync`, so the borrow checker already prevents overlapping
/// calls across threads.
pub struct Compiler {
    config: CompilerConfig,
    blocking: Vec<Filter>,
    whitelist: Vec<Filter>,
    element_hide: Vec<Filter>,
    element_hide_exceptions: Vec<Filter>,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            blocking: Vec::new(),
            whitelist: Vec::new(),
            element_hide: Vec::new(),
            element_hide_exceptions: Vec::new(),
        }
    }

    /// File a classified filter into its category bucket. Degenerate
    /// filters (no pattern for a URL kind, no selector for an
    /// element-hide kind) are dropped silently, per SPEC_FULL.md §7.
    pub fn add_filter(&mut self, filter: Filter) {
        match filter.kind {
            FilterKind::Blocking | FilterKind::Whitelist => {
                if filter.pattern.as_deref().unwrap_or("").is_empty() {
                    log::debug!("dropping filter with empty pattern");
                    return;
                }
                if matches!(filter.kind, FilterKind::Blocking) {
                    self.blocking.push(filter);
                } else {
                    self.whitelist.push(filter);
                }
            }
            FilterKind::ElementHide => {
                if filter.selector.is_none() {
                    log::debug!("dropping element-hide filter with no selector");
                    return;
                }
                self.element_hide.push(filter);
            }
            FilterKind::ElementHideException => {
                if filter.selector.is_none() {
                    log::debug!("dropping element-hide exception with no selector");
                    return;
                }
                self.element_hide_exceptions.push(filter);
            }
        }
    }

    /// Domains carried by hostname-only whitelist filters with the
    /// `$elemhide`, `$generichide`, or `$genericblock` options, used
    /// by the element-hide grouper and the generic-blocking exclusion
    /// list respectively.
    fn whitelist_option_domains(&self) -> (Vec<String>, Vec<String>, Vec<String>) {
        let mut elemhide = Vec::new();
        let mut generichide = Vec::new();
        let mut genericblock = Vec::new();

        for filter in &self.whitelist {
            let Some(pattern_str) = &filter.pattern else {
                continue;
            };
            let Some(scheme) = resource_type::select_schemes(filter.content_type).into_iter().next()
            else {
                continue;
            };
            let lowered = pattern::lower_pattern(pattern_str, scheme.prefix());
            if !lowered.hostname_only {
                continue;
            }
            let Some(hostname) = lowered.hostname else {
                continue;
            };

            if filter.content_type.contains(ContentType::ELEMHIDE) {
                elemhide.push(hostname.clone());
            }
            if filter.content_type.contains(ContentType::GENERICHIDE) {
                generichide.push(hostname.clone());
            }
            if filter.content_type.contains(ContentType::GENERICBLOCK) {
                genericblock.push(hostname);
            }
        }

        (elemhide, generichide, genericblock)
    }

    /// Run the full pipeline and produce the output rule list, in
    /// category order: CSS, blocking, blocking-exceptions
    /// (SPEC_FULL.md §6). Never fails except on an internal
    /// postcondition violation.
    pub fn generate_rules(&mut self) -> Result<Vec<Rule>, CompilerError> {
        let selector_exceptions: HashSet<String> = self
            .element_hide_exceptions
            .iter()
            .filter_map(|f| f.selector.clone())
            .collect();

        let (elemhide_domains, generichide_domains, genericblock_domains) =
            self.whitelist_option_domains();

        let css_rules = elemhide::group_element_hide_rules(
            &self.element_hide,
            &selector_exceptions,
            &elemhide_domains,
            &generichide_domains,
            self.config.selector_limit,
        );

        let mut blocking_rules = Vec::new();
        for filter in &self.blocking {
            let classified = domain::classify(&filter.domains);
            let extra: &[String] = if classified.included.is_empty() {
                &genericblock_domains
            } else {
                &[]
            };
            blocking_rules.extend(emitter::emit_url_rules(filter, extra));
        }

        let mut whitelist_rules = Vec::new();
        for filter in &self.whitelist {
            whitelist_rules.extend(emitter::emit_url_rules(filter, &[]));
        }

        let total = css_rules.len() + blocking_rules.len() + whitelist_rules.len();
        let should_optimize = match self.config.merge {
            MergeMode::Off => false,
            MergeMode::Auto => total > AUTO_OPTIMIZE_THRESHOLD,
            MergeMode::All => true,
        };

        let rules = if should_optimize {
            log::debug!("optimizing {total} rules (merge={:?})", self.config.merge);
            let window = SearchWindow::Heuristic(self.config.heuristic_window);
            let driver =
                OptimizerDriver::new(vec![css_rules, blocking_rules, whitelist_rules], window);
            driver.run_to_completion()
        } else {
            css_rules
                .into_iter()
                .chain(blocking_rules)
                .chain(whitelist_rules)
                .collect()
        };

        for rule in &rules {
            if !rule.domain_fields_are_exclusive() {
                return Err(CompilerError::InvariantViolation(format!(
                    "rule for {:?} sets both if_domain and unless_domain",
                    rule.trigger.url_filter
                )));
            }
            if !rule.is_ascii_only() {
                return Err(CompilerError::InvariantViolation(format!(
                    "rule for {:?} contains a non-ASCII byte",
                    rule.trigger.url_filter
                )));
            }
        }

        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_blocking_and_css_filters() {
        let mut compiler = Compiler::new(CompilerConfig::default());
        compiler.add_filter(Filter::url(FilterKind::Blocking, "||example.com^".to_string()));
        compiler.add_filter(Filter::element_hide(
            FilterKind::ElementHide,
            ".ad".to_string(),
        ));

        let rules = compiler.generate_rules().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].action.selector.as_deref(), Some(".ad"));
        assert!(rules[1].trigger.url_filter.contains("example"));
    }

    #[test]
    fn empty_pattern_filter_is_dropped() {
        let mut compiler = Compiler::new(CompilerConfig::default());
        compiler.add_filter(Filter::url(FilterKind::Blocking, String::new()));
        let rules = compiler.generate_rules().unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn genericblock_exception_excludes_generic_blocking_rule() {
        let mut compiler = Compiler::new(CompilerConfig::default());
        let mut whitelist = Filter::url(FilterKind::Whitelist, "||example.com^".to_string());
        whitelist.content_type |= ContentType::GENERICBLOCK;
        compiler.add_filter(whitelist);
        compiler.add_filter(Filter::url(FilterKind::Blocking, "ads".to_string()));

        let rules = compiler.generate_rules().unwrap();
        let blocking_rule = rules
            .iter()
            .find(|r| r.trigger.url_filter.contains("ads"))
            .unwrap();
        assert_eq!(
            blocking_rule.trigger.unless_domain,
            Some(vec!["*example.com".to_string()])
        );
    }

    #[test]
    fn running_compiler_twice_is_deterministic() {
        let build = || {
            let mut compiler = Compiler::new(CompilerConfig::default());
            compiler.add_filter(Filter::url(FilterKind::Blocking, "||example.com".to_string()));
            compiler.generate_rules().unwrap()
        };
        assert_eq!(build(), build());
    }
}
