//! End-to-end tests driving the compiler through `parser::parse_line`
//! the way the CLI binary does, on small representative filter lists.

use blocklist_compiler::{parser, Compiler, CompilerConfig, MergeMode};

fn compile(lines: &[&str], config: CompilerConfig) -> Vec<blocklist_compiler::Rule> {
    let mut compiler = Compiler::new(config);
    for line in lines {
        if let Some(filter) = parser::parse_line(line) {
            compiler.add_filter(filter);
        }
    }
    compiler.generate_rules().expect("compilation should not fail")
}

#[test]
fn generic_css_rule_from_bare_selector() {
    let rules = compile(&["##.whatever"], CompilerConfig::default());
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].trigger.url_filter, "^https?://");
    assert_eq!(rules[0].action.selector.as_deref(), Some(".whatever"));
}

#[test]
fn domain_scoped_css_rule() {
    let rules = compile(&["test.com##.whatever"], CompilerConfig::default());
    assert_eq!(rules.len(), 1);
    assert_eq!(
        rules[0].trigger.url_filter,
        "^https?://([^/:]*\\.)?test\\.com[/:]"
    );
}

#[test]
fn id_selector_is_rewritten_to_attribute_form() {
    let rules = compile(&["###example"], CompilerConfig::default());
    assert_eq!(rules[0].action.selector.as_deref(), Some("[id=example]"));
}

#[test]
fn document_whitelist_emits_catch_all_bypass() {
    let rules = compile(
        &["@@||example.com^$document"],
        CompilerConfig::default(),
    );
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].trigger.url_filter, ".*");
    assert_eq!(
        rules[0].trigger.if_domain,
        Some(vec!["*example.com".to_string()])
    );
}

#[test]
fn plain_hostname_blocking_filter_gets_unless_top_url() {
    let rules = compile(&["||example.com"], CompilerConfig::default());
    assert_eq!(rules.len(), 1);
    assert_eq!(
        rules[0].trigger.url_filter,
        "^[^:]+:(//)?([^/]+\\.)?example\\.com"
    );
    assert!(rules[0]
        .trigger
        .resource_type
        .as_ref()
        .unwrap()
        .iter()
        .any(|t| t == "document"));
    assert_eq!(
        rules[0].trigger.unless_top_url,
        Some(vec![rules[0].trigger.url_filter.clone()])
    );
}

#[test]
fn websocket_option_narrows_to_websocket_scheme() {
    let rules = compile(&["foo$websocket"], CompilerConfig::default());
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].trigger.url_filter, "^wss?://.*foo");
}

#[test]
fn webrtc_option_splits_into_stun_and_turn_rules() {
    let rules = compile(&["foo$webrtc"], CompilerConfig::default());
    assert_eq!(rules.len(), 2);
    assert!(rules[0].trigger.url_filter.starts_with("^stuns?:"));
    assert!(rules[1].trigger.url_filter.starts_with("^turns?:"));
}

#[test]
fn domain_option_with_subdomain_exception() {
    let rules = compile(&["1$domain=foo.com|~bar.foo.com"], CompilerConfig::default());
    assert_eq!(
        rules[0].trigger.if_domain,
        Some(vec!["foo.com".to_string(), "www.foo.com".to_string()])
    );
}

#[test]
fn merge_all_produces_phase_a_redundancy_collapse() {
    let rules = compile(
        &["/ad", "/ads", "/advertisement"],
        CompilerConfig {
            merge: MergeMode::All,
            ..CompilerConfig::default()
        },
    );
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].trigger.url_filter, "^[^:]+:(//)?.*/ad");
}

#[test]
fn merge_all_approximate_merges_single_char_substitution() {
    let rules = compile(
        &["/ads", "/adv"],
        CompilerConfig {
            merge: MergeMode::All,
            ..CompilerConfig::default()
        },
    );
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].trigger.url_filter, "^[^:]+:(//)?.*/ad[sv]");
}

#[test]
fn merge_auto_on_small_rule_set_equals_merge_off() {
    let lines = ["||example.com^", "##.ad-banner", "@@||trusted.com^$document"];
    let auto = compile(
        &lines,
        CompilerConfig {
            merge: MergeMode::Auto,
            ..CompilerConfig::default()
        },
    );
    let off = compile(
        &lines,
        CompilerConfig {
            merge: MergeMode::Off,
            ..CompilerConfig::default()
        },
    );
    assert_eq!(auto, off);
}

#[test]
fn unicode_domain_option_is_punycoded() {
    let rules = compile(&["1$domain=\u{1F408}.cat"], CompilerConfig::default());
    assert_eq!(
        rules[0].trigger.if_domain,
        Some(vec!["*xn--zn8h.cat".to_string()])
    );
}

#[test]
fn unicode_pattern_is_percent_encoded() {
    let rules = compile(&["\u{1F408}"], CompilerConfig::default());
    assert!(rules[0].trigger.url_filter.contains("%F0%9F%90%88"));
}

#[test]
fn sitekey_filter_is_silently_dropped() {
    let rules = compile(&["ads$sitekey=abc123"], CompilerConfig::default());
    assert!(rules.is_empty());
}

#[test]
fn element_hide_emulation_filter_is_silently_dropped() {
    let rules = compile(&["example.com#?#.ad:has(> img)"], CompilerConfig::default());
    assert!(rules.is_empty());
}

#[test]
fn comments_and_section_headers_produce_no_rules() {
    let rules = compile(
        &["[Adblock Plus 2.0]", "! this is a comment", ""],
        CompilerConfig::default(),
    );
    assert!(rules.is_empty());
}

#[test]
fn compiling_twice_is_byte_identical() {
    let lines = ["||example.com^", "##.ad-banner", "test.com##.whatever"];
    let first = compile(&lines, CompilerConfig::default());
    let second = compile(&lines, CompilerConfig::default());
    let first_json = serde_json::to_string(&first).unwrap();
    let second_json = serde_json::to_string(&second).unwrap();
    assert_eq!(first_json, second_json);
}

#[test]
fn no_rule_contains_a_non_ascii_byte() {
    let rules = compile(
        &["\u{1F408}.example$domain=\u{1F408}.cat", "##.ad"],
        CompilerConfig::default(),
    );
    for rule in &rules {
        assert!(rule.is_ascii_only());
    }
}

#[test]
fn generic_hide_rule_selector_never_exceeds_the_configured_limit() {
    let lines: Vec<String> = (0..12).map(|i| format!("##.ad{i}")).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let rules = compile(
        &refs,
        CompilerConfig {
            selector_limit: 5,
            ..CompilerConfig::default()
        },
    );
    assert_eq!(rules.len(), 3);
    for rule in &rules {
        let selector = rule.action.selector.as_deref().unwrap();
        assert!(selector.split(',').count() <= 5);
    }
}
