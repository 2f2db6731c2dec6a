//! Output rule record (SPEC_FULL.md §3): the WebKit Content-Blocker
//! JSON shape. Field names and optionality mirror the target format
//! directly, grounded on servo's own content-blocker rule definitions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    FirstParty,
    ThirdParty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    Block,
    IgnorePreviousRules,
    CssDisplayNone,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

impl Action {
    pub fn block() -> Self {
        Self {
            action_type: ActionType::Block,
            selector: None,
        }
    }

    pub fn ignore_previous_rules() -> Self {
        Self {
            action_type: ActionType::IgnorePreviousRules,
            selector: None,
        }
    }

    pub fn css_display_none(selector: String) -> Self {
        Self {
            action_type: ActionType::CssDisplayNone,
            selector: Some(selector),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Trigger {
    pub url_filter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_filter_is_case_sensitive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_type: Option<Vec<LoadType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub if_domain: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unless_domain: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unless_top_url: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_url_filter_is_case_sensitive: Option<bool>,
}

impl Trigger {
    pub fn new(url_filter: impl Into<String>) -> Self {
        Self {
            url_filter: url_filter.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub trigger: Trigger,
    pub action: Action,
}

impl Rule {
    pub fn new(trigger: Trigger, action: Action) -> Self {
        Self { trigger, action }
    }

    /// True if `if_domain` and `unless_domain` are not both set
    /// (SPEC_FULL.md §3 invariant).
    pub fn domain_fields_are_exclusive(&self) -> bool {
        !(self.trigger.if_domain.is_some() && self.trigger.unless_domain.is_some())
    }

    /// True if no string field anywhere in the rule contains a code
    /// point above ASCII (SPEC_FULL.md §3 invariant).
    pub fn is_ascii_only(&self) -> bool {
        let strings_ascii = |v: &Option<Vec<String>>| {
            v.as_ref()
                .map(|items| items.iter().all(|s| s.is_ascii()))
                .unwrap_or(true)
        };

        self.trigger.url_filter.is_ascii()
            && strings_ascii(&self.trigger.resource_type)
            && strings_ascii(&self.trigger.if_domain)
            && strings_ascii(&self.trigger.unless_domain)
            && strings_ascii(&self.trigger.unless_top_url)
            && self
                .action
                .selector
                .as_ref()
                .map(|s| s.is_ascii())
                .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_rule_serializes_without_optional_fields() {
        let rule = Rule::new(Trigger::new("^https?://example\\.com"), Action::block());
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["action"]["type"], "block");
        assert!(json["action"].get("selector").is_none());
        assert!(json["trigger"].get("resource_type").is_none());
    }

    #[test]
    fn css_rule_carries_selector() {
        let rule = Rule::new(
            Trigger::new("^https?://"),
            Action::css_display_none(".ad".to_string()),
        );
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["action"]["type"], "css-display-none");
        assert_eq!(json["action"]["selector"], ".ad");
    }

    #[test]
    fn exclusive_domain_invariant() {
        let mut trigger = Trigger::new("^https?://example\\.com");
        trigger.if_domain = Some(vec!["example.com".into()]);
        let rule = Rule::new(trigger.clone(), Action::block());
        assert!(rule.domain_fields_are_exclusive());

        let mut bad = trigger;
        bad.unless_domain = Some(vec!["other.com".into()]);
        let rule = Rule::new(bad, Action::block());
        assert!(!rule.domain_fields_are_exclusive());
    }

    #[test]
    fn detects_non_ascii() {
        let rule = Rule::new(Trigger::new("^https?://caf\u{e9}.com"), Action::block());
        assert!(!rule.is_ascii_only());
    }
}
