//! Ordered suppression rule evaluation.
//!
//! Grounded in `hardstop/suppression/models.py` (rule/result shapes) and
//! `sentinel/suppression/engine.py` (evaluation order and field
//! extraction).

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionKind {
    Keyword,
    Exact,
    Regex,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionField {
    Title,
    Summary,
    RawText,
    Url,
    EventType,
    SourceId,
    Tier,
    Any,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuppressionRule {
    pub id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub kind: SuppressionKind,
    pub field: SuppressionField,
    pub pattern: String,
    #[serde(default)]
    pub case_sensitive: bool,
    pub note: Option<String>,
    pub reason_code: Option<String>,
}

fn default_true() -> bool {
    true
}

impl SuppressionRule {
    /// Defaults to the rule id when no explicit reason code is set.
    pub fn reason_code(&self) -> &str {
        self.reason_code.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SuppressionResult {
    pub is_suppressed: bool,
    pub primary_rule_id: Option<String>,
    pub matched_rule_ids: Vec<String>,
    pub notes: Vec<String>,
    pub primary_reason_code: Option<String>,
    pub reason_codes: Vec<String>,
}

/// Input fields a rule may match against. Built once per event from its
/// normalized representation.
pub struct MatchableFields<'a> {
    pub title: &'a str,
    pub summary: &'a str,
    pub raw_text: &'a str,
    pub url: &'a str,
    pub event_type: &'a str,
    pub source_id: &'a str,
    pub tier: &'a str,
}

fn extract_field_value<'a>(fields: &MatchableFields<'a>, field: SuppressionField) -> Option<&'a str> {
    match field {
        SuppressionField::Title => Some(fields.title),
        SuppressionField::Summary => Some(fields.summary),
        SuppressionField::RawText => Some(fields.raw_text),
        SuppressionField::Url => Some(fields.url),
        SuppressionField::EventType => Some(fields.event_type),
        SuppressionField::SourceId => Some(fields.source_id),
        SuppressionField::Tier => Some(fields.tier),
        SuppressionField::Any => [fields.title, fields.summary, fields.raw_text, fields.url]
            .into_iter()
            .find(|s| !s.is_empty()),
    }
}

fn match_keyword(value: &str, pattern: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        value.contains(pattern)
    } else {
        value.to_lowercase().contains(&pattern.to_lowercase())
    }
}

fn match_exact(value: &str, pattern: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        value == pattern
    } else {
        value.eq_ignore_ascii_case(pattern)
    }
}

fn match_regex(value: &str, pattern: &str, case_sensitive: bool) -> bool {
    let built = if case_sensitive {
        Regex::new(pattern)
    } else {
        Regex::new(&format!("(?i){pattern}"))
    };
    match built {
        Ok(re) => re.is_match(value),
        // An invalid pattern must never throw; it simply fails to match.
        Err(_) => false,
    }
}

fn evaluate_rule(rule: &SuppressionRule, fields: &MatchableFields) -> bool {
    if !rule.enabled {
        return false;
    }
    let Some(value) = extract_field_value(fields, rule.field) else {
        return false;
    };
    match rule.kind {
        SuppressionKind::Keyword => match_keyword(value, &rule.pattern, rule.case_sensitive),
        SuppressionKind::Exact => match_exact(value, &rule.pattern, rule.case_sensitive),
        SuppressionKind::Regex => match_regex(value, &rule.pattern, rule.case_sensitive),
    }
}

/// Evaluates global rules, then source-level rules, each in configured
/// order. The first matching rule (global or source) is the
/// `primary_rule_id`; all matches are recorded.
pub fn evaluate_suppression(
    global_rules: &[SuppressionRule],
    source_rules: &[SuppressionRule],
    fields: &MatchableFields,
) -> SuppressionResult {
    let mut result = SuppressionResult::default();
    for rule in global_rules.iter().chain(source_rules.iter()) {
        if evaluate_rule(rule, fields) {
            result.is_suppressed = true;
            result.matched_rule_ids.push(rule.id.clone());
            result.reason_codes.push(rule.reason_code().to_string());
            if let Some(note) = &rule.note {
                result.notes.push(note.clone());
            }
            if result.primary_rule_id.is_none() {
                result.primary_rule_id = Some(rule.id.clone());
                result.primary_reason_code = Some(rule.reason_code().to_string());
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, kind: SuppressionKind, field: SuppressionField, pattern: &str) -> SuppressionRule {
        SuppressionRule {
            id: id.to_string(),
            enabled: true,
            kind,
            field,
            pattern: pattern.to_string(),
            case_sensitive: false,
            note: None,
            reason_code: None,
        }
    }

    fn fields<'a>(title: &'a str) -> MatchableFields<'a> {
        MatchableFields {
            title,
            summary: "",
            raw_text: "",
            url: "",
            event_type: "OTHER",
            source_id: "s1",
            tier: "1",
        }
    }

    #[test]
    fn disabled_rule_never_matches() {
        let mut r = rule("r1", SuppressionKind::Keyword, SuppressionField::Title, "storm");
        r.enabled = false;
        let result = evaluate_suppression(&[r], &[], &fields("storm warning"));
        assert!(!result.is_suppressed);
    }

    #[test]
    fn invalid_regex_never_throws_and_does_not_match() {
        let r = rule("r1", SuppressionKind::Regex, SuppressionField::Title, "(unclosed");
        let result = evaluate_suppression(&[r], &[], &fields("unclosed parens"));
        assert!(!result.is_suppressed);
    }

    #[test]
    fn global_then_source_order_picks_first_as_primary() {
        let global = rule("g1", SuppressionKind::Keyword, SuppressionField::Title, "drill");
        let source = rule("s1", SuppressionKind::Keyword, SuppressionField::Title, "storm");
        let result = evaluate_suppression(&[global], &[source], &fields("storm drill update"));
        assert_eq!(result.primary_rule_id.as_deref(), Some("g1"));
        assert_eq!(result.matched_rule_ids, vec!["g1", "s1"]);
    }

    #[test]
    fn any_field_tries_title_summary_raw_text_url_in_order() {
        let r = rule("r1", SuppressionKind::Keyword, SuppressionField::Any, "spill");
        let mut f = fields("");
        f.summary = "oil spill reported";
        let result = evaluate_suppression(&[r], &[], &f);
        assert!(result.is_suppressed);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn rule_strategy(id: &'static str) -> impl Strategy<Value = SuppressionRule> {
        "[a-z]{1,8}".prop_map(move |pattern| SuppressionRule {
            id: id.to_string(),
            enabled: true,
            kind: SuppressionKind::Keyword,
            field: SuppressionField::Title,
            pattern,
            case_sensitive: false,
            note: None,
            reason_code: None,
        })
    }

    proptest! {
        /// spec.md §8: reordering the non-first matches never changes
        /// `is_suppressed` or `primary_rule_id` — only the first match in
        /// evaluation order (global-then-source) matters.
        #[test]
        fn primary_match_is_order_independent_among_trailing_matches(
            first in rule_strategy("first"),
            rest in prop::collection::vec(rule_strategy("trailing"), 0..4),
            title in "[a-z ]{0,24}",
        ) {
            let fields_for = |t: &str| MatchableFields {
                title: t,
                summary: "",
                raw_text: "",
                url: "",
                event_type: "OTHER",
                source_id: "s1",
                tier: "1",
            };

            let mut forward = vec![first.clone()];
            forward.extend(rest.iter().cloned());
            let mut reversed = vec![first.clone()];
            let mut rest_rev = rest.clone();
            rest_rev.reverse();
            reversed.extend(rest_rev);

            let a = evaluate_suppression(&forward, &[], &fields_for(&title));
            let b = evaluate_suppression(&reversed, &[], &fields_for(&title));
            prop_assert_eq!(a.is_suppressed, b.is_suppressed);
            prop_assert_eq!(a.primary_rule_id, b.primary_rule_id);
        }

        /// An invalid regex pattern must never panic the evaluator.
        #[test]
        fn regex_rule_never_panics_on_arbitrary_pattern(pattern in ".{0,16}", text in ".{0,16}") {
            let r = SuppressionRule {
                id: "r".to_string(),
                enabled: true,
                kind: SuppressionKind::Regex,
                field: SuppressionField::Title,
                pattern,
                case_sensitive: false,
                note: None,
                reason_code: None,
            };
            let fields = MatchableFields {
                title: &text,
                summary: "",
                raw_text: "",
                url: "",
                event_type: "OTHER",
                source_id: "s1",
                tier: "1",
            };
            let _ = evaluate_suppression(&[r], &[], &fields);
        }
    }
}
