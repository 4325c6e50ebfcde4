//! Flattening of a comparison into serializable issue records.

use std::collections::HashMap;

use serde::Serialize;

use super::IssueGroup;
use crate::compare::{
    ComparisonResult,
    DiffType,
};
use crate::rules::RuleRecord;

/// Top-level category of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    MissingRule,
    ExtraRule,
    UntranslatedText,
    RuleDifference,
}

/// One reportable finding, as emitted in JSON-lines output.
///
/// Optional payload fields are omitted from the JSON when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueRecord {
    pub file: String,
    pub language: String,
    pub rule_name: String,
    pub rule_tag: String,
    pub rule_key: String,
    pub issue_type: IssueType,
    /// Line of the finding in the reference file.
    pub issue_line_en: Option<u32>,
    /// Line of the finding in the translated file.
    pub issue_line_tr: Option<u32>,
    /// Start of the owning rule in the reference file.
    pub rule_line_en: Option<u32>,
    /// Start of the owning rule in the translated file.
    pub rule_line_tr: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_type: Option<DiffType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub english_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_snippet: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub untranslated_texts: Vec<String>,
}

impl IssueRecord {
    /// A record for `rule` with every optional field unset.
    fn for_rule(rule: &RuleRecord, issue_type: IssueType, file: &str, language: &str) -> Self {
        Self {
            file: file.to_string(),
            language: language.to_string(),
            rule_name: rule.name.clone(),
            rule_tag: rule.tag.clone(),
            rule_key: rule.key.clone(),
            issue_type,
            issue_line_en: None,
            issue_line_tr: None,
            rule_line_en: None,
            rule_line_tr: None,
            diff_type: None,
            description: None,
            english_snippet: None,
            translated_snippet: None,
            untranslated_texts: Vec::new(),
        }
    }

    /// The display subgroup this issue belongs to.
    #[must_use]
    pub const fn group(&self) -> IssueGroup {
        match (self.issue_type, self.diff_type) {
            (IssueType::MissingRule, _) => IssueGroup::Missing,
            (IssueType::ExtraRule, _) => IssueGroup::Extra,
            (IssueType::UntranslatedText, _) => IssueGroup::Untranslated,
            (IssueType::RuleDifference, Some(DiffType::Match)) => IssueGroup::Match,
            (IssueType::RuleDifference, Some(DiffType::Condition)) => IssueGroup::Condition,
            (IssueType::RuleDifference, Some(DiffType::Variables)) => IssueGroup::Variables,
            (IssueType::RuleDifference, Some(DiffType::Structure) | None) => IssueGroup::Structure,
        }
    }
}

/// Flattens `result` into issue records.
///
/// Order: missing rules, extra rules, one record per untranslated entry, then
/// one record per rule difference.
#[must_use]
pub fn collect_issues(
    result: &ComparisonResult<'_>,
    file_name: &str,
    language_code: &str,
) -> Vec<IssueRecord> {
    let mut issues = Vec::new();

    for rule in &result.missing_rules {
        let mut issue = IssueRecord::for_rule(rule, IssueType::MissingRule, file_name, language_code);
        issue.issue_line_en = Some(rule.line_number);
        issue.rule_line_en = Some(rule.line_number);
        issues.push(issue);
    }

    for rule in &result.extra_rules {
        let mut issue = IssueRecord::for_rule(rule, IssueType::ExtraRule, file_name, language_code);
        issue.issue_line_tr = Some(rule.line_number);
        issue.rule_line_tr = Some(rule.line_number);
        issues.push(issue);
    }

    for untranslated in &result.untranslated_text {
        for entry in &untranslated.entries {
            let mut issue = IssueRecord::for_rule(
                untranslated.rule,
                IssueType::UntranslatedText,
                file_name,
                language_code,
            );
            issue.issue_line_tr = Some(entry.line_number);
            issue.rule_line_tr = Some(untranslated.rule.line_number);
            issue.untranslated_texts = vec![entry.value.clone()];
            issues.push(issue);
        }
    }

    for difference in &result.rule_differences {
        let mut issue = IssueRecord::for_rule(
            difference.english_rule,
            IssueType::RuleDifference,
            file_name,
            language_code,
        );
        issue.issue_line_en = Some(difference.english_line);
        issue.issue_line_tr = Some(difference.translated_line);
        issue.rule_line_en = Some(difference.english_rule.line_number);
        issue.rule_line_tr = Some(difference.translated_rule.line_number);
        issue.diff_type = Some(difference.diff_type);
        issue.description = Some(difference.description.clone());
        issue.english_snippet = Some(difference.english_snippet.clone());
        issue.translated_snippet = Some(difference.translated_snippet.clone());
        issues.push(issue);
    }

    issues
}

/// Source text of the missing and extra rules, keyed by rule key.
///
/// A key is missing or extra, never both, so one map serves both sides.
#[must_use]
pub fn collect_raw_rules(result: &ComparisonResult<'_>) -> HashMap<String, String> {
    result
        .missing_rules
        .iter()
        .chain(&result.extra_rules)
        .map(|rule| (rule.key.clone(), rule.raw_content.clone()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::compare::{
        RuleDifference,
        UntranslatedText,
    };
    use crate::test_utils::{
        rule,
        with_content,
    };

    fn issue_of(issues: &[IssueRecord], issue_type: IssueType) -> &IssueRecord {
        issues.iter().find(|issue| issue.issue_type == issue_type).unwrap()
    }

    #[googletest::test]
    fn collect_issues_fields() {
        let missing = rule("missing", "mo", 10);
        let extra = rule("extra", "mi", 20);
        let untranslated = with_content(rule("untranslated", "mn", 30), &[("t", "x", 31)]);
        let diff_en = rule("diff", "mrow", 40);
        let diff_tr = rule("diff", "mrow", 41);
        let result = ComparisonResult {
            missing_rules: vec![&missing],
            extra_rules: vec![&extra],
            untranslated_text: vec![UntranslatedText {
                rule: &untranslated,
                entries: untranslated.untranslated_entries().collect(),
            }],
            rule_differences: vec![RuleDifference {
                english_rule: &diff_en,
                translated_rule: &diff_tr,
                diff_type: DiffType::Match,
                description: DiffType::Match.description().to_string(),
                english_snippet: "a".to_string(),
                translated_snippet: "b".to_string(),
                english_line: 40,
                translated_line: 41,
            }],
            ..ComparisonResult::default()
        };

        let issues = collect_issues(&result, "file.yaml", "xx");

        assert_that!(issues, len(eq(4)));

        let missing_issue = issue_of(&issues, IssueType::MissingRule);
        expect_that!(missing_issue.issue_line_en, some(eq(10)));
        expect_that!(missing_issue.issue_line_tr, none());
        expect_that!(missing_issue.rule_line_en, some(eq(10)));
        expect_that!(missing_issue.rule_line_tr, none());

        let extra_issue = issue_of(&issues, IssueType::ExtraRule);
        expect_that!(extra_issue.issue_line_en, none());
        expect_that!(extra_issue.issue_line_tr, some(eq(20)));
        expect_that!(extra_issue.rule_line_tr, some(eq(20)));

        let untranslated_issue = issue_of(&issues, IssueType::UntranslatedText);
        expect_that!(untranslated_issue.untranslated_texts, elements_are![eq("x")]);
        expect_that!(untranslated_issue.issue_line_tr, some(eq(31)));
        expect_that!(untranslated_issue.rule_line_tr, some(eq(30)));

        let diff_issue = issue_of(&issues, IssueType::RuleDifference);
        expect_that!(diff_issue.diff_type, some(eq(DiffType::Match)));
        expect_that!(diff_issue.english_snippet, some(eq("a")));
        expect_that!(diff_issue.translated_snippet, some(eq("b")));
        expect_that!(diff_issue.issue_line_en, some(eq(40)));
        expect_that!(diff_issue.issue_line_tr, some(eq(41)));
        expect_that!(diff_issue.rule_line_en, some(eq(40)));
        expect_that!(diff_issue.rule_line_tr, some(eq(41)));
    }

    #[rstest]
    fn one_issue_per_untranslated_entry() {
        let translated =
            with_content(rule("r", "mi", 20), &[("t", "first", 24), ("ct", "second", 25)]);
        let result = ComparisonResult {
            untranslated_text: vec![UntranslatedText {
                rule: &translated,
                entries: translated.untranslated_entries().collect(),
            }],
            ..ComparisonResult::default()
        };

        let issues = collect_issues(&result, "f.yaml", "de");

        let lines: Vec<_> = issues.iter().map(|issue| issue.issue_line_tr).collect();
        assert_eq!(lines, vec![Some(24), Some(25)]);
        assert!(issues.iter().all(|issue| issue.group() == IssueGroup::Untranslated));
    }

    #[rstest]
    fn serialized_record_omits_empty_payload() {
        let missing = rule("m", "mo", 3).with_raw_content("- name: m\n  tag: mo");
        let extra = rule("e", "mi", 8).with_raw_content("- name: e\n  tag: mi");
        let result = ComparisonResult {
            missing_rules: vec![&missing],
            extra_rules: vec![&extra],
            ..ComparisonResult::default()
        };

        let issues = collect_issues(&result, "f.yaml", "de");
        let missing_json: serde_json::Value = serde_json::to_value(&issues[0]).unwrap();
        let extra_json: serde_json::Value = serde_json::to_value(&issues[1]).unwrap();

        assert_that!(missing_json["issue_type"].as_str(), some(eq("missing_rule")));
        assert_that!(missing_json["issue_line_tr"].is_null(), eq(true));
        assert_that!(missing_json.get("english_raw"), none());
        assert_that!(missing_json.get("diff_type"), none());
        assert_that!(missing_json.get("untranslated_texts"), none());
        assert_that!(extra_json["issue_type"].as_str(), some(eq("extra_rule")));
        assert_that!(extra_json.get("translated_raw"), none());
    }

    #[rstest]
    fn raw_rules_cover_missing_and_extra_only() {
        let missing = rule("m", "mo", 3);
        let extra = rule("e", "mi", 8);
        let untranslated = with_content(rule("u", "mn", 12), &[("t", "x", 13)]);
        let result = ComparisonResult {
            missing_rules: vec![&missing],
            extra_rules: vec![&extra],
            untranslated_text: vec![UntranslatedText {
                rule: &untranslated,
                entries: untranslated.untranslated_entries().collect(),
            }],
            ..ComparisonResult::default()
        };

        let raw = collect_raw_rules(&result);

        assert_that!(raw, len(eq(2)));
        assert_that!(raw.get("m|mo").map(String::as_str), some(eq("- name: m\n  tag: mo")));
        assert_that!(raw.get("e|mi").map(String::as_str), some(eq("- name: e\n  tag: mi")));
    }
}
