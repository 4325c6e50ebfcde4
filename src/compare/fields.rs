//! Field-level comparison of one matched rule pair.

use super::structure::{
    Alignment,
    align,
};
use super::{
    DiffType,
    RuleDifference,
};
use crate::rules::{
    RuleRecord,
    StructureToken,
    field,
};

/// Differences between a reference rule and its translation, in the order
/// match, conditions, variables, structure.
#[derive(Debug, Default)]
pub(super) struct PairDiff<'a> {
    /// Reported differences.
    pub(super) differences: Vec<RuleDifference<'a>>,
    /// Set when structure comparison was skipped as misaligned.
    pub(super) misaligned: bool,
}

/// Compares every audited field of a matched pair.
pub(super) fn diff_pair<'a>(english: &'a RuleRecord, translated: &'a RuleRecord) -> PairDiff<'a> {
    let mut diff = PairDiff::default();
    diff.differences.extend(diff_match(english, translated));
    diff.differences.extend(diff_conditions(english, translated));
    diff.differences.extend(diff_variables(english, translated));

    match align(&english.structure, &translated.structure) {
        Alignment::Identical => {}
        Alignment::Divergent(pairs) => {
            let english_snippet = structure_snippet(&english.structure);
            let translated_snippet = structure_snippet(&translated.structure);
            for pair in pairs {
                diff.differences.push(RuleDifference {
                    english_rule: english,
                    translated_rule: translated,
                    diff_type: DiffType::Structure,
                    description: DiffType::Structure.description().to_string(),
                    english_snippet: english_snippet.clone(),
                    translated_snippet: translated_snippet.clone(),
                    english_line: pair.english.map_or(english.line_number, |t| t.line_number),
                    translated_line: pair
                        .translated
                        .map_or(translated.line_number, |t| t.line_number),
                });
            }
        }
        Alignment::Misaligned => {
            tracing::debug!(
                key = %english.key,
                english_line = english.line_number,
                translated_line = translated.line_number,
                "Skipping misaligned structure comparison"
            );
            diff.misaligned = true;
        }
    }

    diff
}

/// Builds a difference attributed to the first line of `field_name` on each side.
fn field_difference<'a>(
    english: &'a RuleRecord,
    translated: &'a RuleRecord,
    diff_type: DiffType,
    field_name: &str,
    english_snippet: String,
    translated_snippet: String,
) -> RuleDifference<'a> {
    RuleDifference {
        english_rule: english,
        translated_rule: translated,
        diff_type,
        description: diff_type.description().to_string(),
        english_snippet,
        translated_snippet,
        english_line: english.field_line_or_start(field_name),
        translated_line: translated.field_line_or_start(field_name),
    }
}

/// Compares the normalized match expressions.
fn diff_match<'a>(english: &'a RuleRecord, translated: &'a RuleRecord) -> Option<RuleDifference<'a>> {
    if english.match_expr == translated.match_expr {
        return None;
    }
    Some(field_difference(
        english,
        translated,
        DiffType::Match,
        field::MATCH,
        english.match_expr.clone().unwrap_or_default(),
        translated.match_expr.clone().unwrap_or_default(),
    ))
}

/// Compares guard expressions as an ordered list.
fn diff_conditions<'a>(
    english: &'a RuleRecord,
    translated: &'a RuleRecord,
) -> Option<RuleDifference<'a>> {
    if english.conditions == translated.conditions {
        return None;
    }
    Some(field_difference(
        english,
        translated,
        DiffType::Condition,
        field::CONDITION,
        english.conditions.join(" | "),
        translated.conditions.join(" | "),
    ))
}

/// Compares variable bindings as an unordered set.
fn diff_variables<'a>(
    english: &'a RuleRecord,
    translated: &'a RuleRecord,
) -> Option<RuleDifference<'a>> {
    if english.variables == translated.variables {
        return None;
    }
    Some(field_difference(
        english,
        translated,
        DiffType::Variables,
        field::VARIABLES,
        variables_snippet(english),
        variables_snippet(translated),
    ))
}

/// `name=value` pairs joined with commas.
fn variables_snippet(rule: &RuleRecord) -> String {
    rule.variables
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Block keys joined with spaces.
fn structure_snippet(tokens: &[StructureToken]) -> String {
    tokens.iter().map(|token| token.kind.as_str()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::rules::BlockKind;
    use crate::test_utils::{
        rule,
        with_structure,
    };

    fn types(diff: &PairDiff<'_>) -> Vec<DiffType> {
        diff.differences.iter().map(|d| d.diff_type).collect()
    }

    #[rstest]
    fn identical_rules_have_no_differences() {
        let english = rule("r", "mo", 1).with_match("self::m:mo");
        let translated = rule("r", "mo", 7).with_match("self::m:mo");

        let diff = diff_pair(&english, &translated);

        assert_that!(diff.differences, is_empty());
        assert_that!(diff.misaligned, eq(false));
    }

    #[rstest]
    fn match_difference_is_attributed_to_match_lines() {
        let english = rule("r", "mo", 1).with_match(". = 'x'").with_lines(field::MATCH, [3]);
        let translated = rule("r", "mo", 20).with_match(". = 'y'").with_lines(field::MATCH, [22]);

        let diff = diff_pair(&english, &translated);

        assert_eq!(types(&diff), vec![DiffType::Match]);
        let difference = &diff.differences[0];
        assert_that!(difference.description, eq("Match pattern differs"));
        assert_that!(difference.english_snippet, eq(". = 'x'"));
        assert_that!(difference.translated_snippet, eq(". = 'y'"));
        assert_that!(difference.english_line, eq(3));
        assert_that!(difference.translated_line, eq(22));
    }

    #[rstest]
    fn condition_order_matters() {
        let mut english = rule("r", "mo", 1).with_lines(field::CONDITION, [5, 8]);
        english.conditions = vec!["$A".to_string(), "$B".to_string()];
        let mut translated = rule("r", "mo", 1);
        translated.conditions = vec!["$B".to_string(), "$A".to_string()];

        let diff = diff_pair(&english, &translated);

        assert_eq!(types(&diff), vec![DiffType::Condition]);
        assert_that!(diff.differences[0].english_snippet, eq("$A | $B"));
        assert_that!(diff.differences[0].english_line, eq(5));
        // No condition lines on the translated side: fall back to the rule line.
        assert_that!(diff.differences[0].translated_line, eq(1));
    }

    #[rstest]
    fn variable_order_does_not_matter() {
        let mut english = rule("r", "mo", 1);
        english.variables = [("a", "1"), ("b", "2")]
            .into_iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();
        let mut translated = rule("r", "mo", 1);
        translated.variables = [("b", "2"), ("a", "1")]
            .into_iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();

        assert_that!(diff_pair(&english, &translated).differences, is_empty());

        translated.variables.insert(("c".to_string(), "3".to_string()));
        let diff = diff_pair(&english, &translated);

        assert_eq!(types(&diff), vec![DiffType::Variables]);
        assert_that!(diff.differences[0].translated_snippet, eq("a=1, b=2, c=3"));
    }

    #[rstest]
    fn missing_else_falls_back_to_rule_line() {
        let english = with_structure(
            rule("r", "mo", 1),
            &[(BlockKind::Test, 0, 3), (BlockKind::If, 1, 4), (BlockKind::Then, 1, 5), (BlockKind::Else, 1, 6)],
        );
        let translated = with_structure(
            rule("r", "mo", 1),
            &[(BlockKind::Test, 0, 3), (BlockKind::If, 1, 4), (BlockKind::Then, 1, 5)],
        );

        let diff = diff_pair(&english, &translated);

        assert_eq!(types(&diff), vec![DiffType::Structure]);
        let difference = &diff.differences[0];
        assert_that!(difference.description, eq("Rule structure differs"));
        assert_that!(difference.english_line, eq(6));
        assert_that!(difference.translated_line, eq(1));
        assert_that!(difference.english_snippet, eq("test if then else"));
        assert_that!(difference.translated_snippet, eq("test if then"));
    }

    #[rstest]
    fn repeated_trailing_else_reports_one_structure_difference() {
        let english = with_structure(
            rule("r", "mo", 2),
            &[
                (BlockKind::Test, 0, 3),
                (BlockKind::If, 1, 4),
                (BlockKind::Then, 1, 5),
                (BlockKind::Else, 1, 6),
                (BlockKind::Else, 1, 7),
            ],
        );
        let translated = with_structure(
            rule("r", "mo", 2),
            &[(BlockKind::Test, 0, 3), (BlockKind::If, 1, 4), (BlockKind::Then, 1, 5), (BlockKind::Else, 1, 6)],
        );

        let diff = diff_pair(&english, &translated);

        assert_eq!(types(&diff), vec![DiffType::Structure]);
        assert_that!(diff.misaligned, eq(false));
        assert_that!(diff.differences[0].english_line, eq(7));
        assert_that!(diff.differences[0].translated_line, eq(2));
    }

    #[rstest]
    fn misaligned_structure_is_flagged_not_reported() {
        let english = with_structure(
            rule("r", "mo", 1),
            &[(BlockKind::Test, 0, 3), (BlockKind::If, 1, 4), (BlockKind::Then, 1, 5)],
        );
        let translated = with_structure(
            rule("r", "mo", 1),
            &[
                (BlockKind::Test, 0, 3),
                (BlockKind::If, 1, 4),
                (BlockKind::Then, 1, 5),
                (BlockKind::Test, 0, 6),
                (BlockKind::If, 1, 7),
                (BlockKind::Then, 1, 8),
            ],
        );

        let diff = diff_pair(&english, &translated);

        assert_that!(diff.differences, is_empty());
        assert_that!(diff.misaligned, eq(true));
    }
}
