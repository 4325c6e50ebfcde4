//! Rule comparison engine.
//!
//! Matches reference rules to translated rules by key and reports what is
//! missing, what is extra, what was left untranslated, and where matched rules
//! diverge. A comparison borrows its inputs, is fully synchronous, and returns
//! either a complete [`ComparisonResult`] or a [`CompareError`].

pub mod assembler;
/// Per-field comparison of a matched pair
mod fields;
pub mod structure;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub use assembler::{
    AssembledRules,
    IndexedRules,
    assemble,
};
pub use structure::{
    Alignment,
    BlockPair,
    align,
};

use crate::rules::{
    ContentEntry,
    RuleRecord,
};

/// Which input sequence a rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleSetKind {
    Reference,
    Translated,
    Region,
}

impl fmt::Display for RuleSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reference => "reference",
            Self::Translated => "translated",
            Self::Region => "region",
        };
        f.write_str(name)
    }
}

/// Errors that abort a comparison.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompareError {
    #[error(
        "Duplicate rule key '{key}' in {set} rules (lines {first_line} and {second_line})"
    )]
    DuplicateRuleKey { key: String, set: RuleSetKind, first_line: u32, second_line: u32 },
}

/// Field in which a matched pair diverges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffType {
    Match,
    Condition,
    Variables,
    Structure,
}

impl DiffType {
    /// Human-readable description attached to every difference of this type.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Match => "Match pattern differs",
            Self::Condition => "Conditions differ",
            Self::Variables => "Variable definitions differ",
            Self::Structure => "Rule structure differs",
        }
    }
}

/// One divergence between a matched reference/translated rule pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDifference<'a> {
    pub english_rule: &'a RuleRecord,
    pub translated_rule: &'a RuleRecord,
    pub diff_type: DiffType,
    pub description: String,
    pub english_snippet: String,
    pub translated_snippet: String,
    /// Line the difference is attributed to in the reference file.
    pub english_line: u32,
    /// Line the difference is attributed to in the translated file.
    pub translated_line: u32,
}

/// Content of a translated rule that still holds the reference text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UntranslatedText<'a> {
    pub rule: &'a RuleRecord,
    pub entries: Vec<&'a ContentEntry>,
}

/// Everything found while comparing one reference file to its translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonResult<'a> {
    /// Reference rules with no translated counterpart, in reference order.
    pub missing_rules: Vec<&'a RuleRecord>,
    /// Translated rules with no reference counterpart, in translated order.
    pub extra_rules: Vec<&'a RuleRecord>,
    pub untranslated_text: Vec<UntranslatedText<'a>>,
    pub rule_differences: Vec<RuleDifference<'a>>,
    pub file_path: String,
    pub english_rule_count: usize,
    pub translated_rule_count: usize,
    /// Matched pairs whose structure comparison was skipped as unreliable.
    pub misaligned_structures: usize,
}

/// Compares a reference rule set with a translated one.
///
/// `region` rules are layered on top of `translated` before matching.
///
/// # Errors
/// [`CompareError::DuplicateRuleKey`] when a key repeats within the reference,
/// translated, or region sequence.
pub fn compare<'a>(
    reference: &'a [RuleRecord],
    translated: &'a [RuleRecord],
    region: Option<&'a [RuleRecord]>,
) -> Result<ComparisonResult<'a>, CompareError> {
    let assembled = assemble(reference, translated, region)?;
    let mut result = ComparisonResult {
        english_rule_count: assembled.reference.len(),
        translated_rule_count: assembled.translated.len(),
        ..ComparisonResult::default()
    };

    for english in assembled.reference.iter() {
        let Some(translated) = assembled.translated.get(&english.key) else {
            result.missing_rules.push(english);
            continue;
        };

        if translated.suppressed {
            tracing::debug!(key = %translated.key, line = translated.line_number, "Rule suppressed by ignore marker");
            continue;
        }

        let entries: Vec<_> = translated.untranslated_entries().collect();
        if !entries.is_empty() {
            result.untranslated_text.push(UntranslatedText { rule: translated, entries });
        }

        let diff = fields::diff_pair(english, translated);
        result.rule_differences.extend(diff.differences);
        if diff.misaligned {
            result.misaligned_structures += 1;
        }
    }

    result.extra_rules = assembled
        .translated
        .iter()
        .filter(|rule| !assembled.reference.contains_key(&rule.key))
        .collect();

    tracing::debug!(
        missing = result.missing_rules.len(),
        extra = result.extra_rules.len(),
        untranslated = result.untranslated_text.len(),
        differences = result.rule_differences.len(),
        misaligned = result.misaligned_structures,
        "Comparison finished"
    );

    Ok(result)
}
