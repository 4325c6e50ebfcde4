//! Grouping of a flat issue stream by rule, then by issue category.

use std::collections::{
    BTreeMap,
    HashMap,
};
use std::fmt;

use super::IssueRecord;

/// Display subgroup of an issue.
///
/// The derived order is the order subgroups are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueGroup {
    Missing,
    Extra,
    Untranslated,
    Match,
    Condition,
    Variables,
    Structure,
}

impl IssueGroup {
    /// Every group in render order.
    pub const ALL: [Self; 7] = [
        Self::Missing,
        Self::Extra,
        Self::Untranslated,
        Self::Match,
        Self::Condition,
        Self::Variables,
        Self::Structure,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Missing => "Missing in Translation",
            Self::Extra => "Extra in Translation",
            Self::Untranslated => "Untranslated Text",
            Self::Match => "Match Pattern Differences",
            Self::Condition => "Condition Differences",
            Self::Variables => "Variable Differences",
            Self::Structure => "Structure Differences",
        }
    }
}

impl fmt::Display for IssueGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Issues of one category for one rule.
#[derive(Debug, Clone)]
pub struct SubGroup<'a> {
    pub group: IssueGroup,
    pub issues: Vec<&'a IssueRecord>,
}

/// All issues reported for one `(name, tag)` rule.
#[derive(Debug, Clone)]
pub struct RuleGroup<'a> {
    pub rule_name: &'a str,
    pub rule_tag: &'a str,
    /// Non-empty subgroups in render order.
    pub subgroups: Vec<SubGroup<'a>>,
}

impl RuleGroup<'_> {
    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.subgroups.iter().map(|subgroup| subgroup.issues.len()).sum()
    }
}

/// A flat issue stream grouped for rendering.
///
/// Rules appear in the order their first issue appears in the stream.
#[derive(Debug, Clone, Default)]
pub struct GroupedIssues<'a> {
    /// Rule groups in first-appearance order.
    rules: Vec<RuleGroup<'a>>,
    /// Number of issues across all groups.
    total: usize,
}

impl<'a> GroupedIssues<'a> {
    #[must_use]
    pub fn new(issues: &'a [IssueRecord]) -> Self {
        let mut order: Vec<(&'a str, &'a str)> = Vec::new();
        let mut buckets: HashMap<(&'a str, &'a str), BTreeMap<IssueGroup, Vec<&'a IssueRecord>>> =
            HashMap::new();

        for issue in issues {
            let rule = (issue.rule_name.as_str(), issue.rule_tag.as_str());
            let bucket = buckets.entry(rule).or_insert_with(|| {
                order.push(rule);
                BTreeMap::new()
            });
            bucket.entry(issue.group()).or_default().push(issue);
        }

        let rules = order
            .into_iter()
            .filter_map(|rule| {
                let bucket = buckets.remove(&rule)?;
                Some(RuleGroup {
                    rule_name: rule.0,
                    rule_tag: rule.1,
                    subgroups: bucket
                        .into_iter()
                        .map(|(group, issues)| SubGroup { group, issues })
                        .collect(),
                })
            })
            .collect();

        Self { rules, total: issues.len() }
    }

    /// Number of issues, equal to the length of the grouped stream.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RuleGroup<'a>> {
        self.rules.iter()
    }
}

impl<'g, 'a> IntoIterator for &'g GroupedIssues<'a> {
    type Item = &'g RuleGroup<'a>;
    type IntoIter = std::slice::Iter<'g, RuleGroup<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
