//! Issue category filter, as given to `--only`.

use std::collections::BTreeSet;

use thiserror::Error;

use super::{
    IssueGroup,
    IssueRecord,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Unknown issue types: {}", .0.join(", "))]
    UnknownCategories(Vec<String>),

    #[error("No issue types given")]
    Empty,
}

/// The set of subgroups to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueFilter {
    /// Kept subgroups.
    groups: BTreeSet<IssueGroup>,
}

impl Default for IssueFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl IssueFilter {
    /// A filter that keeps everything.
    #[must_use]
    pub fn all() -> Self {
        Self { groups: IssueGroup::ALL.into_iter().collect() }
    }

    /// Parses a comma-separated category list such as `missing,extra`.
    ///
    /// `diff` selects every difference subgroup. Whitespace around tokens is
    /// ignored and tokens are case-insensitive.
    pub fn parse(list: &str) -> Result<Self, FilterError> {
        let mut groups = BTreeSet::new();
        let mut unknown = Vec::new();

        for token in list.split(',').map(str::trim).filter(|token| !token.is_empty()) {
            match Self::groups_for(&token.to_ascii_lowercase()) {
                Some(selected) => groups.extend(selected.iter().copied()),
                None => unknown.push(token.to_string()),
            }
        }

        if !unknown.is_empty() {
            return Err(FilterError::UnknownCategories(unknown));
        }
        if groups.is_empty() {
            return Err(FilterError::Empty);
        }
        Ok(Self { groups })
    }

    /// Subgroups named by one token.
    fn groups_for(token: &str) -> Option<&'static [IssueGroup]> {
        let groups: &'static [IssueGroup] = match token {
            "missing" => &[IssueGroup::Missing],
            "extra" => &[IssueGroup::Extra],
            "untranslated" => &[IssueGroup::Untranslated],
            "diff" => {
                &[IssueGroup::Match, IssueGroup::Condition, IssueGroup::Variables, IssueGroup::Structure]
            }
            "match" => &[IssueGroup::Match],
            "condition" => &[IssueGroup::Condition],
            "variables" => &[IssueGroup::Variables],
            "structure" => &[IssueGroup::Structure],
            _ => return None,
        };
        Some(groups)
    }

    #[must_use]
    pub fn includes(&self, group: IssueGroup) -> bool {
        self.groups.contains(&group)
    }

    #[must_use]
    pub fn matches(&self, issue: &IssueRecord) -> bool {
        self.includes(issue.group())
    }

    /// Drops every issue outside the filter, keeping order.
    #[must_use]
    pub fn apply(&self, issues: Vec<IssueRecord>) -> Vec<IssueRecord> {
        issues.into_iter().filter(|issue| self.matches(issue)).collect()
    }
}
