//! Test helpers shared by several test modules.
#![cfg(test)]

use crate::rules::{
    BlockKind,
    ContentEntry,
    RuleRecord,
    StructureToken,
};

/// A bare rule with `raw_content` set to a recognizable placeholder.
pub(crate) fn rule(name: &str, tag: &str, line: u32) -> RuleRecord {
    RuleRecord::new(name, tag, line).with_raw_content(format!("- name: {name}\n  tag: {tag}"))
}

/// Appends structure tokens given as `(kind, depth, line)`.
pub(crate) fn with_structure(
    mut rule: RuleRecord,
    tokens: &[(BlockKind, usize, u32)],
) -> RuleRecord {
    rule.structure
        .extend(tokens.iter().map(|&(kind, depth, line)| StructureToken::new(kind, depth, line)));
    rule
}

/// Appends content entries given as `(marker, value, line)`.
///
/// # Panics
/// `marker` is not a content marker.
#[allow(clippy::expect_used)]
pub(crate) fn with_content(mut rule: RuleRecord, entries: &[(&str, &str, u32)]) -> RuleRecord {
    rule.content.extend(entries.iter().map(|&(marker, value, line)| {
        ContentEntry::from_marker(marker, value, line).expect("content marker")
    }));
    rule
}
