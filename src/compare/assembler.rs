//! Rule set assembly: key indexing and region overlay.

use std::collections::HashMap;

use super::{
    CompareError,
    RuleSetKind,
};
use crate::rules::RuleRecord;

/// Rules indexed by key, remembering their display order.
#[derive(Debug, Default)]
pub struct IndexedRules<'a> {
    /// Rules in display order.
    order: Vec<&'a RuleRecord>,
    /// Key to index into `order`.
    positions: HashMap<&'a str, usize>,
}

impl<'a> IndexedRules<'a> {
    /// Indexes one rule sequence.
    ///
    /// # Errors
    /// Two rules in `rules` share a key.
    pub fn from_rules(rules: &'a [RuleRecord], set: RuleSetKind) -> Result<Self, CompareError> {
        let mut indexed = Self::default();
        for rule in rules {
            indexed.insert_unique(rule, set)?;
        }
        Ok(indexed)
    }

    /// Adds `rule`, failing when its key is already present.
    fn insert_unique(&mut self, rule: &'a RuleRecord, set: RuleSetKind) -> Result<(), CompareError> {
        if let Some(&position) = self.positions.get(rule.key.as_str()) {
            let first_line = self.order.get(position).map_or(0, |first| first.line_number);
            return Err(CompareError::DuplicateRuleKey {
                key: rule.key.clone(),
                set,
                first_line,
                second_line: rule.line_number,
            });
        }
        self.positions.insert(rule.key.as_str(), self.order.len());
        self.order.push(rule);
        Ok(())
    }

    /// Lays `overlay` on top: a rule with a known key replaces it in place,
    /// a novel key is appended.
    ///
    /// # Errors
    /// Two rules in `overlay` share a key.
    pub fn overlay(
        &mut self,
        overlay: &'a [RuleRecord],
        set: RuleSetKind,
    ) -> Result<(), CompareError> {
        // Duplicates are checked within the overlay alone.
        Self::from_rules(overlay, set)?;

        for rule in overlay {
            match self.positions.get(rule.key.as_str()).copied() {
                Some(position) => {
                    if let Some(slot) = self.order.get_mut(position) {
                        tracing::debug!(key = %rule.key, line = rule.line_number, "Region rule overrides base rule");
                        *slot = rule;
                    }
                }
                None => {
                    self.positions.insert(rule.key.as_str(), self.order.len());
                    self.order.push(rule);
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a RuleRecord> {
        self.positions.get(key).and_then(|&position| self.order.get(position)).copied()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Rules in source order (base order, region rules appended).
    pub fn iter(&self) -> impl Iterator<Item = &'a RuleRecord> + '_ {
        self.order.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Reference and translated rules, each indexed by key.
#[derive(Debug)]
pub struct AssembledRules<'a> {
    pub reference: IndexedRules<'a>,
    pub translated: IndexedRules<'a>,
}

/// Indexes the reference set and the translated set (base plus optional region overlay).
///
/// # Errors
/// A key appears twice within the reference, base, or region sequence.
pub fn assemble<'a>(
    reference: &'a [RuleRecord],
    translated: &'a [RuleRecord],
    region: Option<&'a [RuleRecord]>,
) -> Result<AssembledRules<'a>, CompareError> {
    let reference = IndexedRules::from_rules(reference, RuleSetKind::Reference)?;
    let mut translated_rules = IndexedRules::from_rules(translated, RuleSetKind::Translated)?;
    if let Some(region) = region {
        translated_rules.overlay(region, RuleSetKind::Region)?;
    }

    Ok(AssembledRules { reference, translated: translated_rules })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::test_utils::rule;

    fn keys(rules: &IndexedRules<'_>) -> Vec<String> {
        rules.iter().map(|rule| rule.key.clone()).collect()
    }

    #[rstest]
    fn assemble_indexes_reference_and_translated() {
        let reference = vec![rule("a", "mo", 1), rule("b", "mi", 5)];
        let translated = vec![rule("b", "mi", 2)];

        let assembled = assemble(&reference, &translated, None).unwrap();

        assert_eq!(keys(&assembled.reference), vec!["a|mo", "b|mi"]);
        assert_eq!(keys(&assembled.translated), vec!["b|mi"]);
        assert!(assembled.translated.contains_key("b|mi"));
        assert!(!assembled.translated.contains_key("a|mo"));
    }

    #[rstest]
    fn region_rule_replaces_base_rule_in_place() {
        let reference: Vec<RuleRecord> = Vec::new();
        let translated = vec![rule("a", "mo", 1), rule("b", "mi", 5)];
        let region = vec![rule("a", "mo", 30), rule("c", "mn", 40)];

        let assembled = assemble(&reference, &translated, Some(region.as_slice())).unwrap();

        assert_eq!(keys(&assembled.translated), vec!["a|mo", "b|mi", "c|mn"]);
        assert_that!(assembled.translated.get("a|mo").map(|r| r.line_number), some(eq(30)));
        assert_that!(assembled.translated.len(), eq(3));
    }

    #[rstest]
    #[case::reference(RuleSetKind::Reference)]
    #[case::translated(RuleSetKind::Translated)]
    #[case::region(RuleSetKind::Region)]
    fn duplicate_key_is_a_configuration_error(#[case] set: RuleSetKind) {
        let duplicated = vec![rule("a", "mo", 3), rule("a", "mo", 9)];
        let clean = vec![rule("a", "mo", 1)];
        let (reference, translated, region) = match set {
            RuleSetKind::Reference => (&duplicated, &clean, None),
            RuleSetKind::Translated => (&clean, &duplicated, None),
            RuleSetKind::Region => (&clean, &clean, Some(duplicated.as_slice())),
        };

        let result = assemble(reference, translated, region);

        assert!(matches!(
            result,
            Err(CompareError::DuplicateRuleKey { ref key, set: reported, first_line: 3, second_line: 9 })
                if key == "a|mo" && reported == set
        ));
    }
}
