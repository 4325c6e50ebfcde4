//! Structural alignment of conditional blocks.
//!
//! Decides whether a difference between the block sequences of two matched
//! rules can be attributed to specific blocks, or whether the sequences are so
//! far out of step that any positional pairing would point at the wrong block.

use crate::rules::StructureToken;

/// Two blocks at the same logical position; `None` marks the side lacking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPair<'a> {
    pub english: Option<&'a StructureToken>,
    pub translated: Option<&'a StructureToken>,
}

/// Outcome of aligning two block sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alignment<'a> {
    /// Both sides have the same blocks in the same order.
    Identical,
    /// The divergence is attributable to these positions.
    Divergent(Vec<BlockPair<'a>>),
    /// Positional pairing would associate unrelated blocks.
    Misaligned,
}

/// Aligns the block sequences of a reference rule and its translation.
///
/// - Equal length where every pair has the same shape: each position whose
///   block kind differs is reported.
/// - Lengths differing by one where a single block can be removed from the
///   longer side to obtain the shorter: that block is reported against `None`.
///   When identical adjacent blocks make the index ambiguous, the trailing one
///   is reported.
/// - Anything else is [`Alignment::Misaligned`].
#[must_use]
pub fn align<'a>(english: &'a [StructureToken], translated: &'a [StructureToken]) -> Alignment<'a> {
    if english.len() == translated.len() {
        return align_equal_length(english, translated);
    }

    if english.len().abs_diff(translated.len()) == 1 {
        let english_is_longer = english.len() > translated.len();
        let (longer, shorter) =
            if english_is_longer { (english, translated) } else { (translated, english) };

        return match single_removal_index(longer, shorter) {
            Some(index) => {
                let present = longer.get(index);
                let pair = if english_is_longer {
                    BlockPair { english: present, translated: None }
                } else {
                    BlockPair { english: None, translated: present }
                };
                Alignment::Divergent(vec![pair])
            }
            None => Alignment::Misaligned,
        };
    }

    Alignment::Misaligned
}

/// Pairs equal-length sequences position by position.
fn align_equal_length<'a>(
    english: &'a [StructureToken],
    translated: &'a [StructureToken],
) -> Alignment<'a> {
    if !english.iter().zip(translated).all(|(en, tr)| en.same_shape(tr)) {
        return Alignment::Misaligned;
    }

    let pairs: Vec<_> = english
        .iter()
        .zip(translated)
        .filter(|(en, tr)| !en.same_block(tr))
        .map(|(en, tr)| BlockPair { english: Some(en), translated: Some(tr) })
        .collect();

    if pairs.is_empty() { Alignment::Identical } else { Alignment::Divergent(pairs) }
}

/// The last index whose removal turns `longer` into `shorter`.
///
/// Every index that works holds the same block, so the choice only affects the
/// reported line. Returns `None` when no index works.
fn single_removal_index(longer: &[StructureToken], shorter: &[StructureToken]) -> Option<usize> {
    let prefix = longer.iter().zip(shorter).take_while(|(a, b)| a.same_block(b)).count();
    let suffix = longer
        .iter()
        .rev()
        .zip(shorter.iter().rev())
        .take_while(|(a, b)| a.same_block(b))
        .count();

    // Removing index i works iff longer[..i] matches and longer[i + 1..] matches,
    // i.e. i <= prefix and i >= longer.len() - 1 - suffix.
    let lowest = (longer.len() - 1).saturating_sub(suffix);
    let highest = prefix.min(longer.len() - 1);

    (lowest <= highest).then_some(highest)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::rules::BlockKind::{
        self,
        Else,
        ElseTest,
        If,
        Test,
        Then,
        ThenTest,
    };

    /// Builds tokens at consecutive lines starting from `first_line`.
    fn tokens(first_line: u32, blocks: &[(BlockKind, usize)]) -> Vec<StructureToken> {
        blocks
            .iter()
            .zip(first_line..)
            .map(|(&(kind, depth), line)| StructureToken::new(kind, depth, line))
            .collect()
    }

    fn lines(pairs: &[BlockPair<'_>]) -> Vec<(Option<u32>, Option<u32>)> {
        pairs
            .iter()
            .map(|pair| {
                (pair.english.map(|t| t.line_number), pair.translated.map(|t| t.line_number))
            })
            .collect()
    }

    const IF_THEN_ELSE: &[(BlockKind, usize)] = &[(Test, 0), (If, 1), (Then, 1), (Else, 1)];
    const IF_THEN: &[(BlockKind, usize)] = &[(Test, 0), (If, 1), (Then, 1)];

    #[rstest]
    fn identical_sequences() {
        let en = tokens(10, IF_THEN_ELSE);
        let tr = tokens(50, IF_THEN_ELSE);

        assert_eq!(align(&en, &tr), Alignment::Identical);
    }

    #[rstest]
    fn empty_sequences_are_identical() {
        assert_eq!(align(&[], &[]), Alignment::Identical);
    }

    #[rstest]
    fn one_content_difference_is_reported_at_both_lines() {
        let en = tokens(10, IF_THEN_ELSE);
        let tr = tokens(50, &[(Test, 0), (If, 1), (Then, 1), (ElseTest, 1)]);

        let Alignment::Divergent(pairs) = align(&en, &tr) else {
            panic!("expected a divergent alignment");
        };

        assert_eq!(lines(&pairs), vec![(Some(13), Some(53))]);
    }

    #[rstest]
    #[case::missing_in_translation(IF_THEN_ELSE, IF_THEN, vec![(Some(13), None)])]
    #[case::extra_in_translation(IF_THEN, IF_THEN_ELSE, vec![(None, Some(53))])]
    fn missing_trailing_block_is_reported(
        #[case] english: &[(BlockKind, usize)],
        #[case] translated: &[(BlockKind, usize)],
        #[case] expected: Vec<(Option<u32>, Option<u32>)>,
    ) {
        let en = tokens(10, english);
        let tr = tokens(50, translated);

        let Alignment::Divergent(pairs) = align(&en, &tr) else {
            panic!("expected a divergent alignment");
        };

        assert_eq!(lines(&pairs), expected);
    }

    #[rstest]
    fn missing_inner_block_is_reported() {
        let en = tokens(10, &[(Test, 0), (If, 1), (ThenTest, 1), (If, 2), (Then, 2), (Else, 1)]);
        let tr = tokens(50, &[(Test, 0), (If, 1), (ThenTest, 1), (If, 2), (Else, 1)]);

        let Alignment::Divergent(pairs) = align(&en, &tr) else {
            panic!("expected a divergent alignment");
        };

        assert_eq!(lines(&pairs), vec![(Some(14), None)]);
    }

    #[rstest]
    #[case::trailing_repeat_missing(
        &[(Test, 0), (If, 1), (Then, 1), (Else, 1), (Else, 1)],
        &[(Test, 0), (If, 1), (Then, 1), (Else, 1)],
        vec![(Some(14), None)]
    )]
    #[case::inner_repeat_extra(
        &[(Test, 0), (If, 1), (Then, 1)],
        &[(Test, 0), (If, 1), (If, 1), (Then, 1)],
        vec![(None, Some(52))]
    )]
    fn repeated_block_omission_reports_trailing_block(
        #[case] english: &[(BlockKind, usize)],
        #[case] translated: &[(BlockKind, usize)],
        #[case] expected: Vec<(Option<u32>, Option<u32>)>,
    ) {
        let en = tokens(10, english);
        let tr = tokens(50, translated);

        let Alignment::Divergent(pairs) = align(&en, &tr) else {
            panic!("expected a divergent alignment");
        };

        assert_eq!(lines(&pairs), expected);
    }

    #[rstest]
    #[case::extra_unrelated_block(
        IF_THEN_ELSE,
        &[(Test, 0), (If, 1), (Then, 1), (Test, 0), (If, 1), (Then, 1)]
    )]
    #[case::shifted_test_block(
        &[(Test, 0), (If, 1), (Then, 1), (Else, 1)],
        &[(If, 1), (Test, 0), (Then, 1), (Else, 1)]
    )]
    #[case::depth_mismatch(
        &[(Test, 0), (If, 1), (Then, 1)],
        &[(Test, 0), (If, 1), (Then, 2)]
    )]
    #[case::omission_and_replacement(
        &[(Test, 0), (If, 1), (Then, 1), (Else, 1)],
        &[(Test, 0), (If, 1), (ElseTest, 1)]
    )]
    fn misaligned_sequences_are_suppressed(
        #[case] english: &[(BlockKind, usize)],
        #[case] translated: &[(BlockKind, usize)],
    ) {
        let en = tokens(10, english);
        let tr = tokens(50, translated);

        assert_eq!(align(&en, &tr), Alignment::Misaligned);
    }

    #[rstest]
    #[case::first(vec![Else, If, Then], vec![If, Then], Some(0))]
    #[case::middle(vec![If, Else, Then], vec![If, Then], Some(1))]
    #[case::last(vec![If, Then, Else], vec![If, Then], Some(2))]
    #[case::repeated(vec![If, Then, Then], vec![If, Then], Some(2))]
    #[case::repeated_first(vec![If, If, Then], vec![If, Then], Some(1))]
    #[case::unrelated(vec![If, Then, Else], vec![Test, Then], None)]
    fn single_removal_index_cases(
        #[case] longer: Vec<BlockKind>,
        #[case] shorter: Vec<BlockKind>,
        #[case] expected: Option<usize>,
    ) {
        let longer: Vec<_> = longer.into_iter().map(|kind| StructureToken::new(kind, 0, 1)).collect();
        let shorter: Vec<_> =
            shorter.into_iter().map(|kind| StructureToken::new(kind, 0, 1)).collect();

        assert_eq!(single_removal_index(&longer, &shorter), expected);
    }
}
