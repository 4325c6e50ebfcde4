//! Rule file loader.
//!
//! A rule file is a YAML sequence of rule mappings. Each top-level item is
//! parsed on its own with `serde_yaml` so that one malformed rule reports its
//! own line, and a line scanner attributes source lines to the values found in
//! the parsed tree.

use std::collections::{
    BTreeSet,
    HashMap,
    VecDeque,
};
use std::path::Path;

use serde_yaml::{
    Mapping,
    Value,
};

use super::{
    BlockKind,
    ContentEntry,
    ContentKind,
    LoadError,
    RuleRecord,
    StructureToken,
    field,
};

/// Top-level keys that never hold replacement content.
const HEADER_KEYS: &[&str] = &["name", "tag", field::MATCH, field::VARIABLES];

/// Reads and parses a rule file.
///
/// # Errors
/// - The file cannot be read
/// - A rule item is not valid YAML or not a mapping
pub fn load_rule_file(path: &Path, ignore_marker: &str) -> Result<Vec<RuleRecord>, LoadError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;

    tracing::debug!(path = %path.display(), "Loading rule file");
    parse_rules(&content, ignore_marker)
}

/// Parses the rules of one YAML document.
///
/// Items without both `name` and `tag` (e.g. `include:` directives) are skipped.
///
/// # Errors
/// A rule item is not valid YAML or not a mapping.
pub fn parse_rules(text: &str, ignore_marker: &str) -> Result<Vec<RuleRecord>, LoadError> {
    let mut rules = Vec::new();
    for item in split_items(text) {
        if let Some(rule) = parse_item(&item, ignore_marker)? {
            rules.push(rule);
        }
    }
    Ok(rules)
}

/// Source lines of one top-level sequence item.
#[derive(Debug)]
struct Item<'t> {
    /// Line of the `- ` that opens the item.
    start_line: u32,
    /// Raw lines, the opening one included.
    lines: Vec<&'t str>,
}

impl Item<'_> {
    /// Document line of the `offset`-th line of the item.
    fn line_number(&self, offset: usize) -> u32 {
        self.start_line.saturating_add(u32::try_from(offset).unwrap_or(u32::MAX))
    }

    /// Item text without trailing blank or comment-only lines.
    fn raw_content(&self) -> String {
        let keep = self
            .lines
            .iter()
            .rposition(|line| !is_blank_or_comment(line))
            .map_or(0, |index| index + 1);
        self.lines.iter().take(keep).copied().collect::<Vec<_>>().join("\n")
    }
}

/// Blank or comment-only line.
fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Splits a document at column-0 `- ` lines.
fn split_items(text: &str) -> Vec<Item<'_>> {
    let mut items = Vec::new();
    let mut current: Option<Item<'_>> = None;

    for (index, line) in text.lines().enumerate() {
        let line_number = u32::try_from(index + 1).unwrap_or(u32::MAX);
        if line.starts_with("- ") || line == "-" {
            items.extend(current.take());
            current = Some(Item { start_line: line_number, lines: vec![line] });
        } else if line.starts_with("---") || line.starts_with("...") {
            items.extend(current.take());
        } else if let Some(item) = current.as_mut() {
            item.lines.push(line);
        }
    }
    items.extend(current);

    items
}

/// Parses one item; `None` for items that are not rules.
fn parse_item(item: &Item<'_>, ignore_marker: &str) -> Result<Option<RuleRecord>, LoadError> {
    let text = item.lines.join("\n");
    let value: Value = serde_yaml::from_str(&text)
        .map_err(|source| LoadError::Yaml { line: item.start_line, source })?;

    let Some(entry) = value.as_sequence().and_then(|sequence| sequence.first()) else {
        return Ok(None);
    };
    let Some(mapping) = entry.as_mapping() else {
        return Err(LoadError::NotAMapping { line: item.start_line });
    };

    let (Some(name), Some(tag)) = (mapping.get("name"), mapping.get("tag")) else {
        tracing::debug!(line = item.start_line, "Skipping item without name and tag");
        return Ok(None);
    };

    let scan = scan_lines(item, ignore_marker);
    let mut rule = RuleRecord::new(scalar_text(name), scalar_text(tag), item.start_line)
        .with_raw_content(item.raw_content());
    rule.suppressed = scan.suppressed;
    rule.line_map = scan.field_lines;
    rule.match_expr = mapping.get(field::MATCH).map(|value| normalize_whitespace(&scalar_text(value)));
    rule.variables = mapping.get(field::VARIABLES).map(variable_bindings).unwrap_or_default();

    let mut walk = TreeWalk::new(scan.key_lines, item.start_line);
    for (key, value) in mapping {
        if key.as_str().is_some_and(|key| HEADER_KEYS.contains(&key)) {
            continue;
        }
        walk.visit(value, 0);
    }
    if !walk.condition_lines.is_empty() {
        rule.line_map.insert(field::CONDITION.to_string(), walk.condition_lines);
    }
    rule.conditions = walk.conditions;
    rule.content = walk.content;
    rule.structure = walk.structure;

    Ok(Some(rule))
}

/// Line attribution gathered from the raw text of one item.
#[derive(Debug, Default)]
struct LineScan<'t> {
    /// The tag line carries the ignore marker.
    suppressed: bool,
    /// Lines per top-level field.
    field_lines: HashMap<String, Vec<u32>>,
    /// Lines of nested keys, in document order, per key.
    key_lines: HashMap<&'t str, VecDeque<u32>>,
}

/// Attributes each line to its top-level field and nested keys.
fn scan_lines<'t>(item: &Item<'t>, ignore_marker: &str) -> LineScan<'t> {
    let mut scan = LineScan::default();
    let mut field_column: Option<usize> = None;
    let mut current_field: Option<&str> = None;

    for (offset, line) in item.lines.iter().copied().enumerate() {
        if is_blank_or_comment(line) {
            continue;
        }
        let line_number = item.line_number(offset);
        let (keys, comment) = line_keys(line);

        let mut nested = keys.as_slice();
        if let Some((&(column, key), rest)) = keys.split_first() {
            let top = *field_column.get_or_insert(column);
            if column == top {
                current_field = Some(key);
                nested = rest;
                if key == "tag" && comment.is_some_and(|text| text.contains(ignore_marker)) {
                    scan.suppressed = true;
                }
            }
        }

        if let Some(field) = current_field {
            scan.field_lines.entry(field.to_string()).or_default().push(line_number);
        }
        for &(_, key) in nested {
            scan.key_lines.entry(key).or_default().push_back(line_number);
        }
    }

    scan
}

/// Finds every `key:` on a line, with its column, plus the trailing comment.
///
/// Quoted text is skipped, where a quote only opens at the start of a token so
/// apostrophes inside plain scalars are literal. Only bare keys made of
/// `[A-Za-z0-9_]` are reported.
fn line_keys(line: &str) -> (Vec<(usize, &str)>, Option<&str>) {
    let mut keys = Vec::new();
    let mut quote: Option<char> = None;
    let mut token_start: Option<usize> = None;
    let mut at_boundary = true;
    let mut chars = line.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if let Some(open) = quote {
            if c == open {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' if at_boundary => {
                quote = Some(c);
                token_start = None;
            }
            '#' if at_boundary => return (keys, line.get(index + 1..)),
            ':' => {
                let followed_by_space = chars.peek().is_none_or(|&(_, next)| next.is_whitespace());
                if let Some(start) = token_start.take()
                    && followed_by_space
                    && let Some(key) = line.get(start..index)
                {
                    keys.push((start, key));
                }
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                if token_start.is_none() && at_boundary {
                    token_start = Some(index);
                }
            }
            _ => token_start = None,
        }
        at_boundary = matches!(c, ' ' | '\t' | '[' | '{' | ',');
    }

    (keys, None)
}

/// Walks the parsed rule body in document order, pairing values with lines.
struct TreeWalk<'t> {
    /// Unconsumed lines per nested key.
    key_lines: HashMap<&'t str, VecDeque<u32>>,
    /// Most recently attributed line.
    last_line: u32,
    conditions: Vec<String>,
    /// Line of each entry of `conditions`.
    condition_lines: Vec<u32>,
    content: Vec<ContentEntry>,
    structure: Vec<StructureToken>,
}

impl<'t> TreeWalk<'t> {
    /// Starts a walk at the item's first line.
    fn new(key_lines: HashMap<&'t str, VecDeque<u32>>, start_line: u32) -> Self {
        Self {
            key_lines,
            last_line: start_line,
            conditions: Vec::new(),
            condition_lines: Vec::new(),
            content: Vec::new(),
            structure: Vec::new(),
        }
    }

    /// Next scanned line for `key`; falls back to the last attributed line.
    fn next_line(&mut self, key: &str) -> u32 {
        if let Some(line) = self.key_lines.get_mut(key).and_then(VecDeque::pop_front) {
            self.last_line = line;
        }
        self.last_line
    }

    /// Visits any value at block `depth`.
    fn visit(&mut self, value: &Value, depth: usize) {
        match value {
            Value::Mapping(mapping) => self.visit_mapping(mapping, depth),
            Value::Sequence(sequence) => {
                for element in sequence {
                    self.visit(element, depth);
                }
            }
            Value::Tagged(tagged) => self.visit(&tagged.value, depth),
            _ => {}
        }
    }

    /// Records blocks and content entries of a mapping.
    fn visit_mapping(&mut self, mapping: &Mapping, depth: usize) {
        for (key, value) in mapping {
            let Some(key) = key.as_str() else {
                self.visit(value, depth);
                continue;
            };

            if let Some(kind) = BlockKind::from_key(key) {
                let line = self.next_line(key);
                self.structure.push(StructureToken::new(kind, depth, line));
                if matches!(kind, BlockKind::If | BlockKind::ElseIf) {
                    self.conditions.push(normalize_whitespace(&scalar_text(value)));
                    self.condition_lines.push(line);
                } else {
                    let inner = if kind.opens_scope() { depth + 1 } else { depth };
                    self.visit(value, inner);
                }
            } else if let Some((kind, localization)) = ContentKind::from_marker(key) {
                let line = self.next_line(key);
                self.content.push(ContentEntry::new(kind, localization, scalar_text(value), line));
            } else {
                self.visit(value, depth);
            }
        }
    }
}

/// `name=value` pairs of a `variables:` field.
fn variable_bindings(value: &Value) -> BTreeSet<(String, String)> {
    let mut bindings = BTreeSet::new();
    let mut collect = |mapping: &Mapping| {
        for (name, value) in mapping {
            bindings.insert((scalar_text(name), normalize_whitespace(&scalar_text(value))));
        }
    };

    match value {
        Value::Sequence(sequence) => sequence.iter().filter_map(Value::as_mapping).for_each(&mut collect),
        Value::Mapping(mapping) => collect(mapping),
        _ => {}
    }

    bindings
}

/// Text of a YAML value as it would be compared or displayed.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => String::new(),
        Value::Sequence(sequence) => {
            sequence.iter().map(scalar_text).collect::<Vec<_>>().join(" ")
        }
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Mapping(_) => serde_yaml::to_string(value)
            .map(|text| text.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Collapses runs of whitespace to single spaces.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::rules::Localization;

    const DOCUMENT: &str = r#"---
# Operators
- name: default
  tag: mo
  variables: [Prefix: "'the'"]
  match:
    - "self::m:mo and"
    - "   count(*) = 1"
  replace:
    - test:
        if: "$Verbosity = 'Verbose'"
        then: [T: "das"]
        else: [t: "the"]
    - x: "*[1]"

- include: "SharedRules/general.yaml"

- name: ignored
  tag: mi  # audit-ignore
  match: "."
  replace: [ct: "raw", OT: "done"]
"#;

    #[googletest::test]
    fn parse_rules_reads_fields_and_lines() {
        let rules = parse_rules(DOCUMENT, "audit-ignore").unwrap();

        assert_that!(rules, len(eq(2)));
        let rule = &rules[0];
        expect_that!(rule.key, eq("default|mo"));
        expect_that!(rule.line_number, eq(3));
        expect_that!(rule.suppressed, eq(false));
        expect_that!(rule.match_expr, some(eq("self::m:mo and count(*) = 1")));
        expect_that!(rule.conditions, elements_are![eq("$Verbosity = 'Verbose'")]);
        assert_eq!(rule.field_lines(field::MATCH), &[6, 7, 8]);
        assert_eq!(rule.field_lines(field::CONDITION), &[11]);
        assert_eq!(rule.field_lines(field::VARIABLES), &[5]);
        assert!(rule.variables.contains(&("Prefix".to_string(), "'the'".to_string())));
    }

    #[googletest::test]
    fn parse_rules_reads_content_and_structure() {
        let rules = parse_rules(DOCUMENT, "audit-ignore").unwrap();
        let rule = &rules[0];

        let content: Vec<_> =
            rule.content.iter().map(|e| (e.marker(), e.value.as_str(), e.line_number)).collect();
        assert_eq!(content, vec![("T", "das", 12), ("t", "the", 13)]);

        let structure: Vec<_> =
            rule.structure.iter().map(|t| (t.kind, t.depth, t.line_number)).collect();
        assert_eq!(
            structure,
            vec![
                (BlockKind::Test, 0, 10),
                (BlockKind::If, 1, 11),
                (BlockKind::Then, 1, 12),
                (BlockKind::Else, 1, 13),
            ]
        );
    }

    #[googletest::test]
    fn parse_rules_marks_suppressed_tag_line() {
        let rules = parse_rules(DOCUMENT, "audit-ignore").unwrap();
        let rule = &rules[1];

        expect_that!(rule.key, eq("ignored|mi"));
        expect_that!(rule.suppressed, eq(true));
        expect_that!(rule.line_number, eq(18));
        let localization: Vec<_> = rule.content.iter().map(|e| e.localization).collect();
        assert_eq!(localization, vec![Localization::RawPlaceholder, Localization::Localized]);
        expect_that!(rule.content.iter().all(|e| e.line_number == 21), eq(true));
    }

    #[googletest::test]
    fn parse_rules_keeps_raw_content_without_trailing_blank_lines() {
        let rules = parse_rules(DOCUMENT, "audit-ignore").unwrap();

        expect_that!(rules[0].raw_content, starts_with("- name: default"));
        expect_that!(rules[0].raw_content, ends_with("- x: \"*[1]\""));
    }

    #[rstest]
    fn parse_rules_uses_configured_marker() {
        let rules = parse_rules(DOCUMENT, "skip-me").unwrap();

        assert!(rules.iter().all(|rule| !rule.suppressed));
    }

    #[rstest]
    fn parse_rules_reports_invalid_item_line() {
        let text = "- name: a\n  tag: mo\n- name: b\n  tag: [unclosed\n";

        let result = parse_rules(text, "audit-ignore");

        assert!(matches!(result, Err(LoadError::Yaml { line: 3, .. })));
    }

    #[rstest]
    fn parse_rules_rejects_scalar_items() {
        let result = parse_rules("- just a string\n", "audit-ignore");

        assert!(matches!(result, Err(LoadError::NotAMapping { line: 1 })));
    }

    #[rstest]
    #[case::plain("  tag: mo", vec![(2, "tag")], None)]
    #[case::comment("  tag: mo  # audit-ignore", vec![(2, "tag")], Some(" audit-ignore"))]
    #[case::flow("    then: [T: \"x: y\", x: \"*[1]\"]", vec![(4, "then"), (11, "T"), (22, "x")], None)]
    #[case::quoted_colon("  match: \"self::m:mo\"", vec![(2, "match")], None)]
    #[case::list_item("    - if: \"$a\"", vec![(6, "if")], None)]
    #[case::hash_in_quotes("  - T: \"#1\"", vec![(4, "T")], None)]
    #[case::apostrophe_in_plain_scalar(
        "    then: [T: it's, x: \"*[1]\"]",
        vec![(4, "then"), (11, "T"), (20, "x")],
        None
    )]
    #[case::apostrophe_before_comment("  - T: it's  # audit-ignore", vec![(4, "T")], Some(" audit-ignore"))]
    fn line_keys_cases(
        #[case] line: &str,
        #[case] expected_keys: Vec<(usize, &str)>,
        #[case] expected_comment: Option<&str>,
    ) {
        let (keys, comment) = line_keys(line);

        assert_eq!(keys, expected_keys);
        assert_eq!(comment, expected_comment);
    }

    #[rstest]
    fn nested_then_test_increases_depth() {
        let text = r#"- name: nested
  tag: mrow
  replace:
    - test:
        if: "$a"
        then_test:
          if: "$b"
          then: [T: "b"]
        else: [T: "c"]
"#;

        let rules = parse_rules(text, "audit-ignore").unwrap();
        let structure: Vec<_> =
            rules[0].structure.iter().map(|t| (t.kind, t.depth, t.line_number)).collect();

        assert_eq!(
            structure,
            vec![
                (BlockKind::Test, 0, 4),
                (BlockKind::If, 1, 5),
                (BlockKind::ThenTest, 1, 6),
                (BlockKind::If, 2, 7),
                (BlockKind::Then, 2, 8),
                (BlockKind::Else, 1, 9),
            ]
        );
        assert_eq!(rules[0].field_lines(field::CONDITION), &[5, 7]);
    }
}
