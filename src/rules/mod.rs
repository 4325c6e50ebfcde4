//! Rule records as handed to the comparison engine.
//!
//! A [`RuleRecord`] is one declarative pattern-and-replacement rule with the
//! source lines of its fields. Records are built by [`loader`] (or by hand in
//! tests) and are read-only afterwards.

pub mod loader;

use std::collections::{
    BTreeSet,
    HashMap,
};
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

pub use loader::{
    load_rule_file,
    parse_rules,
};

/// Semantic field names used as `line_map` keys.
pub mod field {
    /// The rule's match expression.
    pub const MATCH: &str = "match";
    /// Every `if:` / `else_if:` guard inside the rule.
    pub const CONDITION: &str = "condition";
    /// The rule-level variable bindings.
    pub const VARIABLES: &str = "variables";
}

/// Whether a content entry has been localized.
///
/// Resolved by the loader from the authoring marker: `T` means the text was
/// translated, `t` means it is still the reference text copied verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Localization {
    Localized,
    RawPlaceholder,
}

/// The form of a literal output entry inside a replacement body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// `t` / `T`
    Text,
    /// `ct` / `CT`
    ConditionalText,
    /// `ot` / `OT`
    OptionalText,
    /// `spell` / `SPELL`
    Spell,
}

impl ContentKind {
    /// Resolves an authoring marker into its kind and localization state.
    ///
    /// Returns `None` for keys that are not content markers.
    #[must_use]
    pub fn from_marker(marker: &str) -> Option<(Self, Localization)> {
        let resolved = match marker {
            "t" => (Self::Text, Localization::RawPlaceholder),
            "T" => (Self::Text, Localization::Localized),
            "ct" => (Self::ConditionalText, Localization::RawPlaceholder),
            "CT" => (Self::ConditionalText, Localization::Localized),
            "ot" => (Self::OptionalText, Localization::RawPlaceholder),
            "OT" => (Self::OptionalText, Localization::Localized),
            "spell" => (Self::Spell, Localization::RawPlaceholder),
            "SPELL" => (Self::Spell, Localization::Localized),
            _ => return None,
        };
        Some(resolved)
    }

    /// The marker an author writes for this kind.
    #[must_use]
    pub const fn marker(self, localization: Localization) -> &'static str {
        match (self, localization) {
            (Self::Text, Localization::RawPlaceholder) => "t",
            (Self::Text, Localization::Localized) => "T",
            (Self::ConditionalText, Localization::RawPlaceholder) => "ct",
            (Self::ConditionalText, Localization::Localized) => "CT",
            (Self::OptionalText, Localization::RawPlaceholder) => "ot",
            (Self::OptionalText, Localization::Localized) => "OT",
            (Self::Spell, Localization::RawPlaceholder) => "spell",
            (Self::Spell, Localization::Localized) => "SPELL",
        }
    }
}

/// One piece of literal output inside a rule's replacement body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    pub kind: ContentKind,
    pub value: String,
    pub line_number: u32,
    pub localization: Localization,
}

impl ContentEntry {
    #[must_use]
    pub fn new(
        kind: ContentKind,
        localization: Localization,
        value: impl Into<String>,
        line_number: u32,
    ) -> Self {
        Self { kind, value: value.into(), line_number, localization }
    }

    /// Builds an entry from its authoring marker (`t`, `T`, `ct`, ...).
    #[must_use]
    pub fn from_marker(marker: &str, value: impl Into<String>, line_number: u32) -> Option<Self> {
        let (kind, localization) = ContentKind::from_marker(marker)?;
        Some(Self::new(kind, localization, value, line_number))
    }

    #[must_use]
    pub fn is_untranslated(&self) -> bool {
        self.localization == Localization::RawPlaceholder
    }

    #[must_use]
    pub const fn marker(&self) -> &'static str {
        self.kind.marker(self.localization)
    }
}

/// Conditional block keys that make up a rule's structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Test,
    If,
    ElseIf,
    Then,
    Else,
    ThenTest,
    ElseTest,
}

/// Positional role of a block, used to decide whether two blocks can be paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockRole {
    /// Opens a nested list of guarded branches.
    Container,
    /// Holds a condition.
    Guard,
    /// Holds output taken when a guard is (or is not) satisfied.
    Branch,
}

impl BlockKind {
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let kind = match key {
            "test" => Self::Test,
            "if" => Self::If,
            "else_if" => Self::ElseIf,
            "then" => Self::Then,
            "else" => Self::Else,
            "then_test" => Self::ThenTest,
            "else_test" => Self::ElseTest,
            _ => return None,
        };
        Some(kind)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::If => "if",
            Self::ElseIf => "else_if",
            Self::Then => "then",
            Self::Else => "else",
            Self::ThenTest => "then_test",
            Self::ElseTest => "else_test",
        }
    }

    #[must_use]
    pub const fn role(self) -> BlockRole {
        match self {
            Self::Test => BlockRole::Container,
            Self::If | Self::ElseIf => BlockRole::Guard,
            Self::Then | Self::Else | Self::ThenTest | Self::ElseTest => BlockRole::Branch,
        }
    }

    /// True for blocks whose body is itself a list of guarded branches.
    #[must_use]
    pub const fn opens_scope(self) -> bool {
        matches!(self, Self::Test | Self::ThenTest | Self::ElseTest)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One conditional block in a rule's replacement body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureToken {
    pub kind: BlockKind,
    /// Number of enclosing scope-opening blocks.
    pub depth: usize,
    pub line_number: u32,
}

impl StructureToken {
    #[must_use]
    pub const fn new(kind: BlockKind, depth: usize, line_number: u32) -> Self {
        Self { kind, depth, line_number }
    }

    /// Same role at the same depth; the blocks may still differ in kind.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.kind.role() == other.kind.role() && self.depth == other.depth
    }

    /// Same kind at the same depth. Line numbers are ignored.
    #[must_use]
    pub fn same_block(&self, other: &Self) -> bool {
        self.kind == other.kind && self.depth == other.depth
    }
}

/// A single declarative rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleRecord {
    pub name: String,
    pub tag: String,
    /// `name|tag`, unique within one assembled rule set.
    pub key: String,
    /// 1-based line where the rule begins.
    pub line_number: u32,
    pub raw_content: String,
    /// Field name to the source lines it occupies.
    pub line_map: HashMap<String, Vec<u32>>,
    /// Set when the tag line carries the inline ignore marker.
    pub suppressed: bool,
    pub match_expr: Option<String>,
    pub conditions: Vec<String>,
    pub variables: BTreeSet<(String, String)>,
    pub content: Vec<ContentEntry>,
    pub structure: Vec<StructureToken>,
}

impl RuleRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, tag: impl Into<String>, line_number: u32) -> Self {
        let name = name.into();
        let tag = tag.into();
        let key = Self::make_key(&name, &tag);
        Self { name, tag, key, line_number, ..Self::default() }
    }

    #[must_use]
    pub fn make_key(name: &str, tag: &str) -> String {
        format!("{name}|{tag}")
    }

    #[must_use]
    pub fn with_raw_content(mut self, raw_content: impl Into<String>) -> Self {
        self.raw_content = raw_content.into();
        self
    }

    #[must_use]
    pub fn with_match(mut self, match_expr: impl Into<String>) -> Self {
        self.match_expr = Some(match_expr.into());
        self
    }

    #[must_use]
    pub fn with_lines(mut self, field: &str, lines: impl IntoIterator<Item = u32>) -> Self {
        self.line_map.entry(field.to_string()).or_default().extend(lines);
        self
    }

    #[must_use]
    pub const fn suppressed(mut self, suppressed: bool) -> Self {
        self.suppressed = suppressed;
        self
    }

    /// Source lines of a field; empty when the field is absent.
    #[must_use]
    pub fn field_lines(&self, field: &str) -> &[u32] {
        self.line_map.get(field).map_or(&[], Vec::as_slice)
    }

    /// First line of a field, falling back to the rule's own line.
    #[must_use]
    pub fn field_line_or_start(&self, field: &str) -> u32 {
        self.field_lines(field).first().copied().unwrap_or(self.line_number)
    }

    /// Content entries still carrying the reference text verbatim.
    pub fn untranslated_entries(&self) -> impl Iterator<Item = &ContentEntry> {
        self.content.iter().filter(|entry| entry.is_untranslated())
    }
}

/// Errors raised while loading a rule file.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read rule file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in rule starting at line {line}: {source}")]
    Yaml {
        line: u32,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Rule at line {line} is not a mapping")]
    NotAMapping { line: u32 },
}
