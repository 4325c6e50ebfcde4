//! Plain-text and JSON-lines output.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io;

use super::{
    GroupedIssues,
    IssueGroup,
    IssueRecord,
    IssueType,
};

/// Indentation of rule headers.
const RULE_INDENT: &str = "  ";
/// Indentation of subgroup headers.
const GROUP_INDENT: &str = "    ";
/// Indentation of issue lines.
const ISSUE_INDENT: &str = "      ";
/// Indentation of snippet and raw-content lines.
const DETAIL_INDENT: &str = "        ";

/// Options for the text renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Column budget; snippet and raw-content lines are truncated to fit.
    pub width: usize,
    /// Show snippets for differences and raw content for missing/extra rules.
    pub verbose: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { width: 80, verbose: false }
    }
}

/// Renders the grouped report for one file.
///
/// `raw_rules` maps rule keys to source text, shown under missing and extra
/// rules in verbose mode. Returns the text to print and the number of issues
/// shown.
#[must_use]
pub fn render_file_report(
    file_name: &str,
    english_rule_count: usize,
    translated_rule_count: usize,
    issues: &[IssueRecord],
    raw_rules: &HashMap<String, String>,
    options: RenderOptions,
) -> (String, usize) {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{file_name}  ({english_rule_count} reference rules, {translated_rule_count} translated rules)"
    );

    let grouped = GroupedIssues::new(issues);
    if grouped.is_empty() {
        let _ = writeln!(out, "✓ No issues");
        return (out, 0);
    }

    let _ = writeln!(out, "≠ Rule Issues [{}] (grouped by rule and issue type)", grouped.total());
    for rule in &grouped {
        let _ = writeln!(out, "{RULE_INDENT}• {} ({})", rule.rule_name, rule.rule_tag);
        for subgroup in &rule.subgroups {
            let _ = writeln!(out, "{GROUP_INDENT}{} [{}]", subgroup.group.label(), subgroup.issues.len());
            for issue in &subgroup.issues {
                let raw = raw_rules.get(&issue.rule_key).map(String::as_str);
                render_issue(&mut out, subgroup.group, issue, raw, options);
            }
        }
    }

    (out, grouped.total())
}

/// Appends one issue line plus its verbose details.
fn render_issue(
    out: &mut String,
    group: IssueGroup,
    issue: &IssueRecord,
    raw: Option<&str>,
    options: RenderOptions,
) {
    match issue.issue_type {
        IssueType::MissingRule => {
            let _ = writeln!(out, "{ISSUE_INDENT}· {}", line_label(issue.issue_line_en, "en"));
            if options.verbose {
                render_raw(out, raw, options.width);
            }
        }
        IssueType::ExtraRule => {
            let _ = writeln!(out, "{ISSUE_INDENT}· {}", line_label(issue.issue_line_tr, "tr"));
            if options.verbose {
                render_raw(out, raw, options.width);
            }
        }
        IssueType::UntranslatedText => {
            let text = issue.untranslated_texts.join(", ");
            let prefix = format!("{ISSUE_INDENT}· {}: ", line_label(issue.issue_line_tr, "tr"));
            let budget = options.width.saturating_sub(prefix.chars().count() + 2);
            let _ = writeln!(out, "{prefix}\"{}\"", truncate(&text, budget));
        }
        IssueType::RuleDifference => {
            let description = issue.description.as_deref().unwrap_or(group.label());
            let _ = writeln!(
                out,
                "{ISSUE_INDENT}· {description} ({}, {})",
                line_label(issue.issue_line_en, "en"),
                line_label(issue.issue_line_tr, "tr"),
            );
            if options.verbose {
                render_snippet(out, "en:", issue.english_snippet.as_deref(), options.width);
                render_snippet(out, "tr:", issue.translated_snippet.as_deref(), options.width);
            }
        }
    }
}

/// `"en line 12"`, or `"en line ?"` when the line is unknown.
fn line_label(line: Option<u32>, side: &str) -> String {
    line.map_or_else(|| format!("{side} line ?"), |line| format!("{side} line {line}"))
}

/// Appends a labelled snippet line.
fn render_snippet(out: &mut String, label: &str, snippet: Option<&str>, width: usize) {
    let snippet = snippet.unwrap_or_default();
    let budget = width.saturating_sub(DETAIL_INDENT.len() + label.len() + 1);
    let _ = writeln!(out, "{DETAIL_INDENT}{label} {}", truncate(snippet, budget));
}

/// Appends unlabelled raw rule text, one source line per output line.
fn render_raw(out: &mut String, raw: Option<&str>, width: usize) {
    let budget = width.saturating_sub(DETAIL_INDENT.len());
    for line in raw.unwrap_or_default().lines() {
        let _ = writeln!(out, "{DETAIL_INDENT}{}", truncate(line, budget));
    }
}

/// Cuts `s` to at most `max_len` characters, marking the cut with `...`.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

/// One-line run summary.
#[must_use]
pub fn render_summary(language: &str, files: usize, issues: usize) -> String {
    format!("Audited {files} file(s) for '{language}': {issues} issue(s)")
}

/// Writes one JSON object per issue, newline-terminated.
pub fn write_jsonl<W: io::Write>(mut writer: W, issues: &[IssueRecord]) -> serde_json::Result<()> {
    for issue in issues {
        serde_json::to_writer(&mut writer, issue)?;
        writer.write_all(b"\n").map_err(serde_json::Error::io)?;
    }
    Ok(())
}
