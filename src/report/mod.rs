//! Turning comparison results into issues, and issues into output.

pub mod filter;
pub mod grouping;
pub mod issues;
pub mod render;

pub use filter::{
    FilterError,
    IssueFilter,
};
pub use grouping::{
    GroupedIssues,
    IssueGroup,
    RuleGroup,
    SubGroup,
};
pub use issues::{
    IssueRecord,
    IssueType,
    collect_issues,
    collect_raw_rules,
};
pub use render::{
    RenderOptions,
    render_file_report,
    render_summary,
    write_jsonl,
};
