//! Command-line front end for `audit-translations`.

use std::io;
use std::path::PathBuf;

use clap::{
    Parser,
    ValueEnum,
};
use thiserror::Error;

use crate::audit::{
    AuditError,
    Auditor,
    LanguageAudit,
};
use crate::config::{
    ConfigError,
    ConfigManager,
};
use crate::discovery::{
    DiscoveryError,
    LanguageCode,
    LanguageTree,
};
use crate::report::{
    FilterError,
    IssueFilter,
    RenderOptions,
    render_file_report,
    render_summary,
    write_jsonl,
};

/// Audits a translated rule catalog against the reference language.
#[derive(Parser, Clone, Debug)]
#[command(name = "audit-translations", version, about, long_about = None)]
pub struct Cli {
    /// Language code to audit, e.g. `de` or `es-mx`
    pub language: Option<String>,

    /// List the languages found in the rules directory
    #[arg(long)]
    pub list: bool,

    /// Directory holding one subdirectory per language
    #[arg(long, value_name = "DIR")]
    pub rules_dir: Option<PathBuf>,

    /// Audit a single rule file, relative to the language directory
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Comma-separated issue types to show: missing, extra, untranslated,
    /// diff, match, condition, variables, structure
    #[arg(long, value_name = "TYPES")]
    pub only: Option<String>,

    /// Show raw rules and snippets
    #[arg(short, long)]
    pub verbose: bool,

    /// Column budget for snippets in text output
    #[arg(long, value_name = "COLUMNS")]
    pub width: Option<usize>,

    /// Number of files audited in parallel
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,
}

/// Output formats.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Grouped, human-readable report.
    Text,
    /// One JSON issue record per line.
    Jsonl,
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Please specify a language code or use --list")]
    MissingLanguage,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),

    #[error("Failed to write JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Runs one invocation, writing the report to `out`.
///
/// Settings are read from `config_root` when given; command-line flags take
/// precedence over them.
///
/// # Errors
/// - Neither a language nor `--list` was given
/// - Unknown `--only` token
/// - Invalid settings
/// - Missing language or region directory
/// - Unreadable rule file or duplicate rule key
pub fn run<W: io::Write>(cli: &Cli, config_root: Option<PathBuf>, out: &mut W) -> Result<(), CliError> {
    if cli.language.is_none() && !cli.list {
        return Err(CliError::MissingLanguage);
    }
    let filter = cli.only.as_deref().map(IssueFilter::parse).transpose()?.unwrap_or_default();

    let mut config_manager = ConfigManager::new();
    config_manager.load_settings(config_root)?;
    let mut settings = config_manager.get_settings().clone();
    if let Some(rules_dir) = &cli.rules_dir {
        settings.rules_dir.clone_from(rules_dir);
    }
    if let Some(width) = cli.width {
        settings.render.width = width;
    }
    if cli.jobs.is_some() {
        settings.jobs = cli.jobs;
    }
    config_manager.update_settings(settings)?;
    let settings = config_manager.get_settings();

    let tree = LanguageTree::new(settings.rules_dir.clone(), settings);

    if cli.list {
        writeln!(out, "Available languages:")?;
        for language in tree.list_languages()? {
            writeln!(out, "  {language}")?;
        }
        return Ok(());
    }

    let Some(language) = &cli.language else {
        return Err(CliError::MissingLanguage);
    };
    let code = LanguageCode::parse(language)?;
    let audit = Auditor::new(tree, settings).audit_language(&code, cli.file.as_deref())?;

    let misaligned: usize = audit.files.iter().map(|file| file.misaligned_structures).sum();
    if misaligned > 0 {
        tracing::info!(misaligned, "Skipped structure comparison for misaligned rules");
    }

    match cli.format {
        OutputFormat::Jsonl => write_issues_jsonl(&audit, &filter, out),
        OutputFormat::Text => {
            let options = RenderOptions { width: settings.render.width, verbose: cli.verbose };
            write_issues_text(&audit, &filter, options, out)
        }
    }
}

/// Writes every filtered issue as one JSON line.
fn write_issues_jsonl<W: io::Write>(
    audit: &LanguageAudit,
    filter: &IssueFilter,
    out: &mut W,
) -> Result<(), CliError> {
    for file in &audit.files {
        let issues = filter.apply(file.issues.clone());
        write_jsonl(&mut *out, &issues)?;
    }
    Ok(())
}

/// Writes one grouped report per file with issues, then the run summary.
///
/// Clean files are listed only in verbose mode.
fn write_issues_text<W: io::Write>(
    audit: &LanguageAudit,
    filter: &IssueFilter,
    options: RenderOptions,
    out: &mut W,
) -> Result<(), CliError> {
    let mut shown_total = 0;
    for file in &audit.files {
        let issues = filter.apply(file.issues.clone());
        if issues.is_empty() && !options.verbose {
            continue;
        }

        let file_name = file.relative_path.to_string_lossy();
        let (text, shown) = render_file_report(
            &file_name,
            file.english_rule_count,
            file.translated_rule_count,
            &issues,
            &file.raw_rules,
            options,
        );
        writeln!(out, "{text}")?;
        shown_total += shown;
    }

    writeln!(out, "{}", render_summary(&audit.language.to_string(), audit.files.len(), shown_total))?;
    Ok(())
}
