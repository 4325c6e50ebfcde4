//! Auditing every rule file of one language against the reference language.

use std::collections::{
    BTreeSet,
    HashMap,
};
use std::path::{
    Path,
    PathBuf,
};

use rayon::prelude::*;
use thiserror::Error;

use crate::compare::{
    CompareError,
    compare,
};
use crate::config::AuditSettings;
use crate::discovery::{
    DiscoveryError,
    LanguageCode,
    LanguageTree,
    ResolvedLanguage,
};
use crate::report::{
    IssueRecord,
    collect_issues,
    collect_raw_rules,
};
use crate::rules::{
    LoadError,
    RuleRecord,
    load_rule_file,
};

#[derive(Error, Debug)]
pub enum AuditError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("{}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error("{}: {source}", path.display())]
    Compare {
        path: PathBuf,
        #[source]
        source: CompareError,
    },

    #[error("Failed to start audit workers: {0}")]
    Workers(#[from] rayon::ThreadPoolBuildError),
}

/// Result of auditing one rule file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAudit {
    /// Path relative to the language directory.
    pub relative_path: PathBuf,
    pub issues: Vec<IssueRecord>,
    /// Source text of missing and extra rules, keyed by rule key.
    pub raw_rules: HashMap<String, String>,
    pub english_rule_count: usize,
    pub translated_rule_count: usize,
    /// Rule pairs whose structure could not be aligned.
    pub misaligned_structures: usize,
}

/// Result of auditing one language, files sorted by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageAudit {
    pub language: LanguageCode,
    pub files: Vec<FileAudit>,
}

impl LanguageAudit {
    #[must_use]
    pub fn total_issues(&self) -> usize {
        self.files.iter().map(|file| file.issues.len()).sum()
    }
}

/// Audits languages found in a [`LanguageTree`].
#[derive(Debug, Clone)]
pub struct Auditor {
    /// Where rule files are found.
    tree: LanguageTree,
    /// Ignore marker and worker count.
    settings: AuditSettings,
}

impl Auditor {
    #[must_use]
    pub fn new(tree: LanguageTree, settings: &AuditSettings) -> Self {
        Self { tree, settings: settings.clone() }
    }

    /// Audits every rule file of `language`, or only `only_file` when given.
    ///
    /// The file set is the union of the reference files and the translated
    /// (base and region) files. Files are audited in parallel.
    ///
    /// # Errors
    /// - Language or region directory is missing
    /// - A rule file cannot be read or parsed
    /// - A rule key repeats within one file
    pub fn audit_language(
        &self,
        language: &LanguageCode,
        only_file: Option<&Path>,
    ) -> Result<LanguageAudit, AuditError> {
        let reference_dir = self.tree.reference_dir()?;
        let resolved = self.tree.resolve(language)?;

        let files: Vec<PathBuf> = if let Some(file) = only_file {
            vec![file.to_path_buf()]
        } else {
            let mut files: BTreeSet<PathBuf> =
                self.tree.rule_files(&reference_dir, None)?.into_iter().collect();
            files.extend(
                self.tree.rule_files(&resolved.language_dir, resolved.region_dir.as_deref())?,
            );
            files.into_iter().collect()
        };

        tracing::info!(language = %language, files = files.len(), "Auditing language");

        let mut audits = self.audit_files(&reference_dir, &resolved, &files)?;
        audits.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        Ok(LanguageAudit { language: language.clone(), files: audits })
    }

    /// Runs [`Self::audit_file`] over `files` on a pool of `jobs` threads.
    fn audit_files(
        &self,
        reference_dir: &Path,
        resolved: &ResolvedLanguage,
        files: &[PathBuf],
    ) -> Result<Vec<FileAudit>, AuditError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.effective_jobs())
            .build()?;

        pool.install(|| {
            files
                .par_iter()
                .map(|file| self.audit_file(reference_dir, resolved, file))
                .collect::<Result<Vec<_>, _>>()
        })
    }

    /// Loads, compares and collects issues for one relative path.
    fn audit_file(
        &self,
        reference_dir: &Path,
        resolved: &ResolvedLanguage,
        relative_path: &Path,
    ) -> Result<FileAudit, AuditError> {
        let marker = &self.settings.ignore_marker;

        let reference = load_or_empty(&reference_dir.join(relative_path), marker)?;
        let translated = load_or_empty(&resolved.language_dir.join(relative_path), marker)?;
        let region = match &resolved.region_dir {
            Some(region_dir) => load_if_present(&region_dir.join(relative_path), marker)?,
            None => None,
        };

        let result = compare(&reference, &translated, region.as_deref())
            .map_err(|source| AuditError::Compare { path: relative_path.to_path_buf(), source })?;

        let file_name = relative_path.to_string_lossy().replace('\\', "/");
        let issues = collect_issues(&result, &file_name, &resolved.code.to_string());
        tracing::debug!(file = %file_name, issues = issues.len(), "Audited file");

        Ok(FileAudit {
            relative_path: relative_path.to_path_buf(),
            issues,
            raw_rules: collect_raw_rules(&result),
            english_rule_count: result.english_rule_count,
            translated_rule_count: result.translated_rule_count,
            misaligned_structures: result.misaligned_structures,
        })
    }
}

/// Loads `path`, treating a missing file as an empty rule list.
fn load_or_empty(path: &Path, ignore_marker: &str) -> Result<Vec<RuleRecord>, AuditError> {
    Ok(load_if_present(path, ignore_marker)?.unwrap_or_default())
}

/// Loads `path`, or returns `None` when there is no such file.
fn load_if_present(path: &Path, ignore_marker: &str) -> Result<Option<Vec<RuleRecord>>, AuditError> {
    if !path.is_file() {
        return Ok(None);
    }
    load_rule_file(path, ignore_marker)
        .map(Some)
        .map_err(|source| AuditError::Load { path: path.to_path_buf(), source })
}
