//! Walking the rules directory.

use std::collections::BTreeSet;
use std::path::{
    Component,
    Path,
    PathBuf,
};

use ignore::WalkBuilder;

use super::{
    DiscoveryError,
    LanguageCode,
};
use crate::config::{
    AuditSettings,
    FileMatcher,
};

/// A language code resolved to its directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLanguage {
    pub code: LanguageCode,
    pub language_dir: PathBuf,
    pub region_dir: Option<PathBuf>,
}

/// The `Rules/Languages` directory: one subdirectory per language.
#[derive(Debug, Clone)]
pub struct LanguageTree {
    /// Directory holding the language directories.
    rules_dir: PathBuf,
    /// Patterns, shared directory names and the reference language.
    settings: AuditSettings,
}

impl LanguageTree {
    #[must_use]
    pub fn new(rules_dir: PathBuf, settings: &AuditSettings) -> Self {
        Self { rules_dir, settings: settings.clone() }
    }

    #[must_use]
    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Directory of the reference language.
    ///
    /// # Errors
    /// [`DiscoveryError::LanguageNotFound`] if the directory does not exist.
    pub fn reference_dir(&self) -> Result<PathBuf, DiscoveryError> {
        let code = &self.settings.reference_language;
        let path = self.rules_dir.join(code);
        if !path.is_dir() {
            return Err(DiscoveryError::LanguageNotFound { code: code.clone(), path });
        }
        Ok(path)
    }

    /// Every translated language, plus `lang-region` for each region
    /// subdirectory that holds rule files. Sorted.
    ///
    /// # Errors
    /// - The rules directory cannot be read
    /// - Invalid include/exclude patterns
    pub fn list_languages(&self) -> Result<Vec<LanguageCode>, DiscoveryError> {
        let mut languages = BTreeSet::new();

        for language in Self::subdirectories(&self.rules_dir)? {
            if language.eq_ignore_ascii_case(&self.settings.reference_language) {
                continue;
            }
            let Ok(code) = LanguageCode::parse(&language) else {
                tracing::debug!(directory = %language, "Skipping directory with unusable name");
                continue;
            };

            let language_dir = self.rules_dir.join(&language);
            for region in Self::subdirectories(&language_dir)? {
                if self.is_shared_dir(&region) {
                    continue;
                }
                let region_dir = language_dir.join(&region);
                if self.walk(&region_dir)?.is_empty() {
                    continue;
                }
                if let Ok(regional) = LanguageCode::parse(&format!("{language}-{region}")) {
                    languages.insert(regional);
                }
            }

            languages.insert(code);
        }

        Ok(languages.into_iter().collect())
    }

    /// Finds the directories for `code`.
    ///
    /// # Errors
    /// [`DiscoveryError::LanguageNotFound`] or [`DiscoveryError::RegionNotFound`]
    /// when a directory is missing.
    pub fn resolve(&self, code: &LanguageCode) -> Result<ResolvedLanguage, DiscoveryError> {
        let language_dir = self.rules_dir.join(code.language());
        if !language_dir.is_dir() {
            return Err(DiscoveryError::LanguageNotFound {
                code: code.to_string(),
                path: language_dir,
            });
        }

        let region_dir = match code.region() {
            Some(region) => {
                let path = language_dir.join(region);
                if !path.is_dir() {
                    return Err(DiscoveryError::RegionNotFound { code: code.to_string(), path });
                }
                Some(path)
            }
            None => None,
        };

        Ok(ResolvedLanguage { code: code.clone(), language_dir, region_dir })
    }

    /// Relative paths of the rule files of a language.
    ///
    /// Files directly under `language_dir` and under shared subdirectories
    /// belong to the base language; other subdirectories are regions and are
    /// skipped. Files of `region_dir` are added under their own relative paths.
    ///
    /// # Errors
    /// Invalid include/exclude patterns.
    pub fn rule_files(
        &self,
        language_dir: &Path,
        region_dir: Option<&Path>,
    ) -> Result<Vec<PathBuf>, DiscoveryError> {
        let mut files: BTreeSet<PathBuf> = self
            .walk(language_dir)?
            .into_iter()
            .filter(|relative_path| self.belongs_to_base(relative_path))
            .collect();

        if let Some(region_dir) = region_dir {
            files.extend(self.walk(region_dir)?);
        }

        Ok(files.into_iter().collect())
    }

    /// True for files at the root of a language directory or in a shared subdirectory.
    fn belongs_to_base(&self, relative_path: &Path) -> bool {
        let mut components = relative_path.components();
        let Some(Component::Normal(first)) = components.next() else {
            return false;
        };
        if components.next().is_none() {
            return true;
        }
        first.to_str().is_some_and(|name| self.is_shared_dir(name))
    }

    /// True if `name` is one of `sharedDirs`.
    fn is_shared_dir(&self, name: &str) -> bool {
        self.settings.shared_dirs.iter().any(|shared| shared == name)
    }

    /// Rule files under `root`, relative to it.
    fn walk(&self, root: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
        let matcher = FileMatcher::new(root.to_path_buf(), &self.settings)?;
        let mut found_files = Vec::new();

        for result in WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .build()
        {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(?err, "Failed to read directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let Ok(relative_path) = entry.path().strip_prefix(matcher.root()) else {
                continue;
            };
            if !matcher.is_rule_file_relative(relative_path) {
                continue;
            }

            found_files.push(relative_path.to_path_buf());
        }

        tracing::debug!(root = %root.display(), count = found_files.len(), "Found rule files");
        Ok(found_files)
    }

    /// Names of the non-hidden subdirectories of `dir`.
    fn subdirectories(dir: &Path) -> Result<Vec<String>, DiscoveryError> {
        let read_dir_error = |source| DiscoveryError::ReadDir { path: dir.to_path_buf(), source };
        let mut names = Vec::new();

        for entry in std::fs::read_dir(dir).map_err(read_dir_error)? {
            let entry = entry.map_err(read_dir_error)?;
            if !entry.file_type().map_err(read_dir_error)?.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }

        Ok(names)
    }
}
