use std::path::PathBuf;

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

/// Narrowest output the text renderer accepts.
pub const MIN_RENDER_WIDTH: usize = 40;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "includePatterns[0]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Numbered, one error per line.
fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditSettings {
    /// Directory holding one subdirectory per language.
    pub rules_dir: PathBuf,

    /// Language every other language is compared against.
    pub reference_language: String,

    /// Rule files to audit, relative to a language directory.
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,

    /// Subdirectories of a language directory that belong to the base language
    /// rather than to a region.
    pub shared_dirs: Vec<String>,

    /// Inline comment marker on a rule's tag line that opts it out of content
    /// and difference checks.
    pub ignore_marker: String,

    pub render: RenderConfig,

    /// Parallel worker count for auditing files.
    /// Default: 80% of CPU cores (minimum 1).
    pub jobs: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    /// Column budget for snippets in text output.
    pub width: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { width: 80 }
    }
}

impl AuditSettings {
    /// # Errors
    /// - Required field is empty
    /// - Invalid glob pattern
    /// - Out-of-range number
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.rules_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "rulesDir",
                "The directory cannot be empty. Example: \"Rules/Languages\"",
            ));
        }

        if self.reference_language.is_empty() {
            errors.push(ValidationError::new(
                "referenceLanguage",
                "The language code cannot be empty. Example: \"en\"",
            ));
        }

        if self.include_patterns.is_empty() {
            errors.push(ValidationError::new(
                "includePatterns",
                "At least one pattern is required. Example: [\"**/*.yaml\"]",
            ));
        }

        for (index, pattern) in self.include_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("includePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        for (index, pattern) in self.exclude_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("excludePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        for (index, dir) in self.shared_dirs.iter().enumerate() {
            if dir.is_empty() || dir.contains(['/', '\\']) {
                errors.push(ValidationError::new(
                    format!("sharedDirs[{index}]"),
                    format!("'{dir}' must be a single directory name. Example: \"SharedRules\""),
                ));
            }
        }

        if self.ignore_marker.trim().is_empty() {
            errors.push(ValidationError::new(
                "ignoreMarker",
                "The marker cannot be empty. Example: \"audit-ignore\"",
            ));
        }

        if self.render.width < MIN_RENDER_WIDTH {
            errors.push(ValidationError::new(
                "render.width",
                format!("The width must be at least {MIN_RENDER_WIDTH} columns"),
            ));
        }

        if self.jobs == Some(0) {
            errors.push(ValidationError::new(
                "jobs",
                "At least one worker is required. Remove this field to use the default",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Worker count to use: `jobs` when set, else 80% of CPU cores (minimum 1).
    #[must_use]
    pub fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| (num_cpus::get() * 4 / 5).max(1))
    }
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            rules_dir: PathBuf::from("Rules/Languages"),
            reference_language: "en".to_string(),
            include_patterns: vec!["**/*.yaml".to_string()],
            exclude_patterns: Vec::new(),
            shared_dirs: vec!["SharedRules".to_string()],
            ignore_marker: "audit-ignore".to_string(),
            render: RenderConfig::default(),
            jobs: None,
        }
    }
}
