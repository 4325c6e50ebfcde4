//! Language directory layout: language codes, region overlays, rule file lists.
//!
//! ```text
//! Rules/Languages/
//!   en/                 reference language
//!   de/                 base translation
//!     SharedRules/      shared subdirectory, part of the base language
//!     at/               region overlay for `de-at`
//! ```

/// Directory walking
mod tree;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub use tree::{
    LanguageTree,
    ResolvedLanguage,
};

use crate::config::MatcherError;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Invalid language code '{0}'. Expected 'xx' or 'xx-yy'")]
    InvalidLanguageCode(String),

    #[error("Language directory not found: {}", path.display())]
    LanguageNotFound { code: String, path: PathBuf },

    #[error("Region directory not found: {}", path.display())]
    RegionNotFound { code: String, path: PathBuf },

    #[error("Failed to read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Matcher(#[from] MatcherError),
}

/// A language code, optionally with a region: `de` or `de-at`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LanguageCode {
    /// Base language directory name.
    language: String,
    /// Region subdirectory name.
    region: Option<String>,
}

impl LanguageCode {
    /// Parses `xx` or `xx-yy`, lowercasing both parts.
    ///
    /// # Errors
    /// [`DiscoveryError::InvalidLanguageCode`] for an empty part, a path
    /// separator, or more than one `-`.
    pub fn parse(code: &str) -> Result<Self, DiscoveryError> {
        let invalid = || DiscoveryError::InvalidLanguageCode(code.to_string());
        let normalized = code.trim().to_ascii_lowercase();
        if normalized.contains(['/', '\\', '.']) {
            return Err(invalid());
        }

        let mut parts = normalized.split('-');
        let language = parts.next().filter(|part| !part.is_empty()).ok_or_else(invalid)?;
        let region = match parts.next() {
            Some("") => return Err(invalid()),
            Some(region) => Some(region.to_string()),
            None => None,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self { language: language.to_string(), region })
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}-{region}", self.language),
            None => f.write_str(&self.language),
        }
    }
}
