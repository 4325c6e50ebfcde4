//! Settings: `.audit-translations.json`, validation, and file pattern matching.
/// Settings lifecycle
mod manager;
/// Rule file pattern matcher
mod matcher;
/// Settings types and validation
mod types;

pub use manager::{
    CONFIG_FILE_NAME,
    ConfigManager,
};
pub use matcher::{
    FileMatcher,
    MatcherError,
};
pub use types::{
    AuditSettings,
    ConfigError,
    MIN_RENDER_WIDTH,
    RenderConfig,
    ValidationError,
};
