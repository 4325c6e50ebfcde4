//! Settings lifecycle: read `.audit-translations.json`, validate, store.

use std::path::{
    Path,
    PathBuf,
};

use super::{
    AuditSettings,
    ConfigError,
};

/// Name of the settings file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".audit-translations.json";

/// Holds the validated settings for one run.
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    /// Current settings
    current_settings: AuditSettings,
}

impl ConfigManager {
    #[must_use]
    pub fn new() -> Self {
        Self { current_settings: AuditSettings::default() }
    }

    /// Loads settings from `config_root`, falling back to defaults when there is
    /// no settings file.
    ///
    /// # Errors
    /// - File read error
    /// - JSON parse error
    /// - Validation error
    pub fn load_settings(&mut self, config_root: Option<PathBuf>) -> Result<(), ConfigError> {
        tracing::debug!("Loading settings from: {:?}", config_root);

        let loaded = config_root.as_deref().map(read_settings_file).transpose()?.flatten();
        let settings = loaded.map_or_else(AuditSettings::default, |loaded| {
            tracing::debug!("Loaded settings file: {:?}", loaded);
            loaded
        });

        settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = settings;
        tracing::debug!("Settings loaded successfully: {:?}", self.current_settings);

        Ok(())
    }

    /// Replaces the settings, e.g. after applying command-line overrides.
    ///
    /// # Errors
    /// Validation error; the previous settings are kept.
    pub fn update_settings(&mut self, new_settings: AuditSettings) -> Result<(), ConfigError> {
        tracing::debug!("Updating settings...");

        new_settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = new_settings;
        tracing::debug!("Settings updated successfully");

        Ok(())
    }

    #[must_use]
    pub const fn get_settings(&self) -> &AuditSettings {
        &self.current_settings
    }
}

/// Reads `CONFIG_FILE_NAME` directly under `root`.
///
/// Returns `Ok(None)` when there is no settings file.
fn read_settings_file(root: &Path) -> Result<Option<AuditSettings>, ConfigError> {
    let config_path = root.join(CONFIG_FILE_NAME);

    if !config_path.is_file() {
        tracing::debug!("Configuration file not found: {:?}", config_path);
        return Ok(None);
    }

    let content = std::fs::read_to_string(&config_path)?;
    Ok(Some(serde_json::from_str(&content)?))
}
