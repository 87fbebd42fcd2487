//! Generator settings
//!
//! Settings are stored as JSON. A missing file yields defaults, and so does a
//! file that fails to parse (with a warning), so a broken config never blocks
//! document generation.

use crate::archive::MIN_FILE_SIZE;
use crate::render::RenderOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Template used when the caller does not provide one
pub const DEFAULT_TEMPLATE_PATH: &str = "templates/demo-docx.docx";

/// Output name for documents generated from the default template
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "generated-document.docx";

/// How long a session stays in `Success` before returning to `Ready`
pub const DEFAULT_SUCCESS_DISPLAY_MS: u64 = 3000;

/// Errors raised while reading or writing settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Settings for the fill workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Template loaded by `generate_simple_document`
    pub default_template_path: PathBuf,
    /// Output name used by `generate_simple_document`
    pub default_output_file_name: String,
    /// Inputs shorter than this are rejected before ZIP parsing
    pub min_file_size: usize,
    /// Engine options
    pub render: RenderOptions,
    /// Milliseconds a session shows success before returning to ready
    pub success_display_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            default_template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            default_output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
            min_file_size: MIN_FILE_SIZE,
            render: RenderOptions::default(),
            success_display_ms: DEFAULT_SUCCESS_DISPLAY_MS,
        }
    }
}

impl GeneratorConfig {
    pub fn success_display(&self) -> Duration {
        Duration::from_millis(self.success_display_ms)
    }
}

/// Loads and saves a [`GeneratorConfig`] file
pub struct ConfigManager {
    config_path: PathBuf,
    current: GeneratorConfig,
}

impl ConfigManager {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            current: GeneratorConfig::default(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn parse_or_default(&self, content: &str) -> GeneratorConfig {
        match serde_json::from_str::<GeneratorConfig>(content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config file {}, using defaults: {}",
                    self.config_path.display(),
                    e
                );
                GeneratorConfig::default()
            }
        }
    }

    /// Load settings from disk, or return defaults if the file doesn't exist
    pub async fn load(&mut self) -> ConfigResult<&GeneratorConfig> {
        self.current = if tokio::fs::try_exists(&self.config_path).await? {
            let content = tokio::fs::read_to_string(&self.config_path).await?;
            self.parse_or_default(&content)
        } else {
            GeneratorConfig::default()
        };
        Ok(&self.current)
    }

    /// Load settings synchronously
    pub fn load_sync(&mut self) -> ConfigResult<&GeneratorConfig> {
        self.current = if self.config_path.exists() {
            let content = std::fs::read_to_string(&self.config_path)?;
            self.parse_or_default(&content)
        } else {
            GeneratorConfig::default()
        };
        Ok(&self.current)
    }

    /// Write the current settings to disk
    pub fn save_sync(&self) -> ConfigResult<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.current)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Replace the settings and save them
    pub fn update_sync(&mut self, config: GeneratorConfig) -> ConfigResult<()> {
        self.current = config;
        self.save_sync()
    }

    pub fn into_config(self) -> GeneratorConfig {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MissingValue;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert_eq!(config.default_template_path, PathBuf::from("templates/demo-docx.docx"));
        assert_eq!(config.default_output_file_name, "generated-document.docx");
        assert_eq!(config.min_file_size, 4);
        assert_eq!(config.success_display(), Duration::from_secs(3));
        assert!(config.render.paragraph_loop);
        assert!(config.render.linebreaks);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = GeneratorConfig::default();
        config.render.missing_value = MissingValue::Error;
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: GeneratorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: GeneratorConfig =
            serde_json::from_str(r#"{"min_file_size": 22, "render": {"linebreaks": false}}"#).unwrap();
        assert_eq!(parsed.min_file_size, 22);
        assert!(!parsed.render.linebreaks);
        assert!(parsed.render.paragraph_loop);
        assert_eq!(parsed.default_output_file_name, DEFAULT_OUTPUT_FILE_NAME);
    }

    #[test]
    fn test_manager_load_save_sync() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conf/fill.json");
        let mut manager = ConfigManager::new(&path);

        assert_eq!(manager.load_sync().unwrap(), &GeneratorConfig::default());

        let mut config = GeneratorConfig::default();
        config.default_output_file_name = "letter.docx".to_string();
        manager.update_sync(config).unwrap();

        let mut reloaded = ConfigManager::new(&path);
        assert_eq!(reloaded.load_sync().unwrap().default_output_file_name, "letter.docx");
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fill.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut manager = ConfigManager::new(&path);
        assert_eq!(manager.load_sync().unwrap(), &GeneratorConfig::default());
    }

    #[tokio::test]
    async fn test_manager_load_async() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fill.json");
        std::fs::write(&path, r#"{"success_display_ms": 10}"#).unwrap();

        let mut manager = ConfigManager::new(&path);
        let config = manager.load().await.unwrap();
        assert_eq!(config.success_display(), Duration::from_millis(10));
    }
}
