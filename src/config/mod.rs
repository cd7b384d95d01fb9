use crate::models::{PageDefinition, Settings};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fs;

/// Prefix of environment variables that override settings.yaml,
/// e.g. `TASKBRIDGE__LOGGING__DEBUG_MODE=true`
pub const ENV_PREFIX: &str = "TASKBRIDGE";

/// Named page definitions in declaration order
pub type PageMap = IndexMap<String, PageDefinition>;

/// Configuration manager for loading and saving YAML configuration files.
///
/// Manages two files in the data directory:
/// - `settings.yaml`: logging and bridge settings, layered with environment overrides
/// - `pages.yaml`: named dialog page definitions
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
    pages_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing configuration files, created if missing
    ///
    /// # Returns
    /// A new ConfigManager instance
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join("settings.yaml"),
            pages_path: config_dir.join("pages.yaml"),
            config_dir,
        })
    }

    /// Load settings from settings.yaml and `TASKBRIDGE__*` environment variables.
    ///
    /// A missing file is not an error; every field has a default.
    pub fn load_settings(&self) -> Result<Settings> {
        self.load_settings_with_env(None)
    }

    /// Like [`load_settings()`](Self::load_settings), reading overrides from `env`
    /// instead of the process environment when given.
    ///
    /// # Arguments
    /// * `env` - Variables as they would appear in the environment, prefix included
    pub fn load_settings_with_env(&self, env: Option<HashMap<String, String>>) -> Result<Settings> {
        if !self.settings_path.exists() {
            tracing::debug!(
                "Settings file not found at {}, using defaults and environment",
                self.settings_path
            );
        }

        let settings: Settings = config::Config::builder()
            .add_source(
                config::File::new(self.settings_path.as_str(), config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Save settings to settings.yaml.
    ///
    /// # Arguments
    /// * `settings` - The Settings to save
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Load the named page definitions.
    ///
    /// # Returns
    /// The pages in file order, or an empty map if pages.yaml doesn't exist
    pub fn load_pages(&self) -> Result<PageMap> {
        if !self.pages_path.exists() {
            tracing::warn!("Pages file not found at {}, no pages defined", self.pages_path);
            return Ok(PageMap::new());
        }

        let file_contents = fs::read_to_string(&self.pages_path)
            .with_context(|| format!("Failed to read pages: {}", self.pages_path))?;

        let pages: PageMap = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse pages: {}", self.pages_path))?;

        tracing::info!("Loaded {} page(s) from {}", pages.len(), self.pages_path);
        Ok(pages)
    }

    /// Save the named page definitions.
    ///
    /// # Arguments
    /// * `pages` - Pages to save, written in map order
    pub fn save_pages(&self, pages: &PageMap) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(pages).context("Failed to serialize pages to YAML")?;

        fs::write(&self.pages_path, yaml_string)
            .with_context(|| format!("Failed to write pages: {}", self.pages_path))?;

        tracing::info!("Saved {} page(s) to {}", pages.len(), self.pages_path);
        Ok(())
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    pub fn pages_path(&self) -> &Utf8Path {
        &self.pages_path
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
