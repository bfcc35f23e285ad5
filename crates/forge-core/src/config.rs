//! Configuration management for Forge

use crate::error::{ForgeError, Result};
use crate::types::{ForgeConfig, ValidationError, ValidationResult, ValidationWarning};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] =
    &["forge.config.yaml", "forge.config.yml", "forge.config.json"];

/// Overrides `work_dir` after a configuration is loaded
pub const WORK_DIR_ENV: &str = "FORGE_WORK_DIR";

static TAG_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.-]*$").expect("tag name pattern"));

/// Configuration manager for loading and saving workbench configurations
pub struct ConfigManager {
    cache: std::collections::HashMap<PathBuf, CachedConfig>,
}

struct CachedConfig {
    config: ForgeConfig,
    modified_time: std::time::SystemTime,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            cache: std::collections::HashMap::new(),
        }
    }

    /// Find configuration file in a directory
    pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
        for name in CONFIG_FILE_NAMES {
            let path = dir.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }

    /// Load configuration from a file
    pub fn load(&mut self, config_path: &Path) -> Result<ForgeConfig> {
        let metadata = std::fs::metadata(config_path)?;
        let modified_time = metadata
            .modified()
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);

        if let Some(cached) = self.cache.get(config_path) {
            if cached.modified_time == modified_time {
                return Ok(cached.config.clone());
            }
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: ForgeConfig = if is_json(config_path) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        config.work_dir = normalize_work_dir(&config.work_dir);
        debug!("Loaded configuration from {}", config_path.display());

        self.cache.insert(
            config_path.to_path_buf(),
            CachedConfig {
                config: config.clone(),
                modified_time,
            },
        );

        Ok(config)
    }

    /// Load configuration from a directory (searches for config files)
    pub fn load_from_directory(&mut self, dir: &Path) -> Result<(ForgeConfig, PathBuf)> {
        let config_path = Self::find_config_file(dir)
            .ok_or_else(|| ForgeError::ConfigNotFound(dir.display().to_string()))?;

        let config = self.load(&config_path)?;
        Ok((config, config_path))
    }

    /// Apply environment overrides on top of a loaded configuration
    pub fn apply_env(mut config: ForgeConfig) -> ForgeConfig {
        if let Ok(work_dir) = std::env::var(WORK_DIR_ENV) {
            if !work_dir.trim().is_empty() {
                config.work_dir = normalize_work_dir(&work_dir);
            }
        }
        config
    }

    /// Validate a configuration
    pub fn validate(&self, config: &ForgeConfig) -> ValidationResult {
        let mut result = ValidationResult::ok();

        for (field, tag) in [
            ("artifact_tag", &config.artifact_tag),
            ("action_tag", &config.action_tag),
        ] {
            if !TAG_NAME.is_match(tag) {
                result = result.with_error(ValidationError {
                    field: field.to_string(),
                    message: format!("`{}` is not a valid element name", tag),
                    code: "INVALID_TAG".to_string(),
                });
            }
        }

        if config.artifact_tag == config.action_tag {
            result = result.with_error(ValidationError {
                field: "action_tag".to_string(),
                message: "Artifact and action elements must use different names".to_string(),
                code: "DUPLICATE_TAG".to_string(),
            });
        } else if config.artifact_tag.starts_with(&config.action_tag)
            || config.action_tag.starts_with(&config.artifact_tag)
        {
            result = result.with_warning(ValidationWarning {
                field: "action_tag".to_string(),
                message: "One element name is a prefix of the other".to_string(),
                suggestion: Some("Prefix-sharing names delay tag recognition".to_string()),
            });
        }

        if normalize_work_dir(&config.work_dir).is_empty() {
            result = result.with_error(ValidationError {
                field: "work_dir".to_string(),
                message: "Working directory must not be empty".to_string(),
                code: "EMPTY_WORK_DIR".to_string(),
            });
        } else if config.work_dir.starts_with('/') {
            result = result.with_warning(ValidationWarning {
                field: "work_dir".to_string(),
                message: "Working directory is stored without a leading separator".to_string(),
                suggestion: Some(format!(
                    "Use `{}`",
                    normalize_work_dir(&config.work_dir)
                )),
            });
        }

        if config.shell_delay_ms > 60_000 {
            result = result.with_warning(ValidationWarning {
                field: "shell_delay_ms".to_string(),
                message: "Simulated shell delay is over a minute".to_string(),
                suggestion: None,
            });
        }

        result
    }

    /// Reject a configuration that `validate` reports errors for
    pub fn ensure_valid(&self, config: &ForgeConfig) -> Result<()> {
        let result = self.validate(config);
        if result.valid {
            return Ok(());
        }
        let errors: Vec<String> = result
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        Err(ForgeError::InvalidConfig(errors.join("; ")))
    }

    /// Save configuration to a file
    pub fn save(&self, config: &ForgeConfig, config_path: &Path) -> Result<()> {
        let content = if is_json(config_path) {
            serde_json::to_string_pretty(config)?
        } else {
            serde_yaml::to_string(config)?
        };

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(config_path, content)?;

        Ok(())
    }

}

fn is_json(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}

fn normalize_work_dir(work_dir: &str) -> String {
    work_dir.trim().trim_matches('/').to_string()
}
