//! Configuration resolution for CLI commands

use anyhow::{Context, Result};
use forge_core::{ConfigManager, ForgeConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolved configuration and the file it came from, if any
pub struct LoadedConfig {
    pub config: ForgeConfig,
    pub path: Option<PathBuf>,
}

/// Load the configuration for a command.
///
/// An explicit path must exist. Otherwise `forge.config.*` in `dir` is used
/// when present, falling back to defaults. Environment overrides apply last.
pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<LoadedConfig> {
    let mut manager = ConfigManager::new();

    let (config, path) = match explicit {
        Some(path) => {
            let config = manager
                .load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            (config, Some(path.to_path_buf()))
        }
        None => match ConfigManager::find_config_file(dir) {
            Some(path) => {
                let config = manager.load(&path).with_context(|| {
                    format!("Failed to load configuration from {}", path.display())
                })?;
                (config, Some(path))
            }
            None => {
                debug!("No configuration file in {}, using defaults", dir.display());
                (ForgeConfig::default(), None)
            }
        },
    };

    Ok(LoadedConfig {
        config: ConfigManager::apply_env(config),
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_config_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let loaded = load(None, temp_dir.path())?;

        assert!(loaded.path.is_none());
        assert_eq!(loaded.config.artifact_tag, ForgeConfig::default().artifact_tag);
        Ok(())
    }

    #[test]
    fn test_config_file_in_directory() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("forge.config.yml");
        std::fs::write(&path, "action_tag: forgeAction\nshell_delay_ms: 0\n")?;

        let loaded = load(None, temp_dir.path())?;

        assert_eq!(loaded.path, Some(path));
        assert_eq!(loaded.config.action_tag, "forgeAction");
        assert_eq!(loaded.config.shell_delay_ms, 0);
        Ok(())
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.yaml");
        assert!(load(Some(&missing), temp_dir.path()).is_err());
    }
}
