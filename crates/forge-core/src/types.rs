//! Core type definitions for Forge

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default working directory every file action is rooted under
pub const DEFAULT_WORK_DIR: &str = "home/project";

/// Default markup vocabulary
pub const DEFAULT_ARTIFACT_TAG: &str = "boltArtifact";
pub const DEFAULT_ACTION_TAG: &str = "boltAction";

/// Default duration of a simulated shell command
pub const DEFAULT_SHELL_DELAY_MS: u64 = 1000;

/// Main workbench configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Working directory prefix for file actions, without a leading separator
    pub work_dir: String,
    /// Name of the outer artifact element
    pub artifact_tag: String,
    /// Name of the nested action element
    pub action_tag: String,
    /// Fixed duration of the simulated shell executor
    pub shell_delay_ms: u64,
    /// Create the working directory folders when a workbench starts empty
    pub seed_work_dir: bool,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            work_dir: DEFAULT_WORK_DIR.to_string(),
            artifact_tag: DEFAULT_ARTIFACT_TAG.to_string(),
            action_tag: DEFAULT_ACTION_TAG.to_string(),
            shell_delay_ms: DEFAULT_SHELL_DELAY_MS,
            seed_work_dir: true,
        }
    }
}

impl ForgeConfig {
    pub fn shell_delay(&self) -> Duration {
        Duration::from_millis(self.shell_delay_ms)
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<String>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_shell_delay(mut self, delay: Duration) -> Self {
        self.shell_delay_ms = delay.as_millis() as u64;
        self
    }
}

/// Validation result
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: ValidationError) -> Self {
        self.valid = false;
        self.errors.push(error);
        self
    }

    pub fn with_warning(mut self, warning: ValidationWarning) -> Self {
        self.warnings.push(warning);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}
