//! Configuration types for execution, validation, and collision policy.

use crate::executor::ExecutionPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use wavegate_core::{Error, Result};

/// Complete scheduler configuration.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Execution configuration
    pub execution: ExecutionConfig,
    /// Checkpoint validation configuration
    pub validation: ValidationConfig,
    /// Collision policy
    pub collision: CollisionConfig,
}

/// Execution configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Upper bound on concurrent worker invocations inside one wave
    pub max_parallelism: usize,
    /// Timeout in seconds for a single worker invocation
    pub task_timeout_seconds: Option<u64>,
    /// Whether parallel waves are allowed at all
    pub enable_parallel: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_parallelism: 4,
            task_timeout_seconds: None,
            enable_parallel: true,
        }
    }
}

impl ExecutionConfig {
    /// Builds the runtime execution policy.
    pub fn policy(&self) -> ExecutionPolicy {
        ExecutionPolicy {
            max_parallelism: self.max_parallelism.max(1),
            task_timeout: self.task_timeout_seconds.map(Duration::from_secs),
            allow_parallel: self.enable_parallel,
        }
    }
}

/// Checkpoint validation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Default timeout in seconds for a single gate check
    pub gate_timeout_seconds: u64,
    /// Output markers that turn a boolean command check into a failure
    pub failure_indicators: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            gate_timeout_seconds: 120,
            failure_indicators: vec!["FAILED".to_owned(), "panicked".to_owned()],
        }
    }
}

impl ValidationConfig {
    /// Default gate timeout as a duration.
    pub fn gate_timeout(&self) -> Duration {
        Duration::from_secs(self.gate_timeout_seconds)
    }

    /// Checks that the values can drive a checkpoint.
    ///
    /// # Errors
    /// Returns a configuration error if the gate timeout is zero
    pub fn validate(&self) -> Result<()> {
        if self.gate_timeout_seconds == 0 {
            return Err(Error::Config(
                "validation.gate_timeout_seconds must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Collision policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Resolve CRITICAL collisions to manual review instead of serialization
    pub escalate_critical: bool,
}

impl SchedulerConfig {
    /// Rejects values no run could use.
    ///
    /// # Errors
    /// Returns a configuration error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        self.validation.validate()
    }

    /// Get the default config directory path (`~/.wavegate`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_dir() -> Result<PathBuf> {
        use dirs::home_dir;
        let home = home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_owned()))?;
        Ok(home.join(".wavegate"))
    }

    /// Get the default config file path (`~/.wavegate/config.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from the default location (`~/.wavegate/config.toml`)
    /// If the config doesn't exist, creates it with default values
    ///
    /// # Errors
    /// Returns an error if the config cannot be read or created
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let config = Self::default();
            config.save_to_file(&config_path)?;
            Ok(config)
        }
    }

    /// Load config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or validated
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|error| Error::Config(format!("Failed to read config: {error}")))?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        use toml::to_string_pretty;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = to_string_pretty(self)
            .map_err(|error| Error::Config(format!("Failed to serialize config: {error}")))?;

        let header = "# Wavegate Configuration File\n\
                      # This file is automatically generated on first run\n\
                      # Edit this file to customize your settings\n\n";

        fs::write(path, format!("{header}{contents}"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.execution.max_parallelism, 4);
        assert!(config.execution.enable_parallel);
        assert_eq!(config.validation.gate_timeout(), Duration::from_secs(120));
        assert!(!config.collision.escalate_critical);
        assert_eq!(
            config.validation.failure_indicators,
            vec!["FAILED".to_owned(), "panicked".to_owned()]
        );
    }

    #[test]
    fn test_policy_from_config() {
        let config = ExecutionConfig {
            max_parallelism: 0,
            task_timeout_seconds: Some(5),
            enable_parallel: false,
        };
        let policy = config.policy();
        assert_eq!(policy.max_parallelism, 1);
        assert_eq!(policy.task_timeout, Some(Duration::from_secs(5)));
        assert!(!policy.allow_parallel);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(error) => panic!("failed to create temp dir: {error}"),
        };
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = SchedulerConfig::default();
        config.execution.max_parallelism = 8;
        config.collision.escalate_critical = true;

        if let Err(error) = config.save_to_file(&path) {
            panic!("save failed: {error}");
        }
        let loaded = match SchedulerConfig::load_from_file(&path) {
            Ok(loaded) => loaded,
            Err(error) => panic!("load failed: {error}"),
        };
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: SchedulerConfig = match toml::from_str("[execution]\nmax_parallelism = 2\n") {
            Ok(config) => config,
            Err(error) => panic!("parse failed: {error}"),
        };
        assert_eq!(parsed.execution.max_parallelism, 2);
        assert!(parsed.execution.enable_parallel);
        assert_eq!(parsed.validation.gate_timeout_seconds, 120);
    }

    #[test]
    fn test_invalid_file_is_configuration_error() {
        let temp_dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(error) => panic!("failed to create temp dir: {error}"),
        };
        let path = temp_dir.path().join("config.toml");
        if let Err(error) = fs::write(&path, "[execution\nmax_parallelism = ") {
            panic!("write failed: {error}");
        }

        match SchedulerConfig::load_from_file(&path) {
            Ok(_) => panic!("expected parse failure"),
            Err(error) => assert!(error.is_configuration_error()),
        }
    }

    #[test]
    fn test_zero_gate_timeout_is_rejected_on_load() {
        let temp_dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(error) => panic!("failed to create temp dir: {error}"),
        };
        let path = temp_dir.path().join("config.toml");
        if let Err(error) = fs::write(&path, "[validation]\ngate_timeout_seconds = 0\n") {
            panic!("write failed: {error}");
        }

        match SchedulerConfig::load_from_file(&path) {
            Ok(config) => panic!("expected rejection, loaded {config:?}"),
            Err(error) => assert!(matches!(error, Error::Config(_))),
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        if let Err(error) = SchedulerConfig::default().validate() {
            panic!("defaults rejected: {error}");
        }
        let zero = ValidationConfig {
            gate_timeout_seconds: 0,
            ..ValidationConfig::default()
        };
        assert!(matches!(zero.validate(), Err(Error::Config(_))));
    }
}
