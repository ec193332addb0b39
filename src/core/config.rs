use crate::core::dirs::get_config_directory;
use crate::core::error::PlasticError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_FILE: &str = "config.json";

/// User settings persisted as `config.json` in the configuration directory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Path to the `cm` executable; a bare name is resolved through `PATH`.
    pub binary_path: PathBuf,
    pub inactivity_timeout_secs: u64,
    pub progress_log_interval_secs: u64,
    pub exit_grace_period_ms: u64,
    pub worker_threads: usize,
    /// Run a whole-workspace status right after a successful connection.
    pub update_status_at_startup: bool,
    pub max_files_per_batch: usize,
    pub history_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("cm"),
            inactivity_timeout_secs: 180,
            progress_log_interval_secs: 5,
            exit_grace_period_ms: 1000,
            worker_threads: 4,
            update_status_at_startup: false,
            max_files_per_batch: 5000,
            history_limit: 100,
        }
    }
}

impl Settings {
    pub fn load_or_create() -> Result<Self, PlasticError> {
        let config_file = get_config_directory()?.join(SETTINGS_FILE);

        if config_file.exists() {
            Self::load_from(&config_file)
        } else {
            let settings = Self::default();
            settings.save()?;
            Ok(settings)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, PlasticError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| PlasticError::settings_parse_failed(path, e))
    }

    pub fn save(&self) -> Result<(), PlasticError> {
        let config_dir = get_config_directory()?;
        std::fs::create_dir_all(&config_dir)?;

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_dir.join(SETTINGS_FILE), content)?;

        Ok(())
    }

    pub fn shell_config(&self) -> ShellConfig {
        ShellConfig {
            binary_path: self.binary_path.clone(),
            inactivity_timeout: Duration::from_secs(self.inactivity_timeout_secs),
            progress_log_interval: Duration::from_secs(self.progress_log_interval_secs),
            exit_grace_period: Duration::from_millis(self.exit_grace_period_ms),
        }
    }
}

/// Immutable parameters of the `cm shell` transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellConfig {
    pub binary_path: PathBuf,
    pub inactivity_timeout: Duration,
    pub progress_log_interval: Duration,
    pub exit_grace_period: Duration,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Settings::default().shell_config()
    }
}
