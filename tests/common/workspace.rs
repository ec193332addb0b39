//! Temporary workspaces driven by the fake `cm` client
//!
//! A [`TestWorkspace`] owns three temporary directories: the workspace itself (with its
//! `.plastic` metadata directory), a `bin` directory holding the fake client and a
//! configuration home pointing `plastic-shell` at that client.

#![allow(dead_code)]

use super::fixtures::{FAKE_CM, ROOT_PLACEHOLDER};
use plastic_shell::core::config::{Settings, ShellConfig};
use plastic_shell::core::error::Result;
use plastic_shell::core::paths::path_to_string;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub struct TestWorkspace {
    _root_dir: TempDir,
    _bin_dir: TempDir,
    _config_home: TempDir,
    pub path: PathBuf,
    pub cm_path: PathBuf,
    pub config_home: PathBuf,
}

impl TestWorkspace {
    /// Workspace root as the provider reports it
    pub fn root(&self) -> String {
        path_to_string(&self.path)
    }

    /// Settings using the fake client with short timeouts
    pub fn settings(&self) -> Settings {
        Settings {
            binary_path: self.cm_path.clone(),
            inactivity_timeout_secs: 2,
            exit_grace_period_ms: 200,
            worker_threads: 2,
            ..Settings::default()
        }
    }

    pub fn shell_config(&self) -> ShellConfig {
        ShellConfig {
            inactivity_timeout: Duration::from_secs(1),
            ..self.settings().shell_config()
        }
    }

    /// Command running the binary in the workspace with the test configuration
    pub fn cli(&self) -> anyhow::Result<std::process::Command> {
        use assert_cmd::prelude::*;

        let mut cmd = std::process::Command::cargo_bin("plastic-shell")?;
        cmd.current_dir(&self.path)
            .env("HOME", &self.config_home)
            .env("XDG_CONFIG_HOME", &self.config_home)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        Ok(cmd)
    }
}

/// Write the fake client to `dir/cm` for a workspace rooted at `root`.
pub fn write_fake_cm(dir: &Path, root: &str) -> Result<PathBuf> {
    let cm_path = dir.join("cm");
    fs::write(&cm_path, FAKE_CM.replace(ROOT_PLACEHOLDER, root))?;
    fs::set_permissions(&cm_path, fs::Permissions::from_mode(0o755))?;
    Ok(cm_path)
}

/// Write `config.json` where plastic-shell looks for it under `home`.
fn write_settings(home: &Path, settings: &Settings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings)?;
    for config_dir in [
        home.join("plastic-shell"),
        home.join("Library/Application Support/plastic-shell"),
    ] {
        fs::create_dir_all(&config_dir)?;
        fs::write(config_dir.join("config.json"), &content)?;
    }
    Ok(())
}

/// Sets up a workspace with a `Content` directory and a fake client.
pub fn setup_test_workspace() -> Result<TestWorkspace> {
    let root_dir = TempDir::new()?;
    let bin_dir = TempDir::new()?;
    let config_home = TempDir::new()?;
    let path = root_dir.path().to_path_buf();

    fs::create_dir(path.join(".plastic"))?;
    fs::create_dir(path.join("Content"))?;
    fs::write(path.join("Content/A.uasset"), "asset")?;

    let cm_path = write_fake_cm(bin_dir.path(), &path_to_string(&path))?;
    let workspace = TestWorkspace {
        path,
        cm_path,
        config_home: config_home.path().to_path_buf(),
        _root_dir: root_dir,
        _bin_dir: bin_dir,
        _config_home: config_home,
    };
    write_settings(&workspace.config_home, &workspace.settings())?;
    Ok(workspace)
}

/// Directory outside of any workspace, with the same fake client configured.
pub fn setup_outside_workspace() -> Result<TestWorkspace> {
    let workspace = setup_test_workspace()?;
    fs::remove_dir(workspace.path.join(".plastic"))?;
    Ok(workspace)
}
