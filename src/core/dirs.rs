use crate::core::error::PlasticError;
use std::path::PathBuf;

const APP_DIRECTORY: &str = "plastic-shell";

pub fn get_config_directory() -> Result<PathBuf, PlasticError> {
    let base = match std::env::consts::OS {
        "linux" | "freebsd" | "netbsd" | "openbsd" => std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config"))),
        "macos" => dirs::home_dir().map(|home| home.join("Library/Application Support")),
        _ => dirs::config_dir(),
    };

    base.map(|dir| dir.join(APP_DIRECTORY))
        .ok_or(PlasticError::ConfigDirectoryNotFound)
}
