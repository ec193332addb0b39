//! Path helpers shared by the parsers, the cache and the workers.
//!
//! Plastic SCM reports paths with the platform separator. Everything stored by this
//! crate uses forward slashes, and cache lookups ignore case.

use std::path::{Path, PathBuf};

/// Name of the metadata directory at the root of every workspace
pub const WORKSPACE_METADATA_DIR: &str = ".plastic";

/// Replace backslashes with forward slashes.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Key used to index paths in the state cache.
pub fn path_key(path: &str) -> String {
    normalize_path(path).to_lowercase()
}

pub fn paths_equal_ignore_case(a: &str, b: &str) -> bool {
    path_key(a) == path_key(b)
}

pub fn path_to_string(path: &Path) -> String {
    normalize_path(&path.to_string_lossy())
}

/// Join a path relative to the workspace root, leaving absolute paths untouched.
pub fn to_absolute(workspace_root: &str, path: &str) -> String {
    let path = normalize_path(path);
    if Path::new(&path).is_absolute() || path.starts_with('/') {
        return path;
    }
    let root = normalize_path(workspace_root);
    let root = root.trim_end_matches('/');
    let relative = path.trim_start_matches("./");
    if root.is_empty() {
        relative.to_string()
    } else {
        format!("{root}/{relative}")
    }
}

/// Join a server path (`/Content/A.uasset`) under the workspace root.
pub fn server_path_to_absolute(workspace_root: &str, server_path: &str) -> String {
    to_absolute(workspace_root, server_path.trim_start_matches('/'))
}

/// Walk up from `path` looking for the directory holding `.plastic`.
///
/// Returns `None` when no parent directory is a workspace root.
pub fn find_root_directory(path: &Path) -> Option<PathBuf> {
    let as_string = path.to_string_lossy();
    let trimmed = as_string.trim_end_matches(['\\', '/']);
    if trimmed.is_empty() {
        return None;
    }

    Path::new(trimmed)
        .ancestors()
        .find(|dir| !dir.as_os_str().is_empty() && dir.join(WORKSPACE_METADATA_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Paths of a command that start under `dir`, compared case-insensitively.
pub fn is_under_directory(path: &str, dir: &str) -> bool {
    path_key(path).starts_with(&path_key(dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_and_keys() {
        assert_eq!(normalize_path(r"c:\Workspace\Content\A.uasset"), "c:/Workspace/Content/A.uasset");
        assert_eq!(path_key("C:/Ws/A.uasset"), path_key(r"c:\ws\a.UASSET"));
        assert!(paths_equal_ignore_case("/ws/Content", "/WS/content"));
    }

    #[test]
    fn test_to_absolute() {
        assert_eq!(to_absolute("/ws/", "Content/A.uasset"), "/ws/Content/A.uasset");
        assert_eq!(to_absolute("/ws", r"Content\A.uasset"), "/ws/Content/A.uasset");
        assert_eq!(to_absolute("/ws", "/other/B.uasset"), "/other/B.uasset");
        assert_eq!(
            server_path_to_absolute("/ws", "/Content/A.uasset"),
            "/ws/Content/A.uasset"
        );
    }

    #[test]
    fn test_find_root_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path().join("project");
        let nested = root.join("Content").join("Maps");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(root.join(WORKSPACE_METADATA_DIR)).unwrap();

        assert_eq!(find_root_directory(&nested), Some(root.clone()));

        let with_slash = format!("{}/", root.display());
        assert_eq!(find_root_directory(Path::new(&with_slash)), Some(root));
    }

    #[test]
    fn test_find_root_directory_not_found() {
        let temp = tempfile::TempDir::new().unwrap();
        assert_eq!(find_root_directory(temp.path()), None);
        assert_eq!(find_root_directory(Path::new("")), None);
    }

    #[test]
    fn test_is_under_directory() {
        assert!(is_under_directory("/ws/Content/A.uasset", "/ws/Content"));
        assert!(is_under_directory("/WS/content/A.uasset", "/ws/Content"));
        assert!(!is_under_directory("/ws/Config/A.ini", "/ws/Content"));
    }
}
