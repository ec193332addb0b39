//! Workspace configuration and user profile.

use super::split_fields;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceInfo {
    /// Branch, changeset or label the workspace is switched to
    pub selector: String,
    /// Empty unless the workspace is on a branch
    pub branch_name: String,
    pub repository_name: String,
    pub server_url: String,
}

/// Parse the first line of `cm status --wkconfig --nochanges --nostatus`.
///
/// ```text
/// Branch /main@UE5PlasticPluginDev@localhost:8087
/// Branch /main@rep:UE5OpenWorldPerfTest@repserver:test@cloud
/// Changeset 1234@UE5PlasticPluginDev@test@cloud
/// Label 1.10.0@UE5PlasticPluginDev@test@cloud
/// ```
pub fn parse_workspace_info(lines: &[String]) -> Option<WorkspaceInfo> {
    let line = lines.first()?;

    let (is_branch, rest) = if let Some(rest) = line.strip_prefix("Branch ") {
        (true, rest)
    } else if let Some(rest) = line.strip_prefix("Changeset ") {
        (false, rest)
    } else if let Some(rest) = line.strip_prefix("Label ") {
        (false, rest)
    } else {
        return None;
    };

    let parts: Vec<&str> = rest.split('@').collect();
    if parts.len() < 3 {
        return None;
    }

    let selector = parts[0].to_string();
    let repository_name = parts[1].strip_prefix("rep:").unwrap_or(parts[1]).to_string();
    let mut server_url = parts[2]
        .strip_prefix("repserver:")
        .unwrap_or(parts[2])
        .to_string();
    // Cloud servers are named `organization@cloud`.
    if let Some(cloud) = parts.get(3) {
        server_url.push('@');
        server_url.push_str(cloud);
    }

    Some(WorkspaceInfo {
        branch_name: if is_branch { selector.clone() } else { String::new() },
        selector,
        repository_name,
        server_url,
    })
}

/// User name for `server_url` from `cm profile list --format="{server};{user}"`.
pub fn parse_profile_user(lines: &[String], server_url: &str) -> Option<String> {
    lines.iter().find_map(|line| match split_fields(line).as_slice() {
        [server, user] if *server == server_url => Some(user.to_string()),
        _ => None,
    })
}
