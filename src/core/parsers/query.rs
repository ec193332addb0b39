//! `cm find ... --xml` and `cm log --xml` queries.

use super::{child, child_text, elements, parse_date, parse_document};
use crate::core::error::{PlasticError, Result};
use crate::core::shell::atoi;
use crate::core::state::{Branch, Changeset, FileState, Revision};
use crate::core::workspace_state::WorkspaceState;

/// Parse `cm find changesets --xml`.
///
/// ```xml
/// <PLASTICQUERY>
///   <CHANGESET>
///     <CHANGESETID>56</CHANGESETID>
///     <COMMENT>test</COMMENT>
///     <DATE>2024-03-25T10:37:14+01:00</DATE>
///     <OWNER>jane@example.com</OWNER>
///     <BRANCH>/main</BRANCH>
///   </CHANGESET>
/// </PLASTICQUERY>
/// ```
pub fn parse_changesets(xml: &str) -> Result<Vec<Changeset>> {
    let document = parse_document(xml, "PLASTICQUERY")?;

    let changesets = elements(document.root_element())
        .filter_map(|node| {
            let changeset_id = child_text(node, "CHANGESETID")?;
            Some(Changeset {
                changeset_id: atoi(&changeset_id),
                comment: child_text(node, "COMMENT").unwrap_or_default(),
                branch: child_text(node, "BRANCH").unwrap_or_default(),
                // The full e-mail is kept; display code can shorten it.
                created_by: child_text(node, "OWNER").unwrap_or_default(),
                date: child_text(node, "DATE").and_then(|date| parse_date(&date)),
                files: Vec::new(),
            })
        })
        .collect();

    Ok(changesets)
}

/// Parse `cm log cs:<id> --xml` into the files changed by `changeset`.
///
/// ```xml
/// <LogList>
///   <Changeset>
///     <ChangesetId>73</ChangesetId>
///     <Changes>
///       <Item><SrcCmPath>/Private.md</SrcCmPath><DstCmPath>/Private.md</DstCmPath><Type>Added</Type></Item>
///     </Changes>
///   </Changeset>
/// </LogList>
/// ```
///
/// Paths are relative to the workspace root. `root_rep_spec` is the `repository@server`
/// of the workspace.
pub fn parse_log(xml: &str, changeset: &Changeset, root_rep_spec: &str) -> Result<Vec<FileState>> {
    let document = parse_document(xml, "LogList")?;
    let changesets: Vec<_> = elements(document.root_element()).collect();
    let [changeset_node] = changesets.as_slice() else {
        return Err(PlasticError::unexpected_xml("Changeset"));
    };

    let changeset_id = child_text(*changeset_node, "ChangesetId")
        .ok_or_else(|| PlasticError::unexpected_xml("ChangesetId"))?;
    if atoi(&changeset_id) != changeset.changeset_id {
        log::error!(
            "ParseLogResults: expected changeset {} but got {changeset_id}",
            changeset.changeset_id
        );
        return Err(PlasticError::unexpected_xml("ChangesetId"));
    }

    let mut files: Vec<FileState> = Vec::new();
    let Some(changes) = child(*changeset_node, "Changes") else {
        return Ok(files);
    };

    for item in elements(changes) {
        let (Some(path), Some(change_type)) =
            (child_text(item, "DstCmPath"), child_text(item, "Type"))
        else {
            continue;
        };

        let state = WorkspaceState::from_change_type(&change_type);
        let mut file_state = FileState::with_state(strip_root(&path), state);
        file_state.rep_spec = root_rep_spec.to_string();
        if state == WorkspaceState::Moved {
            if let Some(source) = child_text(item, "SrcCmPath") {
                file_state.moved_from = strip_root(&source);
            }
        }

        // One revision to fetch the content for a diff, unless the file is gone.
        if state != WorkspaceState::Deleted {
            file_state.history.push(Revision {
                filename: file_state.path.clone(),
                revision: format!("cs:{}", changeset.changeset_id),
                changeset_number: changeset.changeset_id,
                date: changeset.date,
                ..Revision::default()
            });
        }

        // A moved file is listed twice; the second entry carries the move.
        match files.iter_mut().find(|existing| existing.path == file_state.path) {
            Some(existing) => {
                existing.state = file_state.state;
                existing.moved_from = file_state.moved_from;
            }
            None => files.push(file_state),
        }
    }

    Ok(files)
}

/// Parse `cm find "branches where date >= '<date>'" --xml`.
///
/// ```xml
/// <PLASTICQUERY>
///   <BRANCH>
///     <COMMENT>main branch</COMMENT>
///     <DATE>2023-10-18T15:08:49+02:00</DATE>
///     <OWNER>jane@example.com</OWNER>
///     <NAME>/main</NAME>
///     <REPNAME>Repo</REPNAME>
///     <REPSERVER>test@cloud</REPSERVER>
///   </BRANCH>
/// </PLASTICQUERY>
/// ```
pub fn parse_branches(xml: &str) -> Result<Vec<Branch>> {
    let document = parse_document(xml, "PLASTICQUERY")?;

    let branches = elements(document.root_element())
        .filter_map(|node| {
            let name = child_text(node, "NAME")?;
            let repository = match (child_text(node, "REPNAME"), child_text(node, "REPSERVER")) {
                (Some(name), Some(server)) => format!("{name}@{server}"),
                _ => String::new(),
            };
            Some(Branch {
                name,
                repository,
                created_by: child_text(node, "OWNER").unwrap_or_default(),
                date: child_text(node, "DATE").and_then(|date| parse_date(&date)),
                comment: child_text(node, "COMMENT").unwrap_or_default(),
            })
        })
        .collect();

    Ok(branches)
}

fn strip_root(server_path: &str) -> String {
    server_path.strip_prefix('/').unwrap_or(server_path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_changesets() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?>
<PLASTICQUERY>
  <CHANGESET>
    <ID>2652</ID>
    <CHANGESETID>56</CHANGESETID>
    <COMMENT>Fix &quot;lighting&quot;</COMMENT>
    <DATE>2024-03-25T10:37:14+01:00</DATE>
    <OWNER>jane@example.com</OWNER>
    <BRANCH>/main</BRANCH>
  </CHANGESET>
  <CHANGESET>
    <COMMENT>no id</COMMENT>
  </CHANGESET>
</PLASTICQUERY>"#;
        let changesets = parse_changesets(xml).unwrap();
        assert_eq!(changesets.len(), 1);
        assert_eq!(changesets[0].changeset_id, 56);
        assert_eq!(changesets[0].comment, "Fix \"lighting\"");
        assert_eq!(changesets[0].created_by, "jane@example.com");
        assert_eq!(changesets[0].branch, "/main");
        assert!(changesets[0].date.is_some());
    }

    #[test]
    fn test_parse_log() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<LogList>
  <Changeset>
    <ChangesetId>73</ChangesetId>
    <Changes>
      <Item><SrcCmPath>/Private/Private.md</SrcCmPath><DstCmPath>/Private/Private.md</DstCmPath><Type>Added</Type></Item>
      <Item><DstCmPath>/Content/Gone.uasset</DstCmPath><Type>Deleted</Type></Item>
      <Item><DstCmPath>/Content/New.uasset</DstCmPath><Type>Changed</Type></Item>
      <Item><SrcCmPath>/Content/Old.uasset</SrcCmPath><DstCmPath>/Content/New.uasset</DstCmPath><Type>Moved</Type></Item>
    </Changes>
  </Changeset>
</LogList>"#;
        let changeset = Changeset {
            changeset_id: 73,
            ..Changeset::default()
        };
        let files = parse_log(xml, &changeset, "Repo@server").unwrap();

        assert_eq!(files.len(), 3);
        assert_eq!(files[0].path, "Private/Private.md");
        assert_eq!(files[0].state, WorkspaceState::Added);
        assert_eq!(files[0].rep_spec, "Repo@server");
        assert_eq!(files[0].history[0].revision, "cs:73");
        assert!(files[1].history.is_empty());
        assert_eq!(files[2].state, WorkspaceState::Moved);
        assert_eq!(files[2].moved_from, "Content/Old.uasset");
    }

    #[test]
    fn test_parse_log_wrong_changeset() {
        let xml = "<LogList><Changeset><ChangesetId>74</ChangesetId></Changeset></LogList>";
        let changeset = Changeset {
            changeset_id: 73,
            ..Changeset::default()
        };
        assert!(parse_log(xml, &changeset, "Repo@server").is_err());
        assert!(parse_log("<LogList />", &changeset, "Repo@server").is_err());
    }

    #[test]
    fn test_parse_branches() {
        let xml = r#"<PLASTICQUERY>
  <BRANCH>
    <ID>3</ID>
    <COMMENT>main branch</COMMENT>
    <DATE>2023-10-18T15:08:49+02:00</DATE>
    <OWNER>jane@example.com</OWNER>
    <NAME>/main</NAME>
    <PARENT></PARENT>
    <REPNAME>Repo</REPNAME>
    <REPSERVER>test@cloud</REPSERVER>
  </BRANCH>
  <BRANCH><COMMENT>nameless</COMMENT></BRANCH>
</PLASTICQUERY>"#;
        let branches = parse_branches(xml).unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].name, "/main");
        assert_eq!(branches[0].repository, "Repo@test@cloud");
        assert_eq!(branches[0].comment, "main branch");

        assert!(parse_branches("<Merge />").is_err());
    }
}
