//! `cm history --moveddeleted --xml` reports.
//!
//! ```xml
//! <RevisionHistoriesResult>
//!   <RevisionHistories>
//!     <RevisionHistory>
//!       <ItemName>C:/ws/Content/BP_Renamed.uasset</ItemName>
//!       <Revisions>
//!         <Revision>
//!           <Branch>/main</Branch>
//!           <CreationDate>2019-10-14T09:52:07+02:00</CreationDate>
//!           <RevisionType>bin</RevisionType>
//!           <ChangesetNumber>7</ChangesetNumber>
//!           <Owner>jane</Owner>
//!           <Comment>New tests</Comment>
//!           <Size>22356</Size>
//!         </Revision>
//!         <Revision>
//!           <Branch>Moved from /Content/BP_ToRename.uasset to /Content/BP_Renamed.uasset</Branch>
//!           <RevisionType />
//!           <ChangesetNumber>12</ChangesetNumber>
//!         </Revision>
//!       </Revisions>
//!     </RevisionHistory>
//!   </RevisionHistories>
//! </RevisionHistoriesResult>
//! ```
//!
//! Revisions are listed oldest first. A move shows up as an extra revision with an empty
//! `<RevisionType>` right after the revision it applies to.

use super::{child, child_text, elements, parse_date, parse_document, user_name_to_display_name};
use crate::core::error::{PlasticError, Result};
use crate::core::paths::{normalize_path, server_path_to_absolute};
use crate::core::shell::atoi;
use crate::core::state::{FileState, Revision};
use crate::core::workspace_state::action;

/// Revisions kept per file, whatever the length of the server history
pub const MAX_HISTORY_ENTRIES: usize = 100;

/// Workspace values the history of an item is interpreted against.
#[derive(Debug, Clone)]
pub struct HistoryContext {
    pub workspace_root: String,
    /// `repository@server` of the workspace; revisions of other repositories get a suffix
    pub root_rep_spec: String,
    pub branch_name: String,
    pub max_entries: usize,
}

impl HistoryContext {
    pub fn new(
        workspace_root: &str,
        repository_name: &str,
        server_url: &str,
        branch_name: &str,
        max_entries: usize,
    ) -> Self {
        Self {
            workspace_root: workspace_root.to_string(),
            root_rep_spec: format!("{repository_name}@{server_url}"),
            branch_name: branch_name.to_string(),
            max_entries: max_entries.min(MAX_HISTORY_ENTRIES),
        }
    }
}

/// Fill the history and head fields of `states` from a history report.
///
/// With `update_history` false only the head of each item is looked at. On a document
/// of the wrong shape, `states` is left untouched.
pub fn parse_history(
    xml: &str,
    context: &HistoryContext,
    update_history: bool,
    states: &mut [FileState],
) -> Result<()> {
    let document = parse_document(xml, "RevisionHistoriesResult")?;
    let histories = child(document.root_element(), "RevisionHistories")
        .ok_or_else(|| PlasticError::unexpected_xml("RevisionHistories"))?;

    for history in elements(histories) {
        let Some(item_name) = child_text(history, "ItemName") else {
            continue;
        };
        let item_name = normalize_path(&item_name);
        let Some(state) = states.iter_mut().find(|state| state.path == item_name) else {
            continue;
        };
        let Some(revisions) = child(history, "Revisions") else {
            continue;
        };

        let revision_nodes: Vec<_> = elements(revisions).collect();
        if update_history {
            state.history.clear();
            state.history.reserve(revision_nodes.len().min(context.max_entries));
        }

        let pending_source = state
            .pending_merge
            .as_ref()
            .map(|merge| atoi(&merge.source_changeset));

        let mut filename = item_name.clone();
        let mut next_moved_from: Option<String> = None;
        for (index, node) in revision_nodes.iter().enumerate().rev() {
            let mut revision = Revision {
                filename: filename.clone(),
                ..Revision::default()
            };

            if let Some(revision_type) = child_text(*node, "RevisionType") {
                if revision_type.is_empty() {
                    let branch = child_text(*node, "Branch").unwrap_or_default();
                    next_moved_from = Some(server_path_to_absolute(
                        &context.workspace_root,
                        &parse_moved_from(&branch),
                    ));
                    continue;
                }
                if let Some(moved_from) = next_moved_from.take() {
                    revision.action = action::MOVED.to_string();
                    // Older revisions carry the name from before the move.
                    filename = moved_from;
                } else if index == 0 {
                    revision.action = action::ADDED.to_string();
                } else {
                    revision.action = action::CHANGED.to_string();
                }
            }

            if let Some(changeset) = child_text(*node, "ChangesetNumber") {
                revision.changeset_number = atoi(&changeset);
                revision.revision = if !state.rep_spec.is_empty() && state.rep_spec != context.root_rep_spec {
                    let repository = state.rep_spec.split('@').next().unwrap_or_default();
                    format!("cs:{changeset}@{repository}")
                } else {
                    format!("cs:{changeset}")
                };
            }
            if let Some(comment) = child_text(*node, "Comment") {
                revision.description = comment;
            }
            if let Some(owner) = child_text(*node, "Owner") {
                revision.user_name = user_name_to_display_name(&owner).to_string();
            }
            if let Some(date) = child_text(*node, "CreationDate") {
                revision.date = parse_date(&date);
            }
            if let Some(branch) = child_text(*node, "Branch") {
                revision.branch = branch;
            }
            if let Some(size) = child_text(*node, "Size") {
                revision.file_size = i64::from(atoi(&size));
            }

            // An unshelved file has no head revision: use the most recent one.
            if state.depot_revision < 0 {
                state.depot_revision = revision.changeset_number;
            }

            if revision.changeset_number > state.depot_revision
                && revision.branch != context.branch_name
                && Some(revision.changeset_number) != pending_source
            {
                state.head_branch = revision.branch.clone();
                state.head_action = revision.action.clone();
                state.head_changelist = revision.changeset_number;
                state.head_user = revision.user_name.clone();
                state.head_mod_time = revision.date.map(|date| date.timestamp()).unwrap_or_default();
            } else if update_history && state.history.len() < context.max_entries {
                if revision.changeset_number == state.depot_revision && state.head_user.is_empty() {
                    state.head_user = revision.user_name.clone();
                }
                state.history.push(revision);
                continue;
            }

            if revision.changeset_number == state.depot_revision && state.head_user.is_empty() {
                state.head_user = revision.user_name.clone();
            }

            if !update_history {
                break;
            }
        }

        // A conflicted file shows the tip of the merge source first.
        if let Some(source) = pending_source {
            if let Some(position) = state
                .history
                .iter()
                .position(|revision| revision.changeset_number == source)
            {
                let tip = state.history[position].clone();
                state.history.insert(0, tip);
            }
        }
    }

    Ok(())
}

/// `Moved from /Content/Old.uasset to /Content/New.uasset` gives `Content/Old.uasset`.
fn parse_moved_from(branch: &str) -> String {
    let moved = branch.strip_prefix("Moved from /").unwrap_or(branch);
    match moved.find(" to ") {
        Some(index) => moved[..index].to_string(),
        None => moved.to_string(),
    }
}

/// Arguments of the history command for `files` written to `xml_file`.
pub fn history_parameters(xml_file: &str, limit: Option<usize>) -> Vec<String> {
    let mut parameters = vec![
        "--moveddeleted".to_string(),
        format!("--xml=\"{xml_file}\""),
        "--encoding=\"utf-8\"".to_string(),
    ];
    if let Some(limit) = limit {
        parameters.push(format!("--limit={limit}"));
    }
    parameters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::PendingMerge;
    use crate::core::workspace_state::WorkspaceState;

    const HISTORY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<RevisionHistoriesResult>
  <RevisionHistories>
    <RevisionHistory>
      <ItemName>/ws/Content/BP_Renamed.uasset</ItemName>
      <Revisions>
        <Revision>
          <Branch>/main</Branch>
          <CreationDate>2019-10-14T09:52:07+02:00</CreationDate>
          <RevisionType>bin</RevisionType>
          <ChangesetNumber>7</ChangesetNumber>
          <Owner>jane@example.com</Owner>
          <Comment>New tests &amp; fixes</Comment>
          <Size>22356</Size>
        </Revision>
        <Revision>
          <Branch>/main</Branch>
          <CreationDate>2022-04-28T16:00:37+02:00</CreationDate>
          <RevisionType>bin</RevisionType>
          <ChangesetNumber>12</ChangesetNumber>
          <Owner>bob</Owner>
          <Comment>Renamed</Comment>
          <Size>28603</Size>
        </Revision>
        <Revision>
          <Branch>Moved from /Content/BP_ToRename.uasset to /Content/BP_Renamed.uasset</Branch>
          <CreationDate>2022-04-28T16:00:37+02:00</CreationDate>
          <RevisionType />
          <ChangesetNumber>12</ChangesetNumber>
          <Owner>bob</Owner>
          <Comment />
          <Size>0</Size>
        </Revision>
        <Revision>
          <Branch>/main/task</Branch>
          <CreationDate>2022-05-02T10:00:00+02:00</CreationDate>
          <RevisionType>bin</RevisionType>
          <ChangesetNumber>15</ChangesetNumber>
          <Owner>carol</Owner>
          <Comment>On a task branch</Comment>
          <Size>30000</Size>
        </Revision>
      </Revisions>
    </RevisionHistory>
  </RevisionHistories>
</RevisionHistoriesResult>"#;

    fn context() -> HistoryContext {
        HistoryContext::new("/ws", "Repo", "localhost:8087", "/main", MAX_HISTORY_ENTRIES)
    }

    fn renamed_state() -> FileState {
        let mut state = FileState::with_state("/ws/Content/BP_Renamed.uasset", WorkspaceState::Controlled);
        state.local_revision = 12;
        state.depot_revision = 12;
        state.rep_spec = "Repo@localhost:8087".to_string();
        state
    }

    #[test]
    fn test_history_most_recent_first_with_move() {
        let mut states = vec![renamed_state()];
        parse_history(HISTORY, &context(), true, &mut states).unwrap();

        let history = &states[0].history;
        assert_eq!(history.len(), 2);

        assert_eq!(history[0].revision, "cs:12");
        assert_eq!(history[0].action, action::MOVED);
        assert_eq!(history[0].filename, "/ws/Content/BP_Renamed.uasset");
        assert_eq!(history[0].user_name, "bob");
        assert_eq!(history[0].file_size, 28603);

        assert_eq!(history[1].revision, "cs:7");
        assert_eq!(history[1].action, action::ADDED);
        assert_eq!(history[1].filename, "/ws/Content/BP_ToRename.uasset");
        assert_eq!(history[1].description, "New tests & fixes");
        assert_eq!(history[1].user_name, "jane");
    }

    #[test]
    fn test_newer_revision_on_other_branch_sets_head() {
        let mut states = vec![renamed_state()];
        parse_history(HISTORY, &context(), true, &mut states).unwrap();

        let state = &states[0];
        assert_eq!(state.head_branch, "/main/task");
        assert_eq!(state.head_changelist, 15);
        assert_eq!(state.head_user, "carol");
        assert!(state.head_mod_time > 0);
        assert!(state.is_modified_in_other_branch());
        assert!(state.history.iter().all(|revision| revision.changeset_number != 15));
    }

    #[test]
    fn test_head_only_stops_after_first_entry() {
        let mut states = vec![renamed_state()];
        parse_history(HISTORY, &context(), false, &mut states).unwrap();

        assert!(states[0].history.is_empty());
        assert_eq!(states[0].head_branch, "/main/task");
    }

    #[test]
    fn test_xlinked_revisions_get_repository_suffix() {
        let mut state = renamed_state();
        state.rep_spec = "Library@localhost:8087".to_string();
        let mut states = vec![state];
        parse_history(HISTORY, &context(), true, &mut states).unwrap();

        assert_eq!(states[0].history[0].revision, "cs:12@Library");
    }

    #[test]
    fn test_unshelved_file_takes_most_recent_changeset() {
        let mut state = renamed_state();
        state.depot_revision = -3;
        let mut states = vec![state];
        parse_history(HISTORY, &context(), true, &mut states).unwrap();

        assert_eq!(states[0].depot_revision, 15);
        assert!(states[0].head_branch.is_empty());
        assert_eq!(states[0].history[0].revision, "cs:15");
    }

    #[test]
    fn test_conflicted_file_shows_merge_source_first() {
        let mut state = renamed_state();
        state.state = WorkspaceState::Conflicted;
        state.pending_merge = Some(PendingMerge {
            filename: "/Content/BP_Renamed.uasset".to_string(),
            base_changeset: "7".to_string(),
            source_changeset: "15".to_string(),
            parameters: vec!["cs:15".to_string()],
        });
        let mut states = vec![state];
        parse_history(HISTORY, &context(), true, &mut states).unwrap();

        let history = &states[0].history;
        assert!(states[0].head_branch.is_empty());
        assert_eq!(history[0].changeset_number, 15);
        assert_eq!(history[1].changeset_number, 15);
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn test_history_is_capped() {
        let context = HistoryContext::new("/ws", "Repo", "localhost:8087", "/main", 1);
        let mut states = vec![renamed_state()];
        parse_history(HISTORY, &context, true, &mut states).unwrap();
        assert_eq!(states[0].history.len(), 1);
    }

    #[test]
    fn test_missing_root_tag_leaves_states_unchanged() {
        let mut states = vec![renamed_state()];
        let before = states.clone();

        assert!(parse_history("<StatusOutput />", &context(), true, &mut states).is_err());
        assert!(parse_history(
            "<RevisionHistoriesResult />",
            &context(),
            true,
            &mut states
        )
        .is_err());
        assert_eq!(states, before);
    }

    #[test]
    fn test_unrelated_items_are_ignored() {
        let mut states = vec![FileState::new("/ws/Content/Other.uasset")];
        parse_history(HISTORY, &context(), true, &mut states).unwrap();
        assert!(states[0].history.is_empty());
    }

    #[test]
    fn test_history_parameters() {
        assert_eq!(
            history_parameters("/tmp/h.xml", Some(100)),
            vec![
                "--moveddeleted",
                "--xml=\"/tmp/h.xml\"",
                "--encoding=\"utf-8\"",
                "--limit=100"
            ]
        );
    }
}
