//! Single-owner cache of file and changelist states.
//!
//! The cache is owned by the [`Provider`](crate::core::provider::Provider) and only
//! mutated from its `tick`, on the thread driving the provider. Workers never see it;
//! they receive a snapshot of the states they need when their command is built.

use crate::core::parsers::status::stale_directory_entries;
use crate::core::paths::path_key;
use crate::core::state::{Changelist, ChangelistState, FileState};
use crate::core::workspace_state::WorkspaceState;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Default)]
pub struct StateCache {
    /// Keyed by [`path_key`], so one path never has two entries differing by case
    files: HashMap<String, FileState>,
    changelists: HashMap<String, ChangelistState>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.changelists.clear();
        self.last_updated = None;
    }

    pub fn get(&self, path: &str) -> Option<&FileState> {
        self.files.get(&path_key(path))
    }

    /// Existing entry for `path`, or a new `Unknown` one.
    pub fn get_or_create(&mut self, path: &str) -> &mut FileState {
        self.files
            .entry(path_key(path))
            .or_insert_with(|| FileState::new(path))
    }

    pub fn file_states(&self) -> impl Iterator<Item = &FileState> {
        self.files.values()
    }

    pub fn states_matching<P>(&self, predicate: P) -> Vec<FileState>
    where
        P: Fn(&FileState) -> bool,
    {
        self.files
            .values()
            .filter(|state| predicate(state))
            .cloned()
            .collect()
    }

    /// Merge freshly computed states, returning whether anything changed.
    ///
    /// An incoming state without history keeps the cached history, and one without a
    /// changelist keeps the cached association.
    pub fn merge(&mut self, states: &[FileState]) -> bool {
        let now = Utc::now();
        let mut changed = false;

        for incoming in states.iter().filter(|state| !state.path.is_empty()) {
            let key = path_key(&incoming.path);
            let previous = self.files.get(&key).cloned();

            let mut merged = incoming.clone();
            if let Some(previous) = &previous {
                if merged.history.is_empty() {
                    merged.history = previous.history.clone();
                }
                if merged.changelist.is_none() {
                    merged.changelist = previous.changelist.clone();
                }
                merged.timestamp = previous.timestamp;
            }

            let old_changelist = previous.as_ref().and_then(|state| state.changelist.clone());
            if old_changelist != merged.changelist {
                if let Some(old) = &old_changelist {
                    self.remove_from_changelist_files(old, &key);
                }
                if let Some(new) = &merged.changelist {
                    self.get_or_create_changelist(new)
                        .files
                        .push(merged.path.clone());
                }
            }

            if previous.as_ref() != Some(&merged) {
                changed = true;
            }
            merged.timestamp = Some(now);
            self.files.insert(key, merged);
        }

        if changed {
            self.last_updated = Some(now);
        }
        changed
    }

    /// Evict the entry of `path` and its changelist membership.
    pub fn remove(&mut self, path: &str) -> bool {
        let key = path_key(path);
        match self.files.remove(&key) {
            Some(state) => {
                if let Some(changelist) = &state.changelist {
                    self.remove_from_changelist_files(changelist, &key);
                }
                true
            }
            None => false,
        }
    }

    /// Reconcile cached entries under `dir` that a whole-directory status did not report.
    ///
    /// Entries previously deleted and now missing from disk are evicted; the others go
    /// back to `Controlled`. Both lose their changelist association.
    pub fn reconcile_directory(&mut self, dir: &str, reported: &[FileState]) -> bool {
        let stale = stale_directory_entries(dir, self.files.values(), reported);

        for path in &stale {
            let key = path_key(path);
            let (evict, changelist) = {
                let Some(state) = self.files.get_mut(&key) else {
                    continue;
                };
                let evict = state.state.is_deleted() && !Path::new(&state.path).exists();
                if !evict {
                    state.state = WorkspaceState::Controlled;
                }
                (evict, state.changelist.take())
            };

            if let Some(changelist) = changelist {
                self.remove_from_changelist_files(&changelist, &key);
            }
            if evict {
                log::debug!("Removing '{path}' from the cache: deleted from disk");
                self.files.remove(&key);
            }
        }

        !stale.is_empty()
    }

    pub fn changelist(&self, changelist: &Changelist) -> Option<&ChangelistState> {
        self.changelists.get(&changelist.name)
    }

    pub fn get_or_create_changelist(&mut self, changelist: &Changelist) -> &mut ChangelistState {
        self.changelists
            .entry(changelist.name.clone())
            .or_insert_with(|| ChangelistState::new(changelist.clone()))
    }

    pub fn remove_changelist(&mut self, changelist: &Changelist) -> bool {
        let Some(removed) = self.changelists.remove(&changelist.name) else {
            return false;
        };
        for path in &removed.files {
            if let Some(state) = self.files.get_mut(&path_key(path)) {
                state.changelist = None;
            }
        }
        true
    }

    /// Changelists with the default one first, then by name.
    pub fn changelists(&self) -> Vec<&ChangelistState> {
        let mut changelists: Vec<&ChangelistState> = self.changelists.values().collect();
        changelists.sort_by(|a, b| {
            b.changelist
                .is_default()
                .cmp(&a.changelist.is_default())
                .then_with(|| a.changelist.name.cmp(&b.changelist.name))
        });
        changelists
    }

    /// Replace every changelist with a fresh listing.
    ///
    /// File to changelist associations are only trusted from this listing: files that
    /// it does not mention lose their association.
    pub fn apply_changelists(
        &mut self,
        changelists: &[ChangelistState],
        files_per_changelist: &[Vec<FileState>],
    ) -> bool {
        let now = Utc::now();
        let fresh: HashSet<String> = files_per_changelist
            .iter()
            .flatten()
            .map(|state| path_key(&state.path))
            .collect();

        let mut changed = false;
        for (key, state) in self.files.iter_mut() {
            if state.changelist.is_some() && !fresh.contains(key) {
                state.changelist = None;
                changed = true;
            }
        }

        let listed: HashSet<&str> = changelists
            .iter()
            .map(|state| state.changelist.name.as_str())
            .collect();
        let before = self.changelists.len();
        self.changelists
            .retain(|name, _| listed.contains(name.as_str()));
        changed |= before != self.changelists.len();

        for (index, listing) in changelists.iter().enumerate() {
            let members = files_per_changelist
                .get(index)
                .map(Vec::as_slice)
                .unwrap_or_default();

            let mut paths = Vec::with_capacity(members.len());
            for member in members {
                let cached = self.get_or_create(&member.path);
                if cached.state != member.state
                    || cached.changelist.as_ref() != Some(&listing.changelist)
                {
                    changed = true;
                }
                cached.state = member.state;
                cached.moved_from = member.moved_from.clone();
                cached.changelist = Some(listing.changelist.clone());
                cached.timestamp = Some(now);
                paths.push(cached.path.clone());
            }

            let entry = self.get_or_create_changelist(&listing.changelist);
            if entry.description != listing.description
                || entry.files != paths
                || entry.shelve_id != listing.shelve_id
            {
                changed = true;
            }
            entry.description = listing.description.clone();
            entry.shelve_id = listing.shelve_id;
            entry.shelve_date = listing.shelve_date;
            entry.shelved_files = listing.shelved_files.clone();
            entry.files = paths;
            entry.timestamp = Some(now);
        }

        if changed {
            self.last_updated = Some(now);
        }
        changed
    }

    fn remove_from_changelist_files(&mut self, changelist: &Changelist, key: &str) {
        if let Some(state) = self.changelists.get_mut(&changelist.name) {
            state.files.retain(|path| path_key(path) != key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::Revision;

    fn state(path: &str, workspace_state: WorkspaceState) -> FileState {
        FileState::with_state(path, workspace_state)
    }

    #[test]
    fn test_get_or_create_inserts_unknown() {
        let mut cache = StateCache::new();
        assert_eq!(cache.get_or_create("/ws/A.uasset").state, WorkspaceState::Unknown);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_paths_differing_by_case_share_one_entry() {
        let mut cache = StateCache::new();
        cache.merge(&[state("/ws/Content/A.uasset", WorkspaceState::Added)]);
        cache.merge(&[state("/WS/content/a.uasset", WorkspaceState::CheckedOutChanged)]);

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get("/ws/Content/A.uasset").unwrap().state,
            WorkspaceState::CheckedOutChanged
        );
    }

    #[test]
    fn test_merge_reports_changes_and_stamps() {
        let mut cache = StateCache::new();
        assert!(cache.merge(&[state("/ws/A.uasset", WorkspaceState::Added)]));
        assert!(cache.get("/ws/A.uasset").unwrap().timestamp.is_some());
        assert!(!cache.merge(&[state("/ws/A.uasset", WorkspaceState::Added)]));
        assert!(cache.merge(&[state("/ws/A.uasset", WorkspaceState::Controlled)]));
    }

    #[test]
    fn test_merge_skips_empty_paths() {
        let mut cache = StateCache::new();
        assert!(!cache.merge(&[FileState::new("")]));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_merge_keeps_history_and_changelist_when_absent() {
        let mut cache = StateCache::new();
        let mut first = state("/ws/A.uasset", WorkspaceState::CheckedOutChanged);
        first.history.push(Revision {
            changeset_number: 3,
            ..Revision::default()
        });
        first.changelist = Some(Changelist::new("5"));
        cache.merge(&[first]);

        cache.merge(&[state("/ws/A.uasset", WorkspaceState::CheckedOutChanged)]);
        let cached = cache.get("/ws/A.uasset").unwrap();
        assert_eq!(cached.history.len(), 1);
        assert_eq!(cached.changelist, Some(Changelist::new("5")));
        assert_eq!(
            cache.changelist(&Changelist::new("5")).unwrap().files,
            vec!["/ws/A.uasset".to_string()]
        );
    }

    #[test]
    fn test_merge_moves_changelist_membership() {
        let mut cache = StateCache::new();
        let mut file = state("/ws/A.uasset", WorkspaceState::CheckedOutChanged);
        file.changelist = Some(Changelist::default_changelist());
        cache.merge(&[file.clone()]);

        file.changelist = Some(Changelist::new("7"));
        cache.merge(&[file]);

        assert!(cache
            .changelist(&Changelist::default_changelist())
            .unwrap()
            .files
            .is_empty());
        assert_eq!(cache.changelist(&Changelist::new("7")).unwrap().files.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut cache = StateCache::new();
        cache.merge(&[state("/ws/A.uasset", WorkspaceState::Deleted)]);
        assert!(cache.remove("/ws/a.uasset"));
        assert!(!cache.remove("/ws/a.uasset"));
        assert!(cache.get("/ws/A.uasset").is_none());
    }

    #[test]
    fn test_reconcile_directory_evicts_deleted_missing_files() {
        let mut cache = StateCache::new();
        cache.merge(&[state("/nonexistent-ws/Content/Gone.uasset", WorkspaceState::Deleted)]);

        assert!(cache.reconcile_directory("/nonexistent-ws", &[]));
        assert!(cache.get("/nonexistent-ws/Content/Gone.uasset").is_none());
    }

    #[test]
    fn test_reconcile_directory_downgrades_existing_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = crate::core::paths::path_to_string(temp.path());
        let existing = format!("{root}/Still.uasset");
        std::fs::write(&existing, b"data").unwrap();

        let mut cache = StateCache::new();
        let mut deleted = state(&existing, WorkspaceState::Deleted);
        deleted.changelist = Some(Changelist::default_changelist());
        cache.merge(&[deleted]);

        assert!(cache.reconcile_directory(&root, &[]));
        let cached = cache.get(&existing).unwrap();
        assert_eq!(cached.state, WorkspaceState::Controlled);
        assert!(cached.changelist.is_none());
        assert!(cache
            .changelist(&Changelist::default_changelist())
            .unwrap()
            .files
            .is_empty());
    }

    #[test]
    fn test_reconcile_directory_keeps_reported_and_other_dirs() {
        let mut cache = StateCache::new();
        cache.merge(&[
            state("/ws/Content/A.uasset", WorkspaceState::CheckedOutChanged),
            state("/other/B.uasset", WorkspaceState::CheckedOutChanged),
        ]);
        let reported = vec![state("/ws/Content/A.uasset", WorkspaceState::CheckedOutChanged)];

        assert!(!cache.reconcile_directory("/ws", &reported));
        assert_eq!(
            cache.get("/other/B.uasset").unwrap().state,
            WorkspaceState::CheckedOutChanged
        );
    }

    #[test]
    fn test_apply_changelists_drops_stale_associations() {
        let mut cache = StateCache::new();
        let mut old = state("/ws/Old.uasset", WorkspaceState::CheckedOutChanged);
        old.changelist = Some(Changelist::new("3"));
        cache.merge(&[old]);

        let listing = vec![
            ChangelistState::new(Changelist::default_changelist()),
            ChangelistState::with_description(Changelist::new("4"), "textures"),
        ];
        let files = vec![
            vec![],
            vec![state("/ws/New.uasset", WorkspaceState::Added)],
        ];

        assert!(cache.apply_changelists(&listing, &files));
        assert!(cache.get("/ws/Old.uasset").unwrap().changelist.is_none());
        assert!(cache.changelist(&Changelist::new("3")).is_none());

        let names: Vec<&str> = cache
            .changelists()
            .iter()
            .map(|state| state.changelist.name.as_str())
            .collect();
        assert_eq!(names, vec!["Default", "4"]);
        assert_eq!(
            cache.get("/ws/New.uasset").unwrap().changelist,
            Some(Changelist::new("4"))
        );
    }
}
