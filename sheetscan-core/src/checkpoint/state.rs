use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::item::NodeId;

/// Which nodes have been fully processed, across all runs
///
/// Mutated only through the `mark_*` / `record_match` methods so the
/// match count can never drift from the set of matched file ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointState {
    processed_folders: HashSet<NodeId>,
    processed_files: HashSet<NodeId>,
    match_count: u64,
}

impl CheckpointState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_folder_done(&self, id: &NodeId) -> bool {
        self.processed_folders.contains(id)
    }

    pub fn is_file_done(&self, id: &NodeId) -> bool {
        self.processed_files.contains(id)
    }

    /// Mark a folder whose children have all been processed.
    ///
    /// Returns false if the id was already recorded (as a folder or a file).
    pub fn mark_folder_done(&mut self, id: NodeId) -> bool {
        if self.processed_files.contains(&id) {
            return false;
        }
        self.processed_folders.insert(id)
    }

    /// Mark a file that did not match.
    pub fn mark_file_done(&mut self, id: NodeId) -> bool {
        if self.processed_folders.contains(&id) {
            return false;
        }
        self.processed_files.insert(id)
    }

    /// Mark a matching file and count it. Already-recorded ids are not counted again.
    pub fn record_match(&mut self, id: NodeId) -> bool {
        let added = self.mark_file_done(id);
        if added {
            self.match_count += 1;
        }
        added
    }

    pub fn folder_count(&self) -> usize {
        self.processed_folders.len()
    }

    pub fn file_count(&self) -> usize {
        self.processed_files.len()
    }

    pub fn match_count(&self) -> u64 {
        self.match_count
    }

    /// True for a state with nothing recorded (a fresh scan)
    pub fn is_empty(&self) -> bool {
        self.processed_folders.is_empty() && self.processed_files.is_empty()
    }
}

/// On-disk form of a checkpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PersistedCheckpoint {
    pub processed_folders: Vec<NodeId>,
    pub processed_files: Vec<NodeId>,
    pub found_excel_count: u64,
}

impl From<&CheckpointState> for PersistedCheckpoint {
    fn from(state: &CheckpointState) -> Self {
        let mut processed_folders: Vec<NodeId> = state.processed_folders.iter().cloned().collect();
        let mut processed_files: Vec<NodeId> = state.processed_files.iter().cloned().collect();
        // Sorted so successive checkpoint files diff cleanly
        processed_folders.sort();
        processed_files.sort();

        Self {
            processed_folders,
            processed_files,
            found_excel_count: state.match_count,
        }
    }
}

impl From<PersistedCheckpoint> for CheckpointState {
    fn from(persisted: PersistedCheckpoint) -> Self {
        Self {
            processed_folders: persisted.processed_folders.into_iter().collect(),
            processed_files: persisted.processed_files.into_iter().collect(),
            match_count: persisted.found_excel_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_match_counts_once() {
        let mut state = CheckpointState::new();
        assert!(state.record_match(NodeId::from("10")));
        assert!(!state.record_match(NodeId::from("10")));
        assert_eq!(state.match_count(), 1);
        assert!(state.is_file_done(&NodeId::from("10")));
    }

    #[test]
    fn test_non_matching_file_does_not_count() {
        let mut state = CheckpointState::new();
        assert!(state.mark_file_done(NodeId::from("11")));
        assert_eq!(state.match_count(), 0);
        assert_eq!(state.file_count(), 1);
    }

    #[test]
    fn test_sets_stay_disjoint() {
        let mut state = CheckpointState::new();
        state.mark_folder_done(NodeId::from("1"));
        assert!(!state.mark_file_done(NodeId::from("1")));
        assert!(!state.record_match(NodeId::from("1")));
        assert_eq!(state.match_count(), 0);

        state.mark_file_done(NodeId::from("2"));
        assert!(!state.mark_folder_done(NodeId::from("2")));
        assert!(!state.is_folder_done(&NodeId::from("2")));
    }

    #[test]
    fn test_persisted_form_is_sorted() {
        let mut state = CheckpointState::new();
        state.mark_folder_done(NodeId::from("b"));
        state.mark_folder_done(NodeId::from("a"));
        state.record_match(NodeId::from("z"));
        state.mark_file_done(NodeId::from("y"));

        let persisted = PersistedCheckpoint::from(&state);
        assert_eq!(persisted.processed_folders, vec![NodeId::from("a"), NodeId::from("b")]);
        assert_eq!(persisted.processed_files, vec![NodeId::from("y"), NodeId::from("z")]);
        assert_eq!(persisted.found_excel_count, 1);

        assert_eq!(CheckpointState::from(persisted), state);
    }
}
