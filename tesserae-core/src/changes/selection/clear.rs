//! Deselect everything. Ignored in undo when nothing was selected to begin with.

use crate::changes::{single_info, AppliedChange, Change, ChangeInfo, ChangeInfos};
use crate::image::CommittedChunkStorage;
use crate::math::Path;
use crate::state::Document;

pub struct ClearSelection {
    stored: Option<CommittedChunkStorage>,
    old_path: Option<Option<Path>>,
}

impl ClearSelection {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stored: None,
            old_path: None,
        }
    }
}

impl Default for ClearSelection {
    fn default() -> Self {
        Self::new()
    }
}

impl Change for ClearSelection {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        self.old_path = Some(document.selection.path.clone());
        true
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        if document.selection.is_empty() {
            return AppliedChange::ignored();
        }
        let mask = &mut document.selection.mask;
        mask.enqueue_clear();
        let area = crate::changes::drawing::snapshot_and_commit(mask, &mut self.stored);
        document.selection.path = None;
        AppliedChange::new(single_info(ChangeInfo::SelectionChunks { area }))
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        let storage = self
            .stored
            .take()
            .expect("reverting a deselect that was never applied");
        let mask = &mut document.selection.mask;
        let area = storage.apply_chunks_to_image(mask);
        mask.commit_changes();
        document.selection.path = self.old_path.clone().unwrap_or(None);
        single_info(ChangeInfo::SelectionChunks { area })
    }
}
