//! # Change tracker
//! Owns the document plus the undo and redo stacks, and enforces the single-writer
//! protocol through the type system: starting an updateable change hands back an
//! [`OpenChange`] guard that mutably borrows the tracker, so no second change can
//! open and no undo/redo can run until the guard commits or drops.

use crate::changes::{Change, ChangeInfos, UpdateableChange};
use crate::state::Document;

pub struct DocumentChangeTracker {
    document: Document,
    undo_stack: Vec<Box<dyn Change>>,
    redo_stack: Vec<Box<dyn Change>>,
}

impl DocumentChangeTracker {
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            document,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Validate and apply a one-shot change. `Err` hands the change back on
    /// validation failure - an expected outcome, not an error condition.
    pub fn apply_new<C: Change + 'static>(&mut self, mut change: C) -> Result<ChangeInfos, C> {
        if !change.initialize_and_validate(&self.document) {
            log::debug!("change declined by validation");
            return Err(change);
        }
        let applied = change.apply(&mut self.document, false);
        if applied.ignore_in_undo {
            // A no-op edit: it never lands on the undo stack and leaves redo alone.
            return Ok(applied.infos);
        }
        self.redo_stack.clear();
        self.undo_stack.push(Box::new(change));
        Ok(applied.infos)
    }

    /// Validate an updateable change and open it for interactive preview. While
    /// the returned guard lives, this tracker is inaccessible - the compiler
    /// enforces the "at most one open change" invariant.
    pub fn begin<C: UpdateableChange + 'static>(
        &mut self,
        mut change: C,
    ) -> Result<OpenChange<'_, C>, C> {
        if !change.initialize_and_validate(&self.document) {
            log::debug!("updateable change declined by validation");
            return Err(change);
        }
        Ok(OpenChange {
            tracker: self,
            change: Some(change),
            previewed: false,
        })
    }

    /// Revert the most recent change. Returns empty infos when there is nothing
    /// to undo.
    pub fn undo(&mut self) -> ChangeInfos {
        let Some(mut change) = self.undo_stack.pop() else {
            return ChangeInfos::new();
        };
        let infos = change.revert(&mut self.document);
        self.redo_stack.push(change);
        infos
    }

    /// Re-apply the most recently reverted change. The change reproduces its
    /// result deterministically from retained parameters.
    pub fn redo(&mut self) -> ChangeInfos {
        let Some(mut change) = self.redo_stack.pop() else {
            return ChangeInfos::new();
        };
        let applied = change.apply(&mut self.document, false);
        assert!(
            !applied.ignore_in_undo,
            "a change flipped to no-op between apply and redo"
        );
        self.undo_stack.push(change);
        applied.infos
    }
}

/// An updateable change in its open state. Update parameters through
/// [`Self::change_mut`], preview with [`Self::apply_temporarily`], then either
/// [`Self::commit`] or drop the guard to discard without a trace.
pub struct OpenChange<'t, C: UpdateableChange> {
    tracker: &'t mut DocumentChangeTracker,
    change: Option<C>,
    previewed: bool,
}

impl<C: UpdateableChange + 'static> OpenChange<'_, C> {
    /// The concrete change, for its typed `update` methods.
    pub fn change_mut(&mut self) -> &mut C {
        // Unwrap ok - only commit/drop take the change, both consume the guard.
        self.change.as_mut().unwrap()
    }
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.tracker.document
    }

    /// Preview the current parameters. Committed state stays untouched.
    pub fn apply_temporarily(&mut self) -> ChangeInfos {
        self.previewed = true;
        self.change
            .as_mut()
            .unwrap()
            .apply_temporarily(&mut self.tracker.document)
    }

    /// Finalize: the single permanent apply. With previews on record the change
    /// folds the previewed state; without any it builds the result from its
    /// parameters outright.
    pub fn commit(mut self) -> ChangeInfos {
        // Unwrap ok - the guard is consumed, drop will see None.
        let mut change = self.change.take().unwrap();
        let applied = change.apply(&mut self.tracker.document, self.previewed);
        if !applied.ignore_in_undo {
            self.tracker.redo_stack.clear();
            self.tracker.undo_stack.push(Box::new(change));
        }
        applied.infos
    }

    /// Explicit discard, for symmetry with commit. Dropping does the same.
    pub fn discard(self) {}
}

impl<C: UpdateableChange> Drop for OpenChange<'_, C> {
    fn drop(&mut self) {
        if let Some(mut change) = self.change.take() {
            if self.previewed {
                change.cancel_preview(&mut self.tracker.document);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::changes::drawing::{DrawLine, LineBasedPen};
    use crate::changes::DrawTarget;
    use crate::color::{Color, Premul};
    use crate::state::{LayerContent, Location, MemberData, MemberId, RasterContent};
    use glam::IVec2;

    fn tracker_with_layer() -> (DocumentChangeTracker, MemberId) {
        let mut document = Document::with_chunk_size(IVec2::splat(64), 16);
        let member = document
            .structure
            .add_member(
                Location::IndexIntoRoot(0),
                MemberData::new_layer(
                    "layer".to_string(),
                    LayerContent::Raster(RasterContent::new_static(16)),
                ),
            )
            .unwrap();
        (DocumentChangeTracker::new(document), member)
    }

    fn committed_pixel(tracker: &DocumentChangeTracker, member: MemberId, pos: IVec2) -> Premul {
        crate::changes::drawing::target_image(tracker.document(), member, DrawTarget::Image, 0)
            .committed_pixel(pos)
    }

    #[test]
    fn undo_redo_round_trip() {
        let (mut tracker, member) = tracker_with_layer();
        let change = DrawLine::new(
            member,
            DrawTarget::Image,
            0,
            IVec2::new(0, 0),
            IVec2::new(50, 0),
            1,
            Color::BLACK,
        );
        assert!(tracker.apply_new(change).is_ok(), "line must validate");
        assert!(tracker.can_undo());
        assert_eq!(
            committed_pixel(&tracker, member, IVec2::new(25, 0)),
            Color::BLACK.premultiply()
        );

        tracker.undo();
        assert_eq!(
            committed_pixel(&tracker, member, IVec2::new(25, 0)),
            Premul::TRANSPARENT
        );
        assert!(tracker.can_redo());

        tracker.redo();
        assert_eq!(
            committed_pixel(&tracker, member, IVec2::new(25, 0)),
            Color::BLACK.premultiply()
        );
    }

    #[test]
    fn interactive_stroke_commits_once() {
        let (mut tracker, member) = tracker_with_layer();
        let pen = LineBasedPen::new(
            member,
            DrawTarget::Image,
            0,
            Color::BLACK,
            1,
            false,
            IVec2::new(0, 0),
        );
        let Ok(mut open) = tracker.begin(pen) else {
            panic!("pen must validate");
        };
        for x in 1..=10 {
            open.change_mut().update(IVec2::new(x, 0), 1);
            open.apply_temporarily();
        }
        open.commit();
        assert!(tracker.can_undo());
        assert_eq!(
            committed_pixel(&tracker, member, IVec2::new(10, 0)),
            Color::BLACK.premultiply()
        );
        tracker.undo();
        assert_eq!(
            committed_pixel(&tracker, member, IVec2::new(10, 0)),
            Premul::TRANSPARENT
        );
    }

    #[test]
    fn discard_leaves_no_trace() {
        let (mut tracker, member) = tracker_with_layer();
        let pen = LineBasedPen::new(
            member,
            DrawTarget::Image,
            0,
            Color::BLACK,
            1,
            false,
            IVec2::new(0, 0),
        );
        let Ok(mut open) = tracker.begin(pen) else {
            panic!("pen must validate");
        };
        open.change_mut().update(IVec2::new(10, 0), 1);
        open.apply_temporarily();
        drop(open);

        assert!(!tracker.can_undo());
        let image = crate::changes::drawing::target_image(
            tracker.document(),
            member,
            DrawTarget::Image,
            0,
        );
        assert!(!image.has_pending_changes());
        assert!(image.find_all_chunks().is_empty());
    }

    #[test]
    fn new_apply_clears_redo() {
        let (mut tracker, member) = tracker_with_layer();
        let line = |from: i32| {
            DrawLine::new(
                member,
                DrawTarget::Image,
                0,
                IVec2::new(from, 0),
                IVec2::new(from + 5, 0),
                1,
                Color::BLACK,
            )
        };
        assert!(tracker.apply_new(line(0)).is_ok());
        tracker.undo();
        assert!(tracker.can_redo());
        assert!(tracker.apply_new(line(20)).is_ok());
        assert!(!tracker.can_redo());
    }

    #[test]
    fn no_op_skips_undo_stack() {
        let (mut tracker, member) = tracker_with_layer();
        let zero = DrawLine::new(
            member,
            DrawTarget::Image,
            0,
            IVec2::new(5, 5),
            IVec2::new(5, 5),
            1,
            Color::BLACK,
        );
        assert!(tracker.apply_new(zero).is_ok());
        assert!(!tracker.can_undo());
    }

    #[test]
    fn invalid_change_is_handed_back() {
        let (mut tracker, _) = tracker_with_layer();
        let bogus_member = MemberId::default();
        let change = DrawLine::new(
            bogus_member,
            DrawTarget::Image,
            0,
            IVec2::ZERO,
            IVec2::new(5, 0),
            1,
            Color::BLACK,
        );
        assert!(tracker.apply_new(change).is_err());
        assert!(!tracker.can_undo());
    }
}
