//! Magic wand: flood the contiguous color region around a point on a member's
//! image and turn it into selection, combined like any other selection shape.

use crate::changes::drawing::flood_region;
use crate::changes::{
    single_info, AppliedChange, Change, ChangeInfo, ChangeInfos, DrawTarget,
};
use crate::color::Color;
use crate::image::CommittedChunkStorage;
use crate::math::{IRect, Path};
use crate::state::{Document, MemberId, SelectionMode};
use crate::surface::PixelSurface;
use glam::IVec2;

pub struct MagicWand {
    member: MemberId,
    frame: usize,
    start: IVec2,
    tolerance: f32,
    mode: SelectionMode,
    stored: Option<CommittedChunkStorage>,
    old_path: Option<Option<Path>>,
}

impl MagicWand {
    #[must_use]
    pub fn new(
        member: MemberId,
        frame: usize,
        start: IVec2,
        tolerance: f32,
        mode: SelectionMode,
    ) -> Self {
        Self {
            member,
            frame,
            start,
            tolerance,
            mode,
            stored: None,
            old_path: None,
        }
    }
}

impl Change for MagicWand {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        if !IRect::new(IVec2::ZERO, document.size).contains(self.start) {
            return false;
        }
        if !crate::changes::drawing::is_valid_for_drawing(document, self.member, DrawTarget::Image)
        {
            return false;
        }
        self.old_path = Some(document.selection.path.clone());
        true
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        let canvas = IRect::new(IVec2::ZERO, document.size);
        let image =
            crate::changes::drawing::target_image(document, self.member, DrawTarget::Image, self.frame);
        let region = flood_region(image, self.start, canvas, self.tolerance);
        if region.is_empty() {
            return AppliedChange::ignored();
        }
        // Rasterize the region into a white coverage surface over its bounds.
        let mut bounds = IRect::new(region[0], IVec2::ONE);
        for &pixel in &region {
            bounds = bounds.union(IRect::new(pixel, IVec2::ONE));
        }
        let mut shape = PixelSurface::new(bounds.size);
        for &pixel in &region {
            shape.set_pixel(pixel - bounds.pos, Color::WHITE.premultiply());
        }

        document.selection.mask.cancel_changes();
        super::enqueue_combine(&mut document.selection.mask, shape, bounds.pos, self.mode);
        let area = crate::changes::drawing::snapshot_and_commit(
            &mut document.selection.mask,
            &mut self.stored,
        );
        // A wand region has no exact geometry; the mask alone is the truth.
        document.selection.path = None;
        AppliedChange::new(single_info(ChangeInfo::SelectionChunks { area }))
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        let storage = self
            .stored
            .take()
            .expect("reverting a magic wand that was never applied");
        let mask = &mut document.selection.mask;
        let area = storage.apply_chunks_to_image(mask);
        mask.commit_changes();
        document.selection.path = self.old_path.clone().unwrap_or(None);
        single_info(ChangeInfo::SelectionChunks { area })
    }
}
