//! Rectangle tool: an updateable change redrawing its preview from scratch on every
//! update, since the rectangle replaces rather than accumulates.

use crate::changes::{
    member_chunks_info, AppliedChange, Change, ChangeInfos, DrawTarget, UpdateableChange,
};
use crate::image::{AffectedArea, CommittedChunkStorage, ShapeData};
use crate::state::{Document, MemberId};

use super::{
    apply_clips_symmetry, is_valid_for_drawing, restore_stored_chunks, snapshot_and_commit,
    target_image_mut,
};

pub struct DrawRectangle {
    member: MemberId,
    target: DrawTarget,
    frame: usize,
    data: ShapeData,
    stored: Option<CommittedChunkStorage>,
    last_preview_area: AffectedArea,
}

impl DrawRectangle {
    #[must_use]
    pub fn new(member: MemberId, target: DrawTarget, frame: usize, data: ShapeData) -> Self {
        Self {
            member,
            target,
            frame,
            data,
            stored: None,
            last_preview_area: AffectedArea::new(),
        }
    }
    /// New rectangle parameters from the ongoing gesture.
    pub fn update(&mut self, data: ShapeData) {
        self.data = data;
    }
}

impl Change for DrawRectangle {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        is_valid_for_drawing(document, self.member, self.target)
    }

    fn apply(&mut self, document: &mut Document, first_apply: bool) -> AppliedChange {
        if self.data.is_degenerate() {
            // Zero-area rectangle: drop any preview, occupy no undo slot.
            target_image_mut(document, self.member, self.target, self.frame).cancel_changes();
            return AppliedChange::ignored();
        }
        if !first_apply {
            apply_clips_symmetry(document, self.member, self.target, self.frame);
            target_image_mut(document, self.member, self.target, self.frame)
                .enqueue_draw_rectangle(self.data);
        }
        let image = target_image_mut(document, self.member, self.target, self.frame);
        let area = snapshot_and_commit(image, &mut self.stored);
        AppliedChange::new(member_chunks_info(self.member, self.target, area))
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        let area = restore_stored_chunks(
            document,
            self.member,
            self.target,
            self.frame,
            &mut self.stored,
        );
        member_chunks_info(self.member, self.target, area)
    }
}

impl UpdateableChange for DrawRectangle {
    fn apply_temporarily(&mut self, document: &mut Document) -> ChangeInfos {
        target_image_mut(document, self.member, self.target, self.frame).cancel_changes();
        apply_clips_symmetry(document, self.member, self.target, self.frame);
        let image = target_image_mut(document, self.member, self.target, self.frame);
        image.enqueue_draw_rectangle(self.data);
        let new_area = image.find_affected_area();
        // The renderer must refresh where the previous preview was, too.
        let mut area = std::mem::replace(&mut self.last_preview_area, new_area.clone());
        area.union_with(&new_area);
        member_chunks_info(self.member, self.target, area)
    }

    fn cancel_preview(&mut self, document: &mut Document) {
        target_image_mut(document, self.member, self.target, self.frame).cancel_changes();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::blend::BlendMode;
    use crate::color::{Color, Premul};
    use crate::state::{LayerContent, Location, MemberData, RasterContent};
    use glam::{DVec2, IVec2};

    fn document_with_layer() -> (Document, MemberId) {
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
        (document, member)
    }

    fn shape(center: f64, side: f64) -> ShapeData {
        ShapeData::new(
            DVec2::splat(center),
            DVec2::splat(side),
            0.0,
            0,
            Color::TRANSPARENT,
            Color::new(255, 0, 0, 255),
            BlendMode::SrcOver,
        )
    }

    #[test]
    fn apply_then_revert_round_trips() {
        let (mut document, member) = document_with_layer();
        let mut change = DrawRectangle::new(member, DrawTarget::Image, 0, shape(8.0, 8.0));
        assert!(change.initialize_and_validate(&document));
        let applied = change.apply(&mut document, false);
        assert!(!applied.ignore_in_undo);

        let image = super::super::target_image(&document, member, DrawTarget::Image, 0);
        let red = Color::new(255, 0, 0, 255).premultiply();
        assert_eq!(image.committed_pixel(IVec2::new(8, 8)), red);

        change.revert(&mut document);
        let image = super::super::target_image(&document, member, DrawTarget::Image, 0);
        assert_eq!(image.committed_pixel(IVec2::new(8, 8)), Premul::TRANSPARENT);
        assert!(image.find_all_chunks().is_empty());

        // Redo reproduces the identical result from retained parameters.
        change.apply(&mut document, false);
        let image = super::super::target_image(&document, member, DrawTarget::Image, 0);
        assert_eq!(image.committed_pixel(IVec2::new(8, 8)), red);
    }

    #[test]
    fn preview_never_commits() {
        let (mut document, member) = document_with_layer();
        let mut change = DrawRectangle::new(member, DrawTarget::Image, 0, shape(8.0, 8.0));
        assert!(change.initialize_and_validate(&document));
        for i in 0..20 {
            change.update(shape(8.0 + f64::from(i), 8.0));
            change.apply_temporarily(&mut document);
            let image = super::super::target_image(&document, member, DrawTarget::Image, 0);
            assert_eq!(
                image.committed_pixel(IVec2::new(8, 8)),
                Premul::TRANSPARENT
            );
        }
        change.apply(&mut document, true);
        let image = super::super::target_image(&document, member, DrawTarget::Image, 0);
        assert_ne!(image.committed_pixel(IVec2::new(27, 8)), Premul::TRANSPARENT);
    }

    #[test]
    fn zero_area_is_ignored_in_undo() {
        let (mut document, member) = document_with_layer();
        let mut change = DrawRectangle::new(member, DrawTarget::Image, 0, shape(8.0, 0.0));
        assert!(change.initialize_and_validate(&document));
        let applied = change.apply(&mut document, false);
        assert!(applied.ignore_in_undo);
        let image = super::super::target_image(&document, member, DrawTarget::Image, 0);
        assert!(image.find_all_chunks().is_empty());
    }

    #[test]
    fn drawing_on_folder_fails_validation() {
        let mut document = Document::with_chunk_size(IVec2::splat(64), 16);
        let folder = document
            .structure
            .add_member(
                Location::IndexIntoRoot(0),
                MemberData::new_folder("folder".to_string()),
            )
            .unwrap();
        let mut change = DrawRectangle::new(folder, DrawTarget::Image, 0, shape(8.0, 8.0));
        assert!(!change.initialize_and_validate(&document));
        // Mask drawing without a mask fails too.
        let mut change = DrawRectangle::new(folder, DrawTarget::Mask, 0, shape(8.0, 8.0));
        assert!(!change.initialize_and_validate(&document));
    }
}
