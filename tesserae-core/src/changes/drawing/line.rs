//! Straight-line tool. Both endpoints move during the gesture, so previews redraw
//! from scratch; a zero-length line is suppressed entirely.

use crate::changes::{
    member_chunks_info, AppliedChange, Change, ChangeInfos, DrawTarget, UpdateableChange,
};
use crate::color::Color;
use crate::image::{AffectedArea, CommittedChunkStorage};
use crate::state::{Document, MemberId};
use glam::IVec2;

use super::{
    apply_clips_symmetry, is_valid_for_drawing, restore_stored_chunks, snapshot_and_commit,
    target_image_mut,
};

pub struct DrawLine {
    member: MemberId,
    target: DrawTarget,
    frame: usize,
    from: IVec2,
    to: IVec2,
    width: i32,
    color: Color,
    stored: Option<CommittedChunkStorage>,
    last_preview_area: AffectedArea,
}

impl DrawLine {
    #[must_use]
    pub fn new(
        member: MemberId,
        target: DrawTarget,
        frame: usize,
        from: IVec2,
        to: IVec2,
        width: i32,
        color: Color,
    ) -> Self {
        Self {
            member,
            target,
            frame,
            from,
            to,
            width,
            color,
            stored: None,
            last_preview_area: AffectedArea::new(),
        }
    }
    pub fn update(&mut self, from: IVec2, to: IVec2) {
        self.from = from;
        self.to = to;
    }

    fn enqueue(&self, document: &mut Document) {
        target_image_mut(document, self.member, self.target, self.frame).enqueue_draw_line(
            self.from,
            self.to,
            self.width,
            self.color,
        );
    }
}

impl Change for DrawLine {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        if self.width < 1 {
            return false;
        }
        is_valid_for_drawing(document, self.member, self.target)
    }

    fn apply(&mut self, document: &mut Document, first_apply: bool) -> AppliedChange {
        if self.from == self.to {
            target_image_mut(document, self.member, self.target, self.frame).cancel_changes();
            return AppliedChange::ignored();
        }
        if !first_apply {
            apply_clips_symmetry(document, self.member, self.target, self.frame);
            self.enqueue(document);
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

impl UpdateableChange for DrawLine {
    fn apply_temporarily(&mut self, document: &mut Document) -> ChangeInfos {
        target_image_mut(document, self.member, self.target, self.frame).cancel_changes();
        if self.from == self.to {
            let area = std::mem::take(&mut self.last_preview_area);
            return member_chunks_info(self.member, self.target, area);
        }
        apply_clips_symmetry(document, self.member, self.target, self.frame);
        self.enqueue(document);
        let image = target_image_mut(document, self.member, self.target, self.frame);
        let new_area = image.find_affected_area();
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
    use crate::color::Premul;
    use crate::state::{LayerContent, Location, MemberData, RasterContent};

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

    #[test]
    fn locality_of_horizontal_line() {
        let (mut document, member) = document_with_layer();
        let mut change = DrawLine::new(
            member,
            DrawTarget::Image,
            0,
            IVec2::new(0, 0),
            IVec2::new(50, 0),
            1,
            Color::BLACK,
        );
        assert!(change.initialize_and_validate(&document));
        let applied = change.apply(&mut document, false);
        let crate::changes::ChangeInfo::MemberChunks { area, .. } = &applied.infos[0] else {
            panic!("expected member chunk info");
        };
        let expected: hashbrown::HashSet<_> = (0..4).map(|x| IVec2::new(x, 0)).collect();
        assert_eq!(area.chunks(), &expected);

        // Revert restores all four chunks to fully transparent.
        let infos = change.revert(&mut document);
        let crate::changes::ChangeInfo::MemberChunks { area, .. } = &infos[0] else {
            panic!("expected member chunk info");
        };
        assert_eq!(area.chunks(), &expected);
        let image = super::super::target_image(&document, member, DrawTarget::Image, 0);
        assert!(image.find_all_chunks().is_empty());

        // Re-apply reproduces the identical line without intermediate drag points.
        change.apply(&mut document, false);
        let image = super::super::target_image(&document, member, DrawTarget::Image, 0);
        for x in 0..=50 {
            assert_eq!(
                image.committed_pixel(IVec2::new(x, 0)),
                Color::BLACK.premultiply()
            );
        }
        assert_eq!(image.committed_pixel(IVec2::new(51, 0)), Premul::TRANSPARENT);
    }

    #[test]
    fn zero_length_line_is_suppressed() {
        let (mut document, member) = document_with_layer();
        let mut change = DrawLine::new(
            member,
            DrawTarget::Image,
            0,
            IVec2::new(5, 5),
            IVec2::new(5, 5),
            1,
            Color::BLACK,
        );
        assert!(change.initialize_and_validate(&document));
        let applied = change.apply(&mut document, false);
        assert!(applied.ignore_in_undo);
        let image = super::super::target_image(&document, member, DrawTarget::Image, 0);
        assert!(image.find_all_chunks().is_empty());
    }
}
