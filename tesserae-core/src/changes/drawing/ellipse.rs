//! Ellipse tool, cancel-then-redraw preview like the rectangle.

use crate::changes::{
    member_chunks_info, AppliedChange, Change, ChangeInfos, DrawTarget, UpdateableChange,
};
use crate::color::Color;
use crate::image::{AffectedArea, CommittedChunkStorage};
use crate::math::IRect;
use crate::state::{Document, MemberId};

use super::{
    apply_clips_symmetry, is_valid_for_drawing, restore_stored_chunks, snapshot_and_commit,
    target_image_mut,
};

pub struct DrawEllipse {
    member: MemberId,
    target: DrawTarget,
    frame: usize,
    rect: IRect,
    stroke: Color,
    fill: Color,
    stroke_width: i32,
    stored: Option<CommittedChunkStorage>,
    last_preview_area: AffectedArea,
}

impl DrawEllipse {
    #[must_use]
    pub fn new(
        member: MemberId,
        target: DrawTarget,
        frame: usize,
        rect: IRect,
        stroke: Color,
        fill: Color,
        stroke_width: i32,
    ) -> Self {
        Self {
            member,
            target,
            frame,
            rect,
            stroke,
            fill,
            stroke_width,
            stored: None,
            last_preview_area: AffectedArea::new(),
        }
    }
    pub fn update(&mut self, rect: IRect) {
        self.rect = rect;
    }

    fn enqueue(&self, document: &mut Document) {
        target_image_mut(document, self.member, self.target, self.frame).enqueue_draw_ellipse(
            self.rect,
            self.stroke,
            self.fill,
            self.stroke_width,
        );
    }
}

impl Change for DrawEllipse {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        is_valid_for_drawing(document, self.member, self.target)
    }

    fn apply(&mut self, document: &mut Document, first_apply: bool) -> AppliedChange {
        if self.rect.is_empty() {
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

impl UpdateableChange for DrawEllipse {
    fn apply_temporarily(&mut self, document: &mut Document) -> ChangeInfos {
        target_image_mut(document, self.member, self.target, self.frame).cancel_changes();
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
