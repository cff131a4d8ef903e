//! Stamping pen: every pointer sample becomes a dab, connected by bresenham steps.
//! Previews accumulate incrementally (earlier dabs stay enqueued); the final apply
//! after a revert replays every recorded point from scratch.

use crate::blend::BlendMode;
use crate::changes::{
    member_chunks_info, AppliedChange, Change, ChangeInfos, DrawTarget, UpdateableChange,
};
use crate::color::Color;
use crate::image::{ChunkyImage, CommittedChunkStorage};
use crate::math::IRect;
use crate::state::{Document, MemberId};
use crate::surface;
use glam::IVec2;

use super::{
    apply_clips_symmetry, is_valid_for_drawing, restore_stored_chunks, snapshot_and_commit,
    target_image_mut,
};

pub struct LineBasedPen {
    member: MemberId,
    target: DrawTarget,
    frame: usize,
    color: Color,
    stroke_width: i32,
    erasing: bool,
    points: Vec<IVec2>,
    /// Index of the first point not yet enqueued as preview.
    next_preview_point: usize,
    stored: Option<CommittedChunkStorage>,
}

impl LineBasedPen {
    #[must_use]
    pub fn new(
        member: MemberId,
        target: DrawTarget,
        frame: usize,
        color: Color,
        stroke_width: i32,
        erasing: bool,
        pos: IVec2,
    ) -> Self {
        Self {
            member,
            target,
            frame,
            color,
            stroke_width,
            erasing,
            points: vec![pos],
            next_preview_point: 0,
            stored: None,
        }
    }

    /// Append the next pointer sample, bridging the gap with bresenham steps so
    /// fast pointer motion leaves no holes.
    pub fn update(&mut self, pos: IVec2, stroke_width: i32) {
        // Unwrap ok - points starts non-empty and never shrinks.
        let last = *self.points.last().unwrap();
        if last == pos {
            return;
        }
        self.points
            .extend(surface::bresenham(last, pos).into_iter().skip(1));
        self.stroke_width = stroke_width;
    }

    fn setup_image(&self, document: &mut Document) {
        let image = target_image_mut(document, self.member, self.target, self.frame);
        image.set_blend_mode(if self.erasing {
            BlendMode::DstOut
        } else {
            BlendMode::SrcOver
        });
        apply_clips_symmetry(document, self.member, self.target, self.frame);
    }

    fn stamp(&self, image: &mut ChunkyImage, point: IVec2) {
        if self.stroke_width <= 1 {
            image.enqueue_draw_pixel(point, self.color);
        } else {
            let rect = IRect::new(
                point - IVec2::splat(self.stroke_width / 2),
                IVec2::splat(self.stroke_width),
            );
            image.enqueue_draw_ellipse(rect, self.color, self.color, 0);
        }
    }
}

impl Change for LineBasedPen {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        if self.stroke_width < 1 {
            return false;
        }
        is_valid_for_drawing(document, self.member, self.target)
    }

    fn apply(&mut self, document: &mut Document, first_apply: bool) -> AppliedChange {
        if !first_apply {
            self.setup_image(document);
            let image = target_image_mut(document, self.member, self.target, self.frame);
            for i in 0..self.points.len() {
                self.stamp(image, self.points[i]);
            }
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

impl UpdateableChange for LineBasedPen {
    fn apply_temporarily(&mut self, document: &mut Document) -> ChangeInfos {
        if self.next_preview_point == 0 {
            // First tick: the transient settings haven't been applied yet.
            self.setup_image(document);
        }
        let image = target_image_mut(document, self.member, self.target, self.frame);
        let queue_before = image.queue_length();
        for i in self.next_preview_point..self.points.len() {
            self.stamp(image, self.points[i]);
        }
        self.next_preview_point = self.points.len();
        let area = image.find_affected_area_since(queue_before);
        member_chunks_info(self.member, self.target, area)
    }

    fn cancel_preview(&mut self, document: &mut Document) {
        target_image_mut(document, self.member, self.target, self.frame).cancel_changes();
    }
}
