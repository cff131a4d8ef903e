//! Pixel-perfect pen: one-pixel strokes where drawing an L-shaped corner erases the
//! corner pixel again, keeping diagonal staircases a single pixel wide.

use crate::blend::BlendMode;
use crate::changes::{
    member_chunks_info, AppliedChange, Change, ChangeInfos, DrawTarget, UpdateableChange,
};
use crate::color::Color;
use crate::image::{ChunkyImage, CommittedChunkStorage};
use crate::state::{Document, MemberId};
use crate::surface;
use glam::IVec2;

use super::{
    apply_clips_symmetry, is_valid_for_drawing, restore_stored_chunks, snapshot_and_commit,
    target_image_mut,
};

pub struct PixelPerfectPen {
    member: MemberId,
    target: DrawTarget,
    frame: usize,
    color: Color,
    confirmed_pixels: hashbrown::HashSet<IVec2>,
    pixels_to_confirm: hashbrown::HashSet<IVec2>,
    pixels_to_confirm2: hashbrown::HashSet<IVec2>,
    incoming_points: Vec<IVec2>,
    drawn_points: usize,
    stored: Option<CommittedChunkStorage>,
}

impl PixelPerfectPen {
    #[must_use]
    pub fn new(member: MemberId, target: DrawTarget, frame: usize, color: Color, pos: IVec2) -> Self {
        Self {
            member,
            target,
            frame,
            color,
            confirmed_pixels: hashbrown::HashSet::new(),
            pixels_to_confirm: hashbrown::HashSet::new(),
            pixels_to_confirm2: hashbrown::HashSet::new(),
            incoming_points: vec![pos],
            drawn_points: 0,
            stored: None,
        }
    }
    pub fn update(&mut self, pos: IVec2) {
        self.incoming_points.push(pos);
    }

    /// Three trailing points form an L when the ends differ in both axes and each
    /// neighbors the middle orthogonally.
    fn is_l_shape(&self, last: usize) -> bool {
        if last < 2 {
            return false;
        }
        let first = self.incoming_points[last - 2];
        let second = self.incoming_points[last - 1];
        let third = self.incoming_points[last];
        let taxicab = |v: IVec2| v.x.abs() + v.y.abs();
        first.x != third.x
            && first.y != third.y
            && taxicab(second - first) == 1
            && taxicab(second - third) == 1
    }

    fn drawing_iteration(&mut self, image: &mut ChunkyImage) {
        let count = self.incoming_points.len();
        if count == 1 {
            image.enqueue_draw_pixel(self.incoming_points[0], self.color);
            self.confirmed_pixels.insert(self.incoming_points[0]);
            return;
        }
        if self.incoming_points[count - 1] == self.incoming_points[count - 2] {
            self.incoming_points.pop();
            return;
        }

        self.confirmed_pixels
            .extend(self.pixels_to_confirm2.iter().copied());
        std::mem::swap(&mut self.pixels_to_confirm, &mut self.pixels_to_confirm2);
        self.pixels_to_confirm.clear();

        let line = surface::bresenham(
            self.incoming_points[count - 2],
            self.incoming_points[count - 1],
        );
        self.pixels_to_confirm.extend(line.iter().copied());
        image.enqueue_draw_pixels(line, self.color);

        let last = self.incoming_points.len() - 1;
        if last >= 2 && self.is_l_shape(last) {
            let corner = self.incoming_points[last - 1];
            if !self.confirmed_pixels.contains(&corner) {
                image.enqueue_draw_pixel(corner, Color::TRANSPARENT);
                self.pixels_to_confirm.remove(&corner);
                self.pixels_to_confirm2.remove(&corner);
                self.incoming_points.remove(last - 1);
            }
        }
    }

    fn setup_image(&self, document: &mut Document) {
        target_image_mut(document, self.member, self.target, self.frame)
            .set_blend_mode(BlendMode::Src);
        apply_clips_symmetry(document, self.member, self.target, self.frame);
    }
}

impl Change for PixelPerfectPen {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        is_valid_for_drawing(document, self.member, self.target)
    }

    fn apply(&mut self, document: &mut Document, first_apply: bool) -> AppliedChange {
        if first_apply {
            self.confirmed_pixels
                .extend(self.pixels_to_confirm.iter().copied());
            self.confirmed_pixels
                .extend(self.pixels_to_confirm2.iter().copied());
        } else {
            self.setup_image(document);
            let image = target_image_mut(document, self.member, self.target, self.frame);
            image.enqueue_draw_pixels(
                self.confirmed_pixels.iter().copied().collect(),
                self.color,
            );
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

impl UpdateableChange for PixelPerfectPen {
    fn apply_temporarily(&mut self, document: &mut Document) -> ChangeInfos {
        if self.drawn_points == 0 {
            self.setup_image(document);
        }
        let image = target_image_mut(document, self.member, self.target, self.frame);
        let queue_before = image.queue_length();
        self.drawing_iteration(image);
        self.drawn_points = self.incoming_points.len();
        let area = image.find_affected_area_since(queue_before);
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
    fn l_shape_corner_is_erased() {
        let (mut document, member) = document_with_layer();
        let mut pen =
            PixelPerfectPen::new(member, DrawTarget::Image, 0, Color::BLACK, IVec2::new(0, 0));
        assert!(pen.initialize_and_validate(&document));
        pen.apply_temporarily(&mut document);
        pen.update(IVec2::new(1, 0));
        pen.apply_temporarily(&mut document);
        pen.update(IVec2::new(1, 1));
        pen.apply_temporarily(&mut document);
        pen.apply(&mut document, true);

        let image = super::super::target_image(&document, member, DrawTarget::Image, 0);
        let black = Color::BLACK.premultiply();
        assert_eq!(image.committed_pixel(IVec2::new(0, 0)), black);
        assert_eq!(image.committed_pixel(IVec2::new(1, 1)), black);
        // The corner pixel of the L is pixel-perfected away.
        assert_eq!(image.committed_pixel(IVec2::new(1, 0)), Premul::TRANSPARENT);
    }

    #[test]
    fn redo_redraws_from_confirmed_pixels() {
        let (mut document, member) = document_with_layer();
        let mut pen =
            PixelPerfectPen::new(member, DrawTarget::Image, 0, Color::BLACK, IVec2::new(0, 0));
        assert!(pen.initialize_and_validate(&document));
        pen.apply_temporarily(&mut document);
        for x in 1..=6 {
            pen.update(IVec2::new(x, 0));
            pen.apply_temporarily(&mut document);
        }
        pen.apply(&mut document, true);
        pen.revert(&mut document);
        pen.apply(&mut document, false);

        let image = super::super::target_image(&document, member, DrawTarget::Image, 0);
        for x in 0..=6 {
            assert_eq!(
                image.committed_pixel(IVec2::new(x, 0)),
                Color::BLACK.premultiply()
            );
        }
    }
}
