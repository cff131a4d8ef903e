//! Flood fill: breadth-first walk over committed pixels, bounded by the canvas,
//! replacing the connected region around the start point. The same walk backs the
//! magic wand selection.

use crate::blend::BlendMode;
use crate::changes::{
    member_chunks_info, AppliedChange, Change, ChangeInfos, DrawTarget,
};
use crate::color::Color;
use crate::image::{ChunkyImage, CommittedChunkStorage};
use crate::math::IRect;
use crate::state::{Document, MemberId};
use glam::IVec2;

use super::{
    apply_clips_symmetry, is_valid_for_drawing, restore_stored_chunks, snapshot_and_commit,
    target_image_mut,
};

/// Connected pixels matching the start pixel's committed color within `tolerance`
/// (0.0 = exact, 1.0 = everything), four-connected, bounded by the canvas rect.
#[must_use]
pub fn flood_region(
    image: &ChunkyImage,
    start: IVec2,
    canvas: IRect,
    tolerance: f32,
) -> Vec<IVec2> {
    if !canvas.contains(start) {
        return Vec::new();
    }
    let reference = image.committed_pixel(start);
    let threshold = (tolerance.clamp(0.0, 1.0) * 255.0).round() as i16;
    let matches = |pos: IVec2| {
        let pixel = image.committed_pixel(pos);
        pixel
            .0
            .iter()
            .zip(reference.0)
            .all(|(&a, b)| (i16::from(a) - i16::from(b)).abs() <= threshold)
    };
    let mut visited = hashbrown::HashSet::new();
    let mut region = Vec::new();
    let mut frontier = std::collections::VecDeque::new();
    frontier.push_back(start);
    visited.insert(start);
    while let Some(pos) = frontier.pop_front() {
        region.push(pos);
        for step in [IVec2::X, IVec2::NEG_X, IVec2::Y, IVec2::NEG_Y] {
            let next = pos + step;
            if canvas.contains(next) && !visited.contains(&next) && matches(next) {
                visited.insert(next);
                frontier.push_back(next);
            }
        }
    }
    region
}

pub struct FloodFill {
    member: MemberId,
    frame: usize,
    start: IVec2,
    color: Color,
    tolerance: f32,
    stored: Option<CommittedChunkStorage>,
}

impl FloodFill {
    #[must_use]
    pub fn new(member: MemberId, frame: usize, start: IVec2, color: Color, tolerance: f32) -> Self {
        Self {
            member,
            frame,
            start,
            color,
            tolerance,
            stored: None,
        }
    }
}

impl Change for FloodFill {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        if !IRect::new(IVec2::ZERO, document.size).contains(self.start) {
            return false;
        }
        // Filling outside the selection does nothing; decline up front.
        if let Some(path) = &document.selection.path {
            if !path.is_empty() && !path.contains(self.start.as_dvec2() + glam::DVec2::splat(0.5)) {
                return false;
            }
        }
        is_valid_for_drawing(document, self.member, DrawTarget::Image)
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        let canvas = IRect::new(IVec2::ZERO, document.size);
        let image = target_image_mut(document, self.member, DrawTarget::Image, self.frame);
        if image.committed_pixel(self.start) == self.color.premultiply() {
            return AppliedChange::ignored();
        }
        let region = flood_region(image, self.start, canvas, self.tolerance);
        if region.is_empty() {
            return AppliedChange::ignored();
        }
        apply_clips_symmetry(document, self.member, DrawTarget::Image, self.frame);
        let image = target_image_mut(document, self.member, DrawTarget::Image, self.frame);
        image.set_blend_mode(BlendMode::Src);
        image.enqueue_draw_pixels(region, self.color);
        let area = snapshot_and_commit(image, &mut self.stored);
        AppliedChange::new(member_chunks_info(self.member, DrawTarget::Image, area))
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        let area = restore_stored_chunks(
            document,
            self.member,
            DrawTarget::Image,
            self.frame,
            &mut self.stored,
        );
        member_chunks_info(self.member, DrawTarget::Image, area)
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
    fn fill_respects_boundaries() {
        let (mut document, member) = document_with_layer();
        // A vertical wall at x = 10 splits the canvas.
        {
            let image = target_image_mut(&mut document, member, DrawTarget::Image, 0);
            image.enqueue_draw_line(IVec2::new(10, 0), IVec2::new(10, 63), 1, Color::BLACK);
            image.commit_changes();
        }
        let red = Color::new(255, 0, 0, 255);
        let mut change = FloodFill::new(member, 0, IVec2::new(2, 2), red, 0.0);
        assert!(change.initialize_and_validate(&document));
        change.apply(&mut document, false);
        let image = super::super::target_image(&document, member, DrawTarget::Image, 0);
        assert_eq!(image.committed_pixel(IVec2::new(0, 0)), red.premultiply());
        assert_eq!(image.committed_pixel(IVec2::new(9, 63)), red.premultiply());
        // The wall and the far side stay untouched.
        assert_eq!(
            image.committed_pixel(IVec2::new(10, 30)),
            Color::BLACK.premultiply()
        );
        assert_eq!(
            image.committed_pixel(IVec2::new(11, 30)),
            Premul::TRANSPARENT
        );

        change.revert(&mut document);
        let image = super::super::target_image(&document, member, DrawTarget::Image, 0);
        assert_eq!(image.committed_pixel(IVec2::new(2, 2)), Premul::TRANSPARENT);
        assert_eq!(
            image.committed_pixel(IVec2::new(10, 30)),
            Color::BLACK.premultiply()
        );
    }

    #[test]
    fn fill_with_same_color_is_ignored() {
        let (mut document, member) = document_with_layer();
        let mut change = FloodFill::new(member, 0, IVec2::new(2, 2), Color::TRANSPARENT, 0.0);
        assert!(change.initialize_and_validate(&document));
        assert!(change.apply(&mut document, false).ignore_in_undo);
    }
}
