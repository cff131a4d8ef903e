//! Replace every occurrence of one color across a layer with another. Operates on
//! exact committed pixel values; matching nothing is a no-op that skips the undo
//! stack.

use crate::blend::BlendMode;
use crate::changes::{
    member_chunks_info, AppliedChange, Change, ChangeInfos, DrawTarget,
};
use crate::chunk::ChunkResolution;
use crate::color::Color;
use crate::image::CommittedChunkStorage;
use crate::state::{Document, MemberId};
use glam::IVec2;

use super::{is_valid_for_drawing, restore_stored_chunks, snapshot_and_commit, target_image_mut};

pub struct ReplaceColor {
    member: MemberId,
    frame: usize,
    from: Color,
    to: Color,
    stored: Option<CommittedChunkStorage>,
}

impl ReplaceColor {
    #[must_use]
    pub fn new(member: MemberId, frame: usize, from: Color, to: Color) -> Self {
        Self {
            member,
            frame,
            from,
            to,
            stored: None,
        }
    }
}

impl Change for ReplaceColor {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        self.from != self.to && is_valid_for_drawing(document, self.member, DrawTarget::Image)
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        let image = target_image_mut(document, self.member, DrawTarget::Image, self.frame);
        let wanted = self.from.premultiply();
        let chunk_size = image.chunk_size() as i32;
        let mut matching: Vec<IVec2> = Vec::new();
        for pos in image.find_all_chunks() {
            let Some(chunk) = image.committed_chunk(pos, ChunkResolution::Full) else {
                continue;
            };
            let origin = pos * chunk_size;
            let surface = chunk.surface();
            for y in 0..surface.size().y {
                for x in 0..surface.size().x {
                    if surface.pixel(IVec2::new(x, y)) == wanted {
                        matching.push(origin + IVec2::new(x, y));
                    }
                }
            }
        }
        if matching.is_empty() {
            return AppliedChange::ignored();
        }
        image.set_blend_mode(BlendMode::Src);
        image.enqueue_draw_pixels(matching, self.to);
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
    use crate::state::{LayerContent, Location, MemberData, RasterContent};

    #[test]
    fn replaces_only_exact_matches() {
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
        let red = Color::new(255, 0, 0, 255);
        let blue = Color::new(0, 0, 255, 255);
        {
            let image = target_image_mut(&mut document, member, DrawTarget::Image, 0);
            image.enqueue_draw_pixel(IVec2::new(1, 1), red);
            image.enqueue_draw_pixel(IVec2::new(30, 30), red);
            image.enqueue_draw_pixel(IVec2::new(2, 2), blue);
            image.commit_changes();
        }
        let green = Color::new(0, 255, 0, 255);
        let mut change = ReplaceColor::new(member, 0, red, green);
        assert!(change.initialize_and_validate(&document));
        change.apply(&mut document, false);
        let image = super::super::target_image(&document, member, DrawTarget::Image, 0);
        assert_eq!(
            image.committed_pixel(IVec2::new(1, 1)),
            green.premultiply()
        );
        assert_eq!(
            image.committed_pixel(IVec2::new(30, 30)),
            green.premultiply()
        );
        assert_eq!(image.committed_pixel(IVec2::new(2, 2)), blue.premultiply());

        change.revert(&mut document);
        let image = super::super::target_image(&document, member, DrawTarget::Image, 0);
        assert_eq!(image.committed_pixel(IVec2::new(1, 1)), red.premultiply());
    }

    #[test]
    fn no_matches_is_ignored() {
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
        let mut change = ReplaceColor::new(
            member,
            0,
            Color::new(1, 2, 3, 255),
            Color::new(3, 2, 1, 255),
        );
        assert!(change.initialize_and_validate(&document));
        assert!(change.apply(&mut document, false).ignore_in_undo);
    }
}
