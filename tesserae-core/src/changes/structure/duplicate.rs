//! Duplicate a raster layer, committed content and mask included, directly above
//! the original.

use crate::changes::{single_info, AppliedChange, Change, ChangeInfo, ChangeInfos};
use crate::state::{
    Document, LayerContent, Location, MemberData, MemberId, RasterContent,
};

pub struct DuplicateLayer {
    source: MemberId,
    duplicate: MemberId,
}

impl DuplicateLayer {
    #[must_use]
    pub fn new(source: MemberId) -> Self {
        Self {
            source,
            duplicate: MemberId::default(),
        }
    }
    #[must_use]
    pub fn duplicate_id(&self) -> MemberId {
        self.duplicate
    }
}

impl Change for DuplicateLayer {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        document
            .find_member(self.source)
            .and_then(MemberData::layer)
            .and_then(LayerContent::raster)
            .is_some()
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        let source = document
            .find_member(self.source)
            .expect("duplicate source disappeared mid-change");
        let raster = source
            .layer()
            .and_then(LayerContent::raster)
            .expect("duplicate source is not a raster layer");

        let mut frames = RasterContent::from_image(raster.image_at_frame(0).deep_clone_committed());
        for frame in 1..raster.frame_count() {
            frames.push_frame(raster.image_at_frame(frame).deep_clone_committed());
        }
        let mut data = MemberData::new_layer(
            format!("{} copy", source.name),
            LayerContent::Raster(frames),
        )
        .with_id(self.duplicate);
        data.visible = source.visible;
        data.blend = source.blend;
        data.lock_transparency = source.lock_transparency;
        data.mask_visible = source.mask_visible;
        data.mask = source
            .mask
            .as_ref()
            .map(crate::image::ChunkyImage::deep_clone_committed);

        document
            .structure
            .add_member(Location::Above(self.source), data)
            .expect("duplicate source location disappeared mid-change");
        AppliedChange::new(single_info(ChangeInfo::StructureCreated {
            member: self.duplicate,
        }))
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        document
            .structure
            .detach_subtree(self.duplicate)
            .expect("duplicated member disappeared before revert");
        single_info(ChangeInfo::StructureDeleted {
            member: self.duplicate,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::changes::drawing::target_image_mut;
    use crate::changes::DrawTarget;
    use crate::color::Color;
    use glam::IVec2;

    #[test]
    fn duplicate_copies_pixels_independently() {
        let mut document = Document::with_chunk_size(IVec2::splat(64), 16);
        let source = document
            .structure
            .add_member(
                Location::IndexIntoRoot(0),
                MemberData::new_layer(
                    "layer".to_string(),
                    LayerContent::Raster(RasterContent::new_static(16)),
                ),
            )
            .unwrap();
        {
            let image = target_image_mut(&mut document, source, DrawTarget::Image, 0);
            image.enqueue_draw_pixel(IVec2::new(7, 7), Color::BLACK);
            image.commit_changes();
        }
        let mut change = DuplicateLayer::new(source);
        let duplicate = change.duplicate_id();
        assert!(change.initialize_and_validate(&document));
        change.apply(&mut document, false);

        assert_eq!(
            document.find_member(duplicate).map(|m| m.name.as_str()),
            Some("layer copy")
        );
        // Editing the copy leaves the source alone.
        {
            let image = target_image_mut(&mut document, duplicate, DrawTarget::Image, 0);
            image.enqueue_draw_pixel(IVec2::new(7, 7), Color::WHITE);
            image.commit_changes();
        }
        let source_image =
            crate::changes::drawing::target_image(&document, source, DrawTarget::Image, 0);
        assert_eq!(
            source_image.committed_pixel(IVec2::new(7, 7)),
            Color::BLACK.premultiply()
        );

        change.revert(&mut document);
        assert!(document.find_member(duplicate).is_none());
    }
}
