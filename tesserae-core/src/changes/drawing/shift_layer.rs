//! Shift the committed content of one or more layers by a pixel delta, with live
//! preview. A zero delta leaves no trace and occupies no undo slot. Each member is
//! snapshotted independently so multi-layer shifts revert per-member consistent.

use crate::changes::{
    AppliedChange, Change, ChangeInfo, ChangeInfos, DrawTarget, UpdateableChange,
};
use crate::chunk::ChunkResolution;
use crate::image::{ChunkyImage, CommittedChunkStorage};
use crate::state::{Document, MemberId};
use glam::IVec2;
use std::sync::Arc;

use super::{is_valid_for_drawing, restore_stored_chunks, snapshot_and_commit, target_image_mut};

pub struct ShiftLayer {
    members: Vec<MemberId>,
    frame: usize,
    delta: IVec2,
    stored: Vec<Option<CommittedChunkStorage>>,
}

impl ShiftLayer {
    #[must_use]
    pub fn new(members: Vec<MemberId>, frame: usize, delta: IVec2) -> Self {
        let stored = members.iter().map(|_| None).collect();
        Self {
            members,
            frame,
            delta,
            stored,
        }
    }
    pub fn update(&mut self, delta: IVec2) {
        self.delta = delta;
    }

    /// Enqueue the shift: erase everything, then blit each committed chunk back at
    /// its displaced position. Chunk-wise, so cost follows content, not canvas.
    fn enqueue_shift(image: &mut ChunkyImage, delta: IVec2) {
        let chunk_size = image.chunk_size() as i32;
        let committed: Vec<(IVec2, Arc<crate::surface::PixelSurface>)> = image
            .find_all_chunks()
            .into_iter()
            .filter_map(|pos| {
                image
                    .committed_chunk(pos, ChunkResolution::Full)
                    .map(|chunk| (pos, Arc::new(chunk.surface().clone())))
            })
            .collect();
        image.enqueue_clear();
        for (pos, surface) in committed {
            image.enqueue_draw_image(pos * chunk_size + delta, surface);
        }
    }

    fn apply_to_all(&mut self, document: &mut Document, snapshot: bool) -> ChangeInfos {
        let mut infos = ChangeInfos::new();
        for (idx, &member) in self.members.iter().enumerate() {
            let image = target_image_mut(document, member, DrawTarget::Image, self.frame);
            image.cancel_changes();
            Self::enqueue_shift(image, self.delta);
            let area = if snapshot {
                snapshot_and_commit(image, &mut self.stored[idx])
            } else {
                image.find_affected_area()
            };
            infos.push(ChangeInfo::MemberChunks {
                member,
                target: DrawTarget::Image,
                area,
            });
        }
        infos
    }
}

impl Change for ShiftLayer {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        !self.members.is_empty()
            && self
                .members
                .iter()
                .all(|&member| is_valid_for_drawing(document, member, DrawTarget::Image))
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        if self.delta == IVec2::ZERO {
            for &member in &self.members {
                target_image_mut(document, member, DrawTarget::Image, self.frame).cancel_changes();
            }
            return AppliedChange::ignored();
        }
        // The preview queue is redone from committed state either way: a shift
        // enqueued on top of a shifted preview would double-displace.
        let infos = self.apply_to_all(document, true);
        AppliedChange::new(infos)
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        let mut infos = ChangeInfos::new();
        for (idx, &member) in self.members.iter().enumerate() {
            let area = restore_stored_chunks(
                document,
                member,
                DrawTarget::Image,
                self.frame,
                &mut self.stored[idx],
            );
            infos.push(ChangeInfo::MemberChunks {
                member,
                target: DrawTarget::Image,
                area,
            });
        }
        infos
    }
}

impl UpdateableChange for ShiftLayer {
    fn apply_temporarily(&mut self, document: &mut Document) -> ChangeInfos {
        self.apply_to_all(document, false)
    }

    fn cancel_preview(&mut self, document: &mut Document) {
        for &member in &self.members {
            target_image_mut(document, member, DrawTarget::Image, self.frame).cancel_changes();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::{Color, Premul};
    use crate::state::{LayerContent, Location, MemberData, RasterContent};

    fn document_with_layers(n: usize) -> (Document, Vec<MemberId>) {
        let mut document = Document::with_chunk_size(IVec2::splat(64), 16);
        let members = (0..n)
            .map(|i| {
                document
                    .structure
                    .add_member(
                        Location::IndexIntoRoot(i),
                        MemberData::new_layer(
                            format!("layer {i}"),
                            LayerContent::Raster(RasterContent::new_static(16)),
                        ),
                    )
                    .unwrap()
            })
            .collect();
        (document, members)
    }

    fn paint_pixel(document: &mut Document, member: MemberId, pos: IVec2, color: Color) {
        let image = target_image_mut(document, member, DrawTarget::Image, 0);
        image.enqueue_draw_pixel(pos, color);
        image.commit_changes();
    }

    #[test]
    fn shift_moves_content_and_reverts() {
        let (mut document, members) = document_with_layers(1);
        paint_pixel(&mut document, members[0], IVec2::new(3, 3), Color::BLACK);

        let mut change = ShiftLayer::new(members.clone(), 0, IVec2::new(20, 0));
        assert!(change.initialize_and_validate(&document));
        change.apply(&mut document, false);

        let image = super::super::target_image(&document, members[0], DrawTarget::Image, 0);
        assert_eq!(image.committed_pixel(IVec2::new(3, 3)), Premul::TRANSPARENT);
        assert_eq!(
            image.committed_pixel(IVec2::new(23, 3)),
            Color::BLACK.premultiply()
        );

        change.revert(&mut document);
        let image = super::super::target_image(&document, members[0], DrawTarget::Image, 0);
        assert_eq!(
            image.committed_pixel(IVec2::new(3, 3)),
            Color::BLACK.premultiply()
        );
        assert_eq!(image.committed_pixel(IVec2::new(23, 3)), Premul::TRANSPARENT);
    }

    #[test]
    fn zero_delta_is_suppressed() {
        let (mut document, members) = document_with_layers(1);
        paint_pixel(&mut document, members[0], IVec2::new(3, 3), Color::BLACK);
        let mut change = ShiftLayer::new(members.clone(), 0, IVec2::ZERO);
        assert!(change.initialize_and_validate(&document));
        let applied = change.apply(&mut document, false);
        assert!(applied.ignore_in_undo);
        let image = super::super::target_image(&document, members[0], DrawTarget::Image, 0);
        assert_eq!(
            image.committed_pixel(IVec2::new(3, 3)),
            Color::BLACK.premultiply()
        );
    }

    #[test]
    fn multi_member_shift_reverts_each_independently() {
        let (mut document, members) = document_with_layers(2);
        paint_pixel(&mut document, members[0], IVec2::new(1, 1), Color::BLACK);
        paint_pixel(&mut document, members[1], IVec2::new(40, 40), Color::WHITE);

        let mut change = ShiftLayer::new(members.clone(), 0, IVec2::new(5, 5));
        assert!(change.initialize_and_validate(&document));
        change.apply(&mut document, false);
        change.revert(&mut document);

        let first = super::super::target_image(&document, members[0], DrawTarget::Image, 0);
        assert_eq!(
            first.committed_pixel(IVec2::new(1, 1)),
            Color::BLACK.premultiply()
        );
        let second = super::super::target_image(&document, members[1], DrawTarget::Image, 0);
        assert_eq!(
            second.committed_pixel(IVec2::new(40, 40)),
            Color::WHITE.premultiply()
        );
    }
}
