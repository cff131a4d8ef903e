//! # Canvas-level changes
//! Changes targeting the document itself rather than a member: symmetry axes and
//! canvas resizing.

use crate::changes::{
    single_info, AppliedChange, Change, ChangeInfo, ChangeInfos, DrawTarget, UpdateableChange,
};
use crate::image::{ChunkyImage, CommittedChunkStorage};
use crate::math::IRect;
use crate::state::{Document, LayerContent, MemberId, SymmetryAxis};
use glam::IVec2;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SymmetryDirection {
    Horizontal,
    Vertical,
}

/// Toggle or move one symmetry axis, with live position preview while dragging.
pub struct SetSymmetryAxis {
    direction: SymmetryDirection,
    state: SymmetryAxis,
    old: Option<SymmetryAxis>,
}

impl SetSymmetryAxis {
    #[must_use]
    pub fn new(direction: SymmetryDirection, enabled: bool, position: i32) -> Self {
        Self {
            direction,
            state: SymmetryAxis { enabled, position },
            old: None,
        }
    }
    pub fn update(&mut self, position: i32) {
        self.state.position = position;
    }

    fn axis_mut<'d>(&self, document: &'d mut Document) -> &'d mut SymmetryAxis {
        match self.direction {
            SymmetryDirection::Horizontal => &mut document.horizontal_symmetry,
            SymmetryDirection::Vertical => &mut document.vertical_symmetry,
        }
    }
    fn axis(&self, document: &Document) -> SymmetryAxis {
        match self.direction {
            SymmetryDirection::Horizontal => document.horizontal_symmetry,
            SymmetryDirection::Vertical => document.vertical_symmetry,
        }
    }
}

impl Change for SetSymmetryAxis {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let limit = match self.direction {
            SymmetryDirection::Horizontal => document.size.y,
            SymmetryDirection::Vertical => document.size.x,
        };
        if self.state.position < 0 || self.state.position > limit {
            return false;
        }
        self.old = Some(self.axis(document));
        true
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        if self.old == Some(self.state) {
            *self.axis_mut(document) = self.state;
            return AppliedChange::ignored();
        }
        *self.axis_mut(document) = self.state;
        AppliedChange::new(single_info(ChangeInfo::SymmetryChanged))
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        // Unwrap ok - validation recorded the old state.
        *self.axis_mut(document) = self.old.unwrap();
        single_info(ChangeInfo::SymmetryChanged)
    }
}

impl UpdateableChange for SetSymmetryAxis {
    fn apply_temporarily(&mut self, document: &mut Document) -> ChangeInfos {
        *self.axis_mut(document) = self.state;
        single_info(ChangeInfo::SymmetryChanged)
    }

    fn cancel_preview(&mut self, document: &mut Document) {
        if let Some(old) = self.old {
            *self.axis_mut(document) = old;
        }
    }
}

/// Resize the canvas. Growing only changes the document size; shrinking also crops
/// every layer image and mask to the new bounds, each snapshotted for revert.
pub struct ResizeCanvas {
    new_size: IVec2,
    old_size: Option<IVec2>,
    stored: Vec<(MemberId, DrawTarget, usize, CommittedChunkStorage)>,
}

impl ResizeCanvas {
    #[must_use]
    pub fn new(new_size: IVec2) -> Self {
        Self {
            new_size,
            old_size: None,
            stored: Vec::new(),
        }
    }

    /// Queue clears for everything the image holds outside the canvas rect.
    fn crop_image(image: &mut ChunkyImage, canvas: IRect) -> bool {
        let Some(bounds) = image.find_chunk_aligned_most_up_to_date_bounds() else {
            return false;
        };
        let mut any = false;
        for leftover in rect_difference(bounds, canvas) {
            image.enqueue_clear_region(leftover);
            any = true;
        }
        any
    }
}

/// Up to four rects covering `outer` minus `inner`.
fn rect_difference(outer: IRect, inner: IRect) -> Vec<IRect> {
    let inner = outer.intersect(inner);
    if inner.is_empty() {
        return vec![outer];
    }
    let mut parts = Vec::new();
    let top = IRect::from_corners(outer.pos, IVec2::new(outer.right(), inner.top()));
    let bottom = IRect::from_corners(
        IVec2::new(outer.left(), inner.bottom()),
        IVec2::new(outer.right(), outer.bottom()),
    );
    let left = IRect::from_corners(
        IVec2::new(outer.left(), inner.top()),
        IVec2::new(inner.left(), inner.bottom()),
    );
    let right = IRect::from_corners(
        IVec2::new(inner.right(), inner.top()),
        IVec2::new(outer.right(), inner.bottom()),
    );
    for part in [top, bottom, left, right] {
        if !part.is_empty() {
            parts.push(part);
        }
    }
    parts
}

impl Change for ResizeCanvas {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        if self.new_size.x <= 0 || self.new_size.y <= 0 {
            return false;
        }
        self.old_size = Some(document.size);
        true
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        if self.old_size == Some(self.new_size) {
            return AppliedChange::ignored();
        }
        assert!(self.stored.is_empty(), "resize applied while holding undo state");
        document.size = self.new_size;
        let canvas = IRect::new(IVec2::ZERO, self.new_size);
        let members: Vec<MemberId> = document.structure.iter().map(|m| m.id()).collect();
        let mut infos = ChangeInfos::new();
        for member in members {
            let data = document
                .find_member_mut(member)
                .expect("member disappeared during resize");
            let frame_count = data
                .layer()
                .and_then(LayerContent::raster)
                .map_or(0, crate::state::RasterContent::frame_count);
            for frame in 0..frame_count {
                let image = data
                    .layer_mut()
                    .and_then(LayerContent::raster_mut)
                    .unwrap()
                    .image_at_frame_mut(frame);
                if Self::crop_image(image, canvas) {
                    let mut storage = None;
                    let area =
                        crate::changes::drawing::snapshot_and_commit(image, &mut storage);
                    self.stored
                        .push((member, DrawTarget::Image, frame, storage.unwrap()));
                    infos.push(ChangeInfo::MemberChunks {
                        member,
                        target: DrawTarget::Image,
                        area,
                    });
                }
            }
            if let Some(mask) = data.mask.as_mut() {
                if Self::crop_image(mask, canvas) {
                    let mut storage = None;
                    let area = crate::changes::drawing::snapshot_and_commit(mask, &mut storage);
                    self.stored
                        .push((member, DrawTarget::Mask, 0, storage.unwrap()));
                    infos.push(ChangeInfo::MemberChunks {
                        member,
                        target: DrawTarget::Mask,
                        area,
                    });
                }
            }
        }
        infos.push(ChangeInfo::CanvasSize {
            size: self.new_size,
        });
        AppliedChange::new(infos)
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        // Unwrap ok - validation recorded the old size.
        document.size = self.old_size.unwrap();
        let mut infos = ChangeInfos::new();
        for (member, target, frame, storage) in self.stored.drain(..) {
            let image = crate::changes::drawing::target_image_mut(document, member, target, frame);
            let area = storage.apply_chunks_to_image(image);
            image.commit_changes();
            infos.push(ChangeInfo::MemberChunks {
                member,
                target,
                area,
            });
        }
        infos.push(ChangeInfo::CanvasSize {
            size: self.old_size.unwrap(),
        });
        infos
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::changes::drawing::{target_image, target_image_mut};
    use crate::color::{Color, Premul};
    use crate::state::{Location, MemberData, RasterContent};

    #[test]
    fn symmetry_axis_round_trip() {
        let mut document = Document::with_chunk_size(IVec2::splat(64), 16);
        let mut change = SetSymmetryAxis::new(SymmetryDirection::Vertical, true, 32);
        assert!(change.initialize_and_validate(&document));
        change.update(16);
        change.apply_temporarily(&mut document);
        assert_eq!(document.vertical_symmetry.position, 16);
        change.apply(&mut document, true);
        assert!(document.vertical_symmetry.enabled);
        change.revert(&mut document);
        assert!(!document.vertical_symmetry.enabled);
    }

    #[test]
    fn shrink_crops_content_and_reverts() {
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
        {
            let image = target_image_mut(&mut document, member, DrawTarget::Image, 0);
            image.enqueue_draw_pixel(IVec2::new(5, 5), Color::BLACK);
            image.enqueue_draw_pixel(IVec2::new(50, 50), Color::BLACK);
            image.commit_changes();
        }
        let mut change = ResizeCanvas::new(IVec2::splat(32));
        assert!(change.initialize_and_validate(&document));
        change.apply(&mut document, false);
        assert_eq!(document.size, IVec2::splat(32));
        let image = target_image(&document, member, DrawTarget::Image, 0);
        assert_eq!(
            image.committed_pixel(IVec2::new(5, 5)),
            Color::BLACK.premultiply()
        );
        assert_eq!(
            image.committed_pixel(IVec2::new(50, 50)),
            Premul::TRANSPARENT
        );

        change.revert(&mut document);
        assert_eq!(document.size, IVec2::splat(64));
        let image = target_image(&document, member, DrawTarget::Image, 0);
        assert_eq!(
            image.committed_pixel(IVec2::new(50, 50)),
            Color::BLACK.premultiply()
        );
    }

    #[test]
    fn same_size_resize_is_ignored() {
        let mut document = Document::with_chunk_size(IVec2::splat(64), 16);
        let mut change = ResizeCanvas::new(IVec2::splat(64));
        assert!(change.initialize_and_validate(&document));
        assert!(change.apply(&mut document, false).ignore_in_undo);
    }
}
