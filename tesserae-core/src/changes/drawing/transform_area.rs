//! Transform a selection-bounded region of one or more layers: the source pixels are
//! extracted up front (so revert never depends on re-deriving bounds from a deformed
//! state), the source area is cleared, and the extracted image is blitted back
//! through the gesture's corner transform. All members share one global transform.

use crate::changes::{
    AppliedChange, Change, ChangeInfo, ChangeInfos, DrawTarget, UpdateableChange,
};
use crate::image::{AffectedArea, CommittedChunkStorage};
use crate::math::{IRect, ShapeCorners};
use crate::state::{Document, MemberId};
use crate::surface::PixelSurface;
use glam::IVec2;
use std::sync::Arc;

use super::{is_valid_for_drawing, restore_stored_chunks, snapshot_and_commit, target_image_mut};

pub struct TransformArea {
    members: Vec<MemberId>,
    frame: usize,
    source_rect: IRect,
    corners: ShapeCorners,
    extracted: Vec<Arc<PixelSurface>>,
    stored: Vec<Option<CommittedChunkStorage>>,
    last_preview_area: AffectedArea,
}

impl TransformArea {
    /// `source_rect` is the region being picked up; the initial corners are its own
    /// (identity transform).
    #[must_use]
    pub fn new(members: Vec<MemberId>, frame: usize, source_rect: IRect) -> Self {
        let stored = members.iter().map(|_| None).collect();
        Self {
            members,
            frame,
            source_rect,
            corners: ShapeCorners::from_rect(source_rect.as_rect()),
            extracted: Vec::new(),
            stored,
            last_preview_area: AffectedArea::new(),
        }
    }
    /// Move the shared transform target.
    pub fn update(&mut self, corners: ShapeCorners) {
        self.corners = corners;
    }

    fn is_identity(&self) -> bool {
        self.corners == ShapeCorners::from_rect(self.source_rect.as_rect())
    }

    /// Extract the source region of one member, masked down to the selection when
    /// one is active.
    fn extract(document: &Document, member: MemberId, frame: usize, rect: IRect) -> PixelSurface {
        let image = super::target_image(document, member, DrawTarget::Image, frame);
        let mut out = PixelSurface::new(rect.size.max(IVec2::ONE));
        image.draw_most_up_to_date_region_on(
            rect,
            crate::chunk::ChunkResolution::Full,
            &mut out,
            IVec2::ZERO,
        );
        if !document.selection.is_empty() {
            let mut mask = PixelSurface::new(rect.size.max(IVec2::ONE));
            document.selection.mask.draw_most_up_to_date_region_on(
                rect,
                crate::chunk::ChunkResolution::Full,
                &mut mask,
                IVec2::ZERO,
            );
            out.clamp_alpha(&mask);
        }
        out
    }

    /// Enqueue clear-source + draw-transformed for one member. The clear is clipped
    /// to the selection path; the transformed blit is not (it may leave it).
    fn enqueue(&self, document: &mut Document, idx: usize) {
        let selection_path = document.selection.path.clone();
        let image = target_image_mut(document, self.members[idx], DrawTarget::Image, self.frame);
        if let Some(path) = selection_path.filter(|p| !p.is_empty()) {
            image.set_clipping_path(Some(path));
        }
        image.enqueue_clear_region(self.source_rect);
        image.set_clipping_path(None);
        image.enqueue_draw_image_corners(self.corners, Arc::clone(&self.extracted[idx]));
    }
}

impl Change for TransformArea {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        if self.members.is_empty() || self.source_rect.is_empty() {
            return false;
        }
        if !self
            .members
            .iter()
            .all(|&member| is_valid_for_drawing(document, member, DrawTarget::Image))
        {
            return false;
        }
        // Capture the source pixels now; every later stage works from these.
        self.extracted = self
            .members
            .iter()
            .map(|&member| {
                Arc::new(Self::extract(document, member, self.frame, self.source_rect))
            })
            .collect();
        true
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        if self.is_identity() {
            for &member in &self.members {
                target_image_mut(document, member, DrawTarget::Image, self.frame).cancel_changes();
            }
            return AppliedChange::ignored();
        }
        let mut infos = ChangeInfos::new();
        for idx in 0..self.members.len() {
            // Redo from committed state; a preview on top of a preview would
            // compound the clear.
            target_image_mut(document, self.members[idx], DrawTarget::Image, self.frame)
                .cancel_changes();
            self.enqueue(document, idx);
            let image =
                target_image_mut(document, self.members[idx], DrawTarget::Image, self.frame);
            let area = snapshot_and_commit(image, &mut self.stored[idx]);
            infos.push(ChangeInfo::MemberChunks {
                member: self.members[idx],
                target: DrawTarget::Image,
                area,
            });
        }
        AppliedChange::new(infos)
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        let mut infos = ChangeInfos::new();
        for idx in 0..self.members.len() {
            let area = restore_stored_chunks(
                document,
                self.members[idx],
                DrawTarget::Image,
                self.frame,
                &mut self.stored[idx],
            );
            infos.push(ChangeInfo::MemberChunks {
                member: self.members[idx],
                target: DrawTarget::Image,
                area,
            });
        }
        infos
    }
}

impl UpdateableChange for TransformArea {
    fn apply_temporarily(&mut self, document: &mut Document) -> ChangeInfos {
        let mut new_area = AffectedArea::new();
        for idx in 0..self.members.len() {
            target_image_mut(document, self.members[idx], DrawTarget::Image, self.frame)
                .cancel_changes();
            self.enqueue(document, idx);
            let image =
                target_image_mut(document, self.members[idx], DrawTarget::Image, self.frame);
            new_area.union_with(&image.find_affected_area());
        }
        let mut area = std::mem::replace(&mut self.last_preview_area, new_area.clone());
        area.union_with(&new_area);
        self.members
            .iter()
            .map(|&member| ChangeInfo::MemberChunks {
                member,
                target: DrawTarget::Image,
                area: area.clone(),
            })
            .collect()
    }

    fn cancel_preview(&mut self, document: &mut Document) {
        for &member in &self.members {
            target_image_mut(document, member, DrawTarget::Image, self.frame).cancel_changes();
        }
    }
}
