//! Paste an external image onto a layer at a position, honoring the active
//! selection as a clip.

use crate::changes::{
    member_chunks_info, AppliedChange, Change, ChangeInfos, DrawTarget,
};
use crate::image::CommittedChunkStorage;
use crate::state::{Document, MemberId};
use crate::surface::PixelSurface;
use glam::IVec2;
use std::sync::Arc;

use super::{
    apply_clips_symmetry, is_valid_for_drawing, restore_stored_chunks, snapshot_and_commit,
    target_image_mut,
};

pub struct PasteImage {
    member: MemberId,
    frame: usize,
    pos: IVec2,
    image: Arc<PixelSurface>,
    stored: Option<CommittedChunkStorage>,
}

impl PasteImage {
    #[must_use]
    pub fn new(member: MemberId, frame: usize, pos: IVec2, image: Arc<PixelSurface>) -> Self {
        Self {
            member,
            frame,
            pos,
            image,
            stored: None,
        }
    }
}

impl Change for PasteImage {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        is_valid_for_drawing(document, self.member, DrawTarget::Image)
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        apply_clips_symmetry(document, self.member, DrawTarget::Image, self.frame);
        let image = target_image_mut(document, self.member, DrawTarget::Image, self.frame);
        image.enqueue_draw_image(self.pos, Arc::clone(&self.image));
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
