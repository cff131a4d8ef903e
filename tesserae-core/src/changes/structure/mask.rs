//! Mask lifecycle: create (empty or from the selection), delete, toggle visibility,
//! and bake ("apply") a mask into the layer image. Baking swaps the layer's image
//! object for a freshly built masked one; the old image moves into the change for
//! revert.

use crate::changes::{
    member_chunks_info, single_info, AppliedChange, Change, ChangeInfo, ChangeInfos, DrawTarget,
};
use crate::chunk::ChunkResolution;
use crate::image::{AffectedArea, ChunkyImage};
use crate::state::{Document, LayerContent, MemberId};

pub struct CreateMask {
    member: MemberId,
    from_selection: bool,
}

impl CreateMask {
    #[must_use]
    pub fn new(member: MemberId, from_selection: bool) -> Self {
        Self {
            member,
            from_selection,
        }
    }
}

impl Change for CreateMask {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        document
            .find_member(self.member)
            .is_some_and(|data| data.mask.is_none())
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        let mask = if self.from_selection {
            document.selection.mask.deep_clone_committed()
        } else {
            document.new_image()
        };
        let data = document
            .find_member_mut(self.member)
            .expect("mask change target disappeared mid-change");
        assert!(
            data.mask.is_none(),
            "a mask appeared on the target while this change was open"
        );
        data.mask = Some(mask);
        AppliedChange::new(single_info(ChangeInfo::MaskChanged {
            member: self.member,
        }))
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        let data = document
            .find_member_mut(self.member)
            .expect("mask change target disappeared mid-change");
        assert!(data.mask.take().is_some(), "created mask already gone");
        single_info(ChangeInfo::MaskChanged {
            member: self.member,
        })
    }
}

pub struct DeleteMask {
    member: MemberId,
    stored: Option<ChunkyImage>,
}

impl DeleteMask {
    #[must_use]
    pub fn new(member: MemberId) -> Self {
        Self {
            member,
            stored: None,
        }
    }
}

impl Change for DeleteMask {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        document
            .find_member(self.member)
            .is_some_and(|data| data.mask.is_some())
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        assert!(
            self.stored.is_none(),
            "deleting a mask while already holding one"
        );
        let data = document
            .find_member_mut(self.member)
            .expect("mask change target disappeared mid-change");
        self.stored = Some(data.mask.take().expect("mask disappeared mid-change"));
        AppliedChange::new(single_info(ChangeInfo::MaskChanged {
            member: self.member,
        }))
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        let mask = self
            .stored
            .take()
            .expect("reverting a mask delete that was never applied");
        let data = document
            .find_member_mut(self.member)
            .expect("mask change target disappeared mid-change");
        data.mask = Some(mask);
        single_info(ChangeInfo::MaskChanged {
            member: self.member,
        })
    }
}

pub struct SetMaskVisibility {
    member: MemberId,
    visible: bool,
    old: Option<bool>,
}

impl SetMaskVisibility {
    #[must_use]
    pub fn new(member: MemberId, visible: bool) -> Self {
        Self {
            member,
            visible,
            old: None,
        }
    }
}

impl Change for SetMaskVisibility {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let Some(data) = document.find_member(self.member) else {
            return false;
        };
        if data.mask.is_none() {
            return false;
        }
        self.old = Some(data.mask_visible);
        true
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        if self.old == Some(self.visible) {
            return AppliedChange::ignored();
        }
        document
            .find_member_mut(self.member)
            .expect("mask change target disappeared mid-change")
            .mask_visible = self.visible;
        AppliedChange::new(single_info(ChangeInfo::MaskChanged {
            member: self.member,
        }))
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        let old = self.old.expect("reverting before validation");
        document
            .find_member_mut(self.member)
            .expect("mask change target disappeared mid-change")
            .mask_visible = old;
        single_info(ChangeInfo::MaskChanged {
            member: self.member,
        })
    }
}

/// Bake the mask into the layer image. The layer gets a brand-new image object
/// holding the masked pixels; the previous image and the mask itself move into the
/// change so revert can swap them straight back.
pub struct ApplyMask {
    member: MemberId,
    frame: usize,
    stored: Option<(ChunkyImage, ChunkyImage)>,
}

impl ApplyMask {
    #[must_use]
    pub fn new(member: MemberId, frame: usize) -> Self {
        Self {
            member,
            frame,
            stored: None,
        }
    }

    /// Build the masked replacement image from committed content only.
    fn build_masked(image: &ChunkyImage, mask: &ChunkyImage) -> ChunkyImage {
        let mut masked = ChunkyImage::new(image.chunk_size());
        for pos in image.find_all_chunks() {
            let Some(chunk) = image.committed_chunk(pos, ChunkResolution::Full) else {
                continue;
            };
            let mut surface = chunk.surface().clone();
            match mask.committed_chunk(pos, ChunkResolution::Full) {
                Some(mask_chunk) => surface.clamp_alpha(mask_chunk.surface()),
                // No mask content here - everything is masked away.
                None => continue,
            }
            if !surface.is_fully_transparent() {
                masked.enqueue_replace_chunk(pos, surface);
            }
        }
        masked.commit_changes();
        masked
    }
}

impl Change for ApplyMask {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        document.find_member(self.member).is_some_and(|data| {
            data.mask.is_some()
                && data
                    .layer()
                    .and_then(LayerContent::raster)
                    .is_some()
        })
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        assert!(
            self.stored.is_none(),
            "applying a mask while already holding swapped-out state"
        );
        let data = document
            .find_member_mut(self.member)
            .expect("mask change target disappeared mid-change");
        let mask = data.mask.take().expect("mask disappeared mid-change");
        let raster = data
            .layer_mut()
            .and_then(LayerContent::raster_mut)
            .expect("apply-mask target is not a raster layer");

        let masked = Self::build_masked(raster.image_at_frame(self.frame), &mask);
        let area = AffectedArea::from_chunks(
            raster
                .image_at_frame(self.frame)
                .find_all_chunks()
                .into_iter()
                .chain(masked.find_all_chunks())
                .collect(),
            None,
        );
        let old_image = raster.replace_frame(self.frame, masked);
        self.stored = Some((old_image, mask));

        let mut infos = member_chunks_info(self.member, DrawTarget::Image, area);
        infos.push(ChangeInfo::MaskChanged {
            member: self.member,
        });
        AppliedChange::new(infos)
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        let (old_image, mask) = self
            .stored
            .take()
            .expect("reverting an apply-mask that was never applied");
        let area = AffectedArea::from_chunks(old_image.find_all_chunks(), None);
        let data = document
            .find_member_mut(self.member)
            .expect("mask change target disappeared mid-change");
        let raster = data
            .layer_mut()
            .and_then(LayerContent::raster_mut)
            .expect("apply-mask target is not a raster layer");
        // The masked image built by apply is dropped here; the original object
        // returns under its old identity.
        let _masked = raster.replace_frame(self.frame, old_image);
        data.mask = Some(mask);

        let mut infos = member_chunks_info(self.member, DrawTarget::Image, area);
        infos.push(ChangeInfo::MaskChanged {
            member: self.member,
        });
        infos
    }
}
