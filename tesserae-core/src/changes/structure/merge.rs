//! Merge N members into the bottom-most of them: the merged composite lands in the
//! target layer's image, the other members leave the tree. Every touched member is
//! snapshotted or detached independently, so revert restores all N exactly.

use super::RecordedPlace;
use crate::blend::BlendMode;
use crate::changes::{
    member_chunks_info, AppliedChange, Change, ChangeInfo, ChangeInfos, DrawTarget,
};
use crate::chunk::ChunkResolution;
use crate::image::CommittedChunkStorage;
use crate::render;
use crate::state::{DetachedMember, Document, LayerContent, MemberData, MemberId};
use either::Either;
use glam::IVec2;
use std::sync::Arc;

pub struct MergeLayers {
    /// Bottom-to-top; the first member receives the merged result.
    members: Vec<MemberId>,
    frame: usize,
    target_stored: Option<CommittedChunkStorage>,
    /// The members removed by the merge, with where they were.
    detached: Vec<(RecordedPlace, DetachedMember)>,
}

impl MergeLayers {
    #[must_use]
    pub fn new(members: Vec<MemberId>, frame: usize) -> Self {
        Self {
            members,
            frame,
            target_stored: None,
            detached: Vec::new(),
        }
    }

    fn target(&self) -> MemberId {
        self.members[0]
    }
}

impl Change for MergeLayers {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        if self.members.len() < 2 {
            return false;
        }
        // Target must be a raster layer; the rest only need to exist.
        let target_ok = document
            .find_member(self.target())
            .and_then(MemberData::layer)
            .and_then(LayerContent::raster)
            .is_some();
        target_ok
            && self.members[1..]
                .iter()
                .all(|&member| document.find_member(member).is_some())
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        assert!(
            self.detached.is_empty() && self.target_stored.is_none(),
            "merge applied while holding undo state"
        );
        let member_set: hashbrown::HashSet<MemberId> = self.members.iter().copied().collect();

        // Every chunk any merged member (folders recursively) has content in.
        fn collect_chunks(
            document: &Document,
            data: &MemberData,
            frame: usize,
            chunks: &mut hashbrown::HashSet<IVec2>,
        ) {
            if let Some(raster) = data.layer().and_then(LayerContent::raster) {
                chunks.extend(raster.image_at_frame(frame).find_all_chunks());
            } else if data.is_folder() {
                for child in document.structure.iter_children(data.id()).unwrap() {
                    collect_chunks(document, child, frame, chunks);
                }
            }
        }
        let mut all_chunks: hashbrown::HashSet<IVec2> = hashbrown::HashSet::new();
        for &member in &self.members {
            let data = document
                .find_member(member)
                .expect("merge member disappeared mid-change");
            collect_chunks(document, data, self.frame, &mut all_chunks);
        }

        // Composite each chunk before the tree is mutated.
        let merged: Vec<(IVec2, crate::surface::PixelSurface)> = all_chunks
            .iter()
            .filter_map(|&pos| {
                match render::merge_chosen_members(pos, ChunkResolution::Full, document, &member_set)
                {
                    Either::Left(chunk) => Some((pos, chunk.surface().clone())),
                    Either::Right(render::EmptyChunk) => None,
                }
            })
            .collect();

        // Rewrite the target layer's image to exactly the merged content.
        let chunk_size = document.chunk_size() as i32;
        let target = self.target();
        let image = crate::changes::drawing::target_image_mut(
            document,
            target,
            DrawTarget::Image,
            self.frame,
        );
        image.enqueue_clear();
        image.set_blend_mode(BlendMode::Src);
        for (pos, surface) in merged {
            image.enqueue_draw_image(pos * chunk_size, Arc::new(surface));
        }
        let area = crate::changes::drawing::snapshot_and_commit(image, &mut self.target_stored);

        // Remove the merged-away members, recording where each sat at the moment
        // of its removal; revert reinserts in reverse order.
        for &member in self.members[1..].iter() {
            let (parent, index) = document
                .structure
                .location_of(member)
                .expect("merge member disappeared mid-change");
            let detached = document
                .structure
                .detach_subtree(member)
                .expect("merge member disappeared mid-change");
            self.detached
                .push((RecordedPlace { parent, index }, detached));
        }

        let mut infos = member_chunks_info(target, DrawTarget::Image, area);
        for &member in &self.members[1..] {
            infos.push(ChangeInfo::StructureDeleted { member });
        }
        AppliedChange::new(infos)
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        let mut infos = ChangeInfos::new();
        // Reinsert in reverse removal order so sibling indices land where recorded.
        for (place, detached) in self.detached.drain(..).rev() {
            let member = detached.data.id();
            document
                .structure
                .insert_detached(place.as_location(), detached)
                .expect("merge revert destination disappeared");
            infos.push(ChangeInfo::StructureCreated { member });
        }
        let area = crate::changes::drawing::restore_stored_chunks(
            document,
            self.target(),
            DrawTarget::Image,
            self.frame,
            &mut self.target_stored,
        );
        infos.push(ChangeInfo::MemberChunks {
            member: self.target(),
            target: DrawTarget::Image,
            area,
        });
        infos
    }
}
