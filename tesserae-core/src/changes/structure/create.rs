//! Create a new empty layer or folder. The member id is minted when the change is
//! constructed, so redo recreates the member under the same identity.

use crate::changes::{single_info, AppliedChange, Change, ChangeInfo, ChangeInfos};
use crate::state::{
    Document, LayerContent, Location, MemberData, MemberId, RasterContent,
};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CreateKind {
    Folder,
    RasterLayer,
}

pub struct CreateStructureMember {
    location: Location,
    name: String,
    kind: CreateKind,
    member: MemberId,
}

impl CreateStructureMember {
    #[must_use]
    pub fn new(location: Location, name: String, kind: CreateKind) -> Self {
        Self {
            location,
            name,
            kind,
            member: MemberId::default(),
        }
    }
    /// Id the created member will have once applied.
    #[must_use]
    pub fn member_id(&self) -> MemberId {
        self.member
    }
}

impl Change for CreateStructureMember {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        match self.location {
            Location::Above(sibling) => document.find_member(sibling).is_some(),
            Location::IndexIntoFolder(folder, _) => document
                .find_member(folder)
                .is_some_and(MemberData::is_folder),
            Location::IndexIntoRoot(_) => true,
        }
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        let data = match self.kind {
            CreateKind::Folder => MemberData::new_folder(self.name.clone()),
            CreateKind::RasterLayer => MemberData::new_layer(
                self.name.clone(),
                LayerContent::Raster(RasterContent::new_static(document.chunk_size())),
            ),
        }
        .with_id(self.member);
        document
            .structure
            .add_member(self.location, data)
            .expect("create target location disappeared mid-change");
        AppliedChange::new(single_info(ChangeInfo::StructureCreated {
            member: self.member,
        }))
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        document
            .structure
            .detach_subtree(self.member)
            .expect("created member disappeared before revert");
        single_info(ChangeInfo::StructureDeleted {
            member: self.member,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn create_then_revert_then_redo_keeps_id() {
        let mut document = Document::with_chunk_size(glam::IVec2::splat(64), 16);
        let mut change = CreateStructureMember::new(
            Location::IndexIntoRoot(0),
            "layer".to_string(),
            CreateKind::RasterLayer,
        );
        let id = change.member_id();
        assert!(change.initialize_and_validate(&document));
        change.apply(&mut document, false);
        assert!(document.find_member(id).is_some());
        change.revert(&mut document);
        assert!(document.find_member(id).is_none());
        change.apply(&mut document, false);
        assert!(document.find_member(id).is_some());
    }
}
