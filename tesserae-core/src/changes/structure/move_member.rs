//! Move a member (subtree and all) somewhere else in the tree.

use super::RecordedPlace;
use crate::changes::{single_info, AppliedChange, Change, ChangeInfo, ChangeInfos};
use crate::state::{Document, Location, MemberId};

pub struct MoveStructureMember {
    member: MemberId,
    destination: Location,
    original: Option<RecordedPlace>,
}

impl MoveStructureMember {
    #[must_use]
    pub fn new(member: MemberId, destination: Location) -> Self {
        Self {
            member,
            destination,
            original: None,
        }
    }
}

impl Change for MoveStructureMember {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let Some((parent, index)) = document.structure.location_of(self.member) else {
            return false;
        };
        if document.structure.would_cycle(self.member, self.destination) {
            return false;
        }
        let destination_exists = match self.destination {
            Location::Above(sibling) => document.find_member(sibling).is_some(),
            Location::IndexIntoFolder(folder, _) => document
                .find_member(folder)
                .is_some_and(crate::state::MemberData::is_folder),
            Location::IndexIntoRoot(_) => true,
        };
        if !destination_exists {
            return false;
        }
        self.original = Some(RecordedPlace { parent, index });
        true
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        document
            .structure
            .move_member(self.member, self.destination)
            .expect("move destination disappeared mid-change");
        AppliedChange::new(single_info(ChangeInfo::StructureMoved {
            member: self.member,
        }))
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        // Unwrap ok - validation recorded the original place.
        let original = self.original.unwrap();
        document
            .structure
            .move_member(self.member, original.as_location())
            .expect("move revert destination disappeared");
        single_info(ChangeInfo::StructureMoved {
            member: self.member,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::{LayerContent, MemberData, RasterContent};
    use glam::IVec2;

    #[test]
    fn move_into_folder_and_back() {
        let mut document = Document::with_chunk_size(IVec2::splat(64), 16);
        let layer = document
            .structure
            .add_member(
                Location::IndexIntoRoot(0),
                MemberData::new_layer(
                    "layer".to_string(),
                    LayerContent::Raster(RasterContent::new_static(16)),
                ),
            )
            .unwrap();
        let folder = document
            .structure
            .add_member(
                Location::IndexIntoRoot(1),
                MemberData::new_folder("folder".to_string()),
            )
            .unwrap();

        let mut change = MoveStructureMember::new(layer, Location::IndexIntoFolder(folder, 0));
        assert!(change.initialize_and_validate(&document));
        change.apply(&mut document, false);
        assert_eq!(
            document.structure.location_of(layer),
            Some((Some(folder), 0))
        );
        change.revert(&mut document);
        assert_eq!(document.structure.location_of(layer), Some((None, 0)));
    }

    #[test]
    fn cyclic_move_fails_validation() {
        let mut document = Document::with_chunk_size(IVec2::splat(64), 16);
        let outer = document
            .structure
            .add_member(
                Location::IndexIntoRoot(0),
                MemberData::new_folder("outer".to_string()),
            )
            .unwrap();
        let inner = document
            .structure
            .add_member(
                Location::IndexIntoFolder(outer, 0),
                MemberData::new_folder("inner".to_string()),
            )
            .unwrap();
        let mut change = MoveStructureMember::new(outer, Location::IndexIntoFolder(inner, 0));
        assert!(!change.initialize_and_validate(&document));
    }
}
