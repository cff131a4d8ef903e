//! Delete a member. The whole subtree is lifted out and retained by the change, so
//! revert restores every contained image bit-identically.

use super::RecordedPlace;
use crate::changes::{single_info, AppliedChange, Change, ChangeInfo, ChangeInfos};
use crate::state::{DetachedMember, Document, MemberId};

pub struct DeleteStructureMember {
    member: MemberId,
    place: Option<RecordedPlace>,
    detached: Option<DetachedMember>,
}

impl DeleteStructureMember {
    #[must_use]
    pub fn new(member: MemberId) -> Self {
        Self {
            member,
            place: None,
            detached: None,
        }
    }
}

impl Change for DeleteStructureMember {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let Some((parent, index)) = document.structure.location_of(self.member) else {
            return false;
        };
        self.place = Some(RecordedPlace { parent, index });
        true
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        assert!(
            self.detached.is_none(),
            "deleting a member that is already held detached by this change"
        );
        self.detached = Some(
            document
                .structure
                .detach_subtree(self.member)
                .expect("delete target disappeared mid-change"),
        );
        AppliedChange::new(single_info(ChangeInfo::StructureDeleted {
            member: self.member,
        }))
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        let detached = self
            .detached
            .take()
            .expect("reverting a delete that was never applied");
        // Unwrap ok - validation recorded the place before any apply.
        let place = self.place.unwrap();
        document
            .structure
            .insert_detached(place.as_location(), detached)
            .expect("delete revert destination disappeared");
        single_info(ChangeInfo::StructureCreated {
            member: self.member,
        })
    }
}
