//! Member property edits: name, visibility, blend mode, opacity, transparency lock.
//! All record the prior value at validation and swap it back on revert; setting a
//! property to its current value is suppressed from the undo stack.

use crate::blend::BlendMode;
use crate::changes::{
    single_info, AppliedChange, Change, ChangeInfo, ChangeInfos, UpdateableChange,
};
use crate::state::{Document, MemberId};

macro_rules! simple_property_change {
    ($name:ident, $value_ty:ty, $get:expr, $set:expr) => {
        pub struct $name {
            member: MemberId,
            value: $value_ty,
            old: Option<$value_ty>,
        }

        impl $name {
            #[must_use]
            pub fn new(member: MemberId, value: $value_ty) -> Self {
                Self {
                    member,
                    value,
                    old: None,
                }
            }
        }

        impl Change for $name {
            fn initialize_and_validate(&mut self, document: &Document) -> bool {
                let Some(data) = document.find_member(self.member) else {
                    return false;
                };
                #[allow(clippy::redundant_closure_call)]
                {
                    self.old = Some(($get)(data));
                }
                true
            }

            fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
                if self.old.as_ref() == Some(&self.value) {
                    return AppliedChange::ignored();
                }
                let data = document
                    .find_member_mut(self.member)
                    .expect("property change target disappeared mid-change");
                #[allow(clippy::redundant_closure_call)]
                {
                    ($set)(data, self.value.clone());
                }
                AppliedChange::new(single_info(ChangeInfo::PropertiesChanged {
                    member: self.member,
                }))
            }

            fn revert(&mut self, document: &mut Document) -> ChangeInfos {
                let old = self
                    .old
                    .clone()
                    .expect("reverting a property change that was never validated");
                let data = document
                    .find_member_mut(self.member)
                    .expect("property change target disappeared mid-change");
                #[allow(clippy::redundant_closure_call)]
                {
                    ($set)(data, old);
                }
                single_info(ChangeInfo::PropertiesChanged {
                    member: self.member,
                })
            }
        }
    };
}

simple_property_change!(
    SetStructureMemberName,
    String,
    |data: &crate::state::MemberData| data.name.clone(),
    |data: &mut crate::state::MemberData, value| data.name = value
);
simple_property_change!(
    SetStructureMemberVisibility,
    bool,
    |data: &crate::state::MemberData| data.visible,
    |data: &mut crate::state::MemberData, value| data.visible = value
);
simple_property_change!(
    SetStructureMemberBlendMode,
    BlendMode,
    |data: &crate::state::MemberData| data.blend.mode,
    |data: &mut crate::state::MemberData, value| data.blend.mode = value
);
simple_property_change!(
    StructureMemberLockTransparency,
    bool,
    |data: &crate::state::MemberData| data.lock_transparency,
    |data: &mut crate::state::MemberData, value| data.lock_transparency = value
);

/// Opacity is driven by a slider, so it previews live; only the final value lands
/// in the undo stack.
pub struct StructureMemberOpacity {
    member: MemberId,
    opacity: f32,
    old: Option<f32>,
}

impl StructureMemberOpacity {
    #[must_use]
    pub fn new(member: MemberId, opacity: f32) -> Self {
        Self {
            member,
            opacity,
            old: None,
        }
    }
    pub fn update(&mut self, opacity: f32) {
        self.opacity = opacity;
    }

    fn set(&self, document: &mut Document, value: f32) {
        let data = document
            .find_member_mut(self.member)
            .expect("opacity change target disappeared mid-change");
        data.blend.opacity = value.clamp(0.0, 1.0);
    }
}

impl Change for StructureMemberOpacity {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let Some(data) = document.find_member(self.member) else {
            return false;
        };
        self.old = Some(data.blend.opacity);
        true
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        if self.old == Some(self.opacity) {
            // Preview may have wandered; settle back on the original value.
            self.set(document, self.opacity);
            return AppliedChange::ignored();
        }
        self.set(document, self.opacity);
        AppliedChange::new(single_info(ChangeInfo::PropertiesChanged {
            member: self.member,
        }))
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        let old = self
            .old
            .expect("reverting an opacity change that was never validated");
        self.set(document, old);
        single_info(ChangeInfo::PropertiesChanged {
            member: self.member,
        })
    }
}

impl UpdateableChange for StructureMemberOpacity {
    fn apply_temporarily(&mut self, document: &mut Document) -> ChangeInfos {
        self.set(document, self.opacity);
        single_info(ChangeInfo::PropertiesChanged {
            member: self.member,
        })
    }

    fn cancel_preview(&mut self, document: &mut Document) {
        if let Some(old) = self.old {
            self.set(document, old);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::{Location, MemberData};
    use glam::IVec2;

    fn document_with_folder() -> (Document, MemberId) {
        let mut document = Document::with_chunk_size(IVec2::splat(64), 16);
        let member = document
            .structure
            .add_member(
                Location::IndexIntoRoot(0),
                MemberData::new_folder("folder".to_string()),
            )
            .unwrap();
        (document, member)
    }

    #[test]
    fn rename_round_trips() {
        let (mut document, member) = document_with_folder();
        let mut change = SetStructureMemberName::new(member, "renamed".to_string());
        assert!(change.initialize_and_validate(&document));
        change.apply(&mut document, false);
        assert_eq!(
            document.find_member(member).map(|m| m.name.as_str()),
            Some("renamed")
        );
        change.revert(&mut document);
        assert_eq!(
            document.find_member(member).map(|m| m.name.as_str()),
            Some("folder")
        );
    }

    #[test]
    fn same_value_is_suppressed() {
        let (mut document, member) = document_with_folder();
        let mut change = SetStructureMemberVisibility::new(member, true);
        assert!(change.initialize_and_validate(&document));
        assert!(change.apply(&mut document, false).ignore_in_undo);
    }

    #[test]
    fn opacity_previews_then_commits() {
        let (mut document, member) = document_with_folder();
        let mut change = StructureMemberOpacity::new(member, 0.5);
        assert!(change.initialize_and_validate(&document));
        change.update(0.25);
        change.apply_temporarily(&mut document);
        assert_eq!(
            document.find_member(member).map(|m| m.blend.opacity),
            Some(0.25)
        );
        change.update(0.75);
        change.apply(&mut document, true);
        assert_eq!(
            document.find_member(member).map(|m| m.blend.opacity),
            Some(0.75)
        );
        change.revert(&mut document);
        assert_eq!(
            document.find_member(member).map(|m| m.blend.opacity),
            Some(1.0)
        );
    }
}
