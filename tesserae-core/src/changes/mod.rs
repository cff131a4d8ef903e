//! # Changes
//! Every document mutation travels through a [`Change`]: validated once against the
//! document, optionally previewed any number of times ([`UpdateableChange`]), applied
//! exactly once to produce undo data, and revertible back to bit-identical state.
//!
//! The lifecycle is `new -> initialize_and_validate -> {update / apply_temporarily}*
//! -> apply -> {revert <-> apply}*`. Validation failure is an expected outcome (the
//! caller drops the change); everything else that goes wrong mid-lifecycle is a
//! protocol violation in the calling layer and panics rather than corrupting state.

pub mod drawing;
pub mod root;
pub mod selection;
pub mod structure;

use crate::image::AffectedArea;
use crate::state::{Document, MemberId};
use glam::IVec2;

/// Whether a drawing change hits the layer's image or its mask.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum DrawTarget {
    Image,
    Mask,
}

/// Notification record handed to the renderer/UI: which part of the document to
/// re-read, scoped to the touched chunks where that is meaningful.
#[derive(Clone, Debug)]
pub enum ChangeInfo {
    MemberChunks {
        member: MemberId,
        target: DrawTarget,
        area: AffectedArea,
    },
    SelectionChunks {
        area: AffectedArea,
    },
    StructureCreated {
        member: MemberId,
    },
    StructureDeleted {
        member: MemberId,
    },
    StructureMoved {
        member: MemberId,
    },
    PropertiesChanged {
        member: MemberId,
    },
    MaskChanged {
        member: MemberId,
    },
    SymmetryChanged,
    CanvasSize {
        size: IVec2,
    },
}

pub type ChangeInfos = smallvec::SmallVec<[ChangeInfo; 2]>;

/// Result of [`Change::apply`]. `ignore_in_undo` marks a no-op edit (zero-length
/// line, zero-delta shift) that must not occupy an undo slot.
pub struct AppliedChange {
    pub infos: ChangeInfos,
    pub ignore_in_undo: bool,
}

impl AppliedChange {
    #[must_use]
    pub fn new(infos: ChangeInfos) -> Self {
        Self {
            infos,
            ignore_in_undo: false,
        }
    }
    #[must_use]
    pub fn ignored() -> Self {
        Self {
            infos: ChangeInfos::new(),
            ignore_in_undo: true,
        }
    }
}

pub trait Change {
    /// Check applicability against the current document and cache whatever later
    /// stages need (bounds, extracted sub-images). Must not mutate committed
    /// document state. Returning false discards the change without further calls.
    fn initialize_and_validate(&mut self, document: &Document) -> bool;

    /// Apply permanently, capturing undo data. Called at most once from the open
    /// state; called again only after [`Change::revert`] (redo), with
    /// `first_apply = false`, in which case the result must be reproduced
    /// deterministically from retained parameters rather than preview state.
    fn apply(&mut self, document: &mut Document, first_apply: bool) -> AppliedChange;

    /// Restore the pre-apply state from captured undo data, consuming it.
    fn revert(&mut self, document: &mut Document) -> ChangeInfos;
}

/// A change supporting repeated live preview before the single final apply.
pub trait UpdateableChange: Change {
    /// Rasterize the current parameters as an uncommitted preview. Implementations
    /// that redraw from scratch cancel the image queue themselves before enqueueing.
    fn apply_temporarily(&mut self, document: &mut Document) -> ChangeInfos;

    /// Remove every trace of the preview. Called when the change is discarded
    /// without ever being applied; afterwards no preview data may be retrievable.
    fn cancel_preview(&mut self, document: &mut Document);
}

/// One-entry info list, the common case.
#[must_use]
pub fn single_info(info: ChangeInfo) -> ChangeInfos {
    let mut infos = ChangeInfos::new();
    infos.push(info);
    infos
}

#[must_use]
pub fn member_chunks_info(member: MemberId, target: DrawTarget, area: AffectedArea) -> ChangeInfos {
    single_info(ChangeInfo::MemberChunks {
        member,
        target,
        area,
    })
}

/// Validation helper shared by every change that needs an existing member.
#[must_use]
pub fn member_exists(document: &Document, member: MemberId) -> bool {
    document.find_member(member).is_some()
}
