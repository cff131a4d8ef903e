//! # Document
//! The root of everything a change can touch: canvas size, the structure tree,
//! the active selection, symmetry axes, and the timeline position.

use super::selection::Selection;
use super::structure::{MemberData, MemberId, StructureTree};
use crate::image::{ChunkyImage, DEFAULT_CHUNK_SIZE};
use glam::IVec2;

pub type DocumentId = crate::ObjectId<Document>;

/// One mirror axis: a pixel-boundary position plus an enabled flag. Disabled axes
/// keep their position so toggling doesn't lose it.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct SymmetryAxis {
    pub enabled: bool,
    pub position: i32,
}

impl SymmetryAxis {
    /// Position if mirroring should happen, None otherwise.
    #[must_use]
    pub fn active_position(&self) -> Option<i32> {
        self.enabled.then_some(self.position)
    }
}

pub struct Document {
    pub size: IVec2,
    chunk_size: u32,
    pub structure: StructureTree,
    pub selection: Selection,
    /// Mirrors across a horizontal line at the given y.
    pub horizontal_symmetry: SymmetryAxis,
    /// Mirrors across a vertical line at the given x.
    pub vertical_symmetry: SymmetryAxis,
    pub current_frame: usize,
}

impl Document {
    #[must_use]
    pub fn new(size: IVec2) -> Self {
        Self::with_chunk_size(size, DEFAULT_CHUNK_SIZE)
    }
    /// Documents with a non-default chunk size; small sizes keep locality tests cheap.
    #[must_use]
    pub fn with_chunk_size(size: IVec2, chunk_size: u32) -> Self {
        assert!(size.x > 0 && size.y > 0, "canvas size must be positive");
        Self {
            size,
            chunk_size,
            structure: StructureTree::default(),
            selection: Selection::new(chunk_size),
            horizontal_symmetry: SymmetryAxis::default(),
            vertical_symmetry: SymmetryAxis::default(),
            current_frame: 0,
        }
    }
    #[must_use]
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }
    #[must_use]
    pub fn find_member(&self, id: MemberId) -> Option<&MemberData> {
        self.structure.get(id)
    }
    pub fn find_member_mut(&mut self, id: MemberId) -> Option<&mut MemberData> {
        self.structure.get_mut(id)
    }
    /// A fresh image matching this document's chunking.
    #[must_use]
    pub fn new_image(&self) -> ChunkyImage {
        ChunkyImage::new(self.chunk_size)
    }
}
