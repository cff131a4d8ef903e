//! Committed-chunk snapshots: the undo data captured by a change right before it
//! commits. Deep copies of exactly the touched chunks' committed content, restorable
//! onto the image later. Ownership is the disposal contract - a storage can be
//! applied exactly once, and dropping it frees every buffer.

use super::{AffectedArea, ChunkyImage};
use crate::chunk::ChunkResolution;
use crate::math;
use crate::surface::PixelSurface;
use glam::IVec2;

pub struct CommittedChunkStorage {
    chunk_size: u32,
    /// Chunk coordinate paired with its committed pixels at capture time, or None
    /// where the chunk did not exist (restoring erases it back to empty).
    chunks: Vec<(IVec2, Option<PixelSurface>)>,
}

impl CommittedChunkStorage {
    /// Deep-copy the current *committed* content of the given chunks. The pending
    /// queue is deliberately invisible here: snapshots capture the state a revert
    /// must return to, not the preview.
    #[must_use]
    pub fn new(image: &ChunkyImage, chunks: &hashbrown::HashSet<IVec2>) -> Self {
        let copied = chunks
            .iter()
            .map(|&pos| {
                (
                    pos,
                    image
                        .committed_chunk(pos, ChunkResolution::Full)
                        .map(|chunk| chunk.surface().clone()),
                )
            })
            .collect();
        Self {
            chunk_size: image.chunk_size(),
            chunks: copied,
        }
    }

    /// Number of stored chunk slots (absent markers included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Enqueue restoration of every stored chunk onto `image` and report the area
    /// to re-render. The caller must follow up with `commit_changes` to finalize
    /// the restoration as the new committed state. Consumes the storage - there is
    /// no way to apply a snapshot twice.
    pub fn apply_chunks_to_image(self, image: &mut ChunkyImage) -> AffectedArea {
        assert_eq!(
            self.chunk_size,
            image.chunk_size(),
            "snapshot and image chunk sizes diverged"
        );
        let mut area = AffectedArea::new();
        for (pos, stored) in self.chunks {
            area.union_with(&AffectedArea::from_rect(
                math::chunk_pixel_rect(pos, self.chunk_size),
                self.chunk_size,
            ));
            match stored {
                Some(surface) => image.enqueue_replace_chunk(pos, surface),
                None => image.enqueue_erase_chunk(pos),
            }
        }
        area
    }
}
