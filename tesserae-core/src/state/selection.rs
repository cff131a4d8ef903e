//! # Selection
//! The active selection is a geometric path (when one is known) plus a chunked mask
//! image derived from it. The mask is authoritative: raster-born selections (magic
//! wand) have no path at all, and combine modes beyond union drop the path rather
//! than solve boolean path algebra.

use crate::blend::BlendMode;
use crate::image::ChunkyImage;
use crate::math::Path;

/// How a new selection shape combines with the existing selection, expressed as the
/// raster blend op used on the mask image.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum SelectionMode {
    #[default]
    New,
    Add,
    Subtract,
    Intersect,
}

impl SelectionMode {
    /// Blend mode drawing the new shape onto the existing mask.
    #[must_use]
    pub fn blend_mode(self) -> BlendMode {
        match self {
            // New clears the mask first, then draws; the draw itself is a plain over.
            Self::New | Self::Add => BlendMode::SrcOver,
            Self::Subtract => BlendMode::DstOut,
            Self::Intersect => BlendMode::DstIn,
        }
    }
}

pub struct Selection {
    /// Geometric outline, kept only while it exactly matches the mask.
    pub path: Option<Path>,
    /// Chunked alpha mask; white where selected.
    pub mask: ChunkyImage,
}

impl Selection {
    #[must_use]
    pub fn new(chunk_size: u32) -> Self {
        Self {
            path: None,
            mask: ChunkyImage::new(chunk_size),
        }
    }
    /// No pixels selected at all. An empty selection means edits apply everywhere.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mask.find_all_chunks().is_empty()
    }
}
