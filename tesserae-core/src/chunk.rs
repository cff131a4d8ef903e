//! # Chunks
//! Fixed-size square tiles, the unit of storage, snapshotting, and invalidation.
//! Surfaces are recycled through a process-wide pool since interactive edits churn
//! through tiles at high rates.

use crate::surface::PixelSurface;

/// Resolution level of a chunk. Chunk (i, j) covers the same canvas region at every
/// level; lower levels just hold fewer pixels for zoomed-out preview reads.
#[derive(strum::AsRefStr, strum::EnumIter, Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum ChunkResolution {
    #[default]
    Full,
    Half,
    Quarter,
    Eighth,
}

impl ChunkResolution {
    /// Divisor relative to full resolution.
    #[must_use]
    pub fn divisor(self) -> u32 {
        match self {
            Self::Full => 1,
            Self::Half => 2,
            Self::Quarter => 4,
            Self::Eighth => 8,
        }
    }
    #[must_use]
    pub fn multiplier(self) -> f64 {
        1.0 / f64::from(self.divisor())
    }
    /// Side length in pixels of a chunk at this resolution. Never rounds to zero,
    /// so tiny chunk sizes (used by tests) stay valid at every level.
    #[must_use]
    pub fn pixel_size(self, chunk_size: u32) -> u32 {
        (chunk_size / self.divisor()).max(1)
    }
}

// Pool of returned surfaces keyed by side length. The interactive loop allocates and
// frees a tile per touched chunk per tick; reuse keeps that out of the allocator.
static SURFACE_POOL: parking_lot::Mutex<Option<hashbrown::HashMap<u32, Vec<PixelSurface>>>> =
    parking_lot::const_mutex(None);

const MAX_POOLED_PER_SIZE: usize = 256;

fn pool_acquire(side: u32) -> PixelSurface {
    let mut guard = SURFACE_POOL.lock();
    let pool = guard.get_or_insert_with(hashbrown::HashMap::new);
    if let Some(mut surface) = pool.get_mut(&side).and_then(Vec::pop) {
        surface.clear();
        return surface;
    }
    PixelSurface::new_square(side)
}

fn pool_release(surface: PixelSurface) {
    let side = surface.size().x as u32;
    let mut guard = SURFACE_POOL.lock();
    let pool = guard.get_or_insert_with(hashbrown::HashMap::new);
    let returned = pool.entry(side).or_default();
    if returned.len() < MAX_POOLED_PER_SIZE {
        returned.push(surface);
    }
    // Else: drop. The pool bounds worst-case retention, not peak usage.
}

/// A single tile: a pooled square surface at a given resolution. The surface returns
/// to the pool when the chunk is dropped.
pub struct Chunk {
    resolution: ChunkResolution,
    surface: Option<PixelSurface>,
}

impl Chunk {
    /// A cleared chunk for the given full-resolution chunk size.
    #[must_use]
    pub fn new(resolution: ChunkResolution, chunk_size: u32) -> Self {
        Self {
            resolution,
            surface: Some(pool_acquire(resolution.pixel_size(chunk_size))),
        }
    }
    /// Wrap an existing surface (e.g. restored snapshot data) as a full-resolution chunk.
    #[must_use]
    pub fn from_surface(resolution: ChunkResolution, surface: PixelSurface) -> Self {
        Self { resolution, surface: Some(surface) }
    }
    #[must_use]
    pub fn resolution(&self) -> ChunkResolution {
        self.resolution
    }
    #[must_use]
    pub fn surface(&self) -> &PixelSurface {
        // Unwrap ok - surface is only None transiently inside drop.
        self.surface.as_ref().unwrap()
    }
    pub fn surface_mut(&mut self) -> &mut PixelSurface {
        self.surface.as_mut().unwrap()
    }
    /// Downscaled copy of this (full resolution) chunk at the requested level.
    #[must_use]
    pub fn derive_lower(&self, resolution: ChunkResolution) -> Chunk {
        debug_assert_eq!(self.resolution, ChunkResolution::Full);
        let full_side = self.surface().size().x as u32;
        let target_side = resolution.pixel_size(full_side);
        Chunk {
            resolution,
            surface: Some(self.surface().downscaled_by(full_side / target_side)),
        }
    }
    /// Deep pixel copy sharing nothing with self.
    #[must_use]
    pub fn deep_clone(&self) -> Chunk {
        Chunk {
            resolution: self.resolution,
            surface: Some(self.surface().clone()),
        }
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        if let Some(surface) = self.surface.take() {
            pool_release(surface);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolution_pixel_sizes() {
        assert_eq!(ChunkResolution::Full.pixel_size(256), 256);
        assert_eq!(ChunkResolution::Half.pixel_size(256), 128);
        assert_eq!(ChunkResolution::Eighth.pixel_size(256), 32);
        // Tiny test-sized chunks never collapse to zero.
        assert_eq!(ChunkResolution::Eighth.pixel_size(4), 1);
    }

    #[test]
    fn pooled_chunks_come_back_cleared() {
        let mut chunk = Chunk::new(ChunkResolution::Full, 16);
        let bounds = chunk.surface().bounds();
        chunk.surface_mut().fill_rect(
            bounds,
            crate::color::Color::BLACK.premultiply(),
            crate::blend::BlendMode::Src,
            None,
        );
        drop(chunk);
        let reused = Chunk::new(ChunkResolution::Full, 16);
        assert!(reused.surface().is_fully_transparent());
    }

    #[test]
    fn derive_lower_halves_size() {
        let chunk = Chunk::new(ChunkResolution::Full, 32);
        let half = chunk.derive_lower(ChunkResolution::Half);
        assert_eq!(half.surface().size().x, 16);
    }
}
