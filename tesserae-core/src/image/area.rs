//! Affected-area bookkeeping: the set of chunks an operation (or a whole queue)
//! touches, plus a tight global pixel rect where one is known. Only ever grows.

use crate::math::IRect;
use glam::IVec2;

#[derive(Clone, Debug, Default)]
pub struct AffectedArea {
    chunks: hashbrown::HashSet<IVec2>,
    global_rect: Option<IRect>,
}

impl AffectedArea {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn from_chunks(chunks: hashbrown::HashSet<IVec2>, global_rect: Option<IRect>) -> Self {
        Self { chunks, global_rect }
    }
    /// Every chunk intersecting `rect`.
    #[must_use]
    pub fn from_rect(rect: IRect, chunk_size: u32) -> Self {
        Self {
            chunks: crate::math::chunks_touching_rect(rect, chunk_size),
            global_rect: (!rect.is_empty()).then_some(rect),
        }
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
    #[must_use]
    pub fn chunks(&self) -> &hashbrown::HashSet<IVec2> {
        &self.chunks
    }
    #[must_use]
    pub fn global_rect(&self) -> Option<IRect> {
        self.global_rect
    }
    pub fn insert_chunk(&mut self, chunk: IVec2) {
        self.chunks.insert(chunk);
    }
    /// Monotonic union; the rect becomes the union of both rects (or whichever exists).
    pub fn union_with(&mut self, other: &AffectedArea) {
        self.chunks.extend(other.chunks.iter().copied());
        self.global_rect = match (self.global_rect, other.global_rect) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (one, two) => one.or(two),
        };
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn union_grows_monotonically() {
        let mut area = AffectedArea::from_rect(
            IRect::new(IVec2::ZERO, IVec2::splat(16)),
            16,
        );
        assert_eq!(area.chunks().len(), 1);
        let other = AffectedArea::from_rect(
            IRect::new(IVec2::new(16, 0), IVec2::splat(16)),
            16,
        );
        area.union_with(&other);
        assert_eq!(area.chunks().len(), 2);
        assert_eq!(
            area.global_rect(),
            Some(IRect::new(IVec2::ZERO, IVec2::new(32, 16)))
        );
    }
}
