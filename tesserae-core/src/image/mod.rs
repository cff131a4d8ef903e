//! # ChunkyImage
//! A raster image stored as a sparse map of fixed-size square chunks, mirrored at
//! lower preview resolutions. All mutation goes through a pending-operation queue:
//! enqueued primitives rasterize into a "latest" overlay of working chunks which is
//! either folded into committed storage wholesale ([`ChunkyImage::commit_changes`])
//! or dropped without a trace ([`ChunkyImage::cancel_changes`]). Partially applied
//! queues are never observable from the outside.
//!
//! Untouched chunks never allocate, so both memory and undo-snapshot cost scale with
//! the edit, not the canvas.

pub mod area;
mod operations;
pub mod snapshot;

pub use area::AffectedArea;
pub use operations::ShapeData;
pub use snapshot::CommittedChunkStorage;

use crate::blend::BlendMode;
use crate::chunk::{Chunk, ChunkResolution};
use crate::color::{Color, Premul};
use crate::math::{self, IRect, Path, ShapeCorners};
use crate::surface::{ClipMask, PixelSurface};
use glam::IVec2;
use operations::DrawOperation;
use std::sync::Arc;

pub const DEFAULT_CHUNK_SIZE: u32 = 256;

/// Committed chunk maps, one per resolution level. The full level is authoritative;
/// lower levels are always re-derived from it on commit, never computed separately.
#[derive(Default)]
struct CommittedLevels {
    full: hashbrown::HashMap<IVec2, Chunk>,
    half: hashbrown::HashMap<IVec2, Chunk>,
    quarter: hashbrown::HashMap<IVec2, Chunk>,
    eighth: hashbrown::HashMap<IVec2, Chunk>,
}

impl CommittedLevels {
    fn level(&self, resolution: ChunkResolution) -> &hashbrown::HashMap<IVec2, Chunk> {
        match resolution {
            ChunkResolution::Full => &self.full,
            ChunkResolution::Half => &self.half,
            ChunkResolution::Quarter => &self.quarter,
            ChunkResolution::Eighth => &self.eighth,
        }
    }
    fn remove_all_levels(&mut self, pos: IVec2) {
        self.full.remove(&pos);
        self.half.remove(&pos);
        self.quarter.remove(&pos);
        self.eighth.remove(&pos);
    }
}

/// Alpha content of a clipping mask, captured from its committed chunks when the
/// clip is applied. An absent chunk means that area is fully masked out.
struct RasterClip {
    chunks: hashbrown::HashMap<IVec2, PixelSurface>,
}

/// One queue slot: the area the enqueued operation (plus its symmetry mirrors)
/// touches. The pixels themselves are already rasterized into the latest overlay.
struct QueueEntry {
    area: AffectedArea,
}

pub struct ChunkyImage {
    chunk_size: u32,
    committed: CommittedLevels,
    /// Full-resolution working chunks holding committed content plus every queued
    /// operation rasterized on top.
    latest: hashbrown::HashMap<IVec2, Chunk>,
    queue: Vec<QueueEntry>,
    // Transient rasterization settings, reset on commit and cancel. Changes
    // re-apply these before enqueueing; they are not persisted image state.
    clip_path: Option<Arc<Path>>,
    raster_clips: Vec<RasterClip>,
    lock_transparency: bool,
    blend_mode: BlendMode,
    horizontal_symmetry_axis: Option<i32>,
    vertical_symmetry_axis: Option<i32>,
}

impl ChunkyImage {
    #[must_use]
    pub fn new(chunk_size: u32) -> Self {
        assert!(
            chunk_size.is_power_of_two(),
            "chunk size must be a power of two, got {chunk_size}"
        );
        Self {
            chunk_size,
            committed: CommittedLevels::default(),
            latest: hashbrown::HashMap::new(),
            queue: Vec::new(),
            clip_path: None,
            raster_clips: Vec::new(),
            lock_transparency: false,
            blend_mode: BlendMode::SrcOver,
            horizontal_symmetry_axis: None,
            vertical_symmetry_axis: None,
        }
    }
    #[must_use]
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    // --- transient rasterization settings ---

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }
    pub fn set_clipping_path(&mut self, path: Option<Path>) {
        self.clip_path = path.map(Arc::new);
    }
    pub fn enable_lock_transparency(&mut self) {
        self.lock_transparency = true;
    }
    pub fn set_horizontal_axis_of_symmetry(&mut self, axis_y: Option<i32>) {
        self.horizontal_symmetry_axis = axis_y;
    }
    pub fn set_vertical_axis_of_symmetry(&mut self, axis_x: Option<i32>) {
        self.vertical_symmetry_axis = axis_x;
    }
    /// Clip all subsequently enqueued operations to the committed alpha of `mask`.
    /// Multiple clips intersect.
    pub fn apply_raster_clip(&mut self, mask: &ChunkyImage) {
        let chunks = mask
            .committed
            .full
            .iter()
            .map(|(&pos, chunk)| (pos, chunk.surface().clone()))
            .collect();
        self.raster_clips.push(RasterClip { chunks });
    }

    // --- enqueueing ---

    pub fn enqueue_draw_rectangle(&mut self, data: ShapeData) {
        self.enqueue(Box::new(operations::RectangleOperation { data }));
    }
    pub fn enqueue_draw_ellipse(&mut self, rect: IRect, stroke: Color, fill: Color, stroke_width: i32) {
        self.enqueue(Box::new(operations::EllipseOperation {
            rect,
            stroke: stroke.premultiply(),
            fill: fill.premultiply(),
            stroke_width,
            blend: self.blend_mode,
        }));
    }
    pub fn enqueue_draw_line(&mut self, from: IVec2, to: IVec2, width: i32, color: Color) {
        self.enqueue(Box::new(operations::LineOperation {
            from,
            to,
            width,
            color: color.premultiply(),
            blend: self.blend_mode,
        }));
    }
    pub fn enqueue_draw_pixel(&mut self, pos: IVec2, color: Color) {
        self.enqueue_draw_pixels(vec![pos], color);
    }
    pub fn enqueue_draw_pixels(&mut self, pixels: Vec<IVec2>, color: Color) {
        self.enqueue(Box::new(operations::PixelsOperation {
            pixels: pixels.into(),
            color: color.premultiply(),
            blend: self.blend_mode,
        }));
    }
    pub fn enqueue_fill_path(&mut self, path: Path, color: Color) {
        self.enqueue(Box::new(operations::PathFillOperation {
            path: Arc::new(path),
            color: color.premultiply(),
            blend: self.blend_mode,
        }));
    }
    pub fn enqueue_draw_image(&mut self, pos: IVec2, image: Arc<PixelSurface>) {
        self.enqueue(Box::new(operations::ImageOperation {
            image,
            placement: operations::ImagePlacement::At(pos),
            blend: self.blend_mode,
        }));
    }
    /// Blit an image mapped onto arbitrary corners (transform preview/commit).
    pub fn enqueue_draw_image_corners(&mut self, corners: ShapeCorners, image: Arc<PixelSurface>) {
        self.enqueue(Box::new(operations::ImageOperation {
            image,
            placement: operations::ImagePlacement::Corners(corners),
            blend: self.blend_mode,
        }));
    }
    pub fn enqueue_clear_region(&mut self, rect: IRect) {
        self.enqueue(Box::new(operations::ClearRegionOperation { rect }));
    }
    /// Erase everything: every committed and pending chunk becomes transparent.
    pub fn enqueue_clear(&mut self) {
        let all = self.find_all_chunks();
        let mut area = AffectedArea::new();
        for pos in &all {
            area.insert_chunk(*pos);
        }
        for pos in all {
            let chunk = self.get_or_create_latest(pos);
            chunk.surface_mut().clear();
        }
        self.queue.push(QueueEntry { area });
    }

    /// Replace one chunk's content outright, bypassing symmetry, clips, and the
    /// configured blend mode. Snapshot restoration comes through here.
    pub(crate) fn enqueue_replace_chunk(&mut self, pos: IVec2, content: PixelSurface) {
        let area = AffectedArea::from_rect(math::chunk_pixel_rect(pos, self.chunk_size), self.chunk_size);
        let chunk = self.get_or_create_latest(pos);
        *chunk.surface_mut() = content;
        self.queue.push(QueueEntry { area });
    }
    pub(crate) fn enqueue_erase_chunk(&mut self, pos: IVec2) {
        let area = AffectedArea::from_rect(math::chunk_pixel_rect(pos, self.chunk_size), self.chunk_size);
        let chunk = self.get_or_create_latest(pos);
        chunk.surface_mut().clear();
        self.queue.push(QueueEntry { area });
    }

    fn enqueue(&mut self, op: Box<dyn DrawOperation>) {
        // Symmetry expands one enqueue into up to four rasterized variants, all
        // reported as a single queue slot.
        let mut variants: smallvec::SmallVec<[Box<dyn DrawOperation>; 4]> =
            smallvec::SmallVec::new();
        if let Some(x) = self.vertical_symmetry_axis {
            variants.push(op.mirrored(Some(x), None));
        }
        if let Some(y) = self.horizontal_symmetry_axis {
            variants.push(op.mirrored(None, Some(y)));
        }
        if let (Some(x), Some(y)) = (self.vertical_symmetry_axis, self.horizontal_symmetry_axis) {
            variants.push(op.mirrored(Some(x), Some(y)));
        }
        variants.push(op);

        let mut area = AffectedArea::new();
        for variant in &variants {
            area.union_with(&variant.affected_area(self.chunk_size));
        }
        for variant in &variants {
            let touched = variant.affected_area(self.chunk_size);
            for &pos in touched.chunks() {
                self.rasterize_into_chunk(variant.as_ref(), pos);
            }
        }
        self.queue.push(QueueEntry { area });
    }

    fn rasterize_into_chunk(&mut self, op: &dyn DrawOperation, pos: IVec2) {
        // A chunk absent from any raster clip is fully masked out; skip entirely.
        if self.raster_clips.iter().any(|clip| !clip.chunks.contains_key(&pos)) {
            return;
        }
        let origin = pos * self.chunk_size as i32;
        let side = ChunkResolution::Full.pixel_size(self.chunk_size) as i32;
        let clip_mask = self.clip_path.as_ref().map(|path| {
            ClipMask::from_path(&path.translated(-origin.as_dvec2()), IVec2::splat(side))
        });

        let plain = self.raster_clips.is_empty() && !self.lock_transparency;
        if plain {
            let chunk = self.get_or_create_latest(pos);
            op.draw(chunk.surface_mut(), origin, clip_mask.as_ref());
            return;
        }

        // Draw on a copy, then fold back through the clip masks so arbitrary blend
        // modes (erase included) stay confined to the clipped region.
        let mut drawn = self.get_or_create_latest(pos).surface().clone();
        op.draw(&mut drawn, origin, clip_mask.as_ref());
        if !self.raster_clips.is_empty() {
            let mut combined = self.raster_clips[0].chunks[&pos].clone();
            for clip in &self.raster_clips[1..] {
                combined.clamp_alpha(&clip.chunks[&pos]);
            }
            self.latest
                .get_mut(&pos)
                .unwrap()
                .surface_mut()
                .merge_masked(&drawn, &combined);
        } else {
            *self.latest.get_mut(&pos).unwrap().surface_mut() = drawn;
        }
        if self.lock_transparency {
            match self.committed.full.get(&pos) {
                Some(committed) => {
                    let committed = committed.surface().clone();
                    self.latest
                        .get_mut(&pos)
                        .unwrap()
                        .surface_mut()
                        .clamp_alpha(&committed);
                }
                // No committed content here: transparency lock forbids any alpha.
                None => self.latest.get_mut(&pos).unwrap().surface_mut().clear(),
            }
        }
    }

    fn get_or_create_latest(&mut self, pos: IVec2) -> &mut Chunk {
        let chunk_size = self.chunk_size;
        let committed = &self.committed.full;
        self.latest.entry(pos).or_insert_with(|| {
            let mut chunk = Chunk::new(ChunkResolution::Full, chunk_size);
            if let Some(existing) = committed.get(&pos) {
                *chunk.surface_mut() = existing.surface().clone();
            }
            chunk
        })
    }

    // --- queue inspection ---

    /// Number of pending queue slots. Callers snapshot this before enqueueing to
    /// later ask for the delta via [`Self::find_affected_area`].
    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.queue.len()
    }
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        !self.queue.is_empty()
    }
    /// Area touched by queue slots from `since` onward.
    #[must_use]
    pub fn find_affected_area_since(&self, since: usize) -> AffectedArea {
        let mut area = AffectedArea::new();
        for entry in self.queue.iter().skip(since) {
            area.union_with(&entry.area);
        }
        area
    }
    /// Area touched by the whole pending queue.
    #[must_use]
    pub fn find_affected_area(&self) -> AffectedArea {
        self.find_affected_area_since(0)
    }
    #[must_use]
    pub fn find_affected_chunks(&self) -> hashbrown::HashSet<IVec2> {
        self.find_affected_area().chunks().clone()
    }
    /// Every chunk with committed or pending content.
    #[must_use]
    pub fn find_all_chunks(&self) -> hashbrown::HashSet<IVec2> {
        let mut all: hashbrown::HashSet<IVec2> = self.committed.full.keys().copied().collect();
        all.extend(self.latest.keys().copied());
        for entry in &self.queue {
            all.extend(entry.area.chunks().iter().copied());
        }
        all
    }

    // --- commit / cancel ---

    /// Fold the whole pending queue into committed storage at every resolution
    /// level and clear the queue. After this the affected area is visible to all
    /// readers and can no longer be cancelled.
    pub fn commit_changes(&mut self) {
        log::trace!(
            "committing {} queued operations over {} chunks",
            self.queue.len(),
            self.latest.len()
        );
        for (pos, chunk) in self.latest.drain() {
            if chunk.surface().is_fully_transparent() {
                // Fully transparent tiles are indistinguishable from absent ones;
                // keep the map sparse.
                self.committed.remove_all_levels(pos);
                continue;
            }
            self.committed.half.insert(pos, chunk.derive_lower(ChunkResolution::Half));
            self.committed.quarter.insert(pos, chunk.derive_lower(ChunkResolution::Quarter));
            self.committed.eighth.insert(pos, chunk.derive_lower(ChunkResolution::Eighth));
            self.committed.full.insert(pos, chunk);
        }
        self.queue.clear();
        self.reset_transient_settings();
    }

    /// Discard the queue without effect. "Undo the temporary preview, not the
    /// committed state."
    pub fn cancel_changes(&mut self) {
        log::trace!("cancelling {} queued operations", self.queue.len());
        self.latest.clear();
        self.queue.clear();
        self.reset_transient_settings();
    }

    fn reset_transient_settings(&mut self) {
        self.clip_path = None;
        self.raster_clips.clear();
        self.lock_transparency = false;
        self.blend_mode = BlendMode::SrcOver;
        self.horizontal_symmetry_axis = None;
        self.vertical_symmetry_axis = None;
    }

    // --- reads ---

    #[must_use]
    pub fn latest_or_committed_chunk_exists(&self, pos: IVec2) -> bool {
        self.latest.contains_key(&pos) || self.committed.full.contains_key(&pos)
    }

    pub(crate) fn committed_chunk(&self, pos: IVec2, resolution: ChunkResolution) -> Option<&Chunk> {
        self.committed.level(resolution).get(&pos)
    }

    /// Union of the pixel rects of every chunk with content, committed or pending.
    #[must_use]
    pub fn find_chunk_aligned_most_up_to_date_bounds(&self) -> Option<IRect> {
        let mut bounds: Option<IRect> = None;
        for pos in self.find_all_chunks() {
            let rect = math::chunk_pixel_rect(pos, self.chunk_size);
            bounds = Some(bounds.map_or(rect, |b| b.union(rect)));
        }
        bounds
    }

    /// Tight pixel bounds of non-transparent content, committed or pending.
    #[must_use]
    pub fn find_latest_bounds(&self) -> Option<IRect> {
        let mut bounds: Option<IRect> = None;
        let mut consider = |pos: IVec2, surface: &PixelSurface| {
            if let Some(tight) = surface.tight_bounds() {
                let global = tight.translate(pos * self.chunk_size as i32);
                bounds = Some(bounds.map_or(global, |b| b.union(global)));
            }
        };
        for (&pos, chunk) in &self.committed.full {
            if !self.latest.contains_key(&pos) {
                consider(pos, chunk.surface());
            }
        }
        for (&pos, chunk) in &self.latest {
            consider(pos, chunk.surface());
        }
        bounds
    }

    /// Most up-to-date view of one chunk blitted onto `target` at `offset`.
    /// Returns false (drawing nothing) if the chunk has no content at all.
    pub fn draw_most_up_to_date_chunk_on(
        &self,
        pos: IVec2,
        resolution: ChunkResolution,
        target: &mut PixelSurface,
        offset: IVec2,
        blend: BlendMode,
        opacity: u8,
    ) -> bool {
        if let Some(chunk) = self.latest.get(&pos) {
            // Pending content only exists at full resolution; scale on the fly.
            if resolution == ChunkResolution::Full {
                target.blit(chunk.surface(), offset, blend, opacity, None);
            } else {
                let scaled = chunk.derive_lower(resolution);
                target.blit(scaled.surface(), offset, blend, opacity, None);
            }
            return true;
        }
        if let Some(chunk) = self.committed.level(resolution).get(&pos) {
            target.blit(chunk.surface(), offset, blend, opacity, None);
            return true;
        }
        false
    }

    /// Read-only composite of an image-space region onto an external surface.
    /// `bounds` is in full-resolution pixels; output lands at `offset` on the
    /// target, scaled by the resolution.
    pub fn draw_most_up_to_date_region_on(
        &self,
        bounds: IRect,
        resolution: ChunkResolution,
        target: &mut PixelSurface,
        offset: IVec2,
    ) {
        let divisor = resolution.divisor() as i32;
        for pos in math::chunks_touching_rect(bounds, self.chunk_size) {
            if !self.latest_or_committed_chunk_exists(pos) {
                continue;
            }
            let chunk_rect = math::chunk_pixel_rect(pos, self.chunk_size);
            let part = chunk_rect.intersect(bounds);
            if part.is_empty() {
                continue;
            }
            let side = resolution.pixel_size(self.chunk_size) as i32;
            let mut scratch = PixelSurface::new(IVec2::splat(side));
            self.draw_most_up_to_date_chunk_on(
                pos,
                resolution,
                &mut scratch,
                IVec2::ZERO,
                BlendMode::Src,
                255,
            );
            let local = IRect::new((part.pos - chunk_rect.pos) / divisor, (part.size / divisor).max(IVec2::ONE));
            let piece = scratch.sub_surface(local);
            target.blit(
                &piece,
                offset + (part.pos - bounds.pos) / divisor,
                BlendMode::SrcOver,
                255,
                None,
            );
        }
    }

    /// Deep copy of the committed state only, pending queue excluded.
    #[must_use]
    pub fn deep_clone_committed(&self) -> ChunkyImage {
        let mut clone = ChunkyImage::new(self.chunk_size);
        for (&pos, chunk) in &self.committed.full {
            clone.committed.full.insert(pos, chunk.deep_clone());
        }
        for (&pos, chunk) in &self.committed.half {
            clone.committed.half.insert(pos, chunk.deep_clone());
        }
        for (&pos, chunk) in &self.committed.quarter {
            clone.committed.quarter.insert(pos, chunk.deep_clone());
        }
        for (&pos, chunk) in &self.committed.eighth {
            clone.committed.eighth.insert(pos, chunk.deep_clone());
        }
        clone
    }

    /// Committed pixel at a full-resolution position; transparent where absent.
    #[must_use]
    pub fn committed_pixel(&self, pos: IVec2) -> Premul {
        let chunk_pos = math::chunk_pos_of(pos, self.chunk_size);
        match self.committed.full.get(&chunk_pos) {
            Some(chunk) => chunk
                .surface()
                .pixel(pos - chunk_pos * self.chunk_size as i32),
            None => Premul::TRANSPARENT,
        }
    }
    /// Most up-to-date pixel (pending overlay included); transparent where absent.
    #[must_use]
    pub fn latest_pixel(&self, pos: IVec2) -> Premul {
        let chunk_pos = math::chunk_pos_of(pos, self.chunk_size);
        if let Some(chunk) = self.latest.get(&chunk_pos) {
            return chunk
                .surface()
                .pixel(pos - chunk_pos * self.chunk_size as i32);
        }
        self.committed_pixel(pos)
    }
}

impl Drop for ChunkyImage {
    fn drop(&mut self) {
        if !self.queue.is_empty() {
            // Dropping an image with an unresolved queue means some change skipped
            // its commit/cancel obligation; flag it rather than silently losing work.
            log::warn!(
                "ChunkyImage dropped with {} uncommitted queued operations",
                self.queue.len()
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn red() -> Color {
        Color::new(255, 0, 0, 255)
    }

    #[test]
    fn enqueue_does_not_touch_committed() {
        let mut image = ChunkyImage::new(16);
        image.enqueue_draw_line(IVec2::new(0, 0), IVec2::new(10, 0), 1, red());
        assert_eq!(image.committed_pixel(IVec2::new(5, 0)), Premul::TRANSPARENT);
        assert_eq!(image.latest_pixel(IVec2::new(5, 0)), red().premultiply());
        image.cancel_changes();
        assert_eq!(image.latest_pixel(IVec2::new(5, 0)), Premul::TRANSPARENT);
        assert_eq!(image.queue_length(), 0);
    }

    #[test]
    fn commit_makes_content_visible_and_clears_queue() {
        let mut image = ChunkyImage::new(16);
        image.enqueue_draw_line(IVec2::new(0, 0), IVec2::new(50, 0), 1, red());
        let affected = image.find_affected_chunks();
        let expected: hashbrown::HashSet<_> = (0..4).map(|x| IVec2::new(x, 0)).collect();
        assert_eq!(affected, expected);
        image.commit_changes();
        assert_eq!(image.queue_length(), 0);
        assert_eq!(image.committed_pixel(IVec2::new(50, 0)), red().premultiply());
        assert_eq!(image.find_all_chunks(), expected);
    }

    #[test]
    fn commit_prunes_fully_transparent_chunks() {
        let mut image = ChunkyImage::new(16);
        image.enqueue_draw_pixel(IVec2::new(4, 4), red());
        image.commit_changes();
        assert_eq!(image.find_all_chunks().len(), 1);
        image.enqueue_clear();
        image.commit_changes();
        assert!(image.find_all_chunks().is_empty());
    }

    #[test]
    fn lower_resolutions_follow_commits() {
        let mut image = ChunkyImage::new(16);
        image.enqueue_draw_rectangle(ShapeData {
            center: glam::DVec2::splat(8.0),
            size: glam::DVec2::splat(16.0),
            angle: 0.0,
            stroke_width: 0,
            stroke: Premul::TRANSPARENT,
            fill: red().premultiply(),
            blend: BlendMode::SrcOver,
        });
        image.commit_changes();
        let half = image
            .committed_chunk(IVec2::ZERO, ChunkResolution::Half)
            .expect("half-res mirror must exist");
        assert_eq!(half.surface().size(), IVec2::splat(8));
        assert_eq!(half.surface().pixel(IVec2::new(3, 3)), red().premultiply());
    }

    #[test]
    fn symmetry_duplicates_draws() {
        let mut image = ChunkyImage::new(16);
        image.set_vertical_axis_of_symmetry(Some(8));
        image.enqueue_draw_pixel(IVec2::new(2, 3), red());
        image.commit_changes();
        assert_eq!(image.committed_pixel(IVec2::new(2, 3)), red().premultiply());
        // 2*8 - 2 - 1 = 13
        assert_eq!(image.committed_pixel(IVec2::new(13, 3)), red().premultiply());
    }

    #[test]
    fn lock_transparency_confines_paint_to_existing_alpha() {
        let mut image = ChunkyImage::new(16);
        image.enqueue_draw_pixel(IVec2::new(1, 1), red());
        image.commit_changes();
        image.enable_lock_transparency();
        let green = Color::new(0, 255, 0, 255);
        image.enqueue_draw_rectangle(ShapeData {
            center: glam::DVec2::splat(8.0),
            size: glam::DVec2::splat(16.0),
            angle: 0.0,
            stroke_width: 0,
            stroke: Premul::TRANSPARENT,
            fill: green.premultiply(),
            blend: BlendMode::SrcOver,
        });
        image.commit_changes();
        assert_eq!(image.committed_pixel(IVec2::new(1, 1)), green.premultiply());
        assert_eq!(image.committed_pixel(IVec2::new(5, 5)), Premul::TRANSPARENT);
    }

    #[test]
    fn clipping_path_restricts_draws() {
        let mut image = ChunkyImage::new(16);
        image.set_clipping_path(Some(Path::from_rect(crate::math::Rect::new(
            glam::DVec2::ZERO,
            glam::DVec2::new(4.0, 4.0),
        ))));
        image.enqueue_draw_line(IVec2::new(0, 2), IVec2::new(15, 2), 1, red());
        image.commit_changes();
        assert_eq!(image.committed_pixel(IVec2::new(2, 2)), red().premultiply());
        assert_eq!(image.committed_pixel(IVec2::new(10, 2)), Premul::TRANSPARENT);
    }

    #[test]
    fn raster_clip_masks_out_absent_chunks() {
        let mut mask = ChunkyImage::new(16);
        mask.enqueue_draw_pixel(IVec2::new(3, 3), Color::WHITE);
        mask.commit_changes();

        let mut image = ChunkyImage::new(16);
        image.apply_raster_clip(&mask);
        // Chunk (1, 0) has no mask content at all - the draw there must vanish.
        image.enqueue_draw_line(IVec2::new(0, 3), IVec2::new(30, 3), 1, red());
        image.commit_changes();
        assert_eq!(image.committed_pixel(IVec2::new(3, 3)), red().premultiply());
        assert_eq!(image.committed_pixel(IVec2::new(2, 3)), Premul::TRANSPARENT);
        assert_eq!(image.committed_pixel(IVec2::new(20, 3)), Premul::TRANSPARENT);
    }

    #[test]
    fn affected_area_since_reports_only_new_slots() {
        let mut image = ChunkyImage::new(16);
        image.enqueue_draw_pixel(IVec2::new(1, 1), red());
        let mark = image.queue_length();
        image.enqueue_draw_pixel(IVec2::new(40, 1), red());
        let since = image.find_affected_area_since(mark);
        assert_eq!(since.chunks().len(), 1);
        assert!(since.chunks().contains(&IVec2::new(2, 0)));
        image.cancel_changes();
    }
}
