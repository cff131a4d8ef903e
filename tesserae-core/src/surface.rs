//! # Pixel surfaces
//! The engine's tiled-surface capability: an owned premultiplied-RGBA buffer with the
//! aliased draw primitives the operation queue rasterizes through. Chunks, snapshot
//! storage, and scratch composites are all `PixelSurface`s of various sizes.
//!
//! Everything here is deliberately deterministic - the same queue replayed over the
//! same committed state must produce bit-identical pixels, which rules out any
//! coverage-based anti-aliasing at this layer.

use crate::blend::BlendMode;
use crate::color::Premul;
use crate::math::{IRect, Path};
use glam::{DAffine2, DVec2, IVec2};

/// Rasterized clip coverage for one surface, in surface-local pixel coordinates.
/// Draw calls skip every pixel the mask excludes.
pub struct ClipMask {
    size: IVec2,
    inside: bitvec::vec::BitVec,
}

impl ClipMask {
    /// Rasterize a path (already transformed into surface-local coordinates) into
    /// a coverage mask. Pixel centers decide coverage, even-odd rule.
    #[must_use]
    pub fn from_path(path: &Path, size: IVec2) -> Self {
        let mut inside = bitvec::vec::BitVec::repeat(false, (size.x * size.y).max(0) as usize);
        for y in 0..size.y {
            let spans = path.scanline_spans(f64::from(y) + 0.5);
            for (x0, x1) in spans {
                let x0 = (x0.ceil() as i32).max(0);
                // Span is half-open over pixel centers.
                let x1 = (x1.ceil() as i32).min(size.x);
                for x in x0..x1 {
                    inside.set((y * size.x + x) as usize, true);
                }
            }
        }
        Self { size, inside }
    }
    #[must_use]
    pub fn contains(&self, pos: IVec2) -> bool {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.size.x || pos.y >= self.size.y {
            return false;
        }
        self.inside[(pos.y * self.size.x + pos.x) as usize]
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PixelSurface {
    size: IVec2,
    pixels: Vec<Premul>,
}

impl PixelSurface {
    /// A fully transparent surface. Panics on non-positive dimensions.
    #[must_use]
    pub fn new(size: IVec2) -> Self {
        assert!(
            size.x > 0 && size.y > 0,
            "surface dimensions must be positive, got {size}"
        );
        Self {
            size,
            pixels: vec![Premul::TRANSPARENT; (size.x * size.y) as usize],
        }
    }
    #[must_use]
    pub fn new_square(side: u32) -> Self {
        Self::new(IVec2::splat(side as i32))
    }
    #[must_use]
    pub fn size(&self) -> IVec2 {
        self.size
    }
    #[must_use]
    pub fn bounds(&self) -> IRect {
        IRect::new(IVec2::ZERO, self.size)
    }
    /// Raw premultiplied bytes, row-major RGBA.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Out-of-bounds reads are transparent; the sparse chunk model treats absent
    /// pixels and transparent pixels identically.
    #[must_use]
    pub fn pixel(&self, pos: IVec2) -> Premul {
        if !self.bounds().contains(pos) {
            return Premul::TRANSPARENT;
        }
        self.pixels[(pos.y * self.size.x + pos.x) as usize]
    }
    pub fn set_pixel(&mut self, pos: IVec2, pixel: Premul) {
        if self.bounds().contains(pos) {
            self.pixels[(pos.y * self.size.x + pos.x) as usize] = pixel;
        }
    }
    pub fn blend_pixel(&mut self, pos: IVec2, src: Premul, mode: BlendMode, clip: Option<&ClipMask>) {
        if !self.bounds().contains(pos) {
            return;
        }
        if let Some(clip) = clip {
            if !clip.contains(pos) {
                return;
            }
        }
        let idx = (pos.y * self.size.x + pos.x) as usize;
        self.pixels[idx] = mode.blend(src, self.pixels[idx]);
    }

    pub fn clear(&mut self) {
        self.pixels.fill(Premul::TRANSPARENT);
    }
    pub fn clear_rect(&mut self, rect: IRect, clip: Option<&ClipMask>) {
        let rect = rect.intersect(self.bounds());
        for y in rect.top()..rect.bottom() {
            for x in rect.left()..rect.right() {
                self.blend_pixel(IVec2::new(x, y), Premul::TRANSPARENT, BlendMode::Src, clip);
            }
        }
    }

    pub fn fill_rect(&mut self, rect: IRect, src: Premul, mode: BlendMode, clip: Option<&ClipMask>) {
        let rect = rect.intersect(self.bounds());
        for y in rect.top()..rect.bottom() {
            for x in rect.left()..rect.right() {
                self.blend_pixel(IVec2::new(x, y), src, mode, clip);
            }
        }
    }

    /// Even-odd scanline fill over pixel centers. Multiple subpaths compose, so a
    /// rectangle ring is just outer + inner quad.
    pub fn fill_path(&mut self, path: &Path, src: Premul, mode: BlendMode, clip: Option<&ClipMask>) {
        let bounds = path.bounds().round_outwards().intersect(self.bounds());
        for y in bounds.top()..bounds.bottom() {
            for (x0, x1) in path.scanline_spans(f64::from(y) + 0.5) {
                let x0 = (x0.ceil() as i32).max(bounds.left());
                let x1 = (x1.ceil() as i32).min(bounds.right());
                for x in x0..x1 {
                    self.blend_pixel(IVec2::new(x, y), src, mode, clip);
                }
            }
        }
    }

    /// One-pixel-wide bresenham line, endpoints included.
    pub fn draw_line(&mut self, from: IVec2, to: IVec2, src: Premul, mode: BlendMode, clip: Option<&ClipMask>) {
        for pos in bresenham(from, to) {
            self.blend_pixel(pos, src, mode, clip);
        }
    }

    /// Aliased ellipse fill inscribed in `rect`, row spans from the ellipse equation.
    pub fn fill_ellipse(&mut self, rect: IRect, src: Premul, mode: BlendMode, clip: Option<&ClipMask>) {
        if rect.is_empty() {
            return;
        }
        let radii = rect.size.as_dvec2() / 2.0;
        let center = rect.as_rect().center();
        for y in rect.top()..rect.bottom() {
            let dy = (f64::from(y) + 0.5 - center.y) / radii.y;
            let span = 1.0 - dy * dy;
            if span < 0.0 {
                continue;
            }
            let dx = radii.x * span.sqrt();
            let x0 = ((center.x - dx).ceil() as i32).max(rect.left());
            let x1 = ((center.x + dx).ceil() as i32).min(rect.right());
            for x in x0..x1 {
                self.blend_pixel(IVec2::new(x, y), src, mode, clip);
            }
        }
    }

    /// Aliased one-pixel ellipse outline. Parametric dual iteration (x-major and
    /// y-major sweeps) keeps the outline gap-free without coverage math.
    pub fn draw_ellipse_outline(&mut self, rect: IRect, src: Premul, mode: BlendMode, clip: Option<&ClipMask>) {
        for pos in ellipse_outline_points(rect) {
            self.blend_pixel(pos, src, mode, clip);
        }
    }

    pub fn draw_pixels(&mut self, pixels: &[IVec2], src: Premul, mode: BlendMode, clip: Option<&ClipMask>) {
        for &pos in pixels {
            self.blend_pixel(pos, src, mode, clip);
        }
    }

    /// Blit `src` with its top-left at `offset`. `opacity` scales source alpha.
    pub fn blit(
        &mut self,
        src: &PixelSurface,
        offset: IVec2,
        mode: BlendMode,
        opacity: u8,
        clip: Option<&ClipMask>,
    ) {
        let dst_rect = IRect::new(offset, src.size).intersect(self.bounds());
        for y in dst_rect.top()..dst_rect.bottom() {
            for x in dst_rect.left()..dst_rect.right() {
                let pos = IVec2::new(x, y);
                let mut pixel = src.pixel(pos - offset);
                if opacity != 255 {
                    pixel = pixel.scale_alpha(opacity);
                }
                self.blend_pixel(pos, pixel, mode, clip);
            }
        }
    }

    /// Inverse-mapped nearest-neighbour blit: for each destination pixel inside
    /// `dst_bounds`, sample `src` at `dst_to_src * center`.
    pub fn blit_transformed(
        &mut self,
        src: &PixelSurface,
        dst_bounds: IRect,
        dst_to_src: DAffine2,
        mode: BlendMode,
        clip: Option<&ClipMask>,
    ) {
        let dst_rect = dst_bounds.intersect(self.bounds());
        for y in dst_rect.top()..dst_rect.bottom() {
            for x in dst_rect.left()..dst_rect.right() {
                let center = DVec2::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                let sampled = dst_to_src.transform_point2(center).floor().as_ivec2();
                if !src.bounds().contains(sampled) {
                    continue;
                }
                self.blend_pixel(IVec2::new(x, y), src.pixel(sampled), mode, clip);
            }
        }
    }

    /// Copy of a region; areas outside this surface come out transparent.
    #[must_use]
    pub fn sub_surface(&self, rect: IRect) -> PixelSurface {
        let mut out = PixelSurface::new(rect.size.max(IVec2::ONE));
        for y in 0..rect.size.y {
            for x in 0..rect.size.x {
                let pos = IVec2::new(x, y);
                out.set_pixel(pos, self.pixel(rect.pos + pos));
            }
        }
        out
    }

    /// Multiply own alpha by the other surface's alpha channel (`DstIn`). Both the
    /// lock-transparency flag and mask clipping reduce to this.
    pub fn clamp_alpha(&mut self, mask: &PixelSurface) {
        debug_assert_eq!(self.size, mask.size);
        for (dst, m) in self.pixels.iter_mut().zip(&mask.pixels) {
            *dst = BlendMode::DstIn.blend(*m, *dst);
        }
    }

    /// Select between `drawn` and the current content per pixel, weighted by the
    /// mask's alpha: full mask alpha takes the drawn pixel, zero keeps the original.
    /// This is how raster clips apply an operation's output only inside the mask
    /// while preserving arbitrary blend modes (including erase) of the draw itself.
    pub fn merge_masked(&mut self, drawn: &PixelSurface, mask: &PixelSurface) {
        debug_assert_eq!(self.size, drawn.size);
        debug_assert_eq!(self.size, mask.size);
        for ((dst, src), m) in self.pixels.iter_mut().zip(&drawn.pixels).zip(&mask.pixels) {
            let t = m.alpha();
            *dst = Premul([
                lerp_by(dst.0[0], src.0[0], t),
                lerp_by(dst.0[1], src.0[1], t),
                lerp_by(dst.0[2], src.0[2], t),
                lerp_by(dst.0[3], src.0[3], t),
            ]);
        }
    }

    /// Box-filtered downscale by an integer factor; dimensions must divide evenly.
    #[must_use]
    pub fn downscaled_by(&self, factor: u32) -> PixelSurface {
        let factor = factor as i32;
        debug_assert!(self.size.x % factor == 0 && self.size.y % factor == 0);
        let mut out = PixelSurface::new(self.size / factor);
        let samples = (factor * factor) as u32;
        for y in 0..out.size.y {
            for x in 0..out.size.x {
                let mut sum = [0u32; 4];
                for sy in 0..factor {
                    for sx in 0..factor {
                        let p = self.pixel(IVec2::new(x * factor + sx, y * factor + sy));
                        for (acc, ch) in sum.iter_mut().zip(p.0) {
                            *acc += u32::from(ch);
                        }
                    }
                }
                out.set_pixel(
                    IVec2::new(x, y),
                    Premul(sum.map(|ch| ((ch + samples / 2) / samples) as u8)),
                );
            }
        }
        out
    }

    #[must_use]
    pub fn is_fully_transparent(&self) -> bool {
        self.pixels.iter().all(|p| p.is_transparent())
    }

    /// Tight bounds of non-transparent content, or None if empty.
    #[must_use]
    pub fn tight_bounds(&self) -> Option<IRect> {
        let mut min = IVec2::MAX;
        let mut max = IVec2::MIN;
        for y in 0..self.size.y {
            for x in 0..self.size.x {
                if !self.pixel(IVec2::new(x, y)).is_transparent() {
                    min = min.min(IVec2::new(x, y));
                    max = max.max(IVec2::new(x, y));
                }
            }
        }
        (min.x != i32::MAX).then(|| IRect::from_two_points(min, max))
    }
}

/// a + (b - a) * t/255 without leaving u8.
#[inline]
fn lerp_by(a: u8, b: u8, t: u8) -> u8 {
    let a = i32::from(a);
    let b = i32::from(b);
    let t = i32::from(t);
    (a + ((b - a) * t + 127) / 255).clamp(0, 255) as u8
}

/// All points of the bresenham line between the two endpoints, inclusive.
#[must_use]
pub fn bresenham(from: IVec2, to: IVec2) -> Vec<IVec2> {
    let mut points = Vec::new();
    let delta = (to - from).abs();
    let step = IVec2::new(
        if from.x < to.x { 1 } else { -1 },
        if from.y < to.y { 1 } else { -1 },
    );
    let mut err = delta.x - delta.y;
    let mut pos = from;
    loop {
        points.push(pos);
        if pos == to {
            break;
        }
        let double_err = err * 2;
        if double_err > -delta.y {
            err -= delta.y;
            pos.x += step.x;
        }
        if double_err < delta.x {
            err += delta.x;
            pos.y += step.y;
        }
    }
    points
}

/// Pixel positions of an aliased ellipse outline inscribed in `rect`, deduplicated.
#[must_use]
pub fn ellipse_outline_points(rect: IRect) -> hashbrown::HashSet<IVec2> {
    let mut points = hashbrown::HashSet::new();
    if rect.is_empty() {
        return points;
    }
    let radii = rect.size.as_dvec2() / 2.0;
    let center = rect.as_rect().center();
    let clamp_into = |v: f64, lo: i32, hi: i32| (v.floor() as i32).clamp(lo, hi - 1);
    // X-major sweep: one pixel per column on top and bottom arcs.
    for x in rect.left()..rect.right() {
        let dx = (f64::from(x) + 0.5 - center.x) / radii.x;
        let dy = radii.y * (1.0 - dx * dx).max(0.0).sqrt();
        points.insert(IVec2::new(x, clamp_into(center.y - dy, rect.top(), rect.bottom())));
        points.insert(IVec2::new(x, clamp_into(center.y + dy, rect.top(), rect.bottom())));
    }
    // Y-major sweep fills the steep flanks the x sweep skips over.
    for y in rect.top()..rect.bottom() {
        let dy = (f64::from(y) + 0.5 - center.y) / radii.y;
        let dx = radii.x * (1.0 - dy * dy).max(0.0).sqrt();
        points.insert(IVec2::new(clamp_into(center.x - dx, rect.left(), rect.right()), y));
        points.insert(IVec2::new(clamp_into(center.x + dx, rect.left(), rect.right()), y));
    }
    points
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::Color;

    fn red() -> Premul {
        Color::new(255, 0, 0, 255).premultiply()
    }

    #[test]
    fn fill_rect_clips_to_surface() {
        let mut surface = PixelSurface::new_square(8);
        surface.fill_rect(
            IRect::new(IVec2::new(6, 6), IVec2::new(10, 10)),
            red(),
            BlendMode::Src,
            None,
        );
        assert_eq!(surface.pixel(IVec2::new(7, 7)), red());
        assert_eq!(surface.pixel(IVec2::new(5, 5)), Premul::TRANSPARENT);
    }

    #[test]
    fn bresenham_is_symmetric_in_length() {
        let forward = bresenham(IVec2::new(0, 0), IVec2::new(10, 3));
        let backward = bresenham(IVec2::new(10, 3), IVec2::new(0, 0));
        assert_eq!(forward.len(), backward.len());
        assert_eq!(forward.first(), Some(&IVec2::new(0, 0)));
        assert_eq!(forward.last(), Some(&IVec2::new(10, 3)));
    }

    #[test]
    fn ellipse_outline_stays_in_rect() {
        let rect = IRect::new(IVec2::new(0, 0), IVec2::new(9, 5));
        for point in ellipse_outline_points(rect) {
            assert!(rect.contains(point), "{point} outside {rect:?}");
        }
    }

    #[test]
    fn tight_bounds_of_single_pixel() {
        let mut surface = PixelSurface::new_square(16);
        assert_eq!(surface.tight_bounds(), None);
        surface.set_pixel(IVec2::new(3, 9), red());
        assert_eq!(
            surface.tight_bounds(),
            Some(IRect::new(IVec2::new(3, 9), IVec2::ONE))
        );
    }

    #[test]
    fn downscale_averages_blocks() {
        let mut surface = PixelSurface::new_square(4);
        surface.fill_rect(
            IRect::new(IVec2::ZERO, IVec2::new(2, 2)),
            Color::new(255, 255, 255, 255).premultiply(),
            BlendMode::Src,
            None,
        );
        let half = surface.downscaled_by(2);
        assert_eq!(half.size(), IVec2::splat(2));
        assert_eq!(half.pixel(IVec2::ZERO).0, [255, 255, 255, 255]);
        assert_eq!(half.pixel(IVec2::new(1, 1)), Premul::TRANSPARENT);
    }

    #[test]
    fn clamp_alpha_erases_unmasked() {
        let mut surface = PixelSurface::new_square(2);
        surface.fill_rect(surface.bounds(), red(), BlendMode::Src, None);
        let mut mask = PixelSurface::new_square(2);
        mask.set_pixel(IVec2::ZERO, Color::WHITE.premultiply());
        surface.clamp_alpha(&mask);
        assert_eq!(surface.pixel(IVec2::ZERO), red());
        assert_eq!(surface.pixel(IVec2::new(1, 0)), Premul::TRANSPARENT);
    }
}
