//! Draw operations: the primitives a [`super::ChunkyImage`] queue is made of. Each
//! operation can report the chunks it touches without rasterizing, draw itself into
//! one chunk-local surface, and produce a mirrored copy for symmetry duplication.

use crate::blend::BlendMode;
use crate::color::Premul;
use crate::image::area::AffectedArea;
use crate::math::{self, IRect, Path, Rect, ShapeCorners};
use crate::surface::{ClipMask, PixelSurface};
use glam::{DAffine2, DVec2, IVec2};
use std::sync::Arc;

pub(super) trait DrawOperation {
    /// Chunks this operation touches, without materializing anything.
    fn affected_area(&self, chunk_size: u32) -> AffectedArea;
    /// Rasterize into a chunk-local surface whose top-left pixel is `chunk_origin`
    /// in image space.
    fn draw(&self, surface: &mut PixelSurface, chunk_origin: IVec2, clip: Option<&ClipMask>);
    /// Copy of this operation mirrored across the given pixel-boundary axes.
    fn mirrored(&self, vertical_x: Option<i32>, horizontal_y: Option<i32>) -> Box<dyn DrawOperation>;
}

/// Parameters of a rectangle draw: center/size/rotation with an inner stroke and a
/// fill, all sharing one blend mode.
#[derive(Copy, Clone, Debug)]
pub struct ShapeData {
    pub center: DVec2,
    pub size: DVec2,
    pub angle: f64,
    pub stroke_width: i32,
    pub stroke: Premul,
    pub fill: Premul,
    pub blend: BlendMode,
}

impl ShapeData {
    #[must_use]
    pub fn new(
        center: DVec2,
        size: DVec2,
        angle: f64,
        stroke_width: i32,
        stroke: crate::color::Color,
        fill: crate::color::Color,
        blend: BlendMode,
    ) -> Self {
        Self {
            center,
            size,
            angle,
            stroke_width,
            stroke: stroke.premultiply(),
            fill: fill.premultiply(),
            blend,
        }
    }
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.size.x.abs() < 1.0 || self.size.y.abs() < 1.0
    }
}

pub(super) struct RectangleOperation {
    pub data: ShapeData,
}

impl RectangleOperation {
    fn rect(&self) -> Rect {
        Rect::from_center_and_size(self.data.center, self.data.size.abs())
    }
}

impl DrawOperation for RectangleOperation {
    fn affected_area(&self, chunk_size: u32) -> AffectedArea {
        if self.data.is_degenerate() {
            return AffectedArea::new();
        }
        let corners = ShapeCorners::from_rect(self.rect()).rotated(self.data.angle, self.data.center);
        let bounds = corners.aabb().round_outwards();
        let mut chunks = math::chunks_touching_rect(bounds, chunk_size);
        if self.data.fill.is_transparent() && self.data.blend == BlendMode::SrcOver {
            // Hollow rectangle: interior chunks are never written.
            let inner = self
                .rect()
                .inflate(-f64::from(self.data.stroke_width))
                .round_outwards();
            if self.data.angle == 0.0 {
                for chunk in math::chunks_fully_inside_rect(inner, chunk_size) {
                    chunks.remove(&chunk);
                }
            }
        }
        AffectedArea::from_chunks(chunks, Some(bounds))
    }

    fn draw(&self, surface: &mut PixelSurface, chunk_origin: IVec2, clip: Option<&ClipMask>) {
        if self.data.is_degenerate() {
            return;
        }
        let local = |p: DVec2| p - chunk_origin.as_dvec2();
        let rect = self.rect();
        let inner = rect.inflate(-f64::from(self.data.stroke_width));
        if self.data.angle == 0.0 {
            // Axis aligned: exact integer rects.
            let outer_px = rect.round_outwards().translate(-chunk_origin);
            let inner_px = inner.round_outwards().translate(-chunk_origin);
            if !self.data.fill.is_transparent() {
                surface.fill_rect(inner_px, self.data.fill, self.data.blend, clip);
            }
            if self.data.stroke_width > 0 {
                // Stroke ring as four edge strips.
                let top = IRect::from_corners(
                    outer_px.pos,
                    IVec2::new(outer_px.right(), inner_px.top().max(outer_px.top())),
                );
                let bottom = IRect::from_corners(
                    IVec2::new(outer_px.left(), inner_px.bottom().min(outer_px.bottom())),
                    IVec2::new(outer_px.right(), outer_px.bottom()),
                );
                let left = IRect::from_corners(
                    IVec2::new(outer_px.left(), top.bottom()),
                    IVec2::new(inner_px.left().max(outer_px.left()), bottom.top()),
                );
                let right = IRect::from_corners(
                    IVec2::new(inner_px.right().min(outer_px.right()), top.bottom()),
                    IVec2::new(outer_px.right(), bottom.top()),
                );
                for strip in [top, bottom, left, right] {
                    surface.fill_rect(strip, self.data.stroke, self.data.blend, clip);
                }
            }
        } else {
            let outer = ShapeCorners::from_rect(rect).rotated(self.data.angle, self.data.center);
            if !self.data.fill.is_transparent() || self.data.blend != BlendMode::SrcOver {
                let fill_path = Path::from_points(
                    ShapeCorners::from_rect(inner)
                        .rotated(self.data.angle, self.data.center)
                        .as_polygon()
                        .map(local)
                        .to_vec(),
                );
                surface.fill_path(&fill_path, self.data.fill, self.data.blend, clip);
            }
            if self.data.stroke_width > 0 {
                // Even-odd ring between the outer and inner rotated quads.
                let mut ring = Path::from_points(outer.as_polygon().map(local).to_vec());
                ring.push_subpath(
                    ShapeCorners::from_rect(inner)
                        .rotated(self.data.angle, self.data.center)
                        .as_polygon()
                        .map(local)
                        .to_vec(),
                );
                surface.fill_path(&ring, self.data.stroke, self.data.blend, clip);
            }
        }
    }

    fn mirrored(&self, vertical_x: Option<i32>, horizontal_y: Option<i32>) -> Box<dyn DrawOperation> {
        let mut data = self.data;
        if let Some(x) = vertical_x {
            data.center.x = 2.0 * f64::from(x) - data.center.x;
            data.angle = -data.angle;
        }
        if let Some(y) = horizontal_y {
            data.center.y = 2.0 * f64::from(y) - data.center.y;
            data.angle = -data.angle;
        }
        Box::new(RectangleOperation { data })
    }
}

pub(super) struct EllipseOperation {
    pub rect: IRect,
    pub stroke: Premul,
    pub fill: Premul,
    pub stroke_width: i32,
    pub blend: BlendMode,
}

impl DrawOperation for EllipseOperation {
    fn affected_area(&self, chunk_size: u32) -> AffectedArea {
        if self.rect.is_empty() {
            return AffectedArea::new();
        }
        let mut chunks = math::chunks_touching_rect(self.rect, chunk_size);
        if self.fill.is_transparent() && self.blend == BlendMode::SrcOver {
            let inner = self.rect.inflate(-self.stroke_width.max(1) * 2);
            for chunk in math::chunks_fully_inside_ellipse(inner.as_rect(), chunk_size) {
                chunks.remove(&chunk);
            }
        }
        AffectedArea::from_chunks(chunks, Some(self.rect))
    }

    fn draw(&self, surface: &mut PixelSurface, chunk_origin: IVec2, clip: Option<&ClipMask>) {
        if self.rect.is_empty() {
            return;
        }
        let local = self.rect.translate(-chunk_origin);
        let inner = local.inflate(-self.stroke_width.max(1));
        if self.stroke_width <= 1 {
            // Full-extent fill plus a plotted outline: row spans and outline pixels
            // overlap by at most the outline itself, never leaving seams.
            if !self.fill.is_transparent() || self.blend != BlendMode::SrcOver {
                surface.fill_ellipse(local, self.fill, self.blend, clip);
            }
            surface.draw_ellipse_outline(local, self.stroke, self.blend, clip);
        } else {
            if !self.fill.is_transparent() || self.blend != BlendMode::SrcOver {
                surface.fill_ellipse(inner, self.fill, self.blend, clip);
            }
            // Thick stroke: outer fill minus inner fill, done per row so a blend
            // mode never hits the same pixel twice.
            ring_rows(local, inner, |row| {
                surface.fill_rect(row, self.stroke, self.blend, clip);
            });
        }
    }

    fn mirrored(&self, vertical_x: Option<i32>, horizontal_y: Option<i32>) -> Box<dyn DrawOperation> {
        let mut rect = self.rect;
        if let Some(x) = vertical_x {
            rect = rect.reflected_x(x);
        }
        if let Some(y) = horizontal_y {
            rect = rect.reflected_y(y);
        }
        Box::new(EllipseOperation { rect, ..*self })
    }
}

/// Visit the row strips making up the area inside the outer ellipse but outside the
/// inner one.
fn ring_rows(outer: IRect, inner: IRect, mut visit: impl FnMut(IRect)) {
    let span_of = |rect: IRect, y: i32| -> Option<(i32, i32)> {
        if y < rect.top() || y >= rect.bottom() || rect.is_empty() {
            return None;
        }
        let radii = rect.size.as_dvec2() / 2.0;
        let center = rect.as_rect().center();
        let dy = (f64::from(y) + 0.5 - center.y) / radii.y;
        let rel = 1.0 - dy * dy;
        if rel < 0.0 {
            return None;
        }
        let dx = radii.x * rel.sqrt();
        Some(((center.x - dx).ceil() as i32, (center.x + dx).ceil() as i32))
    };
    for y in outer.top()..outer.bottom() {
        let Some((ox0, ox1)) = span_of(outer, y) else {
            continue;
        };
        match span_of(inner, y) {
            None => visit(IRect::from_corners(IVec2::new(ox0, y), IVec2::new(ox1, y + 1))),
            Some((ix0, ix1)) => {
                if ix0 > ox0 {
                    visit(IRect::from_corners(IVec2::new(ox0, y), IVec2::new(ix0, y + 1)));
                }
                if ox1 > ix1 {
                    visit(IRect::from_corners(IVec2::new(ix1, y), IVec2::new(ox1, y + 1)));
                }
            }
        }
    }
}

pub(super) struct LineOperation {
    pub from: IVec2,
    pub to: IVec2,
    pub width: i32,
    pub color: Premul,
    pub blend: BlendMode,
}

impl DrawOperation for LineOperation {
    fn affected_area(&self, chunk_size: u32) -> AffectedArea {
        let bounds = IRect::from_two_points(self.from, self.to);
        let bounds = if self.width <= 1 {
            bounds
        } else {
            bounds.inflate(self.width / 2 + 1)
        };
        AffectedArea::from_chunks(math::chunks_touching_rect(bounds, chunk_size), Some(bounds))
    }

    fn draw(&self, surface: &mut PixelSurface, chunk_origin: IVec2, clip: Option<&ClipMask>) {
        let from = self.from - chunk_origin;
        let to = self.to - chunk_origin;
        if self.width <= 1 {
            surface.draw_line(from, to, self.color, self.blend, clip);
            return;
        }
        // Thick line: quad with square caps, centered on the pixel centers.
        let a = from.as_dvec2() + DVec2::splat(0.5);
        let b = to.as_dvec2() + DVec2::splat(0.5);
        let dir = (b - a).normalize_or(DVec2::X);
        let normal = DVec2::new(-dir.y, dir.x) * (f64::from(self.width) / 2.0);
        let cap = dir * (f64::from(self.width) / 2.0);
        let quad = Path::from_points(vec![
            a - cap + normal,
            b + cap + normal,
            b + cap - normal,
            a - cap - normal,
        ]);
        surface.fill_path(&quad, self.color, self.blend, clip);
    }

    fn mirrored(&self, vertical_x: Option<i32>, horizontal_y: Option<i32>) -> Box<dyn DrawOperation> {
        let mut from = self.from;
        let mut to = self.to;
        if let Some(x) = vertical_x {
            from = math::reflect_pixel_x(from, x);
            to = math::reflect_pixel_x(to, x);
        }
        if let Some(y) = horizontal_y {
            from = math::reflect_pixel_y(from, y);
            to = math::reflect_pixel_y(to, y);
        }
        Box::new(LineOperation { from, to, ..*self })
    }
}

pub(super) struct PixelsOperation {
    pub pixels: Arc<[IVec2]>,
    pub color: Premul,
    pub blend: BlendMode,
}

impl DrawOperation for PixelsOperation {
    fn affected_area(&self, chunk_size: u32) -> AffectedArea {
        let mut chunks = hashbrown::HashSet::new();
        let mut rect: Option<IRect> = None;
        for &pixel in self.pixels.iter() {
            chunks.insert(math::chunk_pos_of(pixel, chunk_size));
            let pixel_rect = IRect::new(pixel, IVec2::ONE);
            rect = Some(rect.map_or(pixel_rect, |r| r.union(pixel_rect)));
        }
        AffectedArea::from_chunks(chunks, rect)
    }

    fn draw(&self, surface: &mut PixelSurface, chunk_origin: IVec2, clip: Option<&ClipMask>) {
        for &pixel in self.pixels.iter() {
            surface.blend_pixel(pixel - chunk_origin, self.color, self.blend, clip);
        }
    }

    fn mirrored(&self, vertical_x: Option<i32>, horizontal_y: Option<i32>) -> Box<dyn DrawOperation> {
        let pixels: Arc<[IVec2]> = self
            .pixels
            .iter()
            .map(|&p| {
                let p = vertical_x.map_or(p, |x| math::reflect_pixel_x(p, x));
                horizontal_y.map_or(p, |y| math::reflect_pixel_y(p, y))
            })
            .collect();
        Box::new(PixelsOperation { pixels, ..*self })
    }
}

pub(super) struct PathFillOperation {
    pub path: Arc<Path>,
    pub color: Premul,
    pub blend: BlendMode,
}

impl DrawOperation for PathFillOperation {
    fn affected_area(&self, chunk_size: u32) -> AffectedArea {
        let bounds = self.path.bounds().round_outwards();
        AffectedArea::from_chunks(math::chunks_touching_rect(bounds, chunk_size), Some(bounds))
    }

    fn draw(&self, surface: &mut PixelSurface, chunk_origin: IVec2, clip: Option<&ClipMask>) {
        let local = self.path.translated(-chunk_origin.as_dvec2());
        surface.fill_path(&local, self.color, self.blend, clip);
    }

    fn mirrored(&self, vertical_x: Option<i32>, horizontal_y: Option<i32>) -> Box<dyn DrawOperation> {
        let mut path = (*self.path).clone();
        if let Some(x) = vertical_x {
            path = path.reflected_x(f64::from(x));
        }
        if let Some(y) = horizontal_y {
            path = path.reflected_y(f64::from(y));
        }
        Box::new(PathFillOperation { path: Arc::new(path), ..*self })
    }
}

/// Blit of an external surface, either axis-aligned at a pixel offset or mapped onto
/// arbitrary (possibly rotated/scaled) corners.
pub(super) struct ImageOperation {
    pub image: Arc<PixelSurface>,
    pub placement: ImagePlacement,
    pub blend: BlendMode,
}

#[derive(Copy, Clone)]
pub(super) enum ImagePlacement {
    At(IVec2),
    Corners(ShapeCorners),
}

impl ImageOperation {
    fn dst_bounds(&self) -> IRect {
        match self.placement {
            ImagePlacement::At(pos) => IRect::new(pos, self.image.size()),
            ImagePlacement::Corners(corners) => corners.aabb().round_outwards(),
        }
    }
}

impl DrawOperation for ImageOperation {
    fn affected_area(&self, chunk_size: u32) -> AffectedArea {
        let bounds = self.dst_bounds();
        AffectedArea::from_chunks(math::chunks_touching_rect(bounds, chunk_size), Some(bounds))
    }

    fn draw(&self, surface: &mut PixelSurface, chunk_origin: IVec2, clip: Option<&ClipMask>) {
        match self.placement {
            ImagePlacement::At(pos) => {
                surface.blit(&self.image, pos - chunk_origin, self.blend, 255, clip);
            }
            ImagePlacement::Corners(corners) => {
                // Destination-to-source affine: corners span the source rect.
                let size = self.image.size().as_dvec2();
                let x_axis = (corners.top_right - corners.top_left) / size.x;
                let y_axis = (corners.bottom_left - corners.top_left) / size.y;
                let src_to_dst = DAffine2::from_cols(
                    x_axis,
                    y_axis,
                    corners.top_left - chunk_origin.as_dvec2(),
                );
                let local_bounds = self.dst_bounds().translate(-chunk_origin);
                surface.blit_transformed(
                    &self.image,
                    local_bounds,
                    src_to_dst.inverse(),
                    self.blend,
                    clip,
                );
            }
        }
    }

    fn mirrored(&self, vertical_x: Option<i32>, horizontal_y: Option<i32>) -> Box<dyn DrawOperation> {
        // Mirroring a blit flips its corners; an aligned placement becomes corners.
        let mut corners = match self.placement {
            ImagePlacement::At(pos) => {
                ShapeCorners::from_rect(IRect::new(pos, self.image.size()).as_rect())
            }
            ImagePlacement::Corners(corners) => corners,
        };
        if let Some(x) = vertical_x {
            let x = f64::from(x);
            let reflect = |p: DVec2| DVec2::new(2.0 * x - p.x, p.y);
            corners = ShapeCorners {
                top_left: reflect(corners.top_right),
                top_right: reflect(corners.top_left),
                bottom_right: reflect(corners.bottom_left),
                bottom_left: reflect(corners.bottom_right),
            };
        }
        if let Some(y) = horizontal_y {
            let y = f64::from(y);
            let reflect = |p: DVec2| DVec2::new(p.x, 2.0 * y - p.y);
            corners = ShapeCorners {
                top_left: reflect(corners.bottom_left),
                top_right: reflect(corners.bottom_right),
                bottom_right: reflect(corners.top_right),
                bottom_left: reflect(corners.top_left),
            };
        }
        Box::new(ImageOperation {
            image: Arc::clone(&self.image),
            placement: ImagePlacement::Corners(corners),
            blend: self.blend,
        })
    }
}

/// Erase a pixel rect back to transparency.
pub(super) struct ClearRegionOperation {
    pub rect: IRect,
}

impl DrawOperation for ClearRegionOperation {
    fn affected_area(&self, chunk_size: u32) -> AffectedArea {
        AffectedArea::from_rect(self.rect, chunk_size)
    }

    fn draw(&self, surface: &mut PixelSurface, chunk_origin: IVec2, clip: Option<&ClipMask>) {
        surface.clear_rect(self.rect.translate(-chunk_origin), clip);
    }

    fn mirrored(&self, vertical_x: Option<i32>, horizontal_y: Option<i32>) -> Box<dyn DrawOperation> {
        let mut rect = self.rect;
        if let Some(x) = vertical_x {
            rect = rect.reflected_x(x);
        }
        if let Some(y) = horizontal_y {
            rect = rect.reflected_y(y);
        }
        Box::new(ClearRegionOperation { rect })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::Color;

    #[test]
    fn hollow_rectangle_skips_interior_chunks() {
        let op = RectangleOperation {
            data: ShapeData {
                center: DVec2::splat(24.0),
                size: DVec2::splat(48.0),
                angle: 0.0,
                stroke_width: 1,
                stroke: Color::BLACK.premultiply(),
                fill: Premul::TRANSPARENT,
                blend: BlendMode::SrcOver,
            },
        };
        let area = op.affected_area(16);
        assert!(!area.chunks().contains(&IVec2::new(1, 1)));
        assert!(area.chunks().contains(&IVec2::new(0, 0)));
        assert!(area.chunks().contains(&IVec2::new(2, 2)));
    }

    #[test]
    fn line_affects_only_crossed_chunks() {
        let op = LineOperation {
            from: IVec2::new(0, 0),
            to: IVec2::new(50, 0),
            width: 1,
            color: Color::BLACK.premultiply(),
            blend: BlendMode::SrcOver,
        };
        let area = op.affected_area(16);
        assert!(area.chunks().contains(&IVec2::new(0, 0)));
        assert!(area.chunks().contains(&IVec2::new(3, 0)));
        assert!(!area.chunks().contains(&IVec2::new(0, 2)));
    }

    #[test]
    fn mirrored_line_reflects_endpoints() {
        let op = LineOperation {
            from: IVec2::new(0, 0),
            to: IVec2::new(3, 0),
            width: 1,
            color: Color::BLACK.premultiply(),
            blend: BlendMode::SrcOver,
        };
        let mirrored = op.mirrored(Some(8), None);
        let area = mirrored.affected_area(16);
        // Pixels 12..=15 after reflection around x=8.
        assert_eq!(area.global_rect().unwrap().left(), 12);
        assert_eq!(area.global_rect().unwrap().right(), 16);
    }
}
