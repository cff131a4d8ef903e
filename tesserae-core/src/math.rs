//! # Geometry
//! Integer and float rectangles plus the chunk-coordinate arithmetic used all over the
//! raster pipeline. Vectors come from `glam` (`IVec2` for pixel/chunk coordinates,
//! `DVec2` for subpixel geometry); rectangles are crate-local since glam has none.

use glam::{DVec2, IVec2};

/// Axis-aligned integer rectangle. `pos` is the top-left corner, `size` extends
/// down-right and is non-negative for every rect produced by this module.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct IRect {
    pub pos: IVec2,
    pub size: IVec2,
}

impl IRect {
    pub const EMPTY: Self = Self {
        pos: IVec2::ZERO,
        size: IVec2::ZERO,
    };
    #[must_use]
    pub fn new(pos: IVec2, size: IVec2) -> Self {
        Self { pos, size }
    }
    /// Rect covering both corners, in any order.
    #[must_use]
    pub fn from_corners(a: IVec2, b: IVec2) -> Self {
        let pos = a.min(b);
        Self { pos, size: a.max(b) - pos }
    }
    #[must_use]
    pub fn from_two_points(a: IVec2, b: IVec2) -> Self {
        // +1 so that both endpoints are inside the rect.
        let pos = a.min(b);
        Self { pos, size: a.max(b) - pos + IVec2::ONE }
    }
    #[must_use]
    pub fn left(&self) -> i32 {
        self.pos.x
    }
    #[must_use]
    pub fn top(&self) -> i32 {
        self.pos.y
    }
    /// One past the rightmost contained column.
    #[must_use]
    pub fn right(&self) -> i32 {
        self.pos.x + self.size.x
    }
    /// One past the bottommost contained row.
    #[must_use]
    pub fn bottom(&self) -> i32 {
        self.pos.y + self.size.y
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size.x <= 0 || self.size.y <= 0
    }
    #[must_use]
    pub fn contains(&self, point: IVec2) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }
    #[must_use]
    pub fn translate(&self, delta: IVec2) -> Self {
        Self { pos: self.pos + delta, size: self.size }
    }
    /// Grow (or shrink, for negative amounts) on all four sides.
    #[must_use]
    pub fn inflate(&self, amount: i32) -> Self {
        let size = self.size + IVec2::splat(amount * 2);
        if size.x <= 0 || size.y <= 0 {
            return Self::EMPTY;
        }
        Self { pos: self.pos - IVec2::splat(amount), size }
    }
    #[must_use]
    pub fn intersect(&self, other: Self) -> Self {
        let pos = self.pos.max(other.pos);
        let max = (self.pos + self.size).min(other.pos + other.size);
        if max.x <= pos.x || max.y <= pos.y {
            return Self::EMPTY;
        }
        Self { pos, size: max - pos }
    }
    #[must_use]
    pub fn union(&self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return *self;
        }
        let pos = self.pos.min(other.pos);
        let max = (self.pos + self.size).max(other.pos + other.size);
        Self { pos, size: max - pos }
    }
    /// Mirror across the vertical pixel-boundary axis at `axis_x`.
    #[must_use]
    pub fn reflected_x(&self, axis_x: i32) -> Self {
        Self {
            pos: IVec2::new(2 * axis_x - self.right(), self.pos.y),
            size: self.size,
        }
    }
    /// Mirror across the horizontal pixel-boundary axis at `axis_y`.
    #[must_use]
    pub fn reflected_y(&self, axis_y: i32) -> Self {
        Self {
            pos: IVec2::new(self.pos.x, 2 * axis_y - self.bottom()),
            size: self.size,
        }
    }
    #[must_use]
    pub fn as_rect(&self) -> Rect {
        Rect {
            pos: self.pos.as_dvec2(),
            size: self.size.as_dvec2(),
        }
    }
}

/// Axis-aligned f64 rectangle, used for subpixel shape geometry before rasterization.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Rect {
    pub pos: DVec2,
    pub size: DVec2,
}

impl Rect {
    #[must_use]
    pub fn new(pos: DVec2, size: DVec2) -> Self {
        Self { pos, size }
    }
    #[must_use]
    pub fn from_center_and_size(center: DVec2, size: DVec2) -> Self {
        Self { pos: center - size / 2.0, size }
    }
    #[must_use]
    pub fn center(&self) -> DVec2 {
        self.pos + self.size / 2.0
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }
    #[must_use]
    pub fn inflate(&self, amount: f64) -> Self {
        Self {
            pos: self.pos - DVec2::splat(amount),
            size: (self.size + DVec2::splat(amount * 2.0)).max(DVec2::ZERO),
        }
    }
    /// Smallest integer rect containing this one.
    #[must_use]
    pub fn round_outwards(&self) -> IRect {
        let min = self.pos.floor().as_ivec2();
        let max = (self.pos + self.size).ceil().as_ivec2();
        IRect { pos: min, size: (max - min).max(IVec2::ZERO) }
    }
}

/// The four corners of a possibly-rotated rectangle, counterclockwise from top-left.
/// Used to carry rotated shape geometry and transformed paste regions.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ShapeCorners {
    pub top_left: DVec2,
    pub top_right: DVec2,
    pub bottom_right: DVec2,
    pub bottom_left: DVec2,
}

impl ShapeCorners {
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            top_left: rect.pos,
            top_right: rect.pos + DVec2::new(rect.size.x, 0.0),
            bottom_right: rect.pos + rect.size,
            bottom_left: rect.pos + DVec2::new(0.0, rect.size.y),
        }
    }
    /// Rotate all corners around `around` by `angle` radians.
    #[must_use]
    pub fn rotated(&self, angle: f64, around: DVec2) -> Self {
        let rotate = |p: DVec2| {
            let rel = p - around;
            let (sin, cos) = angle.sin_cos();
            around + DVec2::new(rel.x * cos - rel.y * sin, rel.x * sin + rel.y * cos)
        };
        Self {
            top_left: rotate(self.top_left),
            top_right: rotate(self.top_right),
            bottom_right: rotate(self.bottom_right),
            bottom_left: rotate(self.bottom_left),
        }
    }
    #[must_use]
    pub fn aabb(&self) -> Rect {
        let min = self
            .top_left
            .min(self.top_right)
            .min(self.bottom_right)
            .min(self.bottom_left);
        let max = self
            .top_left
            .max(self.top_right)
            .max(self.bottom_right)
            .max(self.bottom_left);
        Rect { pos: min, size: max - min }
    }
    #[must_use]
    pub fn as_polygon(&self) -> [DVec2; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }
}

/// A geometric path: one or more closed polygonal subpaths, even-odd filled.
/// Selections, clip regions, and lasso gestures all travel as paths.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Path {
    subpaths: Vec<Vec<DVec2>>,
}

impl Path {
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            subpaths: vec![ShapeCorners::from_rect(rect).as_polygon().to_vec()],
        }
    }
    /// Single closed subpath through the given points. Degenerate inputs
    /// (< 3 points) produce an empty path.
    #[must_use]
    pub fn from_points(points: Vec<DVec2>) -> Self {
        if points.len() < 3 {
            return Self::default();
        }
        Self { subpaths: vec![points] }
    }
    pub fn push_subpath(&mut self, points: Vec<DVec2>) {
        if points.len() >= 3 {
            self.subpaths.push(points);
        }
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subpaths.is_empty()
    }
    #[must_use]
    pub fn subpaths(&self) -> &[Vec<DVec2>] {
        &self.subpaths
    }
    #[must_use]
    pub fn map_points(&self, f: impl Fn(DVec2) -> DVec2) -> Self {
        Self {
            subpaths: self
                .subpaths
                .iter()
                .map(|sub| sub.iter().map(|&p| f(p)).collect())
                .collect(),
        }
    }
    #[must_use]
    pub fn translated(&self, delta: DVec2) -> Self {
        self.map_points(|p| p + delta)
    }
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        self.map_points(|p| p * factor)
    }
    #[must_use]
    pub fn reflected_x(&self, axis_x: f64) -> Self {
        self.map_points(|p| DVec2::new(2.0 * axis_x - p.x, p.y))
    }
    #[must_use]
    pub fn reflected_y(&self, axis_y: f64) -> Self {
        self.map_points(|p| DVec2::new(p.x, 2.0 * axis_y - p.y))
    }
    #[must_use]
    pub fn bounds(&self) -> Rect {
        let mut min = DVec2::INFINITY;
        let mut max = DVec2::NEG_INFINITY;
        for point in self.subpaths.iter().flatten() {
            min = min.min(*point);
            max = max.max(*point);
        }
        if min.x > max.x {
            return Rect::default();
        }
        Rect { pos: min, size: max - min }
    }
    /// Sorted, paired x-intersections of the horizontal line at `y` (even-odd).
    /// Each span is half-open: a pixel center x is inside if `start <= x < end`.
    #[must_use]
    pub fn scanline_spans(&self, y: f64) -> Vec<(f64, f64)> {
        let mut crossings = Vec::new();
        for sub in &self.subpaths {
            for i in 0..sub.len() {
                let a = sub[i];
                let b = sub[(i + 1) % sub.len()];
                if (a.y <= y) == (b.y <= y) {
                    continue;
                }
                crossings.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
            }
        }
        crossings.sort_unstable_by(f64::total_cmp);
        crossings
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }
    /// Even-odd point containment.
    #[must_use]
    pub fn contains(&self, point: DVec2) -> bool {
        self.scanline_spans(point.y)
            .iter()
            .any(|&(x0, x1)| point.x >= x0 && point.x < x1)
    }
}

/// Mirror a pixel across the vertical pixel-boundary axis at `axis_x`.
#[must_use]
pub fn reflect_pixel_x(pixel: IVec2, axis_x: i32) -> IVec2 {
    IVec2::new(2 * axis_x - pixel.x - 1, pixel.y)
}
/// Mirror a pixel across the horizontal pixel-boundary axis at `axis_y`.
#[must_use]
pub fn reflect_pixel_y(pixel: IVec2, axis_y: i32) -> IVec2 {
    IVec2::new(pixel.x, 2 * axis_y - pixel.y - 1)
}

/// Chunk coordinate containing the given pixel position (floor division).
#[must_use]
pub fn chunk_pos_of(pixel: IVec2, chunk_size: u32) -> IVec2 {
    let chunk_size = chunk_size as i32;
    IVec2::new(
        pixel.x.div_euclid(chunk_size),
        pixel.y.div_euclid(chunk_size),
    )
}

/// Pixel rect covered by the given chunk at full resolution.
#[must_use]
pub fn chunk_pixel_rect(chunk_pos: IVec2, chunk_size: u32) -> IRect {
    IRect {
        pos: chunk_pos * chunk_size as i32,
        size: IVec2::splat(chunk_size as i32),
    }
}

/// All chunks intersecting the given pixel rect.
#[must_use]
pub fn chunks_touching_rect(rect: IRect, chunk_size: u32) -> hashbrown::HashSet<IVec2> {
    let mut chunks = hashbrown::HashSet::new();
    if rect.is_empty() {
        return chunks;
    }
    let min = chunk_pos_of(rect.pos, chunk_size);
    let max = chunk_pos_of(rect.pos + rect.size - IVec2::ONE, chunk_size);
    for y in min.y..=max.y {
        for x in min.x..=max.x {
            chunks.insert(IVec2::new(x, y));
        }
    }
    chunks
}

/// Chunks lying entirely inside the given pixel rect. Unfilled shapes subtract these
/// from their touched set so that interior chunks are never rasterized.
#[must_use]
pub fn chunks_fully_inside_rect(rect: IRect, chunk_size: u32) -> hashbrown::HashSet<IVec2> {
    let mut chunks = hashbrown::HashSet::new();
    if rect.is_empty() {
        return chunks;
    }
    let size = chunk_size as i32;
    // A chunk c covers [c*size, (c+1)*size); fully inside means both ends land within the rect.
    let ceil_div = |v: i32| {
        let div = v.div_euclid(size);
        if v.rem_euclid(size) != 0 { div + 1 } else { div }
    };
    let min = IVec2::new(ceil_div(rect.left()), ceil_div(rect.top()));
    let max = IVec2::new(
        rect.right().div_euclid(size) - 1,
        rect.bottom().div_euclid(size) - 1,
    );
    for y in min.y..=max.y {
        for x in min.x..=max.x {
            chunks.insert(IVec2::new(x, y));
        }
    }
    chunks
}

/// Chunks fully covered by the axis-aligned ellipse inscribed in `rect`, found by
/// testing each chunk's four corners against the ellipse equation.
#[must_use]
pub fn chunks_fully_inside_ellipse(rect: Rect, chunk_size: u32) -> hashbrown::HashSet<IVec2> {
    let mut chunks = hashbrown::HashSet::new();
    let radii = rect.size / 2.0;
    if radii.x <= 0.0 || radii.y <= 0.0 {
        return chunks;
    }
    let center = rect.center();
    let inside = |p: DVec2| {
        let rel = (p - center) / radii;
        rel.length_squared() <= 1.0
    };
    for candidate in chunks_touching_rect(rect.round_outwards(), chunk_size) {
        let px = chunk_pixel_rect(candidate, chunk_size);
        let tl = px.pos.as_dvec2();
        let br = (px.pos + px.size).as_dvec2();
        if inside(tl)
            && inside(br)
            && inside(DVec2::new(br.x, tl.y))
            && inside(DVec2::new(tl.x, br.y))
        {
            chunks.insert(candidate);
        }
    }
    chunks
}
