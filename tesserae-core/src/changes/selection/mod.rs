//! # Selection changes
//! Changes mutating the active selection. A new shape combines with the existing
//! selection through [`SelectionMode`], expressed as raster blend operations on the
//! selection mask; the geometric path is kept only while it stays exact.

mod clear;
mod magic_wand;
mod select_shape;

pub use clear::ClearSelection;
pub use magic_wand::MagicWand;
pub use select_shape::{SelectPath, SelectRectangle};

use crate::blend::BlendMode;
use crate::color::Color;
use crate::image::ChunkyImage;
use crate::math::{IRect, Path};
use crate::state::SelectionMode;
use crate::surface::PixelSurface;
use glam::IVec2;
use std::sync::Arc;

/// Enqueue the combination of a rasterized shape (white-on-transparent, positioned
/// at `bounds_pos`) into the selection mask. The caller commits or cancels.
pub(crate) fn enqueue_combine(
    mask: &mut ChunkyImage,
    shape: PixelSurface,
    bounds_pos: IVec2,
    mode: SelectionMode,
) {
    match mode {
        SelectionMode::New => {
            mask.enqueue_clear();
            mask.enqueue_draw_image(bounds_pos, Arc::new(shape));
        }
        SelectionMode::Add => {
            mask.enqueue_draw_image(bounds_pos, Arc::new(shape));
        }
        SelectionMode::Subtract => {
            mask.set_blend_mode(SelectionMode::Subtract.blend_mode());
            mask.enqueue_draw_image(bounds_pos, Arc::new(shape));
        }
        SelectionMode::Intersect => {
            // DstIn over the shape's own bounds would leave everything outside
            // untouched, so intersection is done the explicit way: keep only the
            // old mask content under the shape, then rewrite the mask with it.
            let bounds = IRect::new(bounds_pos, shape.size());
            let mut kept = PixelSurface::new(shape.size());
            mask.draw_most_up_to_date_region_on(
                bounds,
                crate::chunk::ChunkResolution::Full,
                &mut kept,
                IVec2::ZERO,
            );
            kept.clamp_alpha(&shape);
            mask.enqueue_clear();
            mask.enqueue_draw_image(bounds_pos, Arc::new(kept));
        }
    }
}

/// Rasterize a selection path into a white coverage surface over its bounds.
/// Returns None for paths with no area.
pub(crate) fn rasterize_shape(path: &Path) -> Option<(PixelSurface, IVec2)> {
    let bounds = path.bounds().round_outwards();
    if bounds.is_empty() {
        return None;
    }
    let mut surface = PixelSurface::new(bounds.size);
    surface.fill_path(
        &path.translated((-bounds.pos).as_dvec2()),
        Color::WHITE.premultiply(),
        BlendMode::Src,
        None,
    );
    Some((surface, bounds.pos))
}

/// The path resulting from combining: only a replacing selection (or an add onto a
/// genuinely empty one) keeps exact geometry; every other mode falls back to the
/// raster mask as sole truth.
#[must_use]
pub(crate) fn combined_path(
    shape: &Path,
    mode: SelectionMode,
    was_empty: bool,
) -> Option<Path> {
    match mode {
        SelectionMode::New => Some(shape.clone()),
        SelectionMode::Add if was_empty => Some(shape.clone()),
        _ => None,
    }
}
