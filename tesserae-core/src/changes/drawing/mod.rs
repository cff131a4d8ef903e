//! # Drawing changes
//! Changes that rasterize into a layer image or mask. The free functions here are
//! the shared plumbing: target resolution, clip/symmetry setup, and the
//! snapshot-then-commit / restore-from-snapshot pair every drawing change uses.

mod ellipse;
mod flood_fill;
mod line;
mod line_pen;
mod paste_image;
mod pixel_perfect_pen;
mod rectangle;
mod replace_color;
mod shift_layer;
mod transform_area;

pub use ellipse::DrawEllipse;
pub use flood_fill::{flood_region, FloodFill};
pub use line::DrawLine;
pub use line_pen::LineBasedPen;
pub use paste_image::PasteImage;
pub use pixel_perfect_pen::PixelPerfectPen;
pub use rectangle::DrawRectangle;
pub use replace_color::ReplaceColor;
pub use shift_layer::ShiftLayer;
pub use transform_area::TransformArea;

use super::DrawTarget;
use crate::image::{AffectedArea, ChunkyImage, CommittedChunkStorage};
use crate::state::{Document, LayerContent, MemberId};

/// Can this member be drawn on with the given target? Folders are never drawable,
/// masks only exist when created, and vector layers take no pixels.
#[must_use]
pub(crate) fn is_valid_for_drawing(
    document: &Document,
    member: MemberId,
    target: DrawTarget,
) -> bool {
    let Some(data) = document.find_member(member) else {
        return false;
    };
    match target {
        DrawTarget::Mask => data.mask.is_some(),
        DrawTarget::Image => data.layer().and_then(LayerContent::raster).is_some(),
    }
}

/// Resolve the image a drawing change works on. Panics when the member or its
/// image vanished after validation - the document must not change shape while a
/// change is open.
pub(crate) fn target_image<'d>(
    document: &'d Document,
    member: MemberId,
    target: DrawTarget,
    frame: usize,
) -> &'d ChunkyImage {
    let data = document
        .find_member(member)
        .expect("drawing change target member disappeared mid-change");
    match target {
        DrawTarget::Mask => data
            .mask
            .as_ref()
            .expect("drawing change target mask disappeared mid-change"),
        DrawTarget::Image => data
            .layer()
            .and_then(LayerContent::raster)
            .expect("drawing change target is not a raster layer")
            .image_at_frame(frame),
    }
}

pub(crate) fn target_image_mut<'d>(
    document: &'d mut Document,
    member: MemberId,
    target: DrawTarget,
    frame: usize,
) -> &'d mut ChunkyImage {
    let data = document
        .find_member_mut(member)
        .expect("drawing change target member disappeared mid-change");
    match target {
        DrawTarget::Mask => data
            .mask
            .as_mut()
            .expect("drawing change target mask disappeared mid-change"),
        DrawTarget::Image => data
            .layer_mut()
            .and_then(LayerContent::raster_mut)
            .expect("drawing change target is not a raster layer")
            .image_at_frame_mut(frame),
    }
}

/// Configure the transient rasterization state every drawing change re-applies
/// before enqueueing: selection clipping, symmetry duplication, and the member's
/// transparency lock. Mask drawing ignores the transparency lock - masks are
/// alpha-only by nature.
pub(crate) fn apply_clips_symmetry(
    document: &mut Document,
    member: MemberId,
    target: DrawTarget,
    frame: usize,
) {
    let horizontal = document.horizontal_symmetry.active_position();
    let vertical = document.vertical_symmetry.active_position();
    let selection_path = document.selection.path.clone();
    let selection_has_mask = !document.selection.is_empty();
    let lock_transparency = document
        .find_member(member)
        .is_some_and(|data| data.lock_transparency);

    // Split borrows: the selection mask is read while the member image is written.
    let Document {
        structure,
        selection,
        ..
    } = document;
    let data = structure
        .get_mut(member)
        .expect("drawing change target member disappeared mid-change");
    let image = match target {
        DrawTarget::Mask => data
            .mask
            .as_mut()
            .expect("drawing change target mask disappeared mid-change"),
        DrawTarget::Image => data
            .layer_mut()
            .and_then(LayerContent::raster_mut)
            .expect("drawing change target is not a raster layer")
            .image_at_frame_mut(frame),
    };

    image.set_horizontal_axis_of_symmetry(horizontal);
    image.set_vertical_axis_of_symmetry(vertical);
    match selection_path {
        Some(path) if !path.is_empty() => image.set_clipping_path(Some(path)),
        // Path-less raster selections (magic wand) clip through the mask image.
        _ if selection_has_mask => image.apply_raster_clip(&selection.mask),
        _ => {}
    }
    if lock_transparency && target == DrawTarget::Image {
        image.enable_lock_transparency();
    }
}

/// Snapshot the committed content under the pending queue, then commit it. The
/// standard tail of every drawing change's apply.
pub(crate) fn snapshot_and_commit(
    image: &mut ChunkyImage,
    stored: &mut Option<CommittedChunkStorage>,
) -> AffectedArea {
    assert!(
        stored.is_none(),
        "trying to save chunks while there are saved chunks already"
    );
    let area = image.find_affected_area();
    *stored = Some(CommittedChunkStorage::new(image, area.chunks()));
    image.commit_changes();
    area
}

/// Restore a previously captured snapshot onto the change's target image and
/// commit the restoration. The standard body of every drawing change's revert.
pub(crate) fn restore_stored_chunks(
    document: &mut Document,
    member: MemberId,
    target: DrawTarget,
    frame: usize,
    stored: &mut Option<CommittedChunkStorage>,
) -> AffectedArea {
    let storage = stored
        .take()
        .expect("reverting a change that has no stored chunks");
    let image = target_image_mut(document, member, target, frame);
    let area = storage.apply_chunks_to_image(image);
    image.commit_changes();
    area
}
