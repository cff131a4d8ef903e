//! # Chunk renderer
//! Recombines the visible members of the tree into one displayable chunk. Callers
//! ask for a single chunk at a resolution; members composite bottom-to-top honoring
//! folder nesting, opacity, blend mode, and mask clipping. A fully transparent
//! result is reported as [`EmptyChunk`] instead of materializing a tile.

use crate::blend::BlendMode;
use crate::chunk::{Chunk, ChunkResolution};
use crate::math::{self, IRect};
use crate::state::{Document, LayerContent, MemberData, MemberId, ShapeKind};
use crate::surface::PixelSurface;
use either::Either;
use glam::IVec2;

/// Marker for "nothing here": the chunk would be fully transparent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EmptyChunk;

/// Composite every visible member for one chunk.
#[must_use]
pub fn merge_whole_structure(
    chunk_pos: IVec2,
    resolution: ChunkResolution,
    document: &Document,
) -> Either<Chunk, EmptyChunk> {
    merge(chunk_pos, resolution, document, MembersFilter::All)
}

/// Composite exactly the chosen member subset (folders bring their subtree).
#[must_use]
pub fn merge_chosen_members(
    chunk_pos: IVec2,
    resolution: ChunkResolution,
    document: &Document,
    members: &hashbrown::HashSet<MemberId>,
) -> Either<Chunk, EmptyChunk> {
    merge(chunk_pos, resolution, document, MembersFilter::Chosen(members))
}

#[derive(Copy, Clone)]
enum MembersFilter<'a> {
    All,
    Chosen(&'a hashbrown::HashSet<MemberId>),
}

impl MembersFilter<'_> {
    fn includes(self, member: MemberId) -> bool {
        match self {
            Self::All => true,
            Self::Chosen(set) => set.contains(&member),
        }
    }
}

fn merge(
    chunk_pos: IVec2,
    resolution: ChunkResolution,
    document: &Document,
    filter: MembersFilter<'_>,
) -> Either<Chunk, EmptyChunk> {
    let mut target = Chunk::new(resolution, document.chunk_size());
    let mut anything = false;
    for member in document.structure.iter_top_level() {
        anything |= render_member(
            document,
            member,
            chunk_pos,
            resolution,
            filter,
            target.surface_mut(),
        );
    }
    if anything {
        Either::Left(target)
    } else {
        Either::Right(EmptyChunk)
    }
}

fn render_member(
    document: &Document,
    member: &MemberData,
    chunk_pos: IVec2,
    resolution: ChunkResolution,
    filter: MembersFilter<'_>,
    target: &mut PixelSurface,
) -> bool {
    if !member.visible || member.blend.opacity <= 0.0 {
        return false;
    }
    if member.is_folder() {
        render_folder(document, member, chunk_pos, resolution, filter, target)
    } else if filter.includes(member.id()) {
        render_layer(document, member, chunk_pos, resolution, target)
    } else {
        false
    }
}

fn render_folder(
    document: &Document,
    folder: &MemberData,
    chunk_pos: IVec2,
    resolution: ChunkResolution,
    filter: MembersFilter<'_>,
    target: &mut PixelSurface,
) -> bool {
    // A chosen folder renders its whole subtree.
    let inner_filter = if filter.includes(folder.id()) {
        MembersFilter::All
    } else {
        filter
    };
    if masked_out(folder, chunk_pos) == Some(true) {
        return false;
    }
    let mut contents = PixelSurface::new(target.size());
    let mut anything = false;
    // Unwrap ok - the member is a folder, checked by the caller.
    for child in document.structure.iter_children(folder.id()).unwrap() {
        anything |= render_member(document, child, chunk_pos, resolution, inner_filter, &mut contents);
    }
    if !anything {
        return false;
    }
    apply_mask_clip(folder, chunk_pos, resolution, &mut contents);
    target.blit(
        &contents,
        IVec2::ZERO,
        folder.blend.mode,
        folder.blend.opacity_byte(),
        None,
    );
    true
}

fn render_layer(
    document: &Document,
    layer: &MemberData,
    chunk_pos: IVec2,
    resolution: ChunkResolution,
    target: &mut PixelSurface,
) -> bool {
    if let Some(true) = masked_out(layer, chunk_pos) {
        return false;
    }
    let Some(content) = layer.layer() else {
        return false;
    };
    let mut rendered = PixelSurface::new(target.size());
    let drew = match content {
        LayerContent::Raster(raster) => raster
            .image_at_frame(document.current_frame)
            .draw_most_up_to_date_chunk_on(
                chunk_pos,
                resolution,
                &mut rendered,
                IVec2::ZERO,
                BlendMode::Src,
                255,
            ),
        LayerContent::Vector(shape) => {
            render_shape_chunk(shape, chunk_pos, resolution, document.chunk_size(), &mut rendered)
        }
    };
    if !drew {
        return false;
    }
    apply_mask_clip(layer, chunk_pos, resolution, &mut rendered);
    target.blit(
        &rendered,
        IVec2::ZERO,
        layer.blend.mode,
        layer.blend.opacity_byte(),
        None,
    );
    true
}

/// Some(true) when the member has a visible mask with no content in this chunk,
/// meaning the member contributes nothing here. None when no mask applies.
fn masked_out(member: &MemberData, chunk_pos: IVec2) -> Option<bool> {
    let mask = member.mask.as_ref()?;
    if !member.mask_visible {
        return None;
    }
    Some(!mask.latest_or_committed_chunk_exists(chunk_pos))
}

/// Multiply a rendered chunk by the member's mask alpha.
fn apply_mask_clip(
    member: &MemberData,
    chunk_pos: IVec2,
    resolution: ChunkResolution,
    rendered: &mut PixelSurface,
) {
    let Some(mask) = member.mask.as_ref().filter(|_| member.mask_visible) else {
        return;
    };
    let mut mask_chunk = PixelSurface::new(rendered.size());
    mask.draw_most_up_to_date_chunk_on(
        chunk_pos,
        resolution,
        &mut mask_chunk,
        IVec2::ZERO,
        BlendMode::Src,
        255,
    );
    rendered.clamp_alpha(&mask_chunk);
}

/// Rasterize a vector layer's shape for one chunk. Shapes draw at full resolution
/// and downscale, keeping their look identical across preview levels.
fn render_shape_chunk(
    shape: &crate::state::ShapeDescriptor,
    chunk_pos: IVec2,
    resolution: ChunkResolution,
    chunk_size: u32,
    out: &mut PixelSurface,
) -> bool {
    let chunk_rect = math::chunk_pixel_rect(chunk_pos, chunk_size);
    let bounds = shape_bounds(shape);
    if bounds.intersect(chunk_rect).is_empty() {
        return false;
    }
    let mut full = PixelSurface::new_square(chunk_size);
    let origin = chunk_rect.pos;
    let fill = shape.fill.premultiply();
    let stroke = shape.stroke.premultiply();
    match &shape.kind {
        ShapeKind::Rectangle(rect) => {
            let px = rect.round_outwards().translate(-origin);
            full.fill_rect(
                px.inflate(-shape.stroke_width),
                fill,
                BlendMode::SrcOver,
                None,
            );
            if shape.stroke_width > 0 {
                // Inner stroke ring via four strips.
                let inner = px.inflate(-shape.stroke_width);
                for strip in [
                    IRect::from_corners(px.pos, IVec2::new(px.right(), inner.top())),
                    IRect::from_corners(IVec2::new(px.left(), inner.bottom()), IVec2::new(px.right(), px.bottom())),
                    IRect::from_corners(IVec2::new(px.left(), inner.top()), IVec2::new(inner.left(), inner.bottom())),
                    IRect::from_corners(IVec2::new(inner.right(), inner.top()), IVec2::new(px.right(), inner.bottom())),
                ] {
                    full.fill_rect(strip, stroke, BlendMode::SrcOver, None);
                }
            }
        }
        ShapeKind::Ellipse(rect) => {
            let local = rect.translate(-origin);
            full.fill_ellipse(
                local.inflate(-shape.stroke_width.max(1)),
                fill,
                BlendMode::SrcOver,
                None,
            );
            full.draw_ellipse_outline(local, stroke, BlendMode::SrcOver, None);
        }
        ShapeKind::Path(path) => {
            full.fill_path(
                &path.translated((-origin).as_dvec2()),
                fill,
                BlendMode::SrcOver,
                None,
            );
        }
    }
    if full.is_fully_transparent() {
        return false;
    }
    let scaled = match resolution {
        ChunkResolution::Full => full,
        other => full.downscaled_by(chunk_size / other.pixel_size(chunk_size)),
    };
    out.blit(&scaled, IVec2::ZERO, BlendMode::Src, 255, None);
    true
}

fn shape_bounds(shape: &crate::state::ShapeDescriptor) -> IRect {
    match &shape.kind {
        ShapeKind::Rectangle(rect) => rect.round_outwards(),
        ShapeKind::Ellipse(rect) => *rect,
        ShapeKind::Path(path) => path.bounds().round_outwards(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::changes::drawing::target_image_mut;
    use crate::changes::DrawTarget;
    use crate::color::{Color, Premul};
    use crate::image::ChunkyImage;
    use crate::state::{Location, MemberData, RasterContent};

    fn document_with_two_layers() -> (Document, MemberId, MemberId) {
        let mut document = Document::with_chunk_size(IVec2::splat(64), 16);
        let bottom = document
            .structure
            .add_member(
                Location::IndexIntoRoot(0),
                MemberData::new_layer(
                    "bottom".to_string(),
                    LayerContent::Raster(RasterContent::new_static(16)),
                ),
            )
            .unwrap();
        let top = document
            .structure
            .add_member(
                Location::Above(bottom),
                MemberData::new_layer(
                    "top".to_string(),
                    LayerContent::Raster(RasterContent::new_static(16)),
                ),
            )
            .unwrap();
        (document, bottom, top)
    }

    fn paint(document: &mut Document, member: MemberId, pos: IVec2, color: Color) {
        let image = target_image_mut(document, member, DrawTarget::Image, 0);
        image.enqueue_draw_pixel(pos, color);
        image.commit_changes();
    }

    #[test]
    fn empty_chunk_is_not_materialized() {
        let (document, _, _) = document_with_two_layers();
        assert!(matches!(
            merge_whole_structure(IVec2::ZERO, ChunkResolution::Full, &document),
            Either::Right(EmptyChunk)
        ));
    }

    #[test]
    fn top_layer_wins_in_z_order() {
        let (mut document, bottom, top) = document_with_two_layers();
        let red = Color::new(255, 0, 0, 255);
        let blue = Color::new(0, 0, 255, 255);
        paint(&mut document, bottom, IVec2::new(3, 3), red);
        paint(&mut document, top, IVec2::new(3, 3), blue);

        let Either::Left(chunk) =
            merge_whole_structure(IVec2::ZERO, ChunkResolution::Full, &document)
        else {
            panic!("expected populated chunk");
        };
        assert_eq!(chunk.surface().pixel(IVec2::new(3, 3)), blue.premultiply());
    }

    #[test]
    fn invisible_and_excluded_members_are_skipped() {
        let (mut document, bottom, top) = document_with_two_layers();
        let red = Color::new(255, 0, 0, 255);
        let blue = Color::new(0, 0, 255, 255);
        paint(&mut document, bottom, IVec2::new(3, 3), red);
        paint(&mut document, top, IVec2::new(3, 3), blue);
        document.find_member_mut(top).unwrap().visible = false;

        let Either::Left(chunk) =
            merge_whole_structure(IVec2::ZERO, ChunkResolution::Full, &document)
        else {
            panic!("expected populated chunk");
        };
        assert_eq!(chunk.surface().pixel(IVec2::new(3, 3)), red.premultiply());

        // Choose only the top member (visible again): bottom is excluded.
        document.find_member_mut(top).unwrap().visible = true;
        let chosen: hashbrown::HashSet<_> = [top].into_iter().collect();
        let Either::Left(chunk) =
            merge_chosen_members(IVec2::ZERO, ChunkResolution::Full, &document, &chosen)
        else {
            panic!("expected populated chunk");
        };
        assert_eq!(chunk.surface().pixel(IVec2::new(3, 3)), blue.premultiply());
    }

    #[test]
    fn mask_clips_layer_content() {
        let (mut document, bottom, _) = document_with_two_layers();
        let red = Color::new(255, 0, 0, 255);
        paint(&mut document, bottom, IVec2::new(3, 3), red);
        paint(&mut document, bottom, IVec2::new(8, 8), red);
        {
            let data = document.find_member_mut(bottom).unwrap();
            let mut mask = ChunkyImage::new(16);
            mask.enqueue_draw_pixel(IVec2::new(3, 3), Color::WHITE);
            mask.commit_changes();
            data.mask = Some(mask);
        }
        let Either::Left(chunk) =
            merge_whole_structure(IVec2::ZERO, ChunkResolution::Full, &document)
        else {
            panic!("expected populated chunk");
        };
        assert_eq!(chunk.surface().pixel(IVec2::new(3, 3)), red.premultiply());
        assert_eq!(chunk.surface().pixel(IVec2::new(8, 8)), Premul::TRANSPARENT);
    }

    #[test]
    fn folder_opacity_applies_to_contents() {
        let mut document = Document::with_chunk_size(IVec2::splat(64), 16);
        let folder = document
            .structure
            .add_member(
                Location::IndexIntoRoot(0),
                MemberData::new_folder("folder".to_string()),
            )
            .unwrap();
        let layer = document
            .structure
            .add_member(
                Location::IndexIntoFolder(folder, 0),
                MemberData::new_layer(
                    "layer".to_string(),
                    LayerContent::Raster(RasterContent::new_static(16)),
                ),
            )
            .unwrap();
        paint(&mut document, layer, IVec2::new(2, 2), Color::new(255, 0, 0, 255));
        document.find_member_mut(folder).unwrap().blend.opacity = 0.5;

        let Either::Left(chunk) =
            merge_whole_structure(IVec2::ZERO, ChunkResolution::Full, &document)
        else {
            panic!("expected populated chunk");
        };
        let pixel = chunk.surface().pixel(IVec2::new(2, 2));
        assert!(pixel.alpha() > 100 && pixel.alpha() < 155, "alpha {}", pixel.alpha());
    }
}
