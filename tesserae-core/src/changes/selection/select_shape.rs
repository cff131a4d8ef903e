//! Rectangle and lasso selection: both rasterize a path shape into the mask, with
//! live preview while the gesture drags.

use crate::changes::{
    single_info, AppliedChange, Change, ChangeInfo, ChangeInfos, UpdateableChange,
};
use crate::image::{AffectedArea, CommittedChunkStorage};
use crate::math::{IRect, Path};
use crate::state::{Document, SelectionMode};

pub struct SelectRectangle {
    inner: SelectShape,
}

impl SelectRectangle {
    #[must_use]
    pub fn new(rect: IRect, mode: SelectionMode) -> Self {
        Self {
            inner: SelectShape::new(Path::from_rect(rect.as_rect()), mode),
        }
    }
    pub fn update(&mut self, rect: IRect) {
        self.inner.shape = Path::from_rect(rect.as_rect());
    }
}

pub struct SelectPath {
    inner: SelectShape,
}

impl SelectPath {
    #[must_use]
    pub fn new(path: Path, mode: SelectionMode) -> Self {
        Self {
            inner: SelectShape::new(path, mode),
        }
    }
    /// Extend the lasso outline with the gesture's newest points.
    pub fn update(&mut self, path: Path) {
        self.inner.shape = path;
    }
}

struct SelectShape {
    shape: Path,
    mode: SelectionMode,
    stored: Option<CommittedChunkStorage>,
    old_path: Option<Option<Path>>,
    was_empty: bool,
    last_preview_area: AffectedArea,
}

impl SelectShape {
    fn new(shape: Path, mode: SelectionMode) -> Self {
        Self {
            shape,
            mode,
            stored: None,
            old_path: None,
            was_empty: true,
            last_preview_area: AffectedArea::new(),
        }
    }

    fn enqueue(&self, document: &mut Document) {
        if let Some((surface, pos)) = super::rasterize_shape(&self.shape) {
            super::enqueue_combine(&mut document.selection.mask, surface, pos, self.mode);
        } else if self.mode == SelectionMode::New {
            // Collapsed shape with a replacing mode: becomes "select nothing".
            document.selection.mask.enqueue_clear();
        }
    }

    fn validate(&mut self, document: &Document) -> bool {
        self.old_path = Some(document.selection.path.clone());
        self.was_empty = document.selection.is_empty();
        true
    }

    fn apply(&mut self, document: &mut Document, _first_apply: bool) -> AppliedChange {
        let shape_has_area = !self.shape.bounds().round_outwards().is_empty();
        if !shape_has_area && self.mode != SelectionMode::New {
            document.selection.mask.cancel_changes();
            return AppliedChange::ignored();
        }
        document.selection.mask.cancel_changes();
        self.enqueue(document);
        let mask = &mut document.selection.mask;
        let area = crate::changes::drawing::snapshot_and_commit(mask, &mut self.stored);
        document.selection.path =
            super::combined_path(&self.shape, self.mode, self.was_empty);
        AppliedChange::new(single_info(ChangeInfo::SelectionChunks { area }))
    }

    fn revert(&mut self, document: &mut Document) -> ChangeInfos {
        let storage = self
            .stored
            .take()
            .expect("reverting a selection change that was never applied");
        let mask = &mut document.selection.mask;
        let area = storage.apply_chunks_to_image(mask);
        mask.commit_changes();
        document.selection.path = self.old_path.clone().unwrap_or(None);
        single_info(ChangeInfo::SelectionChunks { area })
    }

    fn apply_temporarily(&mut self, document: &mut Document) -> ChangeInfos {
        document.selection.mask.cancel_changes();
        self.enqueue(document);
        let new_area = document.selection.mask.find_affected_area();
        let mut area = std::mem::replace(&mut self.last_preview_area, new_area.clone());
        area.union_with(&new_area);
        single_info(ChangeInfo::SelectionChunks { area })
    }

    fn cancel_preview(&mut self, document: &mut Document) {
        document.selection.mask.cancel_changes();
    }
}

macro_rules! delegate_change {
    ($ty:ident) => {
        impl Change for $ty {
            fn initialize_and_validate(&mut self, document: &Document) -> bool {
                self.inner.validate(document)
            }
            fn apply(&mut self, document: &mut Document, first_apply: bool) -> AppliedChange {
                self.inner.apply(document, first_apply)
            }
            fn revert(&mut self, document: &mut Document) -> ChangeInfos {
                self.inner.revert(document)
            }
        }
        impl UpdateableChange for $ty {
            fn apply_temporarily(&mut self, document: &mut Document) -> ChangeInfos {
                self.inner.apply_temporarily(document)
            }
            fn cancel_preview(&mut self, document: &mut Document) {
                self.inner.cancel_preview(document);
            }
        }
    };
}
delegate_change!(SelectRectangle);
delegate_change!(SelectPath);

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::{Color, Premul};
    use glam::{DVec2, IVec2};

    fn selected(document: &Document, pos: IVec2) -> bool {
        document.selection.mask.committed_pixel(pos) != Premul::TRANSPARENT
    }

    #[test]
    fn rectangle_selection_sets_mask_and_path() {
        let mut document = Document::with_chunk_size(IVec2::splat(64), 16);
        let mut change = SelectRectangle::new(
            IRect::new(IVec2::new(4, 4), IVec2::new(10, 10)),
            SelectionMode::New,
        );
        assert!(change.initialize_and_validate(&document));
        change.apply(&mut document, false);
        assert!(selected(&document, IVec2::new(5, 5)));
        assert!(!selected(&document, IVec2::new(20, 20)));
        assert!(document.selection.path.is_some());

        change.revert(&mut document);
        assert!(document.selection.is_empty());
        assert!(document.selection.path.is_none());
    }

    #[test]
    fn subtract_mode_cuts_hole() {
        let mut document = Document::with_chunk_size(IVec2::splat(64), 16);
        let mut select_all = SelectRectangle::new(
            IRect::new(IVec2::ZERO, IVec2::splat(32)),
            SelectionMode::New,
        );
        assert!(select_all.initialize_and_validate(&document));
        select_all.apply(&mut document, false);

        let mut subtract = SelectRectangle::new(
            IRect::new(IVec2::new(8, 8), IVec2::splat(8)),
            SelectionMode::Subtract,
        );
        assert!(subtract.initialize_and_validate(&document));
        subtract.apply(&mut document, false);

        assert!(selected(&document, IVec2::new(2, 2)));
        assert!(!selected(&document, IVec2::new(10, 10)));
        // Subtracting drops the exact path.
        assert!(document.selection.path.is_none());
    }

    #[test]
    fn intersect_keeps_only_overlap() {
        let mut document = Document::with_chunk_size(IVec2::splat(64), 16);
        let mut first = SelectRectangle::new(
            IRect::new(IVec2::ZERO, IVec2::splat(20)),
            SelectionMode::New,
        );
        assert!(first.initialize_and_validate(&document));
        first.apply(&mut document, false);

        let mut second = SelectRectangle::new(
            IRect::new(IVec2::splat(10), IVec2::splat(20)),
            SelectionMode::Intersect,
        );
        assert!(second.initialize_and_validate(&document));
        second.apply(&mut document, false);

        assert!(selected(&document, IVec2::new(15, 15)));
        assert!(!selected(&document, IVec2::new(5, 5)));
        assert!(!selected(&document, IVec2::new(25, 25)));
    }

    #[test]
    fn lasso_selects_inside_polygon() {
        let mut document = Document::with_chunk_size(IVec2::splat(64), 16);
        let triangle = Path::from_points(vec![
            DVec2::new(2.0, 2.0),
            DVec2::new(30.0, 2.0),
            DVec2::new(2.0, 30.0),
        ]);
        let mut change = SelectPath::new(triangle, SelectionMode::New);
        assert!(change.initialize_and_validate(&document));
        change.apply(&mut document, false);
        assert!(selected(&document, IVec2::new(5, 5)));
        assert!(!selected(&document, IVec2::new(28, 28)));
    }
}
