//! # Structure tree
//! The document's members form a tree: raster or vector layers at the leaves, folders
//! above them, an invisible root at the top. Children are ordered bottom-to-top;
//! rendering walks each folder's list in order, so index 0 is the bottom-most member.
//!
//! Members are addressed by stable [`MemberId`]s that stay valid across moves and
//! delete/undo cycles, backed by an `id_tree` with an id sidecar map.

use crate::blend::Blend;
use crate::color::Color;
use crate::image::ChunkyImage;
use crate::math::{IRect, Path, Rect};

pub type MemberId = crate::ObjectId<MemberData>;

/// Pixel content of a raster layer: one image per animation frame. Static layers
/// simply hold a single frame.
pub struct RasterContent {
    frames: Vec<ChunkyImage>,
}

impl RasterContent {
    #[must_use]
    pub fn new_static(chunk_size: u32) -> Self {
        Self {
            frames: vec![ChunkyImage::new(chunk_size)],
        }
    }
    #[must_use]
    pub fn from_image(image: ChunkyImage) -> Self {
        Self { frames: vec![image] }
    }
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
    pub fn push_frame(&mut self, image: ChunkyImage) {
        self.frames.push(image);
    }
    /// Image for the given timeline frame. Indices past the end clamp to the last
    /// frame, so static layers show their one image everywhere.
    #[must_use]
    pub fn image_at_frame(&self, frame: usize) -> &ChunkyImage {
        // Unwrap ok - the frames vec is never empty by construction.
        self.frames.get(frame).unwrap_or_else(|| self.frames.last().unwrap())
    }
    pub fn image_at_frame_mut(&mut self, frame: usize) -> &mut ChunkyImage {
        let idx = frame.min(self.frames.len() - 1);
        &mut self.frames[idx]
    }
    /// Swap the image of one frame, returning the old one. Used by changes that
    /// replace the image object wholesale (apply-mask and friends).
    pub fn replace_frame(&mut self, frame: usize, image: ChunkyImage) -> ChunkyImage {
        let idx = frame.min(self.frames.len() - 1);
        std::mem::replace(&mut self.frames[idx], image)
    }
}

/// Geometry of a vector-backed layer, rasterized on demand at render time.
#[derive(Clone, PartialEq, Debug)]
pub struct ShapeDescriptor {
    pub kind: ShapeKind,
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: i32,
}

#[derive(Clone, PartialEq, Debug)]
pub enum ShapeKind {
    Rectangle(Rect),
    Ellipse(IRect),
    Path(Path),
}

pub enum LayerContent {
    Raster(RasterContent),
    Vector(ShapeDescriptor),
}

impl LayerContent {
    #[must_use]
    pub fn raster(&self) -> Option<&RasterContent> {
        match self {
            Self::Raster(r) => Some(r),
            Self::Vector(_) => None,
        }
    }
    pub fn raster_mut(&mut self) -> Option<&mut RasterContent> {
        match self {
            Self::Raster(r) => Some(r),
            Self::Vector(_) => None,
        }
    }
}

enum MemberTy {
    // The invisible top of the tree. Never exposed through the public API.
    Root,
    Folder,
    Layer(LayerContent),
}

pub struct MemberData {
    // NOT public - the sidecar map must stay in sync with this.
    id: MemberId,
    ty: MemberTy,
    pub name: String,
    pub visible: bool,
    pub blend: Blend,
    pub lock_transparency: bool,
    pub mask: Option<ChunkyImage>,
    pub mask_visible: bool,
}

impl MemberData {
    fn with_ty(name: String, ty: MemberTy) -> Self {
        Self {
            id: MemberId::default(),
            ty,
            name,
            visible: true,
            blend: Blend::default(),
            lock_transparency: false,
            mask: None,
            mask_visible: true,
        }
    }
    #[must_use]
    pub fn new_folder(name: String) -> Self {
        Self::with_ty(name, MemberTy::Folder)
    }
    #[must_use]
    pub fn new_layer(name: String, content: LayerContent) -> Self {
        Self::with_ty(name, MemberTy::Layer(content))
    }
    #[must_use]
    pub fn id(&self) -> MemberId {
        self.id
    }
    /// Take a predetermined id instead of the freshly minted one. Structural
    /// changes use this so redo recreates a member under its original identity.
    #[must_use]
    pub fn with_id(mut self, id: MemberId) -> Self {
        self.id = id;
        self
    }
    #[must_use]
    pub fn is_folder(&self) -> bool {
        matches!(self.ty, MemberTy::Folder)
    }
    #[must_use]
    pub fn is_layer(&self) -> bool {
        matches!(self.ty, MemberTy::Layer(..))
    }
    #[must_use]
    pub fn layer(&self) -> Option<&LayerContent> {
        match &self.ty {
            MemberTy::Layer(content) => Some(content),
            _ => None,
        }
    }
    pub fn layer_mut(&mut self) -> Option<&mut LayerContent> {
        match &mut self.ty {
            MemberTy::Layer(content) => Some(content),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TargetError {
    #[error("ID not found")]
    TargetNotFound,
    #[error("target is not a folder")]
    NotAFolder,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MoveError {
    #[error("target not found: {}", .0)]
    TargetError(TargetError),
    #[error("destination not found: {}", .0)]
    DestinationError(TargetError),
    #[error("can't move a member into its own [grand]children")]
    WouldCycle,
}

/// Where to place a member. Indices count from the bottom; too-large indices clamp
/// to the top position.
#[derive(Copy, Clone)]
pub enum Location {
    Above(MemberId),
    IndexIntoFolder(MemberId, usize),
    IndexIntoRoot(usize),
}

/// A member (and its whole subtree) lifted out of the tree, holding all owned data.
/// Delete changes keep one of these around so revert can put everything back.
pub struct DetachedMember {
    pub data: MemberData,
    pub children: Vec<DetachedMember>,
}

pub struct StructureTree {
    tree: id_tree::Tree<MemberData>,
    ids: hashbrown::HashMap<MemberId, id_tree::NodeId>,
}

impl Default for StructureTree {
    fn default() -> Self {
        Self {
            tree: id_tree::TreeBuilder::new()
                .with_root(id_tree::Node::new(MemberData::with_ty(
                    String::new(),
                    MemberTy::Root,
                )))
                .build(),
            ids: hashbrown::HashMap::new(),
        }
    }
}

impl StructureTree {
    #[must_use]
    pub fn get(&self, id: MemberId) -> Option<&MemberData> {
        let tree_id = self.ids.get(&id)?;
        self.tree.get(tree_id).ok().map(id_tree::Node::data)
    }
    pub fn get_mut(&mut self, id: MemberId) -> Option<&mut MemberData> {
        let tree_id = self.ids.get(&id)?;
        self.tree.get_mut(tree_id).ok().map(id_tree::Node::data_mut)
    }

    /// Iterate the bottom-to-top children of the root.
    pub fn iter_top_level(&self) -> impl Iterator<Item = &MemberData> + '_ {
        // Unwrap ok - the root always exists.
        self.iter_children_of_raw(self.tree.root_node_id().unwrap())
            .unwrap()
    }
    /// Iterate the bottom-to-top children of a folder.
    #[must_use]
    pub fn iter_children(&self, folder: MemberId) -> Option<impl Iterator<Item = &MemberData> + '_> {
        let tree_id = self.ids.get(&folder)?;
        if !self.tree.get(tree_id).ok()?.data().is_folder() {
            return None;
        }
        self.iter_children_of_raw(tree_id)
    }
    /// Iterate every member in the tree, parents before children.
    pub fn iter(&self) -> impl Iterator<Item = &MemberData> + '_ {
        // Unwrap ok - the root always exists.
        self.tree
            .traverse_pre_order(self.tree.root_node_id().unwrap())
            .unwrap()
            .map(id_tree::Node::data)
            .filter(|data| !matches!(data.ty, MemberTy::Root))
    }

    fn iter_children_of_raw<'s>(
        &'s self,
        node_id: &id_tree::NodeId,
    ) -> Option<impl Iterator<Item = &'s MemberData> + 's> {
        Some(
            self.tree
                .children(node_id)
                .ok()?
                .map(id_tree::Node::data),
        )
    }

    /// Convert a location to a parent id and child index.
    fn find_location(
        &self,
        location: Location,
    ) -> Result<(id_tree::NodeId, usize), TargetError> {
        match location {
            Location::Above(sibling) => {
                let sibling_tree_id = self
                    .ids
                    .get(&sibling)
                    .ok_or(TargetError::TargetNotFound)?;
                let node = self
                    .tree
                    .get(sibling_tree_id)
                    .map_err(|_| TargetError::TargetNotFound)?;
                // Unwrap ok - only the root lacks a parent and root ids never escape.
                let parent = node.parent().unwrap();
                let idx = self
                    .tree
                    .children_ids(parent)
                    // Unwrap ok - the parent is in the tree if the child was.
                    .unwrap()
                    .position(|id| id == sibling_tree_id)
                    .unwrap();
                Ok((parent.clone(), idx + 1))
            }
            Location::IndexIntoFolder(folder, idx) => {
                let tree_id = self
                    .ids
                    .get(&folder)
                    .ok_or(TargetError::TargetNotFound)?;
                let node = self
                    .tree
                    .get(tree_id)
                    .map_err(|_| TargetError::TargetNotFound)?;
                if !node.data().is_folder() {
                    return Err(TargetError::NotAFolder);
                }
                Ok((tree_id.clone(), idx))
            }
            Location::IndexIntoRoot(idx) => {
                Ok((self.tree.root_node_id().unwrap().clone(), idx))
            }
        }
    }

    /// Insert a new member. The returned id comes from the data itself.
    pub fn add_member(
        &mut self,
        location: Location,
        data: MemberData,
    ) -> Result<MemberId, TargetError> {
        assert!(
            !matches!(data.ty, MemberTy::Root),
            "cannot insert a root member"
        );
        let id = data.id;
        let (parent_id, idx) = self.find_location(location)?;
        let child_count = self.tree.children_ids(&parent_id).unwrap().count();
        let new_node = self
            .tree
            .insert(
                id_tree::Node::new(data),
                id_tree::InsertBehavior::UnderNode(&parent_id),
            )
            .map_err(|_| TargetError::TargetNotFound)?;
        // Unwrap ok - we just added it, of course it will be found.
        self.tree
            .make_nth_sibling(&new_node, idx.min(child_count))
            .unwrap();
        self.ids.insert(id, new_node);
        Ok(id)
    }

    /// Get the (parent, index) of a member. Parent is None when the root holds it.
    #[must_use]
    pub fn location_of(&self, id: MemberId) -> Option<(Option<MemberId>, usize)> {
        let tree_id = self.ids.get(&id)?;
        let node = self.tree.get(tree_id).ok()?;
        // Unwrap ok - user-held ids never refer to the root.
        let parent = node.parent().unwrap();
        let child_idx = self
            .tree
            .children_ids(parent)
            .unwrap()
            .position(|child_id| child_id == tree_id)
            .unwrap();
        let parent_data = self.tree.get(parent).unwrap().data();
        let parent_id = match parent_data.ty {
            MemberTy::Root => None,
            _ => Some(parent_data.id),
        };
        Some((parent_id, child_idx))
    }

    /// Would moving `target` to `destination` detach the subtree from itself?
    /// Read-only companion to [`Self::move_member`] for validation.
    #[must_use]
    pub fn would_cycle(&self, target: MemberId, destination: Location) -> bool {
        let Some(target_tree_id) = self.ids.get(&target) else {
            return false;
        };
        let Ok((destination_id, _)) = self.find_location(destination) else {
            return false;
        };
        std::iter::once(&destination_id)
            .chain(self.tree.ancestor_ids(&destination_id).into_iter().flatten())
            .any(|ancestor| ancestor == target_tree_id)
    }

    /// Move a member (subtree included) to a new location.
    pub fn move_member(&mut self, target: MemberId, destination: Location) -> Result<(), MoveError> {
        let target_tree_id = self
            .ids
            .get(&target)
            .cloned()
            .ok_or(MoveError::TargetError(TargetError::TargetNotFound))?;
        let (destination_id, idx) = self
            .find_location(destination)
            .map_err(MoveError::DestinationError)?;
        // Moving under one's own descendant (or oneself) would detach the subtree.
        if std::iter::once(&destination_id)
            .chain(
                self.tree
                    .ancestor_ids(&destination_id)
                    .map_err(|_| MoveError::DestinationError(TargetError::TargetNotFound))?,
            )
            .any(|ancestor| *ancestor == target_tree_id)
        {
            return Err(MoveError::WouldCycle);
        }
        self.tree
            .move_node(
                &target_tree_id,
                id_tree::MoveBehavior::ToParent(&destination_id),
            )
            .map_err(|_| MoveError::TargetError(TargetError::TargetNotFound))?;
        let child_count = self.tree.children_ids(&destination_id).unwrap().count();
        // Unwrap ok - move_node already checked presence of target.
        self.tree
            .make_nth_sibling(&target_tree_id, idx.min(child_count.saturating_sub(1)))
            .unwrap();
        Ok(())
    }

    /// Lift a member and its whole subtree out of the tree, transferring ownership
    /// of all contained data (images, masks) to the caller.
    pub fn detach_subtree(&mut self, target: MemberId) -> Result<DetachedMember, TargetError> {
        let tree_id = self
            .ids
            .get(&target)
            .cloned()
            .ok_or(TargetError::TargetNotFound)?;
        // Pull children out bottom-up first so their data moves instead of dropping.
        let child_ids: Vec<MemberId> = self
            .tree
            .children(&tree_id)
            .map_err(|_| TargetError::TargetNotFound)?
            .map(|node| node.data().id)
            .collect();
        let mut children = Vec::with_capacity(child_ids.len());
        for child in child_ids {
            children.push(self.detach_subtree(child)?);
        }
        let mut node = self
            .tree
            .remove_node(tree_id, id_tree::RemoveBehavior::DropChildren)
            .map_err(|_| TargetError::TargetNotFound)?;
        self.ids.remove(&target);
        // Swap a throwaway root in to take ownership of the data.
        let data = node.replace_data(MemberData::with_ty(String::new(), MemberTy::Root));
        Ok(DetachedMember { data, children })
    }

    /// Reattach a previously detached subtree, ids and ordering preserved.
    pub fn insert_detached(
        &mut self,
        location: Location,
        detached: DetachedMember,
    ) -> Result<MemberId, TargetError> {
        let id = self.add_member(location, detached.data)?;
        for (idx, child) in detached.children.into_iter().enumerate() {
            self.insert_detached(Location::IndexIntoFolder(id, idx), child)?;
        }
        Ok(id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn layer(name: &str) -> MemberData {
        MemberData::new_layer(
            name.to_string(),
            LayerContent::Raster(RasterContent::new_static(16)),
        )
    }

    #[test]
    fn add_and_look_up() {
        let mut tree = StructureTree::default();
        let id = tree
            .add_member(Location::IndexIntoRoot(0), layer("Background"))
            .unwrap();
        assert_eq!(tree.get(id).map(|m| m.name.as_str()), Some("Background"));
        assert_eq!(tree.location_of(id), Some((None, 0)));
    }

    #[test]
    fn above_places_on_top_of_sibling() {
        let mut tree = StructureTree::default();
        let bottom = tree
            .add_member(Location::IndexIntoRoot(0), layer("bottom"))
            .unwrap();
        let top = tree
            .add_member(Location::Above(bottom), layer("top"))
            .unwrap();
        assert_eq!(tree.location_of(top), Some((None, 1)));
        let names: Vec<_> = tree.iter_top_level().map(|m| m.name.clone()).collect();
        assert_eq!(names, ["bottom", "top"]);
    }

    #[test]
    fn move_into_own_child_is_rejected() {
        let mut tree = StructureTree::default();
        let folder = tree
            .add_member(
                Location::IndexIntoRoot(0),
                MemberData::new_folder("folder".to_string()),
            )
            .unwrap();
        let inner = tree
            .add_member(
                Location::IndexIntoFolder(folder, 0),
                MemberData::new_folder("inner".to_string()),
            )
            .unwrap();
        assert_eq!(
            tree.move_member(folder, Location::IndexIntoFolder(inner, 0)),
            Err(MoveError::WouldCycle)
        );
    }

    #[test]
    fn detach_and_reinsert_preserves_subtree() {
        let mut tree = StructureTree::default();
        let folder = tree
            .add_member(
                Location::IndexIntoRoot(0),
                MemberData::new_folder("folder".to_string()),
            )
            .unwrap();
        let a = tree
            .add_member(Location::IndexIntoFolder(folder, 0), layer("a"))
            .unwrap();
        let b = tree
            .add_member(Location::IndexIntoFolder(folder, 1), layer("b"))
            .unwrap();

        let detached = tree.detach_subtree(folder).unwrap();
        assert!(tree.get(folder).is_none());
        assert!(tree.get(a).is_none());

        tree.insert_detached(Location::IndexIntoRoot(0), detached)
            .unwrap();
        assert!(tree.get(folder).is_some());
        let children: Vec<_> = tree
            .iter_children(folder)
            .unwrap()
            .map(|m| m.id())
            .collect();
        assert_eq!(children, [a, b]);
    }
}
