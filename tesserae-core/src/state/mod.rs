//! # Document state
//! Everything the change pipeline mutates lives under this module: the document
//! itself, its member tree, and the active selection.

pub mod document;
pub mod selection;
pub mod structure;

pub use document::{Document, DocumentId, SymmetryAxis};
pub use selection::{Selection, SelectionMode};
pub use structure::{
    DetachedMember, LayerContent, Location, MemberData, MemberId, RasterContent, ShapeDescriptor,
    ShapeKind, StructureTree,
};
