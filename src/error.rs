//! Error types for strata.
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

use crate::model::EntityId;

/// Result type alias using [`GeoModelError`].
pub type Result<T> = std::result::Result<T, GeoModelError>;

/// Errors that can occur while assembling or aggregating a geomodel.
#[derive(Error, Debug)]
pub enum GeoModelError {
    /// A mesh element references a vertex index outside its entity's mesh.
    #[error("{entity:?}: element {element} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The owning entity.
        entity: EntityId,
        /// The element index within the entity.
        element: usize,
        /// The invalid local vertex index.
        vertex: usize,
    },

    /// A surface polygon has fewer than three vertices.
    #[error("{entity:?}: polygon {polygon} has {nb_vertices} vertices (minimum is 3)")]
    DegeneratePolygon {
        /// The owning surface.
        entity: EntityId,
        /// The polygon index within the surface.
        polygon: usize,
        /// The offending vertex count.
        nb_vertices: usize,
    },

    /// An entity id refers to an instance that does not exist in the model.
    #[error("no entity {0:?} in the model")]
    UnknownEntity(EntityId),

    /// The volumetric mesh is inconsistent: a cell expected to contain a
    /// vertex does not reference it.
    #[error("corrupt topology: cell {cell} does not contain global vertex {vertex}")]
    CorruptTopology {
        /// The global cell index.
        cell: usize,
        /// The global vertex id that should appear in the cell.
        vertex: usize,
    },

    /// A duplication flood reached a surface from more sides than a manifold
    /// surface can have.
    #[error("non-manifold junction at surface {surface} during vertex duplication")]
    NonManifoldJunction {
        /// The surface index.
        surface: usize,
    },
}
