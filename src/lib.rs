//! # Strata
//!
//! Mesh indexing for structural geomodels.
//!
//! A geomodel is a set of independently meshed entities — corners, lines,
//! surfaces and volumetric regions — that share geometry along their
//! boundaries without sharing any numbering. Strata builds the model-wide
//! view: a deduplicated global vertex set with a bidirectional map to every
//! entity-local vertex, flat edge/polygon/cell collections indexed against
//! it, adjacency reconstructed across entity boundaries, and vertex
//! duplication along faults for mechanical workflows.
//!
//! ## Features
//!
//! - **Global vertex set**: ε-tolerant deduplication over all entities,
//!   kept consistent through deletions, insertions and moves
//! - **Typed aggregates**: edges, polygons (triangle/quad/polygon) and
//!   cells (tet/hex/prism/pyramid/connector) in canonical per-entity,
//!   per-type order with O(1) range queries
//! - **Generic attributes**: typed, named attribute storage on every
//!   entity's vertices, with permutation and compaction support
//! - **Fault duplication**: flood-fill vertex splitting along interior
//!   surfaces, with free-border handling
//!
//! ## Quick Start
//!
//! ```
//! use strata::prelude::*;
//! use nalgebra::Point3;
//!
//! let mut model = GeoModel::new();
//! model.add_corner(Point3::new(0.0, 0.0, 0.0));
//! model.add_line(vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//! ])?;
//! model.add_surface(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ],
//!     &[vec![0, 1, 2]],
//! )?;
//!
//! let mut mesh = GeoModelMesh::new(model);
//!
//! // 1 + 2 + 3 entity vertices, 3 unique positions.
//! assert_eq!(mesh.vertices().nb_vertices(), 3);
//! assert_eq!(mesh.edges().nb_edges(), 1);
//! assert_eq!(mesh.polygons().nb_polygons(None), 1);
//! # Ok::<(), GeoModelError>(())
//! ```
//!
//! ## The vertex map
//!
//! Every entity vertex knows its global vertex and every global vertex
//! knows its entity mentions:
//!
//! ```
//! use strata::prelude::*;
//! use nalgebra::Point3;
//!
//! let mut model = GeoModel::new();
//! model.add_corner(Point3::new(0.0, 0.0, 0.0));
//! model.add_line(vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//! ])?;
//!
//! let mut vertices = ModelVertices::new();
//! vertices.initialize(&mut model);
//!
//! let corner = EntityId::new(EntityType::Corner, 0);
//! let global = vertices.global_vertex(&model, corner, 0);
//! // The corner and the first line endpoint share it.
//! assert_eq!(vertices.gme_vertices(global).len(), 2);
//! # Ok::<(), GeoModelError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod attrib;
pub mod error;
pub mod model;
pub mod spatial;

/// Sentinel index: "no element". Used for unset map slots, missing
/// adjacencies and outright deletions.
pub const NO_ID: usize = usize::MAX;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types:
///
/// ```
/// use strata::prelude::*;
/// ```
pub mod prelude {
    pub use crate::aggregate::{DuplicateMode, GeoModelMesh, ModelVertices};
    pub use crate::attrib::{AttributesManager, AttributeKind};
    pub use crate::error::{GeoModelError, Result};
    pub use crate::model::{
        CellType, EntityId, EntityType, GeoModel, GmeVertex, MeshEntity, PolygonType,
    };
    pub use crate::NO_ID;
}

// Re-export nalgebra types for convenience
pub use nalgebra;
