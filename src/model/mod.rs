//! Geomodel entities and the model container.
//!
//! # Overview
//!
//! The primary type is [`GeoModel`], which owns the meshed entities of the
//! four kinds (corner, line, surface, region). Each entity carries its own
//! local mesh and vertex attributes; entities are identified by an
//! [`EntityId`] and consumed uniformly through the [`MeshEntity`] trait.
//!
//! The aggregation layer in [`crate::aggregate`] unifies the per-entity
//! local meshes into one global, deduplicated mesh.

mod entity;
mod geomodel;

pub use entity::{
    barycenter, polygon_normal, CellType, CornerMesh, EntityId, EntityType, GmeVertex, LineMesh,
    MeshEntity, PolygonType, RegionMesh, SurfaceMesh, NB_CELL_TYPES, NB_POLYGON_TYPES,
};
pub use geomodel::{GeoModel, DEFAULT_EPSILON};
