//! The geomodel container.
//!
//! A [`GeoModel`] owns the entity instances (corners, lines, surfaces,
//! regions) and the model-wide geometric tolerance. Construction helpers
//! validate their input and return [`GeoModelError`] on malformed meshes;
//! once built, entity indices are stable and the aggregation layer indexes
//! entities directly.

use nalgebra::Point3;

use super::entity::{
    CellType, CornerMesh, EntityId, EntityType, LineMesh, MeshEntity, RegionMesh, SurfaceMesh,
};
use crate::error::{GeoModelError, Result};

/// Default model-wide colocation tolerance.
pub const DEFAULT_EPSILON: f64 = 1e-8;

/// A structural geomodel: a set of meshed entities of the four kinds.
#[derive(Debug)]
pub struct GeoModel {
    corners: Vec<CornerMesh>,
    lines: Vec<LineMesh>,
    surfaces: Vec<SurfaceMesh>,
    regions: Vec<RegionMesh>,
    epsilon: f64,
}

impl Default for GeoModel {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoModel {
    /// Create an empty model with the default tolerance.
    pub fn new() -> Self {
        Self {
            corners: Vec::new(),
            lines: Vec::new(),
            surfaces: Vec::new(),
            regions: Vec::new(),
            epsilon: DEFAULT_EPSILON,
        }
    }

    /// The model-wide colocation tolerance ε.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Set the model-wide colocation tolerance ε.
    pub fn set_epsilon(&mut self, epsilon: f64) {
        assert!(epsilon > 0.0);
        self.epsilon = epsilon;
    }

    // ==================== Construction ====================

    /// Add a corner at `point`.
    pub fn add_corner(&mut self, point: Point3<f64>) -> EntityId {
        let id = EntityId::new(EntityType::Corner, self.corners.len());
        self.corners.push(CornerMesh::new(id.index, point));
        id
    }

    /// Add a line from an ordered polyline of at least two points.
    pub fn add_line(&mut self, points: Vec<Point3<f64>>) -> Result<EntityId> {
        let id = EntityId::new(EntityType::Line, self.lines.len());
        if points.len() < 2 {
            return Err(GeoModelError::InvalidVertexIndex {
                entity: id,
                element: 0,
                vertex: points.len(),
            });
        }
        self.lines.push(LineMesh::new(id.index, points));
        Ok(id)
    }

    /// Add a surface from points and polygons given as local vertex lists.
    pub fn add_surface(
        &mut self,
        points: Vec<Point3<f64>>,
        polygons: &[Vec<usize>],
    ) -> Result<EntityId> {
        let id = EntityId::new(EntityType::Surface, self.surfaces.len());
        let mut ptr = Vec::with_capacity(polygons.len() + 1);
        let mut corners = Vec::new();
        ptr.push(0);
        for (p, polygon) in polygons.iter().enumerate() {
            if polygon.len() < 3 {
                return Err(GeoModelError::DegeneratePolygon {
                    entity: id,
                    polygon: p,
                    nb_vertices: polygon.len(),
                });
            }
            for &v in polygon {
                if v >= points.len() {
                    return Err(GeoModelError::InvalidVertexIndex {
                        entity: id,
                        element: p,
                        vertex: v,
                    });
                }
                corners.push(v);
            }
            ptr.push(corners.len());
        }
        self.surfaces
            .push(SurfaceMesh::new(id.index, points, ptr, corners));
        Ok(id)
    }

    /// Add a region from points and typed cells given as local vertex lists.
    pub fn add_region(
        &mut self,
        points: Vec<Point3<f64>>,
        cells: &[(CellType, Vec<usize>)],
    ) -> Result<EntityId> {
        let id = EntityId::new(EntityType::Region, self.regions.len());
        let mut types = Vec::with_capacity(cells.len());
        let mut ptr = Vec::with_capacity(cells.len() + 1);
        let mut corners = Vec::new();
        ptr.push(0);
        for (c, (cell_type, vertices)) in cells.iter().enumerate() {
            if vertices.len() != cell_type.nb_vertices() {
                return Err(GeoModelError::InvalidVertexIndex {
                    entity: id,
                    element: c,
                    vertex: vertices.len(),
                });
            }
            for &v in vertices {
                if v >= points.len() {
                    return Err(GeoModelError::InvalidVertexIndex {
                        entity: id,
                        element: c,
                        vertex: v,
                    });
                }
                corners.push(v);
            }
            types.push(*cell_type);
            ptr.push(corners.len());
        }
        self.regions
            .push(RegionMesh::new(id.index, points, types, ptr, corners));
        Ok(id)
    }

    // ==================== Access ====================

    /// Number of entities of one kind.
    pub fn nb_entities(&self, entity_type: EntityType) -> usize {
        match entity_type {
            EntityType::Corner => self.corners.len(),
            EntityType::Line => self.lines.len(),
            EntityType::Surface => self.surfaces.len(),
            EntityType::Region => self.regions.len(),
        }
    }

    /// Number of corners.
    pub fn nb_corners(&self) -> usize {
        self.corners.len()
    }

    /// Number of lines.
    pub fn nb_lines(&self) -> usize {
        self.lines.len()
    }

    /// Number of surfaces.
    pub fn nb_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    /// Number of regions.
    pub fn nb_regions(&self) -> usize {
        self.regions.len()
    }

    /// A line by index.
    pub fn line(&self, index: usize) -> &LineMesh {
        &self.lines[index]
    }

    /// A surface by index.
    pub fn surface(&self, index: usize) -> &SurfaceMesh {
        &self.surfaces[index]
    }

    /// A surface by index, mutably.
    pub fn surface_mut(&mut self, index: usize) -> &mut SurfaceMesh {
        &mut self.surfaces[index]
    }

    /// A region by index.
    pub fn region(&self, index: usize) -> &RegionMesh {
        &self.regions[index]
    }

    /// An entity by id.
    ///
    /// # Panics
    /// Panics if the index is out of range for the entity type.
    pub fn entity(&self, id: EntityId) -> &dyn MeshEntity {
        match id.entity_type {
            EntityType::Corner => &self.corners[id.index],
            EntityType::Line => &self.lines[id.index],
            EntityType::Surface => &self.surfaces[id.index],
            EntityType::Region => &self.regions[id.index],
        }
    }

    /// An entity by id, mutably.
    pub fn entity_mut(&mut self, id: EntityId) -> &mut dyn MeshEntity {
        match id.entity_type {
            EntityType::Corner => &mut self.corners[id.index],
            EntityType::Line => &mut self.lines[id.index],
            EntityType::Surface => &mut self.surfaces[id.index],
            EntityType::Region => &mut self.regions[id.index],
        }
    }

    /// Ids of all entities, in the global concatenation order
    /// (corners, then lines, surfaces, regions, each by increasing index).
    pub fn entity_ids_in_order(&self) -> impl Iterator<Item = EntityId> + '_ {
        EntityType::ALL.into_iter().flat_map(move |entity_type| {
            (0..self.nb_entities(entity_type)).map(move |index| EntityId::new(entity_type, index))
        })
    }

    /// Total vertex count over all entity instances (with multiplicity).
    pub fn nb_entity_vertices(&self) -> usize {
        self.entity_ids_in_order()
            .map(|id| self.entity(id).nb_vertices())
            .sum()
    }
}
