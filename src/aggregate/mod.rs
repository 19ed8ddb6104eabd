//! Model-wide aggregation of entity meshes.
//!
//! Each entity of a [`GeoModel`] meshes itself independently, so the model
//! as a whole has no vertex, edge, polygon or cell numbering. This module
//! builds that numbering: a deduplicated global vertex set with a
//! bidirectional map to the entity-local vertices, and flat edge, polygon
//! and cell collections indexed against it, with adjacency reconstructed
//! across entity boundaries.
//!
//! [`GeoModelMesh`] is the entry point. The aggregates build lazily on
//! first access and stay valid until [`GeoModelMesh::clear`] or a mutation
//! through [`ModelVertices`] invalidates them.
//!
//! ```
//! use strata::aggregate::GeoModelMesh;
//! use strata::model::GeoModel;
//! use strata::nalgebra::Point3;
//!
//! let mut model = GeoModel::new();
//! model.add_corner(Point3::new(0.0, 0.0, 0.0));
//! model.add_corner(Point3::new(1.0, 0.0, 0.0));
//! model.add_line(vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//! ])?;
//!
//! let mut mesh = GeoModelMesh::new(model);
//! // The two corners merge with the line endpoints.
//! assert_eq!(mesh.vertices().nb_vertices(), 2);
//! # Ok::<(), strata::error::GeoModelError>(())
//! ```

pub mod cells;
pub mod compact;
pub mod duplicate;
pub mod edges;
pub mod polygons;
pub mod vertex_map;
pub mod vertices;

pub use cells::ModelCells;
pub use duplicate::DuplicateMode;
pub use edges::ModelEdges;
pub use polygons::ModelPolygons;
pub use vertex_map::{VertexMap, MODEL_VERTEX_MAP};
pub use vertices::ModelVertices;

use crate::error::Result;
use crate::model::GeoModel;

/// The aggregated view of a model.
///
/// Owns the model and the four aggregates. Accessors take `&mut self`
/// because the first access builds the aggregate (and binds the vertex-map
/// attributes on the entities); afterwards they only read.
#[derive(Debug)]
pub struct GeoModelMesh {
    model: GeoModel,
    vertices: ModelVertices,
    edges: ModelEdges,
    polygons: ModelPolygons,
    cells: ModelCells,
}

impl GeoModelMesh {
    /// Wrap a model. Nothing is aggregated yet.
    pub fn new(model: GeoModel) -> Self {
        Self {
            model,
            vertices: ModelVertices::new(),
            edges: ModelEdges::new(),
            polygons: ModelPolygons::new(),
            cells: ModelCells::new(),
        }
    }

    /// The underlying model.
    pub fn model(&self) -> &GeoModel {
        &self.model
    }

    /// The global vertex aggregate, built on first access.
    pub fn vertices(&mut self) -> &ModelVertices {
        self.ensure_vertices();
        &self.vertices
    }

    /// The global edge aggregate, built on first access.
    pub fn edges(&mut self) -> &ModelEdges {
        self.ensure_vertices();
        if !self.edges.is_initialized() {
            self.edges.initialize(&self.model, &self.vertices);
        }
        &self.edges
    }

    /// The global polygon aggregate, built on first access.
    pub fn polygons(&mut self) -> &ModelPolygons {
        self.ensure_vertices();
        if !self.polygons.is_initialized() {
            self.polygons.initialize(&self.model, &self.vertices);
        }
        &self.polygons
    }

    /// The global cell aggregate, built on first access.
    pub fn cells(&mut self) -> &ModelCells {
        self.ensure_vertices();
        if !self.cells.is_initialized() {
            self.cells.initialize(&self.model, &self.vertices);
        }
        &self.cells
    }

    /// Run vertex duplication along boundary surfaces (see
    /// [`duplicate::duplicate_vertices`]). Returns the number of duplicate
    /// ids allocated.
    pub fn duplicate_vertices(&mut self, mode: DuplicateMode) -> Result<usize> {
        self.polygons();
        self.cells();
        duplicate::duplicate_vertices(
            &self.model,
            &self.vertices,
            &self.polygons,
            &mut self.cells,
            mode,
        )
    }

    /// Drop every aggregate, the vertex-map attributes included. The next
    /// access rebuilds from the entity meshes.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.polygons.clear();
        self.edges.clear();
        self.vertices.clear(&mut self.model);
    }

    fn ensure_vertices(&mut self) {
        if !self.vertices.is_initialized() {
            self.vertices.initialize(&mut self.model);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use nalgebra::Point3;

    use crate::model::CellType;

    /// The eight corners of the unit cube lifted to `z0`, indexed as
    /// `x + 2 y + 4 z` over the local 0/1 coordinates.
    pub(crate) fn unit_cube_points(z0: f64) -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, z0),
            Point3::new(1.0, 0.0, z0),
            Point3::new(0.0, 1.0, z0),
            Point3::new(1.0, 1.0, z0),
            Point3::new(0.0, 0.0, z0 + 1.0),
            Point3::new(1.0, 0.0, z0 + 1.0),
            Point3::new(0.0, 1.0, z0 + 1.0),
            Point3::new(1.0, 1.0, z0 + 1.0),
        ]
    }

    /// The six-tetrahedron decomposition of a box: every tet runs along a
    /// monotone vertex path from corner 0 to corner 7, so glued boxes stay
    /// facet-conformal.
    pub(crate) fn kuhn_tets(
        points: Vec<Point3<f64>>,
    ) -> (Vec<Point3<f64>>, Vec<(CellType, Vec<usize>)>) {
        let tets = [
            [0, 1, 3, 7],
            [0, 1, 5, 7],
            [0, 2, 3, 7],
            [0, 2, 6, 7],
            [0, 4, 5, 7],
            [0, 4, 6, 7],
        ];
        let cells = tets
            .into_iter()
            .map(|t| (CellType::Tetrahedron, t.to_vec()))
            .collect();
        (points, cells)
    }

    /// Five points, two tetrahedra sharing one facet.
    pub(crate) fn two_tet_region_points_cells() -> (Vec<Point3<f64>>, Vec<(CellType, Vec<usize>)>)
    {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
        ];
        let cells = vec![
            (CellType::Tetrahedron, vec![0, 1, 2, 3]),
            (CellType::Tetrahedron, vec![1, 2, 3, 4]),
        ];
        (points, cells)
    }
}
