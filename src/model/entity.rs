//! Mesh entities and their local meshes.
//!
//! A geomodel is assembled from four kinds of entities, each owning its own
//! local mesh:
//!
//! - [`CornerMesh`] — a single point,
//! - [`LineMesh`] — a polyline (elements are edges),
//! - [`SurfaceMesh`] — a polygonal patch (elements are polygons),
//! - [`RegionMesh`] — a volume (elements are typed cells).
//!
//! Entities are identified by an [`EntityId`]; the [`MeshEntity`] trait is
//! the uniform seam the aggregation layer works against. Local vertex indices
//! are plain `usize` with [`NO_ID`](crate::NO_ID) as the invalid sentinel.

use nalgebra::{Point3, Vector3};

use crate::attrib::AttributesManager;
use crate::NO_ID;

/// The four entity kinds, in the global concatenation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityType {
    /// A point entity.
    Corner,
    /// A curve entity.
    Line,
    /// A 2D patch entity.
    Surface,
    /// A 3D volume entity.
    Region,
}

impl EntityType {
    /// All entity types, in concatenation order.
    pub const ALL: [EntityType; 4] = [
        EntityType::Corner,
        EntityType::Line,
        EntityType::Surface,
        EntityType::Region,
    ];
}

/// Stable identity of one mesh entity: its type and its index among
/// entities of that type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId {
    /// The entity kind.
    pub entity_type: EntityType,
    /// The index among entities of this kind.
    pub index: usize,
}

impl EntityId {
    /// Create an entity id.
    pub fn new(entity_type: EntityType, index: usize) -> Self {
        Self { entity_type, index }
    }
}

/// One mention of a global vertex by an entity: the owning entity and the
/// local vertex index inside its mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GmeVertex {
    /// The owning entity.
    pub entity: EntityId,
    /// The local vertex index within the entity's mesh.
    pub vertex: usize,
}

impl GmeVertex {
    /// Create a mention record.
    pub fn new(entity: EntityId, vertex: usize) -> Self {
        Self { entity, vertex }
    }
}

// ==================== Polygon and cell kinds ====================

/// Surface polygon kinds, classified by arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PolygonType {
    /// 3 vertices.
    Triangle,
    /// 4 vertices.
    Quad,
    /// 5 or more vertices.
    Polygon,
}

/// Number of concrete polygon kinds.
pub const NB_POLYGON_TYPES: usize = 3;

impl PolygonType {
    /// Classify a polygon by its vertex count.
    ///
    /// Polygons with fewer than 3 vertices are rejected at model build time.
    pub fn from_nb_vertices(nb: usize) -> Self {
        debug_assert!(nb >= 3);
        match nb {
            3 => PolygonType::Triangle,
            4 => PolygonType::Quad,
            _ => PolygonType::Polygon,
        }
    }

    /// The bucket index of this kind.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Volumetric cell kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CellType {
    /// 4 vertices, 4 triangle facets.
    Tetrahedron,
    /// 8 vertices, 6 quad facets.
    Hexahedron,
    /// 6 vertices, 2 triangle + 3 quad facets.
    Prism,
    /// 5 vertices, 1 quad + 4 triangle facets.
    Pyramid,
    /// 4 vertices, 1 quad + 2 triangle facets: the degenerate glue cell
    /// joining a quad facet to two triangles split along a diagonal.
    Connector,
}

/// Number of concrete cell kinds.
pub const NB_CELL_TYPES: usize = 5;

const TET_FACETS: [&[usize]; 4] = [&[1, 2, 3], &[0, 3, 2], &[0, 1, 3], &[0, 2, 1]];
const HEX_FACETS: [&[usize]; 6] = [
    &[0, 3, 2, 1],
    &[4, 5, 6, 7],
    &[0, 1, 5, 4],
    &[1, 2, 6, 5],
    &[2, 3, 7, 6],
    &[3, 0, 4, 7],
];
const PRISM_FACETS: [&[usize]; 5] = [
    &[0, 2, 1],
    &[3, 4, 5],
    &[0, 1, 4, 3],
    &[1, 2, 5, 4],
    &[2, 0, 3, 5],
];
const PYRAMID_FACETS: [&[usize]; 5] = [
    &[0, 3, 2, 1],
    &[0, 1, 4],
    &[1, 2, 4],
    &[2, 3, 4],
    &[3, 0, 4],
];
const CONNECTOR_FACETS: [&[usize]; 3] = [&[0, 1, 2, 3], &[0, 2, 1], &[0, 3, 2]];

impl CellType {
    /// The bucket index of this kind.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Number of vertices of a cell of this kind.
    pub fn nb_vertices(self) -> usize {
        match self {
            CellType::Tetrahedron => 4,
            CellType::Hexahedron => 8,
            CellType::Prism => 6,
            CellType::Pyramid => 5,
            CellType::Connector => 4,
        }
    }

    /// The local vertex lists of each cell facet.
    pub fn facets(self) -> &'static [&'static [usize]] {
        match self {
            CellType::Tetrahedron => &TET_FACETS,
            CellType::Hexahedron => &HEX_FACETS,
            CellType::Prism => &PRISM_FACETS,
            CellType::Pyramid => &PYRAMID_FACETS,
            CellType::Connector => &CONNECTOR_FACETS,
        }
    }
}

// ==================== Entity trait ====================

/// The uniform interface the aggregation layer consumes.
///
/// Elements are the entity's mesh primitives: a corner has none, a line's
/// elements are its edges, a surface's its polygons, a region's its cells.
pub trait MeshEntity {
    /// The identity of this entity.
    fn id(&self) -> EntityId;

    /// Number of local vertices.
    fn nb_vertices(&self) -> usize;

    /// Position of local vertex `v`.
    fn vertex(&self, v: usize) -> Point3<f64>;

    /// Move local vertex `v`.
    fn set_vertex(&mut self, v: usize, point: Point3<f64>);

    /// Number of mesh elements.
    fn nb_mesh_elements(&self) -> usize;

    /// Number of vertices of element `element`.
    fn nb_mesh_element_vertices(&self, element: usize) -> usize;

    /// Local vertex index of corner `local_vertex` of element `element`.
    fn mesh_element_vertex_index(&self, element: usize, local_vertex: usize) -> usize;

    /// The vertex attribute manager.
    fn vertex_attributes(&self) -> &AttributesManager;

    /// The vertex attribute manager, mutably.
    fn vertex_attributes_mut(&mut self) -> &mut AttributesManager;
}

// ==================== Corner ====================

/// A point entity.
#[derive(Debug, Clone)]
pub struct CornerMesh {
    id: EntityId,
    point: Point3<f64>,
    vertex_attributes: AttributesManager,
}

impl CornerMesh {
    pub(crate) fn new(index: usize, point: Point3<f64>) -> Self {
        Self {
            id: EntityId::new(EntityType::Corner, index),
            point,
            vertex_attributes: AttributesManager::new(1),
        }
    }
}

impl MeshEntity for CornerMesh {
    fn id(&self) -> EntityId {
        self.id
    }

    fn nb_vertices(&self) -> usize {
        1
    }

    fn vertex(&self, v: usize) -> Point3<f64> {
        debug_assert_eq!(v, 0);
        self.point
    }

    fn set_vertex(&mut self, v: usize, point: Point3<f64>) {
        debug_assert_eq!(v, 0);
        self.point = point;
    }

    fn nb_mesh_elements(&self) -> usize {
        0
    }

    fn nb_mesh_element_vertices(&self, _element: usize) -> usize {
        0
    }

    fn mesh_element_vertex_index(&self, _element: usize, _local_vertex: usize) -> usize {
        NO_ID
    }

    fn vertex_attributes(&self) -> &AttributesManager {
        &self.vertex_attributes
    }

    fn vertex_attributes_mut(&mut self) -> &mut AttributesManager {
        &mut self.vertex_attributes
    }
}

// ==================== Line ====================

/// A polyline entity. Elements are the consecutive edges.
#[derive(Debug, Clone)]
pub struct LineMesh {
    id: EntityId,
    vertices: Vec<Point3<f64>>,
    vertex_attributes: AttributesManager,
}

impl LineMesh {
    pub(crate) fn new(index: usize, vertices: Vec<Point3<f64>>) -> Self {
        let vertex_attributes = AttributesManager::new(vertices.len());
        Self {
            id: EntityId::new(EntityType::Line, index),
            vertices,
            vertex_attributes,
        }
    }

    /// Number of edges.
    pub fn nb_edges(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }
}

impl MeshEntity for LineMesh {
    fn id(&self) -> EntityId {
        self.id
    }

    fn nb_vertices(&self) -> usize {
        self.vertices.len()
    }

    fn vertex(&self, v: usize) -> Point3<f64> {
        self.vertices[v]
    }

    fn set_vertex(&mut self, v: usize, point: Point3<f64>) {
        self.vertices[v] = point;
    }

    fn nb_mesh_elements(&self) -> usize {
        self.nb_edges()
    }

    fn nb_mesh_element_vertices(&self, _element: usize) -> usize {
        2
    }

    fn mesh_element_vertex_index(&self, element: usize, local_vertex: usize) -> usize {
        debug_assert!(local_vertex < 2);
        element + local_vertex
    }

    fn vertex_attributes(&self) -> &AttributesManager {
        &self.vertex_attributes
    }

    fn vertex_attributes_mut(&mut self) -> &mut AttributesManager {
        &mut self.vertex_attributes
    }
}

// ==================== Surface ====================

/// A polygonal patch entity.
///
/// Polygons are stored in compressed-row form (`polygon_ptr` into
/// `polygon_vertices`); per-edge local adjacency is computed once at build
/// time and `NO_ID` marks a border edge of the patch.
#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    id: EntityId,
    vertices: Vec<Point3<f64>>,
    polygon_ptr: Vec<usize>,
    polygon_vertices: Vec<usize>,
    polygon_adjacent: Vec<usize>,
    vertex_attributes: AttributesManager,
    /// Whether this surface models a fault/discontinuity.
    pub is_fault: bool,
    /// Whether this surface lies on the outer model boundary.
    pub is_on_outer_boundary: bool,
}

impl SurfaceMesh {
    pub(crate) fn new(
        index: usize,
        vertices: Vec<Point3<f64>>,
        polygon_ptr: Vec<usize>,
        polygon_vertices: Vec<usize>,
    ) -> Self {
        let vertex_attributes = AttributesManager::new(vertices.len());
        let polygon_adjacent = vec![NO_ID; polygon_vertices.len()];
        let mut surface = Self {
            id: EntityId::new(EntityType::Surface, index),
            vertices,
            polygon_ptr,
            polygon_vertices,
            polygon_adjacent,
            vertex_attributes,
            is_fault: false,
            is_on_outer_boundary: false,
        };
        surface.compute_polygon_adjacency();
        surface
    }

    /// Number of polygons.
    pub fn nb_polygons(&self) -> usize {
        self.polygon_ptr.len() - 1
    }

    /// Number of vertices (and edges) of polygon `p`.
    pub fn nb_polygon_vertices(&self, p: usize) -> usize {
        self.polygon_ptr[p + 1] - self.polygon_ptr[p]
    }

    /// Local vertex index of corner `lv` of polygon `p`.
    pub fn polygon_vertex(&self, p: usize, lv: usize) -> usize {
        debug_assert!(lv < self.nb_polygon_vertices(p));
        self.polygon_vertices[self.polygon_ptr[p] + lv]
    }

    /// The polygon adjacent to `p` across its edge `e`
    /// (`(v_e, v_{e+1})`), or `NO_ID` on a border of this patch.
    pub fn polygon_adjacent(&self, p: usize, e: usize) -> usize {
        debug_assert!(e < self.nb_polygon_vertices(p));
        self.polygon_adjacent[self.polygon_ptr[p] + e]
    }

    /// Whether edge `e` of polygon `p` is a border of this patch.
    pub fn is_edge_on_border(&self, p: usize, e: usize) -> bool {
        self.polygon_adjacent(p, e) == NO_ID
    }

    // Match polygon edges pairwise by their undirected vertex pair. On a
    // manifold patch each interior edge is claimed exactly twice; any
    // further claimant stays unconnected.
    fn compute_polygon_adjacency(&mut self) {
        use rustc_hash::FxHashMap;
        let mut edge_map: FxHashMap<(usize, usize), (usize, usize)> = FxHashMap::default();
        for p in 0..self.nb_polygons() {
            let nb = self.nb_polygon_vertices(p);
            for e in 0..nb {
                let v0 = self.polygon_vertex(p, e);
                let v1 = self.polygon_vertex(p, (e + 1) % nb);
                let key = (v0.min(v1), v0.max(v1));
                match edge_map.remove(&key) {
                    Some((q, f)) => {
                        self.polygon_adjacent[self.polygon_ptr[p] + e] = q;
                        self.polygon_adjacent[self.polygon_ptr[q] + f] = p;
                    }
                    None => {
                        edge_map.insert(key, (p, e));
                    }
                }
            }
        }
    }
}

impl MeshEntity for SurfaceMesh {
    fn id(&self) -> EntityId {
        self.id
    }

    fn nb_vertices(&self) -> usize {
        self.vertices.len()
    }

    fn vertex(&self, v: usize) -> Point3<f64> {
        self.vertices[v]
    }

    fn set_vertex(&mut self, v: usize, point: Point3<f64>) {
        self.vertices[v] = point;
    }

    fn nb_mesh_elements(&self) -> usize {
        self.nb_polygons()
    }

    fn nb_mesh_element_vertices(&self, element: usize) -> usize {
        self.nb_polygon_vertices(element)
    }

    fn mesh_element_vertex_index(&self, element: usize, local_vertex: usize) -> usize {
        self.polygon_vertex(element, local_vertex)
    }

    fn vertex_attributes(&self) -> &AttributesManager {
        &self.vertex_attributes
    }

    fn vertex_attributes_mut(&mut self) -> &mut AttributesManager {
        &mut self.vertex_attributes
    }
}

// ==================== Region ====================

/// A volumetric entity made of typed cells.
#[derive(Debug, Clone)]
pub struct RegionMesh {
    id: EntityId,
    vertices: Vec<Point3<f64>>,
    cell_types: Vec<CellType>,
    cell_ptr: Vec<usize>,
    cell_vertices: Vec<usize>,
    vertex_attributes: AttributesManager,
}

impl RegionMesh {
    pub(crate) fn new(
        index: usize,
        vertices: Vec<Point3<f64>>,
        cell_types: Vec<CellType>,
        cell_ptr: Vec<usize>,
        cell_vertices: Vec<usize>,
    ) -> Self {
        let vertex_attributes = AttributesManager::new(vertices.len());
        Self {
            id: EntityId::new(EntityType::Region, index),
            vertices,
            cell_types,
            cell_ptr,
            cell_vertices,
            vertex_attributes,
        }
    }

    /// Number of cells.
    pub fn nb_cells(&self) -> usize {
        self.cell_types.len()
    }

    /// The kind of cell `c`.
    pub fn cell_type(&self, c: usize) -> CellType {
        self.cell_types[c]
    }

    /// Local vertex index of corner `lv` of cell `c`.
    pub fn cell_vertex(&self, c: usize, lv: usize) -> usize {
        debug_assert!(lv < self.cell_type(c).nb_vertices());
        self.cell_vertices[self.cell_ptr[c] + lv]
    }
}

impl MeshEntity for RegionMesh {
    fn id(&self) -> EntityId {
        self.id
    }

    fn nb_vertices(&self) -> usize {
        self.vertices.len()
    }

    fn vertex(&self, v: usize) -> Point3<f64> {
        self.vertices[v]
    }

    fn set_vertex(&mut self, v: usize, point: Point3<f64>) {
        self.vertices[v] = point;
    }

    fn nb_mesh_elements(&self) -> usize {
        self.nb_cells()
    }

    fn nb_mesh_element_vertices(&self, element: usize) -> usize {
        self.cell_type(element).nb_vertices()
    }

    fn mesh_element_vertex_index(&self, element: usize, local_vertex: usize) -> usize {
        self.cell_vertex(element, local_vertex)
    }

    fn vertex_attributes(&self) -> &AttributesManager {
        &self.vertex_attributes
    }

    fn vertex_attributes_mut(&mut self) -> &mut AttributesManager {
        &mut self.vertex_attributes
    }
}

// ==================== Geometry helpers ====================

/// Barycenter of a set of points.
pub fn barycenter(points: &[Point3<f64>]) -> Point3<f64> {
    debug_assert!(!points.is_empty());
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Point3::from(sum / points.len() as f64)
}

/// Newell normal of a planar polygon (not normalized; length is twice the
/// area for a simple polygon).
pub fn polygon_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        normal += p.coords.cross(&q.coords);
    }
    normal
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_cell_facet_tables_are_closed() {
        // Every edge of a cell's facet complex must be shared by exactly two
        // facets, except for the connector which is open by construction.
        for cell_type in [
            CellType::Tetrahedron,
            CellType::Hexahedron,
            CellType::Prism,
            CellType::Pyramid,
        ] {
            let mut edge_count = std::collections::HashMap::new();
            for facet in cell_type.facets() {
                for e in 0..facet.len() {
                    let v0 = facet[e];
                    let v1 = facet[(e + 1) % facet.len()];
                    *edge_count.entry((v0.min(v1), v0.max(v1))).or_insert(0) += 1;
                }
            }
            for (&edge, &count) in &edge_count {
                assert_eq!(count, 2, "{:?} edge {:?} has {} facets", cell_type, edge, count);
            }
            for facet in cell_type.facets() {
                for &v in *facet {
                    assert!(v < cell_type.nb_vertices());
                }
            }
        }
    }

    #[test]
    fn test_line_elements_are_edges() {
        let line = LineMesh::new(
            0,
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
            ],
        );
        assert_eq!(line.nb_mesh_elements(), 2);
        assert_eq!(line.mesh_element_vertex_index(1, 0), 1);
        assert_eq!(line.mesh_element_vertex_index(1, 1), 2);
    }

    #[test]
    fn test_surface_local_adjacency() {
        // Two triangles sharing the edge (1, 2).
        let surface = SurfaceMesh::new(
            0,
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
            ],
            vec![0, 3, 6],
            vec![0, 1, 2, 1, 3, 2],
        );
        assert_eq!(surface.nb_polygons(), 2);
        assert_eq!(surface.polygon_adjacent(0, 1), 1);
        assert_eq!(surface.polygon_adjacent(1, 2), 0);
        assert!(surface.is_edge_on_border(0, 0));
        assert!(surface.is_edge_on_border(1, 0));
    }

    #[test]
    fn test_polygon_normal_is_area_weighted() {
        let square = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let n = polygon_normal(&square);
        assert!((n.norm() - 8.0).abs() < 1e-12); // twice the area
        assert!(n.z > 0.0);
    }
}
