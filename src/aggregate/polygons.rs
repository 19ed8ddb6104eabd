//! The global surface-polygon aggregate.
//!
//! Copies every surface's polygons into one collection with vertices mapped
//! to global ids, classifies them by arity (triangle / quad / general
//! polygon), and lays them out in the canonical order
//! `(surface 0: triangles…, quads…, polygons…), (surface 1: …), …` through
//! a per-surface-per-kind offset table. Adjacency is then reconstructed by
//! edge matching and cut along the line boundaries recorded by the local
//! surface meshes.

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;

use super::vertices::ModelVertices;
use crate::model::{barycenter, polygon_normal, EntityId, EntityType, GeoModel, PolygonType};
use crate::NO_ID;

/// Buckets per surface in the offset table: the three concrete kinds plus a
/// terminal always-empty bucket, so `ptr[s * 4 + 3]` is the end of surface
/// `s` as well as the start of its empty tail.
const PTR_STRIDE: usize = 4;

/// The global polygon aggregate.
#[derive(Debug, Default)]
pub struct ModelPolygons {
    /// CRS corner ranges: polygon `p` owns `corner_ptr[p]..corner_ptr[p+1]`.
    corner_ptr: Vec<usize>,
    /// Global vertex ids, one per polygon corner.
    vertices: Vec<usize>,
    /// Adjacent global polygon per edge, parallel to `vertices`.
    adjacent: Vec<usize>,
    surface_of: Vec<usize>,
    index_in_surface: Vec<usize>,
    /// Offset table of size `nb_surfaces * 4 + 1`.
    surface_polygon_ptr: Vec<usize>,
    nb_by_kind: [usize; 3],
}

impl ModelPolygons {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the aggregate holds any polygons.
    pub fn is_initialized(&self) -> bool {
        !self.surface_polygon_ptr.is_empty()
    }

    // ==================== Construction ====================

    /// Build from the current global vertex set, then reconstruct adjacency
    /// and cut it along line boundaries.
    pub fn initialize(&mut self, model: &GeoModel, vertices: &ModelVertices) {
        self.clear();
        let nb_surfaces = model.nb_surfaces();

        // Count polygons per (surface, kind) bucket.
        let mut counts = vec![0usize; nb_surfaces * PTR_STRIDE];
        let mut total = 0;
        for s in 0..nb_surfaces {
            let surface = model.surface(s);
            for p in 0..surface.nb_polygons() {
                let kind = PolygonType::from_nb_vertices(surface.nb_polygon_vertices(p));
                counts[s * PTR_STRIDE + kind.index()] += 1;
                self.nb_by_kind[kind.index()] += 1;
                total += 1;
            }
        }

        // Prefix-sum into the offset table: within-surface kind offsets
        // first, then across surfaces, collapse to one exclusive scan.
        self.surface_polygon_ptr = vec![0; nb_surfaces * PTR_STRIDE + 1];
        for i in 0..counts.len() {
            self.surface_polygon_ptr[i + 1] = self.surface_polygon_ptr[i] + counts[i];
        }

        // Bucket-place every polygon: the resulting order is exactly the
        // canonical (surface asc, kind asc, local index asc) sort.
        let mut slot_of = vec![NO_ID; total];
        let mut cursor = self.surface_polygon_ptr.clone();
        let mut arity = vec![0usize; total];
        let mut flat = 0;
        for s in 0..nb_surfaces {
            let surface = model.surface(s);
            for p in 0..surface.nb_polygons() {
                let nb = surface.nb_polygon_vertices(p);
                let kind = PolygonType::from_nb_vertices(nb);
                let slot = cursor[s * PTR_STRIDE + kind.index()];
                cursor[s * PTR_STRIDE + kind.index()] += 1;
                slot_of[flat] = slot;
                arity[slot] = nb;
                flat += 1;
            }
        }

        self.corner_ptr = vec![0; total + 1];
        for p in 0..total {
            self.corner_ptr[p + 1] = self.corner_ptr[p] + arity[p];
        }

        self.vertices = vec![NO_ID; self.corner_ptr[total]];
        self.adjacent = vec![NO_ID; self.corner_ptr[total]];
        self.surface_of = vec![NO_ID; total];
        self.index_in_surface = vec![NO_ID; total];

        let mut flat = 0;
        for s in 0..nb_surfaces {
            let id = EntityId::new(EntityType::Surface, s);
            let surface = model.surface(s);
            for p in 0..surface.nb_polygons() {
                let slot = slot_of[flat];
                flat += 1;
                let begin = self.corner_ptr[slot];
                for lv in 0..surface.nb_polygon_vertices(p) {
                    self.vertices[begin + lv] =
                        vertices.global_element_vertex(model, id, p, lv);
                }
                self.surface_of[slot] = s;
                self.index_in_surface[slot] = slot - self.surface_polygon_ptr[s * PTR_STRIDE];
            }
        }

        self.connect_polygons();
        self.disconnect_along_lines(model, &slot_of);
    }

    /// Reconstruct polygon adjacency by matching shared undirected edges.
    ///
    /// The first two claimants of an edge pair up; on a non-manifold edge
    /// any further claimant stays unconnected (and line boundaries cut such
    /// junctions anyway).
    fn connect_polygons(&mut self) {
        let consumed = (NO_ID, NO_ID);
        let mut edge_map: FxHashMap<(usize, usize), (usize, usize)> = FxHashMap::default();
        for p in 0..self.nb_polygons(None) {
            let nb = self.nb_polygon_vertices(p);
            for e in 0..nb {
                let v0 = self.vertex(p, e);
                let v1 = self.vertex(p, (e + 1) % nb);
                let key = (v0.min(v1), v0.max(v1));
                match edge_map.get(&key).copied() {
                    None => {
                        edge_map.insert(key, (p, e));
                    }
                    Some((q, f)) if (q, f) != consumed => {
                        self.adjacent[self.corner_ptr[p] + e] = q;
                        self.adjacent[self.corner_ptr[q] + f] = p;
                        edge_map.insert(key, consumed);
                    }
                    Some(_) => {}
                }
            }
        }
    }

    /// Force "no neighbor" on every aggregated edge that the owning
    /// surface's local mesh records as a border, even when colocation gave
    /// it a neighbor from another surface.
    ///
    /// `slot_of` maps the flat `(surface, local polygon)` enumeration to the
    /// kind-sorted slot, so borders land on the polygon they belong to even
    /// when the kinds of a surface interleave.
    fn disconnect_along_lines(&mut self, model: &GeoModel, slot_of: &[usize]) {
        let mut flat = 0;
        for s in 0..model.nb_surfaces() {
            let surface = model.surface(s);
            for p in 0..surface.nb_polygons() {
                let slot = slot_of[flat];
                flat += 1;
                for e in 0..surface.nb_polygon_vertices(p) {
                    if surface.is_edge_on_border(p, e) {
                        self.adjacent[self.corner_ptr[slot] + e] = NO_ID;
                    }
                }
            }
        }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.corner_ptr.clear();
        self.vertices.clear();
        self.adjacent.clear();
        self.surface_of.clear();
        self.index_in_surface.clear();
        self.surface_polygon_ptr.clear();
        self.nb_by_kind = [0; 3];
    }

    // ==================== Queries ====================

    /// Number of polygons, optionally of one kind.
    pub fn nb_polygons(&self, kind: Option<PolygonType>) -> usize {
        match kind {
            None => self.surface_of.len(),
            Some(kind) => self.nb_by_kind[kind.index()],
        }
    }

    /// Number of polygons of surface `surface`, optionally of one kind.
    pub fn nb_surface_polygons(&self, surface: usize, kind: Option<PolygonType>) -> usize {
        let base = surface * PTR_STRIDE;
        match kind {
            None => self.surface_polygon_ptr[base + 3] - self.surface_polygon_ptr[base],
            Some(kind) => {
                self.surface_polygon_ptr[base + kind.index() + 1]
                    - self.surface_polygon_ptr[base + kind.index()]
            }
        }
    }

    /// Global polygon id of polygon `index` of surface `surface`,
    /// counted within one kind or within the whole surface range.
    pub fn polygon(&self, surface: usize, index: usize, kind: Option<PolygonType>) -> usize {
        debug_assert!(index < self.nb_surface_polygons(surface, kind));
        let base = surface * PTR_STRIDE;
        match kind {
            None => self.surface_polygon_ptr[base] + index,
            Some(kind) => self.surface_polygon_ptr[base + kind.index()] + index,
        }
    }

    /// Number of vertices (and edges) of polygon `p`.
    pub fn nb_polygon_vertices(&self, p: usize) -> usize {
        self.corner_ptr[p + 1] - self.corner_ptr[p]
    }

    /// The kind of polygon `p`.
    pub fn polygon_type(&self, p: usize) -> PolygonType {
        PolygonType::from_nb_vertices(self.nb_polygon_vertices(p))
    }

    /// Global vertex id of corner `lv` of polygon `p`.
    pub fn vertex(&self, p: usize, lv: usize) -> usize {
        debug_assert!(lv < self.nb_polygon_vertices(p));
        self.vertices[self.corner_ptr[p] + lv]
    }

    /// The polygon adjacent to `p` across edge `e`, or [`NO_ID`].
    pub fn adjacent(&self, p: usize, e: usize) -> usize {
        debug_assert!(e < self.nb_polygon_vertices(p));
        self.adjacent[self.corner_ptr[p] + e]
    }

    /// The surface owning polygon `p`.
    pub fn surface(&self, p: usize) -> usize {
        self.surface_of[p]
    }

    /// The index of polygon `p` within its surface's range.
    pub fn index_in_surface(&self, p: usize) -> usize {
        self.index_in_surface[p]
    }

    fn corner_points(&self, vertices: &ModelVertices, p: usize) -> Vec<Point3<f64>> {
        (0..self.nb_polygon_vertices(p))
            .map(|lv| vertices.vertex(self.vertex(p, lv)))
            .collect()
    }

    /// Barycenter of polygon `p`.
    pub fn center(&self, vertices: &ModelVertices, p: usize) -> Point3<f64> {
        barycenter(&self.corner_points(vertices, p))
    }

    /// Unit normal of polygon `p`.
    pub fn normal(&self, vertices: &ModelVertices, p: usize) -> Vector3<f64> {
        polygon_normal(&self.corner_points(vertices, p)).normalize()
    }

    /// Area of polygon `p`.
    pub fn area(&self, vertices: &ModelVertices, p: usize) -> f64 {
        0.5 * polygon_normal(&self.corner_points(vertices, p)).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One quad surface split in two triangles, one triangle surface glued
    /// along an edge, and a quad-bearing surface.
    fn surfaces_model() -> GeoModel {
        let mut model = GeoModel::new();
        // Surface 0: two triangles.
        model
            .add_surface(
                vec![
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(1.0, 0.0, 0.0),
                    Point3::new(0.0, 1.0, 0.0),
                    Point3::new(1.0, 1.0, 0.0),
                ],
                &[vec![0, 1, 2], vec![1, 3, 2]],
            )
            .unwrap();
        // Surface 1: one quad and one triangle sharing an edge.
        model
            .add_surface(
                vec![
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(0.0, -1.0, 0.0),
                    Point3::new(1.0, -1.0, 0.0),
                    Point3::new(1.0, 0.0, 0.0),
                    Point3::new(2.0, -0.5, 0.0),
                ],
                &[vec![0, 1, 2, 3], vec![3, 2, 4]],
            )
            .unwrap();
        model
    }

    fn build(model: &mut GeoModel) -> (ModelVertices, ModelPolygons) {
        let mut vertices = ModelVertices::new();
        vertices.initialize(model);
        let mut polygons = ModelPolygons::new();
        polygons.initialize(model, &vertices);
        (vertices, polygons)
    }

    #[test]
    fn test_partition_by_surface_and_kind() {
        let mut model = surfaces_model();
        let (_, polygons) = build(&mut model);

        assert_eq!(polygons.nb_polygons(None), 4);
        assert_eq!(polygons.nb_polygons(Some(PolygonType::Triangle)), 3);
        assert_eq!(polygons.nb_polygons(Some(PolygonType::Quad)), 1);

        let mut per_surface = 0;
        for s in 0..model.nb_surfaces() {
            let by_kind: usize = [PolygonType::Triangle, PolygonType::Quad, PolygonType::Polygon]
                .into_iter()
                .map(|k| polygons.nb_surface_polygons(s, Some(k)))
                .sum();
            assert_eq!(by_kind, polygons.nb_surface_polygons(s, None));
            per_surface += by_kind;
        }
        assert_eq!(per_surface, polygons.nb_polygons(None));
    }

    #[test]
    fn test_canonical_order() {
        let mut model = surfaces_model();
        let (_, polygons) = build(&mut model);
        // Surface ids ascending; within surface 1 the triangle follows the
        // quad only in kind order, i.e. triangles first.
        let order: Vec<(usize, PolygonType)> = (0..polygons.nb_polygons(None))
            .map(|p| (polygons.surface(p), polygons.polygon_type(p)))
            .collect();
        assert_eq!(
            order,
            vec![
                (0, PolygonType::Triangle),
                (0, PolygonType::Triangle),
                (1, PolygonType::Triangle),
                (1, PolygonType::Quad),
            ]
        );
        for p in 0..polygons.nb_polygons(None) {
            let s = polygons.surface(p);
            assert_eq!(polygons.polygon(s, polygons.index_in_surface(p), None), p);
        }
    }

    #[test]
    fn test_adjacency_within_surface() {
        let mut model = surfaces_model();
        let (_, polygons) = build(&mut model);
        let t0 = polygons.polygon(0, 0, Some(PolygonType::Triangle));
        let t1 = polygons.polygon(0, 1, Some(PolygonType::Triangle));
        // The two triangles of surface 0 share the diagonal.
        let neighbors: Vec<usize> = (0..3).map(|e| polygons.adjacent(t0, e)).collect();
        assert!(neighbors.contains(&t1));
    }

    #[test]
    fn test_mixed_kind_surface_keeps_interior_adjacency() {
        let mut model = surfaces_model();
        let (_, polygons) = build(&mut model);
        // Surface 1 stores its quad before its triangle, so the kind sort
        // reorders them; the shared edge (local 3, 2) must still connect.
        let quad = polygons.polygon(1, 0, Some(PolygonType::Quad));
        let triangle = polygons.polygon(1, 0, Some(PolygonType::Triangle));
        assert_eq!(polygons.adjacent(quad, 2), triangle);
        assert_eq!(polygons.adjacent(triangle, 0), quad);
        // Every other edge of the surface is a border, including the edge
        // colocated with surface 0.
        for e in [0, 1, 3] {
            assert_eq!(polygons.adjacent(quad, e), NO_ID);
        }
        for e in [1, 2] {
            assert_eq!(polygons.adjacent(triangle, e), NO_ID);
        }
    }

    #[test]
    fn test_initialize_is_restartable() {
        let mut model = surfaces_model();
        let (vertices, mut polygons) = build(&mut model);
        polygons.initialize(&model, &vertices);
        assert_eq!(polygons.nb_polygons(None), 4);
        assert_eq!(polygons.nb_polygons(Some(PolygonType::Triangle)), 3);
        assert_eq!(polygons.nb_polygons(Some(PolygonType::Quad)), 1);
    }

    #[test]
    fn test_geometry_queries() {
        let mut model = surfaces_model();
        let (vertices, polygons) = build(&mut model);
        let quad = polygons.polygon(1, 0, Some(PolygonType::Quad));
        assert!((polygons.area(&vertices, quad) - 1.0).abs() < 1e-12);
        let center = polygons.center(&vertices, quad);
        assert!((center - Point3::new(0.5, -0.5, 0.0)).norm() < 1e-12);
        assert!((polygons.normal(&vertices, quad).z.abs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_model() {
        let mut model = GeoModel::new();
        let (_, polygons) = build(&mut model);
        assert_eq!(polygons.nb_polygons(None), 0);
    }
}
