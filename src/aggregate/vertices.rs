//! The global deduplicated vertex set.
//!
//! [`ModelVertices`] concatenates the local vertices of every entity in the
//! fixed type order (corners, lines, surfaces, regions), removes ε-colocated
//! duplicates, and keeps the bidirectional [`VertexMap`] synchronized through
//! later deletions, insertions and moves. A global vertex has no object of
//! its own: its identity is its slot in the point array.

use nalgebra::Point3;

use super::compact::compute_compaction;
use super::vertex_map::VertexMap;
use crate::model::{EntityId, GeoModel, GmeVertex, DEFAULT_EPSILON};
use crate::spatial::{NNSearch, PointSetIndex};
use crate::NO_ID;

/// The global vertex aggregate.
#[derive(Debug)]
pub struct ModelVertices {
    points: Vec<Point3<f64>>,
    map: VertexMap,
    epsilon: f64,
    search: Option<PointSetIndex>,
}

impl Default for ModelVertices {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelVertices {
    /// Create an empty aggregate with the default tolerance; `initialize`
    /// snapshots the model's tolerance instead.
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            map: VertexMap::new(),
            epsilon: DEFAULT_EPSILON,
            search: None,
        }
    }

    /// Whether the aggregate holds any vertices. An empty model builds to an
    /// empty (and valid) aggregate.
    pub fn is_initialized(&self) -> bool {
        !self.points.is_empty()
    }

    /// Number of global vertices.
    pub fn nb_vertices(&self) -> usize {
        self.points.len()
    }

    /// Position of global vertex `global`.
    pub fn vertex(&self, global: usize) -> Point3<f64> {
        self.points[global]
    }

    /// All global vertex positions.
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// The mapping tables.
    pub fn map(&self) -> &VertexMap {
        &self.map
    }

    /// All `(entity, local vertex)` mentions of global vertex `global`.
    pub fn gme_vertices(&self, global: usize) -> &[GmeVertex] {
        self.map.inverse_lookup(global)
    }

    /// The global id of local vertex `vertex` of `entity`.
    pub fn global_vertex(&self, model: &GeoModel, entity: EntityId, vertex: usize) -> usize {
        self.map.get_map_value(model, entity, vertex)
    }

    /// The global id of corner `local_vertex` of mesh element `element` of
    /// `entity` (the three-level lookup used by the polygon and cell
    /// aggregators).
    pub fn global_element_vertex(
        &self,
        model: &GeoModel,
        entity: EntityId,
        element: usize,
        local_vertex: usize,
    ) -> usize {
        let v = model
            .entity(entity)
            .mesh_element_vertex_index(element, local_vertex);
        self.global_vertex(model, entity, v)
    }

    // ==================== Construction ====================

    /// Build the global vertex array and the vertex map, then remove
    /// colocated duplicates.
    pub fn initialize(&mut self, model: &mut GeoModel) {
        self.epsilon = model.epsilon();

        let total = model.nb_entity_vertices();
        if total == 0 {
            return;
        }

        self.points = Vec::with_capacity(total);
        self.map.bind_all_vertex_maps(model);
        self.map.resize_inverse(total);

        let ids: Vec<EntityId> = model.entity_ids_in_order().collect();
        for id in ids {
            let nb_vertices = model.entity(id).nb_vertices();
            for v in 0..nb_vertices {
                let global = self.points.len();
                self.points.push(model.entity(id).vertex(v));
                self.map.set_map_value(model, id, v, global);
                self.map.add_to_inverse(GmeVertex::new(id, v), global);
            }
        }

        self.remove_colocated(model);
        self.rebuild_search();
    }

    /// Merge every group of ε-colocated global vertices into its
    /// lowest-index member. Idempotent: a second run finds nothing.
    pub fn remove_colocated(&mut self, model: &mut GeoModel) {
        if self.points.is_empty() {
            return;
        }
        let index = PointSetIndex::new(self.points.clone(), self.epsilon);
        let (representative_of, nb_colocated) = index.colocated_index_mapping(self.epsilon);
        if nb_colocated == 0 {
            return;
        }
        self.erase_vertices(model, &representative_of);
    }

    /// Delete and merge global vertices.
    ///
    /// `representative_of` follows the convention of
    /// [`compute_compaction`]: `representative_of[g] == g` keeps `g`,
    /// a lower value merges `g` into that representative, [`NO_ID`] removes
    /// it outright. Survivor order is preserved. Deleting nothing is a
    /// no-op; deleting everything is a full [`clear`](Self::clear).
    pub fn erase_vertices(&mut self, model: &mut GeoModel, representative_of: &[usize]) {
        debug_assert_eq!(representative_of.len(), self.points.len());
        let (nb_survivors, new_index_of) = compute_compaction(representative_of);

        if nb_survivors == self.points.len() {
            return;
        }
        if nb_survivors == 0 {
            self.clear(model);
            return;
        }

        let mut new_points = vec![Point3::origin(); nb_survivors];
        for (old, &rep) in representative_of.iter().enumerate() {
            if rep == old {
                new_points[new_index_of[old]] = self.points[old];
            }
        }
        self.points = new_points;

        self.map
            .update_after_deletion(model, &new_index_of, nb_survivors);
        self.rebuild_search();
    }

    // ==================== Mutation ====================

    /// The global vertex ε-colocated with `point`, or [`NO_ID`].
    ///
    /// After deduplication at most one global vertex can match; this is
    /// asserted.
    pub fn index(&self, point: &Point3<f64>) -> usize {
        let Some(search) = &self.search else {
            return NO_ID;
        };
        let matches = search.neighbors_within(point, self.epsilon);
        debug_assert!(
            matches.len() <= 1,
            "colocated global vertices survived deduplication"
        );
        matches.first().copied().unwrap_or(NO_ID)
    }

    /// Append one global vertex; its mention list starts empty.
    pub fn add_vertex(&mut self, point: Point3<f64>) -> usize {
        let global = self.points.len();
        self.points.push(point);
        self.map.resize_inverse(self.points.len());
        self.rebuild_search();
        global
    }

    /// Append several global vertices; returns the id of the first.
    pub fn add_vertices(&mut self, points: &[Point3<f64>]) -> usize {
        let first = self.points.len();
        self.points.extend_from_slice(points);
        self.map.resize_inverse(self.points.len());
        self.rebuild_search();
        first
    }

    /// Move global vertex `global` and push the new position out to every
    /// owning entity's local mesh.
    pub fn update_point(&mut self, model: &mut GeoModel, global: usize, point: Point3<f64>) {
        self.points[global] = point;
        let mentions: Vec<GmeVertex> = self.map.inverse_lookup(global).to_vec();
        for gme in mentions {
            model.entity_mut(gme.entity).set_vertex(gme.vertex, point);
        }
        self.rebuild_search();
    }

    /// Drop everything: points, both map directions, the search cache.
    ///
    /// The facade cascades this to the edge, polygon and cell aggregates,
    /// whose global-vertex-indexed data becomes invalid.
    pub fn clear(&mut self, model: &mut GeoModel) {
        self.points.clear();
        self.map.clear(model);
        self.search = None;
    }

    // The ε-lookup cache; refreshed after every mutation of the point set.
    fn rebuild_search(&mut self) {
        if self.points.is_empty() {
            self.search = None;
        } else {
            self.search = Some(PointSetIndex::new(self.points.clone(), self.epsilon));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityType;

    /// Two corners and a line whose endpoints colocate with them.
    fn line_model() -> GeoModel {
        let mut model = GeoModel::new();
        model.add_corner(Point3::new(0.0, 0.0, 0.0));
        model.add_corner(Point3::new(1.0, 0.0, 0.0));
        model
            .add_line(vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.5, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
            ])
            .unwrap();
        model
    }

    fn built(model: &mut GeoModel) -> ModelVertices {
        let mut vertices = ModelVertices::new();
        vertices.initialize(model);
        vertices
    }

    #[test]
    fn test_initialize_deduplicates() {
        let mut model = line_model();
        let vertices = built(&mut model);
        // 2 corner + 3 line copies, 3 unique positions.
        assert_eq!(vertices.nb_vertices(), 3);
    }

    #[test]
    fn test_bijection_invariant() {
        let mut model = line_model();
        let vertices = built(&mut model);
        for g in 0..vertices.nb_vertices() {
            for gme in vertices.gme_vertices(g) {
                assert_eq!(vertices.global_vertex(&model, gme.entity, gme.vertex), g);
            }
        }
        for id in model.entity_ids_in_order() {
            for v in 0..model.entity(id).nb_vertices() {
                let g = vertices.global_vertex(&model, id, v);
                let mentions = vertices.gme_vertices(g);
                let count = mentions
                    .iter()
                    .filter(|m| m.entity == id && m.vertex == v)
                    .count();
                assert_eq!(count, 1);
            }
        }
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let mut model = line_model();
        let mut vertices = built(&mut model);
        let before = vertices.nb_vertices();
        vertices.remove_colocated(&mut model);
        assert_eq!(vertices.nb_vertices(), before);
    }

    #[test]
    fn test_index_lookup() {
        let mut model = line_model();
        let vertices = built(&mut model);
        let g = vertices.index(&Point3::new(0.5, 0.0, 0.0));
        assert_ne!(g, NO_ID);
        assert_eq!(vertices.vertex(g), Point3::new(0.5, 0.0, 0.0));
        assert_eq!(vertices.index(&Point3::new(9.0, 9.0, 9.0)), NO_ID);
    }

    #[test]
    fn test_erase_vertices_compacts_forward_maps() {
        let mut model = line_model();
        let mut vertices = built(&mut model);
        // Delete the global vertex at the line midpoint outright.
        let mid = vertices.index(&Point3::new(0.5, 0.0, 0.0));
        let mut representative_of: Vec<usize> = (0..vertices.nb_vertices()).collect();
        representative_of[mid] = NO_ID;

        vertices.erase_vertices(&mut model, &representative_of);
        assert_eq!(vertices.nb_vertices(), 2);

        let line = EntityId::new(EntityType::Line, 0);
        assert_eq!(vertices.global_vertex(&model, line, 1), NO_ID);
        let g0 = vertices.global_vertex(&model, line, 0);
        let g2 = vertices.global_vertex(&model, line, 2);
        assert!(g0 < 2 && g2 < 2 && g0 != g2);
    }

    #[test]
    fn test_erase_nothing_is_noop() {
        let mut model = line_model();
        let mut vertices = built(&mut model);
        let identity: Vec<usize> = (0..vertices.nb_vertices()).collect();
        vertices.erase_vertices(&mut model, &identity);
        assert_eq!(vertices.nb_vertices(), 3);
    }

    #[test]
    fn test_erase_everything_clears() {
        let mut model = line_model();
        let mut vertices = built(&mut model);
        let all = vec![NO_ID; vertices.nb_vertices()];
        vertices.erase_vertices(&mut model, &all);
        assert!(!vertices.is_initialized());
        assert_eq!(vertices.map().nb_inverse_slots(), 0);
    }

    #[test]
    fn test_update_point_fans_out() {
        let mut model = line_model();
        let mut vertices = built(&mut model);
        let g = vertices.index(&Point3::new(1.0, 0.0, 0.0));
        let moved = Point3::new(1.0, 2.0, 0.0);
        vertices.update_point(&mut model, g, moved);

        let corner = EntityId::new(EntityType::Corner, 1);
        let line = EntityId::new(EntityType::Line, 0);
        assert_eq!(model.entity(corner).vertex(0), moved);
        assert_eq!(model.entity(line).vertex(2), moved);
        assert_eq!(vertices.index(&moved), g);
    }

    #[test]
    fn test_add_vertices_grow_inverse() {
        let mut model = line_model();
        let mut vertices = built(&mut model);
        let first = vertices.add_vertices(&[
            Point3::new(7.0, 0.0, 0.0),
            Point3::new(8.0, 0.0, 0.0),
        ]);
        assert_eq!(first, 3);
        assert_eq!(vertices.nb_vertices(), 5);
        assert!(vertices.gme_vertices(4).is_empty());
    }

    #[test]
    fn test_add_vertex_before_initialize() {
        let mut vertices = ModelVertices::new();
        let g = vertices.add_vertex(Point3::new(1.0, 2.0, 3.0));
        assert_eq!(g, 0);
        assert_eq!(vertices.nb_vertices(), 1);
        assert_eq!(vertices.index(&Point3::new(1.0, 2.0, 3.0)), 0);
    }

    #[test]
    fn test_empty_model_stays_empty() {
        let mut model = GeoModel::new();
        let vertices = built(&mut model);
        assert!(!vertices.is_initialized());
        assert_eq!(vertices.nb_vertices(), 0);
    }
}
