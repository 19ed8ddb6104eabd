//! The global line-edge aggregate.
//!
//! Copies every line's edges into one collection with vertices mapped to
//! global ids and `(line, index within line)` provenance, with a per-line
//! offset table. The simplest of the aggregates; polygons and cells follow
//! the same scheme with type buckets on top.

use super::vertices::ModelVertices;
use crate::model::{EntityId, EntityType, GeoModel};

/// The global edge aggregate.
#[derive(Debug, Default)]
pub struct ModelEdges {
    /// Two global vertex ids per edge.
    vertices: Vec<usize>,
    line_of: Vec<usize>,
    index_in_line: Vec<usize>,
    /// `line_edge_ptr[l]..line_edge_ptr[l + 1]` is the edge range of line `l`.
    line_edge_ptr: Vec<usize>,
}

impl ModelEdges {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the aggregate holds any edges.
    pub fn is_initialized(&self) -> bool {
        !self.line_edge_ptr.is_empty()
    }

    /// Build from the current global vertex set.
    pub fn initialize(&mut self, model: &GeoModel, vertices: &ModelVertices) {
        self.clear();
        let nb_lines = model.nb_lines();
        self.line_edge_ptr.reserve(nb_lines + 1);
        self.line_edge_ptr.push(0);

        for l in 0..nb_lines {
            let id = EntityId::new(EntityType::Line, l);
            let nb_edges = model.line(l).nb_edges();
            for e in 0..nb_edges {
                self.vertices
                    .push(vertices.global_element_vertex(model, id, e, 0));
                self.vertices
                    .push(vertices.global_element_vertex(model, id, e, 1));
                self.line_of.push(l);
                self.index_in_line.push(e);
            }
            self.line_edge_ptr.push(self.line_of.len());
        }
    }

    /// Total number of edges.
    pub fn nb_edges(&self) -> usize {
        self.line_of.len()
    }

    /// Number of edges of line `line`.
    pub fn nb_line_edges(&self, line: usize) -> usize {
        self.line_edge_ptr[line + 1] - self.line_edge_ptr[line]
    }

    /// Global edge id of edge `index` of line `line`.
    pub fn line_edge(&self, line: usize, index: usize) -> usize {
        debug_assert!(index < self.nb_line_edges(line));
        self.line_edge_ptr[line] + index
    }

    /// Global vertex id of endpoint `end` (0 or 1) of edge `edge`.
    pub fn vertex(&self, edge: usize, end: usize) -> usize {
        debug_assert!(end < 2);
        self.vertices[2 * edge + end]
    }

    /// The line owning edge `edge`.
    pub fn line(&self, edge: usize) -> usize {
        self.line_of[edge]
    }

    /// The index of `edge` within its owning line.
    pub fn index_in_line(&self, edge: usize) -> usize {
        self.index_in_line[edge]
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.line_of.clear();
        self.index_in_line.clear();
        self.line_edge_ptr.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_edges_partition_by_line() {
        let mut model = GeoModel::new();
        model
            .add_line(vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
            ])
            .unwrap();
        model
            .add_line(vec![Point3::new(2.0, 0.0, 0.0), Point3::new(2.0, 1.0, 0.0)])
            .unwrap();

        let mut vertices = ModelVertices::new();
        vertices.initialize(&mut model);
        let mut edges = ModelEdges::new();
        edges.initialize(&model, &vertices);

        assert_eq!(edges.nb_edges(), 3);
        assert_eq!(edges.nb_line_edges(0) + edges.nb_line_edges(1), 3);
        assert_eq!(edges.line(2), 1);
        assert_eq!(edges.index_in_line(2), 0);

        // The shared endpoint maps to one global vertex.
        let shared = edges.vertex(edges.line_edge(0, 1), 1);
        assert_eq!(edges.vertex(edges.line_edge(1, 0), 0), shared);
        assert_eq!(vertices.vertex(shared), Point3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_initialize_is_restartable() {
        let mut model = GeoModel::new();
        model
            .add_line(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)])
            .unwrap();

        let mut vertices = ModelVertices::new();
        vertices.initialize(&mut model);
        let mut edges = ModelEdges::new();
        edges.initialize(&model, &vertices);
        edges.initialize(&model, &vertices);

        assert_eq!(edges.nb_edges(), 1);
        assert_eq!(edges.nb_line_edges(0), 1);
    }
}
