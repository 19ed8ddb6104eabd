//! The global region-cell aggregate.
//!
//! Same construction scheme as the polygon aggregate, one dimension up:
//! cells are classified by [`CellType`], laid out in the canonical
//! `(region asc, type asc)` order through a stride-5 offset table, and
//! connected facet-to-facet by matching sorted facet vertex keys.
//!
//! Cell corners store *raw* ids: either a global vertex id or, after
//! boundary duplication (see [`super::duplicate`]), a virtual id
//! `>= nb global vertices` indexing the side table of original ids. All
//! vertex queries resolve through that table; corner queries expose the raw
//! id for export writers that want the duplicated numbering.

use nalgebra::Point3;
use rustc_hash::FxHashMap;

use super::vertices::ModelVertices;
use crate::model::{barycenter, CellType, EntityId, EntityType, GeoModel, NB_CELL_TYPES};
use crate::NO_ID;

/// The global cell aggregate.
#[derive(Debug, Default)]
pub struct ModelCells {
    types: Vec<CellType>,
    /// CRS corner ranges: cell `c` owns `corner_ptr[c]..corner_ptr[c+1]`.
    corner_ptr: Vec<usize>,
    /// Raw corner ids (global vertex ids, or duplicate ids past the global
    /// count).
    corners: Vec<usize>,
    /// CRS facet ranges, parallel structure to `corner_ptr`.
    facet_ptr: Vec<usize>,
    /// Adjacent global cell per facet, or `NO_ID` on the mesh boundary.
    adjacent: Vec<usize>,
    region_of: Vec<usize>,
    index_in_region: Vec<usize>,
    /// Offset table of size `nb_regions * 5 + 1`.
    region_cell_ptr: Vec<usize>,
    nb_by_type: [usize; NB_CELL_TYPES],
    /// Original global vertex id of each duplicate, in allocation order.
    duplicated_vertex_indices: Vec<usize>,
    /// Global vertex count at build time; raw ids at or past it are
    /// duplicates.
    nb_global_vertices: usize,
}

impl ModelCells {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the aggregate holds any cells.
    pub fn is_initialized(&self) -> bool {
        !self.region_cell_ptr.is_empty()
    }

    // ==================== Construction ====================

    /// Build from the current global vertex set and reconstruct cell
    /// adjacency.
    pub fn initialize(&mut self, model: &GeoModel, vertices: &ModelVertices) {
        self.clear();
        let nb_regions = model.nb_regions();
        self.nb_global_vertices = vertices.nb_vertices();

        let mut counts = vec![0usize; nb_regions * NB_CELL_TYPES];
        let mut total = 0;
        for r in 0..nb_regions {
            let region = model.region(r);
            for c in 0..region.nb_cells() {
                counts[r * NB_CELL_TYPES + region.cell_type(c).index()] += 1;
                self.nb_by_type[region.cell_type(c).index()] += 1;
                total += 1;
            }
        }

        self.region_cell_ptr = vec![0; nb_regions * NB_CELL_TYPES + 1];
        for i in 0..counts.len() {
            self.region_cell_ptr[i + 1] = self.region_cell_ptr[i] + counts[i];
        }

        // Bucket placement doubles as the (region asc, type asc) sort.
        let mut slot_of = vec![NO_ID; total];
        let mut cursor = self.region_cell_ptr.clone();
        self.types = vec![CellType::Tetrahedron; total];
        let mut flat = 0;
        for r in 0..nb_regions {
            let region = model.region(r);
            for c in 0..region.nb_cells() {
                let cell_type = region.cell_type(c);
                let slot = cursor[r * NB_CELL_TYPES + cell_type.index()];
                cursor[r * NB_CELL_TYPES + cell_type.index()] += 1;
                slot_of[flat] = slot;
                self.types[slot] = cell_type;
                flat += 1;
            }
        }

        self.corner_ptr = vec![0; total + 1];
        self.facet_ptr = vec![0; total + 1];
        for c in 0..total {
            self.corner_ptr[c + 1] = self.corner_ptr[c] + self.types[c].nb_vertices();
            self.facet_ptr[c + 1] = self.facet_ptr[c] + self.types[c].facets().len();
        }

        self.corners = vec![NO_ID; self.corner_ptr[total]];
        self.adjacent = vec![NO_ID; self.facet_ptr[total]];
        self.region_of = vec![NO_ID; total];
        self.index_in_region = vec![NO_ID; total];

        let mut flat = 0;
        for r in 0..nb_regions {
            let id = EntityId::new(EntityType::Region, r);
            let region = model.region(r);
            for c in 0..region.nb_cells() {
                let slot = slot_of[flat];
                flat += 1;
                let begin = self.corner_ptr[slot];
                for lv in 0..region.cell_type(c).nb_vertices() {
                    self.corners[begin + lv] =
                        vertices.global_element_vertex(model, id, c, lv);
                }
                self.region_of[slot] = r;
                self.index_in_region[slot] =
                    slot - self.region_cell_ptr[r * NB_CELL_TYPES];
            }
        }

        self.connect_cells();
    }

    /// Reconstruct cell adjacency by matching sorted facet vertex keys.
    fn connect_cells(&mut self) {
        let consumed = (NO_ID, NO_ID);
        let mut facet_map: FxHashMap<Vec<usize>, (usize, usize)> = FxHashMap::default();
        for c in 0..self.nb_cells(None) {
            for f in 0..self.nb_cell_facets(c) {
                let mut key: Vec<usize> = self
                    .cell_type(c)
                    .facets()[f]
                    .iter()
                    .map(|&lv| self.corners[self.corner_ptr[c] + lv])
                    .collect();
                key.sort_unstable();
                match facet_map.get(&key).copied() {
                    None => {
                        facet_map.insert(key, (c, f));
                    }
                    Some((d, g)) if (d, g) != consumed => {
                        self.adjacent[self.facet_ptr[c] + f] = d;
                        self.adjacent[self.facet_ptr[d] + g] = c;
                        facet_map.insert(key, consumed);
                    }
                    Some(_) => {}
                }
            }
        }
    }

    /// Drop everything, including duplication state.
    pub fn clear(&mut self) {
        self.types.clear();
        self.corner_ptr.clear();
        self.corners.clear();
        self.facet_ptr.clear();
        self.adjacent.clear();
        self.region_of.clear();
        self.index_in_region.clear();
        self.region_cell_ptr.clear();
        self.nb_by_type = [0; NB_CELL_TYPES];
        self.duplicated_vertex_indices.clear();
        self.nb_global_vertices = 0;
    }

    /// Undo boundary duplication: restore original corner ids and drop the
    /// side table.
    pub fn clear_duplication(&mut self) {
        for corner in &mut self.corners {
            if *corner != NO_ID && *corner >= self.nb_global_vertices {
                *corner = self.duplicated_vertex_indices[*corner - self.nb_global_vertices];
            }
        }
        self.duplicated_vertex_indices.clear();
    }

    // ==================== Queries ====================

    /// Number of cells, optionally of one type.
    pub fn nb_cells(&self, cell_type: Option<CellType>) -> usize {
        match cell_type {
            None => self.types.len(),
            Some(t) => self.nb_by_type[t.index()],
        }
    }

    /// Number of cells of region `region`, optionally of one type.
    pub fn nb_region_cells(&self, region: usize, cell_type: Option<CellType>) -> usize {
        let base = region * NB_CELL_TYPES;
        match cell_type {
            None => {
                self.region_cell_ptr[base + NB_CELL_TYPES] - self.region_cell_ptr[base]
            }
            Some(t) => {
                self.region_cell_ptr[base + t.index() + 1]
                    - self.region_cell_ptr[base + t.index()]
            }
        }
    }

    /// Global cell id of cell `index` of region `region`, counted within
    /// one type or within the whole region range.
    pub fn cell(&self, region: usize, index: usize, cell_type: Option<CellType>) -> usize {
        debug_assert!(index < self.nb_region_cells(region, cell_type));
        let base = region * NB_CELL_TYPES;
        match cell_type {
            None => self.region_cell_ptr[base] + index,
            Some(t) => self.region_cell_ptr[base + t.index()] + index,
        }
    }

    /// The type of cell `c`.
    pub fn cell_type(&self, c: usize) -> CellType {
        self.types[c]
    }

    /// Number of corners of cell `c`.
    pub fn nb_cell_vertices(&self, c: usize) -> usize {
        self.corner_ptr[c + 1] - self.corner_ptr[c]
    }

    /// Number of facets of cell `c`.
    pub fn nb_cell_facets(&self, c: usize) -> usize {
        self.facet_ptr[c + 1] - self.facet_ptr[c]
    }

    /// Global vertex id of corner `lv` of cell `c`, resolved through the
    /// duplication side table.
    pub fn vertex(&self, c: usize, lv: usize) -> usize {
        let raw = self.corner_id(c, lv);
        if raw >= self.nb_global_vertices {
            self.duplicated_vertex_indices[raw - self.nb_global_vertices]
        } else {
            raw
        }
    }

    /// Raw id of corner `lv` of cell `c` (a duplicate id once duplication
    /// ran).
    pub fn corner_id(&self, c: usize, lv: usize) -> usize {
        debug_assert!(lv < self.nb_cell_vertices(c));
        self.corners[self.corner_ptr[c] + lv]
    }

    /// The cell adjacent to `c` across facet `f`, or [`NO_ID`].
    pub fn adjacent(&self, c: usize, f: usize) -> usize {
        debug_assert!(f < self.nb_cell_facets(c));
        self.adjacent[self.facet_ptr[c] + f]
    }

    /// The region owning cell `c`.
    pub fn region(&self, c: usize) -> usize {
        self.region_of[c]
    }

    /// The index of cell `c` within its region's range.
    pub fn index_in_region(&self, c: usize) -> usize {
        self.index_in_region[c]
    }

    /// Barycenter of cell `c`.
    pub fn center(&self, vertices: &ModelVertices, c: usize) -> Point3<f64> {
        let points: Vec<Point3<f64>> = (0..self.nb_cell_vertices(c))
            .map(|lv| vertices.vertex(self.vertex(c, lv)))
            .collect();
        barycenter(&points)
    }

    /// Positions of the corners of facet `f` of cell `c`.
    pub fn facet_corner_points(
        &self,
        vertices: &ModelVertices,
        c: usize,
        f: usize,
    ) -> Vec<Point3<f64>> {
        self.cell_type(c).facets()[f]
            .iter()
            .map(|&lv| vertices.vertex(self.vertex(c, lv)))
            .collect()
    }

    // ==================== Duplication queries ====================

    /// Number of duplicated vertex ids allocated so far.
    pub fn nb_duplicated_vertices(&self) -> usize {
        self.duplicated_vertex_indices.len()
    }

    /// Whether corner `lv` of cell `c` references a duplicate id.
    pub fn is_corner_duplicated(&self, c: usize, lv: usize) -> bool {
        self.corner_id(c, lv) >= self.nb_global_vertices
    }

    /// The duplicate index referenced by corner `lv` of cell `c`, or `None`
    /// if the corner kept its original vertex.
    pub fn duplicated_corner_vertex(&self, c: usize, lv: usize) -> Option<usize> {
        let raw = self.corner_id(c, lv);
        (raw >= self.nb_global_vertices).then(|| raw - self.nb_global_vertices)
    }

    /// The original global vertex id behind duplicate `duplicate`.
    pub fn duplicated_vertex(&self, duplicate: usize) -> usize {
        self.duplicated_vertex_indices[duplicate]
    }

    // ==================== Internal (duplication pass) ====================

    pub(super) fn nb_corners(&self) -> usize {
        self.corners.len()
    }

    pub(super) fn corner_begin(&self, c: usize) -> usize {
        self.corner_ptr[c]
    }

    pub(super) fn raw_corner(&self, flat: usize) -> usize {
        self.corners[flat]
    }

    pub(super) fn set_raw_corner(&mut self, flat: usize, id: usize) {
        self.corners[flat] = id;
    }

    pub(super) fn nb_global_vertices(&self) -> usize {
        self.nb_global_vertices
    }

    pub(super) fn push_duplicate(&mut self, original: usize) -> usize {
        self.duplicated_vertex_indices.push(original);
        self.nb_global_vertices + self.duplicated_vertex_indices.len() - 1
    }

    /// The cell owning flat corner index `flat`.
    pub(super) fn cell_of_corner(&self, flat: usize) -> usize {
        debug_assert!(flat < self.corners.len());
        // corner_ptr is sorted; find the cell whose range contains flat.
        match self.corner_ptr.binary_search(&flat) {
            Ok(c) => c,
            Err(c) => c - 1,
        }
    }
}
