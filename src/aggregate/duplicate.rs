//! Vertex duplication along interior surfaces.
//!
//! Sliding along a fault tears the cell mesh: the cells on either side must
//! stop sharing the vertices of the fault surface. For every global vertex
//! colocated with a boundary surface, the star of cells around it is
//! partitioned by flood fill, crossing cell facets freely except where a
//! facet lies on a boundary surface (detected by facet-center colocation
//! with the aggregated surface polygons). The first partition to touch a
//! surface records which side of it it sits on; any later partition on the
//! opposite side gets a fresh duplicate id past the global vertex count, and
//! the side table in [`ModelCells`] maps it back to the original.
//!
//! A surface seen from both sides within a single partition ends inside the
//! volume there (a free border); it does not split that vertex.

use nalgebra::Point3;
use rustc_hash::FxHashSet;

use super::cells::ModelCells;
use super::polygons::ModelPolygons;
use super::vertices::ModelVertices;
use crate::error::{GeoModelError, Result};
use crate::model::{barycenter, polygon_normal, GeoModel, MeshEntity, SurfaceMesh};
use crate::spatial::{NNSearch, PointSetIndex};
use crate::NO_ID;

/// Which surfaces tear the cell mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateMode {
    /// No duplication.
    #[default]
    None,
    /// Every interior surface tears.
    All,
    /// Only interior surfaces tagged as faults tear.
    FaultOnly,
}

impl DuplicateMode {
    fn selects(self, surface: &SurfaceMesh) -> bool {
        match self {
            DuplicateMode::None => false,
            DuplicateMode::All => !surface.is_on_outer_boundary,
            DuplicateMode::FaultOnly => surface.is_fault && !surface.is_on_outer_boundary,
        }
    }
}

/// Per-surface progress of the duplication pass.
#[derive(Clone, Copy, PartialEq)]
enum SurfaceAction {
    Skip,
    ToProcess,
    SideRecorded(bool),
}

/// Run the duplication pass over the cell aggregate.
///
/// Resets any previous duplication first. Returns the number of duplicate
/// ids allocated.
pub fn duplicate_vertices(
    model: &GeoModel,
    vertices: &ModelVertices,
    polygons: &ModelPolygons,
    cells: &mut ModelCells,
    mode: DuplicateMode,
) -> Result<usize> {
    cells.clear_duplication();
    if mode == DuplicateMode::None || cells.nb_cells(None) == 0 {
        return Ok(0);
    }
    let epsilon = model.epsilon();

    let mut action: Vec<SurfaceAction> = (0..model.nb_surfaces())
        .map(|s| {
            if mode.selects(model.surface(s)) {
                SurfaceAction::ToProcess
            } else {
                SurfaceAction::Skip
            }
        })
        .collect();
    if action.iter().all(|&a| a == SurfaceAction::Skip) {
        return Ok(0);
    }

    // Spatial index over every cell corner position, flat-indexed.
    let corner_points: Vec<Point3<f64>> = (0..cells.nb_corners())
        .map(|flat| {
            let c = cells.cell_of_corner(flat);
            vertices.vertex(cells.vertex(c, flat - cells.corner_begin(c)))
        })
        .collect();
    let corner_index = PointSetIndex::new(corner_points, epsilon);

    // Spatial index over the aggregated polygon centers, for the
    // facet-on-surface test.
    let polygon_centers: Vec<Point3<f64>> = (0..polygons.nb_polygons(None))
        .map(|p| polygons.center(vertices, p))
        .collect();
    let center_index = PointSetIndex::new(polygon_centers, epsilon);

    // Corners colocated with a vertex of a tearing surface start floods.
    let mut marked = vec![false; cells.nb_corners()];
    for s in 0..model.nb_surfaces() {
        if action[s] == SurfaceAction::Skip {
            continue;
        }
        let surface = model.surface(s);
        for v in 0..surface.nb_vertices() {
            for flat in corner_index.neighbors_within(&surface.vertex(v), epsilon) {
                marked[flat] = true;
            }
        }
    }

    let mut visited = vec![false; cells.nb_corners()];
    for start in 0..cells.nb_corners() {
        if !marked[start] || visited[start] {
            continue;
        }
        let global = cells.raw_corner(start);
        debug_assert!(global < cells.nb_global_vertices());

        // Flood the star of `global` from the owning cell, blocked by
        // tearing surfaces.
        let mut stack = vec![cells.cell_of_corner(start)];
        let mut in_flood: FxHashSet<usize> = stack.iter().copied().collect();
        let mut flood_corners = Vec::new();
        let mut sides: Vec<(usize, bool)> = Vec::new();
        while let Some(c) = stack.pop() {
            let begin = cells.corner_begin(c);
            let mut found = false;
            for lv in 0..cells.nb_cell_vertices(c) {
                if cells.raw_corner(begin + lv) == global {
                    visited[begin + lv] = true;
                    flood_corners.push(begin + lv);
                    found = true;
                }
            }
            if !found {
                return Err(GeoModelError::CorruptTopology {
                    cell: c,
                    vertex: global,
                });
            }

            for f in 0..cells.nb_cell_facets(c) {
                let facet = cells.cell_type(c).facets()[f];
                if !facet
                    .iter()
                    .any(|&lv| cells.raw_corner(begin + lv) == global)
                {
                    continue;
                }
                if let Some(p) =
                    matching_polygon(polygons, &center_index, cells, vertices, c, f, epsilon)?
                {
                    let s = polygons.surface(p);
                    if action[s] != SurfaceAction::Skip {
                        sides.push((s, facet_side(vertices, polygons, cells, c, f, p)));
                        continue;
                    }
                }
                let adjacent = cells.adjacent(c, f);
                if adjacent != NO_ID && in_flood.insert(adjacent) {
                    stack.push(adjacent);
                }
            }
        }

        // Pair up free borders, then run the remaining encounters through
        // the per-surface side record.
        sides.sort_unstable();
        sides.dedup();
        let mut tear = false;
        let mut i = 0;
        while i < sides.len() {
            let (s, side) = sides[i];
            if i + 1 < sides.len() && sides[i + 1].0 == s {
                // Both sides in one flood: free border at this vertex.
                i += 2;
                continue;
            }
            match action[s] {
                SurfaceAction::Skip => unreachable!("side recorded for a skipped surface"),
                SurfaceAction::ToProcess => action[s] = SurfaceAction::SideRecorded(side),
                SurfaceAction::SideRecorded(recorded) if recorded != side => tear = true,
                SurfaceAction::SideRecorded(_) => {}
            }
            i += 1;
        }

        if tear {
            let duplicate = cells.push_duplicate(global);
            for &flat in &flood_corners {
                cells.set_raw_corner(flat, duplicate);
            }
        }
    }

    Ok(cells.nb_duplicated_vertices())
}

/// The aggregated polygon whose center colocates with facet `f` of cell `c`,
/// if any.
///
/// Coincident polygons from two distinct surfaces leave the side
/// classification ambiguous and are refused.
fn matching_polygon(
    polygons: &ModelPolygons,
    center_index: &PointSetIndex,
    cells: &ModelCells,
    vertices: &ModelVertices,
    c: usize,
    f: usize,
    epsilon: f64,
) -> Result<Option<usize>> {
    let center = barycenter(&cells.facet_corner_points(vertices, c, f));
    let matches = center_index.neighbors_within(&center, epsilon);
    match matches.as_slice() {
        [] => Ok(None),
        [p] => Ok(Some(*p)),
        more => {
            let s = polygons.surface(more[0]);
            if more.iter().any(|&p| polygons.surface(p) != s) {
                Err(GeoModelError::NonManifoldJunction { surface: s })
            } else {
                Ok(Some(more[0]))
            }
        }
    }
}

/// Which side of surface polygon `p` cell `c` sits on: the sign of the
/// polygon normal against the outward normal of facet `f`.
///
/// Outwardness comes from the facet-center-to-cell-center direction, so the
/// facet winding conventions never matter here.
fn facet_side(
    vertices: &ModelVertices,
    polygons: &ModelPolygons,
    cells: &ModelCells,
    c: usize,
    f: usize,
    p: usize,
) -> bool {
    let facet_points = cells.facet_corner_points(vertices, c, f);
    let facet_normal = polygon_normal(&facet_points);
    let outward = barycenter(&facet_points) - cells.center(vertices, c);
    let oriented = if facet_normal.dot(&outward) >= 0.0 {
        facet_normal
    } else {
        -facet_normal
    };
    polygons.normal(vertices, p).dot(&oriented) > 0.0
}
