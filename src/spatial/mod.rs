//! Spatial colocation search.
//!
//! The aggregation layer treats nearest-neighbor search as a service: it
//! only needs ε-ball queries over a fixed point set. [`NNSearch`] is that
//! seam; [`PointSetIndex`] is the bundled implementation, a uniform hash
//! grid with floored cell keys and a Moore-neighborhood walk.
//!
//! Grid queries enumerate exactly the cells intersecting the ε-ball, so
//! [`neighbors_within`](NNSearch::neighbors_within) returns *all* indices
//! within ε — there is no candidate-count expansion loop and therefore no
//! ambiguous termination state.
//!
//! The one bulk operation, [`PointSetIndex::colocated_index_mapping`], runs
//! the per-point queries in parallel: each task reads the shared grid and
//! produces one output slot, so the pass is mutation-free until the final
//! reduction.

use nalgebra::Point3;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Nearest-neighbor search over a fixed point set.
pub trait NNSearch {
    /// Number of indexed points.
    fn nb_points(&self) -> usize;

    /// All point indices within `epsilon` of `point`, ascending.
    fn neighbors_within(&self, point: &Point3<f64>, epsilon: f64) -> Vec<usize>;

    /// The index of the point closest to `point`, or `None` for an empty set.
    fn closest(&self, point: &Point3<f64>) -> Option<usize>;
}

/// A uniform hash grid over a fixed set of points.
///
/// Points are bucketed by their floored cell coordinates
/// `floor(coord / cell_size)`. A good `cell_size` for colocation queries is
/// the query tolerance itself.
#[derive(Debug, Clone)]
pub struct PointSetIndex {
    points: Vec<Point3<f64>>,
    cell_size: f64,
    cells: FxHashMap<(i64, i64, i64), Vec<usize>>,
}

impl PointSetIndex {
    /// Index `points` with the given grid cell size.
    pub fn new(points: Vec<Point3<f64>>, cell_size: f64) -> Self {
        assert!(cell_size > 0.0, "cell size must be positive");
        let mut cells: FxHashMap<(i64, i64, i64), Vec<usize>> = FxHashMap::default();
        for (i, p) in points.iter().enumerate() {
            cells.entry(cell_key(p, cell_size)).or_default().push(i);
        }
        Self {
            points,
            cell_size,
            cells,
        }
    }

    /// The indexed points.
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// For every point, the index of its lowest-index ε-colocated partner
    /// (itself if unique), plus the number of non-representative points.
    ///
    /// The tie break is "lower index wins", so `old_to_new[i] <= i` always —
    /// the precondition of the compaction primitive downstream. Queries run
    /// in parallel over the read-only grid.
    pub fn colocated_index_mapping(&self, epsilon: f64) -> (Vec<usize>, usize) {
        let old_to_new: Vec<usize> = self
            .points
            .par_iter()
            .map(|p| {
                // The point itself is always a neighbor, so the result is
                // non-empty and its first entry is the lowest index.
                self.neighbors_within(p, epsilon)[0]
            })
            .collect();
        let nb_colocated = old_to_new
            .par_iter()
            .enumerate()
            .filter(|&(i, &rep)| rep != i)
            .count();
        (old_to_new, nb_colocated)
    }

    fn candidate_cells(&self, point: &Point3<f64>, radius: f64) -> Vec<(i64, i64, i64)> {
        let reach = (radius / self.cell_size).ceil() as i64;
        let (cx, cy, cz) = cell_key(point, self.cell_size);
        let mut keys = Vec::new();
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    keys.push((cx + dx, cy + dy, cz + dz));
                }
            }
        }
        keys
    }
}

impl NNSearch for PointSetIndex {
    fn nb_points(&self) -> usize {
        self.points.len()
    }

    fn neighbors_within(&self, point: &Point3<f64>, epsilon: f64) -> Vec<usize> {
        debug_assert!(epsilon >= 0.0);
        let eps2 = epsilon * epsilon;
        let mut result = Vec::new();
        for key in self.candidate_cells(point, epsilon) {
            if let Some(bucket) = self.cells.get(&key) {
                for &i in bucket {
                    if (self.points[i] - point).norm_squared() <= eps2 {
                        result.push(i);
                    }
                }
            }
        }
        result.sort_unstable();
        result
    }

    fn closest(&self, point: &Point3<f64>) -> Option<usize> {
        if self.points.is_empty() {
            return None;
        }
        let (cx, cy, cz) = cell_key(point, self.cell_size);
        let mut best: Option<(usize, f64)> = None;
        let mut ring = 0i64;
        loop {
            // Scan the shell of cells at Chebyshev distance `ring`.
            for dx in -ring..=ring {
                for dy in -ring..=ring {
                    for dz in -ring..=ring {
                        if dx.abs().max(dy.abs()).max(dz.abs()) != ring {
                            continue;
                        }
                        if let Some(bucket) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) {
                            for &i in bucket {
                                let d2 = (self.points[i] - point).norm_squared();
                                if best.map_or(true, |(_, b)| d2 < b) {
                                    best = Some((i, d2));
                                }
                            }
                        }
                    }
                }
            }
            // A candidate at distance d can only be beaten by points in
            // cells within d of the query; once the scanned shells cover
            // that radius the candidate is final.
            if let Some((_, best_d2)) = best {
                if (ring as f64) * self.cell_size >= best_d2.sqrt() {
                    return best.map(|(i, _)| i);
                }
            }
            ring += 1;
            // All occupied cells are exhausted once the shells outgrow the
            // indexed extent; guarded by the point set being non-empty.
            if ring > self.max_ring(cx, cy, cz) {
                return best.map(|(i, _)| i);
            }
        }
    }
}

impl PointSetIndex {
    fn max_ring(&self, cx: i64, cy: i64, cz: i64) -> i64 {
        self.cells
            .keys()
            .map(|&(x, y, z)| {
                (x - cx)
                    .abs()
                    .max((y - cy).abs())
                    .max((z - cz).abs())
            })
            .max()
            .unwrap_or(0)
    }
}

fn cell_key(point: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (point.x / cell_size).floor() as i64,
        (point.y / cell_size).floor() as i64,
        (point.z / cell_size).floor() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(points: &[[f64; 3]], cell_size: f64) -> PointSetIndex {
        PointSetIndex::new(
            points.iter().map(|p| Point3::new(p[0], p[1], p[2])).collect(),
            cell_size,
        )
    }

    #[test]
    fn test_neighbors_within() {
        let idx = index(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1e-10], [5.0, 5.0, 5.0]],
            1e-6,
        );
        let n = idx.neighbors_within(&Point3::new(0.0, 0.0, 0.0), 1e-6);
        assert_eq!(n, vec![0, 2]);
    }

    #[test]
    fn test_neighbors_across_cell_boundary() {
        // Two points straddling a grid cell boundary.
        let idx = index(&[[0.999_999_9, 0.0, 0.0], [1.000_000_1, 0.0, 0.0]], 1e-3);
        let n = idx.neighbors_within(&Point3::new(1.0, 0.0, 0.0), 1e-6);
        assert_eq!(n, vec![0, 1]);
    }

    #[test]
    fn test_closest() {
        let idx = index(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [2.0, 0.0, 0.0]], 0.5);
        assert_eq!(idx.closest(&Point3::new(2.2, 0.0, 0.0)), Some(2));
        assert_eq!(idx.closest(&Point3::new(100.0, 0.0, 0.0)), Some(1));

        let empty = PointSetIndex::new(Vec::new(), 0.5);
        assert_eq!(empty.closest(&Point3::new(0.0, 0.0, 0.0)), None);
    }

    #[test]
    fn test_colocated_mapping_lowest_index_wins() {
        let idx = index(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 0.0, 0.0],
            ],
            1e-6,
        );
        let (old_to_new, nb_colocated) = idx.colocated_index_mapping(1e-6);
        assert_eq!(old_to_new, vec![0, 1, 0, 1, 0]);
        assert_eq!(nb_colocated, 3);
        for (i, &rep) in old_to_new.iter().enumerate() {
            assert!(rep <= i);
        }
    }

    #[test]
    fn test_colocated_mapping_no_duplicates() {
        let idx = index(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], 1e-6);
        let (old_to_new, nb_colocated) = idx.colocated_index_mapping(1e-6);
        assert_eq!(old_to_new, vec![0, 1]);
        assert_eq!(nb_colocated, 0);
    }
}
