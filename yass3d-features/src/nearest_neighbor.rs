//! Nearest neighbor search implementations

use rstar::RTree;
use yass3d_core::{NearestNeighborSearch, Point3d};

/// A point with its index for spatial data structures
#[derive(Debug, Clone, Copy, PartialEq)]
struct IndexedPoint {
    point: Point3d,
    index: usize,
}

impl rstar::Point for IndexedPoint {
    type Scalar = f64;
    const DIMENSIONS: usize = 3;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        Self {
            point: Point3d::new(generator(0), generator(1), generator(2)),
            index: 0,
        }
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        match index {
            0 => self.point.x,
            1 => self.point.y,
            2 => self.point.z,
            _ => unreachable!("IndexedPoint has three dimensions"),
        }
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        match index {
            0 => &mut self.point.x,
            1 => &mut self.point.y,
            2 => &mut self.point.z,
            _ => unreachable!("IndexedPoint has three dimensions"),
        }
    }
}

/// R*-tree backed neighbor search used by the feature extractors
pub struct RTreeSearch {
    tree: RTree<IndexedPoint>,
}

impl RTreeSearch {
    pub fn new(points: &[Point3d]) -> Self {
        let entries = points
            .iter()
            .enumerate()
            .map(|(index, point)| IndexedPoint { point: *point, index })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl NearestNeighborSearch for RTreeSearch {
    fn find_k_nearest(&self, query: &Point3d, k: usize) -> Vec<(usize, f64)> {
        if k == 0 {
            return Vec::new();
        }

        let query_point = IndexedPoint { point: *query, index: 0 };
        let mut neighbors: Vec<(usize, f64)> = self
            .tree
            .nearest_neighbor_iter(&query_point)
            .take(k)
            .map(|entry| (entry.index, (entry.point - query).norm()))
            .collect();

        // Equidistant points come back in tree order; pin them by index
        neighbors.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        neighbors
    }

    fn find_radius_neighbors(&self, query: &Point3d, radius: f64) -> Vec<(usize, f64)> {
        if radius < 0.0 {
            return Vec::new();
        }

        let query_point = IndexedPoint { point: *query, index: 0 };
        let mut neighbors: Vec<(usize, f64)> = self
            .tree
            .locate_within_distance(query_point, radius * radius)
            .map(|entry| (entry.index, (entry.point - query).norm()))
            .collect();

        neighbors.sort_by_key(|&(index, _)| index);
        neighbors
    }
}

/// Simple brute force nearest neighbor search for small datasets
pub struct BruteForceSearch {
    points: Vec<Point3d>,
}

impl BruteForceSearch {
    pub fn new(points: &[Point3d]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

impl NearestNeighborSearch for BruteForceSearch {
    fn find_k_nearest(&self, query: &Point3d, k: usize) -> Vec<(usize, f64)> {
        let mut distances: Vec<(usize, f64)> = self
            .points
            .iter()
            .enumerate()
            .map(|(idx, point)| (idx, (point - query).norm()))
            .collect();

        distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        distances.truncate(k);
        distances
    }

    fn find_radius_neighbors(&self, query: &Point3d, radius: f64) -> Vec<(usize, f64)> {
        let radius_squared = radius * radius;
        self.points
            .iter()
            .enumerate()
            .filter_map(|(idx, point)| {
                let distance_squared = (point - query).norm_squared();
                if distance_squared <= radius_squared {
                    Some((idx, distance_squared.sqrt()))
                } else {
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize, spacing: f64) -> Vec<Point3d> {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                points.push(Point3d::new(i as f64 * spacing, j as f64 * spacing, 0.0));
            }
        }
        points
    }

    #[test]
    fn test_radius_search_matches_brute_force() {
        let points = grid(8, 0.1);
        let rtree = RTreeSearch::new(&points);
        let brute = BruteForceSearch::new(&points);

        for query in points.iter().step_by(7) {
            let a: Vec<usize> = rtree.find_radius_neighbors(query, 0.15).into_iter().map(|n| n.0).collect();
            let b: Vec<usize> = brute.find_radius_neighbors(query, 0.15).into_iter().map(|n| n.0).collect();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_radius_search_includes_query_point() {
        let points = grid(3, 1.0);
        let rtree = RTreeSearch::new(&points);
        let neighbors = rtree.find_radius_neighbors(&points[4], 0.5);
        assert_eq!(neighbors, vec![(4, 0.0)]);
    }

    #[test]
    fn test_k_nearest_matches_brute_force() {
        let points = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(0.0, 2.0, 0.0),
            Point3d::new(0.0, 0.0, 3.0),
        ];
        let rtree = RTreeSearch::new(&points);
        let brute = BruteForceSearch::new(&points);
        let query = Point3d::new(0.1, 0.0, 0.0);

        assert_eq!(rtree.find_k_nearest(&query, 3), brute.find_k_nearest(&query, 3));
        assert_eq!(rtree.find_k_nearest(&query, 0), Vec::new());
    }

    #[test]
    fn test_duplicate_points_are_all_found() {
        let points = vec![Point3d::new(1.0, 1.0, 1.0); 50];
        let rtree = RTreeSearch::new(&points);
        assert_eq!(rtree.len(), 50);

        let neighbors = rtree.find_radius_neighbors(&points[0], 0.01);
        let indices: Vec<usize> = neighbors.iter().map(|n| n.0).collect();
        assert_eq!(indices, (0..50).collect::<Vec<_>>());
    }
}
