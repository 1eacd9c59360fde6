//! Core traits for yass3d

use crate::point::Point3d;

/// Trait for nearest neighbor search functionality
pub trait NearestNeighborSearch {
    /// Find the k nearest neighbors to a query point
    fn find_k_nearest(&self, query: &Point3d, k: usize) -> Vec<(usize, f64)>;

    /// Find all neighbors within a given radius (inclusive), sorted by point index
    fn find_radius_neighbors(&self, query: &Point3d, radius: f64) -> Vec<(usize, f64)>;
}
