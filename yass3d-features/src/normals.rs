//! Local geometry estimation (normals and covariance eigenvalues)

use nalgebra::Matrix3;
use yass3d_core::{Error, Point3d, Result, Vector3d};

/// Minimum neighborhood size (query point included) for a plane fit
pub const MIN_NEIGHBORS: usize = 3;

/// Result of a PCA over a point's neighborhood
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalGeometry {
    /// Unit normal, oriented toward the viewpoint
    pub normal: Vector3d,
    /// Covariance eigenvalues sorted in descending order
    pub eigenvalues: [f64; 3],
}

impl LocalGeometry {
    /// Surface variation `λ3 / (λ1 + λ2 + λ3)`, zero for a degenerate neighborhood
    pub fn surface_variation(&self) -> f64 {
        let sum: f64 = self.eigenvalues.iter().sum();
        if sum <= f64::EPSILON {
            return 0.0;
        }
        self.eigenvalues[2] / sum
    }

    /// Linearity `(λ1 - λ2) / λ1`
    pub fn linearity(&self) -> f64 {
        let [l1, l2, _] = self.eigenvalues;
        if l1 <= f64::EPSILON {
            return 0.0;
        }
        (l1 - l2) / l1
    }

    /// Planarity `(λ2 - λ3) / λ1`
    pub fn planarity(&self) -> f64 {
        let [l1, l2, l3] = self.eigenvalues;
        if l1 <= f64::EPSILON {
            return 0.0;
        }
        (l2 - l3) / l1
    }
}

/// Fit a plane to `neighbors` (indices into `points`) with PCA.
///
/// The normal is flipped so that it points toward `viewpoint`. Fails with
/// [`Error::InsufficientNeighbors`] when fewer than [`MIN_NEIGHBORS`] points
/// are available.
pub fn estimate_local_geometry(
    points: &[Point3d],
    neighbors: &[usize],
    query: &Point3d,
    viewpoint: &Point3d,
) -> Result<LocalGeometry> {
    if neighbors.len() < MIN_NEIGHBORS {
        return Err(Error::InsufficientNeighbors {
            found: neighbors.len(),
            required: MIN_NEIGHBORS,
        });
    }

    // Compute centroid
    let mut centroid = Vector3d::zeros();
    for &idx in neighbors {
        centroid += points[idx].coords;
    }
    centroid /= neighbors.len() as f64;

    // Compute covariance matrix
    let mut covariance = Matrix3::zeros();
    for &idx in neighbors {
        let diff = points[idx].coords - centroid;
        covariance += diff * diff.transpose();
    }
    covariance /= neighbors.len() as f64;

    let eigen = covariance.symmetric_eigen();
    let mut pairs: Vec<(f64, Vector3d)> = eigen
        .eigenvalues
        .iter()
        .zip(eigen.eigenvectors.column_iter())
        .map(|(&value, vector)| (value.max(0.0), vector.into_owned()))
        .collect();
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut normal = pairs[2].1.normalize();
    if normal.dot(&(viewpoint - query)) < 0.0 {
        normal = -normal;
    }

    Ok(LocalGeometry {
        normal,
        eigenvalues: [pairs[0].0, pairs[1].0, pairs[2].0],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn plane_points() -> Vec<Point3d> {
        let mut points = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                points.push(Point3d::new(i as f64 * 0.1, j as f64 * 0.1, 1.0));
            }
        }
        points
    }

    #[test]
    fn test_plane_normal_faces_viewpoint() {
        let points = plane_points();
        let neighbors: Vec<usize> = (0..points.len()).collect();
        let geometry =
            estimate_local_geometry(&points, &neighbors, &points[12], &Point3d::origin()).unwrap();

        // Plane at z = 1 seen from the origin: the normal must point down
        assert_relative_eq!(geometry.normal.z, -1.0, epsilon = 1e-9);
        assert_relative_eq!(geometry.eigenvalues[2], 0.0, epsilon = 1e-12);
        assert_relative_eq!(geometry.surface_variation(), 0.0, epsilon = 1e-9);
        assert!(geometry.planarity() > 0.9);
    }

    #[test]
    fn test_line_is_linear() {
        let points: Vec<Point3d> = (0..10).map(|i| Point3d::new(i as f64, 0.0, 0.0)).collect();
        let neighbors: Vec<usize> = (0..points.len()).collect();
        let geometry =
            estimate_local_geometry(&points, &neighbors, &points[0], &Point3d::origin()).unwrap();

        assert_relative_eq!(geometry.linearity(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_insufficient_neighbors() {
        let points = plane_points();
        let result = estimate_local_geometry(&points, &[0, 1], &points[0], &Point3d::origin());
        assert!(matches!(
            result,
            Err(Error::InsufficientNeighbors { found: 2, required: 3 })
        ));
    }

    #[test]
    fn test_degenerate_neighborhood_has_zero_descriptors() {
        let points = vec![Point3d::new(1.0, 2.0, 3.0); 4];
        let neighbors = vec![0, 1, 2, 3];
        let geometry =
            estimate_local_geometry(&points, &neighbors, &points[0], &Point3d::origin()).unwrap();

        assert_eq!(geometry.surface_variation(), 0.0);
        assert_eq!(geometry.linearity(), 0.0);
        assert_eq!(geometry.planarity(), 0.0);
    }
}
